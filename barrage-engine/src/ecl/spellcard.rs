//! Spellcard lifecycle bookkeeping.
//!
//! A spellcard is a named attack with a capture bonus. The ledger keeps one
//! attempt record per card id; records are matched against the card name by
//! a byte-sum checksum so renamed cards restart their counters.
//!
//! Compatibility note: on capture, the original score file shifts the four
//! bytes following the checksum up by one and stores the player's shot type
//! in the freed slot. That byte-window rotate is preserved verbatim in
//! [`SpellcardRecord::record_capture`] and pinned by tests; the surrounding
//! field layout is a known compatibility risk.

/// Number of ledger entries.
pub const SPELLCARD_COUNT: usize = 64;

/// Base capture score per card id.
pub const SPELLCARD_SCORES: [i32; SPELLCARD_COUNT] = [
    200_000, 200_000, 200_000, 200_000, 200_000, 200_000, 200_000, 250_000,
    250_000, 250_000, 250_000, 250_000, 250_000, 250_000, 300_000, 300_000,
    300_000, 300_000, 300_000, 300_000, 300_000, 300_000, 300_000, 300_000,
    300_000, 300_000, 300_000, 300_000, 300_000, 300_000, 300_000, 300_000,
    400_000, 400_000, 400_000, 400_000, 400_000, 400_000, 400_000, 400_000,
    500_000, 500_000, 500_000, 500_000, 500_000, 500_000, 600_000, 600_000,
    600_000, 600_000, 600_000, 700_000, 700_000, 700_000, 700_000, 700_000,
    700_000, 700_000, 700_000, 700_000, 700_000, 700_000, 700_000, 700_000,
];

/// Live state of the card currently running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpellcardInfo {
    pub active: bool,
    /// Cleared when the player gets hit or bombs; decides the bonus.
    pub capturing: bool,
    pub idx: usize,
    pub capture_score: i32,
}

/// Byte-sum checksum of a card name, truncated to u8.
pub fn name_checksum(name: &str) -> u8 {
    name.bytes().fold(0u8, |acc, b| acc.wrapping_add(b))
}

/// One persisted attempt record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpellcardRecord {
    pub name: String,
    pub attempts: u16,
    pub captures: u16,
    pub capture_score: i32,
    /// Checksum byte followed by the shot-type window; see module docs.
    pub trailer: [u8; 6],
}

impl SpellcardRecord {
    pub fn name_csum(&self) -> u8 {
        self.trailer[0]
    }

    /// Register an attempt. A checksum mismatch means the card was renamed
    /// between versions; its counters restart.
    pub fn record_attempt(&mut self, name: &str, capture_score: i32) {
        let csum = name_checksum(name);
        self.name = name.to_string();
        if self.trailer[0] != csum {
            self.attempts = 0;
            self.captures = 0;
            self.trailer[0] = csum;
        }
        self.capture_score = capture_score;
        if self.attempts < 9999 {
            self.attempts += 1;
        }
    }

    /// Register a capture: bump the counter, rotate the trailer window and
    /// stamp the shot type.
    pub fn record_capture(&mut self, shot_type: u8) {
        self.captures += 1;
        for i in (1..=4).rev() {
            self.trailer[i + 1] = self.trailer[i];
        }
        self.trailer[1] = shot_type;
    }
}

/// Per-card attempt records.
#[derive(Debug, Clone, PartialEq)]
pub struct SpellcardLedger {
    records: Vec<SpellcardRecord>,
}

impl Default for SpellcardLedger {
    fn default() -> Self {
        Self {
            records: vec![SpellcardRecord::default(); SPELLCARD_COUNT],
        }
    }
}

impl SpellcardLedger {
    pub fn get(&self, idx: usize) -> Option<&SpellcardRecord> {
        self.records.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut SpellcardRecord> {
        self.records.get_mut(idx)
    }
}

/// Capture score for card `idx` (0 outside the table).
pub fn base_score(idx: usize) -> i32 {
    SPELLCARD_SCORES.get(idx).copied().unwrap_or(0)
}
