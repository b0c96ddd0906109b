//! Archive catalog: owns loaded archive blobs and the global script table.
//!
//! Scripts are addressed by a global id; each entry records which archive
//! slot the script lives in, its byte offset, and the sprite-index offset
//! the archive was registered with (sprite ids inside scripts are relative
//! to it).

use barrage_common::formats::anm::AnmArchive;

/// Number of archive slots.
pub const ARCHIVE_SLOTS: usize = 32;

/// Number of global script ids.
pub const SCRIPT_SLOTS: usize = 2048;

/// A resolved script location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptRef {
    pub archive_slot: usize,
    /// Byte offset of the first instruction inside the archive blob.
    pub offset: u32,
    /// Added to sprite ids referenced by the script.
    pub sprite_index_offset: i32,
}

/// One occupied archive slot.
#[derive(Debug)]
pub struct LoadedArchive {
    pub archive: AnmArchive,
    /// Texture slot this archive's image was uploaded into.
    pub texture_id: usize,
    pub sprite_index_offset: i32,
}

#[derive(Debug)]
pub struct ArchiveCatalog {
    slots: Vec<Option<LoadedArchive>>,
    scripts: Vec<Option<ScriptRef>>,
}

impl Default for ArchiveCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveCatalog {
    pub fn new() -> Self {
        Self {
            slots: (0..ARCHIVE_SLOTS).map(|_| None).collect(),
            scripts: vec![None; SCRIPT_SLOTS],
        }
    }

    pub fn slot(&self, index: usize) -> Option<&LoadedArchive> {
        self.slots.get(index)?.as_ref()
    }

    pub fn insert(&mut self, index: usize, loaded: LoadedArchive) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(loaded);
        }
    }

    /// Remove and return the archive in `index`.
    pub fn take(&mut self, index: usize) -> Option<LoadedArchive> {
        self.slots.get_mut(index)?.take()
    }

    pub fn script(&self, id: usize) -> Option<ScriptRef> {
        *self.scripts.get(id)?
    }

    pub fn set_script(&mut self, id: usize, script: ScriptRef) -> bool {
        match self.scripts.get_mut(id) {
            Some(slot) => {
                *slot = Some(script);
                true
            }
            None => false,
        }
    }

    /// Drop every script registered from `archive_slot`.
    pub fn clear_scripts_of(&mut self, archive_slot: usize) {
        for slot in &mut self.scripts {
            if slot.is_some_and(|s| s.archive_slot == archive_slot) {
                *slot = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barrage_common::testutil::build_anm_archive;

    fn empty_archive() -> AnmArchive {
        AnmArchive::parse(build_anm_archive(&[], &[], "t.png", 16, 16)).unwrap()
    }

    #[test]
    fn test_insert_take() {
        let mut catalog = ArchiveCatalog::new();
        assert!(catalog.slot(0).is_none());
        catalog.insert(
            0,
            LoadedArchive {
                archive: empty_archive(),
                texture_id: 0,
                sprite_index_offset: 100,
            },
        );
        assert_eq!(catalog.slot(0).unwrap().sprite_index_offset, 100);
        assert!(catalog.take(0).is_some());
        assert!(catalog.slot(0).is_none());
    }

    #[test]
    fn test_script_table_sweep() {
        let mut catalog = ArchiveCatalog::new();
        let r = |slot| ScriptRef {
            archive_slot: slot,
            offset: 64,
            sprite_index_offset: 0,
        };
        assert!(catalog.set_script(7, r(0)));
        assert!(catalog.set_script(8, r(1)));
        assert!(!catalog.set_script(SCRIPT_SLOTS + 1, r(0)));

        catalog.clear_scripts_of(0);
        assert!(catalog.script(7).is_none());
        assert_eq!(catalog.script(8), Some(r(1)));
    }
}
