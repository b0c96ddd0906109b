//! ECL enemy-behavior file format
//!
//! An ECL file is a table of subroutines ("subs") addressed by index, each a
//! stream of timed instructions. Enemies run subs through a per-enemy
//! execution context; call/interrupt targets are sub indices.
//!
//! # Layout
//! ```text
//! 0x00: sub_count u16
//! 0x02: pad u16
//! 0x04: sub_offsets [u32; sub_count]   (absolute into the blob)
//! ```
//!
//! Instruction record:
//! ```text
//! 0x00: time u16
//! 0x02: opcode u16
//! 0x04: offset_to_next u16   (header + args, i.e. the step size)
//! 0x06: args_len u16
//! 0x08: difficulty_mask u8   (bit per difficulty level; 0 bit = skip)
//! 0x09: pad u8
//! 0x0a: args [u8; args_len]
//! ```

use super::{FormatError, Reader};

/// Size of the fixed file header, before the sub-offset table.
pub const HEADER_SIZE: usize = 4;

/// Size of an instruction header, before its args.
pub const INSTR_HEADER_SIZE: usize = 10;

/// One decoded instruction plus its step size.
#[derive(Debug, Clone, Copy)]
pub struct EclInstr<'a> {
    pub time: u16,
    pub opcode: u16,
    pub difficulty_mask: u8,
    pub args: &'a [u8],
    /// Byte offset of this instruction within the blob.
    pub offset: usize,
    /// Byte offset of the next instruction within the blob.
    pub next_offset: usize,
}

/// A loaded ECL blob with a validated sub table.
#[derive(Debug)]
pub struct EclFile {
    bytes: Vec<u8>,
    sub_offsets: Vec<u32>,
}

impl EclFile {
    pub fn parse(bytes: Vec<u8>) -> Result<Self, FormatError> {
        let r = Reader::new(&bytes);
        let sub_count = r.u16_at(0).ok_or(FormatError::Truncated {
            need: HEADER_SIZE,
            have: bytes.len(),
        })? as usize;
        let table_end = HEADER_SIZE + sub_count * 4;
        if bytes.len() < table_end {
            return Err(FormatError::Truncated {
                need: table_end,
                have: bytes.len(),
            });
        }
        let mut sub_offsets = Vec::with_capacity(sub_count);
        for i in 0..sub_count {
            let off = r.u32_at(HEADER_SIZE + i * 4).unwrap_or(0);
            if off as usize >= bytes.len() {
                return Err(FormatError::BadOffset {
                    what: "sub",
                    offset: off as usize,
                });
            }
            sub_offsets.push(off);
        }
        Ok(Self { bytes, sub_offsets })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn sub_count(&self) -> usize {
        self.sub_offsets.len()
    }

    /// Byte offset of sub `id`, or `None` if out of range.
    pub fn sub_offset(&self, id: usize) -> Option<usize> {
        self.sub_offsets.get(id).map(|&o| o as usize)
    }

    /// Decode the instruction at an absolute blob offset.
    pub fn instr_at(&self, offset: usize) -> Option<EclInstr<'_>> {
        let r = Reader::new(&self.bytes);
        let time = r.u16_at(offset)?;
        let opcode = r.u16_at(offset + 2)?;
        let offset_to_next = r.u16_at(offset + 4)? as usize;
        let args_len = r.u16_at(offset + 6)? as usize;
        let difficulty_mask = r.u8_at(offset + 8)?;
        let args = r.slice_at(offset + INSTR_HEADER_SIZE, args_len)?;
        // A zero step would loop forever; treat it as a corrupt record.
        if offset_to_next < INSTR_HEADER_SIZE {
            return None;
        }
        Some(EclInstr {
            time,
            opcode,
            difficulty_mask,
            args,
            offset,
            next_offset: offset + offset_to_next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Arg, EclAsm, args, build_ecl_file};

    #[test]
    fn test_parse_rejects_short_table() {
        let mut blob = vec![0u8; 4];
        blob[0..2].copy_from_slice(&4u16.to_le_bytes());
        assert!(matches!(
            EclFile::parse(blob),
            Err(FormatError::Truncated { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_sub_offset() {
        let mut blob = vec![0u8; 8];
        blob[0..2].copy_from_slice(&1u16.to_le_bytes());
        blob[4..8].copy_from_slice(&0xFFFF_0000u32.to_le_bytes());
        assert!(matches!(
            EclFile::parse(blob),
            Err(FormatError::BadOffset { .. })
        ));
    }

    #[test]
    fn test_sub_table_and_instruction_walk() {
        let mut asm = EclAsm::new();
        asm.any(0, 7, &args(&[Arg::I32(42)]));
        asm.instr(5, 9, 0x01, &[]);
        let file = EclFile::parse(build_ecl_file(&[asm.finish()])).unwrap();

        assert_eq!(file.sub_count(), 1);
        let start = file.sub_offset(0).unwrap();
        let first = file.instr_at(start).unwrap();
        assert_eq!(first.time, 0);
        assert_eq!(first.opcode, 7);
        assert_eq!(first.difficulty_mask, 0x1F);
        assert_eq!(first.args.len(), 4);
        let second = file.instr_at(first.next_offset).unwrap();
        assert_eq!(second.time, 5);
        assert_eq!(second.difficulty_mask, 0x01);
        assert!(file.instr_at(second.next_offset).is_none());
        assert!(file.sub_offset(1).is_none());
    }
}
