// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! MBR partition tables and the extended partition chain.
//!
//! An extended partition holds a linked list of Extended Boot Records. Each EBR describes one logical partition
//! and optionally links to the next EBR, relative to the start of the extended partition. Since the chain comes
//! straight from the disk, [`EbrWalker`] remembers every EBR it visited and refuses to follow a link twice.

use alloc::{
    collections::{BTreeSet, VecDeque},
    vec,
    vec::Vec,
};
use bytemuck::{Pod, Zeroable};
use log::{debug, warn};

use crate::volume::{ScanError, block::BlockDevice, signature::has_boot_signature};

/// The offset of the partition table within the MBR or an EBR.
const TABLE_OFFSET: usize = 446;

/// The size of one partition table entry.
const ENTRY_SIZE: usize = 16;

/// The most EBRs that will be followed on one disk.
///
/// A chain longer than this is treated as malformed.
pub const MAX_EBR_LINKS: usize = 128;

/// The index given to the first logical partition. Primary partitions use 0 through 3.
pub const FIRST_LOGICAL_INDEX: usize = 4;

/// One entry of an MBR partition table, as laid out on disk.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct MbrEntry {
    /// `0x80` if the partition is active, `0x00` otherwise. Anything else is invalid.
    pub flags: u8,

    /// The legacy CHS address of the first sector.
    pub start_chs: [u8; 3],

    /// The partition type byte.
    pub part_type: u8,

    /// The legacy CHS address of the last sector.
    pub end_chs: [u8; 3],

    /// The first sector, relative to the start of the table's reference point.
    pub start_lba: u32,

    /// The number of sectors.
    pub size: u32,
}

impl MbrEntry {
    /// Returns true if the flag byte is one of the two legal values.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn has_valid_flags(&self) -> bool {
        self.flags == 0x00 || self.flags == 0x80
    }

    /// Returns true if the entry describes an actual range of sectors.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn is_used(&self) -> bool {
        self.start_lba != 0 && self.size != 0
    }

    /// Returns true if the entry links to an extended partition.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn is_extended(&self) -> bool {
        is_extended(self.part_type)
    }
}

/// Returns true for the DOS, LBA and Linux extended partition types.
#[must_use = "Has no effect if the result is unused"]
pub const fn is_extended(part_type: u8) -> bool {
    matches!(part_type, 0x05 | 0x0f | 0x85)
}

/// Reads the four table entries of a sector. Returns [`None`] if the sector is too short.
#[must_use = "Has no effect if the result is unused"]
pub fn entries(sector: &[u8]) -> Option<[MbrEntry; 4]> {
    let table = sector.get(TABLE_OFFSET..TABLE_OFFSET + 4 * ENTRY_SIZE)?;
    let mut entries = [MbrEntry::default(); 4];
    for (entry, raw) in entries.iter_mut().zip(table.chunks_exact(ENTRY_SIZE)) {
        let mut read: MbrEntry = bytemuck::pod_read_unaligned(raw);
        read.start_lba = u32::from_le(read.start_lba);
        read.size = u32::from_le(read.size);
        *entry = read;
    }
    Some(entries)
}

/// Extracts an MBR partition table from a boot sector.
///
/// The sector must carry the `0xAA55` signature, at least one entry must be in use, and every flag byte must be
/// valid. The last rule keeps FAT boot sectors from being mistaken for partition tables.
#[must_use = "Has no effect if the result is unused"]
pub fn parse_table(sector: &[u8]) -> Option<[MbrEntry; 4]> {
    if !has_boot_signature(sector) {
        return None;
    }
    let table = entries(sector)?;
    (table.iter().any(MbrEntry::is_used) && table.iter().all(MbrEntry::has_valid_flags)).then_some(table)
}

/// A logical partition found inside an extended partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogicalPartition {
    /// The MBR partition index, starting at [`FIRST_LOGICAL_INDEX`].
    pub index: usize,

    /// The absolute block offset of the partition on the whole disk.
    pub offset: u64,

    /// The EBR entry describing the partition.
    pub entry: MbrEntry,
}

/// Walks the EBR chain of one extended partition.
///
/// Yields every logical partition in chain order. The walk ends quietly at the first unreadable or unsigned EBR,
/// or at an EBR without a link. A link to an already visited EBR, or a chain longer than [`MAX_EBR_LINKS`],
/// yields one [`ScanError::MalformedPartitionTable`] and then ends the walk.
pub struct EbrWalker<'a> {
    /// The whole disk.
    device: &'a mut dyn BlockDevice,

    /// The start of the extended partition. Links are relative to this.
    base: u64,

    /// The EBR to read next.
    next: Option<u64>,

    /// Every EBR read so far.
    visited: BTreeSet<u64>,

    /// Logical partitions found in the current EBR but not yet yielded.
    pending: VecDeque<LogicalPartition>,

    /// The index the next logical partition will get.
    index: usize,

    /// One block of scratch space.
    buf: Vec<u8>,

    /// Set once an error has been yielded.
    failed: bool,
}

impl<'a> EbrWalker<'a> {
    /// Starts a walk at the extended partition described by `entry`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(device: &'a mut dyn BlockDevice, entry: &MbrEntry) -> Self {
        let block_size = device.block_size().max(512);
        let base = u64::from(entry.start_lba);
        Self {
            device,
            base,
            next: (base != 0).then_some(base),
            visited: BTreeSet::new(),
            pending: VecDeque::new(),
            index: FIRST_LOGICAL_INDEX,
            buf: vec![0; block_size],
            failed: false,
        }
    }

    /// Reads the next EBR in the chain, queueing its logical partitions.
    ///
    /// Returns `Ok(false)` once the chain has ended.
    fn advance(&mut self) -> Result<bool, ScanError> {
        let Some(current) = self.next.take() else {
            return Ok(false);
        };

        if !self.visited.insert(current) || self.visited.len() > MAX_EBR_LINKS {
            return Err(ScanError::MalformedPartitionTable { offset: current });
        }

        if let Err(e) = self.device.read_blocks(current, &mut self.buf) {
            debug!("Stopping EBR walk at block {current}: {e}");
            return Ok(false);
        }
        if !has_boot_signature(&self.buf) {
            return Ok(false);
        }
        let Some(table) = entries(&self.buf) else {
            return Ok(false);
        };

        for entry in table {
            if !entry.has_valid_flags() || !entry.is_used() {
                break;
            }
            if entry.is_extended() {
                self.next = Some(self.base + u64::from(entry.start_lba));
                break;
            }
            self.pending.push_back(LogicalPartition {
                index: self.index,
                offset: current + u64::from(entry.start_lba),
                entry,
            });
            self.index += 1;
        }

        Ok(true)
    }
}

impl Iterator for EbrWalker<'_> {
    type Item = Result<LogicalPartition, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(partition) = self.pending.pop_front() {
                return Some(Ok(partition));
            }
            if self.failed {
                return None;
            }
            match self.advance() {
                Ok(true) => (),
                Ok(false) => return None,
                Err(e) => {
                    warn!("{e}");
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::volume::block::MemoryDisk;

    fn write_entry(disk: &mut [u8], sector: usize, slot: usize, entry: (u8, u8, u32, u32)) {
        let at = sector * 512 + TABLE_OFFSET + slot * ENTRY_SIZE;
        disk[at] = entry.0;
        disk[at + 4] = entry.1;
        disk[at + 8..at + 12].copy_from_slice(&entry.2.to_le_bytes());
        disk[at + 12..at + 16].copy_from_slice(&entry.3.to_le_bytes());
    }

    fn sign(disk: &mut [u8], sector: usize) {
        disk[sector * 512 + 510] = 0x55;
        disk[sector * 512 + 511] = 0xAA;
    }

    /// A disk whose extended partition starts at sector 100 and holds `n` logical partitions, each EBR 10 sectors
    /// after the last.
    fn chain(n: usize) -> (Vec<u8>, MbrEntry) {
        let mut disk = vec![0u8; 512 * (100 + 10 * n + 10)];
        for i in 0..n {
            let ebr = 100 + 10 * i;
            sign(&mut disk, ebr);
            write_entry(&mut disk, ebr, 0, (0, 0x83, 1, 8));
            if i + 1 < n {
                let link = u32::try_from(10 * (i + 1)).unwrap_or_default();
                write_entry(&mut disk, ebr, 1, (0, 0x05, link, 10));
            }
        }
        let extended = MbrEntry {
            part_type: 0x0f,
            start_lba: 100,
            size: u32::try_from(10 * n).unwrap_or_default(),
            ..MbrEntry::default()
        };
        (disk, extended)
    }

    #[test]
    fn test_parse_table() {
        let mut sector = vec![0u8; 512];
        assert!(parse_table(&sector).is_none());
        sign(&mut sector, 0);
        assert!(parse_table(&sector).is_none());
        write_entry(&mut sector, 0, 0, (0x80, 0x07, 2048, 4096));
        let table = parse_table(&sector);
        assert_eq!(table.map(|t| t[0].start_lba), Some(2048));
        assert_eq!(table.map(|t| t[0].size), Some(4096));
        write_entry(&mut sector, 0, 3, (0x12, 0x00, 0, 0));
        assert!(parse_table(&sector).is_none());
    }

    #[test]
    fn test_chain_terminates() {
        for n in 1..6 {
            let (disk, extended) = chain(n);
            let mut disk = MemoryDisk::new(disk, 512);
            let found: Vec<_> = EbrWalker::new(&mut disk, &extended).collect();
            assert_eq!(found.len(), n);
            assert!(found.iter().all(Result::is_ok));
            assert!(disk.reads() <= n + 1);
        }
    }

    #[test]
    fn test_chain_offsets_and_indices() {
        let (disk, extended) = chain(3);
        let mut disk = MemoryDisk::new(disk, 512);
        let found: Vec<_> = EbrWalker::new(&mut disk, &extended)
            .filter_map(Result::ok)
            .map(|p| (p.index, p.offset))
            .collect();
        assert_eq!(found, [(4, 101), (5, 111), (6, 121)]);
    }

    #[test]
    fn test_unsigned_ebr_stops() {
        let (mut disk, extended) = chain(3);
        disk[110 * 512 + 510] = 0;
        let mut disk = MemoryDisk::new(disk, 512);
        let found: Vec<_> = EbrWalker::new(&mut disk, &extended).collect();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_cycle_is_malformed() {
        let (mut disk, extended) = chain(2);
        // link the second EBR to itself
        write_entry(&mut disk, 110, 1, (0, 0x05, 10, 10));
        let mut disk = MemoryDisk::new(disk, 512);
        let found: Vec<_> = EbrWalker::new(&mut disk, &extended).collect();
        assert_eq!(found.len(), 3);
        assert!(matches!(
            found.last(),
            Some(Err(ScanError::MalformedPartitionTable { offset: 110 }))
        ));
    }

    #[test]
    fn test_self_loop_is_malformed() {
        let mut disk = vec![0u8; 512 * 200];
        sign(&mut disk, 100);
        write_entry(&mut disk, 100, 0, (0, 0x05, 10, 10));
        sign(&mut disk, 110);
        write_entry(&mut disk, 110, 0, (0, 0x05, 10, 10));
        let extended = MbrEntry {
            part_type: 0x05,
            start_lba: 100,
            size: 20,
            ..MbrEntry::default()
        };
        let mut disk = MemoryDisk::new(disk, 512);
        let found: Vec<_> = EbrWalker::new(&mut disk, &extended).collect();
        assert!(matches!(
            found.as_slice(),
            [Err(ScanError::MalformedPartitionTable { offset: 110 })]
        ));
    }

    proptest! {
        #[test]
        fn doesnt_panic(x in proptest::collection::vec(any::<u8>(), 0..8192), start in 0u32..16) {
            let extended = MbrEntry { part_type: 0x05, start_lba: start, size: 1, ..MbrEntry::default() };
            let mut disk = MemoryDisk::new(x, 512);
            let found = EbrWalker::new(&mut disk, &extended).count();
            prop_assert!(found <= MAX_EBR_LINKS * 4 + 1);
        }
    }
}
