// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Block device abstraction.
//!
//! On firmware this is backed by the `BlockIO` protocol (see [`crate::volume::scan`]). [`MemoryDisk`] backs it with
//! a byte vector instead, which is how the partition walking and signature detection are tested and fuzzed.

use alloc::vec::Vec;
use uefi::Status;

use crate::volume::ScanError;

/// A device that can be read in whole blocks.
pub trait BlockDevice {
    /// The size of one block in bytes.
    fn block_size(&self) -> usize;

    /// The index of the last addressable block.
    fn last_block(&self) -> u64;

    /// Returns true if the device is a partition rather than a whole disk.
    fn is_logical_partition(&self) -> bool;

    /// Reads `buf.len()` bytes starting at block `lba`.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the buffer is not a multiple of the block size, the read goes past the end of the
    /// device, or the device itself fails.
    fn read_blocks(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), ScanError>;
}

/// An in-memory block device.
pub struct MemoryDisk {
    /// The content of the disk.
    data: Vec<u8>,

    /// The block size of the disk.
    block_size: usize,

    /// If the disk pretends to be a partition.
    logical: bool,

    /// How many reads have been made.
    reads: usize,
}

impl MemoryDisk {
    /// Creates a whole disk from a byte vector.
    ///
    /// The vector is zero-padded up to a whole number of blocks. A block size of zero is treated as 512.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(mut data: Vec<u8>, block_size: usize) -> Self {
        let block_size = if block_size == 0 { 512 } else { block_size };
        let rem = data.len() % block_size;
        if rem != 0 || data.is_empty() {
            data.resize(data.len() + block_size - rem, 0);
        }
        Self {
            data,
            block_size,
            logical: false,
            reads: 0,
        }
    }

    /// Marks the disk as a logical partition.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn logical(mut self) -> Self {
        self.logical = true;
        self
    }

    /// The number of reads made so far.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn reads(&self) -> usize {
        self.reads
    }
}

impl BlockDevice for MemoryDisk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn last_block(&self) -> u64 {
        u64::try_from((self.data.len() / self.block_size).saturating_sub(1)).unwrap_or(u64::MAX)
    }

    fn is_logical_partition(&self) -> bool {
        self.logical
    }

    fn read_blocks(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), ScanError> {
        self.reads += 1;
        if buf.len() % self.block_size != 0 {
            return Err(ScanError::ReadFailed(Status::BAD_BUFFER_SIZE));
        }
        let start = usize::try_from(lba)
            .ok()
            .and_then(|lba| lba.checked_mul(self.block_size))
            .ok_or(ScanError::ReadFailed(Status::INVALID_PARAMETER))?;
        let src = start
            .checked_add(buf.len())
            .and_then(|end| self.data.get(start..end))
            .ok_or(ScanError::ReadFailed(Status::INVALID_PARAMETER))?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn test_memory_disk_read() {
        let mut data = vec![0u8; 2048];
        data[512] = 0xAB;
        let mut disk = MemoryDisk::new(data, 512);
        assert_eq!(disk.last_block(), 3);

        let mut buf = [0u8; 512];
        assert!(disk.read_blocks(1, &mut buf).is_ok());
        assert_eq!(buf[0], 0xAB);
        assert_eq!(disk.reads(), 1);
    }

    #[test]
    fn test_memory_disk_out_of_range() {
        let mut disk = MemoryDisk::new(vec![0u8; 1024], 512);
        let mut buf = [0u8; 512];
        assert!(matches!(
            disk.read_blocks(2, &mut buf),
            Err(ScanError::ReadFailed(_))
        ));
        let mut odd = [0u8; 100];
        assert!(disk.read_blocks(0, &mut odd).is_err());
    }

    #[test]
    fn test_memory_disk_padding() {
        let disk = MemoryDisk::new(vec![1u8; 700], 512);
        assert_eq!(disk.last_block(), 1);
        assert!(!disk.is_logical_partition());
        assert!(disk.logical().is_logical_partition());
    }
}
