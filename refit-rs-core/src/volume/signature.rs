// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Filesystem identification from on-disk signatures.
//!
//! The checks run in a fixed order and the first one that matches wins. Every check is guarded by the length of
//! the sample, so a short buffer simply matches fewer formats.

use uefi::Guid;

use crate::volume::{FsType, VolumeSerial, guid};

/// The number of bytes sampled from the start of every volume.
pub const SAMPLE_SIZE: usize = 69632;

/// The superblock offset shared by ext* and HFS+.
const SUPERBLOCK: usize = 1024;

/// The superblock offset shared by `ReiserFS` and Btrfs.
const HIGH_SUPERBLOCK: usize = 65536;

/// Everything besides the sample itself that detection depends on.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetectContext {
    /// The block size of the device.
    pub block_size: usize,

    /// If the device is a partition rather than a whole disk.
    pub is_logical_partition: bool,

    /// The partition type GUID, if already known.
    pub part_type: Option<Guid>,

    /// If the device path carries a vendor node with the APFS GUID.
    pub apfs_vendor_node: bool,

    /// If the firmware vendor is Apple.
    pub apple_firmware: bool,
}

/// The result of filesystem detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Detection {
    /// The filesystem type.
    pub fs_type: FsType,

    /// The filesystem serial, if the format has one.
    pub serial: VolumeSerial,

    /// The partition type GUID, filled in if it was unknown and the volume looks like APFS.
    pub part_type: Option<Guid>,
}

/// Reads a little endian `u16`.
pub(crate) fn le_u16(buf: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_le_bytes(
        buf.get(offset..offset.checked_add(2)?)?.try_into().ok()?,
    ))
}

/// Reads a little endian `u32`.
pub(crate) fn le_u32(buf: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_le_bytes(
        buf.get(offset..offset.checked_add(4)?)?.try_into().ok()?,
    ))
}

/// Reads a little endian `u64`.
fn le_u64(buf: &[u8], offset: usize) -> Option<u64> {
    Some(u64::from_le_bytes(
        buf.get(offset..offset.checked_add(8)?)?.try_into().ok()?,
    ))
}

/// Reads a big endian `u64`.
fn be_u64(buf: &[u8], offset: usize) -> Option<u64> {
    Some(u64::from_be_bytes(
        buf.get(offset..offset.checked_add(8)?)?.try_into().ok()?,
    ))
}

/// Reads a 16 byte UUID.
fn uuid_at(buf: &[u8], offset: usize) -> VolumeSerial {
    buf.get(offset..offset + 16)
        .and_then(|x| x.try_into().ok())
        .map_or(VolumeSerial::None, VolumeSerial::Uuid)
}

/// Returns true if `pattern` is found at exactly `offset`.
pub(crate) fn bytes_at(buf: &[u8], offset: usize, pattern: &[u8]) -> bool {
    offset
        .checked_add(pattern.len())
        .and_then(|end| buf.get(offset..end))
        == Some(pattern)
}

/// Returns true if `pattern` occurs entirely within the first `limit` bytes.
pub(crate) fn find_within(buf: &[u8], limit: usize, pattern: &[u8]) -> bool {
    if pattern.is_empty() {
        return true;
    }
    buf[..limit.min(buf.len())]
        .windows(pattern.len())
        .any(|w| w == pattern)
}

/// Returns true if the sector ends in the `0xAA55` boot signature.
pub(crate) fn has_boot_signature(buf: &[u8]) -> bool {
    le_u16(buf, 510) == Some(0xAA55)
}

/// ext2, ext3 or ext4.
fn detect_ext(buf: &[u8]) -> Option<(FsType, VolumeSerial)> {
    if buf.len() < SUPERBLOCK + 100 || le_u16(buf, SUPERBLOCK + 56)? != 0xEF53 {
        return None;
    }

    let compat = le_u32(buf, SUPERBLOCK + 92)?;
    let incompat = le_u32(buf, SUPERBLOCK + 96)?;

    // extents or flex_bg, then the journal
    let fs_type = if incompat & 0x0040 != 0 || incompat & 0x0200 != 0 {
        FsType::Ext4
    } else if compat & 0x0004 != 0 {
        FsType::Ext3
    } else {
        FsType::Ext2
    };

    Some((fs_type, uuid_at(buf, SUPERBLOCK + 104)))
}

/// `ReiserFS` 3.5 and 3.6, including the journal relocation variant.
fn detect_reiserfs(buf: &[u8]) -> Option<(FsType, VolumeSerial)> {
    let magic = HIGH_SUPERBLOCK + 52;
    if buf.len() < HIGH_SUPERBLOCK + 100 {
        return None;
    }
    (bytes_at(buf, magic, b"ReIsErFs")
        || bytes_at(buf, magic, b"ReIsEr2Fs")
        || bytes_at(buf, magic, b"ReIsEr3Fs"))
    .then(|| (FsType::ReiserFs, uuid_at(buf, HIGH_SUPERBLOCK + 84)))
}

/// Btrfs.
fn detect_btrfs(buf: &[u8]) -> Option<(FsType, VolumeSerial)> {
    bytes_at(buf, HIGH_SUPERBLOCK + 64, b"_BHRfS_M").then_some((FsType::Btrfs, VolumeSerial::None))
}

/// XFS.
fn detect_xfs(buf: &[u8]) -> Option<(FsType, VolumeSerial)> {
    (buf.len() >= 512 && bytes_at(buf, 0, b"XFSB")).then_some((FsType::Xfs, VolumeSerial::None))
}

/// JFS.
fn detect_jfs(buf: &[u8]) -> Option<(FsType, VolumeSerial)> {
    bytes_at(buf, 32768, b"JFS1").then_some((FsType::Jfs, VolumeSerial::None))
}

/// HFS+ and HFSX.
///
/// The serial is the 64-bit volume identifier that macOS keeps in the last two words of `finderInfo`.
fn detect_hfsplus(buf: &[u8]) -> Option<(FsType, VolumeSerial)> {
    let magic = le_u16(buf, SUPERBLOCK)?;
    if magic != 0x2B48 && magic != 0x5848 {
        return None;
    }
    let serial = be_u64(buf, SUPERBLOCK + 0x50 + 24)
        .filter(|&x| x != 0)
        .map_or(VolumeSerial::None, VolumeSerial::Hfs);
    Some((FsType::Hfsplus, serial))
}

/// Everything that ends its first sector with `0xAA55`: NTFS, FAT, `ExFAT`, and plain MBR disks.
///
/// Once the boot signature is present this always decides the outcome, even if that outcome is unknown.
fn detect_boot_sector(buf: &[u8], ctx: &DetectContext) -> Option<(FsType, VolumeSerial)> {
    if buf.len() < 512 || !has_boot_signature(buf) {
        return None;
    }

    let serial32 = |offset| le_u32(buf, offset).map_or(VolumeSerial::None, VolumeSerial::Fat);

    let found = if bytes_at(buf, 3, b"NTFS    ") {
        (
            FsType::Ntfs,
            le_u64(buf, 0x48).map_or(VolumeSerial::None, VolumeSerial::Ntfs),
        )
    } else if bytes_at(buf, 0x36, b"FAT12   ") || bytes_at(buf, 0x36, b"FAT16   ") {
        (FsType::Fat, serial32(0x27))
    } else if bytes_at(buf, 0x52, b"FAT32   ") {
        (FsType::Fat, serial32(0x43))
    } else if find_within(buf, 512, b"EXFAT") {
        (
            FsType::ExFat,
            le_u32(buf, 0x64).map_or(VolumeSerial::None, VolumeSerial::ExFat),
        )
    } else if !ctx.is_logical_partition {
        (FsType::WholeDisk, VolumeSerial::None)
    } else {
        (FsType::Unknown, VolumeSerial::None)
    };

    Some(found)
}

/// Identifies the filesystem in a sample read from the start of a volume.
///
/// Classification always completes. Input that matches nothing yields [`FsType::Unknown`] and no serial.
#[must_use = "Has no effect if the result is unused"]
pub fn detect_filesystem(buf: &[u8], ctx: &DetectContext) -> Detection {
    let mut detection = Detection {
        part_type: ctx.part_type,
        ..Detection::default()
    };

    let signature = detect_ext(buf)
        .or_else(|| detect_reiserfs(buf))
        .or_else(|| detect_btrfs(buf))
        .or_else(|| detect_xfs(buf))
        .or_else(|| detect_jfs(buf))
        .or_else(|| detect_hfsplus(buf))
        .or_else(|| detect_boot_sector(buf, ctx));

    if let Some((fs_type, serial)) = signature {
        detection.fs_type = fs_type;
        detection.serial = serial;
        return detection;
    }

    if ctx.apfs_vendor_node || ctx.part_type == Some(guid::APFS) {
        detection.fs_type = FsType::Apfs;
        if detection.part_type.is_none() {
            detection.part_type = Some(guid::APFS);
        }
    } else if ctx.part_type == Some(guid::HFS) {
        detection.fs_type = FsType::Hfsplus;
    } else if ctx.block_size == 2048 {
        detection.fs_type = FsType::Iso9660;
    } else if ctx.apple_firmware {
        detection.fs_type = FsType::Apfs;
    }

    detection
}

#[cfg(test)]
mod tests {
    use alloc::{vec, vec::Vec};

    use proptest::prelude::*;

    use super::*;

    fn sample() -> Vec<u8> {
        vec![0u8; SAMPLE_SIZE]
    }

    fn put(buf: &mut [u8], offset: usize, bytes: &[u8]) {
        buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn partition() -> DetectContext {
        DetectContext {
            block_size: 512,
            is_logical_partition: true,
            ..DetectContext::default()
        }
    }

    /// One canonical sample for every signature-detected filesystem.
    fn corpus() -> Vec<(FsType, Vec<u8>)> {
        let mut ext4 = sample();
        put(&mut ext4, 1024 + 56, &0xEF53u16.to_le_bytes());
        put(&mut ext4, 1024 + 96, &0x0040u32.to_le_bytes());

        let mut ext3 = sample();
        put(&mut ext3, 1024 + 56, &0xEF53u16.to_le_bytes());
        put(&mut ext3, 1024 + 92, &0x0004u32.to_le_bytes());

        let mut ext2 = sample();
        put(&mut ext2, 1024 + 56, &0xEF53u16.to_le_bytes());

        let mut reiser = sample();
        put(&mut reiser, 65536 + 52, b"ReIsEr2Fs");

        let mut btrfs = sample();
        put(&mut btrfs, 65536 + 64, b"_BHRfS_M");

        let mut xfs = sample();
        put(&mut xfs, 0, b"XFSB");

        let mut jfs = sample();
        put(&mut jfs, 32768, b"JFS1");

        let mut hfs = sample();
        put(&mut hfs, 1024, b"H+");

        let mut ntfs = sample();
        put(&mut ntfs, 3, b"NTFS    ");
        put(&mut ntfs, 510, &[0x55, 0xAA]);

        let mut fat16 = sample();
        put(&mut fat16, 0x36, b"FAT16   ");
        put(&mut fat16, 510, &[0x55, 0xAA]);

        let mut fat32 = sample();
        put(&mut fat32, 0x52, b"FAT32   ");
        put(&mut fat32, 510, &[0x55, 0xAA]);

        let mut exfat = sample();
        put(&mut exfat, 3, b"EXFAT   ");
        put(&mut exfat, 510, &[0x55, 0xAA]);

        vec![
            (FsType::Ext4, ext4),
            (FsType::Ext3, ext3),
            (FsType::Ext2, ext2),
            (FsType::ReiserFs, reiser),
            (FsType::Btrfs, btrfs),
            (FsType::Xfs, xfs),
            (FsType::Jfs, jfs),
            (FsType::Hfsplus, hfs),
            (FsType::Ntfs, ntfs),
            (FsType::Fat, fat16),
            (FsType::Fat, fat32),
            (FsType::ExFat, exfat),
        ]
    }

    #[test]
    fn test_corpus_is_unambiguous() {
        for (expected, buf) in corpus() {
            let detection = detect_filesystem(&buf, &partition());
            assert_eq!(detection.fs_type, expected);
        }
    }

    #[test]
    fn test_ext_uuid() {
        let mut buf = sample();
        put(&mut buf, 1024 + 56, &0xEF53u16.to_le_bytes());
        put(&mut buf, 1024 + 104, &[7; 16]);
        let detection = detect_filesystem(&buf, &partition());
        assert_eq!(detection.serial, VolumeSerial::Uuid([7; 16]));
    }

    #[test]
    fn test_fat_serials() {
        let mut buf = sample();
        put(&mut buf, 0x52, b"FAT32   ");
        put(&mut buf, 0x43, &0xDEAD_BEEFu32.to_le_bytes());
        put(&mut buf, 510, &[0x55, 0xAA]);
        let detection = detect_filesystem(&buf, &partition());
        assert_eq!(detection.serial, VolumeSerial::Fat(0xDEAD_BEEF));

        let mut buf = sample();
        put(&mut buf, 3, b"NTFS    ");
        put(&mut buf, 0x48, &0x0102_0304_0506_0708u64.to_le_bytes());
        put(&mut buf, 510, &[0x55, 0xAA]);
        let detection = detect_filesystem(&buf, &partition());
        assert_eq!(detection.serial, VolumeSerial::Ntfs(0x0102_0304_0506_0708));
    }

    #[test]
    fn test_hfs_serial() {
        let mut buf = sample();
        put(&mut buf, 1024, b"HX");
        put(&mut buf, 1024 + 0x50 + 24, &0x1122_3344_5566_7788u64.to_be_bytes());
        let detection = detect_filesystem(&buf, &partition());
        assert_eq!(detection.fs_type, FsType::Hfsplus);
        assert_eq!(detection.serial, VolumeSerial::Hfs(0x1122_3344_5566_7788));
    }

    #[test]
    fn test_whole_disk() {
        let mut buf = sample();
        put(&mut buf, 510, &[0x55, 0xAA]);
        let disk = DetectContext {
            block_size: 512,
            ..DetectContext::default()
        };
        assert_eq!(detect_filesystem(&buf, &disk).fs_type, FsType::WholeDisk);
        assert_eq!(detect_filesystem(&buf, &partition()).fs_type, FsType::Unknown);
    }

    #[test]
    fn test_fallbacks() {
        let buf = sample();

        let optical = DetectContext {
            block_size: 2048,
            ..partition()
        };
        assert_eq!(detect_filesystem(&buf, &optical).fs_type, FsType::Iso9660);

        let vendor = DetectContext {
            apfs_vendor_node: true,
            ..partition()
        };
        let detection = detect_filesystem(&buf, &vendor);
        assert_eq!(detection.fs_type, FsType::Apfs);
        assert_eq!(detection.part_type, Some(guid::APFS));

        let hfs_type = DetectContext {
            part_type: Some(guid::HFS),
            ..partition()
        };
        assert_eq!(detect_filesystem(&buf, &hfs_type).fs_type, FsType::Hfsplus);

        let apple = DetectContext {
            apple_firmware: true,
            ..partition()
        };
        assert_eq!(detect_filesystem(&buf, &apple).fs_type, FsType::Apfs);

        assert_eq!(detect_filesystem(&buf, &partition()).fs_type, FsType::Unknown);
        assert_eq!(detect_filesystem(&buf, &partition()).serial, VolumeSerial::None);
    }

    #[test]
    fn test_short_buffer() {
        let buf = [0x55u8; 100];
        assert_eq!(detect_filesystem(&buf, &partition()).fs_type, FsType::Unknown);
    }

    #[test]
    fn test_find_within() {
        let buf = b"....Geom....";
        assert!(find_within(buf, 12, b"Geom"));
        assert!(!find_within(buf, 7, b"Geom"));
        assert!(!find_within(buf, 100, b"Hard"));
    }

    proptest! {
        #[test]
        fn doesnt_panic(x in any::<Vec<u8>>(), logical in any::<bool>(), block in 0usize..8192) {
            let ctx = DetectContext { block_size: block, is_logical_partition: logical, ..DetectContext::default() };
            let _ = detect_filesystem(&x, &ctx);
        }
    }
}
