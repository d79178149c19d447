// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Legacy boot code detection.
//!
//! The first sectors of a volume are matched against the boot sectors of well-known legacy loaders, which gives
//! the menu an OS name and icon for BIOS-bootable volumes. The same sample feeds filesystem detection, so every
//! volume is only read once.

use alloc::{vec, vec::Vec};
use log::debug;
use uefi::Status;

use crate::volume::{
    FsType, ScanError,
    block::BlockDevice,
    mbr::{self, MbrEntry},
    signature::{
        DetectContext, Detection, SAMPLE_SIZE, bytes_at, detect_filesystem, find_within, has_boot_signature,
        le_u32,
    },
};

/// The window some loaders are searched for in, which is larger than one 512 byte sector.
pub const SECTOR_SIZE: usize = 4096;

/// The kind of legacy (BIOS) boot support the firmware offers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LegacyType {
    /// No legacy boot support. Boot code is not scanned for.
    #[default]
    None,
    /// Apple's built-in BIOS compatibility.
    Mac,
    /// A UEFI Compatibility Support Module exposing the `LegacyBios` protocol.
    Uefi,
}

impl LegacyType {
    /// Returns true if legacy boot code can be launched at all.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn is_supported(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Boot code found in the first sectors of a volume.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootCode {
    /// If the sector is a plausible, non-empty boot sector.
    pub bootable: bool,

    /// If boot code for a known loader was found and not ruled out.
    pub has_boot_code: bool,

    /// Icon names for the detected loader, most specific first.
    pub os_icon_name: Option<&'static str>,

    /// A display name for the detected loader.
    pub os_name: Option<&'static str>,

    /// The MBR partition table, if the sector carries one.
    pub mbr_table: Option<[MbrEntry; 4]>,
}

/// Everything learned from one sample of a volume.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sample {
    /// The filesystem.
    pub detection: Detection,

    /// The legacy boot code.
    pub boot: BootCode,
}

/// A known boot sector.
struct Signature {
    /// Returns true if the sample holds this loader.
    matches: fn(&[u8]) -> bool,

    /// The icon names of the loader.
    icon: &'static str,

    /// The display name of the loader.
    name: &'static str,
}

/// Known boot sectors. The first match wins.
const SIGNATURES: &[Signature] = &[
    Signature {
        matches: |b| {
            bytes_at(b, 2, b"LILO")
                || bytes_at(b, 6, b"LILO")
                || bytes_at(b, 3, b"SYSLINUX")
                || find_within(b, SECTOR_SIZE, b"ISOLINUX")
        },
        icon: "linux",
        name: "Linux (Legacy)",
    },
    Signature {
        matches: |b| find_within(b, 512, b"Geom\0Hard Disk\0Read\0 Error"),
        icon: "grub,linux",
        name: "Linux (Legacy)",
    },
    Signature {
        matches: |b| {
            (le_u32(b, 502) == Some(0) && le_u32(b, 506) == Some(50000) && has_boot_signature(b))
                || find_within(b, SECTOR_SIZE, b"Starting the BTX loader")
        },
        icon: "freebsd",
        name: "FreeBSD (Legacy)",
    },
    Signature {
        matches: |b| {
            has_boot_signature(b)
                && find_within(b, SECTOR_SIZE, b"Boot loader too large")
                && find_within(b, SECTOR_SIZE, b"I/O error loading boot loader")
        },
        icon: "freebsd",
        name: "FreeBSD (Legacy)",
    },
    Signature {
        matches: |b| find_within(b, 512, b"!Loading") || find_within(b, SECTOR_SIZE, b"/cdboot\0/CDBOOT\0"),
        icon: "openbsd",
        name: "OpenBSD (Legacy)",
    },
    Signature {
        matches: |b| find_within(b, 512, b"Not a bootxx image") || le_u32(b, 1028) == Some(0x7886_b6d1),
        icon: "netbsd",
        name: "NetBSD (Legacy)",
    },
    Signature {
        matches: |b| find_within(b, SECTOR_SIZE, b"NTLDR"),
        icon: "win",
        name: "Windows (NT/XP)",
    },
    Signature {
        matches: |b| find_within(b, SECTOR_SIZE, b"BOOTMGR"),
        icon: "win8,win",
        name: "Windows (Legacy)",
    },
    Signature {
        matches: |b| find_within(b, 512, b"CPUBOOT SYS") || find_within(b, 512, b"KERNEL  SYS"),
        icon: "freedos",
        name: "FreeDOS (Legacy)",
    },
    Signature {
        matches: |b| find_within(b, 512, b"OS2LDR") || find_within(b, 512, b"OS2BOOT"),
        icon: "ecomstation",
        name: "eComStation (Legacy)",
    },
    Signature {
        matches: |b| find_within(b, 512, b"Be Boot Loader"),
        icon: "beos",
        name: "BeOS (Legacy)",
    },
    Signature {
        matches: |b| find_within(b, 512, b"yT Boot Loader"),
        icon: "zeta,beos",
        name: "ZETA (Legacy)",
    },
    Signature {
        matches: |b| {
            find_within(b, 512, b"\x04beos\x06system\x05zbeos")
                || find_within(b, 512, b"\x06system\x0chaiku_loader")
        },
        icon: "haiku,beos",
        name: "Haiku (Legacy)",
    },
];

/// Boot messages of the placeholder boot sectors that formatting tools write onto FAT volumes.
const DUMMY_FAT_MESSAGES: &[&[u8]] = &[
    // newfs_msdos
    b"Non-system disk",
    // mkdosfs
    b"This is not a bootable disk",
    // Windows
    b"Press any key to restart",
];

/// Scans a boot sector sample for legacy boot code.
///
/// `has_windows_files` is only called for NTFS volumes on Apple firmware, which needs actual Windows loader files
/// before it will boot an NTFS boot sector.
#[must_use = "Has no effect if the result is unused"]
pub fn scan_boot_sector(
    buf: &[u8],
    legacy: LegacyType,
    fs_type: FsType,
    has_windows_files: impl FnOnce() -> bool,
) -> BootCode {
    let mut boot = BootCode::default();
    if !legacy.is_supported() {
        return boot;
    }

    if has_boot_signature(buf) && buf.first().is_some_and(|&x| x != 0) && !find_within(buf, 512, b"EXFAT") {
        boot.bootable = true;
        boot.has_boot_code = true;
    }

    if let Some(signature) = SIGNATURES.iter().find(|s| (s.matches)(buf)) {
        boot.has_boot_code = true;
        boot.os_icon_name = Some(signature.icon);
        boot.os_name = Some(signature.name);
    }

    if boot.has_boot_code {
        if legacy == LegacyType::Mac && fs_type == FsType::Ntfs {
            boot.has_boot_code = has_windows_files();
            if !boot.has_boot_code {
                boot.os_icon_name = Some("win8,win");
                boot.os_name = Some("Windows (UEFI)");
            }
        } else if DUMMY_FAT_MESSAGES.iter().any(|msg| find_within(buf, 512, msg)) {
            boot.has_boot_code = false;
        }
    }

    boot.mbr_table = mbr::parse_table(buf);

    boot
}

/// Reads up to [`SAMPLE_SIZE`] bytes from block `offset` of a device.
///
/// The sample is shortened if the device ends sooner.
///
/// # Errors
///
/// May return an `Error` if the block size is larger than the sample, or the read fails.
pub fn read_sample(device: &mut dyn BlockDevice, offset: u64) -> Result<Vec<u8>, ScanError> {
    let block_size = device.block_size();
    if block_size == 0 || block_size > SAMPLE_SIZE {
        return Err(ScanError::BlockSizeTooLarge(block_size));
    }

    let remaining = device.last_block().saturating_add(1).saturating_sub(offset);
    let blocks = usize::try_from(remaining)
        .unwrap_or(usize::MAX)
        .min(SAMPLE_SIZE / block_size);
    if blocks == 0 {
        return Err(ScanError::ReadFailed(Status::END_OF_MEDIA));
    }

    let mut buf = vec![0; blocks * block_size];
    device.read_blocks(offset, &mut buf)?;
    Ok(buf)
}

/// Samples a volume, identifying its filesystem and any legacy boot code.
///
/// A failed read is not an error here. The volume is simply not bootable, and its filesystem is identified from
/// the partition type and block size alone.
#[must_use = "Has no effect if the result is unused"]
pub fn scan_volume_bootcode(
    device: &mut dyn BlockDevice,
    offset: u64,
    ctx: &DetectContext,
    legacy: LegacyType,
    has_windows_files: impl FnOnce() -> bool,
) -> Sample {
    match read_sample(device, offset) {
        Ok(buf) => {
            let detection = detect_filesystem(&buf, ctx);
            let boot = scan_boot_sector(&buf, legacy, detection.fs_type, has_windows_files);
            if boot.has_boot_code {
                debug!("Found legacy boot code ({})", boot.os_name.unwrap_or("unknown"));
            }
            Sample { detection, boot }
        }
        Err(e) => {
            debug!("Could not sample volume at block {offset}: {e}");
            Sample {
                detection: detect_filesystem(&[], ctx),
                boot: BootCode::default(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::volume::block::MemoryDisk;

    fn sector(fill: &[(usize, &[u8])]) -> Vec<u8> {
        let mut buf = vec![0u8; 512];
        buf[0] = 0xEB;
        buf[510] = 0x55;
        buf[511] = 0xAA;
        for (offset, bytes) in fill {
            buf[*offset..*offset + bytes.len()].copy_from_slice(bytes);
        }
        buf
    }

    #[test]
    fn test_no_legacy_support() {
        let buf = sector(&[(3, b"SYSLINUX")]);
        let boot = scan_boot_sector(&buf, LegacyType::None, FsType::Fat, || true);
        assert_eq!(boot, BootCode::default());
    }

    #[test]
    fn test_linux_signatures() {
        let buf = sector(&[(3, b"SYSLINUX")]);
        let boot = scan_boot_sector(&buf, LegacyType::Mac, FsType::Fat, || true);
        assert!(boot.bootable);
        assert!(boot.has_boot_code);
        assert_eq!(boot.os_name, Some("Linux (Legacy)"));
        assert_eq!(boot.os_icon_name, Some("linux"));

        let buf = sector(&[(100, b"Geom\0Hard Disk\0Read\0 Error")]);
        let boot = scan_boot_sector(&buf, LegacyType::Uefi, FsType::Unknown, || true);
        assert_eq!(boot.os_icon_name, Some("grub,linux"));
    }

    #[test]
    fn test_first_match_wins() {
        let buf = sector(&[(3, b"SYSLINUX"), (200, b"BOOTMGR")]);
        let boot = scan_boot_sector(&buf, LegacyType::Mac, FsType::Fat, || true);
        assert_eq!(boot.os_name, Some("Linux (Legacy)"));
    }

    #[test]
    fn test_dummy_fat() {
        let buf = sector(&[(200, b"BOOTMGR"), (300, b"Press any key to restart")]);
        let boot = scan_boot_sector(&buf, LegacyType::Mac, FsType::Fat, || true);
        assert!(!boot.has_boot_code);
        assert_eq!(boot.os_name, Some("Windows (Legacy)"));
    }

    #[test]
    fn test_ntfs_on_mac() {
        let buf = sector(&[(3, b"NTFS    "), (200, b"BOOTMGR")]);
        let boot = scan_boot_sector(&buf, LegacyType::Mac, FsType::Ntfs, || false);
        assert!(!boot.has_boot_code);
        assert_eq!(boot.os_name, Some("Windows (UEFI)"));

        let boot = scan_boot_sector(&buf, LegacyType::Mac, FsType::Ntfs, || true);
        assert!(boot.has_boot_code);
        assert_eq!(boot.os_name, Some("Windows (Legacy)"));

        // only Apple firmware needs the loader files
        let boot = scan_boot_sector(&buf, LegacyType::Uefi, FsType::Ntfs, || false);
        assert!(boot.has_boot_code);
    }

    #[test]
    fn test_exfat_not_bootable() {
        let buf = sector(&[(3, b"EXFAT   ")]);
        let boot = scan_boot_sector(&buf, LegacyType::Mac, FsType::ExFat, || true);
        assert!(!boot.bootable);
        assert!(!boot.has_boot_code);
    }

    #[test]
    fn test_mbr_table() {
        let mut buf = sector(&[]);
        buf[0] = 0xFA;
        buf[446 + 4] = 0x07;
        buf[446 + 8..446 + 12].copy_from_slice(&2048u32.to_le_bytes());
        buf[446 + 12..446 + 16].copy_from_slice(&1000u32.to_le_bytes());
        let boot = scan_boot_sector(&buf, LegacyType::Uefi, FsType::WholeDisk, || true);
        assert!(boot.mbr_table.is_some());
    }

    #[test]
    fn test_scan_volume_bootcode() {
        let mut data = sector(&[(2, b"LILO")]);
        data.resize(SAMPLE_SIZE * 2, 0);
        let mut disk = MemoryDisk::new(data, 512);
        let ctx = DetectContext {
            block_size: 512,
            ..DetectContext::default()
        };
        let sample = scan_volume_bootcode(&mut disk, 0, &ctx, LegacyType::Mac, || true);
        assert!(sample.boot.has_boot_code);
        assert_eq!(sample.detection.fs_type, FsType::WholeDisk);
    }

    #[test]
    fn test_short_device() {
        let mut disk = MemoryDisk::new(sector(&[(2, b"LILO")]), 512);
        let ctx = DetectContext {
            block_size: 512,
            ..DetectContext::default()
        };
        let sample = scan_volume_bootcode(&mut disk, 0, &ctx, LegacyType::Mac, || true);
        assert!(sample.boot.has_boot_code);

        let sample = scan_volume_bootcode(&mut disk, 5, &ctx, LegacyType::Mac, || true);
        assert_eq!(sample.boot, BootCode::default());
        assert_eq!(sample.detection.fs_type, FsType::Unknown);
    }

    #[test]
    fn test_huge_blocks() {
        let mut disk = MemoryDisk::new(vec![0; SAMPLE_SIZE * 2], SAMPLE_SIZE * 2);
        assert!(matches!(
            read_sample(&mut disk, 0),
            Err(ScanError::BlockSizeTooLarge(_))
        ));
    }

    /// A device reporting every block as addressable, which reads zeros.
    struct EndlessDisk;

    impl BlockDevice for EndlessDisk {
        fn block_size(&self) -> usize {
            512
        }

        fn last_block(&self) -> u64 {
            u64::MAX
        }

        fn is_logical_partition(&self) -> bool {
            false
        }

        fn read_blocks(&mut self, _lba: u64, buf: &mut [u8]) -> Result<(), ScanError> {
            buf.fill(0);
            Ok(())
        }
    }

    #[test]
    fn test_endless_device() {
        let sample = read_sample(&mut EndlessDisk, 0).unwrap();
        assert_eq!(sample.len(), SAMPLE_SIZE / 512 * 512);
        assert_eq!(read_sample(&mut EndlessDisk, u64::MAX - 1).unwrap().len(), 512);
    }

    proptest! {
        #[test]
        fn doesnt_panic(x in any::<Vec<u8>>(), mac in any::<bool>()) {
            let legacy = if mac { LegacyType::Mac } else { LegacyType::Uefi };
            let _ = scan_boot_sector(&x, legacy, FsType::Ntfs, || false);
        }
    }
}
