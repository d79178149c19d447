// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Volume discovery and classification.
//!
//! Every block device the firmware exposes becomes one [`Volume`]. The scan runs in two passes: the first
//! classifies each device on its own (filesystem signature, legacy boot code, name), the second relates volumes
//! to one another (logical partitions inside an extended partition, MBR partitions of a whole disk, duplicate
//! filesystems, APFS volume groups).
//!
//! The byte-level logic lives in [`signature`], [`bootcode`] and [`mbr`], and only ever sees a [`BlockDevice`],
//! so it can be exercised on the host with a [`block::MemoryDisk`]. [`scan`] is the firmware-facing side.

use alloc::{boxed::Box, string::String, vec::Vec};
use log::{debug, warn};
use thiserror::Error;
use uefi::{Guid, Handle, Status};

use crate::{
    system::helper::{contains_ignore_case, parse_guid},
    volume::{
        apfs::RoleLists,
        block::BlockDevice,
        bootcode::LegacyType,
        dedup::DedupPolicy,
        mbr::MbrEntry,
    },
};

pub mod apfs;
pub mod block;
pub mod bootcode;
pub mod classify;
pub mod dedup;
pub mod guid;
pub mod mbr;
pub mod name;
pub mod relate;
pub mod scan;
pub mod signature;

/// An error that may result from reading or walking a block device.
#[derive(Error, Debug)]
pub enum ScanError {
    /// An extended partition chain loops back on itself, or is implausibly long.
    #[error("Malformed partition table (EBR at block {offset})")]
    MalformedPartitionTable {
        /// The block offset of the EBR that closed the cycle.
        offset: u64,
    },

    /// The device reports a block size larger than the sample buffer.
    #[error("Block size too large ({0} bytes)")]
    BlockSizeTooLarge(usize),

    /// The firmware failed to read from the device.
    #[error("Failed to read blocks: {0}")]
    ReadFailed(Status),

    /// There is no media in the device.
    #[error("No media present")]
    NoMedia,

    /// The volume does not exist, or has no filesystem the firmware can open.
    #[error("Volume {0} has no filesystem")]
    NoFileSystem(usize),
}

/// A filesystem type, as identified from on-disk signatures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FsType {
    /// Nothing recognizable.
    #[default]
    Unknown,
    /// A whole disk carrying an MBR, rather than a filesystem.
    WholeDisk,
    /// FAT12, FAT16 or FAT32.
    Fat,
    /// `ExFAT`.
    ExFat,
    /// HFS+ or HFSX.
    Hfsplus,
    /// ext2.
    Ext2,
    /// ext3.
    Ext3,
    /// ext4.
    Ext4,
    /// `ReiserFS`.
    ReiserFs,
    /// Btrfs.
    Btrfs,
    /// XFS.
    Xfs,
    /// JFS.
    Jfs,
    /// ISO-9660.
    Iso9660,
    /// NTFS.
    Ntfs,
    /// APFS.
    Apfs,
}

impl FsType {
    /// The human readable name of the filesystem type.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::WholeDisk => "Whole Disk",
            Self::Fat => "FAT",
            Self::ExFat => "ExFAT",
            Self::Hfsplus => "HFS+",
            Self::Ext2 => "Ext2",
            Self::Ext3 => "Ext3",
            Self::Ext4 => "Ext4",
            Self::ReiserFs => "ReiserFS",
            Self::Btrfs => "Btrfs",
            Self::Xfs => "XFS",
            Self::Jfs => "JFS",
            Self::Iso9660 => "ISO-9660",
            Self::Ntfs => "NTFS",
            Self::Apfs => "APFS",
        }
    }
}

/// Where a disk is attached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DiskKind {
    /// An internal disk.
    #[default]
    Internal,
    /// USB, `FireWire` or Fibre Channel.
    External,
    /// An optical drive.
    Optical,
    /// A network boot device.
    Net,
}

/// A filesystem's identifying serial number.
///
/// Only ext* and `ReiserFS` carry a real UUID. Other formats store a shorter serial, which is kept as-is so it is
/// never mistaken for a GUID.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VolumeSerial {
    /// No serial could be read.
    #[default]
    None,
    /// A 16 byte UUID from an ext* or `ReiserFS` superblock.
    Uuid([u8; 16]),
    /// The 64-bit volume identifier from an HFS+ volume header.
    Hfs(u64),
    /// The 64-bit NTFS volume serial number.
    Ntfs(u64),
    /// The 32-bit FAT volume ID.
    Fat(u32),
    /// The 32-bit `ExFAT` volume serial number.
    ExFat(u32),
}

impl VolumeSerial {
    /// Returns true if there is no serial, or it is all zeroes.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_null(&self) -> bool {
        match *self {
            Self::None => true,
            Self::Uuid(bytes) => bytes == [0; 16],
            Self::Hfs(v) | Self::Ntfs(v) => v == 0,
            Self::Fat(v) | Self::ExFat(v) => v == 0,
        }
    }
}

/// The role of an APFS volume within its container.
///
/// The discriminants are the role values APFS itself stores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u16)]
pub enum VolumeRole {
    /// No role is recorded.
    #[default]
    Undefined = 0x0000,
    /// The sealed macOS system volume.
    System = 0x0001,
    /// A user home volume.
    User = 0x0002,
    /// The recovery volume.
    Recovery = 0x0004,
    /// The swap volume.
    Vm = 0x0008,
    /// The preboot volume.
    Preboot = 0x0010,
    /// An installer volume.
    Installer = 0x0020,
    /// The writable data volume paired with a system volume.
    Data = 0x0040,
    /// A baseband firmware volume.
    Baseband = 0x0080,
    /// The software update volume.
    Update = 0x00C0,
    /// The `xART` volume.
    Xart = 0x0100,
    /// A hardware volume.
    Hardware = 0x0140,
    /// A Time Machine backup.
    Backup = 0x0180,
    /// An enterprise volume.
    Enterprise = 0x0240,
    /// The pre-login volume.
    Prelogin = 0x02C0,
    /// A role value this boot manager does not recognize.
    Unknown = 0xFFFF,
}

/// An index into [`VolumeSet::devices`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeviceId(pub usize);

/// One block-device-backed partition or whole disk.
#[derive(Clone, Debug, Default)]
pub struct Volume {
    /// The firmware handle the volume was found on. Logical partitions found in an EBR chain have none.
    pub handle: Option<Handle>,

    /// The block device this volume reads through.
    pub device: Option<DeviceId>,

    /// The block device of the whole disk this volume lives on.
    pub whole_disk: Option<DeviceId>,

    /// The offset in blocks of this volume on [`Self::device`].
    pub block_offset: u64,

    /// The unique partition GUID.
    pub part_guid: Option<Guid>,

    /// The partition type GUID.
    pub part_type: Option<Guid>,

    /// The filesystem serial.
    pub serial: VolumeSerial,

    /// The filesystem type.
    pub fs_type: FsType,

    /// Where the disk is attached.
    pub disk_kind: DiskKind,

    /// The APFS role.
    pub role: VolumeRole,

    /// If this volume is a partition described by an MBR (primary or logical).
    pub is_mbr_partition: bool,

    /// The index of the MBR partition, counting logical partitions from 4.
    pub mbr_partition_index: usize,

    /// The display name of the volume.
    pub name: Option<String>,

    /// The label reported by the filesystem driver.
    pub fs_name: Option<String>,

    /// The GPT partition name.
    pub part_name: Option<String>,

    /// If the filesystem root directory could be opened.
    pub has_root: bool,

    /// If the volume may be scanned for loaders.
    pub is_readable: bool,

    /// If the GPT read-only attribute is set.
    pub is_read_only: bool,

    /// If legacy boot code was found.
    pub has_boot_code: bool,

    /// Icon names hinted by legacy boot code, most specific first.
    pub os_icon_name: Option<&'static str>,

    /// An OS name hinted by legacy boot code.
    pub os_name: Option<&'static str>,

    /// The MBR partition table, if this volume is a whole disk with a valid one.
    pub mbr_table: Option<[MbrEntry; 4]>,

    /// The size of the filesystem in bytes.
    pub fs_size: Option<u64>,

    /// If this is the discoverable Linux root partition.
    pub is_discovered_root: bool,
}

impl Volume {
    /// Returns true if the volume is an EFI system partition.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_esp(&self) -> bool {
        self.part_type == Some(guid::ESP)
    }

    /// Returns the volume name, or an empty string if there is none.
    #[must_use = "Has no effect if the result is unused"]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

/// Options that change how volumes are classified and related.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScanOptions {
    /// The kind of legacy boot support the firmware has.
    pub legacy: LegacyType,

    /// If the firmware vendor is Apple.
    pub apple_firmware: bool,

    /// Scan ESPs other than the one the boot manager runs from, even when they share a serial.
    pub scan_other_esp: bool,

    /// Reconcile APFS volume groups.
    pub sync_apfs: bool,
}

/// The result of a full volume scan.
pub struct VolumeSet {
    /// Every volume, in firmware enumeration order, followed by any logical partitions.
    pub volumes: Vec<Volume>,

    /// The block devices referenced by [`Volume::device`] and [`Volume::whole_disk`].
    pub devices: Vec<Box<dyn BlockDevice>>,

    /// Volumes grouped by APFS role.
    pub roles: RoleLists,

    /// False if some APFS container holds more than one macOS install.
    pub single_apfs: bool,

    /// False if some key APFS volume lacks a serial or partition GUID.
    pub valid_apfs: bool,

    /// If APFS volume groups were reconciled.
    pub apfs_synced: bool,

    /// The index of the volume the boot manager was loaded from.
    pub self_volume: Option<usize>,

    /// The index of the discoverable Linux root partition.
    pub discovered_root: Option<usize>,
}

impl VolumeSet {
    /// Runs the relational pass over a list of classified volumes.
    ///
    /// This marks duplicate filesystems unreadable, walks extended partitions, matches MBR partitions to the
    /// whole disk they are on, and reconciles APFS volume groups if enabled.
    #[must_use = "Has no effect if the result is unused"]
    pub fn assemble(
        volumes: Vec<Volume>,
        mut devices: Vec<Box<dyn BlockDevice>>,
        self_volume: Option<usize>,
        options: &ScanOptions,
    ) -> Self {
        let mut volumes = volumes;

        let policy = DedupPolicy {
            scan_other_esp: options.scan_other_esp,
            self_serial: self_volume
                .and_then(|i| volumes.get(i))
                .map(|v| v.serial),
            self_volume,
        };
        dedup::mark_duplicates(&mut volumes, &policy);

        relate::relate_volumes(&mut volumes, &mut devices, options);

        let roles = RoleLists::collect(&volumes);
        let valid_apfs = apfs::valid_apfs(&volumes, &roles);
        let single_apfs = apfs::single_apfs(&volumes, &roles);

        let mut set = Self {
            discovered_root: volumes.iter().position(|v| v.is_discovered_root),
            volumes,
            devices,
            roles,
            single_apfs,
            valid_apfs,
            apfs_synced: false,
            self_volume,
        };

        if options.sync_apfs {
            set.apfs_synced = apfs::reconcile(&mut set);
            if !set.apfs_synced {
                debug!("APFS volume groups left as found");
            }
        }

        set
    }

    /// Gets the volume the boot manager was loaded from.
    #[must_use = "Has no effect if the result is unused"]
    pub fn self_volume(&self) -> Option<&Volume> {
        self.self_volume.and_then(|i| self.volumes.get(i))
    }

    /// Finds a volume from an identifier used in the configuration file.
    #[must_use = "Has no effect if the result is unused"]
    pub fn find_volume(&self, identifier: &str) -> Option<&Volume> {
        find_volume(&self.volumes, identifier)
    }
}

/// Finds a volume by partition GUID, or by name.
///
/// If the identifier parses as a GUID it is matched against partition GUIDs only. Otherwise it is matched case
/// insensitively against the volume name, the partition name, and the filesystem label, in that order of
/// preference.
#[must_use = "Has no effect if the result is unused"]
pub fn find_volume<'a>(volumes: &'a [Volume], identifier: &str) -> Option<&'a Volume> {
    if let Some(guid) = parse_guid(identifier) {
        return volumes.iter().find(|v| v.part_guid == Some(guid));
    }

    let matches = |field: &Option<String>| {
        field
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(identifier))
    };

    let found = volumes
        .iter()
        .find(|v| matches(&v.name))
        .or_else(|| volumes.iter().find(|v| matches(&v.part_name)))
        .or_else(|| volumes.iter().find(|v| matches(&v.fs_name)));

    if found.is_none() && volumes.iter().any(|v| contains_ignore_case(v.name(), identifier)) {
        warn!("Volume \"{identifier}\" only matches part of a volume name");
    }

    found
}
