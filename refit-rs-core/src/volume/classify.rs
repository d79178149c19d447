// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Classification of a single volume.
//!
//! The firmware-facing scan gathers what the firmware knows about a handle into a [`VolumeProbe`]: the device path
//! reduced to the nodes that matter, the GPT entry, and the mounted filesystem. [`classify_volume`] turns that into
//! a [`Volume`] without touching any protocol itself.

use alloc::{format, string::String, vec::Vec};
use log::debug;
use uefi::{Guid, Handle};

use crate::{
    config::types::Architecture,
    volume::{
        DeviceId, DiskKind, FsType, ScanOptions, Volume,
        apfs::{self, MACOS_LOADER_PATH},
        block::BlockDevice,
        bootcode::{LegacyType, scan_volume_bootcode},
        guid,
        mbr::LogicalPartition,
        name::volume_name,
        signature::DetectContext,
    },
};

/// The partition signature carried by a hard drive media node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionSignature {
    /// No signature.
    None,
    /// The 32-bit MBR disk signature.
    Mbr(u32),
    /// The unique GPT partition GUID.
    Guid(Guid),
}

/// A device path node, reduced to what classification looks at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathNode {
    /// A hard drive media node.
    HardDrive(PartitionSignature),
    /// An El Torito (CD-ROM) media node.
    CdRom,
    /// A USB messaging node.
    Usb,
    /// A USB class messaging node.
    UsbClass,
    /// An IEEE 1394 messaging node.
    FireWire,
    /// A Fibre Channel messaging node.
    FibreChannel,
    /// Any other messaging node.
    OtherMessaging,
    /// A vendor-defined media node.
    Vendor(Guid),
    /// Anything else.
    Other,
}

impl PathNode {
    /// Returns true if the node means the disk is attached externally.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::Usb | Self::UsbClass | Self::FireWire | Self::FibreChannel)
    }

    /// Returns true for messaging nodes.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn is_messaging(&self) -> bool {
        self.is_external() || matches!(self, Self::OtherMessaging)
    }
}

/// A GPT partition entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GptInfo {
    /// The unique partition GUID.
    pub part_guid: Guid,

    /// The partition type GUID.
    pub part_type: Guid,

    /// The partition name.
    pub name: String,

    /// The attribute bits.
    pub attributes: u64,
}

/// A mounted filesystem, as far as classification needs one.
pub trait VolumeFs {
    /// The volume label.
    fn label(&mut self) -> Option<String>;

    /// The size of the volume in bytes.
    fn volume_size(&mut self) -> Option<u64>;

    /// Returns true if a file exists at a path relative to the root.
    fn exists(&mut self, path: &str) -> bool;
}

/// Everything the firmware reports about one block device handle.
pub struct VolumeProbe<'a> {
    /// The firmware handle.
    pub handle: Option<Handle>,

    /// The block device of the handle.
    pub device: DeviceId,

    /// The block device of the disk the handle is on, if it could be located.
    pub whole_disk: Option<DeviceId>,

    /// The block size of that disk.
    pub whole_disk_block_size: Option<usize>,

    /// The device path of the handle.
    pub path: Vec<PathNode>,

    /// The GPT entry of the partition, if it is on a GPT disk.
    pub gpt: Option<GptInfo>,

    /// The filesystem on the handle, if the firmware could mount it.
    pub fs: Option<&'a mut dyn VolumeFs>,
}

/// Returns true if Windows BIOS loader files exist, or if the filesystem cannot be read at all.
fn has_windows_bios_files(fs: Option<&mut (dyn VolumeFs + '_)>) -> bool {
    fs.is_none_or(|fs| fs.exists("NTLDR") || fs.exists("bootmgr"))
}

/// Fills in the partition identity from the device path and the GPT entry.
fn set_partition_identity(volume: &mut Volume, path: &[PathNode], gpt: Option<&GptInfo>, arch: Architecture) {
    for node in path {
        let PathNode::HardDrive(signature) = node else {
            continue;
        };
        match signature {
            PartitionSignature::Guid(part_guid) => {
                volume.part_guid = Some(*part_guid);
                let Some(gpt) = gpt.filter(|x| x.part_guid == *part_guid) else {
                    continue;
                };
                volume.part_type = Some(gpt.part_type);
                volume.part_name = Some(gpt.name.clone()).filter(|x| !x.is_empty());
                volume.is_read_only = gpt.attributes & guid::ATTR_READ_ONLY != 0;
                volume.is_discovered_root = guid::discoverable_root(arch) == Some(gpt.part_type)
                    && gpt.attributes & guid::ATTR_NO_AUTO == 0;
            }
            PartitionSignature::Mbr(_) | PartitionSignature::None => {
                volume.part_guid = Some(guid::MBR_PLACEHOLDER);
            }
        }
    }
}

/// Classifies one volume.
///
/// This samples the volume for its filesystem and boot code, works out how the disk is attached, reads the
/// partition identity, and names the volume. Nothing here fails: whatever cannot be read is left at its default.
pub fn classify_volume(
    probe: VolumeProbe<'_>,
    device: &mut dyn BlockDevice,
    options: &ScanOptions,
    arch: Architecture,
) -> Volume {
    let VolumeProbe {
        handle,
        device: device_id,
        whole_disk,
        whole_disk_block_size,
        path,
        gpt,
        mut fs,
    } = probe;

    let mut volume = Volume {
        handle,
        device: Some(device_id),
        whole_disk,
        ..Volume::default()
    };

    if device.block_size() == 2048 {
        volume.disk_kind = DiskKind::Optical;
    }

    set_partition_identity(&mut volume, &path, gpt.as_ref(), arch);

    let ctx = DetectContext {
        block_size: device.block_size(),
        is_logical_partition: device.is_logical_partition(),
        part_type: volume.part_type,
        apfs_vendor_node: path.contains(&PathNode::Vendor(guid::APFS)),
        apple_firmware: options.apple_firmware,
    };
    let sample = scan_volume_bootcode(device, 0, &ctx, options.legacy, || {
        has_windows_bios_files(fs.as_deref_mut())
    });

    volume.fs_type = sample.detection.fs_type;
    volume.serial = sample.detection.serial;
    volume.part_type = sample.detection.part_type;
    volume.has_boot_code = sample.boot.has_boot_code;
    volume.os_icon_name = sample.boot.os_icon_name;
    volume.os_name = sample.boot.os_name;
    volume.mbr_table = sample.boot.mbr_table;

    let mut bootable = sample.boot.bootable;
    for node in &path {
        if node.is_external() {
            volume.disk_kind = DiskKind::External;
        }
        if *node == PathNode::CdRom {
            volume.disk_kind = DiskKind::Optical;
            bootable = true;
        }
    }
    if path.iter().any(PathNode::is_messaging) && whole_disk_block_size == Some(2048) {
        volume.disk_kind = DiskKind::Optical;
    }

    if !bootable {
        if volume.has_boot_code {
            debug!("Volume considered non-bootable, but boot code is present");
        }
        volume.has_boot_code = false;
    }

    if let Some(fs) = fs.as_deref_mut() {
        volume.has_root = true;
        volume.fs_name = fs.label().filter(|x| !x.is_empty());
        volume.fs_size = fs.volume_size();
    }

    volume.name = Some(volume_name(&volume));

    if volume.has_root
        && options.legacy == LegacyType::Mac
        && volume.fs_type == FsType::Ntfs
        && volume.has_boot_code
    {
        volume.has_boot_code = has_windows_bios_files(fs.as_deref_mut());
    }

    if volume.fs_type == FsType::Apfs {
        let has_loader = fs.as_deref_mut().is_some_and(|fs| fs.exists(MACOS_LOADER_PATH));
        volume.role = apfs::infer_role(volume.name(), has_loader);
    }

    volume.is_readable = volume.has_boot_code || volume.has_root;
    volume
}

/// Classifies a logical partition found inside an extended partition.
///
/// Logical partitions have no handle of their own, so only their boot code is looked at. They are readable only
/// if boot code was found.
pub fn classify_logical(
    whole_disk: &Volume,
    partition: &LogicalPartition,
    device: &mut dyn BlockDevice,
    options: &ScanOptions,
) -> Volume {
    let ctx = DetectContext {
        block_size: device.block_size(),
        is_logical_partition: true,
        part_type: None,
        apfs_vendor_node: false,
        apple_firmware: options.apple_firmware,
    };
    let sample = scan_volume_bootcode(device, partition.offset, &ctx, options.legacy, || true);
    let has_boot_code = sample.boot.bootable && sample.boot.has_boot_code;

    Volume {
        device: whole_disk.device,
        whole_disk: whole_disk.device,
        block_offset: partition.offset,
        disk_kind: whole_disk.disk_kind,
        is_mbr_partition: true,
        mbr_partition_index: partition.index,
        name: Some(format!("Partition {}", partition.index + 1)),
        fs_type: sample.detection.fs_type,
        serial: sample.detection.serial,
        has_boot_code,
        os_icon_name: sample.boot.os_icon_name,
        os_name: sample.boot.os_name,
        is_readable: has_boot_code,
        ..Volume::default()
    }
}
