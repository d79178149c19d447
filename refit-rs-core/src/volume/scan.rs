// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The firmware-facing side of the volume scan.
//!
//! Every handle supporting [`BlockIO`] is opened once and kept for the whole scan. What the firmware reports about
//! the handle (device path, GPT entry, mounted filesystem) is gathered into a [`VolumeProbe`], classified, and the
//! whole list is then handed to [`VolumeSet::assemble`] for the relational pass.
//!
//! # Safety
//!
//! Protocols are opened with [`OpenProtocolAttributes::GetProtocol`], which does not register the boot manager as a
//! user of the protocol. This is needed because the filesystem drivers already hold [`BlockIO`] open, so an
//! exclusive open would disconnect them. The protocols stay valid as long as no driver is disconnected, which the
//! boot manager never does while a [`VolumeSet`] is alive.

use alloc::{boxed::Box, string::String, vec::Vec};
use log::{debug, info, warn};
use uefi::{
    Guid, Handle,
    boot::{self, OpenProtocolAttributes, OpenProtocolParams, ScopedProtocol, SearchType},
    guid,
    proto::{
        ProtocolPointer,
        device_path::{
            DevicePath, DevicePathNode, DevicePathNodeEnum, DeviceSubType, DeviceType,
            build::DevicePathBuilder, media,
        },
        loaded_image::LoadedImage,
        media::{block::BlockIO, partition::PartitionInfo},
    },
};

use crate::{
    BootResult,
    system::{
        fs::UefiFileSystem,
        helper::{device_path_to_text, get_arch, utf16_name},
        time::timer_usec,
    },
    volume::{
        DeviceId, ScanError, ScanOptions, Volume, VolumeSet,
        block::BlockDevice,
        bootcode::LegacyType,
        classify::{GptInfo, PartitionSignature, PathNode, VolumeFs, VolumeProbe, classify_volume},
    },
};

/// The GUID of the `LegacyBios` protocol, installed by a Compatibility Support Module.
const LEGACY_BIOS_PROTOCOL: Guid = guid!("db9a1e3d-45cb-4abb-853b-e5387fdb2e2d");

/// Opens a protocol on a handle without taking ownership of it.
///
/// # Errors
///
/// May return an `Error` if the handle does not support the protocol.
fn get_protocol<P: ProtocolPointer + ?Sized>(handle: Handle) -> BootResult<ScopedProtocol<P>> {
    let params = OpenProtocolParams {
        handle,
        agent: boot::image_handle(),
        controller: None,
    };

    // SAFETY: the protocol is only read from, and the handle outlives the scan since no drivers are disconnected
    // while it runs. See the module documentation.
    Ok(unsafe { boot::open_protocol::<P>(params, OpenProtocolAttributes::GetProtocol) }?)
}

/// A [`BlockDevice`] backed by the firmware [`BlockIO`] protocol.
pub struct UefiBlockDevice(ScopedProtocol<BlockIO>);

impl UefiBlockDevice {
    /// Opens the [`BlockIO`] protocol on a handle.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the handle does not support [`BlockIO`].
    pub fn open(handle: Handle) -> BootResult<Self> {
        Ok(Self(get_protocol::<BlockIO>(handle)?))
    }
}

impl BlockDevice for UefiBlockDevice {
    fn block_size(&self) -> usize {
        usize::try_from(self.0.media().block_size()).unwrap_or(0)
    }

    fn last_block(&self) -> u64 {
        self.0.media().last_block()
    }

    fn is_logical_partition(&self) -> bool {
        self.0.media().is_logical_partition()
    }

    fn read_blocks(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), ScanError> {
        let media = self.0.media();
        if !media.is_media_present() {
            return Err(ScanError::NoMedia);
        }
        let media_id = media.media_id();
        self.0
            .read_blocks(media_id, lba, buf)
            .map_err(|e| ScanError::ReadFailed(e.status()))
    }
}

impl VolumeFs for UefiFileSystem {
    fn label(&mut self) -> Option<String> {
        self.get_volume_label()
            .map(|x| String::from(&x))
            .map_err(|e| debug!("{e}"))
            .ok()
    }

    fn volume_size(&mut self) -> Option<u64> {
        self.get_volume_size().map_err(|e| debug!("{e}")).ok()
    }

    fn exists(&mut self, path: &str) -> bool {
        self.exists_str(path).unwrap_or(false)
    }
}

/// Detects which kind of legacy boot the firmware supports.
#[must_use = "Has no effect if the result is unused"]
pub fn detect_legacy_type(apple_firmware: bool) -> LegacyType {
    if apple_firmware {
        LegacyType::Mac
    } else if boot::locate_handle_buffer(SearchType::ByProtocol(&LEGACY_BIOS_PROTOCOL)).is_ok_and(|x| !x.is_empty()) {
        LegacyType::Uefi
    } else {
        LegacyType::None
    }
}

/// Returns true if the firmware vendor is Apple.
#[must_use = "Has no effect if the result is unused"]
pub fn is_apple_firmware() -> bool {
    String::from(&*uefi::system::firmware_vendor()).contains("Apple")
}

/// Reduces a device path node to what classification looks at.
fn path_node(node: &DevicePathNode) -> PathNode {
    match (node.device_type(), node.sub_type()) {
        (DeviceType::MESSAGING, DeviceSubType::MESSAGING_USB) => PathNode::Usb,
        (DeviceType::MESSAGING, DeviceSubType::MESSAGING_USB_CLASS) => PathNode::UsbClass,
        (DeviceType::MESSAGING, DeviceSubType::MESSAGING_1394) => PathNode::FireWire,
        (DeviceType::MESSAGING, DeviceSubType::MESSAGING_FIBRE_CHANNEL) => PathNode::FibreChannel,
        (DeviceType::MESSAGING, _) => PathNode::OtherMessaging,
        (DeviceType::MEDIA, DeviceSubType::MEDIA_CD_ROM) => PathNode::CdRom,
        (DeviceType::MEDIA, _) => match node.as_enum() {
            Ok(DevicePathNodeEnum::MediaHardDrive(hd)) => PathNode::HardDrive(match hd.partition_signature() {
                media::PartitionSignature::Mbr(sig) => PartitionSignature::Mbr(u32::from_le_bytes(sig)),
                media::PartitionSignature::Guid(guid) => PartitionSignature::Guid(guid),
                _ => PartitionSignature::None,
            }),
            Ok(DevicePathNodeEnum::MediaVendor(vendor)) => PathNode::Vendor(vendor.vendor_guid()),
            _ => PathNode::Other,
        },
        _ => PathNode::Other,
    }
}

/// Builds a device path out of the first `len` nodes of another.
fn truncate_path<'a>(path: &DevicePath, len: usize, vec: &'a mut Vec<u8>) -> Option<&'a DevicePath> {
    let mut builder = DevicePathBuilder::with_vec(vec);
    for node in path.node_iter().take(len) {
        builder = builder.push(&node).ok()?;
    }
    builder.finalize().ok()
}

/// Locates the whole disk a partition is on.
///
/// The device path is cut off after a messaging node, which leaves the path of the disk itself, and the handle with
/// [`BlockIO`] at that path is located. The deepest messaging node that locates a disk wins, since disks behind a
/// hub have several.
fn locate_whole_disk(path: &DevicePath) -> Option<Handle> {
    let messaging: Vec<usize> = path
        .node_iter()
        .enumerate()
        .filter(|(_, node)| node.device_type() == DeviceType::MESSAGING)
        .map(|(i, _)| i + 1)
        .collect();

    messaging.into_iter().rev().find_map(|len| {
        let mut vec = Vec::new();
        let mut disk_path = truncate_path(path, len, &mut vec)?;
        boot::locate_device_path::<BlockIO>(&mut disk_path).ok()
    })
}

/// Reads the GPT entry of a partition, if the firmware knows it.
fn gpt_info(handle: Handle) -> Option<GptInfo> {
    let info = get_protocol::<PartitionInfo>(handle).ok()?;
    let entry = *info.gpt_partition_entry()?;
    let name = entry.partition_name;
    let attributes = entry.attributes;
    Some(GptInfo {
        part_guid: entry.unique_partition_guid,
        part_type: entry.partition_type_guid.0,
        name: utf16_name(name.iter().map(|&c| u16::from(c))),
        attributes: attributes.bits(),
    })
}

/// The location of the running boot manager image.
#[derive(Clone, Debug, Default)]
pub struct ImageLocation {
    /// The handle of the device the image was loaded from.
    pub device: Option<Handle>,

    /// The directory the image is in, such as `\EFI\refind`.
    pub dir: String,
}

/// Gets the location of the running boot manager image.
///
/// # Errors
///
/// May return an `Error` if the image handle does not support [`LoadedImage`].
pub fn image_location() -> BootResult<ImageLocation> {
    let image = boot::open_protocol_exclusive::<LoadedImage>(boot::image_handle())?;
    let dir = image
        .file_path()
        .and_then(|x| device_path_to_text(x).map_err(|e| warn!("{e}")).ok())
        .and_then(|x| x.rsplit_once('\\').map(|(dir, _)| String::from(dir)))
        .unwrap_or_default();
    Ok(ImageLocation {
        device: image.device(),
        dir,
    })
}

/// Opens the filesystem of the volume at `index`, or the filesystem of the boot manager without one.
///
/// # Errors
///
/// May return an `Error` if the volume has no filesystem handle, or the filesystem could not be opened.
pub fn open_volume_fs(set: &VolumeSet, index: Option<usize>) -> BootResult<UefiFileSystem> {
    let Some(index) = index else {
        return UefiFileSystem::from_image_fs();
    };
    let handle = set
        .volumes
        .get(index)
        .and_then(|v| v.handle)
        .ok_or(ScanError::NoFileSystem(index))?;
    UefiFileSystem::from_handle(handle)
}

/// Scans every block device the firmware exposes.
///
/// Handles that cannot be opened are skipped. The volume the boot manager was loaded from is located through
/// `self_device`, which is usually [`ImageLocation::device`].
///
/// # Errors
///
/// May return an `Error` if the firmware could not enumerate the [`BlockIO`] handles at all.
pub fn scan_volumes(options: &ScanOptions, self_device: Option<Handle>) -> BootResult<VolumeSet> {
    let start = timer_usec();
    let handles = boot::locate_handle_buffer(SearchType::from_proto::<BlockIO>())?;

    let mut opened: Vec<(Handle, Box<dyn BlockDevice>)> = Vec::with_capacity(handles.len());
    for &handle in handles.iter() {
        match UefiBlockDevice::open(handle) {
            Ok(device) => opened.push((handle, Box::new(device))),
            Err(e) => warn!("{e}"),
        }
    }

    let (handles, mut devices): (Vec<_>, Vec<_>) = opened.into_iter().unzip();
    let device_of = |handle: Handle| handles.iter().position(|&x| x == handle).map(DeviceId);

    let arch = get_arch();
    let mut volumes = Vec::with_capacity(handles.len());
    for (index, &handle) in handles.iter().enumerate() {
        let device_path = get_protocol::<DevicePath>(handle).ok();
        let path: Vec<PathNode> = device_path
            .as_deref()
            .map(|x| x.node_iter().map(path_node).collect())
            .unwrap_or_default();
        let whole_disk = device_path.as_deref().and_then(locate_whole_disk).and_then(device_of);
        let whole_disk_block_size = whole_disk.and_then(|id| devices.get(id.0)).map(|x| x.block_size());

        let mut fs = UefiFileSystem::from_handle(handle).ok();
        let probe = VolumeProbe {
            handle: Some(handle),
            device: DeviceId(index),
            whole_disk,
            whole_disk_block_size,
            path,
            gpt: gpt_info(handle),
            fs: fs.as_mut().map(|x| x as &mut dyn VolumeFs),
        };

        let Some(device) = devices.get_mut(index) else {
            continue;
        };
        let volume = classify_volume(probe, &mut **device, options, arch);
        debug!(
            "Found volume \"{}\" ({}, {:?})",
            volume.name(),
            volume.fs_type.name(),
            volume.disk_kind
        );
        volumes.push(volume);
    }

    let self_volume = self_device.and_then(|device| volumes.iter().position(|v: &Volume| v.handle == Some(device)));
    let set = VolumeSet::assemble(volumes, devices, self_volume, options);

    info!(
        "Scanned {} volumes in {} ms",
        set.volumes.len(),
        (timer_usec() - start) / 1000
    );
    Ok(set)
}
