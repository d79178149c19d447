// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The relational pass over classified volumes.
//!
//! Whole disks with an MBR have their extended partitions walked, and every partition is matched against the MBR
//! of the disk it lives on.

use alloc::{boxed::Box, format, vec, vec::Vec};
use log::{debug, warn};

use crate::volume::{
    DeviceId, ScanOptions, Volume,
    block::BlockDevice,
    classify::classify_logical,
    mbr::{EbrWalker, MbrEntry},
};

/// The smallest byte sum of a boot sector that is trusted to identify a partition.
///
/// Nearly empty sectors match each other too easily.
const MIN_SECTOR_SUM: u32 = 1000;

/// Gets a block device by id.
fn device_mut(devices: &mut [Box<dyn BlockDevice>], id: DeviceId) -> Option<&mut dyn BlockDevice> {
    devices.get_mut(id.0).map(|x| &mut **x as &mut dyn BlockDevice)
}

/// Reads one block.
fn read_block(devices: &mut [Box<dyn BlockDevice>], id: DeviceId, lba: u64) -> Option<Vec<u8>> {
    let device = device_mut(devices, id)?;
    let mut buf = vec![0; device.block_size().max(1)];
    device.read_blocks(lba, &mut buf).ok()?;
    Some(buf)
}

/// Returns the MBR of a volume that is a whole disk.
fn whole_disk_table(volume: &Volume) -> Option<[MbrEntry; 4]> {
    (volume.device.is_some() && volume.device == volume.whole_disk && volume.block_offset == 0)
        .then_some(volume.mbr_table)
        .flatten()
}

/// Walks one extended partition of a whole disk, classifying every logical partition in it.
///
/// Logical partitions found before a malformed link are kept.
fn scan_extended(
    whole_disk: &Volume,
    entry: &MbrEntry,
    devices: &mut [Box<dyn BlockDevice>],
    options: &ScanOptions,
) -> Vec<Volume> {
    let Some(device) = whole_disk.device.and_then(|id| device_mut(devices, id)) else {
        return Vec::new();
    };

    let mut partitions = Vec::new();
    for partition in EbrWalker::new(device, entry) {
        match partition {
            Ok(partition) => partitions.push(partition),
            Err(e) => {
                warn!("Extended partition on \"{}\": {e}", whole_disk.name());
                break;
            }
        }
    }

    partitions
        .iter()
        .map(|partition| classify_logical(whole_disk, partition, device, options))
        .collect()
}

/// Finds which primary MBR entry, if any, describes the partition at `index`.
///
/// The entry must have the same size as the partition, and the first block read through the partition must equal
/// the block at the entry's start on the whole disk.
fn match_mbr_partition(volumes: &[Volume], index: usize, devices: &mut [Box<dyn BlockDevice>]) -> Option<usize> {
    let volume = volumes.get(index)?;
    let (device, whole_disk) = (volume.device?, volume.whole_disk?);
    if device == whole_disk {
        return None;
    }

    let table = volumes
        .iter()
        .rev()
        .find(|v| v.device == Some(whole_disk) && v.block_offset == 0)?
        .mbr_table?;

    let last_block = device_mut(devices, device)?.last_block();

    for (k, entry) in table.iter().enumerate() {
        if u64::from(entry.size) != last_block + 1 {
            continue;
        }

        let own = read_block(devices, device, volume.block_offset)?;
        let direct = read_block(devices, whole_disk, u64::from(entry.start_lba))?;
        if own != direct {
            continue;
        }

        let sum: u32 = own.iter().take(512).map(|&x| u32::from(x)).sum();
        if sum < MIN_SECTOR_SUM {
            continue;
        }

        return Some(k);
    }

    None
}

/// Relates volumes to one another.
///
/// Logical partitions are appended to `volumes` as they are found.
pub fn relate_volumes(volumes: &mut Vec<Volume>, devices: &mut [Box<dyn BlockDevice>], options: &ScanOptions) {
    let mut index = 0;
    while index < volumes.len() {
        if let Some(table) = whole_disk_table(&volumes[index]) {
            for entry in table.iter().filter(|x| x.is_extended()) {
                let logical = scan_extended(&volumes[index], entry, devices, options);
                debug!("Found {} logical partitions", logical.len());
                volumes.extend(logical);
            }
        }

        if let Some(k) = match_mbr_partition(volumes, index, devices) {
            let volume = &mut volumes[index];
            volume.is_mbr_partition = true;
            volume.mbr_partition_index = k;
            if volume.name.is_none() {
                volume.name = Some(format!("Partition {}", k + 1));
            }
        }

        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::{block::MemoryDisk, mbr::parse_table};

    fn write_entry(disk: &mut [u8], sector: usize, slot: usize, entry: (u8, u8, u32, u32)) {
        let at = sector * 512 + 446 + slot * 16;
        disk[at] = entry.0;
        disk[at + 4] = entry.1;
        disk[at + 8..at + 12].copy_from_slice(&entry.2.to_le_bytes());
        disk[at + 12..at + 16].copy_from_slice(&entry.3.to_le_bytes());
    }

    fn sign(disk: &mut [u8], sector: usize) {
        disk[sector * 512 + 510] = 0x55;
        disk[sector * 512 + 511] = 0xAA;
    }

    /// A disk with one primary partition at sector 10 and an extended partition at sector 100 holding two logical
    /// partitions.
    fn disk() -> Vec<u8> {
        let mut disk = vec![0u8; 512 * 300];
        sign(&mut disk, 0);
        write_entry(&mut disk, 0, 0, (0x80, 0x83, 10, 50));
        write_entry(&mut disk, 0, 1, (0x00, 0x05, 100, 100));

        disk[10 * 512..11 * 512].fill(0x5A);

        sign(&mut disk, 100);
        write_entry(&mut disk, 100, 0, (0, 0x83, 1, 20));
        write_entry(&mut disk, 100, 1, (0, 0x05, 30, 30));
        sign(&mut disk, 130);
        write_entry(&mut disk, 130, 0, (0, 0x83, 1, 20));
        disk
    }

    #[test]
    fn test_relate() {
        let data = disk();
        let partition = data[10 * 512..60 * 512].to_vec();
        let mut devices: Vec<Box<dyn BlockDevice>> = vec![
            Box::new(MemoryDisk::new(data.clone(), 512)),
            Box::new(MemoryDisk::new(partition, 512).logical()),
        ];

        let mut volumes = vec![
            Volume {
                device: Some(DeviceId(0)),
                whole_disk: Some(DeviceId(0)),
                mbr_table: parse_table(&data[..512]),
                ..Volume::default()
            },
            Volume {
                device: Some(DeviceId(1)),
                whole_disk: Some(DeviceId(0)),
                ..Volume::default()
            },
        ];

        relate_volumes(&mut volumes, &mut devices, &ScanOptions::default());

        assert_eq!(volumes.len(), 4);
        assert!(volumes[1].is_mbr_partition);
        assert_eq!(volumes[1].mbr_partition_index, 0);
        assert_eq!(volumes[1].name(), "Partition 1");

        assert_eq!(volumes[2].name(), "Partition 5");
        assert_eq!(volumes[2].block_offset, 101);
        assert_eq!(volumes[3].name(), "Partition 6");
        assert_eq!(volumes[3].block_offset, 131);
        assert!(volumes[2..].iter().all(|v| v.is_mbr_partition && !v.is_readable));
    }

    #[test]
    fn test_empty_sector_not_matched() {
        let mut data = disk();
        data[10 * 512..11 * 512].fill(0);
        let partition = data[10 * 512..60 * 512].to_vec();
        let mut devices: Vec<Box<dyn BlockDevice>> = vec![
            Box::new(MemoryDisk::new(data.clone(), 512)),
            Box::new(MemoryDisk::new(partition, 512).logical()),
        ];
        let mut volumes = vec![
            Volume {
                device: Some(DeviceId(0)),
                whole_disk: Some(DeviceId(0)),
                mbr_table: parse_table(&data[..512]),
                ..Volume::default()
            },
            Volume {
                device: Some(DeviceId(1)),
                whole_disk: Some(DeviceId(0)),
                ..Volume::default()
            },
        ];
        relate_volumes(&mut volumes, &mut devices, &ScanOptions::default());
        assert!(!volumes[1].is_mbr_partition);
    }

    #[test]
    fn test_cyclic_chain_keeps_earlier_partitions() {
        let mut data = disk();
        // link the second EBR to itself
        write_entry(&mut data, 130, 1, (0, 0x05, 30, 30));
        let mut devices: Vec<Box<dyn BlockDevice>> = vec![Box::new(MemoryDisk::new(data.clone(), 512))];
        let mut volumes = vec![Volume {
            device: Some(DeviceId(0)),
            whole_disk: Some(DeviceId(0)),
            mbr_table: parse_table(&data[..512]),
            ..Volume::default()
        }];
        relate_volumes(&mut volumes, &mut devices, &ScanOptions::default());
        assert_eq!(volumes.len(), 3);
    }

    #[test]
    fn test_no_devices() {
        let mut volumes = vec![Volume::default(), Volume::default()];
        relate_volumes(&mut volumes, &mut [], &ScanOptions::default());
        assert_eq!(volumes.len(), 2);
    }
}
