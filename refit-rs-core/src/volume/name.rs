// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Display names for volumes.

use alloc::{
    format,
    string::{String, ToString},
};

use crate::volume::{DiskKind, FsType, Volume, guid};

/// Partition names that are just the default name of the partitioning tool, and say nothing about the volume.
const IGNORE_PARTITION_NAMES: &[&str] = &["Microsoft basic data", "Linux filesystem", "Apple HFS/HFS+"];

/// Formats a byte count with binary (IEEE 1541) prefixes, such as `200 MiB`.
///
/// The value is truncated, not rounded.
#[must_use = "Has no effect if the result is unused"]
pub fn size_in_ieee_units(bytes: u64) -> String {
    const PREFIXES: &[u8] = b" KMGTPEZ";

    let mut size = bytes;
    let mut index = 0;
    while size > 1024 && index < PREFIXES.len() - 1 {
        index += 1;
        size /= 1024;
    }

    match PREFIXES.get(index) {
        Some(b' ') | None => format!("{size}-byte"),
        Some(&prefix) => format!("{size} {}iB", char::from(prefix)),
    }
}

/// Computes the display name of a classified volume.
///
/// In order of preference, this is the filesystem label, the GPT partition name, a name for optical media, a
/// name for a well-known partition type, and finally a description of the filesystem type and size.
#[must_use = "Has no effect if the result is unused"]
pub fn volume_name(volume: &Volume) -> String {
    if let Some(label) = volume.fs_name.as_deref().filter(|x| !x.is_empty()) {
        // the firmware FAT driver reports ExFAT volumes as FAT
        if volume.fs_type == FsType::ExFat && label == "FAT" {
            return "ExFAT".to_string();
        }
        return label.to_string();
    }

    if let Some(part_name) = volume
        .part_name
        .as_deref()
        .filter(|x| !x.is_empty() && !IGNORE_PARTITION_NAMES.contains(x))
    {
        return part_name.to_string();
    }

    if volume.disk_kind == DiskKind::Optical {
        return if volume.fs_type == FsType::Iso9660 {
            "Optical ISO-9660 Image"
        } else {
            "Optical Disc Drive"
        }
        .to_string();
    }

    if let Some(name) = volume.part_type.as_ref().and_then(guid::part_type_name) {
        return name.to_string();
    }

    let type_name = volume.fs_type.name();
    if let Some(size) = volume.fs_size {
        return format!("{} {type_name} Volume", size_in_ieee_units(size));
    }

    match volume.fs_type {
        FsType::Apfs => "APFS Volume (Assumed)".to_string(),
        FsType::Unknown => "Unknown Volume".to_string(),
        _ => format!("{type_name} Volume"),
    }
}

/// Strips characters from a volume name that would confuse the menu or the config file.
///
/// Leading and trailing whitespace is removed, and control characters are dropped.
#[must_use = "Has no effect if the result is unused"]
pub fn sanitize_name(name: &str) -> String {
    name.trim().chars().filter(|c| !c.is_control()).collect()
}

#[cfg(test)]
mod tests {
    use alloc::borrow::ToOwned;

    use super::*;

    #[test]
    fn test_size_in_ieee_units() {
        assert_eq!(size_in_ieee_units(512), "512-byte");
        assert_eq!(size_in_ieee_units(1024), "1024-byte");
        assert_eq!(size_in_ieee_units(200 * 1024 * 1024), "200 MiB");
        assert_eq!(size_in_ieee_units(3 * 1024 * 1024 * 1024 + 5), "3 GiB");
        assert_eq!(size_in_ieee_units(u64::MAX), "15 EiB");
    }

    #[test]
    fn test_label_first() {
        let volume = Volume {
            fs_name: Some("Macintosh HD".to_owned()),
            part_name: Some("Customer".to_owned()),
            ..Volume::default()
        };
        assert_eq!(volume_name(&volume), "Macintosh HD");

        let volume = Volume {
            fs_name: Some("FAT".to_owned()),
            fs_type: FsType::ExFat,
            ..Volume::default()
        };
        assert_eq!(volume_name(&volume), "ExFAT");
    }

    #[test]
    fn test_ignored_partition_names() {
        let volume = Volume {
            part_name: Some("Linux filesystem".to_owned()),
            part_type: Some(guid::LINUX),
            ..Volume::default()
        };
        assert_eq!(volume_name(&volume), "Linux Volume");

        let volume = Volume {
            part_name: Some("home".to_owned()),
            ..Volume::default()
        };
        assert_eq!(volume_name(&volume), "home");
    }

    #[test]
    fn test_optical() {
        let volume = Volume {
            disk_kind: DiskKind::Optical,
            fs_type: FsType::Iso9660,
            ..Volume::default()
        };
        assert_eq!(volume_name(&volume), "Optical ISO-9660 Image");
    }

    #[test]
    fn test_synthesized() {
        let volume = Volume {
            fs_type: FsType::Ext4,
            fs_size: Some(200 * 1024 * 1024),
            ..Volume::default()
        };
        assert_eq!(volume_name(&volume), "200 MiB Ext4 Volume");

        let volume = Volume {
            fs_type: FsType::Apfs,
            ..Volume::default()
        };
        assert_eq!(volume_name(&volume), "APFS Volume (Assumed)");

        let volume = Volume {
            fs_type: FsType::Btrfs,
            ..Volume::default()
        };
        assert_eq!(volume_name(&volume), "Btrfs Volume");

        assert_eq!(volume_name(&Volume::default()), "Unknown Volume");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  Data\t\n"), "Data");
        assert_eq!(sanitize_name("Mac\u{0}OS"), "MacOS");
    }
}
