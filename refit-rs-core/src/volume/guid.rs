// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Well-known partition type GUIDs.

use uefi::{Guid, guid};

use crate::config::types::Architecture;

/// EFI system partition.
pub const ESP: Guid = guid!("c12a7328-f81f-11d2-ba4b-00a0c93ec93b");

/// Apple HFS+.
pub const HFS: Guid = guid!("48465300-0000-11aa-aa11-00306543ecac");

/// Apple APFS container.
pub const APFS: Guid = guid!("7c3457ef-0000-11aa-aa11-00306543ecac");

/// Apple boot (Recovery HD).
pub const RECOVERY_HD: Guid = guid!("426f6f74-0000-11aa-aa11-00306543ecac");

/// Apple RAID.
pub const APPLE_RAID_ON: Guid = guid!("52414944-0000-11aa-aa11-00306543ecac");

/// Apple RAID, offline.
pub const APPLE_RAID_OFF: Guid = guid!("52414944-5f4f-11aa-aa11-00306543ecac");

/// Apple Core Storage (Fusion Drive or `FileVault` container).
pub const CORE_STORAGE: Guid = guid!("53746f72-6167-11aa-aa11-00306543ecac");

/// Apple TV recovery.
pub const APPLE_TV_RECOVERY: Guid = guid!("5265636f-7665-11aa-aa11-00306543ecac");

/// Linux filesystem data.
pub const LINUX: Guid = guid!("0fc63daf-8483-4772-8e79-3d69d8477de4");

/// Microsoft reserved.
pub const MS_RESERVED: Guid = guid!("e3c9e316-0b5c-4db8-817d-f92df00215ae");

/// Microsoft basic data.
pub const MS_BASIC_DATA: Guid = guid!("ebd0a0a2-b9e5-4433-87c0-68b6b72699c7");

/// The partition GUID given to every MBR partition, which has no GUID of its own.
pub const MBR_PLACEHOLDER: Guid = guid!("92a6c61f-7130-49b9-b05c-8d7e7b039127");

/// Discoverable root partition, `x86`.
const ROOT_IA32: Guid = guid!("44479540-f297-41b2-9af7-d131d5f0458a");

/// Discoverable root partition, `x86_64`.
const ROOT_X64: Guid = guid!("4f68bce3-e8cd-4db1-96e7-fbcaf984b709");

/// Discoverable root partition, `aarch64`.
const ROOT_AA64: Guid = guid!("b921b045-1df0-41c3-af44-4c6f280d3fae");

/// The GPT attribute bit meaning "do not mount automatically" for discoverable partitions.
pub const ATTR_NO_AUTO: u64 = 0x8000_0000_0000_0000;

/// The GPT attribute bit marking a partition read-only.
pub const ATTR_READ_ONLY: u64 = 0x1000_0000_0000_0000;

/// The discoverable root partition type for an architecture.
#[must_use = "Has no effect if the result is unused"]
pub const fn discoverable_root(arch: Architecture) -> Option<Guid> {
    match arch {
        Architecture::Ia32 => Some(ROOT_IA32),
        Architecture::X64 => Some(ROOT_X64),
        Architecture::Aa64 => Some(ROOT_AA64),
        Architecture::Other => None,
    }
}

/// Display names for partition types that are recognizable without reading the filesystem.
const PART_TYPE_NAMES: &[(Guid, &str)] = &[
    (APPLE_RAID_ON, "Apple Raid Partition (Online)"),
    (APPLE_RAID_OFF, "Apple Raid Partition (Offline)"),
    (RECOVERY_HD, "Recovery HD"),
    (APPLE_TV_RECOVERY, "AppleTV Recovery Partition"),
    (CORE_STORAGE, "Fusion/FileVault Container"),
    (APFS, "APFS/FileVault Container"),
    (LINUX, "Linux Volume"),
    (MS_RESERVED, "Microsoft Reserved Partition"),
    (HFS, "Unidentified HFS+ Volume"),
];

/// A display name for a partition type, if it is one of the well-known ones.
#[must_use = "Has no effect if the result is unused"]
pub fn part_type_name(part_type: &Guid) -> Option<&'static str> {
    PART_TYPE_NAMES
        .iter()
        .find(|(guid, _)| guid == part_type)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_type_name() {
        assert_eq!(part_type_name(&LINUX), Some("Linux Volume"));
        assert_eq!(part_type_name(&ESP), None);
    }

    #[test]
    fn test_discoverable_root() {
        assert_eq!(discoverable_root(Architecture::X64), Some(ROOT_X64));
        assert_eq!(discoverable_root(Architecture::Other), None);
    }
}
