// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! APFS volume roles and volume groups.
//!
//! A macOS install is split over several APFS volumes in one container: a sealed System volume, a writable Data
//! volume, and shared Preboot, Recovery and VM volumes. The firmware APFS driver exposes each as its own
//! filesystem, all sharing the container's partition GUID. This module groups them back together so a macOS
//! install shows up once, under one name.

use alloc::{string::String, vec::Vec};
use log::{debug, info};
use uefi::Guid;

use crate::volume::{FsType, Volume, VolumeRole, VolumeSet, guid, name::sanitize_name};

/// The path of the macOS boot loader, relative to a System volume's root.
pub const MACOS_LOADER_PATH: &str = "\\System\\Library\\CoreServices\\boot.efi";

/// The suffix macOS gives the Data volume of a volume group.
const DATA_SUFFIX: &str = " - Data";

/// Infers the role of an APFS volume.
///
/// The firmware driver does not report roles, so they are recovered from the names macOS gives its special
/// volumes, and from whether the volume has a macOS loader.
#[must_use = "Has no effect if the result is unused"]
pub fn infer_role(name: &str, has_macos_loader: bool) -> VolumeRole {
    if name.eq_ignore_ascii_case("Preboot") {
        VolumeRole::Preboot
    } else if name.eq_ignore_ascii_case("Recovery") {
        VolumeRole::Recovery
    } else if name.eq_ignore_ascii_case("VM") {
        VolumeRole::Vm
    } else if name.eq_ignore_ascii_case("Update") {
        VolumeRole::Update
    } else if name.ends_with(DATA_SUFFIX) || name.eq_ignore_ascii_case("Data") {
        VolumeRole::Data
    } else if has_macos_loader {
        VolumeRole::System
    } else {
        VolumeRole::Undefined
    }
}

/// Volumes grouped by role, as indices into [`VolumeSet::volumes`].
///
/// Every volume is in at most one list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleLists {
    /// APFS Recovery volumes.
    pub recovery: Vec<usize>,

    /// APFS volumes that never hold anything bootable.
    pub skip_apfs: Vec<usize>,

    /// APFS Preboot volumes.
    pub preboot: Vec<usize>,

    /// APFS System volumes.
    pub system: Vec<usize>,

    /// APFS Data volumes.
    pub data: Vec<usize>,

    /// HFS+ Recovery HD partitions from before APFS.
    pub hfs_recovery: Vec<usize>,
}

impl RoleLists {
    /// Sorts every volume into its role list.
    #[must_use = "Has no effect if the result is unused"]
    pub fn collect(volumes: &[Volume]) -> Self {
        let mut lists = Self::default();
        for (i, volume) in volumes.iter().enumerate() {
            if volume.fs_type == FsType::Hfsplus && volume.part_type == Some(guid::RECOVERY_HD) {
                lists.hfs_recovery.push(i);
                continue;
            }
            if volume.fs_type != FsType::Apfs {
                continue;
            }
            let list = match volume.role {
                VolumeRole::Recovery => &mut lists.recovery,
                VolumeRole::Preboot => &mut lists.preboot,
                VolumeRole::System => &mut lists.system,
                VolumeRole::Data => &mut lists.data,
                VolumeRole::Vm | VolumeRole::Update | VolumeRole::Baseband | VolumeRole::Xart | VolumeRole::Hardware => {
                    &mut lists.skip_apfs
                }
                _ => continue,
            };
            list.push(i);
        }
        lists
    }
}

/// Returns false if some System, Data or Preboot volume lacks a partition GUID, which is what ties a volume
/// group together.
#[must_use = "Has no effect if the result is unused"]
pub fn valid_apfs(volumes: &[Volume], roles: &RoleLists) -> bool {
    roles
        .system
        .iter()
        .chain(&roles.data)
        .chain(&roles.preboot)
        .filter_map(|&i| volumes.get(i))
        .all(|v| v.part_guid.is_some_and(|g| g != Guid::ZERO))
}

/// Returns false if some APFS container holds more than one macOS install.
///
/// For every Preboot volume, the named System or role-less volumes sharing its partition GUID are counted. More
/// than one means the container cannot be collapsed into a single menu entry.
#[must_use = "Has no effect if the result is unused"]
pub fn single_apfs(volumes: &[Volume], roles: &RoleLists) -> bool {
    roles.preboot.iter().filter_map(|&i| volumes.get(i)).all(|preboot| {
        let instances = volumes
            .iter()
            .filter(|v| {
                v.fs_type == FsType::Apfs
                    && matches!(v.role, VolumeRole::System | VolumeRole::Undefined)
                    && v.part_guid.is_some()
                    && v.part_guid == preboot.part_guid
                    && !v.name().is_empty()
            })
            .count();
        if instances > 1 {
            info!("APFS container holds {instances} macOS installs");
        }
        instances <= 1
    })
}

/// Gives the paired volumes of each APFS volume group the name of their System volume.
///
/// Returns false without changing anything unless there is a Preboot volume and every key volume has a partition
/// GUID. Preboot volumes are only renamed if no container holds more than one install.
pub fn reconcile(set: &mut VolumeSet) -> bool {
    if set.roles.preboot.is_empty() || !set.valid_apfs {
        return false;
    }

    let system_names: Vec<(usize, String)> = set
        .roles
        .system
        .iter()
        .filter_map(|&i| set.volumes.get(i).map(|v| (i, sanitize_name(v.name()))))
        .filter(|(_, name)| !name.is_empty())
        .collect();

    for &i in &set.roles.data {
        let Some(data) = set.volumes.get_mut(i) else {
            continue;
        };
        if !data.name().contains("- Data") {
            continue;
        }
        let paired = system_names.iter().find(|(_, system)| {
            let mut expected = system.clone();
            expected.push_str(DATA_SUFFIX);
            expected == data.name()
        });
        if let Some((_, system)) = paired {
            debug!("Mapped \"{}\" to \"{system}\"", data.name());
            data.name = Some(system.clone());
        }
    }

    if set.single_apfs {
        for &i in &set.roles.preboot {
            let Some(part_guid) = set.volumes.get(i).and_then(|v| v.part_guid) else {
                continue;
            };
            let system = system_names
                .iter()
                .find(|(s, _)| set.volumes.get(*s).is_some_and(|v| v.part_guid == Some(part_guid)));
            if let Some((_, system)) = system
                && let Some(preboot) = set.volumes.get_mut(i)
            {
                debug!("Mapped Preboot to \"{system}\"");
                preboot.name = Some(system.clone());
            }
        }
    }

    true
}
