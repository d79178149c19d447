// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Duplicate filesystem suppression.
//!
//! Firmware sometimes exposes one filesystem through several handles, such as both halves of a RAID mirror. Each
//! copy after the first is kept in the list, since it may still be needed to relate partitions to disks, but is
//! marked unreadable so it is not scanned for loaders twice. Copies of the volume the boot manager runs from are the
//! exception: that volume is the one kept, and every other copy is marked.

use log::debug;

use crate::volume::{Volume, VolumeSerial};

/// How duplicates are decided.
#[derive(Clone, Copy, Debug, Default)]
pub struct DedupPolicy {
    /// Exempt ESPs from serial matching.
    ///
    /// ESPs created by the same tool often share a serial across machines, so they are only suppressed if they
    /// share the serial of the volume the boot manager runs from.
    pub scan_other_esp: bool,

    /// The serial of the volume the boot manager runs from.
    pub self_serial: Option<VolumeSerial>,

    /// The index of the volume the boot manager runs from.
    ///
    /// It is the copy that survives for [`Self::self_serial`], wherever it sits in the list.
    pub self_volume: Option<usize>,
}

/// Returns true if the volume at `index` repeats the serial of another volume that is kept instead.
fn is_duplicate(volumes: &[Volume], index: usize, policy: &DedupPolicy) -> bool {
    let Some(volume) = volumes.get(index) else {
        return false;
    };
    if volume.serial.is_null() {
        return false;
    }

    if let Some(self_volume) = policy.self_volume
        && policy.self_serial == Some(volume.serial)
    {
        return self_volume != index;
    }

    let seen_before = volumes[..index].iter().any(|x| x.serial == volume.serial);
    if !seen_before {
        return false;
    }

    if policy.scan_other_esp && volume.is_esp() {
        return policy.self_serial == Some(volume.serial);
    }

    true
}

/// Marks every duplicate volume unreadable.
pub fn mark_duplicates(volumes: &mut [Volume], policy: &DedupPolicy) {
    for index in 0..volumes.len() {
        if is_duplicate(volumes, index, policy) {
            let volume = &mut volumes[index];
            debug!("Skipping duplicate volume \"{}\"", volume.name());
            volume.is_readable = false;
        }
    }
}
