#![no_main]

use libfuzzer_sys::fuzz_target;
use refit_rs_core::volume::{
    FsType,
    bootcode::{LegacyType, scan_boot_sector},
};

fuzz_target!(|data: &[u8]| {
    let _ = scan_boot_sector(data, LegacyType::Uefi, FsType::Fat, || false);
    let _ = scan_boot_sector(data, LegacyType::Mac, FsType::Ntfs, || true);
});
