// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Defaults applied when the primary configuration file is read.
//!
//! Several lists start out filled, so that shims, MOK managers, firmware updaters and the boot manager itself do not
//! show up as loaders. A configuration file can still replace any of them.

use alloc::{
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};

use crate::config::{ParseContext, Settings, handlers::clean_path_slashes, types::Architecture};

/// Directories memtest is usually installed to. None of them hold OS loaders.
pub const MEMTEST_LOCATIONS: [&str; 9] = [
    "\\EFI\\tools\\memtest86",
    "\\EFI\\tools\\memtest",
    "\\EFI\\memtest86",
    "\\EFI\\memtest",
    "\\EFI\\BOOT\\tools",
    "\\EFI\\BOOT\\tools_x64",
    "\\EFI\\tools_x64",
    "\\EFI\\tools",
    "\\EFI",
];

/// The volume label of Lenovo's recovery ESP.
pub const LRS_ESP: &str = "LRS_ESP";

/// The macOS recovery loader, relative to a recovery volume.
pub const MACOS_RECOVERY_FILE: &str = "com.apple.recovery.boot\\boot.efi";

/// Directories searched for Linux kernels on every volume.
pub const ALSO_SCAN_DIRS: [&str; 2] = ["boot", "@\\boot"];

/// The default file name prefixes of Linux kernels.
pub const LINUX_PREFIXES: [&str; 3] = ["vmlinuz", "bzImage", "kernel"];

/// Shims and fallback loaders, which are never shown as loaders of their own.
#[must_use = "Has no effect if the result is unused"]
pub fn shim_files(arch: Architecture) -> Vec<String> {
    let mut files = vec!["shim.efi".to_string()];
    if let Some(suffix) = arch.suffix() {
        files.push(format!("shim{suffix}.efi"));
    }
    files.extend(["shim-fedora.efi", "shim-centos.efi", "PreLoader.efi", "fb.efi"].map(String::from));
    if let Some(suffix) = arch.suffix() {
        files.push(format!("fb{suffix}.efi"));
    }
    files
}

/// Machine Owner Key managers, which are shown as tools rather than loaders.
#[must_use = "Has no effect if the result is unused"]
pub fn mok_files(arch: Architecture) -> Vec<String> {
    let mut files: Vec<String> = [
        "MokManager.efi",
        "HashTool.efi",
        "HashTool-signed.efi",
        "KeyTool.efi",
        "KeyTool-signed.efi",
    ]
    .map(String::from)
    .into();
    if let Some(suffix) = arch.suffix() {
        files.push(format!("mm{suffix}.efi"));
    }
    files
}

/// Firmware update tools, which are shown as tools rather than loaders.
#[must_use = "Has no effect if the result is unused"]
pub fn fwupdate_files(arch: Architecture) -> Vec<String> {
    vec![format!("fwup{}.efi", arch.suffix().unwrap_or_default())]
}

/// Windows recovery loaders. A `Recovery:` prefix restricts an entry to volumes named `Recovery`.
#[must_use = "Has no effect if the result is unused"]
pub fn windows_recovery_files(arch: Architecture) -> Vec<String> {
    let mut files = vec!["\\EFI\\Microsoft\\Boot\\LrsBootmgr.efi".to_string()];
    if let Some(suffix) = arch.suffix() {
        files.push(format!("Recovery:\\EFI\\BOOT\\boot{suffix}.efi"));
    }
    files.push("Recovery:\\EFI\\BOOT\\boot.efi".to_string());
    files.push("\\EFI\\OEM\\Boot\\bootmgfw.efi".to_string());
    files
}

/// Fills the lists that a primary configuration file starts out with.
///
/// The boot manager's own directory is excluded from scanning, qualified by its partition GUID when it is known,
/// so that the same directory on another volume is still scanned.
pub fn apply_main_defaults(settings: &mut Settings, ctx: &ParseContext) {
    settings.also_scan_dirs = ALSO_SCAN_DIRS.map(String::from).into();

    let self_dir = clean_path_slashes(&ctx.self_dir);
    settings.dont_scan_dirs = Vec::with_capacity(MEMTEST_LOCATIONS.len() + 1);
    if !ctx.self_dir.is_empty() {
        settings.dont_scan_dirs.push(match ctx.self_part_guid() {
            Some(guid) => format!("{guid}:{self_dir}"),
            None => self_dir,
        });
    }
    settings.dont_scan_dirs.extend(MEMTEST_LOCATIONS.map(String::from));

    settings.dont_scan_files = shim_files(ctx.arch);
    settings.dont_scan_files.extend(mok_files(ctx.arch));
    settings.dont_scan_files.extend(fwupdate_files(ctx.arch));

    settings.dont_scan_tools.clear();
    settings.dont_scan_firmware.clear();
    settings.dont_scan_volumes = vec![LRS_ESP.to_string()];
    settings.windows_recovery_files = windows_recovery_files(ctx.arch);
    settings.macos_recovery_files = vec![MACOS_RECOVERY_FILE.to_string()];
    settings.default_selection = Some("+".to_string());
}
