// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`Settings`], the frozen result of reading a configuration file.
//!
//! [`Settings`] is only built by [`crate::config::builder::SettingsBuilder::finalize`], and cannot change after that.
//! A snapshot of it can be stored in a compact binary form with [`Settings::to_bytes`], which is also how two loads
//! of the same file are compared.

#![allow(clippy::struct_excessive_bools)]

use alloc::{borrow::ToOwned, string::String, vec::Vec};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use tinyvec::ArrayVec;

use crate::{
    BootResult,
    config::types::{
        BannerScale, GraphicsFor, HideUiFlags, IconSizes, NUM_SCAN_OPTIONS, NUM_TOOLS, ToolTag,
    },
    system::{
        log_backend::level_filter_for,
        variable::{REFIT_GUID, VarError, VariableStore},
    },
};

/// The value of [`Settings::text_mode`] that leaves the text mode alone.
pub const DONT_CHANGE_TEXT_MODE: u32 = 1024;

/// The name of the variable a [`Settings`] snapshot is stored in.
pub const SETTINGS_VARIABLE: &str = "RefitSettings";

/// The tools shown when `showtools` is not given.
pub const DEFAULT_TOOLS: [ToolTag; 12] = [
    ToolTag::Shell,
    ToolTag::Memtest,
    ToolTag::Gdisk,
    ToolTag::AppleRecovery,
    ToolTag::WindowsRecovery,
    ToolTag::MokTool,
    ToolTag::About,
    ToolTag::Hidden,
    ToolTag::Shutdown,
    ToolTag::Reboot,
    ToolTag::Firmware,
    ToolTag::FwupdateTool,
];

/// Every setting of the boot manager.
///
/// Fields are named after the directive that sets them, where one exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Seconds before the default entry is booted. Zero waits forever.
    pub timeout: i32,

    /// Boot the default entry without showing the menu, set when `timeout` is negative.
    pub direct_boot: bool,

    /// Seconds of inactivity before the screen is blanked.
    pub screensaver: i32,

    /// Forces the interface scale. Zero picks one from the screen size.
    pub scale_ui: i32,

    /// The CSR value to activate on start.
    pub active_csr: i32,

    /// Verbosity, from 0 to 4.
    pub log_level: i32,

    /// Seconds to wait before scanning for loaders.
    pub scan_delay: u32,

    /// The text mode to switch to, or [`DONT_CHANGE_TEXT_MODE`].
    pub text_mode: u32,

    /// The most entries shown in the first row. Zero is no limit.
    pub max_tags: u32,

    /// Mouse pointer speed, from 1 to 32.
    pub mouse_speed: u32,

    /// Icon and pointer sizes.
    pub icon_sizes: IconSizes,

    /// The directory icons are loaded from.
    pub icons_dir: Option<String>,

    /// Boot arguments passed to macOS.
    pub set_boot_args: Option<String>,

    /// The banner image.
    pub banner: Option<String>,

    /// The selection background for small icons.
    pub selection_small: Option<String>,

    /// The selection background for big icons.
    pub selection_big: Option<String>,

    /// The entry selected by default. `+` is the previously booted entry.
    pub default_selection: Option<String>,

    /// The macOS version to report to the firmware.
    pub spoof_osx_version: Option<String>,

    /// The font image.
    pub font: Option<String>,

    /// Extra directories scanned for loaders.
    pub also_scan_dirs: Vec<String>,

    /// Directories never scanned for loaders, optionally prefixed with a volume.
    pub dont_scan_dirs: Vec<String>,

    /// Loader file names never shown.
    pub dont_scan_files: Vec<String>,

    /// Tool file names never shown.
    pub dont_scan_tools: Vec<String>,

    /// Firmware boot entries never shown.
    pub dont_scan_firmware: Vec<String>,

    /// Volumes never scanned.
    pub dont_scan_volumes: Vec<String>,

    /// Windows recovery loaders.
    pub windows_recovery_files: Vec<String>,

    /// macOS recovery loaders.
    pub macos_recovery_files: Vec<String>,

    /// Directories drivers are loaded from.
    pub scan_driver_dirs: Vec<String>,

    /// Extra strings matched as kernel versions when folding kernels.
    pub extra_kernel_version_strings: Vec<String>,

    /// File name prefixes of Linux kernels.
    pub linux_prefixes: Vec<String>,

    /// The CSR values that `csr_rotate` cycles through.
    pub csr_values: Vec<u32>,

    /// Parts of the interface that are hidden.
    pub hide_ui: HideUiFlags,

    /// Loader families started in graphics mode.
    pub graphics_for: GraphicsFor,

    /// How the banner is scaled.
    pub banner_scale: BannerScale,

    /// Scan targets in order, one character each, blank when unused.
    pub scan_for: [char; NUM_SCAN_OPTIONS],

    /// The tools in the second row, in order. `None` is a blank slot left by an unknown name.
    pub show_tools: ArrayVec<[Option<ToolTag>; NUM_TOOLS]>,

    /// If the hidden entries manager is among [`Self::show_tools`].
    pub hidden_tags: bool,

    /// Requested screen width, or 0 for the current one.
    pub requested_width: u32,

    /// Requested screen height, or 0 to pick a mode by width alone.
    pub requested_height: u32,

    /// Screen background colour.
    pub screen_rgb: [i32; 3],

    /// If [`Self::screen_rgb`] is valid and replaces the default background.
    pub custom_screen_bg: bool,

    /// Shut down instead of booting when the timeout runs out.
    pub shutdown_after_timeout: bool,

    /// Store the boot manager's variables in NVRAM rather than in a `vars` directory.
    pub use_nvram: bool,

    /// Scan for BIOS loaders through the firmware's legacy boot entries.
    pub deep_legacy_scan: bool,

    /// Text-only menu.
    pub text_only: bool,

    /// Show kernels even when they have no matching initrd.
    pub scan_all_linux: bool,

    /// Fold kernels in the same directory into one entry.
    pub fold_linux_kernels: bool,

    /// Enable and lock VMX before booting.
    pub enable_and_lock_vmx: bool,

    /// Write the systemd boot loader interface variables.
    pub write_systemd_vars: bool,

    /// Mouse support.
    pub enable_mouse: bool,

    /// Touch support.
    pub enable_touch: bool,

    /// Boot the selected entry once without making it the new default.
    pub transient_boot: bool,

    /// Ignore icons next to loaders.
    pub ignore_hidden_icons: bool,

    /// Use icons stored on other volumes.
    pub external_hidden_icons: bool,

    /// Prefer hidden `.VolumeIcon` files over bundled icons.
    pub prefer_hidden_icons: bool,

    /// Use the text renderer.
    pub text_renderer: bool,

    /// Pass UGA through to GOP.
    pub uga_pass_through: bool,

    /// Provide GOP on the console.
    pub provide_console_gop: bool,

    /// Use the direct GOP renderer.
    pub use_direct_gop: bool,

    /// Keep going when a loader prints a warning.
    pub continue_on_warning: bool,

    /// Force TRIM on SSDs.
    pub force_trim: bool,

    /// Skip the macOS compatibility check.
    pub disable_compat_check: bool,

    /// Disable Apple Mobile File Integrity.
    pub disable_amfi: bool,

    /// Normalise CSR values.
    pub normalise_csr: bool,

    /// Reload GOP drivers.
    pub reload_gop: bool,

    /// Load an NVMe driver.
    pub supply_nvme: bool,

    /// Load an APFS driver.
    pub supply_apfs: bool,

    /// Emulate UEFI 2.x on older firmware.
    pub supply_uefi: bool,

    /// Silence the APFS driver.
    pub silence_apfs: bool,

    /// Hide the APFS data and system volumes that belong together.
    pub sync_apfs: bool,

    /// Protect NVRAM from writes by other operating systems. Only possible on Apple firmware.
    pub protect_nvram: bool,

    /// Scan ESPs other than the one the boot manager was loaded from.
    pub scan_other_esp: bool,

    /// Show the hidden entries manager when any entry is hidden.
    pub tags_help: bool,
}

impl Settings {
    /// Creates [`Settings`] holding the defaults used before a configuration file is read.
    ///
    /// Apple firmware scans for Mac-style legacy loaders by default.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(apple_firmware: bool) -> Self {
        let mut scan_for = [' '; NUM_SCAN_OPTIONS];
        let scan = if apple_firmware { "ihebocm" } else { "ieom" };
        for (slot, c) in scan_for.iter_mut().zip(scan.chars()) {
            *slot = c;
        }

        let mut show_tools = ArrayVec::new();
        show_tools.extend(DEFAULT_TOOLS.map(Some));

        Self {
            timeout: 0,
            direct_boot: false,
            screensaver: 0,
            scale_ui: 0,
            active_csr: 0,
            log_level: 0,
            scan_delay: 0,
            text_mode: DONT_CHANGE_TEXT_MODE,
            max_tags: 0,
            mouse_speed: 4,
            icon_sizes: IconSizes::default(),
            icons_dir: None,
            set_boot_args: None,
            banner: None,
            selection_small: None,
            selection_big: None,
            default_selection: None,
            spoof_osx_version: None,
            font: None,
            also_scan_dirs: Vec::new(),
            dont_scan_dirs: Vec::new(),
            dont_scan_files: Vec::new(),
            dont_scan_tools: Vec::new(),
            dont_scan_firmware: Vec::new(),
            dont_scan_volumes: Vec::new(),
            windows_recovery_files: Vec::new(),
            macos_recovery_files: Vec::new(),
            scan_driver_dirs: Vec::new(),
            extra_kernel_version_strings: Vec::new(),
            linux_prefixes: Vec::new(),
            csr_values: Vec::new(),
            hide_ui: HideUiFlags::empty(),
            graphics_for: GraphicsFor::OSX,
            banner_scale: BannerScale::NoScale,
            scan_for,
            show_tools,
            hidden_tags: true,
            requested_width: 0,
            requested_height: 0,
            screen_rgb: [0; 3],
            custom_screen_bg: false,
            shutdown_after_timeout: false,
            use_nvram: false,
            deep_legacy_scan: false,
            text_only: false,
            scan_all_linux: true,
            fold_linux_kernels: true,
            enable_and_lock_vmx: false,
            write_systemd_vars: false,
            enable_mouse: false,
            enable_touch: false,
            transient_boot: false,
            ignore_hidden_icons: false,
            external_hidden_icons: false,
            prefer_hidden_icons: false,
            text_renderer: false,
            uga_pass_through: false,
            provide_console_gop: false,
            use_direct_gop: false,
            continue_on_warning: false,
            force_trim: false,
            disable_compat_check: false,
            disable_amfi: false,
            normalise_csr: false,
            reload_gop: false,
            supply_nvme: false,
            supply_apfs: false,
            supply_uefi: false,
            silence_apfs: false,
            sync_apfs: false,
            protect_nvram: false,
            scan_other_esp: false,
            tags_help: false,
        }
    }

    /// The scan targets as a string, without the blank padding.
    #[must_use = "Has no effect if the result is unused"]
    pub fn scan_for(&self) -> String {
        self.scan_for.iter().collect::<String>().trim_end().to_owned()
    }

    /// The [`LevelFilter`] matching [`Self::log_level`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn level_filter(&self) -> LevelFilter {
        level_filter_for(self.log_level)
    }

    /// Serializes the settings into a compact snapshot.
    ///
    /// # Errors
    ///
    /// May return an `Error` if serialization failed, which should only happen when out of memory.
    pub fn to_bytes(&self) -> postcard::Result<Vec<u8>> {
        postcard::to_allocvec(self)
    }

    /// Deserializes settings from a snapshot made by [`Self::to_bytes`].
    ///
    /// # Errors
    ///
    /// May return an `Error` if the snapshot is malformed.
    pub fn from_bytes(bytes: &[u8]) -> postcard::Result<Self> {
        postcard::from_bytes(bytes)
    }

    /// Stores a snapshot of the settings in the boot manager's variables.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the snapshot could not be made or written, including when the stored snapshot is
    /// already the same.
    pub fn save(&self, store: &mut VariableStore) -> BootResult<()> {
        let bytes = self
            .to_bytes()
            .map_err(|_| VarError::Corrupt(SETTINGS_VARIABLE.to_owned()))?;
        store.set_raw(REFIT_GUID, SETTINGS_VARIABLE, &bytes, true)
    }

    /// Loads the snapshot stored by [`Self::save`], if there is one.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the variable could not be read, or holds a malformed snapshot.
    pub fn load(store: &mut VariableStore) -> BootResult<Option<Self>> {
        let Some(bytes) = store.get_raw(REFIT_GUID, SETTINGS_VARIABLE)? else {
            return Ok(None);
        };
        let settings =
            Self::from_bytes(&bytes).map_err(|_| VarError::Corrupt(SETTINGS_VARIABLE.to_owned()))?;
        Ok(Some(settings))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::variable::MemoryVariables;
    use alloc::{boxed::Box, string::ToString, vec};

    #[test]
    fn test_defaults() {
        let settings = Settings::new(false);
        assert_eq!(settings.scan_for(), "ieom");
        assert_eq!(settings.show_tools.len(), 12);
        assert!(settings.hidden_tags);
        assert_eq!(settings.graphics_for, GraphicsFor::OSX);
        assert_eq!(Settings::new(true).scan_for(), "ihebocm");
    }

    #[test]
    fn test_snapshot() -> postcard::Result<()> {
        let mut settings = Settings::new(true);
        settings.timeout = -1;
        settings.direct_boot = true;
        settings.csr_values = vec![0x77, 0x67];
        settings.banner = Some("banner.png".to_string());
        settings.hide_ui = HideUiFlags::BANNER | HideUiFlags::HINTS;

        let bytes = settings.to_bytes()?;
        assert_eq!(Settings::from_bytes(&bytes)?, settings);
        assert!(Settings::from_bytes(&bytes[..bytes.len() / 2]).is_err());
        Ok(())
    }

    #[test]
    fn test_save_load() -> BootResult<()> {
        let mut store = VariableStore::new(Box::new(MemoryVariables::default()), None, true);
        assert_eq!(Settings::load(&mut store)?, None);

        let settings = Settings {
            timeout: 7,
            ..Settings::default()
        };
        settings.save(&mut store)?;
        assert_eq!(Settings::load(&mut store)?, Some(settings.clone()));
        assert!(settings.save(&mut store).is_err());
        Ok(())
    }
}
