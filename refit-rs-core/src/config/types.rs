// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Small value types shared by the configuration reader and its consumers.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// The number of one-character slots in the `scanfor` directive.
pub const NUM_SCAN_OPTIONS: usize = 11;

/// The number of slots available to the `showtools` directive.
pub const NUM_TOOLS: usize = 28;

/// The largest CSR value accepted by `csr_values`.
pub const CSR_MAX_LEGAL_VALUE: u32 = 0xFFF;

/// The default size of the mouse pointer in pixels.
pub const DEFAULT_MOUSE_SIZE: u32 = 16;

/// The default size of small (tool) icons.
pub const DEFAULT_SMALL_ICON_SIZE: u32 = 48;

/// The default size of big (loader) icons.
pub const DEFAULT_BIG_ICON_SIZE: u32 = 128;

bitflags! {
    /// Parts of the user interface hidden by the `hideui` directive.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct HideUiFlags: u32 {
        /// The banner image.
        const BANNER = 0x0001;
        /// The label under the selected entry.
        const LABEL = 0x0002;
        /// Single user mode entries.
        const SINGLEUSER = 0x0004;
        /// Hardware test entries.
        const HWTEST = 0x0008;
        /// Scroll arrows.
        const ARROWS = 0x0010;
        /// Key hints.
        const HINTS = 0x0020;
        /// The options editor.
        const EDITOR = 0x0040;
        /// Safe mode entries.
        const SAFEMODE = 0x0080;
        /// Volume badges.
        const BADGES = 0x0100;
    }
}

impl HideUiFlags {
    /// Resolve a single `hideui` flag name.
    ///
    /// `all`, `every` and `everything` are not resolved here, since they set every bit rather than one.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_config_name(name: &str) -> Option<Self> {
        match &*name.to_ascii_lowercase() {
            "banner" => Some(Self::BANNER),
            "label" => Some(Self::LABEL),
            "singleuser" => Some(Self::SINGLEUSER),
            "hwtest" => Some(Self::HWTEST),
            "arrows" => Some(Self::ARROWS),
            "hints" => Some(Self::HINTS),
            "editor" => Some(Self::EDITOR),
            "safemode" => Some(Self::SAFEMODE),
            "badges" => Some(Self::BADGES),
            _ => None,
        }
    }
}

bitflags! {
    /// Loader families that are started in graphics mode, from `use_graphics_for`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct GraphicsFor: u32 {
        /// macOS.
        const OSX = 1;
        /// Linux kernels.
        const LINUX = 2;
        /// ELILO.
        const ELILO = 4;
        /// GRUB.
        const GRUB = 8;
        /// Windows.
        const WINDOWS = 16;
        /// OpenCore.
        const OPENCORE = 32;
        /// Clover.
        const CLOVER = 64;
    }
}

impl GraphicsFor {
    /// Resolve a single `use_graphics_for` name.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_config_name(name: &str) -> Option<Self> {
        match &*name.to_ascii_lowercase() {
            "osx" => Some(Self::OSX),
            "linux" => Some(Self::LINUX),
            "elilo" => Some(Self::ELILO),
            "grub" => Some(Self::GRUB),
            "windows" => Some(Self::WINDOWS),
            "opencore" => Some(Self::OPENCORE),
            "clover" => Some(Self::CLOVER),
            _ => None,
        }
    }
}

/// A tool or built-in action that may be shown in the second menu row.
///
/// The discriminants are stable, and are the values stored in a persisted snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ToolTag {
    /// The about screen.
    #[default]
    About = 1,
    /// Reboot the machine.
    Reboot = 2,
    /// Shut down the machine.
    Shutdown = 3,
    /// Exit the boot manager.
    Exit = 8,
    /// The EFI shell.
    Shell = 9,
    /// The `gptsync` tool.
    Gptsync = 10,
    /// macOS recovery.
    AppleRecovery = 12,
    /// Windows recovery.
    WindowsRecovery = 13,
    /// MOK management tools.
    MokTool = 14,
    /// Reboot into firmware setup.
    Firmware = 15,
    /// Memtest86.
    Memtest = 16,
    /// The `gdisk` partitioner.
    Gdisk = 17,
    /// Network boot.
    Netboot = 18,
    /// Rotate through the configured CSR values.
    CsrRotate = 19,
    /// Firmware update tool.
    FwupdateTool = 20,
    /// The hidden entries manager.
    Hidden = 21,
    /// Install the boot manager.
    Install = 22,
    /// Manage the firmware boot order.
    BootOrder = 23,
    /// Show the Apple boot screen.
    ShowBootscreen = 24,
    /// Clean NVRAM.
    CleanNvram = 26,
}

impl ToolTag {
    /// Resolve a `showtools` name.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_name(name: &str) -> Option<Self> {
        match &*name.to_ascii_lowercase() {
            "exit" => Some(Self::Exit),
            "shell" => Some(Self::Shell),
            "gdisk" => Some(Self::Gdisk),
            "about" => Some(Self::About),
            "reboot" => Some(Self::Reboot),
            "gptsync" => Some(Self::Gptsync),
            "install" => Some(Self::Install),
            "netboot" => Some(Self::Netboot),
            "memtest" | "memtest86" => Some(Self::Memtest),
            "shutdown" => Some(Self::Shutdown),
            "mok_tool" => Some(Self::MokTool),
            "firmware" => Some(Self::Firmware),
            "bootorder" => Some(Self::BootOrder),
            "csr_rotate" => Some(Self::CsrRotate),
            "fwupdate" => Some(Self::FwupdateTool),
            "show_bootscreen" => Some(Self::ShowBootscreen),
            "clean_nvram" => Some(Self::CleanNvram),
            "windows_recovery" => Some(Self::WindowsRecovery),
            "apple_recovery" => Some(Self::AppleRecovery),
            "hidden_tags" => Some(Self::Hidden),
            _ => None,
        }
    }
}

/// How the banner image is scaled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BannerScale {
    /// Drawn at its native size.
    #[default]
    NoScale,
    /// Stretched to the whole screen.
    FillScreen,
}

/// Icon sizes in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconSizes {
    /// Volume badges, always a quarter of [`Self::big`].
    pub badge: u32,
    /// Tool icons.
    pub small: u32,
    /// Loader icons.
    pub big: u32,
    /// The mouse pointer.
    pub mouse: u32,
}

impl Default for IconSizes {
    fn default() -> Self {
        Self {
            badge: DEFAULT_BIG_ICON_SIZE / 4,
            small: DEFAULT_SMALL_ICON_SIZE,
            big: DEFAULT_BIG_ICON_SIZE,
            mouse: DEFAULT_MOUSE_SIZE,
        }
    }
}

/// The architecture of the running boot manager binary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
    /// 32-bit x86.
    Ia32,
    /// `x86_64`.
    X64,
    /// 64-bit ARM.
    Aa64,
    /// Anything else.
    Other,
}

impl Architecture {
    /// The suffix used by per-architecture file names (`shimx64.efi`, `mmia32.efi`, ...).
    #[must_use = "Has no effect if the result is unused"]
    pub const fn suffix(self) -> Option<&'static str> {
        match self {
            Self::Ia32 => Some("ia32"),
            Self::X64 => Some("x64"),
            Self::Aa64 => Some("aa64"),
            Self::Other => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hideui_names() {
        assert_eq!(HideUiFlags::from_config_name("Banner"), Some(HideUiFlags::BANNER));
        assert_eq!(HideUiFlags::from_config_name("badges"), Some(HideUiFlags::BADGES));
        assert_eq!(HideUiFlags::from_config_name("all"), None);
        assert_eq!(HideUiFlags::all().bits(), 0x1ff);
    }

    #[test]
    fn test_tool_names() {
        assert_eq!(ToolTag::from_name("memtest86"), Some(ToolTag::Memtest));
        assert_eq!(ToolTag::from_name("MEMTEST"), Some(ToolTag::Memtest));
        assert_eq!(ToolTag::from_name("hidden_tags"), Some(ToolTag::Hidden));
        assert_eq!(ToolTag::from_name("frobnicate"), None);
        assert_eq!(ToolTag::CleanNvram as u8, 26);
    }

    #[test]
    fn test_icon_defaults() {
        let sizes = IconSizes::default();
        assert_eq!(sizes.badge, 32);
        assert_eq!(sizes.small, 48);
        assert_eq!(sizes.big, 128);
        assert_eq!(sizes.mouse, 16);
    }
}
