// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Various helper functions for other modules.

use alloc::string::String;
use thiserror::Error;
use uefi::{
    CStr16, CString16, Guid,
    boot,
    proto::device_path::{
        DevicePath,
        text::{AllowShortcuts, DevicePathToText, DisplayOnly},
    },
};

use crate::{BootResult, config::types::Architecture};

/// An `Error` that may result from converting a [`String`] to another format.
#[derive(Error, Debug)]
pub enum StrError {
    /// A [`String`] could not be converted into a [`CString16`]
    #[error("Could not convert String to CString16")]
    CstrFromStr(#[from] uefi::data_types::FromStrError),
}

/// Converts a [`DevicePath`] into its textual form, such as `\EFI\refind\refind_x64.efi` for a file path.
///
/// # Errors
///
/// May return an `Error` if the firmware does not support `DevicePathToText`, or the conversion failed.
pub(crate) fn device_path_to_text(device_path: &DevicePath) -> BootResult<String> {
    let handle = boot::get_handle_for_protocol::<DevicePathToText>()?;
    let device_path_to_text = boot::open_protocol_exclusive::<DevicePathToText>(handle)?;
    let text = device_path_to_text.convert_device_path_to_text(
        device_path,
        DisplayOnly(true),
        AllowShortcuts(false),
    )?;
    Ok(cstr_to_string(&text))
}

/// Gets a [`CString16`] from an [`&str`].
///
/// # Errors
///
/// May return an `Error` if the string could not be converted into a [`CString16`], either due to unsupported
/// characters or an invalid nul character.
pub(crate) fn str_to_cstr(str: &str) -> Result<CString16, StrError> {
    Ok(CString16::try_from(str)?)
}

/// Gets a [`CString16`] path given a directory and a filename.
///
/// # Errors
///
/// May return an `Error` if the joined path contains characters that cannot be represented in UCS-2.
pub(crate) fn join_path(dir: &str, filename: &str) -> Result<CString16, StrError> {
    let dir = dir.trim_end_matches('\\');
    let mut path = String::with_capacity(dir.len() + 1 + filename.len());
    path.push_str(dir);
    path.push('\\');
    path.push_str(filename.trim_start_matches('\\'));
    str_to_cstr(&path)
}

/// Converts a UCS-2 string slice into an owned [`String`].
#[must_use = "Has no effect if the result is unused"]
pub(crate) fn cstr_to_string(str: &CStr16) -> String {
    String::from(str)
}

/// Decodes a fixed-size, nul-padded UTF-16 name such as a GPT partition name.
#[must_use = "Has no effect if the result is unused"]
pub(crate) fn utf16_name(units: impl IntoIterator<Item = u16>) -> String {
    char::decode_utf16(units.into_iter().take_while(|&c| c != 0))
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Parses a textual GUID of the form `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
#[must_use = "Has no effect if the result is unused"]
pub fn parse_guid(str: &str) -> Option<Guid> {
    Guid::try_parse(str.trim()).ok()
}

/// Case insensitive (ASCII) substring search.
#[must_use = "Has no effect if the result is unused"]
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

/// Gets the target architecture of the boot manager binary.
#[must_use = "Has no effect if the result is unused"]
pub const fn get_arch() -> Architecture {
    if cfg!(target_arch = "x86") {
        Architecture::Ia32
    } else if cfg!(target_arch = "x86_64") {
        Architecture::X64
    } else if cfg!(target_arch = "aarch64") {
        Architecture::Aa64
    } else {
        Architecture::Other
    }
}

/// Normalizes a path to make it more aligned with UEFI expectations
///
/// Currently this means replacing all forward slashes with backslashes.
#[must_use = "Has no effect if the result is unused"]
pub(crate) fn normalize_path(path: &str) -> String {
    path.replace('/', "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_to_cstr() -> Result<(), StrError> {
        let cstr = str_to_cstr("foo bar")?;
        let str = String::from(&cstr);
        assert_eq!(str, "foo bar".to_owned());
        Ok(())
    }

    #[test]
    fn test_join_path() -> Result<(), StrError> {
        let path = join_path("\\EFI\\refind\\", "refind.conf")?;
        assert_eq!(String::from(&path), "\\EFI\\refind\\refind.conf");
        let path = join_path("", "\\vars")?;
        assert_eq!(String::from(&path), "\\vars");
        Ok(())
    }

    #[test]
    fn test_utf16_name() {
        let mut raw = [0u16; 36];
        for (slot, c) in raw.iter_mut().zip("EFI system".encode_utf16()) {
            *slot = c;
        }
        assert_eq!(utf16_name(raw), "EFI system");
    }

    #[test]
    fn test_parse_guid() {
        let guid = parse_guid("C12A7328-F81F-11D2-BA4B-00A0C93EC93B");
        assert_eq!(
            guid,
            Some(uefi::guid!("c12a7328-f81f-11d2-ba4b-00a0c93ec93b"))
        );
        assert_eq!(parse_guid("not a guid"), None);
    }

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("Macintosh HD - Data", "- data"));
        assert!(!contains_ignore_case("Macintosh HD", "data"));
    }

    #[test]
    fn test_normalize_path() {
        let path = "/some/path/from/linux/fs";
        assert_eq!(normalize_path(path), "\\some\\path\\from\\linux\\fs");
        let path = "\\a\\completely\\normal\\path";
        assert_eq!(normalize_path(path), path);
    }
}
