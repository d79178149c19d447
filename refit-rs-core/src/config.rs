// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Reads `refind.conf`-style configuration files.
//!
//! A configuration file is a list of directives, one per line, such as `timeout 20` or `scanfor internal,external`.
//! The [`tokenizer`] splits lines into tokens, the [`directives`] table routes each line to a handler, and the
//! [`builder`] accumulates the results until the file ends, at which point it is frozen into an immutable
//! [`Settings`]. `menuentry` blocks are parsed by the [`stanza`] state machine into [`MenuEntry`] values.
//!
//! Everything here works on bytes handed over by a [`ConfigSource`], so the whole reader can run on a host.
//!
//! # Example
//!
//! ```
//! use refit_rs_core::config::{MemorySource, ParseContext, reader::load_config};
//!
//! let mut source = MemorySource::new();
//! source.insert("refind.conf", "timeout 5\nhideui banner\n");
//!
//! let loaded = load_config(&mut source, &ParseContext::default(), "refind.conf");
//! assert_eq!(loaded.settings.timeout, 5);
//! ```

use alloc::{
    collections::btree_map::BTreeMap,
    string::{String, ToString},
    vec::Vec,
};

use crate::{
    config::types::Architecture,
    system::{helper::get_arch, time::minute_of_day},
    volume::{
        Volume,
        scan::{ImageLocation, is_apple_firmware},
    },
};

pub mod builder;
pub mod defaults;
pub mod directives;
pub mod handlers;
pub mod linux;
pub mod reader;
pub mod settings;
pub mod stanza;
pub mod tokenizer;
pub mod types;

pub use settings::Settings;
pub use stanza::{MenuEntry, SubEntry};

/// The name of the primary configuration file.
pub const CONFIG_FILE_NAME: &str = "refind.conf";

/// A source of configuration files.
///
/// Paths use `\` as the separator. A path that starts with `\` is relative to the root of the volume, anything else
/// has already been resolved by the caller.
pub trait ConfigSource {
    /// Reads the whole content of a file, or `None` if it does not exist or could not be read.
    fn read(&mut self, path: &str) -> Option<Vec<u8>>;

    /// Checks if a file or directory exists.
    fn exists(&mut self, path: &str) -> bool;
}

/// A [`ConfigSource`] held in memory.
///
/// Paths are matched case insensitively, the same as on FAT.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    /// The files, keyed by lowercased path without a leading `\`.
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
    /// Creates an empty [`MemorySource`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new() -> Self {
        Self {
            files: BTreeMap::new(),
        }
    }

    /// Adds a file. Directories are implied by the paths of the files inside them.
    pub fn insert(&mut self, path: &str, content: impl Into<Vec<u8>>) {
        self.files.insert(Self::key(path), content.into());
    }

    /// Normalizes a path into a lookup key.
    fn key(path: &str) -> String {
        path.trim_start_matches('\\').to_ascii_lowercase()
    }
}

impl ConfigSource for MemorySource {
    fn read(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.get(&Self::key(path)).cloned()
    }

    fn exists(&mut self, path: &str) -> bool {
        let key = Self::key(path);
        self.files.contains_key(&key)
            || self
                .files
                .keys()
                .any(|x| x.strip_prefix(&key).is_some_and(|rest| rest.starts_with('\\')))
    }
}

/// The environment a configuration file is read in.
#[derive(Clone, Debug)]
pub struct ParseContext<'a> {
    /// If the firmware was made by Apple.
    pub apple_firmware: bool,

    /// The architecture the boot manager was built for.
    pub arch: Architecture,

    /// The index of the volume the boot manager was loaded from, within [`Self::volumes`].
    pub self_volume: Option<usize>,

    /// The directory the boot manager was loaded from, such as `\EFI\refind`.
    pub self_dir: String,

    /// The current wall-clock time as minutes past midnight, if known.
    pub minute_of_day: Option<u32>,

    /// Every scanned volume.
    pub volumes: &'a [Volume],
}

impl<'a> ParseContext<'a> {
    /// Gathers the context from the firmware and a finished volume scan.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_firmware(volumes: &'a [Volume], self_volume: Option<usize>, location: &ImageLocation) -> Self {
        Self {
            apple_firmware: is_apple_firmware(),
            arch: get_arch(),
            self_volume,
            self_dir: location.dir.to_string(),
            minute_of_day: minute_of_day(),
            volumes,
        }
    }

    /// The partition GUID of the volume the boot manager was loaded from, formatted for a `dont_scan_dirs` entry.
    #[must_use = "Has no effect if the result is unused"]
    pub fn self_part_guid(&self) -> Option<String> {
        self.self_volume
            .and_then(|i| self.volumes.get(i))
            .and_then(|v| v.part_guid)
            .map(|guid| guid.to_string().to_ascii_uppercase())
    }

    /// Resolves a configuration file name against the boot manager's own directory.
    #[must_use = "Has no effect if the result is unused"]
    pub fn resolve(&self, filename: &str) -> String {
        if filename.starts_with('\\') || self.self_dir.is_empty() {
            return filename.to_string();
        }
        let mut path = self.self_dir.trim_end_matches('\\').to_string();
        path.push('\\');
        path.push_str(filename);
        path
    }
}

impl Default for ParseContext<'_> {
    fn default() -> Self {
        Self {
            apple_firmware: false,
            arch: get_arch(),
            self_volume: None,
            self_dir: String::new(),
            minute_of_day: None,
            volumes: &[],
        }
    }
}
