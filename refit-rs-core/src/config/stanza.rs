// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Manual boot stanzas.
//!
//! A stanza is a `menuentry` block written by hand:
//!
//! ```text
//! menuentry "Arch Linux" {
//!     volume   "Arch Root"
//!     loader   /boot/vmlinuz-linux
//!     initrd   /boot/initramfs-linux.img
//!     options  "root=PARTUUID=5028fa50-0079-4c40-b240-abfaf28693ea rw"
//!     submenuentry "Boot using fallback initramfs" {
//!         initrd /boot/initramfs-linux-fallback.img
//!     }
//! }
//! ```
//!
//! A [`Stanza`] is fed one token line at a time until it reports [`Feed::End`], and is then either committed into a
//! [`MenuEntry`] or discarded. A stanza marked `disabled` keeps consuming its lines, including those of its
//! submenus, so that its closing brace is still found.

use alloc::{
    borrow::ToOwned,
    format,
    string::{String, ToString},
    vec::Vec,
};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    config::handlers::parse_hex,
    volume::{Volume, find_volume},
};

/// The loader used by a stanza that has no `loader` line.
pub const NEMO_LOADER: &str = "\\EFI\\BOOT\\nemo.efi";

/// The title used by a stanza that has none.
const UNKNOWN_TITLE: &str = "Unknown";

/// A boot entry written by hand.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    /// The title shown in the menu.
    pub title: String,

    /// The loader to start. `None` for firmware boot entries.
    pub loader: Option<String>,

    /// The index of the volume holding the loader.
    pub volume: Option<usize>,

    /// The initrd, which is also part of [`Self::options`].
    pub initrd: Option<String>,

    /// The command line passed to the loader.
    pub options: Option<String>,

    /// The OS type hint, such as `L` for Linux.
    pub os_type: Option<char>,

    /// The icon file.
    pub icon: Option<String>,

    /// If the loader starts in graphics mode, when given.
    pub use_graphics: Option<bool>,

    /// The firmware boot entry to start instead of a loader.
    pub firmware_bootnum: Option<u16>,

    /// The entries of the submenu.
    pub submenus: Vec<SubEntry>,
}

/// An entry in the submenu of a [`MenuEntry`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubEntry {
    /// The title shown in the submenu.
    pub title: String,

    /// The loader to start.
    pub loader: Option<String>,

    /// The index of the volume holding the loader.
    pub volume: Option<usize>,

    /// The initrd, which is also part of [`Self::options`].
    pub initrd: Option<String>,

    /// The command line passed to the loader.
    pub options: Option<String>,

    /// If the loader starts in graphics mode, when given.
    pub use_graphics: Option<bool>,
}

/// What a [`Stanza`] expects after a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feed {
    /// More lines.
    More,

    /// Nothing, the closing brace was read.
    End,
}

/// A submenu being read.
#[derive(Clone, Debug)]
struct SubStanza {
    /// The entry so far.
    entry: SubEntry,

    /// The volume named by the last `volume` line that pointed at a usable volume.
    current_volume: Option<usize>,

    /// If a `volume` line switched the volume, which puts it in the title.
    titled_volume: bool,

    /// False once `disabled` is read.
    enabled: bool,
}

impl SubStanza {
    /// Feeds one line of the submenu.
    fn feed(&mut self, tokens: &[String], volumes: &[Volume]) {
        if !self.enabled {
            return;
        }
        let value = tokens.get(1);
        match (&*tokens[0].to_ascii_lowercase(), value) {
            ("loader", Some(value)) => {
                self.entry.loader = Some(value.clone());
                self.entry.volume = self.current_volume;
            }
            ("volume", Some(value)) => {
                if let Some(index) = usable_volume(volumes, value) {
                    self.titled_volume = true;
                    self.current_volume = Some(index);
                    self.entry.volume = Some(index);
                }
            }
            ("initrd", _) => self.entry.initrd = value.cloned(),
            ("options", _) => self.entry.options = value.cloned(),
            ("add_options", Some(value)) => merge(&mut self.entry.options, value),
            ("graphics", Some(value)) => self.entry.use_graphics = Some(value.eq_ignore_ascii_case("on")),
            ("disabled", _) => self.enabled = false,
            (keyword, _) => debug!("Ignoring \"{keyword}\" in a submenu entry"),
        }
    }

    /// Finishes the submenu entry, or discards it if it was disabled.
    fn commit(mut self, volumes: &[Volume]) -> Option<SubEntry> {
        if !self.enabled {
            debug!("Submenu entry \"{}\" is disabled", self.entry.title);
            return None;
        }
        if self.titled_volume
            && let Some(volume) = self.current_volume.and_then(|i| volumes.get(i))
        {
            self.entry.title = format!("Boot {} from {}", self.entry.title, volume.name());
        }
        if let Some(initrd) = &self.entry.initrd {
            merge(&mut self.entry.options, &format!("initrd={initrd}"));
        }
        Some(self.entry)
    }
}

/// A `menuentry` block being read.
#[derive(Clone, Debug)]
pub struct Stanza {
    /// The title as written, without the `Boot ... from ...` decoration.
    title: String,

    /// The entry so far.
    entry: MenuEntry,

    /// The value of the last `options` line, applied when the stanza ends.
    options: Option<String>,

    /// The value of the `firmware_bootnum` line.
    bootnum: Option<String>,

    /// If a non-empty `loader` line was read.
    has_loader: bool,

    /// False once `disabled` is read.
    enabled: bool,

    /// The submenu being read, if inside one.
    submenu: Option<SubStanza>,
}

impl Stanza {
    /// Starts a stanza, on the volume the boot manager was loaded from.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(title: Option<&str>, self_volume: Option<usize>) -> Self {
        let title = title.unwrap_or(UNKNOWN_TITLE).to_owned();
        debug!("Adding user configured loader \"{title}\"");
        Self {
            entry: MenuEntry {
                title: title.clone(),
                volume: self_volume,
                ..MenuEntry::default()
            },
            title,
            options: None,
            bootnum: None,
            has_loader: false,
            enabled: true,
            submenu: None,
        }
    }

    /// Feeds the next token line of the stanza.
    ///
    /// Returns [`Feed::End`] on the brace that closes the stanza.
    pub fn feed(&mut self, tokens: &[String], volumes: &[Volume]) -> Feed {
        let Some(keyword) = tokens.first() else {
            return Feed::More;
        };

        if self.submenu.is_some() {
            if keyword == "}" {
                if let Some(entry) = self.submenu.take().and_then(|x| x.commit(volumes)) {
                    self.entry.submenus.push(entry);
                }
            } else if let Some(submenu) = &mut self.submenu {
                submenu.feed(tokens, volumes);
            }
            return Feed::More;
        }

        if keyword == "}" {
            return Feed::End;
        }

        match (&*keyword.to_ascii_lowercase(), tokens.get(1)) {
            ("submenuentry", Some(value)) => self.open_submenu(value),
            _ if !self.enabled => (),
            ("loader", Some(value)) => {
                self.entry.loader = Some(value.clone());
                self.has_loader |= !value.is_empty();
            }
            ("volume", Some(value)) => match usable_volume(volumes, value) {
                Some(index) => self.entry.volume = Some(index),
                None => debug!("Could not find a usable volume \"{value}\" for \"{}\"", self.title),
            },
            ("icon", Some(value)) => self.entry.icon = Some(value.clone()),
            ("initrd", Some(value)) => self.entry.initrd = Some(value.clone()),
            ("options", Some(value)) => self.options = Some(value.clone()),
            ("ostype", Some(value)) => self.entry.os_type = value.chars().next(),
            ("graphics", Some(value)) => self.entry.use_graphics = Some(value.eq_ignore_ascii_case("on")),
            ("disabled", _) => self.enabled = false,
            ("firmware_bootnum", Some(value)) => self.bootnum = Some(value.clone()),
            _ => debug!("Ignoring \"{keyword}\" in \"{}\"", self.title),
        }
        Feed::More
    }

    /// Starts a submenu, which begins with the loader, volume and options of the stanza so far.
    fn open_submenu(&mut self, title: &str) {
        self.submenu = Some(SubStanza {
            entry: SubEntry {
                title: title.to_owned(),
                loader: self.entry.loader.clone(),
                volume: self.entry.volume,
                initrd: self.entry.initrd.clone(),
                options: self.options.clone(),
                use_graphics: self.entry.use_graphics,
            },
            current_volume: self.entry.volume,
            titled_volume: false,
            enabled: self.enabled,
        });
    }

    /// Finishes the stanza into a [`MenuEntry`], or discards it if it was disabled.
    ///
    /// A submenu that is still open because the file ended is finished as well.
    #[must_use = "Has no effect if the result is unused"]
    pub fn commit(mut self, volumes: &[Volume]) -> Option<MenuEntry> {
        if let Some(entry) = self.submenu.take().and_then(|x| x.commit(volumes)) {
            self.entry.submenus.push(entry);
        }
        if !self.enabled {
            debug!("\"{}\" is disabled", self.title);
            return None;
        }

        let mut entry = self.entry;
        if let Some(bootnum) = self.bootnum {
            entry.title = format!("Boot {} [Firmware Boot Number]", self.title);
            entry.loader = None;
            entry.initrd = None;
            entry.firmware_bootnum = Some(parse_hex(&bootnum).and_then(|x| u16::try_from(x).ok()).unwrap_or(0));
            return Some(entry);
        }

        entry.title = match entry.volume.and_then(|i| volumes.get(i)) {
            Some(volume) => format!("Boot {} from {}", self.title, volume.name()),
            None => format!("Boot {}", self.title),
        };
        entry.options = self.options.filter(|x| !x.is_empty());
        if let Some(initrd) = entry.initrd.as_ref().filter(|x| !x.is_empty()) {
            merge(&mut entry.options, &format!("initrd={initrd}"));
        }
        if !self.has_loader {
            entry.loader = Some(NEMO_LOADER.to_string());
        }
        Some(entry)
    }
}

/// Finds a volume that a `volume` line may switch to. It must be readable and have an open root directory.
fn usable_volume(volumes: &[Volume], identifier: &str) -> Option<usize> {
    let volume = find_volume(volumes, identifier)?;
    if !(volume.is_readable && volume.has_root) {
        debug!("Volume \"{identifier}\" is not readable");
        return None;
    }
    volumes.iter().position(|x| core::ptr::eq(x, volume))
}

/// Appends to an option string, separated by a space.
fn merge(options: &mut Option<String>, value: &str) {
    match options {
        Some(options) if !options.is_empty() => {
            options.push(' ');
            options.push_str(value);
        }
        _ => *options = Some(value.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tokenizer::ConfigFile;

    fn volume(name: &str, readable: bool) -> Volume {
        Volume {
            name: Some(name.to_string()),
            is_readable: readable,
            has_root: readable,
            ..Volume::default()
        }
    }

    fn read(text: &str, volumes: &[Volume]) -> Option<MenuEntry> {
        let mut file = ConfigFile::new(text.as_bytes());
        let header = file.read_token_line();
        let mut stanza = Stanza::new(header.get(1).map(String::as_str), Some(0));
        loop {
            let tokens = file.read_token_line();
            if tokens.is_empty() || stanza.feed(&tokens, volumes) == Feed::End {
                break;
            }
        }
        stanza.commit(volumes)
    }

    #[test]
    fn test_titles() {
        let volumes = [volume("ESP", true), volume("Arch Root", true)];
        let entry = read("menuentry Arch {\nvolume \"Arch Root\"\nloader /boot/vmlinuz\n}", &volumes);
        assert_eq!(entry.as_ref().map(|x| x.title.as_str()), Some("Boot Arch from Arch Root"));
        assert_eq!(entry.and_then(|x| x.loader).as_deref(), Some("\\boot\\vmlinuz"));

        let entry = read("menuentry Arch {\nloader /boot/vmlinuz\n}", &[]);
        assert_eq!(entry.map(|x| x.title), Some("Boot Arch".to_string()));
    }

    #[test]
    fn test_unreadable_volume_kept() {
        let volumes = [volume("ESP", true), volume("Locked", false)];
        let entry = read("menuentry Arch {\nvolume Locked\n}", &volumes);
        assert_eq!(entry.and_then(|x| x.volume), Some(0));
    }

    #[test]
    fn test_disabled() {
        let text = "menuentry Old {\ndisabled\nsubmenuentry Sub {\nloader x.efi\n}\nloader old.efi\n}";
        assert_eq!(read(text, &[]), None);
    }

    #[test]
    fn test_defaults() {
        let entry = read("menuentry\n}", &[]);
        assert_eq!(entry.as_ref().map(|x| x.title.as_str()), Some("Boot Unknown"));
        assert_eq!(entry.and_then(|x| x.loader).as_deref(), Some(NEMO_LOADER));
    }

    #[test]
    fn test_initrd() {
        let entry = read("menuentry L {\ninitrd /boot/initrd.img\noptions \"ro quiet\"\n}", &[]);
        assert_eq!(entry.and_then(|x| x.options).as_deref(), Some("ro quiet initrd=\\boot\\initrd.img"));
        let entry = read("menuentry L {\ninitrd /boot/initrd.img\n}", &[]);
        assert_eq!(entry.and_then(|x| x.options).as_deref(), Some("initrd=\\boot\\initrd.img"));
    }

    #[test]
    fn test_firmware_bootnum() {
        let entry = read("menuentry Win {\nloader x.efi\ninitrd y\nfirmware_bootnum 000A\n}", &[]);
        let entry = entry.unwrap_or_default();
        assert_eq!(entry.title, "Boot Win [Firmware Boot Number]");
        assert_eq!(entry.firmware_bootnum, Some(0x0A));
        assert_eq!(entry.loader, None);
        assert_eq!(entry.initrd, None);

        let entry = read("menuentry Win {\nfirmware_bootnum zz\n}", &[]);
        assert_eq!(entry.and_then(|x| x.firmware_bootnum), Some(0));
    }

    #[test]
    fn test_submenus() {
        let volumes = [volume("ESP", true), volume("Root", true)];
        let text = "menuentry L {\nloader vmlinuz\noptions \"ro\"\n\
                    submenuentry Single {\nadd_options single\n}\n\
                    submenuentry Other {\nvolume Root\noptions rw\ninitrd initrd.img\ngraphics on\n}\n\
                    submenuentry Gone {\ndisabled\n}\n}";
        let entry = read(text, &volumes).unwrap_or_default();
        assert_eq!(entry.submenus.len(), 2);

        let single = &entry.submenus[0];
        assert_eq!(single.title, "Single");
        assert_eq!(single.loader.as_deref(), Some("vmlinuz"));
        assert_eq!(single.options.as_deref(), Some("ro single"));

        let other = &entry.submenus[1];
        assert_eq!(other.title, "Boot Other from Root");
        assert_eq!(other.volume, Some(1));
        assert_eq!(other.options.as_deref(), Some("rw initrd=initrd.img"));
        assert_eq!(other.use_graphics, Some(true));
    }
}
