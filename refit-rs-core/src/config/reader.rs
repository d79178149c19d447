// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The configuration file reader.
//!
//! Reading starts at the primary file and may descend into one level of `include` files. Global directives go to a
//! [`SettingsBuilder`], `menuentry` blocks go to a [`Stanza`], and once the primary file ends the builder is
//! finalized exactly once.

use alloc::{string::String, vec::Vec};
use log::{debug, warn};

use crate::config::{
    ConfigSource, MenuEntry, ParseContext, Settings,
    builder::SettingsBuilder,
    stanza::{Feed, Stanza},
    tokenizer::ConfigFile,
};

/// The deepest level a file may be read at. The primary file is at depth 0.
const MAX_INCLUDE_DEPTH: usize = 1;

/// The result of loading a configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedConfig {
    /// The finished global settings.
    pub settings: Settings,

    /// The enabled `menuentry` stanzas, in file order.
    pub entries: Vec<MenuEntry>,
}

/// The state shared by the primary file and its includes.
struct Reader<'s, 'c, 'v> {
    /// Where files are read from.
    source: &'s mut dyn ConfigSource,

    /// The environment of the boot manager.
    ctx: &'c ParseContext<'v>,

    /// The name of the primary file.
    primary: &'c str,

    /// The settings being built.
    builder: SettingsBuilder,

    /// The stanzas read so far.
    entries: Vec<MenuEntry>,
}

impl Reader<'_, '_, '_> {
    /// Reads one file, recursing into its includes.
    fn read_file(&mut self, filename: &str, depth: usize) {
        let path = self.ctx.resolve(filename);
        if depth == 0 {
            self.builder.main_defaults(self.ctx);
        }

        let Some(bytes) = self.source.read(&path) else {
            warn!("Could not read configuration file \"{path}\"");
            return;
        };
        debug!("Reading configuration file \"{path}\"");

        let mut file = ConfigFile::new(&bytes);
        loop {
            let tokens = file.read_token_line();
            let Some(keyword) = tokens.first() else {
                break;
            };

            if keyword.eq_ignore_ascii_case("include") {
                self.include(&tokens, filename, depth);
            } else if keyword.eq_ignore_ascii_case("menuentry") {
                self.read_stanza(&mut file, tokens.get(1).map(String::as_str));
            } else {
                self.builder.apply(&tokens, self.ctx);
            }
        }
    }

    /// Handles an `include` line of the file `filename`.
    fn include(&mut self, tokens: &[String], filename: &str, depth: usize) {
        let [_, target] = tokens else {
            warn!("Ignoring malformed include line in \"{filename}\"");
            return;
        };

        if depth >= MAX_INCLUDE_DEPTH || !filename.eq_ignore_ascii_case(self.primary) {
            warn!("Ignoring nested include of \"{target}\" in \"{filename}\"");
        } else if target.eq_ignore_ascii_case(filename) {
            warn!("Ignoring \"{filename}\" including itself");
        } else {
            self.read_file(target, depth + 1);
        }
    }

    /// Feeds the lines of a `menuentry` block into a [`Stanza`] until it ends.
    fn read_stanza(&mut self, file: &mut ConfigFile, title: Option<&str>) {
        let mut stanza = Stanza::new(title, self.ctx.self_volume);
        loop {
            let tokens = file.read_token_line();
            if tokens.is_empty() || stanza.feed(&tokens, self.ctx.volumes) == Feed::End {
                break;
            }
        }
        if let Some(entry) = stanza.commit(self.ctx.volumes) {
            self.entries.push(entry);
        }
    }
}

/// Loads the configuration starting at the primary file `filename`.
///
/// Problems such as a missing file or an unknown directive are logged and skipped, so a usable configuration is
/// always returned. Relative paths are resolved against the directory of the boot manager.
pub fn load_config(source: &mut dyn ConfigSource, ctx: &ParseContext, filename: &str) -> LoadedConfig {
    let mut reader = Reader {
        source,
        ctx,
        primary: filename,
        builder: SettingsBuilder::new(ctx.apple_firmware),
        entries: Vec::new(),
    };
    reader.read_file(filename, 0);

    let has_icons = reader.source.exists(&ctx.resolve("icons"))
        || reader
            .builder
            .settings()
            .icons_dir
            .as_ref()
            .is_some_and(|dir| reader.source.exists(&ctx.resolve(dir)));

    LoadedConfig {
        settings: reader.builder.finalize(ctx, has_icons),
        entries: reader.entries,
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec};

    use proptest::prelude::*;

    use super::*;
    use crate::{
        config::{CONFIG_FILE_NAME, MemorySource, stanza::NEMO_LOADER, types::HideUiFlags},
        volume::Volume,
    };

    fn load(files: &[(&str, &str)]) -> LoadedConfig {
        let mut source = MemorySource::new();
        for (path, content) in files {
            source.insert(path, *content);
        }
        source.insert("icons\\arrow_left.png", "");
        load_config(&mut source, &ParseContext::default(), CONFIG_FILE_NAME)
    }

    #[test]
    fn test_globals() {
        let loaded = load(&[(
            "refind.conf",
            "# comment\ntimeout 20\nhideui banner,label\nscanfor internal,external\ndont_scan_volumes \"Recovery HD\"\n",
        )]);
        let settings = &loaded.settings;
        assert_eq!(settings.timeout, 20);
        assert_eq!(settings.hide_ui, HideUiFlags::BANNER | HideUiFlags::LABEL);
        assert_eq!(settings.scan_for(), "sie");
        assert_eq!(settings.dont_scan_volumes, ["Recovery HD"]);
        assert!(!settings.text_only);
        assert!(loaded.entries.is_empty());
    }

    #[test]
    fn test_include() {
        let loaded = load(&[
            ("refind.conf", "timeout 5\ninclude extra.conf\nmax_tags 3\n"),
            ("extra.conf", "timeout 7\nscreensaver 300\ninclude deeper.conf\n"),
            ("deeper.conf", "screensaver 1\n"),
        ]);
        assert_eq!(loaded.settings.timeout, 7);
        assert_eq!(loaded.settings.screensaver, 300);
        assert_eq!(loaded.settings.max_tags, 3);
    }

    #[test]
    fn test_include_itself() {
        let loaded = load(&[("refind.conf", "include REFIND.CONF\ntimeout 9\n")]);
        assert_eq!(loaded.settings.timeout, 9);

        let loaded = load(&[("refind.conf", "include\ninclude a.conf b.conf\ntimeout 9\n")]);
        assert_eq!(loaded.settings.timeout, 9);
    }

    #[test]
    fn test_include_keeps_defaults() {
        let loaded = load(&[
            ("refind.conf", "include extra.conf\n"),
            ("extra.conf", "dont_scan_files + foo.efi\n"),
        ]);
        let files = &loaded.settings.dont_scan_files;
        assert_eq!(files.first().map(String::as_str), Some("shim.efi"));
        assert!(files.iter().any(|x| x == "foo.efi"));
    }

    #[test]
    fn test_missing_file() {
        let mut source = MemorySource::new();
        let loaded = load_config(&mut source, &ParseContext::default(), CONFIG_FILE_NAME);
        assert_eq!(loaded.settings.default_selection.as_deref(), Some("+"));
        assert_eq!(loaded.settings.linux_prefixes, ["vmlinuz", "bzImage", "kernel"]);
        assert!(loaded.settings.text_only);
    }

    #[test]
    fn test_icons_dir() {
        let mut source = MemorySource::new();
        source.insert("refind.conf", "icons_dir themes\\dark\\icons\n");
        source.insert("themes\\dark\\icons\\os_linux.png", "");
        let loaded = load_config(&mut source, &ParseContext::default(), CONFIG_FILE_NAME);
        assert!(!loaded.settings.text_only);
    }

    #[test]
    fn test_stanzas() {
        let loaded = load(&[(
            "refind.conf",
            "timeout 3\n\
             menuentry \"Arch Linux\" {\n\
                 loader /boot/vmlinuz-linux\n\
                 initrd /boot/initramfs-linux.img\n\
                 options \"root=/dev/sda2 rw\"\n\
                 submenuentry \"Fallback\" {\n\
                     initrd /boot/initramfs-linux-fallback.img\n\
                 }\n\
             }\n\
             menuentry Hidden {\n\
                 disabled\n\
                 timeout 99\n\
             }\n\
             menuentry Windows {\n\
                 firmware_bootnum 0003\n\
             }\n\
             menuentry Unterminated\n\
             timeout 42\n",
        )]);

        assert_eq!(loaded.settings.timeout, 3);
        assert_eq!(loaded.entries.len(), 3);

        let arch = &loaded.entries[0];
        assert_eq!(arch.title, "Boot Arch Linux");
        assert_eq!(arch.loader.as_deref(), Some("\\boot\\vmlinuz-linux"));
        assert_eq!(arch.options.as_deref(), Some("root=/dev/sda2 rw initrd=\\boot\\initramfs-linux.img"));
        assert_eq!(arch.submenus.len(), 1);
        assert_eq!(arch.submenus[0].initrd.as_deref(), Some("\\boot\\initramfs-linux-fallback.img"));

        assert_eq!(loaded.entries[1].title, "Boot Windows [Firmware Boot Number]");
        assert_eq!(loaded.entries[1].firmware_bootnum, Some(3));

        // the last stanza swallows the rest of the file
        assert_eq!(loaded.entries[2].title, "Boot Unterminated");
        assert_eq!(loaded.entries[2].loader.as_deref(), Some(NEMO_LOADER));
    }

    #[test]
    fn test_stanza_volume() {
        let volumes = vec![
            Volume {
                name: Some("EFI".to_string()),
                is_readable: true,
                has_root: true,
                ..Volume::default()
            },
            Volume {
                name: Some("Arch Root".to_string()),
                is_readable: true,
                has_root: true,
                ..Volume::default()
            },
        ];
        let ctx = ParseContext {
            self_volume: Some(0),
            volumes: &volumes,
            ..ParseContext::default()
        };
        let mut source = MemorySource::new();
        source.insert("refind.conf", "menuentry Arch {\nvolume \"arch root\"\n}\nmenuentry Here {\n}\n");
        let loaded = load_config(&mut source, &ctx, CONFIG_FILE_NAME);
        assert_eq!(loaded.entries[0].title, "Boot Arch from Arch Root");
        assert_eq!(loaded.entries[0].volume, Some(1));
        assert_eq!(loaded.entries[1].volume, Some(0));
    }

    #[test]
    fn test_self_dir() {
        let ctx = ParseContext {
            self_dir: "\\EFI\\refind".to_string(),
            ..ParseContext::default()
        };
        let mut source = MemorySource::new();
        source.insert("\\EFI\\refind\\refind.conf", "include themes\\theme.conf\n");
        source.insert("\\EFI\\refind\\themes\\theme.conf", "banner themes\\banner.png\n");
        source.insert("\\EFI\\refind\\icons\\os_arch.png", "");
        let loaded = load_config(&mut source, &ctx, CONFIG_FILE_NAME);
        assert_eq!(loaded.settings.banner.as_deref(), Some("themes\\banner.png"));
        assert_eq!(loaded.settings.dont_scan_dirs[0], "EFI\\refind");
        assert!(!loaded.settings.text_only);
    }

    #[test]
    fn test_idempotent() {
        let config = "timeout -1\nshowtools shell, memtest, reboot\ncsr_values 10,77,0x2ff\nuse_nvram false\n\
                      also_scan_dirs + boot/efi\nresolution 1920 1080\nscreen_rgb 0 0 64\n";
        let first = load(&[("refind.conf", config)]);
        let second = load(&[("refind.conf", config)]);
        assert_eq!(first, second);
        assert_eq!(first.settings.to_bytes().ok(), second.settings.to_bytes().ok());

        let settings = &first.settings;
        assert!(settings.direct_boot);
        assert_eq!(settings.csr_values, [0x10, 0x77, 0x2ff]);
        assert_eq!(settings.also_scan_dirs, ["boot", "@\\boot", "boot\\efi"]);
        assert_eq!((settings.requested_width, settings.requested_height), (1920, 1080));
        assert!(settings.custom_screen_bg);
    }

    proptest! {
        #[test]
        fn doesnt_panic(primary in any::<Vec<u8>>(), extra in any::<Vec<u8>>()) {
            let mut source = MemorySource::new();
            source.insert("refind.conf", primary);
            source.insert("extra.conf", extra);
            let _ = load_config(&mut source, &ParseContext::default(), CONFIG_FILE_NAME);
        }
    }
}
