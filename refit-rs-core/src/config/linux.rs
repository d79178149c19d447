// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Kernel command lines for Linux loaders.
//!
//! A kernel gets its options from a `refind_linux.conf` file next to it, which holds one `"title" "options"` pair
//! per line. Without one, options are made up from the root line of `/etc/fstab` on the same volume, and failing
//! that, from the Linux root partition recognized by its Freedesktop discoverable partition type.

use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};
use log::debug;

use crate::{
    config::{ConfigSource, tokenizer::ConfigFile},
    volume::Volume,
};

/// Options file names, in order of preference.
pub const LINUX_OPTIONS_FILENAMES: [&str; 4] = [
    "refindplus_linux.conf",
    "refindplus-linux.conf",
    "refind_linux.conf",
    "refind-linux.conf",
];

/// The fstab file, relative to the root of a volume.
const FSTAB: &str = "\\etc\\fstab";

/// The title of the generated entry with normal options.
const NORMAL_TITLE: &str = "Boot with Normal Options";

/// The title of the generated single user entry.
const SINGLE_USER_TITLE: &str = "Boot into Single User Mode";

/// A title and the options that go with it.
pub type KernelOptions = (String, String);

/// Finds the `(title, options)` pairs for a kernel.
///
/// `source` reads from the volume holding the kernel, and `root` is the discovered Linux root partition, if any.
/// The result is empty when nothing could be found.
#[must_use = "Has no effect if the result is unused"]
pub fn read_linux_options(source: &mut dyn ConfigSource, loader_path: &str, root: Option<&Volume>) -> Vec<KernelOptions> {
    let dir = loader_path.rfind('\\').map_or("", |i| &loader_path[..i]);
    for name in LINUX_OPTIONS_FILENAMES {
        let path = if dir.is_empty() { name.to_string() } else { format!("{dir}\\{name}") };
        if source.exists(&path)
            && let Some(bytes) = source.read(&path)
        {
            debug!("Reading kernel options from \"{path}\"");
            return parse_options_file(&bytes);
        }
    }

    if let Some(bytes) = source.read(FSTAB) {
        let options = options_from_fstab(&bytes);
        if !options.is_empty() {
            return options;
        }
    }

    root.map(options_from_root).unwrap_or_default()
}

/// The options of the first line of the options for a kernel.
#[must_use = "Has no effect if the result is unused"]
pub fn first_options(source: &mut dyn ConfigSource, loader_path: &str, root: Option<&Volume>) -> Option<String> {
    read_linux_options(source, loader_path, root)
        .into_iter()
        .next()
        .map(|(_, options)| options)
}

/// Reads the pairs of an options file. Lines without both a title and options are skipped.
fn parse_options_file(bytes: &[u8]) -> Vec<KernelOptions> {
    let mut file = ConfigFile::new(bytes);
    let mut options = Vec::new();
    loop {
        let tokens = file.read_token_line();
        match tokens.as_slice() {
            [] => break,
            [title, line, ..] => options.push((title.clone(), line.clone())),
            [_] => (),
        }
    }
    options
}

/// Makes up options from the lines of an fstab that mount `/`.
fn options_from_fstab(bytes: &[u8]) -> Vec<KernelOptions> {
    let mut file = ConfigFile::new(bytes);
    let mut options = Vec::new();
    loop {
        let tokens = file.read_token_line();
        if tokens.is_empty() {
            break;
        }
        if tokens.len() <= 2 {
            continue;
        }

        // `UUID=...` is split in two by the tokenizer, which moves the mount point one token along
        let root = if tokens[1] == "\\" {
            tokens[0].clone()
        } else if tokens[2] == "\\" {
            format!("{}={}", tokens[0], tokens[1])
        } else {
            continue;
        };
        if root.is_empty() {
            continue;
        }

        let root = root.replace('\\', "/");
        options.push((NORMAL_TITLE.to_string(), format!("ro root={root}")));
        options.push((SINGLE_USER_TITLE.to_string(), format!("ro root={root} single")));
    }
    options
}

/// Makes up options that mount the discovered root partition by its partition GUID.
fn options_from_root(root: &Volume) -> Vec<KernelOptions> {
    let Some(guid) = root.part_guid else {
        return Vec::new();
    };
    let guid = guid.to_string().to_ascii_lowercase();
    let mode = if root.is_read_only { "ro" } else { "rw" };
    [
        (NORMAL_TITLE.to_string(), format!("{mode} root=/dev/disk/by-partuuid/{guid}")),
        (SINGLE_USER_TITLE.to_string(), format!("{mode} root=/dev/disk/by-partuuid/{guid} single")),
    ]
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemorySource;

    #[test]
    fn test_options_file() {
        let mut source = MemorySource::new();
        source.insert(
            "\\boot\\refind_linux.conf",
            "\"Boot with standard options\"  \"root=/dev/sda2 ro quiet\"\n\"Boot to single-user mode\" \"single\"\nbroken\n",
        );
        source.insert("\\etc\\fstab", "/dev/sda1 / ext4 defaults 0 1\n");

        let options = read_linux_options(&mut source, "\\boot\\vmlinuz-linux", None);
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].1, "root=/dev/sda2 ro quiet");
        assert_eq!(
            first_options(&mut source, "\\boot\\vmlinuz-linux", None).as_deref(),
            Some("root=/dev/sda2 ro quiet")
        );
    }

    #[test]
    fn test_preferred_name() {
        let mut source = MemorySource::new();
        source.insert("\\boot\\refind_linux.conf", "\"a\" \"old\"");
        source.insert("\\boot\\refindplus_linux.conf", "\"a\" \"new\"");
        assert_eq!(first_options(&mut source, "\\boot\\vmlinuz", None).as_deref(), Some("new"));
    }

    #[test]
    fn test_fstab() {
        let mut source = MemorySource::new();
        source.insert(
            "\\etc\\fstab",
            "# <fs> <mount> <type>\nUUID=1234-abcd / ext4 rw 0 1\n/dev/sda3 /home ext4 rw 0 2\n",
        );
        let options = read_linux_options(&mut source, "\\boot\\vmlinuz", None);
        assert_eq!(options, [
            (NORMAL_TITLE.to_string(), "ro root=UUID=1234-abcd".to_string()),
            (SINGLE_USER_TITLE.to_string(), "ro root=UUID=1234-abcd single".to_string()),
        ]);

        let mut source = MemorySource::new();
        source.insert("\\etc\\fstab", "/dev/sda1 / ext4 defaults 0 1\n");
        assert_eq!(first_options(&mut source, "vmlinuz", None).as_deref(), Some("ro root=/dev/sda1"));
    }

    #[test]
    fn test_discovered_root() {
        let root = Volume {
            part_guid: Some(uefi::guid!("4f68bce3-e8cd-4db1-96e7-fbcaf984b709")),
            ..Volume::default()
        };
        let options = read_linux_options(&mut MemorySource::new(), "\\vmlinuz", Some(&root));
        assert_eq!(options[0].1, "rw root=/dev/disk/by-partuuid/4f68bce3-e8cd-4db1-96e7-fbcaf984b709");
        assert_eq!(options[1].1, "rw root=/dev/disk/by-partuuid/4f68bce3-e8cd-4db1-96e7-fbcaf984b709 single");
        assert!(read_linux_options(&mut MemorySource::new(), "\\vmlinuz", None).is_empty());
    }
}
