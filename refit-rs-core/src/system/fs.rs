// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Filesystem helper functions for other modules.
//!
//! These mostly wrap around the UEFI [`SimpleFileSystem`] protocol to make an interface that's slightly more
//! intuitive and more in line with the Rust standard library.
//!
//! Firmware is only guaranteed to read FAT. Other filesystems (ext4, Btrfs, HFS+, APFS, NTFS) are readable when a
//! driver for them is loaded, which is why the volume scanner treats a filesystem that cannot be opened as normal
//! rather than as an error.
//!
//! [`UefiFileSystem`] is what the volume scanner probes for labels and loader files, what the configuration reader
//! reads `refind.conf` and its includes through, and what backs the on-disk variable store.

use alloc::{borrow::ToOwned, string::String, vec, vec::Vec};
use log::{debug, warn};
use thiserror::Error;
use uefi::{
    CStr16, CString16, Char16, Handle, Status,
    boot::{self, ScopedProtocol},
    fs::CHARACTER_DENY_LIST,
    proto::media::{
        file::{Directory, File, FileAttribute, FileInfo, FileMode, FileSystemInfo, FileSystemVolumeLabel, RegularFile},
        fs::SimpleFileSystem,
    },
};

use crate::{BootResult, config::ConfigSource, system::helper::{normalize_path, str_to_cstr}};

/// The size of one gigabyte in bytes. This is the default value if a file is too big to be read.
///
/// This is also a reasonable maximum size for files that may be read.
pub(crate) const ONE_GIGABYTE: usize = 1024 * 1024 * 1024;

/// An error that may result from performing filesystem operations
#[derive(Error, Debug)]
pub enum FsError {
    /// The content could not be written to the file.
    #[error("Could not write to file: returned status {status} ({bytes} bytes written)")]
    WriteErr {
        /// The error status that was returned from the attempted write.
        status: Status,

        /// The amount of bytes that were written.
        bytes: usize,
    },

    /// A file could not be opened.
    #[error("Failed to open file")]
    OpenErr(Status),

    /// A file could not be read.
    #[error("Failed to read file")]
    ReadErr(Status),

    /// A file could not be deleted.
    #[error("Failed to delete file")]
    DeleteErr(Status),

    /// A file could not be flushed.
    #[error("Failed to flush file")]
    FlushErr(Status),

    /// Failed to get a volume label on a partition.
    #[error("Could not get volume label of a partition")]
    VolumeLabelErr,

    /// Failed to get the size of a partition.
    #[error("Could not get volume size of a partition")]
    VolumeSizeErr,

    /// A path contained characters that are not allowed in a file name.
    #[error("Invalid path \"{0}\"")]
    InvalidPath(String),
}

/// A rust-ier wrapper around [`SimpleFileSystem`].
///
/// This is similar to [`uefi::fs::FileSystem`], with different design decisions.
pub struct UefiFileSystem(ScopedProtocol<SimpleFileSystem>);

impl UefiFileSystem {
    /// Create a new [`UefiFileSystem`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new(fs: ScopedProtocol<SimpleFileSystem>) -> Self {
        Self(fs)
    }

    /// Create a new [`UefiFileSystem`] from a handle that supports [`SimpleFileSystem`].
    ///
    /// # Errors
    ///
    /// May return an `Error` if the handle does not actually support [`SimpleFileSystem`].
    pub fn from_handle(handle: Handle) -> BootResult<Self> {
        let fs = boot::open_protocol_exclusive(handle)?;
        Ok(Self(fs))
    }

    /// Create a new [`UefiFileSystem`] from the same filesystem as the boot manager.
    ///
    /// This is mainly used to read `refind.conf`, which lives next to the boot manager binary.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the boot image's filesystem does not support [`SimpleFileSystem`] for some reason.
    pub fn from_image_fs() -> BootResult<Self> {
        let fs = boot::get_image_file_system(boot::image_handle())?;
        Ok(Self(fs))
    }

    /// Gets the volume label from a [`SimpleFileSystem`]
    ///
    /// # Errors
    ///
    /// May return an `Error` if the volume could not be opened, or the volume does not support [`FileSystemVolumeLabel`]
    pub fn get_volume_label(&mut self) -> Result<CString16, FsError> {
        let mut root = self.open_root()?;
        let info = root
            .get_boxed_info::<FileSystemVolumeLabel>()
            .map_err(|_| FsError::VolumeLabelErr)?;
        Ok(info.volume_label().to_owned())
    }

    /// Gets the size in bytes of the volume.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the volume could not be opened, or the driver does not report [`FileSystemInfo`].
    pub fn get_volume_size(&mut self) -> Result<u64, FsError> {
        let mut root = self.open_root()?;
        let info = root
            .get_boxed_info::<FileSystemInfo>()
            .map_err(|_| FsError::VolumeSizeErr)?;
        Ok(info.volume_size())
    }

    /// Checks if a file or directory exists.
    ///
    /// It makes no distinction between whether a file could not be verified to exist or a file that really
    /// does not exist. Both will return `false`. This means that if the volume could not be opened, it will return
    /// `false` as the file cannot be verified to exist.
    pub fn exists(&mut self, path: &CStr16) -> bool {
        let Ok(mut root) = self.open_root() else {
            return false;
        };

        root.open(path, FileMode::Read, FileAttribute::empty())
            .is_ok()
    }

    /// Checks if a file exists with an [`&str`] path.
    ///
    /// This is simply a helper function that converts an [`&str`] to a [`CString16`] so that it
    /// may be used with the [`Self::exists`] function.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the path could not be converted into a [`CString16`]
    pub fn exists_str(&mut self, path: &str) -> BootResult<bool> {
        Ok(self.exists(&str_to_cstr(&normalize_path(path))?))
    }

    /// Reads the entire content of a file into a [`Vec<u8>`].
    ///
    /// # Errors
    ///
    /// May return an `Error` if the volume couldn't be opened, the path does not point to a valid file, or
    /// the file could not be read for any reason.
    pub fn read(&mut self, path: &CStr16) -> Result<Vec<u8>, FsError> {
        let mut file = self.get_regular_file(path)?;

        let info = file
            .get_boxed_info::<FileInfo>()
            .map_err(|e| FsError::ReadErr(e.status()))?;

        let size = usize::try_from(info.file_size()).unwrap_or(ONE_GIGABYTE);

        let mut buf = vec![0; size];
        let read = file
            .read(&mut buf)
            .map_err(|e| FsError::ReadErr(e.status()))?;
        buf.truncate(read);

        Ok(buf)
    }

    /// Reads the entire content of a file with an [`&str`] path.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the path is not a valid file name, or if [`Self::read`] fails. Forward slashes are
    /// accepted as separators.
    pub fn read_str(&mut self, path: &str) -> BootResult<Vec<u8>> {
        let path = normalize_path(path);
        if !check_path_valid(&path) {
            return Err(FsError::InvalidPath(path).into());
        }
        Ok(self.read(&str_to_cstr(&path)?)?)
    }

    /// Replaces the content of a file with a byte slice, creating the file if it does not exist.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the volume couldn't be opened, the file could not be created, or the write failed.
    pub fn write(&mut self, path: &CStr16, buffer: &[u8]) -> Result<(), FsError> {
        let _ = self.delete(path); // a shorter write would otherwise leave the old tail behind

        let mut root = self.open_root()?;
        let mut file = root
            .open(path, FileMode::CreateReadWrite, FileAttribute::empty())
            .map_err(|e| FsError::OpenErr(e.status()))?
            .into_regular_file()
            .ok_or(FsError::OpenErr(Status::INVALID_PARAMETER))?;

        file.write(buffer).map_err(|e| FsError::WriteErr {
            status: e.status(),
            bytes: *e.data(),
        })?;
        file.flush().map_err(|e| FsError::FlushErr(e.status()))?;

        Ok(())
    }

    /// Creates a directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the volume couldn't be opened, or the directory could not be created.
    pub fn create_dir(&mut self, path: &CStr16) -> Result<(), FsError> {
        let mut root = self.open_root()?;
        root.open(path, FileMode::CreateReadWrite, FileAttribute::DIRECTORY)
            .map_err(|e| FsError::OpenErr(e.status()))?
            .into_directory()
            .ok_or(FsError::OpenErr(Status::INVALID_PARAMETER))?;
        Ok(())
    }

    /// Deletes a file.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the volume couldn't be opened, the path does not point to a valid file,
    /// or the file could not be deleted.
    pub fn delete(&mut self, path: &CStr16) -> Result<(), FsError> {
        let file = self.get_mut_file(path)?;
        file.delete().map_err(|e| FsError::DeleteErr(e.status()))?;

        Ok(())
    }

    /// Opens the root directory of the volume.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the volume couldn't be opened.
    fn open_root(&mut self) -> Result<Directory, FsError> {
        self.0
            .open_volume()
            .map_err(|e| FsError::OpenErr(e.status()))
    }

    /// Gets a handle to a [`RegularFile`] in the filesystem.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the volume couldn't be opened, or the path does not point to a file.
    fn get_regular_file(&mut self, path: &CStr16) -> Result<RegularFile, FsError> {
        let mut root = self.open_root()?;
        root.open(path, FileMode::Read, FileAttribute::empty())
            .map_err(|e| FsError::OpenErr(e.status()))?
            .into_regular_file()
            .ok_or(FsError::OpenErr(Status::INVALID_PARAMETER))
    }

    /// Gets a handle to a [`RegularFile`] that is writable in the filesystem.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the volume couldn't be opened, or the path does not point to a file.
    fn get_mut_file(&mut self, path: &CStr16) -> Result<RegularFile, FsError> {
        let mut root = self.open_root()?;
        root.open(path, FileMode::ReadWrite, FileAttribute::empty())
            .map_err(|e| FsError::OpenErr(e.status()))?
            .into_regular_file()
            .ok_or(FsError::OpenErr(Status::INVALID_PARAMETER))
    }
}

impl ConfigSource for UefiFileSystem {
    fn read(&mut self, path: &str) -> Option<Vec<u8>> {
        match self.read_str(path) {
            Ok(content) => Some(content),
            Err(e) => {
                debug!("\"{path}\": {e}");
                None
            }
        }
    }

    fn exists(&mut self, path: &str) -> bool {
        self.exists_str(path).unwrap_or_else(|e| {
            warn!("\"{path}\": {e}");
            false
        })
    }
}

/// Checks if an [`&str`] path is valid.
///
/// If a path contains any one of the characters: `"`, `*`, `/`, `:`, `<`, `>`, `?`, and `|`,
/// this will return false. It will also return false if the path consists only of `..` or `.`.
#[must_use = "Has no effect if the result is unused"]
pub(crate) fn check_path_valid(path: &str) -> bool {
    path.chars()
        .all(|x| Char16::try_from(x).is_ok_and(|x| !CHARACTER_DENY_LIST.contains(&x) || x == '\\'))
        && path != ".."
        && path != "."
}
