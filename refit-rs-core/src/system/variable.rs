// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! UEFI variable storage helpers.
//!
//! Variables in the boot manager's own vendor namespace do not have to live in NVRAM. Unless `use_nvram` is set,
//! they are stored as one file per variable in a `vars` directory next to the boot manager, which spares the
//! firmware's flash from frequent writes. Variables in every other namespace always go to the firmware.
//!
//! Writes of a value that is already stored are skipped, and reported as [`VarError::Unchanged`].

use alloc::{borrow::ToOwned, boxed::Box, string::String, vec::Vec};
use log::{debug, warn};
use thiserror::Error;
use uefi::{
    Guid, Handle, Status, guid,
    runtime::{self, VariableAttributes, VariableVendor},
};

use crate::{
    BootResult,
    system::{
        fs::UefiFileSystem,
        helper::{cstr_to_string, join_path, str_to_cstr},
    },
};

/// The vendor namespace of the boot manager's own variables.
pub const REFIT_GUID: Guid = guid!("f8800da7-df1f-4a16-8fe3-7243dbb787ca");

/// The Apple boot vendor namespace.
pub const APPLE_BOOT_GUID: Guid = guid!("7c436110-ab2a-4bbb-a880-fe41995c9f82");

/// The variable holding the active System Integrity Protection configuration.
pub const CSR_ACTIVE_CONFIG: &str = "csr-active-config";

/// Variables that make a Mac boot into recovery mode.
pub const RECOVERY_VARIABLES: [&str; 3] = ["recovery-boot-mode", "internet-recovery-mode", "RecoveryBootInitiator"];

/// Variables that are always written, even when the stored value already contains the new one.
const HIDDEN_LISTS: [&str; 4] = ["HiddenTags", "HiddenTools", "HiddenLegacy", "HiddenFirmware"];

/// The largest value that is stored.
pub const MAX_VARIABLE_SIZE: usize = 64 * 1024;

/// An error that may result from reading or writing a stored variable.
#[derive(Error, Debug)]
pub enum VarError {
    /// No vars directory could be found or created, and `use_nvram` is not set.
    #[error("No vars directory is available, set 'use_nvram' to store variables in NVRAM")]
    NoVarsDir,

    /// The write was skipped because the stored value already matches.
    #[error("Variable \"{0}\" already holds this value")]
    Unchanged(String),

    /// The value is larger than [`MAX_VARIABLE_SIZE`].
    #[error("Variable value is too large ({0} bytes)")]
    TooLarge(usize),

    /// A stored value could not be decoded.
    #[error("Variable \"{0}\" holds a malformed value")]
    Corrupt(String),
}

/// A place variables can be read from and written to.
pub trait VariableBackend {
    /// Reads a variable, returning `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the variable exists but could not be read.
    fn get(&mut self, vendor: Guid, name: &str) -> BootResult<Option<Vec<u8>>>;

    /// Writes a variable. An empty value deletes it.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the variable could not be written.
    fn set(&mut self, vendor: Guid, name: &str, data: &[u8], persistent: bool) -> BootResult<()>;
}

/// Variables stored by the firmware through runtime services.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuntimeVariables;

impl VariableBackend for RuntimeVariables {
    fn get(&mut self, vendor: Guid, name: &str) -> BootResult<Option<Vec<u8>>> {
        let name = str_to_cstr(name)?;
        match runtime::get_variable_boxed(&name, &VariableVendor(vendor)) {
            Ok((data, _)) => Ok(Some(data.into_vec())),
            Err(e) if e.status() == Status::NOT_FOUND => Ok(None),
            Err(e) => Err(e.to_err_without_payload().into()),
        }
    }

    fn set(&mut self, vendor: Guid, name: &str, data: &[u8], persistent: bool) -> BootResult<()> {
        let name = str_to_cstr(name)?;
        let mut attributes = VariableAttributes::BOOTSERVICE_ACCESS | VariableAttributes::RUNTIME_ACCESS;
        if persistent {
            attributes |= VariableAttributes::NON_VOLATILE;
        }
        match runtime::set_variable(&name, &VariableVendor(vendor), attributes, data) {
            Err(e) if data.is_empty() && e.status() == Status::NOT_FOUND => Ok(()),
            result => Ok(result?),
        }
    }
}

/// Variables stored as files in a directory on disk.
///
/// The vendor namespace is not part of the file name, so only one namespace should be routed here.
pub struct DiskVariables {
    /// The filesystem holding the directory.
    fs: UefiFileSystem,

    /// The path of the directory.
    dir: String,
}

impl DiskVariables {
    /// Creates a [`DiskVariables`] from a filesystem and a directory on it.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the directory does not exist and could not be created.
    pub fn new(mut fs: UefiFileSystem, dir: &str) -> BootResult<Self> {
        fs.create_dir(&str_to_cstr(dir)?)?;
        Ok(Self {
            fs,
            dir: dir.to_owned(),
        })
    }

    /// Finds the vars directory.
    ///
    /// This is `vars` in the boot manager's own directory, or else `refind-vars` in the root of the ESP.
    ///
    /// # Errors
    ///
    /// May return an `Error` if neither directory could be opened or created.
    pub fn find(self_dir: &str, esp: Option<Handle>) -> BootResult<Self> {
        let own = UefiFileSystem::from_image_fs().and_then(|fs| Self::new(fs, &cstr_to_string(&join_path(self_dir, "vars")?)));
        match own {
            Ok(vars) => return Ok(vars),
            Err(e) => debug!("No vars directory next to the boot manager: {e}"),
        }

        let esp = esp.ok_or(VarError::NoVarsDir)?;
        UefiFileSystem::from_handle(esp)
            .and_then(|fs| Self::new(fs, "\\refind-vars"))
            .map_err(|e| {
                warn!("{e}");
                VarError::NoVarsDir.into()
            })
    }
}

impl VariableBackend for DiskVariables {
    fn get(&mut self, _vendor: Guid, name: &str) -> BootResult<Option<Vec<u8>>> {
        let path = join_path(&self.dir, name)?;
        if !self.fs.exists(&path) {
            return Ok(None);
        }
        Ok(Some(self.fs.read(&path)?))
    }

    fn set(&mut self, _vendor: Guid, name: &str, data: &[u8], _persistent: bool) -> BootResult<()> {
        let path = join_path(&self.dir, name)?;
        if data.is_empty() {
            if self.fs.exists(&path) {
                self.fs.delete(&path)?;
            }
            return Ok(());
        }
        Ok(self.fs.write(&path, data)?)
    }
}

/// Variables kept in memory, for when neither NVRAM nor a disk is at hand.
#[derive(Clone, Debug, Default)]
pub struct MemoryVariables(Vec<(Guid, String, Vec<u8>)>);

impl VariableBackend for MemoryVariables {
    fn get(&mut self, vendor: Guid, name: &str) -> BootResult<Option<Vec<u8>>> {
        Ok(self
            .0
            .iter()
            .find(|(v, n, _)| *v == vendor && n == name)
            .map(|(_, _, data)| data.clone()))
    }

    fn set(&mut self, vendor: Guid, name: &str, data: &[u8], _persistent: bool) -> BootResult<()> {
        self.0.retain(|(v, n, _)| !(*v == vendor && n == name));
        if !data.is_empty() {
            self.0.push((vendor, name.to_owned(), data.to_vec()));
        }
        Ok(())
    }
}

/// Routes variables to NVRAM or to a vars directory.
pub struct VariableStore {
    /// Where every namespace other than [`REFIT_GUID`] goes.
    firmware: Box<dyn VariableBackend>,

    /// The vars directory, if one was found.
    disk: Option<Box<dyn VariableBackend>>,

    /// Whether the boot manager's own variables go to NVRAM as well.
    use_nvram: bool,
}

impl VariableStore {
    /// Creates a [`VariableStore`] from its backends.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(firmware: Box<dyn VariableBackend>, disk: Option<Box<dyn VariableBackend>>, use_nvram: bool) -> Self {
        Self {
            firmware,
            disk,
            use_nvram,
        }
    }

    /// Creates a [`VariableStore`] backed by the firmware, with the vars directory located by [`DiskVariables::find`].
    #[must_use = "Has no effect if the result is unused"]
    pub fn open(use_nvram: bool, self_dir: &str, esp: Option<Handle>) -> Self {
        let disk = if use_nvram {
            None
        } else {
            DiskVariables::find(self_dir, esp)
                .map(|x| Box::new(x) as Box<dyn VariableBackend>)
                .map_err(|e| warn!("{e}"))
                .ok()
        };
        Self::new(Box::new(RuntimeVariables), disk, use_nvram)
    }

    /// Picks the backend for a namespace.
    fn backend(&mut self, vendor: Guid) -> Result<&mut (dyn VariableBackend + 'static), VarError> {
        if vendor == REFIT_GUID && !self.use_nvram {
            self.disk.as_deref_mut().ok_or(VarError::NoVarsDir)
        } else {
            Ok(&mut *self.firmware)
        }
    }

    /// Reads a raw variable.
    ///
    /// # Errors
    ///
    /// May return an `Error` if there is no vars directory for the boot manager's namespace, or the read failed.
    pub fn get_raw(&mut self, vendor: Guid, name: &str) -> BootResult<Option<Vec<u8>>> {
        self.backend(vendor)?.get(vendor, name)
    }

    /// Writes a raw variable, unless it already holds the value.
    ///
    /// The value counts as already held when it equals the stored value, or when the stored value contains it as
    /// text. The hidden item lists are always written.
    ///
    /// # Errors
    ///
    /// May return [`VarError::Unchanged`] if the write was skipped, [`VarError::TooLarge`] if the value is too
    /// large, or an `Error` if the write itself failed.
    pub fn set_raw(&mut self, vendor: Guid, name: &str, data: &[u8], persistent: bool) -> BootResult<()> {
        if data.len() > MAX_VARIABLE_SIZE {
            return Err(VarError::TooLarge(data.len()).into());
        }

        let backend = self.backend(vendor)?;
        if !data.is_empty()
            && !HIDDEN_LISTS.iter().any(|x| x.eq_ignore_ascii_case(name))
            && let Ok(Some(old)) = backend.get(vendor, name)
            && holds_value(&old, data)
        {
            return Err(VarError::Unchanged(name.to_owned()).into());
        }

        debug!("Saving \"{name}\"");
        backend.set(vendor, name, data, persistent)
    }

    /// Reads a variable as a [`UefiVariable`], or its default value if it does not exist.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the read failed.
    pub fn get<T: UefiVariable>(&mut self, vendor: Guid, name: &str) -> BootResult<T> {
        Ok(self
            .get_raw(vendor, name)?
            .map_or_else(T::default, |x| T::from_bytes(&x)))
    }

    /// Writes a variable from a [`UefiVariable`]. `None` deletes the variable.
    ///
    /// # Errors
    ///
    /// See [`Self::set_raw`].
    pub fn set<T: UefiVariable>(&mut self, vendor: Guid, name: &str, value: Option<T>) -> BootResult<()> {
        let data = value.map_or_else(Vec::new, UefiVariable::to_bytes);
        self.set_raw(vendor, name, &data, true)
    }

    /// Reads the active System Integrity Protection configuration.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the variable could not be read.
    pub fn csr_active_config(&mut self) -> BootResult<Option<u32>> {
        Ok(self
            .get_raw(APPLE_BOOT_GUID, CSR_ACTIVE_CONFIG)?
            .filter(|x| x.len() >= 4)
            .map(|x| u32::from_bytes(&x[..4])))
    }

    /// Writes the active System Integrity Protection configuration.
    ///
    /// # Errors
    ///
    /// See [`Self::set_raw`].
    pub fn set_csr_active_config(&mut self, value: u32) -> BootResult<()> {
        self.set_raw(APPLE_BOOT_GUID, CSR_ACTIVE_CONFIG, &value.to_bytes(), true)
    }

    /// Deletes every variable that would make a Mac boot into recovery mode.
    ///
    /// Returns how many were present.
    ///
    /// # Errors
    ///
    /// May return an `Error` if a present variable could not be deleted.
    pub fn clear_recovery_vars(&mut self) -> BootResult<usize> {
        let mut cleared = 0;
        for name in RECOVERY_VARIABLES {
            if self.get_raw(APPLE_BOOT_GUID, name)?.is_some() {
                self.set_raw(APPLE_BOOT_GUID, name, &[], true)?;
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}

/// Checks if a stored value already holds a new one.
///
/// Both are compared as nul-terminated text as well, so a list that already contains the new value counts.
fn holds_value(old: &[u8], new: &[u8]) -> bool {
    if old == new {
        return true;
    }
    let text = |x: &[u8]| x.iter().position(|&c| c == 0).map_or(x.len(), |end| end);
    let (old, new) = (&old[..text(old)], &new[..text(new)]);
    !new.is_empty() && old.windows(new.len()).any(|x| x == new)
}

/// A value that can be stored in a UEFI variable.
///
/// This is essentially a type that can be converted into and from a vector of bytes. Integers are stored little
/// endian.
pub trait UefiVariable: Sized {
    /// Convert `Self` to a vector of bytes.
    fn to_bytes(self) -> Vec<u8>;

    /// Convert a slice of bytes to `Self`. Missing bytes are read as zero, and extra bytes are ignored.
    fn from_bytes(bytes: &[u8]) -> Self;

    /// Return 0, or an equivalent value.
    fn default() -> Self;
}

/// Implements [`UefiVariable`] for integers.
macro_rules! int_variable {
    ($($ty:ty),*) => {$(
        impl UefiVariable for $ty {
            fn to_bytes(self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }
            fn from_bytes(bytes: &[u8]) -> Self {
                let mut array = [0; size_of::<$ty>()];
                let len = bytes.len().min(array.len());
                array[..len].copy_from_slice(&bytes[..len]);
                Self::from_le_bytes(array)
            }
            fn default() -> Self {
                0
            }
        }
    )*};
}

int_variable!(u8, u16, u32, u64);

impl UefiVariable for bool {
    fn to_bytes(self) -> Vec<u8> {
        u8::from(self).to_bytes()
    }
    fn from_bytes(bytes: &[u8]) -> Self {
        u8::from_bytes(bytes) > 0
    }
    fn default() -> Self {
        false
    }
}
