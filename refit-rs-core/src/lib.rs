// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The `refit-rs` library crate.
//!
//! This contains the two halves of the boot manager that do not depend on a user interface: the volume scanner,
//! which discovers and classifies every block device the firmware exposes, and the configuration reader, which
//! turns a `refind.conf`-style text file into an immutable [`config::Settings`] plus a list of manual boot stanzas.
//!
//! Both halves are usable from a UEFI application (see `refit-rs-cli`), from the on-firmware integration tests,
//! and from the host-side fuzzers, since the byte-level logic never touches firmware directly.
//!
//! ## MSRV
//!
//! The minimum supported rust version is 1.88.0.

#![cfg_attr(not(any(fuzzing, test, doctest)), no_std)]

/// The primary result type that wraps around [`crate::error::BootError`].
pub type BootResult<T> = Result<T, crate::error::BootError>;

pub mod config;
pub mod error;
pub mod system;
pub mod volume;

extern crate alloc;
