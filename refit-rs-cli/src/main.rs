// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! A command line interface frontend to `refit-rs`.
//!
//! This scans volumes and reads `refind.conf` the same way a graphical boot manager would, then prints what it
//! found. It is meant to be run from a UEFI shell when working out why a volume or stanza does not show up.

#![no_main]
#![no_std]

extern crate alloc;

use alloc::{string::ToString, vec::Vec};

use getargs::{Arg, Options};
use refit_rs_core::{
    BootResult,
    config::{
        CONFIG_FILE_NAME, ParseContext,
        linux::read_linux_options,
        reader::{LoadedConfig, load_config},
    },
    system::{fs::UefiFileSystem, log_backend::UefiLogger, variable::VariableStore},
    volume::{
        ScanOptions, VolumeSet,
        scan::{
            ImageLocation, detect_legacy_type, image_location, is_apple_firmware, open_volume_fs, scan_volumes,
        },
    },
};
use uefi::{Status, boot, cstr16, entry, println, proto::loaded_image::LoadedImage};

/// The global logging instance.
static LOGGER: UefiLogger = UefiLogger::new();

/// Everything the boot manager knows once it has started up.
struct State {
    /// Where the boot manager was loaded from.
    location: ImageLocation,

    /// The scanned volumes.
    set: VolumeSet,

    /// The configuration, read with the scanned volumes available.
    loaded: LoadedConfig,
}

/// Scans volumes and reads the configuration.
///
/// The configuration is read twice. The first read only supplies the options that affect the scan, and the second
/// resolves the `volume` lines of manual stanzas against the scanned volumes.
///
/// # Errors
///
/// May return an `Error` if the image location could not be found, or the volumes could not be enumerated.
fn start_up() -> BootResult<State> {
    let location = image_location()?;
    let mut fs = UefiFileSystem::from_image_fs()?;

    let apple_firmware = is_apple_firmware();
    let early = load_config(
        &mut fs,
        &ParseContext::from_firmware(&[], None, &location),
        CONFIG_FILE_NAME,
    );
    log::set_max_level(early.settings.level_filter());

    let options = ScanOptions {
        legacy: detect_legacy_type(apple_firmware),
        apple_firmware,
        scan_other_esp: early.settings.scan_other_esp,
        sync_apfs: early.settings.sync_apfs,
    };
    let set = scan_volumes(&options, location.device)?;

    let ctx = ParseContext::from_firmware(&set.volumes, set.self_volume, &location);
    let loaded = load_config(&mut fs, &ctx, CONFIG_FILE_NAME);

    Ok(State { location, set, loaded })
}

/// Prints every volume.
fn list_volumes(set: &VolumeSet) {
    for (i, volume) in set.volumes.iter().enumerate() {
        let mut marks = Vec::new();
        if set.self_volume == Some(i) {
            marks.push("self");
        }
        if volume.is_esp() {
            marks.push("esp");
        }
        if !volume.is_readable {
            marks.push("skipped");
        }
        if volume.has_boot_code {
            marks.push("bootcode");
        }
        if volume.is_discovered_root {
            marks.push("root");
        }
        println!(
            "{i}: {} ({}, {:?}) [{}]",
            volume.name(),
            volume.fs_type.name(),
            volume.disk_kind,
            marks.join(",")
        );
    }
}

/// Prints the manual boot stanzas, along with the kernel options found for loaders without any.
///
/// Kernel options are read from the volume holding the loader.
fn list_entries(state: &State) {
    let root = state.set.discovered_root.and_then(|i| state.set.volumes.get(i));
    for (i, entry) in state.loaded.entries.iter().enumerate() {
        let loader = entry.loader.as_deref().unwrap_or_default();
        println!("{i}: {} ({loader})", entry.title);
        match &entry.options {
            Some(options) => println!("    options: {options}"),
            None => match open_volume_fs(&state.set, entry.volume) {
                Ok(mut fs) => {
                    for (title, options) in read_linux_options(&mut fs, loader, root) {
                        println!("    {title}: {options}");
                    }
                }
                Err(e) => println!("    Error: {e}"),
            },
        }
        for sub in &entry.submenus {
            println!("    - {}", sub.title);
        }
    }
}

/// Saves a snapshot of the settings into the variable store.
fn save_settings(state: &State) -> BootResult<()> {
    let esp = state
        .set
        .self_volume()
        .filter(|v| v.is_esp())
        .or_else(|| state.set.volumes.iter().find(|v| v.is_esp()))
        .and_then(|v| v.handle);
    let mut store = VariableStore::open(state.loaded.settings.use_nvram, &state.location.dir, esp);
    state.loaded.settings.save(&mut store)
}

/// The actual main function of the program.
///
/// # Errors
///
/// May return an `Error` if the program could not obtain the `LoadedImage` protocol, or starting up failed.
fn main_func() -> BootResult<()> {
    uefi::helpers::init()?; // initialize helpers (for print)

    let load_options = {
        let handle = boot::image_handle();
        let loaded_image = boot::open_protocol_exclusive::<LoadedImage>(handle)?;
        loaded_image
            .load_options_as_cstr16()
            .unwrap_or(cstr16!("refit-rs-cli.efi")) // there is at least one argument, which is the filename
            .to_string()
    }; // loaded_image dropped here

    let mut options = load_options.split_whitespace();

    let Some(app_filename) = options.next() else {
        println!("Error: No load options were passed to the program");
        return Ok(());
    };

    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(log::LevelFilter::Warn));

    let state = start_up()?;

    let mut opts = Options::new(options);
    while let Ok(Some(arg)) = opts.next_arg() {
        match arg {
            Arg::Short('l') | Arg::Long("list") => {
                list_volumes(&state.set);
                return Ok(());
            }
            Arg::Short('c') | Arg::Long("config") => {
                println!("{:#?}", state.loaded.settings);
                return Ok(());
            }
            Arg::Short('e') | Arg::Long("entries") => {
                list_entries(&state);
                return Ok(());
            }
            Arg::Short('s') | Arg::Long("save") => {
                match save_settings(&state) {
                    Ok(()) => println!("Saved the settings"),
                    Err(e) => println!("Error: {e}"),
                }
                return Ok(());
            }
            Arg::Short('h') | Arg::Long("help") => break, // ignore any other arguments and break out of the while loop when help is specified
            Arg::Short(invalid) => println!("Error: Unknown short argument: -{invalid}"),
            Arg::Long(invalid) => println!("Error: Unknown long argument: --{invalid}"),
            Arg::Positional(invalid) => println!("Error: Unknown positional argument: {invalid}"),
        }
    }

    println!(
        r"Usage: {app_filename} [OPTIONS]

-h, --help       display this help and exit
-l, --list       display scanned volumes and exit
-c, --config     display the loaded settings and exit
-e, --entries    display the manual boot stanzas and exit
-s, --save       save the loaded settings into the variable store
"
    );

    Ok(())
}

/// The main function of the program.
///
/// This will not panic on a fatal error, rather, it will return control to the UEFI shell (or the firmware menu).
#[entry]
fn main() -> Status {
    main_func().map_or_else(
        |e| {
            println!("Error: {e}");
            Status::ABORTED
        },
        |()| Status::SUCCESS,
    )
}
