#![no_main]
#![no_std]

// Integration tests for refit-rs, run on real or virtual firmware.

// DISCLAIMER: This code extensively uses unwrap and expect, as any errors in testing should be treated as fatal.

extern crate alloc;

use refit_rs_core::system::log_backend::UefiLogger;
use uefi::{
    prelude::*,
    println,
    proto::console::text::{Input, Key},
    runtime::{self, ResetType},
};

use crate::{
    config::test_config,
    fs::test_filesystem,
    variables::{check_variable, test_variables},
    volumes::test_volumes,
};

mod config;
mod fs;
mod variables;
mod volumes;

fn main_func() -> anyhow::Result<()> {
    uefi::helpers::init().map_err(|e| anyhow::anyhow!("{e}"))?;
    log::set_logger(UefiLogger::static_new())
        .map(|()| log::set_max_level(log::LevelFilter::Info))
        .expect("Failed to set logger"); // set up logger so that errors produced by the library will get caught as well

    check_variable()?;

    println!("Select the test you would like to do:");
    println!("1. Volume scan test");
    println!("2. Variables test");
    println!("3. Filesystem test");
    println!("4. Configuration test");
    loop {
        if let Key::Printable(char) = read_key() {
            let char = char::from(char);
            return match char {
                '1' => test_volumes(),
                '2' => test_variables(),
                '3' => test_filesystem(),
                '4' => test_config(),
                _ => Ok(()),
            };
        }
    }
}

#[entry]
fn main() -> Status {
    main_func().unwrap_or_else(|e| panic!("Failed to run test: {e}"));
    Status::SUCCESS
}

fn press_for_reboot() -> ! {
    let _ = read_key();
    runtime::reset(ResetType::COLD, Status::SUCCESS, None);
}

fn read_key() -> Key {
    let handle = boot::get_handle_for_protocol::<Input>().unwrap();
    let mut input = boot::open_protocol_exclusive::<Input>(handle).unwrap();
    let mut events = [input.wait_for_key_event().unwrap()];
    boot::wait_for_event(&mut events).unwrap();
    input.read_key().unwrap().unwrap()
}
