use refit_rs_core::{
    system::variable::{REFIT_GUID, VariableStore},
    volume::scan::image_location,
};
use uefi::println;

use crate::press_for_reboot;

const VARIABLE_NAME: &str = "RefitTestVariable";
const VARIABLE_CONTENT: u32 = 23;
const UPDATED_VARIABLE_CONTENT: u32 = 24;

fn store() -> VariableStore {
    VariableStore::open(true, "", None)
}

pub fn check_variable() -> anyhow::Result<()> {
    let mut store = store();
    let num = store.get::<u32>(REFIT_GUID, VARIABLE_NAME)?;
    if num != 0 {
        assert_ne!(num, UPDATED_VARIABLE_CONTENT);
        if num == VARIABLE_CONTENT {
            println!("Successfully got value of {VARIABLE_NAME}: {num}");
            store.set(REFIT_GUID, VARIABLE_NAME, Some(UPDATED_VARIABLE_CONTENT))?;
            assert_eq!(store.get::<u32>(REFIT_GUID, VARIABLE_NAME)?, UPDATED_VARIABLE_CONTENT);

            println!("Now testing if variable can be deleted");
            store.set::<u32>(REFIT_GUID, VARIABLE_NAME, None)?;
            assert!(store.get_raw(REFIT_GUID, VARIABLE_NAME)?.is_none());
            println!("All variable assertions passed!");
            println!("Press a key to reboot");
            press_for_reboot();
        }
    }
    Ok(())
}

pub fn test_variables() -> anyhow::Result<()> {
    let mut store = store();
    store.set(REFIT_GUID, VARIABLE_NAME, Some(VARIABLE_CONTENT))?;
    println!("Set value of {VARIABLE_NAME} to {VARIABLE_CONTENT}");
    assert_eq!(store.get::<u32>(REFIT_GUID, VARIABLE_NAME)?, VARIABLE_CONTENT);
    assert!(store.set(REFIT_GUID, VARIABLE_NAME, Some(VARIABLE_CONTENT)).is_err());

    test_vars_dir()?;

    match store.csr_active_config()? {
        Some(csr) => println!("csr-active-config is {csr:#x}"),
        None => println!("csr-active-config is not set"),
    }

    println!("Will now test if variable persists");
    println!("Press a key to reboot");
    press_for_reboot();
}

fn test_vars_dir() -> anyhow::Result<()> {
    let location = image_location()?;
    let mut store = VariableStore::open(false, &location.dir, location.device);
    store.set(REFIT_GUID, VARIABLE_NAME, Some(true))?;
    assert!(store.get::<bool>(REFIT_GUID, VARIABLE_NAME)?);
    store.set::<bool>(REFIT_GUID, VARIABLE_NAME, None)?;
    assert!(store.get_raw(REFIT_GUID, VARIABLE_NAME)?.is_none());
    println!("Vars directory assertions passed!");
    Ok(())
}
