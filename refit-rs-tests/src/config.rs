use refit_rs_core::{
    config::{ParseContext, reader::load_config},
    system::fs::UefiFileSystem,
    volume::scan::image_location,
};
use uefi::{CStr16, cstr16, println};

const CONFIG_PATH: &CStr16 = cstr16!("\\refit-test.conf");
const CONFIG_CONTENT: &str = "timeout 7\nuse_nvram false\nmenuentry Shell {\n    loader /EFI/tools/shellx64.efi\n}\n";

pub fn test_config() -> anyhow::Result<()> {
    let location = image_location()?;
    let mut fs = UefiFileSystem::from_image_fs()?;
    fs.write(CONFIG_PATH, CONFIG_CONTENT.as_bytes())?;

    let ctx = ParseContext::from_firmware(&[], None, &location);
    let loaded = load_config(&mut fs, &ctx, "\\refit-test.conf");
    fs.delete(CONFIG_PATH)?;

    assert_eq!(loaded.settings.timeout, 7);
    assert!(!loaded.settings.use_nvram);
    assert_eq!(loaded.entries.len(), 1);
    assert_eq!(loaded.entries[0].loader.as_deref(), Some("\\EFI\\tools\\shellx64.efi"));

    println!("Text only: {}", loaded.settings.text_only);
    println!("All configuration assertions passed!");
    Ok(())
}
