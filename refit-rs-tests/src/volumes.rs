use refit_rs_core::{
    config::linux::first_options,
    system::fs::UefiFileSystem,
    volume::{
        ScanOptions, VolumeSet,
        scan::{detect_legacy_type, image_location, is_apple_firmware, open_volume_fs, scan_volumes},
    },
};
use uefi::{CStr16, cstr16, println};

const KERNEL_DIR: &CStr16 = cstr16!("\\refit-kernel");
const OPTIONS_PATH: &CStr16 = cstr16!("\\refit-kernel\\refind_linux.conf");
const OPTIONS_CONTENT: &str = "\"Boot with standard options\" \"root=/dev/sda2 quiet\"\n";

pub fn test_volumes() -> anyhow::Result<()> {
    let location = image_location()?;
    let apple_firmware = is_apple_firmware();
    let options = ScanOptions {
        legacy: detect_legacy_type(apple_firmware),
        apple_firmware,
        scan_other_esp: false,
        sync_apfs: true,
    };
    let set = scan_volumes(&options, location.device)?;

    assert!(!set.volumes.is_empty());
    let own = set.self_volume().expect("The volume the tests were loaded from was not found");
    assert!(own.is_readable);
    assert!(own.has_root);
    assert!(set.volumes.iter().all(|v| !v.name().is_empty()));

    for (i, volume) in set.volumes.iter().enumerate() {
        println!("{i}: {} ({}, {:?})", volume.name(), volume.fs_type.name(), volume.disk_kind);
    }
    println!("Loaded from \"{}\" in \"{}\"", own.name(), location.dir);

    test_volume_fs(&set)?;
    println!("All volume assertions passed!");
    Ok(())
}

fn test_volume_fs(set: &VolumeSet) -> anyhow::Result<()> {
    {
        let mut fs = UefiFileSystem::from_image_fs()?;
        fs.create_dir(KERNEL_DIR)?;
        fs.write(OPTIONS_PATH, OPTIONS_CONTENT.as_bytes())?;
    } // the image filesystem is closed here so that it can be opened by handle

    for index in [set.self_volume, None] {
        let mut fs = open_volume_fs(set, index)?;
        assert_eq!(
            first_options(&mut fs, "\\refit-kernel\\vmlinuz", None).as_deref(),
            Some("root=/dev/sda2 quiet")
        );
    }
    assert!(open_volume_fs(set, Some(set.volumes.len())).is_err());

    let mut fs = UefiFileSystem::from_image_fs()?;
    fs.delete(OPTIONS_PATH)?;
    fs.delete(KERNEL_DIR)?;
    Ok(())
}
