use refit_rs_core::system::fs::UefiFileSystem;
use uefi::{CStr16, cstr16, println};

const DIR_PATH: &CStr16 = cstr16!("\\refit-test");
const FILE_PATH: &CStr16 = cstr16!("\\refit-test\\foo.file");
const FILE_CONTENT: &[u8] = &55usize.to_le_bytes();

pub fn test_filesystem() -> anyhow::Result<()> {
    let mut fs = UefiFileSystem::from_image_fs()?;

    fs.create_dir(DIR_PATH)?;
    assert!(fs.exists(DIR_PATH));
    fs.write(FILE_PATH, FILE_CONTENT)?;
    assert!(fs.exists(FILE_PATH));
    assert_eq!(fs.read(FILE_PATH)?, FILE_CONTENT);
    assert!(fs.exists_str("\\REFIT-TEST\\FOO.FILE")?);
    fs.delete(FILE_PATH)?;
    assert!(!fs.exists(FILE_PATH));
    fs.delete(DIR_PATH)?;
    assert!(!fs.exists(DIR_PATH));

    println!("Volume label: {}", fs.get_volume_label()?);
    println!("Volume size: {} bytes", fs.get_volume_size()?);
    println!("All filesystem assertions passed!");
    Ok(())
}
