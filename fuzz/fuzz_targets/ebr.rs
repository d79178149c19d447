#![no_main]

use libfuzzer_sys::fuzz_target;
use refit_rs_core::volume::{
    block::MemoryDisk,
    mbr::{EbrWalker, parse_table},
};

fuzz_target!(|data: &[u8]| {
    let Some(table) = parse_table(data) else {
        return;
    };
    let mut disk = MemoryDisk::new(data.to_vec(), 512);
    for entry in table.iter().filter(|x| refit_rs_core::volume::mbr::is_extended(x.part_type)) {
        for _ in EbrWalker::new(&mut disk, entry) {}
    }
});
