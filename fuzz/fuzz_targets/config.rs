#![no_main]

use libfuzzer_sys::fuzz_target;
use refit_rs_core::config::{MemorySource, ParseContext, reader::load_config};

fuzz_target!(|data: &[u8]| {
    let mut source = MemorySource::new();
    source.insert("refind.conf", data);
    let _ = load_config(&mut source, &ParseContext::default(), "refind.conf");
});
