#![no_main]

use libfuzzer_sys::fuzz_target;
use refit_rs_core::config::tokenizer::ConfigFile;

fuzz_target!(|data: &[u8]| {
    let mut file = ConfigFile::new(data);
    while !file.read_token_line().is_empty() {}
});
