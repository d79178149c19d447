#![no_main]

use libfuzzer_sys::fuzz_target;
use refit_rs_core::volume::signature::{DetectContext, detect_filesystem};

fuzz_target!(|data: &[u8]| {
    let ctx = DetectContext {
        block_size: 512,
        is_logical_partition: data.first().is_some_and(|x| x & 1 == 1),
        ..DetectContext::default()
    };
    let _ = detect_filesystem(data, &ctx);
});
