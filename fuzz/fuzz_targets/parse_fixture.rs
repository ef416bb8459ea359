#![no_main]

use lanes_core::fixture::parse_commits;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_commits(text);
    }
});
