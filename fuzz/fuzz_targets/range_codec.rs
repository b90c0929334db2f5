#![no_main]

use bench_store::model::{format_range, parse_range};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing must not panic regardless of input
        if let Ok(value) = parse_range(input) {
            // Accepted finite values must round-trip exactly
            if value.is_finite() {
                let literal = format_range(value);
                assert_eq!(parse_range(&literal), Ok(value));
            }
        }
    }
});
