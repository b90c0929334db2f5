#![no_main]

use bench_store::store::SuiteDocument;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Arbitrary bytes must never panic the document reader; the store
        // reports them as corruption instead
        if let Ok(doc) = serde_json::from_str::<SuiteDocument>(input) {
            // Anything that parses must serialize back out
            let _ = doc.to_json_pretty();
        }
    }
});
