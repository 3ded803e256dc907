#![no_main]
use libfuzzer_sys::fuzz_target;

use family_stays::adapters::memory_store::Snapshot;
use family_stays::domain::reservation::Reservation;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(record) = serde_json::from_str::<Reservation>(text) {
            let _ = record.stay();
            let _ = record.to_string();
        }
        let _ = serde_json::from_str::<Snapshot>(text);
    }
});
