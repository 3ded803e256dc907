#![no_main]
use libfuzzer_sys::fuzz_target;

use family_stays::domain::apartment::{Apartment, Family};
use family_stays::domain::policy::BookingPolicy;
use family_stays::domain::pricing::calculate_price;
use family_stays::domain::season::check_season_rules;
use family_stays::domain::stay::StayRange;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Some((arrival, departure)) = text.split_once(' ') else {
        return;
    };
    if let Ok(stay) = StayRange::parse(arrival, departure) {
        let policy = BookingPolicy::default();
        let _ = check_season_rules(&policy, &stay);
        if stay.nights() <= 400 {
            for apartment in Apartment::ALL {
                let _ = calculate_price(&policy, apartment, &stay, Family::C);
            }
        }
    }
});
