//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Any config that parses must also satisfy the tracker invariants.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = stillcode_config::AppConfig::parse(s) {
        let tracker = &config.tracker;
        assert!(tracker.near_margin <= tracker.far_margin);
        assert!(tracker.timeouts.windows(2).all(|w| w[0].delay_secs < w[1].delay_secs));
    }
});
