//! Fuzz target for risk_quant.json parsing and validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rq_config::{validate_config, RiskQuantConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = RiskQuantConfig::parse_json(text) {
        let _ = validate_config(&config);
    }
});
