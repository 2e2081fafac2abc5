//! Fuzz target for scenario documents.
//!
//! Parsing must only ever return an error, and any scenario that parses
//! must evaluate without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rq_config::RiskQuantConfig;
use rq_core::logging::LogContext;
use rq_core::pipeline::{evaluate, Scenario};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(scenario) = Scenario::parse_json(text) {
        let ctx = LogContext::new("fuzz");
        let _ = evaluate(&scenario, &RiskQuantConfig::default(), None, &ctx);
    }
});
