//! Shared setup for the live suites.
//!
//! Live tests talk to the real backend (and, for `ui`, a local Chromium).
//! They only run with `E2E_LIVE=1`; otherwise each one returns early.

#![allow(dead_code)]

use toolshop_e2e::{logging, Harness};

/// Whether the live suites were opted into
pub fn live_enabled() -> bool {
    std::env::var("E2E_LIVE").is_ok_and(|v| toolshop_e2e::config::parse_bool_like(&v))
}

/// Return early from a live test unless `E2E_LIVE` is set
macro_rules! require_live {
    () => {
        if !common::live_enabled() {
            eprintln!("[SKIP] {} requires E2E_LIVE=1", module_path!());
            return;
        }
    };
}

/// Harness over the process configuration, with logging installed
pub fn harness() -> Harness {
    logging::init();
    Harness::from_env()
}
