//! Risk Quant Core Library
//!
//! This library provides the scoring and normalization engine:
//! - Threat ability and Threat Event Frequency (TEF) scoring
//! - Loss event frequency, primary and secondary loss magnitude
//! - Total risk and control economics (NRR, ROSI, interaction synergy)
//! - Preference adapters, save-state tracking and the derived-state store
//!
//! The binary entry point is in `main.rs`.

pub mod budget;
pub mod controls;
pub mod exit_codes;
pub mod logging;
pub mod loss;
pub mod pipeline;
pub mod preference;
pub mod report;
pub mod repository;
pub mod risk;
pub mod scoring;
pub mod session;
pub mod sync;

// Re-export test utilities for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
