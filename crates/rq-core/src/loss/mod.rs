//! Loss magnitude and loss event frequency.

pub mod ledger;
pub mod lef;
pub mod magnitude;

pub use ledger::{LedgerError, LossLedger};
pub use lef::{matched_vulnerabilities, total_lef, vulnerability_lef, VulnerabilityLef, LEF_NORMALIZER};
pub use magnitude::{criticality, primary_loss_magnitude};
