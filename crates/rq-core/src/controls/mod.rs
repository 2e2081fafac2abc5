//! Security control economics and the pairwise interaction matrix.

pub mod economics;
pub mod editor;
pub mod interaction;

pub use economics::{
    evaluate_control, evaluate_portfolio, net_risk_reduction, rosi, total_cost,
    ControlEvaluation, PortfolioEvaluation,
};
pub use editor::{CellEditState, EditError, EditOutcome, MatrixEditor};
pub use interaction::{InteractionMatrix, MatrixError, MatrixRow};
