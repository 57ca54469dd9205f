pub mod aggregate;
pub mod calculator;
pub mod exit_range;
pub mod preference;
pub mod projection;
pub mod residual;
pub mod structure;
pub mod validation;
pub mod waterfall;

pub use calculator::{calculate, calculate_with_policy};
pub use preference::SeniorityTieBreak;
pub use projection::{Payout, WaterfallResult};
pub use structure::{EquityStructure, Investor, ShareClass, ShareHolding};
