pub mod benchmarks;
pub mod cashflow;
pub mod config;
pub mod engine;
pub mod error;
pub mod kpi;
pub mod parameters;
pub mod scenario;
pub mod sensitivity;
pub mod tax;
pub mod time_value;
pub mod types;

pub use engine::{calculate, sweep, CalculationInput, CalculationOutput, SweepInput, SweepMode, SweepOutput};
pub use error::PppFinanceError;
pub use parameters::ParameterSet;
pub use types::*;

/// Standard result type for all ppp-finance operations
pub type PppFinanceResult<T> = Result<T, PppFinanceError>;
