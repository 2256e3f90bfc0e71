pub mod controller;
pub mod deriv;
pub mod executor;

pub use controller::{ControllerConfig, RunOutcome, TradeController};
pub use deriv::DerivClient;
pub use executor::OrderExecutor;
