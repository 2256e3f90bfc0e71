pub mod config;
pub mod error;
pub mod exchange;
pub mod notify;
pub mod types;

pub use config::{Config, OrderFailurePolicy};
pub use error::{Error, Result};
pub use exchange::{CandleSource, OrderGateway};
pub use notify::{LogNotifier, Notifier};
pub use types::*;
