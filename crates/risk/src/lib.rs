pub mod session;

pub use session::{SessionUpdate, TradingSession};
