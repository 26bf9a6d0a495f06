//! Normalized domain records produced by source adapters.

mod interval;
mod models;
mod symbol;
mod timestamp;

pub use interval::Interval;
pub use models::{validate_currency_code, Bar, Fundamentals, PriceSeries, Quote};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
