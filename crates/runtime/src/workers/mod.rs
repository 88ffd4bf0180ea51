//! Worker tasks that back the judge runtime.
//!
//! The timekeeper drives match time; rule logic itself runs inside the bus
//! handlers, so workers only feed it.

mod timekeeper;

pub use timekeeper::Timekeeper;
