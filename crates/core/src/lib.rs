#![forbid(unsafe_code)]

pub mod dragdrop;
pub mod model;
pub mod progress;
pub mod quiz;
pub mod time;

pub use time::Clock;
