#![forbid(unsafe_code)]

pub mod model;
pub mod navigator;
pub mod time;

pub use navigator::{NavTarget, Navigator};
pub use time::Clock;
