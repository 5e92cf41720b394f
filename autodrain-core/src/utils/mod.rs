pub mod amount;
pub mod jitter;
pub mod throttle;
