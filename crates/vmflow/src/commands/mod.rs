pub mod deploy;
pub mod lifecycle;
pub mod monitor;
pub mod poll;
