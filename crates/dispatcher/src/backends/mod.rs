//! Backend implementations
//!
//! Contains LoopbackBackend and LogBackend.

mod log;
mod loopback;

pub use self::log::LogBackend;
pub use self::loopback::LoopbackBackend;
