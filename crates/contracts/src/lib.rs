//! # Contracts
//!
//! Frozen interface contracts between the dispatcher and its surroundings.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Deadlines are `Duration`s measured from an arbitrary epoch by a [`Clock`]
//! - Nothing blocks; waiting is state plus a deadline checked on the next poll

mod backend;
mod blueprint;
mod clock;
mod error;
mod header;
mod payload;
mod postman;

pub use backend::Backend;
pub use blueprint::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::*;
pub use header::*;
pub use payload::Payload;
pub use postman::{DeliverInfo, Postman};
