//! # domains
//!
//! Entities, value objects, error taxonomy and port traits of the thread
//! subsystem. No I/O lives here.

pub mod errors;
pub mod models;
pub mod pagination;
pub mod ports;
pub mod sequence;

pub use errors::*;
pub use models::*;
pub use pagination::*;
pub use ports::*;
pub use sequence::*;
