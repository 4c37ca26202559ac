//! # Handlers
//!
//! Coordinates the flow between HTTP requests and [`services::ThreadService`].

pub mod health;
pub mod threads;
