//! # auth-adapters
//!
//! Implementations of [`domains::AuthProvider`].

#[cfg(feature = "auth-jwt")]
pub mod jwt;

#[cfg(feature = "auth-jwt")]
pub use jwt::{Claims, JwtAuthProvider};
