//! # services
//!
//! Application logic for threads: the membership rules and the response
//! views built on top of them. Adapters are injected as port trait objects.

pub mod thread_service;
pub mod validation;
pub mod views;

pub use thread_service::ThreadService;
pub use views::{ThreadBlogSummary, ThreadList, ThreadNavigation, ThreadView};
