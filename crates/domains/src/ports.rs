//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be wired into the binary.

use async_trait::async_trait;

use crate::errors::DomainResult;
use crate::models::{BlogId, BlogRecord, Thread, ThreadId, UserId, UserSummary};
use crate::pagination::PageRequest;

/// Persistence contract for threads.
///
/// Implementations own the blog-to-thread uniqueness constraint: `insert` and
/// `save` must reject, atomically with the write, any membership that would
/// place a blog in two threads, returning [`DomainError::Conflict`].
///
/// [`DomainError::Conflict`]: crate::errors::DomainError::Conflict
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Persists a new thread and returns it with store-assigned timestamps.
    async fn insert(&self, thread: Thread) -> DomainResult<Thread>;
    async fn find_by_id(&self, id: ThreadId) -> DomainResult<Option<Thread>>;
    /// The thread whose membership currently includes `blog_id`, if any.
    async fn find_by_blog_id(&self, blog_id: BlogId) -> DomainResult<Option<Thread>>;
    /// Published, public threads, newest first. Returns the page and the total.
    async fn list_public(&self, page: PageRequest) -> DomainResult<(Vec<Thread>, u64)>;
    /// All threads of one author, newest first.
    async fn list_by_author(
        &self,
        author_id: UserId,
        page: PageRequest,
    ) -> DomainResult<(Vec<Thread>, u64)>;
    /// Full replace of an existing thread; refreshes `updated_at`.
    async fn save(&self, thread: Thread) -> DomainResult<Thread>;
    /// Returns false when nothing was deleted.
    async fn delete(&self, id: ThreadId) -> DomainResult<bool>;
}

/// Read-only lookup into the blog registry.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BlogRegistry: Send + Sync {
    async fn find_blog(&self, id: BlogId) -> DomainResult<Option<BlogRecord>>;
}

/// Read-only lookup of public user profiles.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: UserId) -> DomainResult<Option<UserSummary>>;
}

/// Identity contract: turns a presented credential into a requester id.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AuthProvider: Send + Sync {
    fn authenticate(&self, token: &str) -> DomainResult<UserId>;
}
