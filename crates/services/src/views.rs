//! # Thread presentation
//!
//! Response shapes assembled from a thread plus read-only joins against the
//! blog registry and the user directory.

use chrono::{DateTime, Utc};
use serde::Serialize;

use domains::{
    BlogId, BlogRecord, BlogStatus, Page, SeriesPosition, Thread, ThreadId, ThreadStatus, UserId,
    UserSummary,
};

/// A blog entry as listed inside a thread, with its zero-based position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadBlogSummary {
    pub id: BlogId,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub status: BlogStatus,
    pub order: usize,
    pub created_at: DateTime<Utc>,
}

impl ThreadBlogSummary {
    pub fn from_record(blog: BlogRecord, order: usize) -> Self {
        Self {
            id: blog.id,
            title: blog.title,
            slug: blog.slug,
            excerpt: blog.excerpt,
            cover_image: blog.cover_image,
            status: blog.status,
            order,
            created_at: blog.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadView {
    pub id: ThreadId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub author_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
    pub blog_ids: Vec<BlogId>,
    /// Present only on detail responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blogs: Option<Vec<ThreadBlogSummary>>,
    pub status: ThreadStatus,
    pub is_public: bool,
    pub post_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ThreadView {
    pub fn assemble(
        thread: Thread,
        author: Option<UserSummary>,
        blogs: Option<Vec<ThreadBlogSummary>>,
    ) -> Self {
        Self {
            id: thread.id,
            title: thread.title,
            description: thread.description,
            author_id: thread.author_id,
            author,
            post_count: thread.blog_ids.len(),
            blog_ids: thread.blog_ids.into(),
            blogs,
            status: thread.status,
            is_public: thread.is_public,
            created_at: thread.created_at,
            updated_at: thread.updated_at,
        }
    }
}

/// Series navigation for a single blog page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadNavigation {
    pub thread: ThreadView,
    pub blog_id: BlogId,
    pub current_index: usize,
    pub total: usize,
    pub previous_blog_id: Option<BlogId>,
    pub next_blog_id: Option<BlogId>,
}

impl ThreadNavigation {
    pub fn new(thread: ThreadView, blog_id: BlogId, position: SeriesPosition) -> Self {
        Self {
            thread,
            blog_id,
            current_index: position.index,
            total: position.total,
            previous_blog_id: position.previous,
            next_blog_id: position.next,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadList {
    pub threads: Vec<ThreadView>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u64,
}

impl From<Page<ThreadView>> for ThreadList {
    fn from(page: Page<ThreadView>) -> Self {
        Self {
            threads: page.items,
            total: page.total,
            page: page.page,
            total_pages: page.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::BlogSequence;

    #[test]
    fn list_view_omits_blog_summaries() {
        let (a, b) = (BlogId::new(), BlogId::new());
        let thread = Thread {
            id: ThreadId::new(),
            title: "Series".into(),
            description: None,
            author_id: UserId::new(),
            blog_ids: BlogSequence::new(vec![a, b]).unwrap(),
            status: ThreadStatus::Published,
            is_public: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(ThreadView::assemble(thread, None, None)).unwrap();
        assert_eq!(json["postCount"], 2);
        assert_eq!(json["blogIds"][1], b.to_string());
        assert!(json.get("blogs").is_none());
        assert!(json.get("author").is_none());
    }
}
