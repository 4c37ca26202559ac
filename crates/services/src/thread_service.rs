//! # ThreadService
//!
//! Enforces the membership rules of threads across every mutating operation:
//!
//! - a blog belongs to at most one thread at a time;
//! - a thread lists each blog once, and only blogs its author owns;
//! - reordering is a pure permutation of the current members.
//!
//! Each operation reads, validates, then issues a single write. The store
//! re-checks blog uniqueness inside that write, so two requests racing for
//! the same blog cannot both succeed.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use domains::{
    BlogId, BlogRegistry, BlogSequence, DomainError, DomainResult, ErrorKind, NewThread, Page,
    PageRequest, Thread, ThreadId, ThreadPatch, ThreadRepository, UserDirectory, UserId,
};

use crate::validation;
use crate::views::{ThreadBlogSummary, ThreadList, ThreadNavigation, ThreadView};

pub struct ThreadService {
    threads: Arc<dyn ThreadRepository>,
    blogs: Arc<dyn BlogRegistry>,
    users: Arc<dyn UserDirectory>,
}

impl ThreadService {
    pub fn new(
        threads: Arc<dyn ThreadRepository>,
        blogs: Arc<dyn BlogRegistry>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            threads,
            blogs,
            users,
        }
    }

    pub async fn create(&self, author_id: UserId, input: NewThread) -> DomainResult<ThreadView> {
        let title = validation::title(&input.title)?;
        let description = validation::description(input.description)?;
        let blog_ids = BlogSequence::new(input.blog_ids)?;
        self.check_candidates(author_id, blog_ids.as_slice(), None)
            .await?;

        let now = Utc::now();
        let thread = Thread {
            id: ThreadId::new(),
            title,
            description,
            author_id,
            blog_ids,
            status: input.status.unwrap_or_default(),
            is_public: input.is_public.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        let thread = self.threads.insert(thread).await.map_err(log_conflict)?;
        info!(thread = %thread.id, author = %author_id, posts = thread.blog_ids.len(), "thread created");
        self.present(thread, true).await
    }

    pub async fn get_by_id(&self, id: ThreadId, include_blogs: bool) -> DomainResult<ThreadView> {
        let thread = self
            .threads
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Thread", id))?;
        self.present(thread, include_blogs).await
    }

    /// Published, public threads only.
    pub async fn get_all(&self, page: PageRequest) -> DomainResult<ThreadList> {
        let page = page.normalized();
        let (threads, total) = self.threads.list_public(page).await?;
        debug!(count = threads.len(), total, "listing public threads");
        self.present_page(threads, total, page, false).await
    }

    pub async fn get_by_author(
        &self,
        author_id: UserId,
        page: PageRequest,
    ) -> DomainResult<ThreadList> {
        let page = page.normalized();
        let (threads, total) = self.threads.list_by_author(author_id, page).await?;
        self.present_page(threads, total, page, false).await
    }

    /// The requester's own threads, drafts included, with blog summaries.
    pub async fn get_my_threads(
        &self,
        author_id: UserId,
        page: PageRequest,
    ) -> DomainResult<ThreadList> {
        let page = page.normalized();
        let (threads, total) = self.threads.list_by_author(author_id, page).await?;
        self.present_page(threads, total, page, true).await
    }

    /// Applies a partial update. A present `blog_ids` replaces the whole
    /// membership and is validated like `create`, except that blogs already
    /// in this thread do not conflict with it.
    pub async fn update(
        &self,
        id: ThreadId,
        requester: UserId,
        patch: ThreadPatch,
    ) -> DomainResult<ThreadView> {
        let mut thread = self.load_owned(id, requester, "update").await?;

        if let Some(title) = patch.title {
            thread.title = validation::title(&title)?;
        }
        if let Some(description) = patch.description {
            thread.description = validation::description(Some(description))?;
        }
        if let Some(blog_ids) = patch.blog_ids {
            let blog_ids = BlogSequence::new(blog_ids)?;
            self.check_candidates(requester, blog_ids.as_slice(), Some(thread.id))
                .await?;
            thread.blog_ids = blog_ids;
        }
        if let Some(status) = patch.status {
            thread.status = status;
        }
        if let Some(is_public) = patch.is_public {
            thread.is_public = is_public;
        }

        let thread = self.threads.save(thread).await.map_err(log_conflict)?;
        info!(thread = %thread.id, "thread updated");
        self.present(thread, true).await
    }

    /// Removes the thread record. Member blogs are left alone and become
    /// free to join other threads.
    pub async fn delete(&self, id: ThreadId, requester: UserId) -> DomainResult<()> {
        let thread = self.load_owned(id, requester, "delete").await?;
        if !self.threads.delete(thread.id).await? {
            return Err(DomainError::not_found("Thread", id));
        }
        info!(thread = %id, released = thread.blog_ids.len(), "thread deleted");
        Ok(())
    }

    /// Appends `blog_id` at the end of the thread.
    pub async fn add_blog(
        &self,
        id: ThreadId,
        requester: UserId,
        blog_id: BlogId,
    ) -> DomainResult<ThreadView> {
        let mut thread = self.load_owned(id, requester, "modify").await?;

        let blog = self
            .blogs
            .find_blog(blog_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Blog", blog_id))?;
        if blog.author_id != requester {
            return Err(DomainError::Forbidden("Blog does not belong to you".into()));
        }
        if let Some(existing) = self.threads.find_by_blog_id(blog_id).await? {
            if existing.id != thread.id {
                return Err(DomainError::AlreadyInThread {
                    blog_id,
                    blog_title: blog.title,
                    thread_id: existing.id,
                    thread_title: existing.title,
                });
            }
        }
        thread.blog_ids.push(blog_id)?;

        let thread = self.threads.save(thread).await.map_err(log_conflict)?;
        info!(thread = %thread.id, blog = %blog_id, "blog added to thread");
        self.present(thread, true).await
    }

    /// Removing a blog that is not a member returns the thread unchanged.
    pub async fn remove_blog(
        &self,
        id: ThreadId,
        requester: UserId,
        blog_id: BlogId,
    ) -> DomainResult<ThreadView> {
        let mut thread = self.load_owned(id, requester, "modify").await?;
        if !thread.blog_ids.remove(blog_id) {
            debug!(thread = %id, blog = %blog_id, "blog not in thread; nothing to remove");
            return self.present(thread, true).await;
        }
        let thread = self.threads.save(thread).await?;
        info!(thread = %thread.id, blog = %blog_id, "blog removed from thread");
        self.present(thread, true).await
    }

    pub async fn reorder_blogs(
        &self,
        id: ThreadId,
        requester: UserId,
        new_order: Vec<BlogId>,
    ) -> DomainResult<ThreadView> {
        let mut thread = self.load_owned(id, requester, "modify").await?;
        thread.blog_ids.reorder(new_order)?;
        let thread = self.threads.save(thread).await?;
        info!(thread = %thread.id, "thread reordered");
        self.present(thread, true).await
    }

    pub async fn get_thread_by_blog_id(&self, blog_id: BlogId) -> DomainResult<Option<ThreadView>> {
        match self.threads.find_by_blog_id(blog_id).await? {
            Some(thread) => self.present(thread, true).await.map(Some),
            None => Ok(None),
        }
    }

    /// The enclosing thread of `blog_id` plus its previous and next entries.
    pub async fn navigation_for_blog(
        &self,
        blog_id: BlogId,
    ) -> DomainResult<Option<ThreadNavigation>> {
        let Some(thread) = self.threads.find_by_blog_id(blog_id).await? else {
            return Ok(None);
        };
        let Some(position) = thread.blog_ids.neighbours(blog_id) else {
            // The store matched on membership, so this only happens if it lied.
            warn!(thread = %thread.id, blog = %blog_id, "store returned a thread without the blog");
            return Ok(None);
        };
        let view = self.present(thread, true).await?;
        Ok(Some(ThreadNavigation::new(view, blog_id, position)))
    }

    async fn load_owned(
        &self,
        id: ThreadId,
        requester: UserId,
        action: &str,
    ) -> DomainResult<Thread> {
        let thread = self
            .threads
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Thread", id))?;
        if !thread.is_owned_by(requester) {
            warn!(thread = %id, requester = %requester, action, "ownership check failed");
            return Err(DomainError::Forbidden(format!(
                "Not authorized to {action} this thread"
            )));
        }
        Ok(thread)
    }

    /// Every candidate must exist, belong to `author_id`, and be free of any
    /// thread other than `current`.
    async fn check_candidates(
        &self,
        author_id: UserId,
        blog_ids: &[BlogId],
        current: Option<ThreadId>,
    ) -> DomainResult<()> {
        for &blog_id in blog_ids {
            let blog = self
                .blogs
                .find_blog(blog_id)
                .await?
                .ok_or_else(|| DomainError::not_found("Blog", blog_id))?;
            if blog.author_id != author_id {
                return Err(DomainError::Forbidden(format!(
                    "Blog {blog_id} does not belong to you"
                )));
            }
            if let Some(existing) = self.threads.find_by_blog_id(blog_id).await? {
                if Some(existing.id) != current {
                    return Err(DomainError::AlreadyInThread {
                        blog_id,
                        blog_title: blog.title,
                        thread_id: existing.id,
                        thread_title: existing.title,
                    });
                }
            }
        }
        Ok(())
    }

    async fn present(&self, thread: Thread, include_blogs: bool) -> DomainResult<ThreadView> {
        let author = self.users.find_user(thread.author_id).await?;
        let blogs = if include_blogs {
            let mut summaries = Vec::with_capacity(thread.blog_ids.len());
            for (order, &blog_id) in thread.blog_ids.iter().enumerate() {
                // Blogs deleted from the registry are skipped but keep their slot.
                if let Some(blog) = self.blogs.find_blog(blog_id).await? {
                    summaries.push(ThreadBlogSummary::from_record(blog, order));
                }
            }
            Some(summaries)
        } else {
            None
        };
        Ok(ThreadView::assemble(thread, author, blogs))
    }

    async fn present_page(
        &self,
        threads: Vec<Thread>,
        total: u64,
        page: PageRequest,
        include_blogs: bool,
    ) -> DomainResult<ThreadList> {
        let mut views = Vec::with_capacity(threads.len());
        for thread in threads {
            views.push(self.present(thread, include_blogs).await?);
        }
        Ok(Page::new(views, total, page).into())
    }
}

fn log_conflict(err: DomainError) -> DomainError {
    if err.kind() == ErrorKind::Conflict {
        warn!(error = %err, "store rejected thread membership");
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{
        BlogRecord, BlogStatus, MockBlogRegistry, MockThreadRepository, MockUserDirectory,
        ThreadStatus,
    };

    fn blog(author_id: UserId, title: &str) -> BlogRecord {
        BlogRecord {
            id: BlogId::new(),
            author_id,
            title: title.to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
            excerpt: String::new(),
            cover_image: None,
            status: BlogStatus::Published,
            created_at: Utc::now(),
        }
    }

    fn thread(author_id: UserId, title: &str, blog_ids: Vec<BlogId>) -> Thread {
        Thread {
            id: ThreadId::new(),
            title: title.to_string(),
            description: None,
            author_id,
            blog_ids: BlogSequence::new(blog_ids).unwrap(),
            status: ThreadStatus::Draft,
            is_public: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn registry(records: Vec<BlogRecord>) -> MockBlogRegistry {
        let mut blogs = MockBlogRegistry::new();
        blogs
            .expect_find_blog()
            .returning(move |id| Ok(records.iter().find(|b| b.id == id).cloned()));
        blogs
    }

    fn anonymous_users() -> MockUserDirectory {
        let mut users = MockUserDirectory::new();
        users.expect_find_user().returning(|_| Ok(None));
        users
    }

    fn service(
        threads: MockThreadRepository,
        blogs: MockBlogRegistry,
        users: MockUserDirectory,
    ) -> ThreadService {
        ThreadService::new(Arc::new(threads), Arc::new(blogs), Arc::new(users))
    }

    #[tokio::test]
    async fn create_preserves_caller_order() {
        let author = UserId::new();
        let b1 = blog(author, "One");
        let b2 = blog(author, "Two");
        let order = vec![b2.id, b1.id];

        let mut threads = MockThreadRepository::new();
        threads.expect_find_by_blog_id().returning(|_| Ok(None));
        threads.expect_insert().times(1).returning(Ok);

        let svc = service(threads, registry(vec![b1.clone(), b2.clone()]), anonymous_users());
        let view = svc
            .create(
                author,
                NewThread {
                    title: "  Series  ".into(),
                    blog_ids: order.clone(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(view.title, "Series");
        assert_eq!(view.blog_ids, order);
        assert_eq!(view.status, ThreadStatus::Draft);
        assert!(view.is_public);
        let blogs = view.blogs.unwrap();
        assert_eq!(blogs[0].id, b2.id);
        assert_eq!(blogs[0].order, 0);
        assert_eq!(blogs[1].order, 1);
    }

    #[tokio::test]
    async fn create_rejects_foreign_blog_without_writing() {
        let author = UserId::new();
        let foreign = blog(UserId::new(), "Not mine");

        let mut threads = MockThreadRepository::new();
        threads.expect_find_by_blog_id().returning(|_| Ok(None));
        threads.expect_insert().never();

        let svc = service(threads, registry(vec![foreign.clone()]), anonymous_users());
        let err = svc
            .create(
                author,
                NewThread {
                    title: "Mine".into(),
                    blog_ids: vec![foreign.id],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn create_rejects_unknown_blog_and_duplicates() {
        let author = UserId::new();
        let mut threads = MockThreadRepository::new();
        threads.expect_insert().never();
        let svc = service(threads, registry(vec![]), anonymous_users());

        let err = svc
            .create(
                author,
                NewThread {
                    title: "T".into(),
                    blog_ids: vec![BlogId::new()],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let dup = BlogId::new();
        let err = svc
            .create(
                author,
                NewThread {
                    title: "T".into(),
                    blog_ids: vec![dup, dup],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn add_blog_by_non_owner_is_forbidden() {
        let owner = UserId::new();
        let intruder = UserId::new();
        let existing = thread(owner, "Owned", vec![]);
        let id = existing.id;

        let mut threads = MockThreadRepository::new();
        threads
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        threads.expect_save().never();

        let svc = service(threads, registry(vec![]), anonymous_users());
        let err = svc.add_blog(id, intruder, BlogId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn add_blog_names_the_other_thread() {
        let author = UserId::new();
        let b = blog(author, "Chapter");
        let target = thread(author, "Target", vec![]);
        let other = thread(author, "Elsewhere", vec![b.id]);
        let target_id = target.id;

        let mut threads = MockThreadRepository::new();
        threads
            .expect_find_by_id()
            .returning(move |_| Ok(Some(target.clone())));
        threads
            .expect_find_by_blog_id()
            .returning(move |_| Ok(Some(other.clone())));
        threads.expect_save().never();

        let svc = service(threads, registry(vec![b.clone()]), anonymous_users());
        let err = svc.add_blog(target_id, author, b.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("Elsewhere"));
    }

    #[tokio::test]
    async fn add_blog_twice_to_same_thread_conflicts() {
        let author = UserId::new();
        let b = blog(author, "Chapter");
        let target = thread(author, "Target", vec![b.id]);
        let target_id = target.id;
        let same = target.clone();

        let mut threads = MockThreadRepository::new();
        threads
            .expect_find_by_id()
            .returning(move |_| Ok(Some(target.clone())));
        threads
            .expect_find_by_blog_id()
            .returning(move |_| Ok(Some(same.clone())));
        threads.expect_save().never();

        let svc = service(threads, registry(vec![b.clone()]), anonymous_users());
        let err = svc.add_blog(target_id, author, b.id).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyMember(id) if id == b.id));
    }

    #[tokio::test]
    async fn remove_absent_blog_returns_thread_unchanged() {
        let author = UserId::new();
        let b = blog(author, "Kept");
        let existing = thread(author, "Series", vec![b.id]);
        let id = existing.id;

        let mut threads = MockThreadRepository::new();
        threads
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        threads.expect_save().never();

        let svc = service(threads, registry(vec![b.clone()]), anonymous_users());
        let view = svc.remove_blog(id, author, BlogId::new()).await.unwrap();
        assert_eq!(view.blog_ids, vec![b.id]);
    }

    #[tokio::test]
    async fn reorder_mismatch_is_rejected_before_saving() {
        let author = UserId::new();
        let (a, b) = (BlogId::new(), BlogId::new());
        let existing = thread(author, "Series", vec![a, b]);
        let id = existing.id;

        let mut threads = MockThreadRepository::new();
        threads
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        threads.expect_save().never();

        let svc = service(threads, registry(vec![]), anonymous_users());
        let err = svc.reorder_blogs(id, author, vec![a]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("Reorder must contain the same blog IDs"));
    }

    #[tokio::test]
    async fn update_does_not_conflict_with_own_members() {
        let author = UserId::new();
        let b1 = blog(author, "One");
        let b2 = blog(author, "Two");
        let existing = thread(author, "Series", vec![b1.id]);
        let id = existing.id;
        let owner_of_b1 = existing.clone();
        let member = b1.id;
        let new_ids = vec![b2.id, b1.id];
        let expected = new_ids.clone();

        let mut threads = MockThreadRepository::new();
        threads
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        threads
            .expect_find_by_blog_id()
            .returning(move |blog_id| Ok((blog_id == member).then(|| owner_of_b1.clone())));
        threads
            .expect_save()
            .withf(move |t| t.blog_ids.as_slice() == expected.as_slice() && !t.is_public)
            .times(1)
            .returning(Ok);

        let svc = service(threads, registry(vec![b1, b2]), anonymous_users());
        let view = svc
            .update(
                id,
                author,
                ThreadPatch {
                    blog_ids: Some(new_ids.clone()),
                    is_public: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(view.blog_ids, new_ids);
        assert_eq!(view.post_count, 2);
    }

    #[tokio::test]
    async fn delete_by_non_owner_leaves_thread_in_place() {
        let owner = UserId::new();
        let existing = thread(owner, "Mine", vec![]);
        let id = existing.id;

        let mut threads = MockThreadRepository::new();
        threads
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        threads.expect_delete().never();

        let svc = service(threads, registry(vec![]), anonymous_users());
        let err = svc.delete(id, UserId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn navigation_reports_neighbours() {
        let author = UserId::new();
        let (a, b, c) = (BlogId::new(), BlogId::new(), BlogId::new());
        let existing = thread(author, "Series", vec![a, b, c]);

        let mut threads = MockThreadRepository::new();
        threads
            .expect_find_by_blog_id()
            .returning(move |_| Ok(Some(existing.clone())));

        let svc = service(threads, registry(vec![]), anonymous_users());
        let nav = svc.navigation_for_blog(b).await.unwrap().unwrap();
        assert_eq!(nav.current_index, 1);
        assert_eq!(nav.total, 3);
        assert_eq!(nav.previous_blog_id, Some(a));
        assert_eq!(nav.next_blog_id, Some(c));
    }
}
