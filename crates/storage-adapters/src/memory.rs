//! # In-memory store
//!
//! Implements every storage port in process memory. Threads and the
//! blog-to-thread index sit behind one lock so the uniqueness check and the
//! write happen together; blogs and users are plain concurrent maps.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use domains::{
    BlogId, BlogRecord, BlogRegistry, DomainError, DomainResult, PageRequest, Thread, ThreadId,
    ThreadRepository, UserDirectory, UserId, UserSummary,
};

#[derive(Default)]
struct ThreadTable {
    rows: HashMap<ThreadId, Thread>,
    /// blog id -> the one thread that holds it
    membership: HashMap<BlogId, ThreadId>,
}

impl ThreadTable {
    fn ensure_unclaimed(&self, thread: &Thread) -> DomainResult<()> {
        for blog_id in &thread.blog_ids {
            match self.membership.get(blog_id) {
                Some(holder) if *holder != thread.id => {
                    return Err(DomainError::Conflict(format!(
                        "blog {blog_id} is already held by thread {holder}"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn claim(&mut self, thread: &Thread) {
        for blog_id in &thread.blog_ids {
            self.membership.insert(*blog_id, thread.id);
        }
    }

    fn release(&mut self, thread: &Thread) {
        for blog_id in &thread.blog_ids {
            if self.membership.get(blog_id) == Some(&thread.id) {
                self.membership.remove(blog_id);
            }
        }
    }

    fn page_of<'a>(
        &'a self,
        filter: impl Fn(&Thread) -> bool,
        page: PageRequest,
    ) -> (Vec<Thread>, u64) {
        let mut matching: Vec<&'a Thread> = self.rows.values().filter(|&t| filter(t)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        (items, total)
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    threads: RwLock<ThreadTable>,
    blogs: DashMap<BlogId, BlogRecord>,
    users: DashMap<UserId, UserSummary>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_blog(&self, blog: BlogRecord) {
        self.blogs.insert(blog.id, blog);
    }

    pub fn remove_blog(&self, id: BlogId) -> Option<BlogRecord> {
        self.blogs.remove(&id).map(|(_, blog)| blog)
    }

    pub fn put_user(&self, user: UserSummary) {
        self.users.insert(user.id, user);
    }

    fn read(&self) -> DomainResult<RwLockReadGuard<'_, ThreadTable>> {
        self.threads
            .read()
            .map_err(|_| DomainError::Internal("thread table lock poisoned".into()))
    }

    fn write(&self) -> DomainResult<RwLockWriteGuard<'_, ThreadTable>> {
        self.threads
            .write()
            .map_err(|_| DomainError::Internal("thread table lock poisoned".into()))
    }
}

#[async_trait]
impl ThreadRepository for InMemoryStore {
    async fn insert(&self, mut thread: Thread) -> DomainResult<Thread> {
        let mut table = self.write()?;
        if table.rows.contains_key(&thread.id) {
            return Err(DomainError::Conflict(format!(
                "thread {} already exists",
                thread.id
            )));
        }
        table.ensure_unclaimed(&thread)?;

        let now = Utc::now();
        thread.created_at = now;
        thread.updated_at = now;
        table.claim(&thread);
        table.rows.insert(thread.id, thread.clone());
        debug!(thread = %thread.id, "inserted thread");
        Ok(thread)
    }

    async fn find_by_id(&self, id: ThreadId) -> DomainResult<Option<Thread>> {
        Ok(self.read()?.rows.get(&id).cloned())
    }

    async fn find_by_blog_id(&self, blog_id: BlogId) -> DomainResult<Option<Thread>> {
        let table = self.read()?;
        Ok(table
            .membership
            .get(&blog_id)
            .and_then(|thread_id| table.rows.get(thread_id))
            .cloned())
    }

    async fn list_public(&self, page: PageRequest) -> DomainResult<(Vec<Thread>, u64)> {
        Ok(self.read()?.page_of(Thread::is_listed, page))
    }

    async fn list_by_author(
        &self,
        author_id: UserId,
        page: PageRequest,
    ) -> DomainResult<(Vec<Thread>, u64)> {
        Ok(self.read()?.page_of(|t| t.author_id == author_id, page))
    }

    async fn save(&self, mut thread: Thread) -> DomainResult<Thread> {
        let mut table = self.write()?;
        let previous = table
            .rows
            .get(&thread.id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Thread", thread.id))?;
        table.ensure_unclaimed(&thread)?;

        thread.author_id = previous.author_id;
        thread.created_at = previous.created_at;
        thread.updated_at = Utc::now();
        table.release(&previous);
        table.claim(&thread);
        table.rows.insert(thread.id, thread.clone());
        Ok(thread)
    }

    async fn delete(&self, id: ThreadId) -> DomainResult<bool> {
        let mut table = self.write()?;
        match table.rows.remove(&id) {
            Some(thread) => {
                table.release(&thread);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl BlogRegistry for InMemoryStore {
    async fn find_blog(&self, id: BlogId) -> DomainResult<Option<BlogRecord>> {
        Ok(self.blogs.get(&id).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_user(&self, id: UserId) -> DomainResult<Option<UserSummary>> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{BlogSequence, ErrorKind, ThreadStatus};

    fn thread(author_id: UserId, blog_ids: Vec<BlogId>) -> Thread {
        Thread {
            id: ThreadId::new(),
            title: "t".into(),
            description: None,
            author_id,
            blog_ids: BlogSequence::new(blog_ids).unwrap(),
            status: ThreadStatus::Published,
            is_public: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_rejects_blog_held_elsewhere() {
        let store = InMemoryStore::new();
        let author = UserId::new();
        let blog = BlogId::new();

        store.insert(thread(author, vec![blog])).await.unwrap();
        let err = store.insert(thread(author, vec![blog])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn save_moves_membership_and_delete_releases_it() {
        let store = InMemoryStore::new();
        let author = UserId::new();
        let (a, b) = (BlogId::new(), BlogId::new());

        let mut t = store.insert(thread(author, vec![a])).await.unwrap();
        t.blog_ids = BlogSequence::new(vec![b]).unwrap();
        let t = store.save(t).await.unwrap();

        assert!(store.find_by_blog_id(a).await.unwrap().is_none());
        assert_eq!(store.find_by_blog_id(b).await.unwrap().unwrap().id, t.id);

        assert!(store.delete(t.id).await.unwrap());
        assert!(store.find_by_blog_id(b).await.unwrap().is_none());
        assert!(!store.delete(t.id).await.unwrap());

        // b is free again
        store.insert(thread(author, vec![b])).await.unwrap();
    }

    #[tokio::test]
    async fn list_public_skips_drafts_and_private() {
        let store = InMemoryStore::new();
        let author = UserId::new();
        let mut draft = thread(author, vec![]);
        draft.status = ThreadStatus::Draft;
        let mut hidden = thread(author, vec![]);
        hidden.is_public = false;
        store.insert(draft).await.unwrap();
        store.insert(hidden).await.unwrap();
        let listed = store.insert(thread(author, vec![])).await.unwrap();

        let (items, total) = store.list_public(PageRequest::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].id, listed.id);

        let (_, mine) = store
            .list_by_author(author, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(mine, 3);
    }
}
