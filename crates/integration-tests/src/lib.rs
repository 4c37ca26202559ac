//! Shared fixtures: an in-memory world with real JWTs and the full router.

use std::sync::Arc;

use chrono::Utc;
use secrecy::SecretString;

#[cfg(feature = "web-axum")]
use api_adapters::AppState;
use auth_adapters::JwtAuthProvider;
use domains::{BlogId, BlogRecord, BlogStatus, UserId, UserSummary};
use services::ThreadService;
use storage_adapters::InMemoryStore;

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct World {
    pub store: Arc<InMemoryStore>,
    pub auth: Arc<JwtAuthProvider>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            auth: Arc::new(JwtAuthProvider::new(
                &SecretString::from(TEST_SECRET.to_string()),
                3600,
            )),
        }
    }

    pub fn service(&self) -> ThreadService {
        ThreadService::new(self.store.clone(), self.store.clone(), self.store.clone())
    }

    #[cfg(feature = "web-axum")]
    pub fn router(&self) -> axum::Router {
        api_adapters::router(
            AppState::new(self.service(), self.auth.clone()),
            &["*".to_string()],
        )
    }

    pub fn user(&self, username: &str) -> UserId {
        let id = UserId::new();
        self.store.put_user(UserSummary {
            id,
            username: username.to_string(),
            first_name: username.to_string(),
            last_name: "Tester".to_string(),
            avatar: None,
        });
        id
    }

    pub fn blog(&self, author_id: UserId, title: &str) -> BlogId {
        let id = BlogId::new();
        self.store.put_blog(BlogRecord {
            id,
            author_id,
            title: title.to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
            excerpt: format!("About {title}"),
            cover_image: None,
            status: BlogStatus::Published,
            created_at: Utc::now(),
        });
        id
    }

    pub fn token(&self, user: UserId) -> String {
        self.auth
            .sign(user)
            .expect("signing with a static secret cannot fail")
    }
}
