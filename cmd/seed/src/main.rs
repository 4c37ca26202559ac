//! Fills the configured SQLite database with demo users and blogs, then
//! prints a bearer token per user for trying the API by hand.

use anyhow::Context;
use chrono::{Duration, Utc};
use fake::faker::internet::en::Username;
use fake::faker::lorem::en::{Sentence, Words};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use tracing::info;

use auth_adapters::JwtAuthProvider;
use configs::Settings;
use domains::{BlogId, BlogRecord, BlogStatus, UserId, UserSummary};
use storage_adapters::SqliteStore;

const USERS: usize = 2;
const BLOGS_PER_USER: usize = 4;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().compact().init();

    let settings = Settings::load().context("loading settings")?;
    let store = SqliteStore::connect(&settings.database.url, settings.database.max_connections)
        .await
        .with_context(|| format!("opening {}", settings.database.url))?;
    let auth = JwtAuthProvider::new(&settings.auth.jwt_secret, settings.auth.token_ttl_secs);

    for _ in 0..USERS {
        let user = UserSummary {
            id: UserId::new(),
            username: Username().fake(),
            first_name: FirstName().fake(),
            last_name: LastName().fake(),
            avatar: None,
        };
        store.upsert_user(&user).await?;
        println!("user {} ({})", user.id, user.username);

        for n in 0..BLOGS_PER_USER {
            let title: String = Sentence(3..7).fake();
            let title = title.trim_end_matches('.').to_string();
            let words: Vec<String> = Words(12..24).fake();
            let id = BlogId::new();
            let blog = BlogRecord {
                id,
                author_id: user.id,
                slug: format!("{}-{}", slugify(&title), &id.to_string()[..8]),
                title,
                excerpt: words.join(" "),
                cover_image: None,
                status: BlogStatus::Published,
                created_at: Utc::now() - Duration::days((BLOGS_PER_USER - n) as i64),
            };
            store.upsert_blog(&blog).await?;
            println!("  blog {}  {}", blog.id, blog.title);
        }

        let token = auth.sign(user.id)?;
        println!("  Authorization: Bearer {token}");
    }

    info!(users = USERS, blogs = USERS * BLOGS_PER_USER, "seed complete");
    Ok(())
}

fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
