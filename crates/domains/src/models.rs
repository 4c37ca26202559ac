//! # Domain Models
//!
//! These structs represent the entities the thread subsystem reads and writes.
//! We use UUID v7 for time-ordered, globally unique identification.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sequence::BlogSequence;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

id_type!(
    /// Identifies a thread (an ordered series of posts).
    ThreadId
);
id_type!(
    /// Identifies a blog post owned by the blog registry.
    BlogId
);
id_type!(
    /// Identifies a user account.
    UserId
);

/// User-facing publication flag of a thread. A plain field, not a state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    #[default]
    Draft,
    Published,
}

impl ThreadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadStatus::Draft => "draft",
            ThreadStatus::Published => "published",
        }
    }
}

impl FromStr for ThreadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ThreadStatus::Draft),
            "published" => Ok(ThreadStatus::Published),
            other => Err(format!("unknown thread status {other:?}")),
        }
    }
}

/// An ordered, author-owned series of blog posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: ThreadId,
    pub title: String,
    pub description: Option<String>,
    /// Immutable after creation
    pub author_id: UserId,
    /// Reading order; no duplicates
    pub blog_ids: BlogSequence,
    pub status: ThreadStatus,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.author_id == user
    }

    /// Listed in the public index only when published and visible.
    pub fn is_listed(&self) -> bool {
        self.status == ThreadStatus::Published && self.is_public
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl BlogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlogStatus::Draft => "draft",
            BlogStatus::Published => "published",
            BlogStatus::Archived => "archived",
        }
    }
}

impl FromStr for BlogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(BlogStatus::Draft),
            "published" => Ok(BlogStatus::Published),
            "archived" => Ok(BlogStatus::Archived),
            other => Err(format!("unknown blog status {other:?}")),
        }
    }
}

/// Read-only view of a blog post as exposed by the blog registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogRecord {
    pub id: BlogId,
    pub author_id: UserId,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub cover_image: Option<String>,
    pub status: BlogStatus,
    pub created_at: DateTime<Utc>,
}

/// Public profile fields attached to thread responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
}

/// Input for creating a thread.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewThread {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Caller-supplied order is preserved verbatim
    #[serde(default)]
    pub blog_ids: Vec<BlogId>,
    #[serde(default)]
    pub status: Option<ThreadStatus>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

/// Partial update. `blog_ids`, when present, replaces the whole membership.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub blog_ids: Option<Vec<BlogId>>,
    #[serde(default)]
    pub status: Option<ThreadStatus>,
    #[serde(default)]
    pub is_public: Option<bool>,
}
