//! Thread endpoints under `/api/threads`.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use domains::{BlogId, NewThread, PageRequest, ThreadId, ThreadPatch, UserId};
use services::{ThreadList, ThreadNavigation, ThreadView};

use crate::{
    error::{ApiResponse, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery, AuthUser},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBlogBody {
    pub blog_id: BlogId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderBody {
    pub blog_ids: Vec<BlogId>,
}

type Reply<T> = ApiResult<Json<ApiResponse<T>>>;

/// Public listing: published, public threads, newest first.
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Reply<ThreadList> {
    let list = state.threads.get_all(page).await?;
    Ok(ApiResponse::ok(list))
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(input): ApiJson<NewThread>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ThreadView>>)> {
    let view = state.threads.create(user, input).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(view)))
}

pub async fn mine(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Reply<ThreadList> {
    Ok(ApiResponse::ok(state.threads.get_my_threads(user, page).await?))
}

pub async fn by_author(
    State(state): State<AppState>,
    ApiPath(author_id): ApiPath<UserId>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Reply<ThreadList> {
    Ok(ApiResponse::ok(state.threads.get_by_author(author_id, page).await?))
}

/// Navigation for a blog page; `data` is `null` when the blog is in no thread.
pub async fn for_blog(
    State(state): State<AppState>,
    ApiPath(blog_id): ApiPath<BlogId>,
) -> Reply<Option<ThreadNavigation>> {
    let navigation = state.threads.navigation_for_blog(blog_id).await?;
    if navigation.is_none() {
        debug!(blog = %blog_id, "blog is not part of any thread");
    }
    Ok(ApiResponse::ok(navigation))
}

pub async fn show(
    State(state): State<AppState>,
    ApiPath(thread_id): ApiPath<ThreadId>,
) -> Reply<ThreadView> {
    Ok(ApiResponse::ok(state.threads.get_by_id(thread_id, true).await?))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(thread_id): ApiPath<ThreadId>,
    ApiJson(patch): ApiJson<ThreadPatch>,
) -> Reply<ThreadView> {
    Ok(ApiResponse::ok(state.threads.update(thread_id, user, patch).await?))
}

pub async fn destroy(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(thread_id): ApiPath<ThreadId>,
) -> ApiResult<Json<Value>> {
    state.threads.delete(thread_id, user).await?;
    Ok(Json(json!({ "success": true, "message": "Thread deleted successfully" })))
}

pub async fn add_blog(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(thread_id): ApiPath<ThreadId>,
    ApiJson(body): ApiJson<AddBlogBody>,
) -> Reply<ThreadView> {
    Ok(ApiResponse::ok(state.threads.add_blog(thread_id, user, body.blog_id).await?))
}

pub async fn remove_blog(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath((thread_id, blog_id)): ApiPath<(ThreadId, BlogId)>,
) -> Reply<ThreadView> {
    Ok(ApiResponse::ok(state.threads.remove_blog(thread_id, user, blog_id).await?))
}

pub async fn reorder(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(thread_id): ApiPath<ThreadId>,
    ApiJson(body): ApiJson<ReorderBody>,
) -> Reply<ThreadView> {
    Ok(ApiResponse::ok(state.threads.reorder_blogs(thread_id, user, body.blog_ids).await?))
}
