use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::data::activities::{self, RequestMeta};
use crate::data::database::Database;
use crate::data::posts::{validate_content, Comment, LinkPreview, Post, PostView, MAX_TEXT_LEN};
use crate::data::users::User;
use crate::error::ApiError;
use crate::utils::auth::AuthUser;
use crate::utils::database::{is_valid_id, timestamp};
use crate::utils::enums::{ActivityAction, ResourceType, Role};
use crate::utils::routes::text;
use crate::utils::structures::{Page, PageQuery, DEFAULT_LIMIT};

const AUTHORS: &[Role] = &[Role::Company, Role::User];

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PostRequest {
    text: Option<String>,
    link_preview: Option<LinkPreview>,
}

#[derive(Deserialize)]
pub struct FeedQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CommentRequest {
    body: Option<String>,
}

fn find_post(conn: &Connection, id: &str) -> Result<Post, ApiError> {
    if !is_valid_id(id) {
        return Err(ApiError::bad_request("Invalid postId"));
    }
    Post::get(conn, id)?.ok_or_else(|| ApiError::not_found("Post not found"))
}

fn views(conn: &Connection, posts: &[Post], viewer: &str) -> rusqlite::Result<Vec<PostView>> {
    posts.iter().map(|p| p.view(conn, Some(viewer))).collect()
}

fn paged(page: Page, total: i64, data: Vec<PostView>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "page": page.page,
        "pages": page.pages(total),
        "count": data.len(),
        "total": total,
        "data": data
    }))
}

fn log_post(conn: &Connection, user: &AuthUser, req: &HttpRequest, action: ActivityAction, post_id: &str, description: &str) {
    activities::log(
        conn,
        user,
        action,
        ResourceType::Post,
        Some(post_id),
        description,
        json!({}),
        &RequestMeta::from_request(req),
    );
}

#[post("/api/posts")]
pub async fn create(
    req: HttpRequest,
    user: AuthUser,
    body: web::Json<PostRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(AUTHORS)?;
    let body = body.into_inner();
    let (text, preview) = validate_content(body.text.as_deref(), body.link_preview)?;

    let conn = db.lock();
    let post = Post::create(&conn, &user.id, text, preview, None)?;
    activities::log(
        &conn,
        &user,
        ActivityAction::PostCreate,
        ResourceType::Post,
        Some(&post.id),
        "User created a post",
        json!({"hasLinkPreview": post.link_preview.is_some()}),
        &RequestMeta::from_request(&req),
    );

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "data": post.view(&conn, Some(&user.id))?
    })))
}

/// `type=daily` narrows the feed to the last 24 hours.
#[get("/api/posts/feed")]
pub async fn feed(
    user: AuthUser,
    query: web::Query<FeedQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::parse(query.page.as_deref(), query.limit.as_deref(), DEFAULT_LIMIT);
    let since = (query.kind.as_deref() == Some("daily"))
        .then(|| timestamp(chrono::Utc::now() - chrono::Duration::hours(24)));

    let conn = db.lock();
    let (total, posts) = Post::feed(&conn, since.as_deref(), page.limit, page.offset())?;
    Ok(paged(page, total, views(&conn, &posts, &user.id)?))
}

#[get("/api/posts/user/{user_id}")]
pub async fn user_posts(
    user: AuthUser,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::from_query(&query);
    let conn = db.lock();
    let (total, posts) = Post::by_author(&conn, &path, page.limit, page.offset())?;
    Ok(paged(page, total, views(&conn, &posts, &user.id)?))
}

/// Fields left out of the body keep their current value.
#[put("/api/posts/{post_id}")]
pub async fn update(
    req: HttpRequest,
    user: AuthUser,
    path: web::Path<String>,
    body: web::Json<PostRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(AUTHORS)?;
    let body = body.into_inner();

    let conn = db.lock();
    let mut post = find_post(&conn, &path)?;
    post.ensure_author(&user.id)?;

    let text = body.text.or_else(|| post.text.clone());
    let preview = body.link_preview.or_else(|| post.link_preview.clone());
    let (text, preview) = validate_content(text.as_deref(), preview)?;
    post.update_content(&conn, text, preview)?;
    log_post(&conn, &user, &req, ActivityAction::PostUpdate, &post.id, "User updated a post");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": post.view(&conn, Some(&user.id))?
    })))
}

#[delete("/api/posts/{post_id}")]
pub async fn delete(
    req: HttpRequest,
    user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(AUTHORS)?;
    let mut conn = db.lock();
    let post = find_post(&conn, &path)?;
    post.ensure_author(&user.id)?;

    let id = post.id.clone();
    post.delete(&mut conn)?;
    log_post(&conn, &user, &req, ActivityAction::PostDelete, &id, "User deleted a post");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Post deleted"
    })))
}

#[get("/api/posts/{post_id}/likes")]
pub async fn likes(
    _user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let conn = db.lock();
    let post = find_post(&conn, &path)?;
    let data = User::summaries(&conn, &post.likes)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": data.len(),
        "data": data
    })))
}

#[post("/api/posts/{post_id}/like")]
pub async fn toggle_like(
    req: HttpRequest,
    user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::User])?;
    let conn = db.lock();
    let mut post = find_post(&conn, &path)?;
    let liked = post.toggle_like(&conn, &user.id)?;

    let (action, description) = if liked {
        (ActivityAction::PostLike, "User liked a post")
    } else {
        (ActivityAction::PostUnlike, "User unliked a post")
    };
    log_post(&conn, &user, &req, action, &post.id, description);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "liked": liked,
        "likesCount": post.likes.len()
    })))
}

#[post("/api/posts/{post_id}/save")]
pub async fn toggle_save(
    req: HttpRequest,
    user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::User])?;
    let conn = db.lock();
    let mut post = find_post(&conn, &path)?;
    let saved = post.toggle_save(&conn, &user.id)?;

    let (action, description) = if saved {
        (ActivityAction::PostSave, "User saved a post")
    } else {
        (ActivityAction::PostUnsave, "User unsaved a post")
    };
    log_post(&conn, &user, &req, action, &post.id, description);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "saved": saved,
        "savesCount": post.saves.len()
    })))
}

#[post("/api/posts/{post_id}/comments")]
pub async fn add_comment(
    req: HttpRequest,
    user: AuthUser,
    path: web::Path<String>,
    body: web::Json<CommentRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::User])?;
    if !is_valid_id(&path) {
        return Err(ApiError::bad_request("Invalid postId"));
    }
    let text = text(&body.body).ok_or_else(|| ApiError::bad_request("Comment body is required"))?;

    let mut conn = db.lock();
    let mut post = find_post(&conn, &path)?;
    let comment = post.add_comment(&mut conn, &user.id, text)?;
    log_post(&conn, &user, &req, ActivityAction::PostComment, &post.id, "User commented on a post");

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "data": comment
    })))
}

#[get("/api/posts/{post_id}/comments")]
pub async fn comments(
    _user: AuthUser,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    if !is_valid_id(&path) {
        return Err(ApiError::bad_request("Invalid postId"));
    }
    let page = Page::from_query(&query);
    let conn = db.lock();
    let (total, data) = Comment::for_post(&conn, &path, page.limit, page.offset())?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "page": page.page,
        "pages": page.pages(total),
        "count": data.len(),
        "total": total,
        "data": data
    })))
}

#[post("/api/posts/{post_id}/share")]
pub async fn share(
    req: HttpRequest,
    user: AuthUser,
    path: web::Path<String>,
    body: Option<web::Json<PostRequest>>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::User])?;
    if !is_valid_id(&path) {
        return Err(ApiError::bad_request("Invalid postId"));
    }
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let text = text(&body.text).map(str::to_string);
    if text.as_ref().is_some_and(|t| t.chars().count() > MAX_TEXT_LEN) {
        return Err(ApiError::bad_request(format!(
            "Post text cannot exceed {MAX_TEXT_LEN} characters"
        )));
    }
    let preview = body.link_preview.and_then(LinkPreview::cleaned);

    let mut conn = db.lock();
    let mut original = Post::get(&conn, &path)?.ok_or_else(|| ApiError::not_found("Original post not found"))?;
    let shared = original.share(&mut conn, &user.id, text, preview)?;
    log_post(&conn, &user, &req, ActivityAction::PostShare, &original.id, "User shared a post");

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "data": shared.view(&conn, Some(&user.id))?
    })))
}

#[get("/api/posts/{post_id}/shares")]
pub async fn shares(
    user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(AUTHORS)?;
    let conn = db.lock();
    let post = find_post(&conn, &path)?;

    let mut data = Vec::with_capacity(post.shares.len());
    for entry in &post.shares {
        data.push(json!({
            "user": User::summary_by_id(&conn, &entry.user)?,
            "sharedPost": entry.shared_post,
            "createdAt": entry.created_at,
        }));
    }
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": data.len(),
        "data": data
    })))
}
