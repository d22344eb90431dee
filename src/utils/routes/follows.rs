use actix_web::{get, post, web, HttpRequest, HttpResponse};
use rusqlite::Connection;
use serde_json::{json, Value};

use crate::data::activities::{self, RequestMeta};
use crate::data::companies::Company;
use crate::data::database::Database;
use crate::data::follows;
use crate::data::posts::Post;
use crate::data::profiles::UserProfile;
use crate::data::users::User;
use crate::error::ApiError;
use crate::utils::auth::AuthUser;
use crate::utils::database::is_valid_id;
use crate::utils::enums::{ActivityAction, ResourceType, Role};
use crate::utils::structures::{Page, PageQuery};

fn checked_id<'a>(raw: &'a str, name: &str) -> Result<&'a str, ApiError> {
    if is_valid_id(raw) {
        Ok(raw)
    } else {
        Err(ApiError::bad_request(format!("Invalid {name}")))
    }
}

fn find_user(conn: &Connection, id: &str) -> Result<User, ApiError> {
    User::get_by_id(conn, checked_id(id, "userId")?)?.ok_or_else(|| ApiError::not_found("User not found"))
}

#[post("/api/follows/{target_user_id}")]
pub async fn toggle(
    req: HttpRequest,
    user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let target_id = checked_id(&path, "targetUserId")?;
    if target_id == user.id {
        return Err(ApiError::bad_request("You cannot follow yourself"));
    }

    let conn = db.lock();
    let target = User::get_by_id(&conn, target_id)?.ok_or_else(|| ApiError::not_found("Target user not found"))?;
    let now_following = follows::toggle(&conn, &user.id, &target.id)?;
    let followers_count = follows::followers_count(&conn, &target.id)?;
    let my_following_count = follows::following_count(&conn, &user.id)?;

    let (action, description) = if now_following {
        (ActivityAction::Follow, "User followed another user")
    } else {
        (ActivityAction::Unfollow, "User unfollowed another user")
    };
    activities::log(
        &conn,
        &user,
        action,
        ResourceType::User,
        Some(&target.id),
        description,
        json!({"targetRole": target.role}),
        &RequestMeta::from_request(&req),
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "following": now_following,
        "target": {
            "id": target.id,
            "name": target.name,
            "role": target.role,
            "profileImage": target.profile_image,
        },
        "followersCount": followers_count,
        "myFollowingCount": my_following_count
    })))
}

#[get("/api/follows/{target_user_id}/status")]
pub async fn status(
    user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let target_id = checked_id(&path, "targetUserId")?;
    let conn = db.lock();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "following": follows::is_following(&conn, &user.id, target_id)?
    })))
}

#[get("/api/follows/{user_id}/followers")]
pub async fn followers(
    _user: AuthUser,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let user_id = checked_id(&path, "userId")?;
    let page = Page::from_query(&query);
    let conn = db.lock();
    let (total, data) = follows::followers(&conn, user_id, page.limit, page.offset())?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "page": page.page,
        "pages": page.pages(total),
        "count": data.len(),
        "total": total,
        "data": data
    })))
}

#[get("/api/follows/{user_id}/following")]
pub async fn following(
    _user: AuthUser,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let user_id = checked_id(&path, "userId")?;
    let page = Page::from_query(&query);
    let conn = db.lock();
    let (total, data) = follows::following(&conn, user_id, page.limit, page.offset())?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "page": page.page,
        "pages": page.pages(total),
        "count": data.len(),
        "total": total,
        "data": data
    })))
}

/// Public counters, no token needed.
#[get("/api/users/{user_id}/stats")]
pub async fn stats(path: web::Path<String>, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let conn = db.lock();
    let user = find_user(&conn, &path)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "id": user.id,
            "name": user.name,
            "role": user.role,
            "profileImage": user.profile_image,
            "followersCount": follows::followers_count(&conn, &user.id)?,
            "followingCount": follows::following_count(&conn, &user.id)?,
            "postsCount": Post::count_by_author(&conn, &user.id)?,
        }
    })))
}

#[get("/api/users/{user_id}/profile")]
pub async fn profile(
    viewer: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let conn = db.lock();
    let user = find_user(&conn, &path)?;

    let details = if user.role == Role::Company {
        Company::get_by_user(&conn, &user.id)?.map(|c| c.details_json())
    } else {
        match user.email.as_deref() {
            Some(email) => UserProfile::get_by_email(&conn, email)?.map(|p| p.public_details()),
            None => None,
        }
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "id": user.id,
            "name": user.name,
            "email": user.email,
            "role": user.role,
            "state": user.state,
            "profileImage": user.profile_image,
            "followersCount": follows::followers_count(&conn, &user.id)?,
            "followingCount": follows::following_count(&conn, &user.id)?,
            "postsCount": Post::count_by_author(&conn, &user.id)?,
            "isFollowing": follows::is_following(&conn, &viewer.id, &user.id)?,
            "plan": user.plan,
            "hasPaidPlan": user.has_paid_plan,
            "isPaid": user.is_paid,
            "details": details.unwrap_or(Value::Null),
        }
    })))
}
