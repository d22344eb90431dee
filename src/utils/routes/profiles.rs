use actix_web::{delete, get, patch, post, web, HttpResponse};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::data::database::Database;
use crate::data::profiles::UserProfile;
use crate::error::ApiError;
use crate::utils::auth::AuthUser;
use crate::utils::database::is_valid_id;
use crate::utils::routes::text;

#[derive(Deserialize)]
pub struct ProfileQuery {
    email: Option<String>,
}

fn find_profile(conn: &Connection, id: &str) -> Result<UserProfile, ApiError> {
    if !is_valid_id(id) {
        return Err(ApiError::bad_request("Invalid id"));
    }
    UserProfile::get(conn, id)?.ok_or_else(|| ApiError::not_found("User profile not found"))
}

#[post("/api/user-profiles")]
pub async fn create(
    _user: AuthUser,
    body: web::Json<Value>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let conn = db.lock();
    let profile = UserProfile::create(&conn, &body)?;
    tracing::info!(profile_id = %profile.id, "User profile created");
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "data": profile.to_json()
    })))
}

/// `?email=` returns that single profile instead of the list.
#[get("/api/user-profiles")]
pub async fn list(
    _user: AuthUser,
    query: web::Query<ProfileQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let conn = db.lock();
    if let Some(email) = text(&query.email) {
        let profile = UserProfile::get_by_email(&conn, email)?
            .ok_or_else(|| ApiError::not_found("User profile not found"))?;
        return Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": profile.to_json()
        })));
    }

    let profiles: Vec<_> = UserProfile::list(&conn)?.iter().map(UserProfile::to_json).collect();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": profiles.len(),
        "data": profiles
    })))
}

#[get("/api/user-profiles/{id}")]
pub async fn get(
    _user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let conn = db.lock();
    let profile = find_profile(&conn, &path)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": profile.to_json()
    })))
}

#[patch("/api/user-profiles/{id}")]
pub async fn update(
    _user: AuthUser,
    path: web::Path<String>,
    body: web::Json<Value>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let conn = db.lock();
    let mut profile = find_profile(&conn, &path)?;
    profile.update(&conn, &body)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": profile.to_json()
    })))
}

#[delete("/api/user-profiles/{id}")]
pub async fn delete(
    _user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    if !is_valid_id(&path) {
        return Err(ApiError::bad_request("Invalid id"));
    }
    let conn = db.lock();
    if !UserProfile::delete(&conn, &path)? {
        return Err(ApiError::not_found("User profile not found"));
    }
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User profile deleted successfully"
    })))
}
