use actix_web::{get, post, web, HttpResponse};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::data::database::Database;
use crate::data::messages::{Attachment, ChatMessage};
use crate::data::tickets::Ticket;
use crate::error::ApiError;
use crate::utils::auth::AuthUser;
use crate::utils::database::is_valid_id;
use crate::utils::enums::{ConversationType, Role};
use crate::utils::routes::text;

const USER_SUPPORT_ROLES: &[Role] = &[Role::User, Role::Support, Role::Admin, Role::SuperAdmin];
const SUPPORT_ADMIN_ROLES: &[Role] = &[Role::Support, Role::Admin, Role::SuperAdmin];
const ADMIN_SUPER_ADMIN_ROLES: &[Role] = &[Role::Admin, Role::SuperAdmin];

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct MessageRequest {
    message: Option<String>,
    attachments: Vec<Attachment>,
}

/// USER callers may only reach tickets they opened.
fn ticket_access(conn: &Connection, user: &AuthUser, ticket_id: &str) -> Result<Ticket, ApiError> {
    if !is_valid_id(ticket_id) {
        return Err(ApiError::bad_request("Invalid ticket id"));
    }
    let ticket = Ticket::get(conn, ticket_id)?.ok_or_else(|| ApiError::not_found("Ticket not found"))?;
    if user.role == Role::User && ticket.created_by != user.id {
        return Err(ApiError::forbidden("Not authorized for this ticket"));
    }
    Ok(ticket)
}

fn post_message(
    db: &Database,
    user: &AuthUser,
    conversation: ConversationType,
    ticket: Option<&str>,
    body: MessageRequest,
) -> Result<HttpResponse, ApiError> {
    let message = text(&body.message).ok_or_else(|| ApiError::bad_request("message is required"))?;
    let conn = db.lock();
    if let Some(ticket_id) = ticket {
        ticket_access(&conn, user, ticket_id)?;
    }
    let chat = ChatMessage::send(&conn, conversation, ticket, user, message, body.attachments)?;
    tracing::debug!(conversation = %conversation, from = %user.id, "Chat message stored");

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "data": chat
    })))
}

fn read_history(
    conn: &Connection,
    conversation: ConversationType,
    ticket: Option<&str>,
) -> Result<HttpResponse, ApiError> {
    let messages = ChatMessage::history(conn, conversation, ticket)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": messages.len(),
        "data": messages
    })))
}

#[post("/api/chats/user-support/{ticket_id}")]
pub async fn send_ticket_message(
    user: AuthUser,
    path: web::Path<String>,
    body: web::Json<MessageRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(USER_SUPPORT_ROLES)?;
    post_message(&db, &user, ConversationType::UserSupport, Some(&path), body.into_inner())
}

#[get("/api/chats/user-support/{ticket_id}")]
pub async fn ticket_messages(
    user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(USER_SUPPORT_ROLES)?;
    let conn = db.lock();
    let ticket = ticket_access(&conn, &user, &path)?;
    read_history(&conn, ConversationType::UserSupport, Some(&ticket.id))
}

#[post("/api/chats/support-admin")]
pub async fn send_support_admin_message(
    user: AuthUser,
    body: web::Json<MessageRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(SUPPORT_ADMIN_ROLES)?;
    post_message(&db, &user, ConversationType::SupportAdmin, None, body.into_inner())
}

#[get("/api/chats/support-admin")]
pub async fn support_admin_messages(user: AuthUser, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    user.authorize(SUPPORT_ADMIN_ROLES)?;
    read_history(&*db.lock(), ConversationType::SupportAdmin, None)
}

#[post("/api/chats/admin-super-admin")]
pub async fn send_admin_super_admin_message(
    user: AuthUser,
    body: web::Json<MessageRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(ADMIN_SUPER_ADMIN_ROLES)?;
    post_message(&db, &user, ConversationType::AdminSuperAdmin, None, body.into_inner())
}

#[get("/api/chats/admin-super-admin")]
pub async fn admin_super_admin_messages(
    user: AuthUser,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(ADMIN_SUPER_ADMIN_ROLES)?;
    read_history(&*db.lock(), ConversationType::AdminSuperAdmin, None)
}
