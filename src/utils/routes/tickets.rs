use actix_web::{get, patch, post, web, HttpRequest, HttpResponse};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::data::activities::{self, RequestMeta};
use crate::data::database::Database;
use crate::data::tickets::{Ticket, TicketView};
use crate::error::ApiError;
use crate::utils::auth::AuthUser;
use crate::utils::database::is_valid_id;
use crate::utils::enums::{ActivityAction, ResourceType, Role};
use crate::utils::routes::text;

#[derive(Deserialize)]
pub struct CreateTicketRequest {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CompleteTicketRequest {
    resolution_note: Option<String>,
}

fn find_ticket(conn: &Connection, id: &str) -> Result<Ticket, ApiError> {
    if !is_valid_id(id) {
        return Err(ApiError::bad_request("Invalid ticket id"));
    }
    Ticket::get(conn, id)?.ok_or_else(|| ApiError::not_found("Ticket not found"))
}

fn views(conn: &Connection, tickets: Vec<Ticket>) -> rusqlite::Result<Vec<TicketView>> {
    tickets.into_iter().map(|t| t.with_people(conn)).collect()
}

fn listing(data: Vec<TicketView>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "count": data.len(),
        "data": data
    }))
}

#[post("/api/tickets")]
pub async fn create(
    req: HttpRequest,
    user: AuthUser,
    body: web::Json<CreateTicketRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::User])?;
    let title = text(&body.title).ok_or_else(|| ApiError::bad_request("title is required"))?;

    let conn = db.lock();
    let ticket = Ticket::create(&conn, &user, title, body.description.as_deref())?;
    activities::log(
        &conn,
        &user,
        ActivityAction::TicketCreate,
        ResourceType::Ticket,
        Some(&ticket.id),
        format!("{} created ticket: {}", user.name, ticket.title),
        json!({"state": ticket.state, "status": ticket.status}),
        &RequestMeta::from_request(&req),
    );

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "data": ticket
    })))
}

/// USER sees their own tickets, SUPPORT the actionable queue.
#[get("/api/tickets")]
pub async fn list(user: AuthUser, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let conn = db.lock();
    let tickets = match user.role {
        Role::User => Ticket::created_by(&conn, &user.id)?,
        Role::Support => Ticket::actionable(&conn)?,
        role => {
            return Err(ApiError::forbidden(format!(
                "Role {role} is not allowed to view tickets"
            )))
        }
    };
    Ok(listing(views(&conn, tickets)?))
}

#[get("/api/tickets/support")]
pub async fn support_queue(user: AuthUser, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::Support])?;
    let conn = db.lock();
    let tickets = Ticket::actionable(&conn)?;
    Ok(listing(views(&conn, tickets)?))
}

#[get("/api/tickets/super-admin")]
pub async fn super_admin_list(user: AuthUser, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::SuperAdmin])?;
    let conn = db.lock();
    let tickets = Ticket::completed(&conn)?;
    Ok(listing(views(&conn, tickets)?))
}

#[patch("/api/tickets/{id}/assign")]
pub async fn assign(
    req: HttpRequest,
    user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::Support])?;
    let conn = db.lock();
    let mut ticket = find_ticket(&conn, &path)?;
    ticket.assign(&conn, &user.id)?;

    activities::log(
        &conn,
        &user,
        ActivityAction::TicketAssign,
        ResourceType::Ticket,
        Some(&ticket.id),
        format!("{} assigned ticket: {}", user.name, ticket.title),
        json!({"status": ticket.status, "assignedTo": ticket.assigned_to}),
        &RequestMeta::from_request(&req),
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": ticket
    })))
}

#[patch("/api/tickets/{id}/complete")]
pub async fn complete(
    req: HttpRequest,
    user: AuthUser,
    path: web::Path<String>,
    body: Option<web::Json<CompleteTicketRequest>>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::Support])?;
    let body = body.map(web::Json::into_inner).unwrap_or_default();

    let conn = db.lock();
    let mut ticket = find_ticket(&conn, &path)?;
    ticket.complete(&conn, &user.id, body.resolution_note.as_deref())?;
    tracing::info!(ticket_id = %ticket.id, agent = %user.id, "Ticket completed");

    activities::log(
        &conn,
        &user,
        ActivityAction::TicketComplete,
        ResourceType::Ticket,
        Some(&ticket.id),
        format!("{} completed ticket: {}", user.name, ticket.title),
        json!({
            "status": ticket.status,
            "createdBy": ticket.created_by,
            "resolutionNote": ticket.resolution_note
        }),
        &RequestMeta::from_request(&req),
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": ticket.with_people(&conn)?
    })))
}
