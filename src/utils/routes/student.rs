use actix_web::{delete, get, put, web, HttpResponse};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::data::database::Database;
use crate::data::jobs::JobPosting;
use crate::data::notifications::Notification;
use crate::data::students::Student;
use crate::error::ApiError;
use crate::utils::auth::AuthUser;
use crate::utils::enums::JobCategory;
use crate::utils::structures::{query_flag, Page, DEFAULT_LIMIT};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    is_read: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

#[derive(Deserialize)]
pub struct ListingQuery {
    category: Option<JobCategory>,
    page: Option<String>,
    limit: Option<String>,
}

/// The student record behind a USER account, matched by email.
pub(crate) fn student_for(conn: &Connection, user: &AuthUser) -> Result<Student, ApiError> {
    user.require_student()?;
    let email = user
        .email
        .as_deref()
        .ok_or_else(|| ApiError::not_found("Student profile not found"))?;
    Student::get_by_email(conn, email)?.ok_or_else(|| ApiError::not_found("Student profile not found"))
}

#[get("/api/student/notifications")]
pub async fn notifications(
    user: AuthUser,
    query: web::Query<NotificationQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::parse(query.page.as_deref(), query.limit.as_deref(), DEFAULT_LIMIT);
    let conn = db.lock();
    let student = student_for(&conn, &user)?;

    let rows = Notification::list_for_student(
        &conn,
        &student.id,
        query_flag(query.is_read.as_deref()),
        page.limit,
        page.offset(),
    )?;
    let mut inbox = Vec::with_capacity(rows.len());
    for notification in rows {
        let job = JobPosting::get_by_id(&conn, &notification.job_id)?.map(|job| {
            json!({
                "jobId": job.job_id,
                "jobTitle": job.job_title,
                "organization": job.organization,
                "jobCategory": job.job_category,
            })
        });
        let mut entry = serde_json::to_value(&notification)?;
        entry["job"] = job.unwrap_or(serde_json::Value::Null);
        inbox.push(entry);
    }
    let (total, unread) = Notification::counts(&conn, &student.id)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "notifications": inbox,
        "total": total,
        "unreadCount": unread,
        "currentPage": page.page,
        "totalPages": page.pages(total)
    })))
}

#[put("/api/student/notifications/{notification_id}/read")]
pub async fn mark_read(
    user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let conn = db.lock();
    let student = student_for(&conn, &user)?;
    let notification = Notification::mark_read(&conn, &student.id, &path)?
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "notification": {
            "notificationId": notification.notification_id,
            "isRead": notification.is_read,
            "readAt": notification.read_at,
        }
    })))
}

#[delete("/api/student/notifications/{notification_id}")]
pub async fn delete_notification(
    user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let conn = db.lock();
    let student = student_for(&conn, &user)?;
    if !Notification::delete_own(&conn, &student.id, &path)? {
        return Err(ApiError::not_found("Notification not found"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Notification deleted"
    })))
}

#[get("/api/student/job-listings")]
pub async fn job_listings(
    user: AuthUser,
    query: web::Query<ListingQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::parse(query.page.as_deref(), query.limit.as_deref(), DEFAULT_LIMIT);
    let conn = db.lock();
    let student = student_for(&conn, &user)?;

    let (total, jobs) = JobPosting::list_for_qualification(
        &conn,
        student.qualification,
        query.category,
        page.limit,
        page.offset(),
    )?;
    let jobs = jobs
        .iter()
        .map(JobPosting::public_json)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "jobs": jobs,
        "total": total,
        "currentPage": page.page,
        "totalPages": page.pages(total)
    })))
}
