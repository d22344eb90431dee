use actix_web::{get, patch, post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::data::activities::{self, RequestMeta};
use crate::data::applications::JobApplication;
use crate::data::database::Database;
use crate::data::jobs::JobPosting;
use crate::error::ApiError;
use crate::utils::auth::AuthUser;
use crate::utils::enums::{ActivityAction, ApplicationStatus, ResourceType};
use crate::utils::routes::student::student_for;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplyRequest {
    resume: Option<String>,
    cover_letter: Option<String>,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    status: Option<ApplicationStatus>,
    notes: Option<String>,
}

#[post("/api/student/jobs/{job_id}/apply")]
pub async fn apply(
    req: HttpRequest,
    user: AuthUser,
    path: web::Path<String>,
    body: Option<web::Json<ApplyRequest>>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let conn = db.lock();
    let mut student = student_for(&conn, &user)?;
    let job = JobPosting::get_by_job_id(&conn, &path)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    if !job.is_open() {
        return Err(ApiError::bad_request("This job is no longer accepting applications"));
    }

    let application = JobApplication::create(
        &conn,
        &job.id,
        &student.id,
        body.resume.as_deref(),
        body.cover_letter.as_deref(),
    )?;
    student.record_application(&conn, &job.id)?;

    activities::log(
        &conn,
        &user,
        ActivityAction::JobApply,
        ResourceType::Job,
        Some(&job.id),
        format!("{} applied for {}", user.name, job.job_title),
        json!({"jobId": job.job_id, "applicationId": application.id}),
        &RequestMeta::from_request(&req),
    );

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Application submitted",
        "application": application
    })))
}

#[get("/api/student/applications")]
pub async fn my_applications(user: AuthUser, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let conn = db.lock();
    let student = student_for(&conn, &user)?;

    let mut applications = Vec::new();
    for application in JobApplication::list_for_student(&conn, &student.id)? {
        let job = JobPosting::get_by_id(&conn, &application.job_id)?.map(|job| {
            json!({
                "jobId": job.job_id,
                "jobTitle": job.job_title,
                "organization": job.organization,
                "jobCategory": job.job_category,
                "status": job.status,
            })
        });
        let mut entry = serde_json::to_value(&application)?;
        entry["job"] = job.unwrap_or(serde_json::Value::Null);
        applications.push(entry);
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": applications.len(),
        "applications": applications
    })))
}

#[patch("/api/admin/applications/{id}/status")]
pub async fn review_application(
    req: HttpRequest,
    admin: AuthUser,
    path: web::Path<String>,
    body: web::Json<ReviewRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    admin.require_admin()?;
    let status = body
        .status
        .ok_or_else(|| ApiError::bad_request("status is required"))?;

    let conn = db.lock();
    let mut application = JobApplication::get(&conn, &path)?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;
    let from = application.status;
    application.review(&conn, status, body.notes.as_deref())?;
    tracing::info!(application_id = %application.id, %from, to = %status, "Application reviewed");

    activities::log(
        &conn,
        &admin,
        ActivityAction::ApplicationReview,
        ResourceType::Job,
        Some(&application.job_id),
        format!("{} moved an application from {from} to {status}", admin.name),
        json!({"applicationId": application.id, "from": from, "to": status}),
        &RequestMeta::from_request(&req),
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "application": application
    })))
}
