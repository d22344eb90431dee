use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::data::activities::{self, RequestMeta};
use crate::data::applications::JobApplication;
use crate::data::database::Database;
use crate::data::jobs::{JobInput, JobPosting, JobUpdate};
use crate::data::notifications::notify_students_for_job;
use crate::data::students::Student;
use crate::error::ApiError;
use crate::utils::auth::AuthUser;
use crate::utils::enums::{ActivityAction, JobCategory, JobStatus, Qualification, ResourceType};
use crate::utils::structures::{Page, DEFAULT_LIMIT};

#[derive(Deserialize)]
pub struct JobListQuery {
    category: Option<JobCategory>,
    status: Option<JobStatus>,
    page: Option<String>,
    limit: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingRequest {
    target_qualifications: Option<Vec<Qualification>>,
}

fn find_job(conn: &rusqlite::Connection, job_id: &str) -> Result<JobPosting, ApiError> {
    JobPosting::get_by_job_id(conn, job_id)?.ok_or_else(|| ApiError::not_found("Job not found"))
}

#[post("/api/admin/jobs/check-matching")]
pub async fn check_matching(
    admin: AuthUser,
    body: web::Json<MatchingRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    admin.require_admin()?;
    let targets = body
        .target_qualifications
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("targetQualifications array is required"))?;

    let conn = db.lock();
    let matching = Student::count_matching(&conn, targets)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "matchingCount": matching,
        "message": format!("This job will notify {matching} students")
    })))
}

#[post("/api/admin/jobs")]
pub async fn create_job(
    req: HttpRequest,
    admin: AuthUser,
    body: web::Json<JobInput>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    admin.require_admin()?;
    let mut job = JobPosting::from_input(body.into_inner(), &admin.id)?;

    let mut conn = db.lock();
    job.insert(&conn)?;
    tracing::info!(job_id = %job.job_id, category = %job.job_category, "Job posted");

    // The posting stands even when the fan-out fails.
    let notified = match notify_students_for_job(&mut conn, &mut job) {
        Ok(outcome) => outcome.notified,
        Err(e) => {
            tracing::error!(job_id = %job.job_id, error = %e, "Error notifying students");
            0
        }
    };

    activities::log(
        &conn,
        &admin,
        ActivityAction::JobCreate,
        ResourceType::Job,
        Some(&job.id),
        format!("{} posted {}", admin.name, job.job_title),
        json!({"jobId": job.job_id, "notified": notified}),
        &RequestMeta::from_request(&req),
    );

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": format!("Job posted successfully! Notified {notified} students via dashboard"),
        "jobId": job.job_id,
        "totalNotified": notified,
        "job": job
    })))
}

#[get("/api/admin/jobs")]
pub async fn list_jobs(
    admin: AuthUser,
    query: web::Query<JobListQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    admin.require_admin()?;
    let page = Page::parse(query.page.as_deref(), query.limit.as_deref(), DEFAULT_LIMIT);

    let conn = db.lock();
    let (total, jobs) = JobPosting::list(&conn, query.category, query.status, page.limit, page.offset())?;
    let jobs: Vec<_> = jobs
        .iter()
        .map(|job| {
            json!({
                "jobId": job.job_id,
                "jobTitle": job.job_title,
                "organization": job.organization,
                "jobCategory": job.job_category,
                "totalNotified": job.notification_tracking.total_students_matched,
                "status": job.status,
                "createdAt": job.created_at,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "jobs": jobs,
        "totalJobs": total,
        "currentPage": page.page,
        "totalPages": page.pages(total)
    })))
}

#[get("/api/admin/jobs/{job_id}/applications")]
pub async fn job_applications(
    admin: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    admin.require_admin()?;
    let conn = db.lock();
    let job = find_job(&conn, &path)?;

    let mut applications = Vec::new();
    for application in JobApplication::list_for_job(&conn, &job.id)? {
        let student = Student::get_by_id(&conn, &application.student_id)?.map(|s| {
            json!({
                "id": s.id,
                "studentId": s.student_id,
                "name": s.name,
                "email": s.email,
                "phone": s.phone,
                "qualification": s.qualification,
            })
        });
        let mut entry = serde_json::to_value(&application)?;
        entry["student"] = student.unwrap_or(serde_json::Value::Null);
        applications.push(entry);
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "jobId": job.job_id,
        "count": applications.len(),
        "applications": applications
    })))
}

#[get("/api/admin/jobs/{job_id}")]
pub async fn get_job(
    admin: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    admin.require_admin()?;
    let conn = db.lock();
    let job = find_job(&conn, &path)?;
    let tracking = &job.notification_tracking;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "notificationStatus": {
            "totalSent": tracking.notification_sent_to.len(),
            "sentDate": tracking.notification_sent_date,
            "totalMatched": tracking.total_students_matched,
        },
        "job": job
    })))
}

#[put("/api/admin/jobs/{job_id}")]
pub async fn update_job(
    admin: AuthUser,
    path: web::Path<String>,
    body: web::Json<JobUpdate>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    admin.require_admin()?;
    let conn = db.lock();
    let mut job = find_job(&conn, &path)?;
    job.apply_update(body.into_inner())?;
    job.save(&conn)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Job updated successfully",
        "job": job
    })))
}

#[delete("/api/admin/jobs/{job_id}")]
pub async fn delete_job(
    admin: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    admin.require_admin()?;
    let conn = db.lock();
    let mut job = find_job(&conn, &path)?;
    job.status = JobStatus::Closed;
    job.updated_at = crate::utils::database::now();
    job.save(&conn)?;
    tracing::info!(job_id = %job.job_id, "Job closed");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Job deleted successfully"
    })))
}
