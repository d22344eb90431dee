use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::data::activities::{Activity, ActivityFilter};
use crate::data::database::Database;
use crate::error::ApiError;
use crate::utils::auth::AuthUser;
use crate::utils::database::{is_valid_id, parse_datetime, timestamp};
use crate::utils::enums::{ActivityAction, ResourceType, Role};
use crate::utils::routes::text;
use crate::utils::structures::{Page, PageQuery};

const ACTIVITY_LIMIT: i64 = 50;
const MAX_ACTIVITY_LIMIT: i64 = 200;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    role: Option<Role>,
    action: Option<ActivityAction>,
    resource_type: Option<ResourceType>,
    start_date: Option<String>,
    end_date: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

/// Normalises a `startDate`/`endDate` query value to the stored timestamp format.
fn date_bound(raw: &Option<String>, name: &str) -> Result<Option<String>, ApiError> {
    match text(raw) {
        None => Ok(None),
        Some(raw) => parse_datetime(raw)
            .map(|at| Some(timestamp(at)))
            .ok_or_else(|| ApiError::bad_request(format!("{name} must be a valid date"))),
    }
}

fn page_of(page: Option<&str>, limit: Option<&str>) -> Page {
    Page::parse_with_max(page, limit, ACTIVITY_LIMIT, MAX_ACTIVITY_LIMIT)
}

fn paged(page: Page, total: i64, data: Vec<Activity>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "count": data.len(),
        "total": total,
        "page": page.page,
        "pages": page.pages(total),
        "data": data
    }))
}

#[get("/api/activities/dashboard")]
pub async fn dashboard(
    user: AuthUser,
    query: web::Query<DashboardQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::SuperAdmin])?;
    let page = page_of(query.page.as_deref(), query.limit.as_deref());
    let filter = ActivityFilter {
        role: query.role,
        action: query.action,
        resource_type: query.resource_type,
        start: date_bound(&query.start_date, "startDate")?,
        end: date_bound(&query.end_date, "endDate")?,
    };

    let conn = db.lock();
    let (total, data) = Activity::dashboard(&conn, &filter, page.limit, page.offset())?;
    Ok(paged(page, total, data))
}

#[get("/api/activities/stats")]
pub async fn stats(
    user: AuthUser,
    query: web::Query<RangeQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::SuperAdmin])?;
    let start = date_bound(&query.start_date, "startDate")?;
    let end = date_bound(&query.end_date, "endDate")?;

    let conn = db.lock();
    let summary = Activity::stats(&conn, start.as_deref(), end.as_deref())?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "stats": summary
    })))
}

#[get("/api/activities/user/{user_id}")]
pub async fn user_activities(
    user: AuthUser,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::SuperAdmin])?;
    if !is_valid_id(&path) {
        return Err(ApiError::bad_request("Invalid userId"));
    }
    let page = page_of(query.page.as_deref(), query.limit.as_deref());

    let conn = db.lock();
    let (total, data) = Activity::for_user(&conn, &path, page.limit, page.offset())?;
    Ok(paged(page, total, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_bounds_are_normalised() {
        let start = date_bound(&Some("2026-01-05".into()), "startDate").unwrap().unwrap();
        assert!(start.starts_with("2026-01-05T00:00:00"));
        assert_eq!(date_bound(&Some("  ".into()), "startDate").unwrap(), None);
        assert!(date_bound(&Some("last week".into()), "endDate").is_err());
    }

    #[test]
    fn default_page_size_is_fifty() {
        assert_eq!(page_of(None, None).limit, 50);
        assert_eq!(page_of(Some("2"), Some("1000")).limit, 200);
    }
}
