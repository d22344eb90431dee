use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::data::activities::{self, RequestMeta};
use crate::data::companies::{Company, CompanySearch};
use crate::data::database::Database;
use crate::data::users::User;
use crate::error::ApiError;
use crate::utils::auth::AuthUser;
use crate::utils::enums::{ActivityAction, ResourceType, Role, VerificationStatus};
use crate::utils::routes::text;
use crate::utils::structures::{Page, DEFAULT_LIMIT};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    q: Option<String>,
    industry: Option<String>,
    location: Option<String>,
    verification_status: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    verification_status: Option<String>,
    reason: Option<String>,
}

#[get("/api/companies/search")]
pub async fn search(
    user: AuthUser,
    query: web::Query<SearchQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::Admin, Role::SuperAdmin])?;
    let page = Page::parse(query.page.as_deref(), query.limit.as_deref(), DEFAULT_LIMIT);
    let verification_status = match text(&query.verification_status) {
        Some(raw) => Some(VerificationStatus::parse_insensitive(raw).ok_or_else(|| {
            ApiError::bad_request("verificationStatus must be one of PENDING, VERIFIED, REJECTED")
        })?),
        None => None,
    };
    let filter = CompanySearch {
        q: text(&query.q).map(str::to_string),
        industry: text(&query.industry).map(str::to_string),
        location: text(&query.location).map(str::to_string),
        verification_status,
    };

    let conn = db.lock();
    let (total, companies) = Company::search(&conn, &filter, page.limit, page.offset())?;
    let data: Vec<_> = companies.iter().map(Company::summary_json).collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "page": page.page,
        "pages": page.pages(total),
        "count": data.len(),
        "total": total,
        "data": data
    })))
}

#[get("/api/companies/me")]
pub async fn my_company(user: AuthUser, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::Company])?;
    let conn = db.lock();
    let company = Company::get_or_create(&conn, &user)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": company.to_json()
    })))
}

#[put("/api/companies/me")]
pub async fn update_my_company(
    user: AuthUser,
    body: web::Json<Map<String, Value>>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::Company])?;
    let conn = db.lock();
    let mut company = Company::get_or_create(&conn, &user)?;
    let was_verified = company.apply_owner_update(body.into_inner())?;
    company.save(&conn)?;

    if let Some(photo) = company.recruiter_photo() {
        User::set_profile_image(&conn, &user.id, &photo)?;
    }
    if was_verified {
        tracing::info!(company_id = %company.id, "Verified company edited, back to pending");
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": if was_verified {
            "Profile updated. Verification set to pending for re-approval."
        } else {
            "Profile updated successfully."
        },
        "data": company.to_json()
    })))
}

#[post("/api/companies/{company_id}/verify")]
pub async fn verify(
    req: HttpRequest,
    user: AuthUser,
    path: web::Path<String>,
    body: web::Json<VerifyRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::SuperAdmin])?;
    let raw = text(&body.verification_status)
        .ok_or_else(|| ApiError::bad_request("verificationStatus is required"))?;
    let status = VerificationStatus::parse_insensitive(raw).ok_or_else(|| {
        ApiError::bad_request("verificationStatus must be one of PENDING, VERIFIED, REJECTED")
    })?;
    let reason = text(&body.reason);

    let conn = db.lock();
    let mut company = Company::get(&conn, &path)?.ok_or_else(|| ApiError::not_found("Company not found"))?;
    company.set_verification(status, &user.id, reason);
    company.save(&conn)?;

    activities::log(
        &conn,
        &user,
        ActivityAction::CompanyVerify,
        ResourceType::Company,
        Some(&company.id),
        format!(
            "{} set {} to {status}",
            user.name,
            company.company_name.as_deref().unwrap_or("company")
        ),
        json!({"verificationStatus": status, "reason": reason}),
        &RequestMeta::from_request(&req),
    );

    let message = match status {
        VerificationStatus::Verified => "Company approved successfully",
        VerificationStatus::Rejected => "Company rejected",
        VerificationStatus::Pending => "Company set to pending",
    };
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": company.to_json(),
        "message": message,
        "reason": reason
    })))
}
