use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::data::database::Database;
use crate::data::users::User;
use crate::error::ApiError;
use crate::utils::auth::AuthUser;
use crate::utils::enums::Role;
use crate::utils::routes::text;
use crate::utils::structures::{Page, DEFAULT_LIMIT};

#[derive(Deserialize)]
pub struct PeopleQuery {
    q: Option<String>,
    role: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

/// Only USER and COMPANY narrow the search; any other value is ignored.
fn role_filter(raw: Option<&str>) -> Option<Role> {
    match raw?.parse::<Role>().ok()? {
        role @ (Role::User | Role::Company) => Some(role),
        _ => None,
    }
}

#[get("/api/search/people")]
pub async fn people(
    _user: AuthUser,
    query: web::Query<PeopleQuery>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let q = text(&query.q).ok_or_else(|| ApiError::bad_request("Query parameter \"q\" is required"))?;
    let page = Page::parse(query.page.as_deref(), query.limit.as_deref(), DEFAULT_LIMIT);
    let role = role_filter(query.role.as_deref());

    let conn = db.lock();
    let (total, users) = User::search(&conn, q, role, page.limit, page.offset())?;
    let data: Vec<_> = users
        .iter()
        .map(|u| {
            json!({
                "id": u.id,
                "name": u.name,
                "email": u.email,
                "role": u.role,
                "state": u.state,
                "profileImage": u.profile_image,
                "plan": u.plan,
                "hasPaidPlan": u.has_paid_plan,
                "isPaid": u.is_paid,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "page": page.page,
        "pages": page.pages(total),
        "count": data.len(),
        "total": total,
        "data": data
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_public_roles_filter() {
        assert_eq!(role_filter(Some("COMPANY")), Some(Role::Company));
        assert_eq!(role_filter(Some("USER")), Some(Role::User));
        assert_eq!(role_filter(Some("ADMIN")), None);
        assert_eq!(role_filter(Some("whatever")), None);
        assert_eq!(role_filter(None), None);
    }
}
