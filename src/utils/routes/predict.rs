use actix_web::{post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::data::activities::{self, RequestMeta};
use crate::data::colleges::College;
use crate::data::database::Database;
use crate::error::ApiError;
use crate::utils::auth::AuthUser;
use crate::utils::enums::{ActivityAction, RankCategory, Region, ResourceType};
use crate::utils::routes::text;

#[derive(Deserialize)]
pub struct PredictRequest {
    rank: Option<i64>,
    category: Option<RankCategory>,
    state: Option<Region>,
    district: Option<String>,
}

#[post("/api/predict")]
pub async fn predict(
    req: HttpRequest,
    user: AuthUser,
    body: web::Json<PredictRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let rank = body.rank.ok_or_else(|| ApiError::bad_request("rank is required"))?;
    if rank < 1 {
        return Err(ApiError::bad_request("rank must be greater than or equal to 1"));
    }
    let category = body
        .category
        .ok_or_else(|| ApiError::bad_request("category is required"))?;
    let state = body.state.ok_or_else(|| ApiError::bad_request("state is required"))?;
    let district = text(&body.district);

    let conn = db.lock();
    let colleges = College::predict(&conn, rank, category, state, district)?;
    activities::log(
        &conn,
        &user,
        ActivityAction::CollegePredict,
        ResourceType::Predictor,
        None,
        format!("{} predicted colleges", user.name),
        json!({
            "rank": rank,
            "category": category,
            "state": state,
            "district": district,
            "resultCount": colleges.len()
        }),
        &RequestMeta::from_request(&req),
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": colleges.len(),
        "data": colleges
    })))
}
