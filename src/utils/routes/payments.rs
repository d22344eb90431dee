use actix_web::{post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::Config;
use crate::data::activities::{self, RequestMeta};
use crate::data::database::Database;
use crate::data::users::User;
use crate::error::ApiError;
use crate::utils::encrypt::verify_webhook_signature;
use crate::utils::enums::{ActivityAction, ResourceType, Tier};

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";
const CAPTURED: &str = "payment.captured";

#[derive(Deserialize)]
struct WebhookEvent {
    event: Option<String>,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PaymentEntity {
    id: Option<String>,
    /// Paise.
    amount: f64,
    notes: Notes,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Notes {
    user_id: Option<String>,
}

impl WebhookEvent {
    /// `payload.payment.entity`, or `payload.entity` for older event shapes.
    fn payment(&self) -> Result<PaymentEntity, ApiError> {
        let entity = self
            .payload
            .pointer("/payment/entity")
            .or_else(|| self.payload.get("entity"))
            .cloned()
            .ok_or_else(|| ApiError::bad_request("Webhook payload has no payment entity"))?;
        serde_json::from_value(entity).map_err(|e| ApiError::bad_request(e.to_string()))
    }
}

fn acknowledged(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": message
    }))
}

/// Payment provider webhook. The signature covers the raw body, so it is read as bytes.
#[post("/api/payments/verify")]
pub async fn verify(
    req: HttpRequest,
    body: web::Bytes,
    db: web::Data<Database>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let secret = config
        .webhook_secret
        .as_deref()
        .ok_or_else(|| ApiError::Internal("Webhook secret not configured".to_string()))?;
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !verify_webhook_signature(secret, &body, signature) {
        tracing::warn!("Rejected webhook with a bad signature");
        return Err(ApiError::bad_request("Invalid webhook signature"));
    }

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(e.to_string()))?;
    if event.event.as_deref() != Some(CAPTURED) {
        return Ok(acknowledged("Event ignored"));
    }

    let payment = event.payment()?;
    let amount = payment.amount / 100.0;
    let Some(user_id) = payment.notes.user_id.as_deref() else {
        return Ok(acknowledged("No userId in notes"));
    };

    let conn = db.lock();
    let Some(mut user) = User::get_by_id(&conn, user_id)? else {
        return Ok(acknowledged("User not found"));
    };
    let Some(tier) = Tier::for_amount(amount) else {
        tracing::info!(user_id = %user.id, amount, "Payment below the cheapest tier");
        return Ok(acknowledged("Amount does not match a paid tier"));
    };
    user.apply_tier(&conn, tier)?;
    tracing::info!(user_id = %user.id, amount, tier = %tier, "Payment captured");

    let mut meta = RequestMeta::from_request(&req);
    meta.user_agent.get_or_insert_with(|| "Razorpay Webhook".to_string());
    activities::log(
        &conn,
        &user,
        ActivityAction::PaymentVerify,
        ResourceType::Payment,
        Some(&user.id),
        format!("Payment verified: ₹{amount}, tier updated to {tier}"),
        json!({"amount": amount, "tier": tier, "paymentId": payment.id}),
        &meta,
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Tier updated",
        "tier": user.tier
    })))
}
