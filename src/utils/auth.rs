use actix_web::dev::Payload;
use actix_web::http::header::Header;
use actix_web::{web, FromRequest, HttpRequest};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use futures_util::future::{ready, Ready};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::Config;
use crate::data::database::Database;
use crate::data::users::User;
use crate::error::ApiError;
use crate::utils::enums::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub iat: i64,
    pub exp: i64,
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Internal(format!("invalid JWT secret: {e}")))
}

pub fn sign_token(user_id: &str, config: &Config) -> Result<String, ApiError> {
    let issued = chrono::Utc::now();
    let claims = Claims {
        id: user_id.to_string(),
        iat: issued.timestamp(),
        exp: (issued + chrono::Duration::days(config.jwt_expire_days)).timestamp(),
    };
    claims
        .sign_with_key(&signing_key(&config.jwt_secret)?)
        .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
}

/// Returns the user id carried by a valid, unexpired token.
pub fn verify_token(token: &str, secret: &str) -> Result<String, ApiError> {
    let claims: Claims = token
        .verify_with_key(&signing_key(secret)?)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            ApiError::unauthorized()
        })?;

    if claims.exp <= chrono::Utc::now().timestamp() {
        return Err(ApiError::unauthorized());
    }
    Ok(claims.id)
}

/// The caller behind `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl std::ops::Deref for AuthUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

impl AuthUser {
    /// 403 unless the caller has one of `roles`.
    pub fn authorize(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "Role {} is not authorized",
                self.role
            )))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Access denied. Admin privileges required"))
        }
    }

    pub fn require_student(&self) -> Result<(), ApiError> {
        if self.role == Role::User {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "Access denied. Student privileges required",
            ))
        }
    }

    fn from_request_sync(req: &HttpRequest) -> Result<AuthUser, ApiError> {
        let header = Authorization::<Bearer>::parse(req).map_err(|_| ApiError::unauthorized())?;
        let token = header.into_scheme().token().to_string();

        let config = req
            .app_data::<web::Data<Config>>()
            .ok_or_else(|| ApiError::Internal("Config is not registered".to_string()))?;
        let db = req
            .app_data::<web::Data<Database>>()
            .ok_or_else(|| ApiError::Internal("Database is not registered".to_string()))?;

        let user_id = verify_token(&token, &config.jwt_secret)?;
        let conn = db.lock();
        match User::get_by_id(&conn, &user_id)? {
            Some(user) => Ok(AuthUser(user)),
            None => Err(ApiError::Unauthorized("User not found".to_string())),
        }
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<AuthUser, ApiError>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(AuthUser::from_request_sync(req))
    }
}
