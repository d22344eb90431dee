use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::data::activities::{self, RequestMeta};
use crate::data::companies::Company;
use crate::data::database::Database;
use crate::data::profiles::UserProfile;
use crate::data::students::Student;
use crate::data::users::{NewUser, User};
use crate::error::ApiError;
use crate::utils::auth::{sign_token, AuthUser};
use crate::utils::encrypt;
use crate::utils::enums::{ActivityAction, Qualification, Region, ResourceType, Role};
use crate::utils::routes::{looks_like_email, text};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    name: Option<String>,
    phone: Option<String>,
    state: Option<Region>,
    role: Option<Role>,
    email: Option<String>,
    password: Option<String>,
    company_name: Option<String>,
    qualification: Option<Qualification>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
    phone: Option<String>,
}

#[post("/api/auth/register")]
pub async fn register(
    req: HttpRequest,
    body: web::Json<RegisterRequest>,
    db: web::Data<Database>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let name = text(&body.name).ok_or_else(|| ApiError::bad_request("name is required"))?;
    let phone = text(&body.phone).ok_or_else(|| ApiError::bad_request("phone is required"))?;
    let role = body.role.unwrap_or(Role::User);
    let state = body.state.unwrap_or(Region::AndhraPradesh);
    let email = text(&body.email);
    let password = body.password.as_deref().filter(|p| !p.is_empty());
    let company_name = text(&body.company_name);

    if !matches!(role, Role::User | Role::Company) {
        return Err(ApiError::forbidden(format!("Role {role} cannot self-register")));
    }
    if let Some(email) = email {
        if !looks_like_email(email) {
            return Err(ApiError::bad_request("email must be a valid email"));
        }
    }
    if password.is_some_and(|p| p.chars().count() < MIN_PASSWORD_LEN) {
        return Err(ApiError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    if role == Role::Company {
        if company_name.is_none() {
            return Err(ApiError::bad_request("companyName is required"));
        }
        if email.is_none() {
            return Err(ApiError::bad_request("email is required"));
        }
        if password.is_none() {
            return Err(ApiError::bad_request("password is required"));
        }
    }

    let new_user = NewUser::new(
        name,
        email,
        password,
        phone,
        role,
        state,
        config.hash_secret.as_deref(),
    )?;

    let conn = db.lock();
    let user = new_user.dump(&conn)?;

    if role == Role::Company {
        if let Err(e) = Company::create_pending(&conn, &user, company_name) {
            tracing::warn!(user_id = %user.id, error = %e, "Company creation failed during registration");
        }
    }
    if let (Role::User, Some(email)) = (role, user.email.as_deref()) {
        if let Some(qualification) = body.qualification {
            if let Err(e) = Student::create(&conn, &user.name, email, &user.phone, qualification) {
                tracing::warn!(user_id = %user.id, error = %e, "Student creation failed during registration");
            }
        }
        if let Err(e) = UserProfile::upsert_for_user(&conn, &user.name, email, &user.phone) {
            tracing::warn!(user_id = %user.id, error = %e, "Profile creation failed during registration");
        }
    }

    let token = sign_token(&user.id, &config)?;
    activities::log(
        &conn,
        &user,
        ActivityAction::Register,
        ResourceType::Auth,
        Some(&user.id),
        format!("User registered: {} ({})", user.name, user.role),
        json!({"email": user.email, "phone": user.phone}),
        &RequestMeta::from_request(&req),
    );

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "token": token,
        "user": user.public_json()
    })))
}

#[post("/api/auth/login")]
pub async fn login(
    req: HttpRequest,
    body: web::Json<LoginRequest>,
    db: web::Data<Database>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let pepper = config.hash_secret.as_deref();
    let conn = db.lock();

    let (user, method) = match (text(&body.email), text(&body.phone)) {
        (Some(email), _) => {
            let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());
            let password = body
                .password
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ApiError::bad_request("password is required"))?;
            let user = User::get_by_email(&conn, email)?.ok_or_else(invalid)?;
            let hash = user.password.as_deref().ok_or_else(invalid)?;
            if !encrypt::verify_password(password, hash, pepper)? {
                return Err(invalid());
            }
            (user, "email")
        }
        (None, Some(phone)) => {
            let user = User::get_by_phone(&conn, phone)?
                .ok_or_else(|| ApiError::Unauthorized("Invalid phone number".to_string()))?;
            if let Some(hash) = user.password.as_deref() {
                let password = body.password.as_deref().unwrap_or_default();
                if !encrypt::verify_password(password, hash, pepper)? {
                    return Err(ApiError::Unauthorized("Invalid phone or password".to_string()));
                }
            }
            (user, "phone")
        }
        (None, None) => return Err(ApiError::bad_request("Provide email+password or phone")),
    };

    let token = sign_token(&user.id, &config)?;
    activities::log(
        &conn,
        &user,
        ActivityAction::Login,
        ResourceType::Auth,
        Some(&user.id),
        format!("User logged in: {} ({})", user.name, user.role),
        json!({"email": user.email, "phone": user.phone, "loginMethod": method}),
        &RequestMeta::from_request(&req),
    );
    tracing::info!(user_id = %user.id, method, "User logged in");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "token": token,
        "user": user.public_json()
    })))
}

#[get("/api/auth/me")]
pub async fn me(user: AuthUser) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": *user
    })))
}
