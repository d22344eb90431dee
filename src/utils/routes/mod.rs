use actix_web::{error, web, HttpRequest, HttpResponse};

use crate::error::ApiError;

pub mod accounts;
pub mod activities;
pub mod applications;
pub mod companies;
pub mod documents;
pub mod follows;
pub mod jobs;
pub mod messages;
pub mod misc;
pub mod payments;
pub mod posts;
pub mod predict;
pub mod profiles;
pub mod search;
pub mod student;
pub mod tickets;

/// Registers every route plus the extractor error handlers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::bad_request(json_error_message(&err)).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::bad_request(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ApiError::bad_request(err.to_string()).into()),
    )
    // misc
    .service(misc::health_check)
    .service(misc::get_server_time)
    .service(misc::serve_file)
    // accounts
    .service(accounts::register)
    .service(accounts::login)
    .service(accounts::me)
    // admin jobs
    .service(jobs::check_matching)
    .service(jobs::create_job)
    .service(jobs::list_jobs)
    .service(jobs::job_applications)
    .service(jobs::get_job)
    .service(jobs::update_job)
    .service(jobs::delete_job)
    .service(applications::review_application)
    // student area
    .service(student::notifications)
    .service(student::mark_read)
    .service(student::delete_notification)
    .service(student::job_listings)
    .service(applications::apply)
    .service(applications::my_applications)
    // documents
    .service(documents::upload)
    .service(documents::pending)
    .service(documents::approve)
    .service(documents::reject)
    .service(documents::list)
    // tickets
    .service(tickets::create)
    .service(tickets::list)
    .service(tickets::support_queue)
    .service(tickets::super_admin_list)
    .service(tickets::assign)
    .service(tickets::complete)
    // chats
    .service(messages::ticket_messages)
    .service(messages::send_ticket_message)
    .service(messages::support_admin_messages)
    .service(messages::send_support_admin_message)
    .service(messages::admin_super_admin_messages)
    .service(messages::send_admin_super_admin_message)
    // companies
    .service(companies::search)
    .service(companies::my_company)
    .service(companies::update_my_company)
    .service(companies::verify)
    // posts
    .service(posts::feed)
    .service(posts::create)
    .service(posts::user_posts)
    .service(posts::update)
    .service(posts::delete)
    .service(posts::likes)
    .service(posts::toggle_like)
    .service(posts::toggle_save)
    .service(posts::add_comment)
    .service(posts::comments)
    .service(posts::share)
    .service(posts::shares)
    // follows
    .service(follows::toggle)
    .service(follows::status)
    .service(follows::followers)
    .service(follows::following)
    .service(follows::stats)
    .service(follows::profile)
    // search, predictor, payments
    .service(search::people)
    .service(predict::predict)
    .service(payments::verify)
    // user profiles
    .service(profiles::create)
    .service(profiles::list)
    .service(profiles::get)
    .service(profiles::update)
    .service(profiles::delete)
    // activities
    .service(activities::dashboard)
    .service(activities::stats)
    .service(activities::user_activities)
    .default_service(web::to(not_found));
}

fn json_error_message(err: &error::JsonPayloadError) -> String {
    match err {
        error::JsonPayloadError::Deserialize(e) => e.to_string(),
        error::JsonPayloadError::ContentType => "Expected a JSON body".to_string(),
        other => other.to_string(),
    }
}

async fn not_found(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    Err(ApiError::not_found(format!("Not Found - {}", req.path())))
}

/// Trimmed, non-empty text or `None`.
pub(crate) fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Minimal `local@domain.tld` check.
pub(crate) fn looks_like_email(raw: &str) -> bool {
    match raw.trim().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && domain.contains('.')
                && !domain.ends_with('.')
                && !raw.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(looks_like_email("hr@ashatech.in"));
        assert!(!looks_like_email("hr@ashatech"));
        assert!(!looks_like_email("@ashatech.in"));
        assert!(!looks_like_email("h r@ashatech.in"));
    }

    #[test]
    fn blank_text_is_none() {
        assert_eq!(text(&Some("  ".into())), None);
        assert_eq!(text(&Some(" x ".into())), Some("x"));
    }
}
