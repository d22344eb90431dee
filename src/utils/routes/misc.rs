use std::path::Path;

use actix_web::{get, web, HttpResponse};
use chrono::Utc;

use crate::config::Config;
use crate::error::ApiError;

#[get("/health_check")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "status": "healthy",
        "timestamp": Utc::now().timestamp()
    }))
}

#[get("/get_server_time")]
pub async fn get_server_time() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "timestamp": Utc::now().timestamp()
    }))
}

fn content_type(filename: &str) -> &'static str {
    match Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Stored names are flat `uuid.ext`; anything that could leave the upload dir is refused.
fn is_safe_name(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && !filename.contains(['/', '\\'])
        && !filename.contains("..")
}

#[get("/uploads/{filename}")]
pub async fn serve_file(
    filename: web::Path<String>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    if !is_safe_name(&filename) {
        return Err(ApiError::not_found("File not found"));
    }
    let filepath = config.upload_dir.join(filename.as_str());

    match std::fs::read(&filepath) {
        Ok(file_content) => Ok(HttpResponse::Ok()
            .content_type(content_type(&filename))
            .body(file_content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ApiError::not_found("File not found")),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_is_refused() {
        assert!(is_safe_name("3f1c.pdf"));
        assert!(!is_safe_name("../campus.db"));
        assert!(!is_safe_name("a/b.pdf"));
        assert!(!is_safe_name(".env"));
        assert!(!is_safe_name(""));
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(content_type("x.PDF"), "application/pdf");
        assert_eq!(content_type("x.jpeg"), "image/jpeg");
        assert_eq!(content_type("x.bin"), "application/octet-stream");
    }
}
