use actix_multipart::Multipart;
use actix_web::{get, patch, post, web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use serde_json::json;

use crate::config::Config;
use crate::data::activities::{self, RequestMeta};
use crate::data::database::Database;
use crate::data::documents::{Document, PendingDocument};
use crate::data::users::User;
use crate::error::ApiError;
use crate::utils::auth::AuthUser;
use crate::utils::enums::{ActivityAction, DocStatus, DocType, Region, ResourceType, Role};

pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "doc", "docx"];
const MAX_TEXT_FIELD: usize = 64 * 1024;

/// The upload form after it has been read off the wire.
#[derive(Default)]
struct UploadForm {
    title: Option<String>,
    doc_type: Option<String>,
    state: Option<String>,
    file_url: Option<String>,
    file: Option<(String, Vec<u8>)>,
}

/// Lower-cased extension if it is one we accept.
fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn field_text(data: &[u8]) -> String {
    String::from_utf8_lossy(data).trim().to_string()
}

async fn read_form(mut payload: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| ApiError::bad_request(e.to_string()))?;
        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let limit = if name == "file" { MAX_FILE_SIZE } else { MAX_TEXT_FIELD };
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::bad_request(e.to_string()))?;
            if data.len() + chunk.len() > limit {
                return Err(if name == "file" {
                    ApiError::bad_request("File too large. Maximum size is 10MB")
                } else {
                    ApiError::bad_request(format!("Field {name} is too large"))
                });
            }
            data.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "file" => {
                let filename = filename.unwrap_or_default();
                if allowed_extension(&filename).is_none() {
                    return Err(ApiError::bad_request(
                        "Invalid file type. Allowed: pdf, jpg, png, doc, docx",
                    ));
                }
                if !data.is_empty() {
                    form.file = Some((filename, data));
                }
            }
            "title" => form.title = Some(field_text(&data)),
            "docType" => form.doc_type = Some(field_text(&data)),
            "state" => form.state = Some(field_text(&data)),
            "fileUrl" => form.file_url = Some(field_text(&data)).filter(|v| !v.is_empty()),
            _ => tracing::debug!(field = %name, "Ignoring unknown upload field"),
        }
    }
    Ok(form)
}

fn parse_field<T: std::str::FromStr<Err = String>>(raw: Option<&str>, name: &str) -> Result<T, ApiError> {
    let raw = raw
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{name} is required")))?;
    raw.parse().map_err(ApiError::bad_request)
}

/// Writes the file under a fresh name and returns its public URL.
fn store_file(config: &Config, filename: &str, data: &[u8]) -> Result<String, ApiError> {
    let ext = allowed_extension(filename)
        .ok_or_else(|| ApiError::bad_request("Invalid file type. Allowed: pdf, jpg, png, doc, docx"))?;
    std::fs::create_dir_all(&config.upload_dir)?;
    let stored = format!("{}.{}", uuid::Uuid::new_v4(), ext);
    std::fs::write(config.upload_dir.join(&stored), data)?;
    tracing::info!(file = %stored, bytes = data.len(), "Stored uploaded document");
    Ok(format!(
        "{}/uploads/{}",
        config.public_base_url.trim_end_matches('/'),
        stored
    ))
}

#[post("/api/docs/upload")]
pub async fn upload(
    req: HttpRequest,
    user: AuthUser,
    payload: Multipart,
    db: web::Data<Database>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::SuperAdmin, Role::Admin, Role::Support])?;
    let form = read_form(payload).await?;

    let title = form
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("title is required"))?;
    let doc_type: DocType = parse_field(form.doc_type.as_deref(), "docType")?;
    let state: Region = parse_field(form.state.as_deref(), "state")?;

    let file_url = match (&form.file_url, &form.file) {
        (Some(url), _) => {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ApiError::bad_request("fileUrl must be a valid uri"));
            }
            url.clone()
        }
        (None, Some((filename, data))) => store_file(&config, filename, data)?,
        (None, None) => {
            return Err(ApiError::bad_request("Provide either a file upload or fileUrl"))
        }
    };

    let conn = db.lock();
    let doc = Document::create(&conn, title, &file_url, doc_type, state, &user.id)?;
    activities::log(
        &conn,
        &user,
        ActivityAction::DocumentUpload,
        ResourceType::Document,
        Some(&doc.id),
        format!("{} uploaded document: {}", user.name, doc.title),
        json!({"docType": doc.doc_type, "state": doc.state, "status": doc.status}),
        &RequestMeta::from_request(&req),
    );

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "data": doc
    })))
}

#[get("/api/docs/pending")]
pub async fn pending(user: AuthUser, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::SuperAdmin])?;
    let conn = db.lock();

    let mut docs = Vec::new();
    for document in Document::pending(&conn)? {
        let uploader = User::summary_by_id(&conn, &document.uploaded_by)?.map(Into::into);
        docs.push(PendingDocument { document, uploader });
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": docs.len(),
        "data": docs
    })))
}

fn decide(
    req: HttpRequest,
    user: AuthUser,
    id: &str,
    status: DocStatus,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    user.authorize(&[Role::SuperAdmin])?;
    let conn = db.lock();
    let mut doc = Document::get(&conn, id)?.ok_or_else(|| ApiError::not_found("Document not found"))?;
    doc.decide(&conn, status, &user.id)?;

    let (action, verb) = match status {
        DocStatus::Approved => (ActivityAction::DocumentApprove, "approved"),
        _ => (ActivityAction::DocumentReject, "rejected"),
    };
    activities::log(
        &conn,
        &user,
        action,
        ResourceType::Document,
        Some(&doc.id),
        format!("{} {verb} document: {}", user.name, doc.title),
        json!({"docType": doc.doc_type, "state": doc.state, "uploadedBy": doc.uploaded_by}),
        &RequestMeta::from_request(&req),
    );
    tracing::info!(document_id = %doc.id, status = %doc.status, "Document decided");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": doc
    })))
}

#[patch("/api/docs/{id}/approve")]
pub async fn approve(
    req: HttpRequest,
    user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    decide(req, user, &path, DocStatus::Approved, db)
}

#[patch("/api/docs/{id}/reject")]
pub async fn reject(
    req: HttpRequest,
    user: AuthUser,
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    decide(req, user, &path, DocStatus::Rejected, db)
}

#[get("/api/docs/list")]
pub async fn list(req: HttpRequest, user: AuthUser, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let conn = db.lock();
    let docs: Vec<_> = Document::approved_for_state(&conn, user.state)?
        .iter()
        .map(Document::listing_json)
        .collect();

    activities::log(
        &conn,
        &user,
        ActivityAction::DocumentView,
        ResourceType::Document,
        None,
        format!("{} viewed approved documents", user.name),
        json!({"state": user.state, "count": docs.len()}),
        &RequestMeta::from_request(&req),
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": docs.len(),
        "data": docs
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_filter() {
        assert_eq!(allowed_extension("hall-ticket.PDF").as_deref(), Some("pdf"));
        assert_eq!(allowed_extension("result.docx").as_deref(), Some("docx"));
        assert!(allowed_extension("script.exe").is_none());
        assert!(allowed_extension("noext").is_none());
    }
}
