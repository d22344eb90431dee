use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::data::users::UserSummary;
use crate::error::ApiError;
use crate::utils::database::{new_id, now};
use crate::utils::enums::{DocStatus, DocType, Region};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub file_url: String,
    pub doc_type: DocType,
    pub state: Region,
    pub status: DocStatus,
    pub uploaded_by: String,
    pub approved_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Pending queue entry with the uploader's name and phone.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDocument {
    #[serde(flatten)]
    pub document: Document,
    pub uploader: Option<Uploader>,
}

#[derive(Debug, Serialize)]
pub struct Uploader {
    pub id: String,
    pub name: String,
    pub phone: String,
}

impl From<UserSummary> for Uploader {
    fn from(user: UserSummary) -> Self {
        Uploader {
            id: user.id,
            name: user.name,
            phone: user.phone,
        }
    }
}

impl Document {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
        Ok(Document {
            id: row.get("id")?,
            title: row.get("title")?,
            file_url: row.get("file_url")?,
            doc_type: row.get("doc_type")?,
            state: row.get("state")?,
            status: row.get("status")?,
            uploaded_by: row.get("uploaded_by")?,
            approved_by: row.get("approved_by")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// New documents always start out PENDING.
    pub fn create(
        conn: &Connection,
        title: &str,
        file_url: &str,
        doc_type: DocType,
        state: Region,
        uploaded_by: &str,
    ) -> rusqlite::Result<Document> {
        let stamp = now();
        let doc = Document {
            id: new_id(),
            title: title.trim().to_string(),
            file_url: file_url.to_string(),
            doc_type,
            state,
            status: DocStatus::Pending,
            uploaded_by: uploaded_by.to_string(),
            approved_by: None,
            created_at: stamp.clone(),
            updated_at: stamp,
        };
        conn.execute(
            "INSERT INTO documents (id, title, file_url, doc_type, state, status, uploaded_by,
                                    created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                doc.id,
                doc.title,
                doc.file_url,
                doc.doc_type,
                doc.state,
                doc.status,
                doc.uploaded_by,
                doc.created_at
            ],
        )?;
        Ok(doc)
    }

    pub fn get(conn: &Connection, id: &str) -> rusqlite::Result<Option<Document>> {
        conn.query_row("SELECT * FROM documents WHERE id = ?1", [id], Document::from_row)
            .optional()
    }

    pub fn pending(conn: &Connection) -> rusqlite::Result<Vec<Document>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM documents WHERE status = 'PENDING' ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], Document::from_row)?;
        rows.collect()
    }

    pub fn approved_for_state(conn: &Connection, state: Region) -> rusqlite::Result<Vec<Document>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM documents WHERE state = ?1 AND status = 'APPROVED'
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([state], Document::from_row)?;
        rows.collect()
    }

    /// Decides a PENDING document. Anything already decided is a 400.
    pub fn decide(&mut self, conn: &Connection, status: DocStatus, reviewer: &str) -> Result<(), ApiError> {
        if status == DocStatus::Pending {
            return Err(ApiError::bad_request("A document cannot be moved back to PENDING"));
        }
        if self.status != DocStatus::Pending {
            return Err(ApiError::bad_request(format!(
                "Document is already {}",
                self.status
            )));
        }

        self.status = status;
        self.approved_by = match status {
            DocStatus::Approved => Some(reviewer.to_string()),
            _ => None,
        };
        self.updated_at = now();
        conn.execute(
            "UPDATE documents SET status = ?1, approved_by = ?2, updated_at = ?3
             WHERE id = ?4 AND status = 'PENDING'",
            params![self.status, self.approved_by, self.updated_at, self.id],
        )?;
        Ok(())
    }

    /// Fields students see in the approved list.
    pub fn listing_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "title": self.title,
            "fileUrl": self.file_url,
            "docType": self.doc_type,
            "state": self.state,
            "createdAt": self.created_at,
        })
    }
}
