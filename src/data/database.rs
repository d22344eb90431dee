use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::Connection;

/// Shared SQLite handle. Handlers lock it for the synchronous part of their
/// work and never hold the guard across an `.await`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Database> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Database::init(conn)
    }

    pub fn open_in_memory() -> rusqlite::Result<Database> {
        Database::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> rusqlite::Result<Database> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("Database schema ready");
        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    /// A handler that panicked mid-request leaves the mutex poisoned. Its open
    /// transaction was rolled back when dropped, so the connection is reused.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovering database lock after a panicked request");
            self.conn.clear_poison();
            PoisonError::into_inner(poisoned)
        })
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT UNIQUE,
    password TEXT,
    phone TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL,
    state TEXT NOT NULL,
    profile_image TEXT,
    tier TEXT NOT NULL DEFAULT 'FREE',
    plan TEXT NOT NULL DEFAULT '{}',
    has_paid_plan INTEGER NOT NULL DEFAULT 0,
    is_paid INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_state_role ON users (state, role);

CREATE TABLE IF NOT EXISTS students (
    id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    phone TEXT NOT NULL,
    qualification TEXT NOT NULL,
    specialization TEXT,
    year_of_study INTEGER,
    college_name TEXT,
    college_code TEXT,
    applied_jobs TEXT NOT NULL DEFAULT '[]',
    saved_jobs TEXT NOT NULL DEFAULT '[]',
    job_alerts_enabled INTEGER NOT NULL DEFAULT 1,
    status TEXT NOT NULL DEFAULT 'Active',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_students_match ON students (qualification, status);

CREATE TABLE IF NOT EXISTS user_profiles (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    file_url TEXT NOT NULL,
    doc_type TEXT NOT NULL,
    state TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING',
    uploaded_by TEXT NOT NULL,
    approved_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_status ON documents (status);
CREATE INDEX IF NOT EXISTS idx_documents_state_status ON documents (state, status);

CREATE TABLE IF NOT EXISTS tickets (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'OPEN',
    state TEXT NOT NULL,
    created_by TEXT NOT NULL,
    assigned_to TEXT,
    completed_by TEXT,
    completed_at TEXT,
    resolution_note TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets (status);
CREATE INDEX IF NOT EXISTS idx_tickets_created_by ON tickets (created_by);

CREATE TABLE IF NOT EXISTS chat_messages (
    id TEXT PRIMARY KEY,
    conversation_type TEXT NOT NULL,
    ticket_id TEXT,
    from_user TEXT NOT NULL,
    from_role TEXT NOT NULL,
    message TEXT NOT NULL,
    attachments TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chat_conversation ON chat_messages (conversation_type, ticket_id, created_at);

CREATE TABLE IF NOT EXISTS companies (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    email TEXT,
    phone_number TEXT,
    account_type TEXT NOT NULL DEFAULT 'company',
    company_name TEXT,
    industry TEXT,
    company_size TEXT,
    website TEXT,
    verification_status TEXT NOT NULL DEFAULT 'pending',
    verified_by TEXT,
    verified_at TEXT,
    verification_note TEXT,
    profile TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_companies_user ON companies (user_id);
CREATE INDEX IF NOT EXISTS idx_companies_verification ON companies (verification_status);

CREATE TABLE IF NOT EXISTS job_postings (
    id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL UNIQUE,
    job_title TEXT NOT NULL,
    organization TEXT NOT NULL,
    job_category TEXT NOT NULL,
    job_type TEXT NOT NULL,
    job_description TEXT NOT NULL,
    target_qualifications TEXT NOT NULL,
    details TEXT NOT NULL DEFAULT '{}',
    total_positions INTEGER NOT NULL,
    last_application_date TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Active',
    featured INTEGER NOT NULL DEFAULT 0,
    tags TEXT NOT NULL DEFAULT '[]',
    posted_by TEXT NOT NULL,
    notification_sent INTEGER NOT NULL DEFAULT 0,
    notification_sent_to TEXT NOT NULL DEFAULT '[]',
    notification_sent_date TEXT,
    total_students_matched INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_jobs_category_status ON job_postings (job_category, status);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    notification_id TEXT NOT NULL UNIQUE,
    student_id TEXT NOT NULL,
    job_id TEXT NOT NULL,
    job_title TEXT,
    organization TEXT,
    job_category TEXT,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    important_dates TEXT NOT NULL DEFAULT '{}',
    is_read INTEGER NOT NULL DEFAULT 0,
    read_at TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notifications_student ON notifications (student_id, is_read);
CREATE INDEX IF NOT EXISTS idx_notifications_job ON notifications (job_id);

CREATE TABLE IF NOT EXISTS job_applications (
    id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL,
    student_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'APPLIED',
    resume TEXT,
    cover_letter TEXT,
    notes TEXT,
    applied_at TEXT NOT NULL,
    hired_at TEXT,
    updated_at TEXT NOT NULL,
    UNIQUE (job_id, student_id)
);

CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    author_id TEXT NOT NULL,
    text TEXT,
    link_preview TEXT,
    likes TEXT NOT NULL DEFAULT '[]',
    saves TEXT NOT NULL DEFAULT '[]',
    comments_count INTEGER NOT NULL DEFAULT 0,
    share_count INTEGER NOT NULL DEFAULT 0,
    shared_from TEXT,
    shares TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_posts_created ON posts (created_at);
CREATE INDEX IF NOT EXISTS idx_posts_author ON posts (author_id);

CREATE TABLE IF NOT EXISTS post_comments (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    author_id TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_comments_post ON post_comments (post_id, created_at);

CREATE TABLE IF NOT EXISTS follows (
    id TEXT PRIMARY KEY,
    follower_id TEXT NOT NULL,
    following_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (follower_id, following_id)
);
CREATE INDEX IF NOT EXISTS idx_follows_following ON follows (following_id);

CREATE TABLE IF NOT EXISTS colleges (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    district TEXT NOT NULL,
    state TEXT NOT NULL,
    cutoff_oc INTEGER,
    cutoff_bc INTEGER,
    cutoff_sc INTEGER,
    cutoff_st INTEGER,
    reviews TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_colleges_state_district ON colleges (state, district);

CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    user_role TEXT NOT NULL,
    user_name TEXT NOT NULL,
    action TEXT NOT NULL,
    resource_type TEXT NOT NULL,
    resource_id TEXT,
    description TEXT NOT NULL DEFAULT '',
    metadata TEXT NOT NULL DEFAULT '{}',
    ip_address TEXT,
    user_agent TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_activities_user ON activities (user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_activities_created ON activities (created_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        conn.execute_batch(SCHEMA).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 15);
    }

    #[test]
    fn lock_survives_a_panicked_holder() {
        let db = Database::open_in_memory().unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _conn = db.lock();
            panic!("handler blew up");
        }));
        assert!(result.is_err());

        let conn = db.lock();
        let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
        assert_eq!(one, 1);
        drop(conn);
        assert!(!db.conn.is_poisoned());
    }
}
