use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::error::{is_unique_violation, ApiError};
use crate::utils::database::{new_id, now};
use crate::utils::enums::ApplicationStatus;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: String,
    pub job_id: String,
    pub student_id: String,
    pub status: ApplicationStatus,
    pub resume: Option<String>,
    pub cover_letter: Option<String>,
    pub notes: Option<String>,
    pub applied_at: String,
    pub hired_at: Option<String>,
    pub updated_at: String,
}

/// Review moves an application forward only; ACCEPTED and REJECTED are final.
pub fn can_transition(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    use ApplicationStatus::*;

    match from {
        Applied => matches!(to, Shortlisted | InterviewScheduled | Accepted | Rejected),
        Shortlisted => matches!(to, InterviewScheduled | Accepted | Rejected),
        InterviewScheduled => matches!(to, Accepted | Rejected),
        Accepted | Rejected => false,
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl JobApplication {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<JobApplication> {
        Ok(JobApplication {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            student_id: row.get("student_id")?,
            status: row.get("status")?,
            resume: row.get("resume")?,
            cover_letter: row.get("cover_letter")?,
            notes: row.get("notes")?,
            applied_at: row.get("applied_at")?,
            hired_at: row.get("hired_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// One application per job and student; a second one is a 409.
    pub fn create(
        conn: &Connection,
        job_id: &str,
        student_id: &str,
        resume: Option<&str>,
        cover_letter: Option<&str>,
    ) -> Result<JobApplication, ApiError> {
        let stamp = now();
        let application = JobApplication {
            id: new_id(),
            job_id: job_id.to_string(),
            student_id: student_id.to_string(),
            status: ApplicationStatus::Applied,
            resume: trimmed(resume),
            cover_letter: trimmed(cover_letter),
            notes: None,
            applied_at: stamp.clone(),
            hired_at: None,
            updated_at: stamp,
        };

        let result = conn.execute(
            "INSERT INTO job_applications (id, job_id, student_id, status, resume, cover_letter,
                                           applied_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                application.id,
                application.job_id,
                application.student_id,
                application.status,
                application.resume,
                application.cover_letter,
                application.applied_at
            ],
        );
        match result {
            Ok(_) => Ok(application),
            Err(e) if is_unique_violation(&e) => Err(ApiError::Conflict(
                "You have already applied for this job".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(conn: &Connection, id: &str) -> rusqlite::Result<Option<JobApplication>> {
        conn.query_row(
            "SELECT * FROM job_applications WHERE id = ?1",
            [id],
            JobApplication::from_row,
        )
        .optional()
    }

    pub fn list_for_job(conn: &Connection, job_id: &str) -> rusqlite::Result<Vec<JobApplication>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM job_applications WHERE job_id = ?1 ORDER BY applied_at DESC",
        )?;
        let rows = stmt.query_map([job_id], JobApplication::from_row)?;
        rows.collect()
    }

    pub fn list_for_student(conn: &Connection, student_id: &str) -> rusqlite::Result<Vec<JobApplication>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM job_applications WHERE student_id = ?1 ORDER BY applied_at DESC",
        )?;
        let rows = stmt.query_map([student_id], JobApplication::from_row)?;
        rows.collect()
    }

    /// Moves the application to `status`. ACCEPTED stamps `hiredAt`.
    pub fn review(
        &mut self,
        conn: &Connection,
        status: ApplicationStatus,
        notes: Option<&str>,
    ) -> Result<(), ApiError> {
        if !can_transition(self.status, status) {
            return Err(ApiError::bad_request(format!(
                "Cannot move application from {} to {}",
                self.status, status
            )));
        }

        let stamp = now();
        self.status = status;
        if status == ApplicationStatus::Accepted {
            self.hired_at = Some(stamp.clone());
        }
        if let Some(notes) = trimmed(notes) {
            self.notes = Some(notes);
        }
        self.updated_at = stamp;

        conn.execute(
            "UPDATE job_applications SET status = ?1, notes = ?2, hired_at = ?3, updated_at = ?4
             WHERE id = ?5",
            params![self.status, self.notes, self.hired_at, self.updated_at, self.id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::database::Database;
    use ApplicationStatus::*;

    #[test]
    fn transitions() {
        assert!(can_transition(Applied, Shortlisted));
        assert!(can_transition(Applied, Accepted));
        assert!(can_transition(Shortlisted, InterviewScheduled));
        assert!(can_transition(InterviewScheduled, Rejected));
        assert!(!can_transition(Shortlisted, Applied));
        assert!(!can_transition(InterviewScheduled, Shortlisted));
        assert!(!can_transition(Accepted, Rejected));
        assert!(!can_transition(Rejected, Accepted));
    }

    #[test]
    fn duplicate_application_conflicts() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        JobApplication::create(&conn, "job-1", "stu-1", None, Some(" hi ")).unwrap();
        let err = JobApplication::create(&conn, "job-1", "stu-1", None, None).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        JobApplication::create(&conn, "job-2", "stu-1", None, None).unwrap();
        assert_eq!(JobApplication::list_for_student(&conn, "stu-1").unwrap().len(), 2);
    }

    #[test]
    fn accepting_sets_hired_at_and_is_final() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let mut app = JobApplication::create(&conn, "job-1", "stu-1", None, None).unwrap();
        app.review(&conn, Shortlisted, Some("strong profile")).unwrap();
        app.review(&conn, Accepted, None).unwrap();

        let stored = JobApplication::get(&conn, &app.id).unwrap().unwrap();
        assert_eq!(stored.status, Accepted);
        assert!(stored.hired_at.is_some());
        assert_eq!(stored.notes.as_deref(), Some("strong profile"));
        assert!(app.review(&conn, Rejected, None).is_err());
    }
}
