use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::utils::database::{json_column, new_id, now, placeholders, prefixed_id, to_json};
use crate::utils::enums::{Qualification, StudentStatus};

/// The job-matching side of a `USER` account, linked to it by email.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub qualification: Qualification,
    pub specialization: Option<String>,
    pub year_of_study: Option<i64>,
    pub college_name: Option<String>,
    pub college_code: Option<String>,
    pub applied_jobs: Vec<String>,
    pub saved_jobs: Vec<String>,
    pub job_alerts_enabled: bool,
    pub status: StudentStatus,
    pub created_at: String,
    pub updated_at: String,
}

const STUDENT_COLUMNS: &str = "id, student_id, name, email, phone, qualification, specialization, \
     year_of_study, college_name, college_code, applied_jobs, saved_jobs, job_alerts_enabled, \
     status, created_at, updated_at";

/// Shared by the fan-out and the "check matching" preview so both count the same students.
const MATCH_FILTER: &str = "status = 'Active' AND job_alerts_enabled = 1";

impl Student {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
        Ok(Student {
            id: row.get("id")?,
            student_id: row.get("student_id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            qualification: row.get("qualification")?,
            specialization: row.get("specialization")?,
            year_of_study: row.get("year_of_study")?,
            college_name: row.get("college_name")?,
            college_code: row.get("college_code")?,
            applied_jobs: json_column(row, "applied_jobs")?,
            saved_jobs: json_column(row, "saved_jobs")?,
            job_alerts_enabled: row.get("job_alerts_enabled")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(
        conn: &Connection,
        name: &str,
        email: &str,
        phone: &str,
        qualification: Qualification,
    ) -> rusqlite::Result<Student> {
        let stamp = now();
        let student = Student {
            id: new_id(),
            student_id: prefixed_id("STU"),
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
            phone: phone.trim().to_string(),
            qualification,
            specialization: None,
            year_of_study: None,
            college_name: None,
            college_code: None,
            applied_jobs: Vec::new(),
            saved_jobs: Vec::new(),
            job_alerts_enabled: true,
            status: StudentStatus::Active,
            created_at: stamp.clone(),
            updated_at: stamp,
        };

        conn.execute(
            "INSERT INTO students (id, student_id, name, email, phone, qualification,
                                   job_alerts_enabled, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8, ?8)",
            params![
                student.id,
                student.student_id,
                student.name,
                student.email,
                student.phone,
                student.qualification,
                student.status,
                student.created_at
            ],
        )?;
        Ok(student)
    }

    pub fn get_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<Student>> {
        conn.query_row(
            &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE email = ?1"),
            [email.trim().to_lowercase()],
            Student::from_row,
        )
        .optional()
    }

    pub fn get_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Student>> {
        conn.query_row(
            &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
            [id],
            Student::from_row,
        )
        .optional()
    }

    /// Active students with alerts on whose qualification is in `targets`.
    pub fn matching(conn: &Connection, targets: &[Qualification]) -> rusqlite::Result<Vec<Student>> {
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students
             WHERE qualification IN ({}) AND {MATCH_FILTER}
             ORDER BY created_at ASC, rowid ASC",
            placeholders(targets.len())
        ))?;
        let rows = stmt.query_map(rusqlite::params_from_iter(targets.iter()), Student::from_row)?;
        rows.collect()
    }

    pub fn count_matching(conn: &Connection, targets: &[Qualification]) -> rusqlite::Result<i64> {
        if targets.is_empty() {
            return Ok(0);
        }
        conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM students WHERE qualification IN ({}) AND {MATCH_FILTER}",
                placeholders(targets.len())
            ),
            rusqlite::params_from_iter(targets.iter()),
            |row| row.get(0),
        )
    }

    #[cfg(test)]
    pub fn set_job_alerts(conn: &Connection, id: &str, enabled: bool) -> rusqlite::Result<()> {
        conn.execute(
            "UPDATE students SET job_alerts_enabled = ?1, updated_at = ?2 WHERE id = ?3",
            params![enabled, now(), id],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub fn set_status(conn: &Connection, id: &str, status: StudentStatus) -> rusqlite::Result<()> {
        conn.execute(
            "UPDATE students SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status, now(), id],
        )?;
        Ok(())
    }

    /// Remembers that the student applied to the job with internal id `job_id`.
    pub fn record_application(&mut self, conn: &Connection, job_id: &str) -> rusqlite::Result<()> {
        if self.applied_jobs.iter().any(|j| j == job_id) {
            return Ok(());
        }
        self.applied_jobs.push(job_id.to_string());
        self.updated_at = now();
        conn.execute(
            "UPDATE students SET applied_jobs = ?1, updated_at = ?2 WHERE id = ?3",
            params![to_json(&self.applied_jobs)?, self.updated_at, self.id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::database::Database;

    #[test]
    fn matching_honours_status_and_alerts() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let btech = Student::create(&conn, "A", "a@x.in", "9000000001", Qualification::BTech).unwrap();
        let muted = Student::create(&conn, "B", "b@x.in", "9000000002", Qualification::BTech).unwrap();
        let inactive = Student::create(&conn, "C", "c@x.in", "9000000003", Qualification::Diploma).unwrap();
        Student::create(&conn, "D", "d@x.in", "9000000004", Qualification::Mba).unwrap();

        Student::set_job_alerts(&conn, &muted.id, false).unwrap();
        Student::set_status(&conn, &inactive.id, StudentStatus::Inactive).unwrap();

        let targets = [Qualification::BTech, Qualification::Diploma];
        let matched = Student::matching(&conn, &targets).unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, btech.id);
        assert_eq!(Student::count_matching(&conn, &targets).unwrap(), 1);
        assert_eq!(Student::count_matching(&conn, &[]).unwrap(), 0);
    }

    #[test]
    fn applications_are_recorded_once() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let mut student = Student::create(&conn, "A", "A@X.in", "9000000001", Qualification::BSc).unwrap();
        student.record_application(&conn, "job-1").unwrap();
        student.record_application(&conn, "job-1").unwrap();

        let stored = Student::get_by_email(&conn, "a@x.in").unwrap().unwrap();
        assert_eq!(stored.applied_jobs, vec!["job-1".to_string()]);
        assert!(stored.student_id.starts_with("STU-"));
    }
}
