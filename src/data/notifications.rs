use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::data::jobs::JobPosting;
use crate::data::students::Student;
use crate::error::ApiError;
use crate::utils::database::{json_column, new_id, now, parse_datetime, prefixed_id, to_json};
use crate::utils::enums::{JobCategory, Qualification};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportantDates {
    pub last_application_date: Option<String>,
    pub exam_date: Option<String>,
    pub admit_card_date: Option<String>,
    pub result_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub notification_id: String,
    pub student_id: String,
    pub job_id: String,
    pub job_title: Option<String>,
    pub organization: Option<String>,
    pub job_category: Option<JobCategory>,
    pub title: String,
    pub message: String,
    pub important_dates: ImportantDates,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub created_at: String,
}

/// Outcome of a fan-out run.
#[derive(Debug, Clone, Serialize)]
pub struct FanOut {
    pub notified: usize,
    pub message: String,
}

/// `15 March 2027`
pub fn display_date(raw: &str) -> String {
    match parse_datetime(raw) {
        Some(at) => at.format("%-d %B %Y").to_string(),
        None => raw.to_string(),
    }
}

pub fn notification_title(job: &JobPosting) -> String {
    format!("New {} Job: {}", job.job_category, job.job_title)
}

pub fn notification_message(job: &JobPosting) -> String {
    let qualifications = job
        .target_qualifications
        .iter()
        .map(Qualification::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut message = format!(
        "{} is hiring for {}. Qualifications: {}. Last Date: {}.",
        job.organization,
        job.job_title,
        qualifications,
        display_date(&job.last_application_date)
    );
    if job.job_category == JobCategory::Government {
        if let Some(exam) = job.exam_date() {
            message.push_str(&format!(" Exam Date: {}.", display_date(exam)));
        }
    }
    message
}

fn important_dates(job: &JobPosting) -> ImportantDates {
    let govt = job.details.govt_job_fields.as_ref();
    ImportantDates {
        last_application_date: Some(job.last_application_date.clone()),
        exam_date: govt.and_then(|g| g.exam_date.clone()),
        admit_card_date: govt.and_then(|g| g.admit_card_date.clone()),
        result_date: govt.and_then(|g| g.result_date.clone()),
    }
}

/// Creates one dashboard notification per matching student and records the
/// run on the job. Rows that fail to insert are logged and skipped.
pub fn notify_students_for_job(conn: &mut Connection, job: &mut JobPosting) -> Result<FanOut, ApiError> {
    let students = Student::matching(conn, &job.target_qualifications)?;
    if students.is_empty() {
        tracing::info!(job_id = %job.job_id, "No matching students found for job");
        return Ok(FanOut {
            notified: 0,
            message: "No matching students found for this job".to_string(),
        });
    }

    let title = notification_title(job);
    let message = notification_message(job);
    let dates = to_json(&important_dates(job))?;
    let stamp = now();

    let tx = conn.transaction()?;
    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO notifications (id, notification_id, student_id, job_id, job_title,
                 organization, job_category, title, message, important_dates, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11)",
        )?;
        for student in &students {
            let result = stmt.execute(params![
                new_id(),
                prefixed_id("NOTIF"),
                student.id,
                job.id,
                job.job_title,
                job.organization,
                job.job_category,
                title,
                message,
                dates,
                stamp
            ]);
            match result {
                Ok(_) => inserted += 1,
                Err(e) => tracing::warn!(
                    job_id = %job.job_id,
                    student_id = %student.id,
                    error = %e,
                    "Skipping notification that failed to insert"
                ),
            }
        }
    }

    // The caller's job only sees the tracking once it is committed.
    let mut tracked = job.clone();
    tracked.notification_tracking.notification_sent = true;
    tracked.notification_tracking.notification_sent_to = students.iter().map(|s| s.id.clone()).collect();
    tracked.notification_tracking.notification_sent_date = Some(stamp.clone());
    tracked.notification_tracking.total_students_matched = students.len() as i64;
    tracked.updated_at = stamp;
    tracked.save_tracking(&tx)?;
    tx.commit()?;
    *job = tracked;

    let message = if inserted == students.len() {
        format!("Successfully notified {inserted} students")
    } else {
        format!("Partially notified {inserted} students. Some notifications failed.")
    };
    tracing::info!(job_id = %job.job_id, notified = inserted, matched = students.len(), "Notification fan-out finished");

    Ok(FanOut {
        notified: inserted,
        message,
    })
}

impl Notification {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
        Ok(Notification {
            id: row.get("id")?,
            notification_id: row.get("notification_id")?,
            student_id: row.get("student_id")?,
            job_id: row.get("job_id")?,
            job_title: row.get("job_title")?,
            organization: row.get("organization")?,
            job_category: row.get("job_category")?,
            title: row.get("title")?,
            message: row.get("message")?,
            important_dates: json_column(row, "important_dates")?,
            is_read: row.get("is_read")?,
            read_at: row.get("read_at")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Newest first, optionally only read or unread ones.
    pub fn list_for_student(
        conn: &Connection,
        student_id: &str,
        is_read: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> rusqlite::Result<Vec<Notification>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM notifications
             WHERE student_id = ?1 AND (?2 IS NULL OR is_read = ?2)
             ORDER BY created_at DESC LIMIT ?3 OFFSET ?4",
        )?;
        let rows = stmt.query_map(params![student_id, is_read, limit, offset], Notification::from_row)?;
        rows.collect()
    }

    /// `(total, unread)` for a student.
    pub fn counts(conn: &Connection, student_id: &str) -> rusqlite::Result<(i64, i64)> {
        conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN is_read = 0 THEN 1 ELSE 0 END), 0)
             FROM notifications WHERE student_id = ?1",
            [student_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
    }

    /// Marks the student's own notification read. `None` when it is not theirs.
    pub fn mark_read(
        conn: &Connection,
        student_id: &str,
        notification_id: &str,
    ) -> rusqlite::Result<Option<Notification>> {
        let changed = conn.execute(
            "UPDATE notifications SET is_read = 1, read_at = ?1
             WHERE notification_id = ?2 AND student_id = ?3",
            params![now(), notification_id, student_id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        conn.query_row(
            "SELECT * FROM notifications WHERE notification_id = ?1",
            [notification_id],
            Notification::from_row,
        )
        .optional()
    }

    pub fn delete_own(conn: &Connection, student_id: &str, notification_id: &str) -> rusqlite::Result<bool> {
        let deleted = conn.execute(
            "DELETE FROM notifications WHERE notification_id = ?1 AND student_id = ?2",
            params![notification_id, student_id],
        )?;
        Ok(deleted > 0)
    }

    pub fn count_for_job(conn: &Connection, job_id: &str) -> rusqlite::Result<i64> {
        conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE job_id = ?1",
            [job_id],
            |row| row.get(0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::database::Database;
    use crate::data::jobs::tests::govt_input;
    use crate::utils::enums::StudentStatus;

    fn job() -> JobPosting {
        JobPosting::from_input(govt_input(), "admin-1").unwrap()
    }

    #[test]
    fn message_includes_exam_date_for_government_jobs() {
        let job = job();
        assert_eq!(
            notification_title(&job),
            "New Government Job: Assistant Section Officer"
        );
        assert_eq!(
            notification_message(&job),
            "APPSC is hiring for Assistant Section Officer. Qualifications: B.Tech, B.Sc. \
             Last Date: 15 March 2999. Exam Date: 20 April 2999."
        );
    }

    #[test]
    fn fan_out_reaches_only_matching_students() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.lock();
        let a = Student::create(&conn, "A", "a@x.in", "9000000001", Qualification::BTech).unwrap();
        let b = Student::create(&conn, "B", "b@x.in", "9000000002", Qualification::BSc).unwrap();
        let c = Student::create(&conn, "C", "c@x.in", "9000000003", Qualification::BTech).unwrap();
        Student::create(&conn, "D", "d@x.in", "9000000004", Qualification::Mba).unwrap();
        Student::set_status(&conn, &c.id, StudentStatus::Inactive).unwrap();

        let mut job = job();
        job.insert(&conn).unwrap();
        let outcome = notify_students_for_job(&mut conn, &mut job).unwrap();
        assert_eq!(outcome.notified, 2);

        let stored = JobPosting::get_by_id(&conn, &job.id).unwrap().unwrap();
        let tracking = stored.notification_tracking;
        assert!(tracking.notification_sent);
        assert_eq!(tracking.total_students_matched, 2);
        assert_eq!(tracking.notification_sent_to, vec![a.id.clone(), b.id.clone()]);
        assert!(tracking.notification_sent_date.is_some());

        let inbox = Notification::list_for_student(&conn, &a.id, None, 10, 0).unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].notification_id.starts_with("NOTIF-"));
        assert_eq!(
            inbox[0].important_dates.exam_date.as_deref(),
            Some("2999-04-20T00:00:00.000000Z")
        );
        assert_eq!(Notification::count_for_job(&conn, &job.id).unwrap(), 2);
    }

    #[test]
    fn failed_rows_are_skipped_and_reported() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.lock();
        let a = Student::create(&conn, "A", "a@x.in", "9000000001", Qualification::BTech).unwrap();
        let b = Student::create(&conn, "B", "b@x.in", "9000000002", Qualification::BSc).unwrap();
        conn.execute_batch(&format!(
            "CREATE TEMP TRIGGER reject_b BEFORE INSERT ON notifications
             WHEN NEW.student_id = '{}' BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            b.id
        ))
        .unwrap();

        let mut job = job();
        job.insert(&conn).unwrap();
        let outcome = notify_students_for_job(&mut conn, &mut job).unwrap();
        assert_eq!(outcome.notified, 1);
        assert_eq!(outcome.message, "Partially notified 1 students. Some notifications failed.");
        assert_eq!(Notification::count_for_job(&conn, &job.id).unwrap(), 1);
        assert_eq!(Notification::counts(&conn, &a.id).unwrap(), (1, 1));
        assert_eq!(job.notification_tracking.total_students_matched, 2);
    }

    #[test]
    fn tracking_is_untouched_when_the_run_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.lock();
        Student::create(&conn, "A", "a@x.in", "9000000001", Qualification::BTech).unwrap();
        let mut job = job();
        job.insert(&conn).unwrap();
        conn.execute_batch(
            "CREATE TEMP TRIGGER freeze_jobs BEFORE UPDATE ON job_postings
             BEGIN SELECT RAISE(ABORT, 'frozen'); END;",
        )
        .unwrap();

        assert!(notify_students_for_job(&mut conn, &mut job).is_err());
        assert!(!job.notification_tracking.notification_sent);
        assert!(job.notification_tracking.notification_sent_to.is_empty());
        assert_eq!(Notification::count_for_job(&conn, &job.id).unwrap(), 0);
    }

    #[test]
    fn no_match_leaves_job_untouched() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.lock();
        let mut job = job();
        job.insert(&conn).unwrap();

        let outcome = notify_students_for_job(&mut conn, &mut job).unwrap();
        assert_eq!(outcome.notified, 0);
        assert_eq!(outcome.message, "No matching students found for this job");
        let stored = JobPosting::get_by_id(&conn, &job.id).unwrap().unwrap();
        assert!(!stored.notification_tracking.notification_sent);
    }

    #[test]
    fn read_and_delete_are_scoped_to_owner() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.lock();
        let a = Student::create(&conn, "A", "a@x.in", "9000000001", Qualification::BTech).unwrap();
        let mut job = job();
        job.insert(&conn).unwrap();
        notify_students_for_job(&mut conn, &mut job).unwrap();

        let id = Notification::list_for_student(&conn, &a.id, None, 10, 0).unwrap()[0]
            .notification_id
            .clone();
        assert!(Notification::mark_read(&conn, "someone-else", &id).unwrap().is_none());
        let read = Notification::mark_read(&conn, &a.id, &id).unwrap().unwrap();
        assert!(read.is_read && read.read_at.is_some());
        assert_eq!(Notification::counts(&conn, &a.id).unwrap(), (1, 0));
        assert_eq!(
            Notification::list_for_student(&conn, &a.id, Some(false), 10, 0).unwrap().len(),
            0
        );

        assert!(!Notification::delete_own(&conn, "someone-else", &id).unwrap());
        assert!(Notification::delete_own(&conn, &a.id, &id).unwrap());
    }
}
