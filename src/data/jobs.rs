use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::utils::database::{
    json_column, merge_json, new_id, now, parse_datetime, prefixed_id, timestamp, to_json,
};
use crate::utils::enums::{JobCategory, JobStatus, JobType, Qualification};

const NOTIFYING_AUTHORITIES: &[&str] = &["APPSC", "UPSC", "SSC", "RRB", "IBPS", "TNPSC", "KPSC", "MPSC"];
const GRADES: &[&str] = &["Class 1", "Class 2", "Class 3", "Class 4"];
const WORK_MODES: &[&str] = &["Remote", "On-site", "Hybrid"];
const CATEGORY_ELIGIBILITY: &[&str] = &["General", "OBC", "SC", "ST", "EWS", "PWD"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Range {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_structure: Option<String>,
}

impl Range {
    fn is_complete(&self) -> bool {
        matches!((self.min, self.max), (Some(min), Some(max)) if min > 0.0 && max > 0.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GovtJobFields {
    pub notifying_authority: Option<String>,
    pub post_code: Option<String>,
    pub grade: Option<String>,
    pub pay_scale: Option<Range>,
    pub additional_benefits: Option<serde_json::Value>,
    pub exam_pattern: Option<String>,
    pub exam_syllabi: Option<String>,
    pub exam_date: Option<String>,
    pub admit_card_date: Option<String>,
    pub result_date: Option<String>,
    pub selection_process: Option<String>,
    pub application_fee: Option<f64>,
    pub official_link: Option<String>,
    #[serde(rename = "notificationPDF")]
    pub notification_pdf: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivateJobFields {
    pub work_mode: Option<String>,
    pub job_location: Vec<String>,
    pub salary_range: Option<Range>,
    pub company_website: Option<String>,
    pub company_description: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub hr_contact_person: Option<String>,
    pub hr_contact_email: Option<String>,
    pub hr_contact_phone: Option<String>,
    pub application_link: Option<String>,
}

/// Everything about a posting that is only ever read back whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobDetails {
    pub qualifications: Vec<String>,
    pub experience: Range,
    pub skills_required: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub age_limit: Range,
    pub category_eligibility: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub govt_job_fields: Option<GovtJobFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_job_fields: Option<PrivateJobFields>,
}

impl Default for JobDetails {
    fn default() -> Self {
        JobDetails {
            qualifications: Vec::new(),
            experience: Range {
                min: Some(0.0),
                ..Range::default()
            },
            skills_required: Vec::new(),
            preferred_skills: Vec::new(),
            age_limit: Range::default(),
            category_eligibility: vec!["General".to_string()],
            govt_job_fields: None,
            private_job_fields: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTracking {
    pub notification_sent: bool,
    pub notification_sent_to: Vec<String>,
    pub notification_sent_date: Option<String>,
    pub total_students_matched: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: String,
    pub job_id: String,
    pub job_title: String,
    pub organization: String,
    pub job_category: JobCategory,
    pub job_type: JobType,
    pub job_description: String,
    pub target_qualifications: Vec<Qualification>,
    #[serde(flatten)]
    pub details: JobDetails,
    pub total_positions: i64,
    pub last_application_date: String,
    pub status: JobStatus,
    pub featured: bool,
    pub tags: Vec<String>,
    pub posted_by: String,
    pub notification_tracking: NotificationTracking,
    pub created_at: String,
    pub updated_at: String,
}

/// Body of a create request. Everything is optional so that missing fields
/// produce our own messages instead of a deserializer error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobInput {
    pub job_title: Option<String>,
    pub organization: Option<String>,
    pub job_category: Option<JobCategory>,
    pub job_type: Option<JobType>,
    pub job_description: Option<String>,
    pub target_qualifications: Option<Vec<Qualification>>,
    pub qualifications: Option<Vec<String>>,
    pub experience: Option<Range>,
    pub skills_required: Option<Vec<String>>,
    pub preferred_skills: Option<Vec<String>>,
    pub age_limit: Option<Range>,
    pub category_eligibility: Option<Vec<String>>,
    pub total_positions: Option<i64>,
    pub last_application_date: Option<String>,
    pub govt_job_fields: Option<GovtJobFields>,
    pub private_job_fields: Option<PrivateJobFields>,
    pub status: Option<JobStatus>,
    pub featured: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// Body of `PUT /api/admin/jobs/{jobId}`. Category-field objects are kept raw so
/// they can be merged into what is stored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobUpdate {
    pub job_title: Option<String>,
    pub organization: Option<String>,
    pub job_type: Option<JobType>,
    pub job_description: Option<String>,
    pub target_qualifications: Option<Vec<Qualification>>,
    pub qualifications: Option<Vec<String>>,
    pub experience: Option<Range>,
    pub skills_required: Option<Vec<String>>,
    pub preferred_skills: Option<Vec<String>>,
    pub age_limit: Option<Range>,
    pub category_eligibility: Option<Vec<String>>,
    pub total_positions: Option<i64>,
    pub last_application_date: Option<String>,
    pub govt_job_fields: Option<serde_json::Value>,
    pub private_job_fields: Option<serde_json::Value>,
    pub status: Option<JobStatus>,
    pub featured: Option<bool>,
    pub tags: Option<Vec<String>>,
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).is_some_and(|v| !v.is_empty())
}

/// Parses a date field and returns it in storage form.
fn normalize_date(field: &str, raw: &str) -> Result<String, ApiError> {
    parse_datetime(raw)
        .map(timestamp)
        .ok_or_else(|| ApiError::bad_request(format!("{field} must be a valid date")))
}

fn future_date(raw: &str) -> Result<String, ApiError> {
    let at = parse_datetime(raw)
        .ok_or_else(|| ApiError::bad_request("lastApplicationDate must be a valid date"))?;
    if at <= chrono::Utc::now() {
        return Err(ApiError::bad_request(
            "Last application date must be in the future",
        ));
    }
    Ok(timestamp(at))
}

fn normalize_optional_date(field: &str, value: &mut Option<String>) -> Result<(), ApiError> {
    if let Some(raw) = value.as_deref().filter(|v| !v.trim().is_empty()) {
        *value = Some(normalize_date(field, raw)?);
    } else {
        *value = None;
    }
    Ok(())
}

impl JobPosting {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<JobPosting> {
        Ok(JobPosting {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            job_title: row.get("job_title")?,
            organization: row.get("organization")?,
            job_category: row.get("job_category")?,
            job_type: row.get("job_type")?,
            job_description: row.get("job_description")?,
            target_qualifications: json_column(row, "target_qualifications")?,
            details: json_column(row, "details")?,
            total_positions: row.get("total_positions")?,
            last_application_date: row.get("last_application_date")?,
            status: row.get("status")?,
            featured: row.get("featured")?,
            tags: json_column(row, "tags")?,
            posted_by: row.get("posted_by")?,
            notification_tracking: NotificationTracking {
                notification_sent: row.get("notification_sent")?,
                notification_sent_to: json_column(row, "notification_sent_to")?,
                notification_sent_date: row.get("notification_sent_date")?,
                total_students_matched: row.get("total_students_matched")?,
            },
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Validates a create request into a posting owned by `posted_by`.
    pub fn from_input(input: JobInput, posted_by: &str) -> Result<JobPosting, ApiError> {
        let missing = || ApiError::bad_request("Missing required fields");

        let job_title = required(input.job_title).ok_or_else(missing)?;
        let organization = required(input.organization).ok_or_else(missing)?;
        let job_category = input.job_category.ok_or_else(missing)?;
        let targets = input.target_qualifications.ok_or_else(missing)?;
        let total_positions = input.total_positions.ok_or_else(missing)?;
        let last_date = required(input.last_application_date).ok_or_else(missing)?;
        let job_description = required(input.job_description)
            .ok_or_else(|| ApiError::bad_request("Job description is required"))?;

        if targets.is_empty() {
            return Err(ApiError::bad_request(
                "At least one target qualification must be selected",
            ));
        }
        let last_application_date = future_date(&last_date)?;

        let mut details = JobDetails::default();
        if let Some(v) = input.qualifications {
            details.qualifications = v;
        }
        if let Some(v) = input.experience {
            details.experience = v;
        }
        if let Some(v) = input.skills_required {
            details.skills_required = v;
        }
        if let Some(v) = input.preferred_skills {
            details.preferred_skills = v;
        }
        if let Some(v) = input.age_limit {
            details.age_limit = v;
        }
        if let Some(v) = input.category_eligibility {
            details.category_eligibility = v;
        }

        match job_category {
            JobCategory::Government => {
                details.govt_job_fields = Some(input.govt_job_fields.ok_or_else(|| {
                    ApiError::bad_request("Government job fields are required")
                })?);
            }
            JobCategory::Private => {
                details.private_job_fields = Some(input.private_job_fields.ok_or_else(|| {
                    ApiError::bad_request("Private job fields are required")
                })?);
            }
        }

        let stamp = now();
        let mut job = JobPosting {
            id: new_id(),
            job_id: prefixed_id("JOB"),
            job_title,
            organization,
            job_category,
            job_type: input.job_type.unwrap_or(JobType::FullTime),
            job_description,
            target_qualifications: dedup(targets),
            details,
            total_positions,
            last_application_date,
            status: input.status.unwrap_or(JobStatus::Active),
            featured: input.featured.unwrap_or(false),
            tags: input.tags.unwrap_or_default(),
            posted_by: posted_by.to_string(),
            notification_tracking: NotificationTracking::default(),
            created_at: stamp.clone(),
            updated_at: stamp,
        };
        job.validate()?;
        Ok(job)
    }

    /// Field rules checked on create and again after every update.
    pub fn validate(&mut self) -> Result<(), ApiError> {
        let title_len = self.job_title.chars().count();
        if title_len < 10 {
            return Err(ApiError::bad_request("Job title must be at least 10 characters"));
        }
        if title_len > 100 {
            return Err(ApiError::bad_request("Job title cannot exceed 100 characters"));
        }
        if self.organization.trim().is_empty() {
            return Err(ApiError::bad_request("Organization is required"));
        }
        if self.job_description.chars().count() < 50 {
            return Err(ApiError::bad_request(
                "Job description must be at least 50 characters",
            ));
        }
        if self.target_qualifications.is_empty() {
            return Err(ApiError::bad_request(
                "At least one target qualification must be selected",
            ));
        }
        if self.total_positions < 1 {
            return Err(ApiError::bad_request("Total positions must be at least 1"));
        }
        if let Some(bad) = self
            .details
            .category_eligibility
            .iter()
            .find(|c| !CATEGORY_ELIGIBILITY.contains(&c.as_str()))
        {
            return Err(ApiError::bad_request(format!(
                "'{bad}' is not a valid category eligibility"
            )));
        }

        match self.job_category {
            JobCategory::Government => {
                let fields = self.details.govt_job_fields.get_or_insert_with(Default::default);
                validate_govt(fields)?;
            }
            JobCategory::Private => {
                let fields = self
                    .details
                    .private_job_fields
                    .get_or_insert_with(Default::default);
                validate_private(fields)?;
            }
        }
        Ok(())
    }

    /// Applies a partial update. The category itself cannot change.
    pub fn apply_update(&mut self, update: JobUpdate) -> Result<(), ApiError> {
        if let Some(v) = update.job_title {
            self.job_title = v.trim().to_string();
        }
        if let Some(v) = update.organization {
            self.organization = v.trim().to_string();
        }
        if let Some(v) = update.job_type {
            self.job_type = v;
        }
        if let Some(v) = update.job_description {
            self.job_description = v.trim().to_string();
        }
        if let Some(v) = update.target_qualifications {
            self.target_qualifications = dedup(v);
        }
        if let Some(v) = update.qualifications {
            self.details.qualifications = v;
        }
        if let Some(v) = update.experience {
            self.details.experience = v;
        }
        if let Some(v) = update.skills_required {
            self.details.skills_required = v;
        }
        if let Some(v) = update.preferred_skills {
            self.details.preferred_skills = v;
        }
        if let Some(v) = update.age_limit {
            self.details.age_limit = v;
        }
        if let Some(v) = update.category_eligibility {
            self.details.category_eligibility = v;
        }
        if let Some(v) = update.total_positions {
            self.total_positions = v;
        }
        if let Some(raw) = update.last_application_date {
            self.last_application_date = future_date(&raw)?;
        }
        if let Some(patch) = update.govt_job_fields {
            self.details.govt_job_fields = Some(merged(&self.details.govt_job_fields, &patch)?);
        }
        if let Some(patch) = update.private_job_fields {
            self.details.private_job_fields =
                Some(merged(&self.details.private_job_fields, &patch)?);
        }
        if let Some(v) = update.status {
            self.status = v;
        }
        if let Some(v) = update.featured {
            self.featured = v;
        }
        if let Some(v) = update.tags {
            self.tags = v;
        }

        self.validate()?;
        self.updated_at = now();
        Ok(())
    }

    pub fn exam_date(&self) -> Option<&str> {
        self.details
            .govt_job_fields
            .as_ref()
            .and_then(|g| g.exam_date.as_deref())
    }

    /// Still taking applications.
    pub fn is_open(&self) -> bool {
        self.status == JobStatus::Active && self.last_application_date > now()
    }

    pub fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO job_postings (id, job_id, job_title, organization, job_category, job_type,
                 job_description, target_qualifications, details, total_positions,
                 last_application_date, status, featured, tags, posted_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
            params![
                self.id,
                self.job_id,
                self.job_title,
                self.organization,
                self.job_category,
                self.job_type,
                self.job_description,
                to_json(&self.target_qualifications)?,
                to_json(&self.details)?,
                self.total_positions,
                self.last_application_date,
                self.status,
                self.featured,
                to_json(&self.tags)?,
                self.posted_by,
                self.created_at
            ],
        )?;
        Ok(())
    }

    /// Writes back every editable column.
    pub fn save(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "UPDATE job_postings SET job_title = ?1, organization = ?2, job_type = ?3,
                 job_description = ?4, target_qualifications = ?5, details = ?6,
                 total_positions = ?7, last_application_date = ?8, status = ?9, featured = ?10,
                 tags = ?11, updated_at = ?12
             WHERE id = ?13",
            params![
                self.job_title,
                self.organization,
                self.job_type,
                self.job_description,
                to_json(&self.target_qualifications)?,
                to_json(&self.details)?,
                self.total_positions,
                self.last_application_date,
                self.status,
                self.featured,
                to_json(&self.tags)?,
                self.updated_at,
                self.id
            ],
        )?;
        Ok(())
    }

    pub fn save_tracking(&self, conn: &Connection) -> rusqlite::Result<()> {
        let tracking = &self.notification_tracking;
        conn.execute(
            "UPDATE job_postings SET notification_sent = ?1, notification_sent_to = ?2,
                 notification_sent_date = ?3, total_students_matched = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                tracking.notification_sent,
                to_json(&tracking.notification_sent_to)?,
                tracking.notification_sent_date,
                tracking.total_students_matched,
                self.updated_at,
                self.id
            ],
        )?;
        Ok(())
    }

    pub fn get_by_job_id(conn: &Connection, job_id: &str) -> rusqlite::Result<Option<JobPosting>> {
        conn.query_row(
            "SELECT * FROM job_postings WHERE job_id = ?1",
            [job_id],
            JobPosting::from_row,
        )
        .optional()
    }

    pub fn get_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<JobPosting>> {
        conn.query_row(
            "SELECT * FROM job_postings WHERE id = ?1",
            [id],
            JobPosting::from_row,
        )
        .optional()
    }

    /// Admin listing, newest first.
    pub fn list(
        conn: &Connection,
        category: Option<JobCategory>,
        status: Option<JobStatus>,
        limit: i64,
        offset: i64,
    ) -> rusqlite::Result<(i64, Vec<JobPosting>)> {
        let filter = "(?1 IS NULL OR job_category = ?1) AND (?2 IS NULL OR status = ?2)";
        let total = conn.query_row(
            &format!("SELECT COUNT(*) FROM job_postings WHERE {filter}"),
            params![category, status],
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM job_postings WHERE {filter}
             ORDER BY created_at DESC LIMIT ?3 OFFSET ?4"
        ))?;
        let jobs = stmt
            .query_map(params![category, status, limit, offset], JobPosting::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((total, jobs))
    }

    /// Active postings that target `qualification`, newest first.
    pub fn list_for_qualification(
        conn: &Connection,
        qualification: Qualification,
        category: Option<JobCategory>,
        limit: i64,
        offset: i64,
    ) -> rusqlite::Result<(i64, Vec<JobPosting>)> {
        let filter = "status = 'Active'
             AND EXISTS (SELECT 1 FROM json_each(job_postings.target_qualifications) q
                         WHERE q.value = ?1)
             AND (?2 IS NULL OR job_category = ?2)";
        let total = conn.query_row(
            &format!("SELECT COUNT(*) FROM job_postings WHERE {filter}"),
            params![qualification, category],
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM job_postings WHERE {filter}
             ORDER BY created_at DESC LIMIT ?3 OFFSET ?4"
        ))?;
        let jobs = stmt
            .query_map(
                params![qualification, category, limit, offset],
                JobPosting::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((total, jobs))
    }

    /// Student-facing view: no tracking, no poster.
    pub fn public_json(&self) -> Result<serde_json::Value, ApiError> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("notificationTracking");
            map.remove("postedBy");
        }
        Ok(value)
    }
}

fn dedup(mut targets: Vec<Qualification>) -> Vec<Qualification> {
    let mut seen = Vec::with_capacity(targets.len());
    targets.retain(|q| {
        if seen.contains(q) {
            false
        } else {
            seen.push(*q);
            true
        }
    });
    targets
}

fn merged<T>(current: &Option<T>, patch: &serde_json::Value) -> Result<T, ApiError>
where
    T: Serialize + serde::de::DeserializeOwned + Default,
{
    let mut value = match current {
        Some(existing) => serde_json::to_value(existing)?,
        None => serde_json::to_value(T::default())?,
    };
    merge_json(&mut value, patch);
    serde_json::from_value(value).map_err(|e| ApiError::bad_request(e.to_string()))
}

fn validate_govt(fields: &mut GovtJobFields) -> Result<(), ApiError> {
    match fields.notifying_authority.as_deref() {
        Some(a) if NOTIFYING_AUTHORITIES.contains(&a) => {}
        Some(a) if !a.trim().is_empty() => {
            return Err(ApiError::bad_request(format!(
                "'{a}' is not a valid notifying authority"
            )))
        }
        _ => {
            return Err(ApiError::bad_request(
                "Notifying authority is required for government jobs",
            ))
        }
    }
    if !present(&fields.post_code) {
        return Err(ApiError::bad_request("Post code is required for government jobs"));
    }
    match fields.grade.as_deref() {
        Some(g) if GRADES.contains(&g) => {}
        Some(g) if !g.trim().is_empty() => {
            return Err(ApiError::bad_request(format!("'{g}' is not a valid grade")))
        }
        _ => return Err(ApiError::bad_request("Grade is required for government jobs")),
    }
    if !fields.pay_scale.as_ref().is_some_and(Range::is_complete) {
        return Err(ApiError::bad_request("Pay scale is required for government jobs"));
    }
    if !present(&fields.exam_date) {
        return Err(ApiError::bad_request("Exam date is required for government jobs"));
    }
    if !present(&fields.official_link) {
        return Err(ApiError::bad_request(
            "Official link is required for government jobs",
        ));
    }

    normalize_optional_date("examDate", &mut fields.exam_date)?;
    normalize_optional_date("admitCardDate", &mut fields.admit_card_date)?;
    normalize_optional_date("resultDate", &mut fields.result_date)?;
    if let Some(scale) = fields.pay_scale.as_mut() {
        scale.currency.get_or_insert_with(|| "INR".to_string());
    }
    Ok(())
}

fn validate_private(fields: &mut PrivateJobFields) -> Result<(), ApiError> {
    match fields.work_mode.as_deref() {
        Some(m) if WORK_MODES.contains(&m) => {}
        Some(m) if !m.trim().is_empty() => {
            return Err(ApiError::bad_request(format!("'{m}' is not a valid work mode")))
        }
        _ => return Err(ApiError::bad_request("Work mode is required for private jobs")),
    }
    if fields.job_location.iter().all(|l| l.trim().is_empty()) {
        return Err(ApiError::bad_request("Job location is required for private jobs"));
    }
    if !fields.salary_range.as_ref().is_some_and(Range::is_complete) {
        return Err(ApiError::bad_request("Salary range is required for private jobs"));
    }
    if !present(&fields.hr_contact_email) {
        return Err(ApiError::bad_request(
            "HR contact email is required for private jobs",
        ));
    }
    if !present(&fields.hr_contact_phone) {
        return Err(ApiError::bad_request(
            "HR contact phone is required for private jobs",
        ));
    }
    if let Some(range) = fields.salary_range.as_mut() {
        range.currency.get_or_insert_with(|| "INR".to_string());
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn govt_input() -> JobInput {
        serde_json::from_value(json!({
            "jobTitle": "Assistant Section Officer",
            "organization": "APPSC",
            "jobCategory": "Government",
            "jobDescription": "Recruitment of assistant section officers for the state secretariat.",
            "targetQualifications": ["B.Tech", "B.Sc", "B.Tech"],
            "totalPositions": 25,
            "lastApplicationDate": "2999-03-15",
            "govtJobFields": {
                "notifyingAuthority": "APPSC",
                "postCode": "ASO-12",
                "grade": "Class 2",
                "payScale": {"min": 25000, "max": 60000},
                "examDate": "2999-04-20",
                "officialLink": "https://psc.ap.gov.in"
            }
        }))
        .unwrap()
    }

    #[test]
    fn valid_government_job() {
        let job = JobPosting::from_input(govt_input(), "admin-1").unwrap();
        assert!(job.job_id.starts_with("JOB-"));
        assert_eq!(
            job.target_qualifications,
            vec![Qualification::BTech, Qualification::BSc]
        );
        assert_eq!(job.exam_date(), Some("2999-04-20T00:00:00.000000Z"));
        assert_eq!(job.details.category_eligibility, vec!["General"]);
        assert_eq!(job.status, JobStatus::Active);
        assert!(job.is_open());
    }

    #[test]
    fn rejects_past_last_date() {
        let mut input = govt_input();
        input.last_application_date = Some("2001-01-01".into());
        let err = JobPosting::from_input(input, "admin-1").unwrap_err();
        assert_eq!(err.to_string(), "Last application date must be in the future");
    }

    #[test]
    fn rejects_empty_targets_and_short_title() {
        let mut input = govt_input();
        input.target_qualifications = Some(vec![]);
        assert!(JobPosting::from_input(input, "a").is_err());

        let mut input = govt_input();
        input.job_title = Some("Clerk".into());
        let err = JobPosting::from_input(input, "a").unwrap_err();
        assert!(err.to_string().contains("at least 10"));
    }

    #[test]
    fn government_fields_are_checked() {
        let mut input = govt_input();
        input.govt_job_fields.as_mut().unwrap().pay_scale = Some(Range {
            min: Some(1000.0),
            ..Range::default()
        });
        let err = JobPosting::from_input(input, "a").unwrap_err();
        assert_eq!(err.to_string(), "Pay scale is required for government jobs");

        let mut input = govt_input();
        input.govt_job_fields = None;
        let err = JobPosting::from_input(input, "a").unwrap_err();
        assert_eq!(err.to_string(), "Government job fields are required");
    }

    #[test]
    fn private_fields_are_checked() {
        let input: JobInput = serde_json::from_value(json!({
            "jobTitle": "Backend Engineer (Rust)",
            "organization": "Acme Labs",
            "jobCategory": "Private",
            "jobDescription": "Build and operate the services behind our campus hiring product.",
            "targetQualifications": ["B.Tech"],
            "totalPositions": 2,
            "lastApplicationDate": "2999-01-01",
            "privateJobFields": {
                "workMode": "Remote",
                "jobLocation": ["Hyderabad"],
                "salaryRange": {"min": 600000, "max": 900000}
            }
        }))
        .unwrap();
        let err = JobPosting::from_input(input, "a").unwrap_err();
        assert_eq!(err.to_string(), "HR contact email is required for private jobs");
    }

    #[test]
    fn update_merges_category_fields() {
        let mut job = JobPosting::from_input(govt_input(), "admin-1").unwrap();
        let update: JobUpdate = serde_json::from_value(json!({
            "govtJobFields": {"postCode": "ASO-13"},
            "totalPositions": 30
        }))
        .unwrap();
        job.apply_update(update).unwrap();

        let govt = job.details.govt_job_fields.as_ref().unwrap();
        assert_eq!(govt.post_code.as_deref(), Some("ASO-13"));
        assert_eq!(govt.grade.as_deref(), Some("Class 2"));
        assert_eq!(job.total_positions, 30);
    }

    #[test]
    fn update_rejects_past_date() {
        let mut job = JobPosting::from_input(govt_input(), "admin-1").unwrap();
        let update: JobUpdate =
            serde_json::from_value(json!({"lastApplicationDate": "2000-01-01"})).unwrap();
        assert!(job.apply_update(update).is_err());
    }
}
