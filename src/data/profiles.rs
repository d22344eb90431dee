//! Student profile documents. The profile is a JSON object stored whole in
//! `user_profiles.data`; `email` is mirrored into its own unique column.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{json, Map, Value};

use crate::error::{is_unique_violation, ApiError};
use crate::utils::database::{json_column, merge_json, new_id, now, to_json};

pub const MAX_BIO_LEN: usize = 500;

const GENDERS: &[&str] = &["Male", "Female", "Non-binary", "Prefer not to say"];
const YEARS_OF_STUDYING: &[&str] = &["1st year", "2nd year", "3rd year", "4th year", "5th year", "Completed"];
const AVAILABILITY: &[&str] = &["Immediate", "10 days", "30 days", "90 days", "120 days"];
const LOOKING_FOR: &[&str] = &["Job", "Internship"];
const WORK_PREFERENCES: &[&str] = &["Work from Home", "Work from Office", "Hybrid", "Remote"];
const PROFICIENCY: &[&str] = &["Beginner", "Intermediate", "Advanced", "Fluent", "Native"];

const TEXT_FIELDS: &[&str] = &["fullName", "bio", "email", "mobileNumber", "currentCity", "profilePhoto", "resumeUrl"];
const TITLED_LISTS: &[&str] = &["certifications", "achievements", "rewards"];

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub data: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
}

fn invalid(message: impl Into<String>) -> ApiError {
    ApiError::bad_request(message)
}

fn trimmed(value: &Value, path: &str) -> Result<Value, ApiError> {
    match value {
        Value::String(s) => Ok(Value::String(s.trim().to_string())),
        _ => Err(invalid(format!("{path} must be a string"))),
    }
}

fn one_of(value: &Value, path: &str, allowed: &[&str]) -> Result<Value, ApiError> {
    match value.as_str() {
        Some(s) if allowed.contains(&s) => Ok(value.clone()),
        _ => Err(invalid(format!("{path} must be one of: {}", allowed.join(", ")))),
    }
}

/// Rejects numeric strings: only JSON numbers pass.
fn number(value: &Value, path: &str) -> Result<Value, ApiError> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        _ => Err(invalid(format!("{path} must be a number"))),
    }
}

fn string_list(value: &Value, path: &str) -> Result<Value, ApiError> {
    match value {
        Value::Array(items) if items.iter().all(Value::is_string) => Ok(Value::Array(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| Value::String(s.trim().to_string()))
                .collect(),
        )),
        _ => Err(invalid(format!("{path} must be an array of strings"))),
    }
}

fn http_url(value: &Value, path: &str) -> Result<Value, ApiError> {
    let value = trimmed(value, path)?;
    let raw = value.as_str().unwrap_or_default();
    if raw.is_empty() || raw.starts_with("http://") || raw.starts_with("https://") {
        Ok(value)
    } else {
        Err(invalid(format!("{path} must be a valid URL (http/https)")))
    }
}

/// A certification, achievement or reward: `"title"` or `{title, date?}`.
fn titled_item(value: &Value, path: &str) -> Result<Value, ApiError> {
    let ok = match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Object(item) => {
            let has_title = item
                .get("title")
                .and_then(Value::as_str)
                .is_some_and(|t| !t.trim().is_empty());
            let date_ok = match item.get("date") {
                None | Some(Value::Null) => true,
                Some(Value::String(d)) => {
                    d.is_empty() || crate::utils::database::parse_datetime(d).is_some()
                }
                Some(_) => false,
            };
            has_title && date_ok
        }
        _ => false,
    };
    if ok {
        Ok(value.clone())
    } else {
        Err(invalid(format!("{path} items must be a string or {{ title, date }}")))
    }
}

fn object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ApiError> {
    value
        .as_object()
        .ok_or_else(|| invalid(format!("{path} must be an object")))
}

/// Checks every known field, trims strings and drops unknown keys. `null` values are skipped.
pub fn sanitize(body: &Value) -> Result<Map<String, Value>, ApiError> {
    let body = object(body, "body")?;
    let mut out = Map::new();

    for (key, value) in body {
        if value.is_null() {
            continue;
        }
        let key = key.as_str();
        let clean = match key {
            k if TEXT_FIELDS.contains(&k) => trimmed(value, k)?,
            "isMobileVerified" => match value {
                Value::Bool(_) => value.clone(),
                _ => return Err(invalid("isMobileVerified must be a boolean")),
            },
            "dob" => match value.as_str().and_then(crate::utils::database::parse_datetime) {
                Some(_) => value.clone(),
                None => return Err(invalid("dob must be a date")),
            },
            "gender" => one_of(value, key, GENDERS)?,
            "skills" | "hobbies" => string_list(value, key)?,
            "currentEducation" => {
                let mut edu = Map::new();
                for (field, v) in object(value, key)? {
                    let path = format!("currentEducation.{field}");
                    let v = match field.as_str() {
                        _ if v.is_null() => continue,
                        "institute" | "qualification" | "department" => trimmed(v, &path)?,
                        "yearOfStudying" => one_of(v, &path, YEARS_OF_STUDYING)?,
                        "yearOfPassing" => number(v, &path)?,
                        _ => continue,
                    };
                    edu.insert(field.clone(), v);
                }
                Value::Object(edu)
            }
            "jobPreferences" => {
                let mut prefs = Map::new();
                for (field, v) in object(value, key)? {
                    let path = format!("jobPreferences.{field}");
                    let v = match field.as_str() {
                        _ if v.is_null() => continue,
                        "minExpectedSalary" | "maxExpectedSalary" => number(v, &path)?,
                        "availability" => one_of(v, &path, AVAILABILITY)?,
                        "lookingFor" => one_of(v, &path, LOOKING_FOR)?,
                        "workPreference" => one_of(v, &path, WORK_PREFERENCES)?,
                        "yearsOfExperience" => match v {
                            Value::Number(_) => v.clone(),
                            Value::String(s) if !s.trim().is_empty() => v.clone(),
                            _ => {
                                return Err(invalid(
                                    "yearsOfExperience must be a number or a non-empty string",
                                ))
                            }
                        },
                        _ => continue,
                    };
                    prefs.insert(field.clone(), v);
                }
                Value::Object(prefs)
            }
            "socialLinks" => {
                let mut links = Map::new();
                for (field, v) in object(value, key)? {
                    match field.as_str() {
                        _ if v.is_null() => {}
                        "linkedinProfile" | "githubUrl" => {
                            links.insert(field.clone(), http_url(v, field)?);
                        }
                        _ => {}
                    }
                }
                Value::Object(links)
            }
            k if TITLED_LISTS.contains(&k) => match value {
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .map(|item| titled_item(item, k))
                        .collect::<Result<_, _>>()?,
                ),
                _ => return Err(invalid(format!("{k} must be an array"))),
            },
            "languages" => match value {
                Value::Array(items) => {
                    for item in items {
                        let has_name = item
                            .get("name")
                            .and_then(Value::as_str)
                            .is_some_and(|n| !n.trim().is_empty());
                        if !has_name {
                            return Err(invalid("languages items need a name"));
                        }
                        one_of(item.get("proficiency").unwrap_or(&Value::Null), "languages.proficiency", PROFICIENCY)?;
                    }
                    value.clone()
                }
                _ => return Err(invalid("languages must be an array")),
            },
            _ => continue,
        };
        out.insert(key.to_string(), clean);
    }

    if let Some(email) = out.get_mut("email") {
        if let Some(s) = email.as_str() {
            *email = Value::String(s.to_lowercase());
        }
    }
    if out
        .get("bio")
        .and_then(Value::as_str)
        .is_some_and(|b| b.chars().count() > MAX_BIO_LEN)
    {
        return Err(invalid(format!("bio cannot exceed {MAX_BIO_LEN} characters")));
    }
    Ok(out)
}

fn require_fields(data: &Map<String, Value>) -> Result<(), ApiError> {
    for field in ["fullName", "email", "mobileNumber"] {
        let present = data
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|v| !v.is_empty());
        if !present {
            return Err(invalid(format!("{field} is required")));
        }
    }
    Ok(())
}

fn email_of(data: &Map<String, Value>) -> String {
    data.get("email")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn duplicate_email(err: rusqlite::Error) -> ApiError {
    if is_unique_violation(&err) {
        invalid("Email already exists")
    } else {
        err.into()
    }
}

impl UserProfile {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
        Ok(UserProfile {
            id: row.get("id")?,
            email: row.get("email")?,
            data: json_column(row, "data")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, body: &Value) -> Result<UserProfile, ApiError> {
        let mut data = sanitize(body)?;
        require_fields(&data)?;
        data.entry("bio").or_insert_with(|| json!(""));
        data.entry("isMobileVerified").or_insert(Value::Bool(false));

        let stamp = now();
        let profile = UserProfile {
            id: new_id(),
            email: email_of(&data),
            data,
            created_at: stamp.clone(),
            updated_at: stamp,
        };
        conn.execute(
            "INSERT INTO user_profiles (id, email, data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![profile.id, profile.email, to_json(&profile.data)?, profile.created_at],
        )
        .map_err(duplicate_email)?;
        Ok(profile)
    }

    pub fn get(conn: &Connection, id: &str) -> rusqlite::Result<Option<UserProfile>> {
        conn.query_row("SELECT * FROM user_profiles WHERE id = ?1", [id], UserProfile::from_row)
            .optional()
    }

    pub fn get_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<UserProfile>> {
        conn.query_row(
            "SELECT * FROM user_profiles WHERE email = ?1",
            [email.trim().to_lowercase()],
            UserProfile::from_row,
        )
        .optional()
    }

    pub fn list(conn: &Connection) -> rusqlite::Result<Vec<UserProfile>> {
        let mut stmt = conn.prepare("SELECT * FROM user_profiles ORDER BY created_at DESC")?;
        let rows = stmt.query_map([], UserProfile::from_row)?;
        rows.collect()
    }

    /// Deep-merges `patch` into the stored document. Arrays are replaced.
    pub fn update(&mut self, conn: &Connection, patch: &Value) -> Result<(), ApiError> {
        let patch = sanitize(patch)?;
        if patch.is_empty() {
            return Err(invalid("No valid fields provided to update"));
        }

        let mut merged = Value::Object(self.data.clone());
        merge_json(&mut merged, &Value::Object(patch));
        let data = sanitize(&merged)?;
        require_fields(&data)?;

        let email = email_of(&data);
        let stamp = now();
        conn.execute(
            "UPDATE user_profiles SET email = ?1, data = ?2, updated_at = ?3 WHERE id = ?4",
            params![email, to_json(&data)?, stamp, self.id],
        )
        .map_err(duplicate_email)?;

        self.email = email;
        self.data = data;
        self.updated_at = stamp;
        Ok(())
    }

    pub fn delete(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
        Ok(conn.execute("DELETE FROM user_profiles WHERE id = ?1", [id])? > 0)
    }

    /// Creates the profile for a newly registered student, or refreshes the
    /// name and phone on an existing one.
    pub fn upsert_for_user(conn: &Connection, name: &str, email: &str, phone: &str) -> Result<UserProfile, ApiError> {
        let seed = json!({
            "fullName": name,
            "email": email,
            "mobileNumber": phone,
            "isMobileVerified": false,
        });
        match UserProfile::get_by_email(conn, email)? {
            Some(mut existing) => {
                existing.update(conn, &seed)?;
                Ok(existing)
            }
            None => UserProfile::create(conn, &seed),
        }
    }

    /// The subset shown on a student's public profile page.
    pub fn public_details(&self) -> Value {
        let field = |key: &str| self.data.get(key).cloned().unwrap_or(Value::Null);
        json!({
            "profileId": self.id,
            "fullName": field("fullName"),
            "profilePhoto": field("profilePhoto"),
            "bio": field("bio"),
            "currentCity": field("currentCity"),
            "skills": field("skills"),
            "socialLinks": field("socialLinks"),
            "resumeUrl": field("resumeUrl"),
        })
    }

    pub fn to_json(&self) -> Value {
        let mut out = self.data.clone();
        out.insert("id".into(), json!(self.id));
        out.insert("createdAt".into(), json!(self.created_at));
        out.insert("updatedAt".into(), json!(self.updated_at));
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::database::Database;

    fn body() -> Value {
        json!({
            "fullName": " Asha Rao ",
            "email": "Asha@Example.com",
            "mobileNumber": "9000000031",
            "skills": ["rust", " sql "],
            "jobPreferences": {"minExpectedSalary": 300000, "lookingFor": "Job"},
            "favouriteColour": "blue"
        })
    }

    #[test]
    fn create_trims_and_drops_unknown() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let profile = UserProfile::create(&conn, &body()).unwrap();
        assert_eq!(profile.email, "asha@example.com");
        assert_eq!(profile.data["fullName"], "Asha Rao");
        assert_eq!(profile.data["skills"], json!(["rust", "sql"]));
        assert!(!profile.data.contains_key("favouriteColour"));
        assert_eq!(profile.data["isMobileVerified"], false);

        let err = UserProfile::create(&conn, &body()).unwrap_err();
        assert_eq!(err.to_string(), "Email already exists");
    }

    #[test]
    fn strict_types() {
        let mut b = body();
        b["jobPreferences"]["minExpectedSalary"] = json!("300000");
        assert_eq!(
            sanitize(&b).unwrap_err().to_string(),
            "jobPreferences.minExpectedSalary must be a number"
        );

        let mut b = body();
        b["hobbies"] = json!(["chess", 3]);
        assert_eq!(sanitize(&b).unwrap_err().to_string(), "hobbies must be an array of strings");

        let mut b = body();
        b["bio"] = json!("x".repeat(MAX_BIO_LEN + 1));
        assert!(sanitize(&b).is_err());

        let mut b = body();
        b["socialLinks"] = json!({"githubUrl": "ftp://nope"});
        assert!(sanitize(&b).is_err());

        let mut b = body();
        b["certifications"] = json!(["AWS", {"title": "GATE", "date": "2025-02-01"}]);
        assert!(sanitize(&b).is_ok());

        let missing = json!({"fullName": "Asha"});
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        assert_eq!(
            UserProfile::create(&conn, &missing).unwrap_err().to_string(),
            "email is required"
        );
    }

    #[test]
    fn patch_merges_nested_objects() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let mut profile = UserProfile::create(&conn, &body()).unwrap();
        profile
            .update(&conn, &json!({"jobPreferences": {"maxExpectedSalary": 600000}, "skills": ["go"]}))
            .unwrap();

        let stored = UserProfile::get(&conn, &profile.id).unwrap().unwrap();
        assert_eq!(stored.data["jobPreferences"]["minExpectedSalary"], 300000);
        assert_eq!(stored.data["jobPreferences"]["maxExpectedSalary"], 600000);
        assert_eq!(stored.data["skills"], json!(["go"]));

        assert!(profile.update(&conn, &json!({"unknown": 1})).is_err());
    }

    #[test]
    fn upsert_refreshes_existing() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        UserProfile::create(&conn, &body()).unwrap();
        let profile = UserProfile::upsert_for_user(&conn, "Asha R", "asha@example.com", "9000000099").unwrap();
        assert_eq!(profile.data["mobileNumber"], "9000000099");
        assert_eq!(profile.data["skills"], json!(["rust", "sql"]));
        assert_eq!(UserProfile::list(&conn).unwrap().len(), 1);
    }
}
