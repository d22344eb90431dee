use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};

use crate::data::users::User;
use crate::error::ApiError;
use crate::utils::database::{json_column, like_pattern, new_id, now, to_json};
use crate::utils::enums::VerificationStatus;

/// Keys a company may never set on its own profile.
const PROTECTED_FIELDS: &[&str] = &[
    "id",
    "companyId",
    "userId",
    "email",
    "verificationStatus",
    "verifiedBy",
    "verifiedAt",
    "verificationNote",
    "createdAt",
    "updatedAt",
];

/// A recruiter's company profile. Searchable fields are columns, the rest of
/// the (large, optional) profile lives in `profile`.
#[derive(Debug, Clone)]
pub struct Company {
    pub id: String,
    pub user_id: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub account_type: String,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub website: Option<String>,
    pub verification_status: VerificationStatus,
    pub verified_by: Option<String>,
    pub verified_at: Option<String>,
    pub verification_note: Option<String>,
    pub profile: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default)]
pub struct CompanySearch {
    pub q: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub verification_status: Option<VerificationStatus>,
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl Company {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Company> {
        Ok(Company {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            email: row.get("email")?,
            phone_number: row.get("phone_number")?,
            account_type: row.get("account_type")?,
            company_name: row.get("company_name")?,
            industry: row.get("industry")?,
            company_size: row.get("company_size")?,
            website: row.get("website")?,
            verification_status: row.get("verification_status")?,
            verified_by: row.get("verified_by")?,
            verified_at: row.get("verified_at")?,
            verification_note: row.get("verification_note")?,
            profile: json_column(row, "profile")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Minimal pending profile for a recruiter account.
    pub fn create_pending(conn: &Connection, owner: &User, company_name: Option<&str>) -> rusqlite::Result<Company> {
        let stamp = now();
        let company = Company {
            id: new_id(),
            user_id: owner.id.clone(),
            email: owner.email.clone(),
            phone_number: Some(owner.phone.clone()),
            account_type: "company".to_string(),
            company_name: company_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .or_else(|| Some(owner.name.clone())),
            industry: None,
            company_size: None,
            website: None,
            verification_status: VerificationStatus::Pending,
            verified_by: None,
            verified_at: None,
            verification_note: None,
            profile: Map::new(),
            created_at: stamp.clone(),
            updated_at: stamp,
        };
        conn.execute(
            "INSERT INTO companies (id, user_id, email, phone_number, account_type, company_name,
                                    verification_status, profile, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '{}', ?8, ?8)",
            params![
                company.id,
                company.user_id,
                company.email,
                company.phone_number,
                company.account_type,
                company.company_name,
                company.verification_status,
                company.created_at
            ],
        )?;
        tracing::info!(company_id = %company.id, user_id = %owner.id, "Created pending company profile");
        Ok(company)
    }

    pub fn get(conn: &Connection, id: &str) -> rusqlite::Result<Option<Company>> {
        conn.query_row("SELECT * FROM companies WHERE id = ?1", [id], Company::from_row)
            .optional()
    }

    pub fn get_by_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<Company>> {
        conn.query_row(
            "SELECT * FROM companies WHERE user_id = ?1 ORDER BY created_at ASC LIMIT 1",
            [user_id],
            Company::from_row,
        )
        .optional()
    }

    pub fn get_or_create(conn: &Connection, owner: &User) -> rusqlite::Result<Company> {
        match Company::get_by_user(conn, &owner.id)? {
            Some(company) => Ok(company),
            None => Company::create_pending(conn, owner, None),
        }
    }

    /// Applies an owner edit. Protected keys are dropped; a verified profile
    /// goes back to pending. Returns whether that reset happened.
    pub fn apply_owner_update(&mut self, patch: Map<String, Value>) -> Result<bool, ApiError> {
        for (key, value) in patch {
            if PROTECTED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            match key.as_str() {
                "phoneNumber" => self.phone_number = text(Some(&value)),
                "companyName" => self.company_name = text(Some(&value)),
                "industry" => self.industry = text(Some(&value)),
                "companySize" => self.company_size = text(Some(&value)),
                "website" => self.website = text(Some(&value)),
                "accountType" => match value.as_str() {
                    Some(kind @ ("individual" | "company")) => self.account_type = kind.to_string(),
                    _ => {
                        return Err(ApiError::bad_request(
                            "accountType must be one of individual, company",
                        ))
                    }
                },
                _ => {
                    self.profile.insert(key, value);
                }
            }
        }

        let was_verified = self.verification_status == VerificationStatus::Verified;
        if was_verified {
            self.verification_status = VerificationStatus::Pending;
            self.verified_by = None;
            self.verified_at = None;
        }
        self.updated_at = now();
        Ok(was_verified)
    }

    /// Recruiter photo, if the profile has one.
    pub fn recruiter_photo(&self) -> Option<String> {
        text(self.profile.get("recruiter").and_then(|r| r.get("photo")))
    }

    /// Super-admin decision. VERIFIED stamps the reviewer, anything else clears it.
    pub fn set_verification(&mut self, status: VerificationStatus, reviewer: &str, reason: Option<&str>) {
        self.verification_status = status;
        if status == VerificationStatus::Verified {
            self.verified_by = Some(reviewer.to_string());
            self.verified_at = Some(now());
        } else {
            self.verified_by = None;
            self.verified_at = None;
        }
        if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
            self.verification_note = Some(reason.to_string());
        }
        self.updated_at = now();
    }

    pub fn save(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "UPDATE companies SET phone_number = ?1, account_type = ?2, company_name = ?3,
                 industry = ?4, company_size = ?5, website = ?6, verification_status = ?7,
                 verified_by = ?8, verified_at = ?9, verification_note = ?10, profile = ?11,
                 updated_at = ?12
             WHERE id = ?13",
            params![
                self.phone_number,
                self.account_type,
                self.company_name,
                self.industry,
                self.company_size,
                self.website,
                self.verification_status,
                self.verified_by,
                self.verified_at,
                self.verification_note,
                to_json(&self.profile)?,
                self.updated_at,
                self.id
            ],
        )?;
        Ok(())
    }

    /// Case-insensitive substring search over the admin dashboard filters, newest first.
    pub fn search(
        conn: &Connection,
        query: &CompanySearch,
        limit: i64,
        offset: i64,
    ) -> rusqlite::Result<(i64, Vec<Company>)> {
        let q = query.q.as_deref().map(like_pattern);
        let location = query.location.as_deref().map(like_pattern);
        let filter = "(?1 IS NULL OR industry = ?1 COLLATE NOCASE)
             AND (?2 IS NULL OR verification_status = ?2)
             AND (?3 IS NULL
                  OR json_extract(profile, '$.headquarters.city') LIKE ?3 ESCAPE '\\'
                  OR json_extract(profile, '$.headquarters.state') LIKE ?3 ESCAPE '\\'
                  OR json_extract(profile, '$.headquarters.country') LIKE ?3 ESCAPE '\\'
                  OR company_size LIKE ?3 ESCAPE '\\')
             AND (?4 IS NULL
                  OR company_name LIKE ?4 ESCAPE '\\'
                  OR json_extract(profile, '$.about') LIKE ?4 ESCAPE '\\'
                  OR json_extract(profile, '$.products') LIKE ?4 ESCAPE '\\'
                  OR json_extract(profile, '$.tagline') LIKE ?4 ESCAPE '\\')";
        let industry = query.industry.as_deref();
        let status = query.verification_status;

        let total = conn.query_row(
            &format!("SELECT COUNT(*) FROM companies WHERE {filter}"),
            params![industry, status, location, q],
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM companies WHERE {filter}
             ORDER BY created_at DESC LIMIT ?5 OFFSET ?6"
        ))?;
        let companies = stmt
            .query_map(
                params![industry, status, location, q, limit, offset],
                Company::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((total, companies))
    }

    /// Full profile document: the free-form fields plus the columns.
    pub fn to_json(&self) -> Value {
        let mut doc = self.profile.clone();
        let columns = serde_json::json!({
            "id": self.id,
            "userId": self.user_id,
            "email": self.email,
            "phoneNumber": self.phone_number,
            "accountType": self.account_type,
            "companyName": self.company_name,
            "industry": self.industry,
            "companySize": self.company_size,
            "website": self.website,
            "verificationStatus": self.verification_status,
            "verifiedBy": self.verified_by,
            "verifiedAt": self.verified_at,
            "verificationNote": self.verification_note,
            "createdAt": self.created_at,
            "updatedAt": self.updated_at,
        });
        if let Value::Object(columns) = columns {
            doc.extend(columns);
        }
        Value::Object(doc)
    }

    /// Row shown in the admin search results.
    pub fn summary_json(&self) -> Value {
        serde_json::json!({
            "companyId": self.id,
            "companyName": self.company_name,
            "email": self.email,
            "phoneNumber": self.phone_number,
            "industry": self.industry,
            "companySize": self.company_size,
            "website": self.website,
            "verificationStatus": self.verification_status,
            "verifiedBy": self.verified_by,
            "verifiedAt": self.verified_at,
            "createdAt": self.created_at,
        })
    }

    /// Card shown on a recruiter's public profile.
    pub fn details_json(&self) -> Value {
        serde_json::json!({
            "companyId": self.id,
            "companyName": self.company_name,
            "industry": self.industry,
            "website": self.website,
            "logo": self.profile.get("logo"),
            "tagline": self.profile.get("tagline"),
            "about": self.profile.get("about"),
            "recruiter": self.profile.get("recruiter"),
            "verificationStatus": self.verification_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::database::Database;
    use crate::data::users::NewUser;
    use crate::utils::enums::{Region, Role};
    use serde_json::json;

    fn recruiter(conn: &Connection, phone: &str, email: &str) -> User {
        NewUser::new("Hiring Team", Some(email), Some("secret1"), phone, Role::Company, Region::Telangana, None)
            .unwrap()
            .dump(conn)
            .unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn owner_cannot_touch_verification() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let owner = recruiter(&conn, "9000000001", "hr@acme.in");
        let mut company = Company::create_pending(&conn, &owner, Some("Acme")).unwrap();
        company.set_verification(VerificationStatus::Verified, "super-1", None);
        company.save(&conn).unwrap();

        let reset = company
            .apply_owner_update(object(json!({
                "verificationStatus": "verified",
                "userId": "someone-else",
                "industry": "Software",
                "headquarters": {"city": "Hyderabad"},
                "recruiter": {"photo": " https://cdn/p.jpg "}
            })))
            .unwrap();
        company.save(&conn).unwrap();

        assert!(reset);
        let stored = Company::get(&conn, &company.id).unwrap().unwrap();
        assert_eq!(stored.verification_status, VerificationStatus::Pending);
        assert!(stored.verified_by.is_none() && stored.verified_at.is_none());
        assert_eq!(stored.user_id, owner.id);
        assert_eq!(stored.industry.as_deref(), Some("Software"));
        assert_eq!(stored.recruiter_photo().as_deref(), Some("https://cdn/p.jpg"));
    }

    #[test]
    fn rejection_keeps_reason_and_clears_reviewer() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let owner = recruiter(&conn, "9000000001", "hr@acme.in");
        let mut company = Company::create_pending(&conn, &owner, None).unwrap();
        assert_eq!(company.company_name.as_deref(), Some("Hiring Team"));

        company.set_verification(VerificationStatus::Verified, "super-1", None);
        company.set_verification(VerificationStatus::Rejected, "super-1", Some(" GST mismatch "));
        assert!(company.verified_by.is_none());
        assert_eq!(company.verification_note.as_deref(), Some("GST mismatch"));
    }

    #[test]
    fn search_matches_name_location_and_status() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let a = recruiter(&conn, "9000000001", "a@acme.in");
        let b = recruiter(&conn, "9000000002", "b@beta.in");
        let mut acme = Company::create_pending(&conn, &a, Some("Acme Labs")).unwrap();
        acme.apply_owner_update(object(json!({"headquarters": {"city": "Hyderabad"}})))
            .unwrap();
        acme.save(&conn).unwrap();
        let mut beta = Company::create_pending(&conn, &b, Some("Beta Works")).unwrap();
        beta.set_verification(VerificationStatus::Verified, "super-1", None);
        beta.save(&conn).unwrap();

        let by_name = CompanySearch {
            q: Some("acme".into()),
            ..CompanySearch::default()
        };
        assert_eq!(Company::search(&conn, &by_name, 10, 0).unwrap().0, 1);

        let by_city = CompanySearch {
            location: Some("hyder".into()),
            ..CompanySearch::default()
        };
        let (total, found) = Company::search(&conn, &by_city, 10, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].id, acme.id);

        let verified = CompanySearch {
            verification_status: Some(VerificationStatus::Verified),
            ..CompanySearch::default()
        };
        let (_, found) = Company::search(&conn, &verified, 10, 0).unwrap();
        assert_eq!(found[0].id, beta.id);
    }
}
