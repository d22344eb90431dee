use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{is_unique_violation, ApiError};
use crate::utils::database::{json_column, like_pattern, new_id, now, to_json};
use crate::utils::encrypt;
use crate::utils::enums::{Region, Role, Tier};

/// Paid-plan badge information shown next to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Plan {
    pub name: String,
    pub is_paid: bool,
    pub started_at: Option<String>,
    pub expires_at: Option<String>,
}

impl Default for Plan {
    fn default() -> Self {
        Plan {
            name: Tier::Free.as_str().to_string(),
            is_paid: false,
            started_at: None,
            expires_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub phone: String,
    pub role: Role,
    pub state: Region,
    pub profile_image: Option<String>,
    pub tier: Tier,
    pub plan: Plan,
    pub has_paid_plan: bool,
    pub is_paid: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// The small author card embedded in posts, comments, follows and tickets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub role: Role,
    pub state: Region,
    pub profile_image: Option<String>,
}

const USER_COLUMNS: &str = "id, name, email, password, phone, role, state, profile_image, tier, \
     plan, has_paid_plan, is_paid, created_at, updated_at";

impl User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            password: row.get("password")?,
            phone: row.get("phone")?,
            role: row.get("role")?,
            state: row.get("state")?,
            profile_image: row.get("profile_image")?,
            tier: row.get("tier")?,
            plan: json_column(row, "plan")?,
            has_paid_plan: row.get("has_paid_plan")?,
            is_paid: row.get("is_paid")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: self.role,
            state: self.state,
            profile_image: self.profile_image.clone(),
        }
    }

    /// Public view returned by the auth endpoints.
    pub fn public_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "email": self.email,
            "phone": self.phone,
            "role": self.role,
            "state": self.state,
            "tier": self.tier,
        })
    }

    pub fn get_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            User::from_row,
        )
        .optional()
    }

    pub fn get_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            [email.trim().to_lowercase()],
            User::from_row,
        )
        .optional()
    }

    pub fn get_by_phone(conn: &Connection, phone: &str) -> rusqlite::Result<Option<User>> {
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE phone = ?1"),
            [phone.trim()],
            User::from_row,
        )
        .optional()
    }

    /// Loads summaries for `ids`, keeping the order of `ids` and skipping unknown ones.
    pub fn summaries(conn: &Connection, ids: &[String]) -> rusqlite::Result<Vec<UserSummary>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = User::get_by_id(conn, id)? {
                out.push(user.summary());
            }
        }
        Ok(out)
    }

    pub fn summary_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<UserSummary>> {
        Ok(User::get_by_id(conn, id)?.map(|u| u.summary()))
    }

    pub fn set_profile_image(conn: &Connection, id: &str, image: &str) -> rusqlite::Result<()> {
        conn.execute(
            "UPDATE users SET profile_image = ?1, updated_at = ?2 WHERE id = ?3",
            params![image, now(), id],
        )?;
        Ok(())
    }

    /// Records a captured payment: new tier plus the paid-plan badge.
    pub fn apply_tier(&mut self, conn: &Connection, tier: Tier) -> rusqlite::Result<()> {
        let stamp = now();
        self.tier = tier;
        self.plan = Plan {
            name: tier.as_str().to_string(),
            is_paid: true,
            started_at: Some(stamp.clone()),
            expires_at: None,
        };
        self.has_paid_plan = true;
        self.is_paid = true;
        self.updated_at = stamp;
        conn.execute(
            "UPDATE users SET tier = ?1, plan = ?2, has_paid_plan = 1, is_paid = 1, updated_at = ?3
             WHERE id = ?4",
            params![self.tier, to_json(&self.plan)?, self.updated_at, self.id],
        )?;
        Ok(())
    }

    /// Name/email substring search used by the people search bar.
    pub fn search(
        conn: &Connection,
        query: &str,
        role: Option<Role>,
        limit: i64,
        offset: i64,
    ) -> rusqlite::Result<(i64, Vec<User>)> {
        let pattern = like_pattern(query);
        let role = role.map(|r| r.as_str());
        let filter = "(name LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\')
             AND (?2 IS NULL OR role = ?2)";

        let total = conn.query_row(
            &format!("SELECT COUNT(*) FROM users WHERE {filter}"),
            params![pattern, role],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {filter}
             ORDER BY name COLLATE NOCASE ASC LIMIT ?3 OFFSET ?4"
        ))?;
        let users = stmt
            .query_map(params![pattern, role, limit, offset], User::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((total, users))
    }
}

/// A user about to be created. The password is hashed on construction.
#[derive(Debug)]
pub struct NewUser {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: String,
    pub role: Role,
    pub state: Region,
}

impl NewUser {
    pub fn new(
        name: &str,
        email: Option<&str>,
        password: Option<&str>,
        phone: &str,
        role: Role,
        state: Region,
        pepper: Option<&str>,
    ) -> Result<NewUser, ApiError> {
        let password = match password {
            Some(plain) => Some(encrypt::hash_password(plain, pepper)?),
            None => None,
        };

        Ok(NewUser {
            id: new_id(),
            name: name.trim().to_string(),
            email: email
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty()),
            password,
            phone: phone.trim().to_string(),
            role,
            state,
        })
    }

    /// Inserts the user. A duplicate phone or email is a 409.
    pub fn dump(self, conn: &Connection) -> Result<User, ApiError> {
        let stamp = now();
        let plan = Plan::default();
        let result = conn.execute(
            "INSERT INTO users (id, name, email, password, phone, role, state, tier, plan,
                                has_paid_plan, is_paid, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 0, ?10, ?10)",
            params![
                self.id,
                self.name,
                self.email,
                self.password,
                self.phone,
                self.role,
                self.state,
                Tier::Free,
                to_json(&plan)?,
                stamp
            ],
        );

        match result {
            Ok(_) => {
                tracing::info!(user_id = %self.id, role = %self.role, "Created user");
                Ok(User {
                    id: self.id,
                    name: self.name,
                    email: self.email,
                    password: self.password,
                    phone: self.phone,
                    role: self.role,
                    state: self.state,
                    profile_image: None,
                    tier: Tier::Free,
                    plan,
                    has_paid_plan: false,
                    is_paid: false,
                    created_at: stamp.clone(),
                    updated_at: stamp,
                })
            }
            Err(e) if is_unique_violation(&e) => Err(ApiError::Conflict(
                "An account with this phone or email already exists".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

/// Creates or refreshes a staff account, keyed by email or phone. Used by the seed binary.
pub fn upsert_staff(conn: &Connection, new: NewUser) -> Result<(User, bool), ApiError> {
    let existing = match new.email.as_deref() {
        Some(email) => User::get_by_email(conn, email)?,
        None => None,
    };
    let existing = match existing {
        Some(user) => Some(user),
        None => User::get_by_phone(conn, &new.phone)?,
    };

    match existing {
        Some(user) => {
            conn.execute(
                "UPDATE users SET name = ?1, email = ?2, password = ?3, role = ?4, state = ?5,
                                  updated_at = ?6
                 WHERE id = ?7",
                params![new.name, new.email, new.password, new.role, new.state, now(), user.id],
            )?;
            let refreshed = User::get_by_id(conn, &user.id)?
                .ok_or_else(|| ApiError::not_found("User not found"))?;
            Ok((refreshed, false))
        }
        None => Ok((new.dump(conn)?, true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::database::Database;

    fn student(phone: &str, email: Option<&str>) -> NewUser {
        NewUser::new(
            "Asha Rao",
            email,
            Some("secret1"),
            phone,
            Role::User,
            Region::Telangana,
            None,
        )
        .unwrap()
    }

    #[test]
    fn dump_then_lookup() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let user = student("9000000010", Some(" Asha@Example.com ")).dump(&conn).unwrap();
        assert_eq!(user.email.as_deref(), Some("asha@example.com"));

        let by_email = User::get_by_email(&conn, "ASHA@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.tier, Tier::Free);
        assert!(!by_email.plan.is_paid);
        assert!(User::get_by_phone(&conn, "9000000010").unwrap().is_some());
    }

    #[test]
    fn duplicate_phone_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        student("9000000011", None).dump(&conn).unwrap();
        let err = student("9000000011", None).dump(&conn).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn users_without_email_do_not_collide() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        student("9000000012", None).dump(&conn).unwrap();
        student("9000000013", None).dump(&conn).unwrap();
    }

    #[test]
    fn apply_tier_marks_plan_paid() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let mut user = student("9000000014", None).dump(&conn).unwrap();
        user.apply_tier(&conn, Tier::NineRupee).unwrap();

        let stored = User::get_by_id(&conn, &user.id).unwrap().unwrap();
        assert_eq!(stored.tier, Tier::NineRupee);
        assert_eq!(stored.plan.name, "9_RUPEE");
        assert!(stored.plan.is_paid && stored.has_paid_plan && stored.is_paid);
    }

    #[test]
    fn search_filters_by_role() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        student("9000000015", Some("asha@example.com")).dump(&conn).unwrap();
        NewUser::new("Asha Tech", Some("hr@ashatech.in"), Some("secret1"), "9000000016", Role::Company, Region::AndhraPradesh, None)
            .unwrap()
            .dump(&conn)
            .unwrap();

        let (total, _) = User::search(&conn, "asha", None, 10, 0).unwrap();
        assert_eq!(total, 2);
        let (total, users) = User::search(&conn, "asha", Some(Role::Company), 10, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(users[0].name, "Asha Tech");
    }
}
