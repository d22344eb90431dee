use actix_web::HttpRequest;
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use serde_json::Value;

use crate::data::users::{User, UserSummary};
use crate::utils::database::{json_column, new_id, now};
use crate::utils::enums::{ActivityAction, ResourceType, Role};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    pub user_role: Role,
    pub user_name: String,
    pub action: ActivityAction,
    pub resource_type: ResourceType,
    pub resource_id: Option<String>,
    pub description: String,
    pub metadata: Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

/// Where a request came from, captured before the handler drops the request.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn from_request(req: &HttpRequest) -> RequestMeta {
        RequestMeta {
            ip_address: req
                .connection_info()
                .realip_remote_addr()
                .map(str::to_string),
            user_agent: req
                .headers()
                .get(actix_web::http::header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }
}

/// Dashboard filters. Dates are already normalised timestamps.
#[derive(Debug, Default)]
pub struct ActivityFilter {
    pub role: Option<Role>,
    pub action: Option<ActivityAction>,
    pub resource_type: Option<ResourceType>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub total_activities: i64,
    pub by_role: Vec<GroupCount>,
    pub by_action: Vec<GroupCount>,
    pub by_resource_type: Vec<GroupCount>,
    pub recent_activities: Vec<Activity>,
}

const FILTER: &str = "(?1 IS NULL OR user_role = ?1)
     AND (?2 IS NULL OR action = ?2)
     AND (?3 IS NULL OR resource_type = ?3)
     AND (?4 IS NULL OR created_at >= ?4)
     AND (?5 IS NULL OR created_at <= ?5)";

/// Records an activity. Failures are logged and otherwise ignored.
#[allow(clippy::too_many_arguments)]
pub fn log(
    conn: &Connection,
    actor: &User,
    action: ActivityAction,
    resource_type: ResourceType,
    resource_id: Option<&str>,
    description: impl Into<String>,
    metadata: Value,
    meta: &RequestMeta,
) {
    let result = conn.execute(
        "INSERT INTO activities (id, user_id, user_role, user_name, action, resource_type,
                                 resource_id, description, metadata, ip_address, user_agent,
                                 created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            new_id(),
            actor.id,
            actor.role,
            actor.name,
            action,
            resource_type,
            resource_id,
            description.into().trim(),
            metadata.to_string(),
            meta.ip_address,
            meta.user_agent,
            now()
        ],
    );
    if let Err(e) = result {
        tracing::warn!(error = %e, action = %action, user_id = %actor.id, "Activity logging error");
    }
}

impl Activity {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
        Ok(Activity {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            user_role: row.get("user_role")?,
            user_name: row.get("user_name")?,
            action: row.get("action")?,
            resource_type: row.get("resource_type")?,
            resource_id: row.get("resource_id")?,
            description: row.get("description")?,
            metadata: json_column(row, "metadata")?,
            ip_address: row.get("ip_address")?,
            user_agent: row.get("user_agent")?,
            created_at: row.get("created_at")?,
            user: None,
        })
    }

    fn with_users(conn: &Connection, mut activities: Vec<Activity>) -> rusqlite::Result<Vec<Activity>> {
        for activity in &mut activities {
            activity.user = User::summary_by_id(conn, &activity.user_id)?;
        }
        Ok(activities)
    }

    /// Newest first, with the acting user attached.
    pub fn dashboard(
        conn: &Connection,
        filter: &ActivityFilter,
        limit: i64,
        offset: i64,
    ) -> rusqlite::Result<(i64, Vec<Activity>)> {
        let total = conn.query_row(
            &format!("SELECT COUNT(*) FROM activities WHERE {FILTER}"),
            params![
                filter.role,
                filter.action,
                filter.resource_type,
                filter.start,
                filter.end
            ],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM activities WHERE {FILTER}
             ORDER BY created_at DESC, rowid DESC LIMIT ?6 OFFSET ?7"
        ))?;
        let activities = stmt
            .query_map(
                params![
                    filter.role,
                    filter.action,
                    filter.resource_type,
                    filter.start,
                    filter.end,
                    limit,
                    offset
                ],
                Activity::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((total, Activity::with_users(conn, activities)?))
    }

    pub fn for_user(
        conn: &Connection,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> rusqlite::Result<(i64, Vec<Activity>)> {
        let total = conn.query_row(
            "SELECT COUNT(*) FROM activities WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(
            "SELECT * FROM activities WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
        )?;
        let activities = stmt
            .query_map(params![user_id, limit, offset], Activity::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((total, Activity::with_users(conn, activities)?))
    }

    /// Totals grouped by role, action and resource type within the date range.
    pub fn stats(conn: &Connection, start: Option<&str>, end: Option<&str>) -> rusqlite::Result<ActivityStats> {
        let range = "(?1 IS NULL OR created_at >= ?1) AND (?2 IS NULL OR created_at <= ?2)";
        let group = |column: &str| -> rusqlite::Result<Vec<GroupCount>> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {column}, COUNT(*) AS n FROM activities WHERE {range}
                 GROUP BY {column} ORDER BY n DESC, {column} ASC"
            ))?;
            let rows = stmt.query_map(params![start, end], |row| {
                Ok(GroupCount {
                    key: row.get(0)?,
                    count: row.get(1)?,
                })
            })?;
            rows.collect()
        };

        let total_activities = conn.query_row(
            &format!("SELECT COUNT(*) FROM activities WHERE {range}"),
            params![start, end],
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM activities WHERE {range} ORDER BY created_at DESC, rowid DESC LIMIT 10"
        ))?;
        let recent = stmt
            .query_map(params![start, end], Activity::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ActivityStats {
            total_activities,
            by_role: group("user_role")?,
            by_action: group("action")?,
            by_resource_type: group("resource_type")?,
            recent_activities: Activity::with_users(conn, recent)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::database::Database;
    use crate::data::users::NewUser;
    use crate::utils::enums::Region;
    use serde_json::json;

    fn user(conn: &Connection, phone: &str, role: Role) -> User {
        NewUser::new("Someone", None, None, phone, role, Region::Telangana, None)
            .unwrap()
            .dump(conn)
            .unwrap()
    }

    #[test]
    fn dashboard_filters_and_stats() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let student = user(&conn, "9000000041", Role::User);
        let agent = user(&conn, "9000000042", Role::Support);
        let meta = RequestMeta::default();

        log(&conn, &student, ActivityAction::Login, ResourceType::Auth, None, "login", json!({}), &meta);
        log(&conn, &student, ActivityAction::TicketCreate, ResourceType::Ticket, Some("t1"), "", json!({"title": "x"}), &meta);
        log(&conn, &agent, ActivityAction::Login, ResourceType::Auth, None, "login", json!({}), &meta);

        let filter = ActivityFilter {
            action: Some(ActivityAction::Login),
            ..ActivityFilter::default()
        };
        let (total, rows) = Activity::dashboard(&conn, &filter, 50, 0).unwrap();
        assert_eq!(total, 2);
        assert!(rows.iter().all(|a| a.user.is_some()));

        let (total, rows) = Activity::for_user(&conn, &student.id, 50, 0).unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].action, ActivityAction::TicketCreate);
        assert_eq!(rows[0].metadata["title"], "x");

        let stats = Activity::stats(&conn, None, None).unwrap();
        assert_eq!(stats.total_activities, 3);
        assert_eq!(stats.by_role[0].key, "USER");
        assert_eq!(stats.by_role[0].count, 2);
        assert_eq!(stats.by_action[0].key, "LOGIN");
        assert_eq!(stats.recent_activities.len(), 3);

        let stats = Activity::stats(&conn, Some("2999-01-01T00:00:00.000000Z"), None).unwrap();
        assert_eq!(stats.total_activities, 0);
    }
}
