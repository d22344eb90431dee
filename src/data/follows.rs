use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::data::users::{User, UserSummary};
use crate::utils::database::{new_id, now};

/// One row of a followers or following list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follower: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following: Option<UserSummary>,
    pub created_at: String,
}

pub fn is_following(conn: &Connection, follower: &str, following: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM follows WHERE follower_id = ?1 AND following_id = ?2",
        [follower, following],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

/// Follows when not following yet, unfollows otherwise. Returns the new state.
pub fn toggle(conn: &Connection, follower: &str, following: &str) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
        [follower, following],
    )?;
    if removed > 0 {
        return Ok(false);
    }
    conn.execute(
        "INSERT OR IGNORE INTO follows (id, follower_id, following_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![new_id(), follower, following, now()],
    )?;
    Ok(true)
}

pub fn followers_count(conn: &Connection, user_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM follows WHERE following_id = ?1",
        [user_id],
        |row| row.get(0),
    )
}

pub fn following_count(conn: &Connection, user_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
        [user_id],
        |row| row.get(0),
    )
}

/// Who follows `user_id`, newest first.
pub fn followers(
    conn: &Connection,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> rusqlite::Result<(i64, Vec<FollowEntry>)> {
    list(conn, user_id, true, limit, offset)
}

/// Whom `user_id` follows, newest first.
pub fn following(
    conn: &Connection,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> rusqlite::Result<(i64, Vec<FollowEntry>)> {
    list(conn, user_id, false, limit, offset)
}

fn list(
    conn: &Connection,
    user_id: &str,
    followers: bool,
    limit: i64,
    offset: i64,
) -> rusqlite::Result<(i64, Vec<FollowEntry>)> {
    let (filter, other) = if followers {
        ("following_id", "follower_id")
    } else {
        ("follower_id", "following_id")
    };
    let total = conn.query_row(
        &format!("SELECT COUNT(*) FROM follows WHERE {filter} = ?1"),
        [user_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT id, {other}, created_at FROM follows WHERE {filter} = ?1
         ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt
        .query_map(params![user_id, limit, offset], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut entries = Vec::with_capacity(rows.len());
    for (id, other_id, created_at) in rows {
        let person = User::summary_by_id(conn, &other_id)?;
        let (follower, following) = if followers { (person, None) } else { (None, person) };
        entries.push(FollowEntry {
            id,
            follower,
            following,
            created_at,
        });
    }
    Ok((total, entries))
}
