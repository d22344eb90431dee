use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::data::users::{User, UserSummary};
use crate::error::ApiError;
use crate::utils::database::{new_id, now};
use crate::utils::enums::{Region, TicketStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub state: Region,
    pub created_by: String,
    pub assigned_to: Option<String>,
    pub completed_by: Option<String>,
    pub completed_at: Option<String>,
    pub resolution_note: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A ticket with the people involved filled in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub creator: Option<UserSummary>,
    pub assignee: Option<UserSummary>,
    pub completer: Option<UserSummary>,
}

impl Ticket {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
        Ok(Ticket {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            status: row.get("status")?,
            state: row.get("state")?,
            created_by: row.get("created_by")?,
            assigned_to: row.get("assigned_to")?,
            completed_by: row.get("completed_by")?,
            completed_at: row.get("completed_at")?,
            resolution_note: row.get("resolution_note")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, creator: &User, title: &str, description: Option<&str>) -> rusqlite::Result<Ticket> {
        let stamp = now();
        let ticket = Ticket {
            id: new_id(),
            title: title.trim().to_string(),
            description: description.map(str::trim).unwrap_or_default().to_string(),
            status: TicketStatus::Open,
            state: creator.state,
            created_by: creator.id.clone(),
            assigned_to: None,
            completed_by: None,
            completed_at: None,
            resolution_note: String::new(),
            created_at: stamp.clone(),
            updated_at: stamp,
        };
        conn.execute(
            "INSERT INTO tickets (id, title, description, status, state, created_by,
                                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                ticket.id,
                ticket.title,
                ticket.description,
                ticket.status,
                ticket.state,
                ticket.created_by,
                ticket.created_at
            ],
        )?;
        Ok(ticket)
    }

    pub fn get(conn: &Connection, id: &str) -> rusqlite::Result<Option<Ticket>> {
        conn.query_row("SELECT * FROM tickets WHERE id = ?1", [id], Ticket::from_row)
            .optional()
    }

    pub fn created_by(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<Ticket>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM tickets WHERE created_by = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([user_id], Ticket::from_row)?;
        rows.collect()
    }

    /// OPEN and IN_PROGRESS tickets, newest first.
    pub fn actionable(conn: &Connection) -> rusqlite::Result<Vec<Ticket>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM tickets WHERE status IN ('OPEN', 'IN_PROGRESS') ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], Ticket::from_row)?;
        rows.collect()
    }

    /// COMPLETED tickets, latest completion first.
    pub fn completed(conn: &Connection) -> rusqlite::Result<Vec<Ticket>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM tickets WHERE status = 'COMPLETED' ORDER BY completed_at DESC",
        )?;
        let rows = stmt.query_map([], Ticket::from_row)?;
        rows.collect()
    }

    /// Takes the ticket for `agent` and moves it to IN_PROGRESS.
    pub fn assign(&mut self, conn: &Connection, agent: &str) -> Result<(), ApiError> {
        if self.status == TicketStatus::Completed {
            return Err(ApiError::bad_request("Ticket already completed"));
        }
        self.assigned_to = Some(agent.to_string());
        self.status = TicketStatus::InProgress;
        self.updated_at = now();
        conn.execute(
            "UPDATE tickets SET assigned_to = ?1, status = ?2, updated_at = ?3 WHERE id = ?4",
            params![self.assigned_to, self.status, self.updated_at, self.id],
        )?;
        Ok(())
    }

    /// Closes the ticket. An empty or missing note keeps the previous one.
    pub fn complete(&mut self, conn: &Connection, agent: &str, note: Option<&str>) -> Result<(), ApiError> {
        if self.status == TicketStatus::Completed {
            return Err(ApiError::bad_request("Ticket already completed"));
        }
        let stamp = now();
        self.status = TicketStatus::Completed;
        self.completed_by = Some(agent.to_string());
        self.completed_at = Some(stamp.clone());
        if let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) {
            self.resolution_note = note.to_string();
        }
        self.updated_at = stamp;
        conn.execute(
            "UPDATE tickets SET status = ?1, completed_by = ?2, completed_at = ?3,
                                resolution_note = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                self.status,
                self.completed_by,
                self.completed_at,
                self.resolution_note,
                self.updated_at,
                self.id
            ],
        )?;
        Ok(())
    }

    pub fn with_people(self, conn: &Connection) -> rusqlite::Result<TicketView> {
        let lookup = |id: &Option<String>| -> rusqlite::Result<Option<UserSummary>> {
            match id {
                Some(id) => User::summary_by_id(conn, id),
                None => Ok(None),
            }
        };
        Ok(TicketView {
            creator: User::summary_by_id(conn, &self.created_by)?,
            assignee: lookup(&self.assigned_to)?,
            completer: lookup(&self.completed_by)?,
            ticket: self,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::database::Database;
    use crate::data::users::NewUser;
    use crate::utils::enums::Role;

    fn user(conn: &Connection, phone: &str, role: Role) -> User {
        NewUser::new("Someone", None, None, phone, role, Region::Telangana, None)
            .unwrap()
            .dump(conn)
            .unwrap()
    }

    #[test]
    fn open_to_in_progress_to_completed() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let student = user(&conn, "9000000001", Role::User);
        let agent = user(&conn, "9000000002", Role::Support);

        let mut ticket = Ticket::create(&conn, &student, "Hall ticket missing", None).unwrap();
        assert_eq!(ticket.state, Region::Telangana);
        assert_eq!(Ticket::actionable(&conn).unwrap().len(), 1);

        ticket.assign(&conn, &agent.id).unwrap();
        assert_eq!(ticket.status, TicketStatus::InProgress);
        ticket.complete(&conn, &agent.id, Some("Resent by email")).unwrap();
        assert!(ticket.assign(&conn, &agent.id).is_err());

        assert!(Ticket::actionable(&conn).unwrap().is_empty());
        let done = Ticket::completed(&conn).unwrap();
        assert_eq!(done[0].resolution_note, "Resent by email");
        assert!(done[0].completed_at.is_some());

        let view = done[0].clone().with_people(&conn).unwrap();
        assert_eq!(view.creator.unwrap().id, student.id);
        assert_eq!(view.completer.unwrap().id, agent.id);
    }

    #[test]
    fn empty_note_keeps_previous() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let student = user(&conn, "9000000001", Role::User);
        let mut ticket = Ticket::create(&conn, &student, "Issue", Some("  details ")).unwrap();
        assert_eq!(ticket.description, "details");
        ticket.resolution_note = "earlier".into();
        ticket.complete(&conn, "agent", Some("   ")).unwrap();
        assert_eq!(ticket.resolution_note, "earlier");
    }
}
