use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::data::users::User;
use crate::utils::database::{json_column, new_id, now, to_json};
use crate::utils::enums::{ConversationType, Role};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
}

impl Attachment {
    fn trimmed(self) -> Attachment {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Attachment {
            url: clean(self.url),
            kind: clean(self.kind),
            name: clean(self.name),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Sender {
    pub id: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub conversation_type: ConversationType,
    pub ticket: Option<String>,
    pub from: String,
    pub from_role: Role,
    pub message: String,
    pub attachments: Vec<Attachment>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,
}

impl ChatMessage {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
        Ok(ChatMessage {
            id: row.get("id")?,
            conversation_type: row.get("conversation_type")?,
            ticket: row.get("ticket_id")?,
            from: row.get("from_user")?,
            from_role: row.get("from_role")?,
            message: row.get("message")?,
            attachments: json_column(row, "attachments")?,
            created_at: row.get("created_at")?,
            sender: None,
        })
    }

    /// Stores a message from `sender`. `message` must already be non-empty.
    pub fn send(
        conn: &Connection,
        conversation: ConversationType,
        ticket: Option<&str>,
        sender: &User,
        message: &str,
        attachments: Vec<Attachment>,
    ) -> rusqlite::Result<ChatMessage> {
        let chat = ChatMessage {
            id: new_id(),
            conversation_type: conversation,
            ticket: ticket.map(str::to_string),
            from: sender.id.clone(),
            from_role: sender.role,
            message: message.trim().to_string(),
            attachments: attachments.into_iter().map(Attachment::trimmed).collect(),
            created_at: now(),
            sender: None,
        };
        conn.execute(
            "INSERT INTO chat_messages (id, conversation_type, ticket_id, from_user, from_role,
                                        message, attachments, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                chat.id,
                chat.conversation_type,
                chat.ticket,
                chat.from,
                chat.from_role,
                chat.message,
                to_json(&chat.attachments)?,
                chat.created_at
            ],
        )?;
        Ok(chat)
    }

    /// Oldest first, each with the sender's name and role.
    pub fn history(
        conn: &Connection,
        conversation: ConversationType,
        ticket: Option<&str>,
    ) -> rusqlite::Result<Vec<ChatMessage>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM chat_messages
             WHERE conversation_type = ?1 AND ticket_id IS ?2
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let mut messages = stmt
            .query_map(params![conversation, ticket], ChatMessage::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for message in &mut messages {
            message.sender = User::get_by_id(conn, &message.from)?.map(|u| Sender {
                id: u.id,
                name: u.name,
                role: u.role,
            });
        }
        Ok(messages)
    }
}
