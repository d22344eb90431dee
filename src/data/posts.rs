use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::data::users::{User, UserSummary};
use crate::error::ApiError;
use crate::utils::database::{json_column, new_id, now, to_json};

pub const MAX_TEXT_LEN: usize = 2000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkPreview {
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl LinkPreview {
    /// Trims every field; a preview without a URL is dropped.
    pub fn cleaned(self) -> Option<LinkPreview> {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let url = clean(self.url)?;
        Some(LinkPreview {
            url: Some(url),
            title: clean(self.title),
            description: clean(self.description),
            image: clean(self.image),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    pub user: String,
    pub shared_post: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub text: Option<String>,
    pub link_preview: Option<LinkPreview>,
    pub likes: Vec<String>,
    pub saves: Vec<String>,
    pub comments_count: i64,
    pub share_count: i64,
    pub shared_from: Option<String>,
    pub shares: Vec<Share>,
    pub created_at: String,
    pub updated_at: String,
}

/// What the feed and profile pages render.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub author: Option<UserSummary>,
    pub text: Option<String>,
    pub link_preview: Option<LinkPreview>,
    pub likes_count: usize,
    pub saves_count: usize,
    pub comments_count: i64,
    pub share_count: i64,
    pub shared_from: Option<String>,
    pub liked: bool,
    pub saved: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post: String,
    pub author_id: String,
    pub body: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
}

/// Text is trimmed, at most 2000 chars; a post needs text or a link.
pub fn validate_content(
    text: Option<&str>,
    link_preview: Option<LinkPreview>,
) -> Result<(Option<String>, Option<LinkPreview>), ApiError> {
    let text = text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string);
    let link_preview = link_preview.and_then(LinkPreview::cleaned);

    if text.is_none() && link_preview.is_none() {
        return Err(ApiError::bad_request("Post must have text or linkPreview.url"));
    }
    if text.as_ref().is_some_and(|t| t.chars().count() > MAX_TEXT_LEN) {
        return Err(ApiError::bad_request(format!(
            "Post text cannot exceed {MAX_TEXT_LEN} characters"
        )));
    }
    Ok((text, link_preview))
}

/// Adds `user_id` when absent, removes it when present. Returns the new state.
fn toggle(list: &mut Vec<String>, user_id: &str) -> bool {
    if let Some(pos) = list.iter().position(|id| id == user_id) {
        list.remove(pos);
        false
    } else {
        list.push(user_id.to_string());
        true
    }
}

impl Post {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
        let link_preview: Option<String> = row.get("link_preview")?;
        Ok(Post {
            id: row.get("id")?,
            author_id: row.get("author_id")?,
            text: row.get("text")?,
            link_preview: match link_preview {
                Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
                })?,
                None => None,
            },
            likes: json_column(row, "likes")?,
            saves: json_column(row, "saves")?,
            comments_count: row.get("comments_count")?,
            share_count: row.get("share_count")?,
            shared_from: row.get("shared_from")?,
            shares: json_column(row, "shares")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(
        conn: &Connection,
        author_id: &str,
        text: Option<String>,
        link_preview: Option<LinkPreview>,
        shared_from: Option<&str>,
    ) -> rusqlite::Result<Post> {
        let stamp = now();
        let post = Post {
            id: new_id(),
            author_id: author_id.to_string(),
            text,
            link_preview,
            likes: Vec::new(),
            saves: Vec::new(),
            comments_count: 0,
            share_count: 0,
            shared_from: shared_from.map(str::to_string),
            shares: Vec::new(),
            created_at: stamp.clone(),
            updated_at: stamp,
        };
        let preview = match &post.link_preview {
            Some(p) => Some(to_json(p)?),
            None => None,
        };
        conn.execute(
            "INSERT INTO posts (id, author_id, text, link_preview, shared_from, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![post.id, post.author_id, post.text, preview, post.shared_from, post.created_at],
        )?;
        Ok(post)
    }

    pub fn get(conn: &Connection, id: &str) -> rusqlite::Result<Option<Post>> {
        conn.query_row("SELECT * FROM posts WHERE id = ?1", [id], Post::from_row)
            .optional()
    }

    /// Newest first; `since` limits to posts created at or after that timestamp.
    pub fn feed(
        conn: &Connection,
        since: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> rusqlite::Result<(i64, Vec<Post>)> {
        let total = conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE ?1 IS NULL OR created_at >= ?1",
            [since],
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(
            "SELECT * FROM posts WHERE ?1 IS NULL OR created_at >= ?1
             ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
        )?;
        let posts = stmt
            .query_map(params![since, limit, offset], Post::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((total, posts))
    }

    pub fn by_author(
        conn: &Connection,
        author_id: &str,
        limit: i64,
        offset: i64,
    ) -> rusqlite::Result<(i64, Vec<Post>)> {
        let total = Post::count_by_author(conn, author_id)?;
        let mut stmt = conn.prepare(
            "SELECT * FROM posts WHERE author_id = ?1
             ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
        )?;
        let posts = stmt
            .query_map(params![author_id, limit, offset], Post::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((total, posts))
    }

    pub fn count_by_author(conn: &Connection, author_id: &str) -> rusqlite::Result<i64> {
        conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE author_id = ?1",
            [author_id],
            |row| row.get(0),
        )
    }

    /// 403 unless `user_id` wrote the post.
    pub fn ensure_author(&self, user_id: &str) -> Result<(), ApiError> {
        if self.author_id == user_id {
            Ok(())
        } else {
            Err(ApiError::forbidden("You can only modify your own posts"))
        }
    }

    pub fn update_content(
        &mut self,
        conn: &Connection,
        text: Option<String>,
        link_preview: Option<LinkPreview>,
    ) -> rusqlite::Result<()> {
        self.text = text;
        self.link_preview = link_preview;
        self.updated_at = now();
        let preview = match &self.link_preview {
            Some(p) => Some(to_json(p)?),
            None => None,
        };
        conn.execute(
            "UPDATE posts SET text = ?1, link_preview = ?2, updated_at = ?3 WHERE id = ?4",
            params![self.text, preview, self.updated_at, self.id],
        )?;
        Ok(())
    }

    /// Removes the post and its comments.
    pub fn delete(self, conn: &mut Connection) -> rusqlite::Result<()> {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM post_comments WHERE post_id = ?1", [&self.id])?;
        tx.execute("DELETE FROM posts WHERE id = ?1", [&self.id])?;
        tx.commit()
    }

    pub fn toggle_like(&mut self, conn: &Connection, user_id: &str) -> rusqlite::Result<bool> {
        let liked = toggle(&mut self.likes, user_id);
        conn.execute(
            "UPDATE posts SET likes = ?1 WHERE id = ?2",
            params![to_json(&self.likes)?, self.id],
        )?;
        Ok(liked)
    }

    pub fn toggle_save(&mut self, conn: &Connection, user_id: &str) -> rusqlite::Result<bool> {
        let saved = toggle(&mut self.saves, user_id);
        conn.execute(
            "UPDATE posts SET saves = ?1 WHERE id = ?2",
            params![to_json(&self.saves)?, self.id],
        )?;
        Ok(saved)
    }

    /// Reposts `self` as `user_id`. Without a link of its own the share reuses
    /// the original's preview.
    pub fn share(
        &mut self,
        conn: &mut Connection,
        user_id: &str,
        text: Option<String>,
        link_preview: Option<LinkPreview>,
    ) -> rusqlite::Result<Post> {
        let preview = link_preview.or_else(|| self.link_preview.clone());
        let tx = conn.transaction()?;
        let shared = Post::create(&tx, user_id, text, preview, Some(&self.id))?;

        self.shares.push(Share {
            user: user_id.to_string(),
            shared_post: shared.id.clone(),
            created_at: shared.created_at.clone(),
        });
        self.share_count += 1;
        tx.execute(
            "UPDATE posts SET shares = ?1, share_count = ?2 WHERE id = ?3",
            params![to_json(&self.shares)?, self.share_count, self.id],
        )?;
        tx.commit()?;
        Ok(shared)
    }

    pub fn add_comment(&mut self, conn: &mut Connection, author_id: &str, body: &str) -> rusqlite::Result<Comment> {
        let comment = Comment {
            id: new_id(),
            post: self.id.clone(),
            author_id: author_id.to_string(),
            body: body.trim().to_string(),
            created_at: now(),
            author: None,
        };
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO post_comments (id, post_id, author_id, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![comment.id, comment.post, comment.author_id, comment.body, comment.created_at],
        )?;
        tx.execute(
            "UPDATE posts SET comments_count = comments_count + 1 WHERE id = ?1",
            [&self.id],
        )?;
        tx.commit()?;
        self.comments_count += 1;
        Ok(comment)
    }

    pub fn view(&self, conn: &Connection, viewer: Option<&str>) -> rusqlite::Result<PostView> {
        let viewer = viewer.unwrap_or_default();
        Ok(PostView {
            id: self.id.clone(),
            author: User::summary_by_id(conn, &self.author_id)?,
            text: self.text.clone(),
            link_preview: self.link_preview.clone(),
            likes_count: self.likes.len(),
            saves_count: self.saves.len(),
            comments_count: self.comments_count,
            share_count: self.share_count,
            shared_from: self.shared_from.clone(),
            liked: self.likes.iter().any(|id| id == viewer),
            saved: self.saves.iter().any(|id| id == viewer),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        })
    }
}

impl Comment {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
        Ok(Comment {
            id: row.get("id")?,
            post: row.get("post_id")?,
            author_id: row.get("author_id")?,
            body: row.get("body")?,
            created_at: row.get("created_at")?,
            author: None,
        })
    }

    /// Newest first, with authors.
    pub fn for_post(
        conn: &Connection,
        post_id: &str,
        limit: i64,
        offset: i64,
    ) -> rusqlite::Result<(i64, Vec<Comment>)> {
        let total = conn.query_row(
            "SELECT COUNT(*) FROM post_comments WHERE post_id = ?1",
            [post_id],
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(
            "SELECT * FROM post_comments WHERE post_id = ?1
             ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
        )?;
        let mut comments = stmt
            .query_map(params![post_id, limit, offset], Comment::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for comment in &mut comments {
            comment.author = User::summary_by_id(conn, &comment.author_id)?;
        }
        Ok((total, comments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::database::Database;

    #[test]
    fn content_rules() {
        assert!(validate_content(None, None).is_err());
        assert!(validate_content(Some("   "), Some(LinkPreview::default())).is_err());

        let (text, preview) = validate_content(
            None,
            Some(LinkPreview {
                url: Some(" https://jobs.example/1 ".into()),
                title: Some("  ".into()),
                ..LinkPreview::default()
            }),
        )
        .unwrap();
        assert!(text.is_none());
        let preview = preview.unwrap();
        assert_eq!(preview.url.as_deref(), Some("https://jobs.example/1"));
        assert!(preview.title.is_none());

        let long = "x".repeat(MAX_TEXT_LEN + 1);
        assert!(validate_content(Some(&long), None).is_err());
    }

    #[test]
    fn like_and_save_toggle() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let mut post = Post::create(&conn, "author", Some("hello".into()), None, None).unwrap();

        assert!(post.toggle_like(&conn, "u1").unwrap());
        assert!(post.toggle_like(&conn, "u2").unwrap());
        assert!(!post.toggle_like(&conn, "u1").unwrap());
        assert!(post.toggle_save(&conn, "u1").unwrap());

        let stored = Post::get(&conn, &post.id).unwrap().unwrap();
        assert_eq!(stored.likes, vec!["u2".to_string()]);
        assert_eq!(stored.saves, vec!["u1".to_string()]);
    }

    #[test]
    fn share_records_on_original() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.lock();
        let preview = LinkPreview {
            url: Some("https://jobs.example/1".into()),
            ..LinkPreview::default()
        };
        let mut original = Post::create(&conn, "author", None, Some(preview), None).unwrap();
        let shared = original.share(&mut conn, "u1", Some("look".into()), None).unwrap();

        assert_eq!(shared.shared_from.as_deref(), Some(original.id.as_str()));
        assert_eq!(
            shared.link_preview.unwrap().url.as_deref(),
            Some("https://jobs.example/1")
        );
        let stored = Post::get(&conn, &original.id).unwrap().unwrap();
        assert_eq!(stored.share_count, 1);
        assert_eq!(stored.shares[0].shared_post, shared.id);
    }

    #[test]
    fn comments_count_and_delete_cascade() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.lock();
        let mut post = Post::create(&conn, "author", Some("hello".into()), None, None).unwrap();
        post.add_comment(&mut conn, "u1", " nice ").unwrap();
        post.add_comment(&mut conn, "u2", "great").unwrap();

        let (total, comments) = Comment::for_post(&conn, &post.id, 10, 0).unwrap();
        assert_eq!(total, 2);
        assert!(comments.iter().any(|c| c.body == "nice"));
        assert_eq!(Post::get(&conn, &post.id).unwrap().unwrap().comments_count, 2);

        let id = post.id.clone();
        post.delete(&mut conn).unwrap();
        assert!(Post::get(&conn, &id).unwrap().is_none());
        assert_eq!(Comment::for_post(&conn, &id, 10, 0).unwrap().0, 0);
    }

    #[test]
    fn daily_feed_filters_by_time() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let old = Post::create(&conn, "a", Some("old".into()), None, None).unwrap();
        conn.execute(
            "UPDATE posts SET created_at = '2020-01-01T00:00:00.000000Z' WHERE id = ?1",
            [&old.id],
        )
        .unwrap();
        Post::create(&conn, "a", Some("new".into()), None, None).unwrap();

        assert_eq!(Post::feed(&conn, None, 10, 0).unwrap().0, 2);
        let (total, posts) = Post::feed(&conn, Some("2025-01-01T00:00:00.000000Z"), 10, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].text.as_deref(), Some("new"));
    }
}
