use chrono::Utc;
use uuid::Uuid;
use crate::auth::Identity;
use crate::errors::ValidationError;
use crate::models::Comment;

/// Append-only comment log. `server_seq` starts at 1 and only grows.
#[derive(Debug)]
pub struct CommentLog {
    entries: Vec<Comment>,
    next_seq: u64,
}

impl Default for CommentLog {
    fn default() -> Self {
        Self { entries: Vec::new(), next_seq: 1 }
    }
}

impl CommentLog {
    pub fn append(&mut self, author: &Identity, text: &str, target_object_id: Option<String>) -> Result<Comment, ValidationError> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyComment);
        }

        let comment = Comment {
            comment_id: Uuid::new_v4().to_string(),
            author_id: author.user_id.clone(),
            author_name: author.display_name.clone(),
            text: text.to_string(),
            target_object_id: target_object_id.filter(|id| !id.is_empty()),
            server_seq: self.next_seq,
            created_at: Utc::now().to_rfc3339(),
        };
        self.next_seq += 1;
        self.entries.push(comment.clone());
        Ok(comment)
    }

    pub fn snapshot(&self) -> Vec<Comment> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
