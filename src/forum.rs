//! Discussion forum
//!
//! Topics with replies. Posting a reply updates the topic's last-reply
//! attribution in the same transaction as the reply insert.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Forum topic
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reply: Option<LastReply>,
}

/// Attribution of the newest reply on a topic
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastReply {
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

/// Reply under a topic
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub content: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TopicInput {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 10000, message = "Content is required"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReplyInput {
    #[validate(length(min = 1, max = 10000, message = "Reply content cannot be empty"))]
    pub content: String,
}

fn topic_from_row(row: &tokio_postgres::Row) -> Topic {
    let last_reply_user: Option<String> = row.get("last_reply_user");
    let last_reply_at: Option<DateTime<Utc>> = row.get("last_reply_at");
    Topic {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        user_id: row.get("user_id"),
        user_name: row.get("user_name"),
        created_at: row.get("created_at"),
        last_reply: match (last_reply_user, last_reply_at) {
            (Some(user_name), Some(created_at)) => Some(LastReply { user_name, created_at }),
            _ => None,
        },
    }
}

fn reply_from_row(row: &tokio_postgres::Row) -> Reply {
    Reply {
        id: row.get("id"),
        topic_id: row.get("topic_id"),
        content: row.get("content"),
        user_id: row.get("user_id"),
        user_name: row.get("user_name"),
        created_at: row.get("created_at"),
    }
}

const TOPIC_COLUMNS: &str =
    "id, title, content, user_id, user_name, created_at, last_reply_user, last_reply_at";

/// PostgreSQL-backed forum service
pub struct ForumService {
    pool: Pool,
}

impl ForumService {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn create_topic(
        &self,
        user_id: Uuid,
        user_name: &str,
        input: TopicInput,
    ) -> Result<Topic, AppError> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let client = self.pool.get().await?;
        let sql = format!(
            "INSERT INTO forum_topics (id, title, content, user_id, user_name, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            TOPIC_COLUMNS
        );
        let row = client
            .query_one(
                sql.as_str(),
                &[
                    &Uuid::new_v4(),
                    &input.title,
                    &input.content,
                    &user_id,
                    &user_name,
                    &Utc::now(),
                ],
            )
            .await?;
        Ok(topic_from_row(&row))
    }

    /// Topics newest first
    pub async fn list_topics(&self) -> Result<Vec<Topic>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {} FROM forum_topics ORDER BY created_at DESC", TOPIC_COLUMNS);
        let rows = client.query(sql.as_str(), &[]).await?;
        Ok(rows.iter().map(topic_from_row).collect())
    }

    /// One topic with its replies, oldest reply first
    pub async fn get_topic(&self, id: Uuid) -> Result<(Topic, Vec<Reply>), AppError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {} FROM forum_topics WHERE id = $1", TOPIC_COLUMNS);
        let row = client
            .query_opt(sql.as_str(), &[&id])
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", id)))?;
        let topic = topic_from_row(&row);

        let replies = client
            .query(
                "SELECT id, topic_id, content, user_id, user_name, created_at \
                 FROM forum_replies WHERE topic_id = $1 ORDER BY created_at",
                &[&id],
            )
            .await?;

        Ok((topic, replies.iter().map(reply_from_row).collect()))
    }

    /// Post a reply; the topic's last-reply attribution moves in the same
    /// transaction.
    pub async fn add_reply(
        &self,
        topic_id: Uuid,
        user_id: Uuid,
        user_name: &str,
        input: ReplyInput,
    ) -> Result<Reply, AppError> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let mut client = self.pool.get().await?;
        let txn = client.transaction().await?;
        let now = Utc::now();

        let updated = txn
            .execute(
                "UPDATE forum_topics SET last_reply_user = $2, last_reply_at = $3 WHERE id = $1",
                &[&topic_id, &user_name, &now],
            )
            .await?;
        if updated == 0 {
            txn.rollback().await?;
            return Err(AppError::NotFound(format!("Topic {} not found", topic_id)));
        }

        let row = txn
            .query_one(
                "INSERT INTO forum_replies (id, topic_id, content, user_id, user_name, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING id, topic_id, content, user_id, user_name, created_at",
                &[&Uuid::new_v4(), &topic_id, &input.content, &user_id, &user_name, &now],
            )
            .await?;

        txn.commit().await?;
        Ok(reply_from_row(&row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_input_validation() {
        assert!(ReplyInput { content: String::new() }.validate().is_err());
        assert!(ReplyInput { content: "I agree".to_string() }.validate().is_ok());
    }

    #[test]
    fn test_topic_serializes_without_empty_last_reply() {
        let topic = Topic {
            id: Uuid::new_v4(),
            title: "Water supply in Ward 4".to_string(),
            content: "Pressure drops every evening".to_string(),
            user_id: Uuid::new_v4(),
            user_name: "Anand".to_string(),
            created_at: Utc::now(),
            last_reply: None,
        };
        let json = serde_json::to_string(&topic).unwrap();
        assert!(!json.contains("lastReply"));
    }
}
