/// AI conversation log
///
/// Append-only. A user question and the assistant reply are always written
/// together with [`AiChatMessage::append_exchange`], inside one transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Converts role to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// A stored chat message
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AiChatMessage {
    pub id: Uuid,
    pub company_id: Uuid,
    pub user_id: Uuid,

    /// `user` | `assistant`
    pub role: String,

    pub content: String,

    /// Provider-reported token usage, assistant messages only
    pub tokens_used: Option<i32>,

    pub created_at: DateTime<Utc>,
}

impl AiChatMessage {
    /// Stores a question and its answer atomically
    ///
    /// # Returns
    ///
    /// The user message and the assistant message, in that order
    pub async fn append_exchange(
        pool: &PgPool,
        company_id: Uuid,
        user_id: Uuid,
        question: &str,
        answer: &str,
        tokens_used: Option<i32>,
    ) -> Result<(Self, Self), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert = r#"
            INSERT INTO ai_chat_messages (company_id, user_id, role, content, tokens_used)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, company_id, user_id, role, content, tokens_used, created_at
        "#;

        let asked = sqlx::query_as::<_, AiChatMessage>(insert)
            .bind(company_id)
            .bind(user_id)
            .bind(ChatRole::User.as_str())
            .bind(question)
            .bind(None::<i32>)
            .fetch_one(&mut *tx)
            .await?;

        let answered = sqlx::query_as::<_, AiChatMessage>(insert)
            .bind(company_id)
            .bind(user_id)
            .bind(ChatRole::Assistant.as_str())
            .bind(answer)
            .bind(tokens_used)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((asked, answered))
    }

    /// Lists a user's conversation within a company, oldest first
    pub async fn list_conversation(
        pool: &PgPool,
        company_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AiChatMessage>(
            r#"
            SELECT id, company_id, user_id, role, content, tokens_used, created_at
            FROM ai_chat_messages
            WHERE company_id = $1 AND user_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(company_id)
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
