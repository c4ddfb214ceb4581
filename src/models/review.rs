use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A course review joined with the reviewer's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ReviewWithAuthor {
    pub id: i64,
    pub course_id: i64,
    pub user_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: String,
    pub first_name: String,
    pub last_name: String,
}
