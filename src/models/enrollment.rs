use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An unfinished enrollment, with just enough course data to render a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ActiveEnrollment {
    pub progress: i64,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
}
