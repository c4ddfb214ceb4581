use serde::{Deserialize, Deserializer, Serialize, de::IgnoredAny};
use sqlx::FromRow;

pub const MAX_TITLE_CHARS: usize = 255;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category_id: i64,
    /// Category name resolved through the join.
    pub category: String,
    pub duration: i64,
    pub price: f64,
    pub image_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TopRatedCourse {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub course: Course,
    /// `None` when the course has no reviews yet.
    pub avg_rating: Option<f64>,
}

/// Payload for both creating and updating a course.
///
/// Form input deserializes even when fields are missing or malformed, so that
/// [`NewCourseRequest::field_errors`] can report every problem at once: a
/// missing or non-numeric duration reads as `0`, a missing or non-numeric
/// price reads as NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_duration")]
    pub duration: i64,
    #[serde(default = "missing_price", deserialize_with = "lenient_price")]
    pub price: f64,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewCourseRequest {
    /// Field-level checks that need no database access.
    pub fn field_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Title is required".to_string());
        }
        if self.description.trim().is_empty() {
            errors.push("Description is required".to_string());
        }
        if self.category.trim().is_empty() {
            errors.push("Category is required".to_string());
        }
        if self.duration <= 0 {
            errors.push("Duration is required".to_string());
        }
        if self.price < 0.0 {
            errors.push("Valid price is required".to_string());
        }
        if self.title.chars().count() > MAX_TITLE_CHARS {
            errors.push("Title must be less than 255 characters".to_string());
        }
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            errors.push("Description must be less than 1000 characters".to_string());
        }
        if !self.price.is_finite() {
            errors.push("Price must be a number".to_string());
        }

        errors
    }

    /// The image to store, if one was actually supplied.
    pub fn image_url(&self) -> Option<&str> {
        self.image
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Optional listing filters. Values that are not numbers are dropped on
/// deserialization instead of failing the whole request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub min_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub max_duration: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

impl NumberOrText {
    fn as_f64(&self) -> Option<f64> {
        let n = match self {
            NumberOrText::Number(n) => *n,
            NumberOrText::Text(s) => s.trim().parse::<f64>().ok()?,
            NumberOrText::Other(_) => return None,
        };
        n.is_finite().then_some(n)
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(NumberOrText::as_f64))
}

// Durations are whole hours, so `duration <= 2.5` is the same as `duration <= 2`.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(NumberOrText::as_f64)
        .map(|n| n.floor() as i64))
}

fn lenient_duration<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_i64(deserializer)?.unwrap_or(0))
}

fn lenient_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?.unwrap_or_else(missing_price))
}

fn missing_price() -> f64 {
    f64::NAN
}
