//! Row shapes of the hosted `courses` and `categories` tables.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRow {
    pub id: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryWrite {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseRow {
    pub id: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    pub name: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub original_price: Option<f64>,
    #[serde(default, deserialize_with = "nullable_text")]
    pub image_url: String,
    pub category_id: i64,
    #[serde(default, deserialize_with = "nullable_text")]
    pub checkout_url: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub benefits: String,
    /// Parent category, present only when the select embedded `categories(*)`.
    #[serde(default)]
    pub categories: Option<CategoryRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseWrite {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub image_url: String,
    pub category_id: i64,
    pub checkout_url: String,
    pub benefits: String,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

fn nullable_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
