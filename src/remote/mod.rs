pub mod dto;
pub mod memory;

use std::env;

use async_trait::async_trait;
use reqwest::header::{CONTENT_RANGE, HeaderMap};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::error::AppError;

pub use memory::MemoryTables;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Courses,
    Categories,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Courses => "courses",
            Table::Categories => "categories",
        }
    }
}

/// Equality filter on an integer column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: &'static str,
    pub value: i64,
}

impl Filter {
    pub fn eq(column: &'static str, value: i64) -> Self {
        Self { column, value }
    }

    pub fn id(value: i64) -> Self {
        Self::eq("id", value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectRequest {
    pub table: Table,
    /// Expand each row's parent category under the `categories` key.
    pub embed_category: bool,
    pub filter: Option<Filter>,
    pub order_by: Option<&'static str>,
    pub limit: Option<usize>,
}

impl SelectRequest {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            embed_category: false,
            filter: None,
            order_by: None,
            limit: None,
        }
    }

    pub fn embed_category(mut self) -> Self {
        self.embed_category = true;
        self
    }

    pub fn eq(mut self, column: &'static str, value: i64) -> Self {
        self.filter = Some(Filter::eq(column, value));
        self
    }

    pub fn order_by(mut self, column: &'static str) -> Self {
        self.order_by = Some(column);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Table-oriented access to the hosted data service.
#[async_trait]
pub trait RemoteTables: Send + Sync {
    async fn select(&self, request: &SelectRequest) -> Result<Vec<Value>, AppError>;

    async fn select_one(&self, request: &SelectRequest) -> Result<Option<Value>, AppError> {
        let request = request.clone().limit(1);
        Ok(self.select(&request).await?.into_iter().next())
    }

    async fn count(&self, table: Table, filter: &Filter) -> Result<usize, AppError>;

    async fn insert(&self, table: Table, row: Value) -> Result<Value, AppError>;

    /// Returns the first updated row, or `None` when nothing matched.
    async fn update(
        &self,
        table: Table,
        filter: &Filter,
        changes: Value,
    ) -> Result<Option<Value>, AppError>;

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), AppError>;
}

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub url: String,
    pub anon_key: String,
}

impl RemoteConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let url = env::var("SUPABASE_URL")
            .map_err(|_| AppError::Config("SUPABASE_URL is not set".to_string()))?;
        let anon_key = env::var("SUPABASE_ANON_KEY")
            .map_err(|_| AppError::Config("SUPABASE_ANON_KEY is not set".to_string()))?;

        if url.trim().is_empty() || anon_key.trim().is_empty() {
            return Err(AppError::Config(
                "SUPABASE_URL and SUPABASE_ANON_KEY must not be empty".to_string(),
            ));
        }

        Ok(Self { url, anon_key })
    }
}

/// PostgREST dialect client for the hosted `courses`/`categories` tables.
pub struct PostgrestClient {
    client: Client,
    config: RemoteConfig,
}

impl PostgrestClient {
    pub fn new(config: RemoteConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn table_url(&self, table: Table, params: &[(String, String)]) -> Result<Url, AppError> {
        let base = self.config.url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}/rest/v1/{}", base, table.as_str()))
            .map_err(|e| AppError::Config(format!("Invalid SUPABASE_URL: {}", e)))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", self.config.anon_key.as_str())
            .header("Authorization", format!("Bearer {}", self.config.anon_key))
    }
}

#[async_trait]
impl RemoteTables for PostgrestClient {
    async fn select(&self, request: &SelectRequest) -> Result<Vec<Value>, AppError> {
        let url = self.table_url(request.table, &select_params(request))?;
        debug!("GET {}", url);

        let response = self.authorized(self.client.get(url)).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<Vec<Value>>().await?)
    }

    async fn count(&self, table: Table, filter: &Filter) -> Result<usize, AppError> {
        let params = vec![
            ("select".to_string(), "id".to_string()),
            filter_param(filter),
            ("limit".to_string(), "1".to_string()),
        ];
        let url = self.table_url(table, &params)?;
        debug!("GET (count) {}", url);

        let response = self
            .authorized(self.client.get(url))
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = check_status(response).await?;
        exact_count(response.headers())
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, AppError> {
        let url = self.table_url(table, &[])?;
        debug!("POST {}", url);

        let response = self
            .authorized(self.client.post(url))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let response = check_status(response).await?;

        response
            .json::<Vec<Value>>()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Remote(format!("Insert into {} returned no rows", table.as_str())))
    }

    async fn update(
        &self,
        table: Table,
        filter: &Filter,
        changes: Value,
    ) -> Result<Option<Value>, AppError> {
        let url = self.table_url(table, &[filter_param(filter)])?;
        debug!("PATCH {}", url);

        let response = self
            .authorized(self.client.patch(url))
            .header("Prefer", "return=representation")
            .json(&changes)
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(response.json::<Vec<Value>>().await?.into_iter().next())
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), AppError> {
        let url = self.table_url(table, &[filter_param(filter)])?;
        debug!("DELETE {}", url);

        let response = self.authorized(self.client.delete(url)).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Query-string parameters for a select, in PostgREST syntax.
pub fn select_params(request: &SelectRequest) -> Vec<(String, String)> {
    let columns = if request.embed_category {
        format!("*,{}(*)", Table::Categories.as_str())
    } else {
        "*".to_string()
    };

    let mut params = vec![("select".to_string(), columns)];
    if let Some(filter) = &request.filter {
        params.push(filter_param(filter));
    }
    if let Some(column) = request.order_by {
        params.push(("order".to_string(), format!("{}.asc", column)));
    }
    if let Some(limit) = request.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

fn filter_param(filter: &Filter) -> (String, String) {
    (filter.column.to_string(), format!("eq.{}", filter.value))
}

/// Reads the total of a `Prefer: count=exact` response.
pub fn exact_count(headers: &HeaderMap) -> Result<usize, AppError> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range_total)
        .ok_or_else(|| AppError::Remote("Missing exact count in Content-Range".to_string()))
}

/// Total from a `Content-Range` header such as `0-0/5` or `*/0`.
pub fn parse_content_range_total(header: &str) -> Option<usize> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

async fn check_status(response: Response) -> Result<Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Remote(error_message(status, &body)))
}

/// The backend's `message` field, or the status and raw body when the body is
/// not a PostgREST error object.
pub fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<dto::ErrorBody>(body) {
        Ok(err) => err.message,
        Err(_) => format!("{} {}", status, body.trim()).trim_end().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn test_select_params_with_join_filter_and_order() {
        let request = SelectRequest::new(Table::Courses)
            .embed_category()
            .eq("id", 7)
            .order_by("name");

        assert_eq!(
            select_params(&request),
            vec![
                ("select".to_string(), "*,categories(*)".to_string()),
                ("id".to_string(), "eq.7".to_string()),
                ("order".to_string(), "name.asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_select_params_plain() {
        let request = SelectRequest::new(Table::Categories).limit(1);
        assert_eq!(
            select_params(&request),
            vec![
                ("select".to_string(), "*".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-0/5"), Some(5));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[test]
    fn test_exact_count_requires_content_range() {
        let mut headers = HeaderMap::new();
        assert!(matches!(exact_count(&headers), Err(AppError::Remote(_))));

        headers.insert(CONTENT_RANGE, HeaderValue::from_static("0-0/3"));
        assert_eq!(exact_count(&headers).expect("count"), 3);

        headers.insert(CONTENT_RANGE, HeaderValue::from_static("0-0/*"));
        assert!(matches!(exact_count(&headers), Err(AppError::Remote(_))));
    }

    #[test]
    fn test_error_message_prefers_backend_message() {
        let body = r#"{"code":"23503","details":"Key (category_id)=(9) is not present in table \"categories\".","hint":null,"message":"insert or update on table \"courses\" violates foreign key constraint \"courses_category_id_fkey\""}"#;
        assert_eq!(
            error_message(StatusCode::CONFLICT, body),
            "insert or update on table \"courses\" violates foreign key constraint \"courses_category_id_fkey\""
        );
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>upstream down</html>\n"),
            "502 Bad Gateway <html>upstream down</html>"
        );
        assert_eq!(
            error_message(StatusCode::UNAUTHORIZED, ""),
            "401 Unauthorized"
        );
    }

    #[test]
    fn test_table_url_trims_trailing_slash() {
        let client = PostgrestClient::new(RemoteConfig {
            url: "https://project.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
        })
        .expect("client");

        let url = client
            .table_url(Table::Courses, &[("category_id".to_string(), "eq.3".to_string())])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://project.supabase.co/rest/v1/courses?category_id=eq.3"
        );
    }
}
