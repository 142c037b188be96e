use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

const RETURN_REPRESENTATION: &str = "return=representation";

/// PostgREST client used with the service key. Conditional writes are
/// expressed as filtered PATCH requests returning the affected rows, so an
/// empty result means the precondition did not hold.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self, prefer: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.service_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.service_key))?,
        );

        if let Some(prefer) = prefer {
            headers.insert("Prefer", HeaderValue::from_str(prefer)?);
        }

        Ok(headers)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        prefer: Option<&str>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url).headers(self.get_headers(prefer)?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                409 => anyhow!("Constraint violation: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// `GET /rest/v1/{table}?{query}`
    pub async fn select<T>(&self, table: &str, query: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/{}?{}", table, query);
        self.request(Method::GET, &path, None, None).await
    }

    pub async fn select_one<T>(&self, table: &str, query: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let rows: Vec<T> = self.select(table, &format!("{}&limit=1", query)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert<T>(&self, table: &str, body: Value) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/{}", table);
        self.request(Method::POST, &path, Some(body), Some(RETURN_REPRESENTATION))
            .await
    }

    /// Inserts unless the row collides with a unique key. Returns the
    /// inserted rows, empty when the row already existed.
    pub async fn insert_ignore_duplicates<T>(&self, table: &str, on_conflict: &str, body: Value) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/{}?on_conflict={}", table, on_conflict);
        self.request(
            Method::POST,
            &path,
            Some(body),
            Some("return=representation,resolution=ignore-duplicates"),
        )
        .await
    }

    /// Inserts and returns the stored rows, or `None` when a unique or
    /// exclusion constraint rejected the row (HTTP 409).
    pub async fn insert_unless_conflict<T>(&self, table: &str, body: Value) -> Result<Option<Vec<T>>>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        debug!("Making conditional insert to {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.get_headers(Some(RETURN_REPRESENTATION))?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            debug!("Insert into {} rejected by constraint", table);
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);
            return Err(anyhow!("API error ({}): {}", status, error_text));
        }

        Ok(Some(response.json::<Vec<T>>().await?))
    }

    /// Applies `body` to the rows matching `filters` and returns them.
    pub async fn update_where<T>(&self, table: &str, filters: &str, body: Value) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/{}?{}", table, filters);
        self.request(Method::PATCH, &path, Some(body), Some(RETURN_REPRESENTATION))
            .await
    }

    /// Deletes the rows matching `filters` and returns them.
    pub async fn delete_where<T>(&self, table: &str, filters: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/{}?{}", table, filters);
        self.request(Method::DELETE, &path, None, Some(RETURN_REPRESENTATION))
            .await
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
