//! Delivery of the rendered page: a local file, or a read-modify-write against the
//! Confluence REST API.
//!
//! The remote path runs strictly in sequence and stops at the first failure:
//!
//! 1. resolve the page id by exact title (`GET /rest/api/content?title=`)
//! 2. fetch the current page (`GET /rest/api/content/{id}?expand=body.storage`)
//! 3. fetch the version (`GET /rest/api/content/{id}?expand=version.number`)
//! 4. merge the new body into an allow-listed copy of the page
//! 5. write it back (`PUT /rest/api/content/{id}`)
//!
//! There is no retry and no compare-and-swap: a concurrent writer between steps 3 and
//! 5 is either rejected by Confluence's own version check or silently overwritten.

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use crate::config::{Destination, PageStoreConfig};
use crate::contract::Publisher;
use crate::error::SyncError;

const PAGE_KEYS: [&str; 6] = ["id", "type", "title", "status", "body", "version"];
const STORAGE_REPRESENTATION: &str = "storage";

/// Stateless client for the page store; every request carries its own credentials.
pub struct ConfluenceClient {
    client: Client,
    config: PageStoreConfig,
}

impl ConfluenceClient {
    pub fn new(config: PageStoreConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: PageStoreConfig) -> Self {
        Self { client, config }
    }

    fn content_url(&self, page_id: Option<&str>) -> String {
        // avoid "//" when the base URL ends with a slash
        let base_url = self.config.base_url.trim_end_matches('/');
        match page_id {
            Some(id) => format!("{base_url}/rest/api/content/{id}"),
            None => format!("{base_url}/rest/api/content"),
        }
    }

    fn authorised(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(CONTENT_TYPE, "application/json")
            .basic_auth(&self.config.user, self.config.password.as_deref())
    }

    async fn ensure_success(response: Response, url: &str) -> Result<Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
        error!(
            status = %status,
            url = %url,
            "Confluence API returned error. Response body: {body}"
        );
        Err(SyncError::Http {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        })
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, SyncError> {
        debug!(url = %url, ?query, "Confluence GET");
        let response = self
            .authorised(self.client.get(url).query(query))
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, url = %url, "Failed to reach Confluence API");
                SyncError::Transport(e)
            })?;
        let response = Self::ensure_success(response, url).await?;
        response.json::<Value>().await.map_err(|e| {
            error!(error = ?e, url = %url, "Confluence API returned a body that is not JSON");
            SyncError::UnexpectedResponse(format!("response body is not JSON: {e}"))
        })
    }

    /// Id of the first page the store returns for `title`.
    pub async fn resolve_page_id(&self, title: &str) -> Result<String, SyncError> {
        let url = self.content_url(None);
        let found = self.get_json(&url, &[("title", title)]).await?;

        let results = found
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                error!(url = %url, "Confluence search response has no results list");
                SyncError::UnexpectedResponse("missing \"results\" list".into())
            })?;
        // Duplicate titles are not disambiguated: the store's first match wins.
        let first = results.first().ok_or_else(|| {
            error!(url = %url, title = %title, "No Confluence page with this title");
            SyncError::PageNotFound(title.to_string())
        })?;
        let page_id = match first.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            other => {
                error!(url = %url, id = ?other, "Confluence page id is not a string or number");
                return Err(SyncError::UnexpectedResponse(format!(
                    "page id is not a string or number: {other:?}"
                )));
            }
        };

        info!(title = %title, page_id = %page_id, "Resolved Confluence page id");
        Ok(page_id)
    }

    /// Current page object with its storage-format body expanded.
    pub async fn fetch_current_content(&self, page_id: &str) -> Result<Value, SyncError> {
        let url = self.content_url(Some(page_id));
        self.get_json(&url, &[("expand", "body.storage")]).await
    }

    /// Current version number plus one, as text.
    pub async fn fetch_next_version(&self, page_id: &str) -> Result<String, SyncError> {
        let url = self.content_url(Some(page_id));
        let page = self.get_json(&url, &[("expand", "version.number")]).await?;

        let number = page
            .get("version")
            .and_then(|v| v.get("number"))
            .ok_or_else(|| {
                error!(page_id = %page_id, "Confluence page has no version number");
                SyncError::MalformedVersion("<missing>".into())
            })?;
        let version = next_version(number).inspect_err(|_| {
            error!(page_id = %page_id, number = %number, "Confluence version number is not an integer");
        })?;

        info!(page_id = %page_id, version = %version, "New page version number");
        Ok(version)
    }

    pub async fn put_page(&self, page_id: &str, page: &Value) -> Result<(), SyncError> {
        let url = self.content_url(Some(page_id));
        debug!(url = %url, "Confluence PUT");
        let response = self
            .authorised(self.client.put(&url))
            .json(page)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, url = %url, "Failed to reach Confluence API");
                SyncError::Transport(e)
            })?;

        info!(page_id = %page_id, status = %response.status(), "Page put status");
        let response = Self::ensure_success(response, &url).await?;
        if let Ok(text) = response.text().await {
            debug!(response = %text, "Page put response");
        }
        Ok(())
    }

    /// Replace the body of the page titled `title`, keeping its other metadata.
    pub async fn replace_page_body(&self, title: &str, new_body: &str) -> Result<(), SyncError> {
        let page_id = self.resolve_page_id(title).await?;
        let current = self.fetch_current_content(&page_id).await?;
        let version = self.fetch_next_version(&page_id).await?;
        let page = merge_page_object(&current, &version, new_body);
        self.put_page(&page_id, &page).await
    }
}

/// `number + 1`, accepting the number as a JSON integer or a numeric string.
pub fn next_version(number: &Value) -> Result<String, SyncError> {
    let current = match number {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| SyncError::MalformedVersion(number.to_string()))?;

    current
        .checked_add(1)
        .map(|next| next.to_string())
        .ok_or_else(|| SyncError::MalformedVersion(number.to_string()))
}

/// Fresh page object holding only the fields Confluence accepts on update.
///
/// Top level keeps `id`, `type`, `title`, `status` when present; `body` becomes
/// `{storage: {value: new_body, representation: "storage"}}` and `version` becomes
/// `{number: new_version}`. Anything else in `current` is dropped.
pub fn merge_page_object(current: &Value, new_version: &str, new_body: &str) -> Value {
    let mut page = Map::new();
    for key in PAGE_KEYS {
        match key {
            "body" => {
                page.insert(
                    key.to_string(),
                    json!({
                        "storage": {
                            "value": new_body,
                            "representation": STORAGE_REPRESENTATION,
                        }
                    }),
                );
            }
            "version" => {
                page.insert(key.to_string(), json!({ "number": new_version }));
            }
            _ => {
                if let Some(value) = current.get(key) {
                    page.insert(key.to_string(), value.clone());
                }
            }
        }
    }
    Value::Object(page)
}

/// Write `rendered` verbatim to `path`, replacing any existing file.
pub fn write_local(path: &Path, rendered: &str) -> Result<(), SyncError> {
    info!(path = %path.display(), "Writing rendered page to local file");
    std::fs::write(path, rendered).map_err(|source| {
        error!(error = ?source, path = %path.display(), "Failed to write rendered page");
        SyncError::LocalWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// [`Publisher`] for the configured [`Destination`].
pub struct PageSync {
    client: Client,
    destination: Destination,
}

impl PageSync {
    pub fn new(destination: Destination) -> Self {
        Self::with_client(Client::new(), destination)
    }

    pub fn with_client(client: Client, destination: Destination) -> Self {
        Self {
            client,
            destination,
        }
    }
}

#[async_trait]
impl Publisher for PageSync {
    async fn save(&self, rendered: &str) -> Result<(), SyncError> {
        match &self.destination {
            Destination::LocalFile(path) => write_local(path, rendered),
            Destination::Page(config) => {
                let confluence = ConfluenceClient::with_client(self.client.clone(), config.clone());
                confluence
                    .replace_page_body(&config.page_title, rendered)
                    .await
            }
        }
    }
}
