//! HTTP client for the store's JSON API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use crate::{ErrorCode, ScheduleStore, ScheduledAction, StoreError};

/// Connection settings for [`HttpScheduleStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store API base URL.
    pub base_url: String,

    /// Capacity group whose actions are managed.
    pub group: String,

    /// Bearer token, if the store requires one.
    pub token: Option<String>,
}

/// Store backend speaking the scheduled-actions JSON API.
#[derive(Debug, Clone)]
pub struct HttpScheduleStore {
    client: reqwest::Client,
    actions_url: Url,
}

impl HttpScheduleStore {
    /// Create a new store client.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| StoreError::InvalidConfig("invalid token format".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            actions_url: actions_url(&config.base_url, &config.group)?,
        })
    }

    /// Decode a successful response or convert an error response.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| StoreError::InvalidResponse(e.to_string()))
        } else {
            self.handle_error(response).await
        }
    }

    /// Succeed on any 2xx, ignoring the body.
    async fn expect_success(&self, response: reqwest::Response) -> Result<(), StoreError> {
        if response.status().is_success() {
            Ok(())
        } else {
            self.handle_error(response).await
        }
    }

    /// Handle an error response.
    async fn handle_error<T>(&self, response: reqwest::Response) -> Result<T, StoreError> {
        let status = response.status();

        let body: StoreErrorResponse =
            response.json().await.unwrap_or_else(|_| StoreErrorResponse {
                code: "Unknown".to_string(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string(),
            });

        Err(StoreError::Remote {
            code: ErrorCode::from_code(&body.code),
            status: Some(status.as_u16()),
            message: body.message,
        })
    }
}

/// `{base}/v1/groups/{group}/scheduled-actions`, with the group escaped.
fn actions_url(base_url: &str, group: &str) -> Result<Url, StoreError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| StoreError::InvalidConfig(format!("invalid store URL: {}", e)))?;

    url.path_segments_mut()
        .map_err(|_| StoreError::InvalidConfig(format!("store URL cannot be a base: {}", base_url)))?
        .pop_if_empty()
        .extend(["v1", "groups", group, "scheduled-actions"]);

    Ok(url)
}

#[async_trait]
impl ScheduleStore for HttpScheduleStore {
    async fn create(&self, action: &ScheduledAction) -> Result<(), StoreError> {
        debug!(identifier = %action.identifier, time = %action.time, "Creating scheduled action");

        let response = self
            .client
            .post(self.actions_url.clone())
            .json(action)
            .send()
            .await?;

        self.expect_success(response).await
    }

    async fn delete(&self, identifier: &str) -> Result<(), StoreError> {
        debug!(identifier, "Deleting scheduled action");

        let response = self
            .client
            .delete(self.actions_url.clone())
            .query(&[("name", identifier)])
            .send()
            .await?;

        self.expect_success(response).await
    }

    async fn list(&self, max_records: usize) -> Result<Vec<ScheduledAction>, StoreError> {
        let mut actions = Vec::new();
        let mut next_token: Option<String> = None;

        while actions.len() < max_records {
            let remaining = (max_records - actions.len()).to_string();
            let mut request = self
                .client
                .get(self.actions_url.clone())
                .query(&[("max_records", remaining.as_str())]);
            if let Some(token) = &next_token {
                request = request.query(&[("next_token", token.as_str())]);
            }

            let page: ListPage = self.handle_response(request.send().await?).await?;
            debug!(
                count = page.items.len(),
                has_more = page.next_token.is_some(),
                "Listed scheduled actions page"
            );
            let empty = page.items.is_empty();
            actions.extend(page.items);

            match page.next_token {
                Some(token) if next_token.as_deref() == Some(token.as_str()) => {
                    return Err(StoreError::InvalidResponse(format!(
                        "listing repeated page token '{}'",
                        token
                    )));
                }
                Some(token) if empty => {
                    warn!(token = %token, "Stopping listing at empty page");
                    break;
                }
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        actions.truncate(max_records);
        Ok(actions)
    }
}

/// One page of a listing.
#[derive(Debug, Deserialize)]
struct ListPage {
    #[serde(default)]
    items: Vec<ScheduledAction>,
    #[serde(default)]
    next_token: Option<String>,
}

/// Store error response structure.
#[derive(Debug, Deserialize)]
struct StoreErrorResponse {
    code: String,
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ACTIONS_PATH: &str = "/v1/groups/web-prod/scheduled-actions";

    fn store(server: &MockServer) -> HttpScheduleStore {
        HttpScheduleStore::new(&StoreConfig {
            base_url: server.uri(),
            group: "web-prod".to_string(),
            token: Some("secret".to_string()),
        })
        .unwrap()
    }

    fn action(name: &str, secs: i64) -> ScheduledAction {
        ScheduledAction::pinned(name, Utc.timestamp_opt(secs, 0).unwrap(), 4, 20)
    }

    #[test]
    fn test_actions_url_escapes_group() {
        let url = actions_url("http://localhost:9000/", "web prod").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/v1/groups/web%20prod/scheduled-actions"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            actions_url("not a url", "web"),
            Err(StoreError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_create_posts_action() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ACTIONS_PATH))
            .and(body_json(json!({
                "name": "Meet 04-05/START/-0700",
                "time": "1970-01-01T00:01:40Z",
                "min_size": 4,
                "max_size": 20,
                "desired_capacity": 4
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        store(&server)
            .create(&action("Meet 04-05/START/-0700", 100))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_maps_error_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ACTIONS_PATH))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "AlreadyExists",
                "message": "scheduled action exists"
            })))
            .mount(&server)
            .await;

        let err = store(&server).create(&action("A/START/+0000", 1)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyExists);
        assert!(matches!(err, StoreError::Remote { status: Some(409), .. }));
    }

    #[tokio::test]
    async fn test_unreadable_error_body_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(ACTIONS_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let err = store(&server).delete("A/START/+0000").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unknown);
    }

    #[tokio::test]
    async fn test_delete_sends_name_query() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(ACTIONS_PATH))
            .and(query_param("name", "A/START/+05/30"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        store(&server).delete("A/START/+05/30").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_follows_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ACTIONS_PATH))
            .and(query_param_is_missing("next_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [serde_json::to_value(action("A/START/+0000", 100)).unwrap()],
                "next_token": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(ACTIONS_PATH))
            .and(query_param("next_token", "page-2"))
            .and(query_param("max_records", "99"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [serde_json::to_value(action("A/FINISH/+0000", 200)).unwrap()]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let actions = store(&server).list(100).await.unwrap();
        let names: Vec<_> = actions.iter().map(|a| a.identifier.as_str()).collect();
        assert_eq!(names, vec!["A/START/+0000", "A/FINISH/+0000"]);
    }

    #[tokio::test]
    async fn test_list_invalid_page_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ACTIONS_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "InvalidPageToken",
                "message": "token expired"
            })))
            .mount(&server)
            .await;

        let err = store(&server).list(10).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPageToken);
    }

    #[tokio::test]
    async fn test_list_stops_at_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ACTIONS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [],
                "next_token": "same"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let actions = store(&server).list(100).await.unwrap();
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn test_list_rejects_repeated_page_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ACTIONS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [serde_json::to_value(action("A/START/+0000", 100)).unwrap()],
                "next_token": "same"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let err = store(&server).list(100).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidResponse(_)));
    }
}
