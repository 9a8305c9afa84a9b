use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::error::ApiError;
use crate::storage::{Category, Entry};

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

const AUTH_HEADER: &str = "X-Auth-Token";

/// Token returned by a successful login.
#[derive(Debug)]
pub struct LoginResponse {
    pub token: SecretString,
}

#[derive(Deserialize)]
struct LoginBody {
    token: String,
}

/// Client for the three Miniflux endpoints this application uses.
///
/// Every call is fire-once: no retry, pagination or rate limiting.
#[derive(Clone)]
pub struct MinifluxClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl MinifluxClient {
    /// Build a client for `base_url`.
    ///
    /// The base URL must be HTTPS; plain HTTP is accepted only for
    /// `localhost` and `127.0.0.1` so tests can run against a local server.
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `POST v1/authentication` with a form body.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginResponse, ApiError> {
        let request = self
            .http
            .post(self.endpoint("v1/authentication")?)
            .form(&[("username", username), ("password", password.expose_secret())]);

        let body: LoginBody = self.send_json(request).await?;
        tracing::info!(username = %username, "Authenticated");
        Ok(LoginResponse {
            token: SecretString::from(body.token),
        })
    }

    /// `GET v1/feeds`. Order is whatever the server returns.
    pub async fn get_feeds(&self, token: &SecretString) -> Result<Vec<Entry>, ApiError> {
        let request = self
            .http
            .get(self.endpoint("v1/feeds")?)
            .header(AUTH_HEADER, token.expose_secret());

        let feeds: Vec<Entry> = self.send_json(request).await?;
        tracing::debug!(count = feeds.len(), "Fetched feeds");
        Ok(feeds)
    }

    /// `GET v1/categories`.
    pub async fn get_categories(&self, token: &SecretString) -> Result<Vec<Category>, ApiError> {
        let request = self
            .http
            .get(self.endpoint("v1/categories")?)
            .header(AUTH_HEADER, token.expose_secret());

        let categories: Vec<Category> = self.send_json(request).await?;
        tracing::debug!(count = categories.len(), "Fetched categories");
        Ok(categories)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))
    }

    /// Send, check status, read a bounded body and decode it as JSON.
    ///
    /// The timeout covers the whole exchange, body included.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                tracing::debug!(status = status.as_u16(), url = %response.url(), "Request rejected");
                return Err(ApiError::HttpStatus(status.as_u16()));
            }
            read_limited_body(response, MAX_RESPONSE_SIZE).await
        };

        let body = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ApiError::Timeout(self.timeout.as_secs()))??;

        Ok(serde_json::from_slice(&body)?)
    }
}

/// Parse the base URL, enforce HTTPS (localhost excepted), and make sure the
/// path ends in `/` so relative endpoints append instead of replacing the
/// last segment.
fn normalize_base_url(raw: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))?;

    match url.scheme() {
        "https" => {}
        "http" => {
            let is_localhost = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"));
            if !is_localhost {
                tracing::error!(base_url = %raw, "Rejecting non-HTTPS base URL");
                return Err(ApiError::InsecureBaseUrl);
            }
            tracing::warn!(base_url = %raw, "Using non-HTTPS base URL (localhost only)");
        }
        scheme => {
            return Err(ApiError::InvalidBaseUrl(format!(
                "unsupported scheme: {}",
                scheme
            )))
        }
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

async fn read_limited_body(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FailureKind;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> MinifluxClient {
        MinifluxClient::new(
            reqwest::Client::new(),
            &server.uri(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn token(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn test_login_posts_form_and_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/authentication"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("username=alice"))
            .and(body_string_contains("password=hunter2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"token":"tok-1"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .login("alice", &token("hunter2"))
            .await
            .unwrap();
        assert_eq!(response.token.expose_secret(), "tok-1");
    }

    #[tokio::test]
    async fn test_login_wrong_credentials_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/authentication"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .login("alice", &token("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus(401)));
        assert_eq!(err.kind(), FailureKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_get_feeds_sends_token_and_keeps_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/feeds"))
            .and(header("X-Auth-Token", "tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[
                    {"id": 3, "title": "Third", "url": "https://c.example.com", "content": "", "published_at": "2024-06-15T00:00:00Z"},
                    {"id": 1, "title": "First", "url": "https://a.example.com", "category": {"id": 7, "title": "Tech"}}
                ]"#,
            ))
            .mount(&server)
            .await;

        let feeds = client_for(&server).get_feeds(&token("tok-1")).await.unwrap();
        let ids: Vec<i64> = feeds.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(feeds[1].category_id(), Some(7));
        assert_eq!(feeds[1].published_at, "");
    }

    #[tokio::test]
    async fn test_get_categories() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/categories"))
            .and(header("X-Auth-Token", "tok-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"[{"id": 1, "title": "All"}, {"id": 2, "title": "News"}]"#),
            )
            .mount(&server)
            .await;

        let categories = client_for(&server)
            .get_categories(&token("tok-1"))
            .await
            .unwrap();
        assert_eq!(
            categories,
            vec![
                Category {
                    id: 1,
                    title: "All".to_string()
                },
                Category {
                    id: 2,
                    title: "News".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/feeds"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"not": "a list"}"#))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_feeds(&token("tok-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(err.kind(), FailureKind::Decode);
    }

    #[tokio::test]
    async fn test_server_error_is_decode_kind() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_categories(&token("tok-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus(500)));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("[]")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = MinifluxClient::new(
            reqwest::Client::new(),
            &server.uri(),
            Duration::from_secs(1),
        )
        .unwrap();
        let err = client.get_feeds(&token("tok-1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout(1)));
        assert_eq!(err.kind(), FailureKind::Transport);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport() {
        // Port 9 (discard) on localhost is almost never listening
        let client = MinifluxClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            Duration::from_secs(5),
        )
        .unwrap();
        let err = client.get_feeds(&token("tok-1")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Transport);
    }

    #[test]
    fn test_http_base_url_rejected() {
        let result = normalize_base_url("http://rss.example.com");
        assert!(matches!(result, Err(ApiError::InsecureBaseUrl)));
    }

    #[test]
    fn test_localhost_base_url_allowed() {
        assert!(normalize_base_url("http://localhost:8080").is_ok());
        assert!(normalize_base_url("http://127.0.0.1:8080").is_ok());
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        assert!(matches!(
            normalize_base_url("ftp://rss.example.com"),
            Err(ApiError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            normalize_base_url("not a url"),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_base_url_with_subpath_keeps_prefix() {
        let url = normalize_base_url("https://example.com/miniflux").unwrap();
        assert_eq!(
            url.join("v1/feeds").unwrap().as_str(),
            "https://example.com/miniflux/v1/feeds"
        );

        let url = normalize_base_url("https://example.com/miniflux/").unwrap();
        assert_eq!(
            url.join("v1/feeds").unwrap().as_str(),
            "https://example.com/miniflux/v1/feeds"
        );
    }
}
