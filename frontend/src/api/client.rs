use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{
    header::{HeaderMap, AUTHORIZATION},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;

use crate::{api::types::ApiError, config};

// RFC 3986 unreserved characters stay as-is inside a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Option<String>,
    bearer_token: Option<String>,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: None,
            bearer_token: None,
        }
    }

    pub fn new_with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: Some(base_url.into()),
            bearer_token: None,
        }
    }

    /// Uses a fixed credential instead of the one persisted in web storage.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub(crate) async fn resolved_base_url(&self) -> String {
        if let Some(base) = &self.base_url {
            base.trim_end_matches('/').to_string()
        } else {
            config::await_api_base_url()
                .await
                .trim_end_matches('/')
                .to_string()
        }
    }

    fn get_auth_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();

        let token = match &self.bearer_token {
            Some(token) => token.clone(),
            None => stored_access_token().ok_or_else(|| ApiError::unauthorized("No token"))?,
        };

        headers.insert(
            AUTHORIZATION,
            format!("Bearer {}", token)
                .parse()
                .map_err(|_| ApiError::unauthorized("Invalid token format"))?,
        );

        Ok(headers)
    }

    pub(crate) fn handle_unauthorized_status(status: StatusCode) {
        if status == StatusCode::UNAUTHORIZED {
            log::warn!("API returned 401, clearing local session");
            Self::clear_auth_session();
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn clear_auth_session() {
        crate::utils::storage::clear_session();
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn clear_auth_session() {}

    pub(crate) async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let headers = self.get_auth_headers()?;
        let base_url = self.resolved_base_url().await;
        Ok(self
            .client
            .request(method, format!("{}{}", base_url, path))
            .headers(headers))
    }

    /// Sends the request and turns any non-success status into an `ApiError`
    /// built from the server's error body when it has one.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::request_failed(format!("Request failed: {}", e)))?;

        let status = response.status();
        Self::handle_unauthorized_status(status);
        if status.is_success() {
            Ok(response)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn error_from(response: Response) -> ApiError {
        let status = response.status();
        match response.json::<ApiError>().await {
            Ok(error) if !error.error.trim().is_empty() => error,
            _ => ApiError::request_failed(format!("Request failed with status {}", status.as_u16())),
        }
    }

    pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        response
            .json()
            .await
            .map_err(|e| ApiError::unknown(format!("Failed to parse response: {}", e)))
    }

    pub(crate) async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        Self::decode(response).await
    }
}

#[cfg(target_arch = "wasm32")]
fn stored_access_token() -> Option<String> {
    crate::utils::storage::access_token()
}

#[cfg(not(target_arch = "wasm32"))]
fn stored_access_token() -> Option<String> {
    None
}

pub(crate) fn path_segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod host_tests {
    use super::*;

    #[test]
    fn path_segment_escapes_reserved_characters() {
        assert_eq!(path_segment("n-1"), "n-1");
        assert_eq!(path_segment("a/b?c"), "a%2Fb%3Fc");
        assert_eq!(path_segment("abc123"), "abc123");
    }

    #[tokio::test]
    async fn request_without_any_token_is_rejected_locally() {
        let client = ApiClient::new_with_base_url("http://localhost:1");
        let err = client.request(Method::GET, "/notifications").await.unwrap_err();
        assert_eq!(err.code, "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new_with_base_url("http://localhost:1/api/");
        assert_eq!(client.resolved_base_url().await, "http://localhost:1/api");
    }
}
