use crate::error::{ApiError, PointsError};
use crate::models::{HistoryPage, PointsHistoryRequest, has_content, parse_history_response};
use crate::pagination::PageSource;
use log::{debug, info, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, ORIGIN};
use reqwest::{Client as HttpClient, StatusCode};
use std::time::Duration;

pub const BASE_URL: &str = "https://sceneplus.webapis.loyaltysite.ca";
const ORIGIN_VALUE: &str = "https://www.sceneplus.ca";
const HISTORY_PATH: &str = "/api/customer/points/history";

#[derive(Debug, Clone)]
pub struct Client {
    http: HttpClient,
    base_url: String,
}

impl Client {
    /// Create a new client with the default base URL.
    pub fn new(token: impl Into<String>) -> Result<Self, PointsError> {
        let headers = default_headers(&token.into())?;
        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        info!("Initialized points history client with default base URL");
        Ok(Self {
            http,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Override the base URL (useful for tests or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, PointsError> {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(PointsError::InvalidParameter(
                "base_url must start with http:// or https://",
            ));
        }
        self.base_url = base_url.to_string();
        info!("Updated points history base URL to {}", self.base_url);
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one page of points history.
    pub async fn fetch_points_history(
        &self,
        request: &PointsHistoryRequest,
    ) -> Result<HistoryPage, PointsError> {
        let url = format!("{}{}", self.base_url, HISTORY_PATH);
        debug!("POST request to {} for page {}", url, request.page);
        let response = self.http.post(url).json(request).send().await?;
        let status = response.status();
        debug!("Received status {}", status);
        let body = response.text().await?;
        page_from_body(request.page, status, &body)
    }
}

impl PageSource for Client {
    async fn fetch_page(&self, request: &PointsHistoryRequest) -> Result<HistoryPage, PointsError> {
        self.fetch_points_history(request).await
    }
}

/// Headers sent with every request; the bearer token is marked sensitive.
fn default_headers(token: &str) -> Result<HeaderMap, PointsError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(PointsError::MissingToken);
    }

    let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| PointsError::InvalidToken("token contains invalid header characters"))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ORIGIN, HeaderValue::from_static(ORIGIN_VALUE));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Decode one response. Server-side warnings in a 200 body are logged only.
fn page_from_body(page: u32, status: StatusCode, body: &str) -> Result<HistoryPage, PointsError> {
    handle_status(status, body)?;

    let parsed = parse_history_response(body)?;
    if has_content(&parsed.validation_errors) {
        warn!(
            "Server reported validation errors for page {}: {}",
            page, parsed.validation_errors
        );
    }
    if has_content(&parsed.data.error_details) {
        warn!(
            "Server reported error details for page {}: {}",
            page, parsed.data.error_details
        );
    }
    Ok(parsed.data)
}

/// Anything but 200 OK is fatal.
fn handle_status(status: StatusCode, body: &str) -> Result<(), PointsError> {
    if status == StatusCode::OK {
        return Ok(());
    }
    let api_error = match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => ApiError::Forbidden,
        _ => ApiError::UnexpectedStatus {
            status,
            body: body.to_string(),
        },
    };
    Err(PointsError::Api(api_error))
}
