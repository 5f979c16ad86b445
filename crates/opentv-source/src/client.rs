//! `GuideApiClient` - HTTP guide API client implementation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use opentv_guide::{Channel, Program};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use super::api::GuideSource;

/// Path of the channel list endpoint, relative to the base URL.
const CHANNELS_PATH: &str = "api/channels";

/// Path of the program list endpoint, relative to the base URL.
const PROGRAMS_PATH: &str = "api/programs";

/// HTTP guide API client.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct GuideApiClient {
    /// HTTP client (reqwest, gzip enabled).
    http_client: Client,
    /// Base URL, always ending with `/`.
    base_url: Url,
}

/// Builder for `GuideApiClient`.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct GuideApiClientBuilder {
    base_url: Option<Url>,
    user_agent: Option<String>,
}

impl GuideApiClientBuilder {
    /// Creates a new builder.
    const fn new() -> Self {
        Self {
            base_url: None,
            user_agent: None,
        }
    }

    /// Sets the API base URL (required).
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the User-Agent (required).
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// - `base_url` or `user_agent` is not set.
    /// - `reqwest::Client` build fails.
    pub fn build(self) -> Result<GuideApiClient> {
        let mut base_url = self.base_url.context("base_url is required")?;
        let user_agent = self.user_agent.context("user_agent is required")?;

        // Url::join replaces the last segment unless the path ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .gzip(true)
            .build()
            .context("failed to build HTTP client")?;

        Ok(GuideApiClient {
            http_client,
            base_url,
        })
    }
}

impl GuideApiClient {
    /// Creates a new builder.
    #[must_use]
    pub const fn builder() -> GuideApiClientBuilder {
        GuideApiClientBuilder::new()
    }

    /// The normalized base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends a GET request to `path` and decodes the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("invalid endpoint path {path}"))?;

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;

        let status = response.status();
        tracing::debug!(%url, %status, "Response received");

        let response = response
            .error_for_status()
            .with_context(|| format!("GET {url} returned an error status"))?;

        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode JSON from {url}"))
    }
}

impl GuideSource for GuideApiClient {
    #[instrument(skip_all)]
    async fn fetch_channels(&self) -> Result<Vec<Channel>> {
        self.get_json(CHANNELS_PATH).await
    }

    /// The API materializes programs itself, so `reference` is unused.
    #[instrument(skip_all)]
    async fn fetch_programs(&self, _reference: DateTime<Utc>) -> Result<Vec<Program>> {
        self.get_json(PROGRAMS_PATH).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use chrono::TimeZone;

    use super::*;

    const CHANNELS_BODY: &str = r#"[
        {"id":"c1","name":"News","category":"News","favorite":false,
         "logo":"img/c1.png","streamUrl":"http://x/s1","epgId":"e1"}
    ]"#;

    const PROGRAMS_BODY: &str = r#"[
        {"id":"c1-0","channelId":"c1","title":"Morning","description":"d",
         "start":"2023-12-31T23:50:00.000Z","end":"2024-01-01T00:20:00.000Z"}
    ]"#;

    fn client_for(uri: &str) -> GuideApiClient {
        GuideApiClient::builder()
            .base_url(uri.parse().unwrap())
            .user_agent("test/0.0.0")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_base_url() {
        // Arrange & Act
        let result = GuideApiClient::builder().user_agent("test/0.0.0").build();

        // Assert
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("base_url is required")
        );
    }

    #[test]
    fn test_builder_requires_user_agent() {
        // Arrange & Act
        let result = GuideApiClient::builder()
            .base_url(Url::parse("http://localhost:3000").unwrap())
            .build();

        // Assert
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("user_agent is required")
        );
    }

    #[test]
    fn test_builder_appends_trailing_slash() {
        // Arrange & Act
        let client = client_for("http://localhost:3000/tv");

        // Assert
        assert_eq!(client.base_url().as_str(), "http://localhost:3000/tv/");
        assert_eq!(
            client.base_url().join(CHANNELS_PATH).unwrap().as_str(),
            "http://localhost:3000/tv/api/channels"
        );
    }

    #[tokio::test]
    async fn test_fetch_channels_via_http() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/channels"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(CHANNELS_BODY))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server.uri());

        // Act
        let channels = client.fetch_channels().await.unwrap();

        // Assert
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].epg_id, "e1");
        assert_eq!(channels[0].stream_url, "http://x/s1");
    }

    #[tokio::test]
    async fn test_fetch_programs_via_http() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/programs"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(PROGRAMS_BODY))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server.uri());

        // Act
        let programs = client.fetch_programs(Utc::now()).await.unwrap();

        // Assert
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].id, "c1-0");
        assert_eq!(
            programs[0].start,
            Utc.with_ymd_and_hms(2023, 12, 31, 23, 50, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_fetch_channels_error_status() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server.uri());

        // Act
        let result = client.fetch_channels().await;

        // Assert
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("returned an error status")
        );
    }

    #[tokio::test]
    async fn test_fetch_channels_invalid_json() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&mock_server)
            .await;
        let client = client_for(&mock_server.uri());

        // Act
        let result = client.fetch_channels().await;

        // Assert
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("failed to decode JSON")
        );
    }

    #[tokio::test]
    async fn test_user_agent_is_sent() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::header("User-Agent", "opentv/0.1.0"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&mock_server)
            .await;
        let client = GuideApiClient::builder()
            .base_url(mock_server.uri().parse().unwrap())
            .user_agent("opentv/0.1.0")
            .build()
            .unwrap();

        // Act & Assert (mock expect(1) verifies User-Agent header)
        client.fetch_channels().await.unwrap();
    }
}
