//! Client for the Request Tracker REST 2.0 API.
//!
//! [`ApiResource`] composes endpoints under the `REST/2.0` base path and
//! attaches the token; [`TicketResource`] layers the ticket operations on top
//! of any [`RequestSender`].

pub mod error;
pub mod search;
pub mod ticket;
pub mod transport;

pub use error::{ApiError, ErrorKind, Result};
pub use rt_rest2_config::{Config, Profile};
pub use ticket::{TicketId, TicketProperties, TicketResource, TransactionId};
pub use transport::{ApiRequest, ApiResponse, HttpClient, ReqwestClient, SendOptions};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use std::path::Path;
use tracing::debug;

pub const API_BASE_URI: &str = "REST/2.0";

/// `REST/2.0/<endpoint>` with leading and trailing slashes removed from the
/// endpoint.
pub fn compose_path(endpoint: &str) -> String {
    format!("{}/{}", API_BASE_URI, endpoint.trim_matches('/'))
}

#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn send_request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<String>,
        headers: HeaderMap,
    ) -> Result<ApiResponse>;
}

pub struct ApiResource<C = ReqwestClient> {
    client: C,
    token: String,
}

impl<C: HttpClient> ApiResource<C> {
    pub fn new(client: C, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
        }
    }

    /// Takes effect on the next dispatched request.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn auth_options(&self) -> Result<SendOptions> {
        let mut value = HeaderValue::from_str(&format!("token {}", self.token))
            .map_err(|_| ApiError::InvalidHeader("Authorization".to_string()))?;
        value.set_sensitive(true);

        let mut options = SendOptions::default();
        options.headers.insert(AUTHORIZATION, value);
        Ok(options)
    }
}

impl ApiResource<ReqwestClient> {
    /// Build a client from a configured profile. The token falls back to
    /// `RT_TOKEN` when the profile has none.
    pub fn from_profile(profile: &Profile) -> Result<Self> {
        let base_url = profile
            .base_url
            .as_deref()
            .ok_or(ApiError::MissingConfig("base_url"))?;
        let token = profile
            .token_or_env()
            .ok_or(ApiError::MissingConfig("token"))?;

        Ok(Self::new(ReqwestClient::new(base_url)?, token))
    }

    /// Resolve `requested` (or the default profile) in `config` and build a
    /// client from it.
    pub fn from_config(config: &Config, requested: Option<&str>) -> Result<Self> {
        let (name, profile) = config
            .resolve_profile(requested)
            .ok_or(ApiError::MissingConfig("profile"))?;
        debug!(profile = name, "Using RT profile");

        Self::from_profile(profile)
    }

    /// Like [`from_config`](Self::from_config), reading `path` or
    /// `~/.rt-rest2/config.yaml` when `path` is `None`.
    pub fn from_config_file(path: Option<&Path>, requested: Option<&str>) -> Result<Self> {
        let config = match path {
            Some(path) => Config::load(path),
            None => Config::load_default(),
        }
        .map_err(|err| ApiError::Config(format!("{err:#}")))?;

        Self::from_config(&config, requested)
    }
}

#[async_trait]
impl<C: HttpClient> RequestSender for ApiResource<C> {
    async fn send_request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<String>,
        headers: HeaderMap,
    ) -> Result<ApiResponse> {
        let request = ApiRequest {
            method,
            path: compose_path(endpoint),
            headers,
            body,
        };
        let options = self.auth_options()?;

        self.client.send(request, options).await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingClient;
    use super::*;
    use reqwest::header::CONTENT_TYPE;

    #[test]
    fn test_compose_path_trims_separators() {
        assert_eq!(compose_path("ticket/5"), "REST/2.0/ticket/5");
        assert_eq!(compose_path("/ticket/5/"), "REST/2.0/ticket/5");
        assert_eq!(compose_path("/ticket/5"), "REST/2.0/ticket/5");
        assert_eq!(compose_path("//ticket/5//"), "REST/2.0/ticket/5");
    }

    #[tokio::test]
    async fn test_send_request_builds_request() {
        let api = ApiResource::new(RecordingClient::default(), "abc123");

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        api.send_request(Method::POST, "/ticket/", Some("{}".to_string()), headers)
            .await
            .unwrap();

        let (request, options) = api.client().last();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "REST/2.0/ticket");
        assert_eq!(request.body.as_deref(), Some("{}"));
        assert_eq!(request.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(options.headers.get(AUTHORIZATION).unwrap(), "token abc123");
    }

    #[tokio::test]
    async fn test_auth_is_a_dispatch_option() {
        let api = ApiResource::new(RecordingClient::default(), "abc123");

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        api.send_request(Method::GET, "ticket/5", None, headers)
            .await
            .unwrap();

        let (request, options) = api.client().last();
        let dispatched = transport::merge_headers(request.headers, &options.headers);
        let auth: Vec<_> = dispatched.get_all(AUTHORIZATION).iter().collect();
        assert_eq!(auth.len(), 1);
        assert_eq!(auth[0], "token abc123");
        assert!(auth[0].is_sensitive());
    }

    #[tokio::test]
    async fn test_set_token_applies_to_next_request() {
        let mut api = ApiResource::new(RecordingClient::default(), "old");
        api.set_token("new");
        assert_eq!(api.token(), "new");

        api.send_request(Method::GET, "ticket/1", None, HeaderMap::new())
            .await
            .unwrap();

        let (_, options) = api.client().last();
        assert_eq!(options.headers.get(AUTHORIZATION).unwrap(), "token new");
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let api = ApiResource::new(RecordingClient::default(), "bad\ntoken");

        let err = api
            .send_request(Method::GET, "ticket/1", None, HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidHeader(_)));
        assert!(api.client().sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_from_profile() {
        let profile = Profile {
            base_url: Some("https://rt.example.com".to_string()),
            token: Some("abc123".to_string()),
        };
        let api = ApiResource::from_profile(&profile).unwrap();
        assert_eq!(api.token(), "abc123");
        assert_eq!(api.client().server_url().as_str(), "https://rt.example.com/");
    }

    fn config_with(profiles: &[(&str, &str)], default_profile: Option<&str>) -> Config {
        let mut config = Config {
            default_profile: default_profile.map(str::to_string),
            ..Default::default()
        };
        for (name, base_url) in profiles {
            config.profiles.insert(
                name.to_string(),
                Profile {
                    base_url: Some(base_url.to_string()),
                    token: Some(format!("{name}-token")),
                },
            );
        }
        config
    }

    #[test]
    fn test_from_config_resolves_profile() {
        let config = config_with(
            &[("helpdesk", "https://rt.example.com"), ("ops", "https://ops.example.com")],
            Some("helpdesk"),
        );

        let api = ApiResource::from_config(&config, None).unwrap();
        assert_eq!(api.token(), "helpdesk-token");

        let api = ApiResource::from_config(&config, Some("ops")).unwrap();
        assert_eq!(api.token(), "ops-token");
        assert_eq!(api.client().server_url().as_str(), "https://ops.example.com/");
    }

    #[test]
    fn test_from_config_without_matching_profile() {
        let empty = Config::default();
        let err = ApiResource::from_config(&empty, None).err().unwrap();
        assert!(matches!(err, ApiError::MissingConfig("profile")));

        let config = config_with(&[("helpdesk", "https://rt.example.com")], None);
        let err = ApiResource::from_config(&config, Some("ops")).err().unwrap();
        assert!(matches!(err, ApiError::MissingConfig("profile")));
    }

    #[test]
    fn test_from_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        config_with(&[("helpdesk", "https://rt.example.com")], None)
            .save(&path)
            .unwrap();

        let api = ApiResource::from_config_file(Some(path.as_path()), None).unwrap();
        assert_eq!(api.token(), "helpdesk-token");
    }

    #[test]
    fn test_from_config_file_malformed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "profiles: [unclosed").unwrap();

        let err = ApiResource::from_config_file(Some(path.as_path()), None).err().unwrap();
        assert!(matches!(err, ApiError::Config(_)));
        assert!(err.to_string().contains("Malformed YAML"));
    }

    #[test]
    fn test_from_profile_missing_base_url() {
        let profile = Profile {
            base_url: None,
            token: Some("abc123".to_string()),
        };
        let err = ApiResource::from_profile(&profile).err().unwrap();
        assert!(matches!(err, ApiError::MissingConfig("base_url")));
    }
}
