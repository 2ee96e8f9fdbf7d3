//! GitHub REST implementation of [`UserGateway`].

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT},
    Client,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{RepoQuery, UserId},
    error::TransportError,
    protocol::{RepositorySummary, SearchPage, UserProfile, UserSummary},
};
use tracing::debug;
use url::Url;

use crate::{
    config::Settings,
    gateway::{GatewayResult, UserGateway},
};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

pub struct HttpGateway {
    http: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(settings: &Settings) -> GatewayResult<Self> {
        let base_url = Url::parse(&settings.api_base_url).map_err(|err| {
            TransportError::Request(format!(
                "invalid api base url '{}': {err}",
                settings.api_base_url
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::Request(format!(
                "api base url '{}' cannot be used as a base",
                settings.api_base_url
            )));
        }

        let http = Client::builder()
            .default_headers(default_headers(settings)?)
            .timeout(settings.request_timeout())
            .build()
            .map_err(|err| TransportError::Request(format!("failed to build HTTP client: {err}")))?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> GatewayResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                TransportError::Request(format!("invalid api base url '{}'", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> GatewayResult<T> {
        debug!(url = %url, ?query, "http: GET");
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| TransportError::Decode(err.to_string()))
    }
}

fn default_headers(settings: &Settings) -> GatewayResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&settings.user_agent)
            .map_err(|err| TransportError::Request(format!("invalid user agent: {err}")))?,
    );

    if let Some(token) = settings.token.as_deref() {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|err| TransportError::Request(format!("invalid token value: {err}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

#[async_trait]
impl UserGateway for HttpGateway {
    async fn fetch_users_page(
        &self,
        since: Option<UserId>,
        per_page: u32,
    ) -> GatewayResult<Vec<UserSummary>> {
        let mut query = vec![("per_page", per_page.to_string())];
        if let Some(since) = since {
            query.push(("since", since.to_string()));
        }
        self.get_json(self.endpoint(&["users"])?, &query).await
    }

    async fn search_users(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> GatewayResult<SearchPage> {
        self.get_json(
            self.endpoint(&["search", "users"])?,
            &[
                ("q", query.to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ],
        )
        .await
    }

    async fn fetch_user(&self, login: &str) -> GatewayResult<UserProfile> {
        self.get_json(self.endpoint(&["users", login])?, &[]).await
    }

    async fn fetch_user_repos(
        &self,
        login: &str,
        query: &RepoQuery,
    ) -> GatewayResult<Vec<RepositorySummary>> {
        self.get_json(
            self.endpoint(&["users", login, "repos"])?,
            &[
                ("page", query.page.to_string()),
                ("per_page", query.per_page.to_string()),
                ("sort", query.sort.as_str().to_string()),
                ("direction", query.direction.as_str().to_string()),
                // Only repositories owned by the user, not ones they contribute to.
                ("type", "owner".to_string()),
            ],
        )
        .await
    }
}
