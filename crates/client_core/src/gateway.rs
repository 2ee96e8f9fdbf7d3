//! Boundary between the controllers and the remote user API.

use async_trait::async_trait;
use shared::{
    domain::{RepoQuery, UserId},
    error::TransportError,
    protocol::{RepositorySummary, SearchPage, UserProfile, UserSummary},
};

pub const DEFAULT_PAGE_SIZE: u32 = 30;

pub type GatewayResult<T> = Result<T, TransportError>;

/// Remote operations the controllers depend on.
///
/// Implementations are stateless from the controllers' point of view and
/// must tolerate concurrent calls from several in-flight operations.
#[async_trait]
pub trait UserGateway: Send + Sync {
    /// Users with an id strictly greater than `since`, in ascending id order.
    async fn fetch_users_page(
        &self,
        since: Option<UserId>,
        per_page: u32,
    ) -> GatewayResult<Vec<UserSummary>>;

    async fn search_users(&self, query: &str, page: u32, per_page: u32)
        -> GatewayResult<SearchPage>;

    async fn fetch_user(&self, login: &str) -> GatewayResult<UserProfile>;

    async fn fetch_user_repos(
        &self,
        login: &str,
        query: &RepoQuery,
    ) -> GatewayResult<Vec<RepositorySummary>>;
}
