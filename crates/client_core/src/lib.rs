//! State controllers for a paginated, searchable user directory and a
//! per-user detail view, driven by a remote [`UserGateway`].

pub mod config;
mod debounce;
pub mod detail;
pub mod gateway;
pub mod http;
pub mod list;
pub mod pagination;

pub use config::{load_settings, load_settings_from, ConfigError, Settings};
pub use detail::{DetailController, DetailState};
pub use gateway::{GatewayResult, UserGateway, DEFAULT_PAGE_SIZE};
pub use http::HttpGateway;
pub use list::{ListOptions, ListState, UserListController};

#[cfg(test)]
#[path = "tests/scripted_gateway.rs"]
pub(crate) mod scripted_gateway;
