//! Bookkeeping for the user list: browse cursor, in-flight guard,
//! end-of-data marker and browse/search mode.
//!
//! Every transition returns a new value; the list controller swaps it in
//! under the same lock that publishes the matching `ListState`.

use shared::domain::UserId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Browsing,
    /// The query whose results are (or will be) on screen.
    Searching { query: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    mode: Mode,
    cursor: Option<UserId>,
    in_flight: bool,
    end_of_data: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            mode: Mode::Browsing,
            cursor: None,
            in_flight: false,
            end_of_data: false,
        }
    }
}

impl Pagination {
    /// First browse page requested from scratch.
    pub fn restart_browse() -> Self {
        Self {
            in_flight: true,
            ..Self::default()
        }
    }

    /// Search issued for `query`; browse position is forgotten.
    pub fn start_search(query: impl Into<String>) -> Self {
        Self {
            mode: Mode::Searching {
                query: query.into(),
            },
            cursor: None,
            in_flight: true,
            end_of_data: false,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn cursor(&self) -> Option<UserId> {
        self.cursor
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn end_of_data(&self) -> bool {
        self.end_of_data
    }

    pub fn is_searching(&self) -> bool {
        matches!(self.mode, Mode::Searching { .. })
    }

    pub fn active_query(&self) -> Option<&str> {
        match &self.mode {
            Mode::Searching { query } => Some(query),
            Mode::Browsing => None,
        }
    }

    pub fn can_load_more(&self) -> bool {
        !self.in_flight && !self.end_of_data && !self.is_searching()
    }

    /// Next browse page requested. Caller must have checked `can_load_more`.
    pub fn begin_page(&self) -> Self {
        Self {
            in_flight: true,
            ..self.clone()
        }
    }

    /// A browse page arrived. An empty page marks the end of data and keeps
    /// the previous cursor.
    pub fn finish_page(&self, last_id: Option<UserId>) -> Self {
        Self {
            mode: Mode::Browsing,
            cursor: last_id.or(self.cursor),
            in_flight: false,
            end_of_data: last_id.is_none(),
        }
    }

    pub fn finish_search(&self) -> Self {
        Self {
            in_flight: false,
            ..self.clone()
        }
    }

    /// A fetch failed. The accumulated list is dropped with it, so browsing
    /// restarts from the first page; search mode is kept.
    pub fn fail(&self) -> Self {
        Self {
            mode: self.mode.clone(),
            cursor: None,
            in_flight: false,
            end_of_data: false,
        }
    }
}
