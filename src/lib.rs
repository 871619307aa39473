//! Profile-driven discovery of government policy records.
//!
//! Records come from a [`PolicyStore`]; the [`BrowserController`] filters,
//! ranks and paginates them locally, tracks saved policies, and hands the
//! presentation layer one consistent [`BrowseView`] at a time.

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod icons;
pub mod pagination;
pub mod saved;
pub mod store;
pub mod types;

pub use config::{BrowseSettings, Config, ConfigBuilder, PolicySource, StoreConfig};
pub use controller::{
    BrowseEvent, BrowseState, BrowseView, BrowserController, ErrorKind, PolicyCard, ViewError,
};
pub use engine::{compute, relevance_score, FilterResult, PolicyFilter, TextSearch};
pub use error::{Error, Result};
pub use icons::IconKey;
pub use pagination::{window, Paginator, Window, DEFAULT_PAGE_SIZE};
pub use saved::{SaveToggled, SavedSet};
pub use store::{FilePolicyStore, HttpPolicyStore, MemoryPolicyStore, PolicyStore};
pub use types::{
    Category, CategoryFilter, IncomeRange, PolicyId, PolicyRecord, Profession, ProfileCriteria,
    SearchCriteria, SortMode,
};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{BrowseSettings, Config, ConfigBuilder, PolicySource};
    pub use crate::controller::{BrowseView, BrowserController, ErrorKind};
    pub use crate::error::{Error, Result};
    pub use crate::store::{FilePolicyStore, HttpPolicyStore, MemoryPolicyStore, PolicyStore};
    pub use crate::types::{CategoryFilter, PolicyId, PolicyRecord, Profession, SortMode};
    pub use futures::StreamExt;
}
