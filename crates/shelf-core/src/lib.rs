pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use config::{AppConfig, DuplicatePolicy, FetchConfig, HostsConfig};
pub use error::{ExitCode, Result, ShelfError};
pub use models::*;

pub use storage::database::{open_database, open_in_memory, ConnectionPool, Database};
pub use storage::queries::CollectionStatsQuery;
pub use storage::repositories::{
    ItemFilter, ItemRepository, ItemSort, Repository, SqliteItemRepository,
};
