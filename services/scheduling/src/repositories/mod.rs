//! Repositories for database operations

pub mod directory;
pub mod grants;
pub mod time_entries;

pub use directory::PgOrgDirectory;
pub use grants::PgGrantStore;
pub use time_entries::TimeEntryRepository;
