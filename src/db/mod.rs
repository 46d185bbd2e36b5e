pub mod sessions;

pub use sessions::SqliteSessionStore;
