mod backend;

pub use backend::SqliteStorage;
