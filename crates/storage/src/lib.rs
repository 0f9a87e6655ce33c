#![forbid(unsafe_code)]

pub mod document;
pub mod memory;
pub mod path;
pub mod repository;
pub mod sqlite;

pub use document::{Document, Fields, fields};
pub use memory::InMemoryStore;
pub use path::DocPath;
pub use repository::{
    ContentStore, FieldFilter, ProgressStore, Storage, StorageError, Subscription, WatchStore,
};
pub use sqlite::{SqliteInitError, SqliteStore};
