//! Abstract interfaces for external services.

mod object_storage;
mod search_index_client;

pub use object_storage::ObjectStorage;
pub use search_index_client::SearchIndexClient;
