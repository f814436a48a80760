pub mod documents;
pub mod state;

pub use documents::{DocumentStore, DocumentStoreHandle, SqliteDocumentStore};
pub use state::{BrowserStateStore, IdentityStore};
