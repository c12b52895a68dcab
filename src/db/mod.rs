//! Persistent store: passages with embeddings, chat sessions and messages.
//!
//! The pipeline talks to storage through the [`PassageStore`] and
//! [`SessionStore`] capability traits so tests can substitute in-memory
//! fakes; [`PgStore`] is the PostgreSQL + pgvector implementation used in
//! production.

mod postgres;
mod traits;

pub use postgres::PgStore;
pub use traits::{
    IngestionStatusRow, NewPassage, PassageHit, PassageStore, PendingDocument, SessionStore,
    StoredMessage,
};
