// Durable session store
// Append-only event logs per session, keyed by session id

mod db;
mod error;
mod locks;
mod store;

// Public API
pub use db::{AppendOutcome, Database};
pub use error::{Error, Result};
pub use store::SessionStore;
