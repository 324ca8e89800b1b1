mod error;
mod models;
mod schema;
mod store;

pub use error::{StoreError, StoreResult};
pub use models::*;
pub use store::{ContentStore, ReorderScope};
