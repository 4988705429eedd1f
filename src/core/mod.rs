pub mod error;
pub mod types;

pub use error::{MigrateError, Result};
pub use types::{ActionKind, ActionStatus, TAG_FORMAT, new_tag, parse_tag};
