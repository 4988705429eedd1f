pub mod locator;
pub mod record;
pub mod recorder;

pub use locator::{JOURNAL_EXTENSION, JournalStore, journal_path};
pub use record::{ActionRecord, MigrationRun, RunHeader};
pub use recorder::JournalRecorder;
