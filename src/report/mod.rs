//! Report output: CSV exports, the zip archive and chat message bodies.

pub mod archive;
pub mod csv;
pub mod message;

pub use self::archive::{archive_name, create_zip};
pub use self::csv::{sanitize_type, CsvReportWriter};
pub use self::message::{summary_message, thread_message, ARCHIVE_TITLE};
