pub mod checksum;
pub mod classify;
pub mod cli;
pub mod error;
pub mod extract;
pub mod header;
pub mod package;
pub mod report;
pub mod sort;

pub use classify::AcquisitionKey;
pub use error::{DicompackError, Result};
pub use header::HeaderFields;
pub use report::{LogReporter, Reporter};
pub use sort::{FileOutcome, SortSummary};
