//! Projection of profile response bodies into [`ProfileRecord`]s.
//!
//! The expected shape is validated by a typed model before anything is
//! copied, so a changed or truncated response is reported as an
//! [`ExtractionError`] instead of yielding a partial record.

mod error;
mod extract;

pub use error::ExtractionError;
pub use extract::{ProfileInfo, ProfileRecord, ProfileReport, extract};
