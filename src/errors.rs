//! Application-level error types.

use crate::analytics::date_filter::DateParseError;
use crate::analytics::export::ExportError;
use crate::io::LoadError;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the report pipeline and the dashboard server.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// The analysis file could not be loaded
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The report could not be exported
    #[error(transparent)]
    Export(#[from] ExportError),

    /// A date given on the command line or in a query string
    #[error("Invalid date parameter: {0}")]
    InvalidDate(#[from] DateParseError),

    /// No uploaded dataset for this session id
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),
}

pub type DashboardResult<T> = Result<T, DashboardError>;
