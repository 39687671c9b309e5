use crate::persistence::StoreError;
use polars::prelude::PolarsError;
use std::fmt;

#[derive(Debug)]
pub enum TrackerError {
    Store(StoreError),
    DataFrame(PolarsError),
    /// A submitted row (1-based, after blank rows are dropped) failed validation.
    InvalidEntry { row: usize, reason: String },
    MissingStudent,
    /// The three observations before the recent window all scored zero.
    DivideByZeroInTrend { student: String },
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Store(err) => write!(f, "{err}"),
            TrackerError::DataFrame(err) => write!(f, "dataframe error: {err}"),
            TrackerError::InvalidEntry { row, reason } => {
                write!(f, "invalid entry in row {row}: {reason}")
            }
            TrackerError::MissingStudent => write!(f, "a student must be selected"),
            TrackerError::DivideByZeroInTrend { student } => write!(
                f,
                "cannot compute habit trend for {student}: previous average is zero"
            ),
        }
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackerError::Store(err) => Some(err),
            TrackerError::DataFrame(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for TrackerError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<PolarsError> for TrackerError {
    fn from(value: PolarsError) -> Self {
        Self::DataFrame(value)
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Outcome of a user submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Saved(String),
    /// Every submitted row was blank; nothing was written.
    NoValidData,
}

impl SaveStatus {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveStatus::Saved(_))
    }

    pub fn message(&self) -> &str {
        match self {
            SaveStatus::Saved(message) => message,
            SaveStatus::NoValidData => "No valid data to save.",
        }
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
