use thiserror::Error;

/// Failures surfaced by the record store and the payslip flow.
///
/// None of these are fatal; the caller reports them and carries on.
#[derive(Debug, Error)]
pub enum PayrollError {
    /// A required text field was empty
    #[error("{0}")]
    Validation(String),

    /// The referenced row does not exist
    #[error("{0}")]
    Reference(String),

    /// A mutating operation was invoked without a target row
    #[error("{0}")]
    NotSelected(String),

    #[error("Attendance for employee {emp_id} in {month} not found")]
    AttendanceNotFound { emp_id: i64, month: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type PayrollResult<T> = Result<T, PayrollError>;
