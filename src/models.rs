use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub emp_id: i64,
    pub name: String,
    pub position: Option<String>,
    pub base_salary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    pub id: i64,
    pub emp_id: i64,
    pub employee_name: Option<String>, // None once the employee is deleted
    pub month: String,
    pub working_days: i64,
    pub leaves: i64,
    pub bonus: f64,
    pub deduction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvanceStatus {
    Pending,
    Approved,
}

impl AdvanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
        }
    }
}

impl fmt::Display for AdvanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdvanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            other => Err(format!("unknown advance status '{}'", other)),
        }
    }
}

impl ToSql for AdvanceStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AdvanceStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryAdvance {
    pub id: i64,
    pub emp_id: i64,
    pub employee_name: Option<String>,
    pub month: String,
    pub amount: f64,
    pub status: AdvanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payslip {
    pub id: i64,
    pub emp_id: i64,
    pub employee_name: Option<String>,
    pub month: String,
    pub gross: Option<f64>,
    pub deductions: Option<f64>,
    pub net: Option<f64>,
}

/// Whether an attendance upsert created the (employee, month) row or overwrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Dependent rows left pointing at a deleted employee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub orphaned_attendance: i64,
    pub orphaned_advances: i64,
    pub orphaned_payslips: i64,
}

impl DeleteOutcome {
    pub fn total(&self) -> i64 {
        self.orphaned_attendance + self.orphaned_advances + self.orphaned_payslips
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_status_round_trips_through_text() {
        assert_eq!("Pending".parse::<AdvanceStatus>(), Ok(AdvanceStatus::Pending));
        assert_eq!(AdvanceStatus::Approved.to_string(), "Approved");
        assert!("Rejected".parse::<AdvanceStatus>().is_err());
    }

    #[test]
    fn delete_outcome_total() {
        let outcome = DeleteOutcome {
            orphaned_attendance: 2,
            orphaned_advances: 1,
            orphaned_payslips: 3,
        };
        assert_eq!(outcome.total(), 6);
        assert_eq!(DeleteOutcome::default().total(), 0);
    }
}
