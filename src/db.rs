use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{PayrollError, PayrollResult};
use crate::input::required_text;
use crate::models::{
    AdvanceStatus, Attendance, DeleteOutcome, Employee, Payslip, SalaryAdvance, UpsertOutcome,
};

/// Handle over the payroll store. Opened once at startup and passed to every operation.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> PayrollResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Self {
            conn,
            path: path.to_path_buf(),
        };
        db.init()?;
        debug!(path = %db.path.display(), "opened payroll store");
        Ok(db)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> PayrollResult<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Create the four tables if they are missing. Safe to run on every open.
    ///
    /// The layout is kept identical to existing payroll.db files. Foreign keys
    /// are declared but enforcement is switched off for the connection (the
    /// bundled SQLite turns it on by default), so deleting an employee leaves
    /// its dependent rows in place.
    pub fn init(&self) -> PayrollResult<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = OFF;

            CREATE TABLE IF NOT EXISTS employees(
                emp_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                position TEXT,
                base_salary REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS attendance(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                emp_id INTEGER NOT NULL,
                month TEXT NOT NULL,
                working_days INTEGER DEFAULT 0,
                leaves INTEGER DEFAULT 0,
                bonus REAL DEFAULT 0,
                deduction REAL DEFAULT 0,
                UNIQUE(emp_id, month),
                FOREIGN KEY(emp_id) REFERENCES employees(emp_id)
            );

            CREATE TABLE IF NOT EXISTS salary_advance(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                emp_id INTEGER NOT NULL,
                month TEXT NOT NULL,
                amount REAL NOT NULL,
                status TEXT NOT NULL DEFAULT 'Pending',
                FOREIGN KEY(emp_id) REFERENCES employees(emp_id)
            );

            CREATE TABLE IF NOT EXISTS payslips(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                emp_id INTEGER NOT NULL,
                month TEXT NOT NULL,
                gross REAL,
                deductions REAL,
                net REAL,
                FOREIGN KEY(emp_id) REFERENCES employees(emp_id)
            );
            "#,
        )?;
        Ok(())
    }

    // --- Employee operations ---

    pub fn add_employee(
        &self,
        name: &str,
        position: &str,
        base_salary: f64,
    ) -> PayrollResult<i64> {
        let name = required_text(name, "Name")?;
        self.conn.execute(
            "INSERT INTO employees (name, position, base_salary) VALUES (?1, ?2, ?3)",
            params![name, position.trim(), base_salary],
        )?;
        let emp_id = self.conn.last_insert_rowid();
        info!(emp_id, %name, "employee added");
        Ok(emp_id)
    }

    /// Overwrite name, position and base salary of the selected employee.
    pub fn update_employee(
        &self,
        emp_id: Option<i64>,
        name: &str,
        position: &str,
        base_salary: f64,
    ) -> PayrollResult<()> {
        let emp_id = emp_id.ok_or_else(|| {
            PayrollError::NotSelected("Select an employee to update".to_string())
        })?;
        let name = required_text(name, "Name")?;
        let changed = self.conn.execute(
            "UPDATE employees SET name = ?1, position = ?2, base_salary = ?3 WHERE emp_id = ?4",
            params![name, position.trim(), base_salary, emp_id],
        )?;
        if changed == 0 {
            return Err(employee_not_found(emp_id));
        }
        info!(emp_id, %name, "employee updated");
        Ok(())
    }

    /// Remove the employee row only. Attendance, advances and payslips that
    /// reference it stay behind and list with no employee name.
    pub fn delete_employee(&self, emp_id: Option<i64>) -> PayrollResult<DeleteOutcome> {
        let emp_id = emp_id.ok_or_else(|| {
            PayrollError::NotSelected("Select an employee to delete".to_string())
        })?;
        let changed = self
            .conn
            .execute("DELETE FROM employees WHERE emp_id = ?1", [emp_id])?;
        if changed == 0 {
            return Err(employee_not_found(emp_id));
        }

        let outcome = DeleteOutcome {
            orphaned_attendance: self.count_for_employee("attendance", emp_id)?,
            orphaned_advances: self.count_for_employee("salary_advance", emp_id)?,
            orphaned_payslips: self.count_for_employee("payslips", emp_id)?,
        };
        if outcome.total() > 0 {
            warn!(
                emp_id,
                attendance = outcome.orphaned_attendance,
                advances = outcome.orphaned_advances,
                payslips = outcome.orphaned_payslips,
                "employee deleted with dependent rows left in place"
            );
        } else {
            info!(emp_id, "employee deleted");
        }
        Ok(outcome)
    }

    fn count_for_employee(&self, table: &str, emp_id: i64) -> PayrollResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE emp_id = ?1", table);
        Ok(self.conn.query_row(&sql, [emp_id], |row| row.get(0))?)
    }

    pub fn get_employee(&self, emp_id: i64) -> PayrollResult<Option<Employee>> {
        Ok(self
            .conn
            .query_row(
                "SELECT emp_id, name, position, base_salary FROM employees WHERE emp_id = ?1",
                [emp_id],
                Self::row_to_employee,
            )
            .optional()?)
    }

    pub fn employee_exists(&self, emp_id: i64) -> PayrollResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM employees WHERE emp_id = ?1",
                [emp_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Search the roster. An all-digit term matches the identity exactly,
    /// anything else matches a case-insensitive substring of the name, and an
    /// empty term returns everyone. Results are in identity order.
    pub fn find_employees(&self, term: &str) -> PayrollResult<Vec<Employee>> {
        let term = term.trim();
        debug!(term, "searching employees");

        let select = "SELECT emp_id, name, position, base_salary FROM employees";
        let mut rows = Vec::new();

        if term.is_empty() {
            let mut stmt = self.conn.prepare(&format!("{} ORDER BY emp_id", select))?;
            for row in stmt.query_map([], Self::row_to_employee)? {
                rows.push(row?);
            }
        } else if let Some(id) = as_identity(term) {
            let mut stmt = self
                .conn
                .prepare(&format!("{} WHERE emp_id = ?1 ORDER BY emp_id", select))?;
            for row in stmt.query_map([id], Self::row_to_employee)? {
                rows.push(row?);
            }
        } else {
            let mut stmt = self.conn.prepare(&format!(
                "{} WHERE instr(LOWER(name), LOWER(?1)) > 0 ORDER BY emp_id",
                select
            ))?;
            for row in stmt.query_map([term], Self::row_to_employee)? {
                rows.push(row?);
            }
        }

        Ok(rows)
    }

    fn row_to_employee(row: &rusqlite::Row) -> rusqlite::Result<Employee> {
        Ok(Employee {
            emp_id: row.get(0)?,
            name: row.get(1)?,
            position: row.get(2)?,
            base_salary: row.get(3)?,
        })
    }

    // --- Attendance operations ---

    /// Record attendance for one employee and month, overwriting the figures
    /// if that pair already has a row.
    pub fn upsert_attendance(
        &self,
        emp_id: Option<i64>,
        month: &str,
        working_days: i64,
        leaves: i64,
        bonus: f64,
        deduction: f64,
    ) -> PayrollResult<UpsertOutcome> {
        let emp_id = self.require_employee(emp_id)?;
        let month = required_text(month, "Month")?;

        let tx = self.conn.unchecked_transaction()?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM attendance WHERE emp_id = ?1 AND month = ?2",
                params![emp_id, month],
                |row| row.get(0),
            )
            .optional()?;
        tx.execute(
            "INSERT INTO attendance (emp_id, month, working_days, leaves, bonus, deduction)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(emp_id, month) DO UPDATE SET
                working_days = excluded.working_days,
                leaves = excluded.leaves,
                bonus = excluded.bonus,
                deduction = excluded.deduction",
            params![emp_id, month, working_days, leaves, bonus, deduction],
        )?;
        tx.commit()?;

        let outcome = if existing.is_some() {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        };
        info!(emp_id, %month, ?outcome, "attendance saved");
        Ok(outcome)
    }

    pub fn get_attendance(&self, emp_id: i64, month: &str) -> PayrollResult<Option<Attendance>> {
        Ok(self
            .conn
            .query_row(
                "SELECT a.id, a.emp_id, e.name, a.month, a.working_days, a.leaves, a.bonus, a.deduction
                 FROM attendance a
                 LEFT JOIN employees e ON a.emp_id = e.emp_id
                 WHERE a.emp_id = ?1 AND a.month = ?2",
                params![emp_id, month],
                Self::row_to_attendance,
            )
            .optional()?)
    }

    pub fn list_attendance(&self) -> PayrollResult<Vec<Attendance>> {
        debug!("listing attendance");
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.emp_id, e.name, a.month, a.working_days, a.leaves, a.bonus, a.deduction
             FROM attendance a
             LEFT JOIN employees e ON a.emp_id = e.emp_id
             ORDER BY a.id DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_attendance)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn row_to_attendance(row: &rusqlite::Row) -> rusqlite::Result<Attendance> {
        Ok(Attendance {
            id: row.get(0)?,
            emp_id: row.get(1)?,
            employee_name: row.get(2)?,
            month: row.get(3)?,
            working_days: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            leaves: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
            bonus: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
            deduction: row.get::<_, Option<f64>>(7)?.unwrap_or(0.0),
        })
    }

    // --- Salary advance operations ---

    pub fn request_advance(
        &self,
        emp_id: Option<i64>,
        month: &str,
        amount: f64,
    ) -> PayrollResult<i64> {
        let emp_id = self.require_employee(emp_id)?;
        let month = required_text(month, "Month")?;
        self.conn.execute(
            "INSERT INTO salary_advance (emp_id, month, amount, status) VALUES (?1, ?2, ?3, ?4)",
            params![emp_id, month, amount, AdvanceStatus::Pending],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(id, emp_id, %month, amount, "advance requested");
        Ok(id)
    }

    /// Mark an advance as approved. Approving an approved advance changes nothing.
    pub fn approve_advance(&self, id: Option<i64>) -> PayrollResult<()> {
        let id = id.ok_or_else(|| {
            PayrollError::NotSelected("Select an advance request to approve".to_string())
        })?;
        let changed = self.conn.execute(
            "UPDATE salary_advance SET status = ?1 WHERE id = ?2",
            params![AdvanceStatus::Approved, id],
        )?;
        if changed == 0 {
            return Err(PayrollError::Reference(format!(
                "Advance request {} not found",
                id
            )));
        }
        info!(id, "advance approved");
        Ok(())
    }

    pub fn get_advance(&self, id: i64) -> PayrollResult<Option<SalaryAdvance>> {
        Ok(self
            .conn
            .query_row(
                "SELECT s.id, s.emp_id, e.name, s.month, s.amount, s.status
                 FROM salary_advance s
                 LEFT JOIN employees e ON s.emp_id = e.emp_id
                 WHERE s.id = ?1",
                [id],
                Self::row_to_advance,
            )
            .optional()?)
    }

    pub fn list_advances(&self) -> PayrollResult<Vec<SalaryAdvance>> {
        debug!("listing advances");
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.emp_id, e.name, s.month, s.amount, s.status
             FROM salary_advance s
             LEFT JOIN employees e ON s.emp_id = e.emp_id
             ORDER BY s.id DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_advance)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn row_to_advance(row: &rusqlite::Row) -> rusqlite::Result<SalaryAdvance> {
        Ok(SalaryAdvance {
            id: row.get(0)?,
            emp_id: row.get(1)?,
            employee_name: row.get(2)?,
            month: row.get(3)?,
            amount: row.get(4)?,
            status: row.get(5)?,
        })
    }

    // --- Payslip operations ---

    /// Append a payslip row. Earlier payslips for the same period are kept.
    pub fn record_payslip(
        &self,
        emp_id: i64,
        month: &str,
        gross: f64,
        deductions: f64,
        net: f64,
    ) -> PayrollResult<i64> {
        self.conn.execute(
            "INSERT INTO payslips (emp_id, month, gross, deductions, net) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![emp_id, month, gross, deductions, net],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(id, emp_id, %month, net, "payslip recorded");
        Ok(id)
    }

    pub fn list_payslips(&self) -> PayrollResult<Vec<Payslip>> {
        debug!("listing payslips");
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.emp_id, e.name, p.month, p.gross, p.deductions, p.net
             FROM payslips p
             LEFT JOIN employees e ON p.emp_id = e.emp_id
             ORDER BY p.id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Payslip {
                id: row.get(0)?,
                emp_id: row.get(1)?,
                employee_name: row.get(2)?,
                month: row.get(3)?,
                gross: row.get(4)?,
                deductions: row.get(5)?,
                net: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn require_employee(&self, emp_id: Option<i64>) -> PayrollResult<i64> {
        let emp_id = emp_id
            .ok_or_else(|| PayrollError::Reference("Employee ID required".to_string()))?;
        if !self.employee_exists(emp_id)? {
            return Err(employee_not_found(emp_id));
        }
        Ok(emp_id)
    }
}

fn employee_not_found(emp_id: i64) -> PayrollError {
    PayrollError::Reference(format!("Employee ID {} not found", emp_id))
}

fn as_identity(term: &str) -> Option<i64> {
    if term.chars().all(|c| c.is_ascii_digit()) {
        term.parse().ok()
    } else {
        None
    }
}
