use serde::Serialize;
use tracing::debug;

use crate::db::Database;
use crate::error::{PayrollError, PayrollResult};
use crate::input::required_text;

/// Every month is valued as 30 days, whatever the calendar says.
pub const DAYS_PER_MONTH: f64 = 30.0;

pub const CURRENCY_SYMBOL: &str = "₹";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PayBreakdown {
    pub per_day: f64,
    pub gross: f64,
    pub deductions: f64,
    pub net: f64,
}

impl PayBreakdown {
    /// Copy with each amount rounded to two decimal places.
    pub fn rounded(&self) -> Self {
        Self {
            per_day: round2(self.per_day),
            gross: round2(self.gross),
            deductions: round2(self.deductions),
            net: round2(self.net),
        }
    }
}

/// Pro-rated monthly pay. Net is not clamped and may go negative.
pub fn compute(
    base_salary: f64,
    working_days: i64,
    leaves: i64,
    bonus: f64,
    deduction: f64,
) -> PayBreakdown {
    let per_day = base_salary / DAYS_PER_MONTH;
    let gross = working_days as f64 * per_day + bonus;
    let deductions = deduction + leaves as f64 * per_day;
    PayBreakdown {
        per_day,
        gross,
        deductions,
        net: gross - deductions,
    }
}

/// Two decimal places, ties to even, the way the legacy payslips were stored.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// A payslip that has just been computed and recorded.
#[derive(Debug, Clone, Serialize)]
pub struct PayslipReport {
    pub payslip_id: i64,
    pub emp_id: i64,
    pub employee_name: String,
    pub month: String,
    pub pay: PayBreakdown,
    pub generated_at: String,
}

impl PayslipReport {
    pub fn render(&self) -> String {
        format!(
            "Payslip for {} ({}) - {}\nGross: {sym}{:.2}\nDeductions: {sym}{:.2}\nNet Pay: {sym}{:.2}",
            self.employee_name,
            self.emp_id,
            self.month,
            self.pay.gross,
            self.pay.deductions,
            self.pay.net,
            sym = CURRENCY_SYMBOL,
        )
    }
}

/// Compute pay for one employee and month from the recorded attendance and
/// append the rounded result to the payslip log.
///
/// Nothing is written unless both the employee and the attendance row exist.
pub fn generate_payslip(
    db: &Database,
    emp_id: Option<i64>,
    month: &str,
) -> PayrollResult<PayslipReport> {
    let emp_id =
        emp_id.ok_or_else(|| PayrollError::Reference("Employee ID required".to_string()))?;
    let month = required_text(month, "Month")?;

    let employee = db
        .get_employee(emp_id)?
        .ok_or_else(|| PayrollError::Reference(format!("Employee ID {} not found", emp_id)))?;
    let attendance = db
        .get_attendance(emp_id, &month)?
        .ok_or_else(|| PayrollError::AttendanceNotFound {
            emp_id,
            month: month.clone(),
        })?;

    let pay = compute(
        employee.base_salary,
        attendance.working_days,
        attendance.leaves,
        attendance.bonus,
        attendance.deduction,
    );
    debug!(emp_id, %month, ?pay, "computed pay");

    let pay = pay.rounded();
    let payslip_id = db.record_payslip(emp_id, &month, pay.gross, pay.deductions, pay.net)?;

    Ok(PayslipReport {
        payslip_id,
        emp_id,
        employee_name: employee.name,
        month,
        pay,
        generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_matches_worked_example() {
        let pay = compute(30000.0, 25, 2, 500.0, 100.0);
        assert_eq!(pay.per_day, 1000.0);
        assert_eq!(pay.gross, 25500.0);
        assert_eq!(pay.deductions, 2100.0);
        assert_eq!(pay.net, 23400.0);
    }

    #[test]
    fn net_is_gross_minus_deductions() {
        let cases = [
            (31000.0, 22, 3, 125.5, 40.25),
            (17999.99, 30, 0, 0.0, 0.0),
            (0.0, 10, 10, 10.0, 10.0),
            (45000.0, 0, 30, 0.0, 999.0),
        ];
        for (base, work, leaves, bonus, ded) in cases {
            let pay = compute(base, work, leaves, bonus, ded);
            assert_eq!(pay.net, pay.gross - pay.deductions);
            assert_eq!(pay.gross, work as f64 * (base / 30.0) + bonus);
        }
    }

    #[test]
    fn net_may_go_negative() {
        let pay = compute(3000.0, 1, 20, 0.0, 500.0);
        assert!(pay.net < 0.0);
        assert_eq!(pay.net, 100.0 - 2500.0);
    }

    #[test]
    fn rounding_to_cents() {
        assert_eq!(round2(1234.5678), 1234.57);
        assert_eq!(round2(-0.004), -0.0);
        let pay = compute(10000.0, 1, 0, 0.0, 0.0).rounded();
        assert_eq!(pay.gross, 333.33);
    }

    #[test]
    fn exact_halves_round_to_even_cent() {
        assert_eq!(compute(0.0, 0, 0, 10.125, 0.0).rounded().gross, 10.12);
        assert_eq!(compute(0.0, 0, 0, 10.375, 0.0).rounded().gross, 10.38);
        assert_eq!(round2(-0.125), -0.12);
    }

    #[test]
    fn generate_payslip_records_rounded_amounts() {
        let db = Database::open_in_memory().unwrap();
        let emp = db.add_employee("Asha", "Engineer", 30000.0).unwrap();
        db.upsert_attendance(Some(emp), "2025-10", 25, 2, 500.0, 100.0)
            .unwrap();

        let report = generate_payslip(&db, Some(emp), "2025-10").unwrap();
        assert_eq!(report.pay.gross, 25500.0);
        assert_eq!(report.pay.deductions, 2100.0);
        assert_eq!(report.pay.net, 23400.0);

        let slips = db.list_payslips().unwrap();
        assert_eq!(slips.len(), 1);
        assert_eq!(slips[0].id, report.payslip_id);
        assert_eq!(slips[0].net, Some(23400.0));
    }

    #[test]
    fn generate_payslip_twice_appends() {
        let db = Database::open_in_memory().unwrap();
        let emp = db.add_employee("Asha", "", 9000.0).unwrap();
        db.upsert_attendance(Some(emp), "2025-10", 20, 0, 0.0, 0.0)
            .unwrap();
        generate_payslip(&db, Some(emp), "2025-10").unwrap();
        generate_payslip(&db, Some(emp), "2025-10").unwrap();
        assert_eq!(db.list_payslips().unwrap().len(), 2);
    }

    #[test]
    fn generate_payslip_without_attendance_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let emp = db.add_employee("Asha", "", 30000.0).unwrap();

        let err = generate_payslip(&db, Some(emp), "2025-10").unwrap_err();
        assert!(matches!(
            err,
            PayrollError::AttendanceNotFound { emp_id, ref month } if emp_id == emp && month == "2025-10"
        ));
        assert!(db.list_payslips().unwrap().is_empty());
    }

    #[test]
    fn generate_payslip_error_paths() {
        let db = Database::open_in_memory().unwrap();
        db.add_employee("Asha", "", 30000.0).unwrap();
        assert!(matches!(
            generate_payslip(&db, Some(42), "2025-10"),
            Err(PayrollError::Reference(_))
        ));
        assert!(matches!(
            generate_payslip(&db, None, "2025-10"),
            Err(PayrollError::Reference(_))
        ));
        assert!(matches!(
            generate_payslip(&db, Some(1), " "),
            Err(PayrollError::Validation(_))
        ));
        assert!(db.list_payslips().unwrap().is_empty());
    }

    #[test]
    fn render_uses_fixed_symbol() {
        let report = PayslipReport {
            payslip_id: 1,
            emp_id: 4,
            employee_name: "Asha".to_string(),
            month: "2025-10".to_string(),
            pay: compute(30000.0, 25, 2, 500.0, 100.0).rounded(),
            generated_at: String::new(),
        };
        assert_eq!(
            report.render(),
            "Payslip for Asha (4) - 2025-10\nGross: ₹25500.00\nDeductions: ₹2100.00\nNet Pay: ₹23400.00"
        );
    }
}
