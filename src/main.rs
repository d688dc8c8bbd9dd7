mod config;
mod db;
mod error;
mod input;
mod models;
mod payroll;
mod tui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use db::Database;
use error::{PayrollError, PayrollResult};
use input::{parse_decimal, parse_id, parse_integer};
use models::{Employee, UpsertOutcome};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "payroll")]
#[command(about = "Payroll desk - employees, attendance, payslips and salary advances")]
struct Cli {
    /// Path to the payroll database
    #[arg(long, global = true, env = config::DB_ENV_VAR)]
    db: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database if needed and show where it lives
    Init,

    /// Manage the employee roster
    Employee {
        #[command(subcommand)]
        command: EmployeeCommands,
    },

    /// Record and list monthly attendance
    Attendance {
        #[command(subcommand)]
        command: AttendanceCommands,
    },

    /// Generate and list payslips
    Payslip {
        #[command(subcommand)]
        command: PayslipCommands,
    },

    /// Request, approve and list salary advances
    Advance {
        #[command(subcommand)]
        command: AdvanceCommands,
    },

    /// Browse all tables interactively
    Browse,
}

#[derive(Subcommand)]
enum EmployeeCommands {
    /// Add an employee
    Add {
        name: String,

        #[arg(short, long, default_value = "")]
        position: String,

        /// Monthly base salary
        #[arg(short, long, default_value = "", allow_hyphen_values = true)]
        salary: String,
    },

    /// Overwrite name, position and salary of an employee
    Update {
        /// Employee ID
        #[arg(long, default_value = "")]
        id: String,

        name: String,

        #[arg(short, long, default_value = "")]
        position: String,

        #[arg(short, long, default_value = "", allow_hyphen_values = true)]
        salary: String,
    },

    /// Delete an employee (their attendance, advances and payslips are kept)
    Delete {
        /// Employee ID
        #[arg(long, default_value = "")]
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List employees, optionally filtered by ID or name
    List {
        /// Employee ID, or part of a name
        #[arg(default_value = "")]
        term: String,

        #[arg(long)]
        json: bool,
    },

    /// Show one employee
    Show {
        /// Employee ID
        id: String,
    },
}

#[derive(Subcommand)]
enum AttendanceCommands {
    /// Add or update attendance for an employee and month
    Set {
        /// Employee ID
        emp_id: String,

        /// Period key, e.g. 2025-10
        month: String,

        #[arg(short, long, default_value = "", allow_hyphen_values = true)]
        working_days: String,

        #[arg(short, long, default_value = "", allow_hyphen_values = true)]
        leaves: String,

        #[arg(short, long, default_value = "", allow_hyphen_values = true)]
        bonus: String,

        #[arg(short, long, default_value = "", allow_hyphen_values = true)]
        deduction: String,
    },

    /// List attendance, most recent first
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PayslipCommands {
    /// Calculate pay from attendance and record a payslip
    Generate {
        /// Employee ID
        emp_id: String,

        /// Period key, e.g. 2025-10
        month: String,

        #[arg(long)]
        json: bool,
    },

    /// List payslips, most recent first
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AdvanceCommands {
    /// Request a salary advance
    Request {
        /// Employee ID
        emp_id: String,

        /// Period key, e.g. 2025-10
        month: String,

        #[arg(short, long, default_value = "", allow_hyphen_values = true)]
        amount: String,
    },

    /// Approve an advance request
    Approve {
        /// Advance request ID
        #[arg(long, default_value = "")]
        id: String,
    },

    /// List advance requests, most recent first
    List {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.db, cli.verbose);
    config::init_logging(&config);

    let db = Database::open(&config.db_path).with_context(|| {
        format!("Failed to open database at {}", config.db_path.display())
    })?;

    match cli.command {
        Commands::Init => {
            println!("Database ready at {}", db.path().display());
        }

        Commands::Employee { command } => run_employee(&db, command)?,
        Commands::Attendance { command } => run_attendance(&db, command)?,
        Commands::Payslip { command } => run_payslip(&db, command)?,
        Commands::Advance { command } => run_advance(&db, command)?,

        Commands::Browse => tui::run_browse(&db)?,
    }

    Ok(())
}

fn run_employee(db: &Database, command: EmployeeCommands) -> Result<()> {
    match command {
        EmployeeCommands::Add {
            name,
            position,
            salary,
        } => {
            let emp_id = db.add_employee(&name, &position, parse_decimal(&salary, 0.0))?;
            println!("Employee added (ID: {})", emp_id);
        }

        EmployeeCommands::Update {
            id,
            name,
            position,
            salary,
        } => {
            let emp_id = parse_id(&id);
            db.update_employee(emp_id, &name, &position, parse_decimal(&salary, 0.0))?;
            println!("Employee updated");
        }

        EmployeeCommands::Delete { id, yes } => {
            let emp_id = parse_id(&id);
            if let Some(emp_id) = emp_id {
                if !yes && !confirm(&format!("Delete employee ID {}?", emp_id))? {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            let outcome = db.delete_employee(emp_id)?;
            println!("Employee deleted");
            if outcome.total() > 0 {
                println!(
                    "Kept {} attendance, {} advance and {} payslip record(s) for the deleted employee.",
                    outcome.orphaned_attendance, outcome.orphaned_advances, outcome.orphaned_payslips
                );
            }
        }

        EmployeeCommands::List { term, json } => {
            let employees = db.find_employees(&term)?;
            if json {
                return print_json(&employees);
            }
            if employees.is_empty() {
                println!("No employees found.");
            } else {
                println!("{:<6} {:<25} {:<20} {:>12}", "ID", "NAME", "POSITION", "BASE SALARY");
                println!("{}", "-".repeat(66));
                for emp in employees {
                    println!(
                        "{:<6} {:<25} {:<20} {:>12.2}",
                        emp.emp_id,
                        truncate(&emp.name, 23),
                        truncate(&emp.position.unwrap_or_default(), 18),
                        emp.base_salary
                    );
                }
            }
        }

        EmployeeCommands::Show { id } => {
            let emp = lookup_employee(db, &id)?;
            println!("Employee #{}", emp.emp_id);
            println!("Name: {}", emp.name);
            if let Some(position) = emp.position.filter(|p| !p.is_empty()) {
                println!("Position: {}", position);
            }
            println!("Base salary: {}{:.2}", payroll::CURRENCY_SYMBOL, emp.base_salary);
        }
    }
    Ok(())
}

fn lookup_employee(db: &Database, id: &str) -> PayrollResult<Employee> {
    let emp_id = parse_id(id)
        .ok_or_else(|| PayrollError::Reference("Employee ID required".to_string()))?;
    db.get_employee(emp_id)?
        .ok_or_else(|| PayrollError::Reference(format!("Employee ID {} not found", emp_id)))
}

fn run_attendance(db: &Database, command: AttendanceCommands) -> Result<()> {
    match command {
        AttendanceCommands::Set {
            emp_id,
            month,
            working_days,
            leaves,
            bonus,
            deduction,
        } => {
            let outcome = db.upsert_attendance(
                parse_id(&emp_id),
                &month,
                parse_integer(&working_days, 0),
                parse_integer(&leaves, 0),
                parse_decimal(&bonus, 0.0),
                parse_decimal(&deduction, 0.0),
            )?;
            match outcome {
                UpsertOutcome::Inserted => println!("Attendance saved"),
                UpsertOutcome::Updated => println!("Attendance updated"),
            }
        }

        AttendanceCommands::List { json } => {
            let rows = db.list_attendance()?;
            if json {
                return print_json(&rows);
            }
            if rows.is_empty() {
                println!("No attendance recorded.");
            } else {
                println!(
                    "{:<6} {:<6} {:<20} {:<10} {:>8} {:>7} {:>10} {:>10}",
                    "ID", "EMP", "NAME", "MONTH", "WORKING", "LEAVES", "BONUS", "DEDUCTION"
                );
                println!("{}", "-".repeat(84));
                for a in rows {
                    println!(
                        "{:<6} {:<6} {:<20} {:<10} {:>8} {:>7} {:>10.2} {:>10.2}",
                        a.id,
                        a.emp_id,
                        truncate(&a.employee_name.unwrap_or_default(), 18),
                        truncate(&a.month, 10),
                        a.working_days,
                        a.leaves,
                        a.bonus,
                        a.deduction
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_payslip(db: &Database, command: PayslipCommands) -> Result<()> {
    match command {
        PayslipCommands::Generate {
            emp_id,
            month,
            json,
        } => {
            let report = payroll::generate_payslip(db, parse_id(&emp_id), &month)?;
            if json {
                return print_json(&report);
            }
            println!("{}", report.render());
            println!("\n(Payslip #{} recorded {})", report.payslip_id, report.generated_at);
        }

        PayslipCommands::List { json } => {
            let slips = db.list_payslips()?;
            if json {
                return print_json(&slips);
            }
            if slips.is_empty() {
                println!("No payslips generated.");
            } else {
                println!(
                    "{:<6} {:<6} {:<20} {:<10} {:>12} {:>12} {:>12}",
                    "ID", "EMP", "NAME", "MONTH", "GROSS", "DEDUCTIONS", "NET"
                );
                println!("{}", "-".repeat(84));
                for p in slips {
                    println!(
                        "{:<6} {:<6} {:<20} {:<10} {:>12.2} {:>12.2} {:>12.2}",
                        p.id,
                        p.emp_id,
                        truncate(&p.employee_name.unwrap_or_default(), 18),
                        truncate(&p.month, 10),
                        p.gross.unwrap_or(0.0),
                        p.deductions.unwrap_or(0.0),
                        p.net.unwrap_or(0.0)
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_advance(db: &Database, command: AdvanceCommands) -> Result<()> {
    match command {
        AdvanceCommands::Request {
            emp_id,
            month,
            amount,
        } => {
            let id = db.request_advance(parse_id(&emp_id), &month, parse_decimal(&amount, 0.0))?;
            println!("Advance request saved (ID: {})", id);
        }

        AdvanceCommands::Approve { id } => {
            let id = parse_id(&id);
            db.approve_advance(id)?;
            match id.map(|id| db.get_advance(id)).transpose()?.flatten() {
                Some(advance) => println!(
                    "Advance #{} for {} ({}) approved",
                    advance.id,
                    advance.employee_name.as_deref().unwrap_or("deleted employee"),
                    advance.month
                ),
                None => println!("Advance approved"),
            }
        }

        AdvanceCommands::List { json } => {
            let advances = db.list_advances()?;
            if json {
                return print_json(&advances);
            }
            if advances.is_empty() {
                println!("No advance requests.");
            } else {
                println!(
                    "{:<6} {:<6} {:<20} {:<10} {:>12} {:<10}",
                    "ID", "EMP", "NAME", "MONTH", "AMOUNT", "STATUS"
                );
                println!("{}", "-".repeat(69));
                for a in advances {
                    println!(
                        "{:<6} {:<6} {:<20} {:<10} {:>12.2} {:<10}",
                        a.id,
                        a.emp_id,
                        truncate(&a.employee_name.unwrap_or_default(), 18),
                        truncate(&a.month, 10),
                        a.amount,
                        a.status.as_str()
                    );
                }
            }
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn numeric_arguments_stay_text_until_coerced() {
        let cli = Cli::try_parse_from([
            "payroll", "attendance", "set", "1", "2025-10", "-w", "12.9", "-b", "abc",
        ])
        .unwrap();
        match cli.command {
            Commands::Attendance {
                command:
                    AttendanceCommands::Set {
                        working_days,
                        bonus,
                        leaves,
                        ..
                    },
            } => {
                assert_eq!(parse_integer(&working_days, 0), 12);
                assert_eq!(parse_decimal(&bonus, 0.0), 0.0);
                assert_eq!(parse_integer(&leaves, 0), 0);
            }
            _ => panic!("expected attendance set"),
        }
    }

    #[test]
    fn approve_without_id_parses() {
        let cli = Cli::try_parse_from(["payroll", "advance", "approve"]).unwrap();
        match cli.command {
            Commands::Advance {
                command: AdvanceCommands::Approve { id },
            } => assert_eq!(parse_id(&id), None),
            _ => panic!("expected advance approve"),
        }
    }

    #[test]
    fn negative_amounts_reach_coercion() {
        let cli = Cli::try_parse_from(["payroll", "employee", "add", "Debt", "--salary", "-500"])
            .unwrap();
        match cli.command {
            Commands::Employee {
                command: EmployeeCommands::Add { salary, .. },
            } => assert_eq!(parse_decimal(&salary, 0.0), -500.0),
            _ => panic!("expected employee add"),
        }

        let cli = Cli::try_parse_from([
            "payroll", "attendance", "set", "1", "2025-10", "-d", "-50", "-l", "-2",
        ])
        .unwrap();
        match cli.command {
            Commands::Attendance {
                command: AttendanceCommands::Set {
                    deduction, leaves, ..
                },
            } => {
                assert_eq!(parse_decimal(&deduction, 0.0), -50.0);
                assert_eq!(parse_integer(&leaves, 0), -2);
            }
            _ => panic!("expected attendance set"),
        }

        let cli = Cli::try_parse_from([
            "payroll", "advance", "request", "1", "2025-10", "--amount", "-10.5",
        ])
        .unwrap();
        match cli.command {
            Commands::Advance {
                command: AdvanceCommands::Request { amount, .. },
            } => assert_eq!(parse_decimal(&amount, 0.0), -10.5),
            _ => panic!("expected advance request"),
        }
    }

    #[test]
    fn show_reports_missing_or_unknown_employee() {
        let db = Database::open_in_memory().unwrap();
        let emp_id = db.add_employee("Asha", "Engineer", 30000.0).unwrap();

        assert_eq!(lookup_employee(&db, &emp_id.to_string()).unwrap().name, "Asha");
        assert!(matches!(
            lookup_employee(&db, ""),
            Err(PayrollError::Reference(ref m)) if m == "Employee ID required"
        ));
        assert!(matches!(
            lookup_employee(&db, "42"),
            Err(PayrollError::Reference(ref m)) if m == "Employee ID 42 not found"
        ));
    }

    #[test]
    fn truncate_is_char_aware() {
        assert_eq!(truncate("Asha", 10), "Asha");
        assert_eq!(truncate("Rāmachandran Iyer", 8), "Rāmac...");
    }
}
