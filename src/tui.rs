use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};
use std::io::stdout;

use crate::db::Database;
use crate::error::PayrollResult;
use crate::models::{AdvanceStatus, Attendance, Employee, Payslip, SalaryAdvance};
use crate::payroll::{compute, CURRENCY_SYMBOL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Employees,
    Attendance,
    Payslips,
    Advances,
}

impl Tab {
    const ALL: [Tab; 4] = [Tab::Employees, Tab::Attendance, Tab::Payslips, Tab::Advances];

    fn title(&self) -> &'static str {
        match self {
            Tab::Employees => "Employees",
            Tab::Attendance => "Attendance",
            Tab::Payslips => "Payslips",
            Tab::Advances => "Salary Advances",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    fn next(&self) -> Tab {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(&self) -> Tab {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

struct AppState {
    tab: Tab,
    employees: Vec<Employee>,
    attendance: Vec<Attendance>,
    payslips: Vec<Payslip>,
    advances: Vec<SalaryAdvance>,
    selected: usize,
    message: Option<String>,
}

impl AppState {
    fn load(db: &Database) -> PayrollResult<Self> {
        let mut state = Self {
            tab: Tab::Employees,
            employees: Vec::new(),
            attendance: Vec::new(),
            payslips: Vec::new(),
            advances: Vec::new(),
            selected: 0,
            message: None,
        };
        state.reload(db)?;
        Ok(state)
    }

    /// Re-read every table, as the forms do after each mutation.
    fn reload(&mut self, db: &Database) -> PayrollResult<()> {
        self.employees = db.find_employees("")?;
        self.attendance = db.list_attendance()?;
        self.payslips = db.list_payslips()?;
        self.advances = db.list_advances()?;
        self.selected = self.selected.min(self.len().saturating_sub(1));
        Ok(())
    }

    fn len(&self) -> usize {
        match self.tab {
            Tab::Employees => self.employees.len(),
            Tab::Attendance => self.attendance.len(),
            Tab::Payslips => self.payslips.len(),
            Tab::Advances => self.advances.len(),
        }
    }

    fn next(&mut self) {
        if self.len() > 0 && self.selected < self.len() - 1 {
            self.selected += 1;
        }
    }

    fn prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn switch_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.selected = 0;
        self.message = None;
    }

    fn selected_advance_id(&self) -> Option<i64> {
        if self.tab != Tab::Advances {
            return None;
        }
        self.advances.get(self.selected).map(|a| a.id)
    }

    fn approve_selected(&mut self, db: &Database) {
        let result = db
            .approve_advance(self.selected_advance_id())
            .and_then(|_| self.reload(db));
        self.message = Some(match result {
            Ok(()) => "Advance approved".to_string(),
            Err(e) => e.to_string(),
        });
    }
}

/// Raw mode and the alternate screen for as long as the browser is open.
/// Dropping it hands the terminal back, including on an early return.
struct ScreenGuard;

impl ScreenGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let guard = Self;
        stdout().execute(EnterAlternateScreen)?;
        Ok(guard)
    }
}

impl Drop for ScreenGuard {
    fn drop(&mut self) {
        let _ = stdout().execute(LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

pub fn run_browse(db: &Database) -> Result<()> {
    let mut state = AppState::load(db)?;

    let _screen = ScreenGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    run_loop(&mut terminal, &mut state, db)
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        list_state.select(if state.len() > 0 {
            Some(state.selected)
        } else {
            None
        });
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => {
                    state.switch_tab(state.tab.next())
                }
                KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => {
                    state.switch_tab(state.tab.prev())
                }
                KeyCode::Char('a') if state.tab == Tab::Advances => state.approve_selected(db),
                KeyCode::Char('r') => {
                    state.message = Some(match state.reload(db) {
                        Ok(()) => "Refreshed".to_string(),
                        Err(e) => e.to_string(),
                    });
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()).collect::<Vec<_>>())
        .block(Block::default().borders(Borders::ALL).title(" Payroll "))
        .select(state.tab.index())
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, rows[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[1]);

    let items: Vec<ListItem> = list_lines(state).into_iter().map(ListItem::new).collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " {} ({}) ",
            state.tab.title(),
            state.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, body[0], list_state);

    let detail = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, body[1]);

    let footer = match &state.message {
        Some(msg) => format!(" {}", msg),
        None => " j/k:navigate  tab/h/l:switch  a:approve advance  r:refresh  q:quit".to_string(),
    };
    frame.render_widget(
        Paragraph::new(footer).style(Style::default().fg(Color::DarkGray)),
        rows[2],
    );
}

fn name_or_deleted(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or("(deleted)")
}

fn list_lines(state: &AppState) -> Vec<String> {
    match state.tab {
        Tab::Employees => state
            .employees
            .iter()
            .map(|e| format!("#{:<4} {}", e.emp_id, e.name))
            .collect(),
        Tab::Attendance => state
            .attendance
            .iter()
            .map(|a| format!("{} | {} | {}", a.month, a.emp_id, name_or_deleted(&a.employee_name)))
            .collect(),
        Tab::Payslips => state
            .payslips
            .iter()
            .map(|p| format!("#{:<4} {} | {}", p.id, p.month, name_or_deleted(&p.employee_name)))
            .collect(),
        Tab::Advances => state
            .advances
            .iter()
            .map(|a| {
                let icon = match a.status {
                    AdvanceStatus::Pending => "*",
                    AdvanceStatus::Approved => "+",
                };
                format!("{} #{:<4} {} | {}", icon, a.id, a.month, name_or_deleted(&a.employee_name))
            })
            .collect(),
    }
}

fn money(value: f64) -> String {
    format!("{}{:.2}", CURRENCY_SYMBOL, value)
}

fn build_detail(state: &AppState) -> Text<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line> = Vec::new();

    match state.tab {
        Tab::Employees => {
            let Some(e) = state.employees.get(state.selected) else {
                return Text::raw("No employees");
            };
            lines.push(Line::from(Span::styled(e.name.clone(), bold)));
            if let Some(position) = e.position.as_deref().filter(|p| !p.is_empty()) {
                lines.push(Line::from(position.to_string()));
            }
            lines.push(Line::from(format!("ID: {}", e.emp_id)));
            lines.push(Line::from(format!("Base salary: {}", money(e.base_salary))));
        }
        Tab::Attendance => {
            let Some(a) = state.attendance.get(state.selected) else {
                return Text::raw("No attendance recorded");
            };
            lines.push(Line::from(Span::styled(
                format!("{} - {}", name_or_deleted(&a.employee_name), a.month),
                bold,
            )));
            lines.push(Line::from(format!("Working days: {}", a.working_days)));
            lines.push(Line::from(format!("Leaves: {}", a.leaves)));
            lines.push(Line::from(format!("Bonus: {}", money(a.bonus))));
            lines.push(Line::from(format!("Deduction: {}", money(a.deduction))));

            if let Some(e) = state.employees.iter().find(|e| e.emp_id == a.emp_id) {
                let pay = compute(e.base_salary, a.working_days, a.leaves, a.bonus, a.deduction)
                    .rounded();
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Projected pay",
                    Style::default().fg(Color::Cyan),
                )));
                lines.push(Line::from(format!("  Gross: {}", money(pay.gross))));
                lines.push(Line::from(format!("  Deductions: {}", money(pay.deductions))));
                lines.push(Line::from(format!("  Net: {}", money(pay.net))));
            }
        }
        Tab::Payslips => {
            let Some(p) = state.payslips.get(state.selected) else {
                return Text::raw("No payslips generated");
            };
            lines.push(Line::from(Span::styled(
                format!(
                    "Payslip for {} ({}) - {}",
                    name_or_deleted(&p.employee_name),
                    p.emp_id,
                    p.month
                ),
                bold,
            )));
            lines.push(Line::from(format!("Gross: {}", money(p.gross.unwrap_or(0.0)))));
            lines.push(Line::from(format!(
                "Deductions: {}",
                money(p.deductions.unwrap_or(0.0))
            )));
            lines.push(Line::from(format!("Net Pay: {}", money(p.net.unwrap_or(0.0)))));
        }
        Tab::Advances => {
            let Some(a) = state.advances.get(state.selected) else {
                return Text::raw("No advance requests");
            };
            lines.push(Line::from(Span::styled(
                format!("{} - {}", name_or_deleted(&a.employee_name), a.month),
                bold,
            )));
            lines.push(Line::from(format!("Amount: {}", money(a.amount))));
            let status_style = match a.status {
                AdvanceStatus::Pending => Style::default().fg(Color::Yellow),
                AdvanceStatus::Approved => Style::default().fg(Color::Green),
            };
            lines.push(Line::from(Span::styled(
                format!("Status: {}", a.status),
                status_style,
            )));
        }
    }

    Text::from(lines)
}
