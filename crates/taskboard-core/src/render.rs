use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::{format_date, format_timestamp};
use crate::form::{Field, Validation};
use crate::i18n::Messages;
use crate::store::StatusFilter;
use crate::task::{Priority, Task};
use crate::view::{BoardView, StatusCounts};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    tz: Tz,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.color()? && io::stdout().is_terminal(),
            tz: cfg.timezone()?,
        })
    }

    /// No escape codes; used for pipes and tests.
    pub fn plain(tz: Tz) -> Self {
        Self { color: false, tz }
    }

    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip_all)]
    pub fn print_board<W: Write>(
        &self,
        out: &mut W,
        msgs: &Messages<'_>,
        view: &BoardView<'_>,
        counts: &StatusCounts,
        filter: StatusFilter,
        query: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(msgs.t("appTitle"), "1"))?;
        writeln!(
            out,
            "{}: {} ({})",
            msgs.t("filters.statusFilter"),
            msgs.t(filter.message_id()),
            counts.for_filter(filter)
        )?;
        if !query.is_empty() {
            writeln!(out, "{}: \"{}\"", msgs.t("filters.searchQuery"), query)?;
        }

        for (status, tasks) in view.columns() {
            writeln!(out)?;
            let heading = format!("{} ({})", msgs.t(status.column_message_id()), tasks.len());
            writeln!(out, "{}", self.paint(&heading, "36"))?;

            if tasks.is_empty() {
                writeln!(out, "  {}", msgs.t("columns.empty"))?;
                continue;
            }

            let headers = vec![
                msgs.t("taskCard.id").to_string(),
                msgs.t("taskCard.title").to_string(),
                msgs.t("taskCard.priority").to_string(),
                msgs.t("taskCard.dueDate").to_string(),
            ];
            let rows = tasks
                .iter()
                .map(|task| {
                    vec![
                        self.paint(&task.short_id(), "33"),
                        task.title.clone(),
                        self.paint_priority(msgs, task.priority),
                        self.due_cell(msgs, task, now),
                    ]
                })
                .collect();
            write_table(&mut *out, headers, rows)?;
        }

        writeln!(out)?;
        writeln!(
            out,
            "{}: {} | {}: {}",
            msgs.t("stats.totalTasks"),
            view.total,
            msgs.t("stats.displayed"),
            view.displayed
        )?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(id = %task.id))]
    pub fn print_task_info<W: Write>(
        &self,
        out: &mut W,
        msgs: &Messages<'_>,
        task: &Task,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut lines = vec![
            (msgs.t("taskCard.id"), task.id.to_string()),
            (msgs.t("taskCard.title"), task.title.clone()),
            (msgs.t("taskCard.description"), task.description.clone()),
            (msgs.t("taskCard.status"), msgs.t(task.status.message_id()).to_string()),
            (msgs.t("taskCard.priority"), self.paint_priority(msgs, task.priority)),
            (
                msgs.t("taskCard.created"),
                format_timestamp(task.created_at, &self.tz, msgs.locale),
            ),
        ];
        if task.was_updated() {
            lines.push((
                msgs.t("taskCard.updated"),
                format_timestamp(task.updated_at, &self.tz, msgs.locale),
            ));
        }
        if task.due_date.is_some() {
            lines.push((msgs.t("taskCard.dueDate"), self.due_cell(msgs, task, now)));
        }

        let width = lines
            .iter()
            .map(|(label, _)| UnicodeWidthStr::width(*label))
            .max()
            .unwrap_or(0);
        for (label, value) in lines {
            let padding = width.saturating_sub(UnicodeWidthStr::width(label));
            writeln!(out, "{label}{}  {value}", " ".repeat(padding))?;
        }
        Ok(())
    }

    /// Inline field messages, one line per failing field.
    pub fn print_validation<W: Write>(
        &self,
        out: &mut W,
        msgs: &Messages<'_>,
        validation: &Validation,
    ) -> anyhow::Result<()> {
        for error in validation.errors() {
            let label = match error.field() {
                Field::Title => msgs.t("taskForm.taskTitle"),
                Field::Description => msgs.t("taskForm.taskDescription"),
                Field::DueDate => msgs.t("taskForm.dueDate"),
            };
            writeln!(out, "  {label}: {}", self.paint(msgs.t(error.message_id()), "31"))?;
        }
        Ok(())
    }

    fn due_cell(&self, msgs: &Messages<'_>, task: &Task, now: DateTime<Utc>) -> String {
        let Some(due) = task.due_date else {
            return String::new();
        };
        let text = format_date(due, msgs.locale);
        if task.is_overdue(now, &self.tz) {
            self.paint(&format!("{text} ({})", msgs.t("taskCard.overdue")), "31")
        } else {
            text
        }
    }

    fn paint_priority(&self, msgs: &Messages<'_>, priority: Priority) -> String {
        let code = match priority {
            Priority::High => "31",
            Priority::Medium => "33",
            Priority::Low => "32",
        };
        self.paint(msgs.t(priority.message_id()), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    write!(writer, " ")?;
    for idx in 0..column_count {
        write!(writer, " {:width$}", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    write!(writer, " ")?;
    for width in &widths {
        write!(writer, " {:-<width$}", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        write!(writer, " ")?;
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, " {}{}", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
