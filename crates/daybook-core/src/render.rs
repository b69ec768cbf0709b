use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::Datelike;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::MONTH_NAMES;
use crate::event::{CalendarEvent, Goal, Reminder, ScheduleTask};
use crate::grid::{CellRef, Grid, MonthGrid, TimeTable, YearGrid};
use crate::view::ViewRenderer;

/// Terminal view layer: collects the markers of one frame and prints the
/// grid as a table on `finish`.
#[derive(Debug)]
pub struct TextRenderer<W: Write> {
    out: W,
    color: bool,
    grid: Option<Grid>,
    markers: BTreeMap<CellRef, Vec<String>>,
}

impl TextRenderer<io::Stdout> {
    pub fn stdout(cfg: &Config) -> anyhow::Result<Self> {
        let color = color_setting(cfg)? && io::stdout().is_terminal();
        Ok(Self::new(io::stdout(), color))
    }
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            grid: None,
            markers: BTreeMap::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn line(&mut self, text: &str) -> anyhow::Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    #[tracing::instrument(skip(self, events))]
    pub fn print_event_table(&mut self, events: &[&CalendarEvent]) -> anyhow::Result<()> {
        if events.is_empty() {
            return self.line("No events.");
        }

        let headers = ["ID", "Date", "Time", "Title", "Category", "Repeats"]
            .map(str::to_string)
            .to_vec();
        let rows = events
            .iter()
            .map(|event| {
                vec![
                    self.paint(&event.id.to_string(), "33"),
                    event.date.format("%Y-%m-%d").to_string(),
                    event_time_cell(event),
                    event.title.clone(),
                    event.category.clone(),
                    event.recurrence.as_key().to_string(),
                ]
            })
            .collect();

        write_table(&mut self.out, headers, rows)
    }

    #[tracing::instrument(skip(self, event), fields(id = %event.id))]
    pub fn print_event_info(&mut self, event: &CalendarEvent) -> anyhow::Result<()> {
        let out = &mut self.out;
        writeln!(out, "id          {}", event.id)?;
        writeln!(out, "title       {}", event.title)?;
        writeln!(out, "date        {}", event.date.format("%Y-%m-%d"))?;
        writeln!(out, "time        {}", event.time_range_label())?;
        writeln!(out, "category    {}", event.category)?;
        writeln!(out, "color       {}", event.color)?;
        writeln!(out, "repeats     {}", event.recurrence.as_key())?;
        if !event.description.is_empty() {
            writeln!(out, "description {}", event.description)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, reminders))]
    pub fn print_reminders(&mut self, reminders: &[Reminder]) -> anyhow::Result<()> {
        if reminders.is_empty() {
            return self.line("No reminders.");
        }

        let headers = ["ID", "Fires", "Event", "Time", "Description"]
            .map(str::to_string)
            .to_vec();
        let rows = reminders
            .iter()
            .map(|reminder| {
                vec![
                    self.paint(&reminder.id.to_string(), "33"),
                    reminder.fire_at.format("%Y-%m-%d %H:%M").to_string(),
                    reminder.event_title.clone(),
                    reminder.event_time.clone(),
                    reminder.description.clone(),
                ]
            })
            .collect();

        write_table(&mut self.out, headers, rows)
    }

    #[tracing::instrument(skip(self, goals))]
    pub fn print_goals(&mut self, goals: &[Goal]) -> anyhow::Result<()> {
        if goals.is_empty() {
            return self.line("No goals.");
        }

        let headers = ["ID", "Target", "Title", "Category", "Description"]
            .map(str::to_string)
            .to_vec();
        let rows = goals
            .iter()
            .map(|goal| {
                vec![
                    self.paint(&goal.id.to_string(), "33"),
                    goal.target_date
                        .map(|date| date.format("%Y-%m-%d").to_string())
                        .unwrap_or_default(),
                    goal.title.clone(),
                    goal.category.clone(),
                    goal.description.clone(),
                ]
            })
            .collect();

        write_table(&mut self.out, headers, rows)
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_tasks(&mut self, tasks: &[ScheduleTask]) -> anyhow::Result<()> {
        if tasks.is_empty() {
            return self.line("No pending tasks.");
        }

        let headers = ["ID", "Title", "Difficulty", "Minutes"]
            .map(str::to_string)
            .to_vec();
        let rows = tasks
            .iter()
            .map(|task| {
                vec![
                    self.paint(&task.id.to_string(), "33"),
                    task.title.clone(),
                    task.difficulty.to_string(),
                    task.estimated_minutes.to_string(),
                ]
            })
            .collect();

        write_table(&mut self.out, headers, rows)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    fn column_header(&self, label: &str, selected: bool, today: bool) -> String {
        let text = label.replace('\n', " ");
        let text = if selected { format!("*{text}") } else { text };
        if today { self.paint(&text, "1;36") } else { text }
    }

    fn markers_at(&self, cell: CellRef) -> &[String] {
        self.markers.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    fn write_time_table(&mut self, table: &TimeTable) -> anyhow::Result<()> {
        let mut headers = vec!["Time".to_string()];
        headers.extend(
            table
                .columns
                .iter()
                .map(|col| self.column_header(&col.label, col.selected, col.today)),
        );

        let rows = table
            .slots
            .iter()
            .enumerate()
            .map(|(row, slot)| {
                let mut cells = vec![slot.clone()];
                cells.extend((0..table.columns.len()).map(|column| {
                    self.markers_at(CellRef::Slot { row, column }).join(", ")
                }));
                cells
            })
            .collect();

        write_table(&mut self.out, headers, rows)
    }

    fn write_month(&mut self, month: &MonthGrid) -> anyhow::Result<()> {
        let name = MONTH_NAMES
            .get(month.month.saturating_sub(1) as usize)
            .copied()
            .unwrap_or_default();
        writeln!(self.out, "{name} {}", month.year)?;

        let headers = month.headers.map(str::to_string).to_vec();
        let rows = month
            .weeks
            .iter()
            .enumerate()
            .map(|(week, days)| {
                days.iter()
                    .enumerate()
                    .map(|(weekday, cell)| {
                        let Some(cell) = cell else {
                            return String::new();
                        };
                        let count = self.markers_at(CellRef::Day { week, weekday }).len();
                        let text = if count > 0 {
                            format!("{} ({count})", cell.date.day())
                        } else {
                            cell.date.day().to_string()
                        };
                        let text = if cell.selected { format!("*{text}") } else { text };
                        if cell.today { self.paint(&text, "1;36") } else { text }
                    })
                    .collect()
            })
            .collect();

        write_table(&mut self.out, headers, rows)
    }

    fn write_year(&mut self, year: &YearGrid) -> anyhow::Result<()> {
        writeln!(self.out, "{}", year.year)?;

        let headers = ["Month", "Events"].map(str::to_string).to_vec();
        let rows = year
            .cards
            .iter()
            .map(|card| {
                let count = self.markers_at(CellRef::MonthCard { month: card.month }).len();
                let name = if card.current {
                    self.paint(&format!("*{}", card.name), "1;36")
                } else {
                    card.name.to_string()
                };
                vec![name, format!("{count} events")]
            })
            .collect();

        write_table(&mut self.out, headers, rows)
    }
}

impl<W: Write> ViewRenderer for TextRenderer<W> {
    fn draw_grid(&mut self, grid: &Grid) -> anyhow::Result<()> {
        self.markers.clear();
        self.grid = Some(grid.clone());
        Ok(())
    }

    fn place_marker(&mut self, cell: CellRef, event: &CalendarEvent) -> anyhow::Result<()> {
        if self.grid.is_none() {
            return Err(anyhow!("marker placed before a grid was drawn"));
        }
        self.markers
            .entry(cell)
            .or_default()
            .push(format!("{} #{}", event.title, event.id));
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn finish(&mut self) -> anyhow::Result<()> {
        let Some(grid) = self.grid.take() else {
            return Ok(());
        };

        match &grid {
            Grid::Day(table) | Grid::Week(table) => self.write_time_table(table)?,
            Grid::Month(month) => self.write_month(month)?,
            Grid::Year(year) => self.write_year(year)?,
        }

        self.markers.clear();
        self.out.flush()?;
        Ok(())
    }
}

fn color_setting(cfg: &Config) -> anyhow::Result<bool> {
    let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
    match color_cfg.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Ok(true),
        "off" | "no" | "false" | "0" => Ok(false),
        other => Err(anyhow!("invalid color setting: {other}")),
    }
}

fn event_time_cell(event: &CalendarEvent) -> String {
    if event.all_day || event.start.is_some() {
        event.time_range_label()
    } else {
        String::new()
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
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(header).as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (idx, header) in headers.iter().enumerate() {
        write_cell(&mut writer, header, widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, width) in widths.iter().enumerate() {
            let cell = row.get(idx).map(String::as_str).unwrap_or_default();
            write_cell(&mut writer, cell, *width)?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn write_cell<W: Write>(writer: &mut W, cell: &str, width: usize) -> anyhow::Result<()> {
    let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
    let padding = width.saturating_sub(visible_width);
    write!(writer, "{}{} ", cell, " ".repeat(padding))?;
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
