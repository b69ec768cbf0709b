use chrono::{
  Datelike,
  NaiveDate
};
use serde::Serialize;
use tracing::{
  debug,
  instrument
};

use crate::event::CalendarEvent;
use crate::filter::CategoryFilter;
use crate::grid::{
  CellRef,
  Grid,
  TimeTable,
  ViewState,
  build_grid
};
use crate::recurrence::{
  MonthlyOverflow,
  is_visible
};
use crate::store::EventStore;

/// The view layer. The core hands it a
/// grid, then one marker per placed
/// event.
pub trait ViewRenderer {
  fn draw_grid(
    &mut self,
    grid: &Grid
  ) -> anyhow::Result<()>;

  fn place_marker(
    &mut self,
    cell: CellRef,
    event: &CalendarEvent
  ) -> anyhow::Result<()>;

  fn finish(
    &mut self
  ) -> anyhow::Result<()> {
    Ok(())
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Placement<'a> {
  pub cell:  CellRef,
  pub event: &'a CalendarEvent
}

fn place_on_table<'a>(
  table: &TimeTable,
  events: &[&'a CalendarEvent],
  overflow: MonthlyOverflow,
  out: &mut Vec<Placement<'a>>
) {
  for &event in events {
    let Some(label) = event.start_slot()
    else {
      continue;
    };
    let Some(row) = table
      .slots
      .iter()
      .position(|slot| *slot == label)
    else {
      continue;
    };
    for (column, col) in
      table.columns.iter().enumerate()
    {
      if is_visible(
        event, col.date, overflow
      ) {
        out.push(Placement {
          cell: CellRef::Slot {
            row,
            column
          },
          event
        });
      }
    }
  }
}

/// Maps events onto the cells of `grid`.
/// Time tables use the start slot, the
/// month grid uses whole days, the year
/// grid counts events by anchor month.
#[instrument(skip(grid, events), fields(events = events.len()))]
pub fn place_events<'a>(
  grid: &Grid,
  events: &[&'a CalendarEvent],
  overflow: MonthlyOverflow
) -> Vec<Placement<'a>> {
  let mut out = Vec::new();

  match grid {
    | Grid::Day(table)
    | Grid::Week(table) => {
      place_on_table(
        table, events, overflow,
        &mut out
      );
    }
    | Grid::Month(month) => {
      for &event in events {
        for (week, days) in
          month.weeks.iter().enumerate()
        {
          for (weekday, cell) in
            days.iter().enumerate()
          {
            if let Some(cell) = cell
              && is_visible(
                event, cell.date,
                overflow
              )
            {
              out.push(Placement {
                cell: CellRef::Day {
                  week,
                  weekday
                },
                event
              });
            }
          }
        }
      }
    }
    | Grid::Year(year) => {
      for &event in events {
        if event.date.year() == year.year
        {
          out.push(Placement {
            cell: CellRef::MonthCard {
              month: event.date.month()
            },
            event
          });
        }
      }
    }
  }

  debug!(
    placed = out.len(),
    "placed events"
  );
  out
}

/// Draws the current view: grid first,
/// then every marker. Returns how many
/// events passed the filter.
#[instrument(skip(store, renderer))]
pub fn render_view<R>(
  store: &EventStore,
  state: &ViewState,
  filter: &CategoryFilter,
  today: NaiveDate,
  renderer: &mut R
) -> anyhow::Result<usize>
where
  R: ViewRenderer + ?Sized
{
  let grid = build_grid(state, today);
  let events =
    store.query_by_filter(filter);
  let placements = place_events(
    &grid,
    &events,
    store.monthly_overflow()
  );

  renderer.draw_grid(&grid)?;
  for placement in &placements {
    renderer.place_marker(
      placement.cell,
      placement.event
    )?;
  }
  renderer.finish()?;

  Ok(events.len())
}
