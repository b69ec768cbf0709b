use anyhow::anyhow;
use chrono::{
  NaiveDate,
  NaiveTime,
  Timelike
};
use tracing::{
  debug,
  info,
  warn
};

use crate::event::{
  CalendarEvent,
  EntityId,
  IdSource,
  SCHEDULE_CATEGORY,
  ScheduleTask
};
use crate::store::EventStore;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Longest break accepted between
/// planned tasks.
pub const MAX_BREAK_MINUTES: i64 =
  MINUTES_PER_DAY;

/// Time-of-day bounds the planner packs
/// tasks into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
  pub start: NaiveTime,
  pub end:   NaiveTime
}

impl ScheduleWindow {
  pub fn new(
    start: Option<NaiveTime>,
    end: Option<NaiveTime>
  ) -> anyhow::Result<Self> {
    match (start, end) {
      | (Some(start), Some(end)) => {
        Ok(Self {
          start,
          end
        })
      }
      | _ => {
        Err(anyhow!(
          "schedule requires both \
           start and end times"
        ))
      }
    }
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOptions {
  pub break_minutes: i64,
  pub eat_the_frog:  bool
}

fn minute_of_day(time: NaiveTime) -> i64 {
  i64::from(time.num_seconds_from_midnight())
    / 60
}

fn time_from_minutes(
  minutes: i64
) -> Option<NaiveTime> {
  if !(0..MINUTES_PER_DAY)
    .contains(&minutes)
  {
    return None;
  }
  NaiveTime::from_hms_opt(
    (minutes / 60) as u32,
    (minutes % 60) as u32,
    0
  )
}

/// Orders the tasks that will be
/// planned: titled tasks only, hardest
/// first when eating the frog.
#[must_use]
pub fn planning_order(
  tasks: &[ScheduleTask],
  eat_the_frog: bool
) -> Vec<&ScheduleTask> {
  let mut ordered: Vec<&ScheduleTask> =
    tasks
      .iter()
      .filter(|task| {
        !task.title.trim().is_empty()
      })
      .collect();
  if eat_the_frog {
    ordered.sort_by_key(|task| {
      task.difficulty.frog_rank()
    });
  }
  ordered
}

/// Single-pass packing of `tasks` into
/// `window` on `date`. Tasks that do not
/// fit are dropped.
#[tracing::instrument(skip(tasks, ids), fields(tasks = tasks.len()))]
pub fn plan(
  tasks: &[ScheduleTask],
  window: ScheduleWindow,
  options: PlanOptions,
  date: NaiveDate,
  ids: &mut IdSource
) -> Vec<CalendarEvent> {
  let window_end =
    minute_of_day(window.end);
  let break_minutes =
    options.break_minutes.max(0);
  let mut cursor =
    minute_of_day(window.start);
  let mut out = Vec::new();

  for task in planning_order(
    tasks,
    options.eat_the_frog
  ) {
    if cursor >= window_end {
      debug!(
        cursor,
        window_end,
        "window filled; stopping"
      );
      break;
    }

    if task.estimated_minutes <= 0 {
      warn!(task = %task.id, minutes = task.estimated_minutes, "task has no duration; skipping");
      continue;
    }

    let Some(task_end) = cursor
      .checked_add(task.estimated_minutes)
      .filter(|end| *end <= window_end)
    else {
      debug!(
        task = %task.id,
        minutes = task.estimated_minutes,
        window_end,
        "task does not fit; skipping"
      );
      continue;
    };

    let (Some(start), Some(end)) = (
      time_from_minutes(cursor),
      time_from_minutes(task_end)
    ) else {
      break;
    };

    let mut event = CalendarEvent::new(
      ids.next_id(),
      task.title.clone(),
      date
    );
    event.start = Some(start);
    event.end = Some(end);
    event.description = format!(
      "Difficulty: {} | Estimated: {} \
       minutes",
      task.difficulty,
      task.estimated_minutes
    );
    event.category =
      SCHEDULE_CATEGORY.to_string();
    event.color =
      task.difficulty.color().to_string();
    out.push(event);

    let Some(next) =
      task_end.checked_add(break_minutes)
    else {
      break;
    };
    cursor = next;
  }

  info!(
    planned = out.len(),
    "schedule planned"
  );
  out
}

/// Plans the store's pending tasks and
/// adds the result as schedule events.
/// The pending task list is consumed.
#[tracing::instrument(skip(store))]
pub fn plan_into_store(
  store: &mut EventStore,
  window: ScheduleWindow,
  options: PlanOptions,
  date: NaiveDate
) -> Vec<EntityId> {
  let tasks = store.take_tasks();
  let events = plan(
    &tasks,
    window,
    options,
    date,
    store.ids_mut()
  );
  events
    .into_iter()
    .map(|event| store.add(event))
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveTime
  };

  use super::{
    PlanOptions,
    ScheduleWindow,
    plan,
    plan_into_store
  };
  use crate::event::{
    CalendarEvent,
    Difficulty,
    EntityId,
    IdSource,
    ScheduleTask
  };
  use crate::filter::CategoryFilter;
  use crate::store::EventStore;

  fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0)
      .expect("valid time")
  }

  fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 4)
      .expect("valid date")
  }

  fn task(
    id: u64,
    title: &str,
    difficulty: Difficulty,
    minutes: i64
  ) -> ScheduleTask {
    ScheduleTask {
      id: EntityId(id),
      title: title.to_string(),
      difficulty,
      estimated_minutes: minutes
    }
  }

  fn window(
    start: NaiveTime,
    end: NaiveTime
  ) -> ScheduleWindow {
    ScheduleWindow::new(
      Some(start),
      Some(end)
    )
    .expect("window")
  }

  fn titles(
    events: &[CalendarEvent]
  ) -> Vec<&str> {
    events
      .iter()
      .map(|e| e.title.as_str())
      .collect()
  }

  #[test]
  fn eat_the_frog_puts_hard_first() {
    let tasks = vec![
      task(1, "A", Difficulty::Easy, 30),
      task(2, "B", Difficulty::Hard, 30),
    ];
    let events = plan(
      &tasks,
      window(hm(9, 0), hm(10, 0)),
      PlanOptions {
        break_minutes: 0,
        eat_the_frog:  true
      },
      day(),
      &mut IdSource::default()
    );

    assert_eq!(titles(&events), vec![
      "B", "A"
    ]);
    assert_eq!(
      events[0].start,
      Some(hm(9, 0))
    );
    assert_eq!(
      events[0].end,
      Some(hm(9, 30))
    );
    assert_eq!(
      events[1].start,
      Some(hm(9, 30))
    );
    assert_eq!(
      events[1].end,
      Some(hm(10, 0))
    );
    assert_eq!(events[0].color, "#dc3545");
    assert_eq!(events[1].color, "#28a745");
    assert!(
      events.iter().all(|e| e.is_schedule())
    );
    assert_eq!(
      events[0].description,
      "Difficulty: hard | Estimated: 30 \
       minutes"
    );
  }

  #[test]
  fn oversized_task_emits_nothing() {
    let tasks = vec![task(
      1,
      "Deep work",
      Difficulty::Medium,
      90
    )];
    let events = plan(
      &tasks,
      window(hm(9, 0), hm(10, 0)),
      PlanOptions::default(),
      day(),
      &mut IdSource::default()
    );
    assert!(events.is_empty());
  }

  #[test]
  fn skipped_task_leaves_cursor_alone() {
    let tasks = vec![
      task(1, "big", Difficulty::Easy, 120),
      task(2, "small", Difficulty::Easy, 20),
      task(3, "", Difficulty::Hard, 10),
      task(4, "   ", Difficulty::Hard, 10),
    ];
    let events = plan(
      &tasks,
      window(hm(9, 0), hm(10, 0)),
      PlanOptions::default(),
      day(),
      &mut IdSource::default()
    );
    assert_eq!(titles(&events), vec![
      "small"
    ]);
    assert_eq!(
      events[0].start,
      Some(hm(9, 0))
    );
  }

  #[test]
  fn extreme_durations_do_not_overflow()
  {
    let tasks = vec![
      task(1, "huge", Difficulty::Easy, i64::MAX),
      task(2, "a", Difficulty::Easy, 10),
      task(3, "b", Difficulty::Easy, 10),
    ];
    let events = plan(
      &tasks,
      window(hm(9, 0), hm(10, 0)),
      PlanOptions {
        break_minutes: i64::MAX,
        eat_the_frog:  false
      },
      day(),
      &mut IdSource::default()
    );
    assert_eq!(titles(&events), vec!["a"]);
    assert_eq!(
      events[0].end,
      Some(hm(9, 10))
    );
  }

  #[test]
  fn frog_sort_is_stable() {
    let tasks = vec![
      task(1, "m1", Difficulty::Medium, 10),
      task(2, "h1", Difficulty::Hard, 10),
      task(3, "m2", Difficulty::Medium, 10),
      task(4, "h2", Difficulty::Hard, 10),
      task(
        5,
        "odd",
        Difficulty::Other("epic".to_string()),
        10
      ),
      task(6, "e1", Difficulty::Easy, 10),
    ];
    let events = plan(
      &tasks,
      window(hm(8, 0), hm(18, 0)),
      PlanOptions {
        break_minutes: 5,
        eat_the_frog:  true
      },
      day(),
      &mut IdSource::default()
    );
    assert_eq!(titles(&events), vec![
      "h1", "h2", "m1", "m2", "e1", "odd"
    ]);
  }

  #[test]
  fn breaks_space_tasks_and_window_is_respected()
  {
    let tasks: Vec<ScheduleTask> = (0
      ..20)
      .map(|i| {
        task(
          i,
          &format!("t{i}"),
          Difficulty::Medium,
          25 + (i as i64 % 3) * 10
        )
      })
      .collect();
    let end = hm(12, 0);
    let events = plan(
      &tasks,
      window(hm(9, 0), end),
      PlanOptions {
        break_minutes: 5,
        eat_the_frog:  false
      },
      day(),
      &mut IdSource::default()
    );

    assert!(!events.is_empty());
    for pair in events.windows(2) {
      let prev_end =
        pair[0].end.expect("end");
      let next_start =
        pair[1].start.expect("start");
      assert!(prev_end <= next_start);
    }
    assert!(events.iter().all(|e| {
      e.end.expect("end") <= end
    }));
  }

  #[test]
  fn late_window_does_not_wrap_midnight()
  {
    let tasks = vec![
      task(1, "a", Difficulty::Easy, 30),
      task(2, "b", Difficulty::Easy, 30),
    ];
    let events = plan(
      &tasks,
      window(hm(23, 0), hm(23, 59)),
      PlanOptions {
        break_minutes: 60,
        eat_the_frog:  false
      },
      day(),
      &mut IdSource::default()
    );
    assert_eq!(titles(&events), vec!["a"]);
  }

  #[test]
  fn missing_bounds_are_rejected() {
    assert!(
      ScheduleWindow::new(
        None,
        Some(hm(10, 0))
      )
      .is_err()
    );
    assert!(
      ScheduleWindow::new(
        Some(hm(9, 0)),
        None
      )
      .is_err()
    );
  }

  #[test]
  fn plan_into_store_consumes_tasks() {
    let mut store = EventStore::default();
    let id = store.add_task();
    store
      .update_task(
        id,
        crate::store::TaskField::Title,
        "Inbox zero"
      )
      .expect("set title");
    store.add_task();

    let added = plan_into_store(
      &mut store,
      window(hm(9, 0), hm(17, 0)),
      PlanOptions::default(),
      day()
    );
    assert_eq!(added.len(), 1);
    assert!(store.tasks().is_empty());
    assert_eq!(
      store
        .query_by_filter(
          &CategoryFilter::Schedule
        )
        .len(),
      1
    );
    assert_eq!(
      store
        .query_visible_on(day())
        .len(),
      1
    );
  }
}
