use std::fs;
use std::io::Cursor;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use daybook_core::commands::Session;
use daybook_core::config::Config;
use daybook_core::event::{CalendarEvent, Difficulty, EntityId, ScheduleTask, SCHEDULE_CATEGORY};
use daybook_core::filter::CategoryFilter;
use daybook_core::grid::{CellRef, ViewMode, ViewState, build_grid};
use daybook_core::planner::{PlanOptions, ScheduleWindow, plan_into_store};
use daybook_core::recurrence::{MonthlyOverflow, Recurrence};
use daybook_core::render::TextRenderer;
use daybook_core::run_lines;
use daybook_core::store::{EventStore, TaskField};
use daybook_core::view::place_events;
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).expect("valid datetime")
}

#[test]
fn scripted_session_builds_a_day() {
    let mut session = Session::from_config(&Config::default())
        .expect("session")
        .with_fixed_now(at(2026, 5, 4, 8, 0));
    let mut renderer = TextRenderer::new(Vec::new(), false);

    let script = "\
add Dentist start:15:00 end:16:00 category:health
add \"Gym class\" start:07:00 recur:daily
bogus command
task add Expense report difficulty:hard minutes:45
task add Read paper difficulty:easy minutes:30
task add Emails minutes:20
plan start:09:00 end:10:30 breaks:5 frog:yes
view day
quit
add Never reached
";
    run_lines(&mut session, Cursor::new(script), &mut renderer, false).expect("script");

    let store = session.store();
    assert_eq!(session.view().mode, ViewMode::Daily);
    assert!(store.tasks().is_empty());
    assert!(store.events().iter().all(|event| event.title != "Never reached"));

    let planned: Vec<(&str, Option<NaiveTime>)> = store
        .query_by_filter(&CategoryFilter::Schedule)
        .iter()
        .map(|event| (event.title.as_str(), event.start))
        .collect();
    assert_eq!(
        planned,
        vec![
            ("Expense report", NaiveTime::from_hms_opt(9, 0, 0)),
            ("Emails", NaiveTime::from_hms_opt(9, 50, 0)),
        ]
    );
    assert_eq!(store.query_by_filter(&CategoryFilter::Calendar).len(), 2);
    assert_eq!(store.reminders().len(), 2);

    let text = String::from_utf8(renderer.into_inner()).expect("utf8");
    assert!(text.contains("Planned 2 of 3 tasks."));
    let three_pm = text
        .lines()
        .find(|line| line.starts_with("3:00 PM"))
        .expect("3 PM row");
    assert!(three_pm.contains("Dentist"));
}

#[test]
fn rc_file_drives_session_defaults() {
    let dir = tempdir().expect("tempdir");
    let rc = dir.path().join("daybookrc");
    fs::write(
        &rc,
        "default.view = monthly\n\
         default.filter = schedule\n\
         reminder.lead_minutes = 30\n\
         recurrence.monthly_overflow = clamp\n",
    )
    .expect("write rc");

    let cfg = Config::load(Some(rc.as_path())).expect("load");
    let mut session = Session::from_config(&cfg)
        .expect("session")
        .with_fixed_now(at(2026, 1, 31, 12, 0));
    assert_eq!(session.view().mode, ViewMode::Monthly);
    assert_eq!(session.filter(), &CategoryFilter::Schedule);
    assert_eq!(session.store().monthly_overflow(), MonthlyOverflow::Clamp);

    let mut renderer = TextRenderer::new(Vec::new(), false);
    run_lines(
        &mut session,
        Cursor::new("add Rent start:09:00 recur:monthly\n"),
        &mut renderer,
        false,
    )
    .expect("add");

    let reminder = &session.store().reminders()[0];
    assert_eq!(reminder.fire_at, at(2026, 1, 31, 8, 30));
    assert_eq!(session.store().query_visible_on(date(2026, 2, 28)).len(), 1);
    assert_eq!(session.store().query_visible_on(date(2026, 4, 30)).len(), 1);
    assert!(session.store().query_visible_on(date(2026, 4, 29)).is_empty());
}

#[test]
fn store_planner_and_placement_agree() {
    let mut store = EventStore::new(MonthlyOverflow::Skip);

    let id = store.next_id();
    let mut standup = CalendarEvent::new(id, "Standup".to_string(), date(2026, 3, 2));
    standup.start = NaiveTime::from_hms_opt(9, 0, 0);
    standup.recurrence = Recurrence::Weekly;
    store.add(standup);

    for (title, difficulty, minutes) in [
        ("Slides", "medium", "40"),
        ("Budget", "hard", "30"),
        ("", "hard", "10"),
    ] {
        let task = store.add_task();
        store.update_task(task, TaskField::Title, title).expect("title");
        store
            .update_task(task, TaskField::Difficulty, difficulty)
            .expect("difficulty");
        store
            .update_task(task, TaskField::Estimate, minutes)
            .expect("estimate");
    }
    assert_eq!(
        store.tasks().last().map(|task: &ScheduleTask| task.difficulty.clone()),
        Some(Difficulty::Hard)
    );

    let window = ScheduleWindow::new(
        NaiveTime::from_hms_opt(13, 0, 0),
        NaiveTime::from_hms_opt(14, 30, 0),
    )
    .expect("window");
    let added = plan_into_store(
        &mut store,
        window,
        PlanOptions {
            break_minutes: 10,
            eat_the_frog: true,
        },
        date(2026, 3, 11),
    );
    assert_eq!(added.len(), 2);
    let budget = store.event(added[0]).expect("budget event");
    assert_eq!(budget.title, "Budget");
    assert_eq!(budget.category, SCHEDULE_CATEGORY);
    assert_eq!(budget.end, NaiveTime::from_hms_opt(13, 30, 0));
    let slides = store.event(added[1]).expect("slides event");
    assert_eq!(slides.start, NaiveTime::from_hms_opt(13, 40, 0));
    assert_eq!(slides.end, NaiveTime::from_hms_opt(14, 20, 0));

    let grid = build_grid(&ViewState::new(ViewMode::Weekly, date(2026, 3, 11)), date(2026, 3, 11));
    let events = store.query_by_filter(&CategoryFilter::All);
    let placed: Vec<(CellRef, EntityId)> = place_events(&grid, &events, store.monthly_overflow())
        .into_iter()
        .map(|placement| (placement.cell, placement.event.id))
        .collect();

    assert_eq!(
        placed,
        vec![
            (CellRef::Slot { row: 9, column: 1 }, EntityId(1)),
            (CellRef::Slot { row: 13, column: 3 }, added[0]),
            (CellRef::Slot { row: 13, column: 3 }, added[1]),
        ]
    );
}
