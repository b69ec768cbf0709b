use anyhow::anyhow;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::event::{
    CalendarEvent, Difficulty, EntityId, Goal, IdSource, MAX_TASK_MINUTES, Reminder,
    ScheduleTask,
};
use crate::filter::CategoryFilter;
use crate::recurrence::{MonthlyOverflow, is_visible};

/// Editable fields of a pending schedule task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskField {
    Title,
    Difficulty,
    Estimate,
}

impl std::str::FromStr for TaskField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "difficulty" | "diff" => Ok(Self::Difficulty),
            "estimate" | "estimatedtime" | "minutes" | "time" => Ok(Self::Estimate),
            other => Err(anyhow!("unknown task field: {other}")),
        }
    }
}

/// Every entity of a session, owned by the application root.
#[derive(Debug, Default)]
pub struct EventStore {
    ids: IdSource,
    overflow: MonthlyOverflow,
    events: Vec<CalendarEvent>,
    reminders: Vec<Reminder>,
    goals: Vec<Goal>,
    tasks: Vec<ScheduleTask>,
}

impl EventStore {
    pub fn new(overflow: MonthlyOverflow) -> Self {
        Self {
            overflow,
            ..Self::default()
        }
    }

    pub fn next_id(&mut self) -> EntityId {
        self.ids.next_id()
    }

    pub fn ids_mut(&mut self) -> &mut IdSource {
        &mut self.ids
    }

    pub fn monthly_overflow(&self) -> MonthlyOverflow {
        self.overflow
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn tasks(&self) -> &[ScheduleTask] {
        &self.tasks
    }

    pub fn event(&self, id: EntityId) -> Option<&CalendarEvent> {
        self.events.iter().find(|event| event.id == id)
    }

    #[tracing::instrument(skip(self, event), fields(id = %event.id, title = %event.title))]
    pub fn add(&mut self, event: CalendarEvent) -> EntityId {
        let id = event.id;
        self.events.push(event);
        debug!(count = self.events.len(), "event added");
        id
    }

    #[tracing::instrument(skip(self))]
    pub fn remove(&mut self, id: EntityId) -> bool {
        let before = self.events.len();
        self.events.retain(|event| event.id != id);
        let removed = self.events.len() != before;
        info!(removed, "remove event");
        removed
    }

    #[tracing::instrument(skip(self))]
    pub fn query_by_filter(&self, filter: &CategoryFilter) -> Vec<&CalendarEvent> {
        let out: Vec<&CalendarEvent> = self
            .events
            .iter()
            .filter(|event| filter.matches(event))
            .collect();
        debug!(count = out.len(), "filtered events");
        out
    }

    #[tracing::instrument(skip(self))]
    pub fn query_visible_on(&self, date: NaiveDate) -> Vec<&CalendarEvent> {
        self.events
            .iter()
            .filter(|event| is_visible(event, date, self.overflow))
            .collect()
    }

    #[tracing::instrument(skip(self, reminder), fields(id = %reminder.id))]
    pub fn add_reminder(&mut self, reminder: Reminder) -> EntityId {
        let id = reminder.id;
        self.reminders.push(reminder);
        id
    }

    /// Stores `event` together with its automatic reminder. Ids are only
    /// consumed once the reminder time is known to be valid.
    #[tracing::instrument(skip(self, event), fields(title = %event.title))]
    pub fn add_with_reminder(
        &mut self,
        mut event: CalendarEvent,
        lead_minutes: i64,
    ) -> anyhow::Result<(EntityId, EntityId)> {
        let mut ids = self.ids.clone();
        event.id = ids.next_id();
        let reminder = Reminder::for_event(ids.next_id(), &event, lead_minutes)?;
        debug!(fire_at = %reminder.fire_at, "computed reminder fire time");

        self.ids = ids;
        let event_id = self.add(event);
        let reminder_id = self.add_reminder(reminder);
        Ok((event_id, reminder_id))
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_reminder(&mut self, id: EntityId) -> bool {
        let before = self.reminders.len();
        self.reminders.retain(|reminder| reminder.id != id);
        self.reminders.len() != before
    }

    #[tracing::instrument(skip(self, description, category))]
    pub fn add_goal(
        &mut self,
        title: String,
        description: String,
        target_date: Option<NaiveDate>,
        category: String,
        created_at: NaiveDateTime,
    ) -> EntityId {
        let id = self.next_id();
        self.goals.push(Goal {
            id,
            title,
            description,
            target_date,
            category,
            created_at,
        });
        id
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_goal(&mut self, id: EntityId) -> bool {
        let before = self.goals.len();
        self.goals.retain(|goal| goal.id != id);
        self.goals.len() != before
    }

    #[tracing::instrument(skip(self))]
    pub fn add_task(&mut self) -> EntityId {
        let id = self.next_id();
        self.tasks.push(ScheduleTask::blank(id));
        id
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_task(&mut self, id: EntityId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    /// Sets one field of a pending task. Nothing changes when the value does
    /// not parse.
    #[tracing::instrument(skip(self))]
    pub fn update_task(
        &mut self,
        id: EntityId,
        field: TaskField,
        value: &str,
    ) -> anyhow::Result<()> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| anyhow!("task not found: {id}"))?;

        match field {
            TaskField::Title => task.title = value.to_string(),
            TaskField::Difficulty => task.difficulty = Difficulty::parse(value),
            TaskField::Estimate => {
                let minutes: i64 = value
                    .trim()
                    .parse()
                    .map_err(|err| anyhow!("invalid estimate {value:?}: {err}"))?;
                if !(1..=MAX_TASK_MINUTES).contains(&minutes) {
                    return Err(anyhow!(
                        "estimate must be between 1 and {MAX_TASK_MINUTES} minutes, got {minutes}"
                    ));
                }
                task.estimated_minutes = minutes;
            }
        }
        debug!(?field, "task updated");
        Ok(())
    }

    pub fn take_tasks(&mut self) -> Vec<ScheduleTask> {
        std::mem::take(&mut self.tasks)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::event::SCHEDULE_CATEGORY;
    use crate::recurrence::Recurrence;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn push(store: &mut EventStore, title: &str, category: &str, day: NaiveDate) -> EntityId {
        let id = store.next_id();
        let mut event = CalendarEvent::new(id, title.to_string(), day);
        event.category = category.to_string();
        store.add(event)
    }

    #[test]
    fn schedule_filter_keeps_order() {
        let mut store = EventStore::default();
        let day = date(2026, 5, 1);
        push(&mut store, "a", "work", day);
        push(&mut store, "s1", SCHEDULE_CATEGORY, day);
        push(&mut store, "b", "home", day);
        push(&mut store, "s2", SCHEDULE_CATEGORY, day);
        push(&mut store, "c", "work", day);

        let titles: Vec<&str> = store
            .query_by_filter(&CategoryFilter::Schedule)
            .iter()
            .map(|event| event.title.as_str())
            .collect();
        assert_eq!(titles, vec!["s1", "s2"]);

        assert_eq!(store.query_by_filter(&CategoryFilter::Calendar).len(), 3);
        assert_eq!(store.query_by_filter(&CategoryFilter::All).len(), 5);
        assert_eq!(
            store
                .query_by_filter(&CategoryFilter::Exact("work".to_string()))
                .len(),
            2
        );
        assert!(
            store
                .query_by_filter(&CategoryFilter::Exact("nope".to_string()))
                .is_empty()
        );
    }

    #[test]
    fn visible_on_expands_recurrence() {
        let mut store = EventStore::default();
        let id = store.next_id();
        let mut weekly = CalendarEvent::new(id, "gym".to_string(), date(2026, 3, 4));
        weekly.recurrence = Recurrence::Weekly;
        store.add(weekly);
        push(&mut store, "once", "", date(2026, 3, 11));

        let on_11th = store.query_visible_on(date(2026, 3, 11));
        assert_eq!(on_11th.len(), 2);
        assert!(store.query_visible_on(date(2026, 3, 12)).is_empty());
        assert_eq!(store.query_visible_on(date(2026, 3, 18)).len(), 1);
        assert!(store.query_visible_on(date(2026, 3, 3)).is_empty());
    }

    #[test]
    fn removing_event_keeps_its_reminder() {
        let mut store = EventStore::default();
        let (event_id, reminder_id) = store
            .add_with_reminder(
                CalendarEvent::new(EntityId(0), "dentist".to_string(), date(2026, 6, 2)),
                15,
            )
            .expect("event with reminder");

        assert!(store.remove(event_id));
        assert!(!store.remove(event_id));
        assert_eq!(store.reminders().len(), 1);
        assert_eq!(store.reminders()[0].event_id, Some(event_id));
        assert!(store.remove_reminder(reminder_id));
    }

    #[test]
    fn failed_reminder_stores_nothing() {
        let mut store = EventStore::default();
        let draft = CalendarEvent::new(EntityId(0), "gym".to_string(), date(2026, 6, 2));
        assert!(store.add_with_reminder(draft.clone(), i64::MAX).is_err());
        assert!(store.events().is_empty());
        assert!(store.reminders().is_empty());

        let (event_id, reminder_id) = store.add_with_reminder(draft, 15).expect("stored");
        assert_eq!((event_id, reminder_id), (EntityId(1), EntityId(2)));
    }

    #[test]
    fn ids_never_collide_across_kinds() {
        let mut store = EventStore::default();
        let event = push(&mut store, "e", "", date(2026, 1, 1));
        let task = store.add_task();
        let goal = store.add_goal(
            "g".to_string(),
            String::new(),
            None,
            String::new(),
            date(2026, 1, 1).and_hms_opt(0, 0, 0).expect("valid"),
        );
        assert!(event < task && task < goal);
    }

    #[test]
    fn update_task_fields() {
        let mut store = EventStore::default();
        let id = store.add_task();
        store
            .update_task(id, TaskField::Title, "Write report")
            .expect("set title");
        store
            .update_task(id, "difficulty".parse().expect("field"), "hard")
            .expect("set difficulty");
        store
            .update_task(id, TaskField::Estimate, "45")
            .expect("set estimate");
        assert!(store.update_task(id, TaskField::Estimate, "soon").is_err());
        assert!(store.update_task(id, TaskField::Estimate, "481").is_err());
        assert!(store.update_task(EntityId(999), TaskField::Title, "x").is_err());

        let task = &store.tasks()[0];
        assert_eq!(task.title, "Write report");
        assert_eq!(task.difficulty, Difficulty::Hard);
        assert_eq!(task.estimated_minutes, 45);

        assert_eq!(store.take_tasks().len(), 1);
        assert!(store.tasks().is_empty());
    }
}
