//! Temporal classification of care tasks: overdue, due today, upcoming.
//!
//! Every check is a pure function of the evaluation instant and the task's
//! `due_date`, `completed` and `notification_sent` fields. Completed tasks
//! never classify. "Today" is the calendar day of the classifier's time zone,
//! which is the process's local zone in production.

use chrono::{
    DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use serde::Serialize;

use crate::error::{ValidationError, ValidationResult};
use crate::todo::Todo;

pub const DEFAULT_UPCOMING_HOURS: i64 = 24;

/// Forward-looking window for reminder selection, in whole hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpcomingWindow {
    hours: i64,
    duration: Duration,
}

impl UpcomingWindow {
    /// Rejects non-positive windows and ones too long to express as a duration.
    pub fn hours(hours: i64) -> ValidationResult<Self> {
        if hours <= 0 {
            return Err(ValidationError::InvalidWindow(hours));
        }
        let duration = Duration::try_hours(hours).ok_or(ValidationError::InvalidWindow(hours))?;
        Ok(Self { hours, duration })
    }

    pub fn as_hours(&self) -> i64 {
        self.hours
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Last instant covered when evaluated at `now`. `None` when the window
    /// reaches past the representable calendar, i.e. has no upper bound.
    pub fn end(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_add_signed(self.duration)
    }
}

impl Default for UpcomingWindow {
    fn default() -> Self {
        Self {
            hours: DEFAULT_UPCOMING_HOURS,
            duration: Duration::hours(DEFAULT_UPCOMING_HOURS),
        }
    }
}

/// Incomplete and due strictly before `now`.
pub fn is_overdue(todo: &Todo, now: DateTime<Utc>) -> bool {
    !todo.completed && todo.due_date < now
}

/// Incomplete, not yet reminded, and due in `(now, now + window]`.
pub fn is_upcoming(todo: &Todo, now: DateTime<Utc>, window: UpcomingWindow) -> bool {
    within_upcoming(todo, now, window.end(now))
}

fn within_upcoming(todo: &Todo, now: DateTime<Utc>, end: Option<DateTime<Utc>>) -> bool {
    !todo.completed
        && !todo.notification_sent
        && todo.due_date > now
        && end.map_or(true, |end| todo.due_date <= end)
}

/// First and last millisecond of the calendar day containing `now` in `tz`.
pub fn day_bounds<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let day = now.with_timezone(tz).date_naive();
    let start = day.and_time(NaiveTime::MIN);
    let end = start + Duration::days(1) - Duration::milliseconds(1);

    (resolve_local(tz, start, true), resolve_local(tz, end, false))
}

// Longest DST gap we step across; real zones skip at most a couple of hours.
const MAX_GAP_MINUTES: i64 = 24 * 60;

// Folds pick the widest reading of the day. A skipped wall time moves to the
// nearest one that exists: forward for the start bound, backward for the end.
fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime, earliest: bool) -> DateTime<Utc> {
    let step = if earliest {
        Duration::minutes(1)
    } else {
        Duration::minutes(-1)
    };

    let mut candidate = local;
    for _ in 0..=MAX_GAP_MINUTES {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(t) => return t.with_timezone(&Utc),
            LocalResult::Ambiguous(first, last) => {
                let picked = if earliest { first } else { last };
                return picked.with_timezone(&Utc);
            }
            LocalResult::None => candidate += step,
        }
    }
    local.and_utc()
}

/// Buckets computed for one evaluation instant. A task can sit in several.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub overdue: Vec<Todo>,
    pub due_today: Vec<Todo>,
    pub upcoming: Vec<Todo>,
}

/// Classifies tasks against the calendar day of a fixed time zone.
#[derive(Debug, Clone)]
pub struct Classifier<Tz: TimeZone = Local> {
    tz: Tz,
}

impl Classifier<Local> {
    pub fn local() -> Self {
        Self { tz: Local }
    }
}

impl Default for Classifier<Local> {
    fn default() -> Self {
        Self::local()
    }
}

impl<Tz: TimeZone> Classifier<Tz> {
    pub fn with_timezone(tz: Tz) -> Self {
        Self { tz }
    }

    /// Calendar date of `now` in this classifier's zone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    pub fn is_due_today(&self, todo: &Todo, now: DateTime<Utc>) -> bool {
        let (start, end) = day_bounds(now, &self.tz);
        !todo.completed && todo.due_date >= start && todo.due_date <= end
    }

    pub fn overdue(&self, todos: &[Todo], now: DateTime<Utc>) -> Vec<Todo> {
        select(todos, |t| is_overdue(t, now))
    }

    /// Ascending by due date.
    pub fn due_today(&self, todos: &[Todo], now: DateTime<Utc>) -> Vec<Todo> {
        let (start, end) = day_bounds(now, &self.tz);
        select(todos, |t| !t.completed && t.due_date >= start && t.due_date <= end)
    }

    pub fn upcoming(&self, todos: &[Todo], now: DateTime<Utc>, window: UpcomingWindow) -> Vec<Todo> {
        let end = window.end(now);
        select(todos, |t| within_upcoming(t, now, end))
    }

    pub fn classify(&self, todos: &[Todo], now: DateTime<Utc>, window: UpcomingWindow) -> Classification {
        Classification {
            overdue: self.overdue(todos, now),
            due_today: self.due_today(todos, now),
            upcoming: self.upcoming(todos, now, window),
        }
    }
}

fn select(todos: &[Todo], keep: impl Fn(&Todo) -> bool) -> Vec<Todo> {
    let mut selected: Vec<Todo> = todos.iter().filter(|t| keep(t)).cloned().collect();
    selected.sort_by_key(|t| t.due_date);
    selected
}
