use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::start_of_day_utc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Todo,
    InProgress,
    Done,
}

impl Status {
    /// Column order on the board.
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in_progress",
            Status::Done => "done",
        }
    }

    pub fn message_id(self) -> &'static str {
        match self {
            Status::Todo => "status.todo",
            Status::InProgress => "status.inProgress",
            Status::Done => "status.done",
        }
    }

    pub fn column_message_id(self) -> &'static str {
        match self {
            Status::Todo => "columns.todo",
            Status::InProgress => "columns.inProgress",
            Status::Done => "columns.done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" | "to_do" | "to-do" => Ok(Status::Todo),
            "in_progress" | "in-progress" | "inprogress" | "progress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            other => Err(anyhow!("unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn message_id(self) -> &'static str {
        match self {
            Priority::Low => "priority.low",
            Priority::Medium => "priority.medium",
            Priority::High => "priority.high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Priority::Low),
            "medium" | "m" => Ok(Priority::Medium),
            "high" | "h" => Ok(Priority::High),
            other => Err(anyhow!("unknown priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,

    pub title: String,

    pub description: String,

    pub status: Status,

    pub priority: Priority,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// Caller-supplied fields of a task about to be created. Status and
/// timestamps are owned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

/// Partial update. `due_date: Some(None)` clears the due date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl Task {
    pub fn new_todo(id: Uuid, fields: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: fields.title,
            description: fields.description,
            status: Status::Todo,
            priority: fields.priority,
            created_at: now,
            updated_at: now,
            due_date: fields.due_date,
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>, tz: &Tz) -> bool {
        if self.status == Status::Done {
            return false;
        }
        self.due_date
            .and_then(|due| start_of_day_utc(due, tz))
            .map(|due_start| due_start < now)
            .unwrap_or(false)
    }

    pub fn was_updated(&self) -> bool {
        self.updated_at != self.created_at
    }

    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

impl TaskPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub(crate) fn apply_to(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    use super::{NewTask, Priority, Status, Task, TaskPatch};

    fn sample(due: Option<NaiveDate>) -> Task {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        Task::new_todo(
            Uuid::new_v4(),
            NewTask {
                title: "Water plants".to_string(),
                description: "Balcony and kitchen".to_string(),
                priority: Priority::Low,
                due_date: due,
            },
            now,
        )
    }

    #[test]
    fn overdue_only_when_due_passed_and_not_done() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let tz = chrono_tz::UTC;

        let mut task = sample(NaiveDate::from_ymd_opt(2026, 3, 9));
        assert!(task.is_overdue(now, &tz));

        task.status = Status::InProgress;
        assert!(task.is_overdue(now, &tz));

        task.status = Status::Done;
        assert!(!task.is_overdue(now, &tz));
    }

    #[test]
    fn future_or_missing_due_date_is_not_overdue() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let tz = chrono_tz::UTC;

        assert!(!sample(None).is_overdue(now, &tz));
        assert!(!sample(NaiveDate::from_ymd_opt(2026, 3, 11)).is_overdue(now, &tz));
    }

    #[test]
    fn due_day_start_depends_on_board_timezone() {
        // 2026-03-10 02:00 UTC is still 2026-03-09 in Mexico City.
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 2, 0, 0).unwrap();
        let task = sample(NaiveDate::from_ymd_opt(2026, 3, 10));

        assert!(task.is_overdue(now, &chrono_tz::UTC));
        assert!(!task.is_overdue(now, &chrono_tz::America::Mexico_City));
    }

    #[test]
    fn new_tasks_start_in_todo_with_equal_stamps() {
        let task = sample(None);
        assert_eq!(task.status, Status::Todo);
        assert_eq!(task.created_at, task.updated_at);
        assert!(!task.was_updated());
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut task = sample(NaiveDate::from_ymd_opt(2026, 4, 1));
        TaskPatch {
            priority: Some(Priority::High),
            due_date: Some(None),
            ..TaskPatch::default()
        }
        .apply_to(&mut task);

        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, None);
        assert_eq!(task.title, "Water plants");
        assert_eq!(task.status, Status::Todo);
    }

    #[test]
    fn status_and_priority_parse_common_spellings() {
        assert_eq!("in-progress".parse::<Status>().unwrap(), Status::InProgress);
        assert_eq!("DONE".parse::<Status>().unwrap(), Status::Done);
        assert!("later".parse::<Status>().is_err());
        assert_eq!("h".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn serializes_with_wire_names() {
        let task = sample(NaiveDate::from_ymd_opt(2026, 4, 1));
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "todo");
        assert_eq!(json["priority"], "low");
        assert_eq!(json["dueDate"], "2026-04-01");
        assert!(json.get("createdAt").is_some());
    }
}
