//! Task identity, priority and the typed `rtm.tasks.getList` model

use std::fmt;
use std::str::FromStr;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, RtmError};

/// Identity of one task occurrence
///
/// Every task mutation addresses a task by this triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskRef {
    pub list_id: String,
    pub taskseries_id: String,
    pub task_id: String,
}

impl TaskRef {
    pub fn new(
        list_id: impl Into<String>,
        taskseries_id: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self { list_id: list_id.into(), taskseries_id: taskseries_id.into(), task_id: task_id.into() }
    }
}

/// Task priority as understood by `rtm.tasks.setPriority`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "N")]
    None,
    #[serde(rename = "1")]
    High,
    #[serde(rename = "2")]
    Medium,
    #[serde(rename = "3")]
    Low,
}

impl Priority {
    /// Wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "N",
            Self::High => "1",
            Self::Medium => "2",
            Self::Low => "3",
        }
    }

    /// Human readable name.
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = RtmError;

    // Case-sensitive: the API only accepts an uppercase `N`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "N" => Ok(Self::None),
            "1" => Ok(Self::High),
            "2" => Ok(Self::Medium),
            "3" => Ok(Self::Low),
            other => Err(RtmError::InvalidInput(format!(
                "invalid priority `{other}`; expected one of N, 1, 2, 3"
            ))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search expression passed to `rtm.tasks.getList`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter(String);

impl TaskFilter {
    /// Use `expr` verbatim as a filter expression.
    pub fn new(expr: impl Into<String>) -> Self {
        Self(expr.into())
    }

    /// Interpret a command-line style argument.
    ///
    /// Anything containing `:` is already a filter (`priority:1`,
    /// `list:Work AND due:today`); a bare word names a list.
    pub fn from_arg(arg: &str) -> Self {
        let arg = arg.trim();
        if arg.is_empty() || arg.contains(':') {
            Self(arg.to_string())
        } else {
            Self(format!("list:{arg}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `tasks` member of a `rtm.tasks.getList` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    #[serde(rename = "list", default, deserialize_with = "one_or_many")]
    pub lists: Vec<TaskListEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskListEntry {
    pub id: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub taskseries: Vec<TaskSeries>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSeries {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub priority: Option<String>, // some renderings carry it on the series
    #[serde(default, deserialize_with = "one_or_many")]
    pub task: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub due: String, // "" when unset
    #[serde(default)]
    pub completed: String, // "" while open
    #[serde(default)]
    pub priority: Option<String>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        !self.completed.is_empty()
    }

    pub fn due(&self) -> Option<&str> {
        Some(self.due.as_str()).filter(|due| !due.is_empty())
    }
}

impl TaskSeries {
    /// Priority of `task`, falling back to the series-level value.
    pub fn priority_of(&self, task: &Task) -> Option<Priority> {
        task.priority
            .as_deref()
            .or(self.priority.as_deref())
            .and_then(|value| value.parse().ok())
    }
}

impl TaskList {
    /// Every task with its identity, in response order.
    pub fn iter_tasks(&self) -> impl Iterator<Item = (TaskRef, &TaskSeries, &Task)> + '_ {
        self.lists.iter().flat_map(|list| {
            list.taskseries.iter().flat_map(move |series| {
                series.task.iter().map(move |task| {
                    (TaskRef::new(&list.id, &series.id, &task.id), series, task)
                })
            })
        })
    }

    /// Identity of the first task in the first series named exactly `name`.
    pub fn find_by_name(&self, name: &str) -> Option<TaskRef> {
        self.iter_tasks()
            .find(|(_, series, _)| series.name == name)
            .map(|(task_ref, _, _)| task_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(|list| list.taskseries.is_empty())
    }
}

// The API renders one-element collections as a bare object.
fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    })
}
