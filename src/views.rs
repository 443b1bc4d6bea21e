//! Derived task views.
//!
//! Pure functions of a task list and filter state; nothing here performs I/O
//! or mutates its input, so every view can be recomputed on demand.

use chrono::{DateTime, Utc};
use desidia_schema::{Subtask, Task, TaskPriority, TaskStatus};
use std::collections::BTreeMap;

/// Bucket key for tasks without an assignee.
pub const UNASSIGNED: &str = "unassigned";

/// Board columns, in display order. Cancelled tasks have no column.
pub const BOARD_COLUMNS: [TaskStatus; 5] = [
    TaskStatus::Todo,
    TaskStatus::InProgress,
    TaskStatus::InReview,
    TaskStatus::Done,
    TaskStatus::Blocked,
];

/// Equality filters plus a free-text search term.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<String>,
    pub search: String,
}

/// A single filter change, see [`TaskFilters::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum TaskFilter {
    Status(Option<TaskStatus>),
    Priority(Option<TaskPriority>),
    Assignee(Option<String>),
    Search(String),
}

impl TaskFilters {
    pub fn set(&mut self, filter: TaskFilter) {
        match filter {
            TaskFilter::Status(v) => self.status = v,
            TaskFilter::Priority(v) => self.priority = v,
            TaskFilter::Assignee(v) => self.assignee_id = v,
            TaskFilter::Search(v) => self.search = v,
        }
    }

    /// Query pairs for list endpoints; unset filters are omitted.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(priority) = self.priority {
            pairs.push(("priority", priority.as_str().to_string()));
        }
        if let Some(assignee) = &self.assignee_id {
            pairs.push(("assigneeId", assignee.clone()));
        }
        if !self.search.is_empty() {
            pairs.push(("search", self.search.clone()));
        }
        pairs
    }
}

/// Tasks partitioned into the fixed board columns.
#[derive(Debug, Default, PartialEq)]
pub struct StatusGroups<'a> {
    pub todo: Vec<&'a Task>,
    pub in_progress: Vec<&'a Task>,
    pub in_review: Vec<&'a Task>,
    pub done: Vec<&'a Task>,
    pub blocked: Vec<&'a Task>,
}

impl<'a> StatusGroups<'a> {
    /// `None` for statuses without a column.
    pub fn get(&self, status: TaskStatus) -> Option<&[&'a Task]> {
        match status {
            TaskStatus::Todo => Some(&self.todo),
            TaskStatus::InProgress => Some(&self.in_progress),
            TaskStatus::InReview => Some(&self.in_review),
            TaskStatus::Done => Some(&self.done),
            TaskStatus::Blocked => Some(&self.blocked),
            TaskStatus::Cancelled => None,
        }
    }

    fn column_mut(&mut self, status: TaskStatus) -> Option<&mut Vec<&'a Task>> {
        match status {
            TaskStatus::Todo => Some(&mut self.todo),
            TaskStatus::InProgress => Some(&mut self.in_progress),
            TaskStatus::InReview => Some(&mut self.in_review),
            TaskStatus::Done => Some(&mut self.done),
            TaskStatus::Blocked => Some(&mut self.blocked),
            TaskStatus::Cancelled => None,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = (TaskStatus, &[&'a Task])> {
        BOARD_COLUMNS
            .into_iter()
            .filter_map(move |status| self.get(status).map(|tasks| (status, tasks)))
    }
}

/// Partition into board columns, each sorted by `order` ascending. The sort
/// is stable, so equal orders keep list order.
pub fn group_by_status(tasks: &[Task]) -> StatusGroups<'_> {
    let mut groups = StatusGroups::default();
    for task in tasks {
        if let Some(column) = groups.column_mut(task.status) {
            column.push(task);
        }
    }
    for status in BOARD_COLUMNS {
        if let Some(column) = groups.column_mut(status) {
            column.sort_by_key(|t| t.order);
        }
    }
    groups
}

pub fn group_by_priority(tasks: &[Task]) -> BTreeMap<TaskPriority, Vec<&Task>> {
    let mut grouped: BTreeMap<TaskPriority, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        grouped.entry(task.priority).or_default().push(task);
    }
    grouped
}

/// Keyed by assignee id, with [`UNASSIGNED`] for tasks nobody owns.
pub fn group_by_assignee(tasks: &[Task]) -> BTreeMap<&str, Vec<&Task>> {
    let mut grouped: BTreeMap<&str, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        let key = task
            .assignee_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(UNASSIGNED);
        grouped.entry(key).or_default().push(task);
    }
    grouped
}

pub fn completed(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| t.status == TaskStatus::Done).collect()
}

pub fn pending(tasks: &[Task]) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| !matches!(t.status, TaskStatus::Done | TaskStatus::Cancelled))
        .collect()
}

/// Past due relative to `now` and not done. Cancelled tasks still count.
pub fn overdue(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| t.status != TaskStatus::Done)
        .filter(|t| t.due_date.is_some_and(|due| due < now))
        .collect()
}

/// Apply status, priority and assignee equality filters, then a
/// case-insensitive search over title and description.
pub fn filter_tasks<'a>(tasks: &'a [Task], filters: &TaskFilters) -> Vec<&'a Task> {
    let needle = filters.search.to_lowercase();
    tasks
        .iter()
        .filter(|t| filters.status.is_none_or(|s| t.status == s))
        .filter(|t| filters.priority.is_none_or(|p| t.priority == p))
        .filter(|t| {
            filters
                .assignee_id
                .as_deref()
                .is_none_or(|a| t.assignee_id.as_deref() == Some(a))
        })
        .filter(|t| needle.is_empty() || matches_search(t, &needle))
        .collect()
}

fn matches_search(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
}

/// Completed share of subtasks as a rounded percentage.
///
/// The task's own counters win when non-zero; otherwise the loaded subtask
/// list is counted.
pub fn subtask_progress(task: &Task, subtasks: &[Subtask]) -> u32 {
    let total = if task.subtask_count > 0 {
        task.subtask_count as usize
    } else {
        subtasks.len()
    };
    let done = if task.completed_subtask_count > 0 {
        task.completed_subtask_count as usize
    } else {
        subtasks.iter().filter(|s| s.is_completed).count()
    };
    if total == 0 {
        return 0;
    }
    let percent = (done * 100 + total / 2) / total;
    u32::try_from(percent).unwrap_or(u32::MAX)
}
