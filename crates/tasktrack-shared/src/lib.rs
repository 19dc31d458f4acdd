use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{
  Deserialize,
  Serialize
};

pub const DEFAULT_CATEGORY: &str =
  "general";
pub const STATUS_ALL: &str = "all";

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for TaskId {
  type Err = std::num::ParseIntError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    s.trim().parse().map(TaskId)
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
  Pending,
  Completed
}

impl TaskStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      | TaskStatus::Pending => {
        "pending"
      }
      | TaskStatus::Completed => {
        "completed"
      }
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
  Low,
  #[default]
  Medium,
  High
}

impl TaskPriority {
  pub const ALL: [TaskPriority; 3] = [
    TaskPriority::Low,
    TaskPriority::Medium,
    TaskPriority::High
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | TaskPriority::Low => "low",
      | TaskPriority::Medium => "medium",
      | TaskPriority::High => "high"
    }
  }
}

impl fmt::Display for TaskPriority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TaskPriority {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "low" | "l" => {
        Ok(TaskPriority::Low)
      }
      | "medium" | "med" | "m" => {
        Ok(TaskPriority::Medium)
      }
      | "high" | "h" => {
        Ok(TaskPriority::High)
      }
      | other => Err(format!(
        "unknown priority: {other}"
      ))
    }
  }
}

fn default_category() -> String {
  DEFAULT_CATEGORY.to_string()
}

/// A task record as owned by the
/// remote store. The client only ever
/// holds copies of these.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct Task {
  pub id:           TaskId,
  pub description:  String,
  #[serde(default)]
  pub priority:     TaskPriority,
  #[serde(default = "default_category")]
  pub category:     String,
  pub status:       TaskStatus,
  #[serde(default)]
  pub created_at:   Option<String>,
  #[serde(default)]
  pub completed_at: Option<String>
}

impl Task {
  pub fn is_completed(&self) -> bool {
    self.status == TaskStatus::Completed
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct TaskDraft {
  pub description: String,
  #[serde(default)]
  pub priority:    TaskPriority,
  #[serde(default = "default_category")]
  pub category:    String
}

impl TaskDraft {
  pub fn new(
    description: impl Into<String>
  ) -> Self {
    Self {
      description: description.into(),
      priority:    TaskPriority::Medium,
      category:    default_category()
    }
  }

  pub fn with_priority(
    mut self,
    priority: TaskPriority
  ) -> Self {
    self.priority = priority;
    self
  }

  pub fn with_category(
    mut self,
    category: impl Into<String>
  ) -> Self {
    self.category = category.into();
    self
  }

  pub fn has_blank_description(
    &self
  ) -> bool {
    self.description.trim().is_empty()
  }

  /// Trims text fields; a blank
  /// category falls back to
  /// `general`.
  pub fn normalized(self) -> Self {
    let category =
      self.category.trim();
    Self {
      description: self
        .description
        .trim()
        .to_string(),
      priority:    self.priority,
      category:    if category
        .is_empty()
      {
        default_category()
      } else {
        category.to_string()
      }
    }
  }
}

/// Partial update. Status is
/// deliberately absent: completion
/// goes through its own operation.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
  PartialEq,
)]
pub struct TaskPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub description: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub priority:    Option<TaskPriority>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub category:    Option<String>
}

impl TaskPatch {
  pub fn is_empty(&self) -> bool {
    self.description.is_none()
      && self.priority.is_none()
      && self.category.is_none()
  }

  pub fn has_blank_description(
    &self
  ) -> bool {
    self
      .description
      .as_deref()
      .is_some_and(|d| {
        d.trim().is_empty()
      })
  }

  pub fn normalized(self) -> Self {
    Self {
      description: self
        .description
        .map(|d| d.trim().to_string()),
      priority:    self.priority,
      category:    self
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
    }
  }
}

/// Client-held predicate. Fields are
/// kept as raw text so values the
/// client does not recognize still
/// reach the store untouched.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskFilter {
  pub status:   String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub priority: String
}

impl Default for TaskFilter {
  fn default() -> Self {
    Self {
      status:   STATUS_ALL.to_string(),
      category: String::new(),
      priority: String::new()
    }
  }
}

impl TaskFilter {
  pub fn with_status(
    mut self,
    status: impl Into<String>
  ) -> Self {
    self.status = status.into();
    self
  }

  pub fn with_category(
    mut self,
    category: impl Into<String>
  ) -> Self {
    self.category = category.into();
    self
  }

  pub fn with_priority(
    mut self,
    priority: impl Into<String>
  ) -> Self {
    self.priority = priority.into();
    self
  }

  fn status_constraint(
    &self
  ) -> Option<&str> {
    let status = self.status.trim();
    if status.is_empty()
      || status == STATUS_ALL
    {
      None
    } else {
      Some(status)
    }
  }

  fn category_constraint(
    &self
  ) -> Option<&str> {
    Some(self.category.trim())
      .filter(|c| !c.is_empty())
  }

  fn priority_constraint(
    &self
  ) -> Option<&str> {
    Some(self.priority.trim())
      .filter(|p| !p.is_empty())
  }

  pub fn is_unconstrained(
    &self
  ) -> bool {
    self.status_constraint().is_none()
      && self
        .category_constraint()
        .is_none()
      && self
        .priority_constraint()
        .is_none()
  }

  /// Query parameters for the list
  /// request. Fields at their default
  /// are left out entirely.
  pub fn query_pairs(
    &self
  ) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(status) =
      self.status_constraint()
    {
      pairs.push((
        "status",
        status.to_string()
      ));
    }
    if let Some(category) =
      self.category_constraint()
    {
      pairs.push((
        "category",
        category.to_string()
      ));
    }
    if let Some(priority) =
      self.priority_constraint()
    {
      pairs.push((
        "priority",
        priority.to_string()
      ));
    }
    pairs
  }

  /// AND across every constrained
  /// field. Category compares
  /// case-insensitively.
  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    if let Some(status) =
      self.status_constraint()
      && task.status.as_str() != status
    {
      return false;
    }

    if let Some(category) =
      self.category_constraint()
      && !task
        .category
        .eq_ignore_ascii_case(category)
    {
      return false;
    }

    if let Some(priority) =
      self.priority_constraint()
      && task.priority.as_str()
        != priority
    {
      return false;
    }

    true
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
pub struct Statistics {
  pub total:           u64,
  pub pending:         u64,
  pub completed:       u64,
  #[serde(default)]
  pub completion_rate: f64,
  #[serde(default)]
  pub by_priority:     BTreeMap<String, u64>,
  #[serde(default)]
  pub by_category:     BTreeMap<String, u64>
}

impl Statistics {
  /// Full recomputation over a task
  /// set. Only observed buckets are
  /// present in the breakdowns.
  pub fn compute(
    tasks: &[Task]
  ) -> Self {
    let total = tasks.len() as u64;
    let completed = tasks
      .iter()
      .filter(|t| t.is_completed())
      .count()
      as u64;
    let pending = total - completed;

    let mut by_priority =
      BTreeMap::new();
    let mut by_category =
      BTreeMap::new();
    for task in tasks {
      *by_priority
        .entry(
          task
            .priority
            .as_str()
            .to_string()
        )
        .or_insert(0) += 1;

      let category =
        task.category.trim();
      let key = if category.is_empty()
      {
        default_category()
      } else {
        category.to_string()
      };
      *by_category
        .entry(key)
        .or_insert(0) += 1;
    }

    Self {
      total,
      pending,
      completed,
      completion_rate:
        completion_rate(
          completed, total
        ),
      by_priority,
      by_category
    }
  }

  /// Priority buckets in
  /// low/medium/high order, then any
  /// store-specific keys by name.
  pub fn priority_breakdown(
    &self
  ) -> Vec<(&str, u64)> {
    let mut out: Vec<(&str, u64)> =
      TaskPriority::ALL
        .iter()
        .filter_map(|p| {
          self
            .by_priority
            .get_key_value(p.as_str())
            .map(|(k, v)| {
              (k.as_str(), *v)
            })
        })
        .collect();
    out.extend(
      self
        .by_priority
        .iter()
        .filter(|(k, _)| {
          k.parse::<TaskPriority>()
            .is_err()
        })
        .map(|(k, v)| (k.as_str(), *v))
    );
    out
  }

  /// Category buckets ordered by
  /// descending count, ties by name.
  pub fn categories_by_count(
    &self
  ) -> Vec<(&str, u64)> {
    let mut out: Vec<(&str, u64)> =
      self
        .by_category
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect();
    out.sort_by(|a, b| {
      b.1.cmp(&a.1).then(a.0.cmp(b.0))
    });
    out
  }
}

pub fn completion_rate(
  completed: u64,
  total: u64
) -> f64 {
  if total == 0 {
    return 0.0;
  }
  (completed as f64 / total as f64
    * 100.0)
    .round()
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
pub struct ClearReport {
  pub removed_count: u64
}
