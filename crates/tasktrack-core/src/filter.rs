use tasktrack_shared::TaskFilter;
use tracing::debug;

/// The active filter for the session.
///
/// Replaced wholesale on every [`FilterState::set`]; callers merge partial
/// edits themselves. Values are not validated here, the store decides what a
/// status or priority means.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
  current:  TaskFilter,
  revision: u64
}

impl FilterState {
  pub fn current(&self) -> &TaskFilter {
    &self.current
  }

  /// Number of `set` calls so far. Each one owes exactly one task refresh.
  pub fn revision(&self) -> u64 {
    self.revision
  }

  pub fn set(
    &mut self,
    filter: TaskFilter
  ) {
    self.revision += 1;
    debug!(
      revision = self.revision,
      status = %filter.status,
      category = %filter.category,
      priority = %filter.priority,
      "filter replaced"
    );
    self.current = filter;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn set_replaces_every_field() {
    let mut state = FilterState::default();
    state.set(
      TaskFilter::default()
        .with_status("pending")
        .with_category("work")
    );
    state.set(
      TaskFilter::default()
        .with_priority("high")
    );

    assert_eq!(state.revision(), 2);
    assert_eq!(
      state.current(),
      &TaskFilter::default()
        .with_priority("high")
    );
  }

  #[test]
  fn identical_filter_still_counts() {
    let mut state = FilterState::default();
    state.set(TaskFilter::default());
    assert_eq!(state.revision(), 1);
  }
}
