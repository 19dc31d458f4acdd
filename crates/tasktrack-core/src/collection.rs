use tasktrack_shared::Task;

/// Outcome of offering a refresh response to a holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Fresh,
    /// A newer refresh already landed; the response was dropped.
    Stale,
}

/// The task list for the current filter, exactly as the store returned it.
///
/// Every refresh replaces the whole list. Responses are tagged with the
/// sequence number of the refresh that produced them and only a response
/// newer than the last applied one is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskCollection {
    tasks: Vec<Task>,
    applied_seq: u64,
    loading_seq: Option<u64>,
}

impl TaskCollection {
    /// Store order; never re-sorted here.
    pub fn current(&self) -> &[Task] {
        &self.tasks
    }

    pub fn applied_seq(&self) -> u64 {
        self.applied_seq
    }

    pub fn is_loading(&self) -> bool {
        self.loading_seq.is_some()
    }

    pub fn is_stale(&self, seq: u64) -> bool {
        seq <= self.applied_seq
    }

    pub fn begin_loading(&mut self, seq: u64) {
        self.loading_seq = Some(seq);
    }

    pub fn replace(&mut self, seq: u64, tasks: Vec<Task>) -> Applied {
        if self.is_stale(seq) {
            return Applied::Stale;
        }
        self.tasks = tasks;
        self.applied_seq = seq;
        self.settle(seq);
        Applied::Fresh
    }

    /// A failed refresh keeps the held list but still settles the loading
    /// flag it raised.
    pub fn reject(&mut self, seq: u64) -> Applied {
        if self.is_stale(seq) {
            return Applied::Stale;
        }
        self.settle(seq);
        Applied::Fresh
    }

    fn settle(&mut self, seq: u64) {
        if self.loading_seq.is_some_and(|loading| seq >= loading) {
            self.loading_seq = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use tasktrack_shared::{TaskDraft, TaskId, TaskStatus};

    use super::*;

    fn task(id: u64) -> Task {
        let draft = TaskDraft::new(format!("task {id}"));
        Task {
            id: TaskId(id),
            description: draft.description,
            priority: draft.priority,
            category: draft.category,
            status: TaskStatus::Pending,
            created_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn newer_response_replaces_everything() {
        let mut collection = TaskCollection::default();
        assert_eq!(collection.replace(1, vec![task(1), task(2)]), Applied::Fresh);
        assert_eq!(collection.replace(2, vec![task(3)]), Applied::Fresh);
        assert_eq!(collection.current(), &[task(3)]);
    }

    #[test]
    fn late_response_is_dropped() {
        let mut collection = TaskCollection::default();
        collection.replace(2, vec![task(2)]);
        assert_eq!(collection.replace(1, vec![task(1)]), Applied::Stale);
        assert_eq!(collection.current(), &[task(2)]);
        assert_eq!(collection.applied_seq(), 2);
    }

    #[test]
    fn loading_clears_only_for_its_own_or_newer_refresh() {
        let mut collection = TaskCollection::default();
        collection.begin_loading(3);
        collection.replace(2, vec![]);
        assert!(collection.is_loading());
        collection.reject(3);
        assert!(!collection.is_loading());
    }

    #[test]
    fn failed_refresh_keeps_previous_list() {
        let mut collection = TaskCollection::default();
        collection.replace(1, vec![task(1)]);
        collection.begin_loading(2);
        collection.reject(2);
        assert_eq!(collection.current(), &[task(1)]);
        assert!(!collection.is_loading());
    }
}
