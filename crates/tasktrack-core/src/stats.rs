use tasktrack_shared::Statistics;

use crate::collection::Applied;

/// Latest statistics snapshot fetched from the store.
///
/// Never derived from the held task list, so the two may briefly disagree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsAggregator {
    snapshot: Option<Statistics>,
    applied_seq: u64,
}

impl StatisticsAggregator {
    /// `None` until the first successful fetch.
    pub fn current(&self) -> Option<&Statistics> {
        self.snapshot.as_ref()
    }

    pub fn applied_seq(&self) -> u64 {
        self.applied_seq
    }

    pub fn replace(&mut self, seq: u64, statistics: Statistics) -> Applied {
        if seq <= self.applied_seq {
            return Applied::Stale;
        }
        self.snapshot = Some(statistics);
        self.applied_seq = seq;
        Applied::Fresh
    }
}
