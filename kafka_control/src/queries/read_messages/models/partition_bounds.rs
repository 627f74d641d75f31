use tracing::warn;

/// Offsets one partition reader covers. `end` is exclusive, `None` means follow forever.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PartitionBounds {
    pub start: i64,
    pub end: Option<i64>,
}

impl PartitionBounds {
    /// Last `count` messages before `newest`. `None` when there is nothing to read.
    pub fn tail(partition: i32, oldest: i64, newest: i64, count: i64, follow: bool) -> Option<Self> {
        if oldest >= newest && !follow {
            warn!("Partition {} is empty, nothing to read", partition);
            return None;
        }

        Some(Self {
            start: oldest.max(newest.saturating_sub(count)),
            end: (!follow).then_some(newest),
        })
    }

    /// Messages from `start` up to `end`, at most `count` of them.
    pub fn history(partition: i32, start: i64, end: i64, count: Option<i64>) -> Option<Self> {
        let end = match count {
            Some(count) => end.min(start.saturating_add(count)),
            None => end,
        };
        if start >= end {
            warn!("No messages on partition {} in the requested range", partition);
            return None;
        }

        Some(Self {
            start,
            end: Some(end),
        })
    }

    pub fn is_past_end(&self, offset: i64) -> bool {
        self.end.is_some_and(|end| offset >= end)
    }
}
