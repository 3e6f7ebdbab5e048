//! Retry queue for files waiting on a ready printer.
//!
//! FIFO of original source paths. Bounded two ways: at most
//! `max_len` entries, and a path that has been queued `max_attempts`
//! times is dropped rather than queued again. A path is never queued twice
//! at once.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

/// Result of [`RetryQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// Appended; `attempt` counts how many times this path has been queued.
    Queued { attempt: u32 },
    /// Already waiting; position unchanged.
    AlreadyQueued,
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    QueueFull,
    TooManyAttempts,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::QueueFull => f.write_str("retry queue is full"),
            DropReason::TooManyAttempts => f.write_str("retry limit reached"),
        }
    }
}

#[derive(Debug)]
pub struct RetryQueue {
    items: VecDeque<PathBuf>,
    attempts: HashMap<PathBuf, u32>,
    max_len: usize,
    max_attempts: u32,
}

impl RetryQueue {
    pub fn new(max_len: usize, max_attempts: u32) -> Self {
        Self {
            items: VecDeque::new(),
            attempts: HashMap::new(),
            max_len,
            max_attempts,
        }
    }

    pub fn push(&mut self, path: PathBuf) -> Enqueued {
        if self.contains(&path) {
            return Enqueued::AlreadyQueued;
        }
        let attempt = self.attempts.get(&path).copied().unwrap_or(0) + 1;
        if attempt > self.max_attempts {
            self.attempts.remove(&path);
            return Enqueued::Dropped(DropReason::TooManyAttempts);
        }
        if self.items.len() >= self.max_len {
            return Enqueued::Dropped(DropReason::QueueFull);
        }
        self.attempts.insert(path.clone(), attempt);
        self.items.push_back(path);
        Enqueued::Queued { attempt }
    }

    pub fn pop_front(&mut self) -> Option<PathBuf> {
        self.items.pop_front()
    }

    /// Forget a path that was dealt with: its waiting entry, if any, and
    /// its attempt count.
    pub fn settle(&mut self, path: &Path) {
        self.items.retain(|p| p != path);
        self.attempts.remove(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.items.iter().any(|p| p == path)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.items.iter().map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str) -> PathBuf {
        PathBuf::from(format!("/watch/{name}"))
    }

    #[test]
    fn fifo_order() {
        let mut q = RetryQueue::new(10, 5);
        q.push(p("a.jpg"));
        q.push(p("b.jpg"));
        q.push(p("c.jpg"));
        assert_eq!(q.pop_front(), Some(p("a.jpg")));
        assert_eq!(q.pop_front(), Some(p("b.jpg")));
        assert_eq!(q.pop_front(), Some(p("c.jpg")));
        assert!(q.is_empty());
    }

    #[test]
    fn same_path_not_queued_twice() {
        let mut q = RetryQueue::new(10, 5);
        assert_eq!(q.push(p("a.jpg")), Enqueued::Queued { attempt: 1 });
        assert_eq!(q.push(p("a.jpg")), Enqueued::AlreadyQueued);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn full_queue_drops() {
        let mut q = RetryQueue::new(2, 5);
        q.push(p("a.jpg"));
        q.push(p("b.jpg"));
        assert_eq!(q.push(p("c.jpg")), Enqueued::Dropped(DropReason::QueueFull));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn attempts_accumulate_across_requeues() {
        let mut q = RetryQueue::new(10, 2);
        assert_eq!(q.push(p("a.jpg")), Enqueued::Queued { attempt: 1 });
        q.pop_front();
        assert_eq!(q.push(p("a.jpg")), Enqueued::Queued { attempt: 2 });
        q.pop_front();
        assert_eq!(q.push(p("a.jpg")), Enqueued::Dropped(DropReason::TooManyAttempts));
        // Counter reset after the drop
        assert_eq!(q.push(p("a.jpg")), Enqueued::Queued { attempt: 1 });
    }

    #[test]
    fn settle_resets_attempts() {
        let mut q = RetryQueue::new(10, 5);
        q.push(p("a.jpg"));
        q.pop_front();
        q.settle(&p("a.jpg"));
        assert_eq!(q.push(p("a.jpg")), Enqueued::Queued { attempt: 1 });
    }

    #[test]
    fn settle_removes_waiting_entry() {
        let mut q = RetryQueue::new(10, 5);
        q.push(p("a.jpg"));
        q.push(p("b.jpg"));
        q.settle(&p("a.jpg"));
        assert!(!q.contains(&p("a.jpg")));
        assert_eq!(q.pop_front(), Some(p("b.jpg")));
        assert!(q.is_empty());
    }
}
