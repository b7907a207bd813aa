//! Undoable commands executed under the runtime lock.

use std::collections::VecDeque;

use tether_value::ScopedLock;

use crate::node::Status;

/// Where a command's behaviour lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommandKind {
    /// Implemented natively.
    #[default]
    Base,
    /// Implemented by code running inside the runtime.
    Scripted,
}

/// An action the host can execute and possibly revert.
pub trait Command: Send {
    /// Where the command is implemented.
    fn kind(&self) -> CommandKind {
        CommandKind::Base
    }

    /// Perform the action.
    fn execute(&mut self, lock: &ScopedLock<'_>) -> Status;

    /// Revert a successful [`execute`](Command::execute). `false` when the
    /// command cannot be reverted.
    fn undo(&mut self, lock: &ScopedLock<'_>) -> bool {
        let _ = lock;
        false
    }

    /// An independent copy, for commands that support one.
    fn boxed_clone(&self) -> Option<Box<dyn Command>> {
        None
    }
}

/// Bounded stack of executed commands.
pub struct CommandHistory {
    done: VecDeque<Box<dyn Command>>,
    limit: usize,
}

impl CommandHistory {
    /// Default number of commands kept.
    pub const DEFAULT_LIMIT: usize = 64;

    /// History keeping at most `limit` commands; the oldest fall off first.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            done: VecDeque::with_capacity(limit.min(Self::DEFAULT_LIMIT)),
            limit,
        }
    }

    /// Execute `command` and keep it if it succeeded.
    pub fn execute(&mut self, lock: &ScopedLock<'_>, mut command: Box<dyn Command>) -> Status {
        let status = command.execute(lock);
        if !status.is_success() {
            tracing::debug!(kind = ?command.kind(), %status, "command not recorded");
            return status;
        }
        if self.limit == 0 {
            return status;
        }
        if self.done.len() == self.limit {
            self.done.pop_front();
        }
        self.done.push_back(command);
        status
    }

    /// Undo the most recent command. `None` when the history is empty,
    /// otherwise whether the command reverted itself.
    pub fn undo(&mut self, lock: &ScopedLock<'_>) -> Option<bool> {
        let mut command = self.done.pop_back()?;
        Some(command.undo(lock))
    }

    /// Commands kept.
    pub fn len(&self) -> usize {
        self.done.len()
    }

    /// Whether nothing can be undone.
    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    /// Forget every kept command.
    pub fn clear(&mut self) {
        self.done.clear();
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::with_limit(Self::DEFAULT_LIMIT)
    }
}

impl std::fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHistory")
            .field("len", &self.done.len())
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    use pretty_assertions::assert_eq;
    use tether_value::{Bridge, HeapRuntime, ListRef, SharedRef, TaggedValue};

    use super::*;

    /// Appends to a shared list and adds to a running total; undo subtracts.
    struct Push {
        list: SharedRef<'static>,
        total: Arc<AtomicI64>,
        item: i64,
    }

    impl Command for Push {
        fn execute(&mut self, lock: &ScopedLock<'_>) -> Status {
            match ListRef::new(lock, &self.list).append(&TaggedValue::I64(self.item)) {
                Ok(()) => {
                    self.total.fetch_add(self.item, Ordering::SeqCst);
                    Status::Success
                }
                Err(_) => Status::Fail,
            }
        }

        fn undo(&mut self, _lock: &ScopedLock<'_>) -> bool {
            self.total.fetch_sub(self.item, Ordering::SeqCst);
            true
        }
    }

    struct Refuse;

    impl Command for Refuse {
        fn kind(&self) -> CommandKind {
            CommandKind::Scripted
        }

        fn execute(&mut self, _lock: &ScopedLock<'_>) -> Status {
            Status::Fail
        }
    }

    fn pushes(lock: &ScopedLock<'_>, history: &mut CommandHistory, items: std::ops::Range<i64>) -> (SharedRef<'static>, Arc<AtomicI64>) {
        let list = lock.new_list();
        let total = Arc::new(AtomicI64::new(0));
        for item in items {
            let push = Push {
                list: list.clone_in(lock),
                total: Arc::clone(&total),
                item,
            };
            assert_eq!(history.execute(lock, Box::new(push)), Status::Success);
        }
        (list, total)
    }

    #[test]
    fn failed_commands_are_not_kept() {
        let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
        let lock = bridge.lock();
        let mut history = CommandHistory::default();
        assert_eq!(history.execute(&lock, Box::new(Refuse)), Status::Fail);
        assert!(history.is_empty());
        assert_eq!(history.undo(&lock), None);
    }

    #[test]
    fn undo_runs_newest_first() {
        let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
        let lock = bridge.lock();
        let mut history = CommandHistory::default();
        let (list, total) = pushes(&lock, &mut history, 1..3);
        assert_eq!(ListRef::new(&lock, &list).size(), 2);
        assert_eq!(total.load(Ordering::SeqCst), 3);

        assert_eq!(history.undo(&lock), Some(true));
        assert_eq!(total.load(Ordering::SeqCst), 1);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn limit_drops_the_oldest() {
        let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
        let lock = bridge.lock();
        let mut history = CommandHistory::with_limit(2);
        let (list, total) = pushes(&lock, &mut history, 0..5);
        assert_eq!(history.len(), 2);
        assert_eq!(ListRef::new(&lock, &list).size(), 5);

        while history.undo(&lock).is_some() {}
        assert_eq!(total.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn defaults() {
        assert_eq!(Refuse.kind(), CommandKind::Scripted);
        assert!(Refuse.boxed_clone().is_none());
        assert_eq!(CommandKind::default(), CommandKind::Base);
    }
}
