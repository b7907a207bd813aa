//! The bridge to a foreign runtime and its execution lock.
//!
//! A [`Bridge`] bundles the runtime collaborator, the [`OpsTable`] every
//! wrapper dispatches through, and the runtime's single execution lock.
//! [`Bridge::lock`] hands out a [`ScopedLock`], and functions that touch the
//! runtime take `&ScopedLock` as proof the lock is already held.
//!
//! The lock is re-entrant and owned by whoever built the bridge. A plugin
//! library links its own copy of this crate, so acquire and release are
//! dispatched through function pointers captured at build time: every
//! library parks, wakes and identifies threads with the host's code.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use crate::error::{BridgeError, ForeignError, ForeignResult, LastError, ValueError};
use crate::handle::ObjectKind;
use crate::ops::OpsTable;
use crate::runtime::ForeignRuntime;
use crate::shared::SharedRef;
use crate::tagged::TaggedValue;

struct Shared {
    runtime: Arc<dyn ForeignRuntime>,
    ops: OpsTable,
    lock: ExecLock,
    last_error: AtomicU8,
}

#[derive(Debug, Default)]
struct Owner {
    thread: Option<ThreadId>,
    depth: usize,
}

/// Re-entrant execution lock whose code path is fixed when it is created.
struct ExecLock {
    owner: Mutex<Owner>,
    released: Condvar,
    acquire: fn(&ExecLock),
    release: fn(&ExecLock),
}

impl ExecLock {
    fn new() -> Self {
        Self {
            owner: Mutex::new(Owner::default()),
            released: Condvar::new(),
            acquire: Self::acquire_here,
            release: Self::release_here,
        }
    }

    fn acquire(&self) {
        (self.acquire)(self);
    }

    fn release(&self) {
        (self.release)(self);
    }

    fn acquire_here(&self) {
        let me = thread::current().id();
        let mut owner = self.owner.lock();
        while owner.thread.is_some_and(|thread| thread != me) {
            self.released.wait(&mut owner);
        }
        owner.thread = Some(me);
        owner.depth += 1;
    }

    fn release_here(&self) {
        let mut owner = self.owner.lock();
        owner.depth = owner.depth.saturating_sub(1);
        if owner.depth == 0 {
            owner.thread = None;
            drop(owner);
            self.released.notify_one();
        }
    }
}

/// Explicitly owned bridge configuration: the runtime plus the ops table.
///
/// ```
/// use std::sync::Arc;
/// use tether_value::{BridgeConfig, HeapRuntime, OpsTable};
///
/// let bridge = BridgeConfig::new(Arc::new(HeapRuntime::new()))
///     .ops(OpsTable::default())
///     .build();
/// assert_eq!(bridge.runtime().name(), "heap");
/// ```
#[derive(Clone)]
pub struct BridgeConfig {
    runtime: Arc<dyn ForeignRuntime>,
    ops: OpsTable,
}

impl BridgeConfig {
    /// Configuration using the default ops table.
    pub fn new(runtime: Arc<dyn ForeignRuntime>) -> Self {
        Self {
            runtime,
            ops: OpsTable::default(),
        }
    }

    /// Replace the ops table.
    pub fn ops(mut self, ops: OpsTable) -> Self {
        self.ops = ops;
        self
    }

    /// Freeze the configuration into a bridge.
    pub fn build(self) -> Bridge {
        Bridge {
            inner: Arc::new(Shared {
                runtime: self.runtime,
                ops: self.ops,
                lock: ExecLock::new(),
                last_error: AtomicU8::new(0),
            }),
        }
    }
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("runtime", &self.runtime.name())
            .field("ops", &self.ops)
            .finish()
    }
}

impl From<BridgeConfig> for Bridge {
    fn from(config: BridgeConfig) -> Self {
        config.build()
    }
}

/// Cheap-clone handle to a foreign runtime.
///
/// Every wrapper keeps a clone, so the runtime and its ops table outlive the
/// last value that needs them.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<Shared>,
}

impl Bridge {
    /// Bridge over `runtime` with the default ops table.
    pub fn new(runtime: Arc<dyn ForeignRuntime>) -> Self {
        BridgeConfig::new(runtime).build()
    }

    /// Bridge over `runtime` with a custom ops table.
    pub fn with_ops(runtime: Arc<dyn ForeignRuntime>, ops: OpsTable) -> Self {
        BridgeConfig::new(runtime).ops(ops).build()
    }

    /// The runtime collaborator.
    pub fn runtime(&self) -> &dyn ForeignRuntime {
        self.inner.runtime.as_ref()
    }

    /// The installed ops table.
    pub fn ops(&self) -> &OpsTable {
        &self.inner.ops
    }

    /// Swap the ops table.
    ///
    /// Values produced under one table must be released under the same table,
    /// so the swap only succeeds while this is the sole handle: no clone and
    /// no wrapper is alive.
    pub fn set_ops(&mut self, ops: OpsTable) -> Result<(), BridgeError> {
        let handles = Arc::strong_count(&self.inner) - 1;
        match Arc::get_mut(&mut self.inner) {
            Some(shared) => {
                shared.ops = ops;
                tracing::debug!(runtime = shared.runtime.name(), "ops table replaced");
                Ok(())
            }
            None => Err(BridgeError::OpsInUse { handles }),
        }
    }

    /// Acquire the execution lock, blocking until it is free.
    ///
    /// The lock is re-entrant for the owning thread, which is what lets
    /// wrapper `Drop` impls run while an outer guard is alive. There is no
    /// timeout.
    pub fn lock(&self) -> ScopedLock<'_> {
        self.inner.lock.acquire();
        ScopedLock {
            bridge: self,
            _not_send: PhantomData,
        }
    }

    /// Whether both handles point at the same bridge.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Live handles to this bridge, wrappers included.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("runtime", &self.inner.runtime.name())
            .field("handles", &self.handle_count())
            .finish_non_exhaustive()
    }
}

/// Proof that the current thread holds the bridge's execution lock.
///
/// Released on drop. Not `Send`: the lock belongs to the thread that took it.
pub struct ScopedLock<'b> {
    bridge: &'b Bridge,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ScopedLock<'_> {
    fn drop(&mut self) {
        self.bridge.inner.lock.release();
    }
}

impl<'b> ScopedLock<'b> {
    /// The bridge this guard locks.
    pub fn bridge(&self) -> &'b Bridge {
        self.bridge
    }

    /// The runtime collaborator.
    pub fn runtime(&self) -> &'b dyn ForeignRuntime {
        self.bridge.runtime()
    }

    /// The installed ops table.
    pub fn ops(&self) -> &'b OpsTable {
        self.bridge.ops()
    }

    /// The runtime's none object as a borrowed value.
    pub fn none(&self) -> TaggedValue<'static> {
        TaggedValue::Object(self.runtime().none())
    }

    /// Log a runtime fault and record it as the last error.
    pub fn drain(&self, error: ForeignError) {
        tracing::warn!(
            runtime = self.runtime().name(),
            kind = %error.kind,
            message = %error.message,
            "foreign runtime fault"
        );
        self.record(LastError::Foreign);
    }

    /// Drain `error` and hand it back as a [`ValueError`] for `Result`-returning
    /// callers.
    pub fn fault(&self, error: ForeignError) -> ValueError {
        self.drain(error.clone());
        ValueError::Foreign(error)
    }

    /// Unwrap a runtime result, draining the fault on error.
    pub fn drained<T>(&self, result: ForeignResult<T>) -> Option<T> {
        result.map_err(|e| self.drain(e)).ok()
    }

    /// Record `error` as the last error.
    pub fn record(&self, error: LastError) {
        self.bridge
            .inner
            .last_error
            .store(error as u8, Ordering::Relaxed);
    }

    /// Read and clear the last recorded error.
    pub fn take_last_error(&self) -> Option<LastError> {
        LastError::from_code(self.bridge.inner.last_error.swap(0, Ordering::Relaxed))
    }

    // ── ops table forwards ──────────────────────────────────────────────────

    /// Initialise a value from `arg` without touching reference counts.
    pub fn init_value<'a>(&self, arg: TaggedValue<'a>) -> TaggedValue<'a> {
        (self.ops().init_val)(self, arg)
    }

    /// Build a fresh object of `kind` from `arg`.
    pub fn init_object(&self, kind: ObjectKind, arg: TaggedValue<'_>) -> Option<SharedRef<'static>> {
        (self.ops().init_obj)(self, kind, arg)
            .map(|handle| SharedRef::from_new_reference(self.bridge, TaggedValue::Object(handle)))
    }

    /// Release whatever `value` owns and reset it to empty.
    pub fn deinit_value(&self, value: &mut TaggedValue<'_>) {
        (self.ops().deinit)(self, value);
    }

    /// Independent copy of `value`. The result owns a new reference.
    pub fn clone_value<'a>(&self, value: TaggedValue<'a>) -> TaggedValue<'a> {
        (self.ops().clone)(self, value)
    }

    /// Additional share of `value`. The result owns a new reference.
    pub fn share_value<'a>(&self, value: TaggedValue<'a>) -> TaggedValue<'a> {
        (self.ops().share)(self, value)
    }

    /// Object identity.
    pub fn is_same(&self, a: TaggedValue<'_>, b: TaggedValue<'_>) -> bool {
        (self.ops().is)(self, a, b)
    }

    /// Cross-tag equality.
    pub fn values_eq(&self, a: TaggedValue<'_>, b: TaggedValue<'_>) -> bool {
        (self.ops().eq)(self, a, b)
    }

    /// Cross-tag inequality.
    pub fn values_ne(&self, a: TaggedValue<'_>, b: TaggedValue<'_>) -> bool {
        (self.ops().ne)(self, a, b)
    }

    /// Debug rendering of `value`.
    pub fn reflect(&self, value: TaggedValue<'_>) -> String {
        (self.ops().reflect)(self, value)
    }

    /// Reference count of `value`; `1` for native scalars.
    pub fn refcnt(&self, value: TaggedValue<'_>) -> i64 {
        (self.ops().refcnt)(self, value)
    }
}

impl fmt::Debug for ScopedLock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedLock")
            .field("bridge", self.bridge)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapRuntime;
    use crate::owned::OwnedValue;

    fn bridge() -> Bridge {
        Bridge::new(Arc::new(HeapRuntime::new()))
    }

    fn refuse_clone<'a>(_: &ScopedLock<'_>, _: TaggedValue<'a>) -> TaggedValue<'a> {
        TaggedValue::Empty
    }

    #[test]
    fn lock_is_reentrant_on_one_thread() {
        let bridge = bridge();
        let outer = bridge.lock();
        let inner = bridge.lock();
        assert!(inner.bridge().ptr_eq(outer.bridge()));
    }

    #[test]
    fn inner_release_keeps_the_outer_hold() {
        let bridge = bridge();
        let outer = bridge.lock();
        drop(bridge.lock());

        let other = bridge.clone();
        let contender = thread::spawn(move || {
            let _lock = other.lock();
        });
        thread::sleep(std::time::Duration::from_millis(50));
        assert!(!contender.is_finished());
        drop(outer);
        contender.join().unwrap();
    }

    #[test]
    fn lock_dispatches_through_the_captured_functions() {
        static ACQUIRED: AtomicU8 = AtomicU8::new(0);

        fn counting_acquire(lock: &ExecLock) {
            ACQUIRED.fetch_add(1, Ordering::Relaxed);
            ExecLock::acquire_here(lock);
        }

        let mut bridge = bridge();
        let shared = Arc::get_mut(&mut bridge.inner).unwrap();
        shared.lock.acquire = counting_acquire;

        let outer = bridge.lock();
        let list = outer.new_list();
        drop(list.clone());
        drop(list);
        drop(outer);
        assert!(ACQUIRED.load(Ordering::Relaxed) >= 3);
        assert_eq!(bridge.inner.lock.owner.lock().depth, 0);
    }

    #[test]
    fn last_error_is_read_once() {
        let bridge = bridge();
        let lock = bridge.lock();
        assert_eq!(lock.take_last_error(), None);
        lock.drain(ForeignError::runtime("boom"));
        assert_eq!(lock.take_last_error(), Some(LastError::Foreign));
        assert_eq!(lock.take_last_error(), None);
    }

    #[test]
    fn drained_turns_faults_into_none() {
        let bridge = bridge();
        let lock = bridge.lock();
        let value: ForeignResult<i32> = Err(ForeignError::type_error("nope"));
        assert_eq!(lock.drained(value), None);
        assert_eq!(lock.take_last_error(), Some(LastError::Foreign));
    }

    #[test]
    fn ops_swap_refused_while_wrappers_live() {
        let mut bridge = bridge();
        let held = OwnedValue::empty(&bridge);
        let custom = OpsTable {
            clone: refuse_clone,
            ..OpsTable::default()
        };
        assert_eq!(
            bridge.set_ops(custom),
            Err(BridgeError::OpsInUse { handles: 1 })
        );
        drop(held);
        assert_eq!(bridge.set_ops(custom), Ok(()));

        let lock = bridge.lock();
        assert_eq!(lock.clone_value(TaggedValue::I64(3)), TaggedValue::Empty);
    }

    #[test]
    fn config_builds_bridge() {
        let bridge: Bridge = BridgeConfig::new(Arc::new(HeapRuntime::new())).into();
        assert_eq!(bridge.handle_count(), 1);
        assert!(format!("{bridge:?}").contains("heap"));
    }
}
