//! Callers holding the bridge lock are serialized against each other.

use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use tether_value::{Bridge, HeapRuntime, ListRef, TaggedValue};

const WRITERS: i64 = 4;
const ROUNDS: usize = 25;
const BLOCK: usize = 8;

#[test]
fn blocks_appended_under_the_lock_stay_contiguous() {
    let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
    let list = bridge.lock().new_list();

    let writers: Vec<_> = (0..WRITERS)
        .map(|id| {
            let list = list.clone();
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let lock = list.bridge().lock();
                    let view = ListRef::new(&lock, &list);
                    for _ in 0..BLOCK {
                        view.append(&TaggedValue::I64(id)).unwrap();
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let lock = bridge.lock();
    let view = ListRef::new(&lock, &list);
    let ids: Vec<i64> = view.iter().map(|item| item.to_i64(&lock)).collect();
    assert_eq!(ids.len(), WRITERS as usize * ROUNDS * BLOCK);
    for block in ids.chunks(BLOCK) {
        assert!(block.iter().all(|&id| id == block[0]), "interleaved block {block:?}");
    }
}

#[test]
fn nested_locking_on_one_thread_does_not_deadlock() {
    let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
    let outer = bridge.lock();
    let list = outer.new_list();
    // Clone and Drop take the lock again on this thread.
    let share = list.clone();
    drop(share);
    let inner = bridge.lock();
    assert_eq!(inner.refcnt(list.value()), 1);
}

#[test]
fn wrappers_move_between_threads() {
    let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
    let text = bridge.lock().new_string("sent");
    let echoed = thread::spawn(move || {
        let lock = text.bridge().lock();
        let value = lock.runtime().to_text(text.value().object_handle().unwrap()).unwrap();
        drop(lock);
        value
    })
    .join()
    .unwrap();
    assert_eq!(echoed, "sent");
}
