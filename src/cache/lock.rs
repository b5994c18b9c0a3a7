//! Lock acquisition that survives poisoning.
//!
//! A panic inside one aggregate computation must not take the whole cache
//! down with it, so poisoned guards are recovered and the event is logged.

use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn recover<G>(result: LockResult<G>, source: &'static str, op: &'static str, kind: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            op,
            source,
            lock_kind = kind,
            result = "poisoned_recovered",
            "Recovered poisoned cache lock; state may predate a panic in another task"
        );
        poisoned.into_inner()
    })
}

pub(crate) fn read_guard<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), source, op, "rwlock.read")
}

pub(crate) fn write_guard<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), source, op, "rwlock.write")
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn write_guard_recovers_after_panic() {
        let lock = RwLock::new(1_u32);
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = lock.write().expect("first write should succeed");
            panic!("poison the lock");
        }));
        assert!(lock.is_poisoned());

        *write_guard(&lock, "cache::lock::tests", "bump") += 1;
        assert_eq!(*read_guard(&lock, "cache::lock::tests", "read"), 2);
    }
}
