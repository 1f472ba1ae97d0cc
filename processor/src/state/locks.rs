use std::collections::BTreeMap;

use oox_core::Reference;

use super::ThreadId;

// LOCK SET
// ================================================================================================

/// Partial mapping from reference to the thread currently holding its lock.
/// A reference is mapped at most once; acquisition is re-entrant.
#[derive(Clone, Debug, Default)]
pub struct LockSet {
    held: BTreeMap<Reference, ThreadId>,
}

impl LockSet {
    /// Acquires `r` for `tid`. Returns false when the lock is held by
    /// another thread; re-acquisition by the holder is a no-op.
    pub fn acquire(&mut self, r: Reference, tid: ThreadId) -> bool {
        match self.held.get(&r) {
            Some(holder) => *holder == tid,
            None => {
                self.held.insert(r, tid);
                true
            },
        }
    }

    /// Removes the mapping for `r`; releasing an unheld lock is a no-op.
    pub fn release(&mut self, r: Reference) {
        self.held.remove(&r);
    }

    /// Releases every lock held by `tid` (used when the thread despawns).
    pub fn release_all(&mut self, tid: ThreadId) {
        self.held.retain(|_, holder| *holder != tid);
    }

    pub fn holder(&self, r: Reference) -> Option<ThreadId> {
        self.held.get(&r).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Reference, ThreadId)> + '_ {
        self.held.iter().map(|(r, tid)| (*r, *tid))
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const T0: ThreadId = ThreadId::new(0);
    const T1: ThreadId = ThreadId::new(1);

    #[test]
    fn acquisition_is_reentrant() {
        let mut locks = LockSet::default();
        let r = Reference::new(3);
        assert!(locks.acquire(r, T0));
        assert!(locks.acquire(r, T0));
        assert_eq!(locks.holder(r), Some(T0));
    }

    #[test]
    fn held_lock_refuses_other_threads() {
        let mut locks = LockSet::default();
        let r = Reference::new(3);
        assert!(locks.acquire(r, T0));
        assert!(!locks.acquire(r, T1));
        locks.release(r);
        assert!(locks.acquire(r, T1));
    }

    #[test]
    fn releasing_an_unheld_lock_is_a_noop() {
        let mut locks = LockSet::default();
        locks.release(Reference::new(9));
        assert_eq!(locks.iter().count(), 0);
    }

    #[test]
    fn despawn_releases_everything_the_thread_held() {
        let mut locks = LockSet::default();
        assert!(locks.acquire(Reference::new(1), T0));
        assert!(locks.acquire(Reference::new(2), T0));
        assert!(locks.acquire(Reference::new(3), T1));
        locks.release_all(T0);
        assert_eq!(locks.iter().count(), 1);
        assert_eq!(locks.holder(Reference::new(3)), Some(T1));
    }
}
