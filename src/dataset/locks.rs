use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One mutex per corpus file, so concurrent writers to the same path run
/// their open-write-close sequence one at a time.
///
/// Entries live only while some caller holds the lock.
#[derive(Debug, Default)]
pub(crate) struct WriteLocks {
    inner: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl WriteLocks {
    pub fn for_path(&self, path: &Path) -> Arc<Mutex<()>> {
        let key = lock_key(path);
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        map.entry(key).or_default().clone()
    }
}

/// Canonical parent directory plus file name, so `a/../a/x.csv` and
/// `a/x.csv` share a lock. The file itself may not exist yet.
fn lock_key(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent)
            .map(|dir| dir.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// A poisoned lock only means another writer panicked mid-call; the file
/// itself is still the source of truth, so keep going.
pub(crate) fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn len(locks: &WriteLocks) -> usize {
        locks.inner.lock().unwrap().len()
    }

    #[test]
    fn same_path_shares_one_lock() {
        let locks = WriteLocks::default();
        let a = locks.for_path(Path::new("/tmp/a.csv"));
        let b = locks.for_path(Path::new("/tmp/a.csv"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_paths_get_different_locks() {
        let locks = WriteLocks::default();
        let a = locks.for_path(Path::new("/tmp/a.csv"));
        let b = locks.for_path(Path::new("/tmp/b.csv"));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn equivalent_spellings_share_one_lock() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("output");
        fs::create_dir(&dir).unwrap();

        let locks = WriteLocks::default();
        let plain = locks.for_path(&dir.join("x.csv"));
        let dotted = locks.for_path(&dir.join("..").join("output").join("x.csv"));
        assert!(Arc::ptr_eq(&plain, &dotted));
    }

    #[test]
    fn released_locks_are_dropped() {
        let locks = WriteLocks::default();
        for i in 0..5 {
            let lock = locks.for_path(Path::new(&format!("/tmp/file{i}.csv")));
            drop(acquire(&lock));
        }
        let held = locks.for_path(Path::new("/tmp/held.csv"));
        assert_eq!(len(&locks), 1);

        let again = locks.for_path(Path::new("/tmp/held.csv"));
        assert!(Arc::ptr_eq(&held, &again));
        assert_eq!(len(&locks), 1);
    }
}
