//! Lock Contention
//!
//! A fixed worker pool can run every unit while contending for one shared
//! synchronization primitive. The primitive belongs to the trial's scope: it is
//! created at setup, wraps the workload, and goes away at teardown.
//!
//! | lock | what each invocation does |
//! |---|---|
//! | `mutex` | holds one exclusive lock for the whole unit |
//! | `rwlock` | every tenth unit (`id % 10 == 0`) writes, the rest read a fixed light unit |
//! | `semaphore-N` | holds one of `N` permits for the whole unit |
//! | `atomic` | bumps one shared counter, then runs unguarded |

use crate::config::ConfigError;
use crate::unit::{Output, UnitFailure, Workload, WorkloadKind, WorkloadUnit};
use futures::executor::block_on;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::Semaphore;

/// Units with `id % WRITE_EVERY == 0` take the write side of a read-write lock
pub const WRITE_EVERY: u64 = 10;

/// What readers of a read-write lock run while holding the shared side
pub const READ_UNIT: WorkloadUnit = WorkloadUnit {
    id: 1,
    kind: WorkloadKind::Compute,
};

/// Shared primitive every unit of a trial contends for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum LockKind {
    /// One exclusive lock
    Mutex,
    /// Shared reads, exclusive writes for every tenth unit
    RwLock,
    /// Counting semaphore with this many permits
    Semaphore(usize),
    /// One shared atomic counter, no mutual exclusion
    Atomic,
}

impl LockKind {
    /// Resolve a configured lock name, expanding a bare `semaphore` over `permits`
    pub fn expand(name: &str, permits: &[usize]) -> Result<Vec<LockKind>, ConfigError> {
        if name.trim().eq_ignore_ascii_case("semaphore") {
            return permits
                .iter()
                .map(|&permits| LockKind::Semaphore(permits).validated())
                .collect();
        }
        Ok(vec![name.parse::<LockKind>()?.validated()?])
    }

    /// Reject a semaphore without permits
    pub fn validated(self) -> Result<Self, ConfigError> {
        match self {
            LockKind::Semaphore(0) => Err(ConfigError::ZeroPermits),
            lock => Ok(lock),
        }
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Mutex => f.write_str("mutex"),
            LockKind::RwLock => f.write_str("rwlock"),
            LockKind::Semaphore(permits) => write!(f, "semaphore-{permits}"),
            LockKind::Atomic => f.write_str("atomic"),
        }
    }
}

impl FromStr for LockKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        match name.as_str() {
            "mutex" | "sync" | "synchronized" | "reentrant" => Ok(LockKind::Mutex),
            "rwlock" | "read-write" => Ok(LockKind::RwLock),
            "atomic" => Ok(LockKind::Atomic),
            _ => name
                .strip_prefix("semaphore-")
                .and_then(|permits| permits.parse().ok())
                .map(LockKind::Semaphore)
                .ok_or_else(|| ConfigError::UnknownLock(s.to_string())),
        }
    }
}

impl From<LockKind> for String {
    fn from(lock: LockKind) -> Self {
        lock.to_string()
    }
}

impl TryFrom<String> for LockKind {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse::<LockKind>()?.validated()
    }
}

#[derive(Debug)]
enum SharedLock {
    Mutex(Mutex<()>),
    RwLock(RwLock<()>),
    Semaphore(Semaphore),
    Atomic(AtomicU64),
}

/// Workload whose every invocation contends for one scope-owned lock
pub(crate) struct LockedWorkload {
    inner: Arc<dyn Workload>,
    lock: SharedLock,
}

impl LockedWorkload {
    pub(crate) fn new(kind: LockKind, inner: Arc<dyn Workload>) -> Self {
        let lock = match kind {
            LockKind::Mutex => SharedLock::Mutex(Mutex::new(())),
            LockKind::RwLock => SharedLock::RwLock(RwLock::new(())),
            LockKind::Semaphore(permits) => SharedLock::Semaphore(Semaphore::new(permits)),
            LockKind::Atomic => SharedLock::Atomic(AtomicU64::new(0)),
        };
        Self { inner, lock }
    }

    /// Value of the shared counter (atomic locks only)
    #[cfg(test)]
    fn counter(&self) -> u64 {
        match &self.lock {
            SharedLock::Atomic(counter) => counter.load(Ordering::SeqCst),
            _ => 0,
        }
    }
}

impl Workload for LockedWorkload {
    fn invoke(
        &self,
        unit: &WorkloadUnit,
        upstream: Option<&Output>,
    ) -> Result<Output, UnitFailure> {
        match &self.lock {
            SharedLock::Mutex(lock) => {
                let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);
                self.inner.invoke(unit, upstream)
            }
            SharedLock::RwLock(lock) if unit.id % WRITE_EVERY == 0 => {
                let _held = lock.write().unwrap_or_else(PoisonError::into_inner);
                self.inner.invoke(unit, upstream)
            }
            SharedLock::RwLock(lock) => {
                let _held = lock.read().unwrap_or_else(PoisonError::into_inner);
                self.inner.invoke(&READ_UNIT, None)
            }
            SharedLock::Semaphore(permits) => {
                let _permit = block_on(permits.acquire())
                    .map_err(|e| UnitFailure::new(unit, format!("semaphore closed: {e}")))?;
                self.inner.invoke(unit, upstream)
            }
            SharedLock::Atomic(counter) => {
                counter.fetch_add(1, Ordering::SeqCst);
                self.inner.invoke(unit, upstream)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::Recorder;
    use std::thread;
    use std::time::Duration;

    fn slow_echo(unit: &WorkloadUnit, _: Option<&Output>) -> Result<Output, UnitFailure> {
        thread::sleep(Duration::from_millis(5));
        Ok(Output::Number(unit.id as i64))
    }

    /// Invoke `units` from one thread each and collect the values in order
    fn invoke_concurrently(workload: &LockedWorkload, units: Vec<WorkloadUnit>) -> Vec<Output> {
        thread::scope(|s| {
            let handles: Vec<_> = units
                .iter()
                .map(|unit| s.spawn(move || workload.invoke(unit, None).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn test_lock_names() {
        assert_eq!("mutex".parse::<LockKind>().unwrap(), LockKind::Mutex);
        assert_eq!("Reentrant".parse::<LockKind>().unwrap(), LockKind::Mutex);
        assert_eq!("rwlock".parse::<LockKind>().unwrap(), LockKind::RwLock);
        assert_eq!("semaphore-4".parse::<LockKind>().unwrap(), LockKind::Semaphore(4));
        assert_eq!(LockKind::Semaphore(8).to_string(), "semaphore-8");
        assert_eq!(
            "spinlock".parse::<LockKind>().unwrap_err(),
            ConfigError::UnknownLock("spinlock".to_string())
        );
    }

    #[test]
    fn test_expand_semaphore_over_permits() {
        assert_eq!(
            LockKind::expand("semaphore", &[1, 4]).unwrap(),
            vec![LockKind::Semaphore(1), LockKind::Semaphore(4)]
        );
        assert_eq!(LockKind::expand("atomic", &[1, 4]).unwrap(), vec![LockKind::Atomic]);
        assert_eq!(
            LockKind::expand("semaphore", &[0]).unwrap_err(),
            ConfigError::ZeroPermits
        );
        assert_eq!(
            "semaphore-0".parse::<LockKind>().unwrap().validated(),
            Err(ConfigError::ZeroPermits)
        );
    }

    #[test]
    fn test_mutex_serializes_units() {
        let recorder = Arc::new(Recorder::new(slow_echo));
        let locked = LockedWorkload::new(LockKind::Mutex, recorder.clone());

        let values = invoke_concurrently(&locked, WorkloadUnit::batch(WorkloadKind::Compute, 6));
        assert_eq!(values, (0..6).map(Output::Number).collect::<Vec<_>>());
        assert_eq!(recorder.peak(), 1);
        assert!(!recorder.any_overlap());
    }

    #[test]
    fn test_semaphore_caps_holders() {
        let recorder = Arc::new(Recorder::new(slow_echo));
        let locked = LockedWorkload::new(LockKind::Semaphore(2), recorder.clone());

        invoke_concurrently(&locked, WorkloadUnit::batch(WorkloadKind::Compute, 8));
        assert_eq!(recorder.invocations(), 8);
        assert!(recorder.peak() <= 2, "peak {}", recorder.peak());
    }

    #[test]
    fn test_rwlock_reads_run_fixed_unit() {
        let recorder = Arc::new(Recorder::new(slow_echo));
        let locked = LockedWorkload::new(LockKind::RwLock, recorder.clone());

        let values = invoke_concurrently(&locked, WorkloadUnit::batch(WorkloadKind::Network, 12));
        assert_eq!(values[0], Output::Number(0));
        assert_eq!(values[10], Output::Number(10));
        assert!(values[1..10].iter().all(|v| *v == Output::Number(1)));
        assert_eq!(values[11], Output::Number(1));

        // Writers never share the lock with anyone.
        let spans = recorder.spans();
        let writes: Vec<_> = spans.iter().filter(|s| s.id % WRITE_EVERY == 0).collect();
        assert_eq!(writes.len(), 2);
        for write in writes {
            assert!(
                spans
                    .iter()
                    .filter(|other| other.start != write.start)
                    .all(|other| !write.overlaps(other))
            );
        }
    }

    #[test]
    fn test_atomic_counts_every_unit() {
        let recorder = Arc::new(Recorder::new(slow_echo));
        let locked = LockedWorkload::new(LockKind::Atomic, recorder.clone());

        invoke_concurrently(&locked, WorkloadUnit::batch(WorkloadKind::Compute, 5));
        assert_eq!(locked.counter(), 5);
        assert_eq!(recorder.invocations(), 5);
    }
}
