use super::InvocationStatDimension;
use std::fmt;
use std::sync::{
    atomic::{AtomicI64, AtomicU32, Ordering},
    Arc,
};

/// `InvocationStat` counts the invocations and exceptions of one dimension.
/// The counters are only ever added to, by any amount of caller threads.
///
/// Windows are rolled forward without resetting the counters:
/// the measurement takes a `snapshot()` and subtracts it with `update()` afterwards,
/// calls that happen in between are simply attributed to the next window.
pub struct InvocationStat {
    dimension: Arc<InvocationStatDimension>,
    invoke_count: AtomicI64,
    exception_count: AtomicI64,
    /// `useless_cycle` counts the successive measurements which saw no calls.
    useless_cycle: AtomicU32,
}

/// `InvocationStatSnapshot` is an immutable copy of the counters of an `InvocationStat`,
/// which is the contribution of one measurement window.
#[derive(Debug, Clone)]
pub struct InvocationStatSnapshot {
    dimension: Arc<InvocationStatDimension>,
    invoke_count: i64,
    exception_count: i64,
}

impl InvocationStat {
    pub fn new(dimension: Arc<InvocationStatDimension>) -> Self {
        InvocationStat {
            dimension,
            invoke_count: AtomicI64::new(0),
            exception_count: AtomicI64::new(0),
            useless_cycle: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn dimension(&self) -> &Arc<InvocationStatDimension> {
        &self.dimension
    }

    /// `invoke` records one invocation and returns the new invoke count.
    #[inline]
    pub fn invoke(&self) -> i64 {
        self.invoke_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// `catch_exception` records one failed invocation.
    #[inline]
    pub fn catch_exception(&self) -> i64 {
        self.exception_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[inline]
    pub fn invoke_count(&self) -> i64 {
        self.invoke_count.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn exception_count(&self) -> i64 {
        self.exception_count.load(Ordering::SeqCst)
    }

    /// `exception_rate` is -1 when nothing has been invoked yet.
    pub fn exception_rate(&self) -> f64 {
        exception_rate(self.invoke_count(), self.exception_count())
    }

    #[inline]
    pub fn useless_cycle(&self) -> u32 {
        self.useless_cycle.load(Ordering::SeqCst)
    }

    /// `incr_useless_cycle` returns the new amount of useless cycles.
    #[inline]
    pub fn incr_useless_cycle(&self) -> u32 {
        self.useless_cycle.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[inline]
    pub fn reset_useless_cycle(&self) {
        self.useless_cycle.store(0, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> InvocationStatSnapshot {
        InvocationStatSnapshot {
            dimension: Arc::clone(&self.dimension),
            invoke_count: self.invoke_count(),
            exception_count: self.exception_count(),
        }
    }

    /// `update` subtracts a snapshot previously taken from this stat.
    pub fn update(&self, snapshot: &InvocationStatSnapshot) {
        self.invoke_count
            .fetch_sub(snapshot.invoke_count, Ordering::SeqCst);
        self.exception_count
            .fetch_sub(snapshot.exception_count, Ordering::SeqCst);
    }
}

impl fmt::Debug for InvocationStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationStat")
            .field("dimension", &self.dimension)
            .field("invoke_count", &self.invoke_count())
            .field("exception_count", &self.exception_count())
            .field("useless_cycle", &self.useless_cycle())
            .finish()
    }
}

impl InvocationStatSnapshot {
    #[inline]
    pub fn dimension(&self) -> &Arc<InvocationStatDimension> {
        &self.dimension
    }

    #[inline]
    pub fn invoke_count(&self) -> i64 {
        self.invoke_count
    }

    #[inline]
    pub fn exception_count(&self) -> i64 {
        self.exception_count
    }

    pub fn exception_rate(&self) -> f64 {
        exception_rate(self.invoke_count, self.exception_count)
    }
}

#[inline]
fn exception_rate(invoke_count: i64, exception_count: i64) -> f64 {
    if invoke_count <= 0 {
        return -1.0;
    }
    (exception_count as f64 / invoke_count as f64).clamp(0.0, 1.0)
}
