//! Single-shot asynchronous results.
//!
//! A [`Deferred`] starts out pending and settles exactly once, either
//! resolved or rejected. Continuations registered with [`Deferred::then`] run
//! synchronously at settlement, in registration order; registering on an
//! already-settled deferred runs the continuation immediately.
//!
//! A [`DeferredSet`] records the deferreds created through it so that an
//! owner - typically a scene - can reject all of its outstanding work at once
//! when that work has become stale.

use std::{
    cell::{Cell, RefCell},
    fmt, mem,
    rc::Rc,
    time::Duration,
};

use crate::poll::Scheduler;

/// Settlement state of a deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Not settled yet.
    Pending,
    /// Settled successfully.
    Resolved,
    /// Settled unsuccessfully, including cancellation.
    Rejected,
}

/// The settled result of a deferred. Both arms may carry a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation resolved.
    Resolved(Option<T>),
    /// The operation was rejected or cancelled.
    Rejected(Option<T>),
}

impl<T> Outcome<T> {
    /// Did the operation resolve?
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// The settlement value, if one was given.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Resolved(v) | Self::Rejected(v) => v.as_ref(),
        }
    }

    /// The state this outcome represents.
    pub fn state(&self) -> State {
        match self {
            Self::Resolved(_) => State::Resolved,
            Self::Rejected(_) => State::Rejected,
        }
    }
}

/// A continuation waiting for settlement.
type Continuation<T> = Box<dyn FnOnce(&Outcome<T>)>;

/// Shared deferred state.
struct Inner<T> {
    /// Set exactly once.
    outcome: Option<Rc<Outcome<T>>>,
    /// Continuations registered while pending.
    continuations: Vec<Continuation<T>>,
}

/// A single-shot asynchronous result. Clones share the same state.
pub struct Deferred<T> {
    /// Shared state.
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Deferred")
            .field("outcome", &inner.outcome)
            .field("continuations", &inner.continuations.len())
            .finish()
    }
}

impl<T: 'static> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Deferred<T> {
    /// Construct a pending deferred.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                outcome: None,
                continuations: Vec::new(),
            })),
        }
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.inner
            .borrow()
            .outcome
            .as_ref()
            .map_or(State::Pending, |o| o.state())
    }

    /// Is the deferred still unsettled?
    pub fn is_pending(&self) -> bool {
        self.state() == State::Pending
    }

    /// Resolve with an optional value. Returns `false`, and does nothing, if
    /// the deferred has already settled.
    pub fn resolve(&self, value: Option<T>) -> bool {
        self.settle(Outcome::Resolved(value))
    }

    /// Reject with an optional value. Returns `false`, and does nothing, if
    /// the deferred has already settled.
    pub fn reject(&self, value: Option<T>) -> bool {
        self.settle(Outcome::Rejected(value))
    }

    /// Store the outcome and run the waiting continuations.
    fn settle(&self, outcome: Outcome<T>) -> bool {
        let (outcome, continuations) = {
            let mut inner = self.inner.borrow_mut();
            if inner.outcome.is_some() {
                return false;
            }
            let outcome = Rc::new(outcome);
            inner.outcome = Some(outcome.clone());
            (outcome, mem::take(&mut inner.continuations))
        };
        for continuation in continuations {
            continuation(&outcome);
        }
        true
    }

    /// Register a continuation. If the deferred has already settled, the
    /// continuation runs before this call returns.
    pub fn then(&self, continuation: impl FnOnce(&Outcome<T>) + 'static) -> &Self {
        let settled = self.inner.borrow().outcome.clone();
        match settled {
            Some(outcome) => continuation(&outcome),
            None => self
                .inner
                .borrow_mut()
                .continuations
                .push(Box::new(continuation)),
        }
        self
    }

    /// A copy of the outcome, if settled.
    pub fn outcome(&self) -> Option<Outcome<T>>
    where
        T: Clone,
    {
        self.inner.borrow().outcome.as_deref().cloned()
    }
}

/// Type-erased view of a deferred, used by combinators and [`DeferredSet`]
/// to handle deferreds of differing value types together.
pub trait Settle {
    /// Current state.
    fn settle_state(&self) -> State;

    /// Run `f` with `true` on resolution or `false` on rejection.
    fn on_settled(&self, f: Box<dyn FnOnce(bool)>);

    /// Reject without a value. Returns `false` if already settled.
    fn cancel(&self) -> bool;
}

impl<T: 'static> Settle for Deferred<T> {
    fn settle_state(&self) -> State {
        self.state()
    }

    fn on_settled(&self, f: Box<dyn FnOnce(bool)>) {
        self.then(move |outcome| f(outcome.is_resolved()));
    }

    fn cancel(&self) -> bool {
        self.reject(None)
    }
}

/// Create a deferred and hand it to `f` before returning it, so the caller
/// can wire up whatever will eventually settle it.
pub fn when<T: 'static>(f: impl FnOnce(&Deferred<T>)) -> Deferred<T> {
    let deferred = Deferred::new();
    f(&deferred);
    deferred
}

/// Aggregate `ops` into one deferred that settles when all of them have
/// settled. It resolves with the number of resolved operations if every one
/// resolved, and rejects with that number otherwise. Operations that have
/// already settled count immediately. With no operations it resolves with 0.
pub fn all(ops: &[&dyn Settle]) -> Deferred<usize> {
    let total = ops.len();
    let aggregate = Deferred::new();
    if total == 0 {
        aggregate.resolve(Some(0));
        return aggregate;
    }
    let pending = Rc::new(Cell::new(total));
    let resolved = Rc::new(Cell::new(0));
    for op in ops {
        let (pending, resolved, aggregate) = (pending.clone(), resolved.clone(), aggregate.clone());
        op.on_settled(Box::new(move |ok| {
            pending.set(pending.get() - 1);
            if ok {
                resolved.set(resolved.get() + 1);
            }
            if pending.get() == 0 {
                let count = resolved.get();
                if count == total {
                    aggregate.resolve(Some(count));
                } else {
                    aggregate.reject(Some(count));
                }
            }
        }));
    }
    aggregate
}

/// A deferred that resolves with `ms` once `ms` milliseconds have elapsed on
/// the scheduler clock.
pub fn timeout(scheduler: &Scheduler, ms: u64) -> Deferred<u64> {
    let deferred = Deferred::new();
    let d = deferred.clone();
    scheduler.schedule(Duration::from_millis(ms), move || {
        d.resolve(Some(ms));
    });
    deferred
}

/// Run `f` on the next scheduler tick, then resolve. This moves work out of
/// the current call stack without a delay.
pub fn lag(scheduler: &Scheduler, f: impl FnOnce() + 'static) -> Deferred<()> {
    let deferred = Deferred::new();
    let d = deferred.clone();
    scheduler.next_tick(move || {
        f();
        d.resolve(None);
    });
    deferred
}

/// A record of deferreds created on behalf of one owner.
///
/// Everything made through the set's `when`, `all`, `timeout` and `lag`, or
/// passed to [`DeferredSet::track`], can be rejected in bulk with
/// [`DeferredSet::reject_all`].
#[derive(Default)]
pub struct DeferredSet {
    /// Recorded operations. Settled entries are pruned lazily.
    ops: RefCell<Vec<Rc<dyn Settle>>>,
}

impl fmt::Debug for DeferredSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredSet")
            .field("pending", &self.len())
            .finish()
    }
}

impl DeferredSet {
    /// Construct an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deferred created elsewhere.
    pub fn track<T: 'static>(&self, deferred: Deferred<T>) -> Deferred<T> {
        let mut ops = self.ops.borrow_mut();
        ops.retain(|op| op.settle_state() == State::Pending);
        ops.push(Rc::new(deferred.clone()));
        deferred
    }

    /// Recorded counterpart of [`when`].
    pub fn when<T: 'static>(&self, f: impl FnOnce(&Deferred<T>)) -> Deferred<T> {
        let deferred = self.track(Deferred::new());
        f(&deferred);
        deferred
    }

    /// Recorded counterpart of [`all`].
    pub fn all(&self, ops: &[&dyn Settle]) -> Deferred<usize> {
        self.track(all(ops))
    }

    /// Recorded counterpart of [`timeout`].
    pub fn timeout(&self, scheduler: &Scheduler, ms: u64) -> Deferred<u64> {
        self.track(timeout(scheduler, ms))
    }

    /// Recorded counterpart of [`lag`].
    pub fn lag(&self, scheduler: &Scheduler, f: impl FnOnce() + 'static) -> Deferred<()> {
        self.track(lag(scheduler, f))
    }

    /// Reject every recorded operation that is still pending, then forget
    /// them all. Settled operations are left as they are. Returns the number
    /// of operations rejected.
    pub fn reject_all(&self) -> usize {
        let ops = mem::take(&mut *self.ops.borrow_mut());
        ops.iter().filter(|op| op.cancel()).count()
    }

    /// Number of recorded operations still pending.
    pub fn len(&self) -> usize {
        self.ops
            .borrow()
            .iter()
            .filter(|op| op.settle_state() == State::Pending)
            .count()
    }

    /// Is nothing recorded still pending?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Capability of components that own a [`DeferredSet`].
pub trait Cancellable {
    /// The owned set.
    fn deferreds(&self) -> &DeferredSet;

    /// Reject all of this owner's outstanding operations.
    fn reject_all(&self) -> usize {
        self.deferreds().reject_all()
    }
}

impl Cancellable for DeferredSet {
    fn deferreds(&self) -> &DeferredSet {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Record every outcome a deferred settles with.
    fn observe<T: Clone + 'static>(d: &Deferred<T>) -> Rc<RefCell<Vec<Outcome<T>>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        d.then(move |o| s.borrow_mut().push(o.clone()));
        seen
    }

    #[test]
    fn settles_once() {
        let d = Deferred::new();
        let seen = observe(&d);
        assert!(d.is_pending());
        assert!(d.resolve(Some(1)));
        assert!(!d.resolve(Some(2)));
        assert!(!d.reject(Some(3)));
        assert_eq!(d.state(), State::Resolved);
        assert_eq!(*seen.borrow(), vec![Outcome::Resolved(Some(1))]);
        assert_eq!(d.outcome(), Some(Outcome::Resolved(Some(1))));
    }

    #[test]
    fn then_after_settlement_fires_immediately() {
        let d: Deferred<&str> = Deferred::new();
        d.reject(Some("gone"));
        let seen = observe(&d);
        assert_eq!(*seen.borrow(), vec![Outcome::Rejected(Some("gone"))]);
    }

    #[test]
    fn continuation_can_chain_on_same_deferred() {
        let d: Deferred<u8> = Deferred::new();
        let hits = Rc::new(Cell::new(0));
        let (d2, h) = (d.clone(), hits.clone());
        d.then(move |_| {
            let h = h.clone();
            d2.then(move |_| h.set(h.get() + 1));
        });
        d.resolve(None);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn all_counts() {
        let (a, b) = (Deferred::<u8>::new(), Deferred::<&str>::new());
        let agg = all(&[&a, &b]);
        let seen = observe(&agg);
        b.resolve(None);
        assert!(agg.is_pending());
        a.resolve(None);
        assert_eq!(*seen.borrow(), vec![Outcome::Resolved(Some(2))]);

        let (a, b) = (Deferred::<u8>::new(), Deferred::<u8>::new());
        a.reject(None);
        let agg = all(&[&a, &b]);
        b.resolve(None);
        assert_eq!(agg.outcome(), Some(Outcome::Rejected(Some(1))));

        assert_eq!(all(&[]).outcome(), Some(Outcome::Resolved(Some(0))));
    }

    #[test]
    fn timers() {
        let s = Scheduler::new();
        let t = timeout(&s, 25);
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        let l = lag(&s, move || r.set(true));
        assert!(!ran.get());
        s.run_ready();
        assert!(ran.get());
        assert_eq!(l.state(), State::Resolved);
        assert!(t.is_pending());
        s.advance(Duration::from_millis(25));
        assert_eq!(t.outcome(), Some(Outcome::Resolved(Some(25))));
    }

    #[test]
    fn reject_all_skips_settled() {
        let set = DeferredSet::new();
        let s = Scheduler::new();
        let done = set.when(|d: &Deferred<u8>| {
            d.resolve(Some(1));
        });
        let open = set.timeout(&s, 100);
        let seen = observe(&open);
        assert_eq!(set.len(), 1);
        assert_eq!(set.reject_all(), 1);
        assert_eq!(done.state(), State::Resolved);
        assert_eq!(*seen.borrow(), vec![Outcome::Rejected(None)]);
        assert!(set.is_empty());

        s.advance(Duration::from_millis(200));
        assert_eq!(open.outcome(), Some(Outcome::Rejected(None)));
    }
}
