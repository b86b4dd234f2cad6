//! Named-event dispatch with one-shot listeners, listener scopes and a
//! wildcard channel.
//!
//! An [`EventHub`] maps event names to ordered listener lists. Triggering a
//! name runs its listeners in registration order, then the listeners on the
//! [`WILDCARD`] channel. Any listener can halt propagation, either by
//! returning [`Propagation::Stop`] (or `false`), or by calling
//! [`Signal::stop`].
//!
//! Dispatch iterates over a snapshot of the listener list taken when the
//! trigger starts. Removing a listener marks its record as removed, so a
//! listener taken out mid-dispatch never runs later in the same pass, and a
//! listener added mid-dispatch first runs on the next trigger.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

/// The reserved channel that observes every trigger on a hub.
pub const WILDCARD: &str = "all";

/// Handle identifying a registered listener. Closures have no identity, so
/// this is what [`EventHub::off_listener`] matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Identity of a listener owner. Everything registered under a scope can be
/// removed in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

/// Source of fresh scope identifiers.
static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);

impl ScopeId {
    /// Allocate a scope identifier that is unique for the process.
    pub fn new() -> Self {
        Self(NEXT_SCOPE.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

/// What a listener wants to happen after it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Keep running the remaining listeners.
    Continue,
    /// Halt the dispatch. The trigger reports `false`.
    Stop,
}

impl From<()> for Propagation {
    fn from(_: ()) -> Self {
        Self::Continue
    }
}

impl From<bool> for Propagation {
    fn from(proceed: bool) -> Self {
        if proceed { Self::Continue } else { Self::Stop }
    }
}

/// The view a listener gets of the event being dispatched.
pub struct Signal<'a, A> {
    /// The triggered event name. Wildcard listeners see the original name.
    name: &'a str,
    /// Event arguments.
    args: &'a A,
    /// Shared stop flag for the dispatch.
    stopped: &'a Cell<bool>,
}

impl<A> Signal<'_, A> {
    /// The name the event was triggered with.
    pub fn name(&self) -> &str {
        self.name
    }

    /// The event arguments.
    pub fn args(&self) -> &A {
        self.args
    }

    /// Halt propagation once this listener returns.
    pub fn stop(&self) {
        self.stopped.set(true);
    }

    /// Has propagation been halted for this dispatch?
    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}

/// Stored listener callback.
type Callback<A> = Rc<dyn Fn(&Signal<'_, A>) -> Propagation>;

/// Pin a closure to the higher-ranked listener signature.
fn constrain<A, F>(f: F) -> F
where
    F: Fn(&Signal<'_, A>) -> Propagation,
{
    f
}

/// A listener record.
struct Listener<A> {
    /// Listener handle.
    id: ListenerId,
    /// Owning scope, if registered with one.
    scope: Option<ScopeId>,
    /// Remove before the first invocation.
    once: bool,
    /// Set when the record leaves the table, so stale snapshots skip it.
    removed: Cell<bool>,
    /// The callback.
    callback: Callback<A>,
}

/// A table of named listener lists.
pub struct EventHub<A> {
    /// Listener lists by event name.
    channels: RefCell<HashMap<String, Vec<Rc<Listener<A>>>>>,
    /// Next listener id.
    next_id: Cell<u64>,
}

impl<A> Default for EventHub<A> {
    fn default() -> Self {
        Self {
            channels: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        }
    }
}

impl<A> fmt::Debug for EventHub<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.channels.borrow();
        let mut names: Vec<&String> = channels.keys().collect();
        names.sort();
        f.debug_struct("EventHub").field("channels", &names).finish()
    }
}

impl<A: 'static> EventHub<A> {
    /// Construct an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener for `name`.
    pub fn on<F, R>(&self, name: &str, callback: F) -> ListenerId
    where
        F: Fn(&Signal<'_, A>) -> R + 'static,
        R: Into<Propagation>,
    {
        self.register(name, None, false, callback)
    }

    /// Append a listener for `name` owned by `scope`.
    pub fn on_scoped<F, R>(&self, name: &str, scope: ScopeId, callback: F) -> ListenerId
    where
        F: Fn(&Signal<'_, A>) -> R + 'static,
        R: Into<Propagation>,
    {
        self.register(name, Some(scope), false, callback)
    }

    /// Append a listener that is removed the first time it fires.
    pub fn one<F, R>(&self, name: &str, callback: F) -> ListenerId
    where
        F: Fn(&Signal<'_, A>) -> R + 'static,
        R: Into<Propagation>,
    {
        self.register(name, None, true, callback)
    }

    /// Append a scoped listener that is removed the first time it fires.
    pub fn one_scoped<F, R>(&self, name: &str, scope: ScopeId, callback: F) -> ListenerId
    where
        F: Fn(&Signal<'_, A>) -> R + 'static,
        R: Into<Propagation>,
    {
        self.register(name, Some(scope), true, callback)
    }

    /// Store a listener record.
    fn register<F, R>(&self, name: &str, scope: Option<ScopeId>, once: bool, callback: F) -> ListenerId
    where
        F: Fn(&Signal<'_, A>) -> R + 'static,
        R: Into<Propagation>,
    {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let callback: Callback<A> = Rc::new(constrain(move |signal| callback(signal).into()));
        self.channels
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .push(Rc::new(Listener {
                id,
                scope,
                once,
                removed: Cell::new(false),
                callback,
            }));
        id
    }

    /// Remove every listener for `name`.
    pub fn off(&self, name: &str) -> &Self {
        let removed = self.channels.borrow_mut().remove(name);
        for listener in removed.into_iter().flatten() {
            listener.removed.set(true);
        }
        self
    }

    /// Remove one listener from `name`. Unknown ids are ignored.
    pub fn off_listener(&self, name: &str, id: ListenerId) -> &Self {
        self.remove_where(name, |l| l.id == id);
        self
    }

    /// Remove every listener on `name` registered under `scope`.
    pub fn off_scope(&self, name: &str, scope: ScopeId) -> &Self {
        self.remove_where(name, |l| l.scope == Some(scope));
        self
    }

    /// Remove every listener registered under `scope` on any channel.
    pub fn off_scope_all(&self, scope: ScopeId) -> &Self {
        let names: Vec<String> = self.channels.borrow().keys().cloned().collect();
        for name in names {
            self.remove_where(&name, |l| l.scope == Some(scope));
        }
        self
    }

    /// Number of live listeners on `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.channels.borrow().get(name).map_or(0, Vec::len)
    }

    /// Drop matching records from a channel, marking them removed.
    fn remove_where(&self, name: &str, matches: impl Fn(&Listener<A>) -> bool) -> usize {
        let mut channels = self.channels.borrow_mut();
        let Some(listeners) = channels.get_mut(name) else {
            return 0;
        };
        let before = listeners.len();
        listeners.retain(|l| {
            if matches(l) {
                l.removed.set(true);
                false
            } else {
                true
            }
        });
        let removed = before - listeners.len();
        if listeners.is_empty() {
            channels.remove(name);
        }
        removed
    }

    /// Run the listeners for `name`, then the wildcard listeners. Returns
    /// `false` if any listener halted propagation.
    pub fn trigger(&self, name: &str, args: &A) -> bool {
        let stopped = Cell::new(false);
        if !self.dispatch(name, name, args, &stopped) {
            return false;
        }
        if name == WILDCARD {
            return true;
        }
        self.dispatch(WILDCARD, name, args, &stopped)
    }

    /// Run one channel over a snapshot of its listeners.
    fn dispatch(&self, channel: &str, name: &str, args: &A, stopped: &Cell<bool>) -> bool {
        let snapshot = self.channels.borrow().get(channel).cloned();
        let Some(snapshot) = snapshot else {
            return true;
        };
        for listener in snapshot {
            if listener.removed.get() {
                continue;
            }
            if listener.once {
                self.remove_where(channel, |l| l.id == listener.id);
            }
            let signal = Signal {
                name,
                args,
                stopped,
            };
            let flow = (listener.callback)(&signal);
            if flow == Propagation::Stop || stopped.get() {
                stopped.set(true);
                return false;
            }
        }
        true
    }
}

/// Capability of components that carry their own [`EventHub`].
pub trait Observable<A: 'static> {
    /// The embedded hub.
    fn events(&self) -> &EventHub<A>;

    /// Append a listener for `name`.
    fn on<F, R>(&self, name: &str, callback: F) -> ListenerId
    where
        F: Fn(&Signal<'_, A>) -> R + 'static,
        R: Into<Propagation>,
    {
        self.events().on(name, callback)
    }

    /// Append a one-shot listener for `name`.
    fn one<F, R>(&self, name: &str, callback: F) -> ListenerId
    where
        F: Fn(&Signal<'_, A>) -> R + 'static,
        R: Into<Propagation>,
    {
        self.events().one(name, callback)
    }

    /// Remove a listener.
    fn off_listener(&self, name: &str, id: ListenerId) {
        self.events().off_listener(name, id);
    }

    /// Trigger `name` on the embedded hub.
    fn trigger(&self, name: &str, args: &A) -> bool {
        self.events().trigger(name, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A hub plus a shared log of which listener ran.
    fn logged() -> (EventHub<u32>, Rc<RefCell<Vec<String>>>) {
        (EventHub::new(), Rc::new(RefCell::new(Vec::new())))
    }

    #[test]
    fn order_and_wildcard() {
        let (hub, log) = logged();
        for tag in ["a", "b"] {
            let log = log.clone();
            hub.on("ping", move |s: &Signal<'_, u32>| {
                log.borrow_mut().push(format!("{tag}:{}", s.args()));
            });
        }
        let l = log.clone();
        hub.on(WILDCARD, move |s: &Signal<'_, u32>| {
            l.borrow_mut().push(format!("all:{}", s.name()));
        });
        assert!(hub.trigger("ping", &7));
        assert_eq!(*log.borrow(), vec!["a:7", "b:7", "all:ping"]);
        assert!(hub.trigger("unknown", &0));
        assert_eq!(log.borrow().last().map(String::as_str), Some("all:unknown"));
    }

    #[test]
    fn stop_by_return_and_by_signal() {
        let (hub, log) = logged();
        hub.on("x", |_: &Signal<'_, u32>| false);
        let l = log.clone();
        hub.on("x", move |_: &Signal<'_, u32>| l.borrow_mut().push("late".into()));
        let l = log.clone();
        hub.on(WILDCARD, move |_: &Signal<'_, u32>| l.borrow_mut().push("all".into()));
        assert!(!hub.trigger("x", &0));

        hub.on("y", |s: &Signal<'_, u32>| s.stop());
        let l = log.clone();
        hub.on("y", move |_: &Signal<'_, u32>| l.borrow_mut().push("late".into()));
        assert!(!hub.trigger("y", &0));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn once_fires_once() {
        let (hub, log) = logged();
        let l = log.clone();
        hub.one("x", move |_: &Signal<'_, u32>| l.borrow_mut().push("once".into()));
        hub.trigger("x", &0);
        hub.trigger("x", &0);
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(hub.listener_count("x"), 0);
    }

    #[test]
    fn removal_during_dispatch() {
        let hub = Rc::new(EventHub::<u32>::new());
        let log = Rc::new(RefCell::new(Vec::<&str>::new()));
        let victim = Rc::new(Cell::new(None));

        let (h, v, l) = (Rc::downgrade(&hub), victim.clone(), log.clone());
        hub.on("x", move |_: &Signal<'_, u32>| {
            l.borrow_mut().push("first");
            if let (Some(hub), Some(id)) = (h.upgrade(), v.get()) {
                hub.off_listener("x", id);
                let l = l.clone();
                hub.on("x", move |_: &Signal<'_, u32>| l.borrow_mut().push("added"));
            }
        });
        let l = log.clone();
        victim.set(Some(
            hub.on("x", move |_: &Signal<'_, u32>| l.borrow_mut().push("victim")),
        ));
        let l = log.clone();
        hub.on("x", move |_: &Signal<'_, u32>| l.borrow_mut().push("last"));

        hub.trigger("x", &0);
        assert_eq!(*log.borrow(), vec!["first", "last"]);
    }

    #[test]
    fn scopes() {
        let (hub, log) = logged();
        let scope = ScopeId::new();
        for name in ["a", "b"] {
            let l = log.clone();
            hub.on_scoped(name, scope, move |_: &Signal<'_, u32>| {
                l.borrow_mut().push("scoped".into())
            });
        }
        let l = log.clone();
        hub.on("a", move |_: &Signal<'_, u32>| l.borrow_mut().push("free".into()));

        hub.off_scope("a", scope);
        hub.trigger("a", &0);
        assert_eq!(*log.borrow(), vec!["free"]);

        hub.off_scope_all(scope);
        hub.trigger("b", &0);
        assert_eq!(log.borrow().len(), 1);

        hub.off("a");
        assert_eq!(hub.listener_count("a"), 0);
    }
}
