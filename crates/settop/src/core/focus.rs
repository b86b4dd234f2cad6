use std::{cell::RefCell, fmt, rc::Rc};

use tracing::{debug, warn};

use crate::{
    event::{EventHub, ListenerId, Observable, Propagation, Signal},
    id::ElementId,
    key::{BEFORE_KEY, KeyDispatcher, KeyEvent, RemoteKey},
    tree::{Surface, Target},
};

/// Cancellable event triggered before focus moves. Sees the old state.
pub const BEFORE_FOCUS: &str = "beforefocus";
/// Triggered after focus has moved. Sees the new state.
pub const FOCUS: &str = "focus";
/// Triggered when an element loses focus, after its marker is removed.
pub const BLUR: &str = "blur";

/// Arguments for focus events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusChange {
    /// The element gaining focus, or for `blur`, the element losing it.
    pub target: ElementId,
    /// The element focused when the change began, if any.
    pub previous: Option<ElementId>,
}

/// Focus bookkeeping.
#[derive(Debug, Default)]
struct FocusState {
    /// The focused element.
    current: Option<ElementId>,
    /// The element focused before the current one.
    previous: Option<ElementId>,
    /// Incremented on every focus change.
    focus_gen: u64,
}

/// Shared manager state.
struct Inner {
    /// The element tree the manager marks.
    surface: Rc<RefCell<dyn Surface>>,
    /// Focus bookkeeping.
    state: RefCell<FocusState>,
    /// Focus events.
    events: EventHub<FocusChange>,
}

/// The single owner of focus for an application.
///
/// At most one element is focused at a time. Moving focus runs a cancellable
/// `beforefocus`, blurs the old element, marks the new one, and finally
/// triggers `focus`. Handles are cheap to clone and share state.
#[derive(Clone)]
pub struct FocusManager {
    /// Shared state.
    inner: Rc<Inner>,
}

impl fmt::Debug for FocusManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusManager")
            .field("state", &self.inner.state.borrow())
            .finish()
    }
}

impl Observable<FocusChange> for FocusManager {
    fn events(&self) -> &EventHub<FocusChange> {
        &self.inner.events
    }
}

impl FocusManager {
    /// Construct a manager over a surface. Nothing is focused initially.
    pub fn new(surface: Rc<RefCell<dyn Surface>>) -> Self {
        Self {
            inner: Rc::new(Inner {
                surface,
                state: RefCell::new(FocusState::default()),
                events: EventHub::new(),
            }),
        }
    }

    /// The focused element.
    pub fn focused(&self) -> Option<ElementId> {
        self.inner.state.borrow().current
    }

    /// The element focused before the current one.
    pub fn previous(&self) -> Option<ElementId> {
        self.inner.state.borrow().previous
    }

    /// A counter that changes whenever focus moves.
    pub fn focus_gen(&self) -> u64 {
        self.inner.state.borrow().focus_gen
    }

    /// Move focus to `target`. Returns `false` if the target resolves to
    /// nothing or a `beforefocus` listener cancels the move. Focusing the
    /// element that already holds focus succeeds without triggering events.
    pub fn to(&self, target: impl Into<Target>) -> bool {
        let target = target.into();
        let resolved = self.inner.surface.borrow().resolve(&target);
        let Some(el) = resolved else {
            warn!("focus target {target:?} resolved to nothing");
            return false;
        };
        let current = self.focused();
        if current == Some(el) {
            return true;
        }
        let change = FocusChange {
            target: el,
            previous: current,
        };
        if !self.inner.events.trigger(BEFORE_FOCUS, &change) {
            debug!("focus move to {el:?} cancelled");
            return false;
        }
        if let Some(old) = self.focused()
            && old != el
        {
            self.blur(old);
        }
        {
            let mut surface = self.inner.surface.borrow_mut();
            surface.set_focus_marker(el, true);
            if surface.is_text_input(el) {
                surface.request_input_focus(el);
            }
        }
        {
            let mut state = self.inner.state.borrow_mut();
            if let Some(old) = state.current {
                state.previous = Some(old);
            }
            state.current = Some(el);
            state.focus_gen = state.focus_gen.wrapping_add(1);
        }
        debug!("focus {current:?} -> {el:?}");
        self.inner.events.trigger(FOCUS, &change);
        true
    }

    /// Remove focus from `el`. If `el` was the focused element, nothing is
    /// focused afterwards and `el` becomes the previous element.
    pub fn blur(&self, el: ElementId) {
        self.inner.surface.borrow_mut().set_focus_marker(el, false);
        {
            let mut state = self.inner.state.borrow_mut();
            if state.current == Some(el) {
                state.current = None;
                state.previous = Some(el);
                state.focus_gen = state.focus_gen.wrapping_add(1);
            }
        }
        self.inner.events.trigger(
            BLUR,
            &FocusChange {
                target: el,
                previous: None,
            },
        );
        let mut surface = self.inner.surface.borrow_mut();
        if surface.is_text_input(el) {
            surface.release_input_focus(el);
        }
    }

    /// Blur the focused element. Returns `false` if nothing was focused.
    pub fn blur_current(&self) -> bool {
        match self.focused() {
            Some(el) => {
                self.blur(el);
                true
            }
            None => false,
        }
    }

    /// Return focus to the previously focused element.
    pub fn prev(&self) -> bool {
        match self.previous() {
            Some(el) => self.to(el),
            None => false,
        }
    }

    /// Is the focused element `container` or inside it?
    pub fn is_in(&self, container: ElementId) -> bool {
        self.focused()
            .is_some_and(|el| self.inner.surface.borrow().contains(container, el))
    }

    /// Intercept raw keys on `dispatcher` while a text input holds focus.
    pub fn attach(&self, dispatcher: &KeyDispatcher) -> ListenerId {
        let fm = self.clone();
        dispatcher.on(BEFORE_KEY, move |s: &Signal<'_, KeyEvent>| fm.intercept(s.args()))
    }

    /// Text-entry emulation for remote controls. A digit typed into a field
    /// that has no device keyboard is appended to its value and consumed.
    /// Other recognized keys, digits on keyboard-driven fields included, keep
    /// propagating with the platform default suppressed.
    fn intercept(&self, event: &KeyEvent) -> Propagation {
        let Some(el) = self.focused() else {
            return Propagation::Continue;
        };
        let (is_input, keyboard) = {
            let surface = self.inner.surface.borrow();
            (surface.is_text_input(el), surface.is_keyboard_driven(el))
        };
        if !is_input {
            return Propagation::Continue;
        }
        match event.key() {
            Some(RemoteKey::Digit(d)) if !keyboard => {
                self.inner
                    .surface
                    .borrow_mut()
                    .append_char(el, char::from(b'0' + d));
                event.prevent_default();
                Propagation::Stop
            }
            Some(RemoteKey::Char(_)) | None => Propagation::Continue,
            Some(_) => {
                event.prevent_default();
                Propagation::Continue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Result, event::WILDCARD, key::KeyMap, tree::Tree};

    /// A tree with two buttons and a numeric input, and a manager over it.
    fn setup() -> Result<(Rc<RefCell<Tree>>, FocusManager, [ElementId; 3])> {
        let mut t = Tree::new();
        let root = t.root();
        let a = t.add_button(root, "a", "A")?;
        let b = t.add_button(root, "b", "B")?;
        let pin = t.add_input(root, "pin", false)?;
        let tree = Rc::new(RefCell::new(t));
        let fm = FocusManager::new(tree.clone());
        Ok((tree, fm, [a, b, pin]))
    }

    #[test]
    fn move_and_prev() -> Result<()> {
        let (tree, fm, [a, b, _]) = setup()?;
        assert!(fm.to(a));
        assert!(tree.borrow().element(a)?.is_marked());
        assert!(fm.to("b"));
        assert!(!tree.borrow().element(a)?.is_marked());
        assert_eq!(fm.focused(), Some(b));
        assert_eq!(fm.previous(), Some(a));
        assert!(fm.prev());
        assert_eq!(fm.focused(), Some(a));
        assert_eq!(fm.previous(), Some(b));
        assert!(!fm.to("missing"));
        assert_eq!(fm.focused(), Some(a));
        Ok(())
    }

    #[test]
    fn refocus_is_silent() -> Result<()> {
        let (_, fm, [a, ..]) = setup()?;
        fm.to(a);
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        fm.on(WILDCARD, move |_: &Signal<'_, FocusChange>| {
            *h.borrow_mut() += 1;
        });
        let generation = fm.focus_gen();
        assert!(fm.to(a));
        assert_eq!(*hits.borrow(), 0);
        assert_eq!(fm.focus_gen(), generation);
        Ok(())
    }

    #[test]
    fn blur_clears_current_only() -> Result<()> {
        let (tree, fm, [a, b, _]) = setup()?;
        fm.to(a);
        fm.blur(b);
        assert_eq!(fm.focused(), Some(a));
        assert!(fm.blur_current());
        assert_eq!(fm.focused(), None);
        assert_eq!(fm.previous(), Some(a));
        assert!(!tree.borrow().element(a)?.is_marked());
        assert!(!fm.blur_current());
        Ok(())
    }

    #[test]
    fn input_focus_follows() -> Result<()> {
        let (tree, fm, [a, _, pin]) = setup()?;
        fm.to(pin);
        assert!(tree.borrow().element(pin)?.has_input_focus());
        fm.to(a);
        assert!(!tree.borrow().element(pin)?.has_input_focus());
        Ok(())
    }

    #[test]
    fn digits_fill_inputs() -> Result<()> {
        let (tree, fm, [a, _, pin]) = setup()?;
        let keys = KeyDispatcher::new(KeyMap::default());
        fm.attach(&keys);

        fm.to(a);
        let (proceed, ev) = keys.dispatch(49);
        assert!(proceed);
        assert!(!ev.default_prevented());

        fm.to(pin);
        for code in [49, 50, 51] {
            let (proceed, ev) = keys.dispatch(code);
            assert!(!proceed);
            assert!(ev.default_prevented());
        }
        let (proceed, ev) = keys.dispatch(39);
        assert!(proceed);
        assert!(ev.default_prevented());
        assert_eq!(tree.borrow().element(pin)?.value(), Some("123"));

        // A device keyboard edits this field itself; the digit passes through
        // with its default suppressed, and unmapped characters are left alone.
        let kb = {
            let mut t = tree.borrow_mut();
            let root = t.root();
            t.add_input(root, "kb", true)?
        };
        fm.to(kb);
        let (proceed, ev) = keys.dispatch(49);
        assert!(proceed);
        assert!(ev.default_prevented());
        let (proceed, ev) = keys.dispatch(u32::from('x'));
        assert!(proceed);
        assert!(!ev.default_prevented());
        assert_eq!(tree.borrow().element(kb)?.value(), Some(""));
        Ok(())
    }
}
