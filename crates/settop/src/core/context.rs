use std::{
    cell::{Ref, RefCell, RefMut},
    collections::VecDeque,
    fmt,
    rc::Rc,
};

use crate::{focus::FocusManager, poll::Scheduler, tree::Tree};

/// A navigation request queued by a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Activate the named scene.
    Go(String),
    /// Return to the scene in history.
    Back,
}

/// Queued navigation state.
#[derive(Debug, Default)]
struct NavState {
    /// Pending requests in arrival order.
    queue: VecDeque<Request>,
    /// Set once the application has been asked to exit.
    exit: bool,
}

/// A handle for requesting navigation. Requests are applied by the
/// application after the current callback returns, so scenes never re-enter
/// the router. Clones share one queue, which lets deferred continuations
/// navigate long after the callback that set them up has finished.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    /// Shared queue.
    inner: Rc<RefCell<NavState>>,
}

impl Navigator {
    /// Request a transition to `scene`.
    pub fn go(&self, scene: &str) {
        self.inner
            .borrow_mut()
            .queue
            .push_back(Request::Go(scene.to_string()));
    }

    /// Request a return to the previous scene.
    pub fn back(&self) {
        self.inner.borrow_mut().queue.push_back(Request::Back);
    }

    /// Ask the host to shut the application down.
    pub fn exit(&self) {
        self.inner.borrow_mut().exit = true;
    }

    /// Has an exit been requested?
    pub fn exit_requested(&self) -> bool {
        self.inner.borrow().exit
    }

    /// Take the oldest pending request.
    pub fn take(&self) -> Option<Request> {
        self.inner.borrow_mut().queue.pop_front()
    }

    /// Number of pending requests.
    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }
}

/// Application-wide collaborators shared by every scene: the element tree,
/// the focus manager, the scheduler, the navigation queue and the current
/// language. Built once at startup.
pub struct Context {
    /// The element tree.
    tree: Rc<RefCell<Tree>>,
    /// The focus manager over `tree`.
    focus: FocusManager,
    /// The cooperative scheduler.
    scheduler: Scheduler,
    /// Navigation requests.
    navigator: Navigator,
    /// The current language code, once one has been set.
    lang: RefCell<Option<String>>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("focus", &self.focus)
            .field("scheduler", &self.scheduler)
            .field("lang", &self.lang.borrow())
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Construct a context around an empty tree.
    pub fn new() -> Self {
        let tree = Rc::new(RefCell::new(Tree::new()));
        let focus = FocusManager::new(tree.clone());
        Self {
            tree,
            focus,
            scheduler: Scheduler::new(),
            navigator: Navigator::default(),
            lang: RefCell::new(None),
        }
    }

    /// Borrow the element tree.
    pub fn tree(&self) -> Ref<'_, Tree> {
        self.tree.borrow()
    }

    /// Mutably borrow the element tree. The borrow must be released before
    /// calling into the focus manager.
    pub fn tree_mut(&self) -> RefMut<'_, Tree> {
        self.tree.borrow_mut()
    }

    /// A shared handle to the tree, for use in deferred continuations.
    pub fn tree_handle(&self) -> Rc<RefCell<Tree>> {
        self.tree.clone()
    }

    /// The focus manager.
    pub fn focus(&self) -> &FocusManager {
        &self.focus
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The navigation queue.
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Ask the host to shut the application down.
    pub fn request_exit(&self) {
        self.navigator.exit();
    }

    /// Has an exit been requested?
    pub fn exit_requested(&self) -> bool {
        self.navigator.exit_requested()
    }

    /// The current language code.
    pub fn lang(&self) -> Option<String> {
        self.lang.borrow().clone()
    }

    /// Record the current language code.
    pub(crate) fn set_lang(&self, lang: &str) {
        *self.lang.borrow_mut() = Some(lang.to_string());
    }
}
