//! Scenes and the context their callbacks receive.
//!
//! A scene is one full-screen state of the application: a welcome page, a
//! settings menu, a player. Scenes are registered with the router under a
//! unique name and move through [`SceneState`]:
//!
//! `Uncreated` → `Created` → `Active` ⇄ `Inactive`
//!
//! [`Scene::create`] and [`Scene::init`] run once, the first time the scene
//! is visited. Every later visit only runs [`Scene::activate`],
//! [`Scene::render`] and [`Scene::focus`].

use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

use crate::{
    context::{Context, Navigator},
    deferred::{Cancellable, DeferredSet},
    error::Result,
    focus::FocusManager,
    id::ElementId,
    key::{Direction, RemoteKey},
    poll::Scheduler,
    tree::{Target, Tree},
};

/// Lifecycle state of a registered scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    /// Registered, root not built yet.
    Uncreated,
    /// Root built and initialized, never shown.
    Created,
    /// Shown and receiving input.
    Active,
    /// Built but hidden.
    Inactive,
}

/// The result of a scene input handler.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EventOutcome {
    /// The input was processed.
    Handle,
    /// The input was not handled.
    Ignore,
}

impl From<bool> for EventOutcome {
    fn from(handled: bool) -> Self {
        if handled { Self::Handle } else { Self::Ignore }
    }
}

/// What a scene callback can see and do.
pub struct SceneContext<'a> {
    /// Application collaborators.
    ctx: &'a Context,
    /// The scene's registered name.
    name: &'a str,
    /// The scene's root container.
    root: ElementId,
    /// Operations started on behalf of this scene.
    deferreds: &'a DeferredSet,
}

impl Cancellable for SceneContext<'_> {
    fn deferreds(&self) -> &DeferredSet {
        self.deferreds
    }
}

impl<'a> SceneContext<'a> {
    /// Construct a context for one callback.
    pub(crate) fn new(
        ctx: &'a Context,
        name: &'a str,
        root: ElementId,
        deferreds: &'a DeferredSet,
    ) -> Self {
        Self {
            ctx,
            name,
            root,
            deferreds,
        }
    }

    /// The scene's registered name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// The scene's root container.
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Borrow the element tree.
    pub fn tree(&self) -> Ref<'_, Tree> {
        self.ctx.tree()
    }

    /// Mutably borrow the element tree. Release the borrow before moving
    /// focus.
    pub fn tree_mut(&self) -> RefMut<'_, Tree> {
        self.ctx.tree_mut()
    }

    /// A shared handle to the tree, for continuations that outlive the
    /// callback.
    pub fn tree_handle(&self) -> Rc<RefCell<Tree>> {
        self.ctx.tree_handle()
    }

    /// The focus manager.
    pub fn focus(&self) -> &FocusManager {
        self.ctx.focus()
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        self.ctx.scheduler()
    }

    /// The scene's record of outstanding operations.
    pub fn deferreds(&self) -> &DeferredSet {
        self.deferreds
    }

    /// A navigation handle that can be moved into continuations.
    pub fn navigator(&self) -> Navigator {
        self.ctx.navigator().clone()
    }

    /// Request a transition to `scene` once this callback returns.
    pub fn go(&self, scene: &str) {
        self.ctx.navigator().go(scene);
    }

    /// Request a return to the previous scene once this callback returns.
    pub fn go_back(&self) {
        self.ctx.navigator().back();
    }

    /// Ask the host to shut the application down.
    pub fn exit(&self) {
        self.ctx.request_exit();
    }

    /// The current language code.
    pub fn lang(&self) -> Option<String> {
        self.ctx.lang()
    }

    /// Move focus to the next (or previous) focusable element of this scene
    /// in tree order, wrapping at the ends. With nothing focused inside the
    /// scene, the first focusable element is chosen.
    pub fn focus_step(&self, forward: bool) -> bool {
        let focusables = self.ctx.tree().focusables(self.root);
        if focusables.is_empty() {
            return false;
        }
        let current = self
            .focus()
            .focused()
            .and_then(|el| focusables.iter().position(|f| *f == el));
        let next = match current {
            None => 0,
            Some(i) if forward => (i + 1) % focusables.len(),
            Some(i) => (i + focusables.len() - 1) % focusables.len(),
        };
        self.focus().to(focusables[next])
    }
}

/// Scenes are the full-screen states of an application.
///
/// Every method has a default, so a scene only implements what it needs.
/// Callbacks run with no router or tree borrow held, and request navigation
/// through the context rather than calling the router directly.
pub trait Scene {
    /// Build the scene's root container under `parent` and return it. Runs
    /// once, before [`Scene::init`].
    fn create(&mut self, tree: &mut Tree, parent: ElementId, name: &str) -> Result<ElementId> {
        tree.add_container(parent, name)
    }

    /// One-time setup after the root exists.
    fn init(&mut self, _ctx: &SceneContext<'_>) -> Result<()> {
        Ok(())
    }

    /// The scene is becoming active. Its root is already visible.
    fn activate(&mut self, _ctx: &SceneContext<'_>) -> Result<()> {
        Ok(())
    }

    /// The scene is being left. Its root is hidden afterwards.
    fn deactivate(&mut self, _ctx: &SceneContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Refresh the scene's elements. Runs on every activation.
    fn render(&mut self, _ctx: &SceneContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Place initial focus. Defaults to the first focusable element.
    fn focus(&mut self, ctx: &SceneContext<'_>) -> Result<()> {
        ctx.focus().to(Target::FirstFocusable(ctx.root()));
        Ok(())
    }

    /// Arrow key. Defaults to stepping through focusable elements in tree
    /// order: down and right move forward, up and left move back.
    fn navigate(&mut self, ctx: &SceneContext<'_>, dir: Direction) -> Result<EventOutcome> {
        let forward = matches!(dir, Direction::Down | Direction::Right);
        Ok(ctx.focus_step(forward).into())
    }

    /// OK key, with the focused element.
    fn on_enter(
        &mut self,
        _ctx: &SceneContext<'_>,
        _el: Option<ElementId>,
        _key: RemoteKey,
    ) -> Result<EventOutcome> {
        Ok(EventOutcome::Ignore)
    }

    /// A pointer selected `el`, which now holds focus.
    fn on_click(&mut self, _ctx: &SceneContext<'_>, _el: ElementId) -> Result<EventOutcome> {
        Ok(EventOutcome::Ignore)
    }

    /// Back key. Defaults to returning to the previous scene.
    fn on_return(&mut self, ctx: &SceneContext<'_>) -> Result<EventOutcome> {
        ctx.go_back();
        Ok(EventOutcome::Handle)
    }

    /// Any other key.
    fn on_key(&mut self, _ctx: &SceneContext<'_>, _key: RemoteKey) -> Result<EventOutcome> {
        Ok(EventOutcome::Ignore)
    }

    /// The language changed. `first_time` is set for the first language the
    /// scene sees.
    fn on_lang_change(
        &mut self,
        _ctx: &SceneContext<'_>,
        _first_time: bool,
        _lang: &str,
    ) -> Result<()> {
        Ok(())
    }
}

/// Convert scenes into boxed trait objects.
impl<S> From<S> for Box<dyn Scene>
where
    S: Scene + 'static,
{
    fn from(scene: S) -> Self {
        Box::new(scene)
    }
}
