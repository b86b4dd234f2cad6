use std::collections::HashMap;

use tracing::{debug, warn};

use crate::{
    context::Context,
    deferred::DeferredSet,
    error::{Error, Result},
    event::{EventHub, Observable},
    id::ElementId,
    key::RemoteKey,
    scene::{EventOutcome, Scene, SceneContext, SceneState},
};

/// Triggered on the router hub after every completed transition.
pub const CHANGE: &str = "change";

/// Arguments for the router `change` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteChange {
    /// The scene that was active before the transition.
    pub from: Option<String>,
    /// The scene that is active now.
    pub to: String,
}

/// Router behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    /// Reject a scene's outstanding operations whenever it is deactivated.
    pub cancel_on_leave: bool,
}

/// A registered scene and its lifecycle bookkeeping.
struct Slot {
    /// The scene behaviour.
    scene: Box<dyn Scene>,
    /// Lifecycle state.
    state: SceneState,
    /// Root container, once created.
    root: Option<ElementId>,
    /// Operations started on behalf of the scene.
    deferreds: DeferredSet,
    /// Has the scene been told about a language yet?
    lang_seen: bool,
}

/// Owns the registered scenes, the active scene and the history stack.
#[derive(Default)]
pub struct SceneRouter {
    /// Scenes by name.
    slots: HashMap<String, Slot>,
    /// Registration order, for deterministic broadcast.
    order: Vec<String>,
    /// The active scene.
    current: Option<String>,
    /// Names of scenes left by forward transitions, oldest first.
    history: Vec<String>,
    /// Behaviour switches.
    config: RouterConfig,
    /// Router events.
    events: EventHub<RouteChange>,
}

impl Observable<RouteChange> for SceneRouter {
    fn events(&self) -> &EventHub<RouteChange> {
        &self.events
    }
}

impl SceneRouter {
    /// Construct an empty router.
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Register a scene without creating or activating it.
    pub fn add_scene(&mut self, name: &str, scene: impl Into<Box<dyn Scene>>) -> Result<()> {
        if self.slots.contains_key(name) {
            return Err(Error::DuplicateScene(name.to_string()));
        }
        self.slots.insert(
            name.to_string(),
            Slot {
                scene: scene.into(),
                state: SceneState::Uncreated,
                root: None,
                deferreds: DeferredSet::new(),
                lang_seen: false,
            },
        );
        self.order.push(name.to_string());
        Ok(())
    }

    /// The active scene.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The history stack, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Registered scene names in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Lifecycle state of a registered scene.
    pub fn state(&self, name: &str) -> Option<SceneState> {
        self.slots.get(name).map(|s| s.state)
    }

    /// Root container of a created scene.
    pub fn root(&self, name: &str) -> Option<ElementId> {
        self.slots.get(name).and_then(|s| s.root)
    }

    /// The behaviour switches.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Number of operations still pending for a scene.
    pub fn pending(&self, name: &str) -> usize {
        self.slots.get(name).map_or(0, |s| s.deferreds.len())
    }

    /// Reject every outstanding operation of a scene. Returns the number
    /// rejected.
    pub fn reject_all(&self, name: &str) -> usize {
        self.slots.get(name).map_or(0, |s| s.deferreds.reject_all())
    }

    /// Activate the named scene, creating it on first visit. The scene being
    /// left is pushed onto history. Unknown names are logged and return
    /// `false`; the active scene is left alone.
    pub fn go(&mut self, ctx: &Context, name: &str) -> Result<bool> {
        if !self.slots.contains_key(name) {
            warn!("go: no scene named {name:?}");
            return Ok(false);
        }
        self.transition(ctx, name, true)
    }

    /// Return to the most recent scene in history without recording the
    /// scene being left. With empty history the application is asked to
    /// exit and `false` is returned.
    pub fn go_back(&mut self, ctx: &Context) -> Result<bool> {
        match self.history.pop() {
            Some(name) => {
                let moved = self.transition(ctx, &name, false);
                if moved.is_err() {
                    self.history.push(name);
                }
                moved
            }
            None => {
                debug!("history empty, requesting exit");
                ctx.request_exit();
                Ok(false)
            }
        }
    }

    /// Tell every created scene that the language changed.
    pub fn lang_change(&mut self, ctx: &Context, lang: &str) -> Result<()> {
        for name in &self.order {
            let Some(slot) = self.slots.get_mut(name) else {
                continue;
            };
            let Some(root) = slot.root else {
                continue;
            };
            let first_time = !slot.lang_seen;
            slot.lang_seen = true;
            let sc = SceneContext::new(ctx, name, root, &slot.deferreds);
            slot.scene.on_lang_change(&sc, first_time, lang)?;
        }
        Ok(())
    }

    /// Route a key to the active scene: arrows to `navigate`, OK to
    /// `on_enter`, back to `on_return`, anything else to `on_key`.
    pub fn dispatch_key(&mut self, ctx: &Context, key: RemoteKey) -> Result<EventOutcome> {
        let Some(name) = self.current.clone() else {
            return Ok(EventOutcome::Ignore);
        };
        let slot = self.slot_mut(&name)?;
        let root = slot.root.ok_or_else(|| Error::Internal(format!("{name} has no root")))?;
        let sc = SceneContext::new(ctx, &name, root, &slot.deferreds);
        match key {
            RemoteKey::Enter => slot.scene.on_enter(&sc, ctx.focus().focused(), key),
            RemoteKey::Return => slot.scene.on_return(&sc),
            k => match k.direction() {
                Some(dir) => slot.scene.navigate(&sc, dir),
                None => slot.scene.on_key(&sc, k),
            },
        }
    }

    /// Focus `el` and hand it to the active scene's `on_click`. Elements
    /// outside the active scene are ignored.
    pub fn click(&mut self, ctx: &Context, el: ElementId) -> Result<EventOutcome> {
        let Some(name) = self.current.clone() else {
            return Ok(EventOutcome::Ignore);
        };
        let slot = self.slot_mut(&name)?;
        let root = slot.root.ok_or_else(|| Error::Internal(format!("{name} has no root")))?;
        if !ctx.tree().is_descendant(el, root) {
            return Ok(EventOutcome::Ignore);
        }
        ctx.focus().to(el);
        let sc = SceneContext::new(ctx, &name, root, &slot.deferreds);
        slot.scene.on_click(&sc, el)
    }

    /// Look up a slot that must exist.
    fn slot_mut(&mut self, name: &str) -> Result<&mut Slot> {
        self.slots
            .get_mut(name)
            .ok_or_else(|| Error::UnknownScene(name.to_string()))
    }

    /// Move from the active scene to `name`. If the target fails to
    /// activate, the scene being left is shown again and stays current.
    fn transition(&mut self, ctx: &Context, name: &str, record: bool) -> Result<bool> {
        if self.current.as_deref() == Some(name) {
            return Ok(true);
        }
        self.ensure_created(ctx, name)?;
        let from = self.current.clone();
        if let Some(prev) = &from {
            self.deactivate(ctx, prev)?;
        }
        if let Err(e) = self.activate(ctx, name) {
            warn!("scene {name} failed to activate: {e}");
            self.restore(ctx, name, from.as_deref());
            return Err(e);
        }
        if record && let Some(prev) = &from {
            self.history.push(prev.clone());
        }
        self.current = Some(name.to_string());
        debug!("scene {from:?} -> {name}");
        self.events.trigger(
            CHANGE,
            &RouteChange {
                from,
                to: name.to_string(),
            },
        );
        Ok(true)
    }

    /// Undo a failed activation of `failed`: hide it again and bring back
    /// `from`. Errors while bringing `from` back are logged.
    fn restore(&mut self, ctx: &Context, failed: &str, from: Option<&str>) {
        if let Ok(slot) = self.slot_mut(failed) {
            slot.state = SceneState::Inactive;
            if let Some(root) = slot.root {
                if ctx.focus().is_in(root) {
                    ctx.focus().blur_current();
                }
                if let Err(e) = ctx.tree_mut().set_hidden(root, true) {
                    warn!("scene {failed}: hiding after failure: {e}");
                }
            }
        }
        if let Some(prev) = from
            && let Err(e) = self.activate(ctx, prev)
        {
            warn!("scene {prev}: reactivation failed: {e}");
        }
    }

    /// Build and initialize a scene on its first visit.
    fn ensure_created(&mut self, ctx: &Context, name: &str) -> Result<()> {
        let slot = self.slot_mut(name)?;
        if slot.state != SceneState::Uncreated {
            return Ok(());
        }
        let root = {
            let mut tree = ctx.tree_mut();
            let parent = tree.root();
            let root = slot.scene.create(&mut tree, parent, name)?;
            tree.set_hidden(root, true)?;
            root
        };
        slot.root = Some(root);
        slot.state = SceneState::Created;
        debug!("scene {name} created");
        let sc = SceneContext::new(ctx, name, root, &slot.deferreds);
        slot.scene
            .init(&sc)
            .map_err(|e| Error::Scene(format!("{name}: init failed: {e}")))?;
        if let Some(lang) = ctx.lang() {
            slot.lang_seen = true;
            slot.scene.on_lang_change(&sc, true, &lang)?;
        }
        Ok(())
    }

    /// Hide a scene, moving focus out of it.
    fn deactivate(&mut self, ctx: &Context, name: &str) -> Result<()> {
        let cancel = self.config.cancel_on_leave;
        let slot = self.slot_mut(name)?;
        let root = slot.root.ok_or_else(|| Error::Internal(format!("{name} has no root")))?;
        let sc = SceneContext::new(ctx, name, root, &slot.deferreds);
        slot.scene.deactivate(&sc)?;
        slot.state = SceneState::Inactive;
        if ctx.focus().is_in(root) {
            ctx.focus().blur_current();
        }
        ctx.tree_mut().set_hidden(root, true)?;
        if cancel {
            let n = slot.deferreds.reject_all();
            if n > 0 {
                debug!("scene {name}: rejected {n} pending operations");
            }
        }
        Ok(())
    }

    /// Show a scene, render it and place focus.
    fn activate(&mut self, ctx: &Context, name: &str) -> Result<()> {
        let slot = self.slot_mut(name)?;
        let root = slot.root.ok_or_else(|| Error::Internal(format!("{name} has no root")))?;
        ctx.tree_mut().set_hidden(root, false)?;
        slot.state = SceneState::Active;
        let sc = SceneContext::new(ctx, name, root, &slot.deferreds);
        slot.scene.activate(&sc)?;
        slot.scene.render(&sc)?;
        slot.scene.focus(&sc)?;
        Ok(())
    }
}
