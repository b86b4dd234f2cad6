use std::{cell::Ref, time::Duration};

use tracing::{debug, trace};

use crate::{
    context::{Context, Request},
    dump::dump,
    error::{Error, Result},
    focus::FocusManager,
    id::ElementId,
    key::{KeyDispatcher, KeyMap, RemoteKey},
    poll::Scheduler,
    router::{RouterConfig, SceneRouter},
    scene::{EventOutcome, Scene},
    tree::Tree,
};

/// Upper bound on navigation requests applied in one go. Scenes that keep
/// redirecting to each other trip this instead of looping forever.
const MAX_REDIRECTS: usize = 64;

/// The application: one explicit context holding the element tree, focus
/// manager, scheduler, key dispatcher and scene router.
///
/// Every entry point applies queued navigation requests before returning, so
/// callers always observe a settled router.
pub struct App {
    /// Shared collaborators.
    ctx: Context,
    /// Scene lifecycle and history.
    router: SceneRouter,
    /// Raw key intake.
    keys: KeyDispatcher,
}

impl App {
    /// Construct an application with the default router configuration.
    pub fn new(keys: KeyMap) -> Self {
        Self::with_config(keys, RouterConfig::default())
    }

    /// Construct an application.
    pub fn with_config(keys: KeyMap, config: RouterConfig) -> Self {
        let ctx = Context::new();
        let keys = KeyDispatcher::new(keys);
        ctx.focus().attach(&keys);
        Self {
            ctx,
            router: SceneRouter::new(config),
            keys,
        }
    }

    /// Shared collaborators.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// The scene router.
    pub fn router(&self) -> &SceneRouter {
        &self.router
    }

    /// The key dispatcher. Listeners on `beforekey` run ahead of the
    /// router and can consume keys.
    pub fn keys(&self) -> &KeyDispatcher {
        &self.keys
    }

    /// The focus manager.
    pub fn focus(&self) -> &FocusManager {
        self.ctx.focus()
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        self.ctx.scheduler()
    }

    /// Borrow the element tree.
    pub fn tree(&self) -> Ref<'_, Tree> {
        self.ctx.tree()
    }

    /// Register a scene.
    pub fn add_scene(&mut self, name: &str, scene: impl Into<Box<dyn Scene>>) -> Result<()> {
        self.router.add_scene(name, scene)
    }

    /// Activate a scene.
    pub fn go(&mut self, name: &str) -> Result<bool> {
        let moved = self.router.go(&self.ctx, name)?;
        self.apply_requests()?;
        Ok(moved)
    }

    /// Return to the previous scene, or request exit when there is none.
    pub fn go_back(&mut self) -> Result<bool> {
        let moved = self.router.go_back(&self.ctx)?;
        self.apply_requests()?;
        Ok(moved)
    }

    /// Feed one raw key code through the pipeline: `beforekey` listeners
    /// (including text-entry interception), `key` listeners, then the active
    /// scene. Returns `true` if anything handled the key.
    pub fn handle_key(&mut self, code: u32) -> Result<bool> {
        let (proceed, event) = self.keys.dispatch(code);
        trace!("key {code} -> {:?}, proceed {proceed}", event.key());
        if !proceed {
            self.apply_requests()?;
            return Ok(true);
        }
        let Some(key) = event.key() else {
            return Ok(false);
        };
        let mut outcome = self.router.dispatch_key(&self.ctx, key)?;
        if outcome == EventOutcome::Ignore && key == RemoteKey::Exit {
            self.ctx.request_exit();
            outcome = EventOutcome::Handle;
        }
        self.apply_requests()?;
        Ok(outcome == EventOutcome::Handle)
    }

    /// Deliver a pointer selection of `el` to the active scene.
    pub fn handle_click(&mut self, el: ElementId) -> Result<bool> {
        let outcome = self.router.click(&self.ctx, el)?;
        self.apply_requests()?;
        Ok(outcome == EventOutcome::Handle)
    }

    /// Switch language and notify every created scene.
    pub fn set_lang(&mut self, lang: &str) -> Result<()> {
        debug!("language {lang}");
        self.ctx.set_lang(lang);
        self.router.lang_change(&self.ctx, lang)?;
        self.apply_requests()
    }

    /// Run one scheduler pass. Returns the number of tasks run.
    pub fn tick(&mut self) -> Result<usize> {
        let ran = self.ctx.scheduler().run_ready();
        self.apply_requests()?;
        Ok(ran)
    }

    /// Move the scheduler clock forward, running everything that falls due.
    pub fn advance(&mut self, elapsed: Duration) -> Result<usize> {
        let ran = self.ctx.scheduler().advance(elapsed);
        self.apply_requests()?;
        Ok(ran)
    }

    /// How long a host may wait for input before calling [`App::tick`].
    pub fn next_wait(&self) -> Option<Duration> {
        self.ctx.scheduler().next_wait()
    }

    /// Has anything asked the application to exit?
    pub fn exit_requested(&self) -> bool {
        self.ctx.exit_requested()
    }

    /// Outline of the active scene, or of the whole tree when no scene is
    /// active.
    pub fn dump(&self, color: bool) -> Result<String> {
        let tree = self.ctx.tree();
        let root = self
            .router
            .current()
            .and_then(|name| self.router.root(name))
            .unwrap_or_else(|| tree.root());
        dump(&tree, root, color)
    }

    /// Apply navigation requests queued by scenes until none remain.
    fn apply_requests(&mut self) -> Result<()> {
        for _ in 0..MAX_REDIRECTS {
            match self.ctx.navigator().take() {
                Some(Request::Go(name)) => {
                    self.router.go(&self.ctx, &name)?;
                }
                Some(Request::Back) => {
                    self.router.go_back(&self.ctx)?;
                }
                None => return Ok(()),
            }
        }
        Err(Error::Internal(format!(
            "more than {MAX_REDIRECTS} navigation requests in one step"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneContext;

    /// A scene that bounces straight to another.
    struct Redirect(&'static str);

    impl Scene for Redirect {
        fn activate(&mut self, ctx: &SceneContext<'_>) -> Result<()> {
            ctx.go(self.0);
            Ok(())
        }
    }

    #[test]
    fn redirects_are_applied() -> Result<()> {
        let mut app = App::new(KeyMap::default());
        app.add_scene("splash", Redirect("home"))?;
        app.add_scene("home", Redirect("nowhere"))?;
        assert!(app.go("splash")?);
        assert_eq!(app.router().current(), Some("home"));
        assert_eq!(app.router().history(), ["splash"]);
        Ok(())
    }

    #[test]
    fn redirect_loop_is_an_error() -> Result<()> {
        let mut app = App::new(KeyMap::default());
        app.add_scene("a", Redirect("b"))?;
        app.add_scene("b", Redirect("a"))?;
        assert!(matches!(app.go("a"), Err(Error::Internal(_))));
        Ok(())
    }

    #[test]
    fn exit_key_and_empty_history() -> Result<()> {
        let mut app = App::new(KeyMap::default());
        app.add_scene("home", Redirect("home"))?;
        app.go("home")?;
        assert!(!app.exit_requested());
        assert!(app.handle_key(27)?);
        assert!(app.exit_requested());

        let mut app = App::new(KeyMap::default());
        app.add_scene("home", Redirect("home"))?;
        app.go("home")?;
        assert!(app.handle_key(8)?);
        assert!(app.exit_requested());
        Ok(())
    }
}
