//! The demo's three scenes: a welcome menu with a PIN field, an information
//! page and a channel list that loads in the background.

use std::rc::Rc;

use serde_json::Value;
use settop::{
    ElementId, EventOutcome, Scene, SceneContext,
    deferred::{Cancellable, Settle},
    error::{Error, Result},
    key::RemoteKey,
    model::{Accessor, Model},
    tree::{Target, Tree},
};
use tracing::{debug, warn};

/// Translated strings: key, English, German.
const STRINGS: &[(&str, &str, &str)] = &[
    ("title", "Welcome", "Willkommen"),
    ("info", "Information", "Information"),
    ("feeds", "Channels", "Sender"),
    ("exit", "Exit", "Beenden"),
    ("back", "Back", "Zurück"),
    ("loading", "Loading...", "Lädt..."),
    ("ready", "Choose a channel", "Sender wählen"),
];

/// Look up a translated string, falling back to English and then the key.
pub fn text<'a>(lang: &str, key: &'a str) -> &'a str {
    match STRINGS.iter().find(|(k, ..)| *k == key) {
        Some((_, _, de)) if lang == "de" => de,
        Some((_, en, _)) => en,
        None => key,
    }
}

/// Channels the feeds scene pretends to fetch, with their load times.
pub const CHANNELS: &[(&str, u64)] = &[("news", 300), ("sports", 700), ("movies", 1200)];

/// Preference hooks: the PIN is stored as digits and read back masked
/// through `pin_mask`.
pub static PREFERENCES: &[Accessor] = &[
    Accessor {
        name: "pin",
        get: None,
        set: Some(|v| match v {
            Value::String(s) => Value::String(s.chars().filter(char::is_ascii_digit).collect()),
            other => other,
        }),
    },
    Accessor {
        name: "pin_mask",
        get: Some(|attrs| {
            let pin = attrs.get("pin")?.as_str()?;
            Some(Value::String("*".repeat(pin.len())))
        }),
        set: None,
    },
];

/// Relabel every element under `root` whose name is a translation key.
fn relabel(ctx: &SceneContext<'_>, names: &[&str], lang: &str) -> Result<()> {
    let mut tree = ctx.tree_mut();
    for name in names {
        if let Some(el) = tree.find(ctx.root(), name) {
            tree.set_label(el, text(lang, name))?;
        }
    }
    Ok(())
}

/// The entry scene.
pub struct Welcome {
    /// Shared preferences.
    prefs: Rc<Model>,
}

impl Welcome {
    /// Construct the scene over shared preferences.
    pub fn new(prefs: Rc<Model>) -> Self {
        Self { prefs }
    }
}

impl Scene for Welcome {
    fn create(&mut self, tree: &mut Tree, parent: ElementId, name: &str) -> Result<ElementId> {
        let root = tree.add_container(parent, name)?;
        tree.add_text(root, "title", text("en", "title"))?;
        let menu = tree.add_container(root, "menu")?;
        for (button, action) in [("info", "info"), ("feeds", "feeds")] {
            let el = tree.add_button(menu, button, text("en", button))?;
            tree.set_action(el, action)?;
        }
        tree.add_input(menu, "pin", false)?;
        tree.add_button(menu, "exit", text("en", "exit"))?;
        Ok(root)
    }

    fn on_enter(
        &mut self,
        ctx: &SceneContext<'_>,
        el: Option<ElementId>,
        _key: RemoteKey,
    ) -> Result<EventOutcome> {
        let Some(el) = el else {
            return Ok(EventOutcome::Ignore);
        };
        let (name, action, value) = {
            let tree = ctx.tree();
            let e = tree.element(el)?;
            (
                e.name().to_string(),
                e.action().map(str::to_string),
                e.value().map(str::to_string),
            )
        };
        if let Some(scene) = action {
            ctx.go(&scene);
        } else if let Some(pin) = value {
            self.prefs.set("pin", pin);
            ctx.tree_mut().set_value(el, "")?;
        } else if name == "exit" {
            ctx.exit();
        } else {
            return Ok(EventOutcome::Ignore);
        }
        Ok(EventOutcome::Handle)
    }

    fn on_key(&mut self, ctx: &SceneContext<'_>, key: RemoteKey) -> Result<EventOutcome> {
        match key {
            RemoteKey::Red => ctx.go("info"),
            RemoteKey::Green => ctx.go("feeds"),
            _ => return Ok(EventOutcome::Ignore),
        }
        Ok(EventOutcome::Handle)
    }

    fn on_lang_change(&mut self, ctx: &SceneContext<'_>, _first_time: bool, lang: &str) -> Result<()> {
        relabel(ctx, &["title", "info", "feeds", "exit"], lang)
    }
}

/// A static page that shows the stored preferences.
pub struct Info {
    /// Shared preferences.
    prefs: Rc<Model>,
}

impl Info {
    /// Construct the scene over shared preferences.
    pub fn new(prefs: Rc<Model>) -> Self {
        Self { prefs }
    }
}

impl Scene for Info {
    fn create(&mut self, tree: &mut Tree, parent: ElementId, name: &str) -> Result<ElementId> {
        let root = tree.add_container(parent, name)?;
        tree.add_text(root, "info", text("en", "info"))?;
        tree.add_text(root, "pin_mask", "")?;
        tree.add_button(root, "back", text("en", "back"))?;
        Ok(root)
    }

    fn render(&mut self, ctx: &SceneContext<'_>) -> Result<()> {
        let mask = self
            .prefs
            .get("pin_mask")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let mut tree = ctx.tree_mut();
        let el = tree
            .find(ctx.root(), "pin_mask")
            .ok_or_else(|| Error::Scene("info: no pin_mask".into()))?;
        tree.set_label(el, &format!("PIN {mask}"))
    }

    fn on_enter(
        &mut self,
        ctx: &SceneContext<'_>,
        _el: Option<ElementId>,
        _key: RemoteKey,
    ) -> Result<EventOutcome> {
        ctx.go_back();
        Ok(EventOutcome::Handle)
    }

    fn on_lang_change(&mut self, ctx: &SceneContext<'_>, _first_time: bool, lang: &str) -> Result<()> {
        relabel(ctx, &["info", "back"], lang)
    }
}

/// A channel list fetched in the background every time the scene is shown.
/// Leaving the scene cancels whatever is still loading.
#[derive(Default)]
pub struct Feeds {
    /// Container for the channel buttons.
    list: Option<ElementId>,
    /// Status line.
    status: Option<ElementId>,
    /// Language for labels set by continuations.
    lang: String,
}

impl Feeds {
    /// Construct an empty channel list.
    pub fn new() -> Self {
        Self {
            lang: "en".into(),
            ..Self::default()
        }
    }

    /// The list and status elements, which exist after `create`.
    fn parts(&self) -> Result<(ElementId, ElementId)> {
        self.list
            .zip(self.status)
            .ok_or_else(|| Error::Scene("feeds: not created".into()))
    }
}

impl Scene for Feeds {
    fn create(&mut self, tree: &mut Tree, parent: ElementId, name: &str) -> Result<ElementId> {
        let root = tree.add_container(parent, name)?;
        self.status = Some(tree.add_text(root, "status", "")?);
        self.list = Some(tree.add_container(root, "channels")?);
        Ok(root)
    }

    fn activate(&mut self, ctx: &SceneContext<'_>) -> Result<()> {
        let (list, status) = self.parts()?;
        {
            let mut tree = ctx.tree_mut();
            tree.clear_children(list)?;
            tree.set_label(status, text(&self.lang, "loading"))?;
        }

        let mut fetches = Vec::new();
        for &(channel, ms) in CHANNELS {
            let tree = ctx.tree_handle();
            let fetch = ctx.deferreds().timeout(ctx.scheduler(), ms);
            fetch.then(move |outcome| {
                if outcome.is_resolved()
                    && let Err(e) = tree.borrow_mut().add_button(list, channel, channel)
                {
                    warn!("feeds: adding {channel}: {e}");
                }
            });
            fetches.push(fetch);
        }

        let ops: Vec<&dyn Settle> = fetches.iter().map(|f| f as &dyn Settle).collect();
        let tree = ctx.tree_handle();
        let focus = ctx.focus().clone();
        let lang = self.lang.clone();
        ctx.deferreds().all(&ops).then(move |outcome| {
            if !outcome.is_resolved() {
                debug!("feeds: cancelled");
                return;
            }
            if let Err(e) = tree.borrow_mut().set_label(status, text(&lang, "ready")) {
                warn!("feeds: status: {e}");
            }
            focus.to(Target::FirstFocusable(list));
        });
        Ok(())
    }

    fn deactivate(&mut self, ctx: &SceneContext<'_>) -> Result<()> {
        let n = ctx.reject_all();
        if n > 0 {
            debug!("feeds: cancelled {n} fetches");
        }
        Ok(())
    }

    fn on_lang_change(&mut self, _ctx: &SceneContext<'_>, _first_time: bool, lang: &str) -> Result<()> {
        self.lang = lang.to_string();
        Ok(())
    }
}
