use std::{cell::RefCell, rc::Rc};

use crate::{
    error::Result,
    id::ElementId,
    key::{Direction, RemoteKey},
    scene::{EventOutcome, Scene, SceneContext},
    tree::Tree,
};

/// A shared, append-only log of what scenes did.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    /// Construct an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    /// A copy of every entry.
    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Remove and return every entry.
    pub fn take(&self) -> Vec<String> {
        self.0.take()
    }

    /// Number of entries equal to `entry`.
    pub fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == entry).count()
    }
}

/// What a probe builds inside its root.
#[derive(Debug, Clone)]
enum Part {
    /// A button, optionally linked to a scene.
    Button(String, Option<String>),
    /// A numeric input.
    Input(String),
}

/// A scene that records every callback in a [`Journal`] as
/// `"<scene>:<callback>"`. Buttons declared with [`Probe::link`] navigate to
/// their scene on enter.
#[derive(Debug, Clone)]
pub struct Probe {
    /// Where callbacks are recorded.
    journal: Journal,
    /// Elements built on create.
    parts: Vec<Part>,
}

impl Probe {
    /// Construct a probe with an empty root.
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            parts: Vec::new(),
        }
    }

    /// Add a plain button.
    pub fn button(mut self, name: &str) -> Self {
        self.parts.push(Part::Button(name.to_string(), None));
        self
    }

    /// Add a button that goes to `scene` on enter.
    pub fn link(mut self, name: &str, scene: &str) -> Self {
        self.parts
            .push(Part::Button(name.to_string(), Some(scene.to_string())));
        self
    }

    /// Add a numeric input.
    pub fn input(mut self, name: &str) -> Self {
        self.parts.push(Part::Input(name.to_string()));
        self
    }

    /// Record a callback.
    fn log(&self, ctx: &SceneContext<'_>, what: &str) {
        self.journal.push(format!("{}:{what}", ctx.name()));
    }
}

impl Scene for Probe {
    fn create(&mut self, tree: &mut Tree, parent: ElementId, name: &str) -> Result<ElementId> {
        let root = tree.add_container(parent, name)?;
        for part in &self.parts {
            match part {
                Part::Button(button, link) => {
                    let el = tree.add_button(root, button, button)?;
                    if let Some(scene) = link {
                        tree.set_action(el, scene)?;
                    }
                }
                Part::Input(input) => {
                    tree.add_input(root, input, false)?;
                }
            }
        }
        self.journal.push(format!("{name}:create"));
        Ok(root)
    }

    fn init(&mut self, ctx: &SceneContext<'_>) -> Result<()> {
        self.log(ctx, "init");
        Ok(())
    }

    fn activate(&mut self, ctx: &SceneContext<'_>) -> Result<()> {
        self.log(ctx, "activate");
        Ok(())
    }

    fn deactivate(&mut self, ctx: &SceneContext<'_>) -> Result<()> {
        self.log(ctx, "deactivate");
        Ok(())
    }

    fn render(&mut self, ctx: &SceneContext<'_>) -> Result<()> {
        self.log(ctx, "render");
        Ok(())
    }

    fn navigate(&mut self, ctx: &SceneContext<'_>, dir: Direction) -> Result<EventOutcome> {
        self.log(ctx, &format!("navigate {dir:?}"));
        let forward = matches!(dir, Direction::Down | Direction::Right);
        Ok(ctx.focus_step(forward).into())
    }

    fn on_enter(
        &mut self,
        ctx: &SceneContext<'_>,
        el: Option<ElementId>,
        _key: RemoteKey,
    ) -> Result<EventOutcome> {
        let (name, action) = match el.and_then(|el| ctx.tree().get(el).cloned()) {
            Some(e) => (e.name().to_string(), e.action().map(str::to_string)),
            None => ("-".to_string(), None),
        };
        self.log(ctx, &format!("enter {name}"));
        match action {
            Some(scene) => {
                ctx.go(&scene);
                Ok(EventOutcome::Handle)
            }
            None => Ok(EventOutcome::Ignore),
        }
    }

    fn on_click(&mut self, ctx: &SceneContext<'_>, el: ElementId) -> Result<EventOutcome> {
        let name = ctx
            .tree()
            .get(el)
            .map(|e| e.name().to_string())
            .unwrap_or_default();
        self.log(ctx, &format!("click {name}"));
        Ok(EventOutcome::Handle)
    }

    fn on_key(&mut self, ctx: &SceneContext<'_>, key: RemoteKey) -> Result<EventOutcome> {
        self.log(ctx, &format!("key {key}"));
        Ok(EventOutcome::Ignore)
    }

    fn on_lang_change(&mut self, ctx: &SceneContext<'_>, first_time: bool, lang: &str) -> Result<()> {
        self.log(ctx, &format!("lang {lang} {first_time}"));
        Ok(())
    }
}
