use std::time::Duration;

use crate::{
    app::App,
    error::{Error, Result},
    key::{KeyMap, RemoteKey},
    router::RouterConfig,
};

/// A simple harness that holds an [`App`] with the default key map. Tests
/// drive it with logical keys instead of raw codes and inspect focus and
/// router state by name.
pub struct Harness {
    /// The application under test.
    pub app: App,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Create a harness with the default router configuration.
    pub fn new() -> Self {
        Self {
            app: App::new(KeyMap::default()),
        }
    }

    /// Create a harness with a custom router configuration.
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            app: App::with_config(KeyMap::default(), config),
        }
    }

    /// Press a key. Fails if the key map has no code for it.
    pub fn press(&mut self, key: RemoteKey) -> Result<bool> {
        let code = match key {
            RemoteKey::Char(c) => u32::from(c),
            k => self
                .app
                .keys()
                .keys()
                .code_for(k)
                .ok_or_else(|| Error::Internal(format!("no code for {k}")))?,
        };
        self.app.handle_key(code)
    }

    /// Press several keys in order.
    pub fn press_all(&mut self, keys: &[RemoteKey]) -> Result<()> {
        for key in keys {
            self.press(*key)?;
        }
        Ok(())
    }

    /// Advance the scheduler clock by `ms` milliseconds.
    pub fn wait(&mut self, ms: u64) -> Result<usize> {
        self.app.advance(Duration::from_millis(ms))
    }

    /// Name of the focused element.
    pub fn focused_name(&self) -> Option<String> {
        let el = self.app.focus().focused()?;
        self.app.tree().get(el).map(|e| e.name().to_string())
    }

    /// Name of the active scene.
    pub fn current(&self) -> Option<String> {
        self.app.router().current().map(str::to_string)
    }

    /// Contents of the first input named `name`.
    pub fn value_of(&self, name: &str) -> Option<String> {
        let tree = self.app.tree();
        let el = tree.find(tree.root(), name)?;
        tree.get(el)?.value().map(str::to_string)
    }
}
