//! A terminal demo for settop: three scenes driven by a keyboard standing in
//! for a remote control.

use std::rc::Rc;

use settop::{App, error::Result, key::KeyMap, model::Model};

pub mod scenes;

/// Build the demo application with every scene registered, in `lang`, with
/// the welcome scene active.
pub fn build(keys: KeyMap, lang: &str) -> Result<App> {
    let prefs = Rc::new(Model::new(scenes::PREFERENCES));
    let mut app = App::new(keys);
    app.add_scene("welcome", scenes::Welcome::new(prefs.clone()))?;
    app.add_scene("info", scenes::Info::new(prefs))?;
    app.add_scene("feeds", scenes::Feeds::new())?;
    app.set_lang(lang)?;
    app.go("welcome")?;
    Ok(app)
}

#[cfg(test)]
mod tests {
    use settop::{SceneState, key::RemoteKey, testing::harness::Harness};

    use super::*;

    /// The demo app in a harness.
    fn harness(lang: &str) -> Result<Harness> {
        Ok(Harness {
            app: build(KeyMap::default(), lang)?,
        })
    }

    /// Label of the first element named `name`, hidden or not.
    fn label(h: &Harness, name: &str) -> Option<String> {
        let tree = h.app.tree();
        let el = tree.find(tree.root(), name)?;
        tree.get(el).map(|e| e.label().to_string())
    }

    #[test]
    fn menu_and_back() -> Result<()> {
        let mut h = harness("en")?;
        assert_eq!(h.focused_name().as_deref(), Some("info"));
        h.press(RemoteKey::Enter)?;
        assert_eq!(h.current().as_deref(), Some("info"));
        assert_eq!(h.focused_name().as_deref(), Some("back"));
        h.press(RemoteKey::Enter)?;
        assert_eq!(h.current().as_deref(), Some("welcome"));
        h.press(RemoteKey::Return)?;
        assert!(h.app.exit_requested());
        Ok(())
    }

    #[test]
    fn pin_is_stored_masked() -> Result<()> {
        let mut h = harness("en")?;
        h.press_all(&[RemoteKey::Down, RemoteKey::Down])?;
        assert_eq!(h.focused_name().as_deref(), Some("pin"));
        h.press_all(&[RemoteKey::Digit(4), RemoteKey::Digit(2), RemoteKey::Enter])?;
        assert_eq!(h.value_of("pin").as_deref(), Some(""));
        h.press(RemoteKey::Red)?;
        assert_eq!(h.current().as_deref(), Some("info"));
        assert_eq!(label(&h, "pin_mask").as_deref(), Some("PIN **"));
        Ok(())
    }

    #[test]
    fn channels_load_and_cancel() -> Result<()> {
        let mut h = harness("de")?;
        assert_eq!(label(&h, "title").as_deref(), Some("Willkommen"));
        h.press(RemoteKey::Green)?;
        assert_eq!(label(&h, "status").as_deref(), Some("Lädt..."));
        h.wait(800)?;
        assert_eq!(h.app.router().pending("feeds"), 2);
        h.press(RemoteKey::Return)?;
        assert_eq!(h.app.router().pending("feeds"), 0);
        h.wait(1000)?;
        assert_eq!(label(&h, "status").as_deref(), Some("Lädt..."));
        assert_eq!(h.app.router().state("feeds"), Some(SceneState::Inactive));

        h.press(RemoteKey::Green)?;
        h.wait(1200)?;
        assert_eq!(label(&h, "status").as_deref(), Some("Sender wählen"));
        assert_eq!(h.focused_name().as_deref(), Some("news"));
        Ok(())
    }
}
