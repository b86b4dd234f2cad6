//! Remote control keys, the raw code map, and the key dispatcher.
//!
//! Devices report keys as numeric codes. A [`KeyMap`] turns those into
//! [`RemoteKey`] values; the built-in table follows the browser convention
//! used by set-top boxes, and a TOML file can extend or replace it:
//!
//! ```toml
//! defaults = true
//!
//! [keys]
//! back = [8, 461]
//! red = 403
//! ```
use std::{cell::Cell, collections::BTreeMap, fmt, fs, path::Path, str::FromStr};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    event::{EventHub, Observable},
};

/// Event triggered on the dispatcher before any routing. Listeners that stop
/// propagation consume the key.
pub const BEFORE_KEY: &str = "beforekey";
/// Event triggered after `beforekey` for keys nobody consumed.
pub const KEY: &str = "key";

/// A navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Up.
    Up,
    /// Down.
    Down,
    /// Left.
    Left,
    /// Right.
    Right,
}

/// A logical remote control key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RemoteKey {
    /// Arrow left.
    Left,
    /// Arrow right.
    Right,
    /// Arrow up.
    Up,
    /// Arrow down.
    Down,
    /// OK.
    Enter,
    /// Back.
    Return,
    /// A number key, 0 to 9.
    Digit(u8),
    /// Red colour key.
    Red,
    /// Green colour key.
    Green,
    /// Yellow colour key.
    Yellow,
    /// Blue colour key.
    Blue,
    /// Play.
    Play,
    /// Pause.
    Pause,
    /// Play/pause toggle.
    PlayPause,
    /// Stop.
    Stop,
    /// Rewind.
    Rewind,
    /// Fast forward.
    FastForward,
    /// Leave the application.
    Exit,
    /// A printable character from a keyboard.
    Char(char),
}

impl RemoteKey {
    /// The direction of an arrow key.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::Left => Some(Direction::Left),
            Self::Right => Some(Direction::Right),
            Self::Up => Some(Direction::Up),
            Self::Down => Some(Direction::Down),
            _ => None,
        }
    }
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Digit(d) => write!(f, "{d}"),
            Self::Char(c) => write!(f, "'{c}'"),
            other => write!(f, "{}", format!("{other:?}").to_lowercase()),
        }
    }
}

impl FromStr for RemoteKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "left" => Self::Left,
            "right" => Self::Right,
            "up" => Self::Up,
            "down" => Self::Down,
            "enter" | "ok" => Self::Enter,
            "return" | "back" => Self::Return,
            "red" => Self::Red,
            "green" => Self::Green,
            "yellow" => Self::Yellow,
            "blue" => Self::Blue,
            "play" => Self::Play,
            "pause" => Self::Pause,
            "play_pause" => Self::PlayPause,
            "stop" => Self::Stop,
            "rewind" => Self::Rewind,
            "fast_forward" => Self::FastForward,
            "exit" => Self::Exit,
            _ => match s.parse::<u8>() {
                Ok(d) if d <= 9 => Self::Digit(d),
                _ => return Err(Error::Config(format!("unknown key name: {s}"))),
            },
        })
    }
}

/// One code or several codes bound to a key name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Codes {
    /// A single code.
    One(u32),
    /// Several codes.
    Many(Vec<u32>),
}

/// On-disk key map format.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyMapFile {
    /// Start from the built-in table.
    #[serde(default = "default_true")]
    defaults: bool,
    /// Key name to code bindings.
    #[serde(default)]
    keys: BTreeMap<String, Codes>,
}

/// Serde default helper.
fn default_true() -> bool {
    true
}

/// Mapping from raw device codes to remote keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    /// Explicit bindings.
    codes: BTreeMap<u32, RemoteKey>,
}

impl Default for KeyMap {
    fn default() -> Self {
        let mut codes = BTreeMap::from([
            (37, RemoteKey::Left),
            (38, RemoteKey::Up),
            (39, RemoteKey::Right),
            (40, RemoteKey::Down),
            (13, RemoteKey::Enter),
            (8, RemoteKey::Return),
            (461, RemoteKey::Return),
            (403, RemoteKey::Red),
            (404, RemoteKey::Green),
            (405, RemoteKey::Yellow),
            (406, RemoteKey::Blue),
            (415, RemoteKey::Play),
            (19, RemoteKey::Pause),
            (463, RemoteKey::PlayPause),
            (413, RemoteKey::Stop),
            (412, RemoteKey::Rewind),
            (417, RemoteKey::FastForward),
            (27, RemoteKey::Exit),
        ]);
        for d in 0..=9u8 {
            codes.insert(48 + u32::from(d), RemoteKey::Digit(d));
        }
        Self { codes }
    }
}

impl KeyMap {
    /// A map with no bindings at all.
    pub fn empty() -> Self {
        Self {
            codes: BTreeMap::new(),
        }
    }

    /// Bind `code` to `key`, replacing any earlier binding of that code.
    pub fn bind(&mut self, code: u32, key: RemoteKey) -> &mut Self {
        self.codes.insert(code, key);
        self
    }

    /// Is `code` explicitly bound?
    pub fn recognized(&self, code: u32) -> bool {
        self.codes.contains_key(&code)
    }

    /// Is `code` bound to a number key?
    pub fn is_numeric(&self, code: u32) -> bool {
        matches!(self.codes.get(&code), Some(RemoteKey::Digit(_)))
    }

    /// Resolve a code. Unbound printable ASCII codes map to [`RemoteKey::Char`].
    pub fn lookup(&self, code: u32) -> Option<RemoteKey> {
        if let Some(key) = self.codes.get(&code) {
            return Some(*key);
        }
        char::from_u32(code)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .map(RemoteKey::Char)
    }

    /// The first code bound to `key`.
    pub fn code_for(&self, key: RemoteKey) -> Option<u32> {
        self.codes
            .iter()
            .find_map(|(code, k)| (*k == key).then_some(*code))
    }

    /// Parse a TOML key map.
    pub fn from_toml(src: &str) -> Result<Self> {
        let file: KeyMapFile = toml::from_str(src)?;
        let mut map = if file.defaults {
            Self::default()
        } else {
            Self::empty()
        };
        for (name, codes) in file.keys {
            let key: RemoteKey = name.parse()?;
            let codes = match codes {
                Codes::One(c) => vec![c],
                Codes::Many(cs) => cs,
            };
            for code in codes {
                map.bind(code, key);
            }
        }
        Ok(map)
    }

    /// Read and parse a TOML key map file.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_toml(&fs::read_to_string(path)?)
    }
}

/// A raw key press as seen by `beforekey` and `key` listeners.
#[derive(Debug)]
pub struct KeyEvent {
    /// Raw device code.
    code: u32,
    /// Mapped key, if any.
    key: Option<RemoteKey>,
    /// Set when a listener has taken over the platform's default handling.
    prevented: Cell<bool>,
}

impl KeyEvent {
    /// Construct an event for a raw code.
    pub fn new(code: u32, key: Option<RemoteKey>) -> Self {
        Self {
            code,
            key,
            prevented: Cell::new(false),
        }
    }

    /// Raw device code.
    pub fn code(&self) -> u32 {
        self.code
    }

    /// Mapped key.
    pub fn key(&self) -> Option<RemoteKey> {
        self.key
    }

    /// Suppress the platform's default handling of this key.
    pub fn prevent_default(&self) {
        self.prevented.set(true);
    }

    /// Has default handling been suppressed?
    pub fn default_prevented(&self) -> bool {
        self.prevented.get()
    }
}

/// Turns raw codes into [`KeyEvent`]s and triggers them on its hub.
#[derive(Debug, Default)]
pub struct KeyDispatcher {
    /// Key listeners.
    events: EventHub<KeyEvent>,
    /// Code table.
    keys: KeyMap,
}

impl Observable<KeyEvent> for KeyDispatcher {
    fn events(&self) -> &EventHub<KeyEvent> {
        &self.events
    }
}

impl KeyDispatcher {
    /// Construct a dispatcher over a key map.
    pub fn new(keys: KeyMap) -> Self {
        Self {
            events: EventHub::new(),
            keys,
        }
    }

    /// The code table.
    pub fn keys(&self) -> &KeyMap {
        &self.keys
    }

    /// Trigger `beforekey`, then `key` if nothing consumed the event. Returns
    /// whether propagation continued, along with the event so the caller can
    /// inspect `default_prevented`.
    pub fn dispatch(&self, code: u32) -> (bool, KeyEvent) {
        let event = KeyEvent::new(code, self.keys.lookup(code));
        let proceed = self.events.trigger(BEFORE_KEY, &event) && self.events.trigger(KEY, &event);
        (proceed, event)
    }
}
