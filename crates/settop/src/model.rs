//! Observable attribute maps.
//!
//! A [`Model`] stores JSON attributes and announces every change on its
//! hub, first as `change:<attr>` and then as `change`. Specific attributes can
//! be routed through an [`Accessor`] table: a getter computes the value on
//! read, a setter normalizes it before it is stored.

use std::{cell::RefCell, fmt};

use serde_json::{Map, Value};
use tracing::trace;

use crate::event::{EventHub, Observable};

/// Triggered after any attribute changes.
pub const CHANGE: &str = "change";

/// The per-attribute change event name.
pub fn change_event(attr: &str) -> String {
    format!("{CHANGE}:{attr}")
}

/// Arguments for model change events.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelChange {
    /// The attribute that changed.
    pub attr: String,
    /// The stored value.
    pub value: Value,
    /// The value before the change.
    pub previous: Option<Value>,
}

/// Getter and setter hooks for one named attribute.
#[derive(Debug, Clone, Copy)]
pub struct Accessor {
    /// Attribute name.
    pub name: &'static str,
    /// Compute the value from the stored attributes.
    pub get: Option<fn(&Map<String, Value>) -> Option<Value>>,
    /// Transform a value before it is stored.
    pub set: Option<fn(Value) -> Value>,
}

/// An attribute map with change notification.
pub struct Model {
    /// Stored attributes.
    attrs: RefCell<Map<String, Value>>,
    /// Hooks, matched by attribute name.
    accessors: &'static [Accessor],
    /// Change events.
    events: EventHub<ModelChange>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("attrs", &self.attrs.borrow())
            .finish()
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl Observable<ModelChange> for Model {
    fn events(&self) -> &EventHub<ModelChange> {
        &self.events
    }
}

impl Model {
    /// Construct an empty model with an accessor table.
    pub fn new(accessors: &'static [Accessor]) -> Self {
        Self {
            attrs: RefCell::new(Map::new()),
            accessors,
            events: EventHub::new(),
        }
    }

    /// The accessor registered for `attr`.
    fn accessor(&self, attr: &str) -> Option<&'static Accessor> {
        self.accessors.iter().find(|a| a.name == attr)
    }

    /// Read an attribute, through its getter if one is registered.
    pub fn get(&self, attr: &str) -> Option<Value> {
        let attrs = self.attrs.borrow();
        match self.accessor(attr).and_then(|a| a.get) {
            Some(get) => get(&attrs),
            None => attrs.get(attr).cloned(),
        }
    }

    /// Is a value stored for `attr`?
    pub fn has(&self, attr: &str) -> bool {
        self.attrs.borrow().contains_key(attr)
    }

    /// Store an attribute, through its setter if one is registered. Change
    /// events fire only when the stored value actually changes. Returns
    /// whether it changed.
    pub fn set(&self, attr: &str, value: impl Into<Value>) -> bool {
        let mut value = value.into();
        if let Some(set) = self.accessor(attr).and_then(|a| a.set) {
            value = set(value);
        }
        let previous = {
            let mut attrs = self.attrs.borrow_mut();
            if attrs.get(attr) == Some(&value) {
                return false;
            }
            attrs.insert(attr.to_string(), value.clone())
        };
        trace!("model {attr} = {value}");
        let change = ModelChange {
            attr: attr.to_string(),
            value,
            previous,
        };
        self.events.trigger(&change_event(attr), &change);
        self.events.trigger(CHANGE, &change);
        true
    }

    /// A copy of every stored attribute.
    pub fn to_json(&self) -> Value {
        Value::Object(self.attrs.borrow().clone())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::event::Signal;

    /// Languages are stored lower case; `title` is derived.
    static HOOKS: &[Accessor] = &[
        Accessor {
            name: "lang",
            get: None,
            set: Some(|v| match v {
                Value::String(s) => Value::String(s.to_lowercase()),
                other => other,
            }),
        },
        Accessor {
            name: "title",
            get: Some(|attrs| {
                let name = attrs.get("name")?.as_str()?;
                Some(Value::String(format!("{name}!")))
            }),
            set: None,
        },
    ];

    #[test]
    fn hooks_and_events() {
        let m = Model::new(HOOKS);
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        m.on(&change_event("lang"), move |s: &Signal<'_, ModelChange>| {
            l.borrow_mut().push(format!("{}={}", s.name(), s.args().value));
        });
        let l = log.clone();
        m.on(CHANGE, move |s: &Signal<'_, ModelChange>| {
            l.borrow_mut().push(format!("change {}", s.args().attr));
        });

        assert!(m.set("lang", "EN"));
        assert_eq!(m.get("lang"), Some(json!("en")));
        assert!(!m.set("lang", "en"));
        assert_eq!(*log.borrow(), vec!["change:lang=\"en\"", "change lang"]);

        assert_eq!(m.get("title"), None);
        m.set("name", "Kino");
        assert_eq!(m.get("title"), Some(json!("Kino!")));
        assert!(!m.has("title"));
        assert_eq!(m.to_json(), json!({"lang": "en", "name": "Kino"}));
    }
}
