use std::mem;

use slotmap::SlotMap;

use crate::{
    error::{Error, Result},
    id::ElementId,
};

/// What an element is. Only buttons and inputs take focus by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// A grouping element, such as a scene root or a menu.
    Container,
    /// A focusable control that reacts to enter.
    Button,
    /// Static text.
    Text,
    /// A text entry field.
    Input {
        /// Current contents.
        value: String,
        /// When set, the field is edited through a device keyboard and digit
        /// keys are not appended by the focus manager.
        keyboard_driven: bool,
    },
}

/// A node in the element tree.
#[derive(Debug, Clone)]
pub struct Element {
    /// Element name, used for lookup by [`Target::Name`].
    pub(crate) name: String,
    /// Element kind.
    pub(crate) kind: ElementKind,
    /// Display label.
    pub(crate) label: String,
    /// Application defined action tag, read by scenes on enter and click.
    pub(crate) action: Option<String>,
    /// Parent in the arena tree.
    pub(crate) parent: Option<ElementId>,
    /// Children in the arena tree.
    pub(crate) children: Vec<ElementId>,
    /// Hidden elements and their subtrees are skipped by lookups.
    pub(crate) hidden: bool,
    /// Can this element hold focus?
    pub(crate) focusable: bool,
    /// Focus marker, the visual "this is focused" state.
    pub(crate) marked: bool,
    /// Native text-entry focus.
    pub(crate) input_focus: bool,
}

impl Element {
    /// Construct a detached element.
    fn new(name: &str, kind: ElementKind) -> Self {
        let focusable = matches!(kind, ElementKind::Button | ElementKind::Input { .. });
        Self {
            name: name.to_string(),
            kind,
            label: String::new(),
            action: None,
            parent: None,
            children: Vec::new(),
            hidden: false,
            focusable,
            marked: false,
            input_focus: false,
        }
    }

    /// Element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element kind.
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Action tag.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Parent element.
    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Child elements in order.
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// Is the element itself hidden?
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Can the element take focus?
    pub fn is_focusable(&self) -> bool {
        self.focusable
    }

    /// Does the element carry the focus marker?
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Does the element hold native text-entry focus?
    pub fn has_input_focus(&self) -> bool {
        self.input_focus
    }

    /// The contents of an input, or `None` for other kinds.
    pub fn value(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Input { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Something that can be resolved to at most one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A specific element.
    Element(ElementId),
    /// The first visible element with this name, anywhere in the tree.
    Name(String),
    /// The first visible element with this name under a container.
    NameIn(ElementId, String),
    /// The first visible focusable element under a container.
    FirstFocusable(ElementId),
}

impl From<ElementId> for Target {
    fn from(id: ElementId) -> Self {
        Self::Element(id)
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// The rendering collaborator as seen by the focus manager.
pub trait Surface {
    /// Resolve a target to a visible element.
    fn resolve(&self, target: &Target) -> Option<ElementId>;

    /// Set or clear the focus marker.
    fn set_focus_marker(&mut self, el: ElementId, on: bool);

    /// Is the element a text input?
    fn is_text_input(&self, el: ElementId) -> bool;

    /// Is the element a text input edited through a device keyboard?
    fn is_keyboard_driven(&self, el: ElementId) -> bool;

    /// Give the element native text-entry focus.
    fn request_input_focus(&mut self, el: ElementId);

    /// Take native text-entry focus away from the element.
    fn release_input_focus(&mut self, el: ElementId);

    /// Append a character to a text input. Returns `false` for other kinds.
    fn append_char(&mut self, el: ElementId, c: char) -> bool;

    /// Is `el` the container itself or one of its descendants?
    fn contains(&self, container: ElementId, el: ElementId) -> bool;
}

/// An arena of elements rooted at a single container.
#[derive(Debug)]
pub struct Tree {
    /// Element storage.
    elements: SlotMap<ElementId, Element>,
    /// The root container.
    root: ElementId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Construct a tree holding only a root container named `root`.
    pub fn new() -> Self {
        let mut elements = SlotMap::with_key();
        let root = elements.insert(Element::new("root", ElementKind::Container));
        Self { elements, root }
    }

    /// The root container.
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Number of elements, including the root.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// A tree always holds its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Look up an element.
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Look up an element, failing if it does not exist.
    pub fn element(&self, id: ElementId) -> Result<&Element> {
        self.elements.get(id).ok_or(Error::ElementNotFound(id))
    }

    /// Mutable element lookup.
    fn element_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        self.elements.get_mut(id).ok_or(Error::ElementNotFound(id))
    }

    /// Append a new element to `parent`.
    pub fn add(&mut self, parent: ElementId, name: &str, kind: ElementKind) -> Result<ElementId> {
        if !self.elements.contains_key(parent) {
            return Err(Error::ElementNotFound(parent));
        }
        let mut element = Element::new(name, kind);
        element.parent = Some(parent);
        let id = self.elements.insert(element);
        self.element_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Append a container.
    pub fn add_container(&mut self, parent: ElementId, name: &str) -> Result<ElementId> {
        self.add(parent, name, ElementKind::Container)
    }

    /// Append a labelled button.
    pub fn add_button(&mut self, parent: ElementId, name: &str, label: &str) -> Result<ElementId> {
        let id = self.add(parent, name, ElementKind::Button)?;
        self.set_label(id, label)?;
        Ok(id)
    }

    /// Append a text element.
    pub fn add_text(&mut self, parent: ElementId, name: &str, label: &str) -> Result<ElementId> {
        let id = self.add(parent, name, ElementKind::Text)?;
        self.set_label(id, label)?;
        Ok(id)
    }

    /// Append an empty text input.
    pub fn add_input(
        &mut self,
        parent: ElementId,
        name: &str,
        keyboard_driven: bool,
    ) -> Result<ElementId> {
        self.add(
            parent,
            name,
            ElementKind::Input {
                value: String::new(),
                keyboard_driven,
            },
        )
    }

    /// Remove all descendants of `id`.
    pub fn clear_children(&mut self, id: ElementId) -> Result<()> {
        let children = mem::take(&mut self.element_mut(id)?.children);
        let mut stack = children;
        while let Some(child) = stack.pop() {
            if let Some(el) = self.elements.remove(child) {
                stack.extend(el.children);
            }
        }
        Ok(())
    }

    /// Show or hide an element and its subtree.
    pub fn set_hidden(&mut self, id: ElementId, hidden: bool) -> Result<()> {
        self.element_mut(id)?.hidden = hidden;
        Ok(())
    }

    /// Set the display label.
    pub fn set_label(&mut self, id: ElementId, label: &str) -> Result<()> {
        self.element_mut(id)?.label = label.to_string();
        Ok(())
    }

    /// Set the action tag.
    pub fn set_action(&mut self, id: ElementId, action: &str) -> Result<()> {
        self.element_mut(id)?.action = Some(action.to_string());
        Ok(())
    }

    /// Allow or forbid focus.
    pub fn set_focusable(&mut self, id: ElementId, focusable: bool) -> Result<()> {
        self.element_mut(id)?.focusable = focusable;
        Ok(())
    }

    /// Replace the contents of an input.
    pub fn set_value(&mut self, id: ElementId, text: &str) -> Result<()> {
        match &mut self.element_mut(id)?.kind {
            ElementKind::Input { value, .. } => {
                *value = text.to_string();
                Ok(())
            }
            _ => Err(Error::Internal(format!("{id:?} is not an input"))),
        }
    }

    /// Pre-order ids under `root`, including `root`. Hidden subtrees are
    /// skipped when `visible_only` is set.
    fn walk(&self, root: ElementId, visible_only: bool) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(el) = self.elements.get(id) else {
                continue;
            };
            if visible_only && el.hidden {
                continue;
            }
            out.push(id);
            stack.extend(el.children.iter().rev());
        }
        out
    }

    /// First element named `name` under `root` in pre-order, hidden or not.
    pub fn find(&self, root: ElementId, name: &str) -> Option<ElementId> {
        self.walk(root, false)
            .into_iter()
            .find(|id| self.elements[*id].name == name)
    }

    /// First visible element named `name` under `root`.
    fn visible_named(&self, root: ElementId, name: &str) -> Option<ElementId> {
        if !self.is_visible(root) {
            return None;
        }
        self.walk(root, true)
            .into_iter()
            .find(|id| self.elements[*id].name == name)
    }

    /// Visible focusable elements under `container`, in pre-order.
    pub fn focusables(&self, container: ElementId) -> Vec<ElementId> {
        if !self.is_visible(container) {
            return Vec::new();
        }
        self.walk(container, true)
            .into_iter()
            .filter(|id| self.elements[*id].focusable)
            .collect()
    }

    /// First visible focusable element under `container`.
    pub fn first_focusable(&self, container: ElementId) -> Option<ElementId> {
        self.focusables(container).into_iter().next()
    }

    /// Is `el` equal to or below `ancestor`?
    pub fn is_descendant(&self, el: ElementId, ancestor: ElementId) -> bool {
        let mut current = Some(el);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.elements.get(id).and_then(|e| e.parent);
        }
        false
    }

    /// Does the element exist with no hidden element on its path to the root?
    pub fn is_visible(&self, el: ElementId) -> bool {
        let mut current = Some(el);
        while let Some(id) = current {
            match self.elements.get(id) {
                Some(e) if !e.hidden => current = e.parent,
                _ => return false,
            }
        }
        true
    }

    /// The input behind `el`, if it is one.
    fn input_mut(&mut self, el: ElementId) -> Option<&mut String> {
        match &mut self.elements.get_mut(el)?.kind {
            ElementKind::Input { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl Surface for Tree {
    fn resolve(&self, target: &Target) -> Option<ElementId> {
        let found = match target {
            Target::Element(id) => Some(*id),
            Target::Name(name) => self.visible_named(self.root, name),
            Target::NameIn(container, name) => self.visible_named(*container, name),
            Target::FirstFocusable(container) => self.first_focusable(*container),
        };
        found.filter(|id| self.is_visible(*id))
    }

    fn set_focus_marker(&mut self, el: ElementId, on: bool) {
        if let Some(e) = self.elements.get_mut(el) {
            e.marked = on;
        }
    }

    fn is_text_input(&self, el: ElementId) -> bool {
        matches!(
            self.elements.get(el).map(|e| &e.kind),
            Some(ElementKind::Input { .. })
        )
    }

    fn is_keyboard_driven(&self, el: ElementId) -> bool {
        matches!(
            self.elements.get(el).map(|e| &e.kind),
            Some(ElementKind::Input {
                keyboard_driven: true,
                ..
            })
        )
    }

    fn request_input_focus(&mut self, el: ElementId) {
        if let Some(e) = self.elements.get_mut(el) {
            e.input_focus = true;
        }
    }

    fn release_input_focus(&mut self, el: ElementId) {
        if let Some(e) = self.elements.get_mut(el) {
            e.input_focus = false;
        }
    }

    fn append_char(&mut self, el: ElementId, c: char) -> bool {
        match self.input_mut(el) {
            Some(value) => {
                value.push(c);
                true
            }
            None => false,
        }
    }

    fn contains(&self, container: ElementId, el: ElementId) -> bool {
        self.is_descendant(el, container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root > menu(a, hidden(b), c) + input
    fn sample() -> Result<(Tree, ElementId, [ElementId; 4])> {
        let mut t = Tree::new();
        let menu = t.add_container(t.root(), "menu")?;
        let a = t.add_button(menu, "a", "A")?;
        let shelf = t.add_container(menu, "shelf")?;
        let b = t.add_button(shelf, "b", "B")?;
        t.set_hidden(shelf, true)?;
        let c = t.add_button(menu, "c", "C")?;
        let input = t.add_input(t.root(), "pin", false)?;
        Ok((t, menu, [a, b, c, input]))
    }

    #[test]
    fn lookups_skip_hidden() -> Result<()> {
        let (t, menu, [a, b, c, input]) = sample()?;
        assert_eq!(t.focusables(t.root()), vec![a, c, input]);
        assert_eq!(t.first_focusable(menu), Some(a));
        assert_eq!(t.find(menu, "b"), Some(b));
        assert_eq!(t.resolve(&Target::Name("b".into())), None);
        assert_eq!(t.resolve(&Target::Element(b)), None);
        assert_eq!(t.resolve(&"c".into()), Some(c));
        assert_eq!(t.resolve(&Target::NameIn(menu, "pin".into())), None);
        assert!(t.contains(menu, b));
        assert!(!t.contains(menu, input));
        Ok(())
    }

    #[test]
    fn inputs() -> Result<()> {
        let (mut t, _, [a, _, _, input]) = sample()?;
        assert!(t.is_text_input(input));
        assert!(!t.is_keyboard_driven(input));
        assert!(t.append_char(input, '4'));
        assert!(!t.append_char(a, '4'));
        t.set_value(input, "12")?;
        assert!(t.append_char(input, '3'));
        assert_eq!(t.element(input)?.value(), Some("123"));
        assert!(t.set_value(a, "x").is_err());
        Ok(())
    }

    #[test]
    fn clear_children() -> Result<()> {
        let (mut t, menu, [a, b, ..]) = sample()?;
        let before = t.len();
        t.clear_children(menu)?;
        assert_eq!(t.len(), before - 4);
        assert!(t.get(a).is_none());
        assert!(t.get(b).is_none());
        assert!(t.element(menu)?.children().is_empty());
        Ok(())
    }
}
