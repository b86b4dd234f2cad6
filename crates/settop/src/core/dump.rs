use std::io::Write;

use termcolor::{Buffer, Color, ColorSpec, WriteColor};

use crate::{
    error::Result,
    id::ElementId,
    tree::{ElementKind, Tree},
};

/// Render the subtree at `root` as an indented outline showing each element's
/// name, label, input value and focus state. Hidden subtrees appear as a
/// single line. With `color` set the output carries ANSI escapes.
pub fn dump(tree: &Tree, root: ElementId, color: bool) -> Result<String> {
    let mut buffer = if color {
        Buffer::ansi()
    } else {
        Buffer::no_color()
    };
    dump_element(&mut buffer, tree, root, 0)?;
    Ok(String::from_utf8_lossy(buffer.as_slice()).into_owned())
}

/// Write `text` in a single colour.
fn colored(buffer: &mut Buffer, spec: &ColorSpec, text: &str) -> Result<()> {
    buffer.set_color(spec)?;
    write!(buffer, "{text}")?;
    buffer.reset()?;
    Ok(())
}

/// Walk an element subtree and emit one line per element.
fn dump_element(buffer: &mut Buffer, tree: &Tree, id: ElementId, level: usize) -> Result<()> {
    let el = tree.element(id)?;
    let indent = "  ".repeat(level);
    write!(buffer, "{indent}")?;

    let mut name = ColorSpec::new();
    name.set_fg(Some(Color::Cyan));
    if el.is_focusable() {
        name.set_bold(true);
    }
    colored(buffer, &name, el.name())?;

    if !el.label().is_empty() {
        write!(buffer, " {:?}", el.label())?;
    }
    if let ElementKind::Input { value, .. } = el.kind() {
        write!(buffer, " [{value}]")?;
    }

    let mut indicators = Vec::new();
    if el.is_marked() {
        indicators.push(("FOCUSED", Color::Magenta));
    }
    if el.has_input_focus() {
        indicators.push(("editing", Color::Green));
    }
    if el.is_hidden() {
        indicators.push(("hidden", Color::Yellow));
    }
    for (i, (text, color)) in indicators.iter().enumerate() {
        write!(buffer, "{}", if i == 0 { " " } else { ", " })?;
        colored(buffer, ColorSpec::new().set_fg(Some(*color)), text)?;
    }
    writeln!(buffer)?;

    if !el.is_hidden() {
        for child in el.children() {
            dump_element(buffer, tree, *child, level + 1)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Surface;

    #[test]
    fn outline() -> Result<()> {
        let mut t = Tree::new();
        let menu = t.add_container(t.root(), "menu")?;
        let play = t.add_button(menu, "play", "Play")?;
        let pin = t.add_input(menu, "pin", false)?;
        let extra = t.add_container(t.root(), "extra")?;
        t.add_text(extra, "note", "unseen")?;
        t.set_hidden(extra, true)?;
        t.set_focus_marker(play, true);
        t.append_char(pin, '7');

        let out = dump(&t, t.root(), false)?;
        assert_eq!(
            out,
            "root\n  menu\n    play \"Play\" FOCUSED\n    pin [7]\n  extra hidden\n"
        );
        Ok(())
    }
}
