use std::{
    io::{self, Stderr, Write},
    panic,
    time::{Duration, Instant},
};

use crossterm::{
    ExecutableCommand, QueueableCommand, cursor as ccursor, event as cevent, style, terminal,
};
use scopeguard::guard;
use tracing::error;

use crate::{
    app::App,
    backend::{BackendControl, TerminalSession},
    error::{Error, Result},
    key::{KeyMap, RemoteKey},
};

/// Longest time the runloop blocks on input when no timer is pending.
const IDLE_WAIT: Duration = Duration::from_millis(250);

/// Crossterm-backed implementation of `BackendControl`.
#[derive(Debug)]
pub struct CrosstermControl {
    /// Stderr handle used for control output.
    fp: Stderr,
}

impl CrosstermControl {
    /// Enter alternate screen and raw mode.
    fn enter(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        self.fp.execute(terminal::EnterAlternateScreen)?;
        self.fp.execute(ccursor::Hide)?;
        Ok(())
    }

    /// Leave alternate screen and restore terminal state.
    fn exit(&mut self) -> io::Result<()> {
        self.fp.execute(terminal::LeaveAlternateScreen)?;
        self.fp.execute(ccursor::Show)?;
        terminal::disable_raw_mode()?;
        Ok(())
    }
}

impl Default for CrosstermControl {
    fn default() -> Self {
        Self { fp: io::stderr() }
    }
}

impl BackendControl for CrosstermControl {
    fn start(&mut self) -> Result<()> {
        Ok(self.enter()?)
    }

    fn stop(&mut self) -> Result<()> {
        Ok(self.exit()?)
    }
}

/// Translate a terminal key press into a raw remote code. Keys are resolved
/// through the key map, so remapped codes still line up: arrows, enter,
/// backspace (back), escape (exit), F1-F4 (colour keys) and digits map to
/// their remote keys, other printable characters to their code points.
pub fn translate_key(k: &cevent::KeyEvent, keys: &KeyMap) -> Option<u32> {
    let remote = match k.code {
        cevent::KeyCode::Left => RemoteKey::Left,
        cevent::KeyCode::Right => RemoteKey::Right,
        cevent::KeyCode::Up => RemoteKey::Up,
        cevent::KeyCode::Down => RemoteKey::Down,
        cevent::KeyCode::Enter => RemoteKey::Enter,
        cevent::KeyCode::Backspace => RemoteKey::Return,
        cevent::KeyCode::Esc => RemoteKey::Exit,
        cevent::KeyCode::F(1) => RemoteKey::Red,
        cevent::KeyCode::F(2) => RemoteKey::Green,
        cevent::KeyCode::F(3) => RemoteKey::Yellow,
        cevent::KeyCode::F(4) => RemoteKey::Blue,
        cevent::KeyCode::Char(c) => match c.to_digit(10) {
            Some(d) => RemoteKey::Digit(d as u8),
            None => return Some(u32::from(c)),
        },
        _ => return None,
    };
    keys.code_for(remote)
}

/// Is this Ctrl+C?
fn is_ctrl_c(k: &cevent::KeyEvent) -> bool {
    k.code == cevent::KeyCode::Char('c') && k.modifiers.contains(cevent::KeyModifiers::CONTROL)
}

/// Clear the screen and draw the active scene outline.
fn draw(fp: &mut Stderr, app: &App) -> Result<()> {
    let outline = app.dump(true)?;
    fp.queue(terminal::Clear(terminal::ClearType::All))?;
    fp.queue(ccursor::MoveTo(0, 0))?;
    if let Some(scene) = app.router().current() {
        fp.queue(style::Print(format!("[{scene}]\r\n")))?;
    }
    for line in outline.lines() {
        fp.queue(style::Print(line))?;
        fp.queue(style::Print("\r\n"))?;
    }
    fp.flush()?;
    Ok(())
}

/// Restore the terminal and report an error together with the scene outline.
fn fail(e: Error, app: &App, session: &mut TerminalSession) -> Error {
    drop(session.stop());
    eprintln!("Error: {e}");
    match app.dump(false) {
        Ok(outline) => eprintln!("\nScene outline:\n{outline}"),
        Err(dump_err) => eprintln!("Failed to dump scene: {dump_err}"),
    }
    e
}

/// Ctrl+C handling policy for the crossterm runloop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlCBehavior {
    /// Stop the runloop with status 130.
    Exit,
    /// Dump the active scene and stop the runloop with status 130.
    DumpTreeAndExit,
}

/// Options for configuring the crossterm runloop behavior.
#[derive(Debug, Clone, Copy)]
pub struct RunloopOptions {
    /// Install a panic hook that restores the terminal before the panic
    /// message is printed.
    pub install_panic_hook: bool,
    /// Configure how Ctrl+C is handled.
    pub ctrl_c: CtrlCBehavior,
}

impl RunloopOptions {
    /// Construct options that dump the active scene before exiting on Ctrl+C.
    pub fn ctrlc_dump() -> Self {
        Self {
            ctrl_c: CtrlCBehavior::DumpTreeAndExit,
            ..Self::default()
        }
    }
}

impl Default for RunloopOptions {
    fn default() -> Self {
        Self {
            install_panic_hook: true,
            ctrl_c: CtrlCBehavior::Exit,
        }
    }
}

/// Run the event loop using the crossterm backend.
pub fn runloop(app: App) -> Result<i32> {
    runloop_with_options(app, RunloopOptions::default())
}

/// Run the event loop using the crossterm backend with custom options.
///
/// Between key presses the loop sleeps until the scheduler's next timer is
/// due, then advances the scheduler clock by the real time that passed.
/// Returns the process exit status once the application asks to exit.
pub fn runloop_with_options(mut app: App, options: RunloopOptions) -> Result<i32> {
    let mut session = TerminalSession::new(Box::new(CrosstermControl::default()))?;
    let mut fp = io::stderr();

    let _panic_hook = if options.install_panic_hook {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(|pi| {
            let mut stderr = io::stderr();
            #[allow(unused_must_use, reason = "best effort while panicking")]
            {
                crossterm::execute!(stderr, terminal::LeaveAlternateScreen, ccursor::Show);
                terminal::disable_raw_mode();
            }
            eprintln!("{pi}");
        }));
        Some(guard(previous, |hook| {
            panic::set_hook(hook);
        }))
    } else {
        None
    };

    if let Err(e) = app.tick().and_then(|_| draw(&mut fp, &app)) {
        return Err(fail(e, &app, &mut session));
    }

    loop {
        if app.exit_requested() {
            session.stop()?;
            return Ok(0);
        }
        let wait = app.next_wait().map_or(IDLE_WAIT, |w| w.min(IDLE_WAIT));
        let started = Instant::now();
        if cevent::poll(wait)?
            && let cevent::Event::Key(k) = cevent::read()?
            && k.kind == cevent::KeyEventKind::Press
        {
            if is_ctrl_c(&k) {
                drop(session.stop());
                if options.ctrl_c == CtrlCBehavior::DumpTreeAndExit {
                    eprintln!("\nCtrl+C pressed - scene outline:");
                    match app.dump(false) {
                        Ok(outline) => eprintln!("{outline}"),
                        Err(dump_err) => eprintln!("Failed to dump scene: {dump_err}"),
                    }
                }
                return Ok(130);
            }
            if let Some(code) = translate_key(&k, app.keys().keys())
                && let Err(e) = app.handle_key(code)
            {
                error!("key {code}: {e}");
                return Err(fail(e, &app, &mut session));
            }
        }
        if let Err(e) = app
            .advance(started.elapsed())
            .and_then(|_| draw(&mut fp, &app))
        {
            return Err(fail(e, &app, &mut session));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A plain key press.
    fn press(code: cevent::KeyCode) -> cevent::KeyEvent {
        cevent::KeyEvent::new(code, cevent::KeyModifiers::NONE)
    }

    #[test]
    fn keys_follow_the_map() {
        let defaults = KeyMap::default();
        assert_eq!(translate_key(&press(cevent::KeyCode::Left), &defaults), Some(37));
        assert_eq!(translate_key(&press(cevent::KeyCode::Backspace), &defaults), Some(8));
        assert_eq!(translate_key(&press(cevent::KeyCode::Char('7')), &defaults), Some(55));
        assert_eq!(translate_key(&press(cevent::KeyCode::Char('x')), &defaults), Some(120));
        assert_eq!(translate_key(&press(cevent::KeyCode::F(1)), &defaults), Some(403));
        assert_eq!(translate_key(&press(cevent::KeyCode::Tab), &defaults), None);

        let mut custom = KeyMap::empty();
        custom.bind(1001, RemoteKey::Enter);
        assert_eq!(translate_key(&press(cevent::KeyCode::Enter), &custom), Some(1001));
        assert_eq!(translate_key(&press(cevent::KeyCode::Up), &custom), None);
        assert!(is_ctrl_c(&cevent::KeyEvent::new(
            cevent::KeyCode::Char('c'),
            cevent::KeyModifiers::CONTROL
        )));
    }
}
