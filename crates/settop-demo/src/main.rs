use std::{fs::File, path::PathBuf, process, sync::Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use settop::{backend::crossterm::runloop, key::KeyMap};
use tracing::{Level, info};

/// Drive a remote-control UI from the terminal. Arrows move focus, Enter is
/// OK, Backspace is back, F1-F4 are the colour keys and Esc exits.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Key map file (TOML)
    #[clap(short, long, value_name = "PATH")]
    keymap: Option<PathBuf>,

    /// Interface language
    #[clap(short, long, default_value = "en")]
    lang: String,

    /// Write debug logs to this file
    #[clap(long, value_name = "PATH")]
    log: Option<PathBuf>,
}

pub fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.log {
        let file = File::create(path)
            .with_context(|| format!("creating log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_max_level(Level::DEBUG)
            .init();
    }

    let keys = match &args.keymap {
        Some(path) => KeyMap::load(path)
            .with_context(|| format!("loading key map {}", path.display()))?,
        None => KeyMap::default(),
    };
    let app = settop_demo::build(keys, &args.lang)?;
    info!("starting in {}", args.lang);
    let code = runloop(app)?;
    process::exit(code)
}
