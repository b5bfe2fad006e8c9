use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Send a command to a running split-hud. Bind `advance` and `reset` to
/// keys (or pedal buttons) in your compositor.
#[derive(Parser)]
#[command(name = "split-hud-ctl", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the run, or split the current segment
    Advance,
    /// Save the splits and clear the board
    Reset,
    /// Toggle overlay visibility
    Toggle,
    /// Toggle overlay focus/interactivity
    Focus,
    /// Set the theme
    Theme {
        #[arg(value_enum)]
        mode: ThemeArg,
    },
    /// Flip between dark and light without changing the theme mode
    ThemeToggle,
    /// Toggle the panel backdrop
    BgToggle,
    /// Move the overlay to another output
    Screen { output: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Dark,
    Light,
    Auto,
}

impl Command {
    fn line(&self) -> String {
        match self {
            Command::Advance => "advance".to_string(),
            Command::Reset => "reset".to_string(),
            Command::Toggle => "toggle".to_string(),
            Command::Focus => "focus".to_string(),
            Command::Theme { mode } => {
                let name = match mode {
                    ThemeArg::Dark => "dark",
                    ThemeArg::Light => "light",
                    ThemeArg::Auto => "auto",
                };
                format!("theme {name}")
            }
            Command::ThemeToggle => "theme-toggle".to_string(),
            Command::BgToggle => "bg-toggle".to_string(),
            Command::Screen { output } => format!("screen {output}"),
        }
    }
}

fn socket_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join("split-hud.sock")
}

fn main() {
    let cli = Cli::parse();
    let line = cli.command.line();

    let path = socket_path();
    let mut stream = match UnixStream::connect(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("split-hud not running ({path:?}): {e}");
            process::exit(1);
        }
    };

    if let Err(e) = writeln!(stream, "{line}") {
        eprintln!("failed to send command: {e}");
        process::exit(1);
    }
}
