use std::io::{self, BufRead};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use futures::channel::mpsc;

use crate::app::Message;
use crate::clock::{TickSpawner, Ticker};
use crate::theme::ThemeMode;

static CONTROL_SOCKET: OnceLock<UnixListener> = OnceLock::new();

/// How long a connected client gets to send its command line.
const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(1);

pub(crate) fn socket_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join("split-hud.sock")
}

/// Bind the control socket before the overlay starts. Without it neither
/// advance nor reset can ever arrive, so the caller treats failure as fatal.
pub(crate) fn bind_control_socket() -> io::Result<PathBuf> {
    let path = socket_path();
    let listener = bind_at(&path)?;
    CONTROL_SOCKET
        .set(listener)
        .map_err(|_| io::Error::new(io::ErrorKind::AlreadyExists, "control socket bound twice"))?;
    Ok(path)
}

/// Bind a listener at `path`. A socket someone still answers on is
/// `AddrInUse`; a leftover file from a dead process is replaced.
fn bind_at(path: &Path) -> io::Result<UnixListener> {
    if UnixStream::connect(path).is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AddrInUse,
            format!("another split-hud is already listening on {path:?}"),
        ));
    }
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("removed stale socket {path:?}"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    UnixListener::bind(path)
}

/// Map one control line to a message.
pub(crate) fn parse_command(line: &str) -> Option<Message> {
    match line.trim() {
        "advance" => Some(Message::Advance),
        "reset" => Some(Message::Reset),
        "toggle" => Some(Message::ToggleVisibility),
        "focus" => Some(Message::ToggleFocus),
        "theme-toggle" => Some(Message::ThemeToggle),
        "bg-toggle" => Some(Message::BackdropToggle),
        cmd if cmd.starts_with("theme ") => {
            ThemeMode::from_name(&cmd[6..]).map(Message::ThemeSet)
        }
        cmd if cmd.starts_with("screen ") => {
            let name = cmd[7..].trim();
            (!name.is_empty()).then(|| Message::ScreenSet(name.to_string()))
        }
        _ => None,
    }
}

/// Commands from `split-hud-ctl`, in arrival order. The first item hands the
/// app a sender into this same stream so tickers can feed the one event loop.
pub(crate) fn control_stream() -> impl futures::Stream<Item = Message> {
    let (tx, rx) = mpsc::unbounded();
    let _ = tx.unbounded_send(Message::ControlReady(tx.clone()));

    let listener = match CONTROL_SOCKET.get().map(UnixListener::try_clone) {
        Some(Ok(l)) => l,
        Some(Err(e)) => {
            tracing::error!("failed to clone control socket: {e}");
            return rx;
        }
        None => {
            tracing::error!("control socket was never bound");
            return rx;
        }
    };

    std::thread::spawn(move || serve(listener, tx));
    rx
}

/// Accept loop: one command line per connection. A client that keeps its
/// connection open or never sends a newline costs at most
/// `CLIENT_READ_TIMEOUT`, never the commands of the clients behind it.
fn serve(listener: UnixListener, tx: mpsc::UnboundedSender<Message>) {
    for stream in listener.incoming().flatten() {
        if let Err(e) = stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT)) {
            tracing::warn!("control client without read timeout: {e}");
        }
        let mut line = String::new();
        if let Err(e) = io::BufReader::new(stream).read_line(&mut line) {
            tracing::warn!("dropping control client: {e}");
            continue;
        }
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        let Some(msg) = parse_command(command) else {
            tracing::warn!("unknown command: {command:?}");
            continue;
        };
        tracing::debug!("command: {command}");
        if tx.unbounded_send(msg).is_err() {
            return;
        }
    }
}

/// Spawns one ticker per run, delivering `Message::Tick(run)` into the
/// control stream.
pub(crate) struct MessageTicks {
    interval: Duration,
    tx: Option<mpsc::UnboundedSender<Message>>,
}

impl MessageTicks {
    pub(crate) fn new(interval: Duration) -> Self {
        Self { interval, tx: None }
    }

    pub(crate) fn attach(&mut self, tx: mpsc::UnboundedSender<Message>) {
        self.tx = Some(tx);
    }
}

impl TickSpawner for MessageTicks {
    fn spawn(&mut self, run: u64) -> Option<Ticker> {
        let tx = self.tx.clone()?;
        match Ticker::spawn(self.interval, move |_| {
            tx.unbounded_send(Message::Tick(run)).is_ok()
        }) {
            Ok(ticker) => Some(ticker),
            Err(e) => {
                tracing::warn!("failed to spawn ticker: {e}");
                None
            }
        }
    }
}

pub(crate) fn theme_refresh_stream() -> impl futures::Stream<Item = Message> {
    let (tx, rx) = mpsc::unbounded();
    std::thread::spawn(move || loop {
        std::thread::sleep(Duration::from_secs(5));
        if tx.unbounded_send(Message::ThemeRefresh).is_err() {
            break;
        }
    });
    rx
}
