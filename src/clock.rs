use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Source of "now" for the run state machine.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Handle to a periodic background tick thread.
///
/// The thread sleeps until the next deadline or until a stop signal arrives,
/// whichever comes first. Stopping is a single-slot, non-blocking send, so it
/// can be requested any number of times from anywhere. Dropping the handle
/// stops the thread and joins it: once `drop` returns, `on_tick` will not be
/// called again.
pub struct Ticker {
    stop_tx: SyncSender<()>,
    thread: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn a ticker firing every `interval`. `on_tick` receives the tick
    /// instant and returns `false` once nobody is listening anymore.
    pub fn spawn<F>(interval: Duration, mut on_tick: F) -> io::Result<Self>
    where
        F: FnMut(Instant) -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::sync_channel::<()>(1);
        let thread = thread::Builder::new()
            .name("split-ticker".to_string())
            .spawn(move || {
                let mut deadline = Instant::now() + interval;
                loop {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            let now = Instant::now();
                            if !on_tick(now) {
                                break;
                            }
                            // Skip missed deadlines instead of bursting to catch up.
                            deadline += interval;
                            if deadline < now {
                                deadline = now + interval;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("ticker thread exiting");
            })?;
        Ok(Self {
            stop_tx,
            thread: Some(thread),
        })
    }

    /// Request the thread to stop. Never blocks; repeated calls are no-ops.
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(());
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("ticker thread panicked");
            }
        }
    }
}

/// Produces the ticker for a newly started run. Ticks must be tagged with
/// `run` so that the state machine can drop ticks from an earlier run.
pub trait TickSpawner {
    fn spawn(&mut self, run: u64) -> Option<Ticker>;
}

impl<F> TickSpawner for F
where
    F: FnMut(u64) -> Option<Ticker>,
{
    fn spawn(&mut self, run: u64) -> Option<Ticker> {
        self(run)
    }
}
