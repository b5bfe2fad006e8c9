use std::time::{Duration, Instant};

use crate::clock::{Clock, TickSpawner, Ticker};
use crate::display::DisplaySink;
use crate::ledger::{LedgerStore, Segment};
use crate::util::format_hms;

/// Externally visible lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No run in progress; the board is blank or shows prior results.
    Idle,
    /// A run is being timed.
    Running,
    /// The last segment was split. Advance is locked out until a reset.
    AwaitingReset,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Advance,
    Reset,
    /// Periodic refresh, tagged with the run whose ticker produced it.
    Tick { run: u64 },
}

enum RunState {
    Idle,
    Running {
        run: u64,
        started_at: Instant,
        current: usize,
        /// Dropping this stops and joins the tick thread.
        _ticker: Option<Ticker>,
    },
    AwaitingReset,
}

impl RunState {
    fn phase(&self) -> Phase {
        match self {
            RunState::Idle => Phase::Idle,
            RunState::Running { .. } => Phase::Running,
            RunState::AwaitingReset => Phase::AwaitingReset,
        }
    }
}

/// The split timer. All transitions go through [`SplitTimer::handle`], which
/// is expected to be called from a single event loop; tickers only enqueue
/// [`Event::Tick`] for that loop and never touch this state directly.
///
/// The ticker lives inside the `Running` state, so there is never more than
/// one per timer and leaving `Running` always tears it down.
pub struct SplitTimer<C, D, T> {
    clock: C,
    display: D,
    ticks: T,
    store: LedgerStore,
    segments: Vec<Segment>,
    state: RunState,
    runs: u64,
}

impl<C, D, T> SplitTimer<C, D, T>
where
    C: Clock,
    D: DisplaySink,
    T: TickSpawner,
{
    pub fn new(clock: C, display: D, ticks: T, store: LedgerStore, segments: Vec<Segment>) -> Self {
        Self {
            clock,
            display,
            ticks,
            store,
            segments,
            state: RunState::Idle,
            runs: 0,
        }
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Advance => self.advance(),
            Event::Reset => self.reset(),
            Event::Tick { run } => self.tick(run),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Index of the segment being timed; 0 outside of a run.
    pub fn current(&self) -> usize {
        match self.state {
            RunState::Running { current, .. } => current,
            _ => 0,
        }
    }

    /// Number of the active run, if any. Runs are numbered from 1.
    #[cfg(test)]
    pub fn active_run(&self) -> Option<u64> {
        match self.state {
            RunState::Running { run, .. } => Some(run),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn elapsed(&self) -> Option<Duration> {
        match self.state {
            RunState::Running { started_at, .. } => {
                Some(self.clock.now().saturating_duration_since(started_at))
            }
            _ => None,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    #[cfg(test)]
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn ticks_mut(&mut self) -> &mut T {
        &mut self.ticks
    }

    fn advance(&mut self) {
        match self.state {
            RunState::Idle => self.start(),
            RunState::Running { .. } => self.split(),
            RunState::AwaitingReset => {
                tracing::debug!("run finished, ignoring advance until reset");
            }
        }
    }

    fn start(&mut self) {
        if self.segments.is_empty() {
            tracing::warn!("no segments configured, not starting a run");
            return;
        }
        for segment in &mut self.segments {
            segment.time.clear();
        }
        self.display.blank(self.segments.len());

        let started_at = self.clock.now();
        self.runs += 1;
        let run = self.runs;
        let zero = format_hms(Duration::ZERO);
        self.display.set_segment_time(0, &zero);
        self.display.set_total_time(&zero);

        let ticker = self.ticks.spawn(run);
        if ticker.is_none() {
            tracing::warn!(run, "no ticker for this run, live times will not refresh");
        }
        self.state = RunState::Running {
            run,
            started_at,
            current: 0,
            _ticker: ticker,
        };
        tracing::info!(run, segments = self.segments.len(), "Idle -> Running");
    }

    fn split(&mut self) {
        let now = self.clock.now();
        let RunState::Running {
            run,
            started_at,
            ref mut current,
            ..
        } = self.state
        else {
            return;
        };

        let index = *current;
        let text = format_hms(now.saturating_duration_since(started_at));
        self.segments[index].time.clone_from(&text);
        self.display.set_segment_time(index, &text);
        tracing::info!(
            run,
            segment = index,
            label = %self.segments[index].label,
            time = %text,
            "split"
        );

        if index + 1 < self.segments.len() {
            *current = index + 1;
            return;
        }

        self.display.set_total_time(&text);
        // Replacing the state drops the ticker before we return.
        self.state = RunState::AwaitingReset;
        tracing::info!(run, total = %text, "Running -> AwaitingReset");
    }

    fn tick(&mut self, tick_run: u64) {
        match self.state {
            RunState::Running {
                run,
                started_at,
                current,
                ..
            } if run == tick_run => {
                let text = format_hms(self.clock.now().saturating_duration_since(started_at));
                self.display.set_total_time(&text);
                self.display.set_segment_time(current, &text);
            }
            _ => tracing::debug!(run = tick_run, "dropping stale tick"),
        }
    }

    fn reset(&mut self) {
        let from = self.state.phase();
        self.state = RunState::Idle;

        if let Err(e) = self.store.save_segments(&self.segments) {
            tracing::warn!("failed to save splits: {e}");
        }
        self.display.blank(self.segments.len());
        tracing::info!("{from:?} -> Idle");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;
    use crate::display::Board;
    use crate::ledger::Ledger;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::{Arc, mpsc};

    /// Spawner that never produces a thread but counts requests.
    #[derive(Clone, Default)]
    struct CountingTicks {
        spawned: Rc<Cell<u32>>,
    }

    impl TickSpawner for CountingTicks {
        fn spawn(&mut self, _run: u64) -> Option<Ticker> {
            self.spawned.set(self.spawned.get() + 1);
            None
        }
    }

    /// Spawner backed by real ticker threads feeding a channel of run ids.
    struct ChannelTicks {
        interval: Duration,
        tx: mpsc::Sender<u64>,
    }

    impl TickSpawner for ChannelTicks {
        fn spawn(&mut self, run: u64) -> Option<Ticker> {
            let tx = self.tx.clone();
            Ticker::spawn(self.interval, move |_| tx.send(run).is_ok()).ok()
        }
    }

    /// Spawner whose ticker threads each own a clone of `live` until they exit.
    struct TrackedTicks {
        live: Arc<()>,
    }

    impl TickSpawner for TrackedTicks {
        fn spawn(&mut self, _run: u64) -> Option<Ticker> {
            let token = Arc::clone(&self.live);
            Ticker::spawn(Duration::from_secs(60), move |_| {
                let _held = &token;
                true
            })
            .ok()
        }
    }

    /// Board that also counts every write it receives.
    #[derive(Default)]
    struct RecordingSink {
        board: Board,
        writes: usize,
    }

    impl DisplaySink for RecordingSink {
        fn set_segment_time(&mut self, index: usize, text: &str) {
            self.writes += 1;
            self.board.set_segment_time(index, text);
        }

        fn set_total_time(&mut self, text: &str) {
            self.writes += 1;
            self.board.set_total_time(text);
        }
    }

    fn labels(n: usize) -> Vec<Segment> {
        (0..n).map(|i| Segment::new(format!("Level {i}"))).collect()
    }

    fn timer(
        n: usize,
    ) -> (
        SplitTimer<ManualClock, Board, CountingTicks>,
        ManualClock,
        CountingTicks,
        tempfile::TempDir,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new();
        let ticks = CountingTicks::default();
        let t = SplitTimer::new(
            clock.clone(),
            Board::new(n),
            ticks.clone(),
            LedgerStore::new(dir.path().join("splits.json")),
            labels(n),
        );
        (t, clock, ticks, dir)
    }

    fn recorded<C, D, T>(t: &SplitTimer<C, D, T>) -> Vec<&str> {
        t.segments.iter().map(|s| s.time.as_str()).collect()
    }

    #[test]
    fn starts_idle() {
        let (t, _, ticks, _dir) = timer(3);
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(t.current(), 0);
        assert_eq!(t.elapsed(), None);
        assert_eq!(ticks.spawned.get(), 0);
    }

    #[test]
    fn first_advance_starts_the_run() {
        let (mut t, _, ticks, _dir) = timer(3);
        t.handle(Event::Advance);
        assert_eq!(t.phase(), Phase::Running);
        assert_eq!(t.current(), 0);
        assert_eq!(t.active_run(), Some(1));
        assert_eq!(t.elapsed(), Some(Duration::ZERO));
        assert_eq!(ticks.spawned.get(), 1);
        assert_eq!(t.display().segment_times, vec!["00:00:00", "", ""]);
        assert_eq!(t.display().total, "00:00:00");
    }

    #[test]
    fn each_advance_records_one_segment_in_order() {
        let n = 5;
        for k in 0..n {
            let (mut t, clock, _, _dir) = timer(n);
            t.handle(Event::Advance);
            for _ in 0..k {
                clock.advance(Duration::from_secs(10));
                t.handle(Event::Advance);
            }
            assert_eq!(t.phase(), Phase::Running);
            assert_eq!(t.current(), k);
            let times = recorded(&t);
            assert!(times[..k].iter().all(|s| !s.is_empty()), "k={k}");
            assert!(times[k..].iter().all(|s| s.is_empty()), "k={k}");
        }
    }

    #[test]
    fn split_times_are_cumulative_from_run_start() {
        let (mut t, clock, _, _dir) = timer(3);
        t.handle(Event::Advance);
        clock.advance(Duration::from_secs(61));
        t.handle(Event::Advance);
        clock.advance(Duration::from_millis(3600_400));
        t.handle(Event::Advance);
        assert_eq!(recorded(&t), vec!["00:01:01", "01:01:01", ""]);
        assert_eq!(
            t.display().segment_times,
            vec!["00:01:01", "01:01:01", ""]
        );
    }

    #[test]
    fn last_split_finishes_the_run() {
        let (mut t, clock, _, _dir) = timer(3);
        t.handle(Event::Advance);
        for _ in 0..3 {
            clock.advance(Duration::from_secs(20));
            t.handle(Event::Advance);
        }
        assert_eq!(t.phase(), Phase::AwaitingReset);
        assert_eq!(t.current(), 0);
        assert_eq!(t.elapsed(), None);
        assert_eq!(recorded(&t), vec!["00:00:20", "00:00:40", "00:01:00"]);
        assert_eq!(t.display().total, "00:01:00");
    }

    #[test]
    fn advance_after_finish_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new();
        let ticks = CountingTicks::default();
        let mut t = SplitTimer::new(
            clock.clone(),
            RecordingSink {
                board: Board::new(2),
                writes: 0,
            },
            ticks.clone(),
            LedgerStore::new(dir.path().join("splits.json")),
            labels(2),
        );
        for _ in 0..3 {
            clock.advance(Duration::from_secs(5));
            t.handle(Event::Advance);
        }
        assert_eq!(t.phase(), Phase::AwaitingReset);
        let board = t.display().board.clone();
        let writes = t.display().writes;
        let times: Vec<String> = recorded(&t).into_iter().map(String::from).collect();

        clock.advance(Duration::from_secs(5));
        t.handle(Event::Advance);
        t.handle(Event::Advance);

        assert_eq!(t.phase(), Phase::AwaitingReset);
        assert_eq!(t.display().board, board);
        assert_eq!(t.display().writes, writes);
        assert_eq!(recorded(&t), times);
        assert_eq!(ticks.spawned.get(), 1);
    }

    #[test]
    fn tick_refreshes_total_and_current_segment_only_on_display() {
        let (mut t, clock, _, _dir) = timer(3);
        t.handle(Event::Advance);
        clock.advance(Duration::from_secs(30));
        t.handle(Event::Advance);
        clock.advance(Duration::from_secs(15));
        t.handle(Event::Tick { run: 1 });

        assert_eq!(t.display().total, "00:00:45");
        assert_eq!(t.display().segment_times, vec!["00:00:30", "00:00:45", ""]);
        // Live values never become recorded times.
        assert_eq!(recorded(&t), vec!["00:00:30", "", ""]);
    }

    #[test]
    fn stale_and_idle_ticks_are_ignored() {
        let (mut t, clock, _, _dir) = timer(2);
        t.handle(Event::Tick { run: 1 });
        assert_eq!(t.display(), &Board::new(2));

        t.handle(Event::Advance);
        clock.advance(Duration::from_secs(9));
        t.handle(Event::Tick { run: 0 });
        t.handle(Event::Tick { run: 2 });
        assert_eq!(t.display().total, "00:00:00");
    }

    #[test]
    fn reset_from_every_phase_returns_to_idle_and_blanks() {
        for advances in [0, 1, 2, 4] {
            let (mut t, clock, _, _dir) = timer(3);
            for _ in 0..advances {
                clock.advance(Duration::from_secs(3));
                t.handle(Event::Advance);
            }
            t.handle(Event::Reset);
            assert_eq!(t.phase(), Phase::Idle, "advances={advances}");
            assert_eq!(t.current(), 0);
            assert_eq!(t.elapsed(), None);
            assert_eq!(t.display(), &Board::new(3));
        }
    }

    #[test]
    fn reset_mid_run_saves_what_was_recorded() {
        let (mut t, clock, _, _dir) = timer(4);
        t.handle(Event::Advance);
        clock.advance(Duration::from_secs(70));
        t.handle(Event::Advance);
        clock.advance(Duration::from_secs(5));
        t.handle(Event::Tick { run: 1 });
        t.handle(Event::Reset);

        let ledger = t.store().try_load().unwrap();
        assert_eq!(
            ledger.labels().collect::<Vec<_>>(),
            vec!["Level 0", "Level 1", "Level 2", "Level 3"]
        );
        // The live 00:01:15 of segment 1 is not a recorded time.
        assert_eq!(
            ledger.times().collect::<Vec<_>>(),
            vec!["00:01:10", "", "", ""]
        );
    }

    #[test]
    fn reset_after_finish_saves_full_run() {
        let (mut t, clock, _, _dir) = timer(2);
        t.handle(Event::Advance);
        clock.advance(Duration::from_secs(100));
        t.handle(Event::Advance);
        clock.advance(Duration::from_secs(100));
        t.handle(Event::Advance);
        t.handle(Event::Reset);
        let ledger = t.store().try_load().unwrap();
        assert_eq!(
            ledger.times().collect::<Vec<_>>(),
            vec!["00:01:40", "00:03:20"]
        );
    }

    #[test]
    fn double_reset_writes_the_same_ledger() {
        let (mut t, clock, _, _dir) = timer(3);
        t.handle(Event::Advance);
        clock.advance(Duration::from_secs(42));
        t.handle(Event::Advance);

        t.handle(Event::Reset);
        let first = std::fs::read_to_string(t.store().path()).unwrap();
        t.handle(Event::Reset);
        let second = std::fs::read_to_string(t.store().path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(t.phase(), Phase::Idle);
    }

    #[test]
    fn new_run_clears_previous_results() {
        let (mut t, clock, ticks, _dir) = timer(2);
        for _ in 0..3 {
            clock.advance(Duration::from_secs(1));
            t.handle(Event::Advance);
        }
        t.handle(Event::Reset);
        assert_eq!(recorded(&t), vec!["00:00:01", "00:00:02"]);

        t.handle(Event::Advance);
        assert_eq!(t.phase(), Phase::Running);
        assert_eq!(t.active_run(), Some(2));
        assert_eq!(recorded(&t), vec!["", ""]);
        assert_eq!(t.display().segment_times, vec!["00:00:00", ""]);
        assert_eq!(ticks.spawned.get(), 2);
    }

    #[test]
    fn save_failure_does_not_block_reset() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let clock = ManualClock::new();
        let mut t = SplitTimer::new(
            clock.clone(),
            Board::new(2),
            CountingTicks::default(),
            LedgerStore::new(blocker.join("splits.json")),
            labels(2),
        );
        t.handle(Event::Advance);
        clock.advance(Duration::from_secs(2));
        t.handle(Event::Advance);
        t.handle(Event::Reset);
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(t.display(), &Board::new(2));
    }

    #[test]
    fn empty_segment_list_never_starts() {
        let (mut t, _, ticks, _dir) = timer(0);
        t.handle(Event::Advance);
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(ticks.spawned.get(), 0);
    }

    #[test]
    fn works_with_default_ledger_segments() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new();
        let segments = Ledger::default().segments;
        let n = segments.len();
        let mut t = SplitTimer::new(
            clock.clone(),
            Board::new(n),
            CountingTicks::default(),
            LedgerStore::new(dir.path().join("splits.json")),
            segments,
        );
        t.handle(Event::Advance);
        for _ in 0..n {
            clock.advance(Duration::from_secs(60));
            t.handle(Event::Advance);
        }
        assert_eq!(t.phase(), Phase::AwaitingReset);
        assert_eq!(t.display().total, "00:14:00");
    }

    #[test]
    fn fast_run_with_real_ticker_records_advance_times_only() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel();
        let clock = ManualClock::new();
        let mut t = SplitTimer::new(
            clock.clone(),
            RecordingSink {
                board: Board::new(3),
                writes: 0,
            },
            ChannelTicks {
                interval: Duration::from_millis(1),
                tx,
            },
            LedgerStore::new(dir.path().join("splits.json")),
            labels(3),
        );

        t.handle(Event::Advance);
        // Let the ticker fire at least once while the run is live.
        let run = rx.recv_timeout(Duration::from_secs(2)).expect("tick");
        assert_eq!(run, 1);
        for secs in [7, 8, 9] {
            clock.advance(Duration::from_secs(secs));
            t.handle(Event::Advance);
        }
        assert_eq!(t.phase(), Phase::AwaitingReset);
        let writes = t.display().writes;

        // Everything the ticker managed to enqueue arrives after the finish.
        let stray: Vec<u64> = rx.try_iter().collect();
        for run in stray {
            t.handle(Event::Tick { run });
        }
        assert_eq!(t.display().writes, writes);
        assert_eq!(recorded(&t), vec!["00:00:07", "00:00:15", "00:00:24"]);
        assert_eq!(t.display().board.total, "00:00:24");

        // The ticker was joined when the run finished: nothing new shows up.
        std::thread::sleep(Duration::from_millis(20));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reset_while_running_stops_the_ticker() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel();
        let mut t = SplitTimer::new(
            ManualClock::new(),
            Board::new(2),
            ChannelTicks {
                interval: Duration::from_millis(1),
                tx,
            },
            LedgerStore::new(dir.path().join("splits.json")),
            labels(2),
        );
        t.handle(Event::Advance);
        rx.recv_timeout(Duration::from_secs(2)).expect("tick");
        t.handle(Event::Reset);
        let _: Vec<u64> = rx.try_iter().collect();
        std::thread::sleep(Duration::from_millis(20));
        assert!(rx.try_recv().is_err());

        // A second run gets its own, single ticker with a new run id.
        t.handle(Event::Advance);
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).expect("tick"), 2);
        t.handle(Event::Reset);
    }

    #[test]
    fn at_most_one_ticker_is_alive_at_any_time() {
        let dir = tempfile::tempdir().unwrap();
        let live = Arc::new(());
        let mut t = SplitTimer::new(
            ManualClock::new(),
            Board::new(2),
            TrackedTicks {
                live: Arc::clone(&live),
            },
            LedgerStore::new(dir.path().join("splits.json")),
            labels(2),
        );
        // One reference here, one in the spawner, one per running ticker.
        let tickers = || Arc::strong_count(&live) - 2;
        assert_eq!(tickers(), 0);

        t.handle(Event::Advance);
        assert_eq!(tickers(), 1);
        t.handle(Event::Advance);
        assert_eq!(tickers(), 1);
        t.handle(Event::Advance);
        assert_eq!(t.phase(), Phase::AwaitingReset);
        assert_eq!(tickers(), 0);

        t.handle(Event::Reset);
        t.handle(Event::Advance);
        assert_eq!(tickers(), 1);
        t.handle(Event::Reset);
        assert_eq!(tickers(), 0);
    }
}
