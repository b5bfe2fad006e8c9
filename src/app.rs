use futures::channel::mpsc;
use iced::{Color, Element, Font, Subscription, Task};
use iced_layershell::build_pattern::daemon;
use iced_layershell::settings::{LayerShellSettings, StartMode};
use iced_layershell::to_layer_message;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::display::Board;
use crate::ipc::{self, MessageTicks};
use crate::ledger::LedgerStore;
use crate::surface::overlay_settings;
use crate::theme::{self, ThemeColors, ThemeMode};
use crate::timer::{Event, SplitTimer};
use crate::util;

pub(crate) type IcedId = iced_layershell::reexport::IcedId;

pub(crate) type Timer = SplitTimer<SystemClock, Board, MessageTicks>;

pub(crate) const EDGE_MARGIN: u16 = 40;

// --- HUD State ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HudMode {
    Hidden,
    Visible,
    Focused,
}

pub(crate) struct Hud {
    pub(crate) mode: HudMode,
    pub(crate) surface_id: Option<IcedId>,
    pub(crate) timer: Timer,
    pub(crate) title: Option<String>,
    pub(crate) personal_best: Option<String>,
    pub(crate) theme_mode: ThemeMode,
    pub(crate) colors: ThemeColors,
    pub(crate) backdrop: bool,
    pub(crate) target_output: Option<String>,
}

impl Hud {
    pub(crate) fn font(&self) -> Font {
        Font::MONOSPACE
    }

    fn open_task(&mut self, mode: HudMode) -> Task<Message> {
        let remove_task = if let Some(id) = self.surface_id.take() {
            Task::done(Message::RemoveWindow(id))
        } else {
            Task::none()
        };
        self.mode = mode;
        let Some(settings) = overlay_settings(mode, self.target_output.as_deref()) else {
            return remove_task;
        };
        let (id, open_task) = Message::layershell_open(settings);
        self.surface_id = Some(id);
        Task::batch([remove_task, open_task])
    }
}

#[to_layer_message(multi)]
#[derive(Debug, Clone)]
pub(crate) enum Message {
    Advance,
    Reset,
    Tick(u64),
    /// Sender into the control stream, used to deliver ticks.
    ControlReady(mpsc::UnboundedSender<Message>),
    ToggleVisibility,
    ToggleFocus,
    ThemeSet(ThemeMode),
    ThemeToggle,
    ThemeRefresh,
    BackdropToggle,
    ScreenSet(String),
}

pub(crate) fn run(config: Config) -> Result<(), iced_layershell::Error> {
    tracing::info!("{} starting in background mode", util::version_line());

    let settings = LayerShellSettings {
        start_mode: StartMode::Background,
        ..Default::default()
    };

    daemon(
        move || Hud::new(config.clone()),
        Hud::namespace,
        Hud::update,
        Hud::view,
    )
    .style(Hud::style)
    .subscription(Hud::subscription)
    .layer_settings(settings)
    .run()
}

impl Hud {
    fn new(config: Config) -> (Self, Task<Message>) {
        let store = LedgerStore::new(&config.ledger_path);
        tracing::info!("splits file: {}", store.path().display());
        let ledger = store.load();
        let board = Board::with_times(ledger.times());
        let timer = SplitTimer::new(
            SystemClock,
            board,
            MessageTicks::new(config.tick_interval()),
            store,
            ledger.segments,
        );

        if let Some(ref name) = config.screen {
            tracing::info!("target screen: {name}");
        }

        let mut hud = Self {
            mode: HudMode::Hidden,
            surface_id: None,
            timer,
            title: config.title,
            personal_best: config.personal_best,
            theme_mode: config.theme,
            colors: theme::resolve(config.theme),
            backdrop: true,
            target_output: config.screen,
        };
        let task = hud.open_task(HudMode::Visible);
        tracing::info!(
            "booting -> Visible ({} segments)",
            hud.timer.segments().len()
        );
        (hud, task)
    }

    fn set_dark(&mut self, dark: bool) {
        self.colors = if dark {
            ThemeColors::dark()
        } else {
            ThemeColors::light()
        };
    }

    fn namespace() -> String {
        String::from("split-hud")
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Advance => {
                self.timer.handle(Event::Advance);
                Task::none()
            }
            Message::Reset => {
                self.timer.handle(Event::Reset);
                Task::none()
            }
            Message::Tick(run) => {
                self.timer.handle(Event::Tick { run });
                Task::none()
            }
            Message::ControlReady(tx) => {
                self.timer.ticks_mut().attach(tx);
                tracing::debug!("control stream ready");
                Task::none()
            }
            Message::ToggleVisibility => match self.mode {
                HudMode::Hidden => {
                    tracing::info!("Hidden -> Visible");
                    self.open_task(HudMode::Visible)
                }
                mode @ (HudMode::Visible | HudMode::Focused) => {
                    tracing::info!("{mode:?} -> Hidden");
                    self.open_task(HudMode::Hidden)
                }
            },
            Message::ToggleFocus => match self.mode {
                mode @ (HudMode::Hidden | HudMode::Visible) => {
                    tracing::info!("{mode:?} -> Focused");
                    self.open_task(HudMode::Focused)
                }
                HudMode::Focused => {
                    tracing::info!("Focused -> Visible");
                    self.open_task(HudMode::Visible)
                }
            },
            Message::ThemeSet(mode) => {
                self.theme_mode = mode;
                self.colors = theme::resolve(mode);
                tracing::info!("theme -> {mode:?}");
                Task::none()
            }
            Message::ThemeToggle => {
                // theme_mode is untouched; Auto re-evaluates on the next refresh.
                self.set_dark(!self.colors.is_dark);
                tracing::info!(dark = self.colors.is_dark, mode = ?self.theme_mode, "theme toggled");
                Task::none()
            }
            Message::ThemeRefresh => {
                if self.theme_mode == ThemeMode::Auto {
                    let dark = theme::detect_system_dark();
                    if dark != self.colors.is_dark {
                        self.set_dark(dark);
                        tracing::info!(dark, "system appearance changed");
                    }
                }
                Task::none()
            }
            Message::BackdropToggle => {
                self.backdrop = !self.backdrop;
                tracing::info!("backdrop -> {}", self.backdrop);
                Task::none()
            }
            Message::ScreenSet(name) => {
                tracing::info!("screen -> {name}");
                self.target_output = Some(name);
                if self.mode == HudMode::Hidden {
                    Task::none()
                } else {
                    self.open_task(self.mode)
                }
            }
            _ => Task::none(),
        }
    }

    fn view(&self, _window_id: IcedId) -> Element<'_, Message> {
        self.view_hud()
    }

    fn subscription(state: &Self) -> Subscription<Message> {
        let mut subs = vec![Subscription::run(ipc::control_stream)];

        if state.theme_mode == ThemeMode::Auto {
            subs.push(Subscription::run(ipc::theme_refresh_stream));
        }

        Subscription::batch(subs)
    }

    fn style(&self, _theme: &iced::Theme) -> iced::theme::Style {
        iced::theme::Style {
            background_color: Color::TRANSPARENT,
            text_color: self.colors.text,
        }
    }
}
