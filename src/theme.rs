use std::process::Command;

use iced::widget::container;
use iced::{Background, Color};

/// How the theme is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Dark,
    Light,
    /// Follow the desktop environment / system theme (updates dynamically).
    Auto,
}

impl ThemeMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "dark" => Some(ThemeMode::Dark),
            "light" => Some(ThemeMode::Light),
            "auto" => Some(ThemeMode::Auto),
            _ => None,
        }
    }
}

/// All colors and font sizes used by the split board, derived from the active theme.
pub struct ThemeColors {
    pub is_dark: bool,
    // Text
    pub text: Color,
    pub muted: Color,
    /// Segment currently being timed.
    pub current: Color,
    /// Total of a finished run.
    pub finished: Color,
    // Backgrounds
    pub current_bg: Color,
    pub backdrop: Color,
    // Font sizes (logical pixels)
    pub title_text: f32,
    pub split_text: f32,
    pub total_text: f32,
    pub info_text: f32,
}

impl ThemeColors {
    /// Light text over a dark translucent panel.
    pub fn dark() -> Self {
        Self {
            is_dark: true,
            text: Color::from_rgba(1.0, 1.0, 1.0, 0.85),
            muted: Color::from_rgba(1.0, 1.0, 1.0, 0.4),
            current: Color::from_rgb(1.0, 0.78, 0.0),
            finished: Color::from_rgb(0.35, 0.85, 0.45),
            current_bg: Color::from_rgba(0.15, 0.15, 0.22, 0.8),
            backdrop: Color::from_rgba(0.05, 0.05, 0.08, 0.65),
            title_text: 14.0,
            split_text: 13.0,
            total_text: 22.0,
            info_text: 8.0,
        }
    }

    /// Dark text over a light translucent panel.
    pub fn light() -> Self {
        Self {
            is_dark: false,
            text: Color::from_rgba(0.08, 0.08, 0.08, 0.9),
            muted: Color::from_rgba(0.35, 0.35, 0.35, 0.8),
            current: Color::from_rgb(0.6, 0.35, 0.0),
            finished: Color::from_rgb(0.05, 0.5, 0.15),
            current_bg: Color::from_rgba(0.75, 0.75, 0.85, 0.8),
            backdrop: Color::from_rgba(0.95, 0.95, 0.95, 0.65),
            title_text: 14.0,
            split_text: 13.0,
            total_text: 22.0,
            info_text: 8.0,
        }
    }

    fn panel_style(color: Color, radius: f32) -> impl Fn(&iced::Theme) -> container::Style {
        move |_theme: &iced::Theme| container::Style {
            background: Some(Background::Color(color)),
            border: iced::Border {
                radius: radius.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn current_row_style(&self) -> impl Fn(&iced::Theme) -> container::Style {
        Self::panel_style(self.current_bg, 3.0)
    }

    pub fn backdrop_style(&self) -> impl Fn(&iced::Theme) -> container::Style {
        Self::panel_style(self.backdrop, 6.0)
    }
}

/// Ask the desktop whether it prefers a dark appearance. Probes run in
/// order and the first definite answer wins; dark when nobody answers.
/// Some probes spawn processes, so keep this off hot paths.
pub fn detect_system_dark() -> bool {
    let probes: [fn() -> Option<bool>; 4] = [
        cosmic_is_dark,
        portal_is_dark,
        gsettings_is_dark,
        gtk_env_is_dark,
    ];
    probes.iter().find_map(|probe| probe()).unwrap_or(true)
}

fn cosmic_is_dark() -> Option<bool> {
    let path = dirs::home_dir()?.join(".config/cosmic/com.system76.CosmicTheme.Mode/v1/is_dark");
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn portal_is_dark() -> Option<bool> {
    let out = Command::new("dbus-send")
        .args([
            "--session",
            "--print-reply=literal",
            "--dest=org.freedesktop.portal.Desktop",
            "/org/freedesktop/portal/desktop",
            "org.freedesktop.portal.Settings.ReadOne",
            "string:org.freedesktop.appearance",
            "string:color-scheme",
        ])
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    parse_portal_reply(&String::from_utf8_lossy(&out.stdout))
}

/// `color-scheme`: 0 no preference, 1 dark, 2 light.
fn parse_portal_reply(reply: &str) -> Option<bool> {
    if reply.contains("uint32 1") {
        Some(true)
    } else if reply.contains("uint32 2") {
        Some(false)
    } else {
        None
    }
}

fn gsettings_is_dark() -> Option<bool> {
    let out = Command::new("gsettings")
        .args(["get", "org.gnome.desktop.interface", "color-scheme"])
        .output()
        .ok()?;
    parse_gsettings_scheme(&String::from_utf8_lossy(&out.stdout))
}

fn parse_gsettings_scheme(value: &str) -> Option<bool> {
    if value.contains("prefer-dark") {
        Some(true)
    } else if value.contains("prefer-light") || value.contains("default") {
        Some(false)
    } else {
        None
    }
}

/// e.g. `Adwaita:dark`
fn gtk_env_is_dark() -> Option<bool> {
    std::env::var("GTK_THEME")
        .ok()
        .map(|v| v.to_lowercase().contains("dark"))
}

pub fn resolve(mode: ThemeMode) -> ThemeColors {
    let dark = match mode {
        ThemeMode::Dark => true,
        ThemeMode::Light => false,
        ThemeMode::Auto => detect_system_dark(),
    };
    if dark { ThemeColors::dark() } else { ThemeColors::light() }
}
