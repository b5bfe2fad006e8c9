use std::time::Duration;

/// Round a duration to the nearest whole second (halves round up).
pub fn round_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() >= 500_000_000 {
        secs + 1
    } else {
        secs
    }
}

/// Render an elapsed duration as `HH:MM:SS`.
/// Sub-second precision is rounded away, never displayed. Hours are not
/// wrapped at 24; a run past 99 hours just gets a wider hour field.
pub fn format_hms(d: Duration) -> String {
    let total = round_secs(d);
    let hours = total / 3600;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// `split-hud v<version> (<commit>)`, as stamped by the build script.
pub fn version_line() -> String {
    format!(
        "split-hud v{} ({})",
        env!("SPLIT_HUD_VERSION"),
        env!("SPLIT_HUD_COMMIT")
    )
}

/// Shorten `s` to at most `max_chars` characters, marking the cut with `…`.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some(_) if max_chars == 0 => String::new(),
        Some(_) => {
            let kept: String = s.chars().take(max_chars - 1).collect();
            format!("{kept}…")
        }
    }
}
