use iced_layershell::reexport::{
    Anchor, KeyboardInteractivity, Layer, NewLayerShellSettings, OutputOption,
};

use crate::app::HudMode;

/// Layer surface for `mode` on the named output, or `None` when hidden.
///
/// The board covers the whole output so it can sit in a corner. While merely
/// visible it is click-through; focused it takes input so long labels can be
/// read without truncation.
pub(crate) fn overlay_settings(
    mode: HudMode,
    output: Option<&str>,
) -> Option<NewLayerShellSettings> {
    let interactive = match mode {
        HudMode::Hidden => return None,
        HudMode::Visible => false,
        HudMode::Focused => true,
    };
    Some(NewLayerShellSettings {
        layer: Layer::Overlay,
        anchor: Anchor::Top | Anchor::Bottom | Anchor::Left | Anchor::Right,
        keyboard_interactivity: if interactive {
            KeyboardInteractivity::OnDemand
        } else {
            KeyboardInteractivity::None
        },
        exclusive_zone: Some(-1),
        size: Some((0, 0)),
        events_transparent: !interactive,
        output_option: output.map_or(OutputOption::None, |name| {
            OutputOption::OutputName(name.to_string())
        }),
        ..Default::default()
    })
}
