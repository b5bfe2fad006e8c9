use iced::widget::text::Shaping;
use iced::widget::{column, container, row, space, text};
use iced::{Element, Length};

use crate::app::{EDGE_MARGIN, Hud, HudMode, Message};
use crate::timer::Phase;
use crate::util::{format_hms, truncate_str, version_line};

const PANEL_WIDTH: f32 = 280.0;
const LABEL_CHARS: usize = 18;

impl Hud {
    pub(crate) fn view_hud(&self) -> Element<'_, Message> {
        let mono = self.font();
        let shaped = Shaping::Advanced;
        let colors = &self.colors;
        let focused = self.mode == HudMode::Focused;
        let phase = self.timer.phase();
        let board = self.timer.display();
        let placeholder = format_hms(std::time::Duration::ZERO);

        let mut panel = column![].spacing(2).width(Length::Fill);

        if let Some(title) = &self.title {
            panel = panel.push(
                text(title.as_str())
                    .size(colors.title_text)
                    .color(colors.text)
                    .font(mono)
                    .shaping(shaped),
            );
            panel = panel.push(space::Space::new().height(4));
        }

        for (i, segment) in self.timer.segments().iter().enumerate() {
            let is_current = phase == Phase::Running && i == self.timer.current();
            let label = if focused {
                segment.label.clone()
            } else {
                truncate_str(&segment.label, LABEL_CHARS)
            };
            let time = board.segment_times.get(i).map_or("", String::as_str);
            let (time_str, time_color) = if time.is_empty() {
                (placeholder.clone(), colors.muted)
            } else if is_current {
                (time.to_string(), colors.current)
            } else {
                (time.to_string(), colors.text)
            };
            let label_color = if is_current { colors.current } else { colors.text };

            let split_row = row![
                text(label)
                    .size(colors.split_text)
                    .color(label_color)
                    .font(mono)
                    .shaping(shaped),
                space::horizontal(),
                text(time_str)
                    .size(colors.split_text)
                    .color(time_color)
                    .font(mono),
            ];

            if is_current {
                panel = panel.push(
                    container(split_row)
                        .style(colors.current_row_style())
                        .width(Length::Fill),
                );
            } else {
                panel = panel.push(split_row);
            }
        }

        // Separator row with the personal best, then the total.
        let pb = match &self.personal_best {
            Some(pb) => format!("==========>  (current PB: {pb})"),
            None => "==========>".to_string(),
        };
        panel = panel.push(space::Space::new().height(4));
        panel = panel.push(
            row![
                space::horizontal(),
                text(pb)
                    .size(colors.info_text)
                    .color(colors.muted)
                    .font(mono)
            ],
        );

        let (total_str, total_color) = match phase {
            _ if board.total.is_empty() => (placeholder.clone(), colors.muted),
            Phase::AwaitingReset => (format!("END {}", board.total), colors.finished),
            _ => (board.total.clone(), colors.text),
        };
        panel = panel.push(row![
            space::horizontal(),
            text(total_str)
                .size(colors.total_text)
                .color(total_color)
                .font(mono),
        ]);

        if focused {
            panel = panel.push(
                text(version_line())
                    .size(colors.info_text)
                    .color(colors.muted)
                    .font(mono),
            );
        }

        let panel: Element<'_, Message> = if self.backdrop {
            container(panel)
                .style(colors.backdrop_style())
                .padding(8)
                .width(PANEL_WIDTH)
                .into()
        } else {
            container(panel).width(PANEL_WIDTH).into()
        };

        container(column![panel, space::vertical()])
            .padding(EDGE_MARGIN)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}
