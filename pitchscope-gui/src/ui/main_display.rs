//! # Main Display Module
//!
//! Layout of the Pitchscope window: a fixed-height toolbar on top and the
//! visualizer surface filling the rest. When the microphone could not be
//! opened, the surface is replaced by the error and a Retry button.

use iced::widget::{button, column, container, horizontal_space, row, text};
use iced::{Alignment, Element, Length};
use pitchscope_core::PitchEvent;
use pitchscope_core::notes::freq_to_note;

use super::surface::Surface;
use crate::{CaptureStatus, Message, PitchscopeApp, View};

/// Height reserved for the toolbar; the visualizer gets the rest.
pub const TOOLBAR_HEIGHT: f32 = 44.0;

/// Creates the complete main application view.
pub fn create_main_view(app: &PitchscopeApp) -> Element<'_, Message> {
    let body: Element<'_, Message> = match &app.status {
        CaptureStatus::Failed(error) => create_error_panel(&error.to_string()),
        _ => Surface::new(&app.background, &app.foreground, &app.background_cache).view(),
    };

    let latest = app.session.as_ref().and_then(|session| session.latest());
    column![create_toolbar(app.view, &app.status, latest), body]
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn view_button(label: &'static str, view: View, current: View) -> Element<'static, Message> {
    let selector = button(text(label).size(14));
    if view == current {
        selector.style(button::primary).into()
    } else {
        selector
            .style(button::secondary)
            .on_press(Message::ShowView(view))
            .into()
    }
}

/// One-line readout of what the microphone is doing.
fn status_text(status: &CaptureStatus, latest: Option<&PitchEvent>) -> String {
    match (status, latest) {
        (CaptureStatus::Running, Some(event)) => {
            let note = freq_to_note(event.frequency);
            format!(
                "Latest pitch: {}{} {:.0} Hz",
                note.name(),
                note.octave,
                event.frequency
            )
        }
        (CaptureStatus::Running, None) => "Listening...".to_string(),
        (CaptureStatus::Stopped, _) => "Paused".to_string(),
        (CaptureStatus::Failed(_), _) => "Microphone unavailable".to_string(),
    }
}

fn create_toolbar(
    current: View,
    status: &CaptureStatus,
    latest: Option<&PitchEvent>,
) -> Element<'static, Message> {
    let capture_control: Element<'static, Message> = match status {
        CaptureStatus::Running => button(text("Stop").size(14))
            .style(button::danger)
            .on_press(Message::Stop)
            .into(),
        CaptureStatus::Stopped | CaptureStatus::Failed(_) => button(text("Start").size(14))
            .on_press(Message::Retry)
            .into(),
    };

    let content = row![
        text("Pitchscope").size(20),
        text(status_text(status, latest)).size(14),
        horizontal_space(),
        view_button("Dial", View::Dial, current),
        view_button("Timeline", View::Timeline, current),
        capture_control,
    ]
    .spacing(8)
    .align_y(Alignment::Center);

    container(content)
        .padding([6, 12])
        .width(Length::Fill)
        .height(Length::Fixed(TOOLBAR_HEIGHT))
        .into()
}

fn create_error_panel(message: &str) -> Element<'static, Message> {
    let content = column![
        text("Microphone unavailable").size(28),
        text(message.to_string()).size(16),
        button(text("Retry").size(16)).on_press(Message::Retry),
    ]
    .spacing(16)
    .align_x(Alignment::Center);

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchscope_core::capture::CaptureError;

    #[test]
    fn running_readout_names_the_latest_note() {
        let event = PitchEvent::new(440.0, 0, 0.95);
        assert_eq!(
            status_text(&CaptureStatus::Running, Some(&event)),
            "Latest pitch: A4 440 Hz"
        );
        assert_eq!(status_text(&CaptureStatus::Running, None), "Listening...");
    }

    #[test]
    fn idle_readouts_ignore_the_last_pitch() {
        let event = PitchEvent::new(220.0, 0, 0.9);
        assert_eq!(status_text(&CaptureStatus::Stopped, Some(&event)), "Paused");
        assert_eq!(
            status_text(&CaptureStatus::Failed(CaptureError::NoDevice), None),
            "Microphone unavailable"
        );
    }
}
