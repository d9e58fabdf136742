use iced::widget::image::Handle;
use iced::widget::{button, column, container, image, text, text_input, Column};
use iced::{Alignment, Element, Length};

use crate::api::types::Profile;
use crate::error::Error;
use crate::state::images::ImageCache;
use crate::state::profile::{LoadState, Notice, ProfileEditor};

#[derive(Debug, Clone)]
pub enum ProfileMessage {
    Loaded(Result<Profile, Error>),
    Reload,
    FirstNameChanged(String),
    LastNameChanged(String),
    PickAvatar,
    AvatarPreviewLoaded(Result<Handle, Error>),
    Save,
    Saved(Result<Profile, Error>),
}

pub fn view<'a>(editor: &'a ProfileEditor, remote: &'a ImageCache) -> Element<'a, ProfileMessage> {
    let content: Element<ProfileMessage> = match editor.load_state() {
        LoadState::Loading => text("Loading...").size(16).into(),
        LoadState::Failed(_) => column![
            text("There was an error fetching your profile.").size(16),
            button("Try again").on_press(ProfileMessage::Reload),
        ]
        .spacing(12)
        .align_x(Alignment::Center)
        .into(),
        LoadState::Ready => form(editor, remote),
    };

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}

fn form<'a>(editor: &'a ProfileEditor, remote: &'a ImageCache) -> Element<'a, ProfileMessage> {
    let heading = if editor.exists() {
        "Update Profile"
    } else {
        "Create Profile"
    };

    // A newly picked avatar wins over the stored one.
    let avatar: Element<ProfileMessage> = if let Some(handle) = editor.avatar_preview() {
        image(handle.clone()).width(96).height(96).into()
    } else if let Some(handle) = editor
        .existing()
        .and_then(|profile| profile.profile_image.as_deref())
        .and_then(|url| remote.get(url))
    {
        image(handle.clone()).width(96).height(96).into()
    } else {
        container(text("No photo").size(12))
            .width(96)
            .height(96)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .style(container::rounded_box)
            .into()
    };

    let mut fields: Column<ProfileMessage> = column![
        text(heading).size(28),
        avatar,
        button("Change photo")
            .style(button::secondary)
            .on_press_maybe((!editor.is_saving()).then_some(ProfileMessage::PickAvatar)),
        text_input("First name", &editor.first_name)
            .on_input(ProfileMessage::FirstNameChanged)
            .padding(10)
            .width(320),
        text_input("Last name", &editor.last_name)
            .on_input(ProfileMessage::LastNameChanged)
            .padding(10)
            .width(320),
    ]
    .spacing(16)
    .align_x(Alignment::Center);

    match editor.notice() {
        Some(Notice::Error(message)) => {
            fields = fields.push(text(message.as_str()).size(14).style(text::danger));
        }
        Some(Notice::Success(message)) => {
            fields = fields.push(text(message.as_str()).size(14).style(text::success));
        }
        None => {}
    }

    let submit_label = if editor.is_saving() {
        "Saving..."
    } else if editor.exists() {
        "Update Profile"
    } else {
        "Create Profile"
    };

    fields = fields.push(
        button(text(submit_label))
            .padding(10)
            .width(320)
            .on_press_maybe((!editor.is_saving()).then_some(ProfileMessage::Save)),
    );

    fields.into()
}
