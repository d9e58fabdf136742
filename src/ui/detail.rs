use iced::widget::{button, column, container, image, row, text, text_input, Column, Row};
use iced::{Alignment, Element, Length};

use crate::api::types::GalleryImage;
use crate::error::Error;
use crate::state::detail::{DetailOverlay, EditForm};
use crate::state::images::ImageCache;

#[derive(Debug, Clone)]
pub enum DetailMessage {
    Close,
    Previous,
    Next,
    BeginEdit,
    CancelEdit,
    TitleChanged(String),
    DescriptionChanged(String),
    TagBufferChanged(String),
    CommitTag,
    RemoveTag(usize),
    Save,
    Saved(Result<GalleryImage, Error>),
    RequestDelete,
    CancelDelete,
    ConfirmDelete,
    DeleteFinished(String, Result<(), Error>),
}

pub fn view<'a>(
    overlay: &'a DetailOverlay,
    all: &[&'a GalleryImage],
    remote: &'a ImageCache,
) -> Element<'a, DetailMessage> {
    let Some(current) = overlay.current_image(all) else {
        // The record vanished underneath the overlay (deleted from
        // another session, or the reconciling refresh dropped it).
        let note: Column<DetailMessage> = column![
            text("This image is no longer available.").size(16),
            button("Close").on_press(DetailMessage::Close),
        ]
        .spacing(16)
        .align_x(Alignment::Center);
        return card(note.into());
    };

    let heading = if overlay.is_editing() {
        "Edit Image Details".to_string()
    } else {
        current
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Image Details".to_string())
    };

    let header = row![
        text(heading).size(22).width(Length::Fill),
        button("Close").on_press_maybe(overlay.can_close().then_some(DetailMessage::Close)),
    ]
    .align_y(Alignment::Center);

    let body: Element<DetailMessage> = match overlay.edit_form() {
        Some(form) => edit_body(overlay, form),
        None => viewing_body(overlay, all, current, remote),
    };

    card(column![header, body].spacing(16).into())
}

fn viewing_body<'a>(
    overlay: &'a DetailOverlay,
    all: &[&'a GalleryImage],
    current: &'a GalleryImage,
    remote: &'a ImageCache,
) -> Element<'a, DetailMessage> {
    let index = overlay.current_index(all).unwrap_or(0);
    let at_start = index == 0;
    let at_end = index + 1 >= all.len();

    let visual: Element<DetailMessage> = match remote.get(&current.url) {
        Some(handle) => image(handle.clone())
            .width(Length::Fill)
            .into(),
        None => container(text("Loading image...").size(14))
            .width(Length::Fill)
            .height(320)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .style(container::rounded_box)
            .into(),
    };

    let navigation = row![
        button("<").on_press_maybe((!at_start && overlay.can_navigate()).then_some(DetailMessage::Previous)),
        container(text(format!("{} / {}", index + 1, all.len())).size(14))
            .width(Length::Fill)
            .center_x(Length::Fill),
        button(">").on_press_maybe((!at_end && overlay.can_navigate()).then_some(DetailMessage::Next)),
    ]
    .align_y(Alignment::Center)
    .spacing(8);

    let mut details: Column<DetailMessage> = column![].spacing(12);
    if let Some(title) = current.title.as_deref().filter(|t| !t.is_empty()) {
        details = details.push(labelled("Title", title));
    }
    if let Some(description) = current.description.as_deref().filter(|d| !d.is_empty()) {
        details = details.push(labelled("Description", description));
    }
    if !current.tags.is_empty() {
        let mut chips: Row<DetailMessage> = row![].spacing(6);
        for tag in &current.tags {
            chips = chips.push(
                container(text(tag.as_str()).size(12))
                    .padding(6)
                    .style(container::rounded_box),
            );
        }
        details = details.push(column![text("Tags").size(16), chips].spacing(4));
    }
    details = details.push(labelled(
        "Upload Date",
        // Long-form local date, e.g. "May  1, 2024  3:07 PM".
        &current
            .uploaded_at
            .format("%B %e, %Y %l:%M %p")
            .to_string(),
    ));
    details = details.push(labelled(
        "Image Details",
        &format!(
            "{} × {} pixels • {}",
            current.width,
            current.height,
            current.format.to_uppercase()
        ),
    ));

    let footer = row![
        button("Delete")
            .style(button::danger)
            .on_press_maybe(overlay.can_navigate().then_some(DetailMessage::RequestDelete)),
        button("Edit").on_press_maybe(overlay.can_navigate().then_some(DetailMessage::BeginEdit)),
    ]
    .spacing(8);

    row![
        column![visual, navigation].spacing(8).width(Length::FillPortion(3)),
        column![details, footer].spacing(16).width(Length::FillPortion(2)),
    ]
    .spacing(16)
    .into()
}

fn edit_body<'a>(overlay: &'a DetailOverlay, form: &'a EditForm) -> Element<'a, DetailMessage> {
    let mut fields: Column<DetailMessage> = column![
        text_input("Image title", &form.title)
            .on_input(DetailMessage::TitleChanged)
            .padding(10),
        text_input("Image description", &form.description)
            .on_input(DetailMessage::DescriptionChanged)
            .padding(10),
        text_input("Add tags (press Enter after each tag)", &form.tag_buffer)
            .on_input(DetailMessage::TagBufferChanged)
            .on_submit(DetailMessage::CommitTag)
            .padding(10),
    ]
    .spacing(12);

    if !form.tags.is_empty() {
        let mut chips: Row<DetailMessage> = row![].spacing(6);
        for (index, tag) in form.tags.iter().enumerate() {
            chips = chips.push(
                button(text(format!("{tag} x")).size(12))
                    .style(button::secondary)
                    .padding(6)
                    .on_press(DetailMessage::RemoveTag(index)),
            );
        }
        fields = fields.push(chips);
    }

    if let Some(message) = overlay.error() {
        fields = fields.push(text(message).size(14).style(text::danger));
    }

    let save_label = if overlay.is_saving() {
        "Saving..."
    } else {
        "Save Changes"
    };
    let footer = row![
        button("Cancel").on_press_maybe((!overlay.is_saving()).then_some(DetailMessage::CancelEdit)),
        button(text(save_label)).on_press_maybe(overlay.can_save().then_some(DetailMessage::Save)),
    ]
    .spacing(8);

    column![fields, footer].spacing(16).into()
}

fn labelled<'a>(label: &'a str, value: &str) -> Element<'a, DetailMessage> {
    column![
        text(label).size(16),
        text(value.to_string()).size(14),
    ]
    .spacing(4)
    .into()
}

fn card(content: Element<'_, DetailMessage>) -> Element<'_, DetailMessage> {
    container(content)
        .padding(24)
        .max_width(860)
        .style(container::rounded_box)
        .into()
}

/// Confirmation dialog for the single-image delete.
pub fn delete_dialog() -> Element<'static, DetailMessage> {
    let body: Column<DetailMessage> = column![
        text("Are you sure?").size(20),
        text("This action cannot be undone. This will permanently delete the image from your gallery.")
            .size(14),
        row![
            button("Cancel").on_press(DetailMessage::CancelDelete),
            button("Delete")
                .style(button::danger)
                .on_press(DetailMessage::ConfirmDelete),
        ]
        .spacing(8),
    ]
    .spacing(16);

    container(body)
        .padding(24)
        .max_width(420)
        .style(container::rounded_box)
        .into()
}
