use std::collections::HashSet;

use iced::widget::{
    button, checkbox, column, container, image, mouse_area, row, scrollable, text, Column, Row,
};
use iced::{Alignment, Element, Length};

use crate::api::types::{BulkDeleteAck, GalleryImage, GalleryPage};
use crate::error::Error;
use crate::state::gallery::{FetchRequest, PageCache};
use crate::state::images::ImageCache;
use crate::state::masonry;

#[derive(Debug, Clone)]
pub enum GalleryMessage {
    /// Infinite scroll: the grid viewport moved.
    Scrolled(scrollable::RelativeOffset),
    /// Explicit retry after an error.
    Retry,
    PageFetched(FetchRequest, Result<GalleryPage, Error>),
    OpenImage(String),
    OpenUpload,
    /// Pick files and submit them right away, skipping the metadata
    /// editor.
    QuickUpload,
    ToggleSelectMode,
    ToggleSelected(String),
    RequestBulkDelete,
    CancelBulkDelete,
    ConfirmBulkDelete,
    BulkDeleted(usize, Result<BulkDeleteAck, Error>),
}

/// How far the user must scroll (relative, 0..=1) before the next
/// page is requested.
pub const FETCH_AHEAD_OFFSET: f32 = 0.9;

pub fn view<'a>(
    cache: &'a PageCache,
    remote: &'a ImageCache,
    selection: Option<&'a HashSet<String>>,
    viewport_width: f32,
) -> Element<'a, GalleryMessage> {
    let content = column![header(cache, selection), body(cache, remote, selection, viewport_width)]
        .spacing(16)
        .padding(24);

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn header<'a>(
    cache: &'a PageCache,
    selection: Option<&'a HashSet<String>>,
) -> Element<'a, GalleryMessage> {
    let count = cache.image_count();
    let summary = match count {
        0 => String::from("Gallery"),
        1 => String::from("Gallery - 1 image"),
        n => format!("Gallery - {n} images"),
    };

    let mut actions: Row<GalleryMessage> = row![].spacing(8);
    match selection {
        Some(selected) => {
            let delete_label = format!("Delete ({})", selected.len());
            actions = actions
                .push(
                    button(text(delete_label))
                        .style(button::danger)
                        .on_press_maybe(
                            (!selected.is_empty()).then_some(GalleryMessage::RequestBulkDelete),
                        ),
                )
                .push(button("Cancel").on_press(GalleryMessage::ToggleSelectMode));
        }
        None => {
            actions = actions
                .push(button("Select").style(button::secondary).on_press_maybe(
                    (count > 0).then_some(GalleryMessage::ToggleSelectMode),
                ))
                .push(
                    button("Quick Upload")
                        .style(button::secondary)
                        .on_press(GalleryMessage::QuickUpload),
                )
                .push(button("Add Images").on_press(GalleryMessage::OpenUpload));
        }
    }

    row![
        text(summary).size(28).width(Length::Fill),
        actions,
    ]
    .align_y(Alignment::Center)
    .into()
}

fn body<'a>(
    cache: &'a PageCache,
    remote: &'a ImageCache,
    selection: Option<&'a HashSet<String>>,
    viewport_width: f32,
) -> Element<'a, GalleryMessage> {
    if let Some(error) = cache.error() {
        // A failed initial load gets the full error panel; a failed
        // follow-up page keeps the grid and retries inline below it.
        if cache.image_count() == 0 {
            return error_state(error);
        }
    }
    if !cache.has_loaded() {
        return centered_note("Loading your gallery...");
    }
    if cache.image_count() == 0 {
        return empty_state();
    }

    let images: Vec<&GalleryImage> = cache.images().collect();
    let columns = masonry::column_count(viewport_width);
    let stacks = masonry::layout(&images, columns);

    let mut grid: Row<GalleryMessage> = row![].spacing(12);
    for stack in stacks {
        let mut pile: Column<GalleryMessage> = column![].spacing(12).width(Length::Fill);
        for record in stack {
            pile = pile.push(cell(record, remote, selection));
        }
        grid = grid.push(pile);
    }

    let mut page: Column<GalleryMessage> = column![grid].spacing(12);
    if cache.is_loading() {
        page = page.push(
            container(text("Loading more...").size(14))
                .width(Length::Fill)
                .center_x(Length::Fill)
                .padding(12),
        );
    } else if let Some(error) = cache.error() {
        page = page.push(
            container(
                row![
                    text(error.to_string()).size(13).style(text::danger),
                    button("Try again").on_press(GalleryMessage::Retry),
                ]
                .spacing(8)
                .align_y(Alignment::Center),
            )
            .width(Length::Fill)
            .center_x(Length::Fill)
            .padding(12),
        );
    }

    scrollable(page)
        .on_scroll(|viewport| GalleryMessage::Scrolled(viewport.relative_offset()))
        .height(Length::Fill)
        .into()
}

fn cell<'a>(
    record: &'a GalleryImage,
    remote: &'a ImageCache,
    selection: Option<&'a HashSet<String>>,
) -> Element<'a, GalleryMessage> {
    let visual: Element<'a, GalleryMessage> = match remote.get(record.display_url()) {
        Some(handle) => image(handle.clone()).width(Length::Fill).into(),
        None => container(text(record.title.as_deref().unwrap_or("Loading...")).size(12))
            .width(Length::Fill)
            .height(140)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .style(container::rounded_box)
            .into(),
    };

    match selection {
        Some(selected) => {
            let checked = selected.contains(&record.id);
            let id = record.id.clone();
            let toggle_id = record.id.clone();
            let marker = checkbox(if checked { "Selected" } else { "Select" }, checked)
                .on_toggle(move |_| GalleryMessage::ToggleSelected(toggle_id.clone()));

            column![
                marker,
                mouse_area(visual).on_press(GalleryMessage::ToggleSelected(id)),
            ]
            .spacing(4)
            .into()
        }
        None => mouse_area(visual)
            .on_press(GalleryMessage::OpenImage(record.id.clone()))
            .into(),
    }
}

fn empty_state() -> Element<'static, GalleryMessage> {
    let content: Column<GalleryMessage> = column![
        text("No images yet").size(24),
        text("Upload your first image to get started.").size(14),
        button("Add Images").on_press(GalleryMessage::OpenUpload),
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

fn error_state(error: &Error) -> Element<'_, GalleryMessage> {
    let content: Column<GalleryMessage> = column![
        text("Something went wrong loading your gallery.").size(20),
        text(error.to_string()).size(14).style(text::danger),
        row![
            button("Try again").on_press(GalleryMessage::Retry),
            button("Add Images")
                .style(button::secondary)
                .on_press(GalleryMessage::OpenUpload),
        ]
        .spacing(8),
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

fn centered_note(note: &str) -> Element<'_, GalleryMessage> {
    container(text(note).size(16))
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}

/// Confirmation dialog for the multi-select delete.
pub fn bulk_delete_dialog(count: usize) -> Element<'static, GalleryMessage> {
    let noun = if count == 1 { "image" } else { "images" };
    let body: Column<GalleryMessage> = column![
        text("Are you sure?").size(20),
        text(format!(
            "This action cannot be undone. This will permanently delete {count} {noun} from your gallery."
        ))
        .size(14),
        row![
            button("Cancel").on_press(GalleryMessage::CancelBulkDelete),
            button("Delete")
                .style(button::danger)
                .on_press(GalleryMessage::ConfirmBulkDelete),
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
