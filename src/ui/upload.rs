use iced::widget::image::Handle;
use iced::widget::{
    button, column, container, image, progress_bar, row, scrollable, text, text_input, Column, Row,
};
use iced::{Alignment, Element, Length};
use uuid::Uuid;

use crate::error::Error;
use crate::state::upload::{PendingUpload, UploadQueue, MAX_FILES};

#[derive(Debug, Clone)]
pub enum UploadMessage {
    Close,
    PickFiles,
    PreviewLoaded(Uuid, Result<Handle, Error>),
    Remove(usize),
    ClearAll,
    SetActive(usize),
    PreviousImage,
    NextImage,
    TitleChanged(String),
    DescriptionChanged(String),
    TagBufferChanged(String),
    CommitTag,
    RemoveTag(usize),
    Submit,
    ItemUploaded(Result<(), Error>),
}

pub fn view(queue: &UploadQueue) -> Element<'_, UploadMessage> {
    let header = row![
        column![
            text("Add Images").size(22),
            text("Upload one or more images to your gallery.").size(14),
        ]
        .spacing(4)
        .width(Length::Fill),
        button("Close")
            .on_press_maybe((!queue.is_submitting()).then_some(UploadMessage::Close)),
    ]
    .align_y(Alignment::Center);

    let body = row![
        picker_pane(queue).width(Length::FillPortion(2)),
        editor_pane(queue).width(Length::FillPortion(3)),
    ]
    .spacing(16);

    let mut content: Column<UploadMessage> = column![header, body].spacing(16);

    if queue.is_submitting() {
        content = content.push(
            column![
                row![
                    text("Uploading images...").size(14).width(Length::Fill),
                    text(format!("{}%", queue.progress() as u32)).size(14),
                ],
                progress_bar(0.0..=100.0, queue.progress()).height(8),
            ]
            .spacing(4),
        );
    }

    if let Some(message) = queue.error() {
        content = content.push(text(format!("Upload failed: {message}")).size(14).style(text::danger));
    }

    let count = queue.items().len();
    let submit_label = if queue.is_submitting() {
        "Uploading...".to_string()
    } else if count > 0 {
        format!("Upload ({count})")
    } else {
        "Upload".to_string()
    };
    content = content.push(
        container(
            button(text(submit_label))
                .padding(10)
                .on_press_maybe(queue.can_submit().then_some(UploadMessage::Submit)),
        )
        .width(Length::Fill)
        .align_x(Alignment::End),
    );

    container(content)
        .padding(24)
        .max_width(900)
        .style(container::rounded_box)
        .into()
}

/// Left pane: drop-zone stand-in (a picker button) and the queue list.
fn picker_pane(queue: &UploadQueue) -> Column<'_, UploadMessage> {
    let picker = button(
        column![
            text("Click to browse for images").size(14),
            text(format!("Up to {MAX_FILES} images, max 10MB each")).size(12),
        ]
        .spacing(4)
        .align_x(Alignment::Center),
    )
    .style(button::secondary)
    .padding(24)
    .width(Length::Fill)
    .on_press_maybe((!queue.is_submitting()).then_some(UploadMessage::PickFiles));

    let mut pane: Column<UploadMessage> = column![picker].spacing(12);

    if let Some(message) = queue.validation() {
        pane = pane.push(text(message).size(13).style(text::danger));
    }

    if !queue.items().is_empty() {
        let count = queue.items().len();
        let noun = if count == 1 { "image" } else { "images" };
        pane = pane.push(
            row![
                text(format!("{count} {noun} selected")).size(14).width(Length::Fill),
                button("Clear All")
                    .style(button::secondary)
                    .on_press_maybe((!queue.is_submitting()).then_some(UploadMessage::ClearAll)),
            ]
            .align_y(Alignment::Center),
        );

        let mut list: Column<UploadMessage> = column![].spacing(8);
        for (index, item) in queue.items().iter().enumerate() {
            list = list.push(queue_entry(queue, item, index));
        }
        pane = pane.push(scrollable(list).height(300));
    }

    pane
}

fn queue_entry<'a>(
    queue: &'a UploadQueue,
    item: &'a PendingUpload,
    index: usize,
) -> Element<'a, UploadMessage> {
    let thumb: Element<UploadMessage> = match queue.preview(&item.local_id) {
        Some(handle) => image(handle.clone()).width(32).height(32).into(),
        None => container(text("")).width(32).height(32).style(container::rounded_box).into(),
    };

    let label = if item.title.is_empty() {
        item.file_name.as_str()
    } else {
        item.title.as_str()
    };

    let entry = row![
        thumb,
        column![
            text(label).size(13),
            text(item.size_label()).size(11),
        ]
        .spacing(2)
        .width(Length::Fill),
        button("x")
            .style(button::text)
            .on_press_maybe((!queue.is_submitting()).then_some(UploadMessage::Remove(index))),
    ]
    .spacing(8)
    .align_y(Alignment::Center);

    let select = button(entry)
        .style(if queue.active_index() == Some(index) {
            button::primary
        } else {
            button::text
        })
        .padding(6)
        .width(Length::Fill)
        .on_press(UploadMessage::SetActive(index));

    select.into()
}

/// Right pane: preview of the active item plus its metadata editor.
fn editor_pane(queue: &UploadQueue) -> Column<'_, UploadMessage> {
    let Some(item) = queue.active_item() else {
        return column![
            container(
                column![
                    text("No Images Selected").size(18),
                    text("Add image(s) using the panel on the left to edit their details.").size(13),
                    button("Select Images").on_press(UploadMessage::PickFiles),
                ]
                .spacing(12)
                .align_x(Alignment::Center),
            )
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill),
        ];
    };

    let index = queue.active_index().unwrap_or(0);
    let total = queue.items().len();

    let header = row![
        column![
            text("Edit Image Details").size(16),
            text(format!("Image {} of {}", index + 1, total)).size(12),
        ]
        .spacing(2)
        .width(Length::Fill),
        button("<").on_press_maybe((index > 0).then_some(UploadMessage::PreviousImage)),
        button(">").on_press_maybe((index + 1 < total).then_some(UploadMessage::NextImage)),
    ]
    .spacing(8)
    .align_y(Alignment::Center);

    let preview: Element<UploadMessage> = match queue.preview(&item.local_id) {
        Some(handle) => container(image(handle.clone()).height(200))
            .width(Length::Fill)
            .center_x(Length::Fill)
            .into(),
        None => container(text("Generating preview...").size(13))
            .width(Length::Fill)
            .height(200)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .style(container::rounded_box)
            .into(),
    };

    let mut tags_row: Row<UploadMessage> = row![].spacing(6);
    for (tag_index, tag) in item.tags.iter().enumerate() {
        tags_row = tags_row.push(
            button(text(format!("{tag} x")).size(12))
                .style(button::secondary)
                .padding(6)
                .on_press(UploadMessage::RemoveTag(tag_index)),
        );
    }

    let mut editor: Column<UploadMessage> = column![
        header,
        preview,
        text_input("Image title (optional)", &item.title)
            .on_input(UploadMessage::TitleChanged)
            .padding(10),
        text_input("Image description (optional)", &item.description)
            .on_input(UploadMessage::DescriptionChanged)
            .padding(10),
        text_input("Add tags (press Enter after each tag)", &item.tag_buffer)
            .on_input(UploadMessage::TagBufferChanged)
            .on_submit(UploadMessage::CommitTag)
            .padding(10),
    ]
    .spacing(12);

    if !item.tags.is_empty() {
        editor = editor.push(tags_row);
    }

    editor
}
