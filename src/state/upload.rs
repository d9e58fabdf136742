/// Upload pipeline
///
/// A validated queue of pending files with per-file editable metadata,
/// plus the preview resources derived from them. Submission sends one
/// multipart request per file, strictly in queue order; a synthetic
/// progress value advances on a timer because multipart bodies give no
/// usable transfer feedback.
///
/// Preview handles are owned by the registry and released exactly
/// once: on removal of their file, or in bulk when the dialog closes.
/// A decode that lands after its file was removed is dropped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use iced::widget::image::Handle;
use uuid::Uuid;

use crate::api::client::ImagePayload;
use crate::error::Error;
use crate::state::tags;

/// Most files accepted into one queue.
pub const MAX_FILES: usize = 10;

/// Largest accepted file, in bytes (10MB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// MIME allow-list, mirroring the backend's.
pub const ACCEPTED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
];

/// Longest edge of a decoded preview.
const PREVIEW_MAX_DIM: u32 = 512;

/// Synthetic progress: step size and ceiling before completion snaps
/// it to 100.
const PROGRESS_STEP: f32 = 5.0;
const PROGRESS_CEILING: f32 = 95.0;

/// A file picked by the user, probed but not yet admitted.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub mime: String,
}

impl FileCandidate {
    /// Inspect a picked path: size from the filesystem, MIME from the
    /// extension. Unknown extensions yield an empty MIME and fail the
    /// allow-list check later.
    pub fn probe(path: PathBuf) -> Result<Self, Error> {
        let metadata = std::fs::metadata(&path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let mime = mime_for_extension(&path).unwrap_or_default().to_string();

        Ok(FileCandidate {
            path,
            file_name,
            size: metadata.len(),
            mime,
        })
    }
}

/// Map a file extension onto the backend's MIME vocabulary.
pub fn mime_for_extension(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()?.to_lowercase().as_str() {
        "jpeg" => Some("image/jpeg"),
        "jpg" => Some("image/jpg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// One file waiting in the queue, with its editable metadata.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    /// Client-generated, stable for the life of the queue entry.
    pub local_id: Uuid,
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub mime: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub tag_buffer: String,
}

impl PendingUpload {
    fn from_candidate(candidate: FileCandidate) -> Self {
        PendingUpload {
            local_id: Uuid::new_v4(),
            path: candidate.path,
            file_name: candidate.file_name,
            size: candidate.size,
            mime: candidate.mime,
            title: String::new(),
            description: String::new(),
            tags: Vec::new(),
            tag_buffer: String::new(),
        }
    }

    pub fn size_label(&self) -> String {
        format!("{:.1}MB", self.size as f64 / 1024.0 / 1024.0)
    }
}

impl From<&PendingUpload> for ImagePayload {
    fn from(item: &PendingUpload) -> Self {
        ImagePayload {
            path: item.path.clone(),
            file_name: item.file_name.clone(),
            mime: item.mime.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            tags: item.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Submitting { index: usize },
}

/// The upload dialog's state: queue, active editor selection, preview
/// registry, validation notices, and submission bookkeeping.
#[derive(Debug)]
pub struct UploadQueue {
    items: Vec<PendingUpload>,
    active: Option<usize>,
    previews: PreviewRegistry,
    validation: Option<String>,
    error: Option<String>,
    phase: Phase,
    progress: f32,
}

impl UploadQueue {
    pub fn new() -> Self {
        UploadQueue {
            items: Vec::new(),
            active: None,
            previews: PreviewRegistry::new(),
            validation: None,
            error: None,
            phase: Phase::Idle,
            progress: 0.0,
        }
    }

    pub fn items(&self) -> &[PendingUpload] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_item(&self) -> Option<&PendingUpload> {
        self.active.and_then(|index| self.items.get(index))
    }

    pub fn validation(&self) -> Option<&str> {
        self.validation.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.phase, Phase::Submitting { .. })
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn preview(&self, local_id: &Uuid) -> Option<&Handle> {
        self.previews.get(local_id)
    }

    /// Admit picked files up to the remaining capacity.
    ///
    /// Over-capacity batches are truncated; oversized or wrong-type
    /// files are skipped individually. Both record a user-visible
    /// message instead of failing the call. Returns the admitted
    /// entries so the caller can start preview decodes.
    pub fn select_files(&mut self, candidates: Vec<FileCandidate>) -> Vec<(Uuid, PathBuf)> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut notes = Vec::new();
        let mut batch = candidates;

        let available = MAX_FILES.saturating_sub(self.items.len());
        if available == 0 {
            self.validation = Some(format!(
                "You can only upload up to {MAX_FILES} images at once"
            ));
            return Vec::new();
        }
        if batch.len() > available {
            batch.truncate(available);
            notes.push(format!(
                "Only {available} files were added as the maximum is {MAX_FILES} files"
            ));
        }

        let was_empty = self.items.is_empty();
        let mut admitted = Vec::new();
        for candidate in batch {
            if candidate.size > MAX_FILE_SIZE {
                notes.push(format!("{} is larger than 10MB", candidate.file_name));
                continue;
            }
            if !ACCEPTED_MIME_TYPES.contains(&candidate.mime.as_str()) {
                notes.push(format!(
                    "{}: only .jpg, .jpeg, .png, .webp, and .gif files are accepted",
                    candidate.file_name
                ));
                continue;
            }

            let item = PendingUpload::from_candidate(candidate);
            self.previews.acquire(item.local_id);
            admitted.push((item.local_id, item.path.clone()));
            self.items.push(item);
        }

        self.validation = if notes.is_empty() {
            None
        } else {
            Some(notes.join("; "))
        };

        // First files in an empty queue select the first for editing.
        if was_empty && !self.items.is_empty() {
            self.active = Some(0);
        }

        admitted
    }

    /// Remove one pending item, releasing its preview. The active
    /// selection shifts to a neighbouring valid index, or clears when
    /// the queue empties.
    pub fn remove_file(&mut self, index: usize) {
        if index >= self.items.len() {
            return;
        }

        let removed = self.items.remove(index);
        self.previews.release(&removed.local_id);

        self.active = match self.active {
            Some(_) if self.items.is_empty() => None,
            Some(active) if active == index => {
                // Removed the selected item: stay at this position,
                // stepping back if it was the last one.
                Some(active.min(self.items.len() - 1))
            }
            Some(active) if active > index => Some(active - 1),
            other => other,
        };
    }

    /// Drop the whole queue ("Clear All").
    pub fn clear_files(&mut self) {
        self.previews.release_all();
        self.items.clear();
        self.active = None;
        self.validation = None;
    }

    /// Dialog teardown: everything derived from the queue is released.
    pub fn teardown(&mut self) {
        self.previews.release_all();
    }

    pub fn set_active(&mut self, index: usize) {
        if index < self.items.len() {
            self.active = Some(index);
        }
    }

    /// Move the editor selection to the previous/next pending item.
    pub fn navigate_active(&mut self, delta: isize) {
        let Some(active) = self.active else { return };
        let target = active as isize + delta;
        if target >= 0 && (target as usize) < self.items.len() {
            self.active = Some(target as usize);
        }
    }

    pub fn attach_preview(&mut self, local_id: Uuid, result: Result<Handle, Error>) {
        match result {
            Ok(handle) => {
                self.previews.fulfill(local_id, handle);
            }
            Err(err) => {
                log::warn!("preview decode failed: {err}");
                self.previews.release(&local_id);
            }
        }
    }

    // ---- metadata editing (applies to the active item) ----

    pub fn set_title(&mut self, value: String) {
        if let Some(item) = self.active_item_mut() {
            item.title = value;
        }
    }

    pub fn set_description(&mut self, value: String) {
        if let Some(item) = self.active_item_mut() {
            item.description = value;
        }
    }

    pub fn set_tag_buffer(&mut self, value: String) {
        if let Some(item) = self.active_item_mut() {
            item.tag_buffer = value;
        }
    }

    pub fn commit_tag(&mut self) {
        if let Some(item) = self.active_item_mut() {
            let mut buffer = std::mem::take(&mut item.tag_buffer);
            tags::commit(&mut item.tags, &mut buffer);
            item.tag_buffer = buffer;
        }
    }

    pub fn remove_tag(&mut self, index: usize) {
        if let Some(item) = self.active_item_mut() {
            tags::remove(&mut item.tags, index);
        }
    }

    fn active_item_mut(&mut self) -> Option<&mut PendingUpload> {
        self.active.and_then(|index| self.items.get_mut(index))
    }

    // ---- submission ----

    pub fn can_submit(&self) -> bool {
        !self.items.is_empty() && !self.is_submitting()
    }

    /// Start a submission. Returns the first item to send, or `None`
    /// when the queue is empty or a submission is already in flight.
    pub fn begin_submit(&mut self) -> Option<PendingUpload> {
        if !self.can_submit() {
            return None;
        }
        self.phase = Phase::Submitting { index: 0 };
        self.progress = 0.0;
        self.error = None;
        Some(self.items[0].clone())
    }

    /// One item finished; hand back the next, or complete the run.
    /// Completion clears the queue and its previews -- the caller only
    /// has to refetch the gallery.
    pub fn next_after_success(&mut self) -> Option<PendingUpload> {
        let Phase::Submitting { index } = self.phase else {
            return None;
        };

        let next = index + 1;
        if next < self.items.len() {
            self.phase = Phase::Submitting { index: next };
            return Some(self.items[next].clone());
        }

        self.progress = 100.0;
        self.phase = Phase::Idle;
        self.previews.release_all();
        self.items.clear();
        self.active = None;
        self.validation = None;
        None
    }

    /// A request failed: stop submitting but keep the queue so the
    /// user can retry.
    pub fn fail_submit(&mut self, err: &Error) {
        self.phase = Phase::Idle;
        self.progress = 0.0;
        self.error = Some(err.to_string());
    }

    /// Timer tick while submitting: advance the synthetic progress up
    /// to the ceiling. The snap to 100 happens on completion.
    pub fn tick(&mut self) {
        if self.is_submitting() && self.progress < PROGRESS_CEILING {
            self.progress = (self.progress + PROGRESS_STEP).min(PROGRESS_CEILING);
        }
    }
}

/// Owned registry of preview handles, keyed by the pending item's
/// local id.
///
/// Each slot is released at most once; a released slot stays in the
/// map as a marker so a decode finishing after removal is discarded
/// instead of resurrecting the handle.
#[derive(Debug, Default)]
struct PreviewRegistry {
    slots: HashMap<Uuid, PreviewSlot>,
}

#[derive(Debug)]
enum PreviewSlot {
    Pending,
    Ready(Handle),
    Released,
}

impl PreviewRegistry {
    fn new() -> Self {
        Self::default()
    }

    fn acquire(&mut self, local_id: Uuid) {
        self.slots.insert(local_id, PreviewSlot::Pending);
    }

    /// Store a decoded handle, unless the slot was already released.
    fn fulfill(&mut self, local_id: Uuid, handle: Handle) -> bool {
        match self.slots.get_mut(&local_id) {
            Some(slot @ PreviewSlot::Pending) => {
                *slot = PreviewSlot::Ready(handle);
                true
            }
            _ => false,
        }
    }

    fn get(&self, local_id: &Uuid) -> Option<&Handle> {
        match self.slots.get(local_id) {
            Some(PreviewSlot::Ready(handle)) => Some(handle),
            _ => None,
        }
    }

    /// Release a slot. Returns whether this call did the release;
    /// releasing twice is a no-op, not an error.
    fn release(&mut self, local_id: &Uuid) -> bool {
        match self.slots.get_mut(local_id) {
            Some(slot) if !matches!(slot, PreviewSlot::Released) => {
                *slot = PreviewSlot::Released;
                true
            }
            _ => false,
        }
    }

    fn release_all(&mut self) {
        for slot in self.slots.values_mut() {
            *slot = PreviewSlot::Released;
        }
    }
}

/// Decode a preview for a newly admitted file. Runs the CPU-heavy
/// decode off the UI thread.
pub async fn load_preview(local_id: Uuid, path: PathBuf) -> (Uuid, Result<Handle, Error>) {
    let result = tokio::task::spawn_blocking(move || decode_preview(&path))
        .await
        .map_err(|err| Error::Image(format!("preview task failed: {err}")))
        .and_then(|inner| inner);
    (local_id, result)
}

fn decode_preview(path: &Path) -> Result<Handle, Error> {
    let decoded = image::open(path).map_err(|err| Error::Image(err.to_string()))?;
    let thumb = decoded.thumbnail(PREVIEW_MAX_DIM, PREVIEW_MAX_DIM);
    let rgba = thumb.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(Handle::from_rgba(width, height, rgba.into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str) -> FileCandidate {
        FileCandidate {
            path: PathBuf::from(format!("/tmp/{name}")),
            file_name: name.to_string(),
            size: 1024,
            mime: "image/png".into(),
        }
    }

    fn candidates(count: usize) -> Vec<FileCandidate> {
        (0..count).map(|n| candidate(&format!("f{n}.png"))).collect()
    }

    fn test_handle() -> Handle {
        Handle::from_rgba(1, 1, vec![0, 0, 0, 255])
    }

    #[test]
    fn selection_fills_up_to_capacity() {
        let mut queue = UploadQueue::new();
        let admitted = queue.select_files(candidates(3));
        assert_eq!(admitted.len(), 3);
        assert_eq!(queue.items().len(), 3);
        assert_eq!(queue.validation(), None);
        // First selection activates the first item.
        assert_eq!(queue.active_index(), Some(0));
    }

    #[test]
    fn over_capacity_batch_is_truncated_with_a_message() {
        let mut queue = UploadQueue::new();
        queue.select_files(candidates(7));

        // 7 queued + 5 picked > 10: exactly 3 are admitted.
        let admitted = queue.select_files(candidates(5));
        assert_eq!(admitted.len(), 3);
        assert_eq!(queue.items().len(), MAX_FILES);
        assert_eq!(
            queue.validation(),
            Some("Only 3 files were added as the maximum is 10 files")
        );
    }

    #[test]
    fn full_queue_rejects_the_whole_batch() {
        let mut queue = UploadQueue::new();
        queue.select_files(candidates(10));

        let admitted = queue.select_files(candidates(1));
        assert!(admitted.is_empty());
        assert_eq!(
            queue.validation(),
            Some("You can only upload up to 10 images at once")
        );
    }

    #[test]
    fn oversized_files_are_skipped_individually() {
        let mut queue = UploadQueue::new();
        let mut big = candidate("big.png");
        big.size = MAX_FILE_SIZE + 1;

        let admitted = queue.select_files(vec![big, candidate("ok.png")]);
        assert_eq!(admitted.len(), 1);
        assert_eq!(queue.items()[0].file_name, "ok.png");
        assert_eq!(queue.validation(), Some("big.png is larger than 10MB"));
    }

    #[test]
    fn unknown_types_are_skipped_individually() {
        let mut queue = UploadQueue::new();
        let mut doc = candidate("notes.txt");
        doc.mime = String::new();

        queue.select_files(vec![doc]);
        assert!(queue.is_empty());
        assert!(queue.validation().unwrap().contains("notes.txt"));
    }

    #[test]
    fn removing_the_last_active_item_steps_back() {
        let mut queue = UploadQueue::new();
        queue.select_files(candidates(3));
        queue.set_active(2);

        queue.remove_file(2);
        assert_eq!(queue.active_index(), Some(1));
    }

    #[test]
    fn removing_a_middle_active_item_keeps_the_position() {
        let mut queue = UploadQueue::new();
        queue.select_files(candidates(3));
        queue.set_active(1);

        queue.remove_file(1);
        // The former index now points at what used to be the next item.
        assert_eq!(queue.active_index(), Some(1));
        assert_eq!(queue.items().len(), 2);
    }

    #[test]
    fn removing_before_the_active_item_shifts_it_down() {
        let mut queue = UploadQueue::new();
        queue.select_files(candidates(3));
        queue.set_active(2);

        queue.remove_file(0);
        assert_eq!(queue.active_index(), Some(1));
    }

    #[test]
    fn removing_the_only_item_clears_the_selection() {
        let mut queue = UploadQueue::new();
        queue.select_files(candidates(1));

        queue.remove_file(0);
        assert_eq!(queue.active_index(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn active_navigation_respects_bounds() {
        let mut queue = UploadQueue::new();
        queue.select_files(candidates(2));

        queue.navigate_active(-1);
        assert_eq!(queue.active_index(), Some(0));
        queue.navigate_active(1);
        assert_eq!(queue.active_index(), Some(1));
        queue.navigate_active(1);
        assert_eq!(queue.active_index(), Some(1));
    }

    #[test]
    fn tags_are_deduplicated_on_commit() {
        let mut queue = UploadQueue::new();
        queue.select_files(candidates(1));

        queue.set_tag_buffer("sky".into());
        queue.commit_tag();
        queue.set_tag_buffer(" sky ".into());
        queue.commit_tag();

        assert_eq!(queue.items()[0].tags, vec!["sky"]);
        assert!(queue.items()[0].tag_buffer.is_empty());
    }

    #[test]
    fn submit_is_gated_on_queue_and_flight_state() {
        let mut queue = UploadQueue::new();
        assert!(queue.begin_submit().is_none());

        queue.select_files(candidates(2));
        let first = queue.begin_submit().unwrap();
        assert_eq!(first.file_name, "f0.png");
        assert!(queue.is_submitting());

        // A second submit while in flight is refused.
        assert!(queue.begin_submit().is_none());
    }

    #[test]
    fn submission_walks_the_queue_in_order_then_clears() {
        let mut queue = UploadQueue::new();
        queue.select_files(candidates(2));

        queue.begin_submit().unwrap();
        let second = queue.next_after_success().unwrap();
        assert_eq!(second.file_name, "f1.png");

        assert!(queue.next_after_success().is_none());
        assert!(queue.is_empty());
        assert!(!queue.is_submitting());
        assert_eq!(queue.progress(), 100.0);
        assert_eq!(queue.active_index(), None);
    }

    #[test]
    fn failure_preserves_the_queue_for_retry() {
        let mut queue = UploadQueue::new();
        queue.select_files(candidates(2));

        queue.begin_submit().unwrap();
        queue.fail_submit(&Error::Network("connection reset".into()));

        assert_eq!(queue.items().len(), 2);
        assert!(!queue.is_submitting());
        assert!(queue.error().is_some());
        // Retry starts over from the first item.
        assert_eq!(queue.begin_submit().unwrap().file_name, "f0.png");
    }

    #[test]
    fn progress_ticks_to_the_ceiling_only() {
        let mut queue = UploadQueue::new();
        queue.select_files(candidates(1));
        queue.begin_submit().unwrap();

        for _ in 0..40 {
            queue.tick();
        }
        assert_eq!(queue.progress(), PROGRESS_CEILING);

        assert!(queue.next_after_success().is_none());
        assert_eq!(queue.progress(), 100.0);
    }

    #[test]
    fn ticks_outside_a_submission_do_nothing() {
        let mut queue = UploadQueue::new();
        queue.select_files(candidates(1));
        queue.tick();
        assert_eq!(queue.progress(), 0.0);
    }

    #[test]
    fn preview_release_is_idempotent() {
        let mut registry = PreviewRegistry::new();
        let id = Uuid::new_v4();

        registry.acquire(id);
        assert!(registry.fulfill(id, test_handle()));
        assert!(registry.get(&id).is_some());

        assert!(registry.release(&id));
        assert!(!registry.release(&id));
        assert!(registry.get(&id).is_none());
    }

    #[test]
    fn late_decode_after_release_is_dropped() {
        let mut registry = PreviewRegistry::new();
        let id = Uuid::new_v4();

        registry.acquire(id);
        registry.release(&id);

        // The decode finished after the file was removed.
        assert!(!registry.fulfill(id, test_handle()));
        assert!(registry.get(&id).is_none());
    }

    #[test]
    fn removing_a_file_releases_its_preview() {
        let mut queue = UploadQueue::new();
        let admitted = queue.select_files(candidates(1));
        let (local_id, _) = admitted[0];

        queue.attach_preview(local_id, Ok(test_handle()));
        assert!(queue.preview(&local_id).is_some());

        queue.remove_file(0);
        assert!(queue.preview(&local_id).is_none());
    }

    #[tokio::test]
    async fn preview_decode_of_a_missing_file_fails() {
        let (_, result) = load_preview(Uuid::new_v4(), PathBuf::from("/nonexistent/image.png")).await;
        assert!(result.is_err());
    }

    #[test]
    fn mime_mapping_follows_the_allow_list() {
        assert_eq!(mime_for_extension(Path::new("a.JPG")), Some("image/jpg"));
        assert_eq!(mime_for_extension(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_for_extension(Path::new("a.webp")), Some("image/webp"));
        assert_eq!(mime_for_extension(Path::new("a.txt")), None);
        assert_eq!(mime_for_extension(Path::new("noext")), None);
    }
}
