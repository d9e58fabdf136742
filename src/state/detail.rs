/// Image detail/edit overlay
///
/// State machine: `Viewing ⇄ Editing`, with an orthogonal delete
/// confirmation reachable only from `Viewing`. The current image is
/// tracked by id -- never by a cached index -- because the backing
/// array changes underneath the overlay (new page loaded, record
/// deleted elsewhere). The index is derived on demand and every
/// navigation guards against the id having vanished.
///
/// A confirmed delete hands the id upward and the overlay is closed by
/// its owner; the gallery cache removes the record optimistically
/// while the request is still in flight.

use crate::api::types::{GalleryImage, ImageUpdate};
use crate::state::tags;

#[derive(Debug)]
pub enum Mode {
    Viewing,
    Editing(EditForm),
}

/// The metadata form while editing, carrying the snapshot it was
/// opened with. Save stays disabled until the form differs from the
/// snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct EditForm {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub tag_buffer: String,
    snapshot: Snapshot,
}

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    title: String,
    description: String,
    tags: Vec<String>,
}

impl EditForm {
    fn from_image(image: &GalleryImage) -> Self {
        let snapshot = Snapshot {
            title: image.title.clone().unwrap_or_default(),
            description: image.description.clone().unwrap_or_default(),
            tags: image.tags.clone(),
        };
        EditForm {
            title: snapshot.title.clone(),
            description: snapshot.description.clone(),
            tags: snapshot.tags.clone(),
            tag_buffer: String::new(),
            snapshot,
        }
    }

    /// Whether the form differs from the values it was opened with.
    pub fn is_dirty(&self) -> bool {
        self.title != self.snapshot.title
            || self.description != self.snapshot.description
            || self.tags != self.snapshot.tags
    }

    fn to_update(&self) -> ImageUpdate {
        ImageUpdate {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            tags: Some(self.tags.clone()),
        }
    }
}

#[derive(Debug)]
pub struct DetailOverlay {
    current_id: String,
    mode: Mode,
    confirming_delete: bool,
    saving: bool,
    error: Option<String>,
}

impl DetailOverlay {
    pub fn open(image: &GalleryImage) -> Self {
        DetailOverlay {
            current_id: image.id.clone(),
            mode: Mode::Viewing,
            confirming_delete: false,
            saving: false,
            error: None,
        }
    }

    pub fn current_id(&self) -> &str {
        &self.current_id
    }

    /// Bounds-checked index derivation, recomputed per call. Yields
    /// `None` when the id has disappeared from the array.
    pub fn current_index(&self, all: &[&GalleryImage]) -> Option<usize> {
        all.iter().position(|image| image.id == self.current_id)
    }

    pub fn current_image<'a>(&self, all: &[&'a GalleryImage]) -> Option<&'a GalleryImage> {
        self.current_index(all).map(|index| all[index])
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, Mode::Editing(_))
    }

    pub fn is_confirming_delete(&self) -> bool {
        self.confirming_delete
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Arrow navigation is only live in plain viewing mode.
    pub fn can_navigate(&self) -> bool {
        matches!(self.mode, Mode::Viewing) && !self.confirming_delete && !self.saving
    }

    /// Escape may close the overlay unless a form or confirmation is
    /// up.
    pub fn can_close(&self) -> bool {
        matches!(self.mode, Mode::Viewing) && !self.confirming_delete && !self.saving
    }

    /// Move to the neighbouring image. A no-op outside bounds, while
    /// editing/confirming, or when the current id vanished from the
    /// array. Returns whether the current image changed.
    pub fn navigate(&mut self, all: &[&GalleryImage], delta: isize) -> bool {
        if !self.can_navigate() {
            return false;
        }
        let Some(index) = self.current_index(all) else {
            return false;
        };

        let target = index as isize + delta;
        if target < 0 || target as usize >= all.len() {
            return false;
        }

        self.current_id = all[target as usize].id.clone();
        self.error = None;
        true
    }

    // ---- editing ----

    /// Snapshot the current metadata into an edit form.
    pub fn begin_edit(&mut self, all: &[&GalleryImage]) {
        if self.is_editing() || self.confirming_delete || self.saving {
            return;
        }
        if let Some(image) = self.current_image(all) {
            self.mode = Mode::Editing(EditForm::from_image(image));
            self.error = None;
        }
    }

    /// Discard the form and return to viewing; the record is untouched.
    pub fn cancel_edit(&mut self) {
        if self.saving {
            return;
        }
        self.mode = Mode::Viewing;
        self.error = None;
    }

    pub fn edit_form(&self) -> Option<&EditForm> {
        match &self.mode {
            Mode::Editing(form) => Some(form),
            Mode::Viewing => None,
        }
    }

    pub fn set_title(&mut self, value: String) {
        if let Mode::Editing(form) = &mut self.mode {
            form.title = value;
        }
    }

    pub fn set_description(&mut self, value: String) {
        if let Mode::Editing(form) = &mut self.mode {
            form.description = value;
        }
    }

    pub fn set_tag_buffer(&mut self, value: String) {
        if let Mode::Editing(form) = &mut self.mode {
            form.tag_buffer = value;
        }
    }

    pub fn commit_tag(&mut self) {
        if let Mode::Editing(form) = &mut self.mode {
            let mut buffer = std::mem::take(&mut form.tag_buffer);
            tags::commit(&mut form.tags, &mut buffer);
            form.tag_buffer = buffer;
        }
    }

    pub fn remove_tag(&mut self, index: usize) {
        if let Mode::Editing(form) = &mut self.mode {
            tags::remove(&mut form.tags, index);
        }
    }

    /// Save is gated on the form actually differing from its snapshot.
    pub fn can_save(&self) -> bool {
        !self.saving
            && self
                .edit_form()
                .map(EditForm::is_dirty)
                .unwrap_or(false)
    }

    /// Begin the metadata update. Returns the id and payload to PUT.
    pub fn begin_save(&mut self) -> Option<(String, ImageUpdate)> {
        if !self.can_save() {
            return None;
        }
        let update = self.edit_form()?.to_update();
        self.saving = true;
        Some((self.current_id.clone(), update))
    }

    /// Successful save returns to viewing; the caller refetches. A
    /// failure keeps the form up with an inline message.
    pub fn save_finished(&mut self, result: Result<(), String>) {
        self.saving = false;
        match result {
            Ok(()) => {
                self.mode = Mode::Viewing;
                self.error = None;
            }
            Err(message) => {
                self.error = Some(message);
            }
        }
    }

    // ---- deletion ----

    /// Ask for confirmation. Only reachable from plain viewing.
    pub fn request_delete(&mut self) {
        if matches!(self.mode, Mode::Viewing) && !self.saving {
            self.confirming_delete = true;
        }
    }

    pub fn cancel_delete(&mut self) {
        self.confirming_delete = false;
    }

    /// Confirmed: returns the id to delete. The owner closes the
    /// overlay, removes the record optimistically, and issues the
    /// request in the background.
    pub fn confirm_delete(&mut self) -> Option<String> {
        if !self.confirming_delete {
            return None;
        }
        self.confirming_delete = false;
        Some(self.current_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn image(id: &str, title: Option<&str>) -> GalleryImage {
        GalleryImage {
            id: id.to_string(),
            title: title.map(String::from),
            description: None,
            tags: vec!["sky".into()],
            format: "jpeg".into(),
            width: 800,
            height: 600,
            url: format!("https://cdn.example.com/{id}.jpg"),
            thumbnail_url: None,
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn navigation_moves_by_id_within_bounds() {
        let a = image("a", None);
        let b = image("b", None);
        let c = image("c", None);
        let all = vec![&a, &b, &c];

        let mut overlay = DetailOverlay::open(&b);
        assert!(overlay.navigate(&all, 1));
        assert_eq!(overlay.current_id(), "c");

        // Beyond the end: no-op, current image unchanged.
        assert!(!overlay.navigate(&all, 1));
        assert_eq!(overlay.current_id(), "c");

        assert!(overlay.navigate(&all, -1));
        assert!(overlay.navigate(&all, -1));
        assert!(!overlay.navigate(&all, -1));
        assert_eq!(overlay.current_id(), "a");
    }

    #[test]
    fn navigation_is_disabled_while_editing() {
        let a = image("a", None);
        let b = image("b", None);
        let all = vec![&a, &b];

        let mut overlay = DetailOverlay::open(&a);
        overlay.begin_edit(&all);
        assert!(!overlay.navigate(&all, 1));
        assert_eq!(overlay.current_id(), "a");
    }

    #[test]
    fn navigation_is_disabled_while_confirming_delete() {
        let a = image("a", None);
        let b = image("b", None);
        let all = vec![&a, &b];

        let mut overlay = DetailOverlay::open(&a);
        overlay.request_delete();
        assert!(!overlay.navigate(&all, 1));
        assert!(!overlay.can_close());
    }

    #[test]
    fn vanished_id_guards_navigation() {
        let a = image("a", None);
        let b = image("b", None);
        let mut overlay = DetailOverlay::open(&a);

        // The current image was deleted elsewhere; the array no longer
        // contains it.
        let remaining = vec![&b];
        assert_eq!(overlay.current_index(&remaining), None);
        assert!(!overlay.navigate(&remaining, 1));
        assert!(!overlay.navigate(&remaining, -1));
    }

    #[test]
    fn index_tracks_the_mutating_array() {
        let a = image("a", None);
        let b = image("b", None);
        let c = image("c", None);
        let overlay = DetailOverlay::open(&b);

        let all = vec![&a, &b, &c];
        assert_eq!(overlay.current_index(&all), Some(1));

        // A record before the current one disappears: the derived
        // index follows, no stale cache involved.
        let shrunk = vec![&b, &c];
        assert_eq!(overlay.current_index(&shrunk), Some(0));
    }

    #[test]
    fn save_is_disabled_until_the_form_differs() {
        let a = image("a", Some("Sunset"));
        let all = vec![&a];
        let mut overlay = DetailOverlay::open(&a);

        overlay.begin_edit(&all);
        // Round-trip identity: untouched form cannot be saved.
        assert!(!overlay.can_save());

        overlay.set_title("Sunrise".into());
        assert!(overlay.can_save());

        overlay.set_title("Sunset".into());
        assert!(!overlay.can_save());
    }

    #[test]
    fn tag_edits_count_as_dirty() {
        let a = image("a", None);
        let all = vec![&a];
        let mut overlay = DetailOverlay::open(&a);

        overlay.begin_edit(&all);
        overlay.set_tag_buffer("ocean".into());
        assert!(!overlay.can_save());

        overlay.commit_tag();
        assert!(overlay.can_save());

        overlay.remove_tag(1);
        assert!(!overlay.can_save());
    }

    #[test]
    fn cancel_discards_the_form() {
        let a = image("a", Some("Sunset"));
        let all = vec![&a];
        let mut overlay = DetailOverlay::open(&a);

        overlay.begin_edit(&all);
        overlay.set_title("changed".into());
        overlay.cancel_edit();

        assert!(!overlay.is_editing());
        // Re-entering snapshots afresh from the record.
        overlay.begin_edit(&all);
        assert_eq!(overlay.edit_form().unwrap().title, "Sunset");
    }

    #[test]
    fn save_flow_returns_to_viewing_on_success() {
        let a = image("a", None);
        let all = vec![&a];
        let mut overlay = DetailOverlay::open(&a);

        overlay.begin_edit(&all);
        overlay.set_title("named".into());
        let (id, update) = overlay.begin_save().unwrap();
        assert_eq!(id, "a");
        assert_eq!(update.title.as_deref(), Some("named"));
        assert!(overlay.is_saving());

        // No double submission while in flight.
        assert!(overlay.begin_save().is_none());

        overlay.save_finished(Ok(()));
        assert!(!overlay.is_editing());
        assert!(overlay.error().is_none());
    }

    #[test]
    fn failed_save_keeps_the_form_with_a_message() {
        let a = image("a", None);
        let all = vec![&a];
        let mut overlay = DetailOverlay::open(&a);

        overlay.begin_edit(&all);
        overlay.set_title("named".into());
        overlay.begin_save().unwrap();
        overlay.save_finished(Err("request failed".into()));

        assert!(overlay.is_editing());
        assert_eq!(overlay.error(), Some("request failed"));
        assert!(overlay.can_save());
    }

    #[test]
    fn delete_requires_confirmation_from_viewing() {
        let a = image("a", None);
        let all = vec![&a];
        let mut overlay = DetailOverlay::open(&a);

        // Not confirming yet: nothing to confirm.
        assert!(overlay.confirm_delete().is_none());

        overlay.begin_edit(&all);
        overlay.request_delete();
        assert!(!overlay.is_confirming_delete());
        overlay.cancel_edit();

        overlay.request_delete();
        assert!(overlay.is_confirming_delete());
        assert_eq!(overlay.confirm_delete().as_deref(), Some("a"));
        assert!(!overlay.is_confirming_delete());
    }

    #[test]
    fn cancelling_the_confirmation_returns_to_viewing() {
        let a = image("a", None);
        let b = image("b", None);
        let all = vec![&a, &b];
        let mut overlay = DetailOverlay::open(&a);

        overlay.request_delete();
        overlay.cancel_delete();

        assert!(!overlay.is_confirming_delete());
        assert!(overlay.navigate(&all, 1));
    }
}
