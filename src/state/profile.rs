/// Profile editor state
///
/// One form serves both creation and update: a 404 (or an empty
/// record) on the initial fetch means "no profile yet" and switches
/// the submission to POST; an existing profile pre-fills the form and
/// submits as PUT.

use iced::widget::image::Handle;

use crate::api::client::{AvatarFile, ProfilePayload};
use crate::api::types::Profile;
use crate::error::Error;
use crate::state::upload::FileCandidate;

/// Largest accepted avatar, in bytes (5MB).
pub const MAX_AVATAR_SIZE: u64 = 5 * 1024 * 1024;

/// Avatar allow-list -- narrower than gallery uploads (no gif).
pub const ACCEPTED_AVATAR_TYPES: [&str; 4] =
    ["image/jpeg", "image/jpg", "image/png", "image/webp"];

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Success(String),
    Error(String),
}

#[derive(Debug)]
pub struct ProfileEditor {
    load: LoadState,
    existing: Option<Profile>,
    pub first_name: String,
    pub last_name: String,
    avatar: Option<FileCandidate>,
    avatar_preview: Option<Handle>,
    saving: bool,
    notice: Option<Notice>,
}

impl ProfileEditor {
    pub fn new() -> Self {
        ProfileEditor {
            load: LoadState::Loading,
            existing: None,
            first_name: String::new(),
            last_name: String::new(),
            avatar: None,
            avatar_preview: None,
            saving: false,
            notice: None,
        }
    }

    /// Apply the initial `GET /profile` outcome. `NotFound` is the
    /// legitimate "create profile" state, not an error.
    pub fn loaded(&mut self, result: Result<Profile, Error>) {
        match result {
            Ok(profile) if profile_exists(&profile) => {
                self.first_name = profile.first_name.clone();
                self.last_name = profile.last_name.clone();
                self.existing = Some(profile);
                self.load = LoadState::Ready;
            }
            // A 200 with an empty object also means "not created yet".
            Ok(_) | Err(Error::NotFound) => {
                self.existing = None;
                self.load = LoadState::Ready;
            }
            Err(err) => {
                self.load = LoadState::Failed(err.to_string());
            }
        }
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    /// Whether a profile already exists (drives POST vs PUT and the
    /// "Create Profile" vs "Update Profile" heading).
    pub fn exists(&self) -> bool {
        self.existing.is_some()
    }

    pub fn existing(&self) -> Option<&Profile> {
        self.existing.as_ref()
    }

    pub fn avatar_preview(&self) -> Option<&Handle> {
        self.avatar_preview.as_ref()
    }

    pub fn pending_avatar(&self) -> Option<&FileCandidate> {
        self.avatar.as_ref()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_first_name(&mut self, value: String) {
        self.first_name = value;
        self.notice = None;
    }

    pub fn set_last_name(&mut self, value: String) {
        self.last_name = value;
        self.notice = None;
    }

    /// Validate and adopt a newly picked avatar. Returns whether the
    /// file was accepted (so the caller can start a preview decode).
    pub fn select_avatar(&mut self, candidate: FileCandidate) -> bool {
        if candidate.size > MAX_AVATAR_SIZE {
            self.notice = Some(Notice::Error("File size must be less than 5MB".into()));
            return false;
        }
        if !ACCEPTED_AVATAR_TYPES.contains(&candidate.mime.as_str()) {
            self.notice = Some(Notice::Error(
                "Only .jpg, .jpeg, .png, and .webp files are accepted".into(),
            ));
            return false;
        }

        self.avatar = Some(candidate);
        self.avatar_preview = None;
        self.notice = None;
        true
    }

    pub fn attach_avatar_preview(&mut self, result: Result<Handle, Error>) {
        match result {
            Ok(handle) => self.avatar_preview = Some(handle),
            Err(err) => log::warn!("avatar preview decode failed: {err}"),
        }
    }

    /// Begin submission. Returns the payload and whether this is an
    /// update (PUT) rather than a creation (POST), or records an
    /// inline validation notice and returns `None`.
    pub fn begin_save(&mut self) -> Option<(ProfilePayload, bool)> {
        if self.saving {
            return None;
        }
        if self.first_name.trim().is_empty() {
            self.notice = Some(Notice::Error("First name is required.".into()));
            return None;
        }
        if self.last_name.trim().is_empty() {
            self.notice = Some(Notice::Error("Last name is required.".into()));
            return None;
        }

        let payload = ProfilePayload {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            avatar: self.avatar.as_ref().map(|file| AvatarFile {
                path: file.path.clone(),
                file_name: file.file_name.clone(),
                mime: file.mime.clone(),
            }),
        };

        self.saving = true;
        self.notice = None;
        Some((payload, self.exists()))
    }

    pub fn save_finished(&mut self, result: Result<Profile, Error>) {
        self.saving = false;
        match result {
            Ok(profile) => {
                let created = self.existing.is_none();
                self.notice = Some(Notice::Success(if created {
                    "Profile created successfully!".into()
                } else {
                    "Profile updated successfully!".into()
                }));
                self.first_name = profile.first_name.clone();
                self.last_name = profile.last_name.clone();
                self.existing = Some(profile);
                self.avatar = None;
            }
            Err(err) => {
                self.notice = Some(Notice::Error(err.to_string()));
            }
        }
    }
}

/// The backend answers an empty object rather than a 404 on some
/// deployments; both mean the profile has not been created.
fn profile_exists(profile: &Profile) -> bool {
    !profile.first_name.is_empty()
        || !profile.last_name.is_empty()
        || profile.profile_image.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn candidate(size: u64, mime: &str) -> FileCandidate {
        FileCandidate {
            path: PathBuf::from("/tmp/avatar.png"),
            file_name: "avatar.png".into(),
            size,
            mime: mime.into(),
        }
    }

    #[test]
    fn not_found_renders_the_create_state() {
        let mut editor = ProfileEditor::new();
        editor.loaded(Err(Error::NotFound));

        assert_eq!(*editor.load_state(), LoadState::Ready);
        assert!(!editor.exists());
    }

    #[test]
    fn empty_record_also_renders_the_create_state() {
        let mut editor = ProfileEditor::new();
        editor.loaded(Ok(Profile {
            first_name: String::new(),
            last_name: String::new(),
            profile_image: None,
        }));

        assert_eq!(*editor.load_state(), LoadState::Ready);
        assert!(!editor.exists());
    }

    #[test]
    fn other_errors_fail_the_load() {
        let mut editor = ProfileEditor::new();
        editor.loaded(Err(Error::Network("timeout".into())));
        assert!(matches!(editor.load_state(), LoadState::Failed(_)));
    }

    #[test]
    fn existing_profile_prefills_and_updates() {
        let mut editor = ProfileEditor::new();
        editor.loaded(Ok(Profile {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            profile_image: None,
        }));

        assert!(editor.exists());
        assert_eq!(editor.first_name, "Ada");

        editor.set_first_name("Ada A.".into());
        let (payload, is_update) = editor.begin_save().unwrap();
        assert!(is_update);
        assert_eq!(payload.first_name, "Ada A.");
    }

    #[test]
    fn names_are_required() {
        let mut editor = ProfileEditor::new();
        editor.loaded(Err(Error::NotFound));

        assert!(editor.begin_save().is_none());
        assert_eq!(
            editor.notice(),
            Some(&Notice::Error("First name is required.".into()))
        );

        editor.set_first_name("Ada".into());
        assert!(editor.begin_save().is_none());
        assert_eq!(
            editor.notice(),
            Some(&Notice::Error("Last name is required.".into()))
        );
    }

    #[test]
    fn successful_creation_switches_to_update_mode() {
        let mut editor = ProfileEditor::new();
        editor.loaded(Err(Error::NotFound));
        editor.set_first_name("Ada".into());
        editor.set_last_name("Lovelace".into());

        let (_, is_update) = editor.begin_save().unwrap();
        assert!(!is_update);

        editor.save_finished(Ok(Profile {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            profile_image: Some("https://cdn.example.com/a.jpg".into()),
        }));

        assert!(editor.exists());
        assert_eq!(
            editor.notice(),
            Some(&Notice::Success("Profile created successfully!".into()))
        );
    }

    #[test]
    fn oversized_avatar_is_rejected_inline() {
        let mut editor = ProfileEditor::new();
        editor.loaded(Err(Error::NotFound));

        assert!(!editor.select_avatar(candidate(MAX_AVATAR_SIZE + 1, "image/png")));
        assert_eq!(
            editor.notice(),
            Some(&Notice::Error("File size must be less than 5MB".into()))
        );
    }

    #[test]
    fn gif_avatars_are_rejected() {
        let mut editor = ProfileEditor::new();
        editor.loaded(Err(Error::NotFound));

        assert!(!editor.select_avatar(candidate(1024, "image/gif")));
        assert!(editor.select_avatar(candidate(1024, "image/webp")));
        assert!(editor.pending_avatar().is_some());
    }

    #[test]
    fn double_submission_is_blocked() {
        let mut editor = ProfileEditor::new();
        editor.loaded(Err(Error::NotFound));
        editor.set_first_name("Ada".into());
        editor.set_last_name("Lovelace".into());

        assert!(editor.begin_save().is_some());
        assert!(editor.is_saving());
        assert!(editor.begin_save().is_none());
    }
}
