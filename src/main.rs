use std::collections::HashSet;
use std::time::Duration;

use iced::keyboard::{self, key};
use iced::widget::{button, center, column, mouse_area, opaque, row, stack, text};
use iced::{window, Alignment, Element, Event, Length, Size, Subscription, Task, Theme};
use uuid::Uuid;

// Declare the application modules
mod api;
mod config;
mod error;
mod state;
mod ui;

use crate::api::auth::AuthClient;
use crate::api::client::{ApiClient, ImagePayload};
use crate::api::types::GalleryImage;
use crate::config::Config;
use crate::error::Error;
use crate::state::detail::DetailOverlay;
use crate::state::gallery::{FetchRequest, PageCache};
use crate::state::images::ImageCache;
use crate::state::profile::ProfileEditor;
use crate::state::session::SessionStore;
use crate::state::upload::{self, FileCandidate, PendingUpload, UploadQueue};
use crate::ui::auth::{AuthForm, AuthMessage};
use crate::ui::detail::DetailMessage;
use crate::ui::gallery::{GalleryMessage, FETCH_AHEAD_OFFSET};
use crate::ui::profile::ProfileMessage;
use crate::ui::upload::UploadMessage;

/// Interval of the synthetic upload progress timer.
const PROGRESS_TICK: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    SignIn,
    SignUp,
    CheckEmail,
    Gallery,
    Profile,
}

/// Main application state
struct LumenGallery {
    /// The one process-wide session store
    session: SessionStore,
    auth: AuthClient,
    api: ApiClient,
    screen: Screen,
    auth_form: AuthForm,
    /// The one process-wide gallery page cache
    gallery: PageCache,
    /// Downloaded remote assets, shared by the grid, the overlay and
    /// the profile avatar
    remote_images: ImageCache,
    /// `Some` while multi-select mode is active
    selection: Option<HashSet<String>>,
    bulk_confirming: bool,
    detail: Option<DetailOverlay>,
    /// `Some` while the upload dialog is open
    upload: Option<UploadQueue>,
    profile: ProfileEditor,
    viewport_width: f32,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    Auth(AuthMessage),
    Gallery(GalleryMessage),
    Detail(DetailMessage),
    Upload(UploadMessage),
    Profile(ProfileMessage),
    /// A remote asset finished downloading.
    ImageFetched(String, Result<Vec<u8>, Error>),
    KeyPressed(keyboard::Key),
    WindowResized(f32),
    ProgressTick,
    SessionRefreshed(Result<api::auth::Session, Error>),
    OpenGallery,
    OpenProfile,
    SignOut,
    SignOutFinished(Result<(), Error>),
}

impl LumenGallery {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        // Without the auth provider endpoints the app cannot sign
        // anyone in, so there is nothing sensible to fall back to.
        let config = Config::from_env()
            .expect("Missing configuration. Set AUTH_API_URL and AUTH_API_KEY in the environment or a .env file.");

        let auth = AuthClient::new(config.auth_url.clone(), config.auth_key.clone());
        let api = ApiClient::new(config.api_url.clone());

        let mut session = SessionStore::new();
        let restored = session.restore().unwrap_or_else(|err| {
            log::warn!("could not restore session: {err}");
            None
        });

        let mut app = LumenGallery {
            session,
            auth,
            api,
            screen: Screen::SignIn,
            auth_form: AuthForm::default(),
            gallery: PageCache::new(),
            remote_images: ImageCache::new(),
            selection: None,
            bulk_confirming: false,
            detail: None,
            upload: None,
            profile: ProfileEditor::new(),
            viewport_width: 1280.0,
        };

        let task = match restored {
            Some(session) if !session.is_expired() => app.enter_gallery(),
            Some(session) => {
                // Expired but restorable: trade the refresh token for a
                // fresh session before showing anything protected.
                log::info!("restored session is expired, refreshing");
                let auth = app.auth.clone();
                Task::perform(
                    async move { auth.refresh(&session.refresh_token).await },
                    Message::SessionRefreshed,
                )
            }
            None => Task::none(),
        };

        (app, task)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Auth(message) => self.update_auth(message),
            Message::Gallery(message) => self.update_gallery(message),
            Message::Detail(message) => self.update_detail(message),
            Message::Upload(message) => self.update_upload(message),
            Message::Profile(message) => self.update_profile(message),
            Message::ImageFetched(url, result) => {
                self.remote_images.fulfill(url, result);
                Task::none()
            }
            Message::KeyPressed(key) => self.handle_key(key),
            Message::WindowResized(width) => {
                self.viewport_width = width;
                Task::none()
            }
            Message::ProgressTick => {
                if let Some(queue) = &mut self.upload {
                    queue.tick();
                }
                Task::none()
            }
            Message::SessionRefreshed(result) => match result {
                Ok(session) => {
                    if let Err(err) = self.session.set(session) {
                        log::warn!("could not persist refreshed session: {err}");
                    }
                    self.enter_gallery()
                }
                Err(err) => {
                    log::info!("session refresh failed: {err}");
                    self.sign_out_local();
                    Task::none()
                }
            },
            Message::OpenGallery => self.enter_gallery(),
            Message::OpenProfile => self.enter_profile(),
            Message::SignOut => {
                let token = self.session.token().map(str::to_owned);
                // Local cleanup happens regardless of the remote call.
                self.sign_out_local();
                match token {
                    Some(token) => {
                        let auth = self.auth.clone();
                        Task::perform(
                            async move { auth.sign_out(&token).await },
                            Message::SignOutFinished,
                        )
                    }
                    None => Task::none(),
                }
            }
            Message::SignOutFinished(result) => {
                if let Err(err) = result {
                    log::warn!("remote sign-out failed: {err}");
                }
                Task::none()
            }
        }
    }

    // ---- auth ----

    fn update_auth(&mut self, message: AuthMessage) -> Task<Message> {
        match message {
            AuthMessage::EmailChanged(value) => {
                self.auth_form.email = value;
                self.auth_form.error = None;
                Task::none()
            }
            AuthMessage::PasswordChanged(value) => {
                self.auth_form.password = value;
                self.auth_form.error = None;
                Task::none()
            }
            AuthMessage::Submit => {
                if self.auth_form.submitting {
                    return Task::none();
                }
                if let Err(message) = self.auth_form.validate() {
                    self.auth_form.error = Some(message);
                    return Task::none();
                }

                self.auth_form.submitting = true;
                self.auth_form.error = None;
                let auth = self.auth.clone();
                let email = self.auth_form.email.trim().to_string();
                let password = self.auth_form.password.clone();

                if self.screen == Screen::SignUp {
                    Task::perform(
                        async move { auth.sign_up(&email, &password).await },
                        |result| Message::Auth(AuthMessage::SignedUp(result)),
                    )
                } else {
                    Task::perform(
                        async move { auth.sign_in(&email, &password).await },
                        |result| Message::Auth(AuthMessage::SignedIn(result)),
                    )
                }
            }
            AuthMessage::SignedIn(result) => {
                self.auth_form.submitting = false;
                match result {
                    Ok(session) => {
                        log::info!("signed in as {}", session.user.email);
                        if let Err(err) = self.session.set(session) {
                            log::warn!("could not persist session: {err}");
                        }
                        self.auth_form.reset();
                        self.enter_profile()
                    }
                    Err(Error::Auth(_)) => {
                        self.auth_form.error = Some(
                            "Incorrect email or password. Try again or create an account.".into(),
                        );
                        Task::none()
                    }
                    Err(err) => {
                        self.auth_form.error = Some(err.to_string());
                        Task::none()
                    }
                }
            }
            AuthMessage::SignedUp(result) => {
                self.auth_form.submitting = false;
                match result {
                    Ok(()) => {
                        self.auth_form.reset();
                        self.screen = Screen::CheckEmail;
                    }
                    Err(Error::Auth(message)) => {
                        self.auth_form.error = Some(message);
                    }
                    Err(err) => {
                        self.auth_form.error = Some(err.to_string());
                    }
                }
                Task::none()
            }
            AuthMessage::GoToSignUp => {
                self.screen = Screen::SignUp;
                self.auth_form.reset();
                Task::none()
            }
            AuthMessage::GoToSignIn => {
                self.screen = Screen::SignIn;
                self.auth_form.reset();
                Task::none()
            }
        }
    }

    // ---- gallery ----

    fn update_gallery(&mut self, message: GalleryMessage) -> Task<Message> {
        match message {
            GalleryMessage::Scrolled(offset) => {
                if offset.y >= FETCH_AHEAD_OFFSET {
                    if let Some(request) = self.gallery.begin_append() {
                        return self.run_page_fetch(request);
                    }
                }
                Task::none()
            }
            GalleryMessage::Retry => {
                if let Some(request) = self.gallery.begin_append() {
                    self.run_page_fetch(request)
                } else {
                    let request = self.gallery.begin_refresh();
                    self.run_page_fetch(request)
                }
            }
            GalleryMessage::PageFetched(request, result) => {
                if let Err(err) = &result {
                    if self.kicked_out(err) {
                        return Task::none();
                    }
                }
                let follow_up = self.gallery.finish(request, result);
                let mut tasks = vec![self.request_gallery_images()];
                if let Some(next) = follow_up {
                    tasks.push(self.run_page_fetch(next));
                }
                Task::batch(tasks)
            }
            GalleryMessage::OpenImage(id) => {
                let Some(record) = self.gallery.find(&id) else {
                    return Task::none();
                };
                let url = record.url.clone();
                self.detail = Some(DetailOverlay::open(record));

                let to_fetch = self.remote_images.request([url.as_str()]);
                self.spawn_image_fetches(to_fetch)
            }
            GalleryMessage::OpenUpload => {
                self.upload = Some(UploadQueue::new());
                Task::none()
            }
            GalleryMessage::QuickUpload => {
                // The no-frills entry point: same validated queue, no
                // metadata step, submission starts immediately.
                let picked = rfd::FileDialog::new()
                    .set_title("Select Images")
                    .add_filter("Images", &["jpg", "jpeg", "png", "webp", "gif"])
                    .pick_files();
                let Some(paths) = picked else {
                    return Task::none();
                };

                let mut candidates = Vec::new();
                for path in paths {
                    match FileCandidate::probe(path) {
                        Ok(candidate) => candidates.push(candidate),
                        Err(err) => log::warn!("skipping unreadable file: {err}"),
                    }
                }

                let mut queue = UploadQueue::new();
                let admitted = queue.select_files(candidates);
                let previews = Task::batch(admitted.into_iter().map(|(local_id, path)| {
                    Task::perform(upload::load_preview(local_id, path), |(id, result)| {
                        Message::Upload(UploadMessage::PreviewLoaded(id, result))
                    })
                }));

                self.upload = Some(queue);
                let submit = match self.upload.as_mut().and_then(UploadQueue::begin_submit) {
                    Some(item) => self.run_upload(item),
                    // Nothing admitted: the dialog stays up showing the
                    // validation message.
                    None => Task::none(),
                };
                Task::batch([previews, submit])
            }
            GalleryMessage::ToggleSelectMode => {
                self.bulk_confirming = false;
                // Leaving multi-select mode always clears the set.
                self.selection = match self.selection {
                    Some(_) => None,
                    None => Some(HashSet::new()),
                };
                Task::none()
            }
            GalleryMessage::ToggleSelected(id) => {
                if let Some(selected) = &mut self.selection {
                    if !selected.remove(&id) {
                        selected.insert(id);
                    }
                }
                Task::none()
            }
            GalleryMessage::RequestBulkDelete => {
                if self.selection.as_ref().is_some_and(|s| !s.is_empty()) {
                    self.bulk_confirming = true;
                }
                Task::none()
            }
            GalleryMessage::CancelBulkDelete => {
                self.bulk_confirming = false;
                Task::none()
            }
            GalleryMessage::ConfirmBulkDelete => {
                self.bulk_confirming = false;
                let Some(selected) = self.selection.take() else {
                    return Task::none();
                };
                if selected.is_empty() {
                    return Task::none();
                }

                // Optimistic: the records leave the flattened view now,
                // before the request resolves.
                self.gallery.remove_local(&selected);

                let ids: Vec<String> = selected.into_iter().collect();
                let count = ids.len();
                let Some(token) = self.session.token().map(str::to_owned) else {
                    return Task::none();
                };
                let api = self.api.clone();
                Task::perform(
                    async move { api.delete_images(&token, ids).await },
                    move |result| Message::Gallery(GalleryMessage::BulkDeleted(count, result)),
                )
            }
            GalleryMessage::BulkDeleted(count, result) => {
                match &result {
                    Ok(ack) => log::info!("deleted {} of {count} images", ack.deleted_count),
                    Err(err) => {
                        if self.kicked_out(err) {
                            return Task::none();
                        }
                        // No rollback of the optimistic removal; the
                        // refresh below resurfaces whatever survived.
                        log::error!("bulk delete failed: {err}");
                    }
                }
                let request = self.gallery.begin_refresh();
                self.run_page_fetch(request)
            }
        }
    }

    // ---- detail overlay ----

    fn update_detail(&mut self, message: DetailMessage) -> Task<Message> {
        match message {
            DetailMessage::Close => {
                if self.detail.as_ref().is_some_and(DetailOverlay::can_close) {
                    self.detail = None;
                }
                Task::none()
            }
            DetailMessage::Previous => self.navigate_detail(-1),
            DetailMessage::Next => self.navigate_detail(1),
            DetailMessage::BeginEdit => {
                let all: Vec<&GalleryImage> = self.gallery.images().collect();
                if let Some(overlay) = self.detail.as_mut() {
                    overlay.begin_edit(&all);
                }
                Task::none()
            }
            DetailMessage::CancelEdit => {
                if let Some(overlay) = self.detail.as_mut() {
                    overlay.cancel_edit();
                }
                Task::none()
            }
            DetailMessage::TitleChanged(value) => {
                if let Some(overlay) = self.detail.as_mut() {
                    overlay.set_title(value);
                }
                Task::none()
            }
            DetailMessage::DescriptionChanged(value) => {
                if let Some(overlay) = self.detail.as_mut() {
                    overlay.set_description(value);
                }
                Task::none()
            }
            DetailMessage::TagBufferChanged(value) => {
                if let Some(overlay) = self.detail.as_mut() {
                    overlay.set_tag_buffer(value);
                }
                Task::none()
            }
            DetailMessage::CommitTag => {
                if let Some(overlay) = self.detail.as_mut() {
                    overlay.commit_tag();
                }
                Task::none()
            }
            DetailMessage::RemoveTag(index) => {
                if let Some(overlay) = self.detail.as_mut() {
                    overlay.remove_tag(index);
                }
                Task::none()
            }
            DetailMessage::Save => {
                let Some((id, update)) = self.detail.as_mut().and_then(DetailOverlay::begin_save)
                else {
                    return Task::none();
                };
                let Some(token) = self.session.token().map(str::to_owned) else {
                    return Task::none();
                };
                let api = self.api.clone();
                Task::perform(
                    async move { api.update_image(&token, &id, update).await },
                    |result| Message::Detail(DetailMessage::Saved(result)),
                )
            }
            DetailMessage::Saved(result) => match result {
                Ok(_) => {
                    if let Some(overlay) = self.detail.as_mut() {
                        overlay.save_finished(Ok(()));
                    }
                    let request = self.gallery.begin_refresh();
                    self.run_page_fetch(request)
                }
                Err(err) => {
                    if self.kicked_out(&err) {
                        return Task::none();
                    }
                    if let Some(overlay) = self.detail.as_mut() {
                        overlay.save_finished(Err(err.to_string()));
                    }
                    Task::none()
                }
            },
            DetailMessage::RequestDelete => {
                if let Some(overlay) = self.detail.as_mut() {
                    overlay.request_delete();
                }
                Task::none()
            }
            DetailMessage::CancelDelete => {
                if let Some(overlay) = self.detail.as_mut() {
                    overlay.cancel_delete();
                }
                Task::none()
            }
            DetailMessage::ConfirmDelete => {
                let Some(id) = self.detail.as_mut().and_then(DetailOverlay::confirm_delete)
                else {
                    return Task::none();
                };

                // Close the overlay and strip the record before the
                // request resolves.
                self.detail = None;
                self.gallery.remove_one(&id);

                let Some(token) = self.session.token().map(str::to_owned) else {
                    return Task::none();
                };
                let api = self.api.clone();
                let request_id = id.clone();
                Task::perform(
                    async move { api.delete_image(&token, &request_id).await },
                    move |result| Message::Detail(DetailMessage::DeleteFinished(id.clone(), result)),
                )
            }
            DetailMessage::DeleteFinished(id, result) => {
                match &result {
                    Ok(()) => log::info!("deleted image {id}"),
                    Err(err) => {
                        if self.kicked_out(err) {
                            return Task::none();
                        }
                        log::error!("delete of {id} failed: {err}");
                    }
                }
                // Reconcile against the authoritative state either way.
                let request = self.gallery.begin_refresh();
                self.run_page_fetch(request)
            }
        }
    }

    fn navigate_detail(&mut self, delta: isize) -> Task<Message> {
        let all: Vec<&GalleryImage> = self.gallery.images().collect();
        let moved = self
            .detail
            .as_mut()
            .map(|overlay| overlay.navigate(&all, delta))
            .unwrap_or(false);
        if !moved {
            return Task::none();
        }

        let url = self
            .detail
            .as_ref()
            .and_then(|overlay| overlay.current_image(&all))
            .map(|record| record.url.clone());

        match url {
            Some(url) => {
                let to_fetch = self.remote_images.request([url.as_str()]);
                self.spawn_image_fetches(to_fetch)
            }
            None => Task::none(),
        }
    }

    // ---- upload dialog ----

    fn update_upload(&mut self, message: UploadMessage) -> Task<Message> {
        match message {
            UploadMessage::Close => {
                if let Some(queue) = &mut self.upload {
                    if queue.is_submitting() {
                        return Task::none();
                    }
                    queue.teardown();
                }
                self.upload = None;
                Task::none()
            }
            UploadMessage::PickFiles => {
                let Some(queue) = self.upload.as_mut() else {
                    return Task::none();
                };
                if queue.is_submitting() {
                    return Task::none();
                }

                // Show the native file picker dialog
                let picked = rfd::FileDialog::new()
                    .set_title("Select Images")
                    .add_filter("Images", &["jpg", "jpeg", "png", "webp", "gif"])
                    .pick_files();
                let Some(paths) = picked else {
                    return Task::none();
                };

                let mut candidates = Vec::new();
                for path in paths {
                    match FileCandidate::probe(path) {
                        Ok(candidate) => candidates.push(candidate),
                        Err(err) => log::warn!("skipping unreadable file: {err}"),
                    }
                }

                let admitted = queue.select_files(candidates);
                Task::batch(admitted.into_iter().map(|(local_id, path)| {
                    Task::perform(upload::load_preview(local_id, path), |(id, result)| {
                        Message::Upload(UploadMessage::PreviewLoaded(id, result))
                    })
                }))
            }
            UploadMessage::PreviewLoaded(local_id, result) => {
                if let Some(queue) = &mut self.upload {
                    queue.attach_preview(local_id, result);
                }
                Task::none()
            }
            UploadMessage::Remove(index) => {
                if let Some(queue) = &mut self.upload {
                    if !queue.is_submitting() {
                        queue.remove_file(index);
                    }
                }
                Task::none()
            }
            UploadMessage::ClearAll => {
                if let Some(queue) = &mut self.upload {
                    if !queue.is_submitting() {
                        queue.clear_files();
                    }
                }
                Task::none()
            }
            UploadMessage::SetActive(index) => {
                if let Some(queue) = &mut self.upload {
                    queue.set_active(index);
                }
                Task::none()
            }
            UploadMessage::PreviousImage => {
                if let Some(queue) = &mut self.upload {
                    queue.navigate_active(-1);
                }
                Task::none()
            }
            UploadMessage::NextImage => {
                if let Some(queue) = &mut self.upload {
                    queue.navigate_active(1);
                }
                Task::none()
            }
            UploadMessage::TitleChanged(value) => {
                if let Some(queue) = &mut self.upload {
                    queue.set_title(value);
                }
                Task::none()
            }
            UploadMessage::DescriptionChanged(value) => {
                if let Some(queue) = &mut self.upload {
                    queue.set_description(value);
                }
                Task::none()
            }
            UploadMessage::TagBufferChanged(value) => {
                if let Some(queue) = &mut self.upload {
                    queue.set_tag_buffer(value);
                }
                Task::none()
            }
            UploadMessage::CommitTag => {
                if let Some(queue) = &mut self.upload {
                    queue.commit_tag();
                }
                Task::none()
            }
            UploadMessage::RemoveTag(index) => {
                if let Some(queue) = &mut self.upload {
                    queue.remove_tag(index);
                }
                Task::none()
            }
            UploadMessage::Submit => {
                let Some(item) = self.upload.as_mut().and_then(UploadQueue::begin_submit) else {
                    return Task::none();
                };
                self.run_upload(item)
            }
            UploadMessage::ItemUploaded(result) => match result {
                Ok(()) => {
                    let next = self.upload.as_mut().and_then(UploadQueue::next_after_success);
                    match next {
                        Some(item) => self.run_upload(item),
                        None => {
                            // Whole batch done: close the dialog and
                            // refetch the authoritative gallery.
                            if let Some(queue) = &mut self.upload {
                                queue.teardown();
                            }
                            self.upload = None;
                            let request = self.gallery.begin_refresh();
                            self.run_page_fetch(request)
                        }
                    }
                }
                Err(err) => {
                    if self.kicked_out(&err) {
                        return Task::none();
                    }
                    if let Some(queue) = self.upload.as_mut() {
                        queue.fail_submit(&err);
                    }
                    Task::none()
                }
            },
        }
    }

    // ---- profile ----

    fn update_profile(&mut self, message: ProfileMessage) -> Task<Message> {
        match message {
            ProfileMessage::Loaded(result) => {
                if let Err(err) = &result {
                    if self.kicked_out(err) {
                        return Task::none();
                    }
                }
                self.profile.loaded(result);
                self.request_avatar()
            }
            ProfileMessage::Reload => self.enter_profile(),
            ProfileMessage::FirstNameChanged(value) => {
                self.profile.set_first_name(value);
                Task::none()
            }
            ProfileMessage::LastNameChanged(value) => {
                self.profile.set_last_name(value);
                Task::none()
            }
            ProfileMessage::PickAvatar => {
                let picked = rfd::FileDialog::new()
                    .set_title("Select Profile Photo")
                    .add_filter("Images", &["jpg", "jpeg", "png", "webp"])
                    .pick_file();
                let Some(path) = picked else {
                    return Task::none();
                };

                match FileCandidate::probe(path) {
                    Ok(candidate) => {
                        let preview_path = candidate.path.clone();
                        if self.profile.select_avatar(candidate) {
                            Task::perform(
                                upload::load_preview(Uuid::new_v4(), preview_path),
                                |(_, result)| {
                                    Message::Profile(ProfileMessage::AvatarPreviewLoaded(result))
                                },
                            )
                        } else {
                            Task::none()
                        }
                    }
                    Err(err) => {
                        log::warn!("skipping unreadable file: {err}");
                        Task::none()
                    }
                }
            }
            ProfileMessage::AvatarPreviewLoaded(result) => {
                self.profile.attach_avatar_preview(result);
                Task::none()
            }
            ProfileMessage::Save => {
                let Some((payload, exists)) = self.profile.begin_save() else {
                    return Task::none();
                };
                let Some(token) = self.session.token().map(str::to_owned) else {
                    return Task::none();
                };
                let api = self.api.clone();
                Task::perform(
                    async move { api.save_profile(&token, payload, exists).await },
                    |result| Message::Profile(ProfileMessage::Saved(result)),
                )
            }
            ProfileMessage::Saved(result) => {
                if let Err(err) = &result {
                    if self.kicked_out(err) {
                        return Task::none();
                    }
                }
                self.profile.save_finished(result);
                self.request_avatar()
            }
        }
    }

    // ---- shared plumbing ----

    /// Show the gallery, fetching the first page if nothing is loaded
    /// yet.
    fn enter_gallery(&mut self) -> Task<Message> {
        self.screen = Screen::Gallery;
        if self.gallery.has_loaded() {
            return Task::none();
        }
        match self.gallery.begin_append() {
            Some(request) => self.run_page_fetch(request),
            None => Task::none(),
        }
    }

    /// Show the profile editor and (re)fetch the record.
    fn enter_profile(&mut self) -> Task<Message> {
        self.screen = Screen::Profile;
        self.profile = ProfileEditor::new();

        let Some(token) = self.session.token().map(str::to_owned) else {
            return Task::none();
        };
        let api = self.api.clone();
        Task::perform(async move { api.fetch_profile(&token).await }, |result| {
            Message::Profile(ProfileMessage::Loaded(result))
        })
    }

    fn run_page_fetch(&self, request: FetchRequest) -> Task<Message> {
        let Some(token) = self.session.token().map(str::to_owned) else {
            return Task::none();
        };
        let api = self.api.clone();
        Task::perform(
            async move { api.fetch_page(&token, request.page).await },
            move |result| Message::Gallery(GalleryMessage::PageFetched(request, result)),
        )
    }

    fn run_upload(&self, item: PendingUpload) -> Task<Message> {
        let Some(token) = self.session.token().map(str::to_owned) else {
            return Task::none();
        };
        let api = self.api.clone();
        let payload = ImagePayload::from(&item);
        Task::perform(
            async move { api.upload_image(&token, payload).await },
            |result| Message::Upload(UploadMessage::ItemUploaded(result)),
        )
    }

    /// Queue downloads for every grid asset not yet cached.
    fn request_gallery_images(&mut self) -> Task<Message> {
        let to_fetch = self
            .remote_images
            .request(self.gallery.images().map(GalleryImage::display_url));
        self.spawn_image_fetches(to_fetch)
    }

    /// Queue a download for the stored avatar, if any.
    fn request_avatar(&mut self) -> Task<Message> {
        let url = self
            .profile
            .existing()
            .and_then(|profile| profile.profile_image.clone());
        match url {
            Some(url) => {
                let to_fetch = self.remote_images.request([url.as_str()]);
                self.spawn_image_fetches(to_fetch)
            }
            None => Task::none(),
        }
    }

    fn spawn_image_fetches(&self, urls: Vec<String>) -> Task<Message> {
        Task::batch(urls.into_iter().map(|url| {
            let api = self.api.clone();
            Task::perform(
                async move {
                    let result = api.fetch_bytes(&url).await;
                    (url, result)
                },
                |(url, result)| Message::ImageFetched(url, result),
            )
        }))
    }

    /// Any 401 clears the session and returns to the sign-in screen.
    fn kicked_out(&mut self, err: &Error) -> bool {
        if matches!(err, Error::Unauthorized) {
            log::info!("session rejected by the API, returning to sign-in");
            self.sign_out_local();
            true
        } else {
            false
        }
    }

    /// Teardown on sign-out: session, caches, overlays and previews.
    fn sign_out_local(&mut self) {
        self.session.clear();
        self.gallery = PageCache::new();
        self.remote_images = ImageCache::new();
        self.selection = None;
        self.bulk_confirming = false;
        self.detail = None;
        if let Some(queue) = &mut self.upload {
            queue.teardown();
        }
        self.upload = None;
        self.profile = ProfileEditor::new();
        self.auth_form.reset();
        self.screen = Screen::SignIn;
    }

    /// Keyboard navigation for the detail overlay.
    fn handle_key(&mut self, key: keyboard::Key) -> Task<Message> {
        if self.detail.is_none() {
            return Task::none();
        }
        match key.as_ref() {
            keyboard::Key::Named(key::Named::ArrowLeft) => self.navigate_detail(-1),
            keyboard::Key::Named(key::Named::ArrowRight) => self.navigate_detail(1),
            keyboard::Key::Named(key::Named::Escape) => {
                if self.detail.as_ref().is_some_and(DetailOverlay::can_close) {
                    self.detail = None;
                }
                Task::none()
            }
            _ => Task::none(),
        }
    }

    // ---- view ----

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        match self.screen {
            Screen::SignIn => ui::auth::sign_in(&self.auth_form).map(Message::Auth),
            Screen::SignUp => ui::auth::sign_up(&self.auth_form).map(Message::Auth),
            Screen::CheckEmail => ui::auth::check_email().map(Message::Auth),
            Screen::Gallery => self.gallery_view(),
            Screen::Profile => column![
                self.nav_bar(),
                ui::profile::view(&self.profile, &self.remote_images).map(Message::Profile),
            ]
            .into(),
        }
    }

    fn gallery_view(&self) -> Element<Message> {
        let base: Element<Message> = column![
            self.nav_bar(),
            ui::gallery::view(
                &self.gallery,
                &self.remote_images,
                self.selection.as_ref(),
                self.viewport_width,
            )
            .map(Message::Gallery),
        ]
        .into();

        if let Some(queue) = &self.upload {
            return modal(
                base,
                ui::upload::view(queue).map(Message::Upload),
                Message::Upload(UploadMessage::Close),
            );
        }

        if self.bulk_confirming {
            let count = self.selection.as_ref().map(HashSet::len).unwrap_or(0);
            return modal(
                base,
                ui::gallery::bulk_delete_dialog(count).map(Message::Gallery),
                Message::Gallery(GalleryMessage::CancelBulkDelete),
            );
        }

        if let Some(overlay) = &self.detail {
            let all: Vec<&GalleryImage> = self.gallery.images().collect();
            let detail = ui::detail::view(overlay, &all, &self.remote_images).map(Message::Detail);
            let with_detail = modal(base, detail, Message::Detail(DetailMessage::Close));

            if overlay.is_confirming_delete() {
                return modal(
                    with_detail,
                    ui::detail::delete_dialog().map(Message::Detail),
                    Message::Detail(DetailMessage::CancelDelete),
                );
            }
            return with_detail;
        }

        base
    }

    fn nav_bar(&self) -> Element<Message> {
        let email = self
            .session
            .session()
            .map(|session| session.user.email.clone())
            .unwrap_or_default();

        row![
            text("Lumen").size(20).width(Length::Fill),
            text(email).size(13),
            button("Gallery")
                .style(nav_style(self.screen == Screen::Gallery))
                .on_press(Message::OpenGallery),
            button("Profile")
                .style(nav_style(self.screen == Screen::Profile))
                .on_press(Message::OpenProfile),
            button("Sign out")
                .style(button::text)
                .on_press(Message::SignOut),
        ]
        .spacing(8)
        .padding(12)
        .align_y(Alignment::Center)
        .into()
    }

    /// Event sources: keyboard navigation, viewport resizes, and the
    /// progress timer that only exists while an upload runs.
    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![
            keyboard::on_key_press(|key, _modifiers| Some(Message::KeyPressed(key))),
            iced::event::listen_with(|event, _status, _window| match event {
                Event::Window(window::Event::Resized(size)) => {
                    Some(Message::WindowResized(size.width))
                }
                _ => None,
            }),
        ];

        // The timer is dropped with the subscription the moment the
        // submission finishes or fails, so it cannot leak ticks.
        if self
            .upload
            .as_ref()
            .is_some_and(UploadQueue::is_submitting)
        {
            subscriptions.push(iced::time::every(PROGRESS_TICK).map(|_| Message::ProgressTick));
        }

        Subscription::batch(subscriptions)
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn nav_style(
    active: bool,
) -> fn(&Theme, iced::widget::button::Status) -> iced::widget::button::Style {
    if active {
        button::primary
    } else {
        button::secondary
    }
}

/// Dim the base layer and float `content` over it; clicking the
/// backdrop emits `on_blur` (whose handler decides whether closing is
/// currently allowed).
fn modal<'a>(
    base: Element<'a, Message>,
    content: Element<'a, Message>,
    on_blur: Message,
) -> Element<'a, Message> {
    stack![
        base,
        opaque(mouse_area(center(opaque(content))).on_press(on_blur))
    ]
    .into()
}

fn main() -> iced::Result {
    env_logger::init();

    iced::application("Lumen Gallery", LumenGallery::update, LumenGallery::view)
        .subscription(LumenGallery::subscription)
        .theme(LumenGallery::theme)
        .window_size(Size::new(1280.0, 800.0))
        .centered()
        .run_with(LumenGallery::new)
}
