/// State management module
///
/// This module handles all application state, including:
/// - The authenticated session and its on-disk persistence (session.rs)
/// - The paginated gallery cache and optimistic mutations (gallery.rs)
/// - Masonry column placement (masonry.rs)
/// - The pending upload queue and its preview resources (upload.rs)
/// - The image detail/edit overlay state machine (detail.rs)
/// - The profile editor form (profile.rs)
/// - Downloaded image bytes for rendering (images.rs)

pub mod detail;
pub mod gallery;
pub mod images;
pub mod masonry;
pub mod profile;
pub mod session;
pub mod tags;
pub mod upload;
