/// View layer
///
/// Each screen is a plain function from state to `Element`, emitting
/// that feature's message enum; the application shell maps them into
/// the global message type. No network or state mutation happens here.

pub mod auth;
pub mod detail;
pub mod gallery;
pub mod profile;
pub mod upload;
