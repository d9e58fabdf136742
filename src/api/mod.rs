/// Remote surfaces consumed by the client
///
/// - `auth`: the external auth provider (sign-up, password grant,
///   refresh grant, logout)
/// - `client`: the gallery/profile REST API, always called with a
///   bearer token
/// - `types`: serde wire types shared by both

pub mod auth;
pub mod client;
pub mod types;
