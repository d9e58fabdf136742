use std::path::PathBuf;

use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};

use crate::api::types::{BulkDeleteAck, GalleryImage, GalleryPage, ImageUpdate, Profile};
use crate::error::Error;

/// Images per gallery page. The backend caps at this value as well.
pub const PAGE_LIMIT: u32 = 20;

/// Extra attempts after a failed read. Mutations are never retried;
/// the user re-invokes the action instead.
const READ_RETRIES: u32 = 2;

/// Client for the gallery/profile REST API.
///
/// Every call takes the caller's bearer token explicitly; the client
/// itself is session-agnostic and freely cloneable into background
/// tasks (reqwest clients share their connection pool across clones).
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

/// One file plus its metadata for `POST /gallery`.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub path: PathBuf,
    pub file_name: String,
    pub mime: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// Profile fields plus an optional replacement avatar.
#[derive(Debug, Clone)]
pub struct ProfilePayload {
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<AvatarFile>,
}

#[derive(Debug, Clone)]
pub struct AvatarFile {
    pub path: PathBuf,
    pub file_name: String,
    pub mime: String,
}

impl ApiClient {
    pub fn new(base: String) -> Self {
        ApiClient {
            http: reqwest::Client::new(),
            base,
        }
    }

    /// `GET /gallery?page={n}&limit=20`
    pub async fn fetch_page(&self, token: &str, page: u32) -> Result<GalleryPage, Error> {
        let url = format!("{}/gallery?page={}&limit={}", self.base, page, PAGE_LIMIT);
        let response = self.get_with_retry(&url, token).await?;
        Ok(response.json().await?)
    }

    /// `POST /gallery` -- one multipart request per image, fields named
    /// exactly as the backend expects (`images`, `title`, `description`,
    /// `tags` as a JSON-encoded array).
    pub async fn upload_image(&self, token: &str, payload: ImagePayload) -> Result<(), Error> {
        let bytes = tokio::fs::read(&payload.path).await?;
        let part = Part::bytes(bytes)
            .file_name(payload.file_name.clone())
            .mime_str(&payload.mime)
            .map_err(|e| Error::Validation(format!("unsupported file type: {e}")))?;

        let mut form = Form::new().part("images", part);
        if !payload.title.is_empty() {
            form = form.text("title", payload.title.clone());
        }
        if !payload.description.is_empty() {
            form = form.text("description", payload.description.clone());
        }
        if !payload.tags.is_empty() {
            form = form.text("tags", serde_json::to_string(&payload.tags)?);
        }

        let response = self
            .http
            .post(format!("{}/gallery", self.base))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// `PUT /gallery/{id}`
    pub async fn update_image(
        &self,
        token: &str,
        id: &str,
        update: ImageUpdate,
    ) -> Result<GalleryImage, Error> {
        let response = self
            .http
            .put(format!("{}/gallery/{}", self.base, id))
            .bearer_auth(token)
            .json(&update)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// `DELETE /gallery/{id}`
    pub async fn delete_image(&self, token: &str, id: &str) -> Result<(), Error> {
        let response = self
            .http
            .delete(format!("{}/gallery/{}", self.base, id))
            .bearer_auth(token)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// `DELETE /gallery` with `{"imageIds": [...]}`
    pub async fn delete_images(&self, token: &str, ids: Vec<String>) -> Result<BulkDeleteAck, Error> {
        let body = serde_json::json!({ "imageIds": ids });
        let response = self
            .http
            .delete(format!("{}/gallery", self.base))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// `GET /profile` -- a 404 here means "no profile yet" and is left
    /// to the caller as `Error::NotFound`.
    pub async fn fetch_profile(&self, token: &str) -> Result<Profile, Error> {
        let url = format!("{}/profile", self.base);
        let response = self.get_with_retry(&url, token).await?;
        Ok(response.json().await?)
    }

    /// `POST /profile` to create, `PUT /profile` to update.
    pub async fn save_profile(
        &self,
        token: &str,
        payload: ProfilePayload,
        exists: bool,
    ) -> Result<Profile, Error> {
        let mut form = Form::new()
            .text("first_name", payload.first_name.clone())
            .text("last_name", payload.last_name.clone());

        if let Some(avatar) = &payload.avatar {
            let bytes = tokio::fs::read(&avatar.path).await?;
            let part = Part::bytes(bytes)
                .file_name(avatar.file_name.clone())
                .mime_str(&avatar.mime)
                .map_err(|e| Error::Validation(format!("unsupported file type: {e}")))?;
            form = form.part("profileImage", part);
        }

        let url = format!("{}/profile", self.base);
        let request = if exists {
            self.http.put(url)
        } else {
            self.http.post(url)
        };
        let response = request.bearer_auth(token).multipart(form).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// Fetch raw image bytes from a CDN URL. No bearer token: rendered
    /// assets are served from public storage, same as an `<img>` tag
    /// would load them.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, Error> {
        let response = self.http.get(url).send().await?;
        let response = check(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// GET with a bounded retry on transport errors and 5xx answers.
    /// Only reads go through here.
    async fn get_with_retry(&self, url: &str, token: &str) -> Result<Response, Error> {
        let mut attempt = 0;
        loop {
            let result = self.http.get(url).bearer_auth(token).send().await;
            match result {
                Ok(response) if response.status().is_server_error() && attempt < READ_RETRIES => {
                    log::warn!(
                        "GET {} answered {}, retrying ({}/{})",
                        url,
                        response.status(),
                        attempt + 1,
                        READ_RETRIES
                    );
                    attempt += 1;
                }
                Ok(response) => return check(response).await,
                Err(err) if attempt < READ_RETRIES => {
                    log::warn!("GET {url} failed ({err}), retrying ({}/{READ_RETRIES})", attempt + 1);
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Map a response status onto the error taxonomy. 401 anywhere means
/// the session is gone; 404 is handed back as a typed value so reads
/// can treat it as an empty state.
async fn check(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
        StatusCode::NOT_FOUND => Err(Error::NotFound),
        _ => {
            let message = response.text().await.unwrap_or_else(|_| String::new());
            Err(Error::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
