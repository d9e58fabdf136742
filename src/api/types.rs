/// Wire types for the gallery/profile REST API
///
/// Field names follow the backend exactly: gallery records use `_id`
/// and camelCase, the profile uses snake_case. Keep serde attributes in
/// sync with the server, not with Rust naming taste.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One image record as returned by the gallery API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Insertion-ordered; duplicates are rejected at input time.
    #[serde(default)]
    pub tags: Vec<String>,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl GalleryImage {
    /// Width over height, used by the masonry height estimate.
    /// Records are supposed to have positive dimensions; a zero height
    /// falls back to a square estimate instead of dividing by zero.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// URL to render in the grid: the thumbnail when the backend
    /// produced one, the full asset otherwise.
    pub fn display_url(&self) -> &str {
        self.thumbnail_url.as_deref().unwrap_or(&self.url)
    }
}

/// One fetched page plus its pagination envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPage {
    pub images: Vec<GalleryImage>,
    pub total: u64,
    pub current_page: u32,
    pub total_pages: u32,
    pub has_more: bool,
}

/// Body of `PUT /gallery/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Acknowledgement of `DELETE /gallery` (bulk).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteAck {
    pub deleted_count: u64,
    pub success: bool,
}

/// The user profile record (snake_case on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub profile_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_image_maps_wire_fields() {
        let json = r#"{
            "_id": "abc123",
            "title": "Sunset",
            "tags": ["sky", "orange"],
            "format": "jpeg",
            "width": 1600,
            "height": 900,
            "url": "https://cdn.example.com/abc123.jpg",
            "thumbnailUrl": "https://cdn.example.com/abc123_t.jpg",
            "uploadedAt": "2024-05-01T12:30:00Z"
        }"#;

        let image: GalleryImage = serde_json::from_str(json).unwrap();
        assert_eq!(image.id, "abc123");
        assert_eq!(image.title.as_deref(), Some("Sunset"));
        assert_eq!(image.description, None);
        assert_eq!(image.tags, vec!["sky", "orange"]);
        assert_eq!(image.display_url(), "https://cdn.example.com/abc123_t.jpg");
        assert!((image.aspect_ratio() - 16.0 / 9.0).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_height_falls_back_to_square() {
        let json = r#"{
            "_id": "x",
            "format": "png",
            "width": 800,
            "height": 0,
            "url": "https://cdn.example.com/x.png",
            "uploadedAt": "2024-05-01T12:30:00Z"
        }"#;

        let image: GalleryImage = serde_json::from_str(json).unwrap();
        assert_eq!(image.aspect_ratio(), 1.0);
        assert_eq!(image.display_url(), "https://cdn.example.com/x.png");
    }

    #[test]
    fn page_envelope_is_camel_case() {
        let json = r#"{
            "images": [],
            "total": 41,
            "currentPage": 2,
            "totalPages": 3,
            "hasMore": true
        }"#;

        let page: GalleryPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total, 41);
        assert_eq!(page.current_page, 2);
        assert!(page.has_more);
    }

    #[test]
    fn image_update_omits_absent_fields() {
        let update = ImageUpdate {
            title: Some("New title".into()),
            description: None,
            tags: None,
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"title":"New title"}"#);
    }

    #[test]
    fn profile_is_snake_case_and_lenient() {
        let profile: Profile = serde_json::from_str(r#"{"first_name":"Ada","last_name":"Lovelace"}"#).unwrap();
        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.profile_image, None);

        // A 200 with an empty body object means "no profile yet".
        let empty: Profile = serde_json::from_str("{}").unwrap();
        assert!(empty.first_name.is_empty());
    }
}
