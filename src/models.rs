//! Blog Data Models

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Fallback label for posts without a category
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Post status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

/// Comment moderation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Pending => "pending",
            CommentStatus::Approved => "approved",
            CommentStatus::Rejected => "rejected",
        }
    }
}

// ============================================
// Posts & Categories
// ============================================

/// Blog post as stored in the `blogs` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author_id: Uuid,
    pub category_id: Option<Uuid>,
    pub status: String,
    pub views: i64,
    pub image_url: Option<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post joined with its category name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostWithCategory {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub post: Post,
    pub category_name: Option<String>,
}

impl PostWithCategory {
    pub fn category_label(&self) -> &str {
        self.category_name.as_deref().unwrap_or(UNCATEGORIZED)
    }
}

/// Category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

/// Create post request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,

    #[validate(length(max = 500))]
    pub excerpt: Option<String>,

    pub category_id: Option<Uuid>,

    #[validate(url)]
    pub image_url: Option<String>,

    pub status: Option<PostStatus>,
}

/// Update post request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    pub content: Option<String>,

    #[validate(length(max = 500))]
    pub excerpt: Option<String>,

    pub category_id: Option<Uuid>,

    #[validate(url)]
    pub image_url: Option<String>,

    pub status: Option<PostStatus>,
}

/// Post listing query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostQuery {
    pub page: Option<i64>,
    pub status: Option<PostStatus>,
    /// Category name, as used by the category pages
    pub category: Option<String>,
}

impl PostQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn offset(&self, per_page: i64) -> i64 {
        (self.page() - 1).saturating_mul(per_page)
    }
}

/// Create/rename category request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Category name cannot be empty"))]
    pub name: String,
}

// ============================================
// Analytics
// ============================================

/// Ordered `name -> count` table (countries, referral sources).
///
/// Keeps entries in the order they were first seen. Deserialisation is
/// lenient: values that are not numbers count as 0, and a document that
/// is not an object reads as an empty table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Counts(Vec<(String, f64)>);

impl Counts {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Counts {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Serialize for Counts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Counts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountsVisitor;

        impl<'de> Visitor<'de> for CountsVisitor {
            type Value = Counts;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of names to counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Counts, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, serde_json::Value>()? {
                    entries.push((name, value.as_f64().unwrap_or(0.0)));
                }
                Ok(Counts(entries))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Counts, A::Error> {
                while access.next_element::<IgnoredAny>()?.is_some() {}
                Ok(Counts::new())
            }

            fn visit_unit<E>(self) -> Result<Counts, E> {
                Ok(Counts::new())
            }

            fn visit_bool<E>(self, _: bool) -> Result<Counts, E> {
                Ok(Counts::new())
            }

            fn visit_i64<E>(self, _: i64) -> Result<Counts, E> {
                Ok(Counts::new())
            }

            fn visit_u64<E>(self, _: u64) -> Result<Counts, E> {
                Ok(Counts::new())
            }

            fn visit_f64<E>(self, _: f64) -> Result<Counts, E> {
                Ok(Counts::new())
            }

            fn visit_str<E>(self, _: &str) -> Result<Counts, E> {
                Ok(Counts::new())
            }
        }

        deserializer.deserialize_any(CountsVisitor)
    }
}

/// One per-day, per-post metrics row from the `analytics` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricRow {
    pub post_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub page_views: Option<i64>,
    pub unique_visitors: Option<i64>,
    pub avg_time_on_page: Option<f64>,
    pub bounce_rate: Option<f64>,
    pub geo_distribution: Option<Counts>,
    pub referral_sources: Option<Counts>,
}

/// Analytics query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsQuery {
    /// Dashboard range key: "7days", "30days", "3months", ...
    pub range: Option<String>,
    /// Post id, or "all" (default)
    pub post: Option<String>,
}

// ============================================
// Featured Content
// ============================================

/// Desired featured sections, as submitted by the dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturedRequest {
    #[serde(default)]
    pub trending: Vec<Uuid>,
    #[serde(default)]
    pub highlights: Vec<Uuid>,
    #[serde(default)]
    pub fun: Vec<Uuid>,
}

// ============================================
// Comments & Media
// ============================================

/// Comment
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub blog_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment listing query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentQuery {
    pub status: Option<CommentStatus>,
}

/// Comment moderation request
#[derive(Debug, Clone, Deserialize)]
pub struct CommentStatusRequest {
    pub status: CommentStatus,
}

/// Media library entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MediaItem {
    pub id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub storage_path: String,
    pub url: String,
    pub alt_text: Option<String>,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Register an object already uploaded to storage in the media library
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MediaRequest {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,

    pub file_type: Option<String>,

    #[validate(range(min = 0))]
    pub file_size: i64,

    #[validate(length(min = 1))]
    pub storage_path: String,

    #[validate(url)]
    pub url: String,

    #[validate(length(max = 300))]
    pub alt_text: Option<String>,
}

// ============================================
// Users
// ============================================

/// User profile with its resolved role name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role_id: Option<Uuid>,
    pub role: String,
    pub status: String,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Invitation email request
#[derive(Debug, Clone, Deserialize)]
pub struct InviteRequest {
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Role change request
#[derive(Debug, Clone, Deserialize)]
pub struct RoleChangeRequest {
    pub role_id: Uuid,
}

// ============================================
// Responses
// ============================================

/// Dashboard overview counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_posts: i64,
    pub published_posts: i64,
    pub draft_posts: i64,
    pub total_views: i64,
}

/// API error response
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
