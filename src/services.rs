//! Blog Services
//!
//! Thin dashboard and reader operations over the backend schema. The
//! analytics and featured-content workflows live in their own modules.

use crate::analytics::AnalyticsError;
use crate::email::{EmailError, EmailGateway};
use crate::featured::FeaturedError;
use crate::gateway::{timed, DataGateway, GatewayError, POST_COLUMNS};
use crate::models::*;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Service error type
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    #[error(transparent)]
    Featured(#[from] FeaturedError),

    #[error(transparent)]
    Email(#[from] EmailError),
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Default excerpt: the first 200 characters of the content
fn excerpt_from(content: &str) -> String {
    content.chars().take(200).collect()
}

// ============================================
// Post Service
// ============================================

/// Post service
pub struct PostService {
    db: PgPool,
    per_page: i64,
}

impl PostService {
    pub fn new(db: PgPool, per_page: i64) -> Self {
        Self { db, per_page }
    }

    /// List posts newest first, optionally by status and category name
    pub async fn list(
        &self,
        status: Option<PostStatus>,
        query: &PostQuery,
    ) -> Result<Vec<PostWithCategory>, ServiceError> {
        let sql = format!(
            "SELECT {POST_COLUMNS}, c.name AS category_name
             FROM blogs b
             LEFT JOIN categories c ON c.id = b.category_id
             WHERE ($1::text IS NULL OR b.status = $1)
               AND ($2::text IS NULL OR c.name = $2)
             ORDER BY b.created_at DESC
             LIMIT $3 OFFSET $4"
        );

        let posts: Vec<PostWithCategory> = sqlx::query_as(&sql)
            .bind(status.map(|s| s.as_str()))
            .bind(query.category.as_deref())
            .bind(self.per_page)
            .bind(query.offset(self.per_page))
            .fetch_all(&self.db)
            .await?;

        Ok(posts)
    }

    /// Get a post with its category name
    pub async fn get(&self, id: Uuid) -> Result<PostWithCategory, ServiceError> {
        let sql = format!(
            "SELECT {POST_COLUMNS}, c.name AS category_name
             FROM blogs b
             LEFT JOIN categories c ON c.id = b.category_id
             WHERE b.id = $1"
        );

        sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Post not found: {}", id)))
    }

    /// Get a published post; drafts are hidden from readers
    pub async fn get_published(&self, id: Uuid) -> Result<PostWithCategory, ServiceError> {
        let post = self.get(id).await?;
        if post.post.status != PostStatus::Published.as_str() {
            return Err(ServiceError::NotFound(format!("Post not found: {}", id)));
        }
        Ok(post)
    }

    /// Create a new post
    pub async fn create(&self, author_id: Uuid, req: CreatePostRequest) -> Result<Post, ServiceError> {
        let excerpt = req.excerpt.unwrap_or_else(|| excerpt_from(&req.content));
        let status = req.status.unwrap_or(PostStatus::Draft);

        let sql = format!(
            "INSERT INTO blogs AS b
             (title, content, excerpt, author_id, category_id, status, image_url, is_featured, views)
             VALUES ($1, $2, $3, $4, $5, $6, $7, false, 0)
             RETURNING {POST_COLUMNS}"
        );

        let post: Post = sqlx::query_as(&sql)
            .bind(&req.title)
            .bind(&req.content)
            .bind(&excerpt)
            .bind(author_id)
            .bind(req.category_id)
            .bind(status.as_str())
            .bind(&req.image_url)
            .fetch_one(&self.db)
            .await?;

        tracing::info!(post_id = %post.id, status = %post.status, "Post created");
        Ok(post)
    }

    /// Update a post. Authors may only edit their own posts.
    pub async fn update(
        &self,
        id: Uuid,
        editor_id: Uuid,
        is_admin: bool,
        req: UpdatePostRequest,
    ) -> Result<Post, ServiceError> {
        self.ensure_can_edit(id, editor_id, is_admin).await?;

        let sql = format!(
            "UPDATE blogs AS b SET
               title = COALESCE($2, b.title),
               content = COALESCE($3, b.content),
               excerpt = COALESCE($4, b.excerpt),
               category_id = COALESCE($5, b.category_id),
               image_url = COALESCE($6, b.image_url),
               status = COALESCE($7, b.status),
               updated_at = NOW()
             WHERE b.id = $1
             RETURNING {POST_COLUMNS}"
        );

        let post: Post = sqlx::query_as(&sql)
            .bind(id)
            .bind(&req.title)
            .bind(&req.content)
            .bind(&req.excerpt)
            .bind(req.category_id)
            .bind(&req.image_url)
            .bind(req.status.map(|s| s.as_str()))
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Post not found: {}", id)))?;

        tracing::info!(post_id = %id, "Post updated");
        Ok(post)
    }

    /// Delete a post
    pub async fn delete(&self, id: Uuid, editor_id: Uuid, is_admin: bool) -> Result<(), ServiceError> {
        self.ensure_can_edit(id, editor_id, is_admin).await?;

        sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    /// Make `id` the featured post; any previously featured post is cleared
    pub async fn set_featured(&self, id: Uuid) -> Result<Post, ServiceError> {
        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE blogs SET is_featured = false WHERE is_featured AND id <> $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            "UPDATE blogs AS b SET is_featured = true, updated_at = NOW()
             WHERE b.id = $1
             RETURNING {POST_COLUMNS}"
        );

        let post: Post = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Post not found: {}", id)))?;

        tx.commit().await?;
        tracing::info!(post_id = %id, "Featured post set");
        Ok(post)
    }

    /// Increment the post's view counter
    pub async fn increment_views(&self, id: Uuid) -> Result<(), ServiceError> {
        sqlx::query("UPDATE blogs SET views = COALESCE(views, 0) + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Dashboard overview counts
    pub async fn stats(&self) -> Result<DashboardStats, ServiceError> {
        let (total_posts, published_posts, draft_posts, total_views): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"SELECT COUNT(*),
                          COUNT(*) FILTER (WHERE status = 'published'),
                          COUNT(*) FILTER (WHERE status = 'draft'),
                          COALESCE(SUM(views), 0)::bigint
                   FROM blogs"#,
            )
            .fetch_one(&self.db)
            .await?;

        Ok(DashboardStats {
            total_posts,
            published_posts,
            draft_posts,
            total_views,
        })
    }

    async fn ensure_can_edit(&self, id: Uuid, editor_id: Uuid, is_admin: bool) -> Result<(), ServiceError> {
        let author_id: Uuid = sqlx::query_scalar("SELECT author_id FROM blogs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Post not found: {}", id)))?;

        if author_id != editor_id && !is_admin {
            return Err(ServiceError::PermissionDenied);
        }
        Ok(())
    }
}

// ============================================
// Category Service
// ============================================

/// Category service
pub struct CategoryService {
    db: PgPool,
    gateway: Arc<dyn DataGateway>,
    timeout: Duration,
}

impl CategoryService {
    pub fn new(db: PgPool, gateway: Arc<dyn DataGateway>, timeout: Duration) -> Self {
        Self { db, gateway, timeout }
    }

    /// List all categories by name
    pub async fn list(&self) -> Result<Vec<Category>, ServiceError> {
        Ok(timed(self.timeout, self.gateway.fetch_categories()).await?)
    }

    /// Create a category; an existing one with the same name is returned
    pub async fn create(&self, req: CategoryRequest) -> Result<Category, ServiceError> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation("Category name cannot be empty".into()));
        }

        Ok(timed(self.timeout, self.gateway.create_category(name)).await?)
    }

    /// Rename a category
    pub async fn rename(&self, id: Uuid, req: CategoryRequest) -> Result<Category, ServiceError> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation("Category name cannot be empty".into()));
        }

        sqlx::query_as("UPDATE categories SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(id)
            .bind(name)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::Conflict(format!("Category already exists: {}", name))
                } else {
                    ServiceError::Database(e)
                }
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Category not found: {}", id)))
    }

    /// Delete a category; its posts become uncategorized
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE blogs SET category_id = NULL WHERE category_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("Category not found: {}", id)));
        }

        tx.commit().await?;
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }
}

// ============================================
// Comment Service
// ============================================

/// Comment service
pub struct CommentService {
    db: PgPool,
}

impl CommentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Comments on a post, newest first
    pub async fn list_for_post(
        &self,
        post_id: Uuid,
        status: Option<CommentStatus>,
    ) -> Result<Vec<Comment>, ServiceError> {
        let comments: Vec<Comment> = sqlx::query_as(
            r#"SELECT id, blog_id, author_id, content, status, created_at, updated_at
               FROM comments
               WHERE blog_id = $1 AND ($2::text IS NULL OR status = $2)
               ORDER BY created_at DESC"#,
        )
        .bind(post_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        Ok(comments)
    }

    /// Moderate a comment
    pub async fn set_status(&self, id: Uuid, status: CommentStatus) -> Result<Comment, ServiceError> {
        let comment: Comment = sqlx::query_as(
            r#"UPDATE comments SET status = $2, updated_at = NOW()
               WHERE id = $1
               RETURNING id, blog_id, author_id, content, status, created_at, updated_at"#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Comment not found".into()))?;

        tracing::info!(comment_id = %id, status = status.as_str(), "Comment moderated");
        Ok(comment)
    }
}

// ============================================
// Media Service
// ============================================

const MEDIA_COLUMNS: &str = "id, file_name, file_type, file_size::bigint AS file_size, \
     storage_path, url, alt_text, uploaded_by, created_at, updated_at";

/// MIME type for an upload, guessed from its file name when not given
pub fn media_type(file_name: &str, declared: Option<&str>) -> String {
    match declared.map(str::trim).filter(|t| !t.is_empty()) {
        Some(declared) => declared.to_string(),
        None => mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

/// Media library service
pub struct MediaService {
    db: PgPool,
}

impl MediaService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List media, newest first
    pub async fn list(&self) -> Result<Vec<MediaItem>, ServiceError> {
        let sql = format!("SELECT {MEDIA_COLUMNS} FROM media_library ORDER BY created_at DESC");

        let items: Vec<MediaItem> = sqlx::query_as(&sql).fetch_all(&self.db).await?;
        Ok(items)
    }

    /// Record an object already uploaded to storage
    pub async fn record(&self, uploader: Uuid, req: MediaRequest) -> Result<MediaItem, ServiceError> {
        let file_type = media_type(&req.file_name, req.file_type.as_deref());

        let sql = format!(
            "INSERT INTO media_library
             (file_name, file_type, file_size, storage_path, url, alt_text, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {MEDIA_COLUMNS}"
        );

        let item: MediaItem = sqlx::query_as(&sql)
            .bind(&req.file_name)
            .bind(&file_type)
            .bind(req.file_size)
            .bind(&req.storage_path)
            .bind(&req.url)
            .bind(&req.alt_text)
            .bind(uploader)
            .fetch_one(&self.db)
            .await?;

        tracing::info!(media_id = %item.id, file_type = %item.file_type, "Media recorded");
        Ok(item)
    }

    /// Delete a media record
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM media_library WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("Media not found: {}", id)));
        }
        Ok(())
    }
}

// ============================================
// User Service
// ============================================

/// User management service
pub struct UserService {
    db: PgPool,
    mailer: Arc<dyn EmailGateway>,
}

impl UserService {
    pub fn new(db: PgPool, mailer: Arc<dyn EmailGateway>) -> Self {
        Self { db, mailer }
    }

    /// All profiles with their role names
    pub async fn list(&self) -> Result<Vec<Profile>, ServiceError> {
        let users: Vec<Profile> = sqlx::query_as(
            r#"SELECT p.id, p.username, p.email, p.role_id,
                      COALESCE(r.name, 'user') AS role,
                      p.status, p.avatar_url, p.website, p.bio, p.created_at
               FROM profiles p
               LEFT JOIN roles r ON r.id = p.role_id
               ORDER BY p.created_at DESC"#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    /// Invite a new user by email
    pub async fn invite(&self, email: &str, role: &str) -> Result<(), ServiceError> {
        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM profiles WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        if existing.is_some() {
            return Err(ServiceError::Conflict("User already exists".into()));
        }

        self.mailer.send_invite(email, role).await?;
        Ok(())
    }

    /// Move a user to another role
    pub async fn change_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.db.begin().await?;

        let result = sqlx::query("UPDATE profiles SET role_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("User not found: {}", user_id)));
        }

        sqlx::query("UPDATE user_roles SET role_id = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(user_id = %user_id, role_id = %role_id, "User role changed");
        Ok(())
    }

    /// Remove a user's roles and profile. The auth account itself belongs
    /// to the managed auth service.
    pub async fn delete(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("User not found: {}", user_id)));
        }

        tx.commit().await?;
        tracing::info!(user_id = %user_id, "User deleted");
        Ok(())
    }
}
