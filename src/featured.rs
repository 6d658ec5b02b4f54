//! Featured Content
//!
//! The home page's "Trending", "Weekly Highlight" and "Weekly Fun" sections
//! are driven by post categories. Saving a featured selection therefore
//! means reassigning `category_id` on posts:
//!
//! 1. resolve the three special categories, creating missing ones,
//! 2. plan the minimal set of category updates,
//! 3. execute the plan against the gateway.
//!
//! Resolution failure aborts before any post is touched.

use crate::gateway::{timed, DataGateway, GatewayError};
use crate::models::{Category, FeaturedRequest, Post, PostStatus};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// ============================================
// Buckets & Assignment
// ============================================

/// Featured section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeaturedBucket {
    Trending,
    Highlights,
    Fun,
}

impl FeaturedBucket {
    /// Precedence order: a post listed in several buckets lands in the first
    pub const ALL: [FeaturedBucket; 3] = [
        FeaturedBucket::Trending,
        FeaturedBucket::Highlights,
        FeaturedBucket::Fun,
    ];

    /// Name of the backing category
    pub fn category_name(&self) -> &'static str {
        match self {
            FeaturedBucket::Trending => "Trending",
            FeaturedBucket::Highlights => "Weekly Highlight",
            FeaturedBucket::Fun => "Weekly Fun",
        }
    }

    pub fn from_category_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.category_name() == name)
    }
}

impl fmt::Display for FeaturedBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category_name())
    }
}

/// Post ids per featured section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedAssignment {
    pub trending: Vec<Uuid>,
    pub highlights: Vec<Uuid>,
    pub fun: Vec<Uuid>,
}

impl FeaturedAssignment {
    pub fn members(&self, bucket: FeaturedBucket) -> &[Uuid] {
        match bucket {
            FeaturedBucket::Trending => &self.trending,
            FeaturedBucket::Highlights => &self.highlights,
            FeaturedBucket::Fun => &self.fun,
        }
    }

    fn members_mut(&mut self, bucket: FeaturedBucket) -> &mut Vec<Uuid> {
        match bucket {
            FeaturedBucket::Trending => &mut self.trending,
            FeaturedBucket::Highlights => &mut self.highlights,
            FeaturedBucket::Fun => &mut self.fun,
        }
    }

    /// Bucket a post belongs to, honouring precedence
    pub fn bucket_of(&self, post_id: Uuid) -> Option<FeaturedBucket> {
        FeaturedBucket::ALL
            .into_iter()
            .find(|bucket| self.members(*bucket).contains(&post_id))
    }
}

impl From<FeaturedRequest> for FeaturedAssignment {
    fn from(req: FeaturedRequest) -> Self {
        Self {
            trending: req.trending,
            highlights: req.highlights,
            fun: req.fun,
        }
    }
}

/// Resolved ids of the three special categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeaturedCategories {
    pub trending: Uuid,
    pub highlights: Uuid,
    pub fun: Uuid,
}

impl FeaturedCategories {
    pub fn id_for(&self, bucket: FeaturedBucket) -> Uuid {
        match bucket {
            FeaturedBucket::Trending => self.trending,
            FeaturedBucket::Highlights => self.highlights,
            FeaturedBucket::Fun => self.fun,
        }
    }
}

/// One or more special categories could not be found or created
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Could not save featured content, category {} missing", join_names(.failed))]
pub struct CategoryResolutionError {
    pub failed: Vec<FeaturedBucket>,
}

impl CategoryResolutionError {
    pub fn missing_categories(&self) -> Vec<&'static str> {
        self.failed.iter().map(|b| b.category_name()).collect()
    }
}

fn join_names(buckets: &[FeaturedBucket]) -> String {
    buckets
        .iter()
        .map(|b| b.category_name())
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================
// Plan
// ============================================

/// Move one post to another category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryUpdate {
    pub post_id: Uuid,
    pub category_id: Uuid,
}

/// Category writes needed to realise an assignment, in post order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    pub updates: Vec<CategoryUpdate>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }
}

/// Compute the category updates for `assignment`.
///
/// Posts outside every bucket keep their category. Posts already in their
/// target category produce no update, so a plan computed after applying
/// the previous one is empty.
pub fn plan(
    posts: &[Post],
    assignment: &FeaturedAssignment,
    categories: &FeaturedCategories,
) -> ReconcilePlan {
    let updates = posts
        .iter()
        .filter_map(|post| {
            let target = assignment
                .bucket_of(post.id)
                .map(|bucket| categories.id_for(bucket))?;

            if post.category_id == Some(target) {
                return None;
            }

            Some(CategoryUpdate {
                post_id: post.id,
                category_id: target,
            })
        })
        .collect();

    ReconcilePlan { updates }
}

/// Assignment currently in effect, read off post categories
pub fn current_assignment(posts: &[Post], categories: &[Category]) -> FeaturedAssignment {
    let buckets: HashMap<Uuid, FeaturedBucket> = categories
        .iter()
        .filter_map(|c| FeaturedBucket::from_category_name(&c.name).map(|b| (c.id, b)))
        .collect();

    let mut assignment = FeaturedAssignment::default();
    for post in posts {
        if let Some(bucket) = post.category_id.and_then(|id| buckets.get(&id)) {
            assignment.members_mut(*bucket).push(post.id);
        }
    }
    assignment
}

// ============================================
// Category Resolution
// ============================================

/// Category lookup used while resolving the special categories
#[async_trait]
pub trait CategoryLookup: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, GatewayError>;

    async fn create(&self, name: &str) -> Result<Category, GatewayError>;
}

/// Lookup over a category snapshot, creating through the gateway
pub struct GatewayCategoryLookup {
    gateway: Arc<dyn DataGateway>,
    categories: Vec<Category>,
    timeout: Duration,
}

impl GatewayCategoryLookup {
    pub fn new(gateway: Arc<dyn DataGateway>, categories: Vec<Category>, timeout: Duration) -> Self {
        Self {
            gateway,
            categories,
            timeout,
        }
    }

    /// Snapshot the backend's categories
    pub async fn load(gateway: Arc<dyn DataGateway>, timeout: Duration) -> Result<Self, GatewayError> {
        let categories = timed(timeout, gateway.fetch_categories()).await?;
        Ok(Self::new(gateway, categories, timeout))
    }
}

#[async_trait]
impl CategoryLookup for GatewayCategoryLookup {
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, GatewayError> {
        Ok(self.categories.iter().find(|c| c.name == name).cloned())
    }

    async fn create(&self, name: &str) -> Result<Category, GatewayError> {
        timed(self.timeout, self.gateway.create_category(name)).await
    }
}

async fn resolve_bucket(lookup: &dyn CategoryLookup, bucket: FeaturedBucket) -> Option<Uuid> {
    let name = bucket.category_name();

    let found = match lookup.find_by_name(name).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(category = name, error = %e, "Category lookup failed");
            return None;
        }
    };

    let category = match found {
        Some(category) => category,
        None => {
            tracing::info!(category = name, "Creating missing featured category");
            match lookup.create(name).await {
                Ok(category) => category,
                Err(e) => {
                    tracing::warn!(category = name, error = %e, "Category creation failed");
                    return None;
                }
            }
        }
    };

    if category.id.is_nil() {
        tracing::warn!(category = name, "Category has no usable id");
        return None;
    }

    Some(category.id)
}

/// Resolve all three special categories.
///
/// Every bucket is attempted so the error names each missing category.
pub async fn resolve_categories(
    lookup: &dyn CategoryLookup,
) -> Result<FeaturedCategories, CategoryResolutionError> {
    let mut resolved = Vec::with_capacity(FeaturedBucket::ALL.len());
    let mut failed = Vec::new();

    for bucket in FeaturedBucket::ALL {
        match resolve_bucket(lookup, bucket).await {
            Some(id) => resolved.push(id),
            None => failed.push(bucket),
        }
    }

    match resolved[..] {
        [trending, highlights, fun] if failed.is_empty() => Ok(FeaturedCategories {
            trending,
            highlights,
            fun,
        }),
        _ => Err(CategoryResolutionError { failed }),
    }
}

/// Resolve the special categories, then plan
pub async fn reconcile(
    posts: &[Post],
    assignment: &FeaturedAssignment,
    lookup: &dyn CategoryLookup,
) -> Result<ReconcilePlan, CategoryResolutionError> {
    let categories = resolve_categories(lookup).await?;
    Ok(plan(posts, assignment, &categories))
}

// ============================================
// Execution
// ============================================

/// Outcome of executing a plan
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub applied: Vec<CategoryUpdate>,
    pub failed: Vec<(Uuid, GatewayError)>,
}

impl ExecutionReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Issue every update concurrently. Failures are reported, not retried.
pub async fn execute_plan(
    gateway: &dyn DataGateway,
    plan: &ReconcilePlan,
    timeout: Duration,
) -> ExecutionReport {
    let results = join_all(plan.updates.iter().map(|update| async move {
        let result = timed(
            timeout,
            gateway.update_post_category(update.post_id, update.category_id),
        )
        .await;
        (*update, result)
    }))
    .await;

    let mut report = ExecutionReport::default();
    for (update, result) in results {
        match result {
            Ok(()) => report.applied.push(update),
            Err(e) => {
                tracing::error!(post_id = %update.post_id, error = %e, "Featured update failed");
                report.failed.push((update.post_id, e));
            }
        }
    }
    report
}

// ============================================
// Featured Service
// ============================================

pub struct FeaturedService {
    gateway: Arc<dyn DataGateway>,
    timeout: Duration,
}

impl FeaturedService {
    pub fn new(gateway: Arc<dyn DataGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// Featured sections as they stand, over published posts
    pub async fn current(&self) -> Result<FeaturedAssignment, GatewayError> {
        let posts = timed(self.timeout, self.gateway.fetch_posts(Some(PostStatus::Published))).await?;
        let categories = timed(self.timeout, self.gateway.fetch_categories()).await?;

        Ok(current_assignment(&posts, &categories))
    }

    /// Save a featured selection
    pub async fn apply(
        &self,
        assignment: &FeaturedAssignment,
    ) -> Result<(ReconcilePlan, ExecutionReport), FeaturedError> {
        let posts = timed(self.timeout, self.gateway.fetch_posts(Some(PostStatus::Published))).await?;
        let lookup = GatewayCategoryLookup::load(self.gateway.clone(), self.timeout).await?;

        let plan = reconcile(&posts, assignment, &lookup).await?;
        let report = execute_plan(self.gateway.as_ref(), &plan, self.timeout).await;

        tracing::info!(
            planned = plan.len(),
            applied = report.applied.len(),
            failed = report.failed.len(),
            "Featured content saved"
        );

        Ok((plan, report))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeaturedError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Resolution(#[from] CategoryResolutionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryGateway;
    use chrono::Utc;

    fn post(category_id: Option<Uuid>) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::new_v4(),
            title: "Post".into(),
            content: "Body".into(),
            excerpt: String::new(),
            author_id: Uuid::new_v4(),
            category_id,
            status: "published".into(),
            views: 0,
            image_url: None,
            is_featured: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn categories() -> FeaturedCategories {
        FeaturedCategories {
            trending: Uuid::new_v4(),
            highlights: Uuid::new_v4(),
            fun: Uuid::new_v4(),
        }
    }

    fn apply(posts: &mut [Post], plan: &ReconcilePlan) {
        for update in &plan.updates {
            if let Some(post) = posts.iter_mut().find(|p| p.id == update.post_id) {
                post.category_id = Some(update.category_id);
            }
        }
    }

    /// Lookup with fixed contents and injectable creation failures
    #[derive(Default)]
    struct FakeLookup {
        existing: Vec<Category>,
        failing: Vec<&'static str>,
        nil_ids: Vec<&'static str>,
    }

    #[async_trait]
    impl CategoryLookup for FakeLookup {
        async fn find_by_name(&self, name: &str) -> Result<Option<Category>, GatewayError> {
            Ok(self.existing.iter().find(|c| c.name == name).cloned())
        }

        async fn create(&self, name: &str) -> Result<Category, GatewayError> {
            if self.failing.contains(&name) {
                return Err(GatewayError::Rejected("permission denied".into()));
            }
            let id = if self.nil_ids.contains(&name) {
                Uuid::nil()
            } else {
                Uuid::new_v4()
            };
            Ok(Category {
                id,
                name: name.to_string(),
            })
        }
    }

    #[test]
    fn test_plan_moves_listed_posts_only() {
        let cats = categories();
        let other = Uuid::new_v4();
        let posts = vec![post(Some(other)), post(None), post(Some(other))];
        let assignment = FeaturedAssignment {
            trending: vec![posts[0].id],
            fun: vec![posts[1].id],
            ..FeaturedAssignment::default()
        };

        let plan = plan(&posts, &assignment, &cats);
        assert_eq!(
            plan.updates,
            vec![
                CategoryUpdate {
                    post_id: posts[0].id,
                    category_id: cats.trending
                },
                CategoryUpdate {
                    post_id: posts[1].id,
                    category_id: cats.fun
                },
            ]
        );
    }

    #[test]
    fn test_plan_is_idempotent() {
        let cats = categories();
        let mut posts = vec![post(None), post(None), post(None)];
        let assignment = FeaturedAssignment {
            trending: vec![posts[0].id],
            highlights: vec![posts[1].id],
            fun: vec![posts[2].id],
        };

        let first = plan(&posts, &assignment, &cats);
        assert_eq!(first.len(), 3);

        apply(&mut posts, &first);
        assert!(plan(&posts, &assignment, &cats).is_empty());
    }

    #[test]
    fn test_trending_takes_precedence() {
        let cats = categories();
        let posts = vec![post(None)];
        let assignment = FeaturedAssignment {
            trending: vec![posts[0].id],
            fun: vec![posts[0].id],
            ..FeaturedAssignment::default()
        };

        let plan = plan(&posts, &assignment, &cats);
        assert_eq!(plan.updates[0].category_id, cats.trending);

        let assignment = FeaturedAssignment {
            highlights: vec![posts[0].id],
            fun: vec![posts[0].id],
            ..FeaturedAssignment::default()
        };
        assert_eq!(assignment.bucket_of(posts[0].id), Some(FeaturedBucket::Highlights));
    }

    #[test]
    fn test_current_assignment_reads_special_categories() {
        let trending = Category {
            id: Uuid::new_v4(),
            name: "Trending".into(),
        };
        let fun = Category {
            id: Uuid::new_v4(),
            name: "Weekly Fun".into(),
        };
        let news = Category {
            id: Uuid::new_v4(),
            name: "News".into(),
        };
        let posts = vec![
            post(Some(trending.id)),
            post(Some(news.id)),
            post(Some(fun.id)),
            post(None),
        ];

        let assignment = current_assignment(&posts, &[trending, fun, news]);
        assert_eq!(assignment.trending, vec![posts[0].id]);
        assert!(assignment.highlights.is_empty());
        assert_eq!(assignment.fun, vec![posts[2].id]);
    }

    #[test]
    fn test_resolve_creates_missing_categories() {
        let trending = Category {
            id: Uuid::new_v4(),
            name: "Trending".into(),
        };
        let lookup = FakeLookup {
            existing: vec![trending.clone()],
            ..FakeLookup::default()
        };

        let cats = tokio_test::block_on(resolve_categories(&lookup)).unwrap();
        assert_eq!(cats.trending, trending.id);
        assert!(!cats.highlights.is_nil());
        assert!(!cats.fun.is_nil());
    }

    #[tokio::test]
    async fn test_failed_creation_aborts_whole_plan() {
        let posts = vec![post(None), post(None), post(None)];
        let assignment = FeaturedAssignment {
            trending: vec![posts[0].id],
            highlights: vec![posts[1].id],
            fun: vec![posts[2].id],
        };
        let lookup = FakeLookup {
            failing: vec!["Weekly Fun"],
            ..FakeLookup::default()
        };

        let err = reconcile(&posts, &assignment, &lookup).await.unwrap_err();
        assert_eq!(err.failed, vec![FeaturedBucket::Fun]);
        assert_eq!(
            err.to_string(),
            "Could not save featured content, category Weekly Fun missing"
        );
    }

    #[tokio::test]
    async fn test_resolution_reports_every_failure() {
        let lookup = FakeLookup {
            failing: vec!["Trending"],
            nil_ids: vec!["Weekly Highlight"],
            ..FakeLookup::default()
        };

        let err = resolve_categories(&lookup).await.unwrap_err();
        assert_eq!(
            err.failed,
            vec![FeaturedBucket::Trending, FeaturedBucket::Highlights]
        );
        assert_eq!(err.missing_categories(), vec!["Trending", "Weekly Highlight"]);
    }

    #[tokio::test]
    async fn test_execute_plan_reports_failures() {
        let posts = vec![post(None), post(None)];
        let failing = posts[1].id;
        let gateway = MemoryGateway {
            failing_posts: [failing].into_iter().collect(),
            ..MemoryGateway::with_posts(posts.clone())
        };
        let target = Uuid::new_v4();
        let plan = ReconcilePlan {
            updates: posts
                .iter()
                .map(|p| CategoryUpdate {
                    post_id: p.id,
                    category_id: target,
                })
                .collect(),
        };

        let report = execute_plan(&gateway, &plan, Duration::from_secs(1)).await;
        assert!(!report.is_complete());
        assert_eq!(report.applied.len(), 1);
        assert_eq!(report.applied[0].post_id, posts[0].id);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, failing);
        assert_eq!(gateway.updates.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_service_round_trip() {
        let posts = vec![post(None), post(None)];
        let gateway = Arc::new(MemoryGateway::with_posts(posts.clone()));
        let service = FeaturedService::new(gateway.clone(), Duration::from_secs(1));

        let assignment = FeaturedAssignment {
            highlights: vec![posts[1].id],
            ..FeaturedAssignment::default()
        };

        let (plan, report) = service.apply(&assignment).await.unwrap();
        assert_eq!(plan.len(), 1);
        assert!(report.is_complete());
        assert_eq!(gateway.created.lock().await.len(), 3);

        assert_eq!(service.current().await.unwrap(), assignment);

        let (plan, _) = service.apply(&assignment).await.unwrap();
        assert!(plan.is_empty());
        assert_eq!(gateway.created.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn test_service_aborts_before_writes() {
        let posts = vec![post(None)];
        let gateway = Arc::new(MemoryGateway {
            failing_categories: ["Weekly Highlight".to_string()].into_iter().collect(),
            ..MemoryGateway::with_posts(posts.clone())
        });
        let service = FeaturedService::new(gateway.clone(), Duration::from_secs(1));

        let assignment = FeaturedAssignment {
            trending: vec![posts[0].id],
            ..FeaturedAssignment::default()
        };

        let result = service.apply(&assignment).await;
        assert!(matches!(result, Err(FeaturedError::Resolution(_))));
        assert!(gateway.updates.lock().await.is_empty());
    }
}
