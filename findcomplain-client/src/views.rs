//! Filterable collections with explicit loading/error/empty states.

use crate::api::ApiClient;
use async_trait::async_trait;
use findcomplain_core::{
    AppIdea, AppIdeaFilter, BusinessIdea, Complaint, ComplaintFilter, CoreError, DashboardStats,
    DiscoveryResult, ErrorExt, IdeaFilter,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ViewState<T> {
    Loading,
    Error(String),
    Empty,
    Ready(T),
}

impl<T> ViewState<T> {
    fn settle(result: Result<T, CoreError>, is_empty: impl FnOnce(&T) -> bool) -> Self {
        match result {
            Ok(value) if is_empty(&value) => ViewState::Empty,
            Ok(value) => ViewState::Ready(value),
            Err(e) => {
                e.log_warn();
                ViewState::Error(e.user_friendly_message())
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// A backend collection that can be fetched with filter `F`.
#[async_trait]
pub trait ListSource<F: Send + Sync>: Send + Sync {
    type Item: Send;

    async fn fetch(&self, filter: &F) -> Result<Vec<Self::Item>, CoreError>;
}

#[async_trait]
impl ListSource<ComplaintFilter> for ApiClient {
    type Item = Complaint;

    async fn fetch(&self, filter: &ComplaintFilter) -> Result<Vec<Complaint>, CoreError> {
        self.get_complaints(filter).await
    }
}

#[async_trait]
impl ListSource<IdeaFilter> for ApiClient {
    type Item = BusinessIdea;

    async fn fetch(&self, filter: &IdeaFilter) -> Result<Vec<BusinessIdea>, CoreError> {
        self.get_ideas(filter).await
    }
}

#[async_trait]
impl ListSource<AppIdeaFilter> for ApiClient {
    type Item = AppIdea;

    async fn fetch(&self, filter: &AppIdeaFilter) -> Result<Vec<AppIdea>, CoreError> {
        self.get_app_ideas(*filter).await
    }
}

/// A filtered list. Each filter change runs one fetch whose result replaces
/// the previous list; the view reads `Loading` until that fetch settles.
pub struct ListView<S, F>
where
    S: ListSource<F>,
    F: Send + Sync,
{
    source: Arc<S>,
    filter: F,
    state: ViewState<Vec<S::Item>>,
}

impl<S, F> ListView<S, F>
where
    S: ListSource<F>,
    F: Clone + PartialEq + std::fmt::Debug + Send + Sync,
{
    pub fn new(source: Arc<S>, filter: F) -> Self {
        Self {
            source,
            filter,
            state: ViewState::Loading,
        }
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn state(&self) -> &ViewState<Vec<S::Item>> {
        &self.state
    }

    pub async fn refresh(&mut self) -> &ViewState<Vec<S::Item>> {
        self.state = ViewState::Loading;
        debug!("Fetching list for {:?}", self.filter);
        let result = self.source.fetch(&self.filter).await;
        self.state = ViewState::settle(result, |items| items.is_empty());
        &self.state
    }

    pub async fn set_filter(&mut self, filter: F) -> &ViewState<Vec<S::Item>> {
        if filter != self.filter {
            info!("Filter changed to {:?}", filter);
        }
        self.filter = filter;
        self.refresh().await
    }

    fn items_mut(&mut self) -> Option<&mut Vec<S::Item>> {
        match &mut self.state {
            ViewState::Ready(items) => Some(items),
            _ => None,
        }
    }
}

/// App idea operations beyond listing.
#[async_trait]
pub trait AppIdeaSource: ListSource<AppIdeaFilter, Item = AppIdea> {
    async fn send_bookmark_toggle(&self, id: i64) -> Result<AppIdea, CoreError>;
    async fn run_discovery(&self) -> Result<DiscoveryResult, CoreError>;
}

#[async_trait]
impl AppIdeaSource for ApiClient {
    async fn send_bookmark_toggle(&self, id: i64) -> Result<AppIdea, CoreError> {
        self.toggle_bookmark(id).await
    }

    async fn run_discovery(&self) -> Result<DiscoveryResult, CoreError> {
        self.discover_app_ideas().await
    }
}

pub struct AppIdeaBoard<S: AppIdeaSource> {
    list: ListView<S, AppIdeaFilter>,
}

impl<S: AppIdeaSource> AppIdeaBoard<S> {
    pub fn new(source: Arc<S>, filter: AppIdeaFilter) -> Self {
        Self {
            list: ListView::new(source, filter),
        }
    }

    pub fn filter(&self) -> AppIdeaFilter {
        *self.list.filter()
    }

    pub fn state(&self) -> &ViewState<Vec<AppIdea>> {
        self.list.state()
    }

    pub async fn refresh(&mut self) -> &ViewState<Vec<AppIdea>> {
        self.list.refresh().await
    }

    pub async fn set_filter(&mut self, filter: AppIdeaFilter) -> &ViewState<Vec<AppIdea>> {
        self.list.set_filter(filter).await
    }

    /// Flips the bookmark on the server, then copies the confirmed flag onto
    /// the matching record. Nothing else in the list changes, and an idea
    /// un-bookmarked in bookmarked-only mode stays listed until the next
    /// refresh.
    pub async fn toggle_bookmark(&mut self, id: i64) -> Result<AppIdea, CoreError> {
        let updated = self.list.source.send_bookmark_toggle(id).await?;

        match self
            .list
            .items_mut()
            .and_then(|items| items.iter_mut().find(|idea| idea.id == id))
        {
            Some(idea) => idea.bookmarked = updated.bookmarked,
            None => warn!("Bookmarked app idea {} is not in the current list", id),
        }

        Ok(updated)
    }

    /// Runs backend discovery, then re-fetches with the current filter.
    pub async fn discover(&mut self) -> Result<DiscoveryResult, CoreError> {
        let result = self.list.source.run_discovery().await?;
        self.list.refresh().await;
        Ok(result)
    }
}

#[async_trait]
pub trait DashboardSource: Send + Sync {
    async fn fetch_stats(&self) -> Result<DashboardStats, CoreError>;
}

#[async_trait]
impl DashboardSource for ApiClient {
    async fn fetch_stats(&self) -> Result<DashboardStats, CoreError> {
        self.get_dashboard_stats().await
    }
}

pub struct DashboardView<S: DashboardSource> {
    source: Arc<S>,
    state: ViewState<DashboardStats>,
}

impl<S: DashboardSource> DashboardView<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            state: ViewState::Loading,
        }
    }

    pub fn state(&self) -> &ViewState<DashboardStats> {
        &self.state
    }

    pub async fn refresh(&mut self) -> &ViewState<DashboardStats> {
        self.state = ViewState::Loading;
        let result = self.source.fetch_stats().await;
        self.state = ViewState::settle(result, DashboardStats::is_empty);
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use findcomplain_core::{ApiError, Difficulty};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn complaint(id: i64, category: &str) -> Complaint {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "redditPostId": format!("post{}", id),
            "subreddit": "programming",
            "title": format!("Complaint {}", id),
            "category": category,
            "painLevel": 5
        }))
        .unwrap()
    }

    fn app_idea(id: i64, bookmarked: bool) -> AppIdea {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "redditPostId": format!("abc{}", id),
            "subreddit": "SomebodyMakeThis",
            "appName": format!("Idea {}", id),
            "difficulty": "easy",
            "viabilityScore": 7,
            "bookmarked": bookmarked
        }))
        .unwrap()
    }

    #[derive(Default)]
    struct FakeComplaints {
        fetches: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl ListSource<ComplaintFilter> for FakeComplaints {
        type Item = Complaint;

        async fn fetch(&self, filter: &ComplaintFilter) -> Result<Vec<Complaint>, CoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(CoreError::Api(ApiError::ServerError {
                    status_code: 500,
                    endpoint: "/complaints".to_string(),
                }));
            }
            Ok(match filter.category.as_deref() {
                None => vec![complaint(1, "가격"), complaint(2, "UX")],
                Some("버그") => vec![complaint(3, "버그")],
                Some(_) => Vec::new(),
            })
        }
    }

    struct FakeAppIdeas {
        ideas: Mutex<Vec<AppIdea>>,
        toggle_fails: AtomicBool,
        fetches: AtomicUsize,
    }

    impl FakeAppIdeas {
        fn new(ideas: Vec<AppIdea>) -> Self {
            Self {
                ideas: Mutex::new(ideas),
                toggle_fails: AtomicBool::new(false),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ListSource<AppIdeaFilter> for FakeAppIdeas {
        type Item = AppIdea;

        async fn fetch(&self, filter: &AppIdeaFilter) -> Result<Vec<AppIdea>, CoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let ideas = self.ideas.lock().unwrap().clone();
            Ok(match filter {
                AppIdeaFilter::Bookmarked => ideas.into_iter().filter(|i| i.bookmarked).collect(),
                _ => ideas,
            })
        }
    }

    #[async_trait]
    impl AppIdeaSource for FakeAppIdeas {
        async fn send_bookmark_toggle(&self, id: i64) -> Result<AppIdea, CoreError> {
            if self.toggle_fails.load(Ordering::SeqCst) {
                return Err(CoreError::Api(ApiError::NotFound {
                    resource: format!("/app-ideas/{}/bookmark", id),
                }));
            }
            let mut ideas = self.ideas.lock().unwrap();
            let idea = ideas
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or_else(|| CoreError::NotFound {
                    resource: format!("app idea {}", id),
                })?;
            idea.bookmarked = !idea.bookmarked;
            // The server's copy may carry fields the list has not seen yet
            let mut echoed = idea.clone();
            echoed.reasoning = Some("updated on server".to_string());
            Ok(echoed)
        }

        async fn run_discovery(&self) -> Result<DiscoveryResult, CoreError> {
            self.ideas.lock().unwrap().push(app_idea(99, false));
            Ok(DiscoveryResult {
                message: "Discovery completed".to_string(),
                new_ideas_found: 1,
                subreddits_scanned: vec!["SomebodyMakeThis".to_string()],
            })
        }
    }

    #[tokio::test]
    async fn test_list_view_starts_loading() {
        let source = Arc::new(FakeComplaints::default());
        let view = ListView::new(source, ComplaintFilter::default());
        assert!(view.state().is_loading());
    }

    #[tokio::test]
    async fn test_filter_change_replaces_list() {
        let source = Arc::new(FakeComplaints::default());
        let mut view = ListView::new(Arc::clone(&source), ComplaintFilter::default());

        let state = view.refresh().await;
        assert_eq!(state.ready().map(|items| items.len()), Some(2));

        let state = view
            .set_filter(ComplaintFilter::default().with_category("버그"))
            .await;
        let items = state.ready().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 3);
        assert_eq!(items[0].category.as_deref(), Some("버그"));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_and_error_states() {
        let source = Arc::new(FakeComplaints::default());
        let mut view = ListView::new(
            Arc::clone(&source),
            ComplaintFilter::default().with_category("서비스"),
        );
        assert_eq!(view.refresh().await, &ViewState::Empty);

        source.fail.store(true, Ordering::SeqCst);
        let state = view.set_filter(ComplaintFilter::default()).await;
        assert!(state.error().is_some());
        assert!(state.ready().is_none());
    }

    #[tokio::test]
    async fn test_toggle_bookmark_updates_only_that_record() {
        let source = Arc::new(FakeAppIdeas::new(vec![
            app_idea(1, false),
            app_idea(2, true),
            app_idea(3, false),
        ]));
        let mut board = AppIdeaBoard::new(Arc::clone(&source), AppIdeaFilter::All);
        board.refresh().await;
        let before = board.state().ready().unwrap().clone();

        let updated = board.toggle_bookmark(1).await.unwrap();
        assert!(updated.bookmarked);

        let after = board.state().ready().unwrap();
        assert!(after[0].bookmarked);
        // Only the flag is copied over
        assert_eq!(after[0].reasoning, None);
        assert_eq!(after[1], before[1]);
        assert_eq!(after[2], before[2]);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_toggle_leaves_list_untouched() {
        let source = Arc::new(FakeAppIdeas::new(vec![app_idea(1, false), app_idea(2, true)]));
        let mut board = AppIdeaBoard::new(Arc::clone(&source), AppIdeaFilter::All);
        board.refresh().await;
        let before = board.state().clone();

        source.toggle_fails.store(true, Ordering::SeqCst);
        assert!(board.toggle_bookmark(1).await.is_err());
        assert_eq!(board.state(), &before);
    }

    #[tokio::test]
    async fn test_unbookmark_in_bookmarked_mode_keeps_record() {
        let source = Arc::new(FakeAppIdeas::new(vec![app_idea(1, true), app_idea(2, false)]));
        let mut board = AppIdeaBoard::new(Arc::clone(&source), AppIdeaFilter::Bookmarked);
        board.refresh().await;
        assert_eq!(board.state().ready().map(|i| i.len()), Some(1));

        board.toggle_bookmark(1).await.unwrap();
        let items = board.state().ready().unwrap();
        assert_eq!(items.len(), 1);
        assert!(!items[0].bookmarked);

        board.refresh().await;
        assert_eq!(board.state(), &ViewState::Empty);
    }

    #[tokio::test]
    async fn test_discover_refetches() {
        let source = Arc::new(FakeAppIdeas::new(vec![app_idea(1, false)]));
        let mut board = AppIdeaBoard::new(Arc::clone(&source), AppIdeaFilter::All);
        board.refresh().await;

        let result = board.discover().await.unwrap();
        assert_eq!(result.new_ideas_found, 1);
        assert_eq!(board.state().ready().map(|i| i.len()), Some(2));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    struct FakeDashboard(DashboardStats);

    #[async_trait]
    impl DashboardSource for FakeDashboard {
        async fn fetch_stats(&self) -> Result<DashboardStats, CoreError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_dashboard_empty_when_nothing_analyzed() {
        let mut view = DashboardView::new(Arc::new(FakeDashboard(DashboardStats::default())));
        assert_eq!(view.refresh().await, &ViewState::Empty);

        let stats = DashboardStats {
            total_complaints: 12,
            total_ideas: 3,
            total_subreddits: 1,
            ..Default::default()
        };
        let mut view = DashboardView::new(Arc::new(FakeDashboard(stats.clone())));
        assert_eq!(view.refresh().await, &ViewState::Ready(stats));
    }

    #[test]
    fn test_idea_filter_is_a_list_key() {
        let a = IdeaFilter::Recent {
            difficulty: Some(Difficulty::Easy),
            limit: Some(10),
        };
        assert_ne!(a, IdeaFilter::Top);
        assert_eq!(a.endpoint(), "/ideas");
    }
}
