pub mod api;
pub mod metrics;
pub mod poller;
pub mod retry;
pub mod views;


pub use api::ApiClient;
pub use metrics::{ApiMetrics, EndpointMetrics, MetricsCollector};
pub use poller::{AnalysisBackend, AnalysisSessionPoller, PollHandle, PollSettings, PollerState};
pub use retry::{RetryConfig, RetryStrategy};
pub use views::{
    AppIdeaBoard, AppIdeaSource, DashboardSource, DashboardView, ListSource, ListView, ViewState,
};
