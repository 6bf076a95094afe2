use crate::metrics::{ApiMetrics, MetricsCollector, RequestMetrics};
use findcomplain_core::{
    normalize_subreddit, AnalysisSession, AnalyzeRequest, ApiError, AppIdea, AppIdeaFilter,
    BusinessIdea, ClientConfig, Complaint, ComplaintFilter, CoreError, DashboardStats,
    DiscoveryResult, IdeaFilter, TargetSubreddits,
};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// HTTP client for the findcomplain backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: Client,
    base_url: String,
    metrics: Arc<MetricsCollector>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.api_base().to_string(),
            metrics: Arc::new(MetricsCollector::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends one request and maps non-success statuses onto `ApiError`.
    /// Every attempt is recorded in the metrics, failed ones included.
    pub async fn make_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&'static str, String)],
        body: Option<&B>,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let start_time = Instant::now();

        let mut request_builder = self.http_client.request(method.clone(), &url);
        if !query_params.is_empty() {
            request_builder = request_builder.query(query_params);
        }
        if let Some(body) = body {
            request_builder = request_builder.json(body);
        }

        info!("Making API request: {} {}", method, endpoint);
        let outcome = match request_builder.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    debug!("Request successful: {} {}", status, endpoint);
                    Ok(response)
                } else {
                    error!("Request failed with status: {} for {}", status, endpoint);
                    Err(Self::status_error(status, endpoint, response).await)
                }
            }
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    Err(CoreError::Api(ApiError::RequestTimeout))
                } else {
                    Err(CoreError::Network(e))
                }
            }
        };

        let (status_code, error_type) = match &outcome {
            Ok(response) => (Some(response.status().as_u16()), None),
            Err(e) => (status_of(e), Some(error_type_of(e).to_string())),
        };
        self.metrics
            .record_request(RequestMetrics {
                endpoint: endpoint.to_string(),
                method: method.to_string(),
                status_code,
                response_time: start_time.elapsed(),
                success: outcome.is_ok(),
                error_type,
            })
            .await;

        outcome
    }

    async fn status_error(status: StatusCode, endpoint: &str, response: Response) -> CoreError {
        let status_code = status.as_u16();
        let api_error = match status_code {
            400 => {
                let details = response.text().await.unwrap_or_default();
                ApiError::BadRequest {
                    endpoint: endpoint.to_string(),
                    details: if details.trim().is_empty() {
                        "Bad request".to_string()
                    } else {
                        details
                    },
                }
            }
            404 => ApiError::NotFound {
                resource: endpoint.to_string(),
            },
            _ if status.is_server_error() => ApiError::ServerError {
                status_code,
                endpoint: endpoint.to_string(),
            },
            _ => ApiError::UnexpectedStatus {
                status_code,
                endpoint: endpoint.to_string(),
            },
        };
        CoreError::Api(api_error)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&'static str, String)],
    ) -> Result<T, CoreError> {
        let response = self
            .make_request::<()>(Method::GET, endpoint, query_params, None)
            .await?;
        parse_json(response, endpoint).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        query_params: &[(&'static str, String)],
        body: Option<&B>,
    ) -> Result<T, CoreError> {
        let response = self
            .make_request(Method::POST, endpoint, query_params, body)
            .await?;
        parse_json(response, endpoint).await
    }

    async fn delete(&self, endpoint: &str) -> Result<Response, CoreError> {
        self.make_request::<()>(Method::DELETE, endpoint, &[], None)
            .await
    }

    // Analysis sessions

    pub async fn start_analysis(&self, request: &AnalyzeRequest) -> Result<AnalysisSession, CoreError> {
        let session: AnalysisSession = self.post_json("/analyze", &[], Some(request)).await?;
        info!(
            "Started analysis session {} for r/{} ({})",
            session.session_id, session.subreddit, session.status
        );
        Ok(session)
    }

    pub async fn get_analysis_status(&self, session_id: i64) -> Result<AnalysisSession, CoreError> {
        let endpoint = format!("/analyze/{}/status", session_id);
        let session: AnalysisSession = self.get_json(&endpoint, &[]).await?;
        debug!("Session {} reports {}", session_id, session.status);
        Ok(session)
    }

    // Complaints

    pub async fn get_complaints(&self, filter: &ComplaintFilter) -> Result<Vec<Complaint>, CoreError> {
        let complaints: Vec<Complaint> = self
            .get_json("/complaints", &filter.query_params())
            .await?;
        info!("Retrieved {} complaints", complaints.len());
        Ok(complaints)
    }

    pub async fn get_complaint(&self, id: i64) -> Result<Complaint, CoreError> {
        self.get_json(&format!("/complaints/{}", id), &[]).await
    }

    pub async fn delete_complaint(&self, id: i64) -> Result<(), CoreError> {
        self.delete(&format!("/complaints/{}", id)).await?;
        info!("Deleted complaint {}", id);
        Ok(())
    }

    pub async fn get_complaint_subreddits(&self) -> Result<Vec<String>, CoreError> {
        self.get_json("/complaints/subreddits", &[]).await
    }

    // Business ideas

    pub async fn get_ideas(&self, filter: &IdeaFilter) -> Result<Vec<BusinessIdea>, CoreError> {
        let ideas: Vec<BusinessIdea> = self
            .get_json(filter.endpoint(), &filter.query_params())
            .await?;
        info!("Retrieved {} business ideas", ideas.len());
        Ok(ideas)
    }

    pub async fn get_idea(&self, id: i64) -> Result<BusinessIdea, CoreError> {
        self.get_json(&format!("/ideas/{}", id), &[]).await
    }

    pub async fn delete_idea(&self, id: i64) -> Result<(), CoreError> {
        self.delete(&format!("/ideas/{}", id)).await?;
        info!("Deleted business idea {}", id);
        Ok(())
    }

    // App ideas

    pub async fn get_app_ideas(&self, filter: AppIdeaFilter) -> Result<Vec<AppIdea>, CoreError> {
        let ideas: Vec<AppIdea> = self.get_json(filter.endpoint(), &[]).await?;
        info!("Retrieved {} app ideas ({:?})", ideas.len(), filter);
        Ok(ideas)
    }

    pub async fn get_app_idea_subreddits(&self) -> Result<TargetSubreddits, CoreError> {
        self.get_json("/app-ideas/subreddits", &[]).await
    }

    pub async fn add_target_subreddit(&self, subreddit: &str) -> Result<TargetSubreddits, CoreError> {
        let name = normalize_subreddit(subreddit)?;
        let body = serde_json::json!({ "subreddit": name });
        self.post_json("/app-ideas/subreddits", &[], Some(&body))
            .await
    }

    pub async fn remove_target_subreddit(&self, subreddit: &str) -> Result<TargetSubreddits, CoreError> {
        let name = normalize_subreddit(subreddit)?;
        let endpoint = format!("/app-ideas/subreddits/{}", name);
        let response = self.delete(&endpoint).await?;
        parse_json(response, &endpoint).await
    }

    /// Runs app-idea extraction on one subreddit right away. Without a limit
    /// the backend picks its own default.
    pub async fn analyze_subreddit_for_app_ideas(
        &self,
        subreddit: &str,
        limit: Option<u32>,
    ) -> Result<Vec<AppIdea>, CoreError> {
        let name = normalize_subreddit(subreddit)?;
        let endpoint = format!("/app-ideas/analyze/{}", name);
        let params: Vec<(&'static str, String)> =
            limit.map(|l| ("limit", l.to_string())).into_iter().collect();
        let ideas: Vec<AppIdea> = self.post_json::<_, ()>(&endpoint, &params, None).await?;
        info!("Extracted {} app ideas from r/{}", ideas.len(), name);
        Ok(ideas)
    }

    pub async fn toggle_bookmark(&self, id: i64) -> Result<AppIdea, CoreError> {
        let endpoint = format!("/app-ideas/{}/bookmark", id);
        let idea: AppIdea = self.post_json::<_, ()>(&endpoint, &[], None).await?;
        debug!("App idea {} bookmarked={}", id, idea.bookmarked);
        Ok(idea)
    }

    pub async fn discover_app_ideas(&self) -> Result<DiscoveryResult, CoreError> {
        let result: DiscoveryResult = self
            .post_json::<_, ()>("/app-ideas/discover", &[], None)
            .await?;
        info!(
            "Discovery found {} new ideas across {} subreddits",
            result.new_ideas_found,
            result.subreddits_scanned.len()
        );
        Ok(result)
    }

    // Dashboard

    pub async fn get_dashboard_stats(&self) -> Result<DashboardStats, CoreError> {
        self.get_json("/dashboard/stats", &[]).await
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.get_metrics().await
    }

    pub async fn export_metrics(&self) -> Result<String, CoreError> {
        Ok(self.metrics.export_metrics().await?)
    }

    pub async fn reset_metrics(&self) {
        self.metrics.reset_metrics().await;
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T, CoreError> {
    let bytes = response.bytes().await.map_err(|e| {
        error!("Failed to read response body from {}: {}", endpoint, e);
        CoreError::Api(ApiError::InvalidResponse {
            details: format!("Failed to read response from {}", endpoint),
        })
    })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        error!("Failed to parse response from {}: {}", endpoint, e);
        CoreError::Api(ApiError::InvalidResponse {
            details: format!("Failed to parse response from {}: {}", endpoint, e),
        })
    })
}

fn status_of(error: &CoreError) -> Option<u16> {
    match error {
        CoreError::Api(ApiError::BadRequest { .. }) => Some(400),
        CoreError::Api(ApiError::NotFound { .. }) => Some(404),
        CoreError::Api(ApiError::UnexpectedStatus { status_code, .. })
        | CoreError::Api(ApiError::ServerError { status_code, .. }) => Some(*status_code),
        _ => None,
    }
}

fn error_type_of(error: &CoreError) -> &'static str {
    match error {
        CoreError::Api(ApiError::BadRequest { .. }) => "bad_request",
        CoreError::Api(ApiError::NotFound { .. }) => "not_found",
        CoreError::Api(ApiError::UnexpectedStatus { .. }) => "unexpected_status",
        CoreError::Api(ApiError::ServerError { .. }) => "server_error",
        CoreError::Api(ApiError::RequestTimeout) => "timeout",
        _ => "network_error",
    }
}
