//! Analysis sessions as the backend reports them, plus the rules the client
//! uses to validate requests and to accept status updates.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-side lifecycle of an analysis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    Pending,
    Collecting,
    Analyzing,
    GeneratingIdeas,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub const ALL: [AnalysisStatus; 6] = [
        AnalysisStatus::Pending,
        AnalysisStatus::Collecting,
        AnalysisStatus::Analyzing,
        AnalysisStatus::GeneratingIdeas,
        AnalysisStatus::Completed,
        AnalysisStatus::Failed,
    ];

    /// Position in the progression. Both terminal states share the last rank.
    pub fn rank(self) -> u8 {
        match self {
            AnalysisStatus::Pending => 0,
            AnalysisStatus::Collecting => 1,
            AnalysisStatus::Analyzing => 2,
            AnalysisStatus::GeneratingIdeas => 3,
            AnalysisStatus::Completed | AnalysisStatus::Failed => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }

    /// Whether a report of `next` may replace `self`. Repeats are fine, going
    /// backwards is not, and nothing follows a terminal status.
    pub fn can_advance_to(self, next: AnalysisStatus) -> bool {
        if self.is_terminal() {
            return self == next;
        }
        next.rank() >= self.rank()
    }

    pub fn progress_text(self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "Waiting to start...",
            AnalysisStatus::Collecting => "Collecting Reddit posts...",
            AnalysisStatus::Analyzing => "Analyzing complaints with AI...",
            AnalysisStatus::GeneratingIdeas => "Generating business ideas...",
            AnalysisStatus::Completed => "Analysis complete!",
            AnalysisStatus::Failed => "Analysis failed",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "PENDING",
            AnalysisStatus::Collecting => "COLLECTING",
            AnalysisStatus::Analyzing => "ANALYZING",
            AnalysisStatus::GeneratingIdeas => "GENERATING_IDEAS",
            AnalysisStatus::Completed => "COMPLETED",
            AnalysisStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mirror of the backend's `AnalyzeResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSession {
    pub session_id: i64,
    pub subreddit: String,
    pub status: AnalysisStatus,
    #[serde(default)]
    pub message: String,
}

impl AnalysisSession {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Number of posts an analysis may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PostLimit {
    Posts25,
    #[default]
    Posts50,
    Posts100,
}

impl PostLimit {
    pub const ALLOWED: [u32; 3] = [25, 50, 100];

    pub fn get(self) -> u32 {
        match self {
            PostLimit::Posts25 => 25,
            PostLimit::Posts50 => 50,
            PostLimit::Posts100 => 100,
        }
    }
}

impl TryFrom<u32> for PostLimit {
    type Error = CoreError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            25 => Ok(PostLimit::Posts25),
            50 => Ok(PostLimit::Posts50),
            100 => Ok(PostLimit::Posts100),
            other => Err(CoreError::invalid_input(format!(
                "post limit must be one of 25, 50 or 100 (got {})",
                other
            ))),
        }
    }
}

impl From<PostLimit> for u32 {
    fn from(limit: PostLimit) -> Self {
        limit.get()
    }
}

impl fmt::Display for PostLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Strips surrounding whitespace and a leading `r/` or `/r/`.
pub fn normalize_subreddit(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    let name = trimmed
        .strip_prefix("/r/")
        .or_else(|| trimmed.strip_prefix("r/"))
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .trim();

    if name.is_empty() {
        return Err(CoreError::invalid_input("subreddit must not be empty"));
    }
    if name.contains(char::is_whitespace) || name.contains('/') {
        return Err(CoreError::invalid_input(format!(
            "'{}' is not a valid subreddit name",
            name
        )));
    }
    Ok(name.to_string())
}

/// Splits a comma-separated keyword string. Blank entries are dropped and an
/// empty result becomes `None`.
pub fn parse_keywords(raw: &str) -> Option<Vec<String>> {
    let keywords: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();

    if keywords.is_empty() {
        None
    } else {
        Some(keywords)
    }
}

/// Body of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub subreddit: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub limit: Option<PostLimit>,
}

impl AnalyzeRequest {
    pub fn new(
        subreddit: &str,
        keywords: Option<Vec<String>>,
        limit: PostLimit,
    ) -> Result<Self, CoreError> {
        let keywords = keywords
            .map(|list| {
                list.into_iter()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty());

        Ok(Self {
            subreddit: normalize_subreddit(subreddit)?,
            keywords,
            limit: Some(limit),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&AnalysisStatus::GeneratingIdeas).unwrap();
        assert_eq!(json, "\"GENERATING_IDEAS\"");

        let status: AnalysisStatus = serde_json::from_str("\"COLLECTING\"").unwrap();
        assert_eq!(status, AnalysisStatus::Collecting);

        assert!(serde_json::from_str::<AnalysisStatus>("\"RUNNING\"").is_err());
    }

    #[test]
    fn test_status_progression() {
        use AnalysisStatus::*;

        assert!(Pending.can_advance_to(Pending));
        assert!(Pending.can_advance_to(Analyzing));
        assert!(GeneratingIdeas.can_advance_to(Failed));
        assert!(Collecting.can_advance_to(Completed));

        assert!(!Analyzing.can_advance_to(Collecting));
        assert!(!Completed.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Pending));
        assert!(Completed.can_advance_to(Completed));

        let terminal: Vec<_> = AnalysisStatus::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![&Completed, &Failed]);
    }

    #[test]
    fn test_session_deserialization() {
        let json = r#"{"sessionId":42,"subreddit":"programming","status":"PENDING","message":"Analysis started"}"#;
        let session: AnalysisSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.session_id, 42);
        assert_eq!(session.status, AnalysisStatus::Pending);
        assert!(!session.is_terminal());

        let without_message = r#"{"sessionId":7,"subreddit":"rust","status":"FAILED"}"#;
        let session: AnalysisSession = serde_json::from_str(without_message).unwrap();
        assert!(session.message.is_empty());
        assert!(session.is_terminal());
    }

    #[test]
    fn test_normalize_subreddit() {
        assert_eq!(normalize_subreddit("r/programming").unwrap(), "programming");
        assert_eq!(normalize_subreddit("  /r/rust/ ").unwrap(), "rust");
        assert_eq!(normalize_subreddit("SaaS").unwrap(), "SaaS");

        assert!(normalize_subreddit("").is_err());
        assert!(normalize_subreddit("r/").is_err());
        assert!(normalize_subreddit("two words").is_err());
    }

    #[test]
    fn test_post_limit() {
        assert_eq!(PostLimit::default().get(), 50);
        assert_eq!(PostLimit::try_from(100).unwrap(), PostLimit::Posts100);
        assert!(PostLimit::try_from(30).is_err());

        let limit: PostLimit = serde_json::from_str("25").unwrap();
        assert_eq!(limit, PostLimit::Posts25);
        assert!(serde_json::from_str::<PostLimit>("10").is_err());
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(
            parse_keywords("frustrating, hate ,,terrible"),
            Some(vec![
                "frustrating".to_string(),
                "hate".to_string(),
                "terrible".to_string()
            ])
        );
        assert_eq!(parse_keywords(" , "), None);
    }

    #[test]
    fn test_analyze_request_body() {
        let request = AnalyzeRequest::new("r/programming", None, PostLimit::Posts50).unwrap();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "subreddit": "programming", "limit": 50 })
        );

        let request = AnalyzeRequest::new(
            "webdev",
            Some(vec![" slow ".to_string(), "".to_string()]),
            PostLimit::Posts25,
        )
        .unwrap();
        assert_eq!(request.keywords, Some(vec!["slow".to_string()]));

        let request =
            AnalyzeRequest::new("webdev", Some(vec![" ".to_string()]), PostLimit::Posts25)
                .unwrap();
        assert_eq!(request.keywords, None);
    }
}
