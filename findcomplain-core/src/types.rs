use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Categories the backend's classifier assigns to complaints.
pub const COMPLAINT_CATEGORIES: [&str; 6] = ["가격", "UX", "기능부족", "버그", "서비스", "기타"];

/// Post ids with this prefix come from the backend's mock crawler and have no
/// Reddit permalink.
const MOCK_POST_PREFIX: &str = "mock_";

fn reddit_permalink(subreddit: &str, post_id: &str) -> Option<String> {
    if post_id.is_empty() || post_id.starts_with(MOCK_POST_PREFIX) {
        return None;
    }
    Some(format!(
        "https://www.reddit.com/r/{}/comments/{}/",
        subreddit, post_id
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    #[serde(other)]
    Unknown,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(crate::CoreError::invalid_input(format!(
                "difficulty must be easy, medium or hard (got '{}')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: i64,
    #[serde(default)]
    pub reddit_post_id: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub pain_level: Option<u8>,
    #[serde(default)]
    pub extracted_problem: Option<String>,
    #[serde(default)]
    pub analyzed_at: Option<NaiveDateTime>,
}

impl Complaint {
    pub fn reddit_url(&self) -> Option<String> {
        reddit_permalink(&self.subreddit, &self.reddit_post_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessIdea {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub problem_statement: Option<String>,
    #[serde(default)]
    pub solution: Option<String>,
    #[serde(default)]
    pub target_market: Option<String>,
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub potential_score: Option<i32>,
    #[serde(default)]
    pub source_complaints: Vec<i64>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppIdea {
    pub id: i64,
    #[serde(default)]
    pub reddit_post_id: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub original_content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub problem_summary: Option<String>,
    #[serde(default)]
    pub proposed_solution: Option<String>,
    #[serde(default)]
    pub target_users: Option<String>,
    #[serde(default)]
    pub key_features: Option<String>,
    #[serde(default)]
    pub tech_stack: Option<String>,
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub viability_score: Option<u8>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub bookmarked: bool,
    #[serde(default)]
    pub reddit_created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub analyzed_at: Option<NaiveDateTime>,
}

impl AppIdea {
    pub fn reddit_url(&self) -> Option<String> {
        reddit_permalink(&self.subreddit, &self.reddit_post_id)
    }

    pub fn display_name(&self) -> &str {
        self.app_name
            .as_deref()
            .or(self.original_title.as_deref())
            .unwrap_or("(unnamed idea)")
    }
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_complaints: i64,
    pub total_ideas: i64,
    pub total_subreddits: i64,
    #[serde(default)]
    pub category_distribution: BTreeMap<String, i64>,
    #[serde(default)]
    pub recent_activities: Vec<RecentActivity>,
}

impl DashboardStats {
    /// Nothing has been analyzed yet.
    pub fn is_empty(&self) -> bool {
        self.total_complaints == 0
            && self.total_ideas == 0
            && self.total_subreddits == 0
            && self.recent_activities.is_empty()
    }
}

/// Response of `POST /app-ideas/discover`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    #[serde(default)]
    pub message: String,
    pub new_ideas_found: i64,
    #[serde(default)]
    pub subreddits_scanned: Vec<String>,
}

/// Subreddits the backend's idea discovery job scans.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetSubreddits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub defaults: Vec<String>,
    #[serde(default)]
    pub custom: Vec<String>,
    #[serde(default)]
    pub all: Vec<String>,
}
