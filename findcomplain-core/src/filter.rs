//! Filter selections for the list endpoints and the query strings they map to.

use crate::types::Difficulty;
use serde::{Deserialize, Serialize};

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `GET /complaints?subreddit=&category=`. Blank selections mean "any".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComplaintFilter {
    pub subreddit: Option<String>,
    pub category: Option<String>,
}

impl ComplaintFilter {
    pub fn new(subreddit: Option<String>, category: Option<String>) -> Self {
        Self {
            subreddit: non_blank(subreddit),
            category: non_blank(category),
        }
    }

    pub fn with_subreddit(mut self, subreddit: impl Into<String>) -> Self {
        self.subreddit = non_blank(Some(subreddit.into()));
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = non_blank(Some(category.into()));
        self
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(2);
        if let Some(subreddit) = &self.subreddit {
            params.push(("subreddit", subreddit.clone()));
        }
        if let Some(category) = &self.category {
            params.push(("category", category.clone()));
        }
        params
    }
}

/// Business idea listing: either the filtered recent list or the top list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdeaFilter {
    Recent {
        difficulty: Option<Difficulty>,
        limit: Option<u32>,
    },
    Top,
}

impl Default for IdeaFilter {
    fn default() -> Self {
        IdeaFilter::Recent {
            difficulty: None,
            limit: None,
        }
    }
}

impl IdeaFilter {
    pub fn endpoint(&self) -> &'static str {
        match self {
            IdeaFilter::Recent { .. } => "/ideas",
            IdeaFilter::Top => "/ideas/top",
        }
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(2);
        if let IdeaFilter::Recent { difficulty, limit } = self {
            if let Some(difficulty) = difficulty {
                params.push(("difficulty", difficulty.as_str().to_string()));
            }
            if let Some(limit) = limit {
                params.push(("limit", limit.to_string()));
            }
        }
        params
    }
}

/// App idea listing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AppIdeaFilter {
    #[default]
    All,
    Top,
    Bookmarked,
}

impl AppIdeaFilter {
    pub fn endpoint(&self) -> &'static str {
        match self {
            AppIdeaFilter::All => "/app-ideas",
            AppIdeaFilter::Top => "/app-ideas/top",
            AppIdeaFilter::Bookmarked => "/app-ideas/bookmarked",
        }
    }
}
