use crate::cli::OutputFormat;
use anyhow::Result;
use findcomplain_client::{ApiMetrics, PollerState};
use findcomplain_core::{
    AnalysisSession, AppIdea, BusinessIdea, Complaint, DashboardStats, DiscoveryResult,
    TargetSubreddits,
};
use serde::Serialize;

pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Prints `value` as JSON, or through `plain` otherwise.
    pub fn emit<T: Serialize + ?Sized>(&self, value: &T, plain: impl FnOnce(&T)) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Plain => plain(value),
        }
        Ok(())
    }

    /// Plain-mode only line, used for progress and notices.
    pub fn note(&self, message: &str) {
        if !self.is_json() {
            println!("{}", message);
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let text = text.trim().replace('\n', " ");
    if text.chars().count() > max_chars {
        let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        text
    }
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn print_session(session: &AnalysisSession) {
    println!(
        "Session {} r/{} [{}] {}",
        session.session_id,
        session.subreddit,
        session.status,
        session.status.progress_text()
    );
    if !session.message.is_empty() {
        println!("  {}", session.message);
    }
}

pub fn print_progress(state: &PollerState) {
    match state {
        PollerState::Idle => {}
        PollerState::Starting { subreddit } => println!("Submitting analysis for r/{}...", subreddit),
        PollerState::Polling { session } | PollerState::Finished { session } => println!(
            "[{}] {}",
            session.status,
            session.status.progress_text()
        ),
        PollerState::Error { message, .. } => println!("Error: {}", message),
        PollerState::TimedOut { session } => println!(
            "Gave up waiting for session {} (last status {})",
            session.session_id, session.status
        ),
    }
}

pub fn print_complaints(complaints: &[Complaint]) {
    println!("{:<6} {:<18} {:<10} {:<5} TITLE", "ID", "SUBREDDIT", "CATEGORY", "PAIN");
    println!("{}", "-".repeat(80));
    for complaint in complaints {
        println!(
            "{:<6} {:<18} {:<10} {:<5} {}",
            complaint.id,
            preview(&complaint.subreddit, 18),
            opt(&complaint.category),
            opt(&complaint.pain_level),
            preview(&complaint.title, 60)
        );
    }
    println!();
    println!("{} complaints", complaints.len());
}

pub fn print_complaint(complaint: &Complaint) {
    println!("Complaint {}: {}", complaint.id, complaint.title);
    println!("{}", "=".repeat(60));
    println!("Subreddit:  r/{}", complaint.subreddit);
    println!("Category:   {}", opt(&complaint.category));
    println!("Pain level: {}", opt(&complaint.pain_level));
    println!("Author:     {}", opt(&complaint.author));
    println!("Score:      {}", opt(&complaint.score));
    println!("Created:    {}", opt(&complaint.created_at));
    if let Some(problem) = &complaint.extracted_problem {
        println!("Problem:    {}", problem);
    }
    if let Some(content) = &complaint.content {
        println!();
        println!("{}", content.trim());
    }
    if let Some(url) = complaint.reddit_url() {
        println!();
        println!("{}", url);
    }
}

pub fn print_business_ideas(ideas: &[BusinessIdea]) {
    println!("{:<6} {:<8} {:<6} TITLE", "ID", "LEVEL", "SCORE");
    println!("{}", "-".repeat(80));
    for idea in ideas {
        println!(
            "{:<6} {:<8} {:<6} {}",
            idea.id,
            opt(&idea.difficulty),
            opt(&idea.potential_score),
            preview(&idea.title, 64)
        );
    }
    println!();
    println!("{} ideas", ideas.len());
}

pub fn print_business_idea(idea: &BusinessIdea) {
    println!("Idea {}: {}", idea.id, idea.title);
    println!("{}", "=".repeat(60));
    println!("Difficulty:    {}", opt(&idea.difficulty));
    println!("Potential:     {}", opt(&idea.potential_score));
    println!("Target market: {}", opt(&idea.target_market));
    println!("Problem:       {}", opt(&idea.problem_statement));
    println!("Solution:      {}", opt(&idea.solution));
    if !idea.source_complaints.is_empty() {
        let ids: Vec<String> = idea.source_complaints.iter().map(|id| id.to_string()).collect();
        println!("Sources:       complaints {}", ids.join(", "));
    }
}

pub fn print_app_ideas(ideas: &[AppIdea]) {
    println!("{:<6} {:<3} {:<8} {:<5} NAME", "ID", "BM", "LEVEL", "SCORE");
    println!("{}", "-".repeat(80));
    for idea in ideas {
        println!(
            "{:<6} {:<3} {:<8} {:<5} {}",
            idea.id,
            if idea.bookmarked { "*" } else { "" },
            opt(&idea.difficulty),
            opt(&idea.viability_score),
            preview(idea.display_name(), 60)
        );
    }
    println!();
    println!("{} app ideas", ideas.len());
}

pub fn print_app_idea(idea: &AppIdea) {
    println!(
        "App idea {}: {}{}",
        idea.id,
        idea.display_name(),
        if idea.bookmarked { " (bookmarked)" } else { "" }
    );
    if let Some(summary) = &idea.problem_summary {
        println!("  {}", preview(summary, 100));
    }
    if let Some(url) = idea.reddit_url() {
        println!("  {}", url);
    }
}

pub fn print_subreddits(subreddits: &[String]) {
    if subreddits.is_empty() {
        println!("No subreddits analyzed yet.");
    }
    for subreddit in subreddits {
        println!("r/{}", subreddit);
    }
}

pub fn print_targets(targets: &TargetSubreddits) {
    if let Some(message) = &targets.message {
        println!("{}", message);
    }
    println!("Default: {}", targets.defaults.join(", "));
    println!(
        "Custom:  {}",
        if targets.custom.is_empty() {
            "-".to_string()
        } else {
            targets.custom.join(", ")
        }
    );
}

pub fn print_discovery(result: &DiscoveryResult) {
    println!("{}", result.message);
    println!("New ideas found: {}", result.new_ideas_found);
    println!("Scanned: {}", result.subreddits_scanned.join(", "));
}

pub fn print_dashboard(stats: &DashboardStats) {
    println!("DASHBOARD");
    println!("{}", "=".repeat(60));
    println!("Complaints:  {}", stats.total_complaints);
    println!("Ideas:       {}", stats.total_ideas);
    println!("Subreddits:  {}", stats.total_subreddits);

    if !stats.category_distribution.is_empty() {
        println!();
        println!("By category:");
        for (category, count) in &stats.category_distribution {
            println!("  {:<10} {}", category, count);
        }
    }

    if !stats.recent_activities.is_empty() {
        println!();
        println!("Recent activity:");
        for activity in &stats.recent_activities {
            println!(
                "  [{}] {} {}",
                activity.kind,
                preview(&activity.description, 60),
                activity.timestamp.as_deref().unwrap_or("")
            );
        }
    }
}

pub fn print_metrics(metrics: &ApiMetrics) {
    println!();
    println!("REQUEST METRICS");
    println!("{}", "=".repeat(60));
    println!(
        "Requests: {} ({} ok, {} failed), average {:?}",
        metrics.total_requests,
        metrics.successful_requests,
        metrics.failed_requests,
        metrics.average_response_time
    );

    let mut endpoints: Vec<_> = metrics.requests_by_endpoint.iter().collect();
    endpoints.sort_by(|a, b| a.0.cmp(b.0));
    for (endpoint, stats) in endpoints {
        println!(
            "  {:<32} {:>4} req  {:>5.1}% ok  avg {:?}",
            endpoint,
            stats.request_count,
            stats.success_rate() * 100.0,
            stats.average_response_time()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_chars() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("가격이 너무 비싸요 정말로", 8), "가격이 너...");
        assert_eq!(preview("line one\nline two", 40), "line one line two");
    }

    #[test]
    fn test_opt_placeholder() {
        assert_eq!(opt::<u8>(&None), "-");
        assert_eq!(opt(&Some(7)), "7");
    }
}
