use crate::cli::{Cli, Commands};
use crate::output::{self, Output};
use anyhow::{anyhow, Result};
use findcomplain_client::{
    AnalysisSessionPoller, ApiClient, AppIdeaBoard, DashboardView, ListView, PollHandle,
    PollSettings, PollerState, ViewState,
};
use findcomplain_core::{
    parse_keywords, AnalysisStatus, AppIdeaFilter, ClientConfig, ComplaintFilter, IdeaFilter,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// How a command ended when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The command ran but the analysis it followed did not complete.
    Unsuccessful,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Unsuccessful => ExitCode::FAILURE,
        }
    }
}

pub async fn run(cli: Cli) -> Result<Outcome> {
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.clone());
        config.validate()?;
    }
    debug!("Using backend at {}", config.api_base());

    let client = Arc::new(ApiClient::new(&config)?);
    let out = Output::new(cli.format);

    let outcome = dispatch(cli.command, &client, &config, &out).await;

    if cli.stats {
        let metrics = client.get_metrics().await;
        out.emit(&metrics, output::print_metrics)?;
    }

    outcome
}

async fn dispatch(
    command: Commands,
    client: &Arc<ApiClient>,
    config: &ClientConfig,
    out: &Output,
) -> Result<Outcome> {
    match command {
        Commands::Analyze {
            subreddit,
            keywords,
            limit,
            detach,
        } => {
            let poller = AnalysisSessionPoller::new(Arc::clone(client), PollSettings::from(config));
            let keywords = keywords.as_deref().and_then(parse_keywords);
            let handle = poller.start(&subreddit, keywords, limit).await?;

            if detach {
                out.emit(handle.session(), output::print_session)?;
                return Ok(Outcome::Success);
            }
            follow(&poller, handle, out).await
        }

        Commands::Status { session_id, follow: keep_following } => {
            if !keep_following {
                let session = client.get_analysis_status(session_id).await?;
                out.emit(&session, output::print_session)?;
                return Ok(Outcome::Success);
            }
            let poller = AnalysisSessionPoller::new(Arc::clone(client), PollSettings::from(config));
            let handle = poller.track(session_id).await?;
            follow(&poller, handle, out).await
        }

        Commands::Complaints {
            subreddit,
            category,
        } => {
            let mut view = ListView::new(Arc::clone(client), ComplaintFilter::new(subreddit, category));
            let state = view.refresh().await;
            show_list(out, state, "No complaints found.", |items| {
                output::print_complaints(items)
            })
        }

        Commands::Complaint { id, delete } => {
            if delete {
                client.delete_complaint(id).await?;
                out.note(&format!("Deleted complaint {}", id));
            } else {
                let complaint = client.get_complaint(id).await?;
                out.emit(&complaint, output::print_complaint)?;
            }
            Ok(Outcome::Success)
        }

        Commands::Subreddits => {
            let subreddits = client.get_complaint_subreddits().await?;
            out.emit(&subreddits, |s| output::print_subreddits(s))?;
            Ok(Outcome::Success)
        }

        Commands::Ideas {
            difficulty,
            limit,
            top,
        } => {
            let filter = if top {
                IdeaFilter::Top
            } else {
                IdeaFilter::Recent { difficulty, limit }
            };
            let mut view = ListView::new(Arc::clone(client), filter);
            let state = view.refresh().await;
            show_list(out, state, "No business ideas yet.", |items| {
                output::print_business_ideas(items)
            })
        }

        Commands::Idea { id, delete } => {
            if delete {
                client.delete_idea(id).await?;
                out.note(&format!("Deleted idea {}", id));
            } else {
                let idea = client.get_idea(id).await?;
                out.emit(&idea, output::print_business_idea)?;
            }
            Ok(Outcome::Success)
        }

        Commands::AppIdeas { top, bookmarked } => {
            let filter = if bookmarked {
                AppIdeaFilter::Bookmarked
            } else if top {
                AppIdeaFilter::Top
            } else {
                AppIdeaFilter::All
            };
            let mut board = AppIdeaBoard::new(Arc::clone(client), filter);
            let state = board.refresh().await;
            show_list(out, state, "No app ideas found.", |items| {
                output::print_app_ideas(items)
            })
        }

        Commands::Bookmark { id } => {
            let idea = client.toggle_bookmark(id).await?;
            out.emit(&idea, output::print_app_idea)?;
            Ok(Outcome::Success)
        }

        Commands::Discover => {
            let mut board = AppIdeaBoard::new(Arc::clone(client), AppIdeaFilter::All);
            out.note("Running discovery, this can take a while...");
            let result = board.discover().await?;
            out.emit(&result, output::print_discovery)?;
            if let Some(ideas) = board.state().ready() {
                out.note(&format!("{} app ideas in total", ideas.len()));
            }
            Ok(Outcome::Success)
        }

        Commands::Targets { add, remove } => {
            let targets = match (add, remove) {
                (Some(name), _) => client.add_target_subreddit(&name).await?,
                (None, Some(name)) => client.remove_target_subreddit(&name).await?,
                (None, None) => client.get_app_idea_subreddits().await?,
            };
            out.emit(&targets, output::print_targets)?;
            Ok(Outcome::Success)
        }

        Commands::Scan { subreddit, limit } => {
            let ideas = client
                .analyze_subreddit_for_app_ideas(&subreddit, limit)
                .await?;
            if ideas.is_empty() && !out.is_json() {
                out.note("No app ideas extracted.");
            } else {
                out.emit(&ideas, |items| output::print_app_ideas(items))?;
            }
            Ok(Outcome::Success)
        }

        Commands::Dashboard => {
            let mut view = DashboardView::new(Arc::clone(client));
            match view.refresh().await {
                ViewState::Ready(stats) => out.emit(stats, output::print_dashboard)?,
                ViewState::Empty => {
                    if out.is_json() {
                        out.emit(&findcomplain_core::DashboardStats::default(), |_| {})?;
                    } else {
                        out.note("Nothing analyzed yet. Run `findcomplain analyze <subreddit>` first.");
                    }
                }
                ViewState::Error(message) => return Err(anyhow!(message.clone())),
                ViewState::Loading => return Err(anyhow!("request did not settle")),
            }
            Ok(Outcome::Success)
        }
    }
}

fn show_list<T: serde::Serialize>(
    out: &Output,
    state: &ViewState<Vec<T>>,
    empty_message: &str,
    plain: impl FnOnce(&Vec<T>),
) -> Result<Outcome> {
    match state {
        ViewState::Ready(items) => out.emit(items, plain)?,
        ViewState::Empty => {
            if out.is_json() {
                out.emit(&Vec::<T>::new(), |_| {})?;
            } else {
                out.note(empty_message);
            }
        }
        ViewState::Error(message) => return Err(anyhow!(message.clone())),
        ViewState::Loading => return Err(anyhow!("request did not settle")),
    }
    Ok(Outcome::Success)
}

/// Prints progress until the session settles. Ctrl-C stops polling.
async fn follow(
    poller: &AnalysisSessionPoller<ApiClient>,
    mut handle: PollHandle,
    out: &Output,
) -> Result<Outcome> {
    let mut rx: watch::Receiver<PollerState> = poller.subscribe();
    let mut last_status: Option<AnalysisStatus> = None;

    loop {
        let state = rx.borrow_and_update().clone();
        let status = state.session().map(|s| s.status);
        if status != last_status || state.is_terminal() {
            if !out.is_json() {
                output::print_progress(&state);
            }
            last_status = status;
        }
        if state.is_terminal() {
            break;
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
                info!("Stopped following session {}", handle.session().session_id);
                out.note(&format!(
                    "Stopped. Resume with `findcomplain status {} --follow`.",
                    handle.session().session_id
                ));
                return Ok(Outcome::Unsuccessful);
            }
        }
    }

    let final_state = handle.wait().await?;
    if out.is_json() {
        out.emit(&final_state, |_| {})?;
    }

    Ok(match final_state {
        PollerState::Finished { session } if session.status == AnalysisStatus::Completed => {
            Outcome::Success
        }
        _ => Outcome::Unsuccessful,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(Outcome::Success.exit_code(), ExitCode::SUCCESS);
        assert_eq!(Outcome::Unsuccessful.exit_code(), ExitCode::FAILURE);
    }

    #[tokio::test]
    async fn test_bookmark_toggles_without_listing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/app-ideas/5/bookmark"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 5,
                "redditPostId": "p5",
                "subreddit": "SomebodyMakeThis",
                "appName": "Idea 5",
                "bookmarked": true
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/app-ideas"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&mock_server)
            .await;

        let config = ClientConfig::default().with_base_url(format!("{}/api", mock_server.uri()));
        let client = Arc::new(ApiClient::new(&config).unwrap());
        let out = Output::new(OutputFormat::Json);

        let outcome = dispatch(Commands::Bookmark { id: 5 }, &client, &config, &out)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Success);
    }
}
