//! Laddr serve command for running the assessment server
//!
//! Wires a store, the scoring policy and the feedback worker into a
//! [`LaddrServer`] and runs it in the foreground.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use laddr_core::{
    AssessmentStore, CatalogStore, FeedbackQueue, FeedbackWorker, MemoryStore, ScoringPolicy,
    SqliteStore, TemplateFeedbackProvider,
};
use laddr_server::{AppState, LaddrServer, ServerConfig};
use tracing::info;

/// Default port for the laddr server
pub const DEFAULT_PORT: u16 = 7610;
/// Default host for the laddr server
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// SQLite database path; a fresh in-memory store when omitted
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Scoring policy TOML file; built-in defaults when omitted
    #[arg(long)]
    pub policy: Option<PathBuf>,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let policy = load_policy(args.policy.as_deref())?;

    let (catalog, store): (Arc<dyn CatalogStore>, Arc<dyn AssessmentStore>) = match &args.db {
        Some(path) => {
            let store = Arc::new(
                SqliteStore::open(path)
                    .with_context(|| format!("opening database {}", path.display()))?,
            );
            info!("Using SQLite store at {}", path.display());
            (store.clone(), store)
        }
        None => {
            let store = Arc::new(MemoryStore::new());
            info!("No --db given, using a fresh in-memory store");
            (store.clone(), store)
        }
    };

    let (queue, rx) = FeedbackQueue::channel();
    let worker = FeedbackWorker::new(rx, Arc::new(TemplateFeedbackProvider), store.clone());
    let state = Arc::new(AppState::new(catalog, store, policy, queue));

    let config = ServerConfig::new(args.host.clone(), args.port);
    info!("Starting laddr server on {}", config.addr());

    let server = LaddrServer::with_state(config, state).with_worker(worker);
    server.run().await.map_err(Into::into)
}

/// Load the scoring policy, falling back to the built-in defaults
fn load_policy(path: Option<&Path>) -> Result<ScoringPolicy> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading policy file {}", path.display()))?;
            ScoringPolicy::from_toml_str(&text)
                .with_context(|| format!("parsing policy file {}", path.display()))
        }
        None => Ok(ScoringPolicy::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port() {
        assert_eq!(DEFAULT_PORT, 7610);
    }

    #[test]
    fn test_serve_args_defaults() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            serve: ServeArgs,
        }

        let cli = TestCli::parse_from(["test"]);
        assert_eq!(cli.serve.port, DEFAULT_PORT);
        assert_eq!(cli.serve.host, DEFAULT_HOST);
        assert!(cli.serve.db.is_none());
        assert!(cli.serve.policy.is_none());
    }

    #[test]
    fn test_serve_args_custom_port_and_db() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            serve: ServeArgs,
        }

        let cli = TestCli::parse_from(["test", "--port", "8080", "--db", "laddr.db"]);
        assert_eq!(cli.serve.port, 8080);
        assert_eq!(cli.serve.db.as_deref(), Some(Path::new("laddr.db")));
    }

    #[test]
    fn test_load_policy_defaults_when_omitted() {
        let policy = load_policy(None).unwrap();
        assert_eq!(policy.gating.diagnostic_pass_score, 80.0);
        assert_eq!(policy.rewards.xp_per_correct, 10);
    }

    #[test]
    fn test_load_policy_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.toml");
        std::fs::write(&path, "[gating]\nstandard_pass_score = 75.0\n").unwrap();

        let policy = load_policy(Some(&path)).unwrap();
        assert_eq!(policy.gating.standard_pass_score, 75.0);
        // Untouched sections keep their defaults
        assert_eq!(policy.gating.diagnostic_pass_score, 80.0);
    }

    #[test]
    fn test_load_policy_missing_file_errors() {
        let result = load_policy(Some(Path::new("/nonexistent/policy.toml")));
        assert!(result.is_err());
    }
}
