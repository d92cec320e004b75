//! Grantflow CLI
//!
//! Runs the adaptive interview in the terminal and turns the resulting anketa
//! into a grant application package.

mod terminal;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use grantflow_core::interview::{InteractiveInterviewerAgent, InterviewResult, UserData};
use grantflow_core::models::{LlmProvider, ModelRole};
use grantflow_core::pipeline::{GrantPipeline, PipelineEvent, PipelineEventKind, PipelineResult};
use grantflow_core::skills::{
    AuditorSkill, BlockAuditorSkill, InterviewerSkill, ResearcherSkill, WriterSkill,
};
use grantflow_core::state::{io, GrantDb, SqliteAnketaStore};
use grantflow_core::{GrantflowConfig, PipelineError};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use terminal::{StdinAsker, StdoutNotifier};

#[derive(Parser)]
#[command(author, version, about = "Grantflow - interview an applicant and draft a grant application")]
struct Args {
    #[command(subcommand)]
    command: CliCommand,

    /// LLM provider for every agent (overrides config.json)
    #[arg(long, global = true)]
    provider: Option<LlmProvider>,

    /// Model for every agent (overrides config.json)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Seconds to pause between the writer and auditor stages
    #[arg(long, global = true)]
    cooldown_secs: Option<u64>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Create the runtime directory with a default config
    Init,
    /// Run an interview in the terminal and save the anketa
    Interview {
        /// Applicant id
        #[arg(short, long, default_value = "local")]
        user: String,
        /// Where to write the anketa JSON
        #[arg(short, long, default_value = "anketa.json")]
        out: PathBuf,
        /// Skip the embedded block audits
        #[arg(long)]
        no_audit: bool,
    },
    /// Generate the application package from an anketa
    Pipeline {
        /// Anketa JSON file
        #[arg(short, long, conflicts_with = "id", required_unless_present = "id")]
        anketa: Option<PathBuf>,
        /// Id of a stored anketa
        #[arg(long)]
        id: Option<String>,
        /// Export directory
        #[arg(short, long, default_value = "grant_package")]
        out: PathBuf,
    },
    /// Interview, then run the pipeline on the result
    Run {
        #[arg(short, long, default_value = "local")]
        user: String,
        /// Export directory (the anketa is saved there too)
        #[arg(short, long, default_value = "grant_package")]
        out: PathBuf,
        #[arg(long)]
        no_audit: bool,
    },
    /// List stored anketas
    List {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let runtime_dir = io::get_runtime_path();
    let env_path = runtime_dir.join(".env");
    let env_error = load_env(&env_path);

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(e) = env_error {
        tracing::warn!(path = %env_path.display(), error = %e, "Failed to load .env");
    }

    let args = Args::parse();
    let config = load_config(&args)?;
    tracing::debug!(runtime_dir = %runtime_dir.display(), "Configuration loaded");

    match args.command {
        CliCommand::Init => init(&runtime_dir),
        CliCommand::Interview {
            user,
            out,
            no_audit,
        } => {
            let result = interview(&config, &user, no_audit).await?;
            io::write_anketa(&out, &result.anketa).await?;
            println!("📝 Anketa written to {}", out.display());
            Ok(())
        }
        CliCommand::Pipeline { anketa, id, out } => {
            let project = match (anketa, id) {
                (Some(path), _) => io::read_anketa(&path).await?,
                (None, Some(id)) => {
                    let db = GrantDb::open()?;
                    SqliteAnketaStore::new(&db).load(&id)?.anketa
                }
                (None, None) => anyhow::bail!("Pass --anketa <file> or --id <anketa id>"),
            };
            pipeline(&config, &project, &out).await.map(|_| ())
        }
        CliCommand::Run {
            user,
            out,
            no_audit,
        } => {
            let result = interview(&config, &user, no_audit).await?;
            io::write_anketa(out.join("anketa.json"), &result.anketa).await?;
            pipeline(&config, &result.anketa, &out).await.map(|_| ())
        }
        CliCommand::List { limit } => {
            let db = GrantDb::open()?;
            let stored = SqliteAnketaStore::new(&db).list_recent(limit)?;
            if stored.is_empty() {
                println!("No anketas stored yet.");
            }
            for entry in stored {
                println!(
                    "{}  {}  {:<12} {}",
                    entry.id,
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.user_id,
                    entry.project_name.as_deref().unwrap_or("(unnamed)")
                );
            }
            Ok(())
        }
    }
}

/// Load `.env` if present. A missing file is fine; anything else is returned.
fn load_env(path: &Path) -> Option<dotenvy::Error> {
    match dotenvy::from_path(path) {
        Ok(()) => None,
        Err(e) if e.not_found() => None,
        Err(e) => Some(e),
    }
}

/// Config file values, then CLI flags
fn load_config(args: &Args) -> anyhow::Result<GrantflowConfig> {
    let mut config = GrantflowConfig::load()?;
    if let Some(provider) = args.provider {
        config.global_provider = provider;
        config.per_role_providers.clear();
    }
    if let Some(model) = &args.model {
        config.global_model = Some(model.clone());
        config.per_role_models.clear();
    }
    if let Some(secs) = args.cooldown_secs {
        config.pipeline.backoff.cooldown_ms = secs.saturating_mul(1000);
    }
    Ok(config)
}

fn init(runtime_dir: &Path) -> anyhow::Result<()> {
    println!("🔧 Initializing Grantflow in {}", runtime_dir.display());
    std::fs::create_dir_all(runtime_dir)
        .with_context(|| format!("Failed to create {:?}", runtime_dir))?;

    std::fs::write(
        runtime_dir.join(".gitignore"),
        "# Never commit secrets\n.env\n*.db\n",
    )?;

    let config_path = runtime_dir.join(grantflow_core::config::CONFIG_FILE);
    if !config_path.exists() {
        GrantflowConfig::default().save_to(&config_path)?;
        println!("   Created {}", config_path.display());
    }

    let env_path = runtime_dir.join(".env");
    if !env_path.exists() {
        std::fs::write(
            &env_path,
            "ANTHROPIC_API_KEY=\n# OPENAI_API_KEY=\n# GEMINI_API_KEY=\n# OPENROUTER_API_KEY=\n# XAI_API_KEY=\n# DEEPSEEK_API_KEY=\n",
        )?;
        println!("   Created {} (add your API key)", env_path.display());
    }

    GrantDb::open_at(runtime_dir.join(grantflow_core::state::db::DB_FILE))?;
    println!("✅ Ready. Run `grantflow run` to start an interview.");
    Ok(())
}

async fn interview(
    config: &GrantflowConfig,
    user: &str,
    no_audit: bool,
) -> anyhow::Result<InterviewResult> {
    let backoff = config.pipeline.backoff.clone();
    let decider = Arc::new(InterviewerSkill::new(
        config.model_for(ModelRole::Interviewer),
        backoff.clone(),
    ));

    let db = GrantDb::open()?;
    let mut agent = InteractiveInterviewerAgent::new(decider, config.interview.clone())
        .with_store(Arc::new(SqliteAnketaStore::new(&db)));
    if !no_audit {
        agent = agent.with_auditor(Arc::new(BlockAuditorSkill::new(
            config.model_for(ModelRole::BlockAuditor),
            backoff,
        )));
    }

    println!("👋 Let's prepare your grant application. Answer each question, then press Enter.");
    let result = agent
        .conduct_interview(&UserData::new(user), &StdinAsker::new(), &StdoutNotifier)
        .await?;

    for feedback in &result.interactive_feedback {
        println!(
            "   Block {} scored {}/10: {}",
            feedback.block, feedback.score, feedback.message
        );
    }
    println!(
        "📋 {} questions ({} follow-ups), {}/{} points covered, score {:.1}, {:.0}s",
        result.questions_asked,
        result.follow_ups_asked,
        result.coverage.covered + result.coverage.skipped,
        result.coverage.total,
        result.audit_score,
        result.processing_time
    );
    if let Some(id) = &result.anketa_id {
        println!("   Stored as {}", id);
    }
    Ok(result)
}

async fn pipeline(
    config: &GrantflowConfig,
    project: &grantflow_core::interview::Anketa,
    out: &Path,
) -> anyhow::Result<PipelineResult> {
    let backoff = config.pipeline.backoff.clone();
    let (event_tx, mut event_rx) = mpsc::channel::<PipelineEvent>(64);

    let runner = GrantPipeline::new(
        Arc::new(ResearcherSkill::new(
            config.model_for(ModelRole::Researcher),
            backoff.clone(),
        )),
        Arc::new(WriterSkill::new(
            config.model_for(ModelRole::Writer),
            backoff.clone(),
        )),
        Arc::new(AuditorSkill::new(config.model_for(ModelRole::Auditor), backoff)),
        config.pipeline.clone(),
    )
    .with_event_channel(event_tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    let outcome = runner.run(project, out).await;
    drop(runner);
    let _ = printer.await;

    match outcome {
        Ok(result) => {
            println!(
                "✅ Package ready in {} (audit {}/10, {})",
                out.display(),
                result.auditor_result.overall_score,
                result.auditor_result.verdict
            );
            Ok(result)
        }
        Err(e) => {
            report_partial(&e);
            Err(e.into())
        }
    }
}

fn print_event(event: &PipelineEvent) {
    match event.kind {
        PipelineEventKind::StageStarted => println!("⏳ {} working...", event.agent),
        PipelineEventKind::StageCompleted => println!("   {} done", event.agent),
        PipelineEventKind::ArtifactExported => {
            if let Some(path) = event.data.as_ref().and_then(|d| d["path"].as_str()) {
                println!("   📄 {}", path);
            }
        }
        PipelineEventKind::Cooldown => println!("   ⏸ rate-limit pause"),
        _ => {}
    }
}

fn report_partial(err: &PipelineError) {
    eprintln!("❌ {}", err);
    let produced = err.produced_artifacts();
    if !produced.is_empty() {
        eprintln!("   Artifacts kept:");
        for path in produced {
            eprintln!("   - {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_file_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_env(&dir.path().join(".env")).is_none());
    }

    #[test]
    fn test_malformed_env_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "GRANTFLOW_TEST_KEY='never closed\n").unwrap();

        let err = load_env(&path);
        assert!(err.is_some());
        assert!(!err.unwrap().not_found());
    }

    #[test]
    fn test_valid_env_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "GRANTFLOW_TEST_LOADED=yes\n").unwrap();

        assert!(load_env(&path).is_none());
        assert_eq!(std::env::var("GRANTFLOW_TEST_LOADED").as_deref(), Ok("yes"));
    }
}
