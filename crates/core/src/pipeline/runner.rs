//! # Grant Pipeline
//!
//! Runs Research → Write → Audit over a completed anketa, exporting each
//! stage's artifact before the next stage starts.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::interview::Anketa;
use crate::skills::auditor_skill::AuditOutput;
use crate::skills::researcher_skill::ResearchOutput;
use crate::skills::writer_skill::DraftOutput;

use super::agents::{Auditor, Researcher, Writer};
use super::backoff::BackoffPolicy;
use super::events::{PipelineEvent, PipelineEventKind};
use super::export::{self, AUDIT_ARTIFACT, DRAFT_ARTIFACT, RESEARCH_ARTIFACT, SUMMARY_ARTIFACT};
use super::stage::{PipelineStage, StageMachine};

/// Configuration for a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Retry and cooldown policy shared by the stage agents and the runner
    pub backoff: BackoffPolicy,
    /// Write `run_summary.json` after a successful run
    pub write_summary: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            write_summary: true,
        }
    }
}

/// Wall-clock time spent in one stage agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageTiming {
    pub stage: PipelineStage,
    pub seconds: f64,
}

/// Result of a successful pipeline run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub researcher_result: ResearchOutput,
    pub writer_result: DraftOutput,
    pub auditor_result: AuditOutput,
    /// Stage artifacts in execution order
    pub exported_paths: Vec<PathBuf>,
    pub summary_path: Option<PathBuf>,
    pub stage_timings: Vec<StageTiming>,
    pub total_seconds: f64,
    pub events: Vec<PipelineEvent>,
}

/// Contents of `run_summary.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub project_name: Option<String>,
    pub completed_at: DateTime<Utc>,
    pub total_seconds: f64,
    pub stages: Vec<StageTiming>,
    pub artifacts: Vec<String>,
    pub audit_score: u32,
    pub audit_verdict: String,
}

#[derive(Default)]
struct RunState {
    machine: StageMachine,
    produced: Vec<PathBuf>,
    events: Vec<PipelineEvent>,
    timings: Vec<StageTiming>,
}

/// Sequential Research → Write → Audit runner
pub struct GrantPipeline {
    researcher: Arc<dyn Researcher>,
    writer: Arc<dyn Writer>,
    auditor: Arc<dyn Auditor>,
    config: PipelineConfig,
    event_tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl GrantPipeline {
    pub fn new(
        researcher: Arc<dyn Researcher>,
        writer: Arc<dyn Writer>,
        auditor: Arc<dyn Auditor>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            researcher,
            writer,
            auditor,
            config,
            event_tx: None,
        }
    }

    /// Set event channel for streaming progress
    pub fn with_event_channel(mut self, tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all three stages for `project_data`, exporting into `export_dir`
    #[tracing::instrument(
        skip(self, project_data),
        fields(
            project = %project_data.project_name().unwrap_or("unnamed"),
            export_dir = %export_dir.display()
        )
    )]
    pub async fn run(
        &self,
        project_data: &Anketa,
        export_dir: &Path,
    ) -> Result<PipelineResult, PipelineError> {
        let started = Instant::now();
        let mut run = RunState::default();

        self.emit(
            &mut run,
            PipelineEvent::new(PipelineEventKind::RunStarted, "pipeline").with_data(
                serde_json::json!({
                    "fields": project_data.len(),
                    "export_dir": export_dir.display().to_string(),
                }),
            ),
        )
        .await;

        // Research
        run.machine.advance();
        let research = self
            .stage(&mut run, self.researcher.research(project_data))
            .await?;
        self.export_json(&mut run, export_dir, RESEARCH_ARTIFACT, &research)
            .await?;

        // Write
        run.machine.advance();
        let written = self
            .stage(&mut run, self.writer.write(project_data, &research))
            .await;
        let exported = match &written {
            Ok(draft) => Some(
                self.export_text(&mut run, export_dir, DRAFT_ARTIFACT, &draft.to_markdown())
                    .await,
            ),
            Err(_) => None,
        };

        // The shared rate limit was spent whether or not the writer succeeded
        self.cooldown(&mut run).await;
        let draft = written?;
        if let Some(exported) = exported {
            exported?;
        }

        // Audit
        run.machine.advance();
        let audit = self
            .stage(&mut run, self.auditor.audit(project_data, &draft))
            .await?;
        self.export_json(&mut run, export_dir, AUDIT_ARTIFACT, &audit)
            .await?;

        run.machine.advance();
        let total_seconds = started.elapsed().as_secs_f64();

        let summary_path = if self.config.write_summary {
            let summary = RunSummary {
                project_name: project_data.project_name().map(str::to_string),
                completed_at: Utc::now(),
                total_seconds,
                stages: run.timings.clone(),
                artifacts: run
                    .produced
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .collect(),
                audit_score: audit.overall_score,
                audit_verdict: audit.verdict.clone(),
            };
            match export::write_json(export_dir, SUMMARY_ARTIFACT, &summary).await {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "Failed to write run summary");
                    None
                }
            }
        } else {
            None
        };

        info!(
            total_seconds,
            audit_score = audit.overall_score,
            artifacts = run.produced.len(),
            "Pipeline complete"
        );
        self.emit(
            &mut run,
            PipelineEvent::new(PipelineEventKind::RunCompleted, "pipeline").with_data(
                serde_json::json!({
                    "total_seconds": total_seconds,
                    "audit_score": audit.overall_score,
                }),
            ),
        )
        .await;

        Ok(PipelineResult {
            researcher_result: research,
            writer_result: draft,
            auditor_result: audit,
            exported_paths: run.produced,
            summary_path,
            stage_timings: run.timings,
            total_seconds,
            events: run.events,
        })
    }

    /// Emit an event
    async fn emit(&self, run: &mut RunState, event: PipelineEvent) {
        run.events.push(event.clone());
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }

    /// Drive the current stage's agent call, timing it and mapping failure
    async fn stage<T, F>(&self, run: &mut RunState, call: F) -> Result<T, PipelineError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let stage = run.machine.stage;
        info!(stage = stage.agent(), "Stage started");
        self.emit(
            run,
            PipelineEvent::for_stage(PipelineEventKind::StageStarted, stage),
        )
        .await;

        let started = Instant::now();
        match call.await {
            Ok(output) => {
                let seconds = started.elapsed().as_secs_f64();
                run.timings.push(StageTiming { stage, seconds });
                info!(stage = stage.agent(), seconds, "Stage completed");
                self.emit(
                    run,
                    PipelineEvent::for_stage(PipelineEventKind::StageCompleted, stage)
                        .with_data(serde_json::json!({ "seconds": seconds })),
                )
                .await;
                Ok(output)
            }
            Err(source) => {
                let stage = run.machine.fail();
                warn!(stage = stage.agent(), error = %source, "Stage failed");
                self.emit(
                    run,
                    PipelineEvent::for_stage(PipelineEventKind::StageFailed, stage)
                        .with_data(serde_json::json!({ "error": source.to_string() })),
                )
                .await;
                self.emit(
                    run,
                    PipelineEvent::new(PipelineEventKind::RunFailed, "pipeline"),
                )
                .await;
                Err(PipelineError::Stage {
                    stage,
                    produced: run.produced.clone(),
                    source,
                })
            }
        }
    }

    async fn export_json<T: Serialize>(
        &self,
        run: &mut RunState,
        dir: &Path,
        name: &str,
        value: &T,
    ) -> Result<PathBuf, PipelineError> {
        let written = export::write_json(dir, name, value).await;
        self.record_export(run, dir, name, written).await
    }

    async fn export_text(
        &self,
        run: &mut RunState,
        dir: &Path,
        name: &str,
        content: &str,
    ) -> Result<PathBuf, PipelineError> {
        let written = export::write_text(dir, name, content).await;
        self.record_export(run, dir, name, written).await
    }

    async fn record_export(
        &self,
        run: &mut RunState,
        dir: &Path,
        name: &str,
        written: anyhow::Result<PathBuf>,
    ) -> Result<PathBuf, PipelineError> {
        let stage = run.machine.stage;
        match written {
            Ok(path) => {
                run.produced.push(path.clone());
                info!(path = %path.display(), "Artifact exported");
                self.emit(
                    run,
                    PipelineEvent::for_stage(PipelineEventKind::ArtifactExported, stage)
                        .with_data(serde_json::json!({ "path": path.display().to_string() })),
                )
                .await;
                Ok(path)
            }
            Err(source) => {
                run.machine.fail();
                warn!(artifact = name, error = %source, "Artifact export failed");
                self.emit(
                    run,
                    PipelineEvent::new(PipelineEventKind::RunFailed, "pipeline"),
                )
                .await;
                Err(PipelineError::Export {
                    path: dir.join(name),
                    produced: run.produced.clone(),
                    source,
                })
            }
        }
    }

    async fn cooldown(&self, run: &mut RunState) {
        let cooldown = self.config.backoff.cooldown();
        info!(seconds = cooldown.as_secs_f64(), "Rate-limit cooldown");
        self.emit(
            run,
            PipelineEvent::new(PipelineEventKind::Cooldown, "pipeline")
                .with_data(serde_json::json!({ "seconds": cooldown.as_secs_f64() })),
        )
        .await;
        self.config.backoff.wait_cooldown().await;
    }
}
