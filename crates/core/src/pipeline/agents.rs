//! Stage agent contracts.
//!
//! Each stage receives the anketa plus the complete output of the stage before
//! it. LLM-backed implementations live in `crate::skills`.

use async_trait::async_trait;

use crate::interview::Anketa;
use crate::skills::auditor_skill::AuditOutput;
use crate::skills::researcher_skill::ResearchOutput;
use crate::skills::writer_skill::DraftOutput;

#[async_trait]
pub trait Researcher: Send + Sync {
    async fn research(&self, project: &Anketa) -> anyhow::Result<ResearchOutput>;
}

#[async_trait]
pub trait Writer: Send + Sync {
    async fn write(&self, project: &Anketa, research: &ResearchOutput)
        -> anyhow::Result<DraftOutput>;
}

#[async_trait]
pub trait Auditor: Send + Sync {
    async fn audit(&self, project: &Anketa, draft: &DraftOutput) -> anyhow::Result<AuditOutput>;
}
