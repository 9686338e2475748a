use std::fmt;
use tracing::instrument;

use crate::admission::AdmissionSlot;
use crate::assembler::assemble;
use crate::completion::CompletionClient;
use crate::data_models::ResultPayload;
use crate::error::Failure;
use crate::extractor::extract_answer;
use crate::search::SearchClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Admitted,
    Searching,
    Completing,
    Extracting,
    Assembled,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Admitted => "admitted",
            Stage::Searching => "searching",
            Stage::Completing => "completing",
            Stage::Extracting => "extracting",
            Stage::Assembled => "assembled",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runs search, completion, extraction and assembly for one question.
///
/// Stages run strictly in order and the first failure ends the run; no
/// partial result is ever built.
pub struct Orchestrator {
    search: SearchClient,
    completion: CompletionClient,
}

impl Orchestrator {
    pub fn new(search: SearchClient, completion: CompletionClient) -> Self {
        Self { search, completion }
    }

    /// Requires an admission slot so that every run is counted against the
    /// concurrency bound.
    #[instrument(skip(self, _slot, query), fields(stage))]
    pub async fn run(
        &self,
        _slot: &AdmissionSlot,
        id: i64,
        query: &str,
    ) -> Result<ResultPayload, Failure> {
        enter(Stage::Admitted);
        tracing::info!(%query, "processing request");

        enter(Stage::Searching);
        let context = self.search.search(query).await.inspect_err(fail)?;

        enter(Stage::Completing);
        let text = self
            .completion
            .complete(query, &context)
            .await
            .inspect_err(fail)?;

        enter(Stage::Extracting);
        let answer = extract_answer(&text);
        if answer.is_none() {
            tracing::debug!("no leading answer index in completion text");
        }

        let payload = assemble(id, answer, &text, &context.links);
        enter(Stage::Assembled);
        tracing::info!(answer = ?payload.answer, sources = payload.sources.len(), "request answered");
        Ok(payload)
    }
}

fn enter(stage: Stage) {
    tracing::Span::current().record("stage", tracing::field::display(stage));
    tracing::debug!(%stage, "pipeline stage");
}

fn fail(failure: &Failure) {
    enter(Stage::Failed);
    tracing::warn!(error = %failure, "pipeline failed");
}
