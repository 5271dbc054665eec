//! Chunking & generation engine.
//!
//! Produces the two artifacts for an extracted text: a summary (truncated to
//! `summary_char_limit` characters when longer) and a markdown rendering
//! (split into `chunk_size` chunks, at most `max_chunks` of them rendered,
//! one after another). The two branches run concurrently.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::Instrument;

use crate::config::GenerationConfig;
use crate::generation::{GenerationError, Generator};

pub mod chunking;
pub mod prompt;

/// The two generated artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Summary,
    Markdown,
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Artifact::Summary => f.write_str("summary"),
            Artifact::Markdown => f.write_str("markdown"),
        }
    }
}

/// Result of one branch, with its position in completion order.
#[derive(Debug)]
pub struct BranchOutcome {
    pub result: Result<String, GenerationError>,
    /// 0 for the branch that finished first.
    pub completed: usize,
}

#[derive(Debug)]
pub struct ArtifactOutcome {
    pub summary: BranchOutcome,
    pub markdown: BranchOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub summary: String,
    pub markdown: String,
}

impl ArtifactOutcome {
    /// Both artifacts, or the failure that happened first. A successful
    /// branch is discarded when the other one fails.
    pub fn into_artifacts(self) -> Result<Artifacts, (Artifact, GenerationError)> {
        let ArtifactOutcome { summary, markdown } = self;
        match (summary.result, markdown.result) {
            (Ok(summary), Ok(markdown)) => Ok(Artifacts { summary, markdown }),
            (Err(e), Ok(_)) => Err((Artifact::Summary, e)),
            (Ok(_), Err(e)) => Err((Artifact::Markdown, e)),
            (Err(summary_err), Err(markdown_err)) => {
                if markdown.completed < summary.completed {
                    Err((Artifact::Markdown, markdown_err))
                } else {
                    Err((Artifact::Summary, summary_err))
                }
            }
        }
    }
}

pub struct ArtifactEngine {
    generator: Arc<dyn Generator>,
    limits: GenerationConfig,
}

impl ArtifactEngine {
    pub fn new(generator: Arc<dyn Generator>, limits: GenerationConfig) -> Self {
        Self { generator, limits }
    }

    /// Runs both branches concurrently and waits for both.
    pub async fn generate_artifacts(&self, text: &str) -> ArtifactOutcome {
        let order = AtomicUsize::new(0);

        let summary = async {
            let result = self
                .summarize(text)
                .instrument(tracing::info_span!("summary"))
                .await;
            BranchOutcome {
                result,
                completed: order.fetch_add(1, Ordering::SeqCst),
            }
        };
        let markdown = async {
            let result = self
                .render_markdown(text)
                .instrument(tracing::info_span!("markdown"))
                .await;
            BranchOutcome {
                result,
                completed: order.fetch_add(1, Ordering::SeqCst),
            }
        };

        let (summary, markdown) = tokio::join!(summary, markdown);
        ArtifactOutcome { summary, markdown }
    }

    /// Summary branch.
    pub async fn summarize(&self, text: &str) -> Result<String, GenerationError> {
        let limit = self.limits.summary_char_limit;
        let total = chunking::char_len(text);

        if total <= limit {
            return self.generator.generate(&prompt::summary_prompt(text)).await;
        }

        tracing::warn!(
            total_chars = total,
            limit,
            "document exceeds summary limit, truncating"
        );
        let truncated = chunking::truncate_chars(text, limit);
        let summary = self
            .generator
            .generate(&prompt::truncated_summary_prompt(truncated, total, limit))
            .await?;

        Ok(format!(
            "{}{}",
            prompt::summary_truncation_notice(limit, total),
            summary
        ))
    }

    /// Markdown branch. Chunks are generated sequentially and in order.
    pub async fn render_markdown(&self, text: &str) -> Result<String, GenerationError> {
        let chunk_size = self.limits.chunk_size;
        let total = chunking::char_len(text);

        if total <= chunk_size {
            return self.generator.generate(&prompt::markdown_prompt(text)).await;
        }

        let chunks = chunking::split_into_chunks(text, chunk_size);
        let processed = chunks.len().min(self.limits.max_chunks);
        if chunks.len() > processed {
            tracing::warn!(
                chunks = chunks.len(),
                max_chunks = self.limits.max_chunks,
                "document has too many chunks, rendering only the first ones"
            );
        } else {
            tracing::info!(total_chars = total, chunks = processed, "rendering in chunks");
        }

        let mut rendered = Vec::with_capacity(processed);
        for (i, chunk) in chunks.iter().take(processed).enumerate() {
            let part = i + 1;
            let output = self
                .generator
                .generate(&prompt::chunk_prompt(chunk, part, processed))
                .instrument(tracing::info_span!("chunk", part, of = processed))
                .await?;
            rendered.push(output);
        }

        let combined = rendered.join(prompt::SECTION_DELIMITER);
        if chunks.len() > processed {
            let notice = prompt::chunk_cap_notice(
                processed * chunk_size,
                total,
                processed,
                chunks.len(),
            );
            return Ok(format!("{}{}", notice, combined));
        }
        Ok(combined)
    }
}
