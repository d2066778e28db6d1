use std::sync::Arc;

use log::{debug, info, warn};
use tracing::info_span;

use crate::ai::{extract, prompts, CompletionRequest, CompletionService};
use crate::codegen::CodeSynthesizer;
use crate::db::{analysis_repo, checklist_repo, Database, DatabaseError};
use crate::hash;
use crate::raster::RasterizerRegistry;

use super::config::PipelineConfig;
use super::context::AnalysisContext;
use super::error::{PipelineError, PipelineWarning};

/// How a single analysis run ended.
#[derive(Debug)]
pub enum Disposition {
    /// All stages ran; the record and its checkpoints are stored.
    Completed { record_id: i64, checkpoints: usize },
    /// Identical content for this filename was already stored; the run was
    /// abandoned without an error.
    AlreadyAnalyzed,
    /// An unrecoverable stage failure; nothing further was attempted.
    Failed { error: String },
}

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub filename: String,
    pub disposition: Disposition,
}

impl AnalysisOutcome {
    /// True when the descriptor should move to Finish rather than back
    /// to Ready.
    pub fn is_success(&self) -> bool {
        !matches!(self.disposition, Disposition::Failed { .. })
    }
}

pub struct Analyzer {
    config: Arc<PipelineConfig>,
    db: Database,
    rasterizer: RasterizerRegistry,
    completion: Arc<dyn CompletionService>,
    synthesizer: Arc<dyn CodeSynthesizer>,
}

impl Analyzer {
    pub fn new(
        config: Arc<PipelineConfig>,
        db: Database,
        completion: Arc<dyn CompletionService>,
        synthesizer: Arc<dyn CodeSynthesizer>,
    ) -> Self {
        Self {
            config,
            db,
            rasterizer: RasterizerRegistry::new(),
            completion,
            synthesizer,
        }
    }

    /// Runs the full analysis for a single datasheet.
    /// Returns an (AnalysisOutcome, AnalysisContext) pair.
    ///
    /// Stages are strictly ordered; a restarted analysis repeats all of
    /// them. Each stage failure before checkpoint synthesis aborts the run.
    pub fn run(&self, mut ctx: AnalysisContext) -> (AnalysisOutcome, AnalysisContext) {
        let _pipeline_span = info_span!("analysis", filename = %ctx.filename).entered();

        let source_path = self.config.watch_directory.join(&ctx.filename);

        // Stage 1: render the page set shared by stages 2 and 3
        {
            let _step = info_span!("rasterize").entered();
            if let Err(e) = self.step_rasterize(&mut ctx, &source_path) {
                return self.fail(ctx, e);
            }
        }

        // Stage 2: vendor code
        {
            let _step = info_span!("vendor_code").entered();
            if let Err(e) = self.step_vendor_code(&mut ctx) {
                return self.fail(ctx, e);
            }
        }

        // Stage 3: report
        {
            let _step = info_span!("report").entered();
            if let Err(e) = self.step_report(&mut ctx) {
                return self.fail(ctx, e);
            }
        }

        // Stage 4: tag extraction (parse fallback is non-fatal)
        {
            let _step = info_span!("extract_tags").entered();
            if let Err(e) = self.step_extract_tags(&mut ctx) {
                return self.fail(ctx, e);
            }
        }

        // Stage 5: persist before checklist work; duplicate content ends
        // the run quietly, the file was already analyzed.
        {
            let _step = info_span!("persist").entered();
            match self.step_persist(&mut ctx, &source_path) {
                Ok(()) => {}
                Err(PipelineError::Store(DatabaseError::Duplicate { .. })) => {
                    info!(
                        "Identical content for '{}' already analyzed, skipping",
                        ctx.filename
                    );
                    let outcome = AnalysisOutcome {
                        filename: ctx.filename.clone(),
                        disposition: Disposition::AlreadyAnalyzed,
                    };
                    return (outcome, ctx);
                }
                Err(e) => return self.fail(ctx, e),
            }
        }

        // Stage 6: checklist generation (parse fallback is non-fatal)
        {
            let _step = info_span!("generate_checklist").entered();
            if let Err(e) = self.step_generate_checklist(&mut ctx) {
                return self.fail(ctx, e);
            }
        }

        // Stage 7: per-item code synthesis; failures are isolated per item
        {
            let _step = info_span!("synthesize_codes").entered();
            self.step_synthesize_codes(&mut ctx);
        }

        let record_id = ctx.record_id.expect("record id set in persist stage");
        info!(
            "Analysis of '{}' complete: record {}, {} checkpoint(s)",
            ctx.filename,
            record_id,
            ctx.checklist.len()
        );

        let outcome = AnalysisOutcome {
            filename: ctx.filename.clone(),
            disposition: Disposition::Completed {
                record_id,
                checkpoints: ctx.checklist.len(),
            },
        };
        (outcome, ctx)
    }

    fn fail(
        &self,
        ctx: AnalysisContext,
        error: PipelineError,
    ) -> (AnalysisOutcome, AnalysisContext) {
        warn!("Analysis of '{}' failed: {}", ctx.filename, error);
        let outcome = AnalysisOutcome {
            filename: ctx.filename.clone(),
            disposition: Disposition::Failed {
                error: error.to_string(),
            },
        };
        (outcome, ctx)
    }

    fn step_rasterize(
        &self,
        ctx: &mut AnalysisContext,
        source_path: &std::path::Path,
    ) -> Result<(), PipelineError> {
        let pages =
            self.rasterizer
                .rasterize(source_path, self.config.max_pages, self.config.dpi)?;
        debug!("Rendered {} page(s) for '{}'", pages.len(), ctx.filename);
        ctx.pages = Some(pages);
        Ok(())
    }

    fn step_vendor_code(&self, ctx: &mut AnalysisContext) -> Result<(), PipelineError> {
        let pages = ctx.pages.as_ref().expect("stage 1 completed");
        let reply = self
            .completion
            .complete(&CompletionRequest::with_images(prompts::VENDOR_CODE, pages))?;
        let vendor_code = reply.trim().to_string();
        debug!("Vendor code for '{}': '{}'", ctx.filename, vendor_code);
        ctx.vendor_code = Some(vendor_code);
        Ok(())
    }

    fn step_report(&self, ctx: &mut AnalysisContext) -> Result<(), PipelineError> {
        let pages = ctx.pages.as_ref().expect("stage 1 completed");
        let reply = self
            .completion
            .complete(&CompletionRequest::with_images(prompts::REPORT, pages))?;
        ctx.report = Some(reply);
        Ok(())
    }

    fn step_extract_tags(&self, ctx: &mut AnalysisContext) -> Result<(), PipelineError> {
        let report = ctx.report.as_ref().expect("stage 3 completed");
        let reply = self
            .completion
            .complete(&CompletionRequest::text(prompts::tag_extraction(report)))?;

        let extraction = extract::parse_loose_array(&extract::fenced_payload(&reply));
        if extraction.is_fallback() {
            warn!(
                "Tag output for '{}' did not parse, storing raw text",
                ctx.filename
            );
            ctx.warnings.push(PipelineWarning::TagParseFallback);
        }
        ctx.metadata = extract::tags_to_metadata(&extraction);
        Ok(())
    }

    fn step_persist(
        &self,
        ctx: &mut AnalysisContext,
        source_path: &std::path::Path,
    ) -> Result<(), PipelineError> {
        let report = ctx.report.as_ref().expect("stage 3 completed");

        let content_hash = hash::hash_file(source_path).map_err(|e| {
            PipelineError::Store(DatabaseError::Io {
                path: source_path.to_path_buf(),
                source: e,
            })
        })?;

        let metadata = if ctx.metadata.is_empty() {
            None
        } else {
            Some(&ctx.metadata)
        };

        let id = analysis_repo::insert(
            &self.db,
            &ctx.filename,
            report,
            ctx.vendor_code.as_deref(),
            Some(&content_hash),
            metadata,
        )?;
        debug!("Stored analysis record {} for '{}'", id, ctx.filename);
        ctx.record_id = Some(id);
        Ok(())
    }

    fn step_generate_checklist(&self, ctx: &mut AnalysisContext) -> Result<(), PipelineError> {
        let report = ctx.report.as_ref().expect("stage 3 completed");
        let reply = self.completion.complete(&CompletionRequest::text(
            prompts::checklist_generation(report),
        ))?;

        let extraction = extract::parse_loose_array(&extract::fenced_payload(&reply));
        if extraction.is_fallback() {
            warn!(
                "Checklist output for '{}' did not parse, no items generated",
                ctx.filename
            );
            ctx.warnings.push(PipelineWarning::ChecklistParseFallback);
        }
        ctx.checklist = extract::checklist_strings(&extraction);
        Ok(())
    }

    fn step_synthesize_codes(&self, ctx: &mut AnalysisContext) {
        let record_id = ctx.record_id.expect("persist stage completed");
        let vendor_code = ctx.vendor_code.clone().unwrap_or_default();
        let total = ctx.checklist.len();

        for (idx, checkpoint) in ctx.checklist.iter().enumerate() {
            debug!(
                "Synthesizing code for checkpoint {}/{} of '{}'",
                idx + 1,
                total,
                ctx.filename
            );

            let prompt = prompts::code_synthesis(&vendor_code, checkpoint);
            let code = match self.synthesizer.synthesize(&prompt) {
                Ok(code) => code,
                Err(e) => {
                    warn!(
                        "Code synthesis failed for checkpoint {}/{} of '{}': {}",
                        idx + 1,
                        total,
                        ctx.filename,
                        e
                    );
                    ctx.warnings.push(PipelineWarning::SynthesisFailed {
                        checkpoint: checkpoint.clone(),
                        error: e.to_string(),
                    });
                    String::new()
                }
            };

            // The item is stored even when synthesis failed; a store failure
            // is likewise isolated to this item.
            if let Err(e) = checklist_repo::insert(&self.db, record_id, checkpoint, &code) {
                warn!(
                    "Failed to store checkpoint {}/{} of '{}': {}",
                    idx + 1,
                    total,
                    ctx.filename,
                    e
                );
                ctx.warnings.push(PipelineWarning::CheckpointStoreFailed {
                    checkpoint: checkpoint.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
}
