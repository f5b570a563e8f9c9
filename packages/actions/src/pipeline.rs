//! # Cleanup Pipeline
//!
//! Normalises every document an action changed before the change is handed
//! back to the caller: AddImports → Simplify → Format → Elastic → CaseCorrect
//!
//! The order is fixed. Individual passes can be replaced, but not reordered,
//! skipped or repeated. Only documents whose text changed or that were added
//! are processed; everything else is shared untouched with the input.

use crate::cancellation::ensure_not_cancelled;
use crate::passes::{CaseCorrector, Formatter, ImportAdder, Simplifier};
use crate::{ActionResult, CleanupOptions, EngineConfig, ProgressTracker};
use async_trait::async_trait;
use quickfix_workspace::{AnnotationKind, Document, DocumentId, Solution};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// One opaque, order-dependent document transform
#[async_trait]
pub trait CleanupPass: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rewrite the ranges annotated with `kind` and drop those annotations.
    /// Annotations of other kinds must survive with adjusted ranges.
    async fn run(
        &self,
        document: Document,
        kind: AnnotationKind,
        options: &CleanupOptions,
        cancel: &CancellationToken,
    ) -> ActionResult<Document>;
}

/// The fixed post-processing sequence
#[derive(Clone)]
pub struct CodeCleanup {
    import_adder: Arc<dyn CleanupPass>,
    simplifier: Arc<dyn CleanupPass>,
    formatter: Arc<dyn CleanupPass>,
    case_corrector: Arc<dyn CleanupPass>,
    options: CleanupOptions,
}

impl CodeCleanup {
    /// Pipeline with the default passes
    pub fn new(options: CleanupOptions) -> Self {
        Self {
            import_adder: Arc::new(ImportAdder),
            simplifier: Arc::new(Simplifier),
            formatter: Arc::new(Formatter),
            case_corrector: Arc::new(CaseCorrector),
            options,
        }
    }

    /// Pipeline with the default passes and the options from `config`
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.cleanup.clone())
    }

    pub fn with_import_adder(mut self, pass: Arc<dyn CleanupPass>) -> Self {
        self.import_adder = pass;
        self
    }

    pub fn with_simplifier(mut self, pass: Arc<dyn CleanupPass>) -> Self {
        self.simplifier = pass;
        self
    }

    /// Used for both explicit and elastic formatting
    pub fn with_formatter(mut self, pass: Arc<dyn CleanupPass>) -> Self {
        self.formatter = pass;
        self
    }

    pub fn with_case_corrector(mut self, pass: Arc<dyn CleanupPass>) -> Self {
        self.case_corrector = pass;
        self
    }

    pub fn options(&self) -> &CleanupOptions {
        &self.options
    }

    fn steps(&self) -> [(&dyn CleanupPass, AnnotationKind); 5] {
        [
            (self.import_adder.as_ref(), AnnotationKind::AddImports),
            (self.simplifier.as_ref(), AnnotationKind::Simplify),
            (self.formatter.as_ref(), AnnotationKind::Format),
            (self.formatter.as_ref(), AnnotationKind::Elastic),
            (self.case_corrector.as_ref(), AnnotationKind::CaseCorrect),
        ]
    }

    /// Run all five passes over one document.
    ///
    /// Either every pass completes or the call fails; a cancelled run never
    /// yields a partially processed document.
    #[instrument(skip_all, fields(document = %document.name()))]
    pub async fn cleanup_document(
        &self,
        document: Document,
        cancel: &CancellationToken,
    ) -> ActionResult<Document> {
        let mut document = document;
        for (pass, kind) in self.steps() {
            ensure_not_cancelled(cancel)?;
            let before = document.len();
            document = pass.run(document, kind, &self.options, cancel).await?;
            debug!(pass = pass.name(), ?kind, before, after = document.len(), "Cleanup pass done");
        }
        ensure_not_cancelled(cancel)?;
        Ok(document)
    }

    /// Clean up every document `changed` touched relative to `original`.
    #[instrument(skip_all, fields(original = %original.id(), changed = %changed.id()))]
    pub async fn post_process_changes(
        &self,
        original: &Solution,
        changed: Solution,
        progress: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> ActionResult<Solution> {
        let to_process: Vec<DocumentId> = changed
            .get_changes(original)
            .documents_to_process(&changed)
            .collect();

        debug!(documents = to_process.len(), "Post-processing changed documents");
        progress.add_items(to_process.len());

        let mut solution = changed;
        for id in to_process {
            let document = solution.get_required_document(id)?.clone();
            progress.set_description(document.name());

            let cleaned = self.cleanup_document(document.clone(), cancel).await?;
            if !cleaned.same_content(&document) {
                solution = solution.with_document(cleaned)?;
            }
            progress.item_completed();
        }

        Ok(solution)
    }
}

impl Default for CodeCleanup {
    fn default() -> Self {
        Self::new(CleanupOptions::default())
    }
}

impl fmt::Debug for CodeCleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passes: Vec<&str> = self.steps().iter().map(|(pass, _)| pass.name()).collect();
        f.debug_struct("CodeCleanup")
            .field("passes", &passes)
            .field("options", &self.options)
            .finish()
    }
}
