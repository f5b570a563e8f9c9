//! # Code Actions
//!
//! A `CodeAction` is a named, deferred proposal to change the solution. Its
//! edit is not computed when the action is created; the producer hands the
//! engine a closure that runs only when operations are requested.
//!
//! ## Variants
//!
//! | constructor              | produces                                   |
//! |--------------------------|--------------------------------------------|
//! | `CodeAction::document`   | one changed document                       |
//! | `CodeAction::solution`   | a changed solution, or `None` for no change |
//! | `CodeAction::nested`     | nothing itself; groups child actions       |
//! | `CodeAction::no_change`  | nothing; keeps equivalence bookkeeping     |
//! | `CodeAction::custom`     | arbitrary operations from a producer type  |
//!
//! Every constructor validates its input immediately and fails with
//! `ActionError::InvalidArgument` rather than deferring the failure.
//!
//! ## Equivalence
//!
//! Two actions from the same provider with equal non-null equivalence keys are
//! interchangeable for bulk application. A group that was not given a key
//! explicitly derives one from its children: each child's key (or, for an
//! un-keyed child, its identity hash) followed by `;`.

use crate::{ActionError, ActionResult, CodeActionOperation, ComputeContext, ProgressTracker};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use quickfix_workspace::{Document, Solution};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Tag for actions that cannot work in hosts limited to document edits.
pub const REQUIRES_NON_DOCUMENT_CHANGE: &str = "RequiresNonDocumentChange";

const NESTED_KEY_SEPARATOR: char = ';';

const DOCUMENT_CHANGE_ACTION: &str = "quickfix_actions::DocumentChangeAction";
const SOLUTION_CHANGE_ACTION: &str = "quickfix_actions::SolutionChangeAction";
const NESTED_ACTION: &str = "quickfix_actions::CodeActionWithNestedActions";
const NO_CHANGE_ACTION: &str = "quickfix_actions::NoChangeAction";

/// Ordering hint for presentation. Never affects what an action does.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum CodeActionPriority {
    Low,
    #[default]
    Default,
    High,
}

pub(crate) type CreateChangedDocument =
    Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, ActionResult<Document>> + Send + Sync>;

pub(crate) type CreateChangedSolution = Arc<
    dyn Fn(CancellationToken) -> BoxFuture<'static, ActionResult<Option<Solution>>> + Send + Sync,
>;

/// Producer-defined action with its own operations.
///
/// Use this when an action needs effects other than a single solution change,
/// or a preview that differs from what gets applied.
#[async_trait]
pub trait CustomCodeAction: Send + Sync {
    fn title(&self) -> String;

    fn equivalence_key(&self) -> Option<String> {
        None
    }

    fn priority(&self) -> CodeActionPriority {
        CodeActionPriority::Default
    }

    fn tags(&self) -> Vec<String> {
        Vec::new()
    }

    async fn compute_operations(
        &self,
        context: &ComputeContext,
        progress: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> ActionResult<Vec<CodeActionOperation>>;

    /// Operations shown in a preview. An empty list means "show nothing".
    async fn compute_preview_operations(
        &self,
        context: &ComputeContext,
        cancel: &CancellationToken,
    ) -> ActionResult<Vec<CodeActionOperation>> {
        let progress = ProgressTracker::new();
        self.compute_operations(context, &progress, cancel).await
    }
}

#[derive(Clone)]
pub(crate) enum ActionKind {
    Document(CreateChangedDocument),
    Solution(CreateChangedSolution),
    Nested {
        actions: Vec<CodeAction>,
        inlinable: bool,
    },
    NoChange,
    Custom(Arc<dyn CustomCodeAction>),
}

#[derive(Clone)]
struct ActionInner {
    identity: u64,
    title: String,
    equivalence_key: Option<String>,
    priority: CodeActionPriority,
    tags: Vec<String>,
    custom_tags: Vec<String>,
    provider_type: Option<&'static str>,
    runtime_type: &'static str,
    created_from_factory: bool,
    kind: ActionKind,
}

/// A deferred, possibly nested, proposed edit
#[derive(Clone)]
pub struct CodeAction {
    inner: Arc<ActionInner>,
}

impl CodeAction {
    /// Action that changes a single document.
    pub fn document<F, Fut>(title: impl Into<String>, create_changed_document: F) -> ActionResult<Self>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Document>> + Send + 'static,
    {
        let create: CreateChangedDocument =
            Arc::new(move |cancel| create_changed_document(cancel).boxed());
        Self::build(
            title.into(),
            None,
            ActionKind::Document(create),
            DOCUMENT_CHANGE_ACTION,
            true,
        )
    }

    /// Action that changes any number of documents. The closure returns
    /// `None` when there is nothing to change.
    pub fn solution<F, Fut>(title: impl Into<String>, create_changed_solution: F) -> ActionResult<Self>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<Solution>>> + Send + 'static,
    {
        let create: CreateChangedSolution =
            Arc::new(move |cancel| create_changed_solution(cancel).boxed());
        Self::build(
            title.into(),
            None,
            ActionKind::Solution(create),
            SOLUTION_CHANGE_ACTION,
            true,
        )
    }

    /// Group of actions. Only the children are ever applied.
    pub fn nested(
        title: impl Into<String>,
        nested_actions: Vec<CodeAction>,
        is_inlinable: bool,
    ) -> ActionResult<Self> {
        if nested_actions.is_empty() {
            return Err(ActionError::InvalidArgument {
                name: "nested_actions",
                reason: "a group needs at least one action",
            });
        }

        let key = compute_nested_equivalence_key(&nested_actions);
        Self::build(
            title.into(),
            Some(key),
            ActionKind::Nested {
                actions: nested_actions,
                inlinable: is_inlinable,
            },
            NESTED_ACTION,
            true,
        )
    }

    /// Action that would be a fix but changes nothing.
    pub fn no_change(title: impl Into<String>) -> ActionResult<Self> {
        Self::build(title.into(), None, ActionKind::NoChange, NO_CHANGE_ACTION, true)
    }

    pub fn custom<A: CustomCodeAction + 'static>(action: A) -> ActionResult<Self> {
        let title = action.title();
        let equivalence_key = action.equivalence_key();
        let priority = action.priority();
        let tags = action.tags();

        let mut built = Self::build(
            title,
            equivalence_key,
            ActionKind::Custom(Arc::new(action)),
            std::any::type_name::<A>(),
            false,
        )?;
        let inner = built.inner_mut();
        inner.priority = priority;
        inner.tags = tags;
        Ok(built)
    }

    fn build(
        title: String,
        equivalence_key: Option<String>,
        kind: ActionKind,
        runtime_type: &'static str,
        created_from_factory: bool,
    ) -> ActionResult<Self> {
        if title.trim().is_empty() {
            return Err(ActionError::InvalidArgument {
                name: "title",
                reason: "title must not be empty",
            });
        }

        Ok(Self {
            inner: Arc::new(ActionInner {
                identity: next_identity(),
                title,
                equivalence_key,
                priority: CodeActionPriority::Default,
                tags: Vec::new(),
                custom_tags: Vec::new(),
                provider_type: None,
                runtime_type,
                created_from_factory,
                kind,
            }),
        })
    }

    // Builders are meant for construction time. A shared action is copied
    // and the copy gets a new identity.
    fn inner_mut(&mut self) -> &mut ActionInner {
        if Arc::get_mut(&mut self.inner).is_none() {
            let mut copy = ActionInner::clone(&self.inner);
            copy.identity = next_identity();
            self.inner = Arc::new(copy);
        }
        Arc::make_mut(&mut self.inner)
    }

    pub fn with_equivalence_key(mut self, key: impl Into<String>) -> Self {
        self.inner_mut().equivalence_key = Some(key.into());
        self
    }

    pub fn with_priority(mut self, priority: CodeActionPriority) -> Self {
        self.inner_mut().priority = priority;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner_mut().tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Record the provider that registered this action.
    ///
    /// The provider's name (or its type name when `name` is `None`) is added
    /// to the custom tags, and its type identity is used for telemetry.
    pub fn with_provider<P: ?Sized + 'static>(mut self, name: Option<&str>) -> Self {
        let provider_type = std::any::type_name::<P>();
        let tag = name
            .map(str::to_string)
            .unwrap_or_else(|| short_type_name(provider_type).to_string());

        let inner = self.inner_mut();
        inner.custom_tags.push(tag);
        inner.provider_type = Some(provider_type);
        self
    }

    /// Attribute this action to the provider that registered `other`.
    pub(crate) fn with_provider_of(mut self, other: &CodeAction) -> Self {
        let inner = self.inner_mut();
        inner.provider_type = other.inner.provider_type;
        inner.custom_tags = other.inner.custom_tags.clone();
        self
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn message(&self) -> &str {
        &self.inner.title
    }

    pub fn equivalence_key(&self) -> Option<&str> {
        self.inner.equivalence_key.as_deref()
    }

    pub fn priority(&self) -> CodeActionPriority {
        self.inner.priority
    }

    pub fn tags(&self) -> &[String] {
        &self.inner.tags
    }

    pub fn custom_tags(&self) -> &[String] {
        &self.inner.custom_tags
    }

    pub fn provider_type(&self) -> Option<&'static str> {
        self.inner.provider_type
    }

    pub fn is_inlinable(&self) -> bool {
        matches!(self.inner.kind, ActionKind::Nested { inlinable: true, .. })
    }

    pub fn nested_actions(&self) -> &[CodeAction] {
        match &self.inner.kind {
            ActionKind::Nested { actions, .. } => actions,
            _ => &[],
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.inner.kind, ActionKind::Nested { .. })
    }

    pub fn created_from_factory(&self) -> bool {
        self.inner.created_from_factory
    }

    /// Full type name of the variant, or of the producer type for custom actions.
    pub fn runtime_type(&self) -> &'static str {
        self.inner.runtime_type
    }

    pub fn kind_name(&self) -> &'static str {
        short_type_name(self.inner.runtime_type)
    }

    /// Per-instance identity from a process-wide counter. Clones share it;
    /// separately built actions and builder copies never do, even after drop.
    pub fn identity_hash(&self) -> u64 {
        self.inner.identity
    }

    /// Same provider and equal non-null equivalence keys.
    pub fn is_equivalent_to(&self, other: &CodeAction) -> bool {
        match (self.equivalence_key(), other.equivalence_key()) {
            (Some(a), Some(b)) => a == b && self.provider_type() == other.provider_type(),
            _ => false,
        }
    }

    pub(crate) fn kind(&self) -> &ActionKind {
        &self.inner.kind
    }
}

impl fmt::Debug for CodeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeAction")
            .field("title", &self.inner.title)
            .field("equivalence_key", &self.inner.equivalence_key)
            .field("priority", &self.inner.priority)
            .field("kind", &self.kind_name())
            .field("nested", &self.nested_actions().len())
            .finish()
    }
}

static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

fn next_identity() -> u64 {
    NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed)
}

fn compute_nested_equivalence_key(actions: &[CodeAction]) -> String {
    let mut key = String::new();
    for action in actions {
        match action.equivalence_key() {
            Some(child_key) => key.push_str(child_key),
            None => key.push_str(&action.identity_hash().to_string()),
        }
        key.push(NESTED_KEY_SEPARATOR);
    }
    key
}

fn short_type_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}
