//! Arena holding verifier and repair-action nodes.
//!
//! Nodes are appended in declaration order and addressed by index. An edge
//! may only point at a node that already exists, so the graph is acyclic by
//! construction and a node referenced from several places is one shared
//! node, never a copy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::BuildError;
use crate::node::{ActionId, ActionNode, Checker, DependencyNode, Fixer, VerifierId, VerifierNode};
use crate::session::CheckSession;

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeRef {
    Verifier(VerifierId),
    Action(ActionId),
}

/// Immutable-once-built DAG of checks and repairs.
///
/// All mutable state (cached outcomes, counters, repair status) lives in a
/// [`CheckSession`], so one graph can serve any number of sessions.
///
/// Every graph gets a process-unique identity stamped into the ids it
/// hands out. Accessors taking an id from another graph panic.
pub struct DependencyGraph {
    id: u64,
    verifiers: Vec<VerifierNode>,
    actions: Vec<ActionNode>,
    tags: HashMap<String, NodeRef>,
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("id", &self.id)
            .field("verifiers", &self.verifiers.len())
            .field("actions", &self.actions.len())
            .finish()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            verifiers: Vec::new(),
            actions: Vec::new(),
            tags: HashMap::new(),
        }
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a verifier depending on previously added verifiers.
    pub fn add_verifier<C>(
        &mut self,
        tag: impl Into<String>,
        dependencies: &[VerifierId],
        checker: C,
    ) -> Result<VerifierId, BuildError>
    where
        C: Checker + 'static,
    {
        self.add_boxed_verifier(tag.into(), dependencies, Box::new(checker))
    }

    pub(crate) fn add_boxed_verifier(
        &mut self,
        tag: String,
        dependencies: &[VerifierId],
        checker: Box<dyn Checker>,
    ) -> Result<VerifierId, BuildError> {
        self.claim_tag(&tag)?;
        self.check_ids(dependencies)?;

        let id = VerifierId {
            graph: self.id,
            index: self.verifiers.len(),
        };
        self.tags.insert(tag.clone(), NodeRef::Verifier(id));
        self.verifiers.push(VerifierNode {
            node: DependencyNode::new(tag, dependencies.to_vec()),
            checker,
        });
        Ok(id)
    }

    /// Add a repair action with pure dependencies and triggers.
    pub fn add_repair_action<F>(
        &mut self,
        tag: impl Into<String>,
        dependencies: &[VerifierId],
        triggers: &[VerifierId],
        fixer: F,
    ) -> Result<ActionId, BuildError>
    where
        F: Fixer + 'static,
    {
        self.add_boxed_repair_action(tag.into(), dependencies, triggers, Box::new(fixer))
    }

    pub(crate) fn add_boxed_repair_action(
        &mut self,
        tag: String,
        dependencies: &[VerifierId],
        triggers: &[VerifierId],
        fixer: Box<dyn Fixer>,
    ) -> Result<ActionId, BuildError> {
        self.claim_tag(&tag)?;
        self.check_ids(dependencies)?;
        self.check_ids(triggers)?;

        let id = ActionId {
            graph: self.id,
            index: self.actions.len(),
        };
        self.tags.insert(tag.clone(), NodeRef::Action(id));
        self.actions.push(ActionNode {
            node: DependencyNode::new(tag, dependencies.to_vec()),
            triggers: triggers.to_vec(),
            fixer,
        });
        Ok(id)
    }

    fn claim_tag(&self, tag: &str) -> Result<(), BuildError> {
        if self.tags.contains_key(tag) {
            return Err(BuildError::DuplicateTag {
                tag: tag.to_string(),
            });
        }
        Ok(())
    }

    fn check_ids(&self, ids: &[VerifierId]) -> Result<(), BuildError> {
        match ids.iter().find(|id| !self.owns_verifier(**id)) {
            Some(id) => Err(BuildError::ForeignVerifier(*id)),
            None => Ok(()),
        }
    }

    /// Whether `id` was issued by this graph.
    pub fn owns_verifier(&self, id: VerifierId) -> bool {
        id.graph == self.id && id.index < self.verifiers.len()
    }

    pub fn owns_action(&self, id: ActionId) -> bool {
        id.graph == self.id && id.index < self.actions.len()
    }

    /// Arena slot of a verifier id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different graph.
    pub(crate) fn verifier_slot(&self, id: VerifierId) -> usize {
        assert!(
            self.owns_verifier(id),
            "verifier id {id:?} does not belong to this graph"
        );
        id.index
    }

    /// Arena slot of an action id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different graph.
    pub(crate) fn action_slot(&self, id: ActionId) -> usize {
        assert!(
            self.owns_action(id),
            "action id {id:?} does not belong to this graph"
        );
        id.index
    }

    /// Resolve a tag to a verifier, on behalf of `referenced_by`.
    pub fn resolve_verifier(&self, tag: &str, referenced_by: &str) -> Result<VerifierId, BuildError> {
        match self.tags.get(tag) {
            Some(NodeRef::Verifier(id)) => Ok(*id),
            Some(NodeRef::Action(_)) => Err(BuildError::NotAVerifier {
                tag: tag.to_string(),
                referenced_by: referenced_by.to_string(),
            }),
            None => Err(BuildError::UnknownTag {
                tag: tag.to_string(),
                referenced_by: referenced_by.to_string(),
            }),
        }
    }

    pub fn verifier_by_tag(&self, tag: &str) -> Option<VerifierId> {
        match self.tags.get(tag) {
            Some(NodeRef::Verifier(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn action_by_tag(&self, tag: &str) -> Option<ActionId> {
        match self.tags.get(tag) {
            Some(NodeRef::Action(id)) => Some(*id),
            _ => None,
        }
    }

    /// Verifier ids in declaration order.
    pub fn verifier_ids(&self) -> impl Iterator<Item = VerifierId> + '_ {
        let graph = self.id;
        (0..self.verifiers.len()).map(move |index| VerifierId { graph, index })
    }

    /// Action ids in declaration order.
    pub fn action_ids(&self) -> impl Iterator<Item = ActionId> + '_ {
        let graph = self.id;
        (0..self.actions.len()).map(move |index| ActionId { graph, index })
    }

    pub fn verifier_count(&self) -> usize {
        self.verifiers.len()
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// # Panics
    ///
    /// Panics if `id` was issued by a different graph; the same holds for
    /// every accessor below taking an id.
    pub fn verifier(&self, id: VerifierId) -> &DependencyNode {
        &self.verifier_node(id).node
    }

    pub fn action(&self, id: ActionId) -> &DependencyNode {
        &self.action_node(id).node
    }

    /// Triggers of a repair action, in declaration order.
    pub fn triggers(&self, id: ActionId) -> &[VerifierId] {
        &self.action_node(id).triggers
    }

    pub fn verifier_description(&self, id: VerifierId) -> String {
        self.verifier_node(id).checker.description()
    }

    pub fn action_description(&self, id: ActionId) -> String {
        self.action_node(id).fixer.description()
    }

    pub(crate) fn verifier_node(&self, id: VerifierId) -> &VerifierNode {
        &self.verifiers[self.verifier_slot(id)]
    }

    pub(crate) fn action_node(&self, id: ActionId) -> &ActionNode {
        &self.actions[self.action_slot(id)]
    }

    /// Open a fresh check session: every verifier unchecked, every action
    /// without status.
    pub fn session(&self) -> CheckSession<'_> {
        CheckSession::new(self)
    }
}
