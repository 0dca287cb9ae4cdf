//! Declarative construction of a complete verify/repair graph.
//!
//! Verifiers are declared dependency-first; each tag reference must name a
//! verifier declared earlier. After all verifiers, a synthetic root
//! verifier ([`ROOT_TAG`]) is added whose dependencies are the top-level
//! verifiers, i.e. those no other verifier depends on. Repair actions come
//! last and may refer to any verifier, including the root.

use std::collections::HashSet;

use crate::error::{BuildError, CheckError, RepairFailures, VerifyError};
use crate::graph::DependencyGraph;
use crate::host::Host;
use crate::node::{ActionId, Checker, DependencyNode, Fixer, VerifierId};
use crate::obs::{self, SessionSpan};
use crate::session::CheckSession;

/// Tag of the synthetic root verifier.
pub const ROOT_TAG: &str = "PASS";

/// The root passes whenever all of its dependencies pass.
struct RootChecker;

impl Checker for RootChecker {
    fn description(&self) -> String {
        "All host verification checks pass".to_string()
    }

    fn verify(&self, _host: &dyn Host) -> Result<(), VerifyError> {
        Ok(())
    }
}

/// Declaration of one verifier.
pub struct VerifierSpec {
    tag: String,
    dependencies: Vec<String>,
    checker: Box<dyn Checker>,
}

impl VerifierSpec {
    pub fn new(tag: impl Into<String>, checker: impl Checker + 'static) -> Self {
        Self {
            tag: tag.into(),
            dependencies: Vec::new(),
            checker: Box::new(checker),
        }
    }

    /// Tags of verifiers that must pass before this one is probed.
    pub fn depends_on<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// Declaration of one repair action.
pub struct RepairSpec {
    tag: String,
    dependencies: Vec<String>,
    triggers: Vec<String>,
    fixer: Box<dyn Fixer>,
}

impl RepairSpec {
    pub fn new(tag: impl Into<String>, fixer: impl Fixer + 'static) -> Self {
        Self {
            tag: tag.into(),
            dependencies: Vec::new(),
            triggers: Vec::new(),
            fixer: Box::new(fixer),
        }
    }

    /// Tags of verifiers that must pass before the repair may run at all.
    pub fn depends_on<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Tags of verifiers whose failure causes the repair to run.
    pub fn triggered_by<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.triggers.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// A built verify/repair graph with its synthetic root.
#[derive(Debug)]
pub struct RepairStrategy {
    graph: DependencyGraph,
    root: VerifierId,
}

impl RepairStrategy {
    /// Build the graph from declarations, in order.
    pub fn new(verifiers: Vec<VerifierSpec>, repairs: Vec<RepairSpec>) -> Result<Self, BuildError> {
        let mut graph = DependencyGraph::new();
        let mut declared = Vec::with_capacity(verifiers.len());
        let mut referenced = HashSet::new();

        for spec in verifiers {
            reject_reserved(&spec.tag)?;
            let deps = resolve_all(&graph, &spec.dependencies, &spec.tag)?;
            referenced.extend(deps.iter().copied());
            let id = graph.add_boxed_verifier(spec.tag, &deps, spec.checker)?;
            declared.push(id);
        }

        let top_level: Vec<VerifierId> = declared
            .into_iter()
            .filter(|id| !referenced.contains(id))
            .collect();
        let root = graph.add_verifier(ROOT_TAG, &top_level, RootChecker)?;

        for spec in repairs {
            reject_reserved(&spec.tag)?;
            let deps = resolve_all(&graph, &spec.dependencies, &spec.tag)?;
            let triggers = resolve_all(&graph, &spec.triggers, &spec.tag)?;
            graph.add_boxed_repair_action(spec.tag, &deps, &triggers, spec.fixer)?;
        }

        tracing::debug!(
            verifiers = graph.verifier_count(),
            actions = graph.action_count(),
            "built repair strategy"
        );
        Ok(Self { graph, root })
    }

    /// Fresh evaluation of every check.
    pub fn verify(&self, host: &dyn Host, silent: bool) -> Result<(), CheckError> {
        let mut session = self.session();
        let _span = SessionSpan::enter(session.id(), host.hostname());
        let result = session.reverify(self.root, host, silent);
        obs::emit_verify_finished(host.hostname(), result.is_ok());
        result
    }

    /// Run every repair action in declaration order.
    pub fn repair(&self, host: &dyn Host, silent: bool) -> Result<(), RepairFailures> {
        let mut session = self.session();
        let _span = SessionSpan::enter(session.id(), host.hostname());
        session.repair_all(host, silent)
    }

    /// Open a session for step-by-step control or status inspection.
    pub fn session(&self) -> CheckSession<'_> {
        self.graph.session()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// The synthetic root verifier.
    pub fn root(&self) -> VerifierId {
        self.root
    }

    pub fn lookup(&self, tag: &str) -> Option<VerifierId> {
        self.graph.verifier_by_tag(tag)
    }

    pub fn lookup_action(&self, tag: &str) -> Option<ActionId> {
        self.graph.action_by_tag(tag)
    }

    pub fn verifier(&self, id: VerifierId) -> &DependencyNode {
        self.graph.verifier(id)
    }

    pub fn dependencies(&self, id: VerifierId) -> &[VerifierId] {
        self.graph.verifier(id).dependencies()
    }

    /// Repair actions in declaration order.
    pub fn actions(&self) -> Vec<ActionId> {
        self.graph.action_ids().collect()
    }

    pub fn action(&self, id: ActionId) -> &DependencyNode {
        self.graph.action(id)
    }

    pub fn action_dependencies(&self, id: ActionId) -> &[VerifierId] {
        self.graph.action(id).dependencies()
    }

    pub fn action_triggers(&self, id: ActionId) -> &[VerifierId] {
        self.graph.triggers(id)
    }
}

fn reject_reserved(tag: &str) -> Result<(), BuildError> {
    if tag == ROOT_TAG {
        return Err(BuildError::ReservedTag {
            tag: tag.to_string(),
        });
    }
    Ok(())
}

fn resolve_all(
    graph: &DependencyGraph,
    tags: &[String],
    referenced_by: &str,
) -> Result<Vec<VerifierId>, BuildError> {
    tags.iter()
        .map(|tag| graph.resolve_verifier(tag, referenced_by))
        .collect()
}
