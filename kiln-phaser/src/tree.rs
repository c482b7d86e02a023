//! Trees of lowering phases, stored as an arena addressed by [`PhaseId`].

use std::collections::HashSet;

use thiserror::Error;

use crate::{Condition, Conditions, LoweringPhase, PostAction, PreAction};

/// Index of a node in a [`PhaseTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhaseId(usize);

impl PhaseId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhaseTreeError {
    #[error("duplicate phase name '{0}'")]
    DuplicateName(String),

    #[error("compound phase '{compound}' refers to unknown phase #{child}")]
    UnknownChild { compound: String, child: usize },

    #[error("unknown root phase #{0}")]
    UnknownRoot(usize),
}

pub enum PhaseKind<C, S> {
    Leaf(Box<dyn LoweringPhase<C, S>>),
    /// Children run in order, each seeing the state its predecessor left.
    Compound(Vec<PhaseId>),
}

pub struct PhaseNode<C, S> {
    name: String,
    kind: PhaseKind<C, S>,
    pre_actions: Vec<Box<dyn PreAction<S, C>>>,
    post_actions: Vec<Box<dyn PostAction<S, S, C>>>,
    conditions: Conditions<S>,
}

impl<C, S> PhaseNode<C, S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PhaseKind<C, S> {
        &self.kind
    }

    pub fn pre_actions(&self) -> &[Box<dyn PreAction<S, C>>] {
        &self.pre_actions
    }

    pub fn post_actions(&self) -> &[Box<dyn PostAction<S, S, C>>] {
        &self.post_actions
    }

    pub fn conditions(&self) -> &Conditions<S> {
        &self.conditions
    }
}

/// A validated tree of phases with unique names.
pub struct PhaseTree<C, S> {
    nodes: Vec<PhaseNode<C, S>>,
    root: PhaseId,
}

impl<C, S> PhaseTree<C, S> {
    pub fn root(&self) -> PhaseId {
        self.root
    }

    pub fn node(&self, id: PhaseId) -> &PhaseNode<C, S> {
        &self.nodes[id.0]
    }

    /// Every phase reachable from the root, pre-order, with its depth.
    pub fn named_subphases(&self) -> Vec<(usize, PhaseId)> {
        let mut out = Vec::new();
        self.collect(self.root, 0, &mut out);
        out
    }

    fn collect(&self, id: PhaseId, depth: usize, out: &mut Vec<(usize, PhaseId)>) {
        out.push((depth, id));
        if let PhaseKind::Compound(children) = &self.node(id).kind {
            for child in children {
                self.collect(*child, depth + 1, out);
            }
        }
    }

    pub fn phase_names(&self) -> Vec<&str> {
        self.named_subphases()
            .into_iter()
            .map(|(_, id)| self.node(id).name())
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<PhaseId> {
        self.named_subphases()
            .into_iter()
            .map(|(_, id)| id)
            .find(|id| self.node(*id).name.eq_ignore_ascii_case(name))
    }
}

/// Builds a [`PhaseTree`] bottom-up: children first, then the compounds
/// that group them.
pub struct PhaseTreeBuilder<C, S> {
    nodes: Vec<PhaseNode<C, S>>,
}

impl<C, S> Default for PhaseTreeBuilder<C, S> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<C, S> PhaseTreeBuilder<C, S> {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, name: String, kind: PhaseKind<C, S>) -> PhaseId {
        self.nodes.push(PhaseNode {
            name,
            kind,
            pre_actions: Vec::new(),
            post_actions: Vec::new(),
            conditions: Conditions::default(),
        });
        PhaseId(self.nodes.len() - 1)
    }

    pub fn leaf(&mut self, phase: impl LoweringPhase<C, S> + 'static) -> PhaseId {
        let name = phase.name().to_string();
        self.push(name, PhaseKind::Leaf(Box::new(phase)))
    }

    pub fn compound(&mut self, name: impl Into<String>, children: impl IntoIterator<Item = PhaseId>) -> PhaseId {
        self.push(name.into(), PhaseKind::Compound(children.into_iter().collect()))
    }

    pub fn pre_action(&mut self, id: PhaseId, action: impl PreAction<S, C> + 'static) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.pre_actions.push(Box::new(action));
        }
        self
    }

    pub fn post_action(&mut self, id: PhaseId, action: impl PostAction<S, S, C> + 'static) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.post_actions.push(Box::new(action));
        }
        self
    }

    pub fn precondition(&mut self, id: PhaseId, condition: Condition<S>) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.conditions.pre.push(condition);
        }
        self
    }

    pub fn postcondition(&mut self, id: PhaseId, condition: Condition<S>) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.conditions.post.push(condition);
        }
        self
    }

    pub fn sticky_postcondition(&mut self, id: PhaseId, condition: Condition<S>) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.conditions.sticky_post.push(condition);
        }
        self
    }

    /// Finish the tree rooted at `root`.
    ///
    /// Fails if a compound names a phase that was not built before it, or if
    /// two reachable phases share a name.
    pub fn build(self, root: PhaseId) -> Result<PhaseTree<C, S>, PhaseTreeError> {
        if root.0 >= self.nodes.len() {
            return Err(PhaseTreeError::UnknownRoot(root.0));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if let PhaseKind::Compound(children) = &node.kind
                && let Some(child) = children.iter().find(|child| child.0 >= index)
            {
                return Err(PhaseTreeError::UnknownChild {
                    compound: node.name.clone(),
                    child: child.0,
                });
            }
        }

        let tree = PhaseTree {
            nodes: self.nodes,
            root,
        };
        let mut seen = HashSet::new();
        for (_, id) in tree.named_subphases() {
            let name = tree.node(id).name.to_ascii_lowercase();
            if !seen.insert(name) {
                return Err(PhaseTreeError::DuplicateName(tree.node(id).name.clone()));
            }
        }
        Ok(tree)
    }
}
