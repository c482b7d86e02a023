use std::collections::BTreeSet;

use kiln_config::{ListOrigin, PhaseList};

/// Either every phase, or an explicit set of phase names.
///
/// Names are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseSet {
    All,
    Enum(BTreeSet<String>),
}

impl Default for PhaseSet {
    fn default() -> Self {
        PhaseSet::empty()
    }
}

impl PhaseSet {
    pub fn empty() -> Self {
        PhaseSet::Enum(BTreeSet::new())
    }

    pub fn of<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Self {
        PhaseSet::Enum(
            names
                .into_iter()
                .map(|name| name.as_ref().to_ascii_lowercase())
                .collect(),
        )
    }

    /// Build a set from a configured name list.
    ///
    /// Lists from `kiln.toml` denote the universal set with the exact token
    /// `ALL`; free-form command-line lists accept `all` in any case.
    pub fn from_list(list: &PhaseList) -> Self {
        let universal = match list.origin {
            ListOrigin::Manifest => list.names.iter().any(|name| name == "ALL"),
            ListOrigin::CommandLine => list.names.iter().any(|name| name.eq_ignore_ascii_case("all")),
        };
        if universal {
            PhaseSet::All
        } else {
            PhaseSet::of(&list.names)
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        match self {
            PhaseSet::All => true,
            PhaseSet::Enum(names) => names.contains(&name.to_ascii_lowercase()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PhaseSet::Enum(names) if names.is_empty())
    }

    pub fn union(self, other: PhaseSet) -> PhaseSet {
        match (self, other) {
            (PhaseSet::All, _) | (_, PhaseSet::All) => PhaseSet::All,
            (PhaseSet::Enum(mut a), PhaseSet::Enum(b)) => {
                a.extend(b);
                PhaseSet::Enum(a)
            }
        }
    }

    /// Names in an explicit set, for validation against a phase tree.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let names = match self {
            PhaseSet::All => None,
            PhaseSet::Enum(names) => Some(names),
        };
        names.into_iter().flatten().map(String::as_str)
    }

    /// Drop every name `keep` rejects.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        if let PhaseSet::Enum(names) = self {
            names.retain(|name| keep(name));
        }
    }
}
