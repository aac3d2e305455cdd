//! Referrer chain: the lineage of roots behind a loader
//!
//! Each loader carries the ordered list of every root visited from the
//! bootstrap loader down to itself, oldest first, ending with its own root.
//! Entries reached through a clone also remember the [`RepoSpec`] they were
//! cloned from. Chains are values: deriving a child copies the parent's
//! chain and appends, so siblings never share mutable state.

use crate::error::{Error, Result};
use crate::path::ConfirmedDir;
use crate::repospec::RepoSpec;

/// One visited root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referrer {
    pub root: ConfirmedDir,
    /// Set when this root was produced by cloning a repository.
    pub repo: Option<RepoSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferrerChain {
    entries: Vec<Referrer>,
}

impl ReferrerChain {
    /// Chain holding a single bootstrap root
    pub fn start(root: ConfirmedDir, repo: Option<RepoSpec>) -> Self {
        Self {
            entries: vec![Referrer { root, repo }],
        }
    }

    /// A copy of this chain with one more root at the end.
    pub fn extended(&self, root: ConfirmedDir, repo: Option<RepoSpec>) -> Self {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.extend(self.entries.iter().cloned());
        entries.push(Referrer { root, repo });
        Self { entries }
    }

    /// Reject a candidate root that equals or contains any visited root.
    pub fn check_dir(&self, candidate: &ConfirmedDir) -> Result<()> {
        // Newest first, so the message names the closest offending root.
        match self
            .entries
            .iter()
            .rev()
            .find(|entry| candidate.is_ancestor_of(&entry.root))
        {
            Some(entry) => Err(Error::CycleDetected {
                candidate: candidate.to_string(),
                visited: entry.root.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Reject a repository already in the lineage at or below the requested path.
    pub fn check_repo(&self, candidate: &RepoSpec) -> Result<()> {
        let previous = self
            .entries
            .iter()
            .rev()
            .filter_map(|entry| entry.repo.as_ref())
            .find(|previous| candidate.cycles_with(previous));
        match previous {
            Some(previous) => Err(Error::RepoCycleDetected {
                uri: candidate.raw().to_string(),
                previous: previous.raw().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Clone directory of the nearest repository in the lineage, if any.
    pub fn containing_clone(&self) -> Option<&ConfirmedDir> {
        self.entries
            .iter()
            .rev()
            .find_map(|entry| entry.repo.as_ref())
            .and_then(RepoSpec::clone_dir)
    }

    pub fn last(&self) -> Option<&Referrer> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Visited roots, oldest first
    pub fn roots(&self) -> impl Iterator<Item = &ConfirmedDir> {
        self.entries.iter().map(|entry| &entry.root)
    }
}
