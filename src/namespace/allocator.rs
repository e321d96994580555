//! # Archive Identifier Allocator
//!
//! The single authority for archive bucket identifiers. Both freshly minted
//! ACTIVE ids and `<name>-deleted-<n>` rename targets come from here, and an
//! identifier is never handed out twice for the lifetime of the archive.
//!
//! Proposals are pure; `mint` records the identifier once the owning event
//! has been journaled.

use std::collections::HashSet;

use uuid::Uuid;

use crate::errors::{ArchiveError, ArchiveResult};

/// Separator between a logical name and its rename disambiguator.
pub const RETIRED_INFIX: &str = "-deleted-";

/// A proposed rename target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameTarget {
    pub archive_bucket_id: String,
    pub disambiguator: u64,
}

#[derive(Debug)]
pub struct IdAllocator {
    minted: HashSet<String>,
    /// Process-wide disambiguator counter. Starts at 1.
    next_disambiguator: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            minted: HashSet::new(),
            next_disambiguator: 1,
        }
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_minted(&self, id: &str) -> bool {
        self.minted.contains(id)
    }

    pub fn minted_count(&self) -> usize {
        self.minted.len()
    }

    pub fn next_disambiguator(&self) -> u64 {
        self.next_disambiguator
    }

    /// Proposes a fresh identifier for a new generation of `logical_name`.
    pub fn propose_active_id(&self, logical_name: &str) -> String {
        loop {
            let candidate = format!("{}.{}", logical_name, Uuid::new_v4().simple());
            if !self.is_minted(&candidate) {
                return candidate;
            }
        }
    }

    /// Proposes `<logical_name>-deleted-<n>`, advancing `n` past any
    /// identifier already minted. Gives up after `max_probes` candidates.
    pub fn propose_rename(&self, logical_name: &str, max_probes: u64) -> ArchiveResult<RenameTarget> {
        let mut disambiguator = self.next_disambiguator;
        for _ in 0..max_probes {
            let candidate = format!("{}{}{}", logical_name, RETIRED_INFIX, disambiguator);
            if !self.is_minted(&candidate) {
                return Ok(RenameTarget {
                    archive_bucket_id: candidate,
                    disambiguator,
                });
            }
            disambiguator = disambiguator.checked_add(1).ok_or_else(|| {
                ArchiveError::NamespaceExhausted {
                    logical_name: logical_name.to_string(),
                    probes: max_probes,
                }
            })?;
        }

        Err(ArchiveError::NamespaceExhausted {
            logical_name: logical_name.to_string(),
            probes: max_probes,
        })
    }

    /// Records `id` as taken.
    pub fn mint(&mut self, id: &str) -> ArchiveResult<()> {
        if !self.minted.insert(id.to_string()) {
            return Err(ArchiveError::invariant(format!(
                "archive bucket id {} minted twice",
                id
            )));
        }
        Ok(())
    }

    /// Records a rename target and moves the counter past its disambiguator.
    pub fn mint_rename(&mut self, target: &RenameTarget) -> ArchiveResult<()> {
        self.mint(&target.archive_bucket_id)?;
        self.next_disambiguator = self
            .next_disambiguator
            .max(target.disambiguator.saturating_add(1));
        Ok(())
    }
}
