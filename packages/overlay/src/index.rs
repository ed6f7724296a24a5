//! R-tree of prepared tract boundaries.
//!
//! Tracts are bulk-loaded once per run. The bounding-box pre-filter for a
//! precinct overlay is a single envelope query against this tree.

use rstar::{AABB, RTree, RTreeObject};

use crate::prepare::PreparedBoundary;

/// Envelope of one tract, pointing back into [`TractIndex::tracts`].
struct TractEntry {
    slot: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for TractEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Prepared tract boundaries with an R-tree over their envelopes.
pub struct TractIndex {
    tracts: Vec<PreparedBoundary>,
    tree: RTree<TractEntry>,
}

impl TractIndex {
    /// Builds the index. Tracts are stored sorted by GEOID so candidate
    /// order, and therefore every downstream summation, is deterministic.
    #[must_use]
    pub fn build(mut tracts: Vec<PreparedBoundary>) -> Self {
        tracts.sort_by(|a, b| a.id.cmp(&b.id));

        let entries = tracts
            .iter()
            .enumerate()
            .map(|(slot, tract)| TractEntry {
                slot,
                envelope: tract.envelope,
            })
            .collect();

        log::debug!("Indexed {} tract boundaries", tracts.len());

        Self {
            tracts,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Tracts whose bounding box intersects `envelope`, ordered by GEOID.
    #[must_use]
    pub fn candidates(&self, envelope: &AABB<[f64; 2]>) -> Vec<&PreparedBoundary> {
        let mut slots: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(envelope)
            .map(|entry| entry.slot)
            .collect();
        slots.sort_unstable();
        slots.into_iter().map(|slot| &self.tracts[slot]).collect()
    }

    /// Number of indexed tracts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracts.len()
    }

    /// Returns `true` if no tracts are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracts.is_empty()
    }
}
