//! # Conversion Pipeline
//!
//! Runs the stages in order over one batch of records:
//! graph building, cluster resolution, merging, resource selection,
//! relation normalization and finalization. The whole identity map is
//! processed in memory before anything is returned.

use crate::builder::{IdentityGraph, IdentityGraphBuilder, Scope};
use crate::clusters::{ClusterResolution, MergeCluster, MergeClusterResolver};
use crate::error::Result;
use crate::merger::IdentityMerger;
use crate::model::IdentityMap;
use crate::record::NormalizedRecord;
use crate::relations::RelationNormalizer;
use crate::resources::{ResourceLookup, ResourceSelector};
use crate::vocabulary::RelationEncoder;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Counts reported to the caller after a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub skipped_untyped: usize,
    pub dropped_unnamed: usize,
    pub discarded_without_resources: usize,
    pub merged: usize,
    pub conflicting: usize,
    pub withheld: usize,
    pub emitted: usize,
}

/// Result of one conversion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Conversion {
    /// Identities ready for request serialization
    pub identities: IdentityMap,
    pub clusters: Vec<MergeCluster>,
    pub cross_references: BTreeMap<String, BTreeSet<String>>,
    pub summary: ConversionSummary,
}

/// The stages of a conversion, configured once and run per batch
#[derive(Debug, Clone)]
pub struct Pipeline {
    builder: IdentityGraphBuilder,
    resolver: MergeClusterResolver,
    merger: IdentityMerger,
    selector: ResourceSelector,
}

impl Pipeline {
    pub fn new(
        builder: IdentityGraphBuilder,
        resolver: MergeClusterResolver,
        selector: ResourceSelector,
    ) -> Self {
        Self {
            builder,
            resolver,
            merger: IdentityMerger::new(),
            selector,
        }
    }

    pub fn run<I>(
        &self,
        records: I,
        scope: &Scope,
        lookup: &dyn ResourceLookup,
        encoder: &dyn RelationEncoder,
    ) -> Result<Conversion>
    where
        I: IntoIterator<Item = NormalizedRecord>,
    {
        let mut graph = self.builder.build(records, scope, lookup);
        let resolution = self.resolver.resolve(&mut graph);
        let merged = self.merger.merge_all(&resolution, &mut graph);
        self.select_resources(&mut graph);
        let relations = RelationNormalizer::new(encoder).normalize(&mut graph)?;
        debug!(?relations, "relation normalization done");

        let mut summary = ConversionSummary {
            skipped_untyped: graph.skipped_untyped,
            dropped_unnamed: graph.dropped_unnamed,
            merged,
            conflicting: resolution.conflicting.len(),
            withheld: graph.withheld.len(),
            ..ConversionSummary::default()
        };
        summary.discarded_without_resources = finalize(&mut graph, &resolution);
        summary.emitted = graph.identities.len();

        info!(
            emitted = summary.emitted,
            merged = summary.merged,
            conflicting = summary.conflicting,
            withheld = summary.withheld,
            discarded_without_resources = summary.discarded_without_resources,
            skipped_untyped = summary.skipped_untyped,
            dropped_unnamed = summary.dropped_unnamed,
            "conversion finished"
        );

        Ok(Conversion {
            identities: graph.identities,
            clusters: resolution.clusters,
            cross_references: resolution.cross_references,
            summary,
        })
    }

    /// Replace every identity's resources with the selected subset
    pub fn select_resources(&self, graph: &mut IdentityGraph) {
        for identity in graph.identities.values_mut() {
            let resources = std::mem::take(&mut identity.resources);
            identity.resources = self.selector.select(resources, &identity.language_codes);
        }
    }
}

/// Decide the final requested set and drop everything else.
///
/// Returns how many otherwise emitted identities were discarded for lack of
/// resource evidence.
pub fn finalize(graph: &mut IdentityGraph, resolution: &ClusterResolution) -> usize {
    // A change to any merged-in identity means the whole cluster is resubmitted.
    for cluster in &resolution.clusters {
        for identifier in cluster.identifiers() {
            let revive = graph.related_not_requested.contains(identifier)
                && !graph.excluded.contains(identifier)
                && !graph.is_withheld(identifier);
            if !revive {
                continue;
            }
            if let Some(identity) = graph.identities.get_mut(identifier) {
                debug!(identifier = %identifier, "cluster member requested with its cluster");
                identity.deletable = false;
            }
        }
    }

    let IdentityGraph {
        identities,
        withheld,
        out_of_window,
        ..
    } = graph;

    let mut discarded = 0;
    for (identifier, identity) in identities.iter_mut() {
        if identity.resources.is_empty() {
            if !identity.deletable && !withheld.contains(identifier) {
                warn!(identifier = %identifier, "no resources; identity discarded");
                discarded += 1;
            }
            identity.deletable = true;
        }
        if out_of_window.contains(identifier) || withheld.contains(identifier) {
            identity.deletable = true;
        }
    }

    identities.retain(|_, identity| !identity.deletable);
    discarded
}
