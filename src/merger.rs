//! # Identity Merger
//!
//! Collapses merge clusters: each surviving member absorbs the names and
//! resources of the members it was found to merge into, and absorbed members
//! leave the identity map.

use crate::builder::IdentityGraph;
use crate::clusters::{ClusterResolution, MergeCluster};
use crate::model::{Identity, IdentityMap, Name};
use std::collections::BTreeSet;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMerger;

impl IdentityMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge every resolved cluster. Returns the number of absorbed identities.
    pub fn merge_all(&self, resolution: &ClusterResolution, graph: &mut IdentityGraph) -> usize {
        let absorbed: usize = resolution
            .clusters
            .iter()
            .map(|cluster| self.merge_cluster(cluster, graph))
            .sum();
        info!(
            clusters = resolution.clusters.len(),
            absorbed, "merge clusters collapsed"
        );
        absorbed
    }

    /// Apply one cluster's decisions to every member that is not withheld.
    ///
    /// Running it again over an already collapsed cluster changes nothing:
    /// absorbed identities are gone and the survivor already carries the
    /// cluster's names, resources and `is_not` entries.
    pub fn merge_cluster(&self, cluster: &MergeCluster, graph: &mut IdentityGraph) -> usize {
        let mut absorbed = 0;
        for member in &cluster.members {
            if graph.is_withheld(&member.identifier) {
                continue;
            }
            absorbed += self.absorb(
                &mut graph.identities,
                &member.identifier,
                &member.merge_into,
                &member.is_not,
            );
        }
        absorbed
    }

    /// Fold `absorbed` identities into `survivor` and attach `is_not`
    pub fn absorb(
        &self,
        identities: &mut IdentityMap,
        survivor: &str,
        absorbed: &BTreeSet<String>,
        is_not: &BTreeSet<String>,
    ) -> usize {
        if !identities.contains_key(survivor) {
            debug!(identifier = %survivor, "merge survivor no longer in map");
            return 0;
        }

        let mut removed: Vec<Identity> = Vec::new();
        for identifier in absorbed {
            if identifier == survivor {
                continue;
            }
            match identities.remove(identifier) {
                Some(identity) => {
                    debug!(survivor = %survivor, absorbed = %identifier, "identity absorbed");
                    removed.push(identity);
                }
                None => debug!(absorbed = %identifier, "identity already absorbed"),
            }
        }

        let Some(identity) = identities.get_mut(survivor) else {
            return 0;
        };
        let count = removed.len();
        for other in removed {
            add_variant(identity, other.name);
            for variant in other.name_variants {
                add_variant(identity, variant);
            }
            identity.resources.extend(other.resources);
        }

        identity.related_names.retain(|relation| {
            relation
                .target_identifier
                .as_ref()
                .map_or(true, |target| !absorbed.contains(target))
        });
        identity.clear_usage_dates();

        let own = identity.external_identifier.clone();
        identity.is_not.extend(
            is_not
                .iter()
                .filter(|entry| own.as_ref() != Some(*entry))
                .cloned(),
        );

        count
    }
}

fn add_variant(identity: &mut Identity, name: Name) {
    if name != identity.name && !identity.name_variants.contains(&name) {
        identity.name_variants.push(name);
    }
}
