//! # Merge Clusters
//!
//! Discovers organisation identities that describe the same entity under
//! successive names, linked through name-supersession relations, and decides
//! per cluster which members absorb which and which registry identifiers each
//! member must be kept distinct from.
//!
//! Traversal uses an explicit stack with a visited set, so cyclic or very long
//! supersession chains in the source data cannot exhaust the call stack.

use crate::builder::IdentityGraph;
use crate::model::{IdentityMap, IdentityType, RelatedName};
use hashbrown::HashSet;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info, warn};

/// Relation types signalling the same organisation under another name.
/// The general unit-of relation is deliberately absent.
pub const MERGEABLE_RELATIONS: [&str; 2] = ["supersedes", "isSupersededBy"];

pub fn is_mergeable(relation: &RelatedName) -> bool {
    relation
        .relation_type
        .as_deref()
        .is_some_and(|relation_type| MERGEABLE_RELATIONS.contains(&relation_type))
}

/// Per-member merge decisions within one cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterMember {
    pub identifier: String,
    pub external_identifier: Option<String>,
    /// Registry identifiers of other members that differ from this one's
    pub is_not: BTreeSet<String>,
    /// Other members this one absorbs
    pub merge_into: BTreeSet<String>,
    /// Withheld from submission
    pub withheld: bool,
}

impl ClusterMember {
    fn new(identifier: String, external_identifier: Option<String>, withheld: bool) -> Self {
        Self {
            identifier,
            external_identifier,
            is_not: BTreeSet::new(),
            merge_into: BTreeSet::new(),
            withheld,
        }
    }
}

/// A set of organisation identities connected by mergeable relations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeCluster {
    pub members: Vec<ClusterMember>,
    /// Every member was withheld because of an inconsistency in the cluster
    pub withheld_entirely: bool,
}

impl MergeCluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.members.iter().any(|m| m.identifier == identifier)
    }

    pub fn member(&self, identifier: &str) -> Option<&ClusterMember> {
        self.members.iter().find(|m| m.identifier == identifier)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> + '_ {
        self.members.iter().map(|m| m.identifier.as_str())
    }
}

/// Output of cluster resolution
#[derive(Debug, Clone, Default)]
pub struct ClusterResolution {
    pub clusters: Vec<MergeCluster>,
    /// Members joined through absorption, recorded in both directions
    pub cross_references: BTreeMap<String, BTreeSet<String>>,
    /// Identities withheld because of a consistency error
    pub conflicting: BTreeSet<String>,
}

impl ClusterResolution {
    fn cross_reference(&mut self, a: &str, b: &str) {
        self.cross_references
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.cross_references
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }
}

#[derive(Debug, Default)]
struct Traversal {
    members: Vec<String>,
    missing_targets: usize,
    unresolved_targets: Vec<String>,
}

/// Finds merge clusters among organisation identities
#[derive(Debug, Clone, Default)]
pub struct MergeClusterResolver {
    chain_identity_type: Option<IdentityType>,
}

impl MergeClusterResolver {
    /// `chain_identity_type` is the declared target type a relation must carry
    /// to be followed beyond the first hop from a cluster root.
    ///
    /// With `None` no relation qualifies, so a cluster holds the root and the
    /// direct targets of its own mergeable relations. This is the historical
    /// behavior and the default.
    pub fn new(chain_identity_type: Option<IdentityType>) -> Self {
        Self {
            chain_identity_type,
        }
    }

    fn follows_past_root(&self, relation: &RelatedName) -> bool {
        self.chain_identity_type == Some(relation.identity_type) && is_mergeable(relation)
    }

    /// Discover clusters, compare their members pairwise and withhold
    /// identities involved in consistency errors
    pub fn resolve(&self, graph: &mut IdentityGraph) -> ClusterResolution {
        let mut resolution = ClusterResolution::default();
        let roots: Vec<String> = graph
            .identities
            .values()
            .filter(|identity| identity.is_organisation())
            .map(|identity| identity.identifier.clone())
            .collect();

        let mut clustered: HashSet<String> = HashSet::new();
        for root in roots {
            if clustered.contains(&root) {
                continue;
            }
            let traversal = self.collect_members(&graph.identities, &root);
            if let Some(identity) = graph.identities.get_mut(&root) {
                for _ in 0..traversal.missing_targets {
                    identity.add_issue("mergeable relation has no target identifier");
                }
                for target in &traversal.unresolved_targets {
                    identity.add_issue(format!("mergeable relation target {target} not found"));
                }
            }
            if traversal.members.len() < 2 {
                continue;
            }
            clustered.extend(traversal.members.iter().cloned());
            let cluster = compare_members(graph, traversal.members, &mut resolution);
            resolution.clusters.push(cluster);
        }

        withhold_shared_identifiers(graph, &mut resolution);

        // Withholding can leave a member with pending absorptions; repeat
        // until no cluster changes since clusters may overlap.
        let mut clusters = std::mem::take(&mut resolution.clusters);
        loop {
            let mut changed = false;
            for cluster in &mut clusters {
                changed |= withhold_if_inconsistent(graph, cluster, &mut resolution);
            }
            if !changed {
                break;
            }
        }
        resolution.clusters = clusters;

        info!(
            clusters = resolution.clusters.len(),
            conflicting = resolution.conflicting.len(),
            "merge clusters resolved"
        );
        resolution
    }

    /// Collect the members reachable from `root`, in depth-first preorder
    fn collect_members(&self, identities: &IdentityMap, root: &str) -> Traversal {
        let mut traversal = Traversal {
            members: vec![root.to_string()],
            ..Traversal::default()
        };
        let Some(root_identity) = identities.get(root) else {
            return traversal;
        };

        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(root);
        let mut stack: Vec<&str> = Vec::new();

        for relation in root_identity.related_names.iter().rev() {
            if !is_mergeable(relation) {
                continue;
            }
            match relation.target_identifier.as_deref() {
                None => {
                    warn!(identifier = %root, "mergeable relation without target identifier");
                    traversal.missing_targets += 1;
                }
                Some(target) if !identities.contains_key(target) => {
                    warn!(identifier = %root, target = %target, "mergeable relation target not found");
                    traversal.unresolved_targets.push(target.to_string());
                }
                Some(target) => stack.push(target),
            }
        }
        // Relations were pushed in reverse, so the first one is visited first.
        traversal.unresolved_targets.reverse();

        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            debug!(root = %root, member = %current, "merge cluster member");
            traversal.members.push(current.to_string());

            let Some(identity) = identities.get(current) else {
                continue;
            };
            for relation in identity.related_names.iter().rev() {
                if !self.follows_past_root(relation) {
                    continue;
                }
                if let Some(target) = relation.target_identifier.as_deref() {
                    if identities.contains_key(target) && !seen.contains(target) {
                        stack.push(target);
                    }
                }
            }
        }

        traversal
    }
}

/// Pairwise comparison of cluster members' registry identifiers
fn compare_members(
    graph: &mut IdentityGraph,
    identifiers: Vec<String>,
    resolution: &mut ClusterResolution,
) -> MergeCluster {
    let mut members: Vec<ClusterMember> = identifiers
        .into_iter()
        .map(|identifier| {
            let external = graph
                .identities
                .get(&identifier)
                .and_then(|identity| identity.external_identifier.clone());
            let withheld = graph.is_withheld(&identifier);
            ClusterMember::new(identifier, external, withheld)
        })
        .collect();

    for i in 0..members.len() {
        for j in 0..members.len() {
            if i == j {
                continue;
            }
            let (Some(own), Some(other)) = (
                members[i].external_identifier.clone(),
                members[j].external_identifier.clone(),
            ) else {
                continue;
            };
            if own != other {
                members[i].is_not.insert(other);
                continue;
            }

            let first = members[i].identifier.clone();
            let second = members[j].identifier.clone();
            match (graph.is_withheld(&first), graph.is_withheld(&second)) {
                (false, false) => {
                    error!(
                        first = %first,
                        second = %second,
                        external_identifier = %own,
                        "local identities share one registry identifier"
                    );
                    for identifier in [&first, &second] {
                        graph.withhold(identifier);
                        resolution.conflicting.insert(identifier.clone());
                        if let Some(identity) = graph.identities.get_mut(identifier.as_str()) {
                            identity.add_issue(format!(
                                "registry identifier {own} shared with another local identity"
                            ));
                        }
                    }
                }
                (false, true) => {
                    members[i].merge_into.insert(second.clone());
                    resolution.cross_reference(&first, &second);
                }
                // Withheld members never absorb.
                _ => {}
            }
        }
    }

    MergeCluster {
        members,
        withheld_entirely: false,
    }
}

/// Withhold a whole cluster when a withheld member still has absorptions
/// pending. Returns true if the cluster was withheld by this call.
fn withhold_if_inconsistent(
    graph: &mut IdentityGraph,
    cluster: &mut MergeCluster,
    resolution: &mut ClusterResolution,
) -> bool {
    if cluster.withheld_entirely {
        return false;
    }
    for member in &mut cluster.members {
        member.withheld = graph.is_withheld(&member.identifier);
    }

    let inconsistent = cluster
        .members
        .iter()
        .any(|member| member.withheld && !member.merge_into.is_empty());
    if !inconsistent {
        return false;
    }

    let identifiers: Vec<&str> = cluster.identifiers().collect();
    error!(
        members = ?identifiers,
        "withheld cluster member has pending absorptions; cluster withheld"
    );
    for member in &mut cluster.members {
        member.withheld = true;
        graph.withhold(&member.identifier);
        resolution.conflicting.insert(member.identifier.clone());
        if let Some(identity) = graph.identities.get_mut(&member.identifier) {
            identity.add_issue(
                "merge cluster withheld: a withheld member shares a registry identifier with a related identity",
            );
        }
    }
    cluster.withheld_entirely = true;
    true
}

/// Withhold identities that carry the same registry identifier without
/// sharing a merge cluster.
fn withhold_shared_identifiers(graph: &mut IdentityGraph, resolution: &mut ClusterResolution) {
    let mut by_external: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for identity in graph.identities.values() {
        if let Some(external) = identity.external_identifier.as_deref() {
            if !external.trim().is_empty() {
                by_external
                    .entry(external)
                    .or_default()
                    .push(identity.identifier.as_str());
            }
        }
    }

    let mut memberships: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, cluster) in resolution.clusters.iter().enumerate() {
        for identifier in cluster.identifiers() {
            memberships.entry(identifier).or_default().push(index);
        }
    }
    let share_cluster = |a: &str, b: &str| match (memberships.get(a), memberships.get(b)) {
        (Some(first), Some(second)) => first.iter().any(|index| second.contains(index)),
        _ => false,
    };

    let mut shared: Vec<(String, String)> = Vec::new();
    for (external, identifiers) in &by_external {
        for (i, first) in identifiers.iter().enumerate() {
            for second in &identifiers[i + 1..] {
                if share_cluster(*first, *second) {
                    continue;
                }
                error!(
                    first = %first,
                    second = %second,
                    external_identifier = %external,
                    "unrelated local identities share one registry identifier"
                );
                shared.push((first.to_string(), external.to_string()));
                shared.push((second.to_string(), external.to_string()));
            }
        }
    }

    for (identifier, external) in shared {
        graph.withhold(&identifier);
        if resolution.conflicting.insert(identifier.clone()) {
            if let Some(identity) = graph.identities.get_mut(&identifier) {
                identity.add_issue(format!(
                    "registry identifier {external} shared with an unrelated local identity"
                ));
            }
        }
    }
}
