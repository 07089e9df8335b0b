//! # Registry Response Reconciliation
//!
//! Maps registry responses for submitted identities back onto the local
//! records: which identifier was assigned, which identifiers are known to be
//! distinct, which candidates need manual review, and which absorbed records
//! should receive an assigned identifier too.

use crate::model::Identity;
use crate::pipeline::Conversion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Registry reason meaning the record was too sparse to match automatically
pub const SPARSE_RECORD_REASON: &str = "no match initial database";

/// Other-identifier type holding registry identifiers
pub const REGISTRY_IDENTIFIER_TYPE: &str = "isni";

/// A possible match proposed by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub identifier: String,
    /// Local source identifiers the registry already links to the candidate
    #[serde(default)]
    pub source_identifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryOutcome {
    Assigned {
        identifier: String,
        #[serde(default)]
        deprecated: Vec<String>,
    },
    PossibleMatches(Vec<MatchCandidate>),
    NoMatch {
        reason: Option<String>,
    },
    Rejected {
        errors: Vec<String>,
    },
}

/// Registry response for one submitted identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryResponse {
    pub local_identifier: String,
    pub outcome: RegistryOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "status")]
pub enum ReconciliationStatus {
    /// The registry returned the identifier the record already carries
    Confirmed,
    /// A new identifier was assigned, replacing a different one if present
    Assigned { replaced: Option<String> },
    NeedsReview { sparse: bool },
    Pending { sparse: bool, reason: Option<String> },
    Rejected { errors: Vec<String> },
}

/// A review candidate annotated for the cataloguer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewCandidate {
    pub identifier: String,
    /// The registry already links this local record to the candidate
    pub this_record: bool,
    pub source_identifiers: Vec<String>,
}

/// Changes to write back to one local record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationUpdate {
    pub local_identifier: String,
    pub status: ReconciliationStatus,
    pub external_identifier: Option<String>,
    pub deprecated: Vec<String>,
    pub is_not: BTreeSet<String>,
    pub candidates: Vec<ReviewCandidate>,
    /// Absorbed local records that should receive the assigned identifier
    pub propagate_to: BTreeSet<String>,
}

impl ReconciliationUpdate {
    fn new(local_identifier: &str, status: ReconciliationStatus) -> Self {
        Self {
            local_identifier: local_identifier.to_string(),
            status,
            external_identifier: None,
            deprecated: Vec::new(),
            is_not: BTreeSet::new(),
            candidates: Vec::new(),
            propagate_to: BTreeSet::new(),
        }
    }
}

/// Reconcile registry responses against a finished conversion.
///
/// Responses for identities the conversion did not emit are skipped.
pub fn reconcile(conversion: &Conversion, responses: &[RegistryResponse]) -> Vec<ReconciliationUpdate> {
    let mut updates = Vec::with_capacity(responses.len());
    for response in responses {
        let local = response.local_identifier.as_str();
        let Some(identity) = conversion.identities.get(local) else {
            warn!(identifier = %local, "registry response for unknown local identity; skipped");
            continue;
        };

        let update = match &response.outcome {
            RegistryOutcome::Assigned {
                identifier,
                deprecated,
            } => assigned(conversion, identity, identifier, deprecated),
            RegistryOutcome::PossibleMatches(candidates) => possible_matches(local, candidates),
            RegistryOutcome::NoMatch { reason } => {
                let sparse = reason.as_deref() == Some(SPARSE_RECORD_REASON);
                ReconciliationUpdate::new(
                    local,
                    ReconciliationStatus::Pending {
                        sparse,
                        reason: reason.clone().filter(|_| !sparse),
                    },
                )
            }
            RegistryOutcome::Rejected { errors } => ReconciliationUpdate::new(
                local,
                ReconciliationStatus::Rejected {
                    errors: errors.clone(),
                },
            ),
        };
        debug!(identifier = %local, status = ?update.status, "registry response reconciled");
        updates.push(update);
    }
    updates
}

fn assigned(
    conversion: &Conversion,
    identity: &Identity,
    assigned: &str,
    deprecated: &[String],
) -> ReconciliationUpdate {
    let assigned = compact(assigned);
    let current = identity.external_identifier.as_deref().map(compact);

    let status = match current {
        Some(ref current) if *current == assigned => ReconciliationStatus::Confirmed,
        replaced => ReconciliationStatus::Assigned { replaced },
    };
    let mut update = ReconciliationUpdate::new(&identity.identifier, status);

    let deprecated: Vec<String> = deprecated.iter().map(|id| compact(id)).collect();
    let recorded = identity
        .other_identifiers
        .iter()
        .filter(|other| other.id_type == REGISTRY_IDENTIFIER_TYPE)
        .map(|other| compact(&other.value));
    update.is_not = identity
        .is_not
        .iter()
        .map(|id| compact(id))
        .chain(recorded)
        .filter(|id| *id != assigned && !deprecated.contains(id))
        .collect();

    if let Some(references) = conversion.cross_references.get(&identity.identifier) {
        update.propagate_to = references
            .iter()
            .filter(|id| !conversion.identities.contains_key(id.as_str()))
            .cloned()
            .collect();
    }

    update.deprecated = deprecated;
    update.external_identifier = Some(assigned);
    update
}

fn possible_matches(local: &str, candidates: &[MatchCandidate]) -> ReconciliationUpdate {
    let mut sparse = false;
    let mut review = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let this_record = candidate.source_identifiers.iter().any(|id| id == local);
        if this_record && candidates.len() == 1 {
            // The registry only matched the record to itself.
            sparse = true;
            continue;
        }
        review.push(ReviewCandidate {
            identifier: candidate.identifier.clone(),
            this_record,
            source_identifiers: candidate.source_identifiers.clone(),
        });
    }

    let mut update = ReconciliationUpdate::new(local, ReconciliationStatus::NeedsReview { sparse });
    update.candidates = review;
    update
}

/// Registry identifiers are compared without embedded spaces
fn compact(identifier: &str) -> String {
    identifier.chars().filter(|c| !c.is_whitespace()).collect()
}
