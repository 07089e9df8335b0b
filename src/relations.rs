//! # Relation Normalizer
//!
//! Finalizes each identity's related names: copies registry identifiers of
//! resolved targets, encodes relation types into the registry vocabulary and
//! drops relations that cannot be submitted.

use crate::builder::IdentityGraph;
use crate::error::Result;
use crate::model::IdentityType;
use crate::vocabulary::{RelationEncoder, Vocabulary, UNDEFINED_RELATION};
use hashbrown::HashMap;
use tracing::{info, warn};

/// Counts of what happened to relations during normalization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationStats {
    pub encoded: usize,
    pub undefined: usize,
    pub dropped_unencodable: usize,
    pub dropped_withheld: usize,
}

pub struct RelationNormalizer<'a> {
    encoder: &'a dyn RelationEncoder,
}

impl<'a> RelationNormalizer<'a> {
    pub fn new(encoder: &'a dyn RelationEncoder) -> Self {
        Self { encoder }
    }

    /// Normalize the relations of every identity in the graph.
    ///
    /// Only vocabulary failures are returned as errors; unencodable terms are
    /// handled per relation.
    pub fn normalize(&self, graph: &mut IdentityGraph) -> Result<RelationStats> {
        let IdentityGraph {
            identities,
            withheld,
            ..
        } = graph;

        let externals: HashMap<String, String> = identities
            .iter()
            .filter_map(|(id, identity)| {
                identity
                    .external_identifier
                    .clone()
                    .map(|external| (id.clone(), external))
            })
            .collect();

        let mut stats = RelationStats::default();
        for identity in identities.values_mut() {
            let vocabulary = Vocabulary::relations_for(identity.identity_type);
            let owner_is_organisation = identity.is_organisation();
            let mut kept = Vec::with_capacity(identity.related_names.len());
            let mut issues = Vec::new();

            for mut relation in std::mem::take(&mut identity.related_names) {
                if let Some(target) = relation.target_identifier.as_deref() {
                    if withheld.contains(target) {
                        stats.dropped_withheld += 1;
                        continue;
                    }
                    if let Some(external) = externals.get(target) {
                        relation.external_identifier = Some(external.clone());
                    }
                }

                let encoded = match relation.relation_type.as_deref() {
                    Some(term) => self.encoder.encode(term, vocabulary)?,
                    None => None,
                };
                match encoded {
                    Some(code) => {
                        relation.relation_type = Some(code);
                        stats.encoded += 1;
                    }
                    None if owner_is_organisation
                        && relation.identity_type == IdentityType::Organisation =>
                    {
                        warn!(
                            identifier = %identity.identifier,
                            relation_type = ?relation.relation_type,
                            "unencodable organisation relation dropped"
                        );
                        issues.push(format!(
                            "unencodable relation type {} dropped",
                            relation.relation_type.as_deref().unwrap_or("(none)")
                        ));
                        stats.dropped_unencodable += 1;
                        continue;
                    }
                    None => {
                        warn!(
                            identifier = %identity.identifier,
                            relation_type = ?relation.relation_type,
                            "unencodable relation type"
                        );
                        relation.relation_type = Some(UNDEFINED_RELATION.to_string());
                        stats.undefined += 1;
                    }
                }
                kept.push(relation);
            }

            identity.related_names = kept;
            for issue in issues {
                identity.add_issue(issue);
            }
        }

        info!(
            encoded = stats.encoded,
            undefined = stats.undefined,
            dropped_unencodable = stats.dropped_unencodable,
            dropped_withheld = stats.dropped_withheld,
            "relations normalized"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{IdentityGraphBuilder, Scope};
    use crate::model::{Name, OrganisationName, PersonalName, RelatedName};
    use crate::record::{NormalizedRecord, SourceExclusion};
    use crate::resources::NoResources;
    use crate::vocabulary::TermTable;

    fn vocabularies() -> TermTable {
        let mut table = TermTable::new();
        table.insert(Vocabulary::OrganisationRelations, "edeltäjä", "supersedes");
        table.insert(Vocabulary::PersonRelations, "jäsen", "isMemberOf");
        table
    }

    fn org(id: &str) -> NormalizedRecord {
        NormalizedRecord::new(
            id,
            IdentityType::Organisation,
            Name::Organisation(OrganisationName::new(format!("Org {id}"))),
        )
    }

    fn person(id: &str) -> NormalizedRecord {
        NormalizedRecord::new(
            id,
            IdentityType::PersonOrFiction,
            Name::Personal(PersonalName::new("Kivi", Some("Aleksis"))),
        )
    }

    fn build(records: Vec<NormalizedRecord>) -> IdentityGraph {
        IdentityGraphBuilder::default().build(records, &Scope::all(), &NoResources)
    }

    #[test]
    fn test_encodes_and_copies_target_identifier() {
        let mut owner = org("O1");
        owner.related_names.push(RelatedName::linked(
            IdentityType::Organisation,
            "edeltäjä",
            "O2",
        ));
        let mut target = org("O2");
        target.external_identifier = Some("0000000123456789".to_string());

        let mut graph = build(vec![owner, target]);
        let stats = RelationNormalizer::new(&vocabularies())
            .normalize(&mut graph)
            .unwrap();

        let relation = &graph.identities["O1"].related_names[0];
        assert_eq!(relation.relation_type.as_deref(), Some("supersedes"));
        assert_eq!(
            relation.external_identifier.as_deref(),
            Some("0000000123456789")
        );
        assert_eq!(stats.encoded, 1);
    }

    #[test]
    fn test_unencodable_organisation_relation_is_dropped() {
        let mut owner = org("O1");
        owner.related_names.push(RelatedName::linked(
            IdentityType::Organisation,
            "sisarjärjestö",
            "O2",
        ));
        let mut graph = build(vec![owner, org("O2")]);
        let stats = RelationNormalizer::new(&vocabularies())
            .normalize(&mut graph)
            .unwrap();

        assert!(graph.identities["O1"].related_names.is_empty());
        assert_eq!(graph.identities["O1"].issues.len(), 1);
        assert_eq!(stats.dropped_unencodable, 1);
    }

    #[test]
    fn test_unencodable_person_relation_becomes_undefined() {
        let mut owner = person("P1");
        owner.related_names.push(RelatedName::linked(
            IdentityType::Organisation,
            "tuntematon",
            "O1",
        ));
        let mut graph = build(vec![owner, org("O1")]);
        RelationNormalizer::new(&vocabularies())
            .normalize(&mut graph)
            .unwrap();

        let relation = &graph.identities["P1"].related_names[0];
        assert_eq!(relation.relation_type.as_deref(), Some(UNDEFINED_RELATION));
    }

    #[test]
    fn test_relations_to_withheld_targets_are_dropped() {
        let mut owner = person("P1");
        owner.related_names.push(RelatedName::linked(
            IdentityType::Organisation,
            "jäsen",
            "O1",
        ));
        let mut withheld = org("O1");
        withheld.exclusion = Some(SourceExclusion::DoNotLoad);

        let mut graph = build(vec![owner, withheld]);
        let stats = RelationNormalizer::new(&vocabularies())
            .normalize(&mut graph)
            .unwrap();
        assert!(graph.identities["P1"].related_names.is_empty());
        assert_eq!(stats.dropped_withheld, 1);
    }

    #[test]
    fn test_missing_vocabulary_is_fatal() {
        let mut owner = org("O1");
        owner.related_names.push(RelatedName::linked(
            IdentityType::Organisation,
            "edeltäjä",
            "O2",
        ));
        let mut graph = build(vec![owner, org("O2")]);
        let result = RelationNormalizer::new(&TermTable::new()).normalize(&mut graph);
        assert!(result.is_err());
    }
}
