//! # Identity Graph Builder
//!
//! Builds the working identity map from normalized records and applies the
//! requested scope: explicit identifier allow-list, date window, identity type
//! filter and source exclusions.
//!
//! Records outside the scope stay in the map, flagged deletable, so that
//! relations from in-scope identities can still be resolved against them.

use crate::error::{ConversionError, Result};
use crate::model::{IdentityMap, IdentityType};
use crate::record::{NormalizedRecord, RecordNormalizer};
use crate::resources::ResourceLookup;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use time::Date;
use tracing::{debug, info, warn};

/// Which identity types a run converts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityTypeFilter {
    Persons,
    Organisations,
    #[default]
    Both,
}

impl IdentityTypeFilter {
    pub fn accepts(self, identity_type: IdentityType) -> bool {
        match self {
            IdentityTypeFilter::Persons => identity_type == IdentityType::PersonOrFiction,
            IdentityTypeFilter::Organisations => identity_type == IdentityType::Organisation,
            IdentityTypeFilter::Both => true,
        }
    }
}

/// Record timestamp a date window is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowBasis {
    Created,
    Modified,
}

/// Half-open window `[from, until)` over record creation or modification dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub basis: WindowBasis,
    pub from: Date,
    pub until: Option<Date>,
}

impl DateWindow {
    pub fn new(basis: WindowBasis, from: Date, until: Option<Date>) -> Result<Self> {
        if let Some(until) = until {
            if from >= until {
                return Err(ConversionError::InvalidDateWindow { from, until });
            }
        }
        Ok(Self { basis, from, until })
    }

    /// Whether the record's basis date falls inside the window.
    /// A record without that date is outside.
    pub fn contains(&self, record: &NormalizedRecord) -> bool {
        let date = match self.basis {
            WindowBasis::Created => record.created,
            WindowBasis::Modified => record.modified,
        };
        match date {
            Some(date) => date >= self.from && self.until.map_or(true, |until| date < until),
            None => false,
        }
    }
}

/// Requested scope of a conversion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// Identifiers to convert; `None` converts every record
    pub requested: Option<BTreeSet<String>>,
    pub window: Option<DateWindow>,
}

impl Scope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn requested<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            requested: Some(ids.into_iter().map(Into::into).collect()),
            window: None,
        }
    }

    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.window = Some(window);
        self
    }
}

/// Working identity map plus the scope bookkeeping later stages consult
#[derive(Debug, Clone, Default)]
pub struct IdentityGraph {
    pub identities: IdentityMap,
    /// In the map for relation resolution but outside the requested ids
    pub related_not_requested: BTreeSet<String>,
    /// Excluded at the source (deleted, pending or do-not-load)
    pub excluded: BTreeSet<String>,
    /// Withheld from submission; relations pointing here are dropped
    pub withheld: BTreeSet<String>,
    /// Outside the date window
    pub out_of_window: BTreeSet<String>,
    pub skipped_untyped: usize,
    pub dropped_unnamed: usize,
}

impl IdentityGraph {
    pub fn is_withheld(&self, identifier: &str) -> bool {
        self.withheld.contains(identifier)
    }

    pub fn withhold(&mut self, identifier: &str) {
        self.withheld.insert(identifier.to_string());
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

/// Creates one identity per usable normalized record
#[derive(Debug, Clone, Default)]
pub struct IdentityGraphBuilder {
    type_filter: IdentityTypeFilter,
}

impl IdentityGraphBuilder {
    pub fn new(type_filter: IdentityTypeFilter) -> Self {
        Self { type_filter }
    }

    /// Normalize raw records and build the graph from them
    pub fn build_with<N>(
        &self,
        normalizer: &N,
        raw_records: &[N::Raw],
        scope: &Scope,
        lookup: &dyn ResourceLookup,
    ) -> IdentityGraph
    where
        N: RecordNormalizer,
    {
        self.build(
            raw_records.iter().map(|raw| normalizer.normalize(raw)),
            scope,
            lookup,
        )
    }

    /// Build the graph from already normalized records
    pub fn build<I>(&self, records: I, scope: &Scope, lookup: &dyn ResourceLookup) -> IdentityGraph
    where
        I: IntoIterator<Item = NormalizedRecord>,
    {
        let mut graph = IdentityGraph::default();

        for record in records {
            let identifier = record.identifier.clone();
            let accepted = record
                .identity_type
                .is_some_and(|identity_type| self.type_filter.accepts(identity_type));
            if !accepted {
                debug!(identifier = %identifier, "record has no convertible identity type; skipped");
                graph.skipped_untyped += 1;
                continue;
            }
            if graph.identities.contains_key(&identifier) {
                warn!(identifier = %identifier, "duplicate record identifier; later record ignored");
                continue;
            }

            let exclusion = record.exclusion;
            let in_window = scope.window.map(|window| window.contains(&record));

            let Some(mut identity) = record.into_identity() else {
                warn!(identifier = %identifier, "primary name could not be parsed; record dropped");
                graph.dropped_unnamed += 1;
                continue;
            };

            let mut evidence = lookup.resources_for(&identifier);
            evidence.append(&mut identity.resources);
            identity.resources = evidence;

            if let Some(exclusion) = exclusion {
                debug!(identifier = %identifier, ?exclusion, "record excluded at source");
                identity.deletable = true;
                graph.excluded.insert(identifier.clone());
                if exclusion.withholds() {
                    graph.withheld.insert(identifier.clone());
                }
            }
            if let Some(requested) = &scope.requested {
                if !requested.contains(&identifier) {
                    identity.deletable = true;
                    graph.related_not_requested.insert(identifier.clone());
                }
            }
            if in_window == Some(false) {
                identity.deletable = true;
                graph.out_of_window.insert(identifier.clone());
            }

            graph.identities.insert(identifier, identity);
        }

        info!(
            identities = graph.identities.len(),
            skipped_untyped = graph.skipped_untyped,
            dropped_unnamed = graph.dropped_unnamed,
            withheld = graph.withheld.len(),
            "identity graph built"
        );
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Name, OrganisationName, PersonalName, Resource};
    use crate::record::SourceExclusion;
    use crate::resources::NoResources;
    use std::collections::BTreeMap;
    use time::macros::date;

    fn person(id: &str) -> NormalizedRecord {
        NormalizedRecord::new(
            id,
            IdentityType::PersonOrFiction,
            Name::Personal(PersonalName::new(format!("Surname {id}"), None)),
        )
    }

    fn organisation(id: &str) -> NormalizedRecord {
        NormalizedRecord::new(
            id,
            IdentityType::Organisation,
            Name::Organisation(OrganisationName::new(format!("Org {id}"))),
        )
    }

    #[test]
    fn test_untyped_and_unnamed_records() {
        let mut unnamed = person("2");
        unnamed.name = None;
        let untyped = NormalizedRecord {
            identifier: "3".to_string(),
            ..NormalizedRecord::default()
        };

        let graph = IdentityGraphBuilder::default().build(
            vec![person("1"), unnamed, untyped],
            &Scope::all(),
            &NoResources,
        );

        assert_eq!(graph.len(), 1);
        assert!(graph.identities.contains_key("1"));
        assert_eq!(graph.dropped_unnamed, 1);
        assert_eq!(graph.skipped_untyped, 1);
    }

    #[test]
    fn test_type_filter_skips_other_type() {
        let graph = IdentityGraphBuilder::new(IdentityTypeFilter::Organisations).build(
            vec![person("1"), organisation("2")],
            &Scope::all(),
            &NoResources,
        );
        assert_eq!(graph.identities.keys().collect::<Vec<_>>(), vec!["2"]);
        assert_eq!(graph.skipped_untyped, 1);
    }

    #[test]
    fn test_requested_scope_keeps_related_records() {
        let graph = IdentityGraphBuilder::default().build(
            vec![organisation("1"), organisation("2")],
            &Scope::requested(["1"]),
            &NoResources,
        );
        assert_eq!(graph.len(), 2);
        assert!(!graph.identities["1"].deletable);
        assert!(graph.identities["2"].deletable);
        assert!(graph.related_not_requested.contains("2"));
    }

    #[test]
    fn test_source_exclusions() {
        let mut deleted = person("1");
        deleted.exclusion = Some(SourceExclusion::Deleted);
        let mut do_not_load = person("2");
        do_not_load.exclusion = Some(SourceExclusion::DoNotLoad);

        let graph = IdentityGraphBuilder::default().build(
            vec![deleted, do_not_load],
            &Scope::all(),
            &NoResources,
        );
        assert!(graph.identities["1"].deletable);
        assert!(graph.identities["2"].deletable);
        assert!(!graph.is_withheld("1"));
        assert!(graph.is_withheld("2"));
        assert_eq!(graph.excluded.len(), 2);
    }

    #[test]
    fn test_date_window() {
        let window =
            DateWindow::new(WindowBasis::Modified, date!(2024 - 01 - 01), Some(date!(2024 - 02 - 01)))
                .unwrap();
        let mut inside = person("1");
        inside.modified = Some(date!(2024 - 01 - 15));
        let mut after = person("2");
        after.modified = Some(date!(2024 - 02 - 01));
        let undated = person("3");

        let graph = IdentityGraphBuilder::default().build(
            vec![inside, after, undated],
            &Scope::all().with_window(window),
            &NoResources,
        );
        assert_eq!(graph.len(), 3);
        assert!(!graph.out_of_window.contains("1"));
        assert!(graph.out_of_window.contains("2"));
        assert!(graph.out_of_window.contains("3"));
    }

    #[test]
    fn test_invalid_window_is_rejected() {
        let result = DateWindow::new(
            WindowBasis::Created,
            date!(2024 - 03 - 01),
            Some(date!(2024 - 01 - 01)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_lookup_evidence_precedes_inline_resources() {
        let mut record = person("1");
        record.resources.push(Resource::new("inline"));
        let mut lookup = BTreeMap::new();
        lookup.insert("1".to_string(), vec![Resource::new("catalogued")]);

        let graph = IdentityGraphBuilder::default().build(vec![record], &Scope::all(), &lookup);
        let titles: Vec<_> = graph.identities["1"]
            .resources
            .iter()
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(titles, vec!["catalogued", "inline"]);
    }

    #[test]
    fn test_duplicate_identifier_keeps_first() {
        let graph = IdentityGraphBuilder::default().build(
            vec![person("1"), organisation("1")],
            &Scope::all(),
            &NoResources,
        );
        assert_eq!(graph.len(), 1);
        assert_eq!(
            graph.identities["1"].identity_type,
            IdentityType::PersonOrFiction
        );
    }
}
