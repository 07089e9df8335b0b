use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use crate::model::{IdentityType, Name, OrganisationName, PersonalName, RelatedName, Resource};
use crate::record::{NormalizedRecord, SourceExclusion};
use crate::vocabulary::{TermTable, Vocabulary};

const ROLES: [&str; 3] = ["author", "contributor", "subject"];
const LANGUAGES: [&str; 4] = ["fin", "swe", "eng", "ger"];

pub fn person(id: &str, external_identifier: Option<&str>, titles: &[&str]) -> NormalizedRecord {
    let mut record = NormalizedRecord::new(
        id,
        IdentityType::PersonOrFiction,
        Name::Personal(PersonalName::new(format!("Surname{id}"), Some("Forename"))),
    );
    record.external_identifier = external_identifier.map(str::to_string);
    record.resources = titles
        .iter()
        .map(|title| Resource::new(*title).with_role("author"))
        .collect();
    record
}

pub fn organisation(
    id: &str,
    external_identifier: Option<&str>,
    titles: &[&str],
) -> NormalizedRecord {
    let mut record = NormalizedRecord::new(
        id,
        IdentityType::Organisation,
        Name::Organisation(OrganisationName::new(format!("Organisation {id}"))),
    );
    record.external_identifier = external_identifier.map(str::to_string);
    record.resources = titles
        .iter()
        .map(|title| Resource::new(*title).with_role("author"))
        .collect();
    record
}

/// Mark a record as not to be loaded into the registry
pub fn withheld(mut record: NormalizedRecord) -> NormalizedRecord {
    record.exclusion = Some(SourceExclusion::DoNotLoad);
    record
}

pub fn supersedes(target: &str) -> RelatedName {
    RelatedName::linked(IdentityType::Organisation, "supersedes", target)
}

pub fn superseded_by(target: &str) -> RelatedName {
    RelatedName::linked(IdentityType::Organisation, "isSupersededBy", target)
}

/// Vocabulary table covering the relation labels the generators produce
pub fn term_table() -> TermTable {
    let mut table = TermTable::new();
    for code in ["supersedes", "isSupersededBy", "isUnitOf"] {
        table.insert(Vocabulary::OrganisationRelations, code, code);
    }
    for code in ["isMemberOf", "pseud", "real name"] {
        table.insert(Vocabulary::PersonRelations, code, code);
    }
    table
}

#[derive(Debug, Clone)]
pub struct GeneratedDataset {
    pub records: Vec<NormalizedRecord>,
    /// Externally supplied resources keyed by record identifier
    pub resources: BTreeMap<String, Vec<Resource>>,
}

/// Generate a mixed dataset of persons and organisations.
///
/// Roughly one organisation in five supersedes its predecessor, which yields
/// merge clusters of two or more members. Titles repeat across records so
/// deduplication has work to do.
pub fn generate_dataset(count: u32, seed: u64) -> GeneratedDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(count as usize);
    let mut resources = BTreeMap::new();
    let mut previous_organisation: Option<String> = None;

    for i in 1..=count {
        let id = format!("{i:09}");
        let is_organisation = rng.random_bool(0.4);
        let external = rng
            .random_bool(0.3)
            .then(|| format!("0000000{:09}", rng.random_range(0..100_000_000u32)));

        let mut record = if is_organisation {
            organisation(&id, external.as_deref(), &[])
        } else {
            person(&id, external.as_deref(), &[])
        };
        record.language_codes = vec![LANGUAGES[rng.random_range(0..LANGUAGES.len())].to_string()];

        if is_organisation {
            if let Some(previous) = &previous_organisation {
                if rng.random_bool(0.2) {
                    record.related_names.push(supersedes(previous));
                }
            }
            if rng.random_bool(0.05) {
                record.exclusion = Some(SourceExclusion::DoNotLoad);
            }
            previous_organisation = Some(id.clone());
        }

        let title_count = rng.random_range(0..20usize);
        let evidence: Vec<Resource> = (0..title_count)
            .map(|_| {
                let mut resource = Resource::new(format!("Title {}", rng.random_range(0..50u32)))
                    .with_role(ROLES[rng.random_range(0..ROLES.len())])
                    .with_language(LANGUAGES[rng.random_range(0..LANGUAGES.len())]);
                if rng.random_bool(0.8) {
                    resource.date = Some(rng.random_range(1950u32..2025).to_string());
                }
                resource
            })
            .collect();
        resources.insert(id, evidence);
        records.push(record);
    }

    GeneratedDataset { records, resources }
}
