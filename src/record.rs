//! # Normalized Records
//!
//! The shape produced by a record normalizer for one raw authority record.
//! Decoding the bibliographic formats themselves happens outside this crate.

use crate::model::{
    Identity, IdentityDates, IdentityType, Name, OtherIdentifier, RelatedName, Resource,
};
use serde::{Deserialize, Serialize};
use time::Date;

/// Reason a record is excluded from submission at the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceExclusion {
    /// Test or deleted record, or a record that does not describe an entity
    Deleted,
    /// A registry request for the record is already in progress
    Pending,
    /// Explicitly annotated as not to be loaded into the registry
    DoNotLoad,
}

impl SourceExclusion {
    /// Whether relations pointing at the record must be dropped and merge
    /// clusters must treat it as withheld
    pub fn withholds(self) -> bool {
        matches!(self, SourceExclusion::DoNotLoad)
    }
}

/// One authority record converted into identity-shaped data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizedRecord {
    pub identifier: String,
    /// `None` when the record carries neither identity type marker
    pub identity_type: Option<IdentityType>,
    /// `None` when the primary name could not be parsed
    pub name: Option<Name>,
    pub name_variants: Vec<Name>,
    pub related_names: Vec<RelatedName>,
    pub dates: Option<IdentityDates>,
    pub language_codes: Vec<String>,
    pub country_codes: Vec<String>,
    pub uris: Vec<String>,
    pub other_identifiers: Vec<OtherIdentifier>,
    pub organisation_type: Option<String>,
    pub external_identifier: Option<String>,
    /// Evidence attached to the authority record itself
    pub resources: Vec<Resource>,
    pub created: Option<Date>,
    pub modified: Option<Date>,
    pub exclusion: Option<SourceExclusion>,
    pub issues: Vec<String>,
}

impl NormalizedRecord {
    /// Create a record with an identifier, type and name
    pub fn new(identifier: impl Into<String>, identity_type: IdentityType, name: Name) -> Self {
        Self {
            identifier: identifier.into(),
            identity_type: Some(identity_type),
            name: Some(name),
            ..Self::default()
        }
    }

    /// Convert into an identity. Returns `None` when type or name is missing.
    pub fn into_identity(self) -> Option<Identity> {
        let identity_type = self.identity_type?;
        let name = self.name?;
        let mut identity = Identity::new(self.identifier, identity_type, name);
        identity.name_variants = self.name_variants;
        identity.related_names = self.related_names;
        identity.dates = self.dates;
        identity.language_codes = self.language_codes;
        identity.country_codes = self.country_codes;
        identity.uris = self.uris;
        identity.other_identifiers = self.other_identifiers;
        identity.organisation_type = self.organisation_type;
        identity.external_identifier = self.external_identifier;
        identity.resources = self.resources;
        identity.issues = self.issues;
        Some(identity)
    }
}

/// Converts one raw authority record into a normalized record
pub trait RecordNormalizer {
    type Raw;

    fn normalize(&self, raw: &Self::Raw) -> NormalizedRecord;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrganisationName;

    #[test]
    fn test_into_identity_requires_type_and_name() {
        let mut record = NormalizedRecord {
            identifier: "000123".to_string(),
            ..NormalizedRecord::default()
        };
        assert!(record.clone().into_identity().is_none());

        record.identity_type = Some(IdentityType::Organisation);
        assert!(record.clone().into_identity().is_none());

        record.name = Some(Name::Organisation(OrganisationName::new("Yleisradio")));
        record.external_identifier = Some("0000000121034235".to_string());
        let identity = record.into_identity().unwrap();
        assert_eq!(identity.identifier, "000123");
        assert_eq!(
            identity.external_identifier.as_deref(),
            Some("0000000121034235")
        );
    }

    #[test]
    fn test_record_deserializes_with_defaults() {
        let json = r#"{
            "identifier": "000042",
            "identity_type": "personOrFiction",
            "name": {"personal": {"surname": "Kivi", "forename": "Aleksis"}},
            "modified": "2023-05-04",
            "exclusion": "do-not-load"
        }"#;
        let record: NormalizedRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.identity_type, Some(IdentityType::PersonOrFiction));
        assert_eq!(record.exclusion, Some(SourceExclusion::DoNotLoad));
        assert_eq!(
            record.modified,
            Some(time::macros::date!(2023 - 05 - 04))
        );
        assert!(record.related_names.is_empty());
    }
}
