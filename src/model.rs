//! # Data Model
//!
//! Core data structures for identity conversion: identities, their names and
//! relations, and the bibliographic resources that support them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The working map of identities keyed by local identifier.
pub type IdentityMap = BTreeMap<String, Identity>;

/// Kind of real-world entity an identity describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentityType {
    PersonOrFiction,
    Organisation,
}

impl fmt::Display for IdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityType::PersonOrFiction => write!(f, "personOrFiction"),
            IdentityType::Organisation => write!(f, "organisation"),
        }
    }
}

/// Structured name of a person or fictional character
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalName {
    pub name_use: Option<String>,
    pub surname: Option<String>,
    pub forename: Option<String>,
    pub numeration: Option<String>,
    pub name_title: Option<String>,
}

impl PersonalName {
    /// Create a name from surname and forename
    pub fn new(surname: impl Into<String>, forename: Option<&str>) -> Self {
        Self {
            surname: Some(surname.into()),
            forename: forename.map(str::to_string),
            ..Self::default()
        }
    }
}

/// Structured name of an organisation
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganisationName {
    pub main_name: String,
    pub subdivision_name: Vec<String>,
}

impl OrganisationName {
    /// Create a name without subdivisions
    pub fn new(main_name: impl Into<String>) -> Self {
        Self {
            main_name: main_name.into(),
            subdivision_name: Vec::new(),
        }
    }
}

/// A name of either identity type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Name {
    Personal(PersonalName),
    Organisation(OrganisationName),
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Personal(name) => {
                let surname = name.surname.as_deref().unwrap_or_default();
                match name.forename.as_deref() {
                    Some(forename) => write!(f, "{}, {}", surname, forename),
                    None => write!(f, "{}", surname),
                }
            }
            Name::Organisation(name) => {
                write!(f, "{}", name.main_name)?;
                for subdivision in &name.subdivision_name {
                    write!(f, ". {}", subdivision)?;
                }
                Ok(())
            }
        }
    }
}

/// Dates of existence or activity. Persons and organisations use disjoint fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentityDates {
    Person {
        birth_date: Option<String>,
        death_date: Option<String>,
        date_type: Option<String>,
    },
    Organisation {
        usage_date_from: Option<String>,
        usage_date_to: Option<String>,
    },
}

/// An identifier of the identity in some other scheme (VIAF, ORCID, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OtherIdentifier {
    #[serde(rename = "type")]
    pub id_type: String,
    pub value: String,
}

impl OtherIdentifier {
    pub fn new(id_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id_type: id_type.into(),
            value: value.into(),
        }
    }
}

/// Directed edge from an identity to another identity or an inline name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedName {
    /// Declared type of the relation target
    pub identity_type: IdentityType,
    /// Raw relation label; replaced by the encoded term during normalization
    pub relation_type: Option<String>,
    /// Local identifier of the target record, when the relation links one
    pub target_identifier: Option<String>,
    /// Inline name of the target
    pub name: Option<Name>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Registry identifier copied from the resolved target
    pub external_identifier: Option<String>,
}

impl RelatedName {
    /// Create a relation pointing at another local record
    pub fn linked(
        identity_type: IdentityType,
        relation_type: impl Into<String>,
        target_identifier: impl Into<String>,
    ) -> Self {
        Self {
            identity_type,
            relation_type: Some(relation_type.into()),
            target_identifier: Some(target_identifier.into()),
            name: None,
            start_date: None,
            end_date: None,
            external_identifier: None,
        }
    }

    /// Create a relation to a name that has no record of its own
    pub fn inline(identity_type: IdentityType, relation_type: Option<&str>, name: Name) -> Self {
        Self {
            identity_type,
            relation_type: relation_type.map(str::to_string),
            target_identifier: None,
            name: Some(name),
            start_date: None,
            end_date: None,
            external_identifier: None,
        }
    }

    pub fn targets(&self, identifier: &str) -> bool {
        self.target_identifier.as_deref() == Some(identifier)
    }
}

/// A title of work supporting an identity's authorship or contribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    pub title: String,
    pub creation_class: Option<String>,
    /// Function code of the identity in the work (e.g. "aut")
    pub creation_role: Option<String>,
    /// Position of the identity in the work: author, contributor or subject
    pub role: Option<String>,
    pub publisher: Option<String>,
    pub date: Option<String>,
    pub language: Option<String>,
    pub identifiers: BTreeMap<String, Vec<String>>,
    pub relevance: u32,
}

impl Default for Resource {
    fn default() -> Self {
        Self {
            title: String::new(),
            creation_class: None,
            creation_role: None,
            role: None,
            publisher: None,
            date: None,
            language: None,
            identifiers: BTreeMap::new(),
            relevance: 1,
        }
    }
}

impl Resource {
    /// Create a resource with only a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn with_publisher(mut self, publisher: &str) -> Self {
        self.publisher = Some(publisher.to_string());
        self
    }

    /// Drop edition-specific metadata, leaving a bare title
    pub fn clear_edition(&mut self) {
        self.creation_class = None;
        self.publisher = None;
        self.date = None;
        self.creation_role = None;
    }
}

/// One person, fictional character or organisation as known to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Local identifier, the key in the identity map
    pub identifier: String,
    pub identity_type: IdentityType,
    pub name: Name,
    pub name_variants: Vec<Name>,
    pub related_names: Vec<RelatedName>,
    pub dates: Option<IdentityDates>,
    pub language_codes: Vec<String>,
    pub country_codes: Vec<String>,
    pub uris: Vec<String>,
    pub other_identifiers: Vec<OtherIdentifier>,
    pub organisation_type: Option<String>,
    /// Identifier previously assigned by the registry
    pub external_identifier: Option<String>,
    /// Registry identifiers known to belong to other identities
    pub is_not: BTreeSet<String>,
    pub resources: Vec<Resource>,
    /// Data problems found while converting this identity
    pub issues: Vec<String>,
    #[serde(skip)]
    pub deletable: bool,
}

impl Identity {
    /// Create an identity with only the mandatory fields set
    pub fn new(identifier: impl Into<String>, identity_type: IdentityType, name: Name) -> Self {
        Self {
            identifier: identifier.into(),
            identity_type,
            name,
            name_variants: Vec::new(),
            related_names: Vec::new(),
            dates: None,
            language_codes: Vec::new(),
            country_codes: Vec::new(),
            uris: Vec::new(),
            other_identifiers: Vec::new(),
            organisation_type: None,
            external_identifier: None,
            is_not: BTreeSet::new(),
            resources: Vec::new(),
            issues: Vec::new(),
            deletable: false,
        }
    }

    pub fn is_organisation(&self) -> bool {
        self.identity_type == IdentityType::Organisation
    }

    /// Record a data problem on this identity
    pub fn add_issue(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }

    /// Remove organisation usage dates, keeping person dates untouched
    pub fn clear_usage_dates(&mut self) {
        if matches!(self.dates, Some(IdentityDates::Organisation { .. })) {
            self.dates = None;
        }
    }
}
