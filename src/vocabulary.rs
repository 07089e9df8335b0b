//! # Vocabulary Module
//!
//! Controlled vocabularies for relation types. Raw relation labels from the
//! authority data are encoded into registry terms before emission.

use crate::error::{ConversionError, Result};
use crate::model::IdentityType;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Label used when a relation type cannot be encoded
pub const UNDEFINED_RELATION: &str = "undefined or unknown";

/// Named vocabulary a term is encoded against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Vocabulary {
    PersonRelations,
    OrganisationRelations,
}

impl Vocabulary {
    /// Relation vocabulary for relations owned by an identity of the given type
    pub fn relations_for(identity_type: IdentityType) -> Self {
        match identity_type {
            IdentityType::PersonOrFiction => Vocabulary::PersonRelations,
            IdentityType::Organisation => Vocabulary::OrganisationRelations,
        }
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vocabulary::PersonRelations => write!(f, "person relation types"),
            Vocabulary::OrganisationRelations => write!(f, "organisation relation types"),
        }
    }
}

/// Maps free-text terms to controlled vocabulary codes.
///
/// `Ok(None)` means the term is unencodable. `Err` is reserved for a lookup
/// that cannot be trusted at all, such as a vocabulary that was never loaded.
pub trait RelationEncoder {
    fn encode(&self, term: &str, vocabulary: Vocabulary) -> Result<Option<String>>;
}

/// In-memory vocabulary tables loaded from `term;code` files
#[derive(Debug, Clone, Default)]
pub struct TermTable {
    tables: HashMap<Vocabulary, HashMap<String, String>>,
}

impl TermTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `term;code` lines into the given vocabulary.
    ///
    /// Blank lines and lines starting with `#` are ignored. Only the first `;`
    /// separates term from code.
    pub fn load_str(&mut self, vocabulary: Vocabulary, content: &str) -> Result<usize> {
        let table = self.tables.entry(vocabulary).or_default();
        let mut loaded = 0;
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((term, code)) = line.split_once(';') else {
                return Err(ConversionError::MalformedVocabulary {
                    vocabulary,
                    line: index + 1,
                    content: line.to_string(),
                });
            };
            table.insert(term.trim().to_string(), code.trim().to_string());
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Load a vocabulary file from disk
    pub fn load_file(&mut self, vocabulary: Vocabulary, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path).map_err(|source| ConversionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load_str(vocabulary, &content)
    }

    /// Add a single mapping
    pub fn insert(&mut self, vocabulary: Vocabulary, term: &str, code: &str) {
        self.tables
            .entry(vocabulary)
            .or_default()
            .insert(term.to_string(), code.to_string());
    }

    pub fn is_loaded(&self, vocabulary: Vocabulary) -> bool {
        self.tables.contains_key(&vocabulary)
    }
}

impl RelationEncoder for TermTable {
    fn encode(&self, term: &str, vocabulary: Vocabulary) -> Result<Option<String>> {
        let table = self
            .tables
            .get(&vocabulary)
            .ok_or(ConversionError::MissingVocabulary { vocabulary })?;
        Ok(table.get(term).cloned())
    }
}
