//! # Resource Selection
//!
//! Deduplicates, orders and caps the titles of work that support an identity.
//!
//! Ordering is done with four sequential stable sorts (date, language,
//! relevance, role). The last pass dominates and earlier passes only break its
//! ties, so role is the primary key and date the weakest one.

use crate::model::Resource;
use hashbrown::HashMap;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Source of externally supplied resource evidence per identity
pub trait ResourceLookup {
    fn resources_for(&self, identifier: &str) -> Vec<Resource>;
}

impl ResourceLookup for BTreeMap<String, Vec<Resource>> {
    fn resources_for(&self, identifier: &str) -> Vec<Resource> {
        self.get(identifier).cloned().unwrap_or_default()
    }
}

impl ResourceLookup for std::collections::HashMap<String, Vec<Resource>> {
    fn resources_for(&self, identifier: &str) -> Vec<Resource> {
        self.get(identifier).cloned().unwrap_or_default()
    }
}

/// Lookup that never supplies evidence beyond what records carry inline
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResources;

impl ResourceLookup for NoResources {
    fn resources_for(&self, _identifier: &str) -> Vec<Resource> {
        Vec::new()
    }
}

/// Sort passes applied in order; the last one is the dominant key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortPass {
    Date,
    Language,
    Relevance,
    Role,
}

pub const SORT_PASSES: [SortPass; 4] = [
    SortPass::Date,
    SortPass::Language,
    SortPass::Relevance,
    SortPass::Role,
];

/// Selects a bounded, deduplicated, ordered list of resources
#[derive(Debug, Clone)]
pub struct ResourceSelector {
    max_resources: usize,
}

impl ResourceSelector {
    pub fn new(max_resources: usize) -> Self {
        Self { max_resources }
    }

    pub fn max_resources(&self) -> usize {
        self.max_resources
    }

    /// Deduplicate, sort and truncate `resources` for an identity whose
    /// preferred languages are `languages`
    pub fn select(&self, resources: Vec<Resource>, languages: &[String]) -> Vec<Resource> {
        let mut selected = dedup_titles(resources);
        sort_resources(&mut selected, languages);
        selected.truncate(self.max_resources);
        selected
    }
}

/// Fold resources with identical titles into the first occurrence.
///
/// The kept entry's relevance counts the folded editions, and its
/// edition-specific metadata is cleared when anything was folded.
pub fn dedup_titles(resources: Vec<Resource>) -> Vec<Resource> {
    let mut kept: Vec<Resource> = Vec::with_capacity(resources.len());
    let mut by_title: HashMap<String, usize> = HashMap::new();

    for mut resource in resources {
        match by_title.get(&resource.title) {
            Some(&index) => {
                let first = &mut kept[index];
                first.relevance += 1;
                first.clear_edition();
            }
            None => {
                resource.relevance = 1;
                by_title.insert(resource.title.clone(), kept.len());
                kept.push(resource);
            }
        }
    }

    kept
}

/// Apply every sort pass in order
pub fn sort_resources(resources: &mut [Resource], languages: &[String]) {
    for pass in SORT_PASSES {
        apply_sort_pass(resources, pass, languages);
    }
}

/// Apply one stable sort pass over the whole list
pub fn apply_sort_pass(resources: &mut [Resource], pass: SortPass, languages: &[String]) {
    match pass {
        SortPass::Date => resources.sort_by(|a, b| missing_last(&a.date, &b.date)),
        SortPass::Language => {
            let ranks = language_ranks(resources, languages);
            let missing = ranks.len();
            resources.sort_by_key(|resource| {
                resource
                    .language
                    .as_ref()
                    .and_then(|language| ranks.get(language).copied())
                    .unwrap_or(missing)
            });
        }
        SortPass::Relevance => resources.sort_by(|a, b| b.relevance.cmp(&a.relevance)),
        SortPass::Role => resources.sort_by(|a, b| missing_last(&a.role, &b.role)),
    }
}

/// Rank languages: preference list first, then the remaining languages found
/// in the data in alphabetical order
fn language_ranks(resources: &[Resource], languages: &[String]) -> HashMap<String, usize> {
    let mut ranks: HashMap<String, usize> = HashMap::new();
    for language in languages {
        let next = ranks.len();
        ranks.entry(language.clone()).or_insert(next);
    }

    let present: BTreeSet<&String> = resources
        .iter()
        .filter_map(|resource| resource.language.as_ref())
        .collect();
    for language in present {
        if !ranks.contains_key(language) {
            let next = ranks.len();
            ranks.insert(language.clone(), next);
        }
    }

    ranks
}

fn missing_last(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
