//! Merge and selection scenarios over the public API.
//!
//! Covers the behaviors a conversion must keep stable:
//!
//! 1. Shared registry identifiers between local identities withhold both,
//!    whether or not they are related
//! 2. A withheld predecessor is absorbed by its successor
//! 3. A withheld predecessor under another registry identifier is only
//!    recorded as distinct, never absorbed
//! 4. Duplicate titles fold into one bare entry
//! 5. Preferred languages sort first

use std::collections::BTreeSet;

use isni_convert_rs::resources::{apply_sort_pass, SortPass};
use isni_convert_rs::test_support::{organisation, superseded_by, supersedes, term_table, withheld};
use isni_convert_rs::{
    ConverterConfig, Converter, IdentityGraphBuilder, IdentityMerger, MergeClusterResolver,
    NoResources, Resource, ResourceSelector, Scope,
};

fn converter() -> Converter {
    Converter::with_encoder(ConverterConfig::default(), term_table()).unwrap()
}

#[test]
fn test_shared_identifier_withholds_both_members() {
    let mut o1 = organisation("O1", Some("ISNI-X"), &["Annual report"]);
    o1.related_names.push(supersedes("O2"));
    let o2 = organisation("O2", Some("ISNI-X"), &["Yearbook"]);

    let conversion = converter()
        .convert(vec![o1, o2], &Scope::all(), &NoResources)
        .unwrap();

    assert!(conversion.identities.is_empty());
    assert_eq!(conversion.summary.conflicting, 2);
    assert_eq!(conversion.summary.withheld, 2);
    assert_eq!(conversion.summary.merged, 0);
}

#[test]
fn test_unrelated_identities_sharing_identifier_are_not_emitted() {
    let o1 = organisation("O1", Some("ISNI-X"), &["Annual report"]);
    let o2 = organisation("O2", Some("ISNI-X"), &["Yearbook"]);
    let o3 = organisation("O3", Some("ISNI-Y"), &["Newsletter"]);

    let conversion = converter()
        .convert(vec![o1, o2, o3], &Scope::all(), &NoResources)
        .unwrap();

    let emitted: Vec<_> = conversion.identities.keys().map(String::as_str).collect();
    assert_eq!(emitted, vec!["O3"]);
    assert!(conversion.clusters.is_empty());
    assert_eq!(conversion.summary.conflicting, 2);
    assert_eq!(conversion.summary.withheld, 2);
}

#[test]
fn test_withheld_predecessor_is_absorbed() {
    let mut o1 = organisation("O1", Some("A"), &["Annual report"]);
    o1.related_names.push(supersedes("O2"));
    let mut o2 = withheld(organisation("O2", Some("A"), &["Yearbook"]));
    o2.related_names.push(superseded_by("O1"));

    let conversion = converter()
        .convert(vec![o1, o2], &Scope::all(), &NoResources)
        .unwrap();

    let cluster = &conversion.clusters[0];
    assert_eq!(
        cluster.member("O1").unwrap().merge_into,
        BTreeSet::from(["O2".to_string()])
    );

    let survivor = &conversion.identities["O1"];
    let titles: Vec<_> = survivor.resources.iter().map(|r| r.title.as_str()).collect();
    assert!(titles.contains(&"Yearbook"));
    assert!(survivor.related_names.iter().all(|r| !r.targets("O2")));
    assert!(!conversion.identities.contains_key("O2"));
    assert_eq!(conversion.summary.merged, 1);
    assert_eq!(
        conversion.cross_references["O1"],
        BTreeSet::from(["O2".to_string()])
    );
}

// Absorption requires equal registry identifiers. A withheld predecessor
// with a different one is only listed in the successor's isNot set, and the
// successor keeps its own resources.
#[test]
fn test_withheld_predecessor_with_other_identifier_is_not_absorbed() {
    let mut o1 = organisation("O1", Some("A"), &["Annual report"]);
    o1.related_names.push(supersedes("O2"));
    let o2 = withheld(organisation("O2", Some("B"), &["Yearbook"]));

    let conversion = converter()
        .convert(vec![o1, o2], &Scope::all(), &NoResources)
        .unwrap();

    assert!(conversion.clusters[0].member("O1").unwrap().merge_into.is_empty());
    let survivor = &conversion.identities["O1"];
    assert_eq!(survivor.is_not, BTreeSet::from(["B".to_string()]));
    assert_eq!(survivor.resources.len(), 1);
    assert!(survivor.related_names.is_empty());
}

#[test]
fn test_merge_twice_changes_nothing() {
    let mut o1 = organisation("O1", Some("A"), &["Annual report"]);
    o1.related_names.push(supersedes("O2"));
    let o2 = withheld(organisation("O2", Some("A"), &["Yearbook"]));

    let mut graph = IdentityGraphBuilder::default().build(vec![o1, o2], &Scope::all(), &NoResources);
    let resolution = MergeClusterResolver::default().resolve(&mut graph);
    let merger = IdentityMerger::new();

    merger.merge_all(&resolution, &mut graph);
    let collapsed = graph.identities.clone();
    merger.merge_all(&resolution, &mut graph);
    assert_eq!(graph.identities, collapsed);
}

#[test]
fn test_duplicate_titles_fold_into_bare_entry() {
    let resources = vec![
        Resource::new("X").with_date("1990"),
        Resource::new("X").with_date("1991"),
    ];
    let selected = ResourceSelector::new(10).select(resources, &[]);

    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].title, "X");
    assert_eq!(selected[0].relevance, 2);
    assert_eq!(selected[0].date, None);
}

#[test]
fn test_preferred_language_sorts_first() {
    let mut resources = vec![
        Resource::new("english").with_language("eng"),
        Resource::new("finnish").with_language("fin"),
    ];
    let preference = vec!["fin".to_string(), "swe".to_string()];
    apply_sort_pass(&mut resources, SortPass::Language, &preference);

    assert_eq!(resources[0].title, "finnish");
    assert_eq!(resources[1].title, "english");
}

#[test]
fn test_selected_resources_respect_invariants() {
    let resources: Vec<Resource> = (0..40)
        .map(|i| {
            let mut resource = Resource::new(format!("Title {}", i % 13))
                .with_role(["author", "contributor", "subject"][i % 3]);
            if i % 4 != 0 {
                resource.date = Some(format!("{}", 1990 + i));
            }
            resource
        })
        .collect();
    let selected = ResourceSelector::new(6).select(resources, &["fin".to_string()]);

    assert!(selected.len() <= 6);
    let titles: BTreeSet<_> = selected.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles.len(), selected.len());
    for pair in selected.windows(2) {
        if pair[0].role == pair[1].role {
            assert!(pair[0].relevance >= pair[1].relevance);
        }
    }
}
