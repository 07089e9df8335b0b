//! # ISNI Convert
//!
//! Converts library authority records into registry identity records.
//!
//! The engine builds an identity graph from normalized authority records,
//! collapses organisations that are the same entity under successive names,
//! records registry identifiers known to belong to other identities, and
//! selects a bounded, ordered set of titles as supporting evidence. Registry
//! responses can then be reconciled back onto the local records.

pub mod builder;
pub mod clusters;
pub mod config;
pub mod error;
pub mod merger;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod record;
pub mod relations;
pub mod resources;
pub mod test_support;
pub mod vocabulary;

// Re-export main types for convenience
pub use builder::{DateWindow, IdentityGraph, IdentityGraphBuilder, IdentityTypeFilter, Scope, WindowBasis};
pub use clusters::{ClusterMember, ClusterResolution, MergeCluster, MergeClusterResolver};
pub use config::{ConfigOverrides, ConverterConfig};
pub use error::ConversionError;
pub use merger::IdentityMerger;
pub use model::{Identity, IdentityMap, IdentityType, Name, RelatedName, Resource};
pub use pipeline::{Conversion, ConversionSummary, Pipeline};
pub use reconcile::{ReconciliationUpdate, RegistryOutcome, RegistryResponse};
pub use record::{NormalizedRecord, RecordNormalizer, SourceExclusion};
pub use relations::RelationNormalizer;
pub use resources::{NoResources, ResourceLookup, ResourceSelector};
pub use vocabulary::{RelationEncoder, TermTable, Vocabulary};

/// Main API for identity conversion
pub struct Converter {
    config: ConverterConfig,
    pipeline: Pipeline,
    encoder: Box<dyn RelationEncoder>,
}

impl Converter {
    /// Create a converter using the vocabulary files named in `config`
    pub fn new(config: ConverterConfig) -> anyhow::Result<Self> {
        let vocabularies = config.load_vocabularies()?;
        Self::with_encoder(config, vocabularies)
    }

    /// Create a converter with a custom relation encoder.
    pub fn with_encoder<E>(config: ConverterConfig, encoder: E) -> anyhow::Result<Self>
    where
        E: RelationEncoder + 'static,
    {
        config.validate()?;
        let pipeline = Pipeline::new(
            IdentityGraphBuilder::new(config.identity_types),
            MergeClusterResolver::new(config.merge_chain_identity_type),
            ResourceSelector::new(config.max_resources),
        );
        Ok(Self {
            config,
            pipeline,
            encoder: Box::new(encoder),
        })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert one batch of normalized records
    pub fn convert<I>(
        &self,
        records: I,
        scope: &Scope,
        lookup: &dyn ResourceLookup,
    ) -> anyhow::Result<Conversion>
    where
        I: IntoIterator<Item = NormalizedRecord>,
    {
        let conversion = self
            .pipeline
            .run(records, scope, lookup, self.encoder.as_ref())?;
        Ok(conversion)
    }

    /// Normalize raw records with `normalizer`, then convert them
    pub fn convert_raw<N>(
        &self,
        normalizer: &N,
        raw_records: &[N::Raw],
        scope: &Scope,
        lookup: &dyn ResourceLookup,
    ) -> anyhow::Result<Conversion>
    where
        N: RecordNormalizer,
    {
        self.convert(
            raw_records.iter().map(|raw| normalizer.normalize(raw)),
            scope,
            lookup,
        )
    }

    /// Reconcile registry responses against a finished conversion
    pub fn reconcile(
        &self,
        conversion: &Conversion,
        responses: &[RegistryResponse],
    ) -> Vec<ReconciliationUpdate> {
        reconcile::reconcile(conversion, responses)
    }
}
