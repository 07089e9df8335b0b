//! Default constants for converter configuration.

use crate::model::IdentityType;

/// Environment variable prefix; nested keys are separated with `__`
/// (e.g. `ISNI_CONVERT_VOCABULARY__PERSON_RELATIONS`).
pub const ENV_PREFIX: &str = "ISNI_CONVERT_";

/// Maximum number of resources submitted per identity.
/// The registry accepts more, but a handful of titles is enough to match.
pub const DEFAULT_MAX_RESOURCES: usize = 10;

/// Declared relation target type followed past the first hop of a merge chain.
/// None keeps chains to the root's own relations.
pub const DEFAULT_MERGE_CHAIN_IDENTITY_TYPE: Option<IdentityType> = None;
