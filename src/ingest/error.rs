/// Conditions that stop ingestion of a source for good.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum IngestError {
    /// The configured sort predicate held more than one value on the first
    /// subject, so no single sort key can be derived from it.
    #[error("sort predicate `{predicate}` is represented as a list, which cannot be used as a sort key")]
    SortPredicateIsList { predicate: String },
}
