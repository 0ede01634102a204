//! Records that carry a stable, server-assigned identity.

/// A stored record whose identifier never changes after creation.
///
/// Every other field may be rewritten (tokens are replaced on each login),
/// but `id()` must return the same value for the whole life of the record.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
