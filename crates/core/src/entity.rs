//! Entity trait: identity + continuity across state changes.

use std::collections::BTreeMap;

/// Entity marker + minimal interface.
///
/// Storage backends key their tables on `Entity::Id`.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}

/// Key rows by id. A later row with the same id replaces an earlier one.
pub fn index_by_id<E, I>(rows: I) -> BTreeMap<E::Id, E>
where
    E: Entity,
    I: IntoIterator<Item = E>,
{
    rows.into_iter().map(|row| (row.id(), row)).collect()
}
