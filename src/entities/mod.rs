pub mod commerce;
pub mod notification_profile;

use sea_orm::EntityTrait;

/// How rows of an entity type are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPolicy {
    /// The row is physically deleted.
    Hard,
    /// The row is kept and its `deleted_at` column is stamped.
    Soft,
}

/// Deletion strategy declared per entity type.
///
/// Callers never pick hard vs soft deletion themselves; `db::deletion` reads the
/// policy from the entity.
pub trait Deletable: EntityTrait {
    const POLICY: DeletionPolicy;

    /// Timestamp column stamped on soft deletion. Required for `DeletionPolicy::Soft`.
    fn deleted_at_column() -> Option<Self::Column> {
        None
    }
}
