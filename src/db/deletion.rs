//! Deletion that honors each entity's [`DeletionPolicy`].
//!
//! Hard entities lose their rows. Soft entities get `deleted_at` stamped and
//! stay in place; rows already stamped are not counted again.

use crate::entities::{Deletable, DeletionPolicy};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityName, EntityTrait,
    QueryFilter,
};
use tracing::debug;

/// Deletes every row of `E` matching `condition` and returns how many rows changed.
pub async fn delete_where<E, C>(conn: &C, condition: Condition) -> Result<u64, DbErr>
where
    E: Deletable,
    C: ConnectionTrait,
{
    let rows = match E::POLICY {
        DeletionPolicy::Hard => {
            E::delete_many()
                .filter(condition)
                .exec(conn)
                .await?
                .rows_affected
        }
        DeletionPolicy::Soft => {
            let column = E::deleted_at_column().ok_or_else(|| {
                DbErr::Custom(format!(
                    "{} is soft-deletable but has no deleted_at column",
                    E::default().table_name()
                ))
            })?;

            E::update_many()
                .col_expr(column, Expr::value(Utc::now()))
                .filter(condition)
                .filter(column.is_null())
                .exec(conn)
                .await?
                .rows_affected
        }
    };

    debug!(
        table = E::default().table_name(),
        policy = ?E::POLICY,
        rows,
        "delete_where applied"
    );
    Ok(rows)
}
