use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter,
};

use crate::error::ClosureTableError;
use crate::lock::LockedTransaction;
use crate::repository::ClosureTableRepository;
use crate::traits::ClosureTableModel;

impl<M> ClosureTableRepository<M>
where
    M: ClosureTableModel,
{
    /// Remove `node` from the tree, reattaching its direct children to the
    /// node's former parent.
    ///
    /// Runs as one transaction: every child gets its parent column rewritten
    /// and its closure edges rebuilt through the maintenance strategy, then
    /// the node's edge rows and the node itself are deleted. On failure the
    /// transaction is rolled back, this repository is closed, and the cause
    /// is surfaced wrapped in [`ClosureTableError::TransactionFailed`]; a
    /// partially reparented tree is never left behind. On success the node is
    /// untracked and must not be passed to further operations.
    pub async fn remove_from_tree(
        &self,
        conn: &DatabaseConnection,
        node: &M,
    ) -> Result<(), ClosureTableError> {
        Self::ensure_postgres(conn)?;
        self.ensure_open()?;
        if !self.is_tracked(node) {
            return Err(ClosureTableError::UntrackedNode);
        }
        let node_id = node.id();
        let former_parent = node.parent_id();

        tracing::debug!(
            entity = Self::config().entity_name(),
            "removing node from tree"
        );

        let guard =
            LockedTransaction::acquire(Self::config().advisory_lock_strategy(), conn).await?;
        let outcome = self
            .reparent_children_and_delete(guard.connection(), &node_id, former_parent)
            .await;

        match outcome {
            Ok(()) => match guard.commit().await {
                Ok(()) => {
                    self.untrack_id(&node_id);
                    tracing::debug!(
                        entity = Self::config().entity_name(),
                        "node removed, children reattached"
                    );
                    Ok(())
                }
                Err(err) => {
                    self.close();
                    Err(ClosureTableError::TransactionFailed(Box::new(err)))
                }
            },
            Err(err) => {
                let _ = guard.rollback().await;
                self.close();
                tracing::debug!(
                    entity = Self::config().entity_name(),
                    error = %err,
                    "removal rolled back"
                );
                Err(ClosureTableError::TransactionFailed(Box::new(err)))
            }
        }
    }

    async fn reparent_children_and_delete(
        &self,
        txn: &DatabaseTransaction,
        node_id: &M::Id,
        former_parent: Option<M::Id>,
    ) -> Result<(), ClosureTableError> {
        let children = M::Entity::find()
            .filter(M::parent_column().eq(M::id_to_value(node_id)))
            .all(txn)
            .await?;

        for child in children {
            let child = child.with_parent(former_parent.clone());
            M::Entity::update_many()
                .col_expr(
                    M::parent_column(),
                    Expr::value(M::parent_id_to_value(former_parent.clone())),
                )
                .filter(M::id_column().eq(M::id_to_value(&child.id())))
                .exec(txn)
                .await?;
            self.strategy
                .update_node(txn, &child, Some(node_id.clone()))
                .await?;
        }

        // The node's edge rows leave together with the node; after the
        // children were relinked only its self edge and ancestor links remain.
        M::EdgeEntity::delete_many()
            .filter(
                Condition::any()
                    .add(M::edge_ancestor_column().eq(M::edge_id_to_value(node_id)))
                    .add(M::edge_descendant_column().eq(M::edge_id_to_value(node_id))),
            )
            .exec(txn)
            .await?;
        M::Entity::delete_many()
            .filter(M::id_column().eq(M::id_to_value(node_id)))
            .exec(txn)
            .await?;
        Ok(())
    }
}
