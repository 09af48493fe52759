use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, DatabaseTransaction, EntityTrait, QueryFilter, Value,
};

use crate::error::ClosureTableError;
use crate::traits::ClosureTableModel;

/// Strategy that keeps the closure-edge relation consistent with the
/// parent-pointer representation.
///
/// [`update_node`](Self::update_node) is called once per reparented node,
/// inside the caller's transaction, after the node's persisted parent column
/// has been rewritten. The call must leave the closure relation consistent
/// with the node's current parent and is assumed idempotent; any error aborts
/// the surrounding transaction.
#[async_trait]
pub trait ClosureMaintenance<M>: Send + Sync
where
    M: ClosureTableModel,
{
    async fn update_node(
        &self,
        txn: &DatabaseTransaction,
        node: &M,
        former_parent: Option<M::Id>,
    ) -> Result<(), ClosureTableError>;
}

/// Default strategy: rewrites edges with set-oriented statements.
///
/// The subtree rooted at the node keeps its internal edges; every edge
/// entering the subtree from outside is dropped and rebuilt as the cross
/// product of the new parent's ancestor chain with the subtree.
#[derive(Debug, Default)]
pub struct SqlClosureMaintenance<M>
where
    M: ClosureTableModel,
{
    _marker: PhantomData<M>,
}

impl<M> SqlClosureMaintenance<M>
where
    M: ClosureTableModel,
{
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<M> ClosureMaintenance<M> for SqlClosureMaintenance<M>
where
    M: ClosureTableModel,
{
    async fn update_node(
        &self,
        txn: &DatabaseTransaction,
        node: &M,
        _former_parent: Option<M::Id>,
    ) -> Result<(), ClosureTableError> {
        let id = node.id();

        // Subtree rows, self edge included: (descendant, depth from node).
        let subtree = M::EdgeEntity::find()
            .filter(M::edge_ancestor_column().eq(M::edge_id_to_value(&id)))
            .all(txn)
            .await?;
        let members: Vec<(M::Id, i32)> = subtree
            .iter()
            .map(|edge| (M::edge_model_descendant(edge), M::edge_model_depth(edge)))
            .collect();
        let member_values: Vec<Value> = members
            .iter()
            .map(|(member_id, _)| M::edge_id_to_value(member_id))
            .collect();

        tracing::debug!(
            entity = M::closure_table_config().entity_name(),
            subtree = members.len(),
            "rewriting closure edges"
        );

        // Drop stale links from former ancestors into the subtree.
        M::EdgeEntity::delete_many()
            .filter(
                Condition::all()
                    .add(M::edge_descendant_column().is_in(member_values.clone()))
                    .add(M::edge_ancestor_column().is_not_in(member_values)),
            )
            .exec(txn)
            .await?;

        // Relink the subtree below the node's current parent chain.
        if let Some(parent_id) = node.parent_id() {
            let ancestors = M::EdgeEntity::find()
                .filter(M::edge_descendant_column().eq(M::edge_id_to_value(&parent_id)))
                .all(txn)
                .await?;

            let mut rows = Vec::with_capacity(ancestors.len() * members.len());
            for ancestor in &ancestors {
                let ancestor_id = M::edge_model_ancestor(ancestor);
                let ancestor_depth = M::edge_model_depth(ancestor);
                for (member_id, member_depth) in &members {
                    rows.push(M::edge_build_row(
                        ancestor_id.clone(),
                        member_id.clone(),
                        ancestor_depth + member_depth + 1,
                    ));
                }
            }

            if !rows.is_empty() {
                M::EdgeEntity::insert_many(rows).exec(txn).await?;
            }
        }

        Ok(())
    }
}
