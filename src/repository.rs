use std::collections::HashSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder,
};

use crate::config::ClosureTableConfig;
use crate::error::ClosureTableError;
use crate::strategy::{ClosureMaintenance, SqlClosureMaintenance};
use crate::traits::ClosureTableModel;

/// Repository exposing the closure-table operations for a given model.
///
/// The repository keeps an explicit registry of node ids it has handed out
/// (or that were registered via [`track`](Self::track)); operations that take
/// a node refuse untracked instances before issuing any statement. A failed
/// structural mutation closes the repository, after which every operation
/// returns [`ClosureTableError::SessionClosed`] until a fresh repository is
/// constructed.
pub struct ClosureTableRepository<M>
where
    M: ClosureTableModel,
{
    pub(crate) strategy: Arc<dyn ClosureMaintenance<M>>,
    pub(crate) tracked: RwLock<HashSet<M::Id>>,
    pub(crate) closed: AtomicBool,
}

impl<M> ClosureTableRepository<M>
where
    M: ClosureTableModel,
{
    /// Repository with the default SQL closure-maintenance strategy.
    pub fn new() -> Self {
        Self::with_strategy(Arc::new(SqlClosureMaintenance::new()))
    }

    /// Repository with an injected closure-maintenance strategy.
    pub fn with_strategy(strategy: Arc<dyn ClosureMaintenance<M>>) -> Self {
        Self {
            strategy,
            tracked: RwLock::new(HashSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn config() -> &'static ClosureTableConfig {
        M::closure_table_config()
    }

    pub(crate) fn ensure_postgres(conn: &impl ConnectionTrait) -> Result<(), ClosureTableError> {
        if conn.get_database_backend() == DbBackend::Postgres {
            Ok(())
        } else {
            Err(ClosureTableError::UnsupportedBackend)
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<(), ClosureTableError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(ClosureTableError::SessionClosed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether a failed transaction has rendered this repository unusable.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Register an externally loaded model as tracked.
    pub fn track(&self, model: &M) {
        self.track_id(model.id());
    }

    pub fn is_tracked(&self, model: &M) -> bool {
        self.is_tracked_id(&model.id())
    }

    pub(crate) fn track_id(&self, id: M::Id) {
        self.tracked
            .write()
            .expect("tracked-node registry poisoned")
            .insert(id);
    }

    pub(crate) fn track_all(&self, models: &[M]) {
        let mut tracked = self
            .tracked
            .write()
            .expect("tracked-node registry poisoned");
        for model in models {
            tracked.insert(model.id());
        }
    }

    pub(crate) fn is_tracked_id(&self, id: &M::Id) -> bool {
        self.tracked
            .read()
            .expect("tracked-node registry poisoned")
            .contains(id)
    }

    pub(crate) fn untrack_id(&self, id: &M::Id) {
        self.tracked
            .write()
            .expect("tracked-node registry poisoned")
            .remove(id);
    }

    fn require_tracked(&self, model: &M) -> Result<(), ClosureTableError> {
        if self.is_tracked(model) {
            Ok(())
        } else {
            Err(ClosureTableError::UntrackedNode)
        }
    }

    /// All nodes whose parent reference is null, in natural storage order.
    pub async fn root_nodes(
        &self,
        conn: &DatabaseConnection,
    ) -> Result<Vec<M>, ClosureTableError> {
        Self::ensure_postgres(conn)?;
        self.ensure_open()?;
        let rows = M::Entity::find()
            .filter(M::parent_column().is_null())
            .all(conn)
            .await?;
        self.track_all(&rows);
        Ok(rows)
    }

    /// Count children of the given node.
    ///
    /// With no node: root count when `direct`, total node count otherwise.
    /// With a node: direct children via the parent column when `direct`, all
    /// proper descendants via the closure relation otherwise.
    pub async fn child_count(
        &self,
        conn: &DatabaseConnection,
        node: Option<&M>,
        direct: bool,
    ) -> Result<u64, ClosureTableError> {
        Self::ensure_postgres(conn)?;
        self.ensure_open()?;
        let count = match node {
            Some(node) => {
                self.require_tracked(node)?;
                let id = node.id();
                if direct {
                    M::Entity::find()
                        .filter(M::parent_column().eq(M::id_to_value(&id)))
                        .count(conn)
                        .await?
                } else {
                    M::EdgeEntity::find()
                        .filter(M::edge_ancestor_column().eq(M::edge_id_to_value(&id)))
                        .filter(M::edge_descendant_column().ne(M::edge_id_to_value(&id)))
                        .count(conn)
                        .await?
                }
            }
            None => {
                let mut query = M::Entity::find();
                if direct {
                    query = query.filter(M::parent_column().is_null());
                }
                query.count(conn).await?
            }
        };
        Ok(count)
    }

    /// Children of the given node, optionally sorted by `(field, direction)`.
    ///
    /// With no node: all nodes, or only roots when `direct`. With a node:
    /// depth-1 descendants when `direct`, all proper descendants otherwise,
    /// both resolved through the closure relation.
    pub async fn children(
        &self,
        conn: &DatabaseConnection,
        node: Option<&M>,
        direct: bool,
        sort: Option<(&str, &str)>,
    ) -> Result<Vec<M>, ClosureTableError> {
        Self::ensure_postgres(conn)?;
        self.ensure_open()?;
        let sort = sort.map(parse_sort::<M>).transpose()?;

        let rows = match node {
            Some(node) => {
                self.require_tracked(node)?;
                let id = node.id();
                let mut edges = M::EdgeEntity::find()
                    .filter(M::edge_ancestor_column().eq(M::edge_id_to_value(&id)));
                if direct {
                    edges = edges.filter(M::edge_depth_column().eq(1));
                } else {
                    edges = edges.filter(M::edge_descendant_column().ne(M::edge_id_to_value(&id)));
                }
                let edges = edges.all(conn).await?;

                let descendant_ids: Vec<M::Id> = edges
                    .iter()
                    .map(|edge| M::edge_model_descendant(edge))
                    .collect();
                if descendant_ids.is_empty() {
                    return Ok(Vec::new());
                }

                let values = descendant_ids
                    .iter()
                    .map(|id| M::id_to_value(id))
                    .collect::<Vec<_>>();
                let mut query = M::Entity::find().filter(M::id_column().is_in(values));
                if let Some((column, ref order)) = sort {
                    query = query.order_by(column, order.clone());
                }
                query.all(conn).await?
            }
            None => {
                let mut query = M::Entity::find();
                if direct {
                    query = query.filter(M::parent_column().is_null());
                }
                if let Some((column, ref order)) = sort {
                    query = query.order_by(column, order.clone());
                }
                query.all(conn).await?
            }
        };

        self.track_all(&rows);
        Ok(rows)
    }

    /// Ancestor path of the given node, root first, the node itself last.
    pub async fn path(
        &self,
        conn: &DatabaseConnection,
        node: &M,
    ) -> Result<Vec<M>, ClosureTableError> {
        Self::ensure_postgres(conn)?;
        self.ensure_open()?;
        self.require_tracked(node)?;
        let id = node.id();

        // Edges keyed by descendant, deepest ancestor first, end with the
        // depth-0 self edge; their ancestors are exactly the root-to-node path.
        let edges = M::EdgeEntity::find()
            .filter(M::edge_descendant_column().eq(M::edge_id_to_value(&id)))
            .order_by_desc(M::edge_depth_column())
            .all(conn)
            .await?;

        let ancestor_ids: Vec<M::Id> = edges
            .iter()
            .map(|edge| M::edge_model_ancestor(edge))
            .collect();
        if ancestor_ids.is_empty() {
            return Ok(Vec::new());
        }

        let values = ancestor_ids
            .iter()
            .map(|id| M::id_to_value(id))
            .collect::<Vec<_>>();
        let models = M::Entity::find()
            .filter(M::id_column().is_in(values))
            .all(conn)
            .await?;

        // The id fetch does not preserve closure ordering; restore it.
        let mut ordered = Vec::with_capacity(ancestor_ids.len());
        for ancestor_id in &ancestor_ids {
            let model = models
                .iter()
                .find(|model| &model.id() == ancestor_id)
                .cloned()
                .ok_or_else(|| {
                    ClosureTableError::invariant("closure edge references a missing node")
                })?;
            ordered.push(model);
        }

        self.track_all(&ordered);
        Ok(ordered)
    }
}

impl<M> Default for ClosureTableRepository<M>
where
    M: ClosureTableModel,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M> std::fmt::Debug for ClosureTableRepository<M>
where
    M: ClosureTableModel,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tracked = self
            .tracked
            .read()
            .map(|set| set.len())
            .unwrap_or_default();
        f.debug_struct("ClosureTableRepository")
            .field("entity", &Self::config().entity_name())
            .field("tracked", &tracked)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Validate a `(field, direction)` sort request against the model's columns.
pub(crate) fn parse_sort<M: ClosureTableModel>(
    (field, direction): (&str, &str),
) -> Result<(<M::Entity as EntityTrait>::Column, Order), ClosureTableError> {
    let invalid = || ClosureTableError::InvalidSort {
        field: field.to_string(),
        direction: direction.to_string(),
    };
    let order = parse_direction(direction).ok_or_else(invalid)?;
    let column = <M::Entity as EntityTrait>::Column::from_str(field).map_err(|_| invalid())?;
    Ok((column, order))
}

pub(crate) fn parse_direction(direction: &str) -> Option<Order> {
    match direction.to_ascii_lowercase().as_str() {
        "asc" => Some(Order::Asc),
        "desc" => Some(Order::Desc),
        _ => None,
    }
}
