use sea_orm::sea_query::{Alias, Expr, JoinType, Order, Query};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, EntityName, EntityTrait, FromQueryResult, IdenStatic,
    Iterable,
};
use serde_json::Value as JsonValue;

use crate::error::ClosureTableError;
use crate::repository::{parse_sort, ClosureTableRepository};
use crate::traits::ClosureTableModel;

/// Result-map key carrying the edge's ancestor id.
pub const ANCESTOR_COLUMN: &str = "_ancestor";
/// Result-map key carrying the edge's descendant id.
pub const DESCENDANT_COLUMN: &str = "_descendant";
/// Result-map key carrying the edge's depth.
pub const DEPTH_COLUMN: &str = "_depth";
/// Result-map key carrying the descendant's immediate parent id.
pub const PARENT_ID_COLUMN: &str = "_parent_id";
/// Result-map key carrying the computed or stored nesting level.
pub const LEVEL_COLUMN: &str = "_level";

/// Options for [`ClosureTableRepository::nodes_hierarchy`].
#[derive(Debug, Clone, Default)]
pub struct HierarchyOptions {
    child_sort: Option<(String, String)>,
}

impl HierarchyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Secondary ordering applied to siblings, as `(field, direction)`.
    pub fn child_sort(
        mut self,
        field: impl Into<String>,
        direction: impl Into<String>,
    ) -> Self {
        self.child_sort = Some((field.into(), direction.into()));
        self
    }

    fn child_sort_ref(&self) -> Option<(&str, &str)> {
        self.child_sort
            .as_ref()
            .map(|(field, direction)| (field.as_str(), direction.as_str()))
    }
}

/// One row of a subtree query: the closure edge, the descendant node as a
/// JSON map, the descendant's immediate parent id and its nesting level.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyRow {
    pub ancestor: JsonValue,
    pub descendant: JsonValue,
    pub depth: i64,
    pub level: i64,
    pub parent_id: Option<JsonValue>,
    pub id: JsonValue,
    pub node: JsonValue,
}

impl<M> ClosureTableRepository<M>
where
    M: ClosureTableModel,
{
    /// Every descendant of `node` (the node itself included, through its
    /// depth-0 self edge) annotated with its immediate parent id and nesting
    /// level, ordered level-ascending so the rows feed straight into
    /// [`build_tree_array`](crate::assembly::build_tree_array).
    ///
    /// `direct` restricts the result to the node and its depth-1 children.
    /// The level is the model's stored level column when it has one,
    /// otherwise `MAX(depth) + 1` over all edges sharing the row's
    /// descendant. Read-only.
    pub async fn nodes_hierarchy(
        &self,
        conn: &DatabaseConnection,
        node: &M,
        direct: bool,
        options: &HierarchyOptions,
    ) -> Result<Vec<HierarchyRow>, ClosureTableError> {
        Self::ensure_postgres(conn)?;
        self.ensure_open()?;
        let config = Self::config();

        let edge = Alias::new("c");
        let descendant = Alias::new("node");
        let parent = Alias::new("p");

        let mut select = Query::select();
        select
            .from_as(Alias::new(config.edge_table()), edge.clone())
            .join_as(
                JoinType::InnerJoin,
                M::Entity::default().table_ref(),
                descendant.clone(),
                Expr::col((edge.clone(), M::edge_descendant_column()))
                    .equals((descendant.clone(), M::id_column())),
            )
            // The descendant's own parent row, not the closure ancestor.
            .join_as(
                JoinType::LeftJoin,
                M::Entity::default().table_ref(),
                parent.clone(),
                Expr::col((descendant.clone(), M::parent_column()))
                    .equals((parent.clone(), M::id_column())),
            );

        for column in <M::Entity as EntityTrait>::Column::iter() {
            select.column((descendant.clone(), column));
        }

        select
            .expr_as(
                Expr::col((edge.clone(), M::edge_ancestor_column())),
                Alias::new(ANCESTOR_COLUMN),
            )
            .expr_as(
                Expr::col((edge.clone(), M::edge_descendant_column())),
                Alias::new(DESCENDANT_COLUMN),
            )
            .expr_as(
                Expr::col((edge.clone(), M::edge_depth_column())),
                Alias::new(DEPTH_COLUMN),
            )
            .expr_as(
                Expr::col((parent.clone(), M::id_column())),
                Alias::new(PARENT_ID_COLUMN),
            );

        match M::level_column() {
            Some(level) => {
                select.expr_as(
                    Expr::col((descendant.clone(), level)),
                    Alias::new(LEVEL_COLUMN),
                );
            }
            None => {
                let subquery = format!(
                    r#"(SELECT MAX("c2"."{depth}") + 1 FROM "{table}" AS "c2" WHERE "c2"."{desc}" = "c"."{desc}")"#,
                    depth = M::edge_depth_column().as_str(),
                    table = config.edge_table(),
                    desc = M::edge_descendant_column().as_str(),
                );
                select.expr_as(Expr::cust(subquery), Alias::new(LEVEL_COLUMN));
            }
        }

        select.and_where(
            Expr::col((edge.clone(), M::edge_ancestor_column()))
                .eq(M::edge_id_to_value(&node.id())),
        );
        if direct {
            select.and_where(Expr::col((edge.clone(), M::edge_depth_column())).lte(1));
        }

        select.order_by(Alias::new(LEVEL_COLUMN), Order::Asc);
        if let Some(child_sort) = options.child_sort_ref() {
            let (column, order) = parse_sort::<M>(child_sort)?;
            select.order_by((descendant.clone(), column), order);
        }

        let statement = conn.get_database_backend().build(&select);
        let raw = JsonValue::find_by_statement(statement).all(conn).await?;

        raw.into_iter()
            .map(|row| parse_row(row, M::id_column().as_str()))
            .collect()
    }
}

fn parse_row(mut value: JsonValue, id_key: &str) -> Result<HierarchyRow, ClosureTableError> {
    let map = value
        .as_object_mut()
        .ok_or_else(|| ClosureTableError::invariant("hierarchy row is not an object"))?;

    let ancestor = map
        .remove(ANCESTOR_COLUMN)
        .ok_or_else(|| ClosureTableError::invariant("hierarchy row is missing the ancestor id"))?;
    let descendant = map.remove(DESCENDANT_COLUMN).ok_or_else(|| {
        ClosureTableError::invariant("hierarchy row is missing the descendant id")
    })?;
    let depth = map
        .remove(DEPTH_COLUMN)
        .and_then(|value| value.as_i64())
        .ok_or_else(|| ClosureTableError::invariant("hierarchy row is missing the edge depth"))?;
    let level = map
        .remove(LEVEL_COLUMN)
        .and_then(|value| value.as_i64())
        .ok_or_else(|| ClosureTableError::invariant("hierarchy row is missing the level"))?;
    let parent_id = map.remove(PARENT_ID_COLUMN).filter(|value| !value.is_null());
    let id = map
        .get(id_key)
        .cloned()
        .ok_or_else(|| ClosureTableError::invariant("hierarchy row is missing the node id"))?;

    Ok(HierarchyRow {
        ancestor,
        descendant,
        depth,
        level,
        parent_id,
        id,
        node: value,
    })
}
