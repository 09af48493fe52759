use std::hash::Hash;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, EntityTrait, FromQueryResult, IntoActiveModel, Value,
};

use crate::config::ClosureTableConfig;

/// Trait implemented by SeaORM `Model` types that participate in a
/// closure-table hierarchy.
///
/// The model carries a nullable parent reference; the companion edge entity
/// stores one `(ancestor, descendant, depth)` row per ancestor pair plus the
/// depth-0 self edge. Implementations are normally provided by the
/// `#[derive(ClosureTableModel)]` macro.
pub trait ClosureTableModel:
    Clone + Send + Sync + 'static + IntoActiveModel<Self::ActiveModel> + FromQueryResult
{
    type Entity: EntityTrait<Model = Self>;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity> + ActiveModelBehavior + Send;
    type Id: Clone + PartialEq + Eq + Hash + Send + Sync + 'static;

    type EdgeEntity: EntityTrait<Model = Self::EdgeModel>;
    type EdgeModel: Clone + Send + Sync + 'static + FromQueryResult;
    type EdgeActiveModel: ActiveModelTrait<Entity = Self::EdgeEntity> + ActiveModelBehavior + Send;

    fn closure_table_config() -> &'static ClosureTableConfig;

    fn id(&self) -> Self::Id;
    fn parent_id(&self) -> Option<Self::Id>;
    /// Copy of the model with its parent reference rewritten.
    fn with_parent(&self, parent: Option<Self::Id>) -> Self;
    fn id_to_value(id: &Self::Id) -> Value;
    fn parent_id_to_value(parent: Option<Self::Id>) -> Value;

    fn id_column() -> <Self::Entity as EntityTrait>::Column;
    fn parent_column() -> <Self::Entity as EntityTrait>::Column;
    /// Column storing an explicit nesting level, when the model has one.
    fn level_column() -> Option<<Self::Entity as EntityTrait>::Column>;

    fn edge_ancestor_column() -> <Self::EdgeEntity as EntityTrait>::Column;
    fn edge_descendant_column() -> <Self::EdgeEntity as EntityTrait>::Column;
    fn edge_depth_column() -> <Self::EdgeEntity as EntityTrait>::Column;

    fn edge_id_to_value(id: &Self::Id) -> Value;
    fn edge_model_ancestor(model: &Self::EdgeModel) -> Self::Id;
    fn edge_model_descendant(model: &Self::EdgeModel) -> Self::Id;
    fn edge_model_depth(model: &Self::EdgeModel) -> i32;
    fn edge_build_row(
        ancestor: Self::Id,
        descendant: Self::Id,
        depth: i32,
    ) -> Self::EdgeActiveModel;
}
