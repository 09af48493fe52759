#![allow(dead_code)]

pub mod entity {
    pub mod node {
        use closure_table::ClosureTableModelDerive as ClosureTableModel;
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel, ClosureTableModel)]
        #[sea_orm(table_name = "nodes")]
        #[closure_table(
            edge_module = "crate::common::entity::node_closure",
            edge_table = "node_closure"
        )]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub parent_id: Option<i32>,
            pub name: String,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod node_closure {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
        #[sea_orm(table_name = "node_closure")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub ancestor_id: i32,
            #[sea_orm(primary_key)]
            pub descendant_id: i32,
            pub depth: i32,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }
}

pub fn node(id: i32, parent_id: Option<i32>, name: &str) -> entity::node::Model {
    entity::node::Model {
        id,
        parent_id,
        name: name.to_string(),
    }
}

pub fn edge(ancestor_id: i32, descendant_id: i32, depth: i32) -> entity::node_closure::Model {
    entity::node_closure::Model {
        ancestor_id,
        descendant_id,
        depth,
    }
}
