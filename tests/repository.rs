mod common;

use std::collections::BTreeMap;

use closure_table::{ClosureTableError, ClosureTableRepository};
use common::entity::node;
use sea_orm::{DatabaseBackend, MockDatabase, Value};

fn repository() -> ClosureTableRepository<node::Model> {
    ClosureTableRepository::new()
}

#[tokio::test]
async fn root_nodes_returns_parentless_rows_and_tracks_them() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            common::node(1, None, "fruits"),
            common::node(5, None, "vegetables"),
        ]])
        .into_connection();
    let repo = repository();

    let roots = repo.root_nodes(&db).await.unwrap();

    let ids: Vec<i32> = roots.iter().map(|root| root.id).collect();
    assert_eq!(ids, vec![1, 5]);
    assert!(roots.iter().all(|root| repo.is_tracked(root)));
}

#[tokio::test]
async fn direct_children_resolve_through_depth_one_edges() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![common::edge(1, 2, 1), common::edge(1, 3, 1)]])
        .append_query_results([vec![
            common::node(2, Some(1), "citrus"),
            common::node(3, Some(1), "berries"),
        ]])
        .into_connection();
    let repo = repository();
    let root = common::node(1, None, "fruits");
    repo.track(&root);

    let children = repo.children(&db, Some(&root), true, None).await.unwrap();

    let ids: Vec<i32> = children.iter().map(|child| child.id).collect();
    assert_eq!(ids, vec![2, 3]);
    assert!(children.iter().all(|child| repo.is_tracked(child)));
}

#[tokio::test]
async fn all_descendants_accept_a_sort_request() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            common::edge(1, 2, 1),
            common::edge(1, 3, 1),
            common::edge(1, 4, 2),
        ]])
        .append_query_results([vec![
            common::node(4, Some(2), "lemon"),
            common::node(3, Some(1), "berries"),
            common::node(2, Some(1), "citrus"),
        ]])
        .into_connection();
    let repo = repository();
    let root = common::node(1, None, "fruits");
    repo.track(&root);

    let descendants = repo
        .children(&db, Some(&root), false, Some(("name", "desc")))
        .await
        .unwrap();

    assert_eq!(descendants.len(), 3);
}

#[tokio::test]
async fn children_without_descendant_edges_skip_the_node_fetch() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<common::entity::node_closure::Model>::new()])
        .into_connection();
    let repo = repository();
    let leaf = common::node(9, Some(1), "kumquat");
    repo.track(&leaf);

    let children = repo.children(&db, Some(&leaf), true, None).await.unwrap();

    assert!(children.is_empty());
}

#[tokio::test]
async fn unknown_sort_field_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let repo = repository();

    let err = repo
        .children(&db, None, false, Some(("nonexistent", "asc")))
        .await
        .unwrap_err();

    assert!(matches!(err, ClosureTableError::InvalidSort { .. }));
    assert!(err.is_invalid_argument());
}

#[tokio::test]
async fn unknown_sort_direction_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let repo = repository();

    let err = repo
        .children(&db, None, false, Some(("name", "sideways")))
        .await
        .unwrap_err();

    assert!(matches!(err, ClosureTableError::InvalidSort { .. }));
}

#[tokio::test]
async fn untracked_nodes_are_rejected_before_any_statement() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let repo = repository();
    let stranger = common::node(42, None, "unknown");

    let err = repo
        .child_count(&db, Some(&stranger), true)
        .await
        .unwrap_err();
    assert!(matches!(err, ClosureTableError::UntrackedNode));

    let err = repo.path(&db, &stranger).await.unwrap_err();
    assert!(matches!(err, ClosureTableError::UntrackedNode));

    assert!(db.into_transaction_log().is_empty());
}

#[tokio::test]
async fn child_count_without_a_node_counts_roots_or_everything() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![BTreeMap::from([("num_items", Value::from(2i64))])]])
        .append_query_results([vec![BTreeMap::from([("num_items", Value::from(7i64))])]])
        .into_connection();
    let repo = repository();

    assert_eq!(repo.child_count(&db, None, true).await.unwrap(), 2);
    assert_eq!(repo.child_count(&db, None, false).await.unwrap(), 7);
}

#[tokio::test]
async fn child_count_of_a_node_counts_children_or_descendants() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![BTreeMap::from([("num_items", Value::from(2i64))])]])
        .append_query_results([vec![BTreeMap::from([("num_items", Value::from(5i64))])]])
        .into_connection();
    let repo = repository();
    let root = common::node(1, None, "fruits");
    repo.track(&root);

    assert_eq!(repo.child_count(&db, Some(&root), true).await.unwrap(), 2);
    assert_eq!(repo.child_count(&db, Some(&root), false).await.unwrap(), 5);
}

#[tokio::test]
async fn path_is_ordered_root_first_regardless_of_fetch_order() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            common::edge(1, 4, 2),
            common::edge(3, 4, 1),
            common::edge(4, 4, 0),
        ]])
        .append_query_results([vec![
            common::node(4, Some(3), "lemon"),
            common::node(1, None, "fruits"),
            common::node(3, Some(1), "citrus"),
        ]])
        .into_connection();
    let repo = repository();
    let leaf = common::node(4, Some(3), "lemon");
    repo.track(&leaf);

    let path = repo.path(&db, &leaf).await.unwrap();

    let ids: Vec<i32> = path.iter().map(|step| step.id).collect();
    assert_eq!(ids, vec![1, 3, 4]);
}
