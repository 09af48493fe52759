mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use closure_table::{ClosureMaintenance, ClosureTableError, ClosureTableRepository};
use common::entity::node;
use sea_orm::{DatabaseBackend, DatabaseTransaction, MockDatabase, MockExecResult};

/// Strategy stub recording `(node id, new parent, former parent)` per call,
/// optionally failing on the n-th call.
#[derive(Default)]
struct RecordingStrategy {
    calls: Mutex<Vec<(i32, Option<i32>, Option<i32>)>>,
    fail_at: Option<usize>,
}

impl RecordingStrategy {
    fn failing_at(call: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_at: Some(call),
        }
    }

    fn calls(&self) -> Vec<(i32, Option<i32>, Option<i32>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClosureMaintenance<node::Model> for RecordingStrategy {
    async fn update_node(
        &self,
        _txn: &DatabaseTransaction,
        node: &node::Model,
        former_parent: Option<i32>,
    ) -> Result<(), ClosureTableError> {
        let mut calls = self.calls.lock().unwrap();
        if self.fail_at == Some(calls.len()) {
            return Err(ClosureTableError::invariant("strategy failure injected"));
        }
        calls.push((node.id, node.parent_id, former_parent));
        Ok(())
    }
}

fn exec_ok() -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: 1,
    }
}

#[tokio::test]
async fn removal_reattaches_every_sibling_to_the_former_parent() {
    // fruits(1) -> citrus(2) -> {lemon(3), lime(4), orange(5)}
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            common::node(3, Some(2), "lemon"),
            common::node(4, Some(2), "lime"),
            common::node(5, Some(2), "orange"),
        ]])
        .append_exec_results(vec![exec_ok(); 7])
        .into_connection();
    let strategy = Arc::new(RecordingStrategy::default());
    let repo = ClosureTableRepository::with_strategy(strategy.clone());
    let citrus = common::node(2, Some(1), "citrus");
    repo.track(&citrus);

    repo.remove_from_tree(&db, &citrus).await.unwrap();

    assert!(!repo.is_tracked(&citrus));
    assert!(!repo.is_closed());
    assert_eq!(
        strategy.calls(),
        vec![
            (3, Some(1), Some(2)),
            (4, Some(1), Some(2)),
            (5, Some(1), Some(2)),
        ]
    );
}

#[tokio::test]
async fn removing_a_root_reattaches_children_as_roots() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![common::node(2, Some(1), "citrus")]])
        .append_exec_results(vec![exec_ok(); 5])
        .into_connection();
    let strategy = Arc::new(RecordingStrategy::default());
    let repo = ClosureTableRepository::with_strategy(strategy.clone());
    let root = common::node(1, None, "fruits");
    repo.track(&root);

    repo.remove_from_tree(&db, &root).await.unwrap();

    assert_eq!(strategy.calls(), vec![(2, None, Some(1))]);
}

#[tokio::test]
async fn strategy_failure_rolls_back_and_closes_the_session() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            common::node(3, Some(2), "lemon"),
            common::node(4, Some(2), "lime"),
            common::node(5, Some(2), "orange"),
        ]])
        .append_exec_results(vec![exec_ok(); 4])
        .into_connection();
    let strategy = Arc::new(RecordingStrategy::failing_at(1));
    let repo = ClosureTableRepository::with_strategy(strategy.clone());
    let citrus = common::node(2, Some(1), "citrus");
    repo.track(&citrus);

    let err = repo.remove_from_tree(&db, &citrus).await.unwrap_err();

    assert!(matches!(err, ClosureTableError::TransactionFailed(_)));
    // Only the first child was handed to the strategy before the failure.
    assert_eq!(strategy.calls(), vec![(3, Some(1), Some(2))]);
    // The node survives the aborted removal; the session does not.
    assert!(repo.is_tracked(&citrus));
    assert!(repo.is_closed());

    let err = repo.root_nodes(&db).await.unwrap_err();
    assert!(matches!(err, ClosureTableError::SessionClosed));
}

#[tokio::test]
async fn untracked_nodes_are_rejected_with_zero_writes() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let repo: ClosureTableRepository<node::Model> = ClosureTableRepository::new();
    let stranger = common::node(42, None, "unknown");

    let err = repo.remove_from_tree(&db, &stranger).await.unwrap_err();

    assert!(matches!(err, ClosureTableError::UntrackedNode));
    assert!(!repo.is_closed());
    assert!(db.into_transaction_log().is_empty());
}

#[tokio::test]
async fn default_strategy_rewrites_edges_inside_the_transaction() {
    // citrus(2, parent fruits=1) -> lemon(3); removing citrus relinks lemon
    // under fruits through the default SQL strategy.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // direct children of citrus
        .append_query_results([vec![common::node(3, Some(2), "lemon")]])
        // lemon's subtree edges (self edge only)
        .append_query_results([vec![common::edge(3, 3, 0)]])
        // ancestor chain of the new parent, fruits
        .append_query_results([vec![common::edge(1, 1, 0)]])
        // spare row in case the edge insert reads back its primary key
        .append_query_results([vec![common::edge(1, 3, 1)]])
        // advisory lock, parent update, stale-edge delete, edge insert,
        // node-edge delete, node delete, advisory unlock
        .append_exec_results(vec![exec_ok(); 7])
        .into_connection();
    let repo: ClosureTableRepository<node::Model> = ClosureTableRepository::new();
    let citrus = common::node(2, Some(1), "citrus");
    repo.track(&citrus);

    repo.remove_from_tree(&db, &citrus).await.unwrap();

    assert!(!repo.is_tracked(&citrus));
    assert!(!repo.is_closed());
}
