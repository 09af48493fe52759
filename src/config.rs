use crc32fast::Hasher;

/// Static configuration describing how a SeaORM model integrates with
/// its closure-edge relation.
#[derive(Clone, Debug)]
pub struct ClosureTableConfig {
    entity_name: String,
    edge_name: String,
    parent_column: String,
    level_column: Option<String>,
    edge_table: String,
    advisory_lock_strategy: AdvisoryLockStrategy,
}

impl ClosureTableConfig {
    /// Create a new configuration using the logical entity and edge names.
    pub fn new(entity_name: impl Into<String>, edge_name: impl Into<String>) -> Self {
        let entity_name = entity_name.into();
        let edge_name = edge_name.into();

        let default_lock =
            AdvisoryLockStrategy::Namespaced(AdvisoryLockKey::derived_from(&entity_name, &edge_name));

        Self {
            entity_name,
            edge_name,
            parent_column: "parent_id".to_string(),
            level_column: None,
            edge_table: String::new(),
            advisory_lock_strategy: default_lock,
        }
    }

    /// Merge options produced by [`ClosureTableOptions`].
    pub(crate) fn apply_options(mut self, options: ClosureTableOptions) -> Self {
        if let Some(parent_column) = options.parent_column {
            self.parent_column = parent_column;
        }
        if let Some(level_column) = options.level_column {
            self.level_column = Some(level_column);
        }
        if let Some(edge_table) = options.edge_table {
            self.edge_table = edge_table;
        }
        if let Some(strategy) = options.advisory_lock_strategy {
            self.advisory_lock_strategy = strategy;
        }
        self
    }

    /// Human-readable Rust struct name for the base entity.
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Associated SeaORM entity name for the closure-edge model.
    pub fn edge_name(&self) -> &str {
        &self.edge_name
    }

    /// Column name storing the parent foreign key.
    pub fn parent_column(&self) -> &str {
        &self.parent_column
    }

    /// Column name storing an explicit nesting level, if the model has one.
    pub fn level_column(&self) -> Option<&str> {
        self.level_column.as_deref()
    }

    /// Table backing the closure-edge entity.
    pub fn edge_table(&self) -> &str {
        &self.edge_table
    }

    /// Advisory lock strategy (PostgreSQL only).
    pub fn advisory_lock_strategy(&self) -> &AdvisoryLockStrategy {
        &self.advisory_lock_strategy
    }
}

/// Builder-style options consumed by the derive macro.
#[derive(Clone, Debug, Default)]
pub struct ClosureTableOptions {
    parent_column: Option<String>,
    level_column: Option<String>,
    edge_table: Option<String>,
    advisory_lock_strategy: Option<AdvisoryLockStrategy>,
}

impl ClosureTableOptions {
    pub fn parent_column(mut self, value: impl Into<String>) -> Self {
        self.parent_column = Some(value.into());
        self
    }

    pub fn level_column(mut self, value: impl Into<String>) -> Self {
        self.level_column = Some(value.into());
        self
    }

    pub fn edge_table(mut self, value: impl Into<String>) -> Self {
        self.edge_table = Some(value.into());
        self
    }

    pub fn advisory_lock_strategy(mut self, strategy: AdvisoryLockStrategy) -> Self {
        self.advisory_lock_strategy = Some(strategy);
        self
    }

    pub fn apply(self, base: ClosureTableConfig) -> ClosureTableConfig {
        base.apply_options(self)
    }
}

/// Key used for PostgreSQL advisory locks.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AdvisoryLockKey(String);

impl AdvisoryLockKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    fn derived_from(entity: &str, edge: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(entity.as_bytes());
        hasher.update(b"/");
        hasher.update(edge.as_bytes());
        let crc = hasher.finalize();
        Self(format!("closure-table::{entity}::{edge}::{crc:x}"))
    }
}

/// Configuration describing how to acquire advisory locks around
/// structural mutations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AdvisoryLockStrategy {
    Disabled,
    Namespaced(AdvisoryLockKey),
}

impl AdvisoryLockStrategy {
    pub fn key(&self) -> Option<&AdvisoryLockKey> {
        match self {
            AdvisoryLockStrategy::Disabled => None,
            AdvisoryLockStrategy::Namespaced(key) => Some(key),
        }
    }
}
