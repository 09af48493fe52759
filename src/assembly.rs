use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::ClosureTableError;
use crate::hierarchy::HierarchyRow;

/// A node of the assembled tree: the node's column map plus its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub node: JsonValue,
    pub children: Vec<TreeNode>,
}

/// Arena record: children are stored as indices, so later rows can append
/// under any already-placed node without aliased mutable references.
struct Slot {
    node: JsonValue,
    children: Vec<usize>,
}

/// Assemble the flat, level-ordered rows of a subtree query into a nested
/// tree.
///
/// The first row's level marks the top of the requested subtree; rows at that
/// level are emitted top-level, every other row attaches under its
/// `parent_id`. The input contract is the ordering guarantee of
/// [`nodes_hierarchy`](crate::repository::ClosureTableRepository::nodes_hierarchy):
/// a parent's row arrives strictly before any of its children. Rows that
/// violate it fail with [`ClosureTableError::Assembly`] rather than
/// fabricating a root.
pub fn build_tree_array(rows: Vec<HierarchyRow>) -> Result<Vec<TreeNode>, ClosureTableError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let base_level = rows[0].level;
    let mut arena: Vec<Slot> = Vec::with_capacity(rows.len());
    let mut top_level: Vec<usize> = Vec::new();
    let mut placed: HashMap<String, usize> = HashMap::with_capacity(rows.len());

    for row in rows {
        let slot = arena.len();
        if row.level == base_level {
            top_level.push(slot);
        } else {
            let parent_id = row.parent_id.as_ref().ok_or_else(|| {
                ClosureTableError::assembly(format!(
                    "node {} at level {} has no parent reference",
                    row.id, row.level
                ))
            })?;
            let parent_slot = placed.get(&ref_key(parent_id)).copied().ok_or_else(|| {
                ClosureTableError::assembly(format!(
                    "parent {} of node {} not seen yet; rows must arrive level-ascending, parents first",
                    parent_id, row.id
                ))
            })?;
            arena[parent_slot].children.push(slot);
        }
        placed.insert(ref_key(&row.id), slot);
        arena.push(Slot {
            node: row.node,
            children: Vec::new(),
        });
    }

    materialize(arena, &top_level)
}

/// Children always occupy higher indices than their parent, so one reverse
/// sweep moves every subtree out of the arena bottom-up.
fn materialize(
    arena: Vec<Slot>,
    top_level: &[usize],
) -> Result<Vec<TreeNode>, ClosureTableError> {
    let mut slots: Vec<Option<Slot>> = arena.into_iter().map(Some).collect();
    let mut built: Vec<Option<TreeNode>> = slots.iter().map(|_| None).collect();

    for index in (0..slots.len()).rev() {
        let slot = slots[index]
            .take()
            .ok_or_else(|| ClosureTableError::invariant("arena slot visited twice"))?;
        let mut children = Vec::with_capacity(slot.children.len());
        for child in slot.children {
            children.push(built[child].take().ok_or_else(|| {
                ClosureTableError::invariant("arena child claimed by two parents")
            })?);
        }
        built[index] = Some(TreeNode {
            node: slot.node,
            children,
        });
    }

    let mut tree = Vec::with_capacity(top_level.len());
    for &root in top_level {
        tree.push(
            built[root]
                .take()
                .ok_or_else(|| ClosureTableError::invariant("top-level slot already consumed"))?,
        );
    }
    Ok(tree)
}

fn ref_key(id: &JsonValue) -> String {
    id.to_string()
}
