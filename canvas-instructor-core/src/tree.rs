//! Rebuilds the lesson hierarchy of a Canvas module.
//!
//! Canvas stores a module as a flat list of items carrying a `position` and an
//! `indent`. Curriculum authors use indent 0 for a lesson and deeper indents
//! for the material belonging to it, so the list folds into a two-level tree:
//! every indent-0 item opens a [`ModuleNode`] and collects the indented items
//! that follow it until the next indent-0 item.
//!
//! # Ordering
//! Items are sorted by `position` with a stable sort, so items sharing a
//! position keep the order the API returned them in.
//!
//! # Orphans
//! Indented items that appear before the first indent-0 item have no lesson to
//! belong to. They are left out of every node, logged, and kept available via
//! [`ModuleTree::orphans`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::canvas::ModuleItem;

/// Title prefix of the lessons that anchor the course schedule.
pub const BLOCK_PREFIX: &str = "Block";

/// A lesson and the items nested under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleNode {
    pub item: ModuleItem,
    pub children: Vec<ModuleItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleTree {
    nodes: Vec<ModuleNode>,
    orphans: Vec<ModuleItem>,
}

impl ModuleTree {
    pub fn build(mut items: Vec<ModuleItem>) -> Self {
        items.sort_by_key(|item| item.position);

        let mut nodes: Vec<ModuleNode> = Vec::new();
        let mut orphans = Vec::new();
        for item in items {
            if item.indent == 0 {
                nodes.push(ModuleNode {
                    item,
                    children: Vec::new(),
                });
                continue;
            }
            match nodes.last_mut() {
                Some(node) => node.children.push(item),
                None => orphans.push(item),
            }
        }

        if !orphans.is_empty() {
            let ids: Vec<u64> = orphans.iter().map(|item| item.id).collect();
            warn!(
                orphan_ids = ?ids,
                "Indented module items precede the first lesson and were left out of the tree"
            );
        }

        Self { nodes, orphans }
    }

    pub fn nodes(&self) -> &[ModuleNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<ModuleNode> {
        self.nodes
    }

    /// Indented items that had no preceding lesson.
    pub fn orphans(&self) -> &[ModuleItem] {
        &self.orphans
    }

    /// Anchor item of every lesson, in order.
    pub fn parents(&self) -> impl Iterator<Item = &ModuleItem> {
        self.nodes.iter().map(|node| &node.item)
    }

    /// Lessons whose title starts with [`BLOCK_PREFIX`].
    pub fn blocks(&self) -> impl Iterator<Item = &ModuleItem> {
        self.parents()
            .filter(|item| item.title.starts_with(BLOCK_PREFIX))
    }

    pub fn find(&self, lesson_id: u64) -> Option<&ModuleNode> {
        self.nodes.iter().find(|node| node.item.id == lesson_id)
    }
}
