//! Implicit namespace tree over resource paths.
//!
//! There are no parent/child links. Nodes live in an arena addressed by
//! [`NodeId`] and are indexed by name; ancestry is recomputed from the path.
//! A node is materialized iff its reference count (explicit locks at or below
//! it) is positive.

use super::types::LockDetails;
use crate::path::{ancestors, walk_to_root};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::ops::ControlFlow;

/// Stable handle to an arena slot.
///
/// The generation changes whenever the slot is freed, so a handle to a
/// removed node never resolves to a node later stored in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId {
    index: usize,
    generation: u64,
}

/// One materialized resource path.
#[derive(Debug)]
pub(super) struct LockNode {
    /// `details.root` always equals the node's name, even for anchor nodes.
    pub details: LockDetails,

    /// `None` means the node only anchors descendant reference counts.
    pub token: Option<String>,

    /// Number of self-or-descendant explicit locks.
    pub ref_count: usize,

    /// Absolute expiry, for finite-duration locks only.
    pub expiry: Option<DateTime<Utc>>,

    /// Whether the lock is claimed by an in-flight confirm.
    pub held: bool,
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    node: Option<LockNode>,
}

#[derive(Debug, Default)]
pub(super) struct Namespace {
    slots: Vec<Slot>,
    free: Vec<usize>,
    by_name: HashMap<String, NodeId>,
}

impl Namespace {
    pub fn get(&self, id: NodeId) -> Option<&LockNode> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut LockNode> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Node materialized at exactly `name`.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    fn node_at(&self, name: &str) -> Option<&LockNode> {
        self.find(name).and_then(|id| self.get(id))
    }

    /// Number of materialized nodes, anchors included.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether a lock rooted at `root` is compatible with every existing lock.
    ///
    /// The target must not already be locked, and must have no locked
    /// descendants if the new lock is infinite. No ancestor may hold an
    /// infinite-depth lock.
    pub fn can_create(&self, root: &str, zero_depth: bool) -> bool {
        walk_to_root(root, |level, first| {
            let Some(node) = self.node_at(level) else {
                return ControlFlow::Continue(());
            };
            if first {
                // The node existing at all means a descendant is locked.
                if node.token.is_some() || !zero_depth {
                    return ControlFlow::Break(());
                }
            } else if node.token.is_some() && !node.details.zero_depth {
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        })
        .is_continue()
    }

    /// Materialize `root` and its ancestors, bumping each reference count.
    pub fn create(&mut self, root: &str) -> NodeId {
        let target = self.retain(root);
        for level in ancestors(root).skip(1) {
            self.retain(level);
        }
        target
    }

    /// Drop one reference from `root` and each ancestor, freeing nodes that
    /// reach zero.
    pub fn release_chain(&mut self, root: &str) {
        let _ = walk_to_root(root, |level, _| {
            if let Some(id) = self.find(level) {
                let dropped = match self.get_mut(id) {
                    Some(node) => {
                        node.ref_count = node.ref_count.saturating_sub(1);
                        node.ref_count == 0
                    }
                    None => true,
                };
                if dropped {
                    self.by_name.remove(level);
                    self.free_slot(id);
                }
            }
            ControlFlow::Continue(())
        });
    }

    fn retain(&mut self, name: &str) -> NodeId {
        if let Some(id) = self.find(name)
            && let Some(node) = self.get_mut(id)
        {
            node.ref_count += 1;
            return id;
        }

        let id = self.alloc(LockNode {
            details: LockDetails::anchor(name),
            token: None,
            ref_count: 1,
            expiry: None,
            held: false,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    fn alloc(&mut self, node: LockNode) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }

        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    fn free_slot(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.index)
            && slot.generation == id.generation
        {
            slot.node = None;
            slot.generation += 1;
            self.free.push(id.index);
        }
    }
}
