//! Arena-backed doubly linked list of extents
//!
//! Nodes live in a `Vec` of slots and are addressed by [`NodeHandle`]s
//! (slot index + generation). Removed slots go on a free-list and are reused;
//! the generation is bumped on every removal so a handle to a removed node is
//! rejected instead of silently resolving to whatever reuses the slot.
//!
//! Structural edits are O(1) given a handle. Keys are kept strictly
//! increasing from head to tail; see [`PositionKey`].

use crate::core::error::{CompactError, Result};
use crate::core::extent::Extent;
use crate::core::key::PositionKey;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Stable reference to a node inside an [`ExtentList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
struct Node {
    extent: Extent,
    key: PositionKey,
    prev: Option<NodeHandle>,
    next: Option<NodeHandle>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Ordered sequence of extents describing the whole disk
#[derive(Debug, Clone, Default)]
pub struct ExtentList {
    slots: Vec<Slot>,
    /// Indices of slots whose node was removed, reused LIFO
    vacant: Vec<u32>,
    head: Option<NodeHandle>,
    tail: Option<NodeHandle>,
    len: usize,
    renumbers: usize,
}

impl ExtentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ExtentList {
            slots: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Build a list from extents in order, without coalescing
    pub fn from_extents<I>(extents: I) -> Result<Self>
    where
        I: IntoIterator<Item = Extent>,
    {
        let mut list = ExtentList::new();
        for extent in extents {
            list.push_back(extent)?;
        }
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn head(&self) -> Option<NodeHandle> {
        self.head
    }

    pub fn tail(&self) -> Option<NodeHandle> {
        self.tail
    }

    /// How many times keys had to be renumbered to make room for an insert
    pub fn renumber_count(&self) -> usize {
        self.renumbers
    }

    /// Whether `handle` still refers to a live node
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.node(handle).is_ok()
    }

    pub fn extent(&self, handle: NodeHandle) -> Result<Extent> {
        Ok(self.node(handle)?.extent)
    }

    pub fn key(&self, handle: NodeHandle) -> Result<PositionKey> {
        Ok(self.node(handle)?.key)
    }

    pub fn next(&self, handle: NodeHandle) -> Result<Option<NodeHandle>> {
        Ok(self.node(handle)?.next)
    }

    pub fn prev(&self, handle: NodeHandle) -> Result<Option<NodeHandle>> {
        Ok(self.node(handle)?.prev)
    }

    /// True if `a` lies strictly before `b`
    pub fn is_before(&self, a: NodeHandle, b: NodeHandle) -> Result<bool> {
        Ok(self.key(a)? < self.key(b)?)
    }

    /// Replace the payload of a node in place
    pub fn set_extent(&mut self, handle: NodeHandle, extent: Extent) -> Result<()> {
        ensure_nonempty(&extent)?;
        self.node_mut(handle)?.extent = extent;
        Ok(())
    }

    /// Resize a node, keeping its kind and owner
    pub fn set_size(&mut self, handle: NodeHandle, size: u64) -> Result<()> {
        let extent = self.extent(handle)?;
        self.set_extent(handle, extent.with_size(size))
    }

    /// Append an extent after the tail, keyed on the next whole number
    pub fn push_back(&mut self, extent: Extent) -> Result<NodeHandle> {
        ensure_nonempty(&extent)?;
        let key = match self.tail {
            Some(tail) => PositionKey::from_index(self.key(tail)?.whole()),
            None => PositionKey::from_index(0),
        };
        let handle = self.allocate(Node {
            extent,
            key,
            prev: self.tail,
            next: None,
        })?;
        match self.tail {
            Some(tail) => self.node_mut(tail)?.next = Some(handle),
            None => self.head = Some(handle),
        }
        self.tail = Some(handle);
        self.len += 1;
        Ok(handle)
    }

    /// Create a node holding `extent` directly before `at`
    pub fn insert_before(&mut self, at: NodeHandle, extent: Extent) -> Result<NodeHandle> {
        ensure_nonempty(&extent)?;
        let key = match self.key_before(at)? {
            Some(key) => key,
            None => {
                self.renumber()?;
                self.key_before(at)?.ok_or_else(|| {
                    CompactError::invariant(format!("no key available before {at} after renumbering"))
                })?
            }
        };

        let prev = self.node(at)?.prev;
        let handle = self.allocate(Node {
            extent,
            key,
            prev,
            next: Some(at),
        })?;
        self.node_mut(at)?.prev = Some(handle);
        match prev {
            Some(prev) => self.node_mut(prev)?.next = Some(handle),
            None => self.head = Some(handle),
        }
        self.len += 1;
        Ok(handle)
    }

    /// Split a node into two adjacent nodes of the same kind
    ///
    /// The left part holds `at` units and is a new node; the right part keeps
    /// the original handle. Splitting a free node leaves two adjacent free
    /// nodes until the caller converts one of them.
    pub fn split(&mut self, handle: NodeHandle, at: u64) -> Result<(NodeHandle, NodeHandle)> {
        let extent = self.extent(handle)?;
        if at == 0 || at >= extent.size() {
            return Err(CompactError::invariant(format!(
                "cannot split {extent} at {at}"
            )));
        }
        let left = self.insert_before(handle, extent.with_size(at))?;
        self.set_extent(handle, extent.with_size(extent.size() - at))?;
        Ok((left, handle))
    }

    /// Absorb a free successor into a free node
    ///
    /// Returns whether a merge happened. Calling it on an occupied node, or a
    /// node whose successor is occupied or missing, does nothing.
    pub fn merge_adjacent_free(&mut self, handle: NodeHandle) -> Result<bool> {
        let node = self.node(handle)?;
        let (extent, next) = (node.extent, node.next);
        let Some(next) = next else {
            return Ok(false);
        };
        let Some(merged) = extent.coalesce(&self.extent(next)?) else {
            return Ok(false);
        };
        self.remove(next)?;
        self.node_mut(handle)?.extent = merged;
        Ok(true)
    }

    /// Merge a node with free neighbours on both sides
    ///
    /// Returns the handle that survives: the predecessor if it absorbed the
    /// node, the node itself otherwise.
    pub fn coalesce_around(&mut self, handle: NodeHandle) -> Result<NodeHandle> {
        self.merge_adjacent_free(handle)?;
        if let Some(prev) = self.prev(handle)? {
            if self.merge_adjacent_free(prev)? {
                return Ok(prev);
            }
        }
        Ok(handle)
    }

    /// Exchange the payloads of two equal-size nodes
    pub fn swap_contents(&mut self, a: NodeHandle, b: NodeHandle) -> Result<()> {
        let (ea, eb) = (self.extent(a)?, self.extent(b)?);
        if ea.size() != eb.size() {
            return Err(CompactError::invariant(format!(
                "cannot swap {ea} with {eb}: sizes differ"
            )));
        }
        self.node_mut(a)?.extent = eb;
        self.node_mut(b)?.extent = ea;
        Ok(())
    }

    /// Detach a node and reclaim its slot
    ///
    /// Free neighbours are not merged here; follow up with
    /// [`merge_adjacent_free`](Self::merge_adjacent_free) when needed.
    pub fn remove(&mut self, handle: NodeHandle) -> Result<Extent> {
        let node = self.node(handle)?;
        let (prev, next) = (node.prev, node.next);
        match prev {
            Some(prev) => self.node_mut(prev)?.next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.node_mut(next)?.prev = prev,
            None => self.tail = prev,
        }
        let node = self.release(handle)?;
        self.len -= 1;
        Ok(node.extent)
    }

    /// Iterate over `(handle, extent)` pairs from head to tail
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    pub fn extents(&self) -> Vec<Extent> {
        self.iter().map(|(_, extent)| extent).collect()
    }

    /// Total units across all extents
    pub fn total_units(&self) -> u64 {
        self.iter().map(|(_, extent)| extent.size()).sum()
    }

    pub fn free_units(&self) -> u64 {
        self.iter()
            .filter(|(_, extent)| extent.is_free())
            .map(|(_, extent)| extent.size())
            .sum()
    }

    /// Units held by each owner
    pub fn owner_census(&self) -> BTreeMap<u64, u64> {
        let mut census = BTreeMap::new();
        for (_, extent) in self.iter() {
            if let Extent::Occupied { owner, size } = extent {
                *census.entry(owner).or_insert(0) += size;
            }
        }
        census
    }

    /// Audit every structural invariant of the list
    pub fn verify(&self) -> Result<()> {
        let mut count = 0usize;
        let mut prev: Option<NodeHandle> = None;
        let mut prev_key = PositionKey::FLOOR;
        let mut prev_free = false;
        let mut cursor = self.head;

        while let Some(handle) = cursor {
            count += 1;
            if count > self.len {
                return Err(CompactError::invariant(format!(
                    "walk visited more than {} nodes",
                    self.len
                )));
            }
            let node = self.node(handle)?;
            if node.prev != prev {
                return Err(CompactError::invariant(format!(
                    "node {handle} has a back link that does not match its predecessor"
                )));
            }
            if node.extent.size() == 0 {
                return Err(CompactError::invariant(format!(
                    "node {handle} holds a zero-size extent"
                )));
            }
            if node.key <= prev_key {
                return Err(CompactError::invariant(format!(
                    "key {} of node {handle} does not increase past {prev_key}",
                    node.key
                )));
            }
            if prev_free && node.extent.is_free() {
                return Err(CompactError::invariant(format!(
                    "node {handle} is free and follows another free node"
                )));
            }
            prev = Some(handle);
            prev_key = node.key;
            prev_free = node.extent.is_free();
            cursor = node.next;
        }

        if self.tail != prev {
            return Err(CompactError::invariant("tail does not match the last node"));
        }
        if count != self.len {
            return Err(CompactError::invariant(format!(
                "walk visited {count} nodes but the list holds {}",
                self.len
            )));
        }
        Ok(())
    }

    fn key_before(&self, at: NodeHandle) -> Result<Option<PositionKey>> {
        let node = self.node(at)?;
        let lo = match node.prev {
            Some(prev) => self.key(prev)?,
            None => PositionKey::FLOOR,
        };
        Ok(PositionKey::midpoint(lo, node.key))
    }

    /// Reassign whole-number keys to every node, preserving order
    fn renumber(&mut self) -> Result<()> {
        debug!("Renumbering position keys of {} nodes", self.len);
        let handles: Vec<NodeHandle> = self.iter().map(|(handle, _)| handle).collect();
        for (index, handle) in handles.into_iter().enumerate() {
            self.node_mut(handle)?.key = PositionKey::from_index(index as u64);
        }
        self.renumbers += 1;
        Ok(())
    }

    fn node(&self, handle: NodeHandle) -> Result<&Node> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or_else(|| CompactError::invariant(format!("stale or unknown node handle {handle}")))
    }

    fn node_mut(&mut self, handle: NodeHandle) -> Result<&mut Node> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or_else(|| CompactError::invariant(format!("stale or unknown node handle {handle}")))
    }

    fn allocate(&mut self, node: Node) -> Result<NodeHandle> {
        if let Some(index) = self.vacant.pop() {
            let slot = self
                .slots
                .get_mut(index as usize)
                .ok_or_else(|| CompactError::invariant(format!("vacant slot {index} out of range")))?;
            slot.node = Some(node);
            return Ok(NodeHandle {
                index,
                generation: slot.generation,
            });
        }
        let index = slot_index(self.slots.len())?;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        Ok(NodeHandle {
            index,
            generation: 0,
        })
    }

    fn release(&mut self, handle: NodeHandle) -> Result<Node> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or_else(|| CompactError::invariant(format!("stale or unknown node handle {handle}")))?;
        let node = slot
            .node
            .take()
            .ok_or_else(|| CompactError::invariant(format!("node {handle} already released")))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push(handle.index);
        Ok(node)
    }
}

/// Handle index for a new slot at position `len`
fn slot_index(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| CompactError::invariant(format!("arena full: {len} slots in use")))
}

fn ensure_nonempty(extent: &Extent) -> Result<()> {
    if extent.size() == 0 {
        return Err(CompactError::invariant(format!(
            "zero-size extent cannot be stored: {extent}"
        )));
    }
    Ok(())
}

/// Head-to-tail iterator over an [`ExtentList`]
pub struct Iter<'a> {
    list: &'a ExtentList,
    cursor: Option<NodeHandle>,
}

impl Iterator for Iter<'_> {
    type Item = (NodeHandle, Extent);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor?;
        let node = self.list.node(handle).ok()?;
        self.cursor = node.next;
        Some((handle, node.extent))
    }
}
