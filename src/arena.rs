use std::ops::{Index, IndexMut};

/// Handle to a value stored in an [`Arena`].
///
/// Handles are never invalidated: the arena only grows during one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaIndex {
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct Arena<T> {
    nodes: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T> Arena<T> {
    pub fn allocate(&mut self, node: T) -> ArenaIndex {
        let index = self.nodes.len();
        self.nodes.push(node);
        ArenaIndex { index }
    }
}

impl<T> Index<ArenaIndex> for Arena<T> {
    type Output = T;

    fn index(&self, index: ArenaIndex) -> &Self::Output {
        &self.nodes[index.index]
    }
}

impl<T> IndexMut<ArenaIndex> for Arena<T> {
    fn index_mut(&mut self, index: ArenaIndex) -> &mut Self::Output {
        &mut self.nodes[index.index]
    }
}
