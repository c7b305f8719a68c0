//! Reverse index from item name to positions

use crate::domain::Position;

/// Every position currently holding an item with a given name
///
/// Holds positions only; the item snapshot is always read back through the
/// owning container so the index cannot drift from the slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemGroup {
    name: String,
    positions: Vec<Position>,
}

impl ItemGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            positions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, position: &Position) -> bool {
        self.positions.contains(position)
    }

    pub(crate) fn insert(&mut self, position: Position) {
        if !self.contains(&position) {
            self.positions.push(position);
        }
    }

    pub(crate) fn remove(&mut self, position: &Position) -> bool {
        let before = self.positions.len();
        self.positions.retain(|p| p != position);
        before != self.positions.len()
    }
}
