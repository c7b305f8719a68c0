//! Fixed-capacity slot containers

use crate::domain::{ContainerId, StoredItem};

/// An ordered run of item slots with a fixed capacity
///
/// The slot vector may be shorter than the capacity; it grows when a slot past
/// its end is first used and never shrinks. The actor's own inventory uses the
/// same type.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    id: ContainerId,
    slots: Vec<Option<StoredItem>>,
    capacity: usize,
}

impl Container {
    /// An empty container that has not materialized any slot yet
    pub fn new(id: impl Into<ContainerId>, capacity: usize) -> Self {
        Self {
            id: id.into(),
            slots: Vec::new(),
            capacity,
        }
    }

    /// A container seeded with known slot contents
    ///
    /// If the snapshot reports more slots than `capacity`, the capacity is
    /// raised to match; the remote side is authoritative.
    pub fn with_slots(id: impl Into<ContainerId>, slots: Vec<Option<StoredItem>>, capacity: usize) -> Self {
        let capacity = capacity.max(slots.len());
        Self {
            id: id.into(),
            slots,
            capacity,
        }
    }

    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Raw slot contents, possibly shorter than the capacity
    pub fn slots(&self) -> &[Option<StoredItem>] {
        &self.slots
    }

    pub fn in_range(&self, slot: usize) -> bool {
        slot < self.capacity
    }

    pub fn get(&self, slot: usize) -> Option<&StoredItem> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut StoredItem> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Lowest empty slot, else the next slot to append, else `None`
    pub fn free_slot(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(Option::is_none)
            .or_else(|| (self.slots.len() < self.capacity).then_some(self.slots.len()))
    }

    /// Every empty slot index, including not yet materialized ones
    pub fn free_slots(&self) -> Vec<usize> {
        (0..self.capacity).filter(|slot| self.get(*slot).is_none()).collect()
    }

    pub fn free_count(&self) -> usize {
        self.capacity - self.occupied_count()
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn occupied(&self) -> impl Iterator<Item = (usize, &StoredItem)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, item)| item.as_ref().map(|item| (slot, item)))
    }

    /// First slot holding an item with this name
    pub fn find(&self, name: &str) -> Option<usize> {
        self.occupied().find(|(_, item)| item.name == name).map(|(slot, _)| slot)
    }

    /// Total quantity held under this name
    pub fn quantity_of(&self, name: &str) -> u32 {
        self.occupied()
            .filter(|(_, item)| item.name == name)
            .map(|(_, item)| item.quantity())
            .sum()
    }

    /// Put an item into a slot, returning the previous occupant
    ///
    /// Fails with the item handed back when the slot is past the capacity.
    pub fn try_place(&mut self, slot: usize, item: StoredItem) -> Result<Option<StoredItem>, StoredItem> {
        if !self.in_range(slot) {
            return Err(item);
        }
        if slot >= self.slots.len() {
            self.slots.resize(slot + 1, None);
        }
        Ok(self.slots[slot].replace(item))
    }

    /// Empty a slot, returning what was there
    pub fn take(&mut self, slot: usize) -> Option<StoredItem> {
        self.slots.get_mut(slot).and_then(Option::take)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn potion(q: u32) -> Option<StoredItem> {
        Some(StoredItem::stack("hpot0", q))
    }

    #[test]
    fn test_free_slot_prefers_lowest_hole() {
        let container = Container::with_slots("items0", vec![potion(1), None, potion(2), None], 42);
        assert_eq!(container.free_slot(), Some(1));
    }

    #[test]
    fn test_free_slot_appends_under_capacity() {
        let container = Container::with_slots("items0", vec![potion(1), potion(2)], 3);
        assert_eq!(container.free_slot(), Some(2));
    }

    #[test]
    fn test_free_slot_none_when_full() {
        let container = Container::with_slots("items0", vec![potion(1), potion(2)], 2);
        assert_eq!(container.free_slot(), None);
        assert_eq!(container.free_count(), 0);
    }

    #[test]
    fn test_try_place_grows_but_never_past_capacity() {
        let mut container = Container::new("items0", 2);
        assert_eq!(container.try_place(1, StoredItem::new("ring")), Ok(None));
        assert_eq!(container.slots().len(), 2);
        assert_eq!(container.free_slot(), Some(0));

        let rejected = container.try_place(2, StoredItem::new("bow"));
        assert_eq!(rejected, Err(StoredItem::new("bow")));
        assert_eq!(container.occupied_count(), 1);
    }

    #[test]
    fn test_take_clears_and_never_shrinks() {
        let mut container = Container::with_slots("items0", vec![potion(5), potion(6)], 4);
        assert_eq!(container.take(1), potion(6));
        assert_eq!(container.slots().len(), 2);
        assert_eq!(container.take(1), None);
        assert_eq!(container.free_slots(), vec![1, 2, 3]);
    }

    #[test]
    fn test_quantity_of_and_find() {
        let container = Container::with_slots(
            "inventory",
            vec![Some(StoredItem::new("ring")), potion(5), None, potion(7)],
            42,
        );
        assert_eq!(container.quantity_of("hpot0"), 12);
        assert_eq!(container.find("hpot0"), Some(1));
        assert_eq!(container.find("mpot0"), None);
    }
}
