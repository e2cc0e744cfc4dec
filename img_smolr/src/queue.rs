//! Insertion-ordered item arena plus the processed set

use crate::status::{ConversionStatus, FileItem, ItemId};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct FileQueue {
    order: Vec<ItemId>,
    items: HashMap<ItemId, FileItem>,
    processed: HashSet<ItemId>,
    next_id: u64,
}

impl FileQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: PathBuf) -> ItemId {
        self.next_id += 1;
        let id = ItemId(self.next_id);
        self.order.push(id);
        self.items.insert(id, FileItem::new(id, path));
        id
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn get(&self, id: ItemId) -> Option<&FileItem> {
        self.items.get(&id)
    }

    pub(crate) fn set_status(&mut self, id: ItemId, status: ConversionStatus) -> bool {
        match self.items.get_mut(&id) {
            Some(item) => {
                item.set_status(status);
                true
            }
            None => false,
        }
    }

    /// Drops the item and forgets that it was ever processed.
    pub fn remove(&mut self, id: ItemId) -> Option<FileItem> {
        let item = self.items.remove(&id)?;
        self.order.retain(|i| *i != id);
        self.processed.remove(&id);
        Some(item)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.items.clear();
        self.processed.clear();
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.order.clone()
    }

    /// Items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FileItem> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    pub fn is_processed(&self, id: ItemId) -> bool {
        self.processed.contains(&id)
    }

    pub(crate) fn mark_processed(&mut self, id: ItemId) {
        if self.items.contains_key(&id) {
            self.processed.insert(id);
        }
    }

    /// Queued image items that have not converted successfully yet.
    pub fn pending_images(&self) -> impl Iterator<Item = &FileItem> {
        self.iter()
            .filter(|item| item.is_image() && !self.processed.contains(&item.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_and_ids_stable() {
        let mut q = FileQueue::new();
        let a = q.push("a.png".into());
        let b = q.push("b.txt".into());
        let c = q.push("c.jpg".into());
        assert_eq!(q.ids(), vec![a, b, c]);

        q.remove(b);
        let d = q.push("d.gif".into());
        assert_ne!(d, b);
        let paths: Vec<_> = q.iter().map(|i| i.path().to_path_buf()).collect();
        assert_eq!(paths, [PathBuf::from("a.png"), "c.jpg".into(), "d.gif".into()]);
    }

    #[test]
    fn test_removal_clears_processed() {
        let mut q = FileQueue::new();
        let a = q.push("a.png".into());
        q.mark_processed(a);
        assert!(q.is_processed(a));
        q.remove(a);
        assert!(!q.is_processed(a));
        assert!(!q.set_status(a, ConversionStatus::Done));
    }

    #[test]
    fn test_pending_images_skips_processed_and_non_images() {
        let mut q = FileQueue::new();
        let a = q.push("a.png".into());
        q.push("readme.md".into());
        let c = q.push("c.webp".into());
        q.mark_processed(a);
        let pending: Vec<_> = q.pending_images().map(|i| i.id()).collect();
        assert_eq!(pending, vec![c]);
    }

    #[test]
    fn test_mark_processed_ignores_unknown() {
        let mut q = FileQueue::new();
        let a = q.push("a.png".into());
        q.clear();
        q.mark_processed(a);
        assert!(!q.is_processed(a));
        assert!(q.is_empty());
    }
}
