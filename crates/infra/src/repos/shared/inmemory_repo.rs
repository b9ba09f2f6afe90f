use nudge_domain::{Entity, ID};
use std::sync::Mutex;

/// Useful functions for creating inmemory repositories

pub fn insert<T: Clone>(val: &T, collection: &Mutex<Vec<T>>) {
    let mut collection = collection.lock().unwrap();
    collection.push(val.clone());
}

pub fn find<T: Clone + Entity>(val_id: &ID, collection: &Mutex<Vec<T>>) -> Option<T> {
    let collection = collection.lock().unwrap();
    collection.iter().find(|item| item.id() == val_id).cloned()
}

pub fn find_by<T: Clone + Entity, F: FnMut(&T) -> bool>(
    collection: &Mutex<Vec<T>>,
    mut compare: F,
) -> Vec<T> {
    let collection = collection.lock().unwrap();
    let mut items = Vec::new();
    for item in collection.iter() {
        if compare(item) {
            items.push(item.clone());
        }
    }
    items
}

/// Replaces the stored item through `apply` while holding the collection
/// lock, so the check and the write happen as one step
pub fn update_with<T: Entity, R, F: FnOnce(&mut T) -> R>(
    val_id: &ID,
    collection: &Mutex<Vec<T>>,
    apply: F,
) -> Option<R> {
    let mut collection = collection.lock().unwrap();
    collection
        .iter_mut()
        .find(|item| item.id() == val_id)
        .map(apply)
}
