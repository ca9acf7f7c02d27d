// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Ordered observer storage for one monitor channel.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::events::{CancelCheckEvent, ObserverId, ProgressEvent};

pub type ProgressObserver = dyn Fn(&ProgressEvent) + Send + Sync;
pub type CancelObserver = dyn Fn(&mut CancelCheckEvent) + Send + Sync;

/// Observers in subscription order.
///
/// The lock is only held to mutate the list or to take a snapshot; observers
/// run on the snapshot so they may subscribe or unsubscribe while being
/// notified. Such changes apply from the next notification on.
pub(crate) struct ObserverList<F: ?Sized> {
    entries: Mutex<Vec<(ObserverId, Arc<F>)>>,
}

impl<F: ?Sized> ObserverList<F> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, observer: Arc<F>) -> ObserverId {
        let id = ObserverId::next();
        self.entries.lock().push((id, observer));
        id
    }

    pub fn remove(&self, id: ObserverId) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter().position(|(entry_id, _)| *entry_id == id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Arc<F>> {
        self.entries
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
