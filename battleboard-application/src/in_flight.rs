use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct InFlight {
    ids: Mutex<HashSet<i64>>,
}

impl InFlight {
    pub fn contains(&self, queue_id: i64) -> bool {
        self.ids
            .lock()
            .map(|ids| ids.contains(&queue_id))
            .unwrap_or(false)
    }

    pub fn claim(&self, queue_id: i64) {
        if let Ok(mut ids) = self.ids.lock() {
            ids.insert(queue_id);
        }
    }

    pub fn release(&self, queue_id: i64) {
        if let Ok(mut ids) = self.ids.lock() {
            ids.remove(&queue_id);
        }
    }

    pub fn count(&self) -> usize {
        self.ids.lock().map(|ids| ids.len()).unwrap_or(0)
    }
}
