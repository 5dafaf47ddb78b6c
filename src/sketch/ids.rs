use std::collections::BTreeSet;

use serde_json::Value;

use crate::core::numeric::to_index;

/// Allocates unique non-negative integer ids within one id space.
///
/// A requested id is honoured when it is a non-negative number (floored)
/// that is still free; otherwise the lowest unused id is assigned.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    used: BTreeSet<u64>,
}

impl IdAllocator {
    pub fn allocate(&mut self, requested: Option<&Value>) -> u64 {
        let id = match requested.and_then(to_index) {
            Some(id) if !self.used.contains(&id) => id,
            _ => self.lowest_free(),
        };
        self.used.insert(id);
        id
    }

    pub fn contains(&self, id: u64) -> bool {
        self.used.contains(&id)
    }

    fn lowest_free(&self) -> u64 {
        let mut candidate = 0;
        for id in &self.used {
            if *id != candidate {
                break;
            }
            candidate += 1;
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn honours_free_requests_and_fills_gaps() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.allocate(Some(&json!(2))), 2);
        assert_eq!(ids.allocate(Some(&json!(2))), 0);
        assert_eq!(ids.allocate(None), 1);
        assert_eq!(ids.allocate(None), 3);
        assert_eq!(ids.allocate(Some(&json!("7.8"))), 7);
        assert_eq!(ids.allocate(Some(&json!(-4))), 4);
        assert!(ids.contains(7));
        assert!(!ids.contains(5));
    }
}
