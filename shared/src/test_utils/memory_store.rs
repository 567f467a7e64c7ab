use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Attributes;
use crate::store::KvStore;

/// In-memory [`KvStore`] for tests. Same upsert/partial-update semantics as
/// the DynamoDB implementation, including REMOVE-on-null.
pub struct MemoryKvStore {
    items: Mutex<BTreeMap<(String, String), Attributes>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
        }
    }

    /// Create a store preloaded with (pk, sk, item) rows.
    pub fn with_data(rows: Vec<(&str, &str, Attributes)>) -> Self {
        let store = Self::new();
        {
            let mut items = store.items.lock().unwrap();
            for (pk, sk, item) in rows {
                items.insert((pk.to_string(), sk.to_string()), item);
            }
        }
        store
    }

    /// Direct snapshot of one item, bypassing the trait, for assertions.
    pub fn item(&self, pk: &str, sk: &str) -> Option<Attributes> {
        self.items
            .lock()
            .unwrap()
            .get(&(pk.to_string(), sk.to_string()))
            .cloned()
    }

    pub fn partition_len(&self, pk: &str) -> usize {
        self.items
            .lock()
            .unwrap()
            .keys()
            .filter(|(p, _)| p == pk)
            .count()
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Attributes>> {
        Ok(self.item(pk, sk))
    }

    async fn query(&self, pk: &str, filter: &Attributes) -> Result<Vec<Attributes>> {
        let items = self.items.lock().unwrap();
        Ok(items
            .iter()
            .filter(|((p, _), item)| {
                p == pk && filter.iter().all(|(k, v)| item.get(k) == Some(v))
            })
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn create(&self, pk: &str, sk: &str, item: Attributes) -> Result<()> {
        self.items
            .lock()
            .unwrap()
            .insert((pk.to_string(), sk.to_string()), item);
        Ok(())
    }

    async fn update(&self, pk: &str, sk: &str, changes: Attributes) -> Result<()> {
        let mut items = self.items.lock().unwrap();
        let entry = items
            .entry((pk.to_string(), sk.to_string()))
            .or_insert_with(Attributes::new);
        for (attr, value) in changes {
            if value.is_null() {
                entry.remove(&attr);
            } else {
                entry.insert(attr, value);
            }
        }
        Ok(())
    }

    async fn delete(&self, pk: &str, sk: &str) -> Result<()> {
        self.items
            .lock()
            .unwrap()
            .remove(&(pk.to_string(), sk.to_string()));
        Ok(())
    }
}
