use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{CacheError, CacheStore};

enum Entry {
    Value(String),
    List(Vec<String>),
}

struct Slot {
    entry: Entry,
    expires_at: Option<Instant>,
}

impl Slot {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }
}

/// 内存缓存后端
///
/// 测试和本地开发用，语义对齐 Redis：过期键在访问时惰性清除，
/// 列表操作与 LPUSH/LREM/LTRIM/LRANGE 一致。
#[derive(Default)]
pub struct MemoryCacheStore {
    slots: Mutex<HashMap<String, Slot>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_live_slot<T>(&self, key: &str, f: impl FnOnce(Option<&mut Slot>) -> T) -> T {
        let mut slots = self.slots.lock().expect("cache lock poisoned");
        if slots.get(key).is_some_and(Slot::expired) {
            slots.remove(key);
        }
        f(slots.get_mut(key))
    }
}

// Redis 的 LTRIM/LRANGE 下标语义，负数从尾部起算
fn resolve_index(index: isize, len: usize) -> isize {
    if index < 0 { len as isize + index } else { index }
}

fn slice_range(list: &[String], start: isize, stop: isize) -> Vec<String> {
    let len = list.len();
    let start = resolve_index(start, len).max(0) as usize;
    let stop = resolve_index(stop, len);
    if stop < 0 || start >= len {
        return Vec::new();
    }
    let stop = (stop as usize).min(len - 1);
    if start > stop {
        return Vec::new();
    }
    list[start..=stop].to_vec()
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.with_live_slot(key, |slot| match slot {
            Some(Slot {
                entry: Entry::Value(v),
                ..
            }) => Ok(Some(v.clone())),
            _ => Ok(None),
        })
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut slots = self.slots.lock().expect("cache lock poisoned");
        slots.insert(
            key.to_string(),
            Slot {
                entry: Entry::Value(value.to_string()),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.slots
            .lock()
            .expect("cache lock poisoned")
            .remove(key);
        Ok(())
    }

    async fn push_front(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut slots = self.slots.lock().expect("cache lock poisoned");
        if slots.get(key).is_some_and(Slot::expired) {
            slots.remove(key);
        }
        let slot = slots.entry(key.to_string()).or_insert_with(|| Slot {
            entry: Entry::List(Vec::new()),
            expires_at: None,
        });
        match &mut slot.entry {
            Entry::List(list) => {
                list.insert(0, value.to_string());
                Ok(())
            }
            Entry::Value(_) => Err(CacheError::Backend(
                "WRONGTYPE operation against a string value".into(),
            )),
        }
    }

    async fn remove_from_list(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.with_live_slot(key, |slot| {
            if let Some(Slot {
                entry: Entry::List(list),
                ..
            }) = slot
            {
                list.retain(|v| v != value);
            }
            Ok(())
        })
    }

    async fn trim(&self, key: &str, start: isize, stop: isize) -> Result<(), CacheError> {
        self.with_live_slot(key, |slot| {
            if let Some(Slot {
                entry: Entry::List(list),
                ..
            }) = slot
            {
                let trimmed = slice_range(list, start, stop);
                *list = trimmed;
            }
            Ok(())
        })
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), CacheError> {
        self.with_live_slot(key, |slot| {
            if let Some(slot) = slot {
                slot.expires_at = Some(Instant::now() + Duration::from_secs(ttl_secs));
            }
            Ok(())
        })
    }

    async fn range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, CacheError> {
        self.with_live_slot(key, |slot| match slot {
            Some(Slot {
                entry: Entry::List(list),
                ..
            }) => Ok(slice_range(list, start, stop)),
            _ => Ok(Vec::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn value_round_trip_and_delete() {
        let cache = MemoryCacheStore::new();
        cache.set_ex("k", "v", 60).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_push_trim_range() {
        let cache = MemoryCacheStore::new();
        for id in ["a", "b", "c", "d"] {
            cache.push_front("list", id).await.unwrap();
        }
        // 表头是最后压入的元素
        assert_eq!(
            cache.range("list", 0, 1).await.unwrap(),
            vec!["d".to_string(), "c".to_string()]
        );
        cache.trim("list", 0, 2).await.unwrap();
        assert_eq!(cache.range("list", 0, -1).await.unwrap().len(), 3);
        cache.remove_from_list("list", "c").await.unwrap();
        assert_eq!(
            cache.range("list", 0, -1).await.unwrap(),
            vec!["d".to_string(), "b".to_string()]
        );
    }

    #[tokio::test]
    async fn range_of_missing_key_is_empty() {
        let cache = MemoryCacheStore::new();
        assert!(cache.range("nope", 0, 9).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_value_is_gone() {
        let cache = MemoryCacheStore::new();
        cache.set_ex("k", "v", 0).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
