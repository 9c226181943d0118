pub use crate::builder::CacheBuilder;
pub use crate::cache::{AsyncMemoCache, MemoCache};
pub use crate::error::ConfigError;
pub use crate::lock::{
    AsyncKeyLockGuard, AsyncKeyLockRegistry, HolderId, KeyLockGuard, KeyLockRegistry, TakeoverHook,
};
pub use crate::memo::{AsyncMemo, Memo};
pub use crate::metrics::MetricsSnapshot;
pub use crate::store::ttl_map::{ConcurrentTtlMap, TtlMapCore};
pub use crate::traits::{AsyncStorage, Storage};
