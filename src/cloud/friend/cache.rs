//! 好友列表缓存
//!
//! 进程内由调用方显式持有（而非全局变量），可克隆共享。内存层之外可挂载
//! [`FriendsCacheDao`] 做持久化。每次清空都会递增代数（generation），
//! 抓取开始时记录的代数与写入时不一致则放弃写入，避免清空后被旧结果回填。

use crate::cloud::friend::dao::FriendsCacheDao;
use crate::cloud::friend::models::{CachedFriendList, CloudFriend};
use crate::cloud::types::CloudRecordId;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Default)]
struct CacheInner {
    entries: HashMap<CloudRecordId, CachedFriendList>,
    generation: u64,
}

/// 好友缓存句柄
#[derive(Clone, Default)]
pub struct FriendsCache {
    inner: Arc<RwLock<CacheInner>>,
    dao: Option<FriendsCacheDao>,
}

impl FriendsCache {
    /// 仅内存缓存
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// 内存 + SQLite 持久化缓存
    pub fn with_dao(dao: FriendsCacheDao) -> Self {
        Self {
            inner: Arc::default(),
            dao: Some(dao),
        }
    }

    /// 读取缓存的好友列表，内存未命中时回落到数据库并回填内存
    pub async fn load(&self, user: &CloudRecordId) -> Result<Option<Vec<CloudFriend>>> {
        if let Some(entry) = self.inner.read().await.entries.get(user) {
            debug!("[FriendsCache] 内存命中: {}", user);
            return Ok(Some(entry.friends.clone()));
        }

        let Some(dao) = &self.dao else {
            return Ok(None);
        };

        // 持有写锁再读库，避免与 clear 交错导致回填已清空的数据
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.entries.get(user) {
            return Ok(Some(entry.friends.clone()));
        }
        let Some(persisted) = dao.get_friends(user).await? else {
            return Ok(None);
        };
        debug!(
            "[FriendsCache] 数据库命中: {}，共 {} 个好友，抓取时间 {}",
            user,
            persisted.friends.len(),
            persisted.fetched_at
        );
        let friends = persisted.friends.clone();
        inner.entries.insert(user.clone(), persisted);
        Ok(Some(friends))
    }

    /// 读取某个用户缓存条目的完整信息（仅内存）
    pub async fn entry(&self, user: &CloudRecordId) -> Option<CachedFriendList> {
        self.inner.read().await.entries.get(user).cloned()
    }

    /// 当前代数
    pub async fn generation(&self) -> u64 {
        self.inner.read().await.generation
    }

    /// 无条件写入缓存
    pub async fn store(&self, user: &CloudRecordId, friends: &[CloudFriend]) -> Result<()> {
        let mut inner = self.inner.write().await;
        Self::write_locked(&mut inner, self.dao.as_ref(), user, friends).await
    }

    /// 仅当 `generation` 仍为当前代数时写入，返回是否写入
    pub async fn store_if_current(
        &self,
        user: &CloudRecordId,
        friends: &[CloudFriend],
        generation: u64,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.generation != generation {
            info!(
                "[FriendsCache] 缓存在抓取期间已被清空（代数 {} -> {}），丢弃 {} 的写入",
                generation, inner.generation, user
            );
            return Ok(false);
        }
        Self::write_locked(&mut inner, self.dao.as_ref(), user, friends).await?;
        Ok(true)
    }

    async fn write_locked(
        inner: &mut CacheInner,
        dao: Option<&FriendsCacheDao>,
        user: &CloudRecordId,
        friends: &[CloudFriend],
    ) -> Result<()> {
        let fetched_at = chrono::Utc::now().timestamp_millis();
        if let Some(dao) = dao {
            dao.replace_friends(user, friends, fetched_at).await?;
        }
        inner.entries.insert(
            user.clone(),
            CachedFriendList {
                friends: friends.to_vec(),
                fetched_at,
            },
        );
        debug!("[FriendsCache] 已缓存 {}，共 {} 个好友", user, friends.len());
        Ok(())
    }

    /// 清空全部好友缓存（内存与数据库），可重复调用
    ///
    /// 数据库清空失败时返回错误，内存条目与代数保持不变。
    pub async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(dao) = &self.dao {
            dao.clear_all().await?;
        }
        inner.generation += 1;
        let dropped = inner.entries.len();
        inner.entries.clear();
        info!(
            "[FriendsCache] 🧹 已清空好友缓存，移除 {} 个条目，当前代数 {}",
            dropped, inner.generation
        );
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::db::create_sqlite_pool_with_migration;

    fn friends(names: &[&str]) -> Vec<CloudFriend> {
        names
            .iter()
            .map(|n| CloudFriend::new(CloudRecordId::new(*n), *n, ""))
            .collect()
    }

    #[tokio::test]
    async fn store_then_load() {
        let cache = FriendsCache::in_memory();
        let user = CloudRecordId::new("_me");
        assert_eq!(cache.load(&user).await.unwrap(), None);

        cache.store(&user, &friends(&["_a", "_b"])).await.unwrap();
        assert_eq!(
            cache.load(&user).await.unwrap(),
            Some(friends(&["_a", "_b"]))
        );
        assert!(cache.entry(&user).await.unwrap().fetched_at > 0);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn clear_twice_is_fine() {
        let cache = FriendsCache::in_memory();
        cache
            .store(&CloudRecordId::new("_me"), &friends(&["_a"]))
            .await
            .unwrap();
        cache.clear().await.unwrap();
        cache.clear().await.unwrap();
        assert!(cache.is_empty().await);
        assert_eq!(cache.generation().await, 2);
    }

    #[tokio::test]
    async fn stale_generation_is_not_written() {
        let cache = FriendsCache::in_memory();
        let user = CloudRecordId::new("_me");
        let generation = cache.generation().await;
        cache.clear().await.unwrap();

        let written = cache
            .store_if_current(&user, &friends(&["_a"]), generation)
            .await
            .unwrap();
        assert!(!written);
        assert_eq!(cache.load(&user).await.unwrap(), None);

        let generation = cache.generation().await;
        assert!(cache
            .store_if_current(&user, &friends(&["_a"]), generation)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let cache = FriendsCache::in_memory();
        let other = cache.clone();
        let user = CloudRecordId::new("_me");
        cache.store(&user, &friends(&["_a"])).await.unwrap();
        other.clear().await.unwrap();
        assert_eq!(cache.load(&user).await.unwrap(), None);
    }

    #[tokio::test]
    async fn dao_backed_cache_survives_new_handle() {
        let pool = create_sqlite_pool_with_migration("sqlite::memory:")
            .await
            .unwrap();
        let user = CloudRecordId::new("_me");

        let cache = FriendsCache::with_dao(FriendsCacheDao::new(pool.clone()));
        cache.store(&user, &friends(&["_a", "_b"])).await.unwrap();

        // 新句柄内存为空，应从数据库读回
        let reopened = FriendsCache::with_dao(FriendsCacheDao::new(pool.clone()));
        assert!(reopened.is_empty().await);
        assert_eq!(
            reopened.load(&user).await.unwrap(),
            Some(friends(&["_a", "_b"]))
        );
        assert_eq!(reopened.len().await, 1);

        reopened.clear().await.unwrap();
        let third = FriendsCache::with_dao(FriendsCacheDao::new(pool));
        assert_eq!(third.load(&user).await.unwrap(), None);
    }

    #[tokio::test]
    async fn warm_load_keeps_persisted_fetched_at() {
        let pool = create_sqlite_pool_with_migration("sqlite::memory:")
            .await
            .unwrap();
        let user = CloudRecordId::new("_me");
        let dao = FriendsCacheDao::new(pool);
        dao.replace_friends(&user, &friends(&["_a"]), 1_000)
            .await
            .unwrap();

        let reopened = FriendsCache::with_dao(dao);
        assert_eq!(reopened.load(&user).await.unwrap(), Some(friends(&["_a"])));
        assert_eq!(reopened.entry(&user).await.unwrap().fetched_at, 1_000);
    }

    #[tokio::test]
    async fn failed_database_clear_leaves_memory_untouched() {
        let pool = create_sqlite_pool_with_migration("sqlite::memory:")
            .await
            .unwrap();
        let user = CloudRecordId::new("_me");
        let cache = FriendsCache::with_dao(FriendsCacheDao::new(pool.clone()));
        cache.store(&user, &friends(&["_a"])).await.unwrap();
        let generation = cache.generation().await;

        pool.close().await;
        assert!(cache.clear().await.is_err());

        // 数据库未清空，内存与代数都应保持原样
        assert_eq!(cache.generation().await, generation);
        assert_eq!(cache.entry(&user).await.unwrap().friends, friends(&["_a"]));
        assert_eq!(cache.load(&user).await.unwrap(), Some(friends(&["_a"])));
    }
}
