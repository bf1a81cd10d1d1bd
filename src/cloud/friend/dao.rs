//! 好友缓存数据访问层（DAO）
//!
//! 负责好友列表缓存的持久化，表结构由 `migrations/` 管理。

use crate::cloud::friend::models::{CachedFriendList, CloudFriend};
use crate::cloud::types::CloudRecordId;
use anyhow::{Context, Result};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info};

/// 好友缓存 DAO（基于 sqlx）
#[derive(Clone)]
pub struct FriendsCacheDao {
    db: Pool<Sqlite>,
}

impl FriendsCacheDao {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// 读取某个用户缓存的好友列表
    ///
    /// 返回 `None` 表示从未缓存过；好友为空表示缓存了一个空列表。
    pub async fn get_friends(&self, owner: &CloudRecordId) -> Result<Option<CachedFriendList>> {
        let owner_row = sqlx::query(
            r#"
            SELECT fetched_at FROM cached_friend_owners
            WHERE owner_record_name = ? AND owner_zone_name = ?
            "#,
        )
        .bind(&owner.record_name)
        .bind(&owner.zone_name)
        .fetch_optional(&self.db)
        .await
        .context("查询好友缓存拥有者失败")?;

        let Some(owner_row) = owner_row else {
            debug!("[FriendsCacheDAO] 用户 {} 无缓存记录", owner);
            return Ok(None);
        };
        let fetched_at: i64 = owner_row.get("fetched_at");

        let rows = sqlx::query(
            r#"
            SELECT
                friend_record_name,
                friend_zone_name,
                first_name,
                last_name,
                ex
            FROM cached_friends
            WHERE owner_record_name = ? AND owner_zone_name = ?
            ORDER BY position ASC
            "#,
        )
        .bind(&owner.record_name)
        .bind(&owner.zone_name)
        .fetch_all(&self.db)
        .await
        .context("查询缓存好友列表失败")?;

        let friends: Vec<CloudFriend> = rows
            .into_iter()
            .map(|m| CloudFriend {
                record_id: CloudRecordId::with_zone(
                    m.get::<String, _>("friend_record_name"),
                    m.get::<String, _>("friend_zone_name"),
                ),
                first_name: m.get("first_name"),
                last_name: m.get("last_name"),
                ex: m.get("ex"),
            })
            .collect();

        debug!(
            "[FriendsCacheDAO] 读取用户 {} 的缓存好友，共 {} 个",
            owner,
            friends.len()
        );
        Ok(Some(CachedFriendList {
            friends,
            fetched_at,
        }))
    }

    /// 用新的好友列表整体替换某个用户的缓存（单事务，保持顺序）
    pub async fn replace_friends(
        &self,
        owner: &CloudRecordId,
        friends: &[CloudFriend],
        fetched_at: i64,
    ) -> Result<()> {
        let mut tx = self.db.begin().await.context("开启事务失败")?;

        sqlx::query(
            r#"
            DELETE FROM cached_friends
            WHERE owner_record_name = ? AND owner_zone_name = ?
            "#,
        )
        .bind(&owner.record_name)
        .bind(&owner.zone_name)
        .execute(&mut *tx)
        .await
        .context("删除旧的缓存好友失败")?;

        for (position, f) in friends.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cached_friends (
                    owner_record_name,
                    owner_zone_name,
                    position,
                    friend_record_name,
                    friend_zone_name,
                    first_name,
                    last_name,
                    ex
                ) VALUES (?,?,?,?,?,?,?,?)
                "#,
            )
            .bind(&owner.record_name)
            .bind(&owner.zone_name)
            .bind(position as i64)
            .bind(&f.record_id.record_name)
            .bind(&f.record_id.zone_name)
            .bind(&f.first_name)
            .bind(&f.last_name)
            .bind(&f.ex)
            .execute(&mut *tx)
            .await
            .context("插入缓存好友失败")?;
        }

        sqlx::query(
            r#"
            INSERT INTO cached_friend_owners (
                owner_record_name, owner_zone_name, fetched_at
            ) VALUES (?, ?, ?)
            ON CONFLICT(owner_record_name, owner_zone_name) DO UPDATE SET
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(&owner.record_name)
        .bind(&owner.zone_name)
        .bind(fetched_at)
        .execute(&mut *tx)
        .await
        .context("保存好友缓存拥有者失败")?;

        tx.commit().await.context("提交好友缓存事务失败")?;
        debug!(
            "[FriendsCacheDAO] 已缓存用户 {} 的好友，共 {} 个",
            owner,
            friends.len()
        );
        Ok(())
    }

    /// 清空所有用户的好友缓存
    pub async fn clear_all(&self) -> Result<()> {
        let mut tx = self.db.begin().await.context("开启事务失败")?;
        sqlx::query("DELETE FROM cached_friends")
            .execute(&mut *tx)
            .await
            .context("清空缓存好友失败")?;
        sqlx::query("DELETE FROM cached_friend_owners")
            .execute(&mut *tx)
            .await
            .context("清空好友缓存拥有者失败")?;
        tx.commit().await.context("提交清空事务失败")?;
        info!("[FriendsCacheDAO] 已清空全部好友缓存");
        Ok(())
    }
}
