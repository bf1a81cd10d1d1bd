//! 好友抓取状态
//!
//! 表示针对某个用户的一次好友列表抓取。构造时不做任何 I/O，进入状态后由
//! 状态机调用 [`FetchFriendsState::run`] 执行抓取。
//!
//! 带缓存种子构造时，种子列表立即可读；抓取成功后服务器结果整体替换种子，
//! 抓取失败则保留种子。

use crate::cloud::friend::api::FriendsSource;
use crate::cloud::friend::cache::FriendsCache;
use crate::cloud::friend::models::CloudFriend;
use crate::cloud::types::{CloudRecordId, UserInfo};
use anyhow::Result;
use tracing::{error, info, warn};

/// 抓取阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Pending,
    Running,
    Completed,
    Failed,
}

/// 好友抓取状态
#[derive(Debug, Clone)]
pub struct FetchFriendsState {
    user_record: CloudRecordId,
    user_info: UserInfo,
    friend_list: Vec<CloudFriend>,
    seeded: bool,
    phase: FetchPhase,
}

impl FetchFriendsState {
    /// `cached_friend_list` 为 None 时从空列表开始抓取
    pub fn new(
        user_record: CloudRecordId,
        user_info: UserInfo,
        cached_friend_list: Option<Vec<CloudFriend>>,
    ) -> Self {
        let seeded = cached_friend_list.is_some();
        Self {
            user_record,
            user_info,
            friend_list: cached_friend_list.unwrap_or_default(),
            seeded,
            phase: FetchPhase::Pending,
        }
    }

    pub fn friend_list(&self) -> &[CloudFriend] {
        &self.friend_list
    }

    pub fn user_record(&self) -> &CloudRecordId {
        &self.user_record
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.user_info
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    /// 执行抓取并在成功后写入缓存
    ///
    /// 缓存写入失败只记录日志，不影响抓取结果。
    pub async fn run(&mut self, source: &dyn FriendsSource, cache: &FriendsCache) -> Result<()> {
        self.phase = FetchPhase::Running;
        let generation = cache.generation().await;
        info!(
            "[FriendsFetch] 🔄 开始抓取好友: {}（缓存种子: {} 个）",
            self.user_record,
            if self.seeded {
                self.friend_list.len().to_string()
            } else {
                "无".to_string()
            }
        );

        let fetched = match source.fetch_friends(&self.user_record, &self.user_info).await {
            Ok(fetched) => fetched,
            Err(e) => {
                error!("[FriendsFetch] ❌ 抓取好友失败: {} - {:#}", self.user_record, e);
                self.phase = FetchPhase::Failed;
                return Err(e);
            }
        };

        self.friend_list = fetched;
        self.phase = FetchPhase::Completed;

        if let Err(e) = cache
            .store_if_current(&self.user_record, &self.friend_list, generation)
            .await
        {
            warn!("[FriendsFetch] 写入好友缓存失败: {:#}", e);
        }

        info!(
            "[FriendsFetch] ✅ 抓取好友完成: {}，共 {} 个",
            self.user_record,
            self.friend_list.len()
        );
        Ok(())
    }
}
