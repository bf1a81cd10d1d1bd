//! 云端状态机
//!
//! 所有状态是一个枚举，状态切换统一经过 [`CloudState::can_transition_to`] 校验。
//! 允许的切换：
//!
//! - `Initializing` -> `FetchingFriends` | `Offline` | `Error`
//! - `FetchingFriends` -> `LoggedIn` | `Offline` | `Error`
//! - `FetchingFriends` | `LoggedIn` | `Offline` | `Error` -> `FetchingFriends`
//!   （`FetchingFriends` 自身可重入：上一次抓取被取消时状态机停留在该状态）
//! - 任意状态 -> `Initializing`（重置）

use crate::cloud::friend::{
    is_network_error, CloudFriend, EmptyFriendsFetchListener, FetchFriendsState, FriendsCache,
    FriendsFetchListener, FriendsSource,
};
use crate::cloud::listener::{CloudStateListener, EmptyCloudStateListener};
use crate::cloud::types::{CloudRecordId, UserInfo};
use anyhow::{bail, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 已登录状态：持有最终的好友列表
#[derive(Debug, Clone)]
pub struct LoggedInState {
    pub user_record: CloudRecordId,
    pub user_info: UserInfo,
    pub friend_list: Vec<CloudFriend>,
    /// 网络不可达时沿用缓存种子，列表可能已过期
    pub stale: bool,
}

impl LoggedInState {
    fn from_fetch(fetch: &FetchFriendsState, stale: bool) -> Self {
        Self {
            user_record: fetch.user_record().clone(),
            user_info: fetch.user_info().clone(),
            friend_list: fetch.friend_list().to_vec(),
            stale,
        }
    }
}

/// 状态快照，每次状态切换后发布，读取方无需持有状态机锁
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub name: &'static str,
    pub friend_list: Vec<CloudFriend>,
}

impl StateSnapshot {
    fn of(state: &CloudState) -> Self {
        Self {
            name: state.name(),
            friend_list: state.friend_list().to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CloudState {
    Initializing,
    FetchingFriends(FetchFriendsState),
    LoggedIn(LoggedInState),
    Offline { user_record: Option<CloudRecordId> },
    Error { reason: String },
}

impl CloudState {
    pub fn name(&self) -> &'static str {
        match self {
            CloudState::Initializing => "Initializing",
            CloudState::FetchingFriends(_) => "FetchingFriends",
            CloudState::LoggedIn(_) => "LoggedIn",
            CloudState::Offline { .. } => "Offline",
            CloudState::Error { .. } => "Error",
        }
    }

    /// 当前状态下可见的好友列表，无列表的状态返回空切片
    pub fn friend_list(&self) -> &[CloudFriend] {
        match self {
            CloudState::FetchingFriends(fetch) => fetch.friend_list(),
            CloudState::LoggedIn(logged_in) => &logged_in.friend_list,
            _ => &[],
        }
    }

    pub fn can_transition_to(&self, next: &CloudState) -> bool {
        use CloudState::*;
        matches!(
            (self, next),
            (_, Initializing)
                | (Initializing, FetchingFriends(_) | Offline { .. } | Error { .. })
                | (FetchingFriends(_), LoggedIn(_) | Offline { .. } | Error { .. })
                | (
                    FetchingFriends(_) | LoggedIn(_) | Offline { .. } | Error { .. },
                    FetchingFriends(_)
                )
        )
    }
}

/// 云端状态机：驱动好友抓取并维护当前状态
pub struct CloudStateMachine {
    current: CloudState,
    source: Arc<dyn FriendsSource>,
    cache: FriendsCache,
    friends_listener: Arc<dyn FriendsFetchListener>,
    state_listener: Arc<dyn CloudStateListener>,
    snapshot: watch::Sender<StateSnapshot>,
}

impl CloudStateMachine {
    /// 使用默认空监听器创建状态机
    pub fn new(source: Arc<dyn FriendsSource>, cache: FriendsCache) -> Self {
        Self::with_listeners(
            source,
            cache,
            Arc::new(EmptyFriendsFetchListener),
            Arc::new(EmptyCloudStateListener),
        )
    }

    pub fn with_listeners(
        source: Arc<dyn FriendsSource>,
        cache: FriendsCache,
        friends_listener: Arc<dyn FriendsFetchListener>,
        state_listener: Arc<dyn CloudStateListener>,
    ) -> Self {
        let current = CloudState::Initializing;
        let (snapshot, _) = watch::channel(StateSnapshot::of(&current));
        Self {
            current,
            snapshot,
            source,
            cache,
            friends_listener,
            state_listener,
        }
    }

    pub fn current(&self) -> &CloudState {
        &self.current
    }

    /// 订阅状态快照
    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn cache(&self) -> &FriendsCache {
        &self.cache
    }

    pub fn set_friends_listener(&mut self, listener: Arc<dyn FriendsFetchListener>) {
        self.friends_listener = listener;
    }

    pub fn set_state_listener(&mut self, listener: Arc<dyn CloudStateListener>) {
        self.state_listener = listener;
    }

    /// 切换到下一个状态，非法切换返回错误且保持当前状态
    pub async fn transition_to(&mut self, next: CloudState) -> Result<()> {
        let from = self.current.name();
        let to = next.name();
        if !self.current.can_transition_to(&next) {
            warn!("[CloudState] 拒绝非法状态切换: {} -> {}", from, to);
            bail!("非法状态切换: {} -> {}", from, to);
        }
        self.current = next;
        self.snapshot.send_replace(StateSnapshot::of(&self.current));
        debug!("[CloudState] 状态切换: {} -> {}", from, to);
        self.state_listener.on_state_changed(from, to).await;
        Ok(())
    }

    /// 重置到初始状态
    pub async fn reset(&mut self) -> Result<()> {
        self.transition_to(CloudState::Initializing).await
    }

    /// 抓取某个用户的好友列表
    ///
    /// 有缓存时以缓存作为种子进入 `FetchingFriends`，然后：
    /// - 成功：进入 `LoggedIn`
    /// - 网络不可达且有种子：进入 `LoggedIn`（stale），返回种子
    /// - 网络不可达且无种子：进入 `Offline`，返回错误
    /// - 其它错误：进入 `Error`，返回错误
    pub async fn fetch_friends(
        &mut self,
        user_record: CloudRecordId,
        user_info: UserInfo,
    ) -> Result<&[CloudFriend]> {
        let cached = match self.cache.load(&user_record).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!("[CloudState] 读取好友缓存失败，按无缓存处理: {:#}", e);
                None
            }
        };

        if let CloudState::FetchingFriends(previous) = &self.current {
            info!(
                "[CloudState] 上一次抓取未完成（可能已被取消），重新开始: {}",
                previous.user_record()
            );
        }

        self.transition_to(CloudState::FetchingFriends(FetchFriendsState::new(
            user_record,
            user_info,
            cached,
        )))
        .await?;

        let CloudState::FetchingFriends(fetch) = &mut self.current else {
            bail!("状态机未处于 FetchingFriends");
        };
        let seed = fetch.is_seeded().then(|| fetch.friend_list().to_vec());
        let outcome = fetch.run(self.source.as_ref(), &self.cache).await;

        let next = match &outcome {
            Ok(()) => {
                if seed.as_deref() != Some(fetch.friend_list()) {
                    match serde_json::to_string(fetch.friend_list()) {
                        Ok(json) => self.friends_listener.on_friend_list_changed(json).await,
                        Err(e) => warn!("[CloudState] 序列化好友列表失败，跳过变更回调: {}", e),
                    }
                }
                CloudState::LoggedIn(LoggedInState::from_fetch(fetch, false))
            }
            Err(e) => {
                self.friends_listener
                    .on_fetch_friends_failed(format!("{:#}", e))
                    .await;
                if is_network_error(e) {
                    if fetch.is_seeded() {
                        info!(
                            "[CloudState] 网络不可达，沿用缓存好友列表: {}",
                            fetch.user_record()
                        );
                        CloudState::LoggedIn(LoggedInState::from_fetch(fetch, true))
                    } else {
                        CloudState::Offline {
                            user_record: Some(fetch.user_record().clone()),
                        }
                    }
                } else {
                    CloudState::Error {
                        reason: format!("{:#}", e),
                    }
                }
            }
        };

        let logged_in = matches!(next, CloudState::LoggedIn(_));
        self.transition_to(next).await?;

        match outcome {
            Err(e) if !logged_in => Err(e),
            _ => Ok(self.current.friend_list()),
        }
    }
}
