//! 云端好友客户端
//!
//! 对外的门面：负责组装 HTTP 客户端、缓存数据库与状态机。

use crate::cloud::db::create_sqlite_pool_with_migration;
use crate::cloud::friend::{
    CloudFriend, FriendApi, FriendsCache, FriendsCacheDao, FriendsFetchListener, FriendsSource,
};
use crate::cloud::listener::CloudStateListener;
use crate::cloud::state::{CloudStateMachine, StateSnapshot};
use crate::cloud::types::{CloudRecordId, UserInfo};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::info;

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// HTTP API 基础地址
    pub api_base_url: String,
    /// 认证 token
    pub token: String,
    /// 好友缓存使用的 SQLite 数据库 URL，None 表示只用内存缓存
    ///
    /// 例如：`sqlite://cloud_friends.db?mode=rwc`
    pub friends_db_url: Option<String>,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new(token: String) -> Self {
        Self {
            api_base_url: "http://localhost:10002".to_string(),
            token,
            friends_db_url: Some("sqlite://cloud_friends.db?mode=rwc".to_string()),
            request_timeout_secs: 30,
        }
    }
}

/// 云端好友客户端
#[derive(Clone)]
pub struct CloudClient {
    machine: Arc<Mutex<CloudStateMachine>>,
    // 状态快照，读取时不需要等待状态机锁（抓取期间也可读到种子列表）
    snapshot: watch::Receiver<StateSnapshot>,
    // 与状态机共享同一份缓存；清空缓存不需要等待正在进行的抓取
    cache: FriendsCache,
}

impl CloudClient {
    /// 按配置创建客户端（HTTP + 可选 SQLite 缓存）
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        info!(
            "[Client] 创建云端好友客户端，API: {}，缓存数据库: {}",
            config.api_base_url,
            config.friends_db_url.as_deref().unwrap_or("<内存>")
        );

        // token 通过 default_headers 自动添加
        let http_client = reqwest::ClientBuilder::new()
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::HeaderName::from_static("token"),
                    reqwest::header::HeaderValue::from_str(&config.token)
                        .context("无效的 token")?,
                );
                headers
            })
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("创建 HTTP 客户端失败")?;

        let cache = match &config.friends_db_url {
            Some(db_url) => {
                let pool = create_sqlite_pool_with_migration(db_url).await?;
                FriendsCache::with_dao(FriendsCacheDao::new(pool))
            }
            None => FriendsCache::in_memory(),
        };

        let api = FriendApi::new(http_client, config.api_base_url.clone());
        Ok(Self::with_source(Arc::new(api), cache))
    }

    /// 使用自定义数据来源和缓存创建客户端
    pub fn with_source(source: Arc<dyn FriendsSource>, cache: FriendsCache) -> Self {
        let machine = CloudStateMachine::new(source, cache.clone());
        Self {
            snapshot: machine.subscribe(),
            machine: Arc::new(Mutex::new(machine)),
            cache,
        }
    }

    /// 注册好友抓取监听器
    pub async fn set_friends_listener(&self, listener: Arc<dyn FriendsFetchListener>) {
        self.machine.lock().await.set_friends_listener(listener);
    }

    /// 注册状态机监听器
    pub async fn set_state_listener(&self, listener: Arc<dyn CloudStateListener>) {
        self.machine.lock().await.set_state_listener(listener);
    }

    /// 抓取好友列表，返回抓取后的列表副本
    pub async fn fetch_friends(
        &self,
        user_record: CloudRecordId,
        user_info: UserInfo,
    ) -> Result<Vec<CloudFriend>> {
        let mut machine = self.machine.lock().await;
        let friends = machine.fetch_friends(user_record, user_info).await?;
        Ok(friends.to_vec())
    }

    /// 当前状态下的好友列表
    pub fn friend_list(&self) -> Vec<CloudFriend> {
        self.snapshot.borrow().friend_list.clone()
    }

    /// 当前状态名
    pub fn current_state_name(&self) -> &'static str {
        self.snapshot.borrow().name
    }

    /// 清空好友缓存
    pub async fn clear_friends_cache(&self) -> Result<()> {
        self.cache.clear().await
    }
}
