//! 好友 HTTP API 客户端
//!
//! 负责向云端记录服务发起好友发现请求

use crate::cloud::friend::models::CloudFriend;
use crate::cloud::friend::types::{DiscoverFriendsReq, DiscoverFriendsResp};
use crate::cloud::types::{handle_http_response, CloudRecordId, UserInfo};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io;
use tracing::{debug, info};
use uuid::Uuid;

/// 好友数据来源（抓取状态通过它获取远端好友列表）
#[async_trait]
pub trait FriendsSource: Send + Sync {
    async fn fetch_friends(
        &self,
        user_record: &CloudRecordId,
        user_info: &UserInfo,
    ) -> Result<Vec<CloudFriend>>;
}

/// 好友相关的 HTTP API 客户端
pub struct FriendApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl FriendApi {
    /// 创建新的好友 API 客户端
    ///
    /// `client` 应该已经在外部配置好认证头
    pub fn new(client: reqwest::Client, api_base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn discover_url(&self) -> String {
        format!("{}/friends/discover", self.api_base_url)
    }

    /// 从服务器获取某个用户的好友列表
    pub async fn discover_friends(
        &self,
        user_record: &CloudRecordId,
        user_info: &UserInfo,
    ) -> Result<Vec<CloudFriend>> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.discover_url();

        info!("[FriendAPI] 📡 请求好友列表: {}", user_record);
        debug!("[FriendAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .post(&url)
            .header("operationID", &operation_id)
            .json(&DiscoverFriendsReq {
                user_record,
                user_info,
            })
            .send()
            .await
            .context("请求好友列表失败")?;

        let api_resp = handle_http_response::<DiscoverFriendsResp>(response, "好友发现").await?;
        let data = api_resp
            .data
            .ok_or_else(|| anyhow::anyhow!("响应中缺少 data 字段"))?;

        info!(
            "[FriendAPI] ✅ 好友列表响应，用户: {}，好友数: {}",
            user_record,
            data.friends.len()
        );
        Ok(data.friends)
    }
}

#[async_trait]
impl FriendsSource for FriendApi {
    async fn fetch_friends(
        &self,
        user_record: &CloudRecordId,
        user_info: &UserInfo,
    ) -> Result<Vec<CloudFriend>> {
        self.discover_friends(user_record, user_info).await
    }
}

/// 判断错误是否由网络不可达引起（用于区分离线与其它失败）
pub fn is_network_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            return e.is_connect() || e.is_timeout();
        }
        if let Some(e) = cause.downcast_ref::<io::Error>() {
            return matches!(
                e.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::AddrNotAvailable
            );
        }
        false
    })
}
