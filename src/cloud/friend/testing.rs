//! 测试用的好友数据来源

use crate::cloud::friend::api::FriendsSource;
use crate::cloud::friend::models::CloudFriend;
use crate::cloud::types::{CloudRecordId, UserInfo};
use anyhow::Result;
use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

pub(crate) fn friends(names: &[&str]) -> Vec<CloudFriend> {
    names
        .iter()
        .map(|n| CloudFriend::new(CloudRecordId::new(*n), *n, "Test"))
        .collect()
}

pub(crate) fn user_info() -> UserInfo {
    let mut info = UserInfo::new();
    info.insert("firstName".to_string(), serde_json::json!("Ada"));
    info
}

/// 返回固定好友列表
pub(crate) struct StaticSource {
    friends: Vec<CloudFriend>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub(crate) fn new(friends: Vec<CloudFriend>) -> Self {
        Self {
            friends,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FriendsSource for StaticSource {
    async fn fetch_friends(
        &self,
        _user_record: &CloudRecordId,
        _user_info: &UserInfo,
    ) -> Result<Vec<CloudFriend>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.friends.clone())
    }
}

/// 总是失败：`offline` 为 true 时模拟网络不可达，否则模拟服务器错误
pub(crate) struct FailingSource {
    pub(crate) offline: bool,
}

#[async_trait]
impl FriendsSource for FailingSource {
    async fn fetch_friends(
        &self,
        _user_record: &CloudRecordId,
        _user_info: &UserInfo,
    ) -> Result<Vec<CloudFriend>> {
        if self.offline {
            Err(anyhow::Error::new(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))
            .context("请求好友列表失败"))
        } else {
            Err(anyhow::anyhow!("服务器错误 1004: record not found"))
        }
    }
}

/// 开始抓取后挂起，直到测试放行
pub(crate) struct GatedSource {
    friends: Vec<CloudFriend>,
    pub(crate) started: Notify,
    pub(crate) release: Notify,
}

impl GatedSource {
    pub(crate) fn new(friends: Vec<CloudFriend>) -> Self {
        Self {
            friends,
            started: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl FriendsSource for GatedSource {
    async fn fetch_friends(
        &self,
        _user_record: &CloudRecordId,
        _user_info: &UserInfo,
    ) -> Result<Vec<CloudFriend>> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(self.friends.clone())
    }
}
