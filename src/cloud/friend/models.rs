//! 好友本地模型定义

use crate::cloud::types::CloudRecordId;
use serde::{Deserialize, Serialize};

/// 云端好友数据结构（由记录服务的用户发现接口返回）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudFriend {
    /// 好友的用户记录标识
    #[serde(rename = "userRecordID")]
    pub record_id: CloudRecordId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// 扩展信息
    #[serde(default)]
    pub ex: String,
}

impl CloudFriend {
    pub fn new(
        record_id: CloudRecordId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            record_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            ex: String::new(),
        }
    }

    /// 展示名称：姓名都为空时退回到记录名
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            self.record_id.record_name.clone()
        } else {
            name.to_string()
        }
    }

    /// 姓名首字母（大写），用于头像占位
    pub fn initials(&self) -> String {
        [&self.first_name, &self.last_name]
            .iter()
            .filter_map(|part| part.trim().chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}

/// 单个用户的缓存条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFriendList {
    pub friends: Vec<CloudFriend>,
    /// 抓取时间（毫秒）
    pub fetched_at: i64,
}
