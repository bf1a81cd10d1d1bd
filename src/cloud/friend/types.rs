//! 好友 API DTO（请求和响应结构体）

use crate::cloud::friend::models::CloudFriend;
use crate::cloud::types::{deserialize_vec_or_null, CloudRecordId, UserInfo};
use serde::{Deserialize, Serialize};

/// 好友发现请求
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverFriendsReq<'a> {
    pub user_record: &'a CloudRecordId,
    pub user_info: &'a UserInfo,
}

/// 好友发现响应
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverFriendsResp {
    #[serde(default, deserialize_with = "deserialize_vec_or_null")]
    pub friends: Vec<CloudFriend>,
}
