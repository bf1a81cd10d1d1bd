//! 好友抓取监听器回调接口

use async_trait::async_trait;

/// 好友抓取监听器
#[async_trait]
pub trait FriendsFetchListener: Send + Sync {
    /// 抓取完成且好友列表与种子列表不同，参数为 JSON 数组字符串
    async fn on_friend_list_changed(&self, friends_json: String);

    /// 抓取失败，参数为错误描述
    async fn on_fetch_friends_failed(&self, error: String);
}

/// 默认空实现（无操作）
pub struct EmptyFriendsFetchListener;

#[async_trait]
impl FriendsFetchListener for EmptyFriendsFetchListener {
    async fn on_friend_list_changed(&self, _friends_json: String) {}

    async fn on_fetch_friends_failed(&self, _error: String) {}
}
