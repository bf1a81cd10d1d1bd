//! 好友模块
//!
//! 好友列表抓取状态、远端 API、缓存与持久化

pub mod api;
pub mod cache;
pub mod dao;
pub mod listener;
pub mod models;
pub mod state;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出主要类型和函数
pub use api::{is_network_error, FriendApi, FriendsSource};
pub use cache::FriendsCache;
pub use dao::FriendsCacheDao;
pub use listener::{EmptyFriendsFetchListener, FriendsFetchListener};
pub use models::{CachedFriendList, CloudFriend};
pub use state::{FetchFriendsState, FetchPhase};
pub use types::DiscoverFriendsResp;
