pub mod cloud;

// 重新导出常用类型，方便外部使用
pub use cloud::{
    client::{ClientConfig, CloudClient},
    friend::{CloudFriend, FetchFriendsState, FriendsCache},
    state::{CloudState, CloudStateMachine},
    types::{CloudRecordId, UserInfo},
};
