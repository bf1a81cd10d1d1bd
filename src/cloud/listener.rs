//! 云端状态机监听器回调接口

use async_trait::async_trait;

/// 状态机监听器，每次状态切换后回调
#[async_trait]
pub trait CloudStateListener: Send + Sync {
    async fn on_state_changed(&self, from: &'static str, to: &'static str);
}

/// 空实现（默认监听器）
pub struct EmptyCloudStateListener;

#[async_trait]
impl CloudStateListener for EmptyCloudStateListener {
    async fn on_state_changed(&self, _from: &'static str, _to: &'static str) {}
}
