//! 云端好友 CLI
//!
//! 非交互式 CLI：抓取指定用户记录的好友列表并输出，也可用于清空本地好友缓存

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use cloud_friends_sdk_rust::cloud::friend::FriendsFetchListener;
use cloud_friends_sdk_rust::cloud::listener::CloudStateListener;
use cloud_friends_sdk_rust::{ClientConfig, CloudClient, CloudRecordId, UserInfo};
use std::sync::Arc;
use tracing::{error, info};

/// 云端好友 CLI
#[derive(Parser, Debug)]
#[command(name = "cloud-friends-cli")]
#[command(about = "云端好友 CLI - 抓取并展示好友列表", long_about = None)]
struct Args {
    /// 用户记录名
    #[arg(short, long)]
    record_name: Option<String>,

    /// 记录区域名
    #[arg(short, long, default_value = "_defaultZone")]
    zone: String,

    /// 认证 token
    #[arg(short, long, default_value = "")]
    token: String,

    /// API 基础地址
    #[arg(long, default_value = "http://localhost:10002")]
    api_base_url: String,

    /// 好友缓存数据库 URL，传空字符串则只使用内存缓存
    #[arg(long, default_value = "sqlite://cloud_friends.db?mode=rwc")]
    db_url: String,

    /// 抓取前先清空好友缓存
    #[arg(long)]
    clear_cache: bool,

    /// 日志级别（默认: info,cloud_friends_sdk_rust=debug）
    #[arg(long, default_value = "info,cloud_friends_sdk_rust=debug")]
    log_level: String,
}

/// 初始化日志
fn init_logger(log_level: &str) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .init();
}

struct CliListener;

#[async_trait]
impl FriendsFetchListener for CliListener {
    async fn on_friend_list_changed(&self, friends_json: String) {
        info!("[CLI/Friend] 👥 好友列表变更: {}", friends_json);
    }

    async fn on_fetch_friends_failed(&self, error: String) {
        error!("[CLI/Friend] ❌ 抓取失败: {}", error);
    }
}

#[async_trait]
impl CloudStateListener for CliListener {
    async fn on_state_changed(&self, from: &'static str, to: &'static str) {
        info!("[CLI/State] 🔄 {} -> {}", from, to);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level);

    let mut config = ClientConfig::new(args.token.clone());
    config.api_base_url = args.api_base_url.clone();
    config.friends_db_url = (!args.db_url.is_empty()).then(|| args.db_url.clone());

    let client = CloudClient::connect(config).await?;
    let listener = Arc::new(CliListener);
    client.set_friends_listener(listener.clone()).await;
    client.set_state_listener(listener).await;

    if args.clear_cache {
        client.clear_friends_cache().await?;
        info!("[CLI] 🧹 好友缓存已清空");
    }

    let Some(record_name) = args.record_name else {
        if !args.clear_cache {
            error!("[CLI] 未指定 --record-name，无事可做");
        }
        return Ok(());
    };

    let user_record = CloudRecordId::with_zone(record_name, args.zone);
    info!("[CLI] 🚀 抓取好友: {}", user_record);

    let friends = client.fetch_friends(user_record, UserInfo::new()).await?;
    info!(
        "[CLI] 👥 好友列表（共 {} 个，状态: {}）",
        friends.len(),
        client.current_state_name()
    );
    for friend in &friends {
        info!(
            "[CLI]   - [{}] {} ({})",
            friend.initials(),
            friend.display_name(),
            friend.record_id
        );
    }

    Ok(())
}
