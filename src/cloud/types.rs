use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 默认记录区域名（与云端记录服务保持一致）
pub const DEFAULT_ZONE_NAME: &str = "_defaultZone";

/// 用户附加信息（字符串键到任意 JSON 值），构造时由调用方传入，原样透传
pub type UserInfo = HashMap<String, serde_json::Value>;

/// 云端记录标识（对应远端记录服务中的一条用户记录）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudRecordId {
    pub record_name: String,
    #[serde(default = "default_zone_name")]
    pub zone_name: String,
}

fn default_zone_name() -> String {
    DEFAULT_ZONE_NAME.to_string()
}

impl CloudRecordId {
    /// 使用默认区域创建记录标识
    pub fn new(record_name: impl Into<String>) -> Self {
        Self {
            record_name: record_name.into(),
            zone_name: default_zone_name(),
        }
    }

    /// 指定区域创建记录标识
    pub fn with_zone(record_name: impl Into<String>, zone_name: impl Into<String>) -> Self {
        Self {
            record_name: record_name.into(),
            zone_name: zone_name.into(),
        }
    }

    pub fn is_default_zone(&self) -> bool {
        self.zone_name == DEFAULT_ZONE_NAME
    }
}

impl fmt::Display for CloudRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default_zone() {
            write!(f, "{}", self.record_name)
        } else {
            write!(f, "{}/{}", self.zone_name, self.record_name)
        }
    }
}

/// 反序列化数组字段，处理 null 值
pub(crate) fn deserialize_vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// 统一的 API 响应包装结构体（包含 errCode、errMsg、data）
/// data 字段可能为 null 或缺失，因此使用 Option<T>
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(rename = "errCode")]
    pub err_code: i32,
    #[serde(rename = "errMsg", default)]
    pub err_msg: String,
    pub data: Option<T>,
}

/// 通用 HTTP 响应处理函数：读取 body 后交给 [`parse_api_body`] 解析
pub async fn handle_http_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
) -> anyhow::Result<ApiResponse<T>> {
    use anyhow::Context;

    let status = response.status();
    // body 只能读取一次
    let body_bytes = response.bytes().await.context("读取响应 body 失败")?;
    parse_api_body(status, &body_bytes, operation_name)
}

/// 根据 HTTP 状态和 body 解析统一响应结构，检查错误码
pub fn parse_api_body<T: serde::de::DeserializeOwned>(
    status: reqwest::StatusCode,
    body_bytes: &[u8],
    operation_name: &str,
) -> anyhow::Result<ApiResponse<T>> {
    use tracing::{debug, error};

    let body_str = String::from_utf8_lossy(body_bytes);
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        return Err(anyhow::anyhow!("HTTP 错误 {}: {}", status, body_str));
    }

    let api_resp: ApiResponse<T> = serde_json::from_slice(body_bytes).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        anyhow::anyhow!("反序列化响应失败: {:?}", e)
    })?;

    if api_resp.err_code != 0 {
        error!(
            "[HTTP] {}服务器错误，错误码: {}, 错误信息: {}",
            operation_name, api_resp.err_code, api_resp.err_msg
        );
        return Err(anyhow::anyhow!(
            "服务器错误 {}: {}",
            api_resp.err_code,
            api_resp.err_msg
        ));
    }

    Ok(api_resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[serde(deserialize_with = "deserialize_vec_or_null")]
        items: Vec<String>,
    }

    #[test]
    fn record_id_display_hides_default_zone() {
        assert_eq!(CloudRecordId::new("_abc").to_string(), "_abc");
        assert_eq!(
            CloudRecordId::with_zone("_abc", "Friends").to_string(),
            "Friends/_abc"
        );
    }

    #[test]
    fn record_id_zone_defaults_when_missing() {
        let id: CloudRecordId = serde_json::from_str(r#"{"recordName":"_u1"}"#).unwrap();
        assert_eq!(id, CloudRecordId::new("_u1"));
        assert!(id.is_default_zone());
    }

    #[test]
    fn null_array_becomes_empty() {
        let body = br#"{"errCode":0,"errMsg":"","data":{"items":null}}"#;
        let resp: ApiResponse<Payload> = parse_api_body(StatusCode::OK, body, "测试").unwrap();
        assert!(resp.data.unwrap().items.is_empty());
    }

    #[test]
    fn server_error_code_is_rejected() {
        let body = br#"{"errCode":1004,"errMsg":"record not found","data":null}"#;
        let err = parse_api_body::<Payload>(StatusCode::OK, body, "测试").unwrap_err();
        assert!(err.to_string().contains("1004"));
    }

    #[test]
    fn http_failure_is_rejected() {
        let err = parse_api_body::<Payload>(StatusCode::BAD_GATEWAY, b"upstream", "测试")
            .unwrap_err();
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn malformed_body_is_rejected() {
        assert!(parse_api_body::<Payload>(StatusCode::OK, b"not json", "测试").is_err());
    }
}
