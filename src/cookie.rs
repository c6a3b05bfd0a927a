use std::collections::HashMap;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// 与浏览器 `encodeURIComponent` 保持一致的保留字符集
const COOKIE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// 解析 `Cookie` 请求头为 name -> value
pub fn parse_cookie_header(header: &str) -> HashMap<&str, &str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(name, value)| (name.trim(), value.trim().trim_matches('"')))
        .collect()
}

/// 命名 cookie 的值编解码：base64(JSON)，可选 HMAC-SHA256 签名
#[derive(Debug, Clone)]
pub struct CookieCodec {
    name: String,
    secrets: Vec<String>,
    path: String,
    http_only: bool,
    secure: bool,
}

impl CookieCodec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secrets: Vec::new(),
            path: "/".to_string(),
            http_only: false,
            secure: false,
        }
    }

    /// 第一个 secret 用于签名，全部 secret 用于校验
    pub fn with_secrets(mut self, secrets: Vec<String>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_signed(&self) -> bool {
        !self.secrets.is_empty()
    }

    /// 从 `Cookie` 头读取并解码；缺失、签名错误或格式错误都视为没有
    pub fn parse<T: DeserializeOwned>(&self, cookie_header: Option<&str>) -> Option<T> {
        let header = cookie_header?;
        let raw = *parse_cookie_header(header).get(self.name.as_str())?;
        let raw = percent_decode_str(raw).decode_utf8().ok()?;

        let encoded = if self.is_signed() {
            match self.unsign(&raw) {
                Some(value) => value,
                None => {
                    warn!("Rejected cookie {} with invalid signature", self.name);
                    return None;
                }
            }
        } else {
            raw.as_ref()
        };

        let json = STANDARD.decode(encoded).ok()?;
        match serde_json::from_slice(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Failed to decode cookie {}: {}", self.name, e);
                None
            }
        }
    }

    /// 生成 `Set-Cookie` 头的值
    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<String> {
        let mut encoded = STANDARD.encode(serde_json::to_vec(value)?);
        if let Some(secret) = self.secrets.first() {
            let signature = STANDARD_NO_PAD.encode(sign(secret, &encoded)?);
            encoded = format!("{}.{}", encoded, signature);
        }

        let value = utf8_percent_encode(&encoded, COOKIE_VALUE);
        let mut cookie = format!("{}={}; Path={}", self.name, value, self.path);
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str("; SameSite=Lax");
        Ok(cookie)
    }

    fn unsign<'a>(&self, signed: &'a str) -> Option<&'a str> {
        let (value, signature) = signed.rsplit_once('.')?;
        let signature = STANDARD_NO_PAD.decode(signature.trim_end_matches('=')).ok()?;

        self.secrets
            .iter()
            .any(|secret| verify(secret, value, &signature))
            .then_some(value)
    }
}

fn mac_for(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Config(format!("Invalid cookie secret: {}", e)))
}

fn sign(secret: &str, value: &str) -> Result<Vec<u8>> {
    let mut mac = mac_for(secret)?;
    mac.update(value.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn verify(secret: &str, value: &str, signature: &[u8]) -> bool {
    match mac_for(secret) {
        Ok(mut mac) => {
            mac.update(value.as_bytes());
            mac.verify_slice(signature).is_ok()
        }
        Err(_) => false,
    }
}
