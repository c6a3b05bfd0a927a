use std::fmt;

use hyper::header::{HeaderValue, CACHE_CONTROL, ETAG};
use hyper::HeaderMap;
use tracing::{debug, warn};

use crate::config::CacheConfig;

/// 携带页面级 etag 的带外响应头
pub const X_PAGE_ETAG: &str = "x-page-etag";

/// `cache-control` 响应头：新鲜期 + 后台重新验证窗口（秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDirective {
    pub max_age: u64,
    pub stale_while_revalidate: Option<u64>,
}

impl CacheDirective {
    pub fn new(max_age: u64) -> Self {
        Self {
            max_age,
            stale_while_revalidate: None,
        }
    }

    pub fn with_stale_while_revalidate(mut self, seconds: u64) -> Self {
        self.stale_while_revalidate = Some(seconds);
        self
    }

    pub fn header_value(&self) -> HeaderValue {
        // 只含 ASCII 数字和固定关键字
        HeaderValue::from_str(&self.to_string()).unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
    }
}

impl fmt::Display for CacheDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "max-age={}", self.max_age)?;
        if let Some(swr) = self.stale_while_revalidate {
            write!(f, ", stale-while-revalidate={}", swr)?;
        }
        Ok(())
    }
}

/// 各类响应使用的缓存策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveProfiles {
    /// loader 数据：短新鲜期，菜谱变更后很快失效
    pub resource: CacheDirective,
    /// 整页文档：长新鲜期，etag 已编码访问者和资源状态
    pub page: CacheDirective,
    /// 作者本人的菜谱详情
    pub detail: CacheDirective,
}

impl From<&CacheConfig> for DirectiveProfiles {
    fn from(config: &CacheConfig) -> Self {
        Self {
            resource: CacheDirective::new(config.resource_max_age)
                .with_stale_while_revalidate(config.resource_stale_while_revalidate),
            page: CacheDirective::new(config.page_max_age)
                .with_stale_while_revalidate(config.page_stale_while_revalidate),
            detail: CacheDirective::new(config.detail_max_age),
        }
    }
}

impl Default for DirectiveProfiles {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

/// 页面级响应头：由 loader 的响应头推导
///
/// `etag` 取自 `x-page-etag`，`cache-control` 换成页面策略。
/// loader 响应没有 `x-page-etag`（304 或错误）时不做任何修改并返回 `false`。
pub fn apply_page_headers(headers: &mut HeaderMap, page: &CacheDirective) -> bool {
    let page_etag = match headers.remove(X_PAGE_ETAG) {
        Some(value) => value,
        None => {
            debug!("No page etag on loader response, leaving headers untouched");
            return false;
        }
    };

    if page_etag.is_empty() {
        warn!("Empty page etag on loader response");
    }
    headers.insert(ETAG, page_etag);
    headers.insert(CACHE_CONTROL, page.header_value());
    true
}
