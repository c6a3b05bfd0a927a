use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, HeaderMap, Response, StatusCode, Uri};
use serde::Serialize;

use crate::error::Result;

/// 从 URL 字符串中提取路径部分
pub fn get_url_path(url: &str) -> &str {
    url.split('?')
        .next()
        .unwrap_or(url)
        .split('#')
        .next()
        .unwrap_or(url)
}

/// 查询串中是否带有某个参数（有无值均可）
///
/// # Examples
/// ```
/// use recipe_cache_server::utils::has_query_param;
///
/// let uri = "/discover/r1?_data=routes%2Fdiscover".parse().unwrap();
/// assert!(has_query_param(&uri, "_data"));
/// ```
pub fn has_query_param(uri: &Uri, name: &str) -> bool {
    uri.query()
        .map(|query| url::form_urlencoded::parse(query.as_bytes()).any(|(key, _)| key == name))
        .unwrap_or(false)
}

/// 读取请求头的字符串值，非 ASCII 值视为缺失
pub fn header_str<'a>(headers: &'a HeaderMap, name: impl hyper::header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// JSON 响应
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Body>> {
    let body = serde_json::to_vec(value)?;
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::IF_NONE_MATCH;

    #[test]
    fn test_get_url_path() {
        assert_eq!(get_url_path("http://example.com/path?query=1"), "http://example.com/path");
        assert_eq!(get_url_path("/path?query=1#fragment"), "/path");
        assert_eq!(get_url_path("/path"), "/path");
    }

    #[test]
    fn test_has_query_param() {
        let uri: Uri = "/discover/r1?_data".parse().unwrap();
        assert!(has_query_param(&uri, "_data"));

        let uri: Uri = "/discover/r1?x=1&_data=routes%2Fdiscover.%24recipeId".parse().unwrap();
        assert!(has_query_param(&uri, "_data"));

        let uri: Uri = "/discover/r1?data=1".parse().unwrap();
        assert!(!has_query_param(&uri, "_data"));

        let uri: Uri = "/discover/r1".parse().unwrap();
        assert!(!has_query_param(&uri, "_data"));
    }

    #[test]
    fn test_header_str() {
        let mut headers = HeaderMap::new();
        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("abc"));
        assert_eq!(header_str(&headers, IF_NONE_MATCH), Some("abc"));
        assert_eq!(header_str(&headers, "cookie"), None);
    }

    #[tokio::test]
    async fn test_json_response() {
        let response = json_response(StatusCode::CREATED, &serde_json::json!({ "ok": true })).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], br#"{"ok":true}"#);
    }
}
