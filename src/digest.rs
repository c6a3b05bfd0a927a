use sha2::{Digest, Sha256};

/// 计算任意字节串的 SHA-256 摘要
///
/// # Returns
/// 返回64位小写十六进制字符串
///
/// # Examples
/// ```
/// use recipe_cache_server::digest::digest;
///
/// let tag = digest(b"soup");
/// assert_eq!(tag.len(), 64);
/// ```
pub fn digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
