// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求解码模块
//!
//! 负责把传输层读到的请求头字节解码为强类型的 `Request`：
//! 1. 请求行（方法、原始 URI、版本）的解析。
//! 2. 与连接生命周期相关的标头（`Connection`、`Content-Length`）的提取。
//! 3. 解码失败时以 `Request::undecodable` 占位，让分发器统一产生 400。

use crate::{exception::Exception, param::*};
use log::{debug, warn};

/// 一个已解码的 HTTP 请求（仅请求头，不含请求体）。
///
/// 在一次请求的处理过程中保持不可变。
#[derive(Debug, Clone)]
pub struct Request {
    method: HttpRequestMethod,
    /// 原始请求目标（仍是百分号编码形式，含查询串）
    uri: String,
    version: HttpVersion,
    user_agent: String,
    /// `Connection` 标头的原始值
    connection: Option<String>,
    /// 请求体长度，传输层据此丢弃请求体
    content_length: u64,
    /// `Transfer-Encoding` 标头的原始值。这种分帧方式不被解析，出现时请求后关闭连接
    transfer_encoding: Option<String>,
    decoded: bool,
}

/// 把请求目标拆成路径部分与其后的 `?…`/`#…` 部分（后者含分隔符本身）。
pub fn split_target(target: &str) -> (&str, &str) {
    match target.find(|c| c == '?' || c == '#') {
        Some(i) => target.split_at(i),
        None => (target, ""),
    }
}

impl Request {
    /// 从原始请求头字节构建 `Request`。
    ///
    /// `buffer` 应当是完整的请求头（以空行结束）。方法名不在此处过滤：
    /// 任何语法合法的方法都能解码成功，是否允许由分发器决定。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let request_string = match std::str::from_utf8(buffer) {
            Ok(s) => s,
            Err(_) => {
                warn!("[ID{}]请求头不是合法的UTF-8", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut lines = request_string
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l));

        // 解析请求行 (e.g., "GET /file/a.txt HTTP/1.1")
        let request_line = lines.next().unwrap_or("");
        let parts: Vec<&str> = request_line.split(' ').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            warn!("[ID{}]HTTP请求行格式不正确：{:?}", id, request_line);
            return Err(Exception::BadRequest);
        }

        let method = match HttpRequestMethod::parse(parts[0]) {
            Some(m) => m,
            None => {
                warn!("[ID{}]非法的HTTP方法记号：{:?}", id, parts[0]);
                return Err(Exception::BadRequest);
            }
        };

        let version = match parts[2] {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            other => {
                warn!("[ID{}]不支持的HTTP协议版本：{:?}", id, other);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        let uri = parts[1].to_string();
        if uri.bytes().any(|b| b.is_ascii_control()) {
            warn!("[ID{}]请求目标包含控制字符", id);
            return Err(Exception::BadRequest);
        }

        // 迭代解析 Headers，遇到空行结束
        let mut user_agent = String::new();
        let mut connection = None;
        let mut content_length: Option<u64> = None;
        let mut transfer_encoding: Option<String> = None;
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = match line.split_once(':') {
                Some((n, v)) if !n.is_empty() && !n.ends_with(' ') => (n, v.trim()),
                _ => {
                    warn!("[ID{}]无法解析的请求头行：{:?}", id, line);
                    return Err(Exception::BadRequest);
                }
            };
            match name.to_ascii_lowercase().as_str() {
                "user-agent" => user_agent = value.to_string(),
                "connection" => connection = Some(value.to_string()),
                "transfer-encoding" => transfer_encoding = Some(value.to_string()),
                "content-length" => {
                    let len = match value.parse::<u64>() {
                        Ok(len) => len,
                        Err(_) => {
                            warn!("[ID{}]非法的Content-Length：{:?}", id, value);
                            return Err(Exception::BadRequest);
                        }
                    };
                    // 重复且不一致的 Content-Length 是请求走私的典型特征
                    if content_length.map_or(false, |prev| prev != len) {
                        warn!("[ID{}]存在多个不一致的Content-Length", id);
                        return Err(Exception::BadRequest);
                    }
                    content_length = Some(len);
                }
                _ => {}
            }
        }

        // 两种分帧方式同时出现时无法确定请求体边界
        if transfer_encoding.is_some() && content_length.is_some() {
            warn!("[ID{}]Transfer-Encoding与Content-Length同时出现", id);
            return Err(Exception::BadRequest);
        }

        debug!("[ID{}]请求解码完成：{} {} {}", id, method, uri, version);

        Ok(Self {
            method,
            uri,
            version,
            user_agent,
            connection,
            content_length: content_length.unwrap_or(0),
            transfer_encoding,
            decoded: true,
        })
    }

    /// 解码失败时的占位请求。分发器看到它只会回复 400。
    pub fn undecodable() -> Self {
        Self {
            method: HttpRequestMethod::Get,
            uri: String::new(),
            version: HttpVersion::V1_1,
            user_agent: String::new(),
            connection: None,
            content_length: 0,
            transfer_encoding: None,
            decoded: false,
        }
    }

    /// 客户端是否希望复用连接。
    ///
    /// `Connection: close` 总是关闭；HTTP/1.1 默认保持；
    /// HTTP/1.0 只有显式 `Connection: keep-alive` 才保持。
    /// 带 `Transfer-Encoding` 的请求体无法跳过，因此这类请求之后总是关闭。
    pub fn is_keep_alive(&self) -> bool {
        if self.transfer_encoding.is_some() {
            return false;
        }
        let has_token = |token: &str| {
            self.connection.as_deref().map_or(false, |v| {
                v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token))
            })
        };
        if has_token("close") {
            return false;
        }
        match self.version {
            HttpVersion::V1_1 => true,
            HttpVersion::V1_0 => has_token("keep-alive"),
        }
    }
}

// --- Getter 访问器实现 ---

impl Request {
    pub fn is_decoded(&self) -> bool {
        self.decoded
    }

    pub fn method(&self) -> &HttpRequestMethod {
        &self.method
    }

    /// 原始请求目标（含查询串）
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// 去掉查询串与片段后的路径部分，仍为百分号编码形式
    pub fn path(&self) -> &str {
        split_target(&self.uri).0
    }

    /// 查询串（不含 `?`）。片段中的 `?` 不算查询串
    pub fn query(&self) -> Option<&str> {
        let rest = split_target(&self.uri).1.strip_prefix('?')?;
        Some(rest.split('#').next().unwrap_or(rest))
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn transfer_encoding(&self) -> Option<&str> {
        self.transfer_encoding.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<Request, Exception> {
        Request::try_from(s.as_bytes(), 0)
    }

    #[test]
    fn test_parse_get_request() {
        let request = parse(
            "GET /file/readme.txt HTTP/1.1\r\nHost: localhost:8088\r\nUser-Agent: Test-Browser\r\n\r\n",
        )
        .unwrap();

        assert!(request.is_decoded());
        assert_eq!(request.method(), &HttpRequestMethod::Get);
        assert_eq!(request.uri(), "/file/readme.txt");
        assert_eq!(request.user_agent(), "Test-Browser");
        assert_eq!(request.version(), HttpVersion::V1_1);
        assert_eq!(request.content_length(), 0);
    }

    #[test]
    fn test_other_methods_still_decode() {
        let request = parse("DELETE /file/a HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        assert_eq!(request.method(), &HttpRequestMethod::Delete);

        let request = parse("PURGE /file/a HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(request.method(), &HttpRequestMethod::Other("PURGE".to_string()));
    }

    #[test]
    fn test_malformed_request_line() {
        for raw in [
            "GET\r\n\r\n",
            "GET /file/a\r\n\r\n",
            "GET  /file/a HTTP/1.1\r\n\r\n",
            "GET /file/a HTTP/1.1 extra\r\n\r\n",
            "G(T /file/a HTTP/1.1\r\n\r\n",
            "",
        ] {
            assert_eq!(parse(raw).unwrap_err(), Exception::BadRequest, "{:?}", raw);
        }
    }

    #[test]
    fn test_unsupported_http_version() {
        for raw in ["GET / HTTP/2.0\r\n\r\n", "GET / HTTP/A.B\r\n\r\n", "GET / INVALID\r\n\r\n"] {
            assert_eq!(parse(raw).unwrap_err(), Exception::UnsupportedHttpVersion);
        }
    }

    #[test]
    fn test_invalid_utf8() {
        let result = Request::try_from(&[0xFF, 0xFE, 0xFD], 0);
        assert_eq!(result.unwrap_err(), Exception::RequestIsNotUtf8);
    }

    #[test]
    fn test_malformed_header_line() {
        let result = parse("GET / HTTP/1.1\r\nno colon here\r\n\r\n");
        assert_eq!(result.unwrap_err(), Exception::BadRequest);

        let result = parse("GET / HTTP/1.1\r\nHost : x\r\n\r\n");
        assert_eq!(result.unwrap_err(), Exception::BadRequest);
    }

    #[test]
    fn test_conflicting_content_length() {
        let result =
            parse("POST / HTTP/1.1\r\nContent-Length: 10\r\nContent-Length: 5\r\n\r\n");
        assert_eq!(result.unwrap_err(), Exception::BadRequest);

        let request =
            parse("POST / HTTP/1.1\r\nContent-Length: 4\r\ncontent-length: 4\r\n\r\n").unwrap();
        assert_eq!(request.content_length(), 4);
    }

    #[test]
    fn test_keep_alive_defaults() {
        assert!(parse("GET / HTTP/1.1\r\n\r\n").unwrap().is_keep_alive());
        assert!(!parse("GET / HTTP/1.0\r\n\r\n").unwrap().is_keep_alive());
    }

    #[test]
    fn test_keep_alive_headers() {
        let r = parse("GET / HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap();
        assert!(!r.is_keep_alive());

        let r = parse("GET / HTTP/1.0\r\nconnection: Keep-Alive\r\n\r\n").unwrap();
        assert!(r.is_keep_alive());

        let r = parse("GET / HTTP/1.1\r\nConnection: Upgrade, close\r\n\r\n").unwrap();
        assert!(!r.is_keep_alive());
    }

    #[test]
    fn test_path_and_query() {
        let r = parse("GET /file/a.txt?x=1&y=2#frag HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(r.path(), "/file/a.txt");
        assert_eq!(r.query(), Some("x=1&y=2"));

        let r = parse("GET /file/a.txt HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(r.path(), "/file/a.txt");
        assert_eq!(r.query(), None);
    }

    #[test]
    fn test_question_mark_in_fragment_is_not_query() {
        let r = parse("GET /file/a#x?y HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(r.path(), "/file/a");
        assert_eq!(r.query(), None);

        let r = parse("GET /file/a?q=1#x?y HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(r.query(), Some("q=1"));
    }

    #[test]
    fn test_split_target() {
        assert_eq!(split_target("/file/a?x=1"), ("/file/a", "?x=1"));
        assert_eq!(split_target("/file/a#f"), ("/file/a", "#f"));
        assert_eq!(split_target("/file/a"), ("/file/a", ""));
    }

    #[test]
    fn test_chunked_request_closes_connection() {
        let r = parse("GET /file/a HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n").unwrap();
        assert_eq!(r.transfer_encoding(), Some("chunked"));
        assert_eq!(r.content_length(), 0);
        assert!(!r.is_keep_alive());

        let r = parse(
            "GET /file/a HTTP/1.1\r\nTransfer-Encoding: chunked\r\nConnection: keep-alive\r\n\r\n",
        )
        .unwrap();
        assert!(!r.is_keep_alive());
    }

    #[test]
    fn test_transfer_encoding_with_content_length_rejected() {
        let result = parse(
            "POST / HTTP/1.1\r\nContent-Length: 5\r\nTransfer-Encoding: chunked\r\n\r\n",
        );
        assert_eq!(result.unwrap_err(), Exception::BadRequest);
    }

    #[test]
    fn test_bare_lf_line_endings() {
        let r = parse("GET /file/ HTTP/1.1\nUser-Agent: curl\n\n").unwrap();
        assert_eq!(r.uri(), "/file/");
        assert_eq!(r.user_agent(), "curl");
    }

    #[test]
    fn test_undecodable_placeholder() {
        let r = Request::undecodable();
        assert!(!r.is_decoded());
    }
}
