// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了文件服务器遵循的 HTTP 协议相关常量和数据结构，包括：
//! - 服务器用到的 HTTP 状态码及其原因短语（Reason Phrase）。
//! - 静态的后缀名到 MIME 类型映射表（不依赖运行环境的 MIME 数据库）。
//! - HTTP 方法与版本的强类型枚举。

use std::{collections::HashMap, fmt, path::Path};

use lazy_static::lazy_static;
use regex::Regex;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "shaneyale-fileserver";

/// HTTP 协议规定的换行符
pub const CRLF: &str = "\r\n";

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 8088;

/// 默认的发布前缀，所有可访问的 URI 都必须位于其下
pub const DEFAULT_PREFIX: &str = "/file/";

/// 流式传输时每个分块的默认大小（8 KiB）
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// 请求头的默认长度上限（64 KiB）
pub const DEFAULT_MAX_HEAD_SIZE: usize = 65536;

/// 无法识别后缀时使用的兜底类型
pub const OCTET_STREAM: &str = "application/octet-stream";

/// 生成的 HTML 内容（目录列表）的类型
pub const TEXT_HTML: &str = "text/html; charset=UTF-8";

/// 错误响应正文的类型
pub const TEXT_PLAIN: &str = "text/plain; charset=UTF-8";

lazy_static! {
    /// 目录列表中允许渲染为链接的文件名：字母数字开头，仅含有限的标点。
    pub static ref ALLOWED_FILE_NAME: Regex =
        Regex::new(r"^[A-Za-z0-9][-_A-Za-z0-9.]*$").unwrap();

    /// 可能在重定向或目录列表中造成标记/头部注入的字符。
    pub static ref INSECURE_URI: Regex = Regex::new(r#"[<>&"\x00]"#).unwrap();
}

lazy_static! {
    /// 本服务器会产生的状态码及其原因短语。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(302, "Found");
        map.insert(400, "Bad Request");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(500, "Internal Server Error");
        map
    };
}

lazy_static! {
    /// 文件后缀名（小写）到 MIME 类型的映射表。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        // 文本
        map.insert("txt", "text/plain; charset=UTF-8");
        map.insert("md", "text/markdown; charset=UTF-8");
        map.insert("log", "text/plain; charset=UTF-8");
        map.insert("csv", "text/csv; charset=UTF-8");
        map.insert("htm", "text/html; charset=UTF-8");
        map.insert("html", "text/html; charset=UTF-8");
        map.insert("css", "text/css; charset=UTF-8");
        map.insert("js", "text/javascript; charset=UTF-8");
        map.insert("mjs", "text/javascript; charset=UTF-8");
        map.insert("xml", "text/xml");
        map.insert("json", "application/json");
        // 图片
        map.insert("bmp", "image/bmp");
        map.insert("gif", "image/gif");
        map.insert("ico", "image/x-icon");
        map.insert("jpg", "image/jpeg");
        map.insert("jpeg", "image/jpeg");
        map.insert("png", "image/png");
        map.insert("svg", "image/svg+xml");
        map.insert("webp", "image/webp");
        // 音视频
        map.insert("mp3", "audio/mpeg");
        map.insert("wav", "audio/wav");
        map.insert("ogg", "audio/ogg");
        map.insert("mp4", "video/mp4");
        map.insert("webm", "video/webm");
        map.insert("mkv", "video/x-matroska");
        // 字体
        map.insert("ttf", "font/ttf");
        map.insert("otf", "font/otf");
        map.insert("woff", "font/woff");
        map.insert("woff2", "font/woff2");
        // 文档与归档
        map.insert("pdf", "application/pdf");
        map.insert("zip", "application/zip");
        map.insert("gz", "application/gzip");
        map.insert("tar", "application/x-tar");
        map.insert("7z", "application/x-7z-compressed");
        map.insert("jar", "application/java-archive");
        map.insert("wasm", "application/wasm");
        map
    };
}

/// 根据文件名后缀推断 MIME 类型，未知后缀返回 [`OCTET_STREAM`]。
pub fn mime_for(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(|e| MIME_TYPES.get(e.to_ascii_lowercase().as_str()).copied())
        .unwrap_or(OCTET_STREAM)
}

/// 状态码对应的原因短语；未登记的状态码返回空串。
pub fn reason_phrase(code: u16) -> &'static str {
    STATUS_CODES.get(&code).copied().unwrap_or("")
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    V1_0,
    V1_1,
}

/// HTTP 请求方法。只有 `Get` 会被服务，其余一律得到 405。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpRequestMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
    Trace,
    Connect,
    /// 语法合法但未登记的扩展方法
    Other(String),
}

impl HttpRequestMethod {
    /// 解析请求行中的方法记号。方法名区分大小写（RFC 9110）。
    pub fn parse(token: &str) -> Option<Self> {
        if token.is_empty() || !token.bytes().all(is_token_byte) {
            return None;
        }
        Some(match token {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "OPTIONS" => Self::Options,
            "PATCH" => Self::Patch,
            "TRACE" => Self::Trace,
            "CONNECT" => Self::Connect,
            other => Self::Other(other.to_string()),
        })
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_0 => write!(f, "HTTP/1.0"),
            HttpVersion::V1_1 => write!(f, "HTTP/1.1"),
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpRequestMethod::Get => write!(f, "GET"),
            HttpRequestMethod::Head => write!(f, "HEAD"),
            HttpRequestMethod::Post => write!(f, "POST"),
            HttpRequestMethod::Put => write!(f, "PUT"),
            HttpRequestMethod::Delete => write!(f, "DELETE"),
            HttpRequestMethod::Options => write!(f, "OPTIONS"),
            HttpRequestMethod::Patch => write!(f, "PATCH"),
            HttpRequestMethod::Trace => write!(f, "TRACE"),
            HttpRequestMethod::Connect => write!(f, "CONNECT"),
            HttpRequestMethod::Other(m) => write!(f, "{}", m),
        }
    }
}
