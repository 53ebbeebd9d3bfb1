// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 定义文件服务器在请求处理生命周期中可能出现的各类异常。
//!
//! ## 设计意图
//! - **错误分类**：协议解析错误、路径策略违规、资源缺失以及内部 I/O 故障。
//! - **语义映射**：每个变体通过 [`Exception::status_code`] 对应唯一的 HTTP 状态码，
//!   分发器据此生成错误响应。
//! - **信息隐藏**：所有路径策略违规统一映射为 403，响应正文不会透露具体是哪一项检查失败，
//!   具体原因只出现在服务端日志中。

use std::{fmt, io};

/// 服务器处理请求过程中发生的异常类型。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 请求头无法按 HTTP/1.x 报文格式解析。
    BadRequest,
    /// 请求字节流不是合法的 UTF-8。
    RequestIsNotUtf8,
    /// 客户端使用了 HTTP/1.0 与 HTTP/1.1 之外的协议版本。
    UnsupportedHttpVersion,
    /// 请求头超过了配置的上限。
    RequestTooLarge,
    /// 非 GET 方法。
    MethodNotAllowed,
    /// 解码后的 URI 不在发布前缀之下。
    PrefixMismatch,
    /// URI 含有 `<`、`>`、`&`、`"` 或 NUL 字符。
    InsecureUri,
    /// URI 含有 `.` 或 `..` 路径分量。
    PathTraversal,
    /// 规范化后的路径逃逸出了文档根目录（例如经由符号链接）。
    OutsideRoot,
    /// 目标存在，但既不是目录也不是普通文件。
    NotRegularFile,
    /// 目标不存在、是隐藏文件，或在检查与打开之间被删除。
    FileNotFound,
    /// 构建或发送响应时发生的意外 I/O 故障。
    Internal(io::ErrorKind),
}

use Exception::*;

impl Exception {
    /// 该异常对应的 HTTP 状态码。
    pub fn status_code(&self) -> u16 {
        match self {
            BadRequest | RequestIsNotUtf8 | UnsupportedHttpVersion | RequestTooLarge => 400,
            MethodNotAllowed => 405,
            PrefixMismatch | InsecureUri | PathTraversal | OutsideRoot | NotRegularFile => 403,
            FileNotFound => 404,
            Internal(_) => 500,
        }
    }

    /// 是否属于需要以 `warn` 级别记录的安全相关事件。
    pub fn is_policy_violation(&self) -> bool {
        self.status_code() == 403
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BadRequest => write!(f, "Malformed HTTP request"),
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            RequestTooLarge => write!(f, "Request head exceeds the size limit"),
            MethodNotAllowed => write!(f, "Method not allowed"),
            PrefixMismatch => write!(f, "URI is not under the published prefix"),
            InsecureUri => write!(f, "URI contains insecure characters"),
            PathTraversal => write!(f, "URI contains a dot path segment"),
            OutsideRoot => write!(f, "Path escapes the document root"),
            NotRegularFile => write!(f, "Target is not a regular file"),
            FileNotFound => write!(f, "File not found"),
            Internal(kind) => write!(f, "Internal I/O failure: {}", kind),
        }
    }
}

impl std::error::Error for Exception {}

impl From<io::Error> for Exception {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => FileNotFound,
            kind => Internal(kind),
        }
    }
}
