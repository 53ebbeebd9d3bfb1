use crate::{
    param::*,
    stream::FileStream,
};

use bytes::Bytes;
use chrono::prelude::*;

/// 响应正文：内联字节，或交由传输层逐块拉取的文件流。
#[derive(Debug)]
pub enum Body {
    Empty,
    Full(Bytes),
    Stream(FileStream),
}

/// 一次请求对应的唯一终结响应。构建后只追加，交给传输层后不再修改。
#[derive(Debug)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    content_type: Option<String>,
    content_length: u64,
    date: DateTime<Utc>,
    server_name: String,
    location: Option<String>,
    allow: Option<Vec<HttpRequestMethod>>,
    keep_alive: bool,
    body: Body,
}

impl Response {
    fn new(code: u16) -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: code,
            information: reason_phrase(code).to_string(),
            content_type: None,
            content_length: 0,
            date: Utc::now(),
            server_name: SERVER_NAME.to_string(),
            location: None,
            allow: None,
            keep_alive: false,
            body: Body::Empty,
        }
    }

    /// 统一格式的错误响应：`text/plain`，正文 `Failure: <状态>`，发送后总是关闭连接。
    pub fn error(code: u16) -> Self {
        let mut response = Self::new(code);
        let text = format!("Failure: {} {}{}", code, response.information, CRLF);
        response.content_type = Some(TEXT_PLAIN.to_string());
        response.set_content(Bytes::from(text));
        if code == 405 {
            response.allow = Some(vec![HttpRequestMethod::Get]);
        }
        response
    }

    /// 302 重定向到规范的带尾斜杠形式。
    pub fn redirect(location: &str) -> Self {
        let mut response = Self::new(302);
        response.location = Some(location.to_string());
        response
    }

    /// 目录列表。列表是低频的终结响应，发送后关闭连接。
    pub fn listing(html: String) -> Self {
        let mut response = Self::new(200);
        response.content_type = Some(TEXT_HTML.to_string());
        response.set_content(Bytes::from(html));
        response
    }

    /// 文件流响应。`Content-Length` 取自描述符的总长度。
    pub fn file(stream: FileStream, mime: &str, keep_alive: bool) -> Self {
        let mut response = Self::new(200);
        response.content_type = Some(mime.to_string());
        response.content_length = stream.length();
        response.keep_alive = keep_alive;
        response.body = Body::Stream(stream);
        response
    }

    fn set_content(&mut self, content: Bytes) {
        self.content_length = content.len() as u64;
        self.body = Body::Full(content);
    }

    /// 序列化状态行与响应头（含结尾空行）。
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "{} {} {}{}",
            self.version, self.status_code, self.information, CRLF
        );
        if let Some(t) = &self.content_type {
            head.push_str(&format!("Content-Type: {}{}", t, CRLF));
        }
        head.push_str(&format!("Content-Length: {}{}", self.content_length, CRLF));
        if let Some(l) = &self.location {
            head.push_str(&format!("Location: {}{}", l, CRLF));
        }
        if let Some(a) = &self.allow {
            let methods: Vec<String> = a.iter().map(|m| m.to_string()).collect();
            head.push_str(&format!("Allow: {}{}", methods.join(", "), CRLF));
        }
        head.push_str(match self.keep_alive {
            true => "Connection: keep-alive\r\n",
            false => "Connection: close\r\n",
        });
        head.push_str(&format!("Date: {}{}", format_date(&self.date), CRLF));
        head.push_str(&format!("Server: {}{}", self.server_name, CRLF));
        head.push_str(CRLF);
        head.into_bytes()
    }

    /// 拆分为响应头字节与正文，交给传输层。
    pub fn into_parts(self) -> (Vec<u8>, Body) {
        let head = self.head_bytes();
        (head, self.body)
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn is_keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// 发送完毕后传输层是否必须关闭连接
    pub fn should_close(&self) -> bool {
        !self.keep_alive
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.body, Body::Stream(_))
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

/// RFC 9110 的 IMF-fixdate 格式
fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
