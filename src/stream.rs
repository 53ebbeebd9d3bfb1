// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 流式传输模块
//!
//! 大文件从不整体读入内存：分发器只交出一个 [`FileStream`] 描述符
//! （文件句柄、起始偏移、总字节数、分块大小），由传输层按写端的背压逐块拉取。
//!
//! 文件句柄唯一地归属于 `FileStream`。无论传输正常结束、出错，还是连接中途断开导致
//! future 被丢弃，句柄都随 `FileStream` 的析构而释放。

use std::{cmp, fmt, fs, io};

use bytes::Bytes;
use log::debug;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt},
};

/// 传输进度的观测钩子。只用于诊断，不参与控制流。
#[cfg_attr(test, mockall::automock)]
pub trait TransferObserver: Send + Sync {
    /// 每写出一个分块后调用
    fn on_progress(&self, id: u128, sent: u64, total: u64);
    /// 正文与结束标记都已刷出
    fn on_complete(&self, id: u128, total: u64);
    /// 传输中途失败
    fn on_abort(&self, id: u128, sent: u64, total: u64);
}

/// 默认观测者：以 `debug` 级别记录进度。
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TransferObserver for LogObserver {
    fn on_progress(&self, id: u128, sent: u64, total: u64) {
        debug!("[ID{}]传输进度: {} / {}", id, sent, total);
    }

    fn on_complete(&self, id: u128, total: u64) {
        debug!("[ID{}]传输完成，共 {} 字节", id, total);
    }

    fn on_abort(&self, id: u128, sent: u64, total: u64) {
        debug!("[ID{}]传输中止: {} / {}", id, sent, total);
    }
}

/// 一次文件传输的描述符，同时是文件句柄的唯一所有者。
pub struct FileStream {
    file: File,
    offset: u64,
    length: u64,
    chunk_size: usize,
    sent: u64,
    positioned: bool,
}

impl FileStream {
    /// 从 `offset` 开始读取 `length` 字节，每块至多 `chunk_size` 字节。
    pub fn new(file: fs::File, offset: u64, length: u64, chunk_size: usize) -> Self {
        Self {
            file: File::from_std(file),
            offset,
            length,
            chunk_size: cmp::max(chunk_size, 1),
            sent: 0,
            positioned: offset == 0,
        }
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// 读取下一个分块；全部字节读完后返回 `None`。
    ///
    /// 文件在传输过程中被截断时返回 `UnexpectedEof`，因为响应头里的
    /// `Content-Length` 已经无法兑现。
    pub async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let remaining = self.length - self.sent;
        if remaining == 0 {
            return Ok(None);
        }
        if !self.positioned {
            self.file.seek(io::SeekFrom::Start(self.offset)).await?;
            self.positioned = true;
        }
        let want = cmp::min(self.chunk_size as u64, remaining) as usize;
        let mut buf = vec![0u8; want];
        let n = self.file.read(&mut buf).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("文件在传输过程中被截断：{} / {}", self.sent, self.length),
            ));
        }
        buf.truncate(n);
        self.sent += n as u64;
        Ok(Some(Bytes::from(buf)))
    }
}

impl fmt::Debug for FileStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStream")
            .field("offset", &self.offset)
            .field("length", &self.length)
            .field("chunk_size", &self.chunk_size)
            .field("sent", &self.sent)
            .finish()
    }
}

/// 把整个文件正文写入 `writer`，最后刷出结束标记。
///
/// 调用方必须已经写出响应头。`stream` 按值传入，函数返回（或 future 被丢弃）时句柄即被释放。
pub async fn transfer<W>(
    mut stream: FileStream,
    writer: &mut W,
    observer: &dyn TransferObserver,
    id: u128,
) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let total = stream.length();
    let result = async {
        while let Some(chunk) = stream.next_chunk().await? {
            writer.write_all(&chunk).await?;
            observer.on_progress(id, stream.sent(), total);
        }
        // 结束标记：正文以 Content-Length 定界，刷出缓冲即意味着响应完整
        writer.flush().await
    }
    .await;

    match result {
        Ok(()) => {
            observer.on_complete(id, total);
            Ok(total)
        }
        Err(e) => {
            observer.on_abort(id, stream.sent(), total);
            Err(e)
        }
    }
}
