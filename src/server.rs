// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 传输层
//!
//! 基于 Tokio 的接入循环与连接处理器：
//! - 每个连接一个任务，连接内的请求严格按到达顺序逐个处理；
//! - 请求头有长度上限，超限视为无法解码（400）；
//! - 分发（路径规范化、元数据探测、目录读取、打开文件）都是阻塞的文件系统调用，
//!   在 Tokio 的阻塞线程池上执行，不占用调度线程；
//! - 响应按“响应头 → 正文分块 → 结束标记 → 可选关闭”的顺序写出；
//! - 流式传输中途失败时直接关闭连接，不完整的正文就是客户端能观察到的失败信号。

use std::{
    future::Future,
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Instant,
};

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};

use crate::{
    config::Config,
    dispatcher::Dispatcher,
    exception::Exception,
    request::Request,
    response::{Body, Response},
    stream::{transfer, LogObserver, TransferObserver},
};

pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    observer: Arc<dyn TransferObserver>,
    max_head_size: usize,
    active_connection: Arc<AtomicUsize>,
}

impl Server {
    /// 绑定配置中的地址与端口。`local` 为真时只监听本地回环地址。
    pub async fn bind(config: &Config) -> io::Result<Self> {
        let dispatcher = Dispatcher::from_config(config)?;
        info!("www root: {}", dispatcher.root().display());

        let address = match config.local() {
            true => Ipv4Addr::new(127, 0, 0, 1),
            false => Ipv4Addr::new(0, 0, 0, 0),
        };
        let listener = TcpListener::bind(SocketAddrV4::new(address, config.port())).await?;
        info!("服务端在{}上监听，发布前缀：{}", listener.local_addr()?, config.prefix());

        Ok(Self {
            listener,
            dispatcher: Arc::new(dispatcher),
            observer: Arc::new(LogObserver),
            max_head_size: config.max_head_size(),
            active_connection: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// 替换传输进度的观测者
    pub fn with_observer(mut self, observer: Arc<dyn TransferObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn active_connections(&self) -> usize {
        self.active_connection.load(Ordering::SeqCst)
    }

    /// 运行到收到 Ctrl-C 为止。
    pub async fn run(self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("无法监听停机信号：{}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// 运行接入循环，直到 `shutdown` 完成。已建立的连接会继续处理完毕。
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut id: u128 = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(
                        "接入循环收到停机指令，正在退出，当前活跃连接数: {}",
                        self.active_connections()
                    );
                    break;
                }
                accepted = self.listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            error!("接受连接失败：{}", e);
                            continue;
                        }
                    };
                    debug!("[ID{}]新的连接：{}", id, addr);

                    let dispatcher = Arc::clone(&self.dispatcher);
                    let observer = Arc::clone(&self.observer);
                    let guard = ConnectionGuard::new(Arc::clone(&self.active_connection));
                    let max_head_size = self.max_head_size;
                    tokio::spawn(async move {
                        let _guard = guard;
                        handle_connection(stream, id, dispatcher, observer.as_ref(), max_head_size)
                            .await;
                    });
                    id += 1;
                }
            }
        }
    }
}

/// 活跃连接计数。任务以任何方式结束（包括 panic）都会减一。
struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 处理单个 TCP 连接上的全部请求。
pub async fn handle_connection(
    mut stream: TcpStream,
    id: u128,
    dispatcher: Arc<Dispatcher>,
    observer: &dyn TransferObserver,
    max_head_size: usize,
) {
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);

    loop {
        let request = match read_head(&mut reader, max_head_size).await {
            Ok(Some(head)) => match Request::try_from(&head, id) {
                Ok(request) => request,
                Err(e) => {
                    warn!("[ID{}]解码HTTP请求失败: {}", id, e);
                    Request::undecodable()
                }
            },
            Ok(None) => {
                debug!("[ID{}]客户端关闭了连接", id);
                break;
            }
            Err(Exception::RequestTooLarge) => {
                warn!("[ID{}]请求头超过{}字节上限", id, max_head_size);
                Request::undecodable()
            }
            Err(e) => {
                debug!("[ID{}]读取请求头失败: {}", id, e);
                break;
            }
        };

        let start_time = Instant::now();
        let response = dispatch_blocking(&dispatcher, &request, id).await;
        let close = response.should_close();

        info!(
            "[ID{}] {} {} {} -> {} {}, {}",
            id,
            request.method(),
            request.uri(),
            request.version(),
            response.status_code(),
            response.information(),
            request.user_agent(),
        );

        // 连接将被复用时，必须先把请求体读完，否则它会被当作下一个请求头
        if !close && request.content_length() > 0 {
            let len = request.content_length();
            match tokio::io::copy(&mut (&mut reader).take(len), &mut tokio::io::sink()).await {
                Ok(n) if n == len => {}
                _ => {
                    debug!("[ID{}]请求体不完整，关闭连接", id);
                    break;
                }
            }
        }

        let streaming = response.is_streaming();
        if let Err(e) = write_response(&mut writer, response, observer, id).await {
            match streaming {
                true => error!("[ID{}]流式传输失败，强制关闭连接: {}", id, e),
                false => warn!("[ID{}]发送响应失败: {}", id, e),
            }
            break;
        }
        debug!(
            "[ID{}]响应发送完毕，用时{}ms",
            id,
            start_time.elapsed().as_millis()
        );

        if close {
            break;
        }
    }

    // 结束标记已刷出后才关闭
    let _ = writer.shutdown().await;
    debug!("[ID{}]连接关闭", id);
}

/// 在阻塞线程池上分发请求。分发任务 panic 或被取消时回复 500，随后连接被关闭。
pub async fn dispatch_blocking(
    dispatcher: &Arc<Dispatcher>,
    request: &Request,
    id: u128,
) -> Response {
    let dispatcher = Arc::clone(dispatcher);
    let request = request.clone();
    match tokio::task::spawn_blocking(move || dispatcher.dispatch(&request, id)).await {
        Ok(response) => response,
        Err(e) => {
            error!("[ID{}]分发任务异常终止: {}", id, e);
            Response::error(500)
        }
    }
}

/// 读取一个完整的请求头（到空行为止）。
///
/// 连接在请求之间干净关闭时返回 `Ok(None)`；请求之间多余的空行会被忽略。
pub async fn read_head<R>(reader: &mut R, limit: usize) -> Result<Option<Vec<u8>>, Exception>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = Vec::new();
    loop {
        let budget = limit.saturating_sub(head.len());
        if budget == 0 {
            return Err(Exception::RequestTooLarge);
        }
        let start = head.len();
        let n = (&mut *reader)
            .take(budget as u64)
            .read_until(b'\n', &mut head)
            .await?;
        if n == 0 {
            return match head.is_empty() {
                true => Ok(None),
                false => Err(Exception::Internal(io::ErrorKind::UnexpectedEof)),
            };
        }
        if head.last() != Some(&b'\n') {
            return match n == budget {
                true => Err(Exception::RequestTooLarge),
                false => Err(Exception::Internal(io::ErrorKind::UnexpectedEof)),
            };
        }
        let line = &head[start..];
        if line == b"\r\n" || line == b"\n" {
            if start == 0 {
                head.clear();
                continue;
            }
            return Ok(Some(head));
        }
    }
}

/// 依次写出响应头、正文与结束标记。
pub async fn write_response<W>(
    writer: &mut W,
    response: Response,
    observer: &dyn TransferObserver,
    id: u128,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let (head, body) = response.into_parts();
    writer.write_all(&head).await?;
    match body {
        Body::Empty => writer.flush().await,
        Body::Full(content) => {
            writer.write_all(&content).await?;
            writer.flush().await
        }
        Body::Stream(stream) => transfer(stream, writer, observer, id).await.map(|_| ()),
    }
}
