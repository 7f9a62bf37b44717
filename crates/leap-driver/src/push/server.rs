//! 推送服务
//!
//! 一个接入线程负责 WebSocket 握手与注册，每个客户端一个写线程。
//! 轮询线程调用 [`PushServer::broadcast`]：在锁内复制发送端列表，锁外投递。

use super::client_manager::{BroadcastReport, ClientManager, broadcast_to};
use crate::error::DriverError;
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tungstenite::{Message, WebSocket};

/// 接入线程无新连接时的休眠间隔
const ACCEPT_IDLE: Duration = Duration::from_millis(20);
/// 写线程等待新消息的最长时间（同时决定对停止信号的响应延迟）
const WRITER_WAIT: Duration = Duration::from_millis(50);
/// 写线程检查客户端上行数据（关闭帧等）的读超时
const INBOUND_POLL: Duration = Duration::from_millis(5);
/// 握手超时
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
/// 单次写入超时；不再读取数据的客户端在此时间后被断开
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket 推送服务
pub struct PushServer {
    local_addr: SocketAddr,
    clients: Arc<Mutex<ClientManager>>,
    is_running: Arc<AtomicBool>,
    accept_thread: Mutex<Option<JoinHandle<()>>>,
}

impl PushServer {
    /// 在 `0.0.0.0:port` 上监听并启动接入线程
    ///
    /// # 参数
    /// - `port`: 监听端口（0 表示由系统分配）
    /// - `queue_capacity`: 每个客户端的待发送队列长度
    ///
    /// # 错误
    /// - `DriverError::PushServer`: 端口被占用等
    /// - `DriverError::ThreadSpawn`: 接入线程创建失败
    pub fn bind(port: u16, queue_capacity: usize) -> Result<Self, DriverError> {
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port)))
            .map_err(DriverError::PushServer)?;
        listener.set_nonblocking(true).map_err(DriverError::PushServer)?;
        let local_addr = listener.local_addr().map_err(DriverError::PushServer)?;

        let clients = Arc::new(Mutex::new(ClientManager::new()));
        let is_running = Arc::new(AtomicBool::new(true));

        let accept_thread = {
            let clients = clients.clone();
            let is_running = is_running.clone();
            let capacity = queue_capacity.max(1);
            thread::Builder::new()
                .name("leap-push-accept".into())
                .spawn(move || accept_loop(listener, clients, is_running, capacity))
                .map_err(DriverError::ThreadSpawn)?
        };

        info!("Push server listening on {}", local_addr);

        Ok(Self {
            local_addr,
            clients,
            is_running,
            accept_thread: Mutex::new(Some(accept_thread)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 当前已连接（完成握手）的客户端数
    pub fn client_count(&self) -> usize {
        self.clients.lock().count()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 广播一条消息
    ///
    /// 不阻塞：慢客户端的队列满时该客户端跳过本条消息。
    pub fn broadcast(&self, message: &str) -> BroadcastReport {
        let message: Arc<str> = Arc::from(message);
        let clients = self.clients.lock().snapshot();
        broadcast_to(&clients, &message)
    }

    /// 停止接入并断开所有客户端（幂等）
    ///
    /// 先释放所有发送端，等待中的写线程立即退出；阻塞在写入上的写线程最长等待
    /// 一个写入超时。
    pub fn shutdown(&self) {
        self.is_running.store(false, Ordering::Release);
        self.clients.lock().clear();
        if let Some(handle) = self.accept_thread.lock().take()
            && handle.join().is_err()
        {
            error!("Push accept thread panicked");
        }
    }
}

impl Drop for PushServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(
    listener: TcpListener,
    clients: Arc<Mutex<ClientManager>>,
    is_running: Arc<AtomicBool>,
    queue_capacity: usize,
) {
    let mut writers: Vec<JoinHandle<()>> = Vec::new();

    while is_running.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, peer)) => {
                let clients = clients.clone();
                let is_running = is_running.clone();
                let spawned = thread::Builder::new()
                    .name(format!("leap-push-{peer}"))
                    .spawn(move || serve_client(stream, peer, clients, is_running, queue_capacity));
                match spawned {
                    Ok(handle) => writers.push(handle),
                    Err(e) => error!("Failed to spawn push writer for {}: {}", peer, e),
                }
            },
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_IDLE),
            Err(e) => {
                warn!("Push accept error: {}", e);
                thread::sleep(ACCEPT_IDLE);
            },
        }
        writers.retain(|handle| !handle.is_finished());
    }

    for handle in writers {
        if handle.join().is_err() {
            error!("Push writer thread panicked");
        }
    }
    debug!("Push accept loop exited");
}

fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    clients: Arc<Mutex<ClientManager>>,
    is_running: Arc<AtomicBool>,
    queue_capacity: usize,
) {
    let mut ws = match handshake(stream) {
        Ok(ws) => ws,
        Err(e) => {
            warn!("Push handshake with {} failed: {}", peer, e);
            return;
        },
    };

    let (tx, rx) = bounded(queue_capacity);
    let id = clients.lock().register(peer, tx);
    info!("Push client {} connected from {}", id, peer);

    let exit = write_loop(&mut ws, &rx, &is_running);

    let client = clients.lock().unregister(id);
    // 写入已失败的连接不再尝试发送关闭帧
    if exit != WriterExit::SendFailed {
        if let Err(e) = ws.close(None) {
            debug!("Push close for client {} failed: {}", id, e);
        }
        if let Err(e) = ws.flush() {
            debug!("Push flush for client {} failed: {}", id, e);
        }
    }
    match client {
        Some(client) => info!(
            "Push client {} ({}) disconnected after {:.1}s: {}",
            id,
            peer,
            client.age().as_secs_f64(),
            exit.as_str()
        ),
        None => info!("Push client {} ({}) disconnected: {}", id, peer, exit.as_str()),
    }
}

fn handshake(stream: TcpStream) -> Result<WebSocket<TcpStream>, String> {
    stream.set_nonblocking(false).map_err(|e| e.to_string())?;
    stream
        .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
        .map_err(|e| e.to_string())?;
    stream
        .set_write_timeout(Some(WRITE_TIMEOUT))
        .map_err(|e| e.to_string())?;
    stream.set_nodelay(true).map_err(|e| e.to_string())?;
    let ws = tungstenite::accept(stream).map_err(|e| e.to_string())?;
    ws.get_ref()
        .set_read_timeout(Some(INBOUND_POLL))
        .map_err(|e| e.to_string())?;
    Ok(ws)
}

/// 写线程退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterExit {
    ServerStopped,
    ClosedByClient,
    ConnectionClosed,
    ReadFailed,
    /// 发送出错或超时（客户端不再读取）
    SendFailed,
}

impl WriterExit {
    fn as_str(self) -> &'static str {
        match self {
            WriterExit::ServerStopped => "server stopped",
            WriterExit::ClosedByClient => "closed by client",
            WriterExit::ConnectionClosed => "connection closed",
            WriterExit::ReadFailed => "read failed",
            WriterExit::SendFailed => "send failed",
        }
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// 写线程主循环，返回退出原因
fn write_loop(
    ws: &mut WebSocket<TcpStream>,
    rx: &Receiver<Arc<str>>,
    is_running: &AtomicBool,
) -> WriterExit {
    while is_running.load(Ordering::Acquire) {
        match rx.recv_timeout(WRITER_WAIT) {
            Ok(message) => {
                // 一次取空队列，减少上行检查次数
                let pending = std::iter::once(message).chain(rx.try_iter());
                for message in pending {
                    match ws.send(Message::Text(message.to_string())) {
                        Ok(()) => {},
                        Err(tungstenite::Error::Io(e)) if is_timeout(&e) => {
                            debug!("Push send timed out, client is not reading");
                            return WriterExit::SendFailed;
                        },
                        Err(e) => {
                            debug!("Push send failed: {}", e);
                            return WriterExit::SendFailed;
                        },
                    }
                }
            },
            Err(RecvTimeoutError::Timeout) => {},
            Err(RecvTimeoutError::Disconnected) => return WriterExit::ServerStopped,
        }

        match ws.read() {
            Ok(Message::Close(_)) => return WriterExit::ClosedByClient,
            Ok(_) => {},
            Err(tungstenite::Error::Io(e)) if is_timeout(&e) => {},
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                return WriterExit::ConnectionClosed;
            },
            Err(e) => {
                debug!("Push read failed: {}", e);
                return WriterExit::ReadFailed;
            },
        }
    }
    WriterExit::ServerStopped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    fn connect(server: &PushServer) -> WebSocket<tungstenite::stream::MaybeTlsStream<TcpStream>> {
        let url = format!("ws://127.0.0.1:{}", server.local_addr().port());
        let (ws, _) = tungstenite::connect(url).unwrap();
        ws
    }

    #[test]
    fn test_broadcast_without_clients() {
        let server = PushServer::bind(0, 4).unwrap();
        assert_ne!(server.local_addr().port(), 0);
        assert_eq!(server.broadcast("{}"), BroadcastReport::default());
        server.shutdown();
        server.shutdown();
        assert!(!server.is_running());
    }

    #[test]
    fn test_client_receives_broadcast() {
        let server = PushServer::bind(0, 4).unwrap();
        let mut client = connect(&server);
        assert!(wait_for(|| server.client_count() == 1));

        let report = server.broadcast("{\"handPresent\":false}");
        assert_eq!(report.delivered, 1);
        match client.read().unwrap() {
            Message::Text(text) => assert_eq!(text, "{\"handPresent\":false}"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_closed_client_is_unregistered() {
        let server = PushServer::bind(0, 4).unwrap();
        let mut client = connect(&server);
        assert!(wait_for(|| server.client_count() == 1));

        client.close(None).unwrap();
        let _ = client.flush();
        assert!(wait_for(|| server.client_count() == 0));
    }

    #[test]
    fn test_shutdown_with_client_that_stopped_reading() {
        let server = Arc::new(PushServer::bind(0, 4).unwrap());
        let addr = SocketAddr::from(([127, 0, 0, 1], server.local_addr().port()));
        let stream = TcpStream::connect(addr).unwrap();
        let (_stalled, _) = tungstenite::client(format!("ws://{addr}"), stream).unwrap();
        assert!(wait_for(|| server.client_count() == 1));

        // 远超套接字缓冲区的数据量，写线程必然阻塞在写入上
        let chunk = "x".repeat(256 * 1024);
        for _ in 0..200 {
            server.broadcast(&chunk);
            thread::sleep(Duration::from_millis(1));
        }

        let (done_tx, done_rx) = bounded(1);
        let stopping = server.clone();
        thread::spawn(move || {
            stopping.shutdown();
            let _ = done_tx.send(());
        });
        assert!(
            done_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
            "shutdown blocked on a client that stopped reading"
        );
        assert_eq!(server.client_count(), 0);
        assert!(!server.is_running());
    }

    #[test]
    fn test_port_in_use() {
        let server = PushServer::bind(0, 4).unwrap();
        let port = server.local_addr().port();
        assert!(matches!(PushServer::bind(port, 4), Err(DriverError::PushServer(_))));
    }
}
