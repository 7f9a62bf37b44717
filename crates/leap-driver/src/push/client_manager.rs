//! 推送客户端注册表
//!
//! 由接入线程注册、由各客户端的写线程注销，轮询线程只读取快照。
//! 注册表本身不加锁，由 [`PushServer`](super::PushServer) 放在
//! `parking_lot::Mutex` 中共享。

use crossbeam_channel::{Sender, TrySendError};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing::warn;

/// 已连接客户端
#[derive(Debug, Clone)]
pub struct PushClient {
    pub id: u32,
    pub peer: SocketAddr,
    /// 写线程的待发送队列
    pub sender: Sender<Arc<str>>,
    pub connected_at: Instant,
}

impl PushClient {
    /// 连接时长
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// 单次广播结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    /// 已放入队列的客户端数
    pub delivered: usize,
    /// 队列已满或已关闭的客户端数
    pub failed: usize,
}

impl BroadcastReport {
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }
}

/// 客户端管理器
#[derive(Debug)]
pub struct ClientManager {
    clients: HashMap<u32, PushClient>,
    /// 从 1 开始（0 保留为无效 ID），溢出后从 1 重新开始
    next_id: AtomicU32,
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            next_id: AtomicU32::new(1),
        }
    }

    fn generate_client_id(&self) -> u32 {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let id = if id == 0 { 1 } else { id };
            if !self.clients.contains_key(&id) {
                return id;
            }
        }
    }

    /// 注册客户端，返回分配的 ID
    pub fn register(&mut self, peer: SocketAddr, sender: Sender<Arc<str>>) -> u32 {
        let id = self.generate_client_id();
        self.clients.insert(
            id,
            PushClient {
                id,
                peer,
                sender,
                connected_at: Instant::now(),
            },
        );
        id
    }

    /// 注销客户端
    ///
    /// 返回被移除的客户端（不存在时返回 None）
    pub fn unregister(&mut self, id: u32) -> Option<PushClient> {
        self.clients.remove(&id)
    }

    pub fn get(&self, id: u32) -> Option<&PushClient> {
        self.clients.get(&id)
    }

    pub fn count(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// 所有客户端的快照（用于在锁外广播）
    pub fn snapshot(&self) -> Vec<PushClient> {
        self.clients.values().cloned().collect()
    }

    /// 清空注册表（服务停止时调用）
    ///
    /// 丢弃全部发送端后，写线程的接收会返回断开错误并自行退出。
    pub fn clear(&mut self) {
        self.clients.clear();
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}

/// 向快照中的每个客户端投递消息
///
/// 投递不阻塞：队列已满或已关闭的客户端记录后跳过，不会被移除。
pub fn broadcast_to(clients: &[PushClient], message: &Arc<str>) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    for client in clients {
        match client.sender.try_send(message.clone()) {
            Ok(()) => report.delivered += 1,
            Err(TrySendError::Full(_)) => {
                warn!("Push client {} ({}) is lagging, frame skipped", client.id, client.peer);
                report.failed += 1;
            },
            Err(TrySendError::Disconnected(_)) => {
                warn!("Push client {} ({}) is gone, frame skipped", client.id, client.peer);
                report.failed += 1;
            },
        }
    }
    report
}
