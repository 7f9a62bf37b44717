//! WebSocket 推送传输
//!
//! 客户端注册表（[`ClientManager`]）是轮询线程与推送线程之间唯一的共享状态，
//! 始终在 `parking_lot::Mutex` 保护下修改；广播只读取快照。

mod client_manager;
mod server;

pub use client_manager::{BroadcastReport, ClientManager, PushClient, broadcast_to};
pub use server::PushServer;
