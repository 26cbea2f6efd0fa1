// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::workers::event_worker::EventWorker;
use crate::workers::sync_worker::{SyncCommand, SyncWorker};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// 工作管理器
///
/// 持有事件工作器与对账调度器的任务句柄，负责启动与优雅关闭。
/// 对账触发通道的发送端交给HTTP层，按需对账命令经此送达调度器。
pub struct WorkerManager {
    event_worker: EventWorker,
    sync_worker: Arc<SyncWorker>,
    sync_trigger: mpsc::Sender<SyncCommand>,
    sync_receiver: Option<mpsc::Receiver<SyncCommand>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerManager {
    pub fn new(event_worker: EventWorker, sync_worker: Arc<SyncWorker>) -> Self {
        let (sync_trigger, sync_receiver) = mpsc::channel(16);
        Self {
            event_worker,
            sync_worker,
            sync_trigger,
            sync_receiver: Some(sync_receiver),
            handles: Vec::new(),
        }
    }

    /// 按需对账触发通道的发送端
    pub fn sync_trigger(&self) -> mpsc::Sender<SyncCommand> {
        self.sync_trigger.clone()
    }

    /// 启动指定数量的事件工作器与一个对账调度器
    pub async fn start_workers(&mut self, event_worker_count: usize) {
        for _ in 0..event_worker_count {
            let worker = self.event_worker.clone();
            let handle = tokio::spawn(async move {
                worker.run().await;
            });
            self.handles.push(handle);
        }

        if let Some(receiver) = self.sync_receiver.take() {
            let sync_worker = self.sync_worker.clone();
            let handle = tokio::spawn(async move {
                sync_worker.run(receiver).await;
            });
            self.handles.push(handle);
        }
        info!("Started {} event workers and sync worker", event_worker_count);
    }

    /// 中止全部工作器任务
    pub fn shutdown(&mut self) {
        info!("Shutting down workers...");
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        info!("Workers shut down");
    }
}
