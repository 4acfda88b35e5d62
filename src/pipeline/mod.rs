//! 有界、保序的并行流水线。
//!
//! 固定线程池从输入迭代器取记录并行处理，结果经序号重排缓冲区
//! 严格按输入顺序输出。在飞记录数受窗口大小约束（背压）。
//! 单条记录的失败应作为值（`Result` 槽位）流过流水线，不中断整体。
//!
//! 取消信号生效后不再拉取新记录，在飞记录全部完成并按序输出，
//! 不产生半成品。

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use log::debug;
use rayon::iter::{ParallelBridge, ParallelIterator};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 工作线程数
    pub threads: usize,
    /// 在飞记录窗口（重排缓冲区容量），必须 >= threads
    pub window: usize,
    /// 消费端等待结果的轮询超时
    pub poll_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            window: 16,
            poll_timeout: Duration::from_millis(200),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::InvalidConfig(
                "pipeline needs at least one thread".to_string(),
            ));
        }
        if self.window < self.threads {
            return Err(Error::InvalidConfig(format!(
                "window {} is smaller than thread count {}",
                self.window, self.threads
            )));
        }
        Ok(())
    }
}

/// 协作式取消令牌，可在线程间克隆共享
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// 并行处理 `input` 的每条记录并按原始顺序回调 `emit`。
///
/// `worker` 对单条记录求值，必须无副作用；只读共享状态
/// （索引、打分配置）通过闭包捕获。输出顺序与输入一致，
/// 与各记录的完成顺序无关。
pub fn run_ordered<I, T, F, E>(
    input: I,
    worker: F,
    emit: E,
    config: &PipelineConfig,
    cancel: &CancelToken,
) -> Result<()>
where
    I: Iterator + Send,
    I::Item: Send,
    T: Send,
    F: Fn(I::Item) -> T + Send + Sync,
    E: FnMut(T) + Send,
{
    config.validate()?;

    let cancel_pull = cancel.clone();
    let gated = input.take_while(move |_| !cancel_pull.is_cancelled());

    if config.threads == 1 {
        // 单线程退化路径：顺序处理即天然有序
        let mut emit = emit;
        for item in gated {
            emit(worker(item));
        }
        return Ok(());
    }

    let window = config.window;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;

    let poll_timeout = config.poll_timeout;
    pool.install(move || {
        // 序号 <= approved 的记录才允许进入输出通道，约束在飞数量
        let approved = Arc::new(AtomicUsize::new(window - 1));
        let approved_producer = Arc::clone(&approved);

        let (tx, rx) = mpsc::sync_channel::<(usize, T)>(window);

        rayon::scope(|s| {
            s.spawn(move |_| {
                gated
                    .enumerate()
                    .par_bridge()
                    .map(|(i, item)| (i, worker(item)))
                    .for_each_with(tx, |tx, (i, value)| {
                        // 等待窗口空位
                        while approved_producer.load(Ordering::Acquire) < i {
                            std::hint::spin_loop();
                        }
                        tx.send((i, value)).expect("reorder consumer hung up");
                    });
            });

            recover_order(rx, emit, &approved, window, poll_timeout);
        });
    });

    Ok(())
}

/// 序号重排：环形缓冲区暂存乱序结果，按 min_idx 连续段输出
fn recover_order<T>(
    rx: mpsc::Receiver<(usize, T)>,
    mut emit: impl FnMut(T),
    approved: &AtomicUsize,
    window: usize,
    poll_timeout: Duration,
) {
    let mut buffer: Box<[Option<T>]> = (0..window).map(|_| None).collect();
    let mut min_idx = 0usize; // 下一个待输出序号

    loop {
        let (i, value) = match rx.recv_timeout(poll_timeout) {
            Ok(pair) => pair,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                debug!("pipeline consumer idle, waiting for slot {}", min_idx);
                continue;
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };
        debug_assert!(buffer[i % window].is_none());
        buffer[i % window] = Some(value);

        while let Some(value) = buffer[min_idx % window].take() {
            emit(value);
            min_idx += 1;
        }
        approved.store(min_idx + window - 1, Ordering::Release);
    }
}
