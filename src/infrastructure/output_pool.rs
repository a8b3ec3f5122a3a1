//! 输出资源池 - 基础设施层
//!
//! 每个成功的任务产生一个输出资源（打开的报告文件等）。
//! 池子只保留有限数量，超出上限时按淘汰策略关闭旧资源；
//! 批次结束时不会强制关闭，留给用户查看。

use std::collections::VecDeque;
use std::fmt::Debug;
use tracing::debug;

/// 有副作用的输出资源
pub trait OutputResource: Send + Debug {
    /// 资源名称（日志用）
    fn label(&self) -> &str;

    /// 释放资源；对已释放的资源调用是空操作
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// 淘汰策略：从已保留的资源中选出要关闭的那个
pub trait EvictionPolicy: Send + Sync + Debug {
    fn select_victim(&self, retained: &VecDeque<Box<dyn OutputResource>>) -> Option<usize>;
}

/// 先进先出：总是关闭最早到达的资源
#[derive(Debug, Default, Clone, Copy)]
pub struct FifoEviction;

impl EvictionPolicy for FifoEviction {
    fn select_victim(&self, retained: &VecDeque<Box<dyn OutputResource>>) -> Option<usize> {
        if retained.is_empty() {
            None
        } else {
            Some(0)
        }
    }
}

/// 有上限的输出资源池
#[derive(Debug)]
pub struct OutputPool {
    capacity: usize,
    policy: Box<dyn EvictionPolicy>,
    retained: VecDeque<Box<dyn OutputResource>>,
    evicted: usize,
}

impl OutputPool {
    /// 创建使用 FIFO 淘汰的资源池
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, Box::new(FifoEviction))
    }

    pub fn with_policy(capacity: usize, policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            capacity: capacity.max(1),
            policy,
            retained: VecDeque::new(),
            evicted: 0,
        }
    }

    /// 按到达顺序加入资源，超出上限时淘汰
    ///
    /// # 返回
    /// 本次被关闭的资源名称
    pub fn admit(&mut self, resource: Box<dyn OutputResource>) -> Vec<String> {
        self.retained.push_back(resource);

        let mut closed = Vec::new();
        while self.retained.len() > self.capacity {
            let Some(index) = self.policy.select_victim(&self.retained) else {
                break;
            };
            let Some(mut victim) = self.retained.remove(index) else {
                break;
            };
            victim.close();
            debug!("🗑️ 输出资源超出上限 {}，已关闭: {}", self.capacity, victim.label());
            closed.push(victim.label().to_string());
            self.evicted += 1;
        }
        closed
    }

    pub fn len(&self) -> usize {
        self.retained.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retained.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 累计被淘汰的数量
    pub fn evicted(&self) -> usize {
        self.evicted
    }

    /// 当前保留资源的名称（按到达顺序）
    pub fn labels(&self) -> Vec<String> {
        self.retained.iter().map(|r| r.label().to_string()).collect()
    }

    /// 交出仍保留的资源
    pub fn into_retained(self) -> Vec<Box<dyn OutputResource>> {
        self.retained.into_iter().collect()
    }
}
