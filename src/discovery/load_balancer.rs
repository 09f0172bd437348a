//! 负载均衡模块
//!
//! 从多个健康实例中选择一个。每次请求都重新选择，不做会话粘滞。

use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::discovery::config::LoadBalanceStrategy;
use crate::discovery::instance::ServiceInstance;

/// 负载均衡器
///
/// 只持有一个原子游标，可以在多个任务间通过 `&self` 并发使用。
#[derive(Debug)]
pub struct LoadBalancer {
    strategy: LoadBalanceStrategy,
    round_robin_index: AtomicUsize,
}

impl LoadBalancer {
    /// 创建新的负载均衡器
    pub fn new(strategy: LoadBalanceStrategy) -> Self {
        Self {
            strategy,
            round_robin_index: AtomicUsize::new(0),
        }
    }

    pub fn strategy(&self) -> LoadBalanceStrategy {
        self.strategy
    }

    /// 选择服务实例
    ///
    /// 只有候选集为空时返回 `None`，调用方应当先检查是否为空。
    pub fn select<'a>(&self, candidates: &'a [ServiceInstance]) -> Option<&'a ServiceInstance> {
        if candidates.is_empty() {
            return None;
        }

        match self.strategy {
            LoadBalanceStrategy::Random => self.select_random(candidates),
            LoadBalanceStrategy::RoundRobin => self.select_round_robin(candidates),
        }
    }

    /// 均匀随机选择
    fn select_random<'a>(&self, candidates: &'a [ServiceInstance]) -> Option<&'a ServiceInstance> {
        let index = rand::thread_rng().gen_range(0..candidates.len());
        candidates.get(index)
    }

    /// 轮询选择
    fn select_round_robin<'a>(&self, candidates: &'a [ServiceInstance]) -> Option<&'a ServiceInstance> {
        let index = self.round_robin_index.fetch_add(1, Ordering::Relaxed);
        candidates.get(index % candidates.len())
    }
}

impl Default for LoadBalancer {
    fn default() -> Self {
        Self::new(LoadBalanceStrategy::Random)
    }
}
