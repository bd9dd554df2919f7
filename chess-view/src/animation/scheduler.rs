//! 计时调度器
//!
//! 单线程协作式：所有计划的步骤放进同一个按到期时间排序的队列，
//! 同一时刻的步骤按加入顺序执行。

use std::collections::VecDeque;
use std::time::Duration;

use super::plan::{Action, AnimationPlan};

#[derive(Debug, Clone)]
struct Scheduled {
    due: Duration,
    action: Action,
}

/// 调度器
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: VecDeque<Scheduled>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以 `start` 为计划起点加入全部步骤
    pub fn schedule(&mut self, start: Duration, plan: AnimationPlan) {
        for step in plan.into_steps() {
            let due = start + step.offset;
            let idx = self.queue.partition_point(|s| s.due <= due);
            self.queue.insert(idx, Scheduled {
                due,
                action: step.action,
            });
        }
    }

    /// 最早的到期时间
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.front().map(|s| s.due)
    }

    /// 取出一个已到期的步骤
    ///
    /// 每次只取一个：执行某些动作（嵌套腿）会加入新的步骤，
    /// 新步骤可能已经到期。
    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, Action)> {
        if self.queue.front()?.due <= now {
            self.queue.pop_front().map(|s| (s.due, s.action))
        } else {
            None
        }
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
