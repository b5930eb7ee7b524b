//! 候床状态机
//!
//! 候床条目只会从 pending 出发，done 与 cancelled 都是终态

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ward_core::{Result, WaitingStatus, WardError};

/// 候床状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WaitingListEvent {
    BedAssigned,
    Withdrawn,
}

/// 候床状态机
#[derive(Debug)]
pub struct WaitingListStateMachine {
    transitions: HashMap<(WaitingStatus, WaitingListEvent), WaitingStatus>,
}

impl WaitingListStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        transitions.insert(
            (WaitingStatus::Pending, WaitingListEvent::BedAssigned),
            WaitingStatus::Done,
        );
        transitions.insert(
            (WaitingStatus::Pending, WaitingListEvent::Withdrawn),
            WaitingStatus::Cancelled,
        );

        Self { transitions }
    }

    /// 执行状态转换
    pub fn transition(&self, from: WaitingStatus, event: WaitingListEvent) -> Result<WaitingStatus> {
        self.transitions
            .get(&(from, event))
            .copied()
            .ok_or_else(|| WardError::InvalidStateTransition {
                from: format!("{:?}", from),
                event: format!("{:?}", event),
            })
    }

    /// 获取状态的所有可能事件，按事件排序
    pub fn get_possible_events(&self, current: WaitingStatus) -> Vec<WaitingListEvent> {
        let mut events: Vec<WaitingListEvent> = self
            .transitions
            .keys()
            .filter(|(state, _)| *state == current)
            .map(|(_, event)| *event)
            .collect();
        events.sort();
        events
    }
}

impl Default for WaitingListStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
