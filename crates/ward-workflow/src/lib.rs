//! # 病房工作流模块
//!
//! 提供候床到出院的完整流程：
//! - 候床状态机：管理候床条目的状态转换
//! - 床位分配：校验床位与工作人员后原子提交住院记录
//! - 在院名单：按病房和患者号过滤，统计床位占用
//! - 物资申领：写入前校验数量，单号原子分配

pub mod engine;
pub mod roster;
pub mod state_machine;

// 重新导出主要类型
pub use engine::{AssignBedRequest, WardSelection, WardWorkflow};
pub use roster::{RosterFilter, RosterPage, RosterStats, WardOccupancy};
pub use state_machine::{WaitingListEvent, WaitingListStateMachine};
