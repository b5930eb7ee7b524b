//! 核心数据模型定义

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WardError;

/// 病房
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ward {
    pub ward_number: i32,
    pub ward_name: String,
    pub location: String,
    pub total_beds: i32,
    pub telephone: Option<String>,
}

/// 床位
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bed {
    pub bed_number: i32,
    pub ward_number: i32,
}

/// 病房及其床位列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardWithBeds {
    #[serde(flatten)]
    pub ward: Ward,
    pub beds: Vec<Bed>,
}

/// 病房工作人员
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Staff {
    pub staff_number: String,
    pub first_name: String,
    pub last_name: String,
    pub position_name: String,
    pub ward_number: i32,
}

impl Staff {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 候床队列状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WaitingStatus {
    Pending,   // 等待分配
    Done,      // 已分配床位
    Cancelled, // 已撤销
}

impl WaitingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitingStatus::Pending => "pending",
            WaitingStatus::Done => "done",
            WaitingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for WaitingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaitingStatus {
    type Err = WardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WaitingStatus::Pending),
            "done" => Ok(WaitingStatus::Done),
            "cancelled" => Ok(WaitingStatus::Cancelled),
            other => Err(WardError::Validation(format!(
                "Unknown waiting list status: {}",
                other
            ))),
        }
    }
}

/// 候床队列条目
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitingListEntry {
    pub list_id: i64,
    pub patient_number: String,
    pub ward_number: i32,
    pub expected_wait_time: i32, // 天
    pub status: WaitingStatus,
    pub date_added: NaiveDate,
}

/// 新候床条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWaitingListEntry {
    pub patient_number: String,
    pub ward_number: i32,
    pub expected_wait_time: i32,
}

/// 住院记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InPatient {
    pub inpatient_id: String,
    pub list_id: i64,
    pub patient_number: String,
    pub ward_number: i32,
    pub bed_number: i32,
    pub staff_number: String,
    pub expected_stay_days: i32,
    pub date_placed_in_ward: NaiveDate,
    pub date_of_expected_leave: NaiveDate,
    pub date_of_actual_leave: Option<NaiveDate>,
}

impl InPatient {
    /// 尚未出院
    pub fn is_active(&self) -> bool {
        self.date_of_actual_leave.is_none()
    }

    /// 在给定日期已超过预计出院日期
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_active() && today > self.date_of_expected_leave
    }
}

/// 床位分配（一次事务内提交）
#[derive(Debug, Clone)]
pub struct BedAssignment {
    pub inpatient_id: String,
    pub list_id: i64,
    pub patient_number: String,
    pub ward_number: i32,
    pub bed_number: i32,
    pub staff_number: String,
    pub expected_stay_days: i32,
    pub date_placed_in_ward: NaiveDate,
    pub date_of_expected_leave: NaiveDate,
}

impl BedAssignment {
    pub fn into_inpatient(self) -> InPatient {
        InPatient {
            inpatient_id: self.inpatient_id,
            list_id: self.list_id,
            patient_number: self.patient_number,
            ward_number: self.ward_number,
            bed_number: self.bed_number,
            staff_number: self.staff_number,
            expected_stay_days: self.expected_stay_days,
            date_placed_in_ward: self.date_placed_in_ward,
            date_of_expected_leave: self.date_of_expected_leave,
            date_of_actual_leave: None,
        }
    }
}

/// 申领物品明细
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequisitionItem {
    pub item_name: String,
    pub quantity: i32,
}

/// 新申领单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequisition {
    pub ward_number: i32,
    pub requested_by: Option<String>,
    pub items: Vec<RequisitionItem>,
}

/// 物资申领单
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requisition {
    pub requisition_number: i64,
    pub ward_number: i32,
    pub requested_by: Option<String>,
    pub date_ordered: NaiveDate,
    pub items: Vec<RequisitionItem>,
}
