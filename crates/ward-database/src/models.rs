//! 数据库模型

use chrono::NaiveDate;
use sqlx::FromRow;
use ward_core::models::*;
use ward_core::WardError;

// 数据库表模型 - 使用FromRow trait用于SQL查询

/// 数据库病房表
#[derive(Debug, FromRow)]
pub struct DbWard {
    pub ward_number: i32,
    pub ward_name: String,
    pub location: String,
    pub total_beds: i32,
    pub telephone: Option<String>,
}

impl From<DbWard> for Ward {
    fn from(db_ward: DbWard) -> Self {
        Ward {
            ward_number: db_ward.ward_number,
            ward_name: db_ward.ward_name,
            location: db_ward.location,
            total_beds: db_ward.total_beds,
            telephone: db_ward.telephone,
        }
    }
}

/// 数据库床位表
#[derive(Debug, FromRow)]
pub struct DbBed {
    pub bed_number: i32,
    pub ward_number: i32,
}

impl From<DbBed> for Bed {
    fn from(db_bed: DbBed) -> Self {
        Bed {
            bed_number: db_bed.bed_number,
            ward_number: db_bed.ward_number,
        }
    }
}

/// 工作人员（staff 与 ward_staff 联表结果）
#[derive(Debug, FromRow)]
pub struct DbStaff {
    pub staff_number: String,
    pub first_name: String,
    pub last_name: String,
    pub position_name: String,
    pub ward_number: i32,
}

impl From<DbStaff> for Staff {
    fn from(db_staff: DbStaff) -> Self {
        Staff {
            staff_number: db_staff.staff_number,
            first_name: db_staff.first_name,
            last_name: db_staff.last_name,
            position_name: db_staff.position_name,
            ward_number: db_staff.ward_number,
        }
    }
}

/// 数据库候床表
#[derive(Debug, FromRow)]
pub struct DbWaitingListEntry {
    pub list_id: i64,
    pub patient_number: String,
    pub ward_number: i32,
    pub expected_wait_time: i32,
    pub status: String, // 存储为字符串，转换为WaitingStatus枚举
    pub date_added: NaiveDate,
}

impl TryFrom<DbWaitingListEntry> for WaitingListEntry {
    type Error = WardError;

    fn try_from(db_entry: DbWaitingListEntry) -> Result<Self, Self::Error> {
        Ok(WaitingListEntry {
            list_id: db_entry.list_id,
            patient_number: db_entry.patient_number,
            ward_number: db_entry.ward_number,
            expected_wait_time: db_entry.expected_wait_time,
            status: db_entry.status.parse()?,
            date_added: db_entry.date_added,
        })
    }
}

/// 数据库住院表
#[derive(Debug, FromRow)]
pub struct DbInPatient {
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

impl From<DbInPatient> for InPatient {
    fn from(db_inpatient: DbInPatient) -> Self {
        InPatient {
            inpatient_id: db_inpatient.inpatient_id,
            list_id: db_inpatient.list_id,
            patient_number: db_inpatient.patient_number,
            ward_number: db_inpatient.ward_number,
            bed_number: db_inpatient.bed_number,
            staff_number: db_inpatient.staff_number,
            expected_stay_days: db_inpatient.expected_stay_days,
            date_placed_in_ward: db_inpatient.date_placed_in_ward,
            date_of_expected_leave: db_inpatient.date_of_expected_leave,
            date_of_actual_leave: db_inpatient.date_of_actual_leave,
        }
    }
}

/// 数据库申领单头
#[derive(Debug, FromRow)]
pub struct DbRequisition {
    pub requisition_number: i64,
    pub ward_number: i32,
    pub requested_by: Option<String>,
    pub date_ordered: NaiveDate,
}

impl DbRequisition {
    pub fn with_items(self, items: Vec<RequisitionItem>) -> Requisition {
        Requisition {
            requisition_number: self.requisition_number,
            ward_number: self.ward_number,
            requested_by: self.requested_by,
            date_ordered: self.date_ordered,
            items,
        }
    }
}

/// 数据库申领明细
#[derive(Debug, FromRow)]
pub struct DbRequisitionItem {
    pub requisition_number: i64,
    pub line_number: i32,
    pub item_name: String,
    pub quantity: i32,
}

impl From<DbRequisitionItem> for RequisitionItem {
    fn from(db_item: DbRequisitionItem) -> Self {
        RequisitionItem {
            item_name: db_item.item_name,
            quantity: db_item.quantity,
        }
    }
}
