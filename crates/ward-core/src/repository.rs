//! 存储接口
//!
//! 工作流只依赖此 trait；PostgreSQL 与内存实现位于 `ward-database`。
//! 所有多步写操作都必须在实现内部原子完成。

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::*;

#[async_trait]
pub trait WardRepository: Send + Sync {
    /// 全部病房
    async fn list_wards(&self) -> Result<Vec<Ward>>;

    /// 单个病房
    async fn get_ward(&self, ward_number: i32) -> Result<Option<Ward>>;

    /// 病房的全部床位
    async fn beds_in_ward(&self, ward_number: i32) -> Result<Vec<Bed>>;

    /// 病房中没有在院患者的床位
    async fn free_beds(&self, ward_number: i32) -> Result<Vec<Bed>>;

    /// 分配到病房的工作人员
    async fn ward_staff(&self, ward_number: i32) -> Result<Vec<Staff>>;

    /// 状态为 pending 的候床条目，按加入时间排序
    async fn pending_waiting_list(&self) -> Result<Vec<WaitingListEntry>>;

    async fn get_waiting_list_entry(&self, list_id: i64) -> Result<Option<WaitingListEntry>>;

    /// 新增候床条目；同一患者已有 pending 条目时返回 Conflict
    async fn add_to_waiting_list(&self, entry: &NewWaitingListEntry, date_added: NaiveDate)
        -> Result<WaitingListEntry>;

    /// 条件更新状态：仅当当前状态等于 `from` 时写入 `to`，否则返回 Conflict
    async fn update_waiting_list_status(
        &self,
        list_id: i64,
        from: WaitingStatus,
        to: WaitingStatus,
    ) -> Result<WaitingListEntry>;

    /// 原子提交床位分配：插入住院记录并将候床条目标记为 done
    async fn commit_assignment(&self, assignment: &BedAssignment) -> Result<InPatient>;

    /// 在院患者（未出院）
    async fn active_inpatients(&self) -> Result<Vec<InPatient>>;

    /// 为患者的在院记录写入出院日期
    async fn discharge(&self, patient_number: &str, leave_date: NaiveDate) -> Result<InPatient>;

    /// 原子分配申领单号并写入单头与明细
    async fn create_requisition(
        &self,
        requisition: &NewRequisition,
        date_ordered: NaiveDate,
    ) -> Result<Requisition>;

    async fn list_requisitions(&self) -> Result<Vec<Requisition>>;
}
