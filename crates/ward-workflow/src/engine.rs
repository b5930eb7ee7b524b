//! 工作流引擎
//!
//! 协调候床状态机、床位分配、出院和物资申领的核心引擎

use crate::{
    roster::{query_roster, roster_stats, RosterFilter, RosterPage, RosterStats},
    state_machine::{WaitingListEvent, WaitingListStateMachine},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ward_core::{
    utils, Bed, BedAssignment, InPatient, NewRequisition, NewWaitingListEntry, Requisition,
    Result, Staff, WaitingListEntry, Ward, WardError, WardRepository, WardWithBeds,
};

/// 床位分配请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignBedRequest {
    pub bed_number: i32,
    pub staff_number: String,
    /// 预计住院天数，缺省时使用候床条目的预计等待时间
    pub expected_stay_days: Option<i32>,
}

/// 病房可选项：空闲床位与工作人员
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardSelection {
    pub ward: Ward,
    pub free_beds: Vec<Bed>,
    pub staff: Vec<Staff>,
}

fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// 病房工作流引擎
///
/// 所有读写都经由 `WardRepository`，多步写由存储层在一个事务内完成
pub struct WardWorkflow {
    repository: Arc<dyn WardRepository>,
    state_machine: WaitingListStateMachine,
    today: fn() -> NaiveDate,
}

impl WardWorkflow {
    /// 创建新的工作流引擎
    pub fn new(repository: Arc<dyn WardRepository>) -> Self {
        Self {
            repository,
            state_machine: WaitingListStateMachine::new(),
            today: utc_today,
        }
    }

    /// 替换日期来源
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }

    // ========== 病房与参考数据 ==========

    /// 全部病房及其床位
    pub async fn wards_with_beds(&self) -> Result<Vec<WardWithBeds>> {
        let wards = self.repository.list_wards().await?;
        let mut result = Vec::with_capacity(wards.len());
        for ward in wards {
            let beds = self.repository.beds_in_ward(ward.ward_number).await?;
            result.push(WardWithBeds { ward, beds });
        }
        Ok(result)
    }

    async fn require_ward(&self, ward_number: i32) -> Result<Ward> {
        self.repository
            .get_ward(ward_number)
            .await?
            .ok_or_else(|| WardError::NotFound(format!("Ward {} not found", ward_number)))
    }

    pub async fn free_beds(&self, ward_number: i32) -> Result<Vec<Bed>> {
        self.require_ward(ward_number).await?;
        self.repository.free_beds(ward_number).await
    }

    pub async fn ward_staff(&self, ward_number: i32) -> Result<Vec<Staff>> {
        self.require_ward(ward_number).await?;
        self.repository.ward_staff(ward_number).await
    }

    /// 获取病房的空闲床位和工作人员
    pub async fn ward_selection(&self, ward_number: i32) -> Result<WardSelection> {
        let ward = self.require_ward(ward_number).await?;
        let free_beds = self.repository.free_beds(ward_number).await?;
        let staff = self.repository.ward_staff(ward_number).await?;

        tracing::debug!(
            "Ward {} selection: {} free beds, {} staff",
            ward_number,
            free_beds.len(),
            staff.len()
        );
        Ok(WardSelection {
            ward,
            free_beds,
            staff,
        })
    }

    // ========== 候床队列 ==========

    pub async fn pending_waiting_list(&self) -> Result<Vec<WaitingListEntry>> {
        self.repository.pending_waiting_list().await
    }

    /// 将患者加入病房候床队列
    pub async fn add_to_waiting_list(&self, entry: NewWaitingListEntry) -> Result<WaitingListEntry> {
        utils::validate_waiting_list_entry(&entry)?;
        self.require_ward(entry.ward_number).await?;

        let created = self
            .repository
            .add_to_waiting_list(&entry, self.today())
            .await?;
        tracing::info!(
            "Patient {} added to waiting list {} for ward {}",
            created.patient_number,
            created.list_id,
            created.ward_number
        );
        Ok(created)
    }

    /// 候床条目当前可执行的事件
    pub async fn waiting_list_actions(&self, list_id: i64) -> Result<Vec<WaitingListEvent>> {
        let entry = self.require_waiting_entry(list_id).await?;
        Ok(self.state_machine.get_possible_events(entry.status))
    }

    async fn require_waiting_entry(&self, list_id: i64) -> Result<WaitingListEntry> {
        self.repository
            .get_waiting_list_entry(list_id)
            .await?
            .ok_or_else(|| WardError::NotFound(format!("Waiting list entry {} not found", list_id)))
    }

    /// 撤销候床条目
    pub async fn withdraw(&self, list_id: i64) -> Result<WaitingListEntry> {
        let entry = self.require_waiting_entry(list_id).await?;
        let next = self
            .state_machine
            .transition(entry.status, WaitingListEvent::Withdrawn)?;

        let updated = self
            .repository
            .update_waiting_list_status(list_id, entry.status, next)
            .await?;
        tracing::info!("Waiting list entry {} withdrawn", list_id);
        Ok(updated)
    }

    // ========== 床位分配 ==========

    /// 为候床条目分配床位
    ///
    /// 床位必须属于条目的病房且空闲，工作人员必须分配在该病房。
    /// 住院记录的插入与候床状态的更新由存储层原子提交。
    pub async fn assign_bed(&self, list_id: i64, request: AssignBedRequest) -> Result<InPatient> {
        let entry = self.require_waiting_entry(list_id).await?;
        self.state_machine
            .transition(entry.status, WaitingListEvent::BedAssigned)?;

        let stay_days = request
            .expected_stay_days
            .unwrap_or(entry.expected_wait_time);
        utils::validate_stay_days(stay_days)?;

        let selection = self.ward_selection(entry.ward_number).await?;

        if !selection
            .free_beds
            .iter()
            .any(|bed| bed.bed_number == request.bed_number)
        {
            let in_ward = self
                .repository
                .beds_in_ward(entry.ward_number)
                .await?
                .iter()
                .any(|bed| bed.bed_number == request.bed_number);
            return Err(if in_ward {
                WardError::Conflict(format!("Bed {} is already occupied", request.bed_number))
            } else {
                WardError::Validation(format!(
                    "Bed {} does not belong to ward {}",
                    request.bed_number, entry.ward_number
                ))
            });
        }

        if !selection
            .staff
            .iter()
            .any(|staff| staff.staff_number == request.staff_number)
        {
            return Err(WardError::Validation(format!(
                "Staff {} is not assigned to ward {}",
                request.staff_number, entry.ward_number
            )));
        }

        let placed = self.today();
        let date_of_expected_leave = utils::expected_leave_date(placed, stay_days)?;
        let assignment = BedAssignment {
            inpatient_id: utils::generate_inpatient_id(),
            list_id,
            patient_number: entry.patient_number.clone(),
            ward_number: entry.ward_number,
            bed_number: request.bed_number,
            staff_number: request.staff_number,
            expected_stay_days: stay_days,
            date_placed_in_ward: placed,
            date_of_expected_leave,
        };

        let inpatient = self.repository.commit_assignment(&assignment).await?;
        tracing::info!(
            "Assigned bed {} in ward {} to patient {} ({})",
            inpatient.bed_number,
            inpatient.ward_number,
            inpatient.patient_number,
            inpatient.inpatient_id
        );
        Ok(inpatient)
    }

    // ========== 在院与出院 ==========

    pub async fn active_roster(&self, filter: &RosterFilter) -> Result<RosterPage> {
        let inpatients = self.repository.active_inpatients().await?;
        Ok(query_roster(inpatients, filter))
    }

    pub async fn roster_stats(&self) -> Result<RosterStats> {
        let inpatients = self.repository.active_inpatients().await?;
        let wards = self.repository.list_wards().await?;
        Ok(roster_stats(&inpatients, &wards, self.today()))
    }

    /// 患者出院，出院日期为当天
    pub async fn discharge(&self, patient_number: &str) -> Result<InPatient> {
        if patient_number.trim().is_empty() {
            return Err(WardError::Validation("Patient number is required".to_string()));
        }

        let inpatient = self
            .repository
            .discharge(patient_number, self.today())
            .await?;
        tracing::info!(
            "Patient {} discharged from bed {} in ward {}",
            inpatient.patient_number,
            inpatient.bed_number,
            inpatient.ward_number
        );
        Ok(inpatient)
    }

    // ========== 物资申领 ==========

    /// 提交物资申领，校验在任何写入之前完成
    pub async fn submit_requisition(&self, requisition: NewRequisition) -> Result<Requisition> {
        utils::validate_requisition(&requisition)?;
        self.require_ward(requisition.ward_number).await?;

        if let Some(requested_by) = &requisition.requested_by {
            let staff = self.repository.ward_staff(requisition.ward_number).await?;
            if !staff.iter().any(|s| &s.staff_number == requested_by) {
                return Err(WardError::Validation(format!(
                    "Staff {} is not assigned to ward {}",
                    requested_by, requisition.ward_number
                )));
            }
        }

        let created = self
            .repository
            .create_requisition(&requisition, self.today())
            .await?;
        tracing::info!(
            "Requisition {} created for ward {} with {} item(s)",
            created.requisition_number,
            created.ward_number,
            created.items.len()
        );
        Ok(created)
    }

    pub async fn list_requisitions(&self) -> Result<Vec<Requisition>> {
        self.repository.list_requisitions().await
    }
}
