//! 内存存储实现
//!
//! 每个操作在同一把异步锁内完成，多步写操作与PostgreSQL事务一样是原子的。
//! 用于 `--memory` 演示模式和测试。

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use ward_core::{
    BedAssignment, Bed, InPatient, NewRequisition, NewWaitingListEntry, Requisition, Result,
    Staff, WaitingListEntry, WaitingStatus, Ward, WardError, WardRepository,
};

#[derive(Debug, Default)]
struct MemoryState {
    wards: BTreeMap<i32, Ward>,
    beds: BTreeMap<i32, Bed>,
    staff: BTreeMap<String, Staff>,
    waiting_list: BTreeMap<i64, WaitingListEntry>,
    next_list_id: i64,
    inpatients: Vec<InPatient>,
    requisitions: BTreeMap<i64, Requisition>,
}

impl MemoryState {
    fn bed_occupied(&self, bed_number: i32) -> bool {
        self.inpatients
            .iter()
            .any(|p| p.bed_number == bed_number && p.is_active())
    }
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 带演示数据的存储：两个病房、各自的床位和工作人员
    pub fn demo() -> Self {
        Self::new()
            .with_ward(
                Ward {
                    ward_number: 1,
                    ward_name: "Orthopaedic".to_string(),
                    location: "Block E".to_string(),
                    total_beds: 4,
                    telephone: Some("7711".to_string()),
                },
                [101, 102, 103, 104],
            )
            .with_ward(
                Ward {
                    ward_number: 2,
                    ward_name: "Cardiology".to_string(),
                    location: "Block A".to_string(),
                    total_beds: 3,
                    telephone: Some("7712".to_string()),
                },
                [201, 202, 203],
            )
            .with_staff(Staff {
                staff_number: "S011".to_string(),
                first_name: "Moira".to_string(),
                last_name: "Samuel".to_string(),
                position_name: "Charge Nurse".to_string(),
                ward_number: 1,
            })
            .with_staff(Staff {
                staff_number: "S098".to_string(),
                first_name: "Carol".to_string(),
                last_name: "Farrel".to_string(),
                position_name: "Staff Nurse".to_string(),
                ward_number: 2,
            })
    }

    /// 添加病房及床位
    pub fn with_ward(mut self, ward: Ward, beds: impl IntoIterator<Item = i32>) -> Self {
        let state = self.state.get_mut();
        for bed_number in beds {
            state.beds.insert(
                bed_number,
                Bed {
                    bed_number,
                    ward_number: ward.ward_number,
                },
            );
        }
        state.wards.insert(ward.ward_number, ward);
        self
    }

    /// 添加工作人员
    pub fn with_staff(mut self, staff: Staff) -> Self {
        self.state
            .get_mut()
            .staff
            .insert(staff.staff_number.clone(), staff);
        self
    }

    /// 全部住院记录（含已出院）
    pub async fn all_inpatients(&self) -> Vec<InPatient> {
        self.state.lock().await.inpatients.clone()
    }
}

#[async_trait]
impl WardRepository for MemoryRepository {
    async fn list_wards(&self) -> Result<Vec<Ward>> {
        Ok(self.state.lock().await.wards.values().cloned().collect())
    }

    async fn get_ward(&self, ward_number: i32) -> Result<Option<Ward>> {
        Ok(self.state.lock().await.wards.get(&ward_number).cloned())
    }

    async fn beds_in_ward(&self, ward_number: i32) -> Result<Vec<Bed>> {
        let state = self.state.lock().await;
        Ok(state
            .beds
            .values()
            .filter(|bed| bed.ward_number == ward_number)
            .cloned()
            .collect())
    }

    async fn free_beds(&self, ward_number: i32) -> Result<Vec<Bed>> {
        let state = self.state.lock().await;
        Ok(state
            .beds
            .values()
            .filter(|bed| bed.ward_number == ward_number && !state.bed_occupied(bed.bed_number))
            .cloned()
            .collect())
    }

    async fn ward_staff(&self, ward_number: i32) -> Result<Vec<Staff>> {
        let state = self.state.lock().await;
        let mut staff: Vec<Staff> = state
            .staff
            .values()
            .filter(|s| s.ward_number == ward_number)
            .cloned()
            .collect();
        staff.sort_by(|a, b| (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name)));
        Ok(staff)
    }

    async fn pending_waiting_list(&self) -> Result<Vec<WaitingListEntry>> {
        let state = self.state.lock().await;
        let mut pending: Vec<WaitingListEntry> = state
            .waiting_list
            .values()
            .filter(|e| e.status == WaitingStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|e| (e.date_added, e.list_id));
        Ok(pending)
    }

    async fn get_waiting_list_entry(&self, list_id: i64) -> Result<Option<WaitingListEntry>> {
        Ok(self.state.lock().await.waiting_list.get(&list_id).cloned())
    }

    async fn add_to_waiting_list(
        &self,
        entry: &NewWaitingListEntry,
        date_added: NaiveDate,
    ) -> Result<WaitingListEntry> {
        let mut state = self.state.lock().await;

        if !state.wards.contains_key(&entry.ward_number) {
            return Err(WardError::NotFound(format!(
                "Ward {} not found",
                entry.ward_number
            )));
        }
        let already_pending = state.waiting_list.values().any(|e| {
            e.patient_number == entry.patient_number && e.status == WaitingStatus::Pending
        });
        if already_pending {
            return Err(WardError::Conflict(format!(
                "Patient {} is already on the waiting list",
                entry.patient_number
            )));
        }

        state.next_list_id += 1;
        let created = WaitingListEntry {
            list_id: state.next_list_id,
            patient_number: entry.patient_number.clone(),
            ward_number: entry.ward_number,
            expected_wait_time: entry.expected_wait_time,
            status: WaitingStatus::Pending,
            date_added,
        };
        state.waiting_list.insert(created.list_id, created.clone());
        Ok(created)
    }

    async fn update_waiting_list_status(
        &self,
        list_id: i64,
        from: WaitingStatus,
        to: WaitingStatus,
    ) -> Result<WaitingListEntry> {
        let mut state = self.state.lock().await;
        let entry = state
            .waiting_list
            .get_mut(&list_id)
            .ok_or_else(|| WardError::NotFound(format!("Waiting list entry {} not found", list_id)))?;

        if entry.status != from {
            return Err(WardError::Conflict(format!(
                "Waiting list entry {} is {}, expected {}",
                list_id, entry.status, from
            )));
        }
        entry.status = to;
        Ok(entry.clone())
    }

    async fn commit_assignment(&self, assignment: &BedAssignment) -> Result<InPatient> {
        let mut state = self.state.lock().await;

        match state.waiting_list.get(&assignment.list_id) {
            None => {
                return Err(WardError::NotFound(format!(
                    "Waiting list entry {} not found",
                    assignment.list_id
                )))
            }
            Some(entry) if entry.status != WaitingStatus::Pending => {
                return Err(WardError::Conflict(format!(
                    "Waiting list entry {} is already {}",
                    assignment.list_id, entry.status
                )))
            }
            Some(_) => {}
        }

        if !state.beds.contains_key(&assignment.bed_number) {
            return Err(WardError::NotFound(format!(
                "Bed {} not found",
                assignment.bed_number
            )));
        }
        if state.bed_occupied(assignment.bed_number) {
            return Err(WardError::Conflict(format!(
                "Bed {} is already occupied",
                assignment.bed_number
            )));
        }
        if state
            .inpatients
            .iter()
            .any(|p| p.patient_number == assignment.patient_number && p.is_active())
        {
            return Err(WardError::Conflict(format!(
                "Patient {} already has an active bed",
                assignment.patient_number
            )));
        }

        // 检查全部通过后才写入，两步写在同一把锁内完成
        let inpatient = assignment.clone().into_inpatient();
        state.inpatients.push(inpatient.clone());
        if let Some(entry) = state.waiting_list.get_mut(&assignment.list_id) {
            entry.status = WaitingStatus::Done;
        }
        Ok(inpatient)
    }

    async fn active_inpatients(&self) -> Result<Vec<InPatient>> {
        let state = self.state.lock().await;
        let mut active: Vec<InPatient> = state
            .inpatients
            .iter()
            .filter(|p| p.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|p| (p.ward_number, p.bed_number));
        Ok(active)
    }

    async fn discharge(&self, patient_number: &str, leave_date: NaiveDate) -> Result<InPatient> {
        let mut state = self.state.lock().await;
        let inpatient = state
            .inpatients
            .iter_mut()
            .find(|p| p.patient_number == patient_number && p.is_active())
            .ok_or_else(|| {
                WardError::NotFound(format!(
                    "No active in-patient record for {}",
                    patient_number
                ))
            })?;

        inpatient.date_of_actual_leave = Some(leave_date);
        Ok(inpatient.clone())
    }

    async fn create_requisition(
        &self,
        requisition: &NewRequisition,
        date_ordered: NaiveDate,
    ) -> Result<Requisition> {
        let mut state = self.state.lock().await;

        if !state.wards.contains_key(&requisition.ward_number) {
            return Err(WardError::NotFound(format!(
                "Ward {} not found",
                requisition.ward_number
            )));
        }
        if let Some(requested_by) = &requisition.requested_by {
            if !state.staff.contains_key(requested_by) {
                return Err(WardError::Validation(format!(
                    "Staff {} not found",
                    requested_by
                )));
            }
        }

        let requisition_number = state
            .requisitions
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0)
            + 1;

        let created = Requisition {
            requisition_number,
            ward_number: requisition.ward_number,
            requested_by: requisition.requested_by.clone(),
            date_ordered,
            items: requisition.items.clone(),
        };
        state.requisitions.insert(requisition_number, created.clone());
        Ok(created)
    }

    async fn list_requisitions(&self) -> Result<Vec<Requisition>> {
        Ok(self
            .state
            .lock()
            .await
            .requisitions
            .values()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ward_core::RequisitionItem;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
    }

    fn assignment(list_id: i64, patient_number: &str, bed_number: i32) -> BedAssignment {
        BedAssignment {
            inpatient_id: ward_core::utils::generate_inpatient_id(),
            list_id,
            patient_number: patient_number.to_string(),
            ward_number: 1,
            bed_number,
            staff_number: "S011".to_string(),
            expected_stay_days: 3,
            date_placed_in_ward: today(),
            date_of_expected_leave: ward_core::utils::expected_leave_date(today(), 3).unwrap(),
        }
    }

    async fn enqueue(repo: &MemoryRepository, patient_number: &str) -> WaitingListEntry {
        repo.add_to_waiting_list(
            &NewWaitingListEntry {
                patient_number: patient_number.to_string(),
                ward_number: 1,
                expected_wait_time: 3,
            },
            today(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_commit_assignment_marks_entry_done() {
        let repo = MemoryRepository::demo();
        let entry = enqueue(&repo, "P100").await;

        let inpatient = repo
            .commit_assignment(&assignment(entry.list_id, "P100", 101))
            .await
            .unwrap();

        assert_eq!(inpatient.patient_number, "P100");
        assert!(repo.pending_waiting_list().await.unwrap().is_empty());
        let beds: Vec<i32> = repo
            .free_beds(1)
            .await
            .unwrap()
            .iter()
            .map(|b| b.bed_number)
            .collect();
        assert_eq!(beds, vec![102, 103, 104]);
    }

    #[tokio::test]
    async fn test_occupied_bed_leaves_no_partial_write() {
        let repo = MemoryRepository::demo();
        let first = enqueue(&repo, "P100").await;
        let second = enqueue(&repo, "P200").await;

        repo.commit_assignment(&assignment(first.list_id, "P100", 101))
            .await
            .unwrap();
        let err = repo
            .commit_assignment(&assignment(second.list_id, "P200", 101))
            .await
            .unwrap_err();

        assert!(matches!(err, WardError::Conflict(_)));
        assert_eq!(repo.all_inpatients().await.len(), 1);
        let still_pending = repo.get_waiting_list_entry(second.list_id).await.unwrap().unwrap();
        assert_eq!(still_pending.status, WaitingStatus::Pending);
    }

    #[tokio::test]
    async fn test_duplicate_pending_patient_rejected() {
        let repo = MemoryRepository::demo();
        enqueue(&repo, "P100").await;
        let err = repo
            .add_to_waiting_list(
                &NewWaitingListEntry {
                    patient_number: "P100".to_string(),
                    ward_number: 2,
                    expected_wait_time: 1,
                },
                today(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WardError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_discharge_frees_bed() {
        let repo = MemoryRepository::demo();
        let entry = enqueue(&repo, "P100").await;
        repo.commit_assignment(&assignment(entry.list_id, "P100", 104))
            .await
            .unwrap();

        let discharged = repo.discharge("P100", today()).await.unwrap();
        assert_eq!(discharged.date_of_actual_leave, Some(today()));
        assert!(repo.active_inpatients().await.unwrap().is_empty());
        assert_eq!(repo.free_beds(1).await.unwrap().len(), 4);

        let err = repo.discharge("P100", today()).await.unwrap_err();
        assert!(matches!(err, WardError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_requisition_numbers_are_sequential() {
        let repo = MemoryRepository::demo();
        let request = NewRequisition {
            ward_number: 2,
            requested_by: Some("S098".to_string()),
            items: vec![RequisitionItem {
                item_name: "Saline".to_string(),
                quantity: 12,
            }],
        };

        let first = repo.create_requisition(&request, today()).await.unwrap();
        let second = repo.create_requisition(&request, today()).await.unwrap();
        assert_eq!(first.requisition_number, 1);
        assert_eq!(second.requisition_number, 2);
        assert_eq!(repo.list_requisitions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_requisition_with_unknown_staff_is_rejected() {
        let repo = MemoryRepository::demo();
        let request = NewRequisition {
            ward_number: 2,
            requested_by: Some("NOBODY".to_string()),
            items: vec![RequisitionItem {
                item_name: "Saline".to_string(),
                quantity: 1,
            }],
        };

        let err = repo.create_requisition(&request, today()).await.unwrap_err();
        assert!(matches!(err, WardError::Validation(_)));
        assert!(repo.list_requisitions().await.unwrap().is_empty());
    }
}
