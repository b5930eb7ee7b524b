//! 通用工具函数

use chrono::{Days, NaiveDate};
use uuid::Uuid;

use crate::error::{Result, WardError};
use crate::models::{NewRequisition, NewWaitingListEntry};

/// 住院号前缀
pub const INPATIENT_ID_PREFIX: &str = "INP-";

/// 预计等待和住院天数的上限
pub const MAX_STAY_DAYS: i32 = 3650;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// 生成住院号，格式为 `INP-` 加 9 位 base36 字符
pub fn generate_inpatient_id() -> String {
    let mut entropy = Uuid::new_v4().as_u128();
    let mut suffix = String::with_capacity(9);
    for _ in 0..9 {
        suffix.push(BASE36[(entropy % 36) as usize] as char);
        entropy /= 36;
    }
    format!("{}{}", INPATIENT_ID_PREFIX, suffix)
}

/// 验证住院号格式
pub fn is_valid_inpatient_id(id: &str) -> bool {
    id.strip_prefix(INPATIENT_ID_PREFIX)
        .map(|rest| rest.len() == 9 && rest.bytes().all(|b| BASE36.contains(&b)))
        .unwrap_or(false)
}

/// 校验住院天数范围
pub fn validate_stay_days(stay_days: i32) -> Result<()> {
    if stay_days <= 0 {
        return Err(WardError::Validation(
            "Expected stay must be greater than zero".to_string(),
        ));
    }
    if stay_days > MAX_STAY_DAYS {
        return Err(WardError::Validation(format!(
            "Expected stay cannot exceed {} days",
            MAX_STAY_DAYS
        )));
    }
    Ok(())
}

/// 计算预计出院日期
pub fn expected_leave_date(placed: NaiveDate, stay_days: i32) -> Result<NaiveDate> {
    let days = u64::try_from(stay_days).map_err(|_| {
        WardError::Validation("Expected stay must be greater than zero".to_string())
    })?;
    placed
        .checked_add_days(Days::new(days))
        .ok_or_else(|| {
            WardError::Validation(format!(
                "Expected leave date out of range for {} days",
                stay_days
            ))
        })
}

/// 校验申领单，任何写入之前调用
pub fn validate_requisition(requisition: &NewRequisition) -> Result<()> {
    if requisition.ward_number <= 0 {
        return Err(WardError::Validation("Ward number is required".to_string()));
    }
    if requisition.items.is_empty() {
        return Err(WardError::Validation(
            "Requisition must contain at least one item".to_string(),
        ));
    }
    for item in &requisition.items {
        if item.item_name.trim().is_empty() {
            return Err(WardError::Validation("Item name is required".to_string()));
        }
        if item.quantity <= 0 {
            return Err(WardError::Validation(format!(
                "Quantity for {} must be greater than zero",
                item.item_name
            )));
        }
    }
    Ok(())
}

/// 校验候床条目
pub fn validate_waiting_list_entry(entry: &NewWaitingListEntry) -> Result<()> {
    if entry.patient_number.trim().is_empty() {
        return Err(WardError::Validation("Patient number is required".to_string()));
    }
    if entry.expected_wait_time <= 0 {
        return Err(WardError::Validation(
            "Expected wait time must be greater than zero".to_string(),
        ));
    }
    if entry.expected_wait_time > MAX_STAY_DAYS {
        return Err(WardError::Validation(format!(
            "Expected wait time cannot exceed {} days",
            MAX_STAY_DAYS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequisitionItem;

    fn requisition(quantity: i32) -> NewRequisition {
        NewRequisition {
            ward_number: 2,
            requested_by: None,
            items: vec![RequisitionItem {
                item_name: "Paracetamol".to_string(),
                quantity,
            }],
        }
    }

    #[test]
    fn test_generate_inpatient_id() {
        let id = generate_inpatient_id();
        assert!(is_valid_inpatient_id(&id), "{}", id);
        assert_ne!(id, generate_inpatient_id());
    }

    #[test]
    fn test_is_valid_inpatient_id() {
        assert!(is_valid_inpatient_id("INP-a1b2c3d4e"));
        assert!(!is_valid_inpatient_id("INP-short"));
        assert!(!is_valid_inpatient_id("XYZ-a1b2c3d4e"));
        assert!(!is_valid_inpatient_id("INP-A1B2C3D4E"));
    }

    #[test]
    fn test_expected_leave_date() {
        let placed = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
        assert_eq!(
            expected_leave_date(placed, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(matches!(
            expected_leave_date(placed, i32::MAX),
            Err(WardError::Validation(_))
        ));
        assert!(matches!(
            expected_leave_date(NaiveDate::MAX, 1),
            Err(WardError::Validation(_))
        ));
        assert!(expected_leave_date(placed, -1).is_err());
    }

    #[test]
    fn test_validate_stay_days() {
        assert!(validate_stay_days(1).is_ok());
        assert!(validate_stay_days(MAX_STAY_DAYS).is_ok());
        assert!(validate_stay_days(0).is_err());
        assert!(validate_stay_days(MAX_STAY_DAYS + 1).is_err());
    }

    #[test]
    fn test_validate_requisition_quantity() {
        assert!(validate_requisition(&requisition(5)).is_ok());
        assert!(matches!(
            validate_requisition(&requisition(0)),
            Err(WardError::Validation(_))
        ));
        assert!(matches!(
            validate_requisition(&requisition(-3)),
            Err(WardError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_requisition_shape() {
        let mut empty = requisition(1);
        empty.items.clear();
        assert!(validate_requisition(&empty).is_err());

        let mut unnamed = requisition(1);
        unnamed.items[0].item_name = "  ".to_string();
        assert!(validate_requisition(&unnamed).is_err());

        let mut no_ward = requisition(1);
        no_ward.ward_number = 0;
        assert!(validate_requisition(&no_ward).is_err());
    }

    #[test]
    fn test_validate_waiting_list_entry() {
        let mut entry = NewWaitingListEntry {
            patient_number: "P001".to_string(),
            ward_number: 1,
            expected_wait_time: 4,
        };
        assert!(validate_waiting_list_entry(&entry).is_ok());
        entry.expected_wait_time = 0;
        assert!(validate_waiting_list_entry(&entry).is_err());
        entry.expected_wait_time = i32::MAX;
        assert!(validate_waiting_list_entry(&entry).is_err());
    }
}
