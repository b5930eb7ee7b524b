//! 在院名单
//!
//! 对在院患者列表做过滤、分页和床位占用统计

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ward_core::{InPatient, Ward};

/// 在院名单过滤器
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterFilter {
    pub ward_number: Option<i32>,
    /// 患者号子串，不区分大小写
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Default for RosterFilter {
    fn default() -> Self {
        Self {
            ward_number: None,
            search: None,
            limit: Some(50),
            offset: Some(0),
        }
    }
}

/// 分页后的在院名单，`total` 为分页前的匹配数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterPage {
    pub inpatients: Vec<InPatient>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// 单个病房的占用情况
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WardOccupancy {
    pub ward_number: i32,
    pub ward_name: String,
    pub occupied_beds: usize,
    pub total_beds: i32,
}

/// 在院统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterStats {
    pub active_inpatients: usize,
    pub overdue_stays: usize,
    pub occupancy: Vec<WardOccupancy>,
}

/// 按过滤器筛选在院患者，结果按病房、床位排序
pub fn query_roster(inpatients: Vec<InPatient>, filter: &RosterFilter) -> RosterPage {
    let needle = filter
        .search
        .as_ref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut items: Vec<InPatient> = inpatients
        .into_iter()
        .filter(|p| p.is_active())
        .filter(|p| filter.ward_number.map_or(true, |w| p.ward_number == w))
        .filter(|p| {
            needle
                .as_ref()
                .map_or(true, |n| p.patient_number.to_lowercase().contains(n))
        })
        .collect();

    items.sort_by_key(|p| (p.ward_number, p.bed_number));

    // 应用分页
    let offset = filter.offset.unwrap_or(0);
    let limit = filter.limit.unwrap_or(50);

    let total = items.len();

    RosterPage {
        inpatients: items.into_iter().skip(offset).take(limit).collect(),
        total,
        offset,
        limit,
    }
}

/// 计算在院统计
pub fn roster_stats(inpatients: &[InPatient], wards: &[Ward], today: NaiveDate) -> RosterStats {
    let active: Vec<&InPatient> = inpatients.iter().filter(|p| p.is_active()).collect();

    let mut occupied: BTreeMap<i32, usize> = BTreeMap::new();
    for inpatient in &active {
        *occupied.entry(inpatient.ward_number).or_insert(0) += 1;
    }

    let occupancy = wards
        .iter()
        .map(|ward| WardOccupancy {
            ward_number: ward.ward_number,
            ward_name: ward.ward_name.clone(),
            occupied_beds: occupied.get(&ward.ward_number).copied().unwrap_or(0),
            total_beds: ward.total_beds,
        })
        .collect();

    RosterStats {
        active_inpatients: active.len(),
        overdue_stays: active.iter().filter(|p| p.is_overdue(today)).count(),
        occupancy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn inpatient(patient_number: &str, ward_number: i32, bed_number: i32) -> InPatient {
        InPatient {
            inpatient_id: format!("INP-{:0>9}", bed_number),
            list_id: i64::from(bed_number),
            patient_number: patient_number.to_string(),
            ward_number,
            bed_number,
            staff_number: "S1".to_string(),
            expected_stay_days: 2,
            date_placed_in_ward: day(1),
            date_of_expected_leave: day(3),
            date_of_actual_leave: None,
        }
    }

    fn ward(ward_number: i32, total_beds: i32) -> Ward {
        Ward {
            ward_number,
            ward_name: format!("Ward {}", ward_number),
            location: "Block B".to_string(),
            total_beds,
            telephone: None,
        }
    }

    #[test]
    fn test_query_roster_filters() {
        let mut discharged = inpatient("P300", 1, 12);
        discharged.date_of_actual_leave = Some(day(2));
        let all = vec![
            inpatient("P200", 2, 21),
            inpatient("P100", 1, 11),
            discharged,
            inpatient("px101", 1, 13),
        ];

        let ward_one = query_roster(
            all.clone(),
            &RosterFilter {
                ward_number: Some(1),
                ..Default::default()
            },
        );
        let numbers: Vec<&str> = ward_one
            .inpatients
            .iter()
            .map(|p| p.patient_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["P100", "px101"]);
        assert_eq!(ward_one.total, 2);

        let searched = query_roster(
            all.clone(),
            &RosterFilter {
                search: Some("PX".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(searched.total, 1);
        assert_eq!(searched.inpatients[0].patient_number, "px101");

        let paged = query_roster(
            all,
            &RosterFilter {
                limit: Some(1),
                offset: Some(1),
                ..Default::default()
            },
        );
        assert_eq!(paged.inpatients.len(), 1);
        assert_eq!(paged.inpatients[0].patient_number, "px101");
        assert_eq!(paged.total, 3);
        assert_eq!((paged.offset, paged.limit), (1, 1));
    }

    #[test]
    fn test_roster_stats() {
        let mut discharged = inpatient("P300", 1, 12);
        discharged.date_of_actual_leave = Some(day(2));
        let all = vec![inpatient("P100", 1, 11), inpatient("P200", 2, 21), discharged];

        let stats = roster_stats(&all, &[ward(1, 4), ward(2, 2), ward(3, 6)], day(5));
        assert_eq!(stats.active_inpatients, 2);
        assert_eq!(stats.overdue_stays, 2);
        assert_eq!(stats.occupancy[0].occupied_beds, 1);
        assert_eq!(stats.occupancy[2].occupied_beds, 0);

        let on_time = roster_stats(&all, &[], day(3));
        assert_eq!(on_time.overdue_stays, 0);
    }
}
