//! PostgreSQL backend tests
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`

use chrono::NaiveDate;
use sqlx::Row;
use ward_core::{
    utils, BedAssignment, NewRequisition, NewWaitingListEntry, RequisitionItem, WaitingStatus,
    WardError, WardRepository,
};
use ward_database::{DatabasePool, DatabaseQueries, PoolSettings};

async fn setup() -> (DatabaseQueries, DatabasePool, i32) {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = DatabasePool::new(&PoolSettings::new(url))
        .await
        .expect("Failed to connect");
    let queries = DatabaseQueries::new(pool.clone());
    queries.create_tables().await.expect("Failed to create tables");

    // 每次运行使用新的病房号和床位号，避免与之前的数据冲突
    let ward_number: i32 = sqlx::query("SELECT COALESCE(MAX(ward_number), 0) + 1 AS next FROM ward")
        .fetch_one(pool.pool())
        .await
        .unwrap()
        .get("next");

    sqlx::query("INSERT INTO ward (ward_number, ward_name, location, total_beds) VALUES ($1, 'Test', 'Block T', 2)")
        .bind(ward_number)
        .execute(pool.pool())
        .await
        .unwrap();
    for offset in 1..=2 {
        sqlx::query("INSERT INTO bed (bed_number, ward_number) VALUES ($1, $2)")
            .bind(ward_number * 1000 + offset)
            .bind(ward_number)
            .execute(pool.pool())
            .await
            .unwrap();
    }
    let staff_number = format!("T{}", ward_number);
    sqlx::query("INSERT INTO staff (staff_number, first_name, last_name, position_name) VALUES ($1, 'Test', 'Nurse', 'Staff Nurse') ON CONFLICT DO NOTHING")
        .bind(&staff_number)
        .execute(pool.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO ward_staff (ward_number, staff_number) VALUES ($1, $2)")
        .bind(ward_number)
        .bind(&staff_number)
        .execute(pool.pool())
        .await
        .unwrap();

    (queries, pool, ward_number)
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_assignment_is_atomic() {
    let (queries, _pool, ward_number) = setup().await;
    let patient_a = format!("PA{}", ward_number);
    let patient_b = format!("PB{}", ward_number);

    let first = queries
        .add_to_waiting_list(
            &NewWaitingListEntry {
                patient_number: patient_a.clone(),
                ward_number,
                expected_wait_time: 2,
            },
            today(),
        )
        .await
        .unwrap();
    let second = queries
        .add_to_waiting_list(
            &NewWaitingListEntry {
                patient_number: patient_b.clone(),
                ward_number,
                expected_wait_time: 2,
            },
            today(),
        )
        .await
        .unwrap();

    let bed_number = ward_number * 1000 + 1;
    let assignment = |list_id: i64, patient_number: &str| BedAssignment {
        inpatient_id: utils::generate_inpatient_id(),
        list_id,
        patient_number: patient_number.to_string(),
        ward_number,
        bed_number,
        staff_number: format!("T{}", ward_number),
        expected_stay_days: 2,
        date_placed_in_ward: today(),
        date_of_expected_leave: utils::expected_leave_date(today(), 2).unwrap(),
    };

    queries
        .commit_assignment(&assignment(first.list_id, &patient_a))
        .await
        .unwrap();
    let err = queries
        .commit_assignment(&assignment(second.list_id, &patient_b))
        .await
        .unwrap_err();
    assert!(matches!(err, WardError::Conflict(_)));

    let entry = queries
        .get_waiting_list_entry(second.list_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, WaitingStatus::Pending);
    assert_eq!(queries.free_beds(ward_number).await.unwrap().len(), 1);

    let discharged = queries.discharge(&patient_a, today()).await.unwrap();
    assert_eq!(discharged.date_of_actual_leave, Some(today()));
    assert_eq!(queries.free_beds(ward_number).await.unwrap().len(), 2);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_concurrent_requisitions_get_distinct_numbers() {
    let (queries, _pool, ward_number) = setup().await;
    let request = NewRequisition {
        ward_number,
        requested_by: None,
        items: vec![RequisitionItem {
            item_name: "Sleeping Pills".to_string(),
            quantity: 4,
        }],
    };

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let queries = queries.clone();
            let request = request.clone();
            tokio::spawn(async move { queries.create_requisition(&request, today()).await })
        })
        .collect();

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap().requisition_number);
    }
    numbers.sort_unstable();
    numbers.dedup();
    assert_eq!(numbers.len(), 8);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_unknown_requester_is_validation_error() {
    let (queries, _pool, ward_number) = setup().await;
    let request = NewRequisition {
        ward_number,
        requested_by: Some(format!("NOBODY{}", ward_number)),
        items: vec![RequisitionItem {
            item_name: "Gauze".to_string(),
            quantity: 2,
        }],
    };

    let err = queries.create_requisition(&request, today()).await.unwrap_err();
    assert!(matches!(err, WardError::Validation(_)));
}
