//! 数据库查询操作

use crate::connection::DatabasePool;
use crate::models::*;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use ward_core::{
    BedAssignment, Bed, InPatient, NewRequisition, NewWaitingListEntry, Requisition,
    RequisitionItem, Result, Staff, WaitingListEntry, WaitingStatus, Ward, WardError,
    WardRepository,
};

/// PostgreSQL 唯一约束冲突
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

fn db_error(e: sqlx::Error) -> WardError {
    if let sqlx::Error::Database(db) = &e {
        match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return WardError::Conflict(db.message().to_string()),
            Some(FOREIGN_KEY_VIOLATION) => {
                return WardError::Validation(db.message().to_string())
            }
            _ => {}
        }
    }
    WardError::Database(e.to_string())
}

/// 数据库查询操作接口
#[derive(Debug, Clone)]
pub struct DatabaseQueries {
    pool: DatabasePool,
}

impl DatabaseQueries {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        let tables = [
            // 病房
            r#"
            CREATE TABLE IF NOT EXISTS ward (
                ward_number INTEGER PRIMARY KEY,
                ward_name VARCHAR(128) NOT NULL,
                location VARCHAR(255) NOT NULL,
                total_beds INTEGER NOT NULL DEFAULT 0,
                telephone VARCHAR(32)
            )
            "#,
            // 床位
            r#"
            CREATE TABLE IF NOT EXISTS bed (
                bed_number INTEGER PRIMARY KEY,
                ward_number INTEGER NOT NULL REFERENCES ward(ward_number)
            )
            "#,
            // 工作人员
            r#"
            CREATE TABLE IF NOT EXISTS staff (
                staff_number VARCHAR(32) PRIMARY KEY,
                first_name VARCHAR(128) NOT NULL,
                last_name VARCHAR(128) NOT NULL,
                position_name VARCHAR(128) NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS ward_staff (
                ward_number INTEGER NOT NULL REFERENCES ward(ward_number),
                staff_number VARCHAR(32) NOT NULL REFERENCES staff(staff_number),
                PRIMARY KEY (ward_number, staff_number)
            )
            "#,
            // 候床队列
            r#"
            CREATE TABLE IF NOT EXISTS waitinglist (
                list_id BIGSERIAL PRIMARY KEY,
                patient_number VARCHAR(32) NOT NULL,
                ward_number INTEGER NOT NULL REFERENCES ward(ward_number),
                expected_wait_time INTEGER NOT NULL CHECK (expected_wait_time > 0),
                status VARCHAR(16) NOT NULL DEFAULT 'pending',
                date_added DATE NOT NULL DEFAULT CURRENT_DATE
            )
            "#,
            // 住院记录
            r#"
            CREATE TABLE IF NOT EXISTS inpatient (
                inpatient_id VARCHAR(16) PRIMARY KEY,
                list_id BIGINT NOT NULL UNIQUE REFERENCES waitinglist(list_id),
                patient_number VARCHAR(32) NOT NULL,
                ward_number INTEGER NOT NULL REFERENCES ward(ward_number),
                bed_number INTEGER NOT NULL REFERENCES bed(bed_number),
                staff_number VARCHAR(32) NOT NULL REFERENCES staff(staff_number),
                expected_stay_days INTEGER NOT NULL CHECK (expected_stay_days > 0),
                date_placed_in_ward DATE NOT NULL,
                date_of_expected_leave DATE NOT NULL,
                date_of_actual_leave DATE
            )
            "#,
            // 物资申领
            r#"
            CREATE TABLE IF NOT EXISTS requisition (
                requisition_number BIGINT PRIMARY KEY,
                ward_number INTEGER NOT NULL REFERENCES ward(ward_number),
                requested_by VARCHAR(32) REFERENCES staff(staff_number),
                date_ordered DATE NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS requisition_item (
                requisition_number BIGINT NOT NULL REFERENCES requisition(requisition_number),
                line_number INTEGER NOT NULL,
                item_name VARCHAR(255) NOT NULL,
                quantity INTEGER NOT NULL CHECK (quantity > 0),
                PRIMARY KEY (requisition_number, line_number)
            )
            "#,
        ];

        for table_sql in tables {
            sqlx::query(table_sql)
                .execute(pool)
                .await
                .map_err(|e| WardError::Database(e.to_string()))?;
        }

        // 创建索引，部分唯一索引保证床位与患者的唯一在院记录
        self.create_indexes().await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 创建数据库索引
    async fn create_indexes(&self) -> Result<()> {
        let pool = self.pool.pool();

        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_bed_ward_number ON bed(ward_number)",
            "CREATE INDEX IF NOT EXISTS idx_waitinglist_status ON waitinglist(status)",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_waitinglist_pending_patient ON waitinglist(patient_number) WHERE status = 'pending'",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_inpatient_active_bed ON inpatient(bed_number) WHERE date_of_actual_leave IS NULL",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_inpatient_active_patient ON inpatient(patient_number) WHERE date_of_actual_leave IS NULL",
            "CREATE INDEX IF NOT EXISTS idx_inpatient_ward_number ON inpatient(ward_number)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql)
                .execute(pool)
                .await
                .map_err(|e| WardError::Database(e.to_string()))?;
        }

        tracing::info!("Database indexes created successfully");
        Ok(())
    }

    async fn find_waiting_list_entry(&self, list_id: i64) -> Result<Option<WaitingListEntry>> {
        let result = sqlx::query_as::<_, DbWaitingListEntry>(
            "SELECT * FROM waitinglist WHERE list_id = $1",
        )
        .bind(list_id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(db_error)?;

        result.map(WaitingListEntry::try_from).transpose()
    }
}

#[async_trait]
impl WardRepository for DatabaseQueries {
    // ========== 病房与参考数据 ==========

    async fn list_wards(&self) -> Result<Vec<Ward>> {
        let results = sqlx::query_as::<_, DbWard>("SELECT * FROM ward ORDER BY ward_number")
            .fetch_all(self.pool.pool())
            .await
            .map_err(db_error)?;

        Ok(results.into_iter().map(Ward::from).collect())
    }

    async fn get_ward(&self, ward_number: i32) -> Result<Option<Ward>> {
        let result = sqlx::query_as::<_, DbWard>("SELECT * FROM ward WHERE ward_number = $1")
            .bind(ward_number)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(db_error)?;

        Ok(result.map(Ward::from))
    }

    async fn beds_in_ward(&self, ward_number: i32) -> Result<Vec<Bed>> {
        let results = sqlx::query_as::<_, DbBed>(
            "SELECT bed_number, ward_number FROM bed WHERE ward_number = $1 ORDER BY bed_number",
        )
        .bind(ward_number)
        .fetch_all(self.pool.pool())
        .await
        .map_err(db_error)?;

        Ok(results.into_iter().map(Bed::from).collect())
    }

    async fn free_beds(&self, ward_number: i32) -> Result<Vec<Bed>> {
        let results = sqlx::query_as::<_, DbBed>(
            r#"
            SELECT b.bed_number, b.ward_number
            FROM bed b
            WHERE b.ward_number = $1
              AND NOT EXISTS (
                  SELECT 1 FROM inpatient i
                  WHERE i.bed_number = b.bed_number AND i.date_of_actual_leave IS NULL
              )
            ORDER BY b.bed_number
            "#,
        )
        .bind(ward_number)
        .fetch_all(self.pool.pool())
        .await
        .map_err(db_error)?;

        Ok(results.into_iter().map(Bed::from).collect())
    }

    async fn ward_staff(&self, ward_number: i32) -> Result<Vec<Staff>> {
        let results = sqlx::query_as::<_, DbStaff>(
            r#"
            SELECT s.staff_number, s.first_name, s.last_name, s.position_name, ws.ward_number
            FROM staff s
            JOIN ward_staff ws ON ws.staff_number = s.staff_number
            WHERE ws.ward_number = $1
            ORDER BY s.last_name, s.first_name
            "#,
        )
        .bind(ward_number)
        .fetch_all(self.pool.pool())
        .await
        .map_err(db_error)?;

        Ok(results.into_iter().map(Staff::from).collect())
    }

    // ========== 候床队列 ==========

    async fn pending_waiting_list(&self) -> Result<Vec<WaitingListEntry>> {
        let results = sqlx::query_as::<_, DbWaitingListEntry>(
            "SELECT * FROM waitinglist WHERE status = $1 ORDER BY date_added, list_id",
        )
        .bind(WaitingStatus::Pending.as_str())
        .fetch_all(self.pool.pool())
        .await
        .map_err(db_error)?;

        results.into_iter().map(WaitingListEntry::try_from).collect()
    }

    async fn get_waiting_list_entry(&self, list_id: i64) -> Result<Option<WaitingListEntry>> {
        self.find_waiting_list_entry(list_id).await
    }

    async fn add_to_waiting_list(
        &self,
        entry: &NewWaitingListEntry,
        date_added: NaiveDate,
    ) -> Result<WaitingListEntry> {
        let row = sqlx::query_as::<_, DbWaitingListEntry>(
            r#"
            INSERT INTO waitinglist (patient_number, ward_number, expected_wait_time, status, date_added)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&entry.patient_number)
        .bind(entry.ward_number)
        .bind(entry.expected_wait_time)
        .bind(WaitingStatus::Pending.as_str())
        .bind(date_added)
        .fetch_one(self.pool.pool())
        .await
        .map_err(db_error)?;

        WaitingListEntry::try_from(row)
    }

    async fn update_waiting_list_status(
        &self,
        list_id: i64,
        from: WaitingStatus,
        to: WaitingStatus,
    ) -> Result<WaitingListEntry> {
        let row = sqlx::query_as::<_, DbWaitingListEntry>(
            "UPDATE waitinglist SET status = $3 WHERE list_id = $1 AND status = $2 RETURNING *",
        )
        .bind(list_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(self.pool.pool())
        .await
        .map_err(db_error)?;

        match row {
            Some(row) => WaitingListEntry::try_from(row),
            None => match self.find_waiting_list_entry(list_id).await? {
                Some(current) => Err(WardError::Conflict(format!(
                    "Waiting list entry {} is {}, expected {}",
                    list_id, current.status, from
                ))),
                None => Err(WardError::NotFound(format!(
                    "Waiting list entry {} not found",
                    list_id
                ))),
            },
        }
    }

    // ========== 床位分配 ==========

    async fn commit_assignment(&self, assignment: &BedAssignment) -> Result<InPatient> {
        let mut tx = self.pool.pool().begin().await.map_err(db_error)?;

        // 锁定候床条目，防止并发分配
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM waitinglist WHERE list_id = $1 FOR UPDATE")
                .bind(assignment.list_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;

        match status.as_deref() {
            None => {
                return Err(WardError::NotFound(format!(
                    "Waiting list entry {} not found",
                    assignment.list_id
                )))
            }
            Some(s) if s != WaitingStatus::Pending.as_str() => {
                return Err(WardError::Conflict(format!(
                    "Waiting list entry {} is already {}",
                    assignment.list_id, s
                )))
            }
            Some(_) => {}
        }

        let occupied: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM inpatient WHERE bed_number = $1 AND date_of_actual_leave IS NULL)",
        )
        .bind(assignment.bed_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        if occupied {
            return Err(WardError::Conflict(format!(
                "Bed {} is already occupied",
                assignment.bed_number
            )));
        }

        let inpatient = sqlx::query_as::<_, DbInPatient>(
            r#"
            INSERT INTO inpatient (inpatient_id, list_id, patient_number, ward_number, bed_number,
                                   staff_number, expected_stay_days, date_placed_in_ward,
                                   date_of_expected_leave, date_of_actual_leave)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL)
            RETURNING *
            "#,
        )
        .bind(&assignment.inpatient_id)
        .bind(assignment.list_id)
        .bind(&assignment.patient_number)
        .bind(assignment.ward_number)
        .bind(assignment.bed_number)
        .bind(&assignment.staff_number)
        .bind(assignment.expected_stay_days)
        .bind(assignment.date_placed_in_ward)
        .bind(assignment.date_of_expected_leave)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query("UPDATE waitinglist SET status = $2 WHERE list_id = $1")
            .bind(assignment.list_id)
            .bind(WaitingStatus::Done.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(InPatient::from(inpatient))
    }

    // ========== 住院与出院 ==========

    async fn active_inpatients(&self) -> Result<Vec<InPatient>> {
        let results = sqlx::query_as::<_, DbInPatient>(
            "SELECT * FROM inpatient WHERE date_of_actual_leave IS NULL ORDER BY ward_number, bed_number",
        )
        .fetch_all(self.pool.pool())
        .await
        .map_err(db_error)?;

        Ok(results.into_iter().map(InPatient::from).collect())
    }

    async fn discharge(&self, patient_number: &str, leave_date: NaiveDate) -> Result<InPatient> {
        let result = sqlx::query_as::<_, DbInPatient>(
            r#"
            UPDATE inpatient SET date_of_actual_leave = $2
            WHERE patient_number = $1 AND date_of_actual_leave IS NULL
            RETURNING *
            "#,
        )
        .bind(patient_number)
        .bind(leave_date)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(db_error)?;

        result.map(InPatient::from).ok_or_else(|| {
            WardError::NotFound(format!("No active in-patient record for {}", patient_number))
        })
    }

    // ========== 物资申领 ==========

    async fn create_requisition(
        &self,
        requisition: &NewRequisition,
        date_ordered: NaiveDate,
    ) -> Result<Requisition> {
        let mut tx = self.pool.pool().begin().await.map_err(db_error)?;

        // 串行化单号分配，并发提交不会得到相同单号
        sqlx::query("LOCK TABLE requisition IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let requisition_number: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(requisition_number), 0) + 1 FROM requisition",
        )
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        let header = sqlx::query_as::<_, DbRequisition>(
            r#"
            INSERT INTO requisition (requisition_number, ward_number, requested_by, date_ordered)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(requisition_number)
        .bind(requisition.ward_number)
        .bind(&requisition.requested_by)
        .bind(date_ordered)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        for (index, item) in requisition.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO requisition_item (requisition_number, line_number, item_name, quantity)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(requisition_number)
            .bind(index as i32 + 1)
            .bind(&item.item_name)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;

        Ok(header.with_items(requisition.items.clone()))
    }

    async fn list_requisitions(&self) -> Result<Vec<Requisition>> {
        let pool = self.pool.pool();

        let headers = sqlx::query_as::<_, DbRequisition>(
            "SELECT * FROM requisition ORDER BY requisition_number",
        )
        .fetch_all(pool)
        .await
        .map_err(db_error)?;

        let items = sqlx::query_as::<_, DbRequisitionItem>(
            "SELECT * FROM requisition_item ORDER BY requisition_number, line_number",
        )
        .fetch_all(pool)
        .await
        .map_err(db_error)?;

        let mut by_number: BTreeMap<i64, Vec<RequisitionItem>> = BTreeMap::new();
        for item in items {
            by_number
                .entry(item.requisition_number)
                .or_default()
                .push(RequisitionItem::from(item));
        }

        Ok(headers
            .into_iter()
            .map(|header| {
                let items = by_number
                    .remove(&header.requisition_number)
                    .unwrap_or_default();
                header.with_items(items)
            })
            .collect())
    }
}
