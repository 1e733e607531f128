#![allow(dead_code)]

use async_trait::async_trait;
use roster_migrate::domain::ports::{Query, RecordStore};
use roster_migrate::{MigrateError, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory tables that answer the planner's queries and record every insert.
#[derive(Clone, Default)]
pub struct MockStore {
    tables: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    inserts: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
    failing_table: Arc<Mutex<Option<String>>>,
    insert_error: Option<String>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_inserts(message: &str) -> Self {
        Self {
            insert_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub async fn put(&self, table: &str, rows: Vec<Value>) {
        let mut tables = self.tables.lock().await;
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    pub async fn rows(&self, table: &str) -> Vec<Value> {
        let tables = self.tables.lock().await;
        tables.get(table).cloned().unwrap_or_default()
    }

    pub async fn inserts(&self) -> Vec<(String, Vec<Value>)> {
        self.inserts.lock().await.clone()
    }

    pub async fn fail_selects_on(&self, table: Option<&str>) {
        *self.failing_table.lock().await = table.map(str::to_string);
    }

    async fn check_failure(&self, table: &str) -> Result<()> {
        if self.failing_table.lock().await.as_deref() == Some(table) {
            return Err(MigrateError::StoreError {
                table: table.to_string(),
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MockStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        self.check_failure(&query.table).await?;
        let mut rows: Vec<Value> = self
            .rows(&query.table)
            .await
            .into_iter()
            .filter(|row| query.matches(row))
            .collect();
        if let Some(column) = &query.order_by {
            rows.sort_by_key(|row| row.get(column).and_then(|v| v.as_i64()));
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<()> {
        if let Some(message) = &self.insert_error {
            return Err(MigrateError::StoreError {
                table: table.to_string(),
                status: 409,
                message: message.clone(),
            });
        }
        self.inserts
            .lock()
            .await
            .push((table.to_string(), rows.clone()));
        self.put(table, rows).await;
        Ok(())
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        Ok(self.select(query).await?.len() as u64)
    }
}

pub fn class_row(id: i64, period: i64, level: i32, sublevel: i32, professor: i64) -> Value {
    class_row_with_role(id, period, level, sublevel, professor, "professor")
}

pub fn class_row_with_role(
    id: i64,
    period: i64,
    level: i32,
    sublevel: i32,
    professor: i64,
    role: &str,
) -> Value {
    json!({
        "id": id,
        "period_id": period,
        "subject_id": id * 10,
        "professor_id": professor,
        "active": true,
        "subjects": {
            "id": id * 10,
            "name": format!("Level {} / {}", level, sublevel),
            "level": level,
            "sublevel": sublevel
        },
        "professors": {"id": professor, "name": format!("Prof {}", professor), "role": role}
    })
}

pub fn enrollment_row(id: i64, student: i64, class: i64, active: bool) -> Value {
    json!({"id": id, "student_id": student, "class_id": class, "active": active})
}

pub fn student_ids_for(rows: &[Value], class: i64) -> Vec<i64> {
    let mut ids: Vec<i64> = rows
        .iter()
        .filter(|r| r["class_id"] == json!(class))
        .filter_map(|r| r["student_id"].as_i64())
        .collect();
    ids.sort();
    ids
}
