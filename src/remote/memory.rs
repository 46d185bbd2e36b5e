use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};

use super::{Filter, RemoteTables, SelectRequest, Table};
use crate::error::AppError;

/// In-process stand-in for the hosted tables. Ids are sequential per table.
#[derive(Default)]
pub struct MemoryTables {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    rows: HashMap<Table, Vec<Value>>,
    next_ids: HashMap<Table, i64>,
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, AppError> {
        self.state.lock().map_err(|_| AppError::InternalServerError)
    }
}

impl MemoryState {
    fn table(&self, table: Table) -> &[Value] {
        self.rows.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn category_of(&self, course: &Value) -> Option<&Value> {
        let key = course.get("category_id")?;
        self.table(Table::Categories)
            .iter()
            .find(|row| row.get("id") == Some(key))
    }

    /// Rejects a course write whose `category_id` names no category, as the
    /// hosted foreign key does.
    fn check_category(&self, table: Table, row: &Map<String, Value>) -> Result<(), AppError> {
        if table != Table::Courses {
            return Ok(());
        }
        let Some(key) = row.get("category_id") else {
            return Ok(());
        };

        let known = self
            .table(Table::Categories)
            .iter()
            .any(|category| category.get("id") == Some(key));
        if known {
            Ok(())
        } else {
            Err(AppError::Remote(format!(
                "insert or update on table \"courses\" violates foreign key constraint \"courses_category_id_fkey\" (category_id={})",
                key
            )))
        }
    }
}

fn matches(row: &Value, filter: Option<&Filter>) -> bool {
    match filter {
        Some(filter) => row.get(filter.column) == Some(&Value::from(filter.value)),
        None => true,
    }
}

fn compare_column(a: &Value, b: &Value, column: &str) -> Ordering {
    match (a.get(column), b.get(column)) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RemoteTables for MemoryTables {
    async fn select(&self, request: &SelectRequest) -> Result<Vec<Value>, AppError> {
        let state = self.state()?;

        let mut rows: Vec<Value> = state
            .table(request.table)
            .iter()
            .filter(|row| matches(row, request.filter.as_ref()))
            .cloned()
            .collect();

        if let Some(column) = request.order_by {
            rows.sort_by(|a, b| compare_column(a, b, column));
        }
        if let Some(limit) = request.limit {
            rows.truncate(limit);
        }
        if request.embed_category {
            for row in rows.iter_mut() {
                let category = state.category_of(row).cloned().unwrap_or(Value::Null);
                if let Some(object) = row.as_object_mut() {
                    object.insert(Table::Categories.as_str().to_string(), category);
                }
            }
        }

        Ok(rows)
    }

    async fn count(&self, table: Table, filter: &Filter) -> Result<usize, AppError> {
        let state = self.state()?;
        Ok(state
            .table(table)
            .iter()
            .filter(|row| matches(row, Some(filter)))
            .count())
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, AppError> {
        let Value::Object(mut object) = row else {
            return Err(AppError::Remote(format!(
                "Insert into {} expects an object",
                table.as_str()
            )));
        };

        let mut state = self.state()?;
        state.check_category(table, &object)?;
        let next_id = state.next_ids.entry(table).or_insert(0);
        *next_id += 1;
        let id = *next_id;

        object.insert("id".to_string(), Value::from(id));
        object.insert("created_at".to_string(), Value::from(Utc::now().to_rfc3339()));
        let stored = Value::Object(object);

        state.rows.entry(table).or_default().push(stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        table: Table,
        filter: &Filter,
        changes: Value,
    ) -> Result<Option<Value>, AppError> {
        let Value::Object(changes) = changes else {
            return Err(AppError::Remote(format!(
                "Update of {} expects an object",
                table.as_str()
            )));
        };

        let mut state = self.state()?;
        state.check_category(table, &changes)?;
        let mut first_updated = None;

        for row in state.rows.entry(table).or_default().iter_mut() {
            if !matches(row, Some(filter)) {
                continue;
            }
            if let Some(object) = row.as_object_mut() {
                for (key, value) in &changes {
                    object.insert(key.clone(), value.clone());
                }
            }
            if first_updated.is_none() {
                first_updated = Some(row.clone());
            }
        }

        Ok(first_updated)
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), AppError> {
        let mut state = self.state()?;
        state
            .rows
            .entry(table)
            .or_default()
            .retain(|row| !matches(row, Some(filter)));
        Ok(())
    }
}
