use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    /// Case-insensitive pattern match.
    ILike(String, String),
}

/// A read against one table: projection, equality filters and optional ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<String>,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    /// Column projection, including foreign-key expansion such as `subjects(id,name)`.
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn ilike(mut self, column: &str, pattern: &str) -> Self {
        self.filters
            .push(Filter::ILike(column.to_string(), pattern.to_string()));
        self
    }

    pub fn order(mut self, column: &str) -> Self {
        self.order_by = Some(column.to_string());
        self
    }

    /// Whether `row` satisfies every filter. Used by in-memory stores.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| match filter {
            Filter::Eq(column, expected) => row.get(column) == Some(expected),
            Filter::ILike(column, pattern) => row
                .get(column)
                .and_then(|v| v.as_str())
                .map(|v| v.to_lowercase() == pattern.to_lowercase())
                .unwrap_or(false),
        })
    }
}

/// The three call shapes the planner issues against the remote tables.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Value>>;
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<()>;
    async fn count(&self, query: &Query) -> Result<u64>;
}

pub trait ConfigProvider: Send + Sync {
    fn store_url(&self) -> &str;
    fn api_key(&self) -> &str;
    fn timeout_seconds(&self) -> Option<u64>;
    fn professor_role(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_matches_all_filters() {
        let query = Query::table("classes").eq("period_id", 2).eq("active", true);
        assert!(query.matches(&json!({"id": 1, "period_id": 2, "active": true})));
        assert!(!query.matches(&json!({"id": 1, "period_id": 2, "active": false})));
        assert!(!query.matches(&json!({"id": 1, "active": true})));
    }

    #[test]
    fn test_ilike_ignores_case() {
        let query = Query::table("admins").ilike("email", "Boss@School.edu");
        assert!(query.matches(&json!({"email": "boss@school.edu"})));
        assert!(!query.matches(&json!({"email": "other@school.edu"})));
    }

    #[test]
    fn test_ilike_folds_non_ascii_letters() {
        let query = Query::table("students").ilike("email", "ÁLVARO.NÚÑEZ@school.edu");
        assert!(query.matches(&json!({"email": "álvaro.núñez@school.edu"})));
    }
}
