use crate::infrastructure::config::BackendEndpoint;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

impl FilterOp {
    fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Gte => "gte",
            Self::Lte => "lte",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// Row selection rendered as PostgREST query parameters.
///
/// The same value scopes `update` and `delete`; only its filters apply there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectQuery {
    columns: Vec<String>,
    filters: Vec<Filter>,
    order: Option<OrderBy>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|column| column.to_string()).collect();
        self
    }

    pub fn eq(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    pub fn gte(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Gte, value)
    }

    pub fn lte(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Lte, value)
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some(OrderBy {
            column: column.to_string(),
            ascending: true,
        });
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(OrderBy {
            column: column.to_string(),
            ascending: false,
        });
        self
    }

    fn filter(mut self, column: &str, op: FilterOp, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op,
            value: value.to_string(),
        });
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn selected_columns(&self) -> &[String] {
        &self.columns
    }

    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order.as_ref()
    }

    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 2);
        let select = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(",")
        };
        pairs.push(("select".to_string(), select));
        pairs.extend(self.filter_pairs());
        if let Some(order) = &self.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            pairs.push(("order".to_string(), format!("{}.{direction}", order.column)));
        }
        pairs
    }

    pub fn filter_pairs(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|filter| {
                (
                    filter.column.clone(),
                    format!("{}.{}", filter.op.as_str(), filter.value),
                )
            })
            .collect()
    }

    /// Evaluates the filters against a JSON row the way PostgREST compares
    /// text, date and boolean columns.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| {
            let Some(actual) = row.get(&filter.column).and_then(scalar_text) else {
                return false;
            };
            let ordering = actual.as_str().cmp(filter.value.as_str());
            match filter.op {
                FilterOp::Eq => ordering == Ordering::Equal,
                FilterOp::Gte => ordering != Ordering::Less,
                FilterOp::Lte => ordering != Ordering::Greater,
            }
        })
    }

    /// Sorts rows by the order column; nulls sort last, ties keep input order.
    pub fn sort_rows(&self, rows: &mut [Value]) {
        let Some(order) = &self.order else {
            return;
        };
        rows.sort_by(|left, right| {
            let left = left.get(&order.column).and_then(scalar_text);
            let right = right.get(&order.column).and_then(scalar_text);
            let ordering = match (left, right) {
                (Some(left), Some(right)) => left.cmp(&right),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if order.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
    }

    /// Keeps only the selected columns of a row.
    pub fn project(&self, row: Value) -> Value {
        if self.columns.is_empty() {
            return row;
        }
        let Value::Object(object) = row else {
            return row;
        };
        let projected = object
            .into_iter()
            .filter(|(key, _)| self.columns.iter().any(|column| column == key))
            .collect();
        Value::Object(projected)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Table access over untyped JSON rows; every call carries the caller's access token.
#[async_trait]
pub trait RestClient: Send + Sync {
    async fn select(
        &self,
        access_token: &str,
        table: &str,
        query: &SelectQuery,
    ) -> Result<Vec<Value>, InfraError>;

    async fn insert(&self, access_token: &str, table: &str, row: Value) -> Result<Value, InfraError>;

    async fn update(
        &self,
        access_token: &str,
        table: &str,
        filter: &SelectQuery,
        patch: Value,
    ) -> Result<Vec<Value>, InfraError>;

    async fn upsert(
        &self,
        access_token: &str,
        table: &str,
        row: Value,
        on_conflict: &str,
    ) -> Result<Value, InfraError>;

    async fn delete(&self, access_token: &str, table: &str, filter: &SelectQuery)
        -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestRestClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, serde::Deserialize)]
struct PostgrestErrorPayload {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

impl ReqwestRestClient {
    pub fn new(endpoint: &BackendEndpoint) -> Self {
        Self {
            client: Client::new(),
            base_url: endpoint.url.trim_end_matches('/').to_string(),
            anon_key: endpoint.anon_key.clone(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
    }

    async fn send(&self, table: &str, request: RequestBuilder) -> Result<String, InfraError> {
        let response = request.send().await.map_err(|error| {
            InfraError::Network(format!("request to {table} failed: {error}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Network(format!("failed reading {table} response: {error}"))
        })?;

        if !status.is_success() {
            return Err(backend_error(status.as_u16(), &body));
        }
        Ok(body)
    }

    async fn send_rows(&self, table: &str, request: RequestBuilder) -> Result<Vec<Value>, InfraError> {
        let body = self.send(table, request).await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str::<Vec<Value>>(&body).map_err(|error| InfraError::InvalidRecord {
            table: table.to_string(),
            reason: format!("expected a row array: {error}"),
        })
    }
}

pub(crate) fn backend_error(status: u16, body: &str) -> InfraError {
    match serde_json::from_str::<PostgrestErrorPayload>(body) {
        Ok(payload) if payload.message.is_some() || payload.code.is_some() => {
            let message = payload
                .message
                .or(payload.details)
                .unwrap_or_else(|| format!("http {status}"));
            InfraError::Backend {
                status,
                code: payload.code,
                message,
            }
        }
        _ => InfraError::Backend {
            status,
            code: None,
            message: if body.trim().is_empty() {
                format!("http {status}")
            } else {
                body.trim().to_string()
            },
        },
    }
}

fn first_row(table: &str, rows: Vec<Value>) -> Result<Value, InfraError> {
    rows.into_iter().next().ok_or_else(|| InfraError::InvalidRecord {
        table: table.to_string(),
        reason: "backend returned no representation".to_string(),
    })
}

#[async_trait]
impl RestClient for ReqwestRestClient {
    async fn select(
        &self,
        access_token: &str,
        table: &str,
        query: &SelectQuery,
    ) -> Result<Vec<Value>, InfraError> {
        let request = self
            .authorized(self.client.get(self.table_url(table)), access_token)
            .query(&query.to_query_pairs());
        self.send_rows(table, request).await
    }

    async fn insert(&self, access_token: &str, table: &str, row: Value) -> Result<Value, InfraError> {
        let request = self
            .authorized(self.client.post(self.table_url(table)), access_token)
            .header("Prefer", "return=representation")
            .json(&row);
        first_row(table, self.send_rows(table, request).await?)
    }

    async fn update(
        &self,
        access_token: &str,
        table: &str,
        filter: &SelectQuery,
        patch: Value,
    ) -> Result<Vec<Value>, InfraError> {
        let request = self
            .authorized(self.client.patch(self.table_url(table)), access_token)
            .query(&filter.filter_pairs())
            .header("Prefer", "return=representation")
            .json(&patch);
        self.send_rows(table, request).await
    }

    async fn upsert(
        &self,
        access_token: &str,
        table: &str,
        row: Value,
        on_conflict: &str,
    ) -> Result<Value, InfraError> {
        let request = self
            .authorized(self.client.post(self.table_url(table)), access_token)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&row);
        first_row(table, self.send_rows(table, request).await?)
    }

    async fn delete(
        &self,
        access_token: &str,
        table: &str,
        filter: &SelectQuery,
    ) -> Result<(), InfraError> {
        let request = self
            .authorized(self.client.delete(self.table_url(table)), access_token)
            .query(&filter.filter_pairs());
        self.send(table, request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, header, headers, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn client_for(server: &MockServer) -> ReqwestRestClient {
        ReqwestRestClient::new(&BackendEndpoint {
            url: format!("{}/", server.uri()),
            anon_key: "anon-key".to_string(),
        })
    }

    #[test]
    fn select_query_renders_postgrest_pairs() {
        let query = SelectQuery::new()
            .gte("date", "2024-02-01")
            .lte("date", "2024-02-29")
            .order_asc("date");
        assert_eq!(
            query.to_query_pairs(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("date".to_string(), "gte.2024-02-01".to_string()),
                ("date".to_string(), "lte.2024-02-29".to_string()),
                ("order".to_string(), "date.asc".to_string()),
            ]
        );

        let projected = SelectQuery::new().columns(&["id", "date", "category"]).order_desc("date");
        assert_eq!(projected.to_query_pairs()[0].1, "id,date,category");
        assert_eq!(projected.to_query_pairs()[1].1, "date.desc");
    }

    #[test]
    fn matches_and_sort_follow_text_comparison() {
        let query = SelectQuery::new()
            .gte("date", "2024-02-01")
            .lte("date", "2024-02-29")
            .order_asc("date");
        let mut rows = vec![
            json!({ "id": "b", "date": "2024-02-20" }),
            json!({ "id": "c", "date": "2024-03-01" }),
            json!({ "id": "a", "date": "2024-02-01" }),
        ];
        rows.retain(|row| query.matches(row));
        query.sort_rows(&mut rows);
        let ids = rows
            .iter()
            .filter_map(|row| row["id"].as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(!SelectQuery::new().eq("completed", true).matches(&json!({ "completed": false })));
    }

    #[tokio::test]
    async fn select_sends_keys_filters_and_decodes_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/events"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer user-token"))
            .and(query_param("select", "*"))
            .and(query_param("order", "date.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "evt-1", "date": "2024-02-03" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rows = client_for(&server)
            .select("user-token", "events", &SelectQuery::new().order_asc("date"))
            .await
            .expect("select rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "evt-1");
    }

    #[tokio::test]
    async fn insert_requests_representation_and_returns_first_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/reminders"))
            .and(header("prefer", "return=representation"))
            .and(body_json(json!({ "title": "Pay rent" })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!([{ "id": "rem-1", "title": "Pay rent" }])),
            )
            .mount(&server)
            .await;

        let row = client_for(&server)
            .insert("user-token", "reminders", json!({ "title": "Pay rent" }))
            .await
            .expect("insert row");
        assert_eq!(row["id"], "rem-1");
    }

    #[tokio::test]
    async fn upsert_sets_conflict_target_and_merge_preference() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/user_preferences"))
            .and(query_param("on_conflict", "user_id"))
            .and(headers(
                "prefer",
                vec!["resolution=merge-duplicates", "return=representation"],
            ))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!([{ "user_id": "user-1", "theme": "dark" }])),
            )
            .mount(&server)
            .await;

        let row = client_for(&server)
            .upsert(
                "user-token",
                "user_preferences",
                json!({ "user_id": "user-1", "theme": "dark" }),
                "user_id",
            )
            .await
            .expect("upsert row");
        assert_eq!(row["theme"], "dark");
    }

    #[tokio::test]
    async fn delete_filters_by_identity() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/events"))
            .and(query_param("id", "eq.evt-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .delete("user-token", "events", &SelectQuery::new().eq("id", "evt-1"))
            .await
            .expect("delete row");
    }

    #[tokio::test]
    async fn postgrest_error_body_becomes_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/events"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "code": "PGRST301",
                "message": "JWT expired",
                "details": null,
                "hint": null
            })))
            .mount(&server)
            .await;

        let error = client_for(&server)
            .select("stale-token", "events", &SelectQuery::new())
            .await
            .expect_err("expired token rejected");
        match error {
            InfraError::Backend { status, code, message } => {
                assert_eq!(status, 401);
                assert_eq!(code.as_deref(), Some("PGRST301"));
                assert_eq!(message, "JWT expired");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[test]
    fn non_json_error_body_is_kept_as_message() {
        match backend_error(502, "Bad Gateway") {
            InfraError::Backend { status, code, message } => {
                assert_eq!(status, 502);
                assert_eq!(code, None);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }
}
