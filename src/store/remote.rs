use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use super::StoreError;
use crate::config::RemoteConfig;

/// Row-level operations against a hosted table store.
///
/// Rows are snake_case JSON objects carrying `id` and `user_id`; conversion
/// to in-memory records happens in the persistence layer.
pub trait RemoteBackend {
    /// All rows of `table` owned by `user_id`
    fn select(&self, table: &str, user_id: &str) -> Result<Vec<Value>, StoreError>;

    /// Insert or update a row by id and return the stored representation
    fn upsert(&self, table: &str, row: Value) -> Result<Value, StoreError>;

    /// Delete a row; returns whether a row was removed
    fn delete(&self, table: &str, user_id: &str, id: &str) -> Result<bool, StoreError>;
}

/// Supabase (PostgREST) client using the blocking reqwest API
pub struct SupabaseBackend {
    client: Client,
    base_url: String,
    api_key: String,
    bearer: String,
}

impl SupabaseBackend {
    pub fn new(config: &RemoteConfig) -> Result<Self, StoreError> {
        let base_url = config
            .url
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .ok_or(StoreError::NotConfigured)?;
        let api_key = config
            .anon_key
            .as_deref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(StoreError::NotConfigured)?;
        let bearer = config
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| api_key.clone());

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
            bearer,
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.bearer))
    }

    fn check(table: &str, response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(StoreError::Remote {
            table: table.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

impl RemoteBackend for SupabaseBackend {
    fn select(&self, table: &str, user_id: &str) -> Result<Vec<Value>, StoreError> {
        let user_filter = format!("eq.{}", user_id);
        let response = self
            .request(Method::GET, table)
            .query(&[("select", "*"), ("user_id", user_filter.as_str())])
            .send()?;
        let rows = Self::check(table, response)?.json::<Vec<Value>>()?;
        tracing::debug!(table, rows = rows.len(), "remote select");
        Ok(rows)
    }

    fn upsert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let response = self
            .request(Method::POST, table)
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[&row])
            .send()?;
        let mut stored = Self::check(table, response)?.json::<Vec<Value>>()?;
        // An empty representation means the row was accepted as sent
        Ok(if stored.is_empty() { row } else { stored.swap_remove(0) })
    }

    fn delete(&self, table: &str, user_id: &str, id: &str) -> Result<bool, StoreError> {
        let id_filter = format!("eq.{}", id);
        let user_filter = format!("eq.{}", user_id);
        let response = self
            .request(Method::DELETE, table)
            .query(&[("id", id_filter.as_str()), ("user_id", user_filter.as_str())])
            .header("Prefer", "return=representation")
            .send()?;
        let removed = Self::check(table, response)?.json::<Vec<Value>>()?;
        Ok(!removed.is_empty())
    }
}

/// In-process table store with the same row semantics as the hosted one.
/// Clones share state, so a caller can keep a handle while the persistence
/// layer owns another.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    state: Rc<RefCell<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Value>>,
    offline: bool,
    read_only: bool,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails like an unreachable server
    pub fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    /// Reads keep working while upserts and deletes are rejected
    pub fn fail_writes(&self, read_only: bool) {
        self.state.borrow_mut().read_only = read_only;
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.state
            .borrow()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Insert a row directly, as another device would
    pub fn insert_row(&self, table: &str, row: Value) {
        self.state
            .borrow_mut()
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    fn ensure_online(&self, table: &str) -> Result<(), StoreError> {
        if self.state.borrow().offline {
            return Err(StoreError::Remote {
                table: table.to_string(),
                status: 503,
                body: "offline".to_string(),
            });
        }
        Ok(())
    }

    fn ensure_writable(&self, table: &str) -> Result<(), StoreError> {
        self.ensure_online(table)?;
        if self.state.borrow().read_only {
            return Err(StoreError::Remote {
                table: table.to_string(),
                status: 403,
                body: "read only".to_string(),
            });
        }
        Ok(())
    }
}

fn field<'a>(row: &'a Value, name: &str) -> Option<&'a str> {
    row.get(name).and_then(Value::as_str)
}

impl RemoteBackend for MemoryRemote {
    fn select(&self, table: &str, user_id: &str) -> Result<Vec<Value>, StoreError> {
        self.ensure_online(table)?;
        Ok(self
            .rows(table)
            .into_iter()
            .filter(|row| field(row, "user_id") == Some(user_id))
            .collect())
    }

    fn upsert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        self.ensure_writable(table)?;
        let Some(id) = field(&row, "id").map(str::to_string) else {
            return Err(StoreError::Remote {
                table: table.to_string(),
                status: 400,
                body: "row without id".to_string(),
            });
        };
        let mut state = self.state.borrow_mut();
        let rows = state.tables.entry(table.to_string()).or_default();
        match rows.iter_mut().find(|r| field(r, "id") == Some(id.as_str())) {
            Some(existing) => *existing = row.clone(),
            None => rows.push(row.clone()),
        }
        Ok(row)
    }

    fn delete(&self, table: &str, user_id: &str, id: &str) -> Result<bool, StoreError> {
        self.ensure_writable(table)?;
        let mut state = self.state.borrow_mut();
        let Some(rows) = state.tables.get_mut(table) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| !(field(r, "id") == Some(id) && field(r, "user_id") == Some(user_id)));
        Ok(rows.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_remote_upserts_by_id_and_scopes_by_user() {
        let remote = MemoryRemote::new();
        let row = serde_json::json!({"id": "a", "user_id": "u1", "text": "one"});
        remote.upsert("tasks", row).unwrap();
        remote
            .upsert("tasks", serde_json::json!({"id": "a", "user_id": "u1", "text": "two"}))
            .unwrap();
        let rows = remote.select("tasks", "u1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["text"], "two");
        assert!(remote.select("tasks", "u2").unwrap().is_empty());
        assert!(!remote.delete("tasks", "u2", "a").unwrap());
        assert!(remote.delete("tasks", "u1", "a").unwrap());
    }

    #[test]
    fn memory_remote_fails_while_offline() {
        let remote = MemoryRemote::new();
        remote.set_offline(true);
        assert!(matches!(
            remote.select("tasks", "u1"),
            Err(StoreError::Remote { status: 503, .. })
        ));
    }

    #[test]
    fn requires_url_and_key() {
        let config = RemoteConfig {
            url: Some("https://example.supabase.co".to_string()),
            ..RemoteConfig::default()
        };
        assert!(matches!(
            SupabaseBackend::new(&config),
            Err(StoreError::NotConfigured)
        ));
    }

    #[test]
    fn bearer_defaults_to_anon_key() {
        let config = RemoteConfig {
            url: Some("https://example.supabase.co/".to_string()),
            anon_key: Some("anon-key".to_string()),
            ..RemoteConfig::default()
        };
        let backend = SupabaseBackend::new(&config).unwrap();
        assert_eq!(backend.base_url, "https://example.supabase.co");
        assert_eq!(backend.bearer, "anon-key");
    }

    #[test]
    fn access_token_overrides_bearer() {
        let config = RemoteConfig {
            url: Some("https://example.supabase.co".to_string()),
            anon_key: Some("anon-key".to_string()),
            access_token: Some("user-jwt".to_string()),
            ..RemoteConfig::default()
        };
        let backend = SupabaseBackend::new(&config).unwrap();
        assert_eq!(backend.bearer, "user-jwt");
    }
}
