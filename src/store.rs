use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// StoreError
///
/// Failures raised by a `DocumentStore`. None of them carry user-facing meaning; handlers
/// surface them as 500s.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("database answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed record at {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

// 1. DocumentStore Contract
/// DocumentStore
///
/// A JSON tree addressed by slash-separated paths, shaped after the Realtime Database
/// REST surface. The repository only talks to this trait, so the Firebase client
/// (`FirebaseStore`) and the in-process tree (`MemoryStore`) are interchangeable.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads the node at `path`. Absent and `null` nodes are both `None`.
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replaces the node at `path`. Writing `null` deletes it.
    async fn put(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Merges `fields` into the node at `path`, leaving other children untouched.
    async fn patch(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError>;

    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Adds `delta` to the integer child `field` of `path` and returns the new value.
    /// A missing counter starts from zero.
    async fn increment(&self, path: &str, field: &str, delta: i64) -> Result<i64, StoreError>;
}

/// StoreState
///
/// The concrete type used to share the document store behind the repository.
pub type StoreState = Arc<dyn DocumentStore>;

/// Splits a path into its segments, dropping empty and navigation components so a
/// caller-provided key can never climb out of its collection.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect()
}

// 2. The Real Implementation (Firebase Realtime Database REST API)
/// FirebaseStore
///
/// Every node is reachable at `{base_url}/{path}.json`. When a database secret or ID
/// token is configured it travels as the `auth` query parameter.
#[derive(Clone)]
pub struct FirebaseStore {
    client: Client,
    base_url: String,
    auth: Option<String>,
}

impl FirebaseStore {
    pub fn new(base_url: &str, auth: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// REST endpoint of the node at `path`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, segments(path).join("/"))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let request = match &self.auth {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %body, "firebase request rejected");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl DocumentStore for FirebaseStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let response = self.send(self.client.get(self.endpoint(path))).await?;
        let value: Value = response.json().await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn put(&self, path: &str, value: Value) -> Result<(), StoreError> {
        // print=silent: the database answers 204 instead of echoing the payload.
        let request = self
            .client
            .put(self.endpoint(path))
            .query(&[("print", "silent")])
            .json(&value);
        self.send(request).await?;
        Ok(())
    }

    async fn patch(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let request = self
            .client
            .patch(self.endpoint(path))
            .query(&[("print", "silent")])
            .json(&fields);
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let request = self
            .client
            .delete(self.endpoint(path))
            .query(&[("print", "silent")]);
        self.send(request).await?;
        Ok(())
    }

    /// Uses the `increment` server value so concurrent bumps are applied atomically by
    /// the database, then reads the counter back.
    async fn increment(&self, path: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        let mut fields = Map::new();
        fields.insert(field.to_string(), json!({ ".sv": { "increment": delta } }));
        self.patch(path, fields).await?;

        let counter = self.get(&format!("{path}/{field}")).await?;
        Ok(counter.and_then(|value| value.as_i64()).unwrap_or(0))
    }
}

// 3. The In-Process Implementation (local development and tests)
/// MemoryStore
///
/// Keeps the whole tree in memory behind an async `RwLock`. Writes follow the database's
/// storage rules: `null` members and empty containers are never stored, and removing the
/// last child of a node removes the node.
#[derive(Default)]
pub struct MemoryStore {
    root: RwLock<Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `tree`, e.g. a fixture exported from the console.
    pub fn with_tree(tree: Value) -> Self {
        Self {
            root: RwLock::new(prune(tree)),
        }
    }
}

fn is_vacant(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Drops `null` members and empty containers, recursively.
fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let kept: Map<String, Value> = map
                .into_iter()
                .map(|(key, child)| (key, prune(child)))
                .filter(|(_, child)| !is_vacant(child))
                .collect();
            Value::Object(kept)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(prune)
                .filter(|child| !is_vacant(child))
                .collect(),
        ),
        other => other,
    }
}

fn lookup<'a>(mut node: &'a Value, segs: &[&str]) -> Option<&'a Value> {
    for seg in segs {
        node = node.as_object()?.get(*seg)?;
    }
    Some(node)
}

/// Walks to `segs`, turning every non-object node on the way into an object.
fn slot<'a>(mut node: &'a mut Value, segs: &[&str]) -> &'a mut Value {
    for seg in segs {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            unreachable!("node was just turned into an object")
        };
        node = map.entry(*seg).or_insert(Value::Null);
    }
    node
}

/// Removes the node at `segs` and any ancestor it leaves empty.
fn remove(node: &mut Value, segs: &[&str]) {
    let Some((first, rest)) = segs.split_first() else {
        *node = Value::Null;
        return;
    };
    if let Value::Object(map) = node {
        if rest.is_empty() {
            map.remove(*first);
        } else if let Some(child) = map.get_mut(*first) {
            remove(child, rest);
            if is_vacant(child) {
                map.remove(*first);
            }
        }
    }
}

fn write(root: &mut Value, segs: &[&str], value: Value) {
    let value = prune(value);
    if is_vacant(&value) {
        remove(root, segs);
    } else {
        *slot(root, segs) = value;
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let root = self.root.read().await;
        Ok(lookup(&root, &segments(path))
            .filter(|value| !is_vacant(value))
            .cloned())
    }

    async fn put(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let mut root = self.root.write().await;
        write(&mut root, &segments(path), value);
        Ok(())
    }

    async fn patch(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let mut root = self.root.write().await;
        let base = segments(path);
        for (key, value) in fields {
            let mut target = base.clone();
            target.extend(segments(&key));
            write(&mut root, &target, value);
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let mut root = self.root.write().await;
        remove(&mut root, &segments(path));
        Ok(())
    }

    async fn increment(&self, path: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        let mut root = self.root.write().await;
        let mut target = segments(path);
        target.push(field);

        let current = lookup(&root, &target)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let next = current + delta;
        write(&mut root, &target, json!(next));
        Ok(next)
    }
}
