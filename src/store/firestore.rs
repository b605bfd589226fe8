// Firestore REST (v1) backend. Batches go through `documents:commit`, which
// applies all writes atomically; merge writes carry an update mask and a
// REQUEST_TIME transform for the server-side timestamp.

use serde_json::{json, Map, Value};
use tracing::debug;

use super::{DocRef, DocumentStore, Fields, WriteBatch, WriteOp};
use crate::config::FirestoreConfig;
use crate::error::StoreError;

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Bearer token the emulator accepts for privileged access.
const EMULATOR_TOKEN: &str = "owner";

pub struct FirestoreStore {
    http: reqwest::blocking::Client,
    base_url: String,
    database: String,
    token: Option<String>,
}

impl FirestoreStore {
    pub fn new(config: &FirestoreConfig) -> Result<Self, StoreError> {
        let (base_url, token) = match &config.emulator_host {
            Some(host) => (
                format!("http://{}/v1", host.trim_end_matches('/')),
                Some(EMULATOR_TOKEN.to_string()),
            ),
            None => (FIRESTORE_BASE_URL.to_string(), config.access_token.clone()),
        };

        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(FirestoreStore {
            http,
            base_url,
            database: format!("projects/{}/databases/(default)", config.project_id),
            token,
        })
    }

    fn documents_url(&self) -> String {
        format!("{}/{}/documents", self.base_url, self.database)
    }

    fn doc_name(&self, doc: &DocRef) -> String {
        format!("{}/documents/{}/{}", self.database, doc.collection, doc.id)
    }

    fn send(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, StoreError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        Ok(request.send()?)
    }

    fn commit_body(&self, batch: &WriteBatch) -> Value {
        let writes: Vec<Value> = batch
            .ops()
            .iter()
            .map(|op| match op {
                WriteOp::Set {
                    doc,
                    fields,
                    merge,
                    server_timestamp,
                } => {
                    let mut write = json!({
                        "update": {
                            "name": self.doc_name(doc),
                            "fields": encode_fields(fields),
                        }
                    });
                    if *merge {
                        let paths: Vec<String> = fields.keys().map(|k| field_path(k)).collect();
                        write["updateMask"] = json!({ "fieldPaths": paths });
                    }
                    if let Some(field) = server_timestamp {
                        write["updateTransforms"] = json!([{
                            "fieldPath": field_path(field),
                            "setToServerValue": "REQUEST_TIME",
                        }]);
                    }
                    write
                }
                WriteOp::Delete { doc } => json!({ "delete": self.doc_name(doc) }),
            })
            .collect();
        json!({ "writes": writes })
    }
}

fn ensure_success(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

impl DocumentStore for FirestoreStore {
    fn list_ids(&self, collection: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let url = format!(
            "{}/{}?pageSize={}&mask.fieldPaths=__name__",
            self.documents_url(),
            collection,
            limit
        );
        let response = ensure_success(self.send(self.http.get(url))?)?;
        let body: Value = response.json()?;

        let ids = body
            .get("documents")
            .and_then(Value::as_array)
            .map(|docs| {
                docs.iter()
                    .filter_map(|d| d.get("name").and_then(Value::as_str))
                    .filter_map(|name| name.rsplit('/').next())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    fn get(&self, doc: &DocRef) -> Result<Option<Fields>, StoreError> {
        let url = format!("{}/{}/{}", self.documents_url(), doc.collection, doc.id);
        let response = self.send(self.http.get(url))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: Value = ensure_success(response)?.json()?;
        match body.get("fields") {
            Some(Value::Object(fields)) => decode_fields(fields).map(Some),
            Some(_) => Err(StoreError::Decode("document fields is not an object".into())),
            None => Ok(Some(Fields::new())),
        }
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let url = format!("{}/{}/documents:commit", self.base_url, self.database);
        debug!(writes = batch.len(), "committing firestore batch");
        ensure_success(self.send(self.http.post(url).json(&self.commit_body(&batch)))?)?;
        Ok(())
    }
}

// ============================================================================
// VALUE ENCODING
// ============================================================================

/// Quote a field path segment unless it is a plain identifier.
fn field_path(key: &str) -> String {
    let plain = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        key.to_string()
    } else {
        format!("`{}`", key.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

pub(crate) fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

pub(crate) fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub(crate) fn decode_fields(fields: &Map<String, Value>) -> Result<Fields, StoreError> {
    fields
        .iter()
        .map(|(k, v)| decode_value(v).map(|v| (k.clone(), v)))
        .collect()
}

pub(crate) fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let (kind, inner) = value
        .as_object()
        .and_then(|obj| obj.iter().next())
        .ok_or_else(|| StoreError::Decode(format!("not a typed value: {value}")))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(Value::Bool(inner.as_bool().unwrap_or(false))),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| StoreError::Decode(format!("bad integerValue: {inner}")))
        }
        "doubleValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<f64>().ok(),
                other => other.as_f64(),
            };
            Ok(parsed
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        }
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => {
            Ok(Value::String(inner.as_str().unwrap_or_default().to_string()))
        }
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(values))
        }
        "mapValue" => match inner.get("fields") {
            Some(Value::Object(fields)) => decode_fields(fields).map(Value::Object),
            _ => Ok(Value::Object(Map::new())),
        },
        other => Err(StoreError::Decode(format!("unknown value type {other}"))),
    }
}
