// Wire payloads for the spreadsheet endpoint. Built deterministically from a
// document snapshot, so a redelivered event yields the same request.

use chrono::DateTime;
use serde::Serialize;

use crate::store::Fields;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub manager_id: String,
    pub id: String,
    /// `YYYY-MM-DD`, or empty when the document has no usable date.
    pub date: String,
    pub payer: String,
    pub region: String,
    pub items: String,
    pub comment: String,
    pub amount: f64,
}

impl OrderPayload {
    pub fn from_document(manager_id: &str, order_id: &str, data: Option<&Fields>) -> Self {
        OrderPayload {
            manager_id: manager_id.to_string(),
            id: order_id.to_string(),
            date: data
                .and_then(|d| d.get("date"))
                .map(to_iso_date)
                .unwrap_or_default(),
            payer: field(data, "payer").text_or_empty(),
            region: field(data, "region").text_or_empty(),
            items: field(data, "items").text_or_empty(),
            comment: field(data, "comment").text_or_empty(),
            amount: field(data, "amount").number_or_zero(),
        }
    }
}

/// Actions sent with an explicit `action` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RelayAction {
    UpdateOrder(OrderPayload),
    #[serde(rename_all = "camelCase")]
    DeleteOrder { manager_id: String, id: String },
    #[serde(rename_all = "camelCase")]
    DeletePlan { manager_id: String, period: String },
    #[serde(rename_all = "camelCase")]
    SetPlan {
        manager_id: String,
        period: String,
        label: String,
        goal: f64,
    },
}

/// Body of one outbound POST. A created order goes out as the bare payload
/// with no `action` key; the endpoint treats that as an append.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelayRequest {
    CreateOrder(OrderPayload),
    Action(RelayAction),
}

impl RelayRequest {
    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            RelayRequest::CreateOrder(_) => "createOrder",
            RelayRequest::Action(RelayAction::UpdateOrder(_)) => "updateOrder",
            RelayRequest::Action(RelayAction::DeleteOrder { .. }) => "deleteOrder",
            RelayRequest::Action(RelayAction::DeletePlan { .. }) => "deletePlan",
            RelayRequest::Action(RelayAction::SetPlan { .. }) => "setPlan",
        }
    }
}

/// `deletePlan` when the plan document is gone, otherwise `setPlan` with
/// `label` falling back to the document's own period and then the path
/// period, and `goal` falling back to 0.
pub fn plan_request(manager_id: &str, period: &str, data: Option<&Fields>) -> RelayRequest {
    let action = match data {
        None => RelayAction::DeletePlan {
            manager_id: manager_id.to_string(),
            period: period.to_string(),
        },
        Some(data) => {
            let label = [field(Some(data), "label"), field(Some(data), "period")]
                .into_iter()
                .find(Value::is_truthy)
                .map(|v| v.to_text())
                .unwrap_or_else(|| period.to_string());
            RelayAction::SetPlan {
                manager_id: manager_id.to_string(),
                period: period.to_string(),
                label,
                goal: field(Some(data), "goal").number_or_zero(),
            }
        }
    };
    RelayRequest::Action(action)
}

fn field(data: Option<&Fields>, key: &str) -> Value {
    data.and_then(|d| d.get(key))
        .cloned()
        .map(Value::from)
        .unwrap_or(Value::Undefined)
}

/// Calendar date (`YYYY-MM-DD`, UTC) of a stored date value. Strings keep
/// their first ten characters; timestamp objects (`seconds`/`_seconds` with
/// optional `nanos`/`_nanoseconds`) and epoch-millisecond numbers are
/// converted. Anything else is empty.
pub fn to_iso_date(value: &serde_json::Value) -> String {
    use serde_json::Value as Json;

    let from_parts = |secs: Option<i64>, nanos: Option<i64>| {
        secs.and_then(|s| DateTime::from_timestamp(s, nanos.unwrap_or(0).clamp(0, 999_999_999) as u32))
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    };
    let as_int = |v: Option<&Json>| match v {
        Some(Json::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Json::String(s)) => s.parse::<i64>().ok(),
        _ => None,
    };

    match value {
        Json::String(s) => s.chars().take(10).collect(),
        Json::Number(n) => {
            let millis = n.as_f64().unwrap_or(0.0);
            if millis == 0.0 {
                return String::new();
            }
            DateTime::from_timestamp_millis(millis as i64)
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        }
        Json::Object(obj) => {
            if let Some(Json::String(s)) = obj.get("timestampValue") {
                return s.chars().take(10).collect();
            }
            let secs = as_int(obj.get("seconds")).or_else(|| as_int(obj.get("_seconds")));
            let nanos = as_int(obj.get("nanos")).or_else(|| as_int(obj.get("_nanoseconds")));
            from_parts(secs, nanos)
        }
        _ => String::new(),
    }
}
