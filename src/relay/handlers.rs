// 🔔 Change handlers
// One handler per document event. Each builds its payload from the snapshot
// it is given, makes at most one outbound call, and reports what happened.
// Failures propagate so the delivery mechanism can redeliver.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::{info, warn};

use crate::error::RelayError;
use crate::relay::client::RelaySink;
use crate::relay::payload::{plan_request, OrderPayload, RelayAction, RelayRequest};
use crate::store::Fields;

/// Document snapshots around a change. `after` is absent on delete.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChangeEvent {
    #[serde(default)]
    pub before: Option<Fields>,
    #[serde(default)]
    pub after: Option<Fields>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RelayOutcome {
    Sent {
        action: &'static str,
        response: Json,
    },
    Skipped {
        reason: &'static str,
    },
}

pub struct ChangeRelay<S> {
    sink: S,
}

impl<S: RelaySink> ChangeRelay<S> {
    pub fn new(sink: S) -> Self {
        ChangeRelay { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn order_created(
        &self,
        manager_id: &str,
        order_id: &str,
        after: Option<&Fields>,
    ) -> Result<RelayOutcome, RelayError> {
        let payload = OrderPayload::from_document(manager_id, order_id, after);
        if payload.payer.is_empty() {
            warn!(manager_id, order_id, "skip order create: missing payer");
            return Ok(RelayOutcome::Skipped { reason: "missing payer" });
        }
        self.send(RelayRequest::CreateOrder(payload), manager_id, order_id)
            .await
    }

    pub async fn order_updated(
        &self,
        manager_id: &str,
        order_id: &str,
        after: Option<&Fields>,
    ) -> Result<RelayOutcome, RelayError> {
        let payload = OrderPayload::from_document(manager_id, order_id, after);
        if payload.payer.is_empty() {
            warn!(manager_id, order_id, "skip order update: missing payer");
            return Ok(RelayOutcome::Skipped { reason: "missing payer" });
        }
        self.send(
            RelayRequest::Action(RelayAction::UpdateOrder(payload)),
            manager_id,
            order_id,
        )
        .await
    }

    pub async fn order_deleted(
        &self,
        manager_id: &str,
        order_id: &str,
    ) -> Result<RelayOutcome, RelayError> {
        let request = RelayRequest::Action(RelayAction::DeleteOrder {
            manager_id: manager_id.to_string(),
            id: order_id.to_string(),
        });
        self.send(request, manager_id, order_id).await
    }

    /// Plan create, update and delete all arrive here; a missing `after`
    /// snapshot means the plan was deleted.
    pub async fn plan_written(
        &self,
        manager_id: &str,
        period: &str,
        after: Option<&Fields>,
    ) -> Result<RelayOutcome, RelayError> {
        self.send(plan_request(manager_id, period, after), manager_id, period)
            .await
    }

    async fn send(
        &self,
        request: RelayRequest,
        manager_id: &str,
        key: &str,
    ) -> Result<RelayOutcome, RelayError> {
        let action = request.name();
        info!(manager_id, key, action, "relaying change");
        let response = self.sink.deliver(&request).await?;
        Ok(RelayOutcome::Sent { action, response })
    }
}
