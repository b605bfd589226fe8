// 🔁 Change Relay
// Forwards order and plan changes to the spreadsheet endpoint.

pub mod client;
pub mod handlers;
pub mod payload;

pub use client::{interpret_response, RelayClient, RelaySink};
pub use handlers::{ChangeEvent, ChangeRelay, RelayOutcome};
pub use payload::{plan_request, to_iso_date, OrderPayload, RelayAction, RelayRequest};
