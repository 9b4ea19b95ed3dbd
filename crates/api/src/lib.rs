//! HTTP surface of the notification gateway.
//!
//! Handlers only persist new notifications and hand their ids to the
//! background worker; delivery happens in `gateway-notifier`.

pub mod middleware;
pub mod routes;
pub mod state;
