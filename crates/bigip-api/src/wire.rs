// Wire-level diagnostics
//
// An optional observer that sees every request/response pair a session
// exchanges. Hooks are read-only: they cannot alter the outcome of a call.

use reqwest::Method;
use tracing::trace;

/// A completed HTTP exchange, as seen by a [`WireHook`].
#[derive(Debug)]
pub struct WireExchange<'a> {
    pub method: &'a Method,
    pub url: &'a str,
    /// Zero for the first attempt, incremented by the transparent retry layer.
    pub attempt: u32,
    pub status: u16,
    pub request_body: Option<&'a [u8]>,
    pub response_body: &'a str,
}

/// Observer for full request/response dumps.
pub trait WireHook: Send + Sync {
    fn record(&self, exchange: &WireExchange<'_>);
}

/// Dumps every exchange at `trace` level under the `bigip_api::wire` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWireHook;

impl WireHook for TracingWireHook {
    fn record(&self, exchange: &WireExchange<'_>) {
        let request = exchange
            .request_body
            .map(|b| match std::str::from_utf8(b) {
                Ok(text) => text.to_owned(),
                Err(_) => format!("<{} bytes of binary data>", b.len()),
            })
            .unwrap_or_default();
        trace!(
            target: "bigip_api::wire",
            method = %exchange.method,
            url = exchange.url,
            attempt = exchange.attempt,
            status = exchange.status,
            request = %request,
            response = exchange.response_body,
            "wire exchange"
        );
    }
}
