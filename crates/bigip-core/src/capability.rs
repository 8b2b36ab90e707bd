// ── Capability negotiation ──
//
// Decides which optional request features a service version supports and
// builds the effective configure endpoint. Unsupported modifiers are
// dropped silently; older services simply get the plainer request.

use serde::Serialize;
use strum::{Display, EnumString};
use tracing::debug;

use crate::error::CoreError;
use crate::service::{AtcMethod, AtcService};
use crate::version::{Threshold, Version};

const TENANT_PATH: Threshold = (3, 14, 0);
const SHOW: Threshold = (3, 6, 0);
const SHOW_HASH: Threshold = (3, 14, 0);
const ASYNC: Threshold = (3, 5, 0);

/// AS3 `show` query values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ShowMode {
    /// The declaration as deployed, secrets encrypted.
    #[default]
    Base,
    /// All default schema properties populated.
    Full,
    /// References expanded to their final static values.
    Expanded,
}

/// Caller-requested AS3 modifiers. Ignored for other services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct As3Modifiers {
    /// Restrict the request to one tenant.
    pub tenant: Option<String>,
    /// Raw `show` value; unrecognized values are dropped.
    pub show: Option<String>,
    /// Ask for per-tenant `optimisticLockKey`s.
    pub show_hash: bool,
}

impl As3Modifiers {
    /// Reject tenants that would leave the declare path once joined.
    /// A comma-separated tenant list is allowed.
    pub fn validate(&self) -> Result<(), CoreError> {
        let Some(tenant) = self.tenant.as_deref() else {
            return Ok(());
        };
        let well_formed = tenant
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ','))
            && tenant.split(',').all(|name| !matches!(name, "." | ".."));
        if !well_formed {
            return Err(CoreError::validation(format!(
                "Tenant '{tenant}' is not valid."
            )));
        }
        Ok(())
    }
}

impl Default for As3Modifiers {
    fn default() -> Self {
        Self {
            tenant: None,
            show: Some(ShowMode::default().to_string()),
            show_hash: false,
        }
    }
}

/// Feature flags derived from one advertised version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySet {
    pub tenant_path: bool,
    pub show: Option<ShowMode>,
    pub show_hash: bool,
    pub async_submit: bool,
}

impl CapabilitySet {
    /// Evaluate every threshold for `version`, `method` and the requested
    /// modifiers. Services other than AS3 expose no optional features.
    pub fn negotiate(
        service: AtcService,
        version: &Version,
        method: AtcMethod,
        modifiers: &As3Modifiers,
    ) -> Self {
        if service != AtcService::As3 {
            return Self::default();
        }

        let show = modifiers
            .show
            .as_deref()
            .filter(|_| version.at_least(SHOW))
            .and_then(|raw| match raw.parse::<ShowMode>() {
                Ok(mode) => Some(mode),
                Err(_) => {
                    debug!(show = raw, "ignoring unrecognized show mode");
                    None
                }
            });

        let caps = Self {
            tenant_path: modifiers.tenant.as_deref().is_some_and(|t| !t.is_empty())
                && (version.at_least(TENANT_PATH) || method == AtcMethod::Delete),
            show,
            show_hash: modifiers.show_hash
                && version.at_least(SHOW_HASH)
                && matches!(method, AtcMethod::Post | AtcMethod::Get),
            async_submit: version.at_least(ASYNC)
                && matches!(method, AtcMethod::Post | AtcMethod::Delete),
        };
        debug!(%version, %method, ?caps, "negotiated capabilities");
        caps
    }

    /// Append the enabled path segment and query parameters to `base`.
    /// Query order is `show`, `showHash`, `async`.
    pub fn effective_endpoint(&self, base: &str, modifiers: &As3Modifiers) -> String {
        let mut endpoint = base.to_owned();
        if let Some(tenant) = modifiers.tenant.as_deref().filter(|_| self.tenant_path) {
            endpoint.push('/');
            endpoint.push_str(tenant);
        }

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        let mut any = false;
        if let Some(show) = self.show {
            query.append_pair("show", &show.to_string());
            any = true;
        }
        if self.show_hash {
            query.append_pair("showHash", "true");
            any = true;
        }
        if self.async_submit {
            query.append_pair("async", "true");
            any = true;
        }

        if any {
            endpoint.push('?');
            endpoint.push_str(&query.finish());
        }
        endpoint
    }
}
