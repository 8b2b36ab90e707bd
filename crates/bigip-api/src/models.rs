// Response and request shapes shared by the iControl REST endpoints.
//
// Only the fields this crate consumes are modelled; everything else is
// ignored by serde.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ── Authentication ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: TokenInfo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenInfo {
    pub token: String,
}

// ── Stats envelope ──────────────────────────────────────────────────

/// The `entries -> {selfLink} -> nestedStats -> entries` envelope used by
/// `tm/cm/sync-status`, `tm/cm/failover-status` and `tm/sys/version`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub entries: HashMap<String, StatsEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsEntry {
    #[serde(rename = "nestedStats")]
    pub nested_stats: NestedStats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NestedStats {
    #[serde(default)]
    pub entries: HashMap<String, StatsValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsValue {
    pub description: Option<String>,
    pub value: Option<i64>,
}

impl StatsResponse {
    /// The `description` of `field` in the first nested entry carrying it.
    ///
    /// The outer key is the selfLink (`https://localhost/mgmt/tm/.../0`),
    /// which varies by endpoint, so it is not matched literally.
    pub fn description(&self, field: &str) -> Option<&str> {
        self.entries
            .values()
            .find_map(|entry| entry.nested_stats.entries.get(field)?.description.as_deref())
    }
}

// ── Util commands ───────────────────────────────────────────────────

/// `{command: "run", utilCmdArgs}` body of the `tm/util/*` and `tm/cm` calls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCommand<'a> {
    pub command: &'static str,
    pub util_cmd_args: &'a str,
}

impl<'a> RunCommand<'a> {
    pub fn new(util_cmd_args: &'a str) -> Self {
        Self {
            command: "run",
            util_cmd_args,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommandResponse {
    pub command_result: Option<String>,
}

// ── iApp package management ─────────────────────────────────────────

/// A package-management task as reported by
/// `shared/iapp/package-management-tasks/{id}`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackageTask {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Body for creating a package-management task.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "operation", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageOperation {
    Install {
        #[serde(rename = "packageFilePath")]
        package_file_path: String,
    },
    Uninstall {
        #[serde(rename = "packageName")]
        package_name: String,
    },
}
