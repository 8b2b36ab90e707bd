// ── ATC service table ──
//
// The closed set of declarative services and everything that differs
// between them: endpoints, accepted methods, the "submission accepted"
// marker, whether a submission is polled, and the task vocabulary.
// Adding a service means adding a variant here; nothing else branches on
// service names.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use strum::IntoStaticStr;

use crate::error::CoreError;

/// HTTP verbs a declaration endpoint may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AtcMethod {
    Get,
    Post,
    Delete,
}

impl AtcMethod {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for AtcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AtcMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            _ => Err(CoreError::validation(format!("ATC method '{s}' is not valid."))),
        }
    }
}

/// Static endpoint set of one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub configure: &'static str,
    pub info: &'static str,
    /// Task endpoint; `None` for services that answer synchronously.
    pub task: Option<&'static str>,
    pub methods: &'static [AtcMethod],
}

const AS3: ServiceDescriptor = ServiceDescriptor {
    configure: "/mgmt/shared/appsvcs/declare",
    info: "/mgmt/shared/appsvcs/info",
    task: Some("/mgmt/shared/appsvcs/task"),
    methods: &[AtcMethod::Get, AtcMethod::Post, AtcMethod::Delete],
};

const DEVICE: ServiceDescriptor = ServiceDescriptor {
    configure: "/mgmt/shared/declarative-onboarding",
    info: "/mgmt/shared/declarative-onboarding/info",
    task: Some("/mgmt/shared/declarative-onboarding/task"),
    methods: &[AtcMethod::Get, AtcMethod::Post],
};

const TELEMETRY: ServiceDescriptor = ServiceDescriptor {
    configure: "/mgmt/shared/telemetry/declare",
    info: "/mgmt/shared/telemetry/info",
    task: None,
    methods: &[AtcMethod::Get, AtcMethod::Post],
};

/// A declarative ATC service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, IntoStaticStr)]
pub enum AtcService {
    /// Application Services 3.
    #[strum(serialize = "AS3")]
    #[serde(rename = "AS3")]
    As3,
    /// Declarative Onboarding.
    Device,
    /// Telemetry Streaming.
    Telemetry,
}

/// Where a polled task currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    /// Still running; carries the observed message for exhaustion reports.
    Pending(String),
    Success,
    NoChange,
    Failed {
        reason: String,
        detail: Option<Value>,
    },
}

/// Generic reason for an unrecognized task message.
pub const TASK_FAILED: &str = "The task failed.";

/// Reason for a submission that lacked the accepted marker.
pub const DEPLOYMENT_FAILED: &str = "The declaration deployment failed.";

impl AtcService {
    pub const fn descriptor(self) -> &'static ServiceDescriptor {
        match self {
            Self::As3 => &AS3,
            Self::Device => &DEVICE,
            Self::Telemetry => &TELEMETRY,
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Infer the service from a declaration's top-level `class`.
    pub fn from_declaration(declaration: &Value) -> Result<Self, CoreError> {
        let class = declaration
            .get("class")
            .and_then(Value::as_str)
            .unwrap_or_default();
        class.parse()
    }

    /// Reject methods the service's configure endpoint does not accept.
    pub fn check_method(self, method: AtcMethod) -> Result<(), CoreError> {
        if self.descriptor().methods.contains(&method) {
            Ok(())
        } else {
            Err(CoreError::validation(format!(
                "ATC method '{method}' is not valid."
            )))
        }
    }

    /// Whether a mutating submission returns a task id to poll.
    pub fn is_async(self) -> bool {
        self.descriptor().task.is_some()
    }

    /// Pull the advertised version out of an info response. Device
    /// onboarding answers with a one-element array.
    pub fn info_version(self, info: &Value) -> Option<&str> {
        let info = match info {
            Value::Array(items) => items.first()?,
            other => other,
        };
        info.get("version").and_then(Value::as_str)
    }

    /// Inspect the immediate response to a mutating submission.
    ///
    /// Returns the operation id for asynchronous services. Synchronous
    /// services return `None` when the body reports success.
    pub fn accepted(self, body: &Value) -> Result<Option<String>, CoreError> {
        let accepted = match self {
            Self::As3 => {
                as3_result(body, "message") == Some("Declaration successfully submitted")
            }
            Self::Device => {
                body.pointer("/result/message").and_then(Value::as_str) == Some("processing")
            }
            Self::Telemetry => body.get("message").and_then(Value::as_str) == Some("success"),
        };

        if !accepted {
            return Err(CoreError::SubmissionRejected {
                message: DEPLOYMENT_FAILED.into(),
                response: body.clone(),
            });
        }

        if !self.is_async() {
            return Ok(None);
        }

        body.get("id")
            .and_then(Value::as_str)
            .map(|id| Some(id.to_owned()))
            .ok_or_else(|| CoreError::SubmissionRejected {
                message: format!("{DEPLOYMENT_FAILED} The response carries no task id."),
                response: body.clone(),
            })
    }

    /// Map a task poll response onto a [`TaskState`].
    pub fn classify_task(self, body: &Value) -> TaskState {
        match self {
            Self::As3 => classify_as3_task(body),
            Self::Device => classify_device_task(body),
            // Telemetry never produces a task to poll.
            Self::Telemetry => TaskState::Failed {
                reason: TASK_FAILED.into(),
                detail: None,
            },
        }
    }
}

impl fmt::Display for AtcService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AtcService {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AS3" => Ok(Self::As3),
            "Device" => Ok(Self::Device),
            "Telemetry" => Ok(Self::Telemetry),
            _ => Err(CoreError::validation(format!(
                "ATC service '{s}' is not valid."
            ))),
        }
    }
}

// ── Task vocabularies ────────────────────────────────────────────────

fn as3_result<'a>(body: &'a Value, field: &str) -> Option<&'a str> {
    body.pointer(&format!("/results/0/{field}"))
        .and_then(Value::as_str)
}

fn classify_as3_task(body: &Value) -> TaskState {
    match as3_result(body, "message") {
        Some(msg @ ("in progress" | "processing")) => TaskState::Pending(msg.to_owned()),
        Some("success") => TaskState::Success,
        Some("no change") => TaskState::NoChange,
        Some("declaration failed") => failed_with(body.pointer("/results/0/response")),
        Some("declaration is invalid") => failed_with(body.pointer("/results/0/errors")),
        _ => TaskState::Failed {
            reason: TASK_FAILED.into(),
            detail: None,
        },
    }
}

fn classify_device_task(body: &Value) -> TaskState {
    let message = body.pointer("/result/message").and_then(Value::as_str);
    let status = body.pointer("/result/status").and_then(Value::as_str);

    match (message, status) {
        (_, Some("ERROR")) => match body.pointer("/result/errors") {
            Some(errors) => failed_with(Some(errors)),
            None => failed_with(body.pointer("/result/message")),
        },
        (Some(msg @ "processing"), _) => TaskState::Pending(msg.to_owned()),
        (_, Some(state @ "RUNNING")) => TaskState::Pending(state.to_owned()),
        (Some("success"), _) => TaskState::Success,
        (Some("no change"), _) => TaskState::NoChange,
        _ => TaskState::Failed {
            reason: TASK_FAILED.into(),
            detail: None,
        },
    }
}

/// A failure carrying the device's detail verbatim. Strings are used as
/// the reason directly; structured detail is rendered as compact JSON.
fn failed_with(detail: Option<&Value>) -> TaskState {
    match detail {
        Some(Value::String(reason)) => TaskState::Failed {
            reason: reason.clone(),
            detail: Some(Value::String(reason.clone())),
        },
        Some(value) if !value.is_null() => TaskState::Failed {
            reason: value.to_string(),
            detail: Some(value.clone()),
        },
        _ => TaskState::Failed {
            reason: TASK_FAILED.into(),
            detail: None,
        },
    }
}
