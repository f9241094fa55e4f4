//! Volume plugin wire types.
//!
//! Field names follow the volume plugin convention (`Name`, `Opts`, `Err`,
//! `Mountpoint`, ...). Every response carries an `Err` string that is empty
//! on success.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::LocalvolResult;

/// Capability announced by `Activate`.
pub const VOLUME_DRIVER_CAPABILITY: &str = "VolumeDriver";

/// Option key carrying the backing id on `Create`.
pub const VOLUME_ID_OPT: &str = "volume_id";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub opts: HashMap<String, serde_json::Value>,
}

/// Request addressing a single volume by name (Mount, Path, Unmount, Remove, Get).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameRequest {
    #[serde(default)]
    pub name: String,
}

impl NameRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One request line, dispatched on its `Method` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Method")]
pub enum DriverRequest {
    Activate,
    Create(CreateRequest),
    Mount(NameRequest),
    Path(NameRequest),
    Unmount(NameRequest),
    Remove(NameRequest),
    Get(NameRequest),
    List,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivateResponse {
    pub implements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub err: String,
}

/// Response to `Mount` and `Path`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountResponse {
    #[serde(default)]
    pub mountpoint: String,
    #[serde(default)]
    pub err: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeInfo {
    pub name: String,
    #[serde(default)]
    pub mountpoint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetResponse {
    pub volume: VolumeInfo,
    #[serde(default)]
    pub err: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResponse {
    pub volumes: Vec<VolumeInfo>,
    #[serde(default)]
    pub err: String,
}

/// Any response; serialized without a wrapper so the line matches the
/// per-method response shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DriverResponse {
    Activate(ActivateResponse),
    Error(ErrorResponse),
    Mount(MountResponse),
    Get(GetResponse),
    List(ListResponse),
}

impl ErrorResponse {
    pub fn from_result(result: LocalvolResult<()>) -> Self {
        match result {
            Ok(()) => Self::default(),
            Err(e) => Self { err: e.to_string() },
        }
    }

    pub fn from_message(msg: impl Into<String>) -> Self {
        Self { err: msg.into() }
    }
}

impl MountResponse {
    pub fn from_result(result: LocalvolResult<String>) -> Self {
        match result {
            Ok(mountpoint) => Self {
                mountpoint,
                err: String::new(),
            },
            Err(e) => Self {
                mountpoint: String::new(),
                err: e.to_string(),
            },
        }
    }
}

impl GetResponse {
    pub fn from_result(result: LocalvolResult<VolumeInfo>) -> Self {
        match result {
            Ok(volume) => Self {
                volume,
                err: String::new(),
            },
            Err(e) => Self {
                volume: VolumeInfo::default(),
                err: e.to_string(),
            },
        }
    }
}

impl DriverResponse {
    /// The error text carried by this response, if any.
    pub fn err(&self) -> Option<&str> {
        let err = match self {
            DriverResponse::Activate(_) => return None,
            DriverResponse::Error(r) => &r.err,
            DriverResponse::Mount(r) => &r.err,
            DriverResponse::Get(r) => &r.err,
            DriverResponse::List(r) => &r.err,
        };
        (!err.is_empty()).then_some(err.as_str())
    }
}
