// Wire models for the Atomberg cloud API.
//
// The service's response envelopes are not contractually fixed, so device
// parsing is lenient: missing or null fields fall back to defaults and any
// extra fields are kept in `extra` rather than rejected.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::Error;

/// Highest speed step a fan accepts.
pub const MAX_SPEED: u8 = 6;

// ── Fan mode ────────────────────────────────────────────────────────

/// Operating mode of a fan.
///
/// Modes the service reports beyond the three known ones are preserved
/// verbatim in [`FanMode::Other`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FanMode {
    #[default]
    Normal,
    Sleep,
    Turbo,
    #[serde(untagged)]
    #[strum(default)]
    Other(String),
}

impl FanMode {
    /// The modes the control surface offers.
    pub const KNOWN: [Self; 3] = [Self::Normal, Self::Sleep, Self::Turbo];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Normal => "normal",
            Self::Sleep => "sleep",
            Self::Turbo => "turbo",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Fan speed ───────────────────────────────────────────────────────

/// A speed step in `0..=6`, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FanSpeed(u8);

impl FanSpeed {
    pub fn new(speed: u8) -> Result<Self, Error> {
        if speed > MAX_SPEED {
            return Err(Error::InvalidCommand {
                reason: format!("speed must be between 0 and {MAX_SPEED}, got {speed}"),
            });
        }
        Ok(Self(speed))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for FanSpeed {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Devices ─────────────────────────────────────────────────────────

/// Current state of a fan as reported inside a device listing.
///
/// Each field tolerates the loose typing seen in the wild: `power` takes
/// any truthy value, `speed` takes numbers or numeric strings (clamped to
/// a byte) and `mode` keeps unknown values as [`FanMode::Other`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    #[serde(default, deserialize_with = "truthy")]
    pub power: bool,
    #[serde(default, deserialize_with = "clamped_speed")]
    pub speed: u8,
    #[serde(default, deserialize_with = "any_mode")]
    pub mode: FanMode,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A fan registered to the authenticated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Device identifier. Numeric ids are accepted and kept as strings.
    #[serde(default, deserialize_with = "any_string")]
    pub id: String,
    #[serde(default, deserialize_with = "any_string")]
    pub name: String,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "any_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_type: Option<String>,
    /// An unreadable status is replaced by the default (off, speed 0).
    #[serde(default, deserialize_with = "status_or_default")]
    pub status: DeviceStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    /// Name to show a user: the device name, or `Fan <id>` when unnamed.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("Fan {}", self.id)
        } else {
            self.name.clone()
        }
    }

    pub fn is_on(&self) -> bool {
        self.status.power
    }
}

// ── Lenient field parsing ───────────────────────────────────────────

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn any_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(Value::deserialize(deserializer)?))
}

fn any_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(value_to_string(Value::deserialize(deserializer)?)).filter(|s| !s.is_empty()))
}

/// Truthiness of a loosely typed flag.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "off" | "no"
        ),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(is_truthy(&Value::deserialize(deserializer)?))
}

/// Speed step from a number or numeric string, clamped to `0..=255`.
/// Anything else reads as 0.
fn speed_of(value: &Value) -> u8 {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.filter(|f| f.is_finite())
        .map_or(0, |f| clamp_to_u8(f.round()))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn clamp_to_u8(value: f64) -> u8 {
    value.clamp(0.0, f64::from(u8::MAX)) as u8
}

fn clamped_speed<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(speed_of(&Value::deserialize(deserializer)?))
}

fn mode_of(value: Value) -> FanMode {
    match value {
        Value::Null => FanMode::default(),
        Value::String(s) => s.parse().unwrap_or(FanMode::Other(s)),
        other => FanMode::Other(other.to_string()),
    }
}

fn any_mode<'de, D>(deserializer: D) -> Result<FanMode, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(mode_of(Value::deserialize(deserializer)?))
}

fn status_or_default<'de, D>(deserializer: D) -> Result<DeviceStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(DeviceStatus::default());
    }
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        warn!(error = %e, "unreadable device status, treating the fan as off");
        DeviceStatus::default()
    }))
}

// ── Device list envelope ────────────────────────────────────────────

/// The shapes a device listing may arrive in, checked in order:
/// a bare array, then `{"devices": [...]}`, then `{"data": [...]}`.
/// Anything else is [`Unrecognized`](Self::Unrecognized) and yields no
/// devices.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEnvelope {
    Bare(Vec<Value>),
    Devices(Vec<Value>),
    Data(Vec<Value>),
    Unrecognized,
}

impl DeviceEnvelope {
    pub fn classify(body: Value) -> Self {
        match body {
            Value::Array(items) => Self::Bare(items),
            Value::Object(mut map) => {
                if let Some(Value::Array(items)) = map.remove("devices") {
                    Self::Devices(items)
                } else if let Some(Value::Array(items)) = map.remove("data") {
                    Self::Data(items)
                } else {
                    Self::Unrecognized
                }
            }
            _ => Self::Unrecognized,
        }
    }

    /// Parse the located items. Entries that are not device objects are
    /// dropped with a warning instead of failing the whole listing.
    pub fn into_devices(self) -> Vec<Device> {
        let items = match self {
            Self::Bare(items) | Self::Devices(items) | Self::Data(items) => items,
            Self::Unrecognized => return Vec::new(),
        };

        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<Device>(item) {
                Ok(device) => Some(device),
                Err(e) => {
                    warn!(error = %e, "skipping malformed device entry");
                    None
                }
            })
            .collect()
    }
}

// ── Control commands ────────────────────────────────────────────────

/// Partial update sent to a single device. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControlCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<FanSpeed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<FanMode>,
}

impl ControlCommand {
    pub fn power(on: bool) -> Self {
        Self::default().with_power(on)
    }

    pub fn speed(speed: FanSpeed) -> Self {
        Self::default().with_speed(speed)
    }

    pub fn mode(mode: FanMode) -> Self {
        Self::default().with_mode(mode)
    }

    pub fn with_power(mut self, on: bool) -> Self {
        self.power = Some(on);
        self
    }

    pub fn with_speed(mut self, speed: FanSpeed) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_mode(mut self, mode: FanMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_none() && self.speed.is_none() && self.mode.is_none()
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::InvalidCommand {
                reason: "at least one of power, speed or mode is required".into(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if let Some(on) = self.power {
            parts.push(format!("power={}", if on { "on" } else { "off" }));
        }
        if let Some(speed) = self.speed {
            parts.push(format!("speed={speed}"));
        }
        if let Some(ref mode) = self.mode {
            parts.push(format!("mode={mode}"));
        }
        f.write_str(&parts.join(" "))
    }
}

// ── Auth payloads ───────────────────────────────────────────────────

#[derive(Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub api_key: &'a str,
    pub refresh_token: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Error body shape: `{"message": "..."}`, other fields ignored.
#[derive(Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
