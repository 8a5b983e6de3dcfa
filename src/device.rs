//! Device-side model shared by thermometers, the thermostat and the controller.
//!
//! Pure values only: the broker client that publishes these payloads lives
//! outside this crate and is only started after the bootstrap gate approves.

use std::fmt;
use thiserror::Error;

/// Topic every thermometer publishes its readings to.
pub const TEMP_TOPIC: &str = "thermometers/temp";

/// Separator between label and value in a reading payload.
pub const READING_SEPARATOR: &str = ": ";

const MIN_LABEL_CHARS: usize = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LabelError {
    #[error("label must be at least {min} characters", min = MIN_LABEL_CHARS)]
    TooShort,

    #[error("label may only contain letters, numbers, spaces and '-' (found {0:?})")]
    InvalidChar(char),
}

/// A validated, human-chosen device location such as `Living Room`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceLabel(String);

impl DeviceLabel {
    pub fn parse(label: &str) -> Result<Self, LabelError> {
        if label.chars().count() < MIN_LABEL_CHARS {
            return Err(LabelError::TooShort);
        }
        if let Some(c) = label
            .chars()
            .find(|c| !(c.is_alphanumeric() || *c == ' ' || *c == '-'))
        {
            return Err(LabelError::InvalidChar(c));
        }
        Ok(Self(label.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Broker client id for a thermometer with this label.
    pub fn client_id(&self) -> String {
        format!("Thermometer/{}", self.0)
    }
}

impl fmt::Display for DeviceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadingError {
    #[error("reading has no {sep:?} separator", sep = READING_SEPARATOR)]
    MissingSeparator,

    #[error("reading value is not a number")]
    InvalidValue,
}

/// One temperature sample as published on [`TEMP_TOPIC`].
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureReading {
    pub label: String,
    pub celsius: f64,
}

impl TemperatureReading {
    pub fn new(label: &DeviceLabel, celsius: f64) -> Self {
        Self {
            label: label.as_str().to_string(),
            celsius,
        }
    }

    /// `"<label>: <value>"`
    pub fn to_payload(&self) -> String {
        format!("{}{}{}", self.label, READING_SEPARATOR, self.celsius)
    }

    pub fn parse(payload: &str) -> Result<Self, ReadingError> {
        let (label, value) = payload
            .split_once(READING_SEPARATOR)
            .ok_or(ReadingError::MissingSeparator)?;
        let celsius = value
            .trim()
            .parse::<f64>()
            .map_err(|_| ReadingError::InvalidValue)?;
        Ok(Self {
            label: label.to_string(),
            celsius,
        })
    }

    /// Controller display line, rounded to two decimals.
    pub fn display_line(&self) -> String {
        format!("{}: {:.2} °C", self.label, self.celsius)
    }
}

/// Heating on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThermostatState {
    #[default]
    Off,
    On,
}

impl ThermostatState {
    pub fn toggle(self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }
}

/// Thermostat state. Transitions return a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Thermostat {
    label: DeviceLabel,
    state: ThermostatState,
    target_celsius: f64,
}

impl Thermostat {
    pub const DEFAULT_TARGET: f64 = 20.0;

    pub fn new(label: DeviceLabel) -> Self {
        Self {
            label,
            state: ThermostatState::Off,
            target_celsius: Self::DEFAULT_TARGET,
        }
    }

    pub fn state(&self) -> ThermostatState {
        self.state
    }

    pub fn target_celsius(&self) -> f64 {
        self.target_celsius
    }

    pub fn with_state(self, state: ThermostatState) -> Self {
        Self { state, ..self }
    }

    pub fn toggled(self) -> Self {
        let state = self.state.toggle();
        self.with_state(state)
    }

    pub fn with_target(self, target_celsius: f64) -> Self {
        Self {
            target_celsius,
            ..self
        }
    }

    pub fn state_topic(&self) -> String {
        format!("thermostat/{}/state", self.label)
    }

    pub fn temp_topic(&self) -> String {
        format!("thermostat/{}/temp", self.label)
    }

    /// Presence topic; the broker's last-will clears it when the device drops.
    pub fn presence_topic(&self) -> String {
        format!("thermostat/devices/{}", self.label)
    }
}
