//! Construction-time settings for [`Computer`](super::Computer).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::signal::bits;

/// Widest supported address bus.
pub const MAX_ADDRESS_WIDTH: usize = 16;
/// Opcodes are byte values, so the data bus is at least this wide.
pub const MIN_DATA_WIDTH: usize = 8;

/// Bus widths and initial register state, fixed for the life of a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputerConfig {
    pub address_width: usize,
    pub data_width: usize,
    /// Initial code register.
    pub code: u64,
    /// Initial address register.
    pub address: u64,
    /// Initial data register.
    pub data: u64,
    pub carry: bool,
    pub zero: bool,
}

impl Default for ComputerConfig {
    fn default() -> Self {
        Self {
            address_width: 8,
            data_width: 8,
            code: 0,
            address: 0,
            data: 0,
            carry: false,
            zero: false,
        }
    }
}

impl ComputerConfig {
    pub fn with_widths(address_width: usize, data_width: usize) -> Self {
        Self {
            address_width,
            data_width,
            ..Self::default()
        }
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_ADDRESS_WIDTH).contains(&self.address_width) {
            return Err(ConfigError::AddressWidth(self.address_width));
        }
        if !(MIN_DATA_WIDTH..=bits::MAX_WIDTH).contains(&self.data_width) {
            return Err(ConfigError::DataWidth(self.data_width));
        }
        if self.address_width > self.data_width {
            return Err(ConfigError::AddressWiderThanData {
                address_width: self.address_width,
                data_width: self.data_width,
            });
        }
        let registers = [
            ("code", self.code, self.data_width),
            ("address", self.address, self.address_width),
            ("data", self.data, self.data_width),
        ];
        for (register, value, width) in registers {
            if !bits::fits(value, width) {
                return Err(ConfigError::InitialValue {
                    register,
                    value,
                    width,
                });
            }
        }
        Ok(())
    }

    /// Number of addressable words.
    pub fn memory_size(&self) -> usize {
        1 << self.address_width
    }
}

/// Rejected machine configurations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("address width {0} is outside 1..={max}", max = MAX_ADDRESS_WIDTH)]
    AddressWidth(usize),

    #[error("data width {0} is outside {min}..={max}", min = MIN_DATA_WIDTH, max = bits::MAX_WIDTH)]
    DataWidth(usize),

    #[error("address width {address_width} exceeds data width {data_width}")]
    AddressWiderThanData {
        address_width: usize,
        data_width: usize,
    },

    #[error("initial {register} register {value:#x} does not fit in {width} bits")]
    InitialValue {
        register: &'static str,
        value: u64,
        width: usize,
    },

    #[error("config parse error: {0}")]
    Parse(String),
}
