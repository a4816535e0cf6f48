//! Erros da camada de hardware

use thiserror::Error;

use crate::traits::PinId;

pub type HardwareResult<T> = Result<T, HardwareError>;

/// Erros reportados pelos backends de pino/canal
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HardwareError {
    /// Pino já reivindicado por outro dono
    #[error("Pin #{pin} is already claimed")]
    Busy { pin: PinId },

    /// Pino/canal não pode ser obtido
    #[error("Pin #{pin} unavailable: {reason}")]
    Unavailable { pin: PinId, reason: String },

    /// Canal PWM usado antes de `open`
    #[error("PWM channel on pin #{pin} is not open")]
    NotOpen { pin: PinId },

    /// Escrita no hardware falhou
    #[error("Write to pin #{pin} failed: {reason}")]
    WriteFailed { pin: PinId, reason: String },

    /// Duty cycle fora de 0.0..=100.0
    #[error("Duty cycle {duty}% out of range on pin #{pin}")]
    InvalidDutyCycle { pin: PinId, duty: f64 },

    /// Frequência nula
    #[error("Invalid PWM frequency {hz}Hz on pin #{pin}")]
    InvalidFrequency { pin: PinId, hz: u32 },
}

impl HardwareError {
    /// Pino envolvido no erro
    pub fn pin(&self) -> PinId {
        match self {
            HardwareError::Busy { pin }
            | HardwareError::Unavailable { pin, .. }
            | HardwareError::NotOpen { pin }
            | HardwareError::WriteFailed { pin, .. }
            | HardwareError::InvalidDutyCycle { pin, .. }
            | HardwareError::InvalidFrequency { pin, .. } => *pin,
        }
    }
}
