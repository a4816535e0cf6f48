//! Erros da camada de atuador

use std::fmt;

use pwm_core::{HardwareError, PinId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{ActuatorState, Command};

pub type CalibrationResult<T> = Result<T, CalibrationError>;
pub type CommandResult<T> = Result<T, CommandError>;
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Erros de calibração (erro do chamador, não recuperável internamente)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationError {
    /// Domínio com amplitude zero: inclinação indefinida
    #[error("Degenerate calibration domain: min == max == {min}")]
    DegenerateDomain { min: f64, max: f64 },

    /// Faixa de duty cycle fora de 0 <= min <= max <= 100
    #[error("Invalid duty-cycle range {min}%..{max}% (expected 0 <= min <= max <= 100)")]
    InvalidRange { min: f64, max: f64 },

    /// Frequência nula
    #[error("Invalid PWM frequency: {0}Hz")]
    InvalidFrequency(u32),

    /// Parâmetro NaN/infinito
    #[error("Non-finite calibration parameter: {0}")]
    NonFinite(&'static str),
}

/// Erros de `initialize`
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InitError {
    /// Pino/canal não pôde ser reivindicado
    #[error("Hardware unavailable on pin #{pin}: {source}")]
    HardwareUnavailable {
        pin: PinId,
        #[source]
        source: HardwareError,
    },

    /// Calibração inválida
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    /// Transição rejeitada pela tabela de estados
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Falha de hardware durante operação (nível fixo ou dimerização).
///
/// Valor comum (não um `Box<dyn Error>`): fica guardado no snapshot até ser
/// entregue ao próximo comando.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareFault {
    /// Pino afetado
    pub pin: PinId,
    /// Estado no momento da falha
    pub state: ActuatorState,
    /// Comando/atividade em curso
    pub command: Command,
    /// Mensagem do backend
    pub message: String,
}

impl HardwareFault {
    pub fn new(state: ActuatorState, command: Command, err: &HardwareError) -> Self {
        Self {
            pin: err.pin(),
            state,
            command,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for HardwareFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pin #{} during {} (state {}): {}",
            self.pin, self.command, self.state, self.message
        )
    }
}

/// Erros de comandos do controlador
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    /// Comando proibido no estado atual
    #[error("Invalid state: cannot {command} while {state}")]
    InvalidState { state: ActuatorState, command: Command },

    /// `start_dimming` com dimerização já ativa
    #[error("Dimming already active (state {state})")]
    AlreadyActive { state: ActuatorState },

    /// Falha de hardware
    #[error("Hardware fault: {0}")]
    HardwareFault(HardwareFault),

    /// Argumento inválido (NaN, passo nulo, período zero...)
    #[error("Invalid argument for {command}: {reason}")]
    InvalidArgument { command: Command, reason: String },

    /// Thread de dimerização não pôde ser criada
    #[error("Failed to spawn dimming task: {0}")]
    Spawn(String),
}

impl CommandError {
    /// Estado informado pelo erro, quando houver
    pub fn state(&self) -> Option<ActuatorState> {
        match self {
            CommandError::InvalidState { state, .. } | CommandError::AlreadyActive { state } => Some(*state),
            CommandError::HardwareFault(fault) => Some(fault.state),
            CommandError::InvalidArgument { .. } | CommandError::Spawn(_) => None,
        }
    }
}

/// Erros de configuração
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Leitura do arquivo falhou
    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    /// TOML inválido
    #[error("Failed to parse actuator config: {0}")]
    Parse(String),

    /// Serialização falhou
    #[error("Failed to serialize actuator config: {0}")]
    Serialize(String),

    /// Valores inconsistentes
    #[error("Invalid actuator config: {0}")]
    Invalid(String),
}

impl From<CalibrationError> for ConfigError {
    fn from(err: CalibrationError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_degenerate_domain() {
        let err = CalibrationError::DegenerateDomain { min: 90.0, max: 90.0 };
        assert!(err.to_string().contains("Degenerate"));
    }

    #[test]
    fn test_invalid_state_carries_context() {
        let err = CommandError::InvalidState {
            state: ActuatorState::Dimming,
            command: Command::SetLevel,
        };
        assert_eq!(err.to_string(), "Invalid state: cannot set_level while Dimming");
        assert_eq!(err.state(), Some(ActuatorState::Dimming));
    }

    #[test]
    fn test_hardware_fault_display() {
        let hw = HardwareError::WriteFailed { pin: 17, reason: "bus error".into() };
        let fault = HardwareFault::new(ActuatorState::Dimming, Command::StartDimming, &hw);
        let err = CommandError::HardwareFault(fault);
        let text = err.to_string();
        assert!(text.contains("pin #17"));
        assert!(text.contains("start_dimming"));
        assert!(text.contains("bus error"));
    }

    #[test]
    fn test_init_error_from_calibration() {
        let err: InitError = CalibrationError::InvalidFrequency(0).into();
        assert!(matches!(err, InitError::Calibration(_)));
        assert!(err.to_string().contains("0Hz"));
    }

    #[test]
    fn test_init_error_source() {
        use std::error::Error;

        let err = InitError::HardwareUnavailable {
            pin: 4,
            source: HardwareError::Busy { pin: 4 },
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("already claimed"));
    }
}
