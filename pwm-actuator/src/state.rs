//! # Máquina de Estados do Atuador
//!
//! Uma única tabela de transição ([`ActuatorState::transition`]). O
//! controlador consulta a tabela *antes* de qualquer efeito no hardware: um
//! comando rejeitado não toca pino nem canal.
//!
//! ```text
//! Uninitialized --initialize--> Idle
//! Idle/Steady   --set_level---> Steady
//! Idle/Steady   --start_dimming--> Dimming
//! Dimming       --stop_dimming---> Idle
//! Dimming       --fault----------> Idle
//! Idle/Steady/Dimming --shutdown--> ShuttingDown --finish--> Stopped
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// Estado do ciclo de vida do atuador
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActuatorState {
    /// Hardware ainda não configurado
    Uninitialized,
    /// Hardware configurado, saída em nível baixo
    Idle,
    /// Duty cycle fixo aplicado
    Steady,
    /// Tarefa de dimerização ativa
    Dimming,
    /// Desligamento em andamento
    ShuttingDown,
    /// Terminal
    Stopped,
}

impl ActuatorState {
    /// Aceita comandos de nível/dimerização?
    pub fn is_commandable(&self) -> bool {
        matches!(self, ActuatorState::Idle | ActuatorState::Steady)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ActuatorState::Stopped)
    }

    /// Tabela de transição.
    ///
    /// Retorna o próximo estado ou o erro que o comando deve devolver. Os
    /// auto-laços (`stop_dimming` fora de `Dimming`, `set_frequency`) são
    /// sucessos sem mudança de estado.
    pub fn transition(self, command: Command) -> Result<ActuatorState, CommandError> {
        use ActuatorState::*;

        match (self, command) {
            (Uninitialized, Command::Initialize) => Ok(Idle),

            (state, Command::SetLevel) if state.is_commandable() => Ok(Steady),

            (state, Command::StartDimming) if state.is_commandable() => Ok(Dimming),
            (Dimming, Command::StartDimming) => Err(CommandError::AlreadyActive { state: self }),

            (Dimming, Command::StopDimming) => Ok(Idle),
            (Idle | Steady, Command::StopDimming) => Ok(self),

            (Idle | Steady | Dimming, Command::SetFrequency) => Ok(self),

            (Dimming, Command::Fault) => Ok(Idle),

            (Idle | Steady | Dimming, Command::Shutdown) => Ok(ShuttingDown),
            (ShuttingDown, Command::FinishShutdown) => Ok(Stopped),

            (state, command) => Err(CommandError::InvalidState { state, command }),
        }
    }
}

impl fmt::Display for ActuatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActuatorState::Uninitialized => "Uninitialized",
            ActuatorState::Idle => "Idle",
            ActuatorState::Steady => "Steady",
            ActuatorState::Dimming => "Dimming",
            ActuatorState::ShuttingDown => "ShuttingDown",
            ActuatorState::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

/// Comando (ou evento interno) submetido à tabela de transição
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    Initialize,
    SetLevel,
    StartDimming,
    StopDimming,
    SetFrequency,
    Shutdown,
    /// Interno: conclusão do desligamento
    FinishShutdown,
    /// Interno: falha de hardware na tarefa de dimerização
    Fault,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Initialize => "initialize",
            Command::SetLevel => "set_level",
            Command::StartDimming => "start_dimming",
            Command::StopDimming => "stop_dimming",
            Command::SetFrequency => "set_frequency",
            Command::Shutdown => "shutdown",
            Command::FinishShutdown => "finish_shutdown",
            Command::Fault => "dimming_fault",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ActuatorState::*;

    const ALL_STATES: [ActuatorState; 6] = [Uninitialized, Idle, Steady, Dimming, ShuttingDown, Stopped];

    #[test]
    fn test_listed_transitions() {
        assert_eq!(Uninitialized.transition(Command::Initialize), Ok(Idle));
        assert_eq!(Idle.transition(Command::SetLevel), Ok(Steady));
        assert_eq!(Steady.transition(Command::SetLevel), Ok(Steady));
        assert_eq!(Idle.transition(Command::StartDimming), Ok(Dimming));
        assert_eq!(Steady.transition(Command::StartDimming), Ok(Dimming));
        assert_eq!(Dimming.transition(Command::StopDimming), Ok(Idle));
        assert_eq!(Dimming.transition(Command::Fault), Ok(Idle));
        for state in [Idle, Steady, Dimming] {
            assert_eq!(state.transition(Command::Shutdown), Ok(ShuttingDown));
        }
        assert_eq!(ShuttingDown.transition(Command::FinishShutdown), Ok(Stopped));
    }

    #[test]
    fn test_duplicate_dimming_is_already_active() {
        assert_eq!(
            Dimming.transition(Command::StartDimming),
            Err(CommandError::AlreadyActive { state: Dimming })
        );
    }

    #[test]
    fn test_stop_dimming_outside_dimming_is_noop() {
        assert_eq!(Idle.transition(Command::StopDimming), Ok(Idle));
        assert_eq!(Steady.transition(Command::StopDimming), Ok(Steady));
    }

    #[test]
    fn test_set_level_rejected_while_dimming() {
        assert_eq!(
            Dimming.transition(Command::SetLevel),
            Err(CommandError::InvalidState { state: Dimming, command: Command::SetLevel })
        );
    }

    #[test]
    fn test_stopped_is_terminal() {
        for command in [
            Command::Initialize,
            Command::SetLevel,
            Command::StartDimming,
            Command::StopDimming,
            Command::SetFrequency,
            Command::Shutdown,
        ] {
            assert!(matches!(
                Stopped.transition(command),
                Err(CommandError::InvalidState { state: Stopped, .. })
            ));
        }
    }

    #[test]
    fn test_commandable_states_accept_levels() {
        for state in ALL_STATES {
            assert_eq!(state.is_commandable(), state.transition(Command::SetLevel).is_ok());
            assert_eq!(state.is_terminal(), state == Stopped);
        }
        assert!(Idle.is_commandable());
        assert!(Steady.is_commandable());
        assert!(!Dimming.is_commandable());
    }

    #[test]
    fn test_initialize_only_from_uninitialized() {
        for state in ALL_STATES.into_iter().filter(|s| *s != Uninitialized) {
            assert!(state.transition(Command::Initialize).is_err());
        }
    }

    #[test]
    fn test_uninitialized_rejects_commands() {
        for command in [Command::SetLevel, Command::StartDimming, Command::Shutdown] {
            assert!(Uninitialized.transition(command).is_err());
        }
    }

    #[test]
    fn test_state_display() {
        assert_eq!(Dimming.to_string(), "Dimming");
        assert_eq!(Command::StartDimming.to_string(), "start_dimming");
    }
}
