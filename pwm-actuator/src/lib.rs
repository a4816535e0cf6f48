//! # 💡 pwm-actuator — Controle de LEDs e Servos por PWM
//!
//! Controlador de atuador com calibração linear, máquina de estados
//! serializada e dimerização cancelável em segundo plano.
//!
//! ## Arquitetura
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │              ActuatorController                  │
//! │  set_level / turn_on / turn_off                  │
//! │  start_dimming / stop_dimming / set_frequency    │
//! │  shutdown / get_data / subscribe                 │
//! │         ↓                       ↓                │
//! │  ┌───────────────────┐  ┌────────────────────┐   │
//! │  │ LinearCalibration │  │  ActuatorState     │   │
//! │  │ comando → duty %  │  │  (tabela única)    │   │
//! │  └───────────────────┘  └────────────────────┘   │
//! │                 ↓                                │
//! │        DimmingTask (thread, onda triangular)     │
//! └──────────────────────────────────────────────────┘
//!                   ↓
//!     DigitalOutputPin + PwmChannel (pwm-core)
//! ```
//!
//! ## Componentes
//!
//! ### LinearCalibration
//!
//! - `duty (%) = m * comando + b`, calculado uma única vez
//! - Comando saturado no domínio antes do mapeamento
//! - Resultado saturado na faixa e arredondado a uma casa decimal
//! - Domínio degenerado é erro (nunca inclinação zero silenciosa)
//!
//! ### ActuatorController
//!
//! - Dono exclusivo do pino e do canal
//! - Todo comando é validado pela tabela de estados antes de tocar o hardware
//! - No máximo uma tarefa de dimerização
//! - `stop_dimming` só retorna depois da última escrita da tarefa
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use pwm_actuator::{ActuatorConfig, ActuatorController, ActuatorState};
//! use pwm_core::sim::SimBoard;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let board = SimBoard::new();
//! let config = ActuatorConfig::servo(17);
//!
//! let servo = ActuatorController::initialize(board.pin(17), board.pwm(17), &config)?;
//! let applied = servo.set_level(90.0)?;
//! assert_eq!(applied.duty, 7.5);
//! assert_eq!(servo.state(), ActuatorState::Steady);
//!
//! servo.shutdown();
//! assert_eq!(servo.state(), ActuatorState::Stopped);
//! # Ok(())
//! # }
//! ```
//!
//! ## Backends
//!
//! - [`pwm_core::sim::SimBoard`]: placa em memória (testes, benchmarks)
//! - `rppal_backend` (feature `rppal`): Raspberry Pi, PWM por software

pub mod error;
pub mod state;
pub mod calibration;
pub mod config;
pub mod types;
pub mod dimming;
pub mod controller;

#[cfg(feature = "rppal")]
pub mod rppal_backend;

pub use error::{
    CalibrationError, CalibrationResult, CommandError, CommandResult, ConfigError, ConfigResult, HardwareFault,
    InitError,
};
pub use state::{ActuatorState, Command};
pub use calibration::{pulse_width_to_duty, CalibrationParams, LinearCalibration};
pub use config::{ActuatorConfig, CalibrationSpec, DimmingConfig};
pub use types::{ActuatorSnapshot, AppliedDuty, DutyCycleSample};
pub use dimming::{DimmingEvent, DimmingParams};
pub use controller::ActuatorController;

#[cfg(feature = "rppal")]
pub use rppal_backend::{RppalOutput, RppalPin, RppalPwm};
