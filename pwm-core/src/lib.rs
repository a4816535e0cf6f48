//! # 🔌 pwm-core — Capacidades de Hardware PWM/GPIO
//!
//! Abstrações que o controlador de atuadores consome. Nenhum registrador é
//! tocado aqui: quem implementa os traits é o backend (Raspberry Pi, placa
//! simulada, etc.).
//!
//! ## Arquitetura
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            pwm-actuator (controlador)         │
//! └───────────────┬───────────────────┬───────────┘
//!                 ↓                   ↓
//!      ┌────────────────────┐  ┌──────────────┐
//!      │  DigitalOutputPin  │  │  PwmChannel  │
//!      │ configure / write  │  │ open / start │
//!      └────────────────────┘  │ duty / freq  │
//!                              │ stop         │
//!                              └──────────────┘
//!                 ↓                   ↓
//!        SimBoard (testes)    rppal (Raspberry Pi)
//! ```
//!
//! ## Princípio de Design
//!
//! > *"Trait no core, implementação no módulo."*
//!
//! As capacidades são passadas explicitamente ao controlador (injeção de
//! dependência). Não existe registro global de pinos: a placa simulada é um
//! objeto comum, criado e compartilhado por quem precisa dela.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use pwm_core::sim::SimBoard;
//! use pwm_core::{DigitalOutputPin, PinLevel, PwmChannel};
//!
//! # fn main() -> Result<(), pwm_core::HardwareError> {
//! let board = SimBoard::new();
//! let mut pin = board.pin(17);
//! let mut pwm = board.pwm(17);
//!
//! pin.configure_as_output(17)?;
//! pin.write_level(17, PinLevel::Low)?;
//!
//! pwm.open(17, 1000)?;
//! pwm.start(0.0)?;
//! pwm.set_duty_cycle(42.0)?;
//! pwm.stop()?;
//!
//! assert_eq!(board.duty_log(17), vec![0.0, 42.0]);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod traits;
pub mod sim;

pub use error::{HardwareError, HardwareResult};
pub use traits::{DigitalOutputPin, PinId, PinLevel, PwmChannel, MAX_DUTY_CYCLE, MIN_DUTY_CYCLE};
