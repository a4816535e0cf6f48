//! # Traits de Capacidade
//!
//! O controlador nunca conversa com registradores. Ele consome duas
//! capacidades, cada uma implementada por um backend:
//!
//! | Capacidade | Operações |
//! |------------|-----------|
//! | [`DigitalOutputPin`] | `configure_as_output`, `write_level` |
//! | [`PwmChannel`] | `open`, `start`, `set_duty_cycle`, `set_frequency`, `stop` |
//!
//! Ambos exigem `Send`: o canal é escrito pela tarefa de dimerização, que
//! roda em outra thread.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HardwareResult;

/// Identificador de pino (numeração do backend)
pub type PinId = u8;

/// Menor duty cycle aceito (%)
pub const MIN_DUTY_CYCLE: f64 = 0.0;

/// Maior duty cycle aceito (%)
pub const MAX_DUTY_CYCLE: f64 = 100.0;

/// Nível lógico de uma saída digital
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinLevel {
    Low,
    High,
}

impl fmt::Display for PinLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinLevel::Low => write!(f, "LOW"),
            PinLevel::High => write!(f, "HIGH"),
        }
    }
}

/// Saída digital (modo do pino + nível).
///
/// `configure_as_output` é também o ponto em que o backend reivindica o
/// pino: um pino já reivindicado deve falhar com
/// [`HardwareError::Busy`](crate::HardwareError::Busy).
pub trait DigitalOutputPin: Send {
    /// Configura o pino como saída
    fn configure_as_output(&mut self, pin: PinId) -> HardwareResult<()>;

    /// Escreve nível lógico
    fn write_level(&mut self, pin: PinId, level: PinLevel) -> HardwareResult<()>;
}

/// Canal PWM.
///
/// A geração do sinal em si é responsabilidade do backend; aqui só se
/// configura frequência e duty cycle (em %, `0.0..=100.0`).
pub trait PwmChannel: Send {
    /// Abre o canal no pino com a frequência dada
    fn open(&mut self, pin: PinId, frequency_hz: u32) -> HardwareResult<()>;

    /// Inicia a modulação com o duty cycle inicial
    fn start(&mut self, initial_duty: f64) -> HardwareResult<()>;

    /// Altera o duty cycle
    fn set_duty_cycle(&mut self, duty: f64) -> HardwareResult<()>;

    /// Altera a frequência
    fn set_frequency(&mut self, frequency_hz: u32) -> HardwareResult<()>;

    /// Para a modulação
    fn stop(&mut self) -> HardwareResult<()>;
}

impl<T: DigitalOutputPin + ?Sized> DigitalOutputPin for Box<T> {
    fn configure_as_output(&mut self, pin: PinId) -> HardwareResult<()> {
        (**self).configure_as_output(pin)
    }

    fn write_level(&mut self, pin: PinId, level: PinLevel) -> HardwareResult<()> {
        (**self).write_level(pin, level)
    }
}

impl<T: PwmChannel + ?Sized> PwmChannel for Box<T> {
    fn open(&mut self, pin: PinId, frequency_hz: u32) -> HardwareResult<()> {
        (**self).open(pin, frequency_hz)
    }

    fn start(&mut self, initial_duty: f64) -> HardwareResult<()> {
        (**self).start(initial_duty)
    }

    fn set_duty_cycle(&mut self, duty: f64) -> HardwareResult<()> {
        (**self).set_duty_cycle(duty)
    }

    fn set_frequency(&mut self, frequency_hz: u32) -> HardwareResult<()> {
        (**self).set_frequency(frequency_hz)
    }

    fn stop(&mut self) -> HardwareResult<()> {
        (**self).stop()
    }
}

/// Verifica se o duty cycle está em `0.0..=100.0`
pub fn is_valid_duty(duty: f64) -> bool {
    (MIN_DUTY_CYCLE..=MAX_DUTY_CYCLE).contains(&duty)
}
