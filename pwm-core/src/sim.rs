//! # Placa Simulada
//!
//! Implementação em memória de [`DigitalOutputPin`] e [`PwmChannel`] para
//! testes, benchmarks e hosts sem GPIO.
//!
//! - Cada `SimPin`/`SimPwm` reivindica o recurso na primeira configuração;
//!   um segundo handle no mesmo pino recebe [`HardwareError::Busy`].
//! - Soltar (`drop`) o handle libera a reivindicação.
//! - Todo duty cycle escrito fica registrado em `duty_log`.
//! - `fail_next_writes` injeta falhas em `set_duty_cycle`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{HardwareError, HardwareResult};
use crate::traits::{is_valid_duty, DigitalOutputPin, PinId, PinLevel, PwmChannel};

type HandleId = u64;

/// Estado simulado de um pino
#[derive(Debug, Clone)]
struct PinRecord {
    output_owner: Option<HandleId>,
    pwm_owner: Option<HandleId>,
    is_output: bool,
    level: PinLevel,
    frequency_hz: Option<u32>,
    running: bool,
    duty: f64,
    duty_log: Vec<f64>,
    pending_failures: u32,
}

impl PinRecord {
    fn new() -> Self {
        Self {
            output_owner: None,
            pwm_owner: None,
            is_output: false,
            level: PinLevel::Low,
            frequency_hz: None,
            running: false,
            duty: 0.0,
            duty_log: Vec::new(),
            pending_failures: 0,
        }
    }
}

#[derive(Debug, Default)]
struct BoardState {
    pins: HashMap<PinId, PinRecord>,
}

impl BoardState {
    fn record(&mut self, pin: PinId) -> &mut PinRecord {
        self.pins.entry(pin).or_insert_with(PinRecord::new)
    }
}

/// Placa simulada compartilhada (clone barato)
#[derive(Debug, Clone, Default)]
pub struct SimBoard {
    state: Arc<Mutex<BoardState>>,
    next_handle: Arc<AtomicU64>,
}

impl SimBoard {
    /// Cria placa vazia
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle_id(&self) -> HandleId {
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Handle de saída digital para o pino
    pub fn pin(&self, pin: PinId) -> SimPin {
        SimPin {
            board: self.clone(),
            handle: self.handle_id(),
            pin,
        }
    }

    /// Handle de canal PWM para o pino
    pub fn pwm(&self, pin: PinId) -> SimPwm {
        SimPwm {
            board: self.clone(),
            handle: self.handle_id(),
            pin,
            open: false,
        }
    }

    /// Nível atual do pino
    pub fn level(&self, pin: PinId) -> PinLevel {
        self.lock().pins.get(&pin).map_or(PinLevel::Low, |r| r.level)
    }

    /// Pino configurado como saída?
    pub fn is_output(&self, pin: PinId) -> bool {
        self.lock().pins.get(&pin).is_some_and(|r| r.is_output)
    }

    /// Pino ou canal reivindicado por algum handle?
    pub fn is_claimed(&self, pin: PinId) -> bool {
        self.lock()
            .pins
            .get(&pin)
            .is_some_and(|r| r.output_owner.is_some() || r.pwm_owner.is_some())
    }

    /// Canal PWM modulando?
    pub fn is_running(&self, pin: PinId) -> bool {
        self.lock().pins.get(&pin).is_some_and(|r| r.running)
    }

    /// Frequência configurada no canal
    pub fn frequency(&self, pin: PinId) -> Option<u32> {
        self.lock().pins.get(&pin).and_then(|r| r.frequency_hz)
    }

    /// Último duty cycle escrito
    pub fn duty(&self, pin: PinId) -> f64 {
        self.lock().pins.get(&pin).map_or(0.0, |r| r.duty)
    }

    /// Todos os duty cycles escritos, em ordem
    pub fn duty_log(&self, pin: PinId) -> Vec<f64> {
        self.lock()
            .pins
            .get(&pin)
            .map(|r| r.duty_log.clone())
            .unwrap_or_default()
    }

    /// Quantidade de duty cycles escritos
    pub fn write_count(&self, pin: PinId) -> usize {
        self.lock().pins.get(&pin).map_or(0, |r| r.duty_log.len())
    }

    /// Faz as próximas `count` chamadas de `set_duty_cycle` falharem
    pub fn fail_next_writes(&self, pin: PinId, count: u32) {
        self.lock().record(pin).pending_failures = count;
    }
}

/// Saída digital simulada
#[derive(Debug)]
pub struct SimPin {
    board: SimBoard,
    handle: HandleId,
    pin: PinId,
}

impl SimPin {
    fn check_pin(&self, pin: PinId) -> HardwareResult<()> {
        if pin != self.pin {
            return Err(HardwareError::Unavailable {
                pin,
                reason: format!("handle is bound to pin #{}", self.pin),
            });
        }
        Ok(())
    }
}

impl DigitalOutputPin for SimPin {
    fn configure_as_output(&mut self, pin: PinId) -> HardwareResult<()> {
        self.check_pin(pin)?;
        let mut state = self.board.lock();
        let record = state.record(pin);
        match record.output_owner {
            Some(owner) if owner != self.handle => return Err(HardwareError::Busy { pin }),
            _ => record.output_owner = Some(self.handle),
        }
        record.is_output = true;
        tracing::trace!(pin, "sim: pin configured as output");
        Ok(())
    }

    fn write_level(&mut self, pin: PinId, level: PinLevel) -> HardwareResult<()> {
        self.check_pin(pin)?;
        let mut state = self.board.lock();
        let record = state.record(pin);
        if record.output_owner != Some(self.handle) || !record.is_output {
            return Err(HardwareError::Unavailable {
                pin,
                reason: "pin is not configured as output".into(),
            });
        }
        record.level = level;
        tracing::trace!(pin, %level, "sim: level written");
        Ok(())
    }
}

impl Drop for SimPin {
    fn drop(&mut self) {
        let mut state = self.board.lock();
        if let Some(record) = state.pins.get_mut(&self.pin) {
            if record.output_owner == Some(self.handle) {
                record.output_owner = None;
                record.is_output = false;
            }
        }
    }
}

/// Canal PWM simulado
#[derive(Debug)]
pub struct SimPwm {
    board: SimBoard,
    handle: HandleId,
    pin: PinId,
    open: bool,
}

impl SimPwm {
    fn ensure_open(&self) -> HardwareResult<()> {
        if !self.open {
            return Err(HardwareError::NotOpen { pin: self.pin });
        }
        Ok(())
    }

    fn write_duty(&self, duty: f64, inject_failures: bool) -> HardwareResult<()> {
        if !is_valid_duty(duty) {
            return Err(HardwareError::InvalidDutyCycle { pin: self.pin, duty });
        }
        let mut state = self.board.lock();
        let record = state.record(self.pin);
        if inject_failures && record.pending_failures > 0 {
            record.pending_failures -= 1;
            return Err(HardwareError::WriteFailed {
                pin: self.pin,
                reason: "injected fault".into(),
            });
        }
        record.duty = duty;
        record.duty_log.push(duty);
        Ok(())
    }
}

impl PwmChannel for SimPwm {
    fn open(&mut self, pin: PinId, frequency_hz: u32) -> HardwareResult<()> {
        if pin != self.pin {
            return Err(HardwareError::Unavailable {
                pin,
                reason: format!("handle is bound to pin #{}", self.pin),
            });
        }
        if frequency_hz == 0 {
            return Err(HardwareError::InvalidFrequency { pin, hz: frequency_hz });
        }
        let mut state = self.board.lock();
        let record = state.record(pin);
        match record.pwm_owner {
            Some(owner) if owner != self.handle => return Err(HardwareError::Busy { pin }),
            _ => record.pwm_owner = Some(self.handle),
        }
        record.frequency_hz = Some(frequency_hz);
        self.open = true;
        tracing::trace!(pin, frequency_hz, "sim: channel opened");
        Ok(())
    }

    fn start(&mut self, initial_duty: f64) -> HardwareResult<()> {
        self.ensure_open()?;
        self.write_duty(initial_duty, false)?;
        self.board.lock().record(self.pin).running = true;
        Ok(())
    }

    fn set_duty_cycle(&mut self, duty: f64) -> HardwareResult<()> {
        self.ensure_open()?;
        self.write_duty(duty, true)
    }

    fn set_frequency(&mut self, frequency_hz: u32) -> HardwareResult<()> {
        self.ensure_open()?;
        if frequency_hz == 0 {
            return Err(HardwareError::InvalidFrequency { pin: self.pin, hz: frequency_hz });
        }
        self.board.lock().record(self.pin).frequency_hz = Some(frequency_hz);
        Ok(())
    }

    fn stop(&mut self) -> HardwareResult<()> {
        self.ensure_open()?;
        self.board.lock().record(self.pin).running = false;
        tracing::trace!(pin = self.pin, "sim: channel stopped");
        Ok(())
    }
}

impl Drop for SimPwm {
    fn drop(&mut self) {
        let mut state = self.board.lock();
        if let Some(record) = state.pins.get_mut(&self.pin) {
            if record.pwm_owner == Some(self.handle) {
                record.pwm_owner = None;
                record.running = false;
            }
        }
    }
}
