//! # Tarefa de Dimerização
//!
//! Onda triangular de duty cycle entre 0 % e 100 %, executada numa thread
//! própria até ser cancelada.
//!
//! ```text
//! 100 ┤        /\        /
//!     │       /  \      /
//!     │      /    \    /
//!   0 ┼─────/      \──/
//!       ↑ start    ↑ mudança de direção
//! ```
//!
//! A cada iteração a tarefa:
//!
//! 1. toma o lock do controlador e confere se o estado ainda é `Dimming`;
//! 2. avança `current += step`, saturando e invertendo o passo nos limites;
//! 3. escreve o duty cycle no canal (uma nova tentativa imediata em caso de
//!    falha; na segunda falha registra o `HardwareFault` e encerra);
//! 4. solta o lock e espera `period` pelo sinal de parada.
//!
//! O sinal de parada é um canal crossbeam: `recv_timeout(period)` devolve
//! assim que `stop` é chamado, então o cancelamento termina em no máximo um
//! período.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use pwm_core::{DigitalOutputPin, PinId, PinLevel, PwmChannel, MAX_DUTY_CYCLE, MIN_DUTY_CYCLE};
use serde::{Deserialize, Serialize};

use crate::controller::{lock, Inner};
use crate::error::{CommandError, HardwareFault};
use crate::state::{ActuatorState, Command};

/// Parâmetros de uma dimerização em curso
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimmingParams {
    /// Incremento por iteração (%)
    pub step: f64,
    /// Intervalo entre iterações
    pub period: Duration,
}

/// Eventos observáveis da dimerização
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DimmingEvent {
    /// Tarefa iniciada
    Started { step: f64, period: Duration },
    /// Limite atingido, passo invertido
    DirectionChanged { iteration: u64, duty: f64, step: f64 },
    /// Falha de hardware; tarefa encerrada
    Fault(HardwareFault),
    /// Tarefa parada por `stop_dimming`/`shutdown`
    Stopped { iterations: u64 },
}

/// Valida passo e período
pub fn validate_dimming(step: f64, period: Duration) -> Result<(), String> {
    if !step.is_finite() || step == 0.0 {
        return Err(format!("step must be finite and non-zero, got {}", step));
    }
    if step.abs() > MAX_DUTY_CYCLE {
        return Err(format!("step magnitude must be at most {}%, got {}", MAX_DUTY_CYCLE, step));
    }
    if period.is_zero() {
        return Err("period must be greater than zero".to_string());
    }
    Ok(())
}

/// Um passo da onda triangular.
///
/// Retorna `(novo duty, novo passo, mudou de direção?)`.
pub fn triangle_step(current: f64, step: f64) -> (f64, f64, bool) {
    let next = current + step;
    if next > MAX_DUTY_CYCLE {
        (MAX_DUTY_CYCLE, -step, true)
    } else if next < MIN_DUTY_CYCLE {
        (MIN_DUTY_CYCLE, -step, true)
    } else {
        (next, step, false)
    }
}

/// Resultado de uma iteração
enum Tick {
    Continue,
    Exit,
}

/// Handle da thread de dimerização (pertence ao controlador)
#[derive(Debug)]
pub(crate) struct DimmingTask {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl DimmingTask {
    /// Dispara a thread
    ///
    /// Pode ser chamado com o lock do controlador tomado: a thread só começa
    /// a iterar depois que o chamador o solta.
    pub(crate) fn spawn<P, C>(
        shared: Arc<Mutex<Inner<P, C>>>,
        pin: PinId,
        params: DimmingParams,
    ) -> Result<Self, CommandError>
    where
        P: DigitalOutputPin + 'static,
        C: PwmChannel + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let name = format!("dimming-{}", pin);

        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || {
                let mut step = params.step;
                loop {
                    let tick = {
                        let mut inner = lock(&shared);
                        advance(&mut *inner, &mut step)
                    };
                    if let Tick::Exit = tick {
                        break;
                    }

                    match stop_rx.recv_timeout(params.period) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|e| CommandError::Spawn(e.to_string()))?;

        Ok(Self { stop_tx, handle })
    }

    /// Sinaliza a parada e espera a thread terminar
    pub(crate) fn stop(self) {
        let _ = self.stop_tx.try_send(());
        self.join();
    }

    /// Espera a thread terminar
    pub(crate) fn join(self) {
        let name = self.handle.thread().name().unwrap_or("dimming").to_string();
        if self.handle.join().is_err() {
            tracing::error!(thread = %name, "dimming task panicked");
        }
    }
}

/// Uma iteração da onda, com o lock do controlador tomado
fn advance<P: DigitalOutputPin, C: PwmChannel>(inner: &mut Inner<P, C>, step: &mut f64) -> Tick {
    if inner.state != ActuatorState::Dimming {
        return Tick::Exit;
    }

    let (duty, next_step, reversed) = triangle_step(inner.sample.current_duty, *step);
    let pin = inner.pin;

    let Some(hardware) = inner.hardware.as_mut() else {
        return Tick::Exit;
    };

    let written = hardware.channel.set_duty_cycle(duty).or_else(|err| {
        tracing::warn!(pin, duty, error = %err, "duty-cycle write failed, retrying once");
        hardware.channel.set_duty_cycle(duty)
    });

    if let Err(err) = written {
        let fault = HardwareFault::new(ActuatorState::Dimming, Command::StartDimming, &err);
        tracing::error!(pin, duty, error = %err, "dimming aborted by hardware fault");

        // Melhor esforço: deixa a saída parada e em nível baixo
        if let Err(stop_err) = hardware.channel.stop() {
            tracing::warn!(pin, error = %stop_err, "failed to stop channel after fault");
        }
        if let Err(low_err) = hardware.pin.write_level(pin, PinLevel::Low) {
            tracing::warn!(pin, error = %low_err, "failed to drive pin low after fault");
        }

        inner.channel_active = false;
        inner.dimming = None;
        inner.fault = Some(fault.clone());
        if let Err(err) = inner.transition(Command::Fault) {
            tracing::warn!(pin, error = %err, "fault transition rejected");
        }
        inner.emit(DimmingEvent::Fault(fault));
        return Tick::Exit;
    }

    inner.iterations += 1;
    inner.sample.record(duty, next_step);
    *step = next_step;

    if reversed {
        inner.direction_changes += 1;
        let iteration = inner.iterations;
        if next_step < 0.0 {
            tracing::info!(pin, iteration, duty, "changed dimming direction: lighting down");
        } else {
            tracing::info!(pin, iteration, duty, "changed dimming direction: lighting up");
        }
        inner.emit(DimmingEvent::DirectionChanged {
            iteration,
            duty,
            step: next_step,
        });
    }

    Tick::Continue
}
