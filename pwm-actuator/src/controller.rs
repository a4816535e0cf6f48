//! # Controlador de Atuador
//!
//! Dono exclusivo de um pino digital e de um canal PWM. Todos os comandos
//! passam pela tabela de transição ([`ActuatorState::transition`]) antes de
//! qualquer efeito no hardware.
//!
//! ## Concorrência
//!
//! ```text
//!   comandos ──► task: Mutex<Option<DimmingTask>>   (serializa comandos)
//!                   │
//!                   ▼
//!   get_data ──► shared: Arc<Mutex<Inner>> ◄── thread de dimerização
//!                (estado, duty, canal, pino)
//! ```
//!
//! - Ordem de locks: sempre `task` → `shared`. A thread só toma `shared`.
//! - `stop_dimming`/`shutdown` esperam a thread (`join`) **sem** segurar
//!   `shared`, e só então mexem no canal. Depois que retornam, nenhuma
//!   escrita de duty cycle da tarefa acontece mais.
//! - `get_data` lê sob `shared`: o par atual/anterior nunca sai rasgado.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender, TrySendError};
use pwm_core::{DigitalOutputPin, HardwareError, PinId, PinLevel, PwmChannel};

use crate::calibration::LinearCalibration;
use crate::config::{ActuatorConfig, DimmingConfig};
use crate::dimming::{validate_dimming, DimmingEvent, DimmingParams, DimmingTask};
use crate::error::{CommandError, CommandResult, HardwareFault, InitError};
use crate::state::{ActuatorState, Command};
use crate::types::{ActuatorSnapshot, AppliedDuty, DutyCycleSample};

/// Toma o lock recuperando de envenenamento (o estado protegido é sempre
/// deixado consistente antes de qualquer ponto que possa entrar em pânico)
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pino + canal reivindicados
pub(crate) struct Hardware<P, C> {
    pub(crate) pin: P,
    pub(crate) channel: C,
}

/// Estado compartilhado com a tarefa de dimerização
pub(crate) struct Inner<P, C> {
    pub(crate) name: String,
    pub(crate) pin: PinId,
    pub(crate) state: ActuatorState,
    pub(crate) previous_state: ActuatorState,
    pub(crate) frequency_hz: u32,
    pub(crate) sample: DutyCycleSample,
    /// `None` depois do `shutdown` (reivindicações liberadas)
    pub(crate) hardware: Option<Hardware<P, C>>,
    pub(crate) channel_active: bool,
    pub(crate) dimming: Option<DimmingParams>,
    pub(crate) iterations: u64,
    pub(crate) direction_changes: u64,
    pub(crate) fault: Option<HardwareFault>,
    subscribers: Vec<Sender<DimmingEvent>>,
}

impl<P, C> Inner<P, C> {
    fn new(name: String, pin: PinId, frequency_hz: u32, hardware: Hardware<P, C>) -> Self {
        Self {
            name,
            pin,
            state: ActuatorState::Uninitialized,
            previous_state: ActuatorState::Uninitialized,
            frequency_hz,
            sample: DutyCycleSample::new(),
            hardware: Some(hardware),
            channel_active: false,
            dimming: None,
            iterations: 0,
            direction_changes: 0,
            fault: None,
            subscribers: Vec::new(),
        }
    }

    /// Consulta a tabela sem mudar o estado
    fn check(&self, command: Command) -> CommandResult<ActuatorState> {
        self.state.transition(command)
    }

    /// Entra no estado (guardando o anterior)
    fn enter(&mut self, next: ActuatorState) {
        tracing::debug!(name = %self.name, pin = self.pin, from = %self.state, to = %next, "state transition");
        self.previous_state = self.state;
        self.state = next;
    }

    /// Consulta a tabela e entra no próximo estado
    pub(crate) fn transition(&mut self, command: Command) -> CommandResult<ActuatorState> {
        let next = self.check(command)?;
        self.enter(next);
        Ok(next)
    }

    /// Entrega (e limpa) a falha pendente da dimerização
    fn take_fault(&mut self) -> CommandResult<()> {
        match self.fault.take() {
            Some(fault) => Err(CommandError::HardwareFault(fault)),
            None => Ok(()),
        }
    }

    fn hardware_mut(&mut self, command: Command) -> CommandResult<&mut Hardware<P, C>> {
        let state = self.state;
        self.hardware
            .as_mut()
            .ok_or(CommandError::InvalidState { state, command })
    }

    /// Publica evento; assinantes desconectados são removidos
    pub(crate) fn emit(&mut self, event: DimmingEvent) {
        self.subscribers
            .retain(|tx| !matches!(tx.try_send(event.clone()), Err(TrySendError::Disconnected(_))));
    }

    fn snapshot(&self, calibration: &LinearCalibration) -> ActuatorSnapshot {
        ActuatorSnapshot {
            name: self.name.clone(),
            pin: self.pin,
            state: self.state,
            previous_state: self.previous_state,
            frequency_hz: self.frequency_hz,
            sample: self.sample,
            calibration: *calibration.params(),
            slope: calibration.slope(),
            intercept: calibration.intercept(),
            channel_active: self.channel_active,
            dimming: self.dimming,
            iterations: self.iterations,
            direction_changes: self.direction_changes,
            fault: self.fault.clone(),
        }
    }
}

impl<P: DigitalOutputPin, C: PwmChannel> Inner<P, C> {
    /// Para o canal e leva o pino a nível baixo
    fn quiesce(&mut self, command: Command) -> CommandResult<()> {
        let (pin, state) = (self.pin, self.state);
        self.channel_active = false;
        self.dimming = None;
        self.sample.record(0.0, 0.0);

        let Some(hardware) = self.hardware.as_mut() else {
            return Ok(());
        };
        let stopped = hardware.channel.stop();
        let lowered = hardware.pin.write_level(pin, PinLevel::Low);
        stopped
            .and(lowered)
            .map_err(|err| CommandError::HardwareFault(HardwareFault::new(state, command, &err)))
    }

    /// Escreve duty cycle, iniciando o canal se estiver parado
    fn write_duty(&mut self, duty: f64, command: Command) -> CommandResult<()> {
        let (state, active) = (self.state, self.channel_active);
        let hardware = self.hardware_mut(command)?;
        let written = if active {
            hardware.channel.set_duty_cycle(duty)
        } else {
            hardware.channel.start(duty)
        };
        written.map_err(|err| CommandError::HardwareFault(HardwareFault::new(state, command, &err)))?;
        self.channel_active = true;
        Ok(())
    }

    /// Desfaz a escrita inicial de `start_dimming` quando a tarefa não
    /// chega a existir: canal parado se estava parado, duty anterior se
    /// estava ativo.
    fn undo_start(&mut self, was_active: bool, previous: DutyCycleSample) {
        let restored = if was_active {
            self.write_duty(previous.current_duty, Command::StartDimming)
        } else {
            self.quiesce(Command::StartDimming)
        };
        if let Err(err) = restored {
            tracing::warn!(pin = self.pin, error = %err, "failed to restore output after dimming start failure");
        }
        self.sample = previous;
    }
}

/// Controlador de LED/servo
pub struct ActuatorController<P, C>
where
    P: DigitalOutputPin + 'static,
    C: PwmChannel + 'static,
{
    shared: Arc<Mutex<Inner<P, C>>>,
    /// Serializa os comandos; guarda a tarefa de dimerização
    task: Mutex<Option<DimmingTask>>,
    calibration: LinearCalibration,
    dimming_defaults: DimmingConfig,
}

impl<P, C> ActuatorController<P, C>
where
    P: DigitalOutputPin + 'static,
    C: PwmChannel + 'static,
{
    /// Configura o pino como saída em nível baixo, abre o canal e entra em
    /// `Idle`.
    ///
    /// Em qualquer falha os handles recebidos são descartados (e com eles
    /// as reivindicações já feitas).
    pub fn initialize(mut pin: P, mut channel: C, config: &ActuatorConfig) -> Result<Self, InitError> {
        let calibration = config.calibration()?;
        let id = config.pin;
        let unavailable = |source: HardwareError| InitError::HardwareUnavailable { pin: id, source };

        pin.configure_as_output(id).map_err(unavailable)?;
        pin.write_level(id, PinLevel::Low).map_err(unavailable)?;
        channel.open(id, config.frequency_hz).map_err(unavailable)?;

        let mut inner = Inner::new(config.name.clone(), id, config.frequency_hz, Hardware { pin, channel });
        inner.transition(Command::Initialize)?;

        tracing::info!(
            name = %config.name,
            pin = id,
            frequency_hz = config.frequency_hz,
            %calibration,
            "actuator initialized"
        );

        Ok(Self {
            shared: Arc::new(Mutex::new(inner)),
            task: Mutex::new(None),
            calibration,
            dimming_defaults: config.dimming,
        })
    }

    /// Aplica a calibração e escreve o duty cycle (`Idle`/`Steady` → `Steady`)
    pub fn set_level(&self, command: f64) -> CommandResult<AppliedDuty> {
        let mut task = lock(&self.task);
        self.reap(&mut task);

        let mut inner = lock(&self.shared);
        inner.take_fault()?;
        let next = inner.check(Command::SetLevel)?;
        let duty = self
            .calibration
            .try_apply(command)
            .map_err(|err| CommandError::InvalidArgument {
                command: Command::SetLevel,
                reason: err.to_string(),
            })?;

        inner.write_duty(duty, Command::SetLevel)?;
        inner.sample.record(duty, 0.0);
        inner.enter(next);

        let applied = AppliedDuty {
            requested: command,
            effective: self.calibration.clamp_command(command),
            duty,
        };
        tracing::debug!(
            pin = inner.pin,
            requested = applied.requested,
            effective = applied.effective,
            duty,
            "level applied"
        );
        Ok(applied)
    }

    /// Nível máximo do domínio (LED aceso)
    pub fn turn_on(&self) -> CommandResult<AppliedDuty> {
        self.set_level(self.calibration.params().domain_max)
    }

    /// Nível mínimo do domínio (LED apagado, canal ainda ativo)
    pub fn turn_off(&self) -> CommandResult<AppliedDuty> {
        self.set_level(self.calibration.params().domain_min)
    }

    /// Inicia a dimerização (`Idle`/`Steady` → `Dimming`).
    ///
    /// Uma segunda chamada com a tarefa ativa falha com
    /// [`CommandError::AlreadyActive`]; nunca existe mais de uma tarefa.
    pub fn start_dimming(&self, step: f64, period: Duration) -> CommandResult<()> {
        let mut task = lock(&self.task);
        self.reap(&mut task);

        let mut inner = lock(&self.shared);
        inner.take_fault()?;
        let next = inner.check(Command::StartDimming)?;
        validate_dimming(step, period).map_err(|reason| CommandError::InvalidArgument {
            command: Command::StartDimming,
            reason,
        })?;

        let (was_active, previous) = (inner.channel_active, inner.sample);
        inner.write_duty(0.0, Command::StartDimming)?;
        inner.sample.record(0.0, step);

        let params = DimmingParams { step, period };
        // A thread fica bloqueada em `shared` até este guard cair
        let handle = match DimmingTask::spawn(Arc::clone(&self.shared), inner.pin, params) {
            Ok(handle) => handle,
            Err(err) => {
                inner.undo_start(was_active, previous);
                return Err(err);
            }
        };

        inner.iterations = 0;
        inner.direction_changes = 0;
        inner.dimming = Some(params);
        inner.enter(next);
        inner.emit(DimmingEvent::Started { step, period });
        tracing::info!(pin = inner.pin, step, period_us = period.as_micros() as u64, "dimming started");

        *task = Some(handle);
        Ok(())
    }

    /// Inicia a dimerização com os padrões da configuração
    pub fn start_dimming_default(&self) -> CommandResult<()> {
        self.start_dimming(self.dimming_defaults.step, self.dimming_defaults.period())
    }

    /// Para a dimerização (`Dimming` → `Idle`); sem efeito em `Idle`/`Steady`.
    ///
    /// Bloqueia até a thread terminar (no máximo um período), depois para o
    /// canal e leva o pino a nível baixo.
    pub fn stop_dimming(&self) -> CommandResult<()> {
        let mut task = lock(&self.task);
        self.reap(&mut task);

        {
            let mut inner = lock(&self.shared);
            inner.take_fault()?;
            inner.check(Command::StopDimming)?;
            if inner.state != ActuatorState::Dimming {
                return Ok(());
            }
        }

        if let Some(running) = task.take() {
            running.stop();
        }

        let mut inner = lock(&self.shared);
        // Falha ocorrida entre o sinal e o fim da thread
        inner.take_fault()?;
        let next = inner.check(Command::StopDimming)?;
        let iterations = inner.iterations;
        let result = inner.quiesce(Command::StopDimming);
        inner.enter(next);
        inner.emit(DimmingEvent::Stopped { iterations });
        tracing::info!(pin = inner.pin, iterations, "dimming stopped");
        result
    }

    /// Altera a frequência do canal (qualquer estado ativo, sem transição)
    pub fn set_frequency(&self, frequency_hz: u32) -> CommandResult<()> {
        let mut task = lock(&self.task);
        self.reap(&mut task);

        let mut inner = lock(&self.shared);
        inner.take_fault()?;
        inner.check(Command::SetFrequency)?;
        if frequency_hz == 0 {
            return Err(CommandError::InvalidArgument {
                command: Command::SetFrequency,
                reason: "frequency must be greater than zero".to_string(),
            });
        }

        let state = inner.state;
        inner
            .hardware_mut(Command::SetFrequency)?
            .channel
            .set_frequency(frequency_hz)
            .map_err(|err| CommandError::HardwareFault(HardwareFault::new(state, Command::SetFrequency, &err)))?;
        inner.frequency_hz = frequency_hz;
        tracing::info!(pin = inner.pin, frequency_hz, "frequency changed");
        Ok(())
    }

    /// Desliga o atuador (qualquer estado → `Stopped`).
    ///
    /// Para a dimerização se houver, para o canal, leva o pino a nível
    /// baixo e libera pino e canal mesmo que o hardware reporte erros
    /// (apenas registrados em log). Idempotente.
    pub fn shutdown(&self) {
        let mut task = lock(&self.task);

        let from = {
            let mut inner = lock(&self.shared);
            let from = inner.state;
            match inner.check(Command::Shutdown) {
                Ok(next) => inner.enter(next),
                Err(_) => return,
            }
            tracing::info!(name = %inner.name, pin = inner.pin, from = %from, "shutting down actuator");
            from
        };

        if let Some(running) = task.take() {
            running.stop();
        }

        let mut inner = lock(&self.shared);
        if let Some(fault) = inner.fault.take() {
            tracing::warn!(pin = inner.pin, %fault, "discarding undelivered hardware fault at shutdown");
        }

        let iterations = inner.iterations;
        if let Err(err) = inner.quiesce(Command::Shutdown) {
            tracing::warn!(pin = inner.pin, error = %err, "hardware teardown incomplete");
        }
        if from == ActuatorState::Dimming {
            inner.emit(DimmingEvent::Stopped { iterations });
        }

        // Solta pino e canal
        drop(inner.hardware.take());
        inner.subscribers.clear();

        if let Err(err) = inner.transition(Command::FinishShutdown) {
            tracing::warn!(pin = inner.pin, error = %err, "unexpected state at end of shutdown");
        }
        tracing::info!(pin = inner.pin, "actuator stopped");
    }

    /// Fotografia consistente (qualquer estado, sem efeitos)
    pub fn get_data(&self) -> ActuatorSnapshot {
        lock(&self.shared).snapshot(&self.calibration)
    }

    /// Estado atual
    pub fn state(&self) -> ActuatorState {
        lock(&self.shared).state
    }

    /// Assina os eventos da dimerização
    pub fn subscribe(&self) -> Receiver<DimmingEvent> {
        let (tx, rx) = unbounded();
        lock(&self.shared).subscribers.push(tx);
        rx
    }

    pub fn calibration(&self) -> &LinearCalibration {
        &self.calibration
    }

    pub fn pin(&self) -> PinId {
        lock(&self.shared).pin
    }

    /// Recolhe uma tarefa que terminou sozinha (falha de hardware)
    fn reap(&self, task: &mut Option<DimmingTask>) {
        if task.is_none() {
            return;
        }
        let state = lock(&self.shared).state;
        if state != ActuatorState::Dimming {
            if let Some(finished) = task.take() {
                finished.join();
            }
        }
    }
}

impl<P, C> Drop for ActuatorController<P, C>
where
    P: DigitalOutputPin + 'static,
    C: PwmChannel + 'static,
{
    fn drop(&mut self) {
        let (state, pin) = {
            let inner = lock(&self.shared);
            (inner.state, inner.pin)
        };
        if !state.is_terminal() {
            tracing::warn!(pin, %state, "actuator dropped without shutdown, releasing hardware");
            self.shutdown();
        }
    }
}

impl<P, C> fmt::Debug for ActuatorController<P, C>
where
    P: DigitalOutputPin + 'static,
    C: PwmChannel + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.shared);
        f.debug_struct("ActuatorController")
            .field("name", &inner.name)
            .field("pin", &inner.pin)
            .field("state", &inner.state)
            .field("calibration", &self.calibration)
            .finish()
    }
}
