//! Tipos de dados do atuador

use std::fmt;

use pwm_core::PinId;
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationParams;
use crate::dimming::DimmingParams;
use crate::error::HardwareFault;
use crate::state::ActuatorState;

/// Par de duty cycles (atual/anterior) e direção da dimerização
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DutyCycleSample {
    /// Duty cycle atual (%)
    pub current_duty: f64,
    /// Duty cycle anterior (%)
    pub previous_duty: f64,
    /// Passo com sinal (0.0 fora da dimerização)
    pub direction: f64,
}

impl DutyCycleSample {
    pub fn new() -> Self {
        Self {
            current_duty: 0.0,
            previous_duty: 0.0,
            direction: 0.0,
        }
    }

    /// Registra novo duty cycle
    pub fn record(&mut self, duty: f64, direction: f64) {
        self.previous_duty = self.current_duty;
        self.current_duty = duty;
        self.direction = direction;
    }
}

impl Default for DutyCycleSample {
    fn default() -> Self {
        Self::new()
    }
}

/// Resultado de `set_level`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppliedDuty {
    /// Comando pedido
    pub requested: f64,
    /// Comando após saturação no domínio
    pub effective: f64,
    /// Duty cycle escrito no canal (%)
    pub duty: f64,
}

impl AppliedDuty {
    /// O comando foi saturado?
    pub fn was_clamped(&self) -> bool {
        self.requested != self.effective
    }
}

/// Fotografia consistente do atuador (`get_data`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorSnapshot {
    pub name: String,
    pub pin: PinId,
    pub state: ActuatorState,
    pub previous_state: ActuatorState,
    /// Frequência atual do canal (Hz)
    pub frequency_hz: u32,
    pub sample: DutyCycleSample,
    pub calibration: CalibrationParams,
    pub slope: f64,
    pub intercept: f64,
    /// Canal PWM modulando?
    pub channel_active: bool,
    /// Dimerização em curso
    pub dimming: Option<DimmingParams>,
    /// Iterações da última dimerização
    pub iterations: u64,
    /// Mudanças de direção da última dimerização
    pub direction_changes: u64,
    /// Falha ainda não entregue a um comando
    pub fault: Option<HardwareFault>,
}

impl ActuatorSnapshot {
    pub fn current_duty(&self) -> f64 {
        self.sample.current_duty
    }

    pub fn previous_duty(&self) -> f64 {
        self.sample.previous_duty
    }
}

impl fmt::Display for ActuatorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Actuator '{}' dump:", self.name)?;
        writeln!(f, "\tPin: #{}", self.pin)?;
        writeln!(f, "\tFrequency: {}Hz", self.frequency_hz)?;
        writeln!(f, "\tState: {}, previous state: {}", self.state, self.previous_state)?;
        writeln!(f, "\tCurrent duty cycle: {}", self.sample.current_duty)?;
        writeln!(f, "\tPrevious duty cycle: {}", self.sample.previous_duty)?;
        writeln!(
            f,
            "\tCalibration: {}..{} -> {}%..{}%",
            self.calibration.domain_min, self.calibration.domain_max, self.calibration.range_min, self.calibration.range_max
        )?;
        writeln!(
            f,
            "\tTransfer function: duty_cycle (%) = {:.6} * x + {:.6}",
            self.slope, self.intercept
        )?;
        match &self.dimming {
            Some(d) => writeln!(
                f,
                "\tDimming: step {}, period {:?}, direction {}",
                d.step, d.period, self.sample.direction
            )?,
            None => writeln!(f, "\tDimming: off")?,
        }
        writeln!(
            f,
            "\tIterations: {}, direction changes: {}",
            self.iterations, self.direction_changes
        )?;
        if let Some(fault) = &self.fault {
            writeln!(f, "\tPending fault: {}", fault)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_record() {
        let mut sample = DutyCycleSample::new();
        sample.record(7.5, 0.0);
        sample.record(10.0, 0.0);
        assert_eq!(sample.current_duty, 10.0);
        assert_eq!(sample.previous_duty, 7.5);
    }

    #[test]
    fn test_applied_duty_clamped() {
        let applied = AppliedDuty { requested: 200.0, effective: 180.0, duty: 12.5 };
        assert!(applied.was_clamped());

        let applied = AppliedDuty { requested: 90.0, effective: 90.0, duty: 7.5 };
        assert!(!applied.was_clamped());
    }
}
