//! # Calibração Linear
//!
//! Função de transferência `duty (%) = m * comando + b`, com saturação.
//!
//! Dois estilos, uma implementação:
//!
//! | Estilo | Domínio | Faixa |
//! |--------|---------|-------|
//! | Direto (LED) | 0..100 % | 0..100 % |
//! | Ângulo → pulso (servo) | `min_angle..max_angle` ° | `min_dc..max_dc` % |
//!
//! Para servos, larguras de pulso (ms) viram percentuais de duty cycle
//! usando a frequência do PWM: `duty% = pulso_ms * freq_hz / 10`
//! (0.5 ms a 50 Hz = 2.5 %).

use std::fmt;

use pwm_core::{MAX_DUTY_CYCLE, MIN_DUTY_CYCLE};
use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, CalibrationResult};

/// Limite de linhas de [`LinearCalibration::transfer_table`]
pub const MAX_TRANSFER_TABLE_ROWS: usize = 100_000;

/// Converte largura de pulso (ms) em duty cycle (%) na frequência dada
pub fn pulse_width_to_duty(pulse_ms: f64, frequency_hz: u32) -> f64 {
    pulse_ms * f64::from(frequency_hz) / 10.0
}

/// Arredonda para uma casa decimal
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Parâmetros de calibração (imutáveis)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// Comando mínimo (graus ou %)
    pub domain_min: f64,
    /// Comando máximo (graus ou %)
    pub domain_max: f64,
    /// Duty cycle em `domain_min` (%)
    pub range_min: f64,
    /// Duty cycle em `domain_max` (%)
    pub range_max: f64,
    /// Frequência do PWM (Hz)
    pub frequency_hz: u32,
}

impl CalibrationParams {
    /// Mapeamento direto: brilho % = duty %
    pub fn direct(frequency_hz: u32) -> Self {
        Self {
            domain_min: 0.0,
            domain_max: 100.0,
            range_min: MIN_DUTY_CYCLE,
            range_max: MAX_DUTY_CYCLE,
            frequency_hz,
        }
    }

    /// Mapeamento ângulo → pulso a partir de larguras de pulso em ms
    pub fn from_pulse_widths(
        min_angle: f64,
        max_angle: f64,
        min_pulse_ms: f64,
        max_pulse_ms: f64,
        frequency_hz: u32,
    ) -> Self {
        Self {
            domain_min: min_angle,
            domain_max: max_angle,
            range_min: pulse_width_to_duty(min_pulse_ms, frequency_hz),
            range_max: pulse_width_to_duty(max_pulse_ms, frequency_hz),
            frequency_hz,
        }
    }

    /// Valida invariantes
    pub fn validate(&self) -> CalibrationResult<()> {
        let fields = [
            ("domain_min", self.domain_min),
            ("domain_max", self.domain_max),
            ("range_min", self.range_min),
            ("range_max", self.range_max),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(CalibrationError::NonFinite(*name));
        }

        if self.frequency_hz == 0 {
            return Err(CalibrationError::InvalidFrequency(self.frequency_hz));
        }

        if self.domain_max == self.domain_min {
            return Err(CalibrationError::DegenerateDomain {
                min: self.domain_min,
                max: self.domain_max,
            });
        }

        if self.range_min < MIN_DUTY_CYCLE || self.range_min > self.range_max || self.range_max > MAX_DUTY_CYCLE {
            return Err(CalibrationError::InvalidRange {
                min: self.range_min,
                max: self.range_max,
            });
        }

        Ok(())
    }
}

/// Função de transferência calculada uma única vez
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearCalibration {
    params: CalibrationParams,
    slope: f64,
    intercept: f64,
}

impl LinearCalibration {
    /// Calcula inclinação e intercepto.
    ///
    /// Falha com [`CalibrationError::DegenerateDomain`] se
    /// `domain_min == domain_max`; não existe fallback para inclinação zero.
    pub fn new(params: CalibrationParams) -> CalibrationResult<Self> {
        params.validate()?;

        let slope = (params.range_max - params.range_min) / (params.domain_max - params.domain_min);
        let intercept = params.range_max - slope * params.domain_max;

        Ok(Self { params, slope, intercept })
    }

    /// Calibração direta (LED)
    pub fn direct(frequency_hz: u32) -> CalibrationResult<Self> {
        Self::new(CalibrationParams::direct(frequency_hz))
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Limites do domínio em ordem crescente
    pub fn domain_bounds(&self) -> (f64, f64) {
        let (a, b) = (self.params.domain_min, self.params.domain_max);
        (a.min(b), a.max(b))
    }

    /// Satura o comando no domínio
    pub fn clamp_command(&self, command: f64) -> f64 {
        let (lo, hi) = self.domain_bounds();
        command.clamp(lo, hi)
    }

    /// Aplica a função de transferência.
    ///
    /// O comando é saturado no domínio *antes* do mapeamento (nunca há
    /// extrapolação) e o resultado é arredondado para uma casa decimal.
    /// `NaN` propaga; use [`try_apply`](Self::try_apply) para rejeitá-lo.
    pub fn apply(&self, command: f64) -> f64 {
        let command = self.clamp_command(command);
        let duty = (self.slope * command + self.intercept).clamp(self.params.range_min, self.params.range_max);
        round_one_decimal(duty)
    }

    /// Como [`apply`](Self::apply), rejeitando `NaN`
    pub fn try_apply(&self, command: f64) -> CalibrationResult<f64> {
        if command.is_nan() {
            return Err(CalibrationError::NonFinite("command"));
        }
        Ok(self.apply(command))
    }

    /// Tabela `(comando, duty)` percorrendo o domínio com o passo dado.
    ///
    /// Vazia se o passo não for positivo e finito, ou se a tabela passar de
    /// [`MAX_TRANSFER_TABLE_ROWS`] linhas.
    pub fn transfer_table(&self, step: f64) -> Vec<(f64, f64)> {
        if !(step.is_finite() && step > 0.0) {
            return Vec::new();
        }

        let (lo, hi) = self.domain_bounds();
        let intervals = ((hi - lo) / step).floor();
        if !(intervals < MAX_TRANSFER_TABLE_ROWS as f64) {
            return Vec::new();
        }
        let count = intervals as usize;
        let mut table: Vec<(f64, f64)> = (0..=count)
            .map(|i| {
                let command = lo + i as f64 * step;
                (command, self.apply(command))
            })
            .collect();

        if table.last().is_some_and(|(command, _)| *command < hi) {
            table.push((hi, self.apply(hi)));
        }
        table
    }
}

impl fmt::Display for LinearCalibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "duty_cycle (%) = {:.6} * x + {:.6}, x in [{}, {}], duty in [{}, {}] @ {}Hz",
            self.slope,
            self.intercept,
            self.params.domain_min,
            self.params.domain_max,
            self.params.range_min,
            self.params.range_max,
            self.params.frequency_hz
        )
    }
}
