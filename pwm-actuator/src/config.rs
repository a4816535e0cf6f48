//! Configuração de atuadores (TOML)
//!
//! ```toml
//! name = "pan"
//! pin = 17
//! frequency_hz = 50
//!
//! [calibration]
//! mode = "pulse"
//! min_angle = 0.0
//! max_angle = 180.0
//! min_pulse_ms = 0.5
//! max_pulse_ms = 2.5
//!
//! [dimming]
//! step = 1.0
//! period_us = 10000
//! ```

use std::path::Path;
use std::time::Duration;

use pwm_core::PinId;
use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationParams, LinearCalibration};
use crate::dimming::validate_dimming;
use crate::error::{CalibrationResult, ConfigError, ConfigResult};

/// Frequência padrão para servos (Hz)
pub const DEFAULT_SERVO_FREQUENCY_HZ: u32 = 50;
/// Frequência padrão para LEDs (Hz)
pub const DEFAULT_LED_FREQUENCY_HZ: u32 = 1000;
/// Ângulo mínimo padrão (°)
pub const DEFAULT_MIN_ANGLE: f64 = 0.0;
/// Ângulo máximo padrão (°)
pub const DEFAULT_MAX_ANGLE: f64 = 180.0;
/// Pulso em `DEFAULT_MIN_ANGLE` (ms)
pub const DEFAULT_MIN_PULSE_MS: f64 = 0.5;
/// Pulso em `DEFAULT_MAX_ANGLE` (ms)
pub const DEFAULT_MAX_PULSE_MS: f64 = 2.5;
/// Incremento de duty cycle por passo de dimerização (%)
pub const DEFAULT_DIMMING_STEP: f64 = 1.0;
/// Intervalo entre passos de dimerização (µs)
pub const DEFAULT_DIMMING_PERIOD_US: u64 = 10_000;

/// Estilo de calibração
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CalibrationSpec {
    /// Brilho % = duty %
    #[default]
    Direct,
    /// Ângulo → largura de pulso
    Pulse {
        #[serde(default = "default_min_angle")]
        min_angle: f64,
        #[serde(default = "default_max_angle")]
        max_angle: f64,
        #[serde(default = "default_min_pulse_ms")]
        min_pulse_ms: f64,
        #[serde(default = "default_max_pulse_ms")]
        max_pulse_ms: f64,
    },
    /// Parâmetros explícitos
    Linear {
        domain_min: f64,
        domain_max: f64,
        range_min: f64,
        range_max: f64,
    },
}

impl CalibrationSpec {
    /// Pulso padrão de servo (0–180°, 0.5–2.5 ms)
    pub fn standard_servo() -> Self {
        CalibrationSpec::Pulse {
            min_angle: DEFAULT_MIN_ANGLE,
            max_angle: DEFAULT_MAX_ANGLE,
            min_pulse_ms: DEFAULT_MIN_PULSE_MS,
            max_pulse_ms: DEFAULT_MAX_PULSE_MS,
        }
    }

    /// Parâmetros concretos na frequência dada
    pub fn params(&self, frequency_hz: u32) -> CalibrationParams {
        match *self {
            CalibrationSpec::Direct => CalibrationParams::direct(frequency_hz),
            CalibrationSpec::Pulse {
                min_angle,
                max_angle,
                min_pulse_ms,
                max_pulse_ms,
            } => CalibrationParams::from_pulse_widths(min_angle, max_angle, min_pulse_ms, max_pulse_ms, frequency_hz),
            CalibrationSpec::Linear {
                domain_min,
                domain_max,
                range_min,
                range_max,
            } => CalibrationParams {
                domain_min,
                domain_max,
                range_min,
                range_max,
                frequency_hz,
            },
        }
    }
}

/// Parâmetros padrão da dimerização
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimmingConfig {
    /// Incremento por passo (%)
    #[serde(default = "default_step")]
    pub step: f64,
    /// Intervalo entre passos (µs)
    #[serde(default = "default_period_us")]
    pub period_us: u64,
}

impl DimmingConfig {
    pub fn period(&self) -> Duration {
        Duration::from_micros(self.period_us)
    }
}

impl Default for DimmingConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_DIMMING_STEP,
            period_us: DEFAULT_DIMMING_PERIOD_US,
        }
    }
}

/// Configuração completa de um atuador
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// Nome (para logs)
    #[serde(default = "default_name")]
    pub name: String,
    /// Pino do atuador
    pub pin: PinId,
    /// Frequência do PWM (Hz)
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: u32,
    /// Função de transferência
    #[serde(default)]
    pub calibration: CalibrationSpec,
    /// Padrões da dimerização
    #[serde(default)]
    pub dimming: DimmingConfig,
}

impl ActuatorConfig {
    /// LED: 1000 Hz, mapeamento direto
    pub fn led(pin: PinId) -> Self {
        Self {
            name: format!("led-{}", pin),
            pin,
            frequency_hz: DEFAULT_LED_FREQUENCY_HZ,
            calibration: CalibrationSpec::Direct,
            dimming: DimmingConfig::default(),
        }
    }

    /// Servo: 50 Hz, 0–180°, 0.5–2.5 ms
    pub fn servo(pin: PinId) -> Self {
        Self {
            name: format!("servo-{}", pin),
            pin,
            frequency_hz: DEFAULT_SERVO_FREQUENCY_HZ,
            calibration: CalibrationSpec::standard_servo(),
            dimming: DimmingConfig::default(),
        }
    }

    /// Define o nome
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Define a calibração
    pub fn with_calibration(mut self, calibration: CalibrationSpec) -> Self {
        self.calibration = calibration;
        self
    }

    /// Define a dimerização padrão (período com resolução de µs)
    pub fn with_dimming(mut self, step: f64, period: Duration) -> Self {
        self.dimming = DimmingConfig {
            step,
            period_us: u64::try_from(period.as_micros()).unwrap_or(u64::MAX),
        };
        self
    }

    /// Parâmetros de calibração concretos
    pub fn calibration_params(&self) -> CalibrationParams {
        self.calibration.params(self.frequency_hz)
    }

    /// Calcula a função de transferência
    pub fn calibration(&self) -> CalibrationResult<LinearCalibration> {
        LinearCalibration::new(self.calibration_params())
    }

    /// Valida calibração e dimerização
    pub fn validate(&self) -> ConfigResult<()> {
        self.calibration()?;
        validate_dimming(self.dimming.step, self.dimming.period()).map_err(ConfigError::Invalid)?;
        Ok(())
    }

    /// Lê de uma string TOML
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Lê de um arquivo TOML
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Serializa para TOML
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

fn default_name() -> String {
    "actuator".to_string()
}

fn default_frequency_hz() -> u32 {
    DEFAULT_LED_FREQUENCY_HZ
}

fn default_min_angle() -> f64 {
    DEFAULT_MIN_ANGLE
}

fn default_max_angle() -> f64 {
    DEFAULT_MAX_ANGLE
}

fn default_min_pulse_ms() -> f64 {
    DEFAULT_MIN_PULSE_MS
}

fn default_max_pulse_ms() -> f64 {
    DEFAULT_MAX_PULSE_MS
}

fn default_step() -> f64 {
    DEFAULT_DIMMING_STEP
}

fn default_period_us() -> u64 {
    DEFAULT_DIMMING_PERIOD_US
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_servo_preset() {
        let config = ActuatorConfig::servo(17);
        assert_eq!(config.frequency_hz, 50);
        let params = config.calibration_params();
        assert_eq!(params.range_min, 2.5);
        assert_eq!(params.range_max, 12.5);
        assert_eq!(config.calibration().unwrap().apply(90.0), 7.5);
    }

    #[test]
    fn test_led_preset() {
        let config = ActuatorConfig::led(11);
        assert_eq!(config.frequency_hz, 1000);
        assert_eq!(config.calibration, CalibrationSpec::Direct);
        assert_eq!(config.dimming.period(), Duration::from_millis(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config = ActuatorConfig::from_toml_str("pin = 12").unwrap();
        assert_eq!(config.pin, 12);
        assert_eq!(config.name, "actuator");
        assert_eq!(config.frequency_hz, DEFAULT_LED_FREQUENCY_HZ);
        assert_eq!(config.calibration, CalibrationSpec::Direct);
        assert_eq!(config.dimming, DimmingConfig::default());
    }

    #[test]
    fn test_pulse_toml() {
        let content = r#"
            name = "pan"
            pin = 17
            frequency_hz = 50

            [calibration]
            mode = "pulse"
            min_angle = 0.0
            max_angle = 90.0

            [dimming]
            step = 0.2
            period_us = 5000
        "#;
        let config = ActuatorConfig::from_toml_str(content).unwrap();
        assert_eq!(config.name, "pan");
        assert_eq!(
            config.calibration,
            CalibrationSpec::Pulse {
                min_angle: 0.0,
                max_angle: 90.0,
                min_pulse_ms: DEFAULT_MIN_PULSE_MS,
                max_pulse_ms: DEFAULT_MAX_PULSE_MS,
            }
        );
        assert_eq!(config.dimming.step, 0.2);
        assert_eq!(config.calibration().unwrap().apply(45.0), 7.5);
    }

    #[test]
    fn test_degenerate_toml_rejected() {
        let content = r#"
            pin = 17

            [calibration]
            mode = "linear"
            domain_min = 10.0
            domain_max = 10.0
            range_min = 0.0
            range_max = 100.0
        "#;
        let err = ActuatorConfig::from_toml_str(content).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("Degenerate")));
    }

    #[test]
    fn test_invalid_dimming_rejected() {
        let content = "pin = 3\n[dimming]\nstep = 0.0\n";
        assert!(matches!(
            ActuatorConfig::from_toml_str(content),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ActuatorConfig::from_toml_str("pin = \"seventeen\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip_through_file() {
        let config = ActuatorConfig::servo(18).with_name("tilt");
        let text = config.to_toml_string().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();

        let loaded = ActuatorConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_with_dimming_keeps_sub_millisecond_period() {
        let config = ActuatorConfig::led(7).with_dimming(1.0, Duration::from_micros(500));
        assert_eq!(config.dimming.period(), Duration::from_micros(500));
        assert!(config.validate().is_ok());

        let config = ActuatorConfig::led(7).with_dimming(1.0, Duration::from_micros(1500));
        assert_eq!(config.dimming.period(), Duration::from_micros(1500));

        let text = config.to_toml_string().unwrap();
        assert!(text.contains("period_us = 1500"));
        assert_eq!(ActuatorConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let err = ActuatorConfig::from_file(Path::new("/nonexistent/actuator.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
