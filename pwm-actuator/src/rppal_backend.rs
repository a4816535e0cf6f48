//! # Backend Raspberry Pi (rppal)
//!
//! Saída digital + PWM por software sobre um único `rppal::gpio::OutputPin`.
//! O PWM por software do rppal recebe frequência (Hz) e duty cycle como
//! fração `0.0..=1.0`; aqui o duty cycle chega em percentual.
//!
//! ```rust,ignore
//! use pwm_actuator::{ActuatorConfig, ActuatorController, RppalOutput};
//!
//! let (pin, pwm) = RppalOutput::claim(18)?;
//! let led = ActuatorController::initialize(pin, pwm, &ActuatorConfig::led(18))?;
//! led.start_dimming_default()?;
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pwm_core::{DigitalOutputPin, HardwareError, HardwareResult, PinId, PinLevel, PwmChannel};
use rppal::gpio::{self, Gpio, OutputPin};

type SharedPin = Arc<Mutex<OutputPin>>;

fn lock(pin: &SharedPin) -> MutexGuard<'_, OutputPin> {
    pin.lock().unwrap_or_else(PoisonError::into_inner)
}

fn map_gpio_error(pin: PinId, err: gpio::Error) -> HardwareError {
    match err {
        gpio::Error::PinUsed(_) => HardwareError::Busy { pin },
        other => HardwareError::Unavailable {
            pin,
            reason: other.to_string(),
        },
    }
}

fn check_pin(bound: PinId, pin: PinId) -> HardwareResult<()> {
    if pin != bound {
        return Err(HardwareError::Unavailable {
            pin,
            reason: format!("handle is bound to GPIO {}", bound),
        });
    }
    Ok(())
}

/// Fábrica de handles rppal
pub struct RppalOutput;

impl RppalOutput {
    /// Reivindica o GPIO (numeração BCM) e devolve o par pino/canal.
    ///
    /// O pino começa em nível baixo. Um GPIO já em uso em outro ponto do
    /// processo resulta em [`HardwareError::Busy`].
    pub fn claim(pin: PinId) -> HardwareResult<(RppalPin, RppalPwm)> {
        let gpio = Gpio::new().map_err(|e| map_gpio_error(pin, e))?;
        let output = gpio.get(pin).map_err(|e| map_gpio_error(pin, e))?.into_output_low();
        tracing::debug!(pin, "rppal: GPIO claimed");

        let shared = Arc::new(Mutex::new(output));
        Ok((
            RppalPin {
                pin,
                output: Arc::clone(&shared),
            },
            RppalPwm {
                pin,
                output: shared,
                frequency_hz: None,
                duty: 0.0,
                running: false,
            },
        ))
    }
}

/// Lado digital do GPIO
pub struct RppalPin {
    pin: PinId,
    output: SharedPin,
}

impl DigitalOutputPin for RppalPin {
    fn configure_as_output(&mut self, pin: PinId) -> HardwareResult<()> {
        // `claim` já entrega o pino como saída
        check_pin(self.pin, pin)
    }

    fn write_level(&mut self, pin: PinId, level: PinLevel) -> HardwareResult<()> {
        check_pin(self.pin, pin)?;
        let mut output = lock(&self.output);
        match level {
            PinLevel::Low => output.set_low(),
            PinLevel::High => output.set_high(),
        }
        Ok(())
    }
}

/// Lado PWM (por software) do GPIO
pub struct RppalPwm {
    pin: PinId,
    output: SharedPin,
    frequency_hz: Option<u32>,
    duty: f64,
    running: bool,
}

impl RppalPwm {
    fn frequency(&self) -> HardwareResult<u32> {
        self.frequency_hz.ok_or(HardwareError::NotOpen { pin: self.pin })
    }

    fn apply(&mut self, frequency_hz: u32, duty: f64) -> HardwareResult<()> {
        if !pwm_core::traits::is_valid_duty(duty) {
            return Err(HardwareError::InvalidDutyCycle { pin: self.pin, duty });
        }
        lock(&self.output)
            .set_pwm_frequency(f64::from(frequency_hz), duty / 100.0)
            .map_err(|e| HardwareError::WriteFailed {
                pin: self.pin,
                reason: e.to_string(),
            })?;
        self.duty = duty;
        Ok(())
    }
}

impl PwmChannel for RppalPwm {
    fn open(&mut self, pin: PinId, frequency_hz: u32) -> HardwareResult<()> {
        check_pin(self.pin, pin)?;
        if frequency_hz == 0 {
            return Err(HardwareError::InvalidFrequency { pin, hz: frequency_hz });
        }
        self.frequency_hz = Some(frequency_hz);
        Ok(())
    }

    fn start(&mut self, initial_duty: f64) -> HardwareResult<()> {
        let frequency_hz = self.frequency()?;
        self.apply(frequency_hz, initial_duty)?;
        self.running = true;
        Ok(())
    }

    fn set_duty_cycle(&mut self, duty: f64) -> HardwareResult<()> {
        let frequency_hz = self.frequency()?;
        if !self.running {
            return Err(HardwareError::WriteFailed {
                pin: self.pin,
                reason: "software PWM is not running".into(),
            });
        }
        self.apply(frequency_hz, duty)
    }

    fn set_frequency(&mut self, frequency_hz: u32) -> HardwareResult<()> {
        self.frequency()?;
        if frequency_hz == 0 {
            return Err(HardwareError::InvalidFrequency { pin: self.pin, hz: frequency_hz });
        }
        self.frequency_hz = Some(frequency_hz);
        if self.running {
            let duty = self.duty;
            self.apply(frequency_hz, duty)?;
        }
        Ok(())
    }

    fn stop(&mut self) -> HardwareResult<()> {
        self.frequency()?;
        lock(&self.output).clear_pwm().map_err(|e| HardwareError::WriteFailed {
            pin: self.pin,
            reason: e.to_string(),
        })?;
        self.running = false;
        tracing::debug!(pin = self.pin, "rppal: software PWM cleared");
        Ok(())
    }
}
