//! Sliders, buttons and named variables
//!
//! Control values share one namespace and are captured in every snapshot,
//! so an observer can see which inputs were active at any recorded time.

use std::collections::BTreeMap;

use crate::error::ControlError;

/// A bounded numeric input
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slider {
    pub min: f64,
    pub max: f64,
    value: f64,
}

impl Slider {
    pub fn value(&self) -> f64 {
        self.value
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Control {
    Slider(Slider),
    Button(bool),
    Variable(f64),
}

impl Control {
    fn value(&self) -> f64 {
        match self {
            Control::Slider(s) => s.value,
            Control::Button(pressed) => f64::from(u8::from(*pressed)),
            Control::Variable(v) => *v,
        }
    }
}

/// Every control of a world, keyed by name
#[derive(Clone, Debug, Default)]
pub struct Controls {
    controls: BTreeMap<String, Control>,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slider; `initial` is clamped into `[min, max]`
    pub fn add_slider(&mut self, name: &str, min: f64, max: f64, initial: f64) -> Result<(), ControlError> {
        if !(min.is_finite() && max.is_finite() && min <= max) {
            return Err(ControlError::InvalidParameter(format!(
                "slider '{name}' needs finite min <= max, got [{min}, {max}]"
            )));
        }
        if !initial.is_finite() {
            return Err(ControlError::InvalidParameter(format!("slider '{name}' initial value is not finite")));
        }
        self.check_free(name)?;
        let value = initial.clamp(min, max);
        self.controls
            .insert(name.to_string(), Control::Slider(Slider { min, max, value }));
        Ok(())
    }

    /// Move a slider and return the clamped value it now holds
    pub fn set_slider(&mut self, name: &str, value: f64) -> Result<f64, ControlError> {
        if !value.is_finite() {
            return Err(ControlError::InvalidParameter(format!("slider '{name}' value is not finite")));
        }
        match self.controls.get_mut(name) {
            Some(Control::Slider(slider)) => {
                slider.value = value.clamp(slider.min, slider.max);
                Ok(slider.value)
            }
            _ => Err(ControlError::UnknownControl(name.to_string())),
        }
    }

    pub fn slider(&self, name: &str) -> Option<&Slider> {
        match self.controls.get(name) {
            Some(Control::Slider(slider)) => Some(slider),
            _ => None,
        }
    }

    pub fn add_button(&mut self, name: &str) -> Result<(), ControlError> {
        self.check_free(name)?;
        self.controls.insert(name.to_string(), Control::Button(false));
        Ok(())
    }

    pub fn set_button(&mut self, name: &str, pressed: bool) -> Result<(), ControlError> {
        match self.controls.get_mut(name) {
            Some(Control::Button(state)) => {
                *state = pressed;
                Ok(())
            }
            _ => Err(ControlError::UnknownControl(name.to_string())),
        }
    }

    pub fn is_pressed(&self, name: &str) -> Option<bool> {
        match self.controls.get(name) {
            Some(Control::Button(pressed)) => Some(*pressed),
            _ => None,
        }
    }

    /// Record a free-form value, creating the variable on first use
    pub fn set_variable(&mut self, name: &str, value: f64) -> Result<(), ControlError> {
        if !value.is_finite() {
            return Err(ControlError::InvalidParameter(format!("variable '{name}' is not finite")));
        }
        match self.controls.get_mut(name) {
            Some(Control::Variable(v)) => *v = value,
            Some(_) => {
                return Err(ControlError::InvalidParameter(format!(
                    "'{name}' is a slider or button, not a variable"
                )))
            }
            None => {
                self.controls.insert(name.to_string(), Control::Variable(value));
            }
        }
        Ok(())
    }

    /// Current value of any control; buttons read as 0 or 1
    pub fn value(&self, name: &str) -> Option<f64> {
        self.controls.get(name).map(Control::value)
    }

    pub fn remove(&mut self, name: &str) -> Result<(), ControlError> {
        self.controls
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ControlError::UnknownControl(name.to_string()))
    }

    /// Every current value, as captured in snapshots
    pub fn values(&self) -> BTreeMap<String, f64> {
        self.controls
            .iter()
            .map(|(name, control)| (name.clone(), control.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    fn check_free(&self, name: &str) -> Result<(), ControlError> {
        if name.is_empty() {
            return Err(ControlError::InvalidParameter("control name is empty".into()));
        }
        if self.controls.contains_key(name) {
            return Err(ControlError::InvalidParameter(format!("control '{name}' already exists")));
        }
        Ok(())
    }
}
