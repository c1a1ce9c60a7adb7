//! Step tree
//!
//! A program is a tree of steps. Leaves are transitions that push a state to
//! devices; inner nodes run their children in order (serial) or all at once
//! (parallel), repeated according to their [`Loop`].

use crate::device_ref::{deserialize_devices, DeviceRef};
use crate::device_state::DeviceState;
use crate::error::ProgramError;
use crate::looping::Loop;
use crate::timing::Pause;
use serde::Deserialize;

/// Leaf step: apply one state to a set of devices
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transition {
    /// Target state
    pub state: DeviceState,

    /// Explicit targets; the run's default targets are used when absent
    #[serde(default, deserialize_with = "deserialize_devices")]
    pub devices: Option<Vec<DeviceRef>>,

    /// Block until the device acknowledges the transition
    #[serde(default)]
    pub wait: bool,

    /// Delays around the dispatch
    #[serde(default)]
    pub pause: Pause,
}

impl Transition {
    pub fn new(state: DeviceState) -> Self {
        Self {
            state,
            devices: None,
            wait: false,
            pause: Pause::default(),
        }
    }

    pub fn on(mut self, devices: Vec<DeviceRef>) -> Self {
        self.devices = Some(devices);
        self
    }

    pub fn waiting(mut self) -> Self {
        self.wait = true;
        self
    }

    pub fn with_pause(mut self, pause: Pause) -> Self {
        self.pause = pause;
        self
    }
}

/// Inner step: children plus repetition and pauses
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Composite {
    /// Children, in program order
    pub steps: Vec<Step>,

    /// Repetition of the whole child pass
    #[serde(default)]
    pub r#loop: Loop,

    /// Delays around each pass
    #[serde(default)]
    pub pause: Pause,
}

impl Composite {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            r#loop: Loop::default(),
            pause: Pause::default(),
        }
    }

    pub fn with_loop(mut self, repeat: Loop) -> Self {
        self.r#loop = repeat;
        self
    }

    pub fn with_pause(mut self, pause: Pause) -> Self {
        self.pause = pause;
        self
    }
}

/// A step: exactly one of transition, serial or parallel
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Transition(Transition),
    Serial(Composite),
    Parallel(Composite),
}

impl Step {
    /// Short name of the step kind
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Transition(_) => "transition",
            Step::Serial(_) => "serial",
            Step::Parallel(_) => "parallel",
        }
    }

    /// Collect every configuration error in the tree
    ///
    /// An empty result means the tree can run.
    pub fn validate(&self) -> Vec<ProgramError> {
        let mut errors = Vec::new();
        self.validate_at(self.kind().to_string(), &mut errors);
        errors
    }

    fn validate_at(&self, path: String, errors: &mut Vec<ProgramError>) {
        match self {
            Step::Transition(t) => {
                if let Err(reason) = t.state.check() {
                    errors.push(ProgramError::InvalidState {
                        path: path.clone(),
                        reason,
                    });
                }
                if matches!(&t.devices, Some(devices) if devices.is_empty()) {
                    errors.push(ProgramError::EmptyDevices { path: path.clone() });
                }
                if let Err(e) = t.pause.check(&path) {
                    errors.push(e);
                }
            }
            Step::Serial(c) | Step::Parallel(c) => {
                if c.steps.is_empty() {
                    errors.push(ProgramError::EmptySteps {
                        path: path.clone(),
                        kind: self.kind(),
                    });
                }
                if let Err(e) = c.r#loop.check(&path) {
                    errors.push(e);
                }
                if let Err(e) = c.pause.check(&path) {
                    errors.push(e);
                }
                for (i, child) in c.steps.iter().enumerate() {
                    child.validate_at(format!("{}.steps[{}].{}", path, i, child.kind()), errors);
                }
            }
        }
    }

    /// Every explicit device reference in the tree, without duplicates
    pub fn device_refs(&self) -> Vec<DeviceRef> {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs(&self, refs: &mut Vec<DeviceRef>) {
        match self {
            Step::Transition(t) => {
                for r in t.devices.iter().flatten() {
                    if !refs.contains(r) {
                        refs.push(r.clone());
                    }
                }
            }
            Step::Serial(c) | Step::Parallel(c) => {
                for child in &c.steps {
                    child.collect_refs(refs);
                }
            }
        }
    }
}

/// A named step tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(flatten)]
    pub step: Step,
}

impl Program {
    pub fn new(name: impl Into<String>, step: Step) -> Self {
        Self {
            name: Some(name.into()),
            step,
        }
    }

    /// Name shown in logs and run events
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}

impl From<Step> for Program {
    fn from(step: Step) -> Self {
        Self { name: None, step }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::looping::LoopMode;
    use crate::timing::TimeOption;

    fn light(name: &str) -> DeviceRef {
        DeviceRef::Light(name.to_string())
    }

    fn on(name: &str) -> Step {
        Step::Transition(Transition::new(DeviceState::new().with_on(true)).on(vec![light(name)]))
    }

    #[test]
    fn test_valid_tree() {
        let step = Step::Serial(Composite::new(vec![
            on("Desk"),
            Step::Parallel(Composite::new(vec![on("Lamp"), on("Desk")])),
        ]));
        assert!(step.validate().is_empty());
    }

    #[test]
    fn test_validate_collects_nested_errors() {
        let step = Step::Serial(Composite::new(vec![
            on("Desk"),
            Step::Parallel(
                Composite::new(vec![]).with_loop(Loop::new(LoopMode::Random { min: 4, max: 1 })),
            ),
            Step::Transition(
                Transition::new(DeviceState::new())
                    .with_pause(Pause::after(TimeOption::seconds(-2.0))),
            ),
        ]));

        let errors = step.validate();
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors[0],
            ProgramError::EmptySteps {
                path: "serial.steps[1].parallel".to_string(),
                kind: "parallel",
            }
        );
        assert!(matches!(
            &errors[1],
            ProgramError::InvertedRange { path, .. } if path == "serial.steps[1].parallel.loop.random"
        ));
        assert!(matches!(
            &errors[2],
            ProgramError::InvalidTime { path, .. } if path == "serial.steps[2].transition.pause.after"
        ));
    }

    #[test]
    fn test_empty_device_list_is_rejected() {
        let step = Step::Transition(Transition::new(DeviceState::new()).on(vec![]));
        assert_eq!(
            step.validate(),
            vec![ProgramError::EmptyDevices {
                path: "transition".to_string()
            }]
        );
    }

    #[test]
    fn test_device_refs_are_deduplicated() {
        let step = Step::Serial(Composite::new(vec![on("Desk"), on("Lamp"), on("Desk")]));
        assert_eq!(step.device_refs(), vec![light("Desk"), light("Lamp")]);
    }
}
