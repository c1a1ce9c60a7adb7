//! Device resolution
//!
//! Maps a program's abstract [`DeviceRef`]s to concrete [`Device`]s.

use crate::gateway::{Device, DeviceKind};
use huebot_core::DeviceRef;
use std::collections::HashMap;
use thiserror::Error;

/// A reference that maps to no device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unmapped light '{0}'")]
    UnmappedLight(String),

    #[error("unmapped group '{0}'")]
    UnmappedGroup(String),

    #[error("unmapped device input ${0}")]
    UnmappedInput(usize),

    #[error("$all used but no device inputs were given")]
    NoInputs,
}

/// Maps references to devices
pub trait DeviceResolver: Send + Sync {
    fn resolve(&self, reference: &DeviceRef) -> Result<Vec<Device>, ResolveError>;
}

/// A device input given to a run, by id or name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceInput {
    Light(String),
    Group(String),
}

/// In-memory resolver over a known set of lights and groups
///
/// Lookups try the numeric id first, then the name.
#[derive(Debug, Clone, Default)]
pub struct DeviceMapper {
    lights_by_id: HashMap<u32, Device>,
    lights_by_name: HashMap<String, Device>,
    groups_by_id: HashMap<u32, Device>,
    groups_by_name: HashMap<String, Device>,
    inputs: Vec<Device>,
}

impl DeviceMapper {
    /// Index the given devices by id and name
    pub fn new(devices: impl IntoIterator<Item = Device>) -> Self {
        let mut mapper = Self::default();
        for device in devices {
            let (by_id, by_name) = match device.kind {
                DeviceKind::Light => (&mut mapper.lights_by_id, &mut mapper.lights_by_name),
                DeviceKind::Group => (&mut mapper.groups_by_id, &mut mapper.groups_by_name),
            };
            by_id.insert(device.id, device.clone());
            by_name.insert(device.name.clone(), device);
        }
        mapper
    }

    /// Bind `$1..$n` (and `$all`) to the given inputs, in order
    pub fn with_inputs(mut self, inputs: Vec<DeviceInput>) -> Result<Self, ResolveError> {
        let mut resolved = Vec::with_capacity(inputs.len());
        for input in inputs {
            let device = match &input {
                DeviceInput::Light(key) => self.light(key)?,
                DeviceInput::Group(key) => self.group(key)?,
            };
            resolved.push(device.clone());
        }
        self.inputs = resolved;
        Ok(self)
    }

    /// Devices bound to `$1..$n`
    pub fn inputs(&self) -> &[Device] {
        &self.inputs
    }

    fn light(&self, key: &str) -> Result<&Device, ResolveError> {
        lookup(&self.lights_by_id, &self.lights_by_name, key)
            .ok_or_else(|| ResolveError::UnmappedLight(key.to_string()))
    }

    fn group(&self, key: &str) -> Result<&Device, ResolveError> {
        lookup(&self.groups_by_id, &self.groups_by_name, key)
            .ok_or_else(|| ResolveError::UnmappedGroup(key.to_string()))
    }

    /// Light references among `refs` that map to nothing
    pub fn missing_lights(&self, refs: &[DeviceRef]) -> Vec<String> {
        refs.iter()
            .filter_map(|r| match r {
                DeviceRef::Light(key) if self.light(key).is_err() => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Group references among `refs` that map to nothing
    pub fn missing_groups(&self, refs: &[DeviceRef]) -> Vec<String> {
        refs.iter()
            .filter_map(|r| match r {
                DeviceRef::Group(key) if self.group(key).is_err() => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Input references among `refs` with no bound input
    pub fn missing_inputs(&self, refs: &[DeviceRef]) -> Vec<DeviceRef> {
        refs.iter()
            .filter(|r| match r {
                DeviceRef::Input(n) => *n == 0 || *n > self.inputs.len(),
                DeviceRef::AllInputs => self.inputs.is_empty(),
                _ => false,
            })
            .cloned()
            .collect()
    }
}

fn lookup<'a>(
    by_id: &'a HashMap<u32, Device>,
    by_name: &'a HashMap<String, Device>,
    key: &str,
) -> Option<&'a Device> {
    key.parse::<u32>()
        .ok()
        .and_then(|id| by_id.get(&id))
        .or_else(|| by_name.get(key))
}

impl DeviceResolver for DeviceMapper {
    fn resolve(&self, reference: &DeviceRef) -> Result<Vec<Device>, ResolveError> {
        match reference {
            DeviceRef::Light(key) => Ok(vec![self.light(key)?.clone()]),
            DeviceRef::Group(key) => Ok(vec![self.group(key)?.clone()]),
            DeviceRef::Input(n) => n
                .checked_sub(1)
                .and_then(|i| self.inputs.get(i))
                .map(|d| vec![d.clone()])
                .ok_or(ResolveError::UnmappedInput(*n)),
            DeviceRef::AllInputs if self.inputs.is_empty() => Err(ResolveError::NoInputs),
            DeviceRef::AllInputs => Ok(self.inputs.clone()),
        }
    }
}
