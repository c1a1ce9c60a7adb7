//! Device references
//!
//! Programs name their targets abstractly. A resolver later maps each
//! reference to one or more concrete, gateway-addressable devices.

use crate::error::ProgramError;
use serde::{de, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// An abstract device reference in a program
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceRef {
    /// A light by name or id (`light:Desk`)
    Light(String),
    /// A group by name or id (`group:Office`)
    Group(String),
    /// The nth device input given to the run, 1-based (`$2`)
    Input(usize),
    /// Every device input given to the run (`$all`)
    AllInputs,
}

impl FromStr for DeviceRef {
    type Err = ProgramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ProgramError::InvalidDeviceRef(s.to_string());

        if s == "$all" {
            return Ok(DeviceRef::AllInputs);
        }
        if let Some(n) = s.strip_prefix('$') {
            // `$0` and `$01` are not valid inputs
            if n.starts_with('0') {
                return Err(invalid());
            }
            return n.parse().map(DeviceRef::Input).map_err(|_| invalid());
        }

        let (kind, name) = s.split_once(':').ok_or_else(invalid)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid());
        }
        match kind.trim() {
            "light" => Ok(DeviceRef::Light(name.to_string())),
            "group" => Ok(DeviceRef::Group(name.to_string())),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceRef::Light(name) => write!(f, "light:{}", name),
            DeviceRef::Group(name) => write!(f, "group:{}", name),
            DeviceRef::Input(n) => write!(f, "${}", n),
            DeviceRef::AllInputs => write!(f, "$all"),
        }
    }
}

impl<'de> Deserialize<'de> for DeviceRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Deserialize a transition's `devices` field
///
/// Accepts either a flat list of references (`["$1", "light:Desk"]`) or the
/// grouped form:
///
/// ```yaml
/// devices:
///   inputs: $all        # or ["$1", "$3"]
///   lights: ["Desk"]
///   groups: ["Office"]
/// ```
pub(crate) fn deserialize_devices<'de, D>(deserializer: D) -> Result<Option<Vec<DeviceRef>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Inputs {
        One(DeviceRef),
        Many(Vec<DeviceRef>),
    }

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Grouped {
        #[serde(default)]
        inputs: Option<Inputs>,
        #[serde(default)]
        lights: Vec<String>,
        #[serde(default)]
        groups: Vec<String>,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Devices {
        List(Vec<DeviceRef>),
        Grouped(Grouped),
    }

    let refs = match Devices::deserialize(deserializer)? {
        Devices::List(refs) => refs,
        Devices::Grouped(grouped) => {
            let mut refs = match grouped.inputs {
                Some(Inputs::One(r)) => vec![r],
                Some(Inputs::Many(rs)) => rs,
                None => Vec::new(),
            };
            if refs
                .iter()
                .any(|r| matches!(r, DeviceRef::Light(_) | DeviceRef::Group(_)))
            {
                return Err(de::Error::custom(
                    "'devices.inputs' must be '$all' or a list of input variables ($1, $2, ...)",
                ));
            }
            refs.extend(grouped.lights.into_iter().map(DeviceRef::Light));
            refs.extend(grouped.groups.into_iter().map(DeviceRef::Group));
            refs
        }
    };

    Ok(Some(refs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_refs() {
        assert_eq!("$all".parse::<DeviceRef>(), Ok(DeviceRef::AllInputs));
        assert_eq!("$3".parse::<DeviceRef>(), Ok(DeviceRef::Input(3)));
        assert_eq!(
            "light:Bookshelf Left".parse::<DeviceRef>(),
            Ok(DeviceRef::Light("Bookshelf Left".into()))
        );
        assert_eq!(
            "group:Office".parse::<DeviceRef>(),
            Ok(DeviceRef::Group("Office".into()))
        );
    }

    #[test]
    fn test_parse_invalid_device_refs() {
        assert!("$0".parse::<DeviceRef>().is_err());
        assert!("$x".parse::<DeviceRef>().is_err());
        assert!("Desk".parse::<DeviceRef>().is_err());
        assert!("sensor:Hall".parse::<DeviceRef>().is_err());
        assert!("light:".parse::<DeviceRef>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for text in ["$all", "$12", "light:Desk", "group:Upstairs"] {
            let r: DeviceRef = text.parse().unwrap();
            assert_eq!(r.to_string(), text);
        }
    }
}
