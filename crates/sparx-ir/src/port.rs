//! Port names, mode tags and `instance,port` references.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};

/// Separator between a port name and its mode tag (`out0@TE`).
pub const MODE_SEPARATOR: char = '@';

/// Separator between instance and port in a reference (`mmi,out0`).
pub const REF_SEPARATOR: char = ',';

/// Separator between path segments in settings keys (`outer.inner.wl`).
pub const PATH_SEPARATOR: char = '.';

/// A reference to a port on an instance of a netlist.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortRef {
    /// Name of the instance.
    pub instance: String,
    /// Name of the port on that instance.
    pub port: String,
}

impl PortRef {
    /// Create a reference from its parts.
    pub fn new(instance: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            port: port.into(),
        }
    }

    /// Parse an `instance,port` string.
    ///
    /// Surrounding whitespace around either part is ignored.
    pub fn parse(s: &str) -> IrResult<Self> {
        let mut parts = s.split(REF_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(instance), Some(port), None) => {
                let instance = instance.trim();
                let port = port.trim();
                if instance.is_empty() || port.is_empty() {
                    return Err(IrError::InvalidPortRef(s.to_string()));
                }
                Ok(Self::new(instance, port))
            }
            _ => Err(IrError::InvalidPortRef(s.to_string())),
        }
    }

    /// The same reference with the port tagged by `mode`.
    pub fn with_mode(&self, mode: &str) -> Self {
        Self::new(self.instance.clone(), with_mode(&self.port, mode))
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.instance, REF_SEPARATOR, self.port)
    }
}

impl FromStr for PortRef {
    type Err = IrError;

    fn from_str(s: &str) -> IrResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PortRef {
    type Error = IrError;

    fn try_from(s: String) -> IrResult<Self> {
        Self::parse(&s)
    }
}

impl From<PortRef> for String {
    fn from(r: PortRef) -> Self {
        r.to_string()
    }
}

/// Tag `port` with `mode`: `with_mode("out0", "TE") == "out0@TE"`.
pub fn with_mode(port: &str, mode: &str) -> String {
    format!("{port}{MODE_SEPARATOR}{mode}")
}

/// Split a port into its base name and optional mode tag.
pub fn split_mode(port: &str) -> (&str, Option<&str>) {
    match port.split_once(MODE_SEPARATOR) {
        Some((base, mode)) => (base, Some(mode)),
        None => (port, None),
    }
}

/// Whether the port carries a mode tag.
#[inline]
pub fn is_mode_resolved(port: &str) -> bool {
    port.contains(MODE_SEPARATOR)
}

/// Normalize a component name as written in a netlist.
///
/// Anything from the first `$` on is dropped (`coupler$2` names the
/// `coupler` component) and surrounding whitespace is trimmed.
pub fn clean_component_name(name: &str) -> String {
    let base = name.split('$').next().unwrap_or(name);
    base.trim().to_string()
}

/// Reject component names that cannot appear in a netlist.
pub fn validate_component_name(name: &str) -> IrResult<()> {
    if name.contains(REF_SEPARATOR) {
        return Err(IrError::InvalidComponentName(name.to_string()));
    }
    Ok(())
}

/// Reject instance names that would be ambiguous in references or settings paths.
pub fn validate_instance_name(name: &str) -> IrResult<()> {
    let reason = if name.trim().is_empty() {
        Some("must not be empty")
    } else if name.contains(REF_SEPARATOR) {
        Some("must not contain ','")
    } else if name.contains(PATH_SEPARATOR) {
        Some("must not contain '.'")
    } else if name.contains(MODE_SEPARATOR) {
        Some("must not contain '@'")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(IrError::InvalidInstanceName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
