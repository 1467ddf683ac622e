//! Netlist instances and their component references.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::port::{clean_component_name, validate_component_name};
use crate::settings::Settings;

use super::Netlist;

/// What an instance is made of: a named component or an inline netlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentRef {
    /// A component resolved by name against model sources or sibling netlists.
    Name(String),
    /// A netlist nested directly inside the instance.
    Netlist(Box<Netlist>),
}

impl ComponentRef {
    /// The component name, if this is a named reference.
    pub fn name(&self) -> Option<&str> {
        match self {
            ComponentRef::Name(name) => Some(name),
            ComponentRef::Netlist(_) => None,
        }
    }

    /// The inline netlist, if any.
    pub fn netlist(&self) -> Option<&Netlist> {
        match self {
            ComponentRef::Name(_) => None,
            ComponentRef::Netlist(net) => Some(net.as_ref()),
        }
    }
}

/// One placed component with its netlist-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawInstance")]
pub struct Instance {
    /// The component this instance uses.
    pub component: ComponentRef,
    /// Parameter overrides fixed by the netlist.
    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    pub settings: Settings,
}

impl Instance {
    /// An instance of a named component with no overrides.
    ///
    /// The name is cleaned the same way as in netlist files.
    pub fn new(component: &str) -> Self {
        Self {
            component: ComponentRef::Name(clean_component_name(component)),
            settings: Settings::new(),
        }
    }

    /// An instance wrapping an inline netlist.
    pub fn netlist(netlist: Netlist) -> Self {
        Self {
            component: ComponentRef::Netlist(Box::new(netlist)),
            settings: Settings::new(),
        }
    }

    /// Builder-style settings override.
    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Builder-style single setting.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<crate::Param>) -> Self {
        self.settings.insert(key, value);
        self
    }

    /// The component name, if this is a named reference.
    pub fn component_name(&self) -> Option<&str> {
        self.component.name()
    }
}

/// Every form an instance may take in a netlist file.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawInstance {
    Name(String),
    Full {
        component: ComponentRef,
        #[serde(default)]
        settings: Settings,
    },
    Inline(Box<Netlist>),
}

impl TryFrom<RawInstance> for Instance {
    type Error = IrError;

    fn try_from(raw: RawInstance) -> IrResult<Self> {
        let (component, settings) = match raw {
            RawInstance::Name(name) => (ComponentRef::Name(name), Settings::new()),
            RawInstance::Full {
                component,
                settings,
            } => (component, settings),
            RawInstance::Inline(net) => (ComponentRef::Netlist(net), Settings::new()),
        };
        let component = match component {
            ComponentRef::Name(name) => {
                validate_component_name(&name)?;
                ComponentRef::Name(clean_component_name(&name))
            }
            other => other,
        };
        Ok(Self {
            component,
            settings,
        })
    }
}
