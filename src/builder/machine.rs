//! Builder for constructing machines.

use crate::engine::{Fsm, Marshal};
use serde::{Deserialize, Serialize};

/// Settings of a machine that an application may keep in its own
/// configuration files.
///
/// # Example
///
/// ```rust
/// use gesture_fsm::builder::FsmConfig;
///
/// let config: FsmConfig = serde_json::from_str(r#"{ "name": "drag", "log": true }"#).unwrap();
/// assert_eq!(config.name, "drag");
/// assert!(config.log);
///
/// let defaults: FsmConfig = serde_json::from_str("{}").unwrap();
/// assert_eq!(defaults, FsmConfig::default());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsmConfig {
    /// Diagnostic name, used as the `fsm` field of log events
    pub name: String,
    /// Whether the diagnostic log starts enabled
    pub log: bool,
}

impl Default for FsmConfig {
    fn default() -> Self {
        Self {
            name: "fsm".to_string(),
            log: false,
        }
    }
}

/// Builder for constructing machines with a fluent API.
///
/// States and transitions are added on the built [`Fsm`], since their handles
/// are issued by the machine that owns them.
pub struct FsmBuilder {
    config: FsmConfig,
    marshal: Option<Marshal>,
}

impl FsmBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: FsmConfig::default(),
            marshal: None,
        }
    }

    /// Set the diagnostic name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Enable or disable the diagnostic log.
    pub fn log(mut self, enabled: bool) -> Self {
        self.config.log = enabled;
        self
    }

    /// Replace every setting at once.
    pub fn config(mut self, config: FsmConfig) -> Self {
        self.config = config;
        self
    }

    /// Hand elapsed timeouts to the owning context through this hook instead
    /// of the machine's internal channel.
    pub fn marshal(mut self, marshal: Marshal) -> Self {
        self.marshal = Some(marshal);
        self
    }

    /// Build the machine.
    pub fn build<E>(self) -> Fsm<E> {
        let mut fsm = Fsm::named(self.config.name);
        fsm.log(self.config.log);
        if let Some(marshal) = self.marshal {
            fsm.set_marshal(marshal);
        }
        fsm
    }
}

impl Default for FsmBuilder {
    fn default() -> Self {
        Self::new()
    }
}
