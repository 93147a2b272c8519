// Command registry: every menu entry is a `PluginDescriptor` registered at
// startup under a short selector. The role of a command is fixed by which
// `Action` variant it is built with, and each variant has its own input and
// output contract.

use anyhow::Result;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::api::ActivitySource;
use crate::dispatch::SessionState;
use crate::model::{ActivityRecord, MergedTrace};
use serde_json::Value;

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("selector `{0}` is already registered")]
    DuplicateSelector(Selector),
    #[error("unknown command `{0}`")]
    UnknownSelector(String),
    #[error("invalid selector {0:?}: must be non-empty and contain no whitespace")]
    InvalidSelector(String),
}

/// Short, case-sensitive menu key. Selectors starting with a digit sort
/// before those starting with a letter; otherwise ordering is lexical.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Selector(String);

impl Selector {
    pub fn new(raw: &str) -> Result<Self, RegistryError> {
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidSelector(raw.to_string()));
        }
        Ok(Selector(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn class(&self) -> u8 {
        match self.0.chars().next() {
            Some(c) if c.is_ascii_digit() => 0,
            Some(c) if c.is_alphabetic() => 1,
            _ => 2,
        }
    }
}

impl Ord for Selector {
    fn cmp(&self, other: &Self) -> Ordering {
        self.class()
            .cmp(&other.class())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Selector {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Retrieval,
    Processing,
    SecondaryProcessing,
    Visualization,
    Generic,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Retrieval => "retrieval",
            Role::Processing => "processing",
            Role::SecondaryProcessing => "secondary processing",
            Role::Visualization => "visualization",
            Role::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// What a retrieval command produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Retrieved {
    Activities(Vec<ActivityRecord>),
    Data(Value),
    Nothing,
}

/// Fetches data from the tracker. With `display` off the command must print
/// nothing and only return the data.
pub trait RetrievalCommand {
    fn execute(&self, source: &dyn ActivitySource, display: bool) -> Result<Retrieved>;
}

/// Turns a raw activity set into the set handed to secondary processing.
pub trait ProcessingCommand {
    fn execute(
        &self,
        source: &dyn ActivitySource,
        activities: Vec<ActivityRecord>,
        display: bool,
    ) -> Result<Vec<ActivityRecord>>;
}

/// Builds a merged trace from processed activities; `None` when there is
/// nothing to merge.
pub trait SecondaryProcessingCommand {
    fn execute(
        &self,
        source: &dyn ActivitySource,
        activities: &[ActivityRecord],
        display: bool,
    ) -> Result<Option<MergedTrace>>;
}

/// Produces an artifact from a merged trace. May enrich the trace in place.
pub trait VisualizationCommand {
    fn execute(&self, trace: &mut MergedTrace, display: bool) -> Result<PathBuf>;
}

/// Anything else; sees the session but cannot change it.
pub trait GenericCommand {
    fn execute(&self, session: &SessionState, display: bool) -> Result<()>;
}

pub enum Action {
    Retrieval(Box<dyn RetrievalCommand>),
    Processing(Box<dyn ProcessingCommand>),
    SecondaryProcessing(Box<dyn SecondaryProcessingCommand>),
    Visualization(Box<dyn VisualizationCommand>),
    Generic(Box<dyn GenericCommand>),
}

impl Action {
    pub fn role(&self) -> Role {
        match self {
            Action::Retrieval(_) => Role::Retrieval,
            Action::Processing(_) => Role::Processing,
            Action::SecondaryProcessing(_) => Role::SecondaryProcessing,
            Action::Visualization(_) => Role::Visualization,
            Action::Generic(_) => Role::Generic,
        }
    }
}

pub struct PluginDescriptor {
    selector: Selector,
    label: String,
    action: Action,
}

impl PluginDescriptor {
    pub fn new(selector: &str, label: &str, action: Action) -> Result<Self, RegistryError> {
        Ok(PluginDescriptor {
            selector: Selector::new(selector)?,
            label: label.to_string(),
            action,
        })
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn role(&self) -> Role {
        self.action.role()
    }

    pub fn action(&self) -> &Action {
        &self.action
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("selector", &self.selector)
            .field("label", &self.label)
            .field("role", &self.role())
            .finish()
    }
}

/// All commands of a session, keyed and ordered by selector. Populated once
/// at startup and only read afterwards.
#[derive(Default)]
pub struct Registry {
    plugins: BTreeMap<Selector, PluginDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: PluginDescriptor) -> Result<(), RegistryError> {
        if self.plugins.contains_key(descriptor.selector()) {
            return Err(RegistryError::DuplicateSelector(descriptor.selector.clone()));
        }
        self.plugins.insert(descriptor.selector.clone(), descriptor);
        Ok(())
    }

    pub fn resolve(&self, selector: &str) -> Result<&PluginDescriptor, RegistryError> {
        Selector::new(selector)
            .ok()
            .and_then(|key| self.plugins.get(&key))
            .ok_or_else(|| RegistryError::UnknownSelector(selector.to_string()))
    }

    pub fn list_by_role(&self, role: Role) -> Vec<&PluginDescriptor> {
        self.plugins.values().filter(|p| p.role() == role).collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.values()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl GenericCommand for Noop {
        fn execute(&self, _session: &SessionState, _display: bool) -> Result<()> {
            Ok(())
        }
    }

    struct Empty;

    impl RetrievalCommand for Empty {
        fn execute(&self, _source: &dyn ActivitySource, _display: bool) -> Result<Retrieved> {
            Ok(Retrieved::Nothing)
        }
    }

    fn generic(selector: &str) -> PluginDescriptor {
        PluginDescriptor::new(selector, "noop", Action::Generic(Box::new(Noop))).unwrap()
    }

    fn retrieval(selector: &str) -> PluginDescriptor {
        PluginDescriptor::new(selector, "empty", Action::Retrieval(Box::new(Empty))).unwrap()
    }

    #[test]
    fn digits_sort_before_letters() {
        let mut keys: Vec<Selector> = ["V3D", "b", "9", "R", "10", "1", "v"]
            .iter()
            .map(|s| Selector::new(s).unwrap())
            .collect();
        keys.sort();
        let sorted: Vec<&str> = keys.iter().map(Selector::as_str).collect();
        assert_eq!(sorted, vec!["1", "10", "9", "R", "V3D", "b", "v"]);
    }

    #[test]
    fn duplicate_selector_is_rejected() {
        let mut registry = Registry::new();
        registry.register(generic("S")).unwrap();
        let err = registry.register(retrieval("S")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateSelector(Selector::new("S").unwrap()));
        assert_eq!(registry.resolve("S").unwrap().role(), Role::Generic);
    }

    #[test]
    fn selectors_are_case_sensitive() {
        let mut registry = Registry::new();
        registry.register(generic("v")).unwrap();
        registry.register(generic("V")).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(matches!(
            registry.resolve("x"),
            Err(RegistryError::UnknownSelector(s)) if s == "x"
        ));
    }

    #[test]
    fn list_by_role_is_in_selector_order() {
        let mut registry = Registry::new();
        for s in ["R", "6", "1"] {
            registry.register(retrieval(s)).unwrap();
        }
        registry.register(generic("S")).unwrap();
        let listed: Vec<&str> = registry
            .list_by_role(Role::Retrieval)
            .iter()
            .map(|p| p.selector().as_str())
            .collect();
        assert_eq!(listed, vec!["1", "6", "R"]);
        assert!(registry.list_by_role(Role::Visualization).is_empty());
    }

    #[test]
    fn blank_selector_is_invalid() {
        assert!(PluginDescriptor::new(" ", "x", Action::Generic(Box::new(Noop))).is_err());
        assert!(matches!(Selector::new(""), Err(RegistryError::InvalidSelector(_))));
    }
}
