// Command dispatch: turns one menu selection into command invocations,
// feeding each command the upstream data its role needs and keeping the
// results in the session. A failing command never ends the session.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use anyhow::anyhow;
use thiserror::Error;
use tracing::{error, info};

use crate::api::ActivitySource;
use crate::model::{ActivityRecord, MergedTrace};
use crate::registry::{Action, Registry, RegistryError, Retrieved, Role, Selector};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("`{selector}` needs a {needs} result first; run a {needs} command before it")]
    MissingUpstreamData { selector: Selector, needs: Role },
    #[error("command `{selector}` failed: {cause:#}")]
    CommandExecution { selector: Selector, cause: anyhow::Error },
}

/// What one dispatch did.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Retrieved(Retrieved),
    Processed { activities: usize },
    Merged { points: usize, stops: usize },
    NoGpsData,
    Rendered(PathBuf),
    Done,
}

/// Results accumulated over a session, handed from one stage to the next.
#[derive(Default)]
pub struct SessionState {
    current_retrieval: Option<Selector>,
    retrieved: Option<Vec<ActivityRecord>>,
    processed: Option<Vec<ActivityRecord>>,
    merged: Option<MergedTrace>,
    last_artifact: Option<PathBuf>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieval command processing commands will re-run.
    pub fn current_retrieval(&self) -> Option<&Selector> {
        self.current_retrieval.as_ref()
    }

    pub fn retrieved(&self) -> Option<&[ActivityRecord]> {
        self.retrieved.as_deref()
    }

    pub fn processed(&self) -> Option<&[ActivityRecord]> {
        self.processed.as_deref()
    }

    pub fn merged(&self) -> Option<&MergedTrace> {
        self.merged.as_ref()
    }

    pub fn last_artifact(&self) -> Option<&PathBuf> {
        self.last_artifact.as_ref()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run one command body, turning both errors and panics into
/// `CommandExecution`.
fn guarded<T>(selector: &Selector, run: impl FnOnce() -> anyhow::Result<T>) -> Result<T, DispatchError> {
    let result = panic::catch_unwind(AssertUnwindSafe(run))
        .unwrap_or_else(|payload| Err(anyhow!("command panicked: {}", panic_message(payload))));
    result.map_err(|cause| {
        error!(selector = %selector, error = ?cause, "command failed");
        DispatchError::CommandExecution {
            selector: selector.clone(),
            cause,
        }
    })
}

pub struct Dispatcher<'a> {
    registry: &'a Registry,
    source: &'a dyn ActivitySource,
    default_retrieval: Selector,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a Registry, source: &'a dyn ActivitySource, default_retrieval: Selector) -> Self {
        Dispatcher {
            registry,
            source,
            default_retrieval,
        }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    pub fn dispatch(&self, selector: &str, session: &mut SessionState) -> Result<Outcome, DispatchError> {
        let plugin = self.registry.resolve(selector)?;
        let key = plugin.selector();
        info!(selector = %key, role = %plugin.role(), "dispatching");

        match plugin.action() {
            Action::Retrieval(command) => {
                let retrieved = guarded(key, || command.execute(self.source, true))?;
                if let Retrieved::Activities(activities) = &retrieved {
                    session.current_retrieval = Some(key.clone());
                    session.retrieved = Some(activities.clone());
                }
                Ok(Outcome::Retrieved(retrieved))
            }
            Action::Processing(command) => {
                let raw = self.rerun_retrieval(key, session)?;
                let processed = guarded(key, || command.execute(self.source, raw, true))?;
                let count = processed.len();
                session.processed = Some(processed);
                session.merged = None;
                Ok(Outcome::Processed { activities: count })
            }
            Action::SecondaryProcessing(command) => {
                let activities = session
                    .processed
                    .as_deref()
                    .ok_or_else(|| DispatchError::MissingUpstreamData {
                        selector: key.clone(),
                        needs: Role::Processing,
                    })?;
                let merged = guarded(key, || command.execute(self.source, activities, true))?;
                session.merged = merged;
                Ok(match &session.merged {
                    Some(trace) => Outcome::Merged {
                        points: trace.points().len(),
                        stops: trace.stop_indices().len(),
                    },
                    None => Outcome::NoGpsData,
                })
            }
            Action::Visualization(command) => {
                let trace = session
                    .merged
                    .as_mut()
                    .ok_or_else(|| DispatchError::MissingUpstreamData {
                        selector: key.clone(),
                        needs: Role::SecondaryProcessing,
                    })?;
                let artifact = guarded(key, || command.execute(trace, true))?;
                session.last_artifact = Some(artifact.clone());
                Ok(Outcome::Rendered(artifact))
            }
            Action::Generic(command) => {
                guarded(key, || command.execute(session, true))?;
                Ok(Outcome::Done)
            }
        }
    }

    /// Quietly re-run the session's current retrieval (or the configured
    /// default) to get the raw activity set for a processing command.
    fn rerun_retrieval(&self, requester: &Selector, session: &SessionState) -> Result<Vec<ActivityRecord>, DispatchError> {
        let missing = || DispatchError::MissingUpstreamData {
            selector: requester.clone(),
            needs: Role::Retrieval,
        };
        let selector = session
            .current_retrieval
            .as_ref()
            .unwrap_or(&self.default_retrieval);
        let plugin = self.registry.resolve(selector.as_str()).map_err(|_| missing())?;
        let command = match plugin.action() {
            Action::Retrieval(command) => command,
            _ => return Err(missing()),
        };
        match guarded(plugin.selector(), || command.execute(self.source, false))? {
            Retrieved::Activities(activities) => Ok(activities),
            Retrieved::Data(_) | Retrieved::Nothing => Err(missing()),
        }
    }
}
