//! Routing of widget actions back into a conversation
//!
//! Rendered widgets embed action descriptors. When the display layer
//! triggers one, it goes through the conversation's [`ActionRouter`], which
//! the runtime binds while it runs. Dropping the [`ActionBinding`] unbinds it.

use super::executor::{send_event, Command};
use super::SubmitError;
use crate::conversation::Event;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("No conversation is bound to receive actions")]
    NotBound,
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    target: Option<mpsc::Sender<Command>>,
}

/// Per-conversation entry point for widget actions
#[derive(Debug, Clone, Default)]
pub struct ActionRouter {
    slot: Arc<Mutex<Slot>>,
}

impl ActionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route actions to `target` until the returned binding is dropped.
    /// A newer binding replaces an older one.
    pub(crate) fn bind(&self, target: mpsc::Sender<Command>) -> ActionBinding {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        slot.target = Some(target);
        ActionBinding {
            router: self.clone(),
            generation: slot.generation,
        }
    }

    #[cfg(test)]
    pub fn is_bound(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .target
            .is_some()
    }

    /// Enter the conversation as a widget action
    pub async fn invoke(&self, tool_name: &str, args: Value) -> Result<(), ActionError> {
        let target = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .target
            .clone()
            .ok_or(ActionError::NotBound)?;

        tracing::debug!(tool = %tool_name, "Routing widget action");
        send_event(&target, Event::widget_action(tool_name, args)).await?;
        Ok(())
    }
}

/// Keeps an [`ActionRouter`] bound; unbinds on drop
#[derive(Debug)]
pub struct ActionBinding {
    router: ActionRouter,
    generation: u64,
}

impl Drop for ActionBinding {
    fn drop(&mut self) {
        let mut slot = self
            .router
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.generation == self.generation {
            slot.target = None;
        }
    }
}
