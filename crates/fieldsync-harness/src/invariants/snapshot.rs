//! Observable state the invariants are checked against.

use std::time::Duration;

use fieldsync_client::{SyncAction, ViewSnapshot};

/// One action the runtime asked the driver to perform.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Virtual time of the call.
    pub at: Duration,
    /// The action. Never `Render`.
    pub action: SyncAction,
    /// Whether the driver's socket was open when the call was made.
    pub socket_open: bool,
}

/// Latest rendered view state plus every driver call so far.
#[derive(Debug, Clone, Copy)]
pub struct SystemSnapshot<'a> {
    /// Most recent render, if any.
    pub view: Option<&'a ViewSnapshot>,
    /// Driver calls in order.
    pub calls: &'a [RecordedCall],
}

impl<'a> SystemSnapshot<'a> {
    /// Nothing rendered, nothing called.
    pub fn empty() -> Self {
        Self { view: None, calls: &[] }
    }

    /// Snapshot of a rendered view with no driver calls.
    pub fn of_view(view: &'a ViewSnapshot) -> Self {
        Self { view: Some(view), calls: &[] }
    }
}
