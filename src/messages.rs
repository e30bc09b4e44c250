use crate::sync::{ActionKind, Response};

/// Slices the user can reload by hand after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceKind {
    Balance,
    History,
    Addresses,
}

#[derive(Debug, Clone)]
pub enum Message {
    Fetched(Response),
    Reload(SliceKind),
    CheckBalance(String),
    StartAction {
        kind: ActionKind,
        address: Option<String>,
    },
    PromptInputChanged(String),
    PromptSubmit,
    PromptCancel,
    DismissNotice,
}
