//! User-triggered writes: collect input, submit, let the controller refresh.

use std::collections::VecDeque;
use tracing::{debug, info};

use crate::sync::{ActionKind, Request, SyncController};

/// A question put to the user while collecting input for an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    NewAddressLabel,
    NewLabel { address: String },
    Recipient,
    Amount,
}

impl Prompt {
    pub fn text(&self) -> String {
        match self {
            Prompt::NewAddressLabel => "Label for new address (optional):".to_string(),
            Prompt::NewLabel { address } => format!("New label for {}:", address),
            Prompt::Recipient => "Enter recipient address:".to_string(),
            Prompt::Amount => "Enter amount:".to_string(),
        }
    }
}

/// Where action input comes from. `None` means the user cancelled.
pub trait InputSource {
    fn collect(&mut self, prompt: Prompt) -> Option<String>;
}

/// Pre-recorded answers, handed out in order. Runs dry as a cancel.
#[derive(Debug, Default)]
pub struct Answers {
    queue: VecDeque<Option<String>>,
}

impl Answers {
    pub fn push(&mut self, answer: Option<String>) {
        self.queue.push_back(answer);
    }
}

impl FromIterator<Option<String>> for Answers {
    fn from_iter<I: IntoIterator<Item = Option<String>>>(iter: I) -> Self {
        Self {
            queue: iter.into_iter().collect(),
        }
    }
}

impl InputSource for Answers {
    fn collect(&mut self, prompt: Prompt) -> Option<String> {
        let answer = self.queue.pop_front().flatten();
        debug!("{:?} -> {:?}", prompt, answer);
        answer
    }
}

/// The prompts an action asks, in order. The GUI uses this to drive its
/// dialog before calling the handler.
pub fn prompts(kind: ActionKind, address: Option<&str>) -> Vec<Prompt> {
    match kind {
        ActionKind::CreateAddress => vec![Prompt::NewAddressLabel],
        ActionKind::SetLabel => vec![Prompt::NewLabel {
            address: address.unwrap_or_default().to_string(),
        }],
        ActionKind::Send => vec![Prompt::Recipient, Prompt::Amount],
    }
}

fn aborted(kind: ActionKind) -> Vec<Request> {
    info!("{:?} cancelled", kind);
    vec![]
}

/// An empty label is sent as no label at all.
pub fn create_address(controller: &mut SyncController, input: &mut impl InputSource) -> Vec<Request> {
    let Some(label) = input.collect(Prompt::NewAddressLabel) else {
        return aborted(ActionKind::CreateAddress);
    };
    let label = Some(label).filter(|l| !l.is_empty());
    controller.submit(ActionKind::CreateAddress, Request::CreateAddress { label })
}

pub fn set_label(
    controller: &mut SyncController,
    input: &mut impl InputSource,
    address: &str,
) -> Vec<Request> {
    let prompt = Prompt::NewLabel {
        address: address.to_string(),
    };
    let Some(label) = input.collect(prompt) else {
        return aborted(ActionKind::SetLabel);
    };
    controller.submit(
        ActionKind::SetLabel,
        Request::SetLabel {
            address: address.to_string(),
            label,
        },
    )
}

/// The amount goes to the backend exactly as typed.
pub fn send(controller: &mut SyncController, input: &mut impl InputSource) -> Vec<Request> {
    let Some(address) = input.collect(Prompt::Recipient).filter(|a| !a.is_empty()) else {
        return aborted(ActionKind::Send);
    };
    let Some(amount) = input.collect(Prompt::Amount).filter(|a| !a.is_empty()) else {
        return aborted(ActionKind::Send);
    };
    controller.submit(ActionKind::Send, Request::Send { address, amount })
}

pub fn check_balance(controller: &mut SyncController, address: &str) -> Vec<Request> {
    controller.select_address(address)
}
