//! Keeps the cached wallet view in step with the backend.
//!
//! The controller does no I/O. Every operation returns the [`Request`]s that
//! should be issued; whoever runs them hands each outcome back through
//! [`SyncController::apply`] whenever it arrives, in any order.

use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::api::FetchError;
use crate::wallet::{AddressDetail, AddressEntry, Balance, HistoryEntry, Ticket, WalletState};

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Balance,
    History,
    Addresses,
    AddressDetail(Ticket),
    CreateAddress { label: Option<String> },
    SetLabel { address: String, label: String },
    Send { address: String, amount: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Balance(Result<Balance, FetchError>),
    History(Result<Vec<HistoryEntry>, FetchError>),
    Addresses(Result<Vec<AddressEntry>, FetchError>),
    AddressDetail {
        ticket: Ticket,
        result: Result<AddressDetail, FetchError>,
    },
    AddressCreated(Result<(), FetchError>),
    LabelSet(Result<(), FetchError>),
    Sent(Result<String, FetchError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    CreateAddress,
    SetLabel,
    Send,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionPhase {
    #[default]
    Idle,
    Submitting,
    Refreshing,
}

/// Something the user has to acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Sent(String),
    Failed { action: ActionKind, error: FetchError },
}

/// What to do after a response has been applied.
#[derive(Debug, Default, PartialEq)]
pub struct Followup {
    pub requests: Vec<Request>,
    pub notice: Option<Notice>,
}

#[derive(Debug, Default)]
pub struct SyncController {
    state: WalletState,
    create_address: ActionPhase,
    set_label: ActionPhase,
    send: ActionPhase,
    /// Address listings requested but not yet answered.
    address_reads: usize,
    notices: VecDeque<Notice>,
}

impl SyncController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WalletState {
        &self.state
    }

    /// The oldest notice the user has not acknowledged yet.
    pub fn notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    pub fn dismiss_notice(&mut self) {
        self.notices.pop_front();
    }

    pub fn phase(&self, kind: ActionKind) -> ActionPhase {
        match kind {
            ActionKind::CreateAddress => self.create_address,
            ActionKind::SetLabel => self.set_label,
            ActionKind::Send => self.send,
        }
    }

    fn phase_mut(&mut self, kind: ActionKind) -> &mut ActionPhase {
        match kind {
            ActionKind::CreateAddress => &mut self.create_address,
            ActionKind::SetLabel => &mut self.set_label,
            ActionKind::Send => &mut self.send,
        }
    }

    /// The three initial reads. They are independent; each lands in its own slice.
    pub fn load_all(&mut self) -> Vec<Request> {
        let mut requests = self.refresh_balance();
        requests.extend(self.refresh_history());
        requests.extend(self.refresh_addresses());
        requests
    }

    pub fn refresh_balance(&mut self) -> Vec<Request> {
        self.state.balance.begin();
        vec![Request::Balance]
    }

    pub fn refresh_history(&mut self) -> Vec<Request> {
        self.state.history.begin();
        vec![Request::History]
    }

    pub fn refresh_addresses(&mut self) -> Vec<Request> {
        self.address_reads += 1;
        self.state.addresses.begin();
        vec![Request::Addresses]
    }

    pub fn select_address(&mut self, address: &str) -> Vec<Request> {
        let ticket = self.state.detail.select(address);
        debug!("selected {} (#{})", ticket.address, ticket.seq);
        vec![Request::AddressDetail(ticket)]
    }

    /// Marks a write as in flight. Called by the action handlers right
    /// before they hand the request out.
    pub fn submit(&mut self, kind: ActionKind, request: Request) -> Vec<Request> {
        *self.phase_mut(kind) = ActionPhase::Submitting;
        vec![request]
    }

    pub fn apply(&mut self, response: Response) -> Followup {
        let mut followup = Followup::default();

        match response {
            Response::Balance(result) => match result {
                Ok(balance) => self.state.balance.set(balance),
                Err(e) => {
                    warn!("balance refresh failed: {}", e);
                    self.state.balance.fail(e);
                }
            },
            Response::History(result) => match result {
                Ok(history) => self.state.history.set(history),
                Err(e) => {
                    warn!("history refresh failed: {}", e);
                    self.state.history.fail(e);
                }
            },
            Response::Addresses(result) => {
                self.address_reads = self.address_reads.saturating_sub(1);
                // Last write wins: a slower, older listing can still overwrite a newer one.
                match result {
                    Ok(addresses) => self.state.addresses.set(addresses),
                    Err(e) => {
                        warn!("address refresh failed: {}", e);
                        self.state.addresses.fail(e);
                    }
                }
                if self.address_reads > 0 {
                    self.state.addresses.begin();
                } else {
                    // Every listing issued after a write has landed, so the write is visible.
                    for kind in [ActionKind::CreateAddress, ActionKind::SetLabel] {
                        if self.phase(kind) == ActionPhase::Refreshing {
                            *self.phase_mut(kind) = ActionPhase::Idle;
                        }
                    }
                }
            }
            Response::AddressDetail { ticket, result } => {
                if !self.state.detail.commit(&ticket, result) {
                    debug!(
                        "discarding stale detail for {} (#{})",
                        ticket.address, ticket.seq
                    );
                }
            }
            Response::AddressCreated(result) => {
                followup = self.finish_write(ActionKind::CreateAddress, result);
            }
            Response::LabelSet(result) => {
                followup = self.finish_write(ActionKind::SetLabel, result);
            }
            Response::Sent(result) => {
                self.send = ActionPhase::Idle;
                followup.notice = Some(match result {
                    Ok(reply) => {
                        info!("send accepted by backend");
                        Notice::Sent(reply)
                    }
                    Err(error) => Notice::Failed {
                        action: ActionKind::Send,
                        error,
                    },
                });
            }
        }

        if let Some(notice) = &followup.notice {
            self.notices.push_back(notice.clone());
        }
        followup
    }

    fn finish_write(&mut self, kind: ActionKind, result: Result<(), FetchError>) -> Followup {
        match result {
            Ok(()) => {
                info!("{:?} succeeded, refreshing addresses", kind);
                *self.phase_mut(kind) = ActionPhase::Refreshing;
                Followup {
                    requests: self.refresh_addresses(),
                    notice: None,
                }
            }
            Err(error) => {
                warn!("{:?} failed: {}", kind, error);
                *self.phase_mut(kind) = ActionPhase::Idle;
                Followup {
                    requests: vec![],
                    notice: Some(Notice::Failed {
                        action: kind,
                        error,
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Amount;
    use serde_json::json;

    fn failure() -> FetchError {
        FetchError::Transport("connection refused".into())
    }

    fn balance() -> Balance {
        serde_json::from_value(json!({ "token": "MTK", "sendable": "100" })).unwrap()
    }

    fn addresses(value: serde_json::Value) -> Vec<AddressEntry> {
        serde_json::from_value(value).unwrap()
    }

    fn history() -> Vec<HistoryEntry> {
        serde_json::from_value(json!([{ "txpowid": "tx1" }])).unwrap()
    }

    fn detail(address: &str, balance: u64) -> AddressDetail {
        serde_json::from_value(json!({ "address": address, "balance": balance, "utxos": [] }))
            .unwrap()
    }

    fn ticket_of(requests: &[Request]) -> Ticket {
        match requests {
            [Request::AddressDetail(ticket)] => ticket.clone(),
            other => panic!("expected one detail request, got {:?}", other),
        }
    }

    #[test]
    fn load_all_issues_three_reads() {
        let mut controller = SyncController::new();
        let requests = controller.load_all();
        assert_eq!(
            requests,
            vec![Request::Balance, Request::History, Request::Addresses]
        );
        let state = controller.state();
        assert!(state.balance.is_loading());
        assert!(state.history.is_loading());
        assert!(state.addresses.is_loading());
    }

    #[test]
    fn initial_load_scenario() {
        let mut controller = SyncController::new();
        controller.load_all();

        controller.apply(Response::History(Ok(history())));
        controller.apply(Response::Addresses(Ok(addresses(
            json!([{ "address": "abc", "label": null }]),
        ))));
        controller.apply(Response::Balance(Ok(balance())));

        let state = controller.state();
        let balance = state.balance.value().unwrap();
        assert_eq!(balance.token, "MTK");
        assert_eq!(balance.sendable, Amount::from("100"));
        assert_eq!(
            state.addresses.value().unwrap(),
            &vec![AddressEntry {
                address: "abc".into(),
                label: None
            }]
        );
        let ids: Vec<_> = state
            .history
            .value()
            .unwrap()
            .iter()
            .map(|h| h.txpowid.as_str())
            .collect();
        assert_eq!(ids, vec!["tx1"]);
    }

    #[test]
    fn each_read_lands_independently() {
        for mask in 0..8u8 {
            let mut controller = SyncController::new();
            controller.load_all();

            let balance_ok = mask & 1 != 0;
            let history_ok = mask & 2 != 0;
            let addresses_ok = mask & 4 != 0;

            controller.apply(Response::Addresses(if addresses_ok {
                Ok(addresses(json!([{ "address": "abc" }])))
            } else {
                Err(failure())
            }));
            controller.apply(Response::Balance(if balance_ok {
                Ok(balance())
            } else {
                Err(failure())
            }));
            controller.apply(Response::History(if history_ok {
                Ok(history())
            } else {
                Err(failure())
            }));

            let state = controller.state();
            assert_eq!(state.balance.value().is_some(), balance_ok, "mask {}", mask);
            assert_eq!(state.balance.error().is_some(), !balance_ok, "mask {}", mask);
            assert_eq!(state.history.value().is_some(), history_ok, "mask {}", mask);
            assert_eq!(state.history.error().is_some(), !history_ok, "mask {}", mask);
            assert_eq!(state.addresses.value().is_some(), addresses_ok, "mask {}", mask);
            assert_eq!(state.addresses.error().is_some(), !addresses_ok, "mask {}", mask);
        }
    }

    #[test]
    fn failed_refresh_keeps_previous_addresses() {
        let mut controller = SyncController::new();
        controller.apply(Response::Addresses(Ok(addresses(json!([{ "address": "abc" }])))));

        controller.refresh_addresses();
        controller.apply(Response::Addresses(Err(failure())));

        let state = controller.state();
        assert_eq!(state.addresses.value().unwrap().len(), 1);
        assert_eq!(state.addresses.error(), Some(&failure()));
    }

    #[test]
    fn refresh_replaces_address_list_wholesale() {
        let mut controller = SyncController::new();
        controller.apply(Response::Addresses(Ok(addresses(json!([
            { "address": "old" },
            { "address": "kept" }
        ])))));

        assert_eq!(controller.refresh_addresses(), vec![Request::Addresses]);
        controller.apply(Response::Addresses(Ok(addresses(json!([
            { "address": "kept" },
            { "address": "new" }
        ])))));

        let listed: Vec<_> = controller
            .state()
            .addresses
            .value()
            .unwrap()
            .iter()
            .map(|a| a.address.as_str())
            .collect();
        assert_eq!(listed, vec!["kept", "new"]);
    }

    #[test]
    fn select_address_scenario() {
        let mut controller = SyncController::new();
        let ticket = ticket_of(&controller.select_address("abc"));
        assert_eq!(ticket.address, "abc");

        controller.apply(Response::AddressDetail {
            ticket,
            result: Ok(detail("abc", 50)),
        });

        assert_eq!(
            controller.state().detail.slice().value(),
            Some(&AddressDetail {
                address: "abc".into(),
                tokenid: None,
                balance: Amount::from("50"),
                utxos: vec![],
            })
        );
    }

    #[test]
    fn last_selection_wins_regardless_of_arrival_order() {
        for a_arrives_last in [true, false] {
            let mut controller = SyncController::new();
            let a = ticket_of(&controller.select_address("A"));
            let b = ticket_of(&controller.select_address("B"));

            let a_response = Response::AddressDetail {
                ticket: a,
                result: Ok(detail("A", 1)),
            };
            let b_response = Response::AddressDetail {
                ticket: b,
                result: Ok(detail("B", 2)),
            };
            if a_arrives_last {
                controller.apply(b_response);
                controller.apply(a_response);
            } else {
                controller.apply(a_response);
                assert!(controller.state().detail.slice().value().is_none());
                controller.apply(b_response);
            }

            let shown = controller.state().detail.slice().value().unwrap();
            assert_eq!(shown.address, "B");
        }
    }

    #[test]
    fn stale_failure_does_not_clobber_current_detail() {
        let mut controller = SyncController::new();
        let a = ticket_of(&controller.select_address("A"));
        let b = ticket_of(&controller.select_address("B"));

        controller.apply(Response::AddressDetail {
            ticket: b,
            result: Ok(detail("B", 2)),
        });
        controller.apply(Response::AddressDetail {
            ticket: a,
            result: Err(failure()),
        });

        let detail = controller.state().detail.slice();
        assert_eq!(detail.value().unwrap().address, "B");
        assert!(detail.error().is_none());
    }

    #[test]
    fn label_round_trip() {
        let mut controller = SyncController::new();
        controller.apply(Response::Addresses(Ok(addresses(json!([{ "address": "abc" }])))));

        controller.submit(
            ActionKind::SetLabel,
            Request::SetLabel {
                address: "abc".into(),
                label: "X".into(),
            },
        );
        assert_eq!(controller.phase(ActionKind::SetLabel), ActionPhase::Submitting);

        let followup = controller.apply(Response::LabelSet(Ok(())));
        assert_eq!(followup.requests, vec![Request::Addresses]);
        assert_eq!(controller.phase(ActionKind::SetLabel), ActionPhase::Refreshing);

        controller.apply(Response::Addresses(Ok(addresses(
            json!([{ "address": "abc", "label": "X" }]),
        ))));
        let entry = &controller.state().addresses.value().unwrap()[0];
        assert_eq!(entry.label.as_deref(), Some("X"));
        assert_eq!(controller.phase(ActionKind::SetLabel), ActionPhase::Idle);
    }

    #[test]
    fn created_address_triggers_address_refresh_only() {
        let mut controller = SyncController::new();
        controller.submit(
            ActionKind::CreateAddress,
            Request::CreateAddress { label: None },
        );

        let followup = controller.apply(Response::AddressCreated(Ok(())));
        assert_eq!(followup.requests, vec![Request::Addresses]);
        assert!(followup.notice.is_none());
        assert!(!controller.state().history.is_loading());
        assert!(!controller.state().balance.is_loading());
    }

    #[test]
    fn failed_write_notifies_and_skips_refresh() {
        let mut controller = SyncController::new();
        controller.apply(Response::Addresses(Ok(addresses(json!([{ "address": "abc" }])))));
        controller.submit(
            ActionKind::CreateAddress,
            Request::CreateAddress { label: None },
        );

        let error = FetchError::Status {
            status: 500,
            body: "Failed to create address".into(),
        };
        let followup = controller.apply(Response::AddressCreated(Err(error.clone())));

        assert!(followup.requests.is_empty());
        let expected = Notice::Failed {
            action: ActionKind::CreateAddress,
            error,
        };
        assert_eq!(followup.notice.as_ref(), Some(&expected));
        assert_eq!(controller.notice(), Some(&expected));
        assert_eq!(controller.phase(ActionKind::CreateAddress), ActionPhase::Idle);
        assert_eq!(controller.state().addresses.value().unwrap().len(), 1);
        assert!(!controller.state().addresses.is_loading());
    }

    #[test]
    fn send_reports_reply_without_refreshing() {
        let mut controller = SyncController::new();
        controller.apply(Response::Balance(Ok(balance())));
        controller.apply(Response::History(Ok(history())));
        let before = controller.state().clone();

        controller.submit(
            ActionKind::Send,
            Request::Send {
                address: "Mx00".into(),
                amount: "5".into(),
            },
        );
        let followup = controller.apply(Response::Sent(Ok("{\"status\":true}".into())));

        assert!(followup.requests.is_empty());
        assert_eq!(
            followup.notice,
            Some(Notice::Sent("{\"status\":true}".into()))
        );
        assert_eq!(controller.state().balance, before.balance);
        assert_eq!(controller.state().history, before.history);
        assert_eq!(controller.phase(ActionKind::Send), ActionPhase::Idle);

        controller.dismiss_notice();
        assert!(controller.notice().is_none());
    }

    #[test]
    fn failed_send_notifies_without_touching_view() {
        let mut controller = SyncController::new();
        controller.apply(Response::Balance(Ok(balance())));
        controller.apply(Response::History(Ok(history())));
        let before = controller.state().clone();

        controller.submit(
            ActionKind::Send,
            Request::Send {
                address: "Mx00".into(),
                amount: "5".into(),
            },
        );
        let error = FetchError::Status {
            status: 400,
            body: "address and amount are required".into(),
        };
        let followup = controller.apply(Response::Sent(Err(error.clone())));

        let expected = Notice::Failed {
            action: ActionKind::Send,
            error,
        };
        assert!(followup.requests.is_empty());
        assert_eq!(followup.notice.as_ref(), Some(&expected));
        assert_eq!(controller.notice(), Some(&expected));
        assert_eq!(controller.phase(ActionKind::Send), ActionPhase::Idle);
        assert_eq!(controller.state().balance, before.balance);
        assert_eq!(controller.state().history, before.history);
    }

    #[test]
    fn notices_queue_until_acknowledged() {
        let mut controller = SyncController::new();
        controller.submit(
            ActionKind::CreateAddress,
            Request::CreateAddress { label: None },
        );
        controller.submit(
            ActionKind::Send,
            Request::Send {
                address: "Mx00".into(),
                amount: "5".into(),
            },
        );

        controller.apply(Response::AddressCreated(Err(failure())));
        controller.apply(Response::Sent(Ok("ok".into())));

        assert_eq!(
            controller.notice(),
            Some(&Notice::Failed {
                action: ActionKind::CreateAddress,
                error: failure(),
            })
        );
        controller.dismiss_notice();
        assert_eq!(controller.notice(), Some(&Notice::Sent("ok".into())));
        controller.dismiss_notice();
        assert!(controller.notice().is_none());
    }

    #[test]
    fn older_listing_does_not_complete_a_write() {
        let mut controller = SyncController::new();
        controller.load_all();
        controller.submit(
            ActionKind::CreateAddress,
            Request::CreateAddress { label: None },
        );
        let followup = controller.apply(Response::AddressCreated(Ok(())));
        assert_eq!(followup.requests, vec![Request::Addresses]);

        // The listing from the initial load lands first.
        controller.apply(Response::Addresses(Ok(vec![])));
        assert_eq!(
            controller.phase(ActionKind::CreateAddress),
            ActionPhase::Refreshing
        );
        assert!(controller.state().addresses.is_loading());

        controller.apply(Response::Addresses(Ok(addresses(json!([{ "address": "new" }])))));
        assert_eq!(controller.phase(ActionKind::CreateAddress), ActionPhase::Idle);
        assert!(!controller.state().addresses.is_loading());
        assert_eq!(controller.state().addresses.value().unwrap().len(), 1);
    }

    #[test]
    fn overlapping_refreshes_keep_the_last_arrival() {
        let mut controller = SyncController::new();
        controller.refresh_addresses();
        controller.refresh_addresses();

        // The newer listing arrives first, the older one last.
        controller.apply(Response::Addresses(Ok(addresses(json!([
            { "address": "a" },
            { "address": "b" }
        ])))));
        controller.apply(Response::Addresses(Ok(addresses(json!([{ "address": "a" }])))));

        let listed: Vec<_> = controller
            .state()
            .addresses
            .value()
            .unwrap()
            .iter()
            .map(|a| a.address.as_str())
            .collect();
        assert_eq!(listed, vec!["a"]);
        assert!(!controller.state().addresses.is_loading());
    }
}
