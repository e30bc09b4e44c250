use iced::widget::{Button, Column, Container, Row, Scrollable, Text, TextInput};
use iced::{alignment, Alignment, Application, Color, Command, Element, Length, Theme};
use std::collections::VecDeque;
use tracing::debug;

use crate::actions::{self, Answers, Prompt};
use crate::api::ApiClient;
use crate::executor::TokioExecutor;
use crate::messages::{Message, SliceKind};
use crate::sync::{ActionKind, ActionPhase, Notice, Request, SyncController};
use crate::wallet::Slice;

/// The prompts still to be answered for the action being started.
struct PromptDialog {
    kind: ActionKind,
    address: Option<String>,
    pending: VecDeque<Prompt>,
    answers: Answers,
    input: String,
}

pub struct WalletApp {
    api: ApiClient,
    controller: SyncController,
    dialog: Option<PromptDialog>,
}

const ERROR_COLOR: Color = Color {
    r: 0.8,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

impl WalletApp {
    fn perform(&self, requests: Vec<Request>) -> Command<Message> {
        Command::batch(requests.into_iter().map(|request| {
            debug!("dispatching {:?}", request);
            Command::perform(self.api.clone().execute(request), Message::Fetched)
        }))
    }

    fn finish_dialog(&mut self, mut dialog: PromptDialog) -> Command<Message> {
        let input = &mut dialog.answers;
        let requests = match dialog.kind {
            ActionKind::CreateAddress => actions::create_address(&mut self.controller, input),
            ActionKind::SetLabel => {
                let address = dialog.address.unwrap_or_default();
                actions::set_label(&mut self.controller, input, &address)
            }
            ActionKind::Send => actions::send(&mut self.controller, input),
        };
        self.perform(requests)
    }

    /// A button that starts `kind`, inert while that action is still in flight.
    fn action_button(
        &self,
        label: &'static str,
        kind: ActionKind,
        address: Option<String>,
    ) -> Button<'static, Message> {
        let button = Button::new(Text::new(label).size(14));
        if self.controller.phase(kind) == ActionPhase::Idle {
            button.on_press(Message::StartAction { kind, address })
        } else {
            button
        }
    }

    fn slice_status<T>(slice: &Slice<T>, kind: SliceKind) -> Option<Element<'static, Message>> {
        if let Some(error) = slice.error() {
            let row = Row::new()
                .push(Text::new(error.to_string()).size(14).style(ERROR_COLOR))
                .push(Button::new(Text::new("Retry")).on_press(Message::Reload(kind)))
                .spacing(10)
                .align_items(Alignment::Center);
            Some(row.into())
        } else if slice.is_loading() {
            Some(Text::new("Loading…").size(14).into())
        } else {
            None
        }
    }

    fn balance_view(&self) -> Element<Message> {
        let state = self.controller.state();
        let mut section = Column::new()
            .push(Text::new("Wallet Total (All Addresses)").size(20))
            .spacing(8);

        if let Some(balance) = state.balance.value() {
            section = section.push(Text::new(format!(
                "Balance: {} {}",
                balance.sendable, balance.token
            )));
        }
        if let Some(status) = Self::slice_status(&state.balance, SliceKind::Balance) {
            section = section.push(status);
        }

        section
            .push(self.action_button("Send Token", ActionKind::Send, None).padding(8))
            .into()
    }

    fn addresses_view(&self) -> Element<Message> {
        let state = self.controller.state();
        let header = Row::new()
            .push(Text::new("Addresses").size(20).width(Length::Fill))
            .push(
                self.action_button("+ New Address", ActionKind::CreateAddress, None)
                    .padding(8),
            )
            .align_items(Alignment::Center);

        let mut section = Column::new().push(header).spacing(8);
        if let Some(status) = Self::slice_status(&state.addresses, SliceKind::Addresses) {
            section = section.push(status);
        }

        let entries = state.addresses.value().map(Vec::as_slice).unwrap_or_default();
        let list = entries.iter().fold(Column::new().spacing(4), |col, entry| {
            let label = entry.label.as_deref().unwrap_or("(no label)");
            col.push(
                Row::new()
                    .push(
                        Column::new()
                            .push(Text::new(label).size(12))
                            .push(Text::new(&entry.address).size(12))
                            .width(Length::Fill),
                    )
                    .push(
                        Button::new(Text::new("Check Balance").size(12))
                            .on_press(Message::CheckBalance(entry.address.clone())),
                    )
                    .push(self.action_button(
                        "Set Label",
                        ActionKind::SetLabel,
                        Some(entry.address.clone()),
                    ))
                    .spacing(10)
                    .align_items(Alignment::Center),
            )
        });
        section = section.push(Scrollable::new(list).height(Length::Fixed(180.0)));

        let detail = state.detail.slice();
        if let Some(detail) = detail.value() {
            let utxos = serde_json::to_string_pretty(&detail.utxos).unwrap_or_default();
            let mut card = Column::new()
                .push(Text::new(format!("Address: {}", detail.address)).size(14))
                .push(Text::new(format!("Balance: {}", detail.balance)));
            if let Some(tokenid) = &detail.tokenid {
                card = card.push(Text::new(format!("Token: {}", tokenid)).size(12));
            }
            section = section.push(card.push(Text::new(utxos).size(11)).spacing(4).padding(8));
        } else if let Some(error) = detail.error() {
            section = section.push(Text::new(error.to_string()).size(14).style(ERROR_COLOR));
        } else if detail.is_loading() {
            let checking = state.detail.selected().unwrap_or_default();
            section = section.push(Text::new(format!("Loading {}…", checking)).size(14));
        }

        section.into()
    }

    fn history_view(&self) -> Element<Message> {
        let state = self.controller.state();
        let mut section = Column::new()
            .push(Text::new("Transaction History").size(20))
            .spacing(8);
        if let Some(status) = Self::slice_status(&state.history, SliceKind::History) {
            section = section.push(status);
        }
        let entries = state.history.value().map(Vec::as_slice).unwrap_or_default();
        let list = entries.iter().fold(Column::new().spacing(2), |col, tx| {
            col.push(Text::new(&tx.txpowid).size(12))
        });
        section
            .push(Scrollable::new(list).height(Length::Fixed(120.0)))
            .into()
    }

    fn dialog_view(dialog: &PromptDialog) -> Option<Element<'_, Message>> {
        let prompt = dialog.pending.front()?;
        let content = Column::new()
            .push(Text::new(prompt.text()))
            .push(
                TextInput::new("", &dialog.input)
                    .on_input(Message::PromptInputChanged)
                    .on_submit(Message::PromptSubmit)
                    .padding(8),
            )
            .push(
                Row::new()
                    .push(Button::new(Text::new("OK")).on_press(Message::PromptSubmit))
                    .push(Button::new(Text::new("Cancel")).on_press(Message::PromptCancel))
                    .spacing(10),
            )
            .spacing(8)
            .padding(10);
        Some(content.into())
    }

    fn notice_view(notice: &Notice) -> Element<'static, Message> {
        let text = match notice {
            Notice::Sent(reply) => Text::new(reply.clone()),
            Notice::Failed { action, error } => {
                Text::new(format!("{:?} failed: {}", action, error)).style(ERROR_COLOR)
            }
        };
        Row::new()
            .push(text.size(14).width(Length::Fill))
            .push(Button::new(Text::new("OK")).on_press(Message::DismissNotice))
            .spacing(10)
            .align_items(Alignment::Center)
            .into()
    }
}

impl Application for WalletApp {
    type Message = Message;
    type Executor = TokioExecutor;
    type Flags = ApiClient;
    type Theme = Theme;

    fn new(api: ApiClient) -> (Self, Command<Message>) {
        let mut app = WalletApp {
            api,
            controller: SyncController::new(),
            dialog: None,
        };
        let requests = app.controller.load_all();
        let command = app.perform(requests);
        (app, command)
    }

    fn title(&self) -> String {
        String::from("Token Wallet")
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::Fetched(response) => {
                let followup = self.controller.apply(response);
                self.perform(followup.requests)
            }
            Message::Reload(kind) => {
                let requests = match kind {
                    SliceKind::Balance => self.controller.refresh_balance(),
                    SliceKind::History => self.controller.refresh_history(),
                    SliceKind::Addresses => self.controller.refresh_addresses(),
                };
                self.perform(requests)
            }
            Message::CheckBalance(address) => {
                let requests = actions::check_balance(&mut self.controller, &address);
                self.perform(requests)
            }
            Message::StartAction { kind, address } => {
                self.dialog = Some(PromptDialog {
                    pending: actions::prompts(kind, address.as_deref()).into(),
                    kind,
                    address,
                    answers: Answers::default(),
                    input: String::new(),
                });
                Command::none()
            }
            Message::PromptInputChanged(value) => {
                if let Some(dialog) = &mut self.dialog {
                    dialog.input = value;
                }
                Command::none()
            }
            Message::PromptSubmit => {
                let Some(mut dialog) = self.dialog.take() else {
                    return Command::none();
                };
                dialog.answers.push(Some(std::mem::take(&mut dialog.input)));
                dialog.pending.pop_front();
                if dialog.pending.is_empty() {
                    self.finish_dialog(dialog)
                } else {
                    self.dialog = Some(dialog);
                    Command::none()
                }
            }
            Message::PromptCancel => match self.dialog.take() {
                Some(mut dialog) => {
                    dialog.answers.push(None);
                    self.finish_dialog(dialog)
                }
                None => Command::none(),
            },
            Message::DismissNotice => {
                self.controller.dismiss_notice();
                Command::none()
            }
        }
    }

    fn view(&self) -> Element<Message> {
        let title = Text::new("MyToken Wallet")
            .size(24)
            .width(Length::Fill)
            .horizontal_alignment(alignment::Horizontal::Center);

        let mut content = Column::new().push(title).spacing(15).padding(20);

        if let Some(notice) = self.controller.notice() {
            content = content.push(Self::notice_view(notice));
        }
        if let Some(dialog) = self.dialog.as_ref().and_then(Self::dialog_view) {
            content = content.push(dialog);
        }

        content = content
            .push(self.balance_view())
            .push(self.addresses_view())
            .push(self.history_view());

        Container::new(Scrollable::new(content))
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x()
            .padding(10)
            .into()
    }
}
