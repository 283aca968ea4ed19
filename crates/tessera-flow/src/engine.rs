// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The order-intake state machine. One exhaustive match over [`FlowState`]
//! drives every customer dialogue; escapes are checked before any state
//! handler runs, and blank input always re-prompts without advancing.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tessera_config::model::{OrderConfig, SessionConfig, StorageConfig};
use tessera_core::{OutboundMessage, TesseraError, UserId};
use tracing::debug;

use crate::input::{
    check_subtotal, clean_text, detect_escape, strip_button_label, Escape, SubtotalVerdict,
};
use crate::profile::{
    create_address_id, resolve_label_choice, Address, LabelChoice, LastOrder, ProfileTable,
};
use crate::screens::{
    self, render_screen, BTN_ADD_ADDRESS, BTN_CHANGE_ADDRESS, BTN_CHOOSE_ANOTHER,
    BTN_CONTINUE_ORDER, BTN_CREATE_PROFILE, BTN_DELETE, BTN_DELETE_NO, BTN_DELETE_YES, BTN_EDIT,
    BTN_MANAGE, BTN_RENAME, BTN_SET_DEFAULT, BTN_SKIP, BTN_USE_ADDRESS,
};
use crate::session::{SessionRecord, SessionTable};
use crate::state::{FlowState, Screen};

/// Everything collected by the dialogue, ready for ticket creation.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub option: String,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub subtotal: f64,
}

/// What the caller should do with the customer's message.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    /// Send these back; the dialogue continues.
    Replies(Vec<OutboundMessage>),
    /// The order is complete; create a ticket from the draft.
    Submit {
        draft: OrderDraft,
        replies: Vec<OutboundMessage>,
    },
    /// The customer picked which open ticket their messages refer to.
    TicketChosen {
        ticket: u64,
        replies: Vec<OutboundMessage>,
    },
    /// No dialogue in progress; the message belongs to ticket relay.
    PassThrough,
}

impl FlowOutcome {
    fn reply(message: OutboundMessage) -> Self {
        Self::Replies(vec![message])
    }
}

/// State a screen tap can land the customer in when "back" re-renders it.
fn state_for_screen(screen: &Screen) -> FlowState {
    match screen {
        Screen::Home => FlowState::Idle,
        Screen::ProfilePrompt => FlowState::AwaitProfileChoice,
        Screen::ProfileView => FlowState::AwaitAddressPick,
        Screen::AddressPicker | Screen::SingleAddress => FlowState::AwaitAddressPick,
        Screen::SubtotalPrompt => FlowState::AwaitSubtotal,
        Screen::Confirm => FlowState::AwaitConfirm,
        Screen::ManageList => FlowState::AwaitManagePick,
        Screen::ManageCard(_) => FlowState::AwaitManageAction,
        Screen::TicketPick => FlowState::AwaitTicketPick,
    }
}

pub struct FlowEngine {
    profiles: ProfileTable,
    sessions: SessionTable,
    band: OrderConfig,
}

impl FlowEngine {
    /// Open the profile and session tables under `data_dir`.
    pub fn open(
        data_dir: &Path,
        storage: &StorageConfig,
        sessions_cfg: &SessionConfig,
        band: OrderConfig,
    ) -> Self {
        let debounce = Duration::from_millis(storage.flush_debounce_ms);
        Self {
            profiles: ProfileTable::open(data_dir.join("users.json"), debounce),
            sessions: SessionTable::open(
                data_dir.join("sessions.json"),
                debounce,
                sessions_cfg.ttl_minutes,
            ),
            band,
        }
    }

    pub fn new(profiles: ProfileTable, sessions: SessionTable, band: OrderConfig) -> Self {
        Self {
            profiles,
            sessions,
            band,
        }
    }

    pub fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }

    /// Drop idle sessions, returning the affected users.
    pub fn expire_idle(&self, now: DateTime<Utc>) -> Vec<UserId> {
        self.sessions.expire(now)
    }

    /// Whether the customer is mid-dialogue (their messages are not relay).
    pub fn in_dialogue(&self, user: UserId) -> bool {
        self.sessions
            .get(user)
            .is_some_and(|s| s.state != FlowState::Idle)
    }

    pub fn flush_now(&self) -> Result<(), TesseraError> {
        self.sessions.flush_now()
    }

    pub async fn shutdown(self) -> Result<(), TesseraError> {
        self.sessions.shutdown().await?;
        self.profiles.shutdown().await
    }

    fn render(&self, screen: &Screen, user: UserId, session: &SessionRecord) -> OutboundMessage {
        let profile = self.profiles.get(user);
        render_screen(screen, profile.as_ref(), session, &self.band)
    }

    /// Show a screen: push it on the nav stack, sync the state, render.
    fn show(
        &self,
        user: UserId,
        session: &mut SessionRecord,
        screen: Screen,
    ) -> OutboundMessage {
        session.push_screen(screen.clone());
        session.state = state_for_screen(&screen);
        self.render(&screen, user, session)
    }

    /// Entry point: the customer tapped a menu option on the home screen.
    pub fn begin_order(&self, user: UserId, option: &str, now: DateTime<Utc>) -> FlowOutcome {
        let mut session = self
            .sessions
            .get(user)
            .unwrap_or_else(|| SessionRecord::new(FlowState::Idle, now));
        session.go_home();
        session.selected_option = Some(option.to_string());

        let profile = self.profiles.get(user);
        let reply = match &profile {
            Some(p) if p.default_address().is_some() => {
                session.selected_address_id = p.default_address_id.clone();
                self.show(user, &mut session, Screen::SingleAddress)
            }
            Some(p) if !p.addresses.is_empty() => {
                self.show(user, &mut session, Screen::AddressPicker)
            }
            _ => self.show(user, &mut session, Screen::ProfilePrompt),
        };
        debug!(user = user.0, option, state = %session.state, "order started");
        self.sessions.put(user, session, now);
        FlowOutcome::reply(reply)
    }

    /// Put the customer on the ticket-disambiguation screen.
    pub fn request_ticket_pick(&self, user: UserId, now: DateTime<Utc>) -> OutboundMessage {
        let mut session = self
            .sessions
            .get(user)
            .unwrap_or_else(|| SessionRecord::new(FlowState::Idle, now));
        let reply = self.show(user, &mut session, Screen::TicketPick);
        self.sessions.put(user, session, now);
        reply
    }

    /// Abandon any dialogue in progress, returning the customer to idle.
    pub fn reset(&self, user: UserId) {
        self.sessions.delete(user);
    }

    /// Open the saved-address manager directly, outside an order.
    pub fn open_profile(&self, user: UserId, now: DateTime<Utc>) -> OutboundMessage {
        let mut session = self
            .sessions
            .get(user)
            .unwrap_or_else(|| SessionRecord::new(FlowState::Idle, now));
        let reply = self.show(user, &mut session, Screen::ManageList);
        self.sessions.put(user, session, now);
        reply
    }

    /// Delete the stored profile and any dialogue state outright.
    pub fn delete_profile(&self, user: UserId) -> bool {
        self.sessions.delete(user);
        self.profiles.delete(user)
    }

    /// Handle one customer text message against the current dialogue state.
    pub fn handle_text(&self, user: UserId, text: &str, now: DateTime<Utc>) -> FlowOutcome {
        let Some(mut session) = self.sessions.get(user) else {
            return FlowOutcome::PassThrough;
        };
        if session.state == FlowState::Idle {
            return FlowOutcome::PassThrough;
        }

        // Universal escapes run before any state handler, except in label
        // dialogues where "Home" is a label button, not navigation.
        let label_state = matches!(
            session.state,
            FlowState::AwaitAddressLabel
                | FlowState::AwaitAddressLabelCustom
                | FlowState::AwaitAddAddressLabel
                | FlowState::AwaitAddAddressLabelCustom
                | FlowState::AwaitRenameLabel
                | FlowState::AwaitRenameLabelCustom
        );
        match detect_escape(text) {
            Some(Escape::Home | Escape::Back) if label_state => {}
            Some(Escape::Home) => {
                session.go_home();
                let reply = self.render(&Screen::Home, user, &session);
                self.sessions.put(user, session, now);
                return FlowOutcome::reply(reply);
            }
            Some(Escape::Back) => {
                let screen = session.pop_screen();
                session.state = state_for_screen(&screen);
                let reply = self.render(&screen, user, &session);
                self.sessions.put(user, session, now);
                return FlowOutcome::reply(reply);
            }
            Some(Escape::Cancel)
                if label_state || session.state == FlowState::AwaitDeleteConfirm =>
            {
                // Abort the sub-dialogue, back to the screen it started from.
                let screen = session.current_screen().clone();
                session.state = state_for_screen(&screen);
                let reply = self.render(&screen, user, &session);
                self.sessions.put(user, session, now);
                return FlowOutcome::reply(reply);
            }
            Some(Escape::Cancel) => {
                session.go_home();
                let reply = self.render(&Screen::Home, user, &session);
                self.sessions.put(user, session, now);
                return FlowOutcome::reply(reply);
            }
            None => {}
        }

        // Blank input never advances a dialogue.
        let Some(input) = clean_text(text) else {
            let reply = self.render(&session.current_screen().clone(), user, &session);
            self.sessions.put(user, session, now);
            return FlowOutcome::reply(reply);
        };

        let outcome = self.dispatch(user, &mut session, input, now);
        match outcome {
            FlowOutcome::Submit { .. } | FlowOutcome::TicketChosen { .. } => {
                self.sessions.delete(user);
            }
            _ => self.sessions.put(user, session, now),
        }
        outcome
    }

    fn dispatch(
        &self,
        user: UserId,
        session: &mut SessionRecord,
        input: &str,
        now: DateTime<Utc>,
    ) -> FlowOutcome {
        match session.state {
            FlowState::Idle => FlowOutcome::PassThrough,

            FlowState::AwaitProfileChoice => match input {
                BTN_CREATE_PROFILE => {
                    session.temp.ephemeral = false;
                    session.state = FlowState::AwaitName;
                    FlowOutcome::reply(OutboundMessage::text("👤 First and last name?"))
                }
                BTN_SKIP => {
                    session.temp.ephemeral = true;
                    session.state = FlowState::AwaitName;
                    FlowOutcome::reply(OutboundMessage::text("👤 First and last name?"))
                }
                _ => FlowOutcome::reply(self.render(&Screen::ProfilePrompt, user, session)),
            },

            FlowState::AwaitName => {
                session.temp.name = Some(input.to_string());
                session.state = FlowState::AwaitPhone;
                FlowOutcome::reply(OutboundMessage::text("📞 Phone number for the driver?"))
            }

            FlowState::AwaitPhone => {
                session.temp.phone = Some(input.to_string());
                session.state = FlowState::AwaitAddressText;
                FlowOutcome::reply(OutboundMessage::text(
                    "📍 Delivery address?\n(street, city, zip)",
                ))
            }

            FlowState::AwaitAddressText => {
                session.temp.address_text = Some(input.to_string());
                if session.temp.ephemeral {
                    // Skip path: nothing is saved, straight to the subtotal.
                    FlowOutcome::reply(self.show(user, session, Screen::SubtotalPrompt))
                } else {
                    session.state = FlowState::AwaitAddressLabel;
                    FlowOutcome::reply(
                        OutboundMessage::text("🏷 Label this address:")
                            .with_keyboard(screens::label_keyboard()),
                    )
                }
            }

            FlowState::AwaitAddressLabel => {
                self.handle_label_choice(user, session, input, now, SaveTarget::FirstProfile)
            }
            FlowState::AwaitAddressLabelCustom => {
                self.handle_custom_label(user, session, input, now, SaveTarget::FirstProfile)
            }

            FlowState::AwaitProfilePostSave => match input {
                BTN_CONTINUE_ORDER => {
                    FlowOutcome::reply(self.show(user, session, Screen::SubtotalPrompt))
                }
                _ => FlowOutcome::reply(
                    OutboundMessage::text("✅ Profile saved. Ready to continue?")
                        .with_keyboard(post_save_keyboard()),
                ),
            },

            FlowState::AwaitAddressPick => self.handle_address_pick(user, session, input),

            FlowState::AwaitSubtotal => match input {
                BTN_CHANGE_ADDRESS => {
                    FlowOutcome::reply(self.show(user, session, Screen::AddressPicker))
                }
                BTN_MANAGE => FlowOutcome::reply(self.show(user, session, Screen::ManageList)),
                _ => match check_subtotal(input, &self.band) {
                    SubtotalVerdict::Ok(value) => {
                        session.temp.subtotal = Some(value);
                        FlowOutcome::reply(self.show(user, session, Screen::Confirm))
                    }
                    SubtotalVerdict::BelowMin { value, min } => {
                        FlowOutcome::reply(OutboundMessage::text(format!(
                            "❌ ${value:.2} is below the ${min:.0} minimum. What's the subtotal?"
                        )))
                    }
                    SubtotalVerdict::AboveMax { value, max } => {
                        FlowOutcome::reply(OutboundMessage::text(format!(
                            "❌ ${value:.2} is above the ${max:.0} maximum. What's the subtotal?"
                        )))
                    }
                    SubtotalVerdict::Unparseable => FlowOutcome::reply(OutboundMessage::text(
                        "❌ Please send the cart subtotal as a number, e.g. 65 or 62.50.",
                    )),
                },
            },

            FlowState::AwaitConfirm => {
                if input == BTN_CONTINUE_ORDER || input.eq_ignore_ascii_case("yes") {
                    self.finalize(user, session, now)
                } else {
                    FlowOutcome::reply(self.render(&Screen::Confirm, user, session))
                }
            }

            FlowState::AwaitTicketPick => {
                let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
                match digits.parse::<u64>() {
                    Ok(ticket) => FlowOutcome::TicketChosen {
                        ticket,
                        replies: Vec::new(),
                    },
                    Err(_) => {
                        FlowOutcome::reply(self.render(&Screen::TicketPick, user, session))
                    }
                }
            }

            FlowState::AwaitAddAddressText => {
                session.temp.address_text = Some(input.to_string());
                session.state = FlowState::AwaitAddAddressLabel;
                FlowOutcome::reply(
                    OutboundMessage::text("🏷 Label this address:")
                        .with_keyboard(screens::label_keyboard()),
                )
            }
            FlowState::AwaitAddAddressLabel => {
                self.handle_label_choice(user, session, input, now, SaveTarget::Additional)
            }
            FlowState::AwaitAddAddressLabelCustom => {
                self.handle_custom_label(user, session, input, now, SaveTarget::Additional)
            }

            FlowState::AwaitManagePick => {
                if input == BTN_ADD_ADDRESS {
                    return self.start_add_address(user, session);
                }
                let profile = self.profiles.get(user).unwrap_or_default();
                match profile.address_by_label(strip_button_label(input)) {
                    Some(address) => {
                        let id = address.id.clone();
                        FlowOutcome::reply(self.show(user, session, Screen::ManageCard(id)))
                    }
                    None => FlowOutcome::reply(self.render(&Screen::ManageList, user, session)),
                }
            }

            FlowState::AwaitManageAction => {
                let Some(id) = managed_address_id(session) else {
                    return FlowOutcome::reply(self.show(user, session, Screen::ManageList));
                };
                match input {
                    BTN_SET_DEFAULT => {
                        self.profiles.with_mut(user, |p| {
                            p.default_address_id = Some(id.clone());
                        });
                        let card = self.render(&Screen::ManageCard(id), user, session);
                        FlowOutcome::Replies(vec![
                            OutboundMessage::text("⭐ Default updated."),
                            card,
                        ])
                    }
                    BTN_EDIT => {
                        session.state = FlowState::AwaitEditAddress;
                        FlowOutcome::reply(OutboundMessage::text("✏️ Send the new address text:"))
                    }
                    BTN_RENAME => {
                        session.state = FlowState::AwaitRenameLabel;
                        FlowOutcome::reply(
                            OutboundMessage::text("🏷 Pick a new label:")
                                .with_keyboard(screens::label_keyboard()),
                        )
                    }
                    BTN_DELETE => {
                        session.state = FlowState::AwaitDeleteConfirm;
                        FlowOutcome::reply(
                            OutboundMessage::text("🗑 Delete this address?")
                                .with_keyboard(screens::delete_confirm_keyboard()),
                        )
                    }
                    _ => FlowOutcome::reply(self.render(&Screen::ManageCard(id), user, session)),
                }
            }

            FlowState::AwaitEditAddress => {
                let Some(id) = managed_address_id(session) else {
                    return FlowOutcome::reply(self.show(user, session, Screen::ManageList));
                };
                self.profiles.with_mut(user, |p| {
                    p.edit_address_text(&id, input.to_string());
                });
                session.state = FlowState::AwaitManageAction;
                let card = self.render(&Screen::ManageCard(id), user, session);
                FlowOutcome::Replies(vec![OutboundMessage::text("✅ Address updated."), card])
            }

            FlowState::AwaitRenameLabel => {
                let profile = self.profiles.get(user).unwrap_or_default();
                match resolve_label_choice(input, &profile) {
                    LabelChoice::Resolved(label) => self.apply_rename(user, session, label),
                    LabelChoice::Custom => {
                        session.state = FlowState::AwaitRenameLabelCustom;
                        FlowOutcome::reply(OutboundMessage::text("✍️ Send the new label:"))
                    }
                    LabelChoice::Unrecognized => FlowOutcome::reply(
                        OutboundMessage::text("🏷 Pick a new label:")
                            .with_keyboard(screens::label_keyboard()),
                    ),
                }
            }
            FlowState::AwaitRenameLabelCustom => {
                self.apply_rename(user, session, input.to_string())
            }

            FlowState::AwaitDeleteConfirm => {
                let Some(id) = managed_address_id(session) else {
                    return FlowOutcome::reply(self.show(user, session, Screen::ManageList));
                };
                match input {
                    BTN_DELETE_YES => {
                        self.profiles.with_mut(user, |p| {
                            p.delete_address(&id);
                        });
                        if session.selected_address_id.as_deref() == Some(id.as_str()) {
                            session.selected_address_id = None;
                        }
                        // Drop the card from the nav stack; it no longer exists.
                        session.pop_screen();
                        let list = self.show(user, session, Screen::ManageList);
                        FlowOutcome::Replies(vec![
                            OutboundMessage::text("🗑 Address deleted."),
                            list,
                        ])
                    }
                    BTN_DELETE_NO => {
                        session.state = FlowState::AwaitManageAction;
                        FlowOutcome::reply(self.render(&Screen::ManageCard(id), user, session))
                    }
                    _ => FlowOutcome::reply(
                        OutboundMessage::text("🗑 Delete this address?")
                            .with_keyboard(screens::delete_confirm_keyboard()),
                    ),
                }
            }
        }
    }

    fn handle_address_pick(
        &self,
        user: UserId,
        session: &mut SessionRecord,
        input: &str,
    ) -> FlowOutcome {
        let profile = self.profiles.get(user).unwrap_or_default();
        match input {
            BTN_USE_ADDRESS => {
                if session.selected_address_id.is_none() {
                    session.selected_address_id = profile.default_address_id.clone();
                }
                if session.selected_address_id.is_none() {
                    return FlowOutcome::reply(self.show(user, session, Screen::AddressPicker));
                }
                FlowOutcome::reply(self.show(user, session, Screen::SubtotalPrompt))
            }
            BTN_CHOOSE_ANOTHER => {
                FlowOutcome::reply(self.show(user, session, Screen::AddressPicker))
            }
            BTN_ADD_ADDRESS => self.start_add_address(user, session),
            BTN_MANAGE => FlowOutcome::reply(self.show(user, session, Screen::ManageList)),
            _ => match profile.address_by_label(strip_button_label(input)) {
                Some(address) => {
                    session.selected_address_id = Some(address.id.clone());
                    FlowOutcome::reply(self.show(user, session, Screen::SubtotalPrompt))
                }
                None => {
                    let screen = session.current_screen().clone();
                    FlowOutcome::reply(self.render(&screen, user, session))
                }
            },
        }
    }

    /// Enter the add-address dialogue, redirecting to management when the
    /// address cap is already reached.
    fn start_add_address(&self, user: UserId, session: &mut SessionRecord) -> FlowOutcome {
        let profile = self.profiles.get(user).unwrap_or_default();
        if profile.addresses.len() >= crate::profile::ADDRESS_CAP {
            let list = self.show(user, session, Screen::ManageList);
            return FlowOutcome::Replies(vec![
                OutboundMessage::text(
                    "❌ You already have 4 saved addresses. Delete one first.",
                ),
                list,
            ]);
        }
        session.state = FlowState::AwaitAddAddressText;
        FlowOutcome::reply(OutboundMessage::text(
            "📍 Send the new address.\n(street, city, zip)",
        ))
    }

    fn handle_label_choice(
        &self,
        user: UserId,
        session: &mut SessionRecord,
        input: &str,
        now: DateTime<Utc>,
        target: SaveTarget,
    ) -> FlowOutcome {
        let profile = self.profiles.get(user).unwrap_or_default();
        match resolve_label_choice(input, &profile) {
            LabelChoice::Resolved(label) => self.save_address(user, session, label, now, target),
            LabelChoice::Custom => {
                session.state = match target {
                    SaveTarget::FirstProfile => FlowState::AwaitAddressLabelCustom,
                    SaveTarget::Additional => FlowState::AwaitAddAddressLabelCustom,
                };
                FlowOutcome::reply(OutboundMessage::text("✍️ Send a label for this address:"))
            }
            LabelChoice::Unrecognized => FlowOutcome::reply(
                OutboundMessage::text("🏷 Label this address:")
                    .with_keyboard(screens::label_keyboard()),
            ),
        }
    }

    fn handle_custom_label(
        &self,
        user: UserId,
        session: &mut SessionRecord,
        input: &str,
        now: DateTime<Utc>,
        target: SaveTarget,
    ) -> FlowOutcome {
        self.save_address(user, session, input.to_string(), now, target)
    }

    /// Persist the captured address under `label`. Reserved labels overwrite
    /// the existing slot; anything else must be unused.
    fn save_address(
        &self,
        user: UserId,
        session: &mut SessionRecord,
        label: String,
        now: DateTime<Utc>,
        target: SaveTarget,
    ) -> FlowOutcome {
        let Some(text) = session.temp.address_text.clone() else {
            return FlowOutcome::reply(self.show(user, session, Screen::Home));
        };
        let name = session.temp.name.clone();
        let phone = session.temp.phone.clone();
        let reserved = matches!(label.trim().to_lowercase().as_str(), "home" | "work");

        let saved = self.profiles.with_mut(user, |p| {
            if name.is_some() && p.name.is_empty() {
                p.name = name.clone().unwrap_or_default();
            }
            if phone.is_some() && p.phone.is_empty() {
                p.phone = phone.clone().unwrap_or_default();
            }
            if let Some(existing) = p.address_by_label(&label) {
                if !reserved {
                    return Err(SaveError::LabelTaken);
                }
                let id = existing.id.clone();
                p.edit_address_text(&id, text.clone());
                return Ok(id);
            }
            let id = create_address_id(p, now);
            p.add_address(Address {
                id: id.clone(),
                label: label.clone(),
                text: text.clone(),
                name: name.clone(),
                phone: phone.clone(),
            })
            .map_err(|_| SaveError::CapReached)?;
            Ok(id)
        });

        match saved {
            Ok(id) => {
                session.selected_address_id = Some(id);
                session.temp.address_text = None;
                match target {
                    SaveTarget::FirstProfile => {
                        session.state = FlowState::AwaitProfilePostSave;
                        FlowOutcome::reply(
                            OutboundMessage::text(format!(
                                "✅ Saved as \"{label}\". Ready to continue?"
                            ))
                            .with_keyboard(post_save_keyboard()),
                        )
                    }
                    SaveTarget::Additional => {
                        let picker = self.show(user, session, Screen::AddressPicker);
                        FlowOutcome::Replies(vec![
                            OutboundMessage::text(format!("✅ Saved as \"{label}\".")),
                            picker,
                        ])
                    }
                }
            }
            Err(SaveError::LabelTaken) => FlowOutcome::reply(
                OutboundMessage::text(format!(
                    "❌ \"{label}\" is already in use. Pick another label:"
                ))
                .with_keyboard(screens::label_keyboard()),
            ),
            Err(SaveError::CapReached) => {
                let list = self.show(user, session, Screen::ManageList);
                FlowOutcome::Replies(vec![
                    OutboundMessage::text(
                        "❌ You already have 4 saved addresses. Delete one first.",
                    ),
                    list,
                ])
            }
        }
    }

    fn apply_rename(
        &self,
        user: UserId,
        session: &mut SessionRecord,
        label: String,
    ) -> FlowOutcome {
        let Some(id) = managed_address_id(session) else {
            return FlowOutcome::reply(self.show(user, session, Screen::ManageList));
        };
        let renamed = self.profiles.with_mut(user, |p| {
            if p.address_by_label(&label).is_some_and(|a| a.id != id) {
                return false;
            }
            p.rename_address(&id, label.clone())
        });
        if !renamed {
            return FlowOutcome::reply(
                OutboundMessage::text(format!(
                    "❌ \"{label}\" is already in use. Pick another label:"
                ))
                .with_keyboard(screens::label_keyboard()),
            );
        }
        session.state = FlowState::AwaitManageAction;
        let card = self.render(&Screen::ManageCard(id), user, session);
        FlowOutcome::Replies(vec![
            OutboundMessage::text(format!("✅ Renamed to \"{label}\".")),
            card,
        ])
    }

    /// Assemble the draft from session plus profile and clear the dialogue.
    fn finalize(
        &self,
        user: UserId,
        session: &mut SessionRecord,
        now: DateTime<Utc>,
    ) -> FlowOutcome {
        let profile = self.profiles.get(user).unwrap_or_default();
        let option = session.selected_option.clone().unwrap_or_default();
        let selected = session
            .selected_address_id
            .as_deref()
            .and_then(|id| profile.address(id));

        let name = session
            .temp
            .name
            .clone()
            .or_else(|| selected.and_then(|a| a.name.clone()))
            .unwrap_or_else(|| profile.name.clone());
        let phone = session
            .temp
            .phone
            .clone()
            .or_else(|| selected.and_then(|a| a.phone.clone()))
            .unwrap_or_else(|| profile.phone.clone());
        let address = session
            .temp
            .address_text
            .clone()
            .or_else(|| selected.map(|a| a.text.clone()))
            .unwrap_or_default();
        let subtotal = session.temp.subtotal.unwrap_or_default();

        if !session.temp.ephemeral {
            if let Some(id) = session.selected_address_id.clone() {
                self.profiles.with_mut(user, |p| {
                    p.last_order = Some(LastOrder {
                        option: option.clone(),
                        address_id: id,
                        subtotal,
                        updated_at: now,
                    });
                });
            }
        }

        debug!(user = user.0, option, subtotal, "order submitted");
        FlowOutcome::Submit {
            draft: OrderDraft {
                option,
                name,
                phone,
                address,
                subtotal,
            },
            replies: Vec::new(),
        }
    }
}

/// Where a saved address came from: first-time profile creation or the
/// add-another path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveTarget {
    FirstProfile,
    Additional,
}

enum SaveError {
    LabelTaken,
    CapReached,
}

fn post_save_keyboard() -> tessera_core::Keyboard {
    tessera_core::Keyboard::Reply(vec![
        vec![BTN_CONTINUE_ORDER.to_string()],
        vec![screens::BTN_HOME.to_string()],
    ])
}

/// Address id of the management card currently on top of the nav stack.
fn managed_address_id(session: &SessionRecord) -> Option<String> {
    match session.current_screen() {
        Screen::ManageCard(id) => Some(id.clone()),
        _ => None,
    }
}
