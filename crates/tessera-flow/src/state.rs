// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The flat dialogue state enum and screen identifiers.
//!
//! One tagged state value per customer, dispatched through one exhaustive
//! match. New dialogues are added as new members and match arms, never as a
//! screen hierarchy.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Where in a multi-step dialogue a customer currently is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowState {
    #[default]
    Idle,
    AwaitProfileChoice,
    AwaitName,
    AwaitPhone,
    AwaitAddressText,
    AwaitAddressLabel,
    AwaitAddressLabelCustom,
    AwaitProfilePostSave,
    AwaitAddressPick,
    AwaitSubtotal,
    AwaitConfirm,
    AwaitTicketPick,
    AwaitAddAddressText,
    AwaitAddAddressLabel,
    AwaitAddAddressLabelCustom,
    AwaitManagePick,
    AwaitManageAction,
    AwaitEditAddress,
    AwaitRenameLabel,
    AwaitRenameLabelCustom,
    AwaitDeleteConfirm,
}

/// Identifier of a rendered screen, kept on the nav stack so "back" can
/// re-render the screen one level up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "screen", content = "arg")]
pub enum Screen {
    Home,
    ProfilePrompt,
    ProfileView,
    AddressPicker,
    SingleAddress,
    SubtotalPrompt,
    Confirm,
    ManageList,
    /// Management card for one address, by address id.
    ManageCard(String),
    TicketPick,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_serializes_as_screaming_snake() {
        let json = serde_json::to_string(&FlowState::AwaitAddressLabelCustom).unwrap();
        assert_eq!(json, "\"AWAIT_ADDRESS_LABEL_CUSTOM\"");
        let back: FlowState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FlowState::AwaitAddressLabelCustom);
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(FlowState::default(), FlowState::Idle);
    }
}
