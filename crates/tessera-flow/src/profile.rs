// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer profiles: contact defaults, saved addresses, and the last-order
//! snapshot powering reorder shortcuts.
//!
//! Profiles have no TTL; they are created on first successful address save
//! and deleted only on explicit customer request.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::{TesseraError, UserId};
use tessera_store::DebouncedDoc;

/// Maximum saved addresses per profile.
pub const ADDRESS_CAP: usize = 4;

/// One saved address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Unique within the profile.
    pub id: String,
    pub label: String,
    pub text: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Snapshot of the last submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastOrder {
    pub option: String,
    pub address_id: String,
    pub subtotal: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub addresses: Vec<Address>,
    /// Weak reference into `addresses`; re-pointed or cleared when its
    /// target is deleted.
    #[serde(default)]
    pub default_address_id: Option<String>,
    #[serde(default)]
    pub last_order: Option<LastOrder>,
}

fn is_home_label(label: &str) -> bool {
    label.trim().eq_ignore_ascii_case("home")
}

fn is_work_label(label: &str) -> bool {
    label.trim().eq_ignore_ascii_case("work")
}

impl Profile {
    /// Split addresses into the reserved Home/Work slots and the rest.
    pub fn address_slots(&self) -> (Option<&Address>, Option<&Address>, Vec<&Address>) {
        let home = self.addresses.iter().find(|a| is_home_label(&a.label));
        let work = self.addresses.iter().find(|a| is_work_label(&a.label));
        let others = self
            .addresses
            .iter()
            .filter(|a| {
                home.is_none_or(|h| h.id != a.id) && work.is_none_or(|w| w.id != a.id)
            })
            .collect();
        (home, work, others)
    }

    pub fn address(&self, id: &str) -> Option<&Address> {
        self.addresses.iter().find(|a| a.id == id)
    }

    /// Find an address by its label, pictograph-stripped and case-insensitive.
    pub fn address_by_label(&self, label: &str) -> Option<&Address> {
        let wanted = label.trim().to_lowercase();
        self.addresses
            .iter()
            .find(|a| a.label.trim().to_lowercase() == wanted)
    }

    pub fn default_address(&self) -> Option<&Address> {
        self.default_address_id
            .as_deref()
            .and_then(|id| self.address(id))
    }

    /// The first unused "Other" / "Other N" suffix.
    pub fn next_other_label(&self) -> String {
        let mut n = 1usize;
        loop {
            let candidate = if n == 1 {
                "Other".to_string()
            } else {
                format!("Other {n}")
            };
            if self.address_by_label(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Add an address, enforcing the cap. The first saved address becomes the
    /// default.
    pub fn add_address(&mut self, address: Address) -> Result<(), AddressCapReached> {
        if self.addresses.len() >= ADDRESS_CAP {
            return Err(AddressCapReached);
        }
        if self.default_address_id.is_none() {
            self.default_address_id = Some(address.id.clone());
        }
        self.addresses.push(address);
        Ok(())
    }

    /// Delete an address, re-pointing the default to the first survivor (or
    /// clearing it) when the deleted address was the default.
    pub fn delete_address(&mut self, id: &str) -> bool {
        let before = self.addresses.len();
        self.addresses.retain(|a| a.id != id);
        if self.addresses.len() == before {
            return false;
        }
        if self.default_address_id.as_deref() == Some(id) {
            self.default_address_id = self.addresses.first().map(|a| a.id.clone());
        }
        true
    }

    pub fn rename_address(&mut self, id: &str, label: String) -> bool {
        match self.addresses.iter_mut().find(|a| a.id == id) {
            Some(address) => {
                address.label = label;
                true
            }
            None => false,
        }
    }

    pub fn edit_address_text(&mut self, id: &str, text: String) -> bool {
        match self.addresses.iter_mut().find(|a| a.id == id) {
            Some(address) => {
                address.text = text;
                true
            }
            None => false,
        }
    }
}

/// Error marker: the 4-address cap was hit. Callers redirect to the
/// management screen rather than dead-ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressCapReached;

/// Resolution of a label-keyboard choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelChoice {
    /// Reserved or generated label ready to use.
    Resolved(String),
    /// The customer wants to type a custom label.
    Custom,
    /// Not a recognized label button.
    Unrecognized,
}

/// Resolve a label-keyboard tap. "Home" and "Work" are reserved exact
/// matches (case-insensitive, pictograph-stripped); "Other" picks the first
/// unused suffix.
pub fn resolve_label_choice(choice: &str, profile: &Profile) -> LabelChoice {
    let stripped = crate::input::strip_button_label(choice);
    if is_home_label(stripped) {
        return LabelChoice::Resolved("Home".to_string());
    }
    if is_work_label(stripped) {
        return LabelChoice::Resolved("Work".to_string());
    }
    match stripped.to_lowercase().as_str() {
        "other" => LabelChoice::Resolved(profile.next_other_label()),
        "custom" => LabelChoice::Custom,
        _ => LabelChoice::Unrecognized,
    }
}

/// Allocate an address id unique within the profile.
pub fn create_address_id(profile: &Profile, now: DateTime<Utc>) -> String {
    let base = format!("addr{}", now.timestamp_millis());
    if profile.address(&base).is_none() {
        return base;
    }
    let mut n = 1usize;
    loop {
        let candidate = format!("{base}x{n}");
        if profile.address(&candidate).is_none() {
            return candidate;
        }
        n += 1;
    }
}

/// The persisted profile table, keyed by customer user id.
pub struct ProfileTable {
    doc: DebouncedDoc<BTreeMap<String, Profile>>,
}

impl ProfileTable {
    pub fn open(path: impl AsRef<Path>, debounce: Duration) -> Self {
        Self {
            doc: DebouncedDoc::open(path.as_ref(), debounce),
        }
    }

    pub fn get(&self, user: UserId) -> Option<Profile> {
        self.doc.read(|t| t.get(&user.to_string()).cloned())
    }

    pub fn put(&self, user: UserId, profile: Profile) {
        self.doc.update(|t| {
            t.insert(user.to_string(), profile);
        });
    }

    /// Mutate a profile in place; a missing profile is created default.
    pub fn with_mut<R>(&self, user: UserId, f: impl FnOnce(&mut Profile) -> R) -> R {
        self.doc
            .update(|t| f(t.entry(user.to_string()).or_default()))
    }

    pub fn delete(&self, user: UserId) -> bool {
        self.doc.update(|t| t.remove(&user.to_string()).is_some())
    }

    pub async fn shutdown(self) -> Result<(), TesseraError> {
        self.doc.shutdown().await
    }
}
