//! Consumable rights ledger.
//!
//! Tracks how many pages have been printed and how many characters copied
//! against the bounds granted by the license. Counters are persisted under
//! [`keys::rights`] as a single record so the pair never tears.
//!
//! # Invariants
//!
//! - `0 <= consumed <= max` for every bounded right, including after a
//!   reload of a record written under a different license version.
//! - A consumption is committed in memory only after the store accepted it.
//!   A failed write leaves both the store and the ledger unchanged.
//! - Check, persist and commit run under one lock, and the check is made
//!   against the record re-read from the store. Ledgers of the same license
//!   share that lock through [`SharedConsumption`], so concurrent consumers
//!   can never overshoot a bound, whichever session they go through.

use crate::error::LicenseResult;
use crate::keys;
use quire_storage::{load_json, save_json, KeyValueStore};
use quire_types::{License, LicenseId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// A consumable right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Right {
    /// Pages printed.
    Print,
    /// Characters copied.
    Copy,
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Print => "print",
            Self::Copy => "copy",
        })
    }
}

/// Persisted consumption counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightsConsumption {
    pub pages_printed: u32,
    pub characters_copied: u32,
}

impl RightsConsumption {
    fn used(&self, right: Right) -> u32 {
        match right {
            Right::Print => self.pages_printed,
            Right::Copy => self.characters_copied,
        }
    }

    fn add(mut self, right: Right, amount: u32) -> Self {
        match right {
            Right::Print => self.pages_printed = self.pages_printed.saturating_add(amount),
            Right::Copy => self.characters_copied = self.characters_copied.saturating_add(amount),
        }
        self
    }
}

/// Lock and last known counters of one license, shared by all its ledgers.
pub type SharedConsumption = Arc<Mutex<RightsConsumption>>;

/// Per-license ledger of consumed print and copy allowances.
pub struct RightsLedger {
    license_id: LicenseId,
    max_pages: Option<u32>,
    max_chars: Option<u32>,
    store: Arc<dyn KeyValueStore>,
    consumed: SharedConsumption,
}

impl fmt::Debug for RightsLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RightsLedger")
            .field("license_id", &self.license_id)
            .field("max_pages", &self.max_pages)
            .field("max_chars", &self.max_chars)
            .field("consumed", &self.consumption())
            .finish_non_exhaustive()
    }
}

impl RightsLedger {
    /// Loads the ledger of `license`, starting from zero when nothing was
    /// persisted yet.
    pub fn load(license: &License, store: Arc<dyn KeyValueStore>) -> LicenseResult<Self> {
        Self::load_shared(license, store, SharedConsumption::default())
    }

    /// Loads the ledger of `license` on top of counters shared with the
    /// other open ledgers of the same license.
    pub fn load_shared(
        license: &License,
        store: Arc<dyn KeyValueStore>,
        consumed: SharedConsumption,
    ) -> LicenseResult<Self> {
        let ledger = Self {
            license_id: license.id.clone(),
            max_pages: license.rights.print,
            max_chars: license.rights.copy,
            store,
            consumed,
        };

        let mut guard = ledger.lock();
        let (current, clamped) = ledger.read_stored()?;
        if clamped {
            warn!(
                "Clamped stored rights of license {} to the current bounds",
                license.id
            );
        }
        *guard = current;
        drop(guard);

        Ok(ledger)
    }

    /// Persisted counters clamped to this license's bounds, and whether
    /// clamping changed them.
    fn read_stored(&self) -> LicenseResult<(RightsConsumption, bool)> {
        let stored: RightsConsumption =
            load_json(self.store.as_ref(), &keys::rights(&self.license_id))?.unwrap_or_default();
        let current = RightsConsumption {
            pages_printed: clamp(stored.pages_printed, self.max_pages),
            characters_copied: clamp(stored.characters_copied, self.max_chars),
        };
        Ok((current, current != stored))
    }

    fn lock(&self) -> MutexGuard<'_, RightsConsumption> {
        // Only ever assigned whole, so a poisoned value is still consistent.
        self.consumed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current counters.
    pub fn consumption(&self) -> RightsConsumption {
        *self.lock()
    }

    fn max(&self, right: Right) -> Option<u32> {
        match right {
            Right::Print => self.max_pages,
            Right::Copy => self.max_chars,
        }
    }

    /// Remaining allowance of `right`; `None` means unbounded.
    pub fn remaining(&self, right: Right) -> Option<u32> {
        let used = self.lock().used(right);
        self.max(right).map(|max| max.saturating_sub(used))
    }

    /// Pages left to print; `None` means unbounded.
    pub fn remaining_pages(&self) -> Option<u32> {
        self.remaining(Right::Print)
    }

    /// Characters left to copy; `None` means unbounded.
    pub fn remaining_characters(&self) -> Option<u32> {
        self.remaining(Right::Copy)
    }

    pub fn can_print(&self, pages: u32) -> bool {
        self.remaining_pages().is_none_or(|left| pages <= left)
    }

    pub fn can_copy(&self, text: &str) -> bool {
        let chars = char_count(text);
        self.remaining_characters().is_none_or(|left| chars <= left)
    }

    /// Consumes `pages` print pages. Returns `Ok(false)` without any change
    /// when the allowance is insufficient.
    pub fn consume_print(&self, pages: u32) -> LicenseResult<bool> {
        self.consume(Right::Print, pages)
    }

    /// Consumes the Unicode scalar count of `text` from the copy allowance.
    pub fn consume_copy(&self, text: &str) -> LicenseResult<bool> {
        self.consume(Right::Copy, char_count(text))
    }

    fn consume(&self, right: Right, amount: u32) -> LicenseResult<bool> {
        let mut consumed = self.lock();
        // Another ledger or process may have written since the last look.
        *consumed = self.read_stored()?.0;
        if let Some(max) = self.max(right) {
            let left = max.saturating_sub(consumed.used(right));
            if amount > left {
                debug!(
                    "Refused {} {} on license {} ({} left)",
                    right, amount, self.license_id, left
                );
                return Ok(false);
            }
        }
        if amount == 0 {
            return Ok(true);
        }

        let next = consumed.add(right, amount);
        save_json(self.store.as_ref(), &keys::rights(&self.license_id), &next)?;
        *consumed = next;

        debug!("Consumed {} {} on license {}", right, amount, self.license_id);
        Ok(true)
    }
}

fn clamp(value: u32, max: Option<u32>) -> u32 {
    max.map_or(value, |max| value.min(max))
}

/// Number of Unicode scalar values in `text`.
pub fn char_count(text: &str) -> u32 {
    u32::try_from(text.chars().count()).unwrap_or(u32::MAX)
}
