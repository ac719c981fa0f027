//! Keys of the records the engine persists in the [`quire_storage::KeyValueStore`].

use quire_types::{DeviceId, LicenseId};

/// Persisted local device identifier.
pub const DEVICE_ID: &str = "device/id";

/// Consumed rights counters of a license.
#[must_use]
pub fn rights(license: &LicenseId) -> String {
    format!("license/{license}/rights")
}

/// Verified hashed passphrase of a license.
#[must_use]
pub fn passphrase(license: &LicenseId) -> String {
    format!("license/{license}/passphrase")
}

/// Hashed passphrases that opened licenses of a user.
#[must_use]
pub fn user_passphrases(user_id: &str) -> String {
    format!("user/{user_id}/passphrases")
}

/// Registration flag of a device for a license.
#[must_use]
pub fn device_registered(license: &LicenseId, device: &DeviceId) -> String {
    format!("license/{license}/device/{device}/registered")
}
