use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock};

use tracing::info;

/// Allow-list of referral codes that bypass the intermediate approval gates.
///
/// Codes are normalized (trimmed, uppercased) on every path. There is no expiry or
/// single-use semantics; codes stay valid until removed.
#[derive(Debug, Default)]
pub struct ReferralRegistry {
    codes: RwLock<BTreeSet<String>>,
}

pub fn normalize(code: &str) -> Option<String> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_uppercase())
    }
}

impl ReferralRegistry {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes: BTreeSet<String> = codes
            .into_iter()
            .filter_map(|code| normalize(code.as_ref()))
            .collect();
        info!(count = codes.len(), "initialized referral registry");
        Self {
            codes: RwLock::new(codes),
        }
    }

    pub fn is_valid(&self, code: &str) -> bool {
        let Some(code) = normalize(code) else {
            return false;
        };
        self.codes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&code)
    }

    /// Returns `false` for blank codes and codes already present.
    pub fn add(&self, code: &str) -> bool {
        let Some(code) = normalize(code) else {
            return false;
        };
        let added = self
            .codes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(code.clone());
        info!(%code, added, "referral code added");
        added
    }

    pub fn remove(&self, code: &str) -> bool {
        let Some(code) = normalize(code) else {
            return false;
        };
        let removed = self
            .codes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&code);
        info!(%code, removed, "referral code removed");
        removed
    }

    /// Sorted snapshot of the registered codes.
    pub fn codes(&self) -> Vec<String> {
        self.codes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}
