//! Checkout form contract and the opt-in saved-details store.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::StoreError;

/// File name saved checkout details are persisted under inside the data
/// directory.
const DETAILS_FILE: &str = "checkout_details.json";

/// Contact and delivery fields a shopper submits at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDetails {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("email address looks malformed")]
    MalformedEmail,
}

impl CheckoutDetails {
    /// Checks that every required field is present and the email is
    /// plausible. Input constraints on the client should prevent most of
    /// these from ever reaching the server.
    ///
    /// # Errors
    ///
    /// Returns the first [`CheckoutValidationError`] encountered.
    pub fn validate(&self) -> Result<(), CheckoutValidationError> {
        required("full name", &self.customer_name)?;
        required("email", &self.customer_email)?;
        required("phone number", &self.customer_phone)?;
        required("address line 1", &self.address_line1)?;
        if !plausible_email(self.customer_email.trim()) {
            return Err(CheckoutValidationError::MalformedEmail);
        }
        Ok(())
    }
}

fn required(field: &'static str, value: &str) -> Result<(), CheckoutValidationError> {
    if value.trim().is_empty() {
        Err(CheckoutValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

/// Loose plausibility check: one `@`, a non-empty local part, and a domain
/// with an interior dot. Deliverability is the mail provider's problem.
#[must_use]
pub fn plausible_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Saved checkout details per cart token, written only when the shopper
/// opts in. Same durability contract as the cart store: JSON file under the
/// data directory, fail-open restore.
#[derive(Debug)]
pub struct SavedDetailsStore {
    path: PathBuf,
    details: HashMap<String, CheckoutDetails>,
}

impl SavedDetailsStore {
    #[must_use]
    pub fn open(data_dir: &Path) -> Self {
        let path = data_dir.join(DETAILS_FILE);
        let details = fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        Self { path, details }
    }

    #[must_use]
    pub fn get(&self, token: &str) -> Option<CheckoutDetails> {
        self.details.get(token).cloned()
    }

    /// Stores details for a token and persists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written back to disk.
    pub fn save(&mut self, token: &str, details: CheckoutDetails) -> Result<(), StoreError> {
        self.details.insert(token.to_owned(), details);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&self.details)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}
