//! Shopping carts and their on-disk persistence.
//!
//! Carts are client state, not catalog state: they live outside the database,
//! keyed by an opaque per-device token, and are written back to a JSON file
//! after every mutation so they survive a process restart.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::money;

/// File name the cart map is persisted under inside the data directory.
const CART_FILE: &str = "carts.json";

/// A single product line held in a cart.
///
/// `unit_price_cents` is snapshotted when the product is added and stays
/// fixed even if the catalog price changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

/// An ordered sequence of cart items for one shopper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Adds a line to the cart. If a line for the same product already
    /// exists its quantity is incremented by `item.quantity`; otherwise the
    /// line is appended.
    pub fn add(&mut self, item: CartItem) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.product_id == item.product_id)
        {
            existing.quantity += item.quantity;
        } else {
            self.items.push(item);
        }
    }

    /// Sets a line's quantity. Zero or negative quantities remove the line
    /// instead of erroring; an unknown product id is a silent no-op.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: i64) {
        if quantity <= 0 {
            self.remove(product_id);
            return;
        }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            existing.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
    }

    /// Removes the line for `product_id`; no-op if absent.
    pub fn remove(&mut self, product_id: Uuid) {
        self.items.retain(|i| i.product_id != product_id);
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Sum of `unit_price × quantity` over all lines, in cents.
    ///
    /// Recomputed on every call and never stored, so it cannot drift from
    /// the lines it is derived from.
    #[must_use]
    pub fn total_cents(&self) -> i64 {
        self.items
            .iter()
            .map(|i| money::line_total(i.unit_price_cents, i.quantity))
            .sum()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to persist store: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode store: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Every cart known to this process, keyed by the client's cart token.
///
/// Opened once at startup and kept for the life of the process; all
/// mutations go through its methods and each one writes the whole map back
/// to disk. A missing or malformed file restores to an empty store rather
/// than failing.
#[derive(Debug)]
pub struct CartStore {
    path: PathBuf,
    carts: HashMap<String, Cart>,
}

impl CartStore {
    #[must_use]
    pub fn open(data_dir: &Path) -> Self {
        let path = data_dir.join(CART_FILE);
        let carts = fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        Self { path, carts }
    }

    /// Returns a snapshot of the cart for `token`; absent tokens get an
    /// empty cart.
    #[must_use]
    pub fn cart(&self, token: &str) -> Cart {
        self.carts.get(token).cloned().unwrap_or_default()
    }

    /// Adds a line to the token's cart and persists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written back to disk.
    pub fn add_item(&mut self, token: &str, item: CartItem) -> Result<Cart, StoreError> {
        let cart = self.carts.entry(token.to_owned()).or_default();
        cart.add(item);
        let snapshot = cart.clone();
        self.persist()?;
        Ok(snapshot)
    }

    /// Sets a line's quantity (`<= 0` removes it) and persists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written back to disk.
    pub fn update_quantity(
        &mut self,
        token: &str,
        product_id: Uuid,
        quantity: i64,
    ) -> Result<Cart, StoreError> {
        let cart = self.carts.entry(token.to_owned()).or_default();
        cart.update_quantity(product_id, quantity);
        let snapshot = cart.clone();
        self.persist()?;
        Ok(snapshot)
    }

    /// Removes a line from the token's cart and persists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written back to disk.
    pub fn remove_item(&mut self, token: &str, product_id: Uuid) -> Result<Cart, StoreError> {
        let cart = self.carts.entry(token.to_owned()).or_default();
        cart.remove(product_id);
        let snapshot = cart.clone();
        self.persist()?;
        Ok(snapshot)
    }

    /// Empties the token's cart and persists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written back to disk.
    pub fn clear(&mut self, token: &str) -> Result<(), StoreError> {
        if let Some(cart) = self.carts.get_mut(token) {
            cart.clear();
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&self.carts)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}
