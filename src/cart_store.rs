//! Cart Store
//!
//! `CartStore` is the only owner of the [`Cart`]. Every state change runs
//! through [`CartStore::mutate`], which applies the change, re-derives the
//! computed fields and writes the whole cart to storage before returning.
//! There is no window where the in-memory total disagrees with the line items.
//!
//! Storage problems never take the session down: an unreadable or corrupt blob
//! on open yields the empty cart, and a failed write is logged and remembered
//! while the in-memory cart stays authoritative.

use tracing::{debug, info, warn};

use crate::cart::Cart;
use crate::error::{Result, SelfServeError};
use crate::storage::{DEFAULT_CART_KEY, KeyValueStorage};
use crate::types::{ContractField, LineItem, Package, Service};
use crate::wizard_state::WizardStep;

/// Where a freshly opened cart came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreSource {
    /// Parsed from a stored blob
    Restored,
    /// Nothing stored under the key
    Fresh,
    /// Storage failed or held malformed data
    Fallback(String),
}

pub struct CartStore<S: KeyValueStorage> {
    cart: Cart,
    storage: S,
    key: String,
    restore_source: RestoreSource,
    last_persist_error: Option<String>,
}

impl<S: KeyValueStorage> CartStore<S> {
    /// Open the store using the default `"cart"` key.
    pub fn open(storage: S) -> Self {
        Self::open_with_key(storage, DEFAULT_CART_KEY)
    }

    /// Restore the cart stored under `key`, or start from the empty cart.
    pub fn open_with_key(storage: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let (cart, restore_source) = match load_cart(&storage, &key) {
            Ok(Some(cart)) => {
                info!(step = cart.current_step.order(), "Restored cart from storage");
                (cart, RestoreSource::Restored)
            }
            Ok(None) => {
                debug!("No stored cart under {:?}, starting fresh", key);
                (Cart::empty(), RestoreSource::Fresh)
            }
            Err(e) => {
                warn!("Falling back to an empty cart: {}", e);
                (Cart::empty(), RestoreSource::Fallback(e.to_string()))
            }
        };

        Self {
            cart,
            storage,
            key,
            restore_source,
            last_persist_error: None,
        }
    }

    /// Read-only view of the current cart
    #[inline]
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn restore_source(&self) -> &RestoreSource {
        &self.restore_source
    }

    /// Error from the most recent write, cleared by the next successful one
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Re-read the stored blob. Returns `Ok(None)` when nothing is stored.
    pub fn persisted_snapshot(&self) -> Result<Option<Cart>> {
        load_cart(&self.storage, &self.key)
    }

    /// Apply a change, recompute derived values and persist.
    ///
    /// Every state-changing operation goes through here.
    pub fn mutate<R>(&mut self, change: impl FnOnce(&mut Cart) -> R) -> R {
        let result = change(&mut self.cart);
        self.cart.recompute();
        self.persist();
        result
    }

    fn persist(&mut self) {
        let outcome = serde_json::to_string(&self.cart)
            .map_err(SelfServeError::from)
            .and_then(|json| self.storage.set_item(&self.key, &json));

        match outcome {
            Ok(()) => self.last_persist_error = None,
            Err(e) => {
                warn!("Failed to persist cart: {}", e);
                self.last_persist_error = Some(e.to_string());
            }
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Replace the selected services wholesale. Callers validate emptiness.
    ///
    /// The current service keeps its focus if it is still selected and is
    /// cleared otherwise.
    pub fn bulk_overwrite_services_to_cart(&mut self, services: Vec<Service>) {
        debug!(count = services.len(), "Overwriting selected services");
        self.mutate(|cart| {
            cart.selected_services = services;
            let position = cart.current_service.as_ref().and_then(|current| {
                cart.selected_services
                    .iter()
                    .position(|s| s.slug == current.slug)
            });
            match position {
                Some(index) => cart.current_service_index = index,
                None => {
                    cart.current_service = None;
                    cart.current_service_index = 0;
                }
            }
        });
    }

    /// Add one service to the selection, replacing an entry with the same slug.
    pub fn add_service_to_cart(&mut self, service: Service) {
        debug!(service = %service.slug, "Adding service to cart");
        let mut services = self.cart.selected_services.clone();
        services.retain(|s| s.slug != service.slug);
        services.push(service);
        self.bulk_overwrite_services_to_cart(services);
    }

    /// Commit a package for a service, replacing any earlier choice for it.
    pub fn add_line_item(&mut self, service: Service, package: Package) {
        debug!(service = %service.slug, package = %package.slug, "Adding line item");
        self.mutate(|cart| {
            cart.line_items
                .retain(|item| item.service.slug != service.slug);
            cart.line_items.push(LineItem::new(service, package));
        });
    }

    /// Replace the whole cart with the empty default.
    pub fn reset_cart(&mut self) {
        info!("Resetting cart");
        self.mutate(|cart| *cart = Cart::empty());
    }

    pub fn set_field(&mut self, field: ContractField, value: impl Into<String>) {
        let value = value.into();
        debug!(%field, "Updating field");
        self.mutate(|cart| *cart.field_mut(field) = value);
    }

    pub fn set_submitter_also_signer(&mut self, also_signer: bool) {
        self.mutate(|cart| cart.is_submitter_also_signer = also_signer);
    }

    pub fn set_step(&mut self, step: WizardStep) {
        self.mutate(|cart| {
            cart.current_step = step;
            cart.is_completed = step.is_terminal();
        });
    }

    /// Point package navigation at `selected_services[index]`.
    ///
    /// Out-of-range indexes leave the cart untouched and return false.
    pub fn set_current_service(&mut self, index: usize) -> bool {
        let Some(service) = self.cart.selected_services.get(index).cloned() else {
            return false;
        };
        self.mutate(|cart| {
            cart.current_service_index = index;
            cart.current_service = Some(service);
        });
        true
    }
}

fn load_cart<S: KeyValueStorage>(storage: &S, key: &str) -> Result<Option<Cart>> {
    let Some(raw) = storage.get_item(key)? else {
        return Ok(None);
    };
    let mut cart: Cart = serde_json::from_str(&raw)?;
    cart.check_position()
        .map_err(|e| SelfServeError::storage(format!("stored cart is inconsistent: {e}")))?;
    // A hand-edited blob may carry a stale total
    cart.recompute();
    Ok(Some(cart))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, UnavailableStorage};

    fn service(slug: &str) -> Service {
        Service {
            slug: slug.into(),
            name: format!("Service {slug}"),
            ..Default::default()
        }
    }

    fn package(slug: &str, cost: i64) -> Package {
        Package {
            slug: slug.into(),
            name: slug.into(),
            value: 1,
            units: "month".into(),
            cost,
        }
    }

    // =========================================================================
    // Open / restore
    // =========================================================================

    #[test]
    fn test_open_empty_storage_is_fresh() {
        let store = CartStore::open(MemoryStorage::new());
        assert_eq!(store.cart(), &Cart::empty());
        assert_eq!(store.restore_source(), &RestoreSource::Fresh);
    }

    #[test]
    fn test_open_malformed_blob_falls_back() {
        let storage = MemoryStorage::new().with_item("cart", "{\"lineItems\": 7");
        let store = CartStore::open(storage);
        assert_eq!(store.cart(), &Cart::empty());
        assert!(matches!(store.restore_source(), RestoreSource::Fallback(_)));
    }

    #[test]
    fn test_open_unavailable_storage_falls_back() {
        let mut store = CartStore::open(UnavailableStorage);
        assert_eq!(store.cart(), &Cart::empty());
        assert!(matches!(store.restore_source(), RestoreSource::Fallback(_)));

        // Writes fail quietly; memory stays authoritative
        store.add_line_item(service("a"), package("p", 10));
        assert_eq!(store.cart().total, 10);
        assert!(store.last_persist_error().is_some());
    }

    #[test]
    fn test_restore_roundtrip() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.bulk_overwrite_services_to_cart(vec![service("a")]);
        store.add_line_item(service("a"), package("p", 75));
        let expected = store.cart().clone();

        let reopened = CartStore::open(store.storage().clone());
        assert_eq!(reopened.restore_source(), &RestoreSource::Restored);
        assert_eq!(reopened.cart(), &expected);
    }

    #[test]
    fn test_restore_recomputes_stale_total() {
        let mut cart = Cart::empty();
        cart.line_items.push(LineItem::new(service("a"), package("p", 30)));
        cart.total = 9999;
        let storage =
            MemoryStorage::new().with_item("cart", serde_json::to_string(&cart).unwrap());

        let store = CartStore::open(storage);
        assert_eq!(store.cart().total, 30);
    }

    #[test]
    fn test_restore_rejects_dangling_service_index() {
        let mut cart = Cart::empty();
        cart.selected_services = vec![service("a")];
        cart.current_service = Some(service("a"));
        cart.current_service_index = 3;
        let storage =
            MemoryStorage::new().with_item("cart", serde_json::to_string(&cart).unwrap());

        let store = CartStore::open(storage);
        assert!(matches!(store.restore_source(), RestoreSource::Fallback(_)));
        assert_eq!(store.cart(), &Cart::empty());
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    #[test]
    fn test_add_line_item_upserts_per_service() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.add_line_item(service("a"), package("small", 100));
        store.add_line_item(service("b"), package("small", 50));
        store.add_line_item(service("a"), package("large", 300));

        let cart = store.cart();
        assert_eq!(cart.line_items.len(), 2);
        assert_eq!(cart.line_item_for("a").unwrap().cost, 300);
        assert_eq!(cart.line_item_for("a").unwrap().service_package.slug, "large");
        assert_eq!(cart.total, 350);
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.add_line_item(service("a"), package("p", 20));
        let snapshot = store.persisted_snapshot().unwrap().unwrap();
        assert_eq!(&snapshot, store.cart());
        assert_eq!(snapshot.total, 20);
    }

    #[test]
    fn test_add_service_replaces_same_slug() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.add_service_to_cart(service("a"));
        store.add_service_to_cart(service("b"));
        store.add_service_to_cart(service("a"));

        let slugs: Vec<&str> = store
            .cart()
            .selected_services
            .iter()
            .map(|s| s.slug.as_str())
            .collect();
        assert_eq!(slugs, vec!["b", "a"]);
    }

    #[test]
    fn test_overwrite_services_keeps_pointer_consistent() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.bulk_overwrite_services_to_cart(vec![service("a"), service("b")]);
        assert!(store.set_current_service(1));

        store.bulk_overwrite_services_to_cart(vec![service("b")]);
        assert_eq!(store.cart().current_service_index, 0);
        assert_eq!(store.cart().current_service.as_ref().unwrap().slug, "b");

        store.bulk_overwrite_services_to_cart(vec![service("c")]);
        assert!(store.cart().current_service.is_none());
        assert!(store.cart().check_position().is_ok());

        let reopened = CartStore::open(store.storage().clone());
        assert_eq!(reopened.restore_source(), &RestoreSource::Restored);
    }

    #[test]
    fn test_total_saturates_on_huge_costs() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.add_line_item(service("a"), package("p", i64::MAX));
        store.add_line_item(service("b"), package("p", i64::MAX));
        assert_eq!(store.cart().total, i64::MAX);
    }

    #[test]
    fn test_reset_cart_restores_default() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.bulk_overwrite_services_to_cart(vec![service("a")]);
        store.add_line_item(service("a"), package("p", 10));
        store.set_step(WizardStep::ContractDetails);

        store.reset_cart();
        assert_eq!(store.cart(), &Cart::empty());
        assert_eq!(store.persisted_snapshot().unwrap(), Some(Cart::empty()));
    }

    #[test]
    fn test_signer_name_follows_submitter() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.set_submitter_also_signer(true);
        store.set_field(ContractField::SubmitterName, "Jane Doe");
        assert_eq!(store.cart().contract_details.name, "Jane Doe");

        store.set_submitter_also_signer(false);
        store.set_field(ContractField::ContractName, "John Roe");
        store.set_field(ContractField::SubmitterName, "Janet Doe");
        assert_eq!(store.cart().contract_details.name, "John Roe");
    }

    #[test]
    fn test_set_field_targets() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.set_field(ContractField::SubmitterEmail, "jane@example.com");
        store.set_field(ContractField::Address, "1 Main St");
        store.set_field(ContractField::Address2, "Suite 2");
        store.set_field(ContractField::Company, "Acme");
        store.set_field(ContractField::CompanyLegalName, "Acme LLC");

        let cart = store.cart();
        assert_eq!(cart.submitter_details.email, "jane@example.com");
        assert_eq!(cart.contract_details.address, "1 Main St");
        assert_eq!(cart.contract_details.address2, "Suite 2");
        assert_eq!(cart.contract_details.company, "Acme");
        assert_eq!(cart.contract_details.company_legal_name, "Acme LLC");
    }

    #[test]
    fn test_set_current_service_bounds() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.bulk_overwrite_services_to_cart(vec![service("a"), service("b")]);
        assert!(store.set_current_service(1));
        assert_eq!(store.cart().current_service_index, 1);
        assert_eq!(store.cart().current_service.as_ref().unwrap().slug, "b");

        assert!(!store.set_current_service(2));
        assert_eq!(store.cart().current_service_index, 1);
    }

    #[test]
    fn test_set_step_marks_completion() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.set_step(WizardStep::Completed);
        assert!(store.cart().is_completed);
        store.set_step(WizardStep::ContractDetails);
        assert!(!store.cart().is_completed);
    }
}
