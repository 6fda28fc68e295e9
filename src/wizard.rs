//! Wizard Controller
//!
//! Drives the step sequence on top of an injected [`CartStore`] and the loaded
//! [`Catalog`]. Each entry point corresponds to one user event (form submit,
//! package change, navigation click) and runs to completion synchronously.
//!
//! # Step Rules
//!
//! | Step | Validation on submit                         | On success                         |
//! |------|----------------------------------------------|------------------------------------|
//! | 1    | none                                         | advance                            |
//! | 2    | at least one catalog service submitted       | select services, focus first, advance |
//! | 3    | every selected service has a package         | advance                            |
//! | 4    | none                                         | advance to Completed               |
//!
//! Validation failures leave the cart untouched apart from the inline error
//! message, which is ephemeral and never persisted.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cart::Cart;
use crate::cart_store::CartStore;
use crate::catalog::Catalog;
use crate::storage::KeyValueStorage;
use crate::types::{ContractField, Service};
use crate::view::WizardView;
use crate::wizard_state::{StepTransitionError, WizardStep};

/// User-facing validation failures, shown inline on the current form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select at least one service")]
    NoServiceSelected,

    #[error("Please select a package for {service}")]
    NoPackageSelected { service: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transition(#[from] StepTransitionError),

    #[error("Unknown service {0:?}")]
    UnknownService(String),

    #[error("Unknown package {package:?} for service {service:?}")]
    UnknownPackage { service: String, package: String },

    #[error("Service {0:?} is not selected or has no package yet")]
    ServiceNotReachable(String),

    #[error("No service is being configured")]
    NoCurrentService,

    #[error("There is no next service")]
    NoNextService,

    #[error("There is no previous service")]
    NoPreviousService,
}

impl From<WizardError> for crate::error::SelfServeError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::Validation(v) => Self::Validation(v.to_string()),
            WizardError::Transition(t) => t.into(),
            other => Self::General(other.to_string()),
        }
    }
}

/// Raw field values of a submitted form, in document order.
///
/// Later duplicates of a key overwrite earlier values but keep the first
/// position, matching how form data collapses into an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmittedFields {
    entries: Vec<(String, String)>,
}

impl SubmittedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SubmittedFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

/// Final cart handed to whoever submits the contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteSummary {
    pub cart: Cart,
}

/// Result of a successful form submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Advanced(WizardStep),
    Completed(QuoteSummary),
}

pub struct WizardController<S: KeyValueStorage> {
    store: CartStore<S>,
    catalog: Catalog,
    form_error: Option<String>,
    currency_symbol: String,
}

impl<S: KeyValueStorage> WizardController<S> {
    /// Attach to a store and catalog.
    ///
    /// A cart restored at the post-completion step is reset so the next
    /// session starts over at step 1.
    pub fn new(mut store: CartStore<S>, catalog: Catalog) -> Self {
        if store.cart().current_step.is_terminal() {
            info!("Previous session completed; starting a new cart");
            store.reset_cart();
        }

        Self {
            store,
            catalog,
            form_error: None,
            currency_symbol: "$".to_string(),
        }
    }

    /// Currency symbol used by [`Self::view`].
    pub fn with_currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    pub fn cart(&self) -> &Cart {
        self.store.cart()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &CartStore<S> {
        &self.store
    }

    pub fn current_step(&self) -> WizardStep {
        self.store.cart().current_step
    }

    /// Inline message from the last failed validation
    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn view(&self) -> WizardView {
        WizardView::build(
            self.store.cart(),
            self.form_error.as_deref(),
            &self.currency_symbol,
        )
    }

    // =========================================================================
    // Form submission
    // =========================================================================

    /// Validate and process the form for `step`.
    ///
    /// `step` is the number the submitted form belongs to and must match the
    /// wizard's current step.
    pub fn submit_step(
        &mut self,
        step: u8,
        fields: &SubmittedFields,
    ) -> Result<StepOutcome, WizardError> {
        let current = self.current_step();
        if step != current.order() {
            return Err(StepTransitionError::StepMismatch {
                submitted: step,
                current,
            }
            .into());
        }

        let outcome = match current {
            WizardStep::Welcome => self.advance().map(StepOutcome::Advanced),
            WizardStep::ServiceSelection => self.submit_services(fields),
            WizardStep::PackageSelection => self.submit_packages(),
            WizardStep::ContractDetails => self.submit_contract(),
            WizardStep::Completed => {
                Err(StepTransitionError::FromTerminalStep { from: current }.into())
            }
        };

        self.record(outcome)
    }

    fn submit_services(&mut self, fields: &SubmittedFields) -> Result<StepOutcome, WizardError> {
        let mut matched: Vec<(usize, &Service)> = fields
            .keys()
            .filter_map(|key| {
                let index = self.catalog.service_index(key)?;
                Some((index, &self.catalog.services()[index]))
            })
            .collect();
        matched.sort_by_key(|(index, _)| *index);
        matched.dedup_by_key(|(index, _)| *index);

        let services: Vec<Service> = matched.into_iter().map(|(_, s)| s.clone()).collect();
        let Some(first) = services.first().cloned() else {
            return Err(ValidationError::NoServiceSelected.into());
        };

        let next = self.current_step().check_transition(WizardStep::PackageSelection)?;
        info!(count = services.len(), "Services selected");
        self.store.mutate(|cart| {
            cart.selected_services = services;
            cart.current_service = Some(first);
            cart.current_service_index = 0;
            cart.current_step = next;
        });
        Ok(StepOutcome::Advanced(next))
    }

    fn submit_packages(&mut self) -> Result<StepOutcome, WizardError> {
        let cart = self.store.cart();
        let current = cart
            .current_service
            .as_ref()
            .ok_or(WizardError::NoCurrentService)?;

        if !cart.has_package_for(&current.slug) {
            return Err(missing_package(current));
        }
        if let Some(missing) = cart.first_service_missing_package() {
            return Err(missing_package(missing));
        }

        self.advance().map(StepOutcome::Advanced)
    }

    fn submit_contract(&mut self) -> Result<StepOutcome, WizardError> {
        let step = self.advance()?;
        debug_assert!(step.is_terminal());
        info!(total = self.store.cart().total, "Contract submitted");
        Ok(StepOutcome::Completed(QuoteSummary {
            cart: self.store.cart().clone(),
        }))
    }

    fn advance(&mut self) -> Result<WizardStep, WizardError> {
        let current = self.current_step();
        let next = current
            .next()
            .ok_or(StepTransitionError::FromTerminalStep { from: current })?;
        let next = current.check_transition(next)?;
        self.store.set_step(next);
        info!(from = current.order(), to = next.order(), "Advanced step");
        Ok(next)
    }

    /// Keep the inline message in sync with the outcome of an action.
    fn record<T>(&mut self, result: Result<T, WizardError>) -> Result<T, WizardError> {
        match &result {
            Ok(_) => self.form_error = None,
            Err(WizardError::Validation(v)) => {
                debug!("Validation failed: {}", v);
                self.form_error = Some(v.to_string());
            }
            Err(e) => warn!("Wizard action rejected: {}", e),
        }
        result
    }

    // =========================================================================
    // Package selection
    // =========================================================================

    /// Commit `package_slug` for `service_slug`, replacing any earlier choice.
    pub fn choose_package(
        &mut self,
        service_slug: &str,
        package_slug: &str,
    ) -> Result<(), WizardError> {
        let service = self
            .catalog
            .service(service_slug)
            .ok_or_else(|| WizardError::UnknownService(service_slug.to_string()))?;
        let package = service
            .package(package_slug)
            .ok_or_else(|| WizardError::UnknownPackage {
                service: service_slug.to_string(),
                package: package_slug.to_string(),
            })?;

        let (service, package) = (service.clone(), package.clone());
        self.store.add_line_item(service, package);
        self.form_error = None;
        Ok(())
    }

    /// Move to the next selected service once the current one has a package.
    pub fn next_service(&mut self) -> Result<&Service, WizardError> {
        let result = self.try_next_service();
        self.record(result)?;
        self.store
            .cart()
            .current_service
            .as_ref()
            .ok_or(WizardError::NoCurrentService)
    }

    fn try_next_service(&mut self) -> Result<(), WizardError> {
        let cart = self.store.cart();
        let current = cart
            .current_service
            .as_ref()
            .ok_or(WizardError::NoCurrentService)?;
        if !cart.has_package_for(&current.slug) {
            return Err(missing_package(current));
        }
        if cart.next_service().is_none() {
            return Err(WizardError::NoNextService);
        }

        let index = cart.current_service_index + 1;
        self.store.set_current_service(index);
        Ok(())
    }

    /// Step back to the previous selected service without validation.
    pub fn previous_service(&mut self) -> Result<&Service, WizardError> {
        let index = self
            .store
            .cart()
            .current_service_index
            .checked_sub(1)
            .ok_or(WizardError::NoPreviousService)?;
        if !self.store.set_current_service(index) {
            return Err(WizardError::NoPreviousService);
        }
        self.form_error = None;
        self.store
            .cart()
            .current_service
            .as_ref()
            .ok_or(WizardError::NoCurrentService)
    }

    // =========================================================================
    // Sidebar navigation
    // =========================================================================

    /// Jump back to an earlier step. Returns false (no-op) for the current or
    /// a later step.
    pub fn navigate_to(&mut self, step: WizardStep) -> bool {
        let current = self.current_step();
        if step >= current {
            return false;
        }
        if current.check_transition(step).is_err() {
            return false;
        }
        info!(from = current.order(), to = step.order(), "Navigated back");
        self.store.set_step(step);
        self.form_error = None;
        true
    }

    /// Reopen package selection for a selected service that already has a
    /// package.
    ///
    /// Only allowed once the wizard has reached package selection; from an
    /// earlier step this would skip validation.
    pub fn jump_to_service(&mut self, service_slug: &str) -> Result<(), WizardError> {
        let cart = self.store.cart();
        if cart.current_step < WizardStep::PackageSelection {
            return Err(StepTransitionError::SkippedStep {
                from: cart.current_step,
                to: WizardStep::PackageSelection,
            }
            .into());
        }
        let index = cart
            .selected_services
            .iter()
            .position(|s| s.slug == service_slug)
            .filter(|_| cart.has_package_for(service_slug))
            .ok_or_else(|| WizardError::ServiceNotReachable(service_slug.to_string()))?;

        self.store.mutate(|cart| {
            cart.current_step = WizardStep::PackageSelection;
            cart.is_completed = false;
            cart.current_service_index = index;
            cart.current_service = cart.selected_services.get(index).cloned();
        });
        self.form_error = None;
        Ok(())
    }

    // =========================================================================
    // Details
    // =========================================================================

    pub fn set_field(&mut self, field: ContractField, value: impl Into<String>) {
        self.store.set_field(field, value);
    }

    pub fn set_submitter_also_signer(&mut self, also_signer: bool) {
        self.store.set_submitter_also_signer(also_signer);
    }

    /// Discard the cart and start over at step 1.
    pub fn restart(&mut self) {
        self.store.reset_cart();
        self.form_error = None;
    }
}

fn missing_package(service: &Service) -> WizardError {
    ValidationError::NoPackageSelected {
        service: service.name.clone(),
    }
    .into()
}
