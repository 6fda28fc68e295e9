//! The cart aggregate
//!
//! `Cart` holds every piece of wizard state for one session. It is plain data:
//! mutation and persistence go through `CartStore`, which calls
//! [`Cart::recompute`] after each change.

use serde::{Deserialize, Serialize};

use crate::types::{ContractDetails, ContractField, LineItem, Service, SubmitterDetails};
use crate::wizard_state::WizardStep;

/// Wizard state for one visitor session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// At most one entry per service slug
    pub line_items: Vec<LineItem>,
    /// Traversal order for package selection and cart display
    pub selected_services: Vec<Service>,
    /// Derived: sum of line item costs
    pub total: i64,
    pub contract_details: ContractDetails,
    pub submitter_details: SubmitterDetails,
    pub is_submitter_also_signer: bool,
    pub current_step: WizardStep,
    pub current_service: Option<Service>,
    pub current_service_index: usize,
    pub is_completed: bool,
}

impl Default for Cart {
    fn default() -> Self {
        Self::empty()
    }
}

impl Cart {
    /// The empty default cart: step 1, nothing selected, submitter signs.
    pub fn empty() -> Self {
        Self {
            line_items: Vec::new(),
            selected_services: Vec::new(),
            total: 0,
            contract_details: ContractDetails::default(),
            submitter_details: SubmitterDetails::default(),
            is_submitter_also_signer: true,
            current_step: WizardStep::Welcome,
            current_service: None,
            current_service_index: 0,
            is_completed: false,
        }
    }

    /// Re-derive computed fields from the rest of the cart.
    ///
    /// Must stay free of side effects outside `self`.
    pub fn recompute(&mut self) {
        self.total = compute_total(&self.line_items);
        if self.is_submitter_also_signer {
            self.contract_details
                .name
                .clone_from(&self.submitter_details.name);
        }
    }

    pub fn field(&self, field: ContractField) -> &str {
        match field {
            ContractField::SubmitterName => &self.submitter_details.name,
            ContractField::SubmitterEmail => &self.submitter_details.email,
            ContractField::ContractName => &self.contract_details.name,
            ContractField::Address => &self.contract_details.address,
            ContractField::Address2 => &self.contract_details.address2,
            ContractField::Company => &self.contract_details.company,
            ContractField::CompanyLegalName => &self.contract_details.company_legal_name,
        }
    }

    pub fn field_mut(&mut self, field: ContractField) -> &mut String {
        match field {
            ContractField::SubmitterName => &mut self.submitter_details.name,
            ContractField::SubmitterEmail => &mut self.submitter_details.email,
            ContractField::ContractName => &mut self.contract_details.name,
            ContractField::Address => &mut self.contract_details.address,
            ContractField::Address2 => &mut self.contract_details.address2,
            ContractField::Company => &mut self.contract_details.company,
            ContractField::CompanyLegalName => &mut self.contract_details.company_legal_name,
        }
    }

    pub fn line_item_for(&self, service_slug: &str) -> Option<&LineItem> {
        self.line_items
            .iter()
            .find(|item| item.service.slug == service_slug)
    }

    /// True when a package has been committed for the service.
    pub fn has_package_for(&self, service_slug: &str) -> bool {
        self.line_item_for(service_slug).is_some()
    }

    pub fn is_selected(&self, service_slug: &str) -> bool {
        self.selected_services.iter().any(|s| s.slug == service_slug)
    }

    /// Line items in `selected_services` order.
    ///
    /// Items for services that are no longer selected are left out.
    pub fn sorted_line_items(&self) -> Vec<&LineItem> {
        self.selected_services
            .iter()
            .filter_map(|service| self.line_item_for(&service.slug))
            .collect()
    }

    /// Service after the current one, if any
    pub fn next_service(&self) -> Option<&Service> {
        self.current_service_index
            .checked_add(1)
            .and_then(|i| self.selected_services.get(i))
    }

    /// Service before the current one, if any
    pub fn previous_service(&self) -> Option<&Service> {
        self.current_service_index
            .checked_sub(1)
            .and_then(|i| self.selected_services.get(i))
    }

    /// Check that the package-navigation pointer agrees with the selection.
    ///
    /// `current_service` must be `selected_services[current_service_index]`,
    /// and with no current service the index must be 0.
    pub fn check_position(&self) -> Result<(), String> {
        let index = self.current_service_index;
        match &self.current_service {
            None if index == 0 => Ok(()),
            None => Err(format!("service index {index} set without a current service")),
            Some(current) => match self.selected_services.get(index) {
                Some(selected) if selected.slug == current.slug => Ok(()),
                Some(selected) => Err(format!(
                    "current service {:?} does not match {:?} at index {index}",
                    current.slug, selected.slug
                )),
                None => Err(format!(
                    "service index {index} out of range for {} selected services",
                    self.selected_services.len()
                )),
            },
        }
    }

    /// First selected service without a committed package
    pub fn first_service_missing_package(&self) -> Option<&Service> {
        self.selected_services
            .iter()
            .find(|service| !self.has_package_for(&service.slug))
    }
}

/// Sum of line item costs, saturating at the `i64` bounds.
pub fn compute_total(items: &[LineItem]) -> i64 {
    items
        .iter()
        .fold(0i64, |total, item| total.saturating_add(item.cost))
}
