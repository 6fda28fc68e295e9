//! Read-only projection of the cart for whatever renders the wizard.

use serde::Serialize;
use strum::IntoEnumIterator;

use crate::cart::Cart;
use crate::types::{ContractDetails, ContractField, SubmitterDetails, format_money};
use crate::wizard_state::WizardStep;

/// Label on the package step's forward control when more services remain
pub const NEXT_SERVICE_LABEL: &str = "Next Service";
/// Label once the last selected service is showing
pub const GENERATE_CONTRACT_LABEL: &str = "Generate the contract";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepLink {
    pub step: u8,
    pub title: &'static str,
    /// Only the current step's link is active
    pub enabled: bool,
    /// Steps before the current one are ticked
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntry {
    pub slug: String,
    pub name: String,
    pub has_package: bool,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemView {
    pub service_slug: String,
    pub package_slug: String,
    pub name: String,
    pub cost: i64,
    pub cost_display: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentServiceView {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub whats_included: String,
    pub whats_excluded: String,
    /// Slugs of the packages to offer
    pub package_slugs: Vec<String>,
    pub chosen_package: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEntry {
    pub key: String,
    pub label: &'static str,
    pub value: String,
}

/// Everything a renderer needs, derived from the cart in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub current_step: u8,
    pub steps: Vec<StepLink>,
    pub selected_services: Vec<ServiceEntry>,
    pub current_service: Option<CurrentServiceView>,
    pub line_items: Vec<LineItemView>,
    /// Sum of `line_items` only
    pub listed_total: i64,
    pub listed_total_display: String,
    /// Sum over every line item, including deselected services
    pub total: i64,
    pub total_display: String,
    pub fields: Vec<FieldEntry>,
    pub submitter: SubmitterDetails,
    pub contract: ContractDetails,
    pub is_submitter_also_signer: bool,
    pub can_go_previous: bool,
    pub has_next_service: bool,
    pub next_label: &'static str,
    pub form_error: Option<String>,
    pub is_completed: bool,
}

impl WizardView {
    pub fn build(cart: &Cart, form_error: Option<&str>, currency_symbol: &str) -> Self {
        let current = cart.current_step;
        let current_slug = cart.current_service.as_ref().map(|s| s.slug.as_str());

        let steps = WizardStep::all_steps()
            .iter()
            .filter(|step| !step.is_terminal())
            .map(|&step| StepLink {
                step: step.order(),
                title: step.description(),
                enabled: step == current,
                checked: step < current,
            })
            .collect();

        let selected_services = cart
            .selected_services
            .iter()
            .map(|s| ServiceEntry {
                slug: s.slug.clone(),
                name: s.name.clone(),
                has_package: cart.has_package_for(&s.slug),
                is_current: Some(s.slug.as_str()) == current_slug,
            })
            .collect();

        let current_service = cart.current_service.as_ref().map(|s| CurrentServiceView {
            slug: s.slug.clone(),
            name: s.name.clone(),
            description: s.description.clone(),
            whats_included: s.whats_included.clone(),
            whats_excluded: s.whats_excluded.clone(),
            package_slugs: s.packages.iter().map(|p| p.slug.clone()).collect(),
            chosen_package: cart
                .line_item_for(&s.slug)
                .map(|item| item.service_package.slug.clone()),
        });

        let line_items: Vec<LineItemView> = cart
            .sorted_line_items()
            .into_iter()
            .map(|item| LineItemView {
                service_slug: item.service.slug.clone(),
                package_slug: item.service_package.slug.clone(),
                name: item.display_name(),
                cost: item.cost,
                cost_display: format_money(currency_symbol, item.cost),
            })
            .collect();

        let listed_total = line_items
            .iter()
            .fold(0i64, |sum, item| sum.saturating_add(item.cost));

        let fields = ContractField::iter()
            .map(|field| FieldEntry {
                key: field.to_string(),
                label: field.label(),
                value: cart.field(field).to_string(),
            })
            .collect();

        let has_next_service = cart.next_service().is_some();

        Self {
            current_step: current.order(),
            steps,
            selected_services,
            current_service,
            line_items,
            listed_total,
            listed_total_display: format_money(currency_symbol, listed_total),
            total: cart.total,
            total_display: format_money(currency_symbol, cart.total),
            fields,
            submitter: cart.submitter_details.clone(),
            contract: cart.contract_details.clone(),
            is_submitter_also_signer: cart.is_submitter_also_signer,
            can_go_previous: cart.current_service_index > 0,
            has_next_service,
            next_label: if has_next_service {
                NEXT_SERVICE_LABEL
            } else {
                GENERATE_CONTRACT_LABEL
            },
            form_error: form_error.map(str::to_string),
            is_completed: cart.is_completed,
        }
    }
}
