//! Domain types for the self-serve wizard
//!
//! Services and packages come from the catalog and are immutable for the
//! session. Line items and the free-text details are what the visitor commits.
//! JSON keys are camelCase so the persisted cart keeps its established layout.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A priced tier belonging to exactly one service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Unique within the parent service
    pub slug: String,
    pub name: String,
    /// Quantity sold by this tier, e.g. `10` in "10 hours"
    pub value: i64,
    /// Unit label, e.g. "hours"
    pub units: String,
    pub cost: i64,
}

/// A sellable offering with its ordered packages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub whats_included: String,
    pub whats_excluded: String,
    pub packages: Vec<Package>,
}

impl Service {
    /// Look up one of this service's packages by slug.
    pub fn package(&self, slug: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.slug == slug)
    }
}

/// A committed (service, package) selection contributing to the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub service: Service,
    pub service_package: Package,
    pub units: u32,
    pub cost: i64,
}

impl LineItem {
    /// Create a single-unit line item priced at the package cost.
    pub fn new(service: Service, service_package: Package) -> Self {
        let cost = service_package.cost;
        Self {
            service,
            service_package,
            units: 1,
            cost,
        }
    }

    /// Cart label such as "10 hours of Landscaping".
    pub fn display_name(&self) -> String {
        format!(
            "{} {} of {}",
            self.service_package.value, self.service_package.units, self.service.name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDetails {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub address2: String,
    pub company: String,
    pub company_legal_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitterDetails {
    pub name: String,
    pub email: String,
}

/// Free-text fields the visitor can edit on the details step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum ContractField {
    SubmitterName,
    SubmitterEmail,
    ContractName,
    Address,
    Address2,
    Company,
    CompanyLegalName,
}

impl ContractField {
    /// Human-readable label for prompts and summaries
    pub const fn label(self) -> &'static str {
        match self {
            Self::SubmitterName => "Your name",
            Self::SubmitterEmail => "Your email",
            Self::ContractName => "Signer name",
            Self::Address => "Address",
            Self::Address2 => "Address line 2",
            Self::Company => "Company",
            Self::CompanyLegalName => "Company legal name",
        }
    }
}

/// Format a whole-dollar amount with thousands separators, e.g. `$12,500`.
pub fn format_money(symbol: &str, amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{symbol}{grouped}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn mowing() -> Service {
        Service {
            slug: "landscaping".into(),
            name: "Landscaping".into(),
            packages: vec![Package {
                slug: "basic".into(),
                name: "Basic".into(),
                value: 10,
                units: "hours".into(),
                cost: 500,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_line_item_takes_package_cost() {
        let service = mowing();
        let pkg = service.packages[0].clone();
        let item = LineItem::new(service, pkg);
        assert_eq!(item.units, 1);
        assert_eq!(item.cost, 500);
        assert_eq!(item.display_name(), "10 hours of Landscaping");
    }

    #[test]
    fn test_service_package_lookup() {
        let service = mowing();
        assert!(service.package("basic").is_some());
        assert!(service.package("premium").is_none());
    }

    #[test]
    fn test_camel_case_layout() {
        let service = mowing();
        let pkg = service.packages[0].clone();
        let json = serde_json::to_value(LineItem::new(service, pkg)).unwrap();
        assert!(json.get("servicePackage").is_some());
        assert!(json["service"].get("whatsIncluded").is_some());

        let details = serde_json::to_value(ContractDetails::default()).unwrap();
        assert!(details.get("companyLegalName").is_some());
    }

    #[test]
    fn test_contract_field_roundtrip() {
        for field in ContractField::iter() {
            let parsed: ContractField = field.to_string().parse().expect("Should parse");
            assert_eq!(parsed, field);
        }
        assert_eq!(ContractField::CompanyLegalName.to_string(), "company-legal-name");
        assert_eq!(ContractField::Address2.to_string(), "address2");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money("$", 0), "$0");
        assert_eq!(format_money("$", 999), "$999");
        assert_eq!(format_money("$", 1000), "$1,000");
        assert_eq!(format_money("$", 1234567), "$1,234,567");
        assert_eq!(format_money("$", -2500), "-$2,500");
    }
}
