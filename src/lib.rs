//! selfserve library
//!
//! Cart and step state machine behind a self-serve service selection and
//! quote wizard. Rendering is left to the caller; this crate owns the state,
//! its validation rules, the derived total and persistence.

pub mod cart;
pub mod cart_store;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod storage;
pub mod types;
pub mod view;
pub mod wizard;
pub mod wizard_state;

// Re-export main types for convenience
pub use cart::{Cart, compute_total};
pub use cart_store::{CartStore, RestoreSource};
pub use catalog::{
    Catalog, CatalogFeed, CatalogSource, JsonCatalogFile, PackageRecord, ServiceRecord,
    StaticCatalog,
};
pub use config::SelfServeConfig;
pub use error::SelfServeError;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, UnavailableStorage};
pub use types::{
    ContractDetails, ContractField, LineItem, Package, Service, SubmitterDetails, format_money,
};
pub use view::WizardView;
pub use wizard::{
    QuoteSummary, StepOutcome, SubmittedFields, ValidationError, WizardController, WizardError,
};
pub use wizard_state::{StepTransitionError, WizardStep};
