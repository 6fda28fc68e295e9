//! selfserve - main entry point
//!
//! Thin shell driver over the wizard library: each invocation is one user
//! event, and the cart persists between invocations in the state directory.

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use selfserve::cli::{Cli, Commands, parse_field};
use selfserve::{
    Catalog, CartStore, FileStorage, JsonCatalogFile, SelfServeConfig, SelfServeError,
    StepOutcome, SubmittedFields, WizardController, WizardError, WizardStep, WizardView,
};

/// Initialize the logger with appropriate settings
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    // RUST_LOG overrides the default level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    debug!("CLI arguments parsed");

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Status { json: false });

    if let Commands::InitConfig { path } = &command {
        SelfServeConfig::default().save_to_file(path)?;
        println!("✓ Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => SelfServeConfig::load_from_file(path)?,
        None => SelfServeConfig::default(),
    };
    if let Some(catalog) = cli.catalog {
        config.catalog_path = catalog;
    }
    if let Some(state_dir) = cli.state_dir {
        config.state_dir = state_dir;
    }
    config.validate()?;

    let catalog = Catalog::load(&JsonCatalogFile::new(&config.catalog_path))
        .context("Cannot start the wizard without a catalog")?;

    if let Commands::Catalog = command {
        print_catalog(&catalog, &config.currency_symbol);
        return Ok(());
    }

    let store = CartStore::open_with_key(
        FileStorage::new(&config.state_dir),
        config.storage_key.as_str(),
    );
    let mut wizard =
        WizardController::new(store, catalog).with_currency_symbol(&config.currency_symbol);
    info!(step = wizard.current_step().order(), "Wizard ready");

    let result = dispatch(&mut wizard, command);

    if let Some(err) = wizard.store().last_persist_error() {
        eprintln!("! Progress could not be saved: {err}");
    }

    match result {
        Ok(Some(json)) if json => {
            println!("{}", serde_json::to_string_pretty(&wizard.view())?);
            Ok(())
        }
        Ok(_) => {
            print_status(&wizard.view());
            Ok(())
        }
        Err(WizardError::Validation(v)) => {
            print_status(&wizard.view());
            anyhow::bail!("{v}")
        }
        Err(e) => Err(SelfServeError::from(e).into()),
    }
}

/// Run one command. `Ok(Some(true))` asks for JSON output.
fn dispatch(
    wizard: &mut WizardController<FileStorage>,
    command: Commands,
) -> Result<Option<bool>, WizardError> {
    match command {
        Commands::Status { json } => return Ok(Some(json)),
        Commands::Submit { step, fields } => {
            let fields: SubmittedFields = fields.iter().map(|raw| parse_field(raw)).collect();
            match wizard.submit_step(step, &fields)? {
                StepOutcome::Advanced(next) => {
                    println!("✓ Now at step {}: {}", next.order(), next);
                }
                StepOutcome::Completed(summary) => {
                    println!(
                        "✓ Contract submitted for {} ({} line items)",
                        summary.cart.contract_details.name,
                        summary.cart.line_items.len()
                    );
                }
            }
        }
        Commands::Choose { service, package } => wizard.choose_package(&service, &package)?,
        Commands::NextService => {
            let service = wizard.next_service()?;
            println!("✓ Choosing a package for {}", service.name);
        }
        Commands::PreviousService => {
            let service = wizard.previous_service()?;
            println!("✓ Back to {}", service.name);
        }
        Commands::Goto { step } => {
            let step = WizardStep::try_from(step)?;
            if !wizard.navigate_to(step) {
                println!("Already at or before step {}; nothing to do", step.order());
            }
        }
        Commands::Jump { service } => wizard.jump_to_service(&service)?,
        Commands::Set { field, value } => wizard.set_field(field, value),
        Commands::Signer { also_signer } => wizard.set_submitter_also_signer(also_signer),
        Commands::Reset => {
            wizard.restart();
            println!("✓ Cart cleared");
        }
        Commands::Catalog | Commands::InitConfig { .. } => {}
    }
    Ok(None)
}

fn print_catalog(catalog: &Catalog, symbol: &str) {
    for service in catalog.services() {
        println!("{} ({})", service.name, service.slug);
        for package in &service.packages {
            println!(
                "    {:<16} {} {:<10} {}",
                package.slug,
                package.value,
                package.units,
                selfserve::format_money(symbol, package.cost)
            );
        }
    }
    for orphan in catalog.orphan_packages() {
        println!("! package {} points at unknown service {}", orphan.slug, orphan.parent);
    }
}

fn print_status(view: &WizardView) {
    for link in &view.steps {
        let mark = if link.checked {
            "✓"
        } else if link.enabled {
            "→"
        } else {
            " "
        };
        println!("{mark} {}. {}", link.step, link.title);
    }
    if view.is_completed {
        println!("  Submitted. The next session starts a new cart.");
    }

    if !view.selected_services.is_empty() {
        println!();
        for service in &view.selected_services {
            let mark = if service.has_package { "✓" } else { " " };
            let current = if service.is_current { " <" } else { "" };
            println!("  [{mark}] {}{current}", service.name);
        }
    }

    if !view.line_items.is_empty() {
        println!();
        for item in &view.line_items {
            println!("  {:<40} {:>10}", item.name, item.cost_display);
        }
    }
    if view.listed_total != view.total {
        println!("  {:<40} {:>10}", "Listed services", view.listed_total_display);
    }
    println!("  {:<40} {:>10}", "Total", view.total_display);

    if view.current_step >= WizardStep::ContractDetails.order() {
        println!();
        for field in &view.fields {
            println!("  {:<20} {}", field.label, field.value);
        }
    }

    if let Some(err) = &view.form_error {
        println!();
        println!("✗ {err}");
    }
}
