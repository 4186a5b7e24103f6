mod cli;

// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{CliArgs, Command};
use electric_billing::{
    export_customers_csv, parse_reading, render_text, write_statement, AccountStore,
    BillStatement, Customer, Settings,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let ui_mode = matches!(args.command, None | Some(Command::Ui));

    // The TUI owns the terminal, so stay quiet there unless RUST_LOG asks
    init_logging(if ui_mode { "off" } else { "info" });

    let mut settings =
        Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    if let Some(db) = args.db {
        settings.database.path = db;
    }

    let mut store = open_store(&settings)?;

    let outcome = match args.command {
        None | Some(Command::Ui) => return run_ui_mode(store, &settings),
        Some(Command::Open(open)) => store
            .open_account(
                &open.name,
                &open.address,
                open.customer_class.into(),
                open.discount.into(),
            )
            .map(|account_number| {
                println!("✓ Account created successfully! Account Number: {}", account_number);
            }),
        Some(Command::Show { account }) => store.get_account(account).map(|c| print_customer(&c)),
        Some(Command::List) => store.list_accounts().map(|c| print_customer_table(&c)),
        Some(Command::Search { text }) => store.search_by_name(&text).map(|c| print_customer_table(&c)),
        Some(Command::Bill(bill)) => run_bill(&mut store, &settings, bill),
        Some(Command::Update(update)) => store
            .update_profile(update.account, &update.to_profile_update())
            .map(|_| println!("✓ Account {} updated", update.account)),
        Some(Command::Delete { account }) => store.delete_account(account).map(|deleted| {
            if deleted {
                println!("✓ Account {} deleted", account);
            } else {
                println!("✗ Account number {} not found!", account);
            }
        }),
        Some(Command::ExportCustomers { path }) => store
            .list_accounts()
            .and_then(|customers| export_customers_csv(&path, &customers))
            .map(|rows| println!("✓ Exported {} customers to {}", rows, path.display())),
    };

    report(outcome)
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(settings: &Settings) -> Result<AccountStore> {
    let store = AccountStore::open(&settings.database.path)
        .with_context(|| format!("Failed to open database {}", settings.database.path.display()))?
        .with_id_range(settings.accounts.id_min, settings.accounts.id_max)
        .context("Invalid account number range in settings")?;

    Ok(store)
}

/// Expected failures get a short message and exit code 1; anything else
/// propagates as an error.
fn report(outcome: electric_billing::Result<()>) -> Result<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(err) if err.is_expected() => {
            eprintln!("✗ {}", err);
            std::process::exit(1);
        }
        Err(err) => Err(err).context("Operation failed"),
    }
}

fn run_bill(
    store: &mut AccountStore,
    settings: &Settings,
    args: cli::BillArgs,
) -> electric_billing::Result<()> {
    let kwh = parse_reading(&args.kwh)?;
    let (customer, bill) = store.bill_account(args.account, kwh)?;

    print!("\n{}\n", render_text(&customer, &bill));

    if let Some(format) = args.export {
        let statement = BillStatement::new(customer, bill);
        let path = write_statement(&settings.export.directory, &statement, format.into())?;
        println!("✓ Bill saved to {}", path.display());
    }

    Ok(())
}

fn print_customer(customer: &Customer) {
    println!();
    println!("{:<20} {}", "Account Number:", customer.account_number);
    println!("{:<20} {}", "Customer Name:", customer.name);
    println!("{:<20} {}", "Address:", customer.address);
    println!("{:<20} {}", "Customer Type:", customer.customer_class);
    println!("{:<20} {}", "Discount:", customer.discount_class);
    println!("{:<20} {} kWh", "Current Usage:", customer.current_usage);
    println!("{:<20} {} kWh", "All-Time Usage:", customer.lifetime_usage);
    println!();
}

fn print_customer_table(customers: &[Customer]) {
    if customers.is_empty() {
        println!("No customers found!");
        return;
    }

    println!("{}", "=".repeat(90));
    println!(
        "{:<10} {:<25} {:<15} {:<10} {:<12}",
        "Account", "Name", "Type", "Usage", "Total Usage"
    );
    println!("{}", "-".repeat(90));

    for customer in customers {
        println!(
            "{:<10} {:<25} {:<15} {:<10} {:<12}",
            customer.account_number,
            customer.name,
            customer.customer_class.as_str(),
            customer.current_usage,
            customer.lifetime_usage
        );
    }

    println!("{}", "=".repeat(90));
}

#[cfg(feature = "tui")]
fn run_ui_mode(store: AccountStore, settings: &Settings) -> Result<()> {
    let mut app = ui::App::new(store, settings.export.clone()).context("Failed to load customers")?;
    ui::run_ui(&mut app)?;

    println!("\nThank you for using the Electricity Billing System!");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_store: AccountStore, _settings: &Settings) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use a subcommand, e.g. `electric-billing list`");
    std::process::exit(1);
}
