// Electric Billing - Core Library
// Account store and bill calculator, shared by the CLI, the terminal UI and tests

pub mod error;
pub mod customer;
pub mod bill;
pub mod store;
pub mod export;   // Optional collaborator: statements and customer CSV
pub mod config;

// Re-export commonly used types
pub use error::{BillingError, Result};
pub use customer::{Customer, CustomerClass, DiscountClass, ProfileUpdate};
pub use bill::{
    compute_bill, compute_bill_for_text, parse_reading, tier_rate,
    Bill, ENVIRONMENTAL_FEE, VAT_RATE,
};
pub use store::{setup_database, AccountStore, DEFAULT_ID_MAX, DEFAULT_ID_MIN};
pub use export::{
    export_customers_csv, render_html, render_text, write_statement,
    BillStatement, ExportFormat,
};
pub use config::Settings;
