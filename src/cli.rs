use clap::{Args, Parser, Subcommand, ValueEnum};
use electric_billing::{CustomerClass, DiscountClass, ExportFormat, ProfileUpdate};
use std::path::PathBuf;

/// Electricity billing: customer accounts and tiered-rate bills
#[derive(Parser, Debug)]
#[command(name = "electric-billing")]
#[command(about = "Customer accounts and tiered-rate electricity bills", long_about = None)]
pub struct CliArgs {
    /// Settings file (defaults to ./billing.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Customer database, overrides the configured path
    #[arg(long, global = true, value_name = "FILE")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a new customer account
    Open(OpenArgs),

    /// Show one customer record
    Show { account: u32 },

    /// List all customers
    List,

    /// Find customers whose name contains TEXT
    Search { text: String },

    /// Bill a customer for a reading and save the usage
    Bill(BillArgs),

    /// Change profile fields of a customer
    Update(UpdateArgs),

    /// Delete a customer account
    Delete { account: u32 },

    /// Write all customers to a CSV file
    ExportCustomers { path: PathBuf },

    /// Interactive terminal UI (default)
    Ui,
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub address: String,

    #[arg(long = "type", value_enum, default_value = "residential")]
    pub customer_class: ClassArg,

    #[arg(long, value_enum, default_value = "none")]
    pub discount: DiscountArg,
}

#[derive(Args, Debug)]
pub struct BillArgs {
    pub account: u32,

    /// Reading in kWh
    #[arg(allow_hyphen_values = true)]
    pub kwh: String,

    /// Also write the statement to the export directory
    #[arg(long, value_enum)]
    pub export: Option<FormatArg>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub account: u32,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub address: Option<String>,

    #[arg(long = "type", value_enum)]
    pub customer_class: Option<ClassArg>,

    #[arg(long, value_enum)]
    pub discount: Option<DiscountArg>,
}

impl UpdateArgs {
    pub fn to_profile_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            name: self.name.clone(),
            address: self.address.clone(),
            customer_class: self.customer_class.map(Into::into),
            discount_class: self.discount.map(Into::into),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ClassArg {
    Residential,
    Commercial,
    Industrial,
}

impl From<ClassArg> for CustomerClass {
    fn from(arg: ClassArg) -> Self {
        match arg {
            ClassArg::Residential => CustomerClass::Residential,
            ClassArg::Commercial => CustomerClass::Commercial,
            ClassArg::Industrial => CustomerClass::Industrial,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DiscountArg {
    None,
    SeniorCitizen,
    Pwd,
    LowIncome,
}

impl From<DiscountArg> for DiscountClass {
    fn from(arg: DiscountArg) -> Self {
        match arg {
            DiscountArg::None => DiscountClass::None,
            DiscountArg::SeniorCitizen => DiscountClass::SeniorCitizen,
            DiscountArg::Pwd => DiscountClass::Pwd,
            DiscountArg::LowIncome => DiscountClass::LowIncome,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Html,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => ExportFormat::Text,
            FormatArg::Html => ExportFormat::Html,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}
