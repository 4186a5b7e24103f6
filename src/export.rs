// Bill Export - render a computed bill for a customer and write it out
//
// Pure consumer of Bill + Customer. Nothing here reads or writes the
// customer table.

use crate::bill::{Bill, VAT_RATE};
use crate::customer::Customer;
use crate::error::{BillingError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

const STATEMENT_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Plain text statement, same layout as the console bill
    Text,
    /// Printable HTML page (A4, print stylesheet)
    Html,
    /// Machine-readable statement
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Html => "html",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "html" | "print" => Ok(ExportFormat::Html),
            "json" => Ok(ExportFormat::Json),
            other => Err(BillingError::invalid_input(format!(
                "Unknown export format '{}'",
                other
            ))),
        }
    }
}

/// A bill as issued to one customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillStatement {
    /// Statement reference printed on the document
    pub reference: String,
    pub issued_at: DateTime<Utc>,
    pub customer: Customer,
    pub bill: Bill,
}

impl BillStatement {
    pub fn new(customer: Customer, bill: Bill) -> Self {
        BillStatement {
            reference: uuid::Uuid::new_v4().to_string(),
            issued_at: Utc::now(),
            customer,
            bill,
        }
    }

    /// `bill_<account>_<yyyymmdd_HHMMSS>.<ext>`
    pub fn file_name(&self, format: ExportFormat) -> String {
        format!(
            "bill_{}_{}.{}",
            self.customer.account_number,
            self.issued_at.format("%Y%m%d_%H%M%S"),
            format.extension()
        )
    }

    pub fn render(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Text => Ok(render_text(&self.customer, &self.bill)),
            ExportFormat::Html => Ok(render_html(self)),
            ExportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

fn money_line(out: &mut String, label: &str, amount: f64) {
    let _ = writeln!(out, "{:<25}₱{:>10.2}", label, amount);
}

/// Plain-text statement
pub fn render_text(customer: &Customer, bill: &Bill) -> String {
    let heavy = "=".repeat(STATEMENT_WIDTH);
    let light = "-".repeat(STATEMENT_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "{:^width$}", "ELECTRICITY BILL", width = STATEMENT_WIDTH);
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out);
    let _ = writeln!(out, "Account Number: {}", customer.account_number);
    let _ = writeln!(out, "Customer Name:  {}", customer.name);
    let _ = writeln!(out, "Address:        {}", customer.address);
    let _ = writeln!(out, "Customer Type:  {}", customer.customer_class);
    let _ = writeln!(out, "Discount Type:  {}", customer.discount_class);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", light);
    let _ = writeln!(out, "CONSUMPTION DETAILS");
    let _ = writeln!(out, "{}", light);
    let _ = writeln!(out, "kWh Used:       {:.2} kWh", bill.kwh_used);
    let _ = writeln!(out, "Rate:           ₱{:.2} per kWh", bill.rate);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", light);
    let _ = writeln!(out, "CHARGES BREAKDOWN");
    let _ = writeln!(out, "{}", light);
    money_line(&mut out, "Base Charge:", bill.base_charge);
    money_line(&mut out, "Environmental Fee:", bill.environmental_fee);
    money_line(&mut out, "Subtotal:", bill.subtotal);

    if bill.has_discount() {
        let _ = writeln!(
            out,
            "Discount ({} {}%): -₱{:>10.2}",
            bill.discount_class,
            bill.discount_percent(),
            bill.discount_amount
        );
        money_line(&mut out, "Subtotal after discount:", bill.subtotal_after_discount);
    }

    money_line(
        &mut out,
        &format!("VAT ({:.0}%):", VAT_RATE * 100.0),
        bill.vat,
    );
    let _ = writeln!(out, "{}", light);
    money_line(&mut out, "TOTAL AMOUNT DUE:", bill.total_amount_due);
    let _ = writeln!(out, "{}", heavy);

    out
}

fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn html_row(out: &mut String, label: &str, amount: f64, class: &str) {
    let _ = writeln!(
        out,
        "      <tr class=\"{}\"><td>{}</td><td class=\"amount\">&#8369;{:.2}</td></tr>",
        class,
        html_escape(label),
        amount
    );
}

/// Printable HTML document (one A4 page per statement)
pub fn render_html(statement: &BillStatement) -> String {
    let customer = &statement.customer;
    let bill = &statement.bill;
    let mut out = String::new();

    out.push_str(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"utf-8\">\n",
    );
    let _ = writeln!(
        out,
        "  <title>Electricity Bill {}</title>",
        customer.account_number
    );
    out.push_str(
        "  <style>\n\
         \x20   @page { size: A4; margin: 20mm; }\n\
         \x20   body { font-family: sans-serif; max-width: 170mm; margin: auto; }\n\
         \x20   h1 { text-align: center; border-bottom: 2px solid #000; }\n\
         \x20   table { width: 100%; border-collapse: collapse; margin-bottom: 8mm; }\n\
         \x20   td { padding: 2mm 0; }\n\
         \x20   .amount { text-align: right; font-variant-numeric: tabular-nums; }\n\
         \x20   .discount td { color: #2a7a2a; }\n\
         \x20   .total td { font-weight: bold; border-top: 2px solid #000; }\n\
         \x20   section { page-break-inside: avoid; }\n\
         \x20 </style>\n</head>\n<body>\n",
    );
    out.push_str("  <h1>ELECTRICITY BILL</h1>\n");
    let _ = writeln!(
        out,
        "  <p>Reference: {}<br>Issued: {}</p>",
        statement.reference,
        statement.issued_at.format("%Y-%m-%d %H:%M UTC")
    );

    out.push_str("  <section>\n    <table>\n");
    for (label, value) in [
        ("Account Number", customer.account_number.to_string()),
        ("Customer Name", customer.name.clone()),
        ("Address", customer.address.clone()),
        ("Customer Type", customer.customer_class.to_string()),
        ("Discount Type", customer.discount_class.to_string()),
    ] {
        let _ = writeln!(
            out,
            "      <tr><td>{}</td><td>{}</td></tr>",
            label,
            html_escape(&value)
        );
    }
    out.push_str("    </table>\n  </section>\n");

    out.push_str("  <section>\n    <h2>Consumption Details</h2>\n    <table>\n");
    let _ = writeln!(
        out,
        "      <tr><td>kWh Used</td><td class=\"amount\">{:.2} kWh</td></tr>",
        bill.kwh_used
    );
    let _ = writeln!(
        out,
        "      <tr><td>Rate</td><td class=\"amount\">&#8369;{:.2} per kWh</td></tr>",
        bill.rate
    );
    out.push_str("    </table>\n  </section>\n");

    out.push_str("  <section>\n    <h2>Charges Breakdown</h2>\n    <table>\n");
    html_row(&mut out, "Base Charge", bill.base_charge, "");
    html_row(&mut out, "Environmental Fee", bill.environmental_fee, "");
    html_row(&mut out, "Subtotal", bill.subtotal, "");
    if bill.has_discount() {
        html_row(
            &mut out,
            &format!(
                "Discount ({} {}%)",
                bill.discount_class,
                bill.discount_percent()
            ),
            -bill.discount_amount,
            "discount",
        );
        html_row(
            &mut out,
            "Subtotal after discount",
            bill.subtotal_after_discount,
            "",
        );
    }
    html_row(
        &mut out,
        &format!("VAT ({:.0}%)", VAT_RATE * 100.0),
        bill.vat,
        "",
    );
    html_row(&mut out, "TOTAL AMOUNT DUE", bill.total_amount_due, "total");
    out.push_str("    </table>\n  </section>\n</body>\n</html>\n");

    out
}

/// Write a statement into `dir` (created if missing) and return its path
pub fn write_statement(dir: &Path, statement: &BillStatement, format: ExportFormat) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let path = dir.join(statement.file_name(format));
    let contents = statement.render(format)?;
    fs::write(&path, contents)?;

    info!(
        account_number = statement.customer.account_number,
        path = %path.display(),
        "bill exported"
    );
    Ok(path)
}

/// Flat row for the customer directory CSV
#[derive(Debug, Serialize)]
struct CustomerRow<'a> {
    #[serde(rename = "AccountNumber")]
    account_number: u32,
    #[serde(rename = "CustomerName")]
    name: &'a str,
    #[serde(rename = "Address")]
    address: &'a str,
    #[serde(rename = "Type")]
    customer_class: &'static str,
    #[serde(rename = "Discount")]
    discount_class: &'static str,
    #[serde(rename = "Usage")]
    current_usage: f64,
    #[serde(rename = "AllTimeUsage")]
    lifetime_usage: f64,
}

/// Write the customer directory as CSV. Returns the number of rows written.
pub fn export_customers_csv(path: &Path, customers: &[Customer]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut wtr = csv::Writer::from_path(path)?;
    for customer in customers {
        wtr.serialize(CustomerRow {
            account_number: customer.account_number,
            name: &customer.name,
            address: &customer.address,
            customer_class: customer.customer_class.as_str(),
            discount_class: customer.discount_class.as_str(),
            current_usage: customer.current_usage,
            lifetime_usage: customer.lifetime_usage,
        })?;
    }
    wtr.flush()?;

    info!(path = %path.display(), rows = customers.len(), "customer list exported");
    Ok(customers.len())
}
