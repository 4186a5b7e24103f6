use crate::bill::{compute_bill, Bill};
use crate::customer::{Customer, CustomerClass, DiscountClass, ProfileUpdate};
use crate::error::{BillingError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info, warn};

/// Lowest account number handed out by default
pub const DEFAULT_ID_MIN: u32 = 100_000;

/// Highest account number handed out by default
pub const DEFAULT_ID_MAX: u32 = 999_999;

const CUSTOMER_COLUMNS: &str =
    "AccountNumber, CustomerName, Address, Type, Discount, Usage, AllTimeUsage";

/// Create the customer table if it is missing.
///
/// Column names and defaults match existing `customer.db` files so they can
/// be opened as they are.
pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery (in-memory databases report "memory")
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!(journal_mode = %mode, "journal mode set");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS customer (
            AccountNumber INTEGER PRIMARY KEY NOT NULL,
            CustomerName TEXT NOT NULL,
            Address CHAR(50),
            Type TEXT NOT NULL,
            Discount TEXT NOT NULL,
            Usage INT DEFAULT 0,
            AllTimeUsage INT DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_customer_name ON customer(CustomerName)",
        [],
    )?;

    Ok(())
}

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    let address: Option<String> = row.get(2)?;
    let customer_class: String = row.get(3)?;
    let discount_class: String = row.get(4)?;
    let current_usage: Option<f64> = row.get(5)?;
    let lifetime_usage: Option<f64> = row.get(6)?;

    Ok(Customer {
        account_number: row.get(0)?,
        name: row.get(1)?,
        address: address.unwrap_or_default(),
        customer_class: CustomerClass::from_text(&customer_class),
        discount_class: DiscountClass::from_text(&discount_class),
        current_usage: current_usage.unwrap_or(0.0),
        lifetime_usage: lifetime_usage.unwrap_or(0.0),
    })
}

/// Escape LIKE wildcards so the needle matches literally
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn validate_reading(kwh: f64) -> Result<()> {
    if !kwh.is_finite() {
        return Err(BillingError::invalid_input(format!(
            "Usage must be a number, got {}",
            kwh
        )));
    }
    if kwh < 0.0 {
        return Err(BillingError::invalid_input("Usage cannot be negative"));
    }
    Ok(())
}

/// Customer accounts backed by one SQLite table.
///
/// Assumes a single writer: one process, one store, calls issued one after
/// another. Reads take `&self`; writes take `&mut self`.
pub struct AccountStore {
    conn: Connection,
    id_min: u32,
    id_max: u32,
    rng: StdRng,
}

impl AccountStore {
    /// Open (or create) a database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened customer database");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(AccountStore {
            conn,
            id_min: DEFAULT_ID_MIN,
            id_max: DEFAULT_ID_MAX,
            rng: StdRng::from_entropy(),
        })
    }

    /// Restrict the range new account numbers are drawn from (inclusive)
    pub fn with_id_range(mut self, id_min: u32, id_max: u32) -> Result<Self> {
        if id_min > id_max {
            return Err(BillingError::invalid_input(format!(
                "Account number range {}..={} is empty",
                id_min, id_max
            )));
        }
        self.id_min = id_min;
        self.id_max = id_max;
        Ok(self)
    }

    /// Seed the account number generator (repeatable draws)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn id_range(&self) -> (u32, u32) {
        (self.id_min, self.id_max)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Open a new account and return its account number.
    ///
    /// Numbers are drawn at random from the configured range and re-drawn
    /// until an unused one turns up. The lookup and the INSERT run in one
    /// transaction, so a failed write leaves nothing behind.
    pub fn open_account(
        &mut self,
        name: &str,
        address: &str,
        customer_class: CustomerClass,
        discount_class: DiscountClass,
    ) -> Result<u32> {
        let (low, high) = (self.id_min, self.id_max);
        let tx = self.conn.transaction()?;

        // A full range would never terminate
        let taken: i64 = tx.query_row(
            "SELECT COUNT(*) FROM customer WHERE AccountNumber BETWEEN ?1 AND ?2",
            params![low, high],
            |row| row.get(0),
        )?;
        let capacity = u64::from(high - low) + 1;
        if taken as u64 >= capacity {
            warn!(low, high, "account number range exhausted");
            return Err(BillingError::IdSpaceExhausted { low, high });
        }

        let mut collisions = 0u32;
        let account_number = loop {
            let candidate: u32 = self.rng.gen_range(low..=high);

            let exists = tx
                .query_row(
                    "SELECT 1 FROM customer WHERE AccountNumber = ?1",
                    [candidate],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if exists {
                collisions += 1;
                continue;
            }

            let result = tx.execute(
                "INSERT INTO customer (AccountNumber, CustomerName, Address, Type, Discount, Usage, AllTimeUsage)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, 0)",
                params![
                    candidate,
                    name,
                    address,
                    customer_class.as_str(),
                    discount_class.as_str(),
                ],
            );

            match result {
                Ok(_) => break candidate,
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    collisions += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        tx.commit()?;

        info!(account_number, collisions, "account opened");
        Ok(account_number)
    }

    /// Record a new reading: current usage is replaced, lifetime usage grows
    /// by the same amount.
    pub fn update_usage(&mut self, account_number: u32, kwh: f64) -> Result<()> {
        validate_reading(kwh)?;

        let changed = self.conn.execute(
            "UPDATE customer
             SET Usage = ?1, AllTimeUsage = COALESCE(AllTimeUsage, 0) + ?1
             WHERE AccountNumber = ?2",
            params![kwh, account_number],
        )?;

        if changed == 0 {
            return Err(BillingError::NotFound {
                account: account_number,
            });
        }

        debug!(account_number, kwh, "usage updated");
        Ok(())
    }

    /// Change any subset of name, address and the two classes.
    /// An update with no fields is rejected.
    pub fn update_profile(&mut self, account_number: u32, update: &ProfileUpdate) -> Result<()> {
        let assignments = update.assignments();
        if assignments.is_empty() {
            return Err(BillingError::invalid_input("No fields to update"));
        }

        let set_clause = assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE customer SET {} WHERE AccountNumber = ?{}",
            set_clause,
            assignments.len() + 1
        );

        let mut values: Vec<Value> = assignments
            .into_iter()
            .map(|(_, value)| Value::Text(value))
            .collect();
        values.push(Value::Integer(i64::from(account_number)));

        let changed = self.conn.execute(&sql, params_from_iter(values.iter()))?;
        if changed == 0 {
            return Err(BillingError::NotFound {
                account: account_number,
            });
        }

        info!(account_number, "profile updated");
        Ok(())
    }

    /// Remove an account. Returns false when there was nothing to remove.
    pub fn delete_account(&mut self, account_number: u32) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM customer WHERE AccountNumber = ?1",
            [account_number],
        )?;

        if removed > 0 {
            info!(account_number, "account deleted");
        } else {
            debug!(account_number, "delete skipped, no such account");
        }
        Ok(removed > 0)
    }

    /// Bill a customer for one reading and persist the usage.
    ///
    /// The bill uses the stored discount class. Nothing is written when the
    /// account is missing or the reading is rejected. Returns the refreshed
    /// record with the bill.
    pub fn bill_account(&mut self, account_number: u32, kwh: f64) -> Result<(Customer, Bill)> {
        let customer = self.get_account(account_number)?;
        let bill = compute_bill(kwh, customer.discount_class)?;

        self.update_usage(account_number, kwh)?;
        let customer = self.get_account(account_number)?;

        info!(
            account_number,
            kwh,
            total = bill.total_amount_due,
            "customer billed"
        );
        Ok((customer, bill))
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn get_account(&self, account_number: u32) -> Result<Customer> {
        let sql = format!(
            "SELECT {} FROM customer WHERE AccountNumber = ?1",
            CUSTOMER_COLUMNS
        );
        self.conn
            .query_row(&sql, [account_number], customer_from_row)
            .optional()?
            .ok_or(BillingError::NotFound {
                account: account_number,
            })
    }

    /// All accounts, ordered by account number
    pub fn list_accounts(&self) -> Result<Vec<Customer>> {
        let sql = format!(
            "SELECT {} FROM customer ORDER BY AccountNumber",
            CUSTOMER_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let customers = stmt
            .query_map([], customer_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(customers)
    }

    /// Accounts whose name contains `needle` anywhere.
    ///
    /// Uses SQLite LIKE, so ASCII letters match regardless of case.
    pub fn search_by_name(&self, needle: &str) -> Result<Vec<Customer>> {
        let sql = format!(
            "SELECT {} FROM customer WHERE CustomerName LIKE ?1 ESCAPE '\\' ORDER BY AccountNumber",
            CUSTOMER_COLUMNS
        );
        let pattern = format!("%{}%", escape_like(needle));

        let mut stmt = self.conn.prepare(&sql)?;
        let customers = stmt
            .query_map([pattern], customer_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(needle, matches = customers.len(), "name search");
        Ok(customers)
    }

    pub fn count_accounts(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM customer", [], |row| row.get(0))?;

        Ok(count)
    }
}
