//! End-to-end tests against file-backed databases
//!
//! These tests open real SQLite files in a temporary directory and cover:
//! - Records surviving a close and reopen
//! - Existing customer.db files with integer usage columns
//! - The full bill flow: lookup, compute, persist usage, export statement
//! - Customer directory CSV export

#[cfg(test)]
mod tests {
    use electric_billing::{
        compute_bill, export_customers_csv, write_statement, AccountStore, BillStatement,
        BillingError, CustomerClass, DiscountClass, ExportFormat, ProfileUpdate,
    };
    use rstest::rstest;
    use rusqlite::Connection;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    fn assert_money(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {:.2}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_accounts_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("customer.db");

        let id = {
            let mut store = AccountStore::open(&db_path).unwrap();
            let id = store
                .open_account("Ana", "1 Main St", CustomerClass::Residential, DiscountClass::Pwd)
                .unwrap();
            store.update_usage(id, 80.0).unwrap();
            id
        };

        let mut store = AccountStore::open(&db_path).unwrap();
        let customer = store.get_account(id).unwrap();
        assert_eq!(customer.name, "Ana");
        assert_eq!(customer.discount_class, DiscountClass::Pwd);
        assert_eq!(customer.current_usage, 80.0);

        store.update_usage(id, 20.0).unwrap();
        let customer = store.get_account(id).unwrap();
        assert_eq!(customer.current_usage, 20.0);
        assert_eq!(customer.lifetime_usage, 100.0);
    }

    #[test]
    fn test_opens_existing_customer_file() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("customer.db");

        // Table as found in existing customer.db files
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute_batch(
                "CREATE TABLE customer(
                    AccountNumber INTEGER PRIMARY KEY NOT NULL,
                    CustomerName TEXT NOT NULL,
                    Address CHAR(50),
                    Type TEXT NOT NULL,
                    Discount TEXT NOT NULL,
                    Usage INT DEFAULT 0,
                    AllTimeUsage INT DEFAULT 0
                );
                INSERT INTO customer VALUES (512345, 'Juan', 'Cebu', 'Commercial', 'Low-income', 145, 600);",
            )
            .unwrap();
        }

        let mut store = AccountStore::open(&db_path).unwrap();
        let customer = store.get_account(512_345).unwrap();
        assert_eq!(customer.customer_class, CustomerClass::Commercial);
        assert_eq!(customer.discount_class, DiscountClass::LowIncome);
        assert_eq!(customer.current_usage, 145.0);
        assert_eq!(customer.lifetime_usage, 600.0);

        // Fractional readings land next to integer history
        store.update_usage(512_345, 12.5).unwrap();
        assert_eq!(store.get_account(512_345).unwrap().lifetime_usage, 612.5);
    }

    #[test]
    fn test_bill_flow_with_export() {
        let dir = TempDir::new().unwrap();
        let mut store = AccountStore::open(dir.path().join("customer.db")).unwrap();

        let id = store
            .open_account(
                "Maria Santos",
                "22 Bonifacio Ave",
                CustomerClass::Residential,
                DiscountClass::SeniorCitizen,
            )
            .unwrap();

        let (customer, bill) = store.bill_account(id, 145.0).unwrap();
        assert_money(bill.base_charge, 1160.00);
        assert_money(bill.discount_amount, 60.50);
        assert_money(bill.total_amount_due, 1287.44);
        assert_eq!(customer.current_usage, 145.0);

        let export_dir = dir.path().join("bills");
        let statement = BillStatement::new(customer, bill);

        for format in [ExportFormat::Text, ExportFormat::Html] {
            let path = write_statement(&export_dir, &statement, format).unwrap();
            assert!(path.starts_with(&export_dir));
            let contents = fs::read_to_string(&path).unwrap();
            assert!(contents.contains("1287.44"), "{:?} export missing total", format);
        }

        let path = write_statement(&export_dir, &statement, ExportFormat::Json).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["customer"]["account_number"], id);
        assert_money(value["bill"]["total_amount_due"].as_f64().unwrap(), 1287.44);
    }

    #[test]
    fn test_bill_missing_account() {
        let mut store = AccountStore::open_in_memory().unwrap();
        let err = store.bill_account(700_000, 10.0).unwrap_err();
        assert!(matches!(err, BillingError::NotFound { account: 700_000 }));
        assert!(err.is_expected());
    }

    #[test]
    fn test_customer_csv_export() {
        let dir = TempDir::new().unwrap();
        let mut store = AccountStore::open_in_memory().unwrap();
        for name in ["Ana", "Juan"] {
            store
                .open_account(name, "Addr, with comma", CustomerClass::Industrial, DiscountClass::None)
                .unwrap();
        }

        let path = dir.path().join("out").join("customers.csv");
        let rows = export_customers_csv(&path, &store.list_accounts().unwrap()).unwrap();
        assert_eq!(rows, 2);

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["AccountNumber", "CustomerName", "Address", "Type", "Discount", "Usage", "AllTimeUsage"]
        );
        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][2], "Addr, with comma");
        assert_eq!(&records[0][3], "Industrial");
    }

    #[rstest]
    #[case::tiny(1, 3)]
    #[case::small(100, 140)]
    #[case::exact_fit(5, 5)]
    fn test_unique_ids_under_pressure(#[case] count: u32, #[case] space: u32) {
        let mut store = AccountStore::open_in_memory()
            .unwrap()
            .with_id_range(1, space)
            .unwrap()
            .with_seed(u64::from(count));

        let mut seen = HashSet::new();
        for i in 0..count {
            let id = store
                .open_account(&format!("C{}", i), "", CustomerClass::Residential, DiscountClass::None)
                .unwrap();
            assert!((1..=space).contains(&id));
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn test_profile_update_then_bill_uses_new_discount() {
        let mut store = AccountStore::open_in_memory().unwrap();
        let id = store
            .open_account("Ana", "", CustomerClass::Residential, DiscountClass::None)
            .unwrap();

        store
            .update_profile(id, &ProfileUpdate::default().discount_class(DiscountClass::LowIncome))
            .unwrap();

        let (_, bill) = store.bill_account(id, 145.0).unwrap();
        let expected = compute_bill(145.0, DiscountClass::LowIncome).unwrap();
        assert_eq!(bill, expected);
        assert_money(bill.total_amount_due, 1219.68);
    }
}
