// Bill Calculator - tiered rate, flat environmental fee, discount, VAT
//
// bill = (((kWh * tier_rate) + environmental_fee) - discount) * (1 + vat)
//
// The matching tier's rate applies to the WHOLE reading; tiers are not
// marginal. Every intermediate quantity is kept on the Bill for display.

use crate::customer::DiscountClass;
use crate::error::{BillingError, Result};
use serde::{Deserialize, Serialize};

/// Flat fee added to every bill before discount
pub const ENVIRONMENTAL_FEE: f64 = 50.00;

/// VAT applied to the discounted subtotal
pub const VAT_RATE: f64 = 0.12;

/// (inclusive upper bound in kWh, rate per kWh)
const RATE_TIERS: [(f64, f64); 3] = [(50.0, 5.00), (100.0, 6.50), (200.0, 8.00)];

/// Rate for readings above the last tier bound
const TOP_RATE: f64 = 10.00;

/// Unit price for a reading. Boundaries belong to the lower tier.
pub fn tier_rate(kwh: f64) -> f64 {
    RATE_TIERS
        .iter()
        .find(|(upper, _)| kwh <= *upper)
        .map(|(_, rate)| *rate)
        .unwrap_or(TOP_RATE)
}

/// Itemized bill for a single reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub kwh_used: f64,
    pub rate: f64,
    pub base_charge: f64,
    pub environmental_fee: f64,
    pub subtotal: f64,
    pub discount_class: DiscountClass,
    pub discount_rate: f64,
    pub discount_amount: f64,
    pub subtotal_after_discount: f64,
    pub vat: f64,
    pub total_amount_due: f64,
}

impl Bill {
    pub fn has_discount(&self) -> bool {
        self.discount_amount > 0.0
    }

    /// Discount as a whole percentage, e.g. 5 for Senior Citizen
    pub fn discount_percent(&self) -> u32 {
        (self.discount_rate * 100.0).round() as u32
    }
}

/// Compute the bill for `kwh_used` at the customer's discount class.
///
/// Fails with `InvalidInput` for negative or non-finite readings.
pub fn compute_bill(kwh_used: f64, discount_class: DiscountClass) -> Result<Bill> {
    if !kwh_used.is_finite() {
        return Err(BillingError::invalid_input(format!(
            "Usage must be a number, got {}",
            kwh_used
        )));
    }
    if kwh_used < 0.0 {
        return Err(BillingError::invalid_input("Usage cannot be negative"));
    }

    let rate = tier_rate(kwh_used);
    let base_charge = kwh_used * rate;
    let subtotal = base_charge + ENVIRONMENTAL_FEE;

    let discount_rate = discount_class.rate();
    let discount_amount = subtotal * discount_rate;
    let subtotal_after_discount = subtotal - discount_amount;

    let vat = subtotal_after_discount * VAT_RATE;
    let total_amount_due = subtotal_after_discount + vat;

    Ok(Bill {
        kwh_used,
        rate,
        base_charge,
        environmental_fee: ENVIRONMENTAL_FEE,
        subtotal,
        discount_class,
        discount_rate,
        discount_amount,
        subtotal_after_discount,
        vat,
        total_amount_due,
    })
}

/// Same as `compute_bill`, but takes the discount as stored text.
/// Unknown text bills with no discount.
pub fn compute_bill_for_text(kwh_used: f64, discount_text: &str) -> Result<Bill> {
    compute_bill(kwh_used, DiscountClass::from_text(discount_text))
}

/// Parse a reading typed by the user.
pub fn parse_reading(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    let kwh: f64 = trimmed
        .parse()
        .map_err(|_| BillingError::invalid_input(format!("Invalid usage value: '{}'", trimmed)))?;

    if !kwh.is_finite() {
        return Err(BillingError::invalid_input(format!(
            "Invalid usage value: '{}'",
            trimmed
        )));
    }
    if kwh < 0.0 {
        return Err(BillingError::invalid_input("Usage cannot be negative"));
    }

    Ok(kwh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn assert_money(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {:.2}, got {}",
            expected,
            actual
        );
    }

    #[rstest]
    #[case::zero(0.0, 5.00)]
    #[case::low(12.5, 5.00)]
    #[case::first_bound(50.0, 5.00)]
    #[case::just_above_first(50.01, 6.50)]
    #[case::second_tier(75.0, 6.50)]
    #[case::second_bound(100.0, 6.50)]
    #[case::third_tier(100.5, 8.00)]
    #[case::third_bound(200.0, 8.00)]
    #[case::just_above_third(200.01, 10.00)]
    #[case::heavy(5000.0, 10.00)]
    fn test_tier_rate(#[case] kwh: f64, #[case] expected: f64) {
        assert_eq!(tier_rate(kwh), expected);
    }

    #[test]
    fn test_rate_applies_to_whole_reading() {
        let bill = compute_bill(250.0, DiscountClass::None).unwrap();
        assert_eq!(bill.rate, 10.00);
        assert_money(bill.base_charge, 2500.00);
    }

    #[test]
    fn test_bill_no_discount() {
        let bill = compute_bill(145.0, DiscountClass::None).unwrap();

        assert_eq!(bill.rate, 8.00);
        assert_money(bill.base_charge, 1160.00);
        assert_money(bill.environmental_fee, 50.00);
        assert_money(bill.subtotal, 1210.00);
        assert_money(bill.discount_amount, 0.0);
        assert_money(bill.subtotal_after_discount, 1210.00);
        assert_money(bill.vat, 145.20);
        assert_money(bill.total_amount_due, 1355.20);
        assert!(!bill.has_discount());
    }

    #[test]
    fn test_bill_senior_citizen() {
        let bill = compute_bill(145.0, DiscountClass::SeniorCitizen).unwrap();

        assert_money(bill.subtotal, 1210.00);
        assert_eq!(bill.discount_rate, 0.05);
        assert_money(bill.discount_amount, 60.50);
        assert_money(bill.subtotal_after_discount, 1149.50);
        assert_money(bill.vat, 137.94);
        assert_money(bill.total_amount_due, 1287.44);
        assert_eq!(bill.discount_percent(), 5);
    }

    #[test]
    fn test_bill_pwd_matches_senior_citizen() {
        let pwd = compute_bill(145.0, DiscountClass::Pwd).unwrap();
        let senior = compute_bill(145.0, DiscountClass::SeniorCitizen).unwrap();
        assert_money(pwd.total_amount_due, senior.total_amount_due);
    }

    #[test]
    fn test_bill_low_income() {
        let bill = compute_bill(145.0, DiscountClass::LowIncome).unwrap();

        assert_money(bill.discount_amount, 121.00);
        assert_money(bill.subtotal_after_discount, 1089.00);
        assert_money(bill.vat, 130.68);
        assert_money(bill.total_amount_due, 1219.68);
        assert_eq!(bill.discount_percent(), 10);
    }

    #[test]
    fn test_zero_usage_still_pays_fee() {
        let bill = compute_bill(0.0, DiscountClass::None).unwrap();
        assert_money(bill.subtotal, 50.00);
        assert_money(bill.total_amount_due, 56.00);
    }

    #[test]
    fn test_unknown_discount_text_bills_without_discount() {
        let bill = compute_bill_for_text(145.0, "Student").unwrap();
        assert_eq!(bill.discount_class, DiscountClass::None);
        assert_money(bill.total_amount_due, 1355.20);

        let bill = compute_bill_for_text(145.0, "Low-income").unwrap();
        assert_money(bill.total_amount_due, 1219.68);
    }

    #[test]
    fn test_negative_usage_rejected() {
        let err = compute_bill(-1.0, DiscountClass::None).unwrap_err();
        assert!(matches!(err, BillingError::InvalidInput { .. }));
    }

    #[test]
    fn test_non_finite_usage_rejected() {
        assert!(compute_bill(f64::NAN, DiscountClass::None).is_err());
        assert!(compute_bill(f64::INFINITY, DiscountClass::None).is_err());
    }

    #[rstest]
    #[case::integer("145", 145.0)]
    #[case::fraction(" 72.25 ", 72.25)]
    #[case::zero("0", 0.0)]
    fn test_parse_reading(#[case] input: &str, #[case] expected: f64) {
        assert_eq!(parse_reading(input).unwrap(), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::words("twelve")]
    #[case::negative("-3")]
    #[case::nan("NaN")]
    #[case::infinite("inf")]
    fn test_parse_reading_rejects(#[case] input: &str) {
        let err = parse_reading(input).unwrap_err();
        assert!(err.is_expected());
    }
}
