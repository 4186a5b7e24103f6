// Customer Entity - account number identity with editable profile values
//
// The account number is the identity: drawn once when the account is opened
// and never changed afterwards. Name, address and the two classes are values
// that can be edited. Usage is written only by billing.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CUSTOMER CLASS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerClass {
    Residential,
    Commercial,
    Industrial,
}

impl CustomerClass {
    pub const ALL: [CustomerClass; 3] = [
        CustomerClass::Residential,
        CustomerClass::Commercial,
        CustomerClass::Industrial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerClass::Residential => "Residential",
            CustomerClass::Commercial => "Commercial",
            CustomerClass::Industrial => "Industrial",
        }
    }

    /// Parse stored text or a menu number ("1".."3").
    /// Anything else falls back to Residential.
    pub fn from_text(text: &str) -> Self {
        match text.trim() {
            "Commercial" | "2" => CustomerClass::Commercial,
            "Industrial" | "3" => CustomerClass::Industrial,
            _ => CustomerClass::Residential,
        }
    }
}

impl fmt::Display for CustomerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DISCOUNT CLASS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountClass {
    #[default]
    None,
    #[serde(rename = "Senior Citizen")]
    SeniorCitizen,
    #[serde(rename = "PWD")]
    Pwd,
    #[serde(rename = "Low-income")]
    LowIncome,
}

impl DiscountClass {
    pub const ALL: [DiscountClass; 4] = [
        DiscountClass::None,
        DiscountClass::SeniorCitizen,
        DiscountClass::Pwd,
        DiscountClass::LowIncome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountClass::None => "None",
            DiscountClass::SeniorCitizen => "Senior Citizen",
            DiscountClass::Pwd => "PWD",
            DiscountClass::LowIncome => "Low-income",
        }
    }

    /// Fraction taken off the pre-tax subtotal
    pub fn rate(&self) -> f64 {
        match self {
            DiscountClass::None => 0.0,
            DiscountClass::SeniorCitizen | DiscountClass::Pwd => 0.05,
            DiscountClass::LowIncome => 0.10,
        }
    }

    /// Parse stored text or a menu number ("1".."4").
    /// Unrecognised text means no discount.
    pub fn from_text(text: &str) -> Self {
        match text.trim() {
            "Senior Citizen" | "2" => DiscountClass::SeniorCitizen,
            "PWD" | "3" => DiscountClass::Pwd,
            "Low-income" | "4" => DiscountClass::LowIncome,
            _ => DiscountClass::None,
        }
    }
}

impl fmt::Display for DiscountClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CUSTOMER RECORD
// ============================================================================

/// One row of the customer table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Six-digit account number, never reassigned
    pub account_number: u32,
    pub name: String,
    pub address: String,
    pub customer_class: CustomerClass,
    pub discount_class: DiscountClass,

    /// kWh of the most recent reading (overwritten on each bill)
    pub current_usage: f64,

    /// kWh billed over the life of the account
    pub lifetime_usage: f64,
}

// ============================================================================
// PROFILE UPDATE
// ============================================================================

/// Subset of profile fields to change. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub customer_class: Option<CustomerClass>,
    pub discount_class: Option<DiscountClass>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.customer_class.is_none()
            && self.discount_class.is_none()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn customer_class(mut self, class: CustomerClass) -> Self {
        self.customer_class = Some(class);
        self
    }

    pub fn discount_class(mut self, class: DiscountClass) -> Self {
        self.discount_class = Some(class);
        self
    }

    /// Column assignments in a fixed order, ready for an UPDATE statement
    pub(crate) fn assignments(&self) -> Vec<(&'static str, String)> {
        let mut columns = Vec::new();
        if let Some(name) = &self.name {
            columns.push(("CustomerName", name.clone()));
        }
        if let Some(address) = &self.address {
            columns.push(("Address", address.clone()));
        }
        if let Some(class) = self.customer_class {
            columns.push(("Type", class.as_str().to_string()));
        }
        if let Some(class) = self.discount_class {
            columns.push(("Discount", class.as_str().to_string()));
        }
        columns
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_from_text() {
        assert_eq!(DiscountClass::from_text("Senior Citizen"), DiscountClass::SeniorCitizen);
        assert_eq!(DiscountClass::from_text("PWD"), DiscountClass::Pwd);
        assert_eq!(DiscountClass::from_text("Low-income"), DiscountClass::LowIncome);
        assert_eq!(DiscountClass::from_text("None"), DiscountClass::None);
        assert_eq!(DiscountClass::from_text("4"), DiscountClass::LowIncome);
    }

    #[test]
    fn test_unknown_discount_means_no_discount() {
        assert_eq!(DiscountClass::from_text("Veteran"), DiscountClass::None);
        assert_eq!(DiscountClass::from_text(""), DiscountClass::None);
        // Stored text is matched exactly
        assert_eq!(DiscountClass::from_text("senior citizen"), DiscountClass::None);
    }

    #[test]
    fn test_discount_rates() {
        assert_eq!(DiscountClass::None.rate(), 0.0);
        assert_eq!(DiscountClass::SeniorCitizen.rate(), 0.05);
        assert_eq!(DiscountClass::Pwd.rate(), 0.05);
        assert_eq!(DiscountClass::LowIncome.rate(), 0.10);
    }

    #[test]
    fn test_customer_class_fallback() {
        assert_eq!(CustomerClass::from_text("Industrial"), CustomerClass::Industrial);
        assert_eq!(CustomerClass::from_text("2"), CustomerClass::Commercial);
        assert_eq!(CustomerClass::from_text("Farm"), CustomerClass::Residential);
    }

    #[test]
    fn test_text_forms_round_trip() {
        for class in DiscountClass::ALL {
            assert_eq!(DiscountClass::from_text(class.as_str()), class);
        }
        for class in CustomerClass::ALL {
            assert_eq!(CustomerClass::from_text(class.as_str()), class);
        }
    }

    #[test]
    fn test_discount_serializes_as_display_text() {
        let json = serde_json::to_string(&DiscountClass::SeniorCitizen).unwrap();
        assert_eq!(json, "\"Senior Citizen\"");
    }

    #[test]
    fn test_profile_update_assignments() {
        let empty = ProfileUpdate::default();
        assert!(empty.is_empty());
        assert!(empty.assignments().is_empty());

        let update = ProfileUpdate::default()
            .address("12 Rizal St")
            .discount_class(DiscountClass::Pwd);
        assert!(!update.is_empty());
        assert_eq!(
            update.assignments(),
            vec![
                ("Address", "12 Rizal St".to_string()),
                ("Discount", "PWD".to_string()),
            ]
        );
    }
}
