use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::render::money_string;

/// Ticket types the source data marks as first class.
pub const FIRST_CLASS_TYPES: [&str; 4] = [
    "FIRST RETURN",
    "FIRST SINGLE",
    "BUSINESS / CLUB RETURN",
    "BUSINESS / CLUB SINGLE",
];

/// Words that suggest a premium fare outside the recognized ticket set.
const PREMIUM_KEYWORDS: [&str; 4] = ["FIRST", "BUSINESS", "CLUB", "PREMIUM"];

const TRANSPORT_TYPES: [&str; 6] = [
    "MILEAGE - CAR",
    "MILEAGE - MOTORCYCLE",
    "MILEAGE - BICYCLE",
    "AIR TRAVEL",
    "RAIL",
    "TAXI",
];

const OVERNIGHT_TYPES: [&str; 4] = [
    "HOTEL - UK NOT LONDON",
    "HOTEL - LONDON",
    "HOTEL - EUROPEAN",
    "HOTEL - LATE NIGHT",
];

/// One itemized cost claim submitted by a member or their staff.
///
/// Built once per run from a parsed source row and immutable thereafter.
/// Claimant details are not stored here; enrichment happens through
/// [`crate::members::MemberCache`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub member_id: i64,
    /// Spreadsheet year the claim was published under, e.g. "22_23".
    pub year_code: String,
    /// Unique per year, may carry a `-` suffix. "1" is a known source
    /// placeholder and gets rejected downstream.
    pub claim_number: String,
    pub date: NaiveDate,
    pub category: String,
    /// Uppercased at parse; the source mixes cases freely.
    pub expense_type: String,
    pub amount_claimed: Decimal,
    pub amount_paid: Decimal,
    pub status: String,
    pub short_desc: Option<String>,
    pub details: Option<String>,
    pub travel_from: Option<String>,
    pub travel_to: Option<String>,
    pub travel_type: Option<String>,
    /// Positive when present; non-positive source values are dropped at parse.
    pub mileage: Option<Decimal>,
    /// Positive when present; non-positive source values are dropped at parse.
    pub nights: Option<Decimal>,
}

impl Expense {
    /// Composite bucket key used for percentile comparison of like expenses.
    pub fn group(&self) -> String {
        format!(
            "{}/{}/{}",
            self.category.trim(),
            self.expense_type.trim(),
            self.short_desc.as_deref().unwrap_or("").trim(),
        )
        .to_uppercase()
    }

    /// Claimed amount per mile, 2dp. Absent without mileage or a positive
    /// amount.
    pub fn price_per_mile(&self) -> Option<Decimal> {
        let mileage = self.mileage?;
        if self.amount_claimed <= Decimal::ZERO {
            return None;
        }
        self.amount_claimed
            .checked_div(mileage)
            .map(|rate| rate.round_dp(2))
    }

    /// Claimed amount per night, 2dp. Absent without nights or a positive
    /// amount.
    pub fn price_per_night(&self) -> Option<Decimal> {
        let nights = self.nights?;
        if self.amount_claimed <= Decimal::ZERO {
            return None;
        }
        self.amount_claimed
            .checked_div(nights)
            .map(|rate| rate.round_dp(2))
    }

    /// The per-unit rate for threshold comparison: per-night if the claim is
    /// an overnight stay, per-mile if it is mileage. A claim carrying both
    /// rates is a data anomaly and yields no rate.
    pub fn price_per_unit(&self) -> Option<Decimal> {
        match (self.price_per_night(), self.price_per_mile()) {
            (Some(_), Some(_)) => {
                log::warn!(
                    "expense {} has both a per-mile and a per-night rate: {}",
                    self.claim_number,
                    self
                );
                None
            }
            (Some(per_night), None) => Some(per_night),
            (None, Some(per_mile)) => Some(per_mile),
            (None, None) => None,
        }
    }

    /// Rail booking fees show up either labelled or as token £1 claims.
    pub fn is_rail_booking_fee(&self) -> bool {
        self.is_rail()
            && (self
                .short_desc
                .as_deref()
                .is_some_and(|desc| desc.to_uppercase().contains("BOOKING FEE"))
                || self.amount_claimed == Decimal::ONE)
    }

    /// True for the recognized first class ticket types. A travel type that
    /// merely contains a premium keyword is logged for review but not
    /// treated as first class.
    pub fn is_first_class(&self) -> bool {
        let travel_type = match self.travel_type.as_deref() {
            Some(t) => t.trim().to_uppercase(),
            None => return false,
        };
        if FIRST_CLASS_TYPES.contains(&travel_type.as_str()) {
            return true;
        }
        if PREMIUM_KEYWORDS.iter().any(|word| travel_type.contains(word)) {
            log::warn!(
                "expense {}: travel type '{}' is not a recognized first class \
                 ticket type but matches a premium keyword",
                self.claim_number,
                travel_type
            );
        }
        false
    }

    pub fn is_air_travel(&self) -> bool {
        self.expense_type.eq_ignore_ascii_case("AIR TRAVEL")
    }

    pub fn is_taxi_ride(&self) -> bool {
        self.expense_type.eq_ignore_ascii_case("TAXI")
    }

    pub fn is_rail(&self) -> bool {
        self.expense_type.eq_ignore_ascii_case("RAIL")
    }

    pub fn is_energy(&self) -> bool {
        self.short_desc.as_deref().is_some_and(|desc| {
            ["GAS", "ELECTRICITY", "DUAL FUEL"]
                .iter()
                .any(|kind| desc.eq_ignore_ascii_case(kind))
        })
    }

    pub fn is_staff_travel(&self) -> bool {
        self.category.trim().eq_ignore_ascii_case("STAFF TRAVEL")
    }

    pub fn is_dependant_travel(&self) -> bool {
        self.category.trim().eq_ignore_ascii_case("DEPENDANT TRAVEL")
    }

    pub fn is_mp_travel(&self) -> bool {
        self.category.trim().eq_ignore_ascii_case("MP TRAVEL")
    }

    pub fn is_transport_expense(&self) -> bool {
        let expense_type = self.expense_type.to_uppercase();
        TRANSPORT_TYPES.contains(&expense_type.as_str())
    }

    pub fn is_overnight_expense(&self) -> bool {
        let expense_type = self.expense_type.to_uppercase();
        OVERNIGHT_TYPES.contains(&expense_type.as_str())
    }

    /// Placeholder rows carry "DUMMY" claim numbers and have no claimant to
    /// look up.
    pub fn is_dummy(&self) -> bool {
        self.claim_number.to_uppercase().contains("DUMMY")
    }
}

impl fmt::Display for Expense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "claim {} on {} member={}: {} for {} - {} - {}",
            self.claim_number,
            self.date,
            self.member_id,
            money_string(self.amount_claimed),
            self.category,
            self.expense_type,
            self.short_desc.as_deref().unwrap_or("-"),
        )
    }
}

/// One-line summary of a batch for logs.
pub fn describe_expenses(expenses: &[Expense]) -> String {
    match expenses {
        [] => "0 expenses".to_string(),
        [only] => format!("1 expense on {}", only.date),
        _ => {
            let min = expenses.iter().map(|e| e.date).min().unwrap();
            let max = expenses.iter().map(|e| e.date).max().unwrap();
            format!("{} expenses from {} to {}", expenses.len(), min, max)
        }
    }
}
