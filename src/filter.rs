use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::expense::Expense;
use crate::members::NotableMembers;
use crate::thresholds::{
    generate_group_thresholds, generate_travel_thresholds, ThresholdMap, ThresholdParams,
};

/// Expense kinds that surface regardless of amount. Which kinds get the
/// shortcut is editorial policy and has changed over time, so it is
/// configuration rather than a hardcoded list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryShortcut {
    AirTravel,
    TaxiRide,
    Energy,
}

impl CategoryShortcut {
    pub fn from_str(s: &str) -> Option<CategoryShortcut> {
        match s.trim().to_lowercase().as_str() {
            "air-travel" | "air" => Some(CategoryShortcut::AirTravel),
            "taxi" => Some(CategoryShortcut::TaxiRide),
            "energy" => Some(CategoryShortcut::Energy),
            _ => None,
        }
    }

    fn matches(self, expense: &Expense) -> bool {
        match self {
            CategoryShortcut::AirTravel => expense.is_air_travel(),
            CategoryShortcut::TaxiRide => expense.is_taxi_ride(),
            CategoryShortcut::Energy => expense.is_energy(),
        }
    }
}

/// Run-scoped policy inputs to the decision rule: the always-accept
/// shortcuts and the notable-members allow-list, both loaded once per run.
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    pub always_accept: Vec<CategoryShortcut>,
    pub notable_members: NotableMembers,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        FilterPolicy {
            always_accept: vec![CategoryShortcut::AirTravel],
            notable_members: NotableMembers::default(),
        }
    }
}

/// Decide whether one expense is worth surfacing. Rules run top to bottom;
/// the first match wins.
pub fn expense_filter(
    expense: &Expense,
    today: NaiveDate,
    policy: &FilterPolicy,
    travel_thresholds: &ThresholdMap,
    group_thresholds: &ThresholdMap,
) -> bool {
    // Claims cannot be dated after today.
    if expense.date > today {
        return false;
    }

    // Placeholder claim numbers and non-positive amounts are source noise.
    if expense.claim_number == "1" || expense.amount_claimed <= Decimal::ZERO {
        return false;
    }

    // Small rail booking fees are too small to be worth a post.
    if expense.is_rail_booking_fee() && expense.amount_claimed <= dec!(5) {
        return false;
    }

    // First class always surfaces.
    if expense.is_first_class() {
        return true;
    }

    // As does anything claimed by a member of note.
    if policy.notable_members.contains(expense.member_id) {
        return true;
    }

    // Shortcut expense kinds skip the amount checks entirely.
    if policy
        .always_accept
        .iter()
        .any(|shortcut| shortcut.matches(expense))
    {
        return true;
    }

    // Very small claims are notable for the opposite reason.
    if expense.amount_claimed < dec!(3) {
        return true;
    }

    // A claim with a per-unit rate compares against the travel cutoff for
    // its cost type. A type with no cutoff has no known ceiling and
    // surfaces.
    if let Some(per_unit) = expense.price_per_unit() {
        return match travel_thresholds.get(&expense.expense_type.to_uppercase()) {
            Some(cutoff) => per_unit > *cutoff,
            None => true,
        };
    }

    // Everything else compares the claimed amount against its group cutoff.
    match group_thresholds.get(&expense.group()) {
        Some(cutoff) => expense.amount_claimed >= *cutoff,
        None => true,
    }
}

/// Generate both threshold tables from the full set, then apply the decision
/// rule to every expense. A failure evaluating one record drops that record
/// with a log line; the batch carries on.
pub fn filter_expenses(
    expenses: &[Expense],
    today: NaiveDate,
    policy: &FilterPolicy,
    params: &ThresholdParams,
) -> Vec<Expense> {
    let travel_thresholds = generate_travel_thresholds(expenses, params);
    let group_thresholds = generate_group_thresholds(expenses, params);
    log::info!(
        "generated {} travel and {} group thresholds from {} expenses",
        travel_thresholds.len(),
        group_thresholds.len(),
        expenses.len()
    );

    expenses
        .iter()
        .filter(|expense| {
            catch_unwind(AssertUnwindSafe(|| {
                expense_filter(expense, today, policy, &travel_thresholds, &group_thresholds)
            }))
            .unwrap_or_else(|_| {
                log::error!("failed to evaluate expense, dropping it: {expense:?}");
                false
            })
        })
        .cloned()
        .collect()
}
