//! Turns a chosen expense into the human-readable claim text the posting
//! client sends out.

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::expense::Expense;
use crate::members::Member;

/// Currency string with pound sign, thousands grouping and 2dp,
/// e.g. `-£1,234.50`.
pub fn money_string(amount: Decimal) -> String {
    let prefix = if amount < Decimal::ZERO { "-" } else { "" };
    let minor = (amount.abs().round_dp(2) * Decimal::ONE_HUNDRED)
        .to_i128()
        .unwrap_or(0);
    let pounds = group_thousands(minor / 100);
    format!("{prefix}\u{a3}{pounds}.{:02}", minor % 100)
}

fn group_thousands(value: i128) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Post-friendly date, e.g. `7 Mar 24`.
pub fn date_string(date: NaiveDate) -> String {
    format!("{} {}", date.day(), date.format("%b %y"))
}

fn claimant_name(expense: &Expense, member: Option<&Member>) -> String {
    member
        .map(Member::display_name)
        .unwrap_or_else(|| format!("Member:{}", expense.member_id))
}

/// The standard post body: claim header, date and claimant, then a sentence
/// describing the spend.
pub fn claim_text(expense: &Expense, member: Option<&Member>) -> String {
    format!(
        "Claim {}\n\n{} - {}\n\n{}",
        expense.claim_number,
        date_string(expense.date),
        claimant_name(expense, member),
        expense_text(expense),
    )
}

/// Sentence describing the spend, phrased by expense kind.
pub fn expense_text(expense: &Expense) -> String {
    let mut text = format!("{} for ", money_string(expense.amount_claimed));

    if expense.is_transport_expense() {
        text.push_str(&transport_expense_text(expense));
    } else if expense.is_overnight_expense() {
        text.push_str(&overnight_expense_text(expense));
    } else {
        text.push_str(&expense.category);
        text.push_str(": ");
        text.push_str(&expense.expense_type);
        if let Some(desc) = &expense.short_desc {
            text.push_str(" - ");
            text.push_str(desc);
        }
    }

    if let Some(details) = &expense.details {
        text.push_str(&format!(" '{details}'"));
    }
    text
}

fn transport_expense_text(expense: &Expense) -> String {
    let mut text = String::new();

    // Who travelled.
    if expense.is_staff_travel() {
        text.push_str("staff");
    }
    if expense.is_mp_travel() {
        text.push_str("MP");
    }
    if expense.is_dependant_travel() {
        text.push_str("a dependant's");
    }

    match expense.mileage {
        Some(miles) => text.push_str(&format!(" travelling {miles} miles")),
        None => text.push_str(" travel"),
    }

    if let (Some(from), Some(to)) = (&expense.travel_from, &expense.travel_to) {
        text.push_str(&format!(" from {from} to {to}"));
    }

    let mode = match expense.expense_type.to_uppercase().as_str() {
        "MILEAGE - CAR" => " by car",
        "MILEAGE - BICYCLE" => " by bicycle",
        "MILEAGE - MOTORCYCLE" => " by motorcycle",
        "AIR TRAVEL" => " by air",
        "RAIL" => " by train",
        "TAXI" => " by taxi",
        _ => "",
    };
    text.push_str(mode);

    if let Some(ticket) = &expense.travel_type {
        text.push_str(&format!(" ({ticket})"));
    }
    if let Some(per_mile) = expense.price_per_mile() {
        text.push_str(&format!(" ({} per mile)", money_string(per_mile)));
    }

    text.push('.');
    text
}

fn overnight_expense_text(expense: &Expense) -> String {
    let mut text = match expense.nights {
        Some(nights) => format!("a {nights} night "),
        None => "a ".to_string(),
    };

    let stay = match expense.expense_type.to_uppercase().as_str() {
        "HOTEL - UK NOT LONDON" => "stay at a non-London hotel",
        "HOTEL - LONDON" => "stay at a London hotel",
        "HOTEL - EUROPEAN" => "stay at a European hotel",
        _ => "hotel stay",
    };
    text.push_str(stay);

    if expense.is_staff_travel() {
        text.push_str(" for staff");
    } else if expense.is_dependant_travel() {
        text.push_str(" for a dependant");
    }

    if let Some(per_night) = expense.price_per_night() {
        text.push_str(&format!(" ({} per night)", money_string(per_night)));
    }

    text.push('.');
    text
}

/// Variant body for first class tickets, leading with the claimant.
pub fn first_class_claim_text(expense: &Expense, member: Option<&Member>) -> String {
    let ticket = expense
        .travel_type
        .as_deref()
        .unwrap_or("first class")
        .trim()
        .to_lowercase();

    let traveller = if expense.is_staff_travel() {
        " for staff"
    } else if expense.is_dependant_travel() {
        " for a dependant"
    } else {
        ""
    };

    let transport = if expense.is_rail() {
        " on a train"
    } else if expense.is_air_travel() {
        " on a flight"
    } else {
        log::warn!(
            "first class claim {} has unrecognized transport type '{}'",
            expense.claim_number,
            expense.expense_type
        );
        ""
    };

    let destinations = match (&expense.travel_from, &expense.travel_to) {
        (Some(from), Some(to)) => format!(" from {from} to {to}"),
        _ => String::new(),
    };

    format!(
        "{} claimed {} for a {ticket} ticket{traveller}{transport}{destinations}.\n\n{} - {}",
        claimant_name(expense, member),
        money_string(expense.amount_claimed),
        date_string(expense.date),
        expense.claim_number,
    )
}
