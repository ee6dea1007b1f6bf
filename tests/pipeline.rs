//! End-to-end run over an in-memory CSV batch: parse, threshold, filter,
//! then drain the candidate pool through selection and history.

use chrono::NaiveDate;
use mpexpenses::{
    choose_unpublished, filter_expenses, read_expenses, Expense, FilterPolicy, MemoryHistory,
    PublishHistory, ThresholdParams, EXPECTED_FIELDS,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;

const YEAR: &str = "22_23";

fn header() -> String {
    EXPECTED_FIELDS.join(",")
}

#[allow(clippy::too_many_arguments)]
fn row(
    claim: &str,
    date: &str,
    category: &str,
    cost_type: &str,
    short_desc: &str,
    travel: &str,
    mileage: &str,
    amount: &str,
) -> String {
    format!(
        "1234,{YEAR},{date},{claim},A Member,Somewhere,{category},{cost_type},\
         {short_desc},,,,,{travel},,{mileage},{amount},{amount},0,0,Paid,,3,2"
    )
}

fn batch_csv() -> String {
    let mut lines = vec![header()];

    // A stationery group big enough to get a threshold: 10, 20, .. 200,
    // plus one outlier. With 21 samples the 95th percentile lands on 200.
    for i in 1..=20 {
        lines.push(row(
            &format!("22-23-{i:06}"),
            "2023-03-02",
            "Office Costs",
            "Stationery",
            "Paper",
            "",
            "",
            &format!("{}", i * 10),
        ));
    }
    lines.push(row(
        "22-23-OUTLIER",
        "2023-03-02",
        "Office Costs",
        "Stationery",
        "Paper",
        "",
        "",
        "5000.00",
    ));

    // Always newsworthy: first class rail and (by default policy) flights.
    lines.push(row(
        "22-23-FIRST",
        "2023-03-02",
        "MP Travel",
        "Rail",
        "",
        "FIRST RETURN",
        "",
        "50.00",
    ));
    lines.push(row(
        "22-23-FLIGHT",
        "2023-03-02",
        "MP Travel",
        "Air Travel",
        "",
        "",
        "",
        "60.00",
    ));

    // Trivially small claims are notable by policy.
    lines.push(row(
        "22-23-TINY",
        "2023-03-02",
        "Office Costs",
        "Pens",
        "",
        "",
        "",
        "0.99",
    ));

    // Noise that must be dropped: future-dated, the "1" placeholder, and a
    // cheap rail booking fee.
    lines.push(row(
        "22-23-FUTURE",
        "2023-07-01",
        "Office Costs",
        "Misc",
        "",
        "",
        "",
        "999.00",
    ));
    lines.push(row(
        "1",
        "2023-03-02",
        "Office Costs",
        "Misc",
        "",
        "",
        "",
        "999.00",
    ));
    lines.push(row(
        "22-23-FEE",
        "2023-03-02",
        "MP Travel",
        "Rail",
        "Booking Fee",
        "",
        "",
        "1.00",
    ));

    lines.join("\n") + "\n"
}

fn accepted_claims(expenses: &[Expense], today: NaiveDate) -> BTreeSet<String> {
    let params = ThresholdParams {
        top_percentile: 5,
        minimum_count: 20,
    };
    filter_expenses(expenses, today, &FilterPolicy::default(), &params)
        .into_iter()
        .map(|e| e.claim_number)
        .collect()
}

#[test]
fn batch_filters_down_to_the_newsworthy_claims() {
    let expenses = read_expenses(batch_csv().as_bytes()).unwrap();
    assert_eq!(expenses.len(), 27);

    let today = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    let accepted = accepted_claims(&expenses, today);

    let expected: BTreeSet<String> = [
        // 200 sits exactly on the inclusive group cutoff; 5000 is far above.
        "22-23-000020",
        "22-23-OUTLIER",
        "22-23-FIRST",
        "22-23-FLIGHT",
        "22-23-TINY",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(accepted, expected);
}

#[test]
fn selection_drains_the_pool_without_repeats() {
    let expenses = read_expenses(batch_csv().as_bytes()).unwrap();
    let today = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    let params = ThresholdParams {
        top_percentile: 5,
        minimum_count: 20,
    };
    let candidates = filter_expenses(&expenses, today, &FilterPolicy::default(), &params);

    let mut history = MemoryHistory::new();
    let mut rng = StdRng::seed_from_u64(42);
    let mut posted = Vec::new();

    while let Some(expense) = choose_unpublished(&candidates, &history, &mut rng).unwrap() {
        history
            .record(
                &expense.claim_number,
                Some("post"),
                "2023-06-01T12:00:00Z".parse().unwrap(),
            )
            .unwrap();
        posted.push(expense.claim_number);
    }

    // Every candidate was posted exactly once.
    assert_eq!(posted.len(), candidates.len());
    let unique: BTreeSet<&String> = posted.iter().collect();
    assert_eq!(unique.len(), posted.len());
}
