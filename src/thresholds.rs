use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::expense::Expense;

/// Tuning for threshold generation. Both values are policy, supplied by the
/// caller rather than baked in here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdParams {
    /// "Top N percent of spend in a bucket is notable", e.g. 5.
    pub top_percentile: u32,
    /// Buckets with fewer samples than this get no threshold at all; a
    /// percentile over a handful of claims is noise.
    pub minimum_count: usize,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        ThresholdParams {
            top_percentile: 5,
            minimum_count: 20,
        }
    }
}

/// Bucket key -> currency cutoff. Regenerated from the in-memory expense set
/// every run and never persisted.
pub type ThresholdMap = HashMap<String, Decimal>;

/// Per-group notable-amount cutoffs: the `(100 - top_percentile)`th
/// percentile of strictly positive claimed amounts within each group.
pub fn generate_group_thresholds(
    expenses: &[Expense],
    params: &ThresholdParams,
) -> ThresholdMap {
    let mut samples: HashMap<String, Vec<Decimal>> = HashMap::new();
    for expense in expenses {
        if expense.amount_claimed > Decimal::ZERO {
            samples
                .entry(expense.group())
                .or_default()
                .push(expense.amount_claimed);
        }
    }
    log::debug!(
        "bucketed {} groups from {} expenses",
        samples.len(),
        expenses.len()
    );
    thresholds_from_samples(samples, params)
}

/// Per-cost-type cutoffs over per-unit rates. Raw amounts are not comparable
/// across trip lengths or stay durations, so travel buckets compare the
/// per-mile/per-night rate instead.
pub fn generate_travel_thresholds(
    expenses: &[Expense],
    params: &ThresholdParams,
) -> ThresholdMap {
    let mut samples: HashMap<String, Vec<Decimal>> = HashMap::new();
    for expense in expenses {
        if let Some(per_unit) = expense.price_per_unit() {
            samples
                .entry(expense.expense_type.to_uppercase())
                .or_default()
                .push(per_unit);
        }
    }
    thresholds_from_samples(samples, params)
}

fn thresholds_from_samples(
    samples: HashMap<String, Vec<Decimal>>,
    params: &ThresholdParams,
) -> ThresholdMap {
    let cut = Decimal::from(100u32.saturating_sub(params.top_percentile));
    let mut thresholds = ThresholdMap::new();
    for (key, mut values) in samples {
        if values.is_empty() || values.len() < params.minimum_count {
            continue;
        }
        values.sort_unstable();
        thresholds.insert(key, percentile(&values, cut).round_dp(3));
    }
    thresholds
}

/// Linear-interpolation percentile over sorted values, the standard
/// definition: rank `(n - 1) * pct / 100`, interpolated between the two
/// surrounding samples. Pure decimal arithmetic, so recomputation over the
/// same input is bit-for-bit identical.
fn percentile(sorted: &[Decimal], pct: Decimal) -> Decimal {
    let last = sorted.len() - 1;
    if last == 0 {
        return sorted[0];
    }
    let rank = Decimal::from(last as u64) * pct / Decimal::ONE_HUNDRED;
    let below = rank.floor();
    let index = below.to_usize().unwrap_or(last).min(last);
    let fraction = rank - below;
    if fraction.is_zero() || index == last {
        return sorted[index];
    }
    sorted[index] + (sorted[index + 1] - sorted[index]) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn expense(group_seed: &str, amount: Decimal) -> Expense {
        Expense {
            member_id: 1,
            year_code: "22_23".to_string(),
            claim_number: format!("22-23-{group_seed}"),
            date: NaiveDate::from_ymd_opt(2023, 1, 10).unwrap(),
            category: "Office Costs".to_string(),
            expense_type: group_seed.to_string(),
            amount_claimed: amount,
            amount_paid: amount,
            status: "Paid".to_string(),
            short_desc: None,
            details: None,
            travel_from: None,
            travel_to: None,
            travel_type: None,
            mileage: None,
            nights: None,
        }
    }

    fn mileage_expense(amount: Decimal, miles: Decimal) -> Expense {
        Expense {
            expense_type: "MILEAGE - CAR".to_string(),
            mileage: Some(miles),
            ..expense("MILEAGE - CAR", amount)
        }
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let values: Vec<Decimal> = (1..=100).map(Decimal::from).collect();
        // rank = 99 * 0.95 = 94.05 -> between the 95 and 96 samples
        assert_eq!(percentile(&values, dec!(95)), dec!(95.05));
        assert_eq!(percentile(&values, dec!(100)), dec!(100));
        assert_eq!(percentile(&values, dec!(0)), dec!(1));
    }

    #[test]
    fn percentile_of_single_value() {
        assert_eq!(percentile(&[dec!(42)], dec!(95)), dec!(42));
    }

    #[test]
    fn groups_below_minimum_count_get_no_threshold() {
        let params = ThresholdParams {
            top_percentile: 5,
            minimum_count: 4,
        };
        let expenses: Vec<Expense> =
            (0..3).map(|i| expense("STATIONERY", Decimal::from(i + 1))).collect();
        let thresholds = generate_group_thresholds(&expenses, &params);
        assert!(thresholds.is_empty());
    }

    #[test]
    fn non_positive_amounts_do_not_count_as_samples() {
        let params = ThresholdParams {
            top_percentile: 5,
            minimum_count: 3,
        };
        let mut expenses = vec![
            expense("STATIONERY", dec!(10)),
            expense("STATIONERY", dec!(20)),
        ];
        expenses.push(expense("STATIONERY", dec!(0)));
        expenses.push(expense("STATIONERY", dec!(-5)));
        // Only two positive samples, below the floor of three.
        assert!(generate_group_thresholds(&expenses, &params).is_empty());
    }

    #[test]
    fn group_threshold_at_cutoff_percentile() {
        let params = ThresholdParams {
            top_percentile: 5,
            minimum_count: 20,
        };
        let expenses: Vec<Expense> = (1..=100)
            .map(|i| expense("STATIONERY", Decimal::from(i)))
            .collect();
        let thresholds = generate_group_thresholds(&expenses, &params);
        assert_eq!(
            thresholds.get("OFFICE COSTS/STATIONERY/"),
            Some(&dec!(95.05))
        );
    }

    #[test]
    fn travel_thresholds_bucket_by_cost_type_per_unit() {
        let params = ThresholdParams {
            top_percentile: 5,
            minimum_count: 2,
        };
        let expenses = vec![
            mileage_expense(dec!(45), dec!(100)),
            mileage_expense(dec!(90), dec!(100)),
        ];
        let thresholds = generate_travel_thresholds(&expenses, &params);
        // rates 0.45 and 0.90, p95 interpolates within the pair
        assert_eq!(thresholds.len(), 1);
        assert!(thresholds.contains_key("MILEAGE - CAR"));
        let cutoff = thresholds["MILEAGE - CAR"];
        assert!(cutoff > dec!(0.45) && cutoff <= dec!(0.90));
    }

    #[test]
    fn generation_is_deterministic() {
        let params = ThresholdParams::default();
        let expenses: Vec<Expense> = (1..=250)
            .map(|i| {
                let amount = Decimal::from(i * 7 % 400 + 1);
                if i % 2 == 0 {
                    mileage_expense(amount, Decimal::from(i))
                } else {
                    expense("STATIONERY", amount)
                }
            })
            .collect();
        assert_eq!(
            generate_group_thresholds(&expenses, &params),
            generate_group_thresholds(&expenses, &params)
        );
        assert_eq!(
            generate_travel_thresholds(&expenses, &params),
            generate_travel_thresholds(&expenses, &params)
        );
    }
}
