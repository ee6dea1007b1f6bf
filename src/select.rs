use chrono::NaiveDate;
use rand::Rng;

use crate::expense::Expense;
use crate::history::PublishHistory;

/// Keep only expenses dated within `[min_date, max_date]`. The job uses a
/// trailing window so very stale claims and very fresh, possibly still
/// unsettled ones both drop out.
pub fn within_window(
    expenses: Vec<Expense>,
    min_date: NaiveDate,
    max_date: NaiveDate,
) -> Vec<Expense> {
    expenses
        .into_iter()
        .filter(|expense| (min_date..=max_date).contains(&expense.date))
        .collect()
}

/// Pick one candidate that has not been published yet.
///
/// Draws uniformly at random and checks each draw against the history
/// store, so a claim number that appears twice in the batch under different
/// row shapes still cannot be posted twice. Returns `None` once every
/// candidate is exhausted.
pub fn choose_unpublished(
    candidates: &[Expense],
    history: &dyn PublishHistory,
    rng: &mut impl Rng,
) -> anyhow::Result<Option<Expense>> {
    let mut pool: Vec<&Expense> = candidates.iter().collect();
    while !pool.is_empty() {
        let pick = rng.gen_range(0..pool.len());
        let candidate = pool.swap_remove(pick);
        if history.contains(&candidate.claim_number)? {
            log::debug!("claim {} already published, redrawing", candidate.claim_number);
            continue;
        }
        return Ok(Some(candidate.clone()));
    }
    Ok(None)
}
