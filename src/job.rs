//! One batch run: gate on the posting window, load and filter the current
//! expense set, pick an unpublished claim, post it, record it.

use chrono::{DateTime, Datelike, Duration, Local, NaiveTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::config::Config;
use crate::expense::describe_expenses;
use crate::filter::{filter_expenses, FilterPolicy};
use crate::history::PublishHistory;
use crate::importer::{load_years, year_codes_range, ExpenseSource};
use crate::members::{MemberCache, MemberLookup, NotableMembers};
use crate::poster::Poster;
use crate::render::claim_text;
use crate::select::{choose_unpublished, within_window};

/// Daily window inside which posts go out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl PostingWindow {
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Structured status of one run, reported to the scheduler.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// A claim was posted and recorded.
    Posted {
        claim_number: String,
        post_id: String,
    },
    /// Outside the posting window and not forced; nothing was loaded.
    OutsideWindow,
    /// The batch ran but every candidate was already published or out of
    /// the date window.
    NoCandidates,
    /// The post itself failed. The claim is not recorded and stays
    /// eligible for the next run.
    PostFailed {
        claim_number: String,
        error: String,
    },
}

/// Run the job once. `now` is passed in rather than read from the clock so
/// the window gate and date logic stay testable.
#[allow(clippy::too_many_arguments)]
pub fn run<L: MemberLookup>(
    config: &Config,
    source: &dyn ExpenseSource,
    history: &mut dyn PublishHistory,
    poster: &dyn Poster,
    members: &mut MemberCache<L>,
    rng: &mut impl Rng,
    force: bool,
    now: DateTime<Local>,
) -> anyhow::Result<RunOutcome> {
    let window = PostingWindow {
        start: config.post_start,
        end: config.post_end,
    };
    if !force && !window.contains(now.time()) {
        log::info!(
            "{} is outside the posting window {}-{}",
            now.time(),
            window.start,
            window.end
        );
        return Ok(RunOutcome::OutsideWindow);
    }

    let today = now.date_naive();
    let year_codes = year_codes_range(today.year() - config.years_back, today.year());
    let expenses = load_years(source, &year_codes)?;
    log::info!("loaded {}", describe_expenses(&expenses));

    let policy = FilterPolicy {
        always_accept: config.always_accept.clone(),
        notable_members: match &config.notable_members_file {
            Some(path) => NotableMembers::load(path)?,
            None => NotableMembers::default(),
        },
    };
    let candidates = filter_expenses(&expenses, today, &policy, &config.thresholds);
    log::info!("{} after filtering", describe_expenses(&candidates));

    let min_date = today - Duration::weeks(config.max_age_weeks);
    let max_date = today - Duration::weeks(config.min_age_weeks);
    let candidates = within_window(candidates, min_date, max_date);
    log::info!("{} within {min_date}..{max_date}", describe_expenses(&candidates));

    let Some(expense) = choose_unpublished(&candidates, history, rng)? else {
        return Ok(RunOutcome::NoCandidates);
    };
    log::info!("chose {expense}");

    let member = if expense.is_dummy() {
        None
    } else {
        members.member(expense.member_id)
    };
    let text = claim_text(&expense, member);

    let post_id = match poster.post(&text) {
        Ok(post_id) => post_id,
        Err(error) => {
            // Leave the claim unrecorded so it stays eligible next run; a
            // blind retry here risks a duplicate post.
            log::error!("post failed for claim {}: {error:#}", expense.claim_number);
            return Ok(RunOutcome::PostFailed {
                claim_number: expense.claim_number,
                error: format!("{error:#}"),
            });
        }
    };

    history.record(&expense.claim_number, Some(&post_id), Utc::now())?;
    log::info!("posted claim {} as {post_id}", expense.claim_number);
    Ok(RunOutcome::Posted {
        claim_number: expense.claim_number,
        post_id,
    })
}
