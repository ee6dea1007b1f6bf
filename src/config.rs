use std::env;
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveTime;

use crate::filter::CategoryShortcut;
use crate::thresholds::ThresholdParams;

/// Everything the job reads from the environment: one `MPE_`-prefixed
/// variable per knob, falling back to the defaults below. Resolved once at
/// startup; bad values abort the run before any data is touched.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory of cached `<year_code>.csv` files (`MPE_DATA_DIR`).
    pub data_dir: PathBuf,
    /// SQLite file recording published claim numbers (`MPE_HISTORY_DB`).
    pub history_db: PathBuf,
    /// JSON name -> member id map of always-surfaced claimants
    /// (`MPE_NOTABLE_MEMBERS`).
    pub notable_members_file: Option<PathBuf>,
    /// `MPE_TOP_PERCENTILE` / `MPE_MINIMUM_COUNT`.
    pub thresholds: ThresholdParams,
    /// Financial years to load besides the current one (`MPE_YEARS_BACK`).
    pub years_back: i32,
    /// Claims younger than this many weeks are skipped (`MPE_MIN_AGE_WEEKS`).
    pub min_age_weeks: i64,
    /// Claims older than this many weeks are skipped (`MPE_MAX_AGE_WEEKS`).
    pub max_age_weeks: i64,
    /// Comma-separated shortcut list (`MPE_ALWAYS_ACCEPT`), e.g.
    /// "air-travel,taxi".
    pub always_accept: Vec<CategoryShortcut>,
    /// Daily posting window (`MPE_POST_START` / `MPE_POST_END`, HH:MM).
    pub post_start: NaiveTime,
    pub post_end: NaiveTime,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("csv_cache"),
            history_db: PathBuf::from("published.db"),
            notable_members_file: None,
            thresholds: ThresholdParams::default(),
            years_back: 2,
            min_age_weeks: 8,
            max_age_weeks: 52,
            always_accept: vec![CategoryShortcut::AirTravel],
            post_start: NaiveTime::from_hms_opt(6, 55, 0).unwrap(),
            post_end: NaiveTime::from_hms_opt(21, 5, 0).unwrap(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();
        Ok(Config {
            data_dir: env_var("MPE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            history_db: env_var("MPE_HISTORY_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.history_db),
            notable_members_file: env_var("MPE_NOTABLE_MEMBERS").map(PathBuf::from),
            thresholds: ThresholdParams {
                top_percentile: env_parse("MPE_TOP_PERCENTILE")?
                    .unwrap_or(defaults.thresholds.top_percentile),
                minimum_count: env_parse("MPE_MINIMUM_COUNT")?
                    .unwrap_or(defaults.thresholds.minimum_count),
            },
            years_back: env_parse("MPE_YEARS_BACK")?.unwrap_or(defaults.years_back),
            min_age_weeks: env_parse("MPE_MIN_AGE_WEEKS")?.unwrap_or(defaults.min_age_weeks),
            max_age_weeks: env_parse("MPE_MAX_AGE_WEEKS")?.unwrap_or(defaults.max_age_weeks),
            always_accept: match env_var("MPE_ALWAYS_ACCEPT") {
                Some(raw) => parse_shortcuts(&raw)?,
                None => defaults.always_accept,
            },
            post_start: env_time("MPE_POST_START", defaults.post_start)?,
            post_end: env_time("MPE_POST_END", defaults.post_end)?,
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> anyhow::Result<Option<T>> {
    match env_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("invalid value '{raw}' for {key}")),
        None => Ok(None),
    }
}

fn env_time(key: &str, default: NaiveTime) -> anyhow::Result<NaiveTime> {
    match env_var(key) {
        Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .with_context(|| format!("invalid time '{raw}' for {key}, expected HH:MM")),
        None => Ok(default),
    }
}

fn parse_shortcuts(raw: &str) -> anyhow::Result<Vec<CategoryShortcut>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            CategoryShortcut::from_str(part)
                .ok_or_else(|| anyhow::anyhow!("unknown expense shortcut '{part}'"))
        })
        .collect()
}
