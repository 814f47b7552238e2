pub mod auth;
pub mod export;
pub mod institute;
pub mod proposal;
pub mod session;
pub mod user;

use anyhow::bail;
use chrono::NaiveDate;
use clap::Args;

use crate::door::filter::FILTER_DATE_FORMAT;

/// Optional narrowing of a beamline listing: one year or a date range.
#[derive(Args, Debug, Clone, Default)]
pub struct PeriodArgs {
    #[arg(long, conflicts_with_all = ["from", "to"], help = "Only this calendar year")]
    pub year: Option<i32>,
    #[arg(long, requires = "to", help = "Range start (YYYY-MM-DD)")]
    pub from: Option<String>,
    #[arg(long, requires = "from", help = "Range end (YYYY-MM-DD)")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    All,
    Year(i32),
    Range(NaiveDate, NaiveDate),
}

impl PeriodArgs {
    pub fn period(&self) -> anyhow::Result<Period> {
        match (self.year, &self.from, &self.to) {
            (Some(year), None, None) => Ok(Period::Year(year)),
            (None, Some(from), Some(to)) => Ok(Period::Range(parse_date(from)?, parse_date(to)?)),
            (None, None, None) => Ok(Period::All),
            _ => bail!("Use either --year or both --from and --to"),
        }
    }
}

pub fn parse_date(value: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), FILTER_DATE_FORMAT)
        .map_err(|_| anyhow::anyhow!("Invalid date '{}', expected YYYY-MM-DD", value))
}
