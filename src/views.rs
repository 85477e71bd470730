//! Game view counting and view statistics.

use uuid::Uuid;

use crate::{error::AppError, repository::Repository};

/// ViewRange
///
/// Dashboard trend window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewRange {
    #[default]
    Week,
    Month,
    Year,
}

impl ViewRange {
    /// Unknown or missing values fall back to a week.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("month") => ViewRange::Month,
            Some("year") => ViewRange::Year,
            _ => ViewRange::Week,
        }
    }

    pub fn days(&self) -> i32 {
        match self {
            ViewRange::Week => 7,
            ViewRange::Month => 30,
            ViewRange::Year => 365,
        }
    }
}

pub const DEFAULT_TREND_DAYS: i32 = 7;
pub const MAX_TREND_DAYS: i32 = 365;

/// Validates the `days` query parameter of the trend endpoint.
pub fn trend_days(raw: Option<i32>) -> Result<i32, AppError> {
    match raw.unwrap_or(DEFAULT_TREND_DAYS) {
        days @ 1..=MAX_TREND_DAYS => Ok(days),
        _ => Err(AppError::Validation(format!(
            "days must be between 1 and {MAX_TREND_DAYS}"
        ))),
    }
}

/// record_view
///
/// Adds exactly one view to the game's counter, then to today's aggregate row.
/// The aggregate is secondary: its failure is logged and does not fail the view.
pub async fn record_view(repo: &dyn Repository, game_id: Uuid) -> Result<i64, AppError> {
    let views = repo
        .increment_game_views(game_id)
        .await?
        .ok_or(AppError::NotFound("game"))?;

    if let Err(err) = repo.append_daily_view(game_id).await {
        if err.is_missing_relation() {
            tracing::debug!(%game_id, "game_views is not provisioned, daily aggregate skipped");
        } else {
            tracing::warn!(%game_id, error = %err, "failed to append daily view");
        }
    }

    Ok(views)
}

/// record_view_best_effort
///
/// Used while serving a game page: a failed increment is logged and swallowed.
/// Returns the new counter when the increment went through.
pub async fn record_view_best_effort(repo: &dyn Repository, game_id: Uuid) -> Option<i64> {
    record_view(repo, game_id)
        .await
        .inspect_err(|err| tracing::warn!(%game_id, error = %err, "failed to record game view"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_parsing() {
        assert_eq!(ViewRange::parse(Some("month")).days(), 30);
        assert_eq!(ViewRange::parse(Some("year")).days(), 365);
        assert_eq!(ViewRange::parse(Some("decade")), ViewRange::Week);
        assert_eq!(ViewRange::parse(None).days(), 7);
    }

    #[test]
    fn trend_days_bounds() {
        assert_eq!(trend_days(None).unwrap(), 7);
        assert_eq!(trend_days(Some(30)).unwrap(), 30);
        assert!(trend_days(Some(0)).is_err());
        assert!(trend_days(Some(400)).is_err());
    }
}
