//! Consecutive-day check-in streaks.
//!
//! A streak counts backwards from an anchor day over the distinct days
//! that have at least one check-in. The streak survives overnight: a user
//! who checked in yesterday but not yet today still holds their streak.
//! Two days of silence break it to zero.

use chrono::{Local, NaiveDate};

use crate::model::WellnessCheckIn;

/// Which day anchors "today" for streak evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DayAnchor {
    /// The local calendar date at evaluation time.
    #[default]
    Today,
    /// A fixed date, for deterministic evaluation.
    Fixed(NaiveDate),
}

impl DayAnchor {
    /// Resolve to a concrete calendar date.
    pub fn resolve(self) -> NaiveDate {
        match self {
            DayAnchor::Today => Local::now().date_naive(),
            DayAnchor::Fixed(day) => day,
        }
    }
}

/// Count consecutive days with at least one check-in, walking backwards
/// from the anchor day.
///
/// Rules:
/// - days after the anchor are ignored, as are check-ins without a
///   parseable day
/// - multiple check-ins on one day count once
/// - the streak is 0 unless the newest counted day is the anchor or the
///   day before it
pub fn consecutive_day_streak(checkins: &[WellnessCheckIn], anchor: NaiveDate) -> u32 {
    let mut days: Vec<NaiveDate> = checkins
        .iter()
        .filter_map(|checkin| checkin.day)
        .filter(|day| *day <= anchor)
        .collect();
    days.sort_unstable();
    days.dedup();
    days.reverse();

    let newest = match days.first() {
        Some(day) => *day,
        None => return 0,
    };
    if anchor.signed_duration_since(newest).num_days() > 1 {
        return 0;
    }

    let mut streak = 1u32;
    for pair in days.windows(2) {
        if pair[0].signed_duration_since(pair[1]).num_days() == 1 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

/// Keep only the `cap` newest check-ins by day, newest first.
///
/// Check-ins without a day sort last, so they are the first to fall off.
pub fn clip_history(mut checkins: Vec<WellnessCheckIn>, cap: usize) -> Vec<WellnessCheckIn> {
    checkins.sort_by(|a, b| b.day.cmp(&a.day));
    checkins.truncate(cap);
    checkins
}
