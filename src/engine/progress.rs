//! Cross-lane progress aggregation.
//!
//! Combines goals, curriculum step completions, and achievements into one
//! summary: a percentage per lane, an overall score, the twelve-row table
//! linking curriculum steps to personal goals, and the most recent
//! achievements. Every function here is pure; the engine calls
//! [`cross_lane_progress`] on each delivery.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::records::{Achievement, Goal, GoalCategory, StepProgress};
use crate::model::{classify_achievement, time, Lane};

/// Number of curriculum steps.
pub const TOTAL_STEPS: u32 = 12;

/// Community milestone tiers counted toward the community percentage.
pub const COMMUNITY_MILESTONE_TIERS: u32 = 5;

/// Maximum entries in the recent achievements list.
pub const RECENT_ACHIEVEMENTS_LIMIT: usize = 10;

/// Lane weighting for the overall score.
///
/// Each lane contributes an equal third. The overall score is computed
/// from the already-rounded lane percentages, so it can differ by a point
/// from an average of the raw ratios.
pub mod weights {
    /// Weight of the life-tools lane.
    pub const LIFE_TOOLS: f64 = 1.0 / 3.0;
    /// Weight of the curriculum lane.
    pub const CURRICULUM: f64 = 1.0 / 3.0;
    /// Weight of the community lane.
    pub const COMMUNITY: f64 = 1.0 / 3.0;
}

/// Progress within a single lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneProgress {
    /// Which lane this summarizes.
    pub lane: Lane,
    /// Rounded completion percentage, 0..=100.
    pub percentage: u32,
    /// Items counted as completed.
    pub completed_items: u32,
    /// Denominator the percentage was computed against.
    pub total_items: u32,
}

impl LaneProgress {
    fn empty(lane: Lane) -> Self {
        Self {
            lane,
            percentage: 0,
            completed_items: 0,
            total_items: 0,
        }
    }
}

/// One row of the step-to-goal link table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLink {
    /// Curriculum step number, 1..=12.
    pub step: u32,
    /// Whether any completed step record resolves to this step.
    pub completed: bool,
    /// Id of the personal goal linked to this step, if one matched.
    pub goal_id: Option<String>,
    /// Progress of the linked goal, 0 when unlinked.
    pub goal_progress: u32,
}

impl StepLink {
    fn unlinked(step: u32) -> Self {
        Self {
            step,
            completed: false,
            goal_id: None,
            goal_progress: 0,
        }
    }
}

/// A recently earned achievement, classified into its lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentAchievement {
    /// Achievement identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Lane the achievement belongs to.
    pub lane: Lane,
    /// When it was earned, if known.
    pub earned_at: Option<DateTime<Utc>>,
}

/// The full cross-lane progress summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossLaneProgress {
    /// Equal-weighted overall score, 0..=100.
    pub overall: u32,
    /// Life-tools goal progress.
    pub life_tools: LaneProgress,
    /// Curriculum step progress.
    pub curriculum: LaneProgress,
    /// Community milestone progress.
    pub community: LaneProgress,
    /// Most recent achievements, newest first, at most
    /// [`RECENT_ACHIEVEMENTS_LIMIT`].
    pub recent_achievements: Vec<RecentAchievement>,
    /// Step-to-goal link table, always exactly [`TOTAL_STEPS`] rows.
    pub step_links: Vec<StepLink>,
}

impl Default for CrossLaneProgress {
    fn default() -> Self {
        Self {
            overall: 0,
            life_tools: LaneProgress::empty(Lane::LifeTools),
            curriculum: LaneProgress {
                lane: Lane::Curriculum,
                percentage: 0,
                completed_items: 0,
                total_items: TOTAL_STEPS,
            },
            community: LaneProgress {
                lane: Lane::Community,
                percentage: 0,
                completed_items: 0,
                total_items: COMMUNITY_MILESTONE_TIERS,
            },
            recent_achievements: Vec::new(),
            step_links: (1..=TOTAL_STEPS).map(StepLink::unlinked).collect(),
        }
    }
}

/// Rounded completion percentage; 0 when the denominator is 0.
pub fn percent(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}

/// Life-tools progress: completed goals over all goals.
pub fn life_tools_progress(goals: &[Goal]) -> LaneProgress {
    let total = goals.len() as u32;
    let completed = goals.iter().filter(|goal| goal.is_completed()).count() as u32;
    LaneProgress {
        lane: Lane::LifeTools,
        percentage: percent(completed, total),
        completed_items: completed,
        total_items: total,
    }
}

/// Curriculum progress: distinct completed course ids over the step count,
/// stretched when the user has advanced past step 12.
pub fn curriculum_progress(steps: &[StepProgress], current_step: u32) -> LaneProgress {
    let completed_courses: HashSet<&str> = steps
        .iter()
        .filter(|step| step.is_completed())
        .map(|step| step.course_id.as_str())
        .collect();
    let completed = completed_courses.len() as u32;
    let total = TOTAL_STEPS.max(current_step);
    LaneProgress {
        lane: Lane::Curriculum,
        percentage: percent(completed, total),
        completed_items: completed,
        total_items: total,
    }
}

/// Community progress: community achievements against a fixed tier ladder.
pub fn community_progress(achievements: &[Achievement]) -> LaneProgress {
    let earned = achievements
        .iter()
        .filter(|a| classify_achievement(&a.kind) == Lane::Community)
        .count() as u32;
    let completed = earned.min(COMMUNITY_MILESTONE_TIERS);
    LaneProgress {
        lane: Lane::Community,
        percentage: percent(completed, COMMUNITY_MILESTONE_TIERS),
        completed_items: completed,
        total_items: COMMUNITY_MILESTONE_TIERS,
    }
}

/// Overall score from the three rounded lane percentages.
pub fn overall_score(life_tools: u32, curriculum: u32, community: u32) -> u32 {
    (life_tools as f64 * weights::LIFE_TOOLS
        + curriculum as f64 * weights::CURRICULUM
        + community as f64 * weights::COMMUNITY)
        .round() as u32
}

/// Build the twelve-row table linking curriculum steps to personal goals.
///
/// A step is completed when any completed step record resolves to its
/// number. A step links to the first personal goal whose lowercased title
/// contains `"step {n}"`. The substring match means a goal titled
/// "Step 12 inventory" also satisfies step 1.
pub fn link_steps_to_goals(steps: &[StepProgress], goals: &[Goal]) -> Vec<StepLink> {
    (1..=TOTAL_STEPS)
        .map(|step| {
            let completed = steps
                .iter()
                .any(|s| s.is_completed() && s.step_number() == Some(step));
            let needle = format!("step {}", step);
            let goal = goals.iter().find(|g| {
                g.category == GoalCategory::Personal && g.title.to_lowercase().contains(&needle)
            });
            StepLink {
                step,
                completed,
                goal_id: goal.map(|g| g.id.clone()),
                goal_progress: goal.map(|g| g.progress).unwrap_or(0),
            }
        })
        .collect()
}

/// The newest achievements, classified into lanes.
///
/// Sorted newest first; achievements without an earned time sort oldest.
/// Ties keep their input order.
pub fn recent_achievements(achievements: &[Achievement]) -> Vec<RecentAchievement> {
    let mut sorted: Vec<&Achievement> = achievements.iter().collect();
    sorted.sort_by(|a, b| time::sort_key(b.earned_at).cmp(&time::sort_key(a.earned_at)));
    sorted.truncate(RECENT_ACHIEVEMENTS_LIMIT);
    sorted
        .into_iter()
        .map(|a| RecentAchievement {
            id: a.id.clone(),
            title: a.title.clone(),
            lane: classify_achievement(&a.kind),
            earned_at: a.earned_at,
        })
        .collect()
}

/// Aggregate everything into the cross-lane summary.
pub fn cross_lane_progress(
    goals: &[Goal],
    steps: &[StepProgress],
    achievements: &[Achievement],
    current_step: u32,
) -> CrossLaneProgress {
    let life_tools = life_tools_progress(goals);
    let curriculum = curriculum_progress(steps, current_step);
    let community = community_progress(achievements);
    let overall = overall_score(
        life_tools.percentage,
        curriculum.percentage,
        community.percentage,
    );
    CrossLaneProgress {
        overall,
        recent_achievements: recent_achievements(achievements),
        step_links: link_steps_to_goals(steps, goals),
        life_tools,
        curriculum,
        community,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::records::{AchievementKind, GoalStatus, StepStatus};
    use chrono::TimeZone;

    fn completed_goal(id: &str) -> Goal {
        Goal::new(id, "u1", format!("goal {}", id)).with_status(GoalStatus::Completed)
    }

    fn active_goal(id: &str) -> Goal {
        Goal::new(id, "u1", format!("goal {}", id))
    }

    fn completed_step(id: &str, course: &str) -> StepProgress {
        StepProgress::new(id, "u1", course)
            .with_completed_at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
    }

    fn achievement(id: &str, kind: AchievementKind) -> Achievement {
        Achievement::new(id, "u1", kind, format!("achievement {}", id))
    }

    // percent

    #[test]
    fn test_percent_zero_total() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(5, 0), 0);
    }

    #[test]
    fn test_percent_rounds() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(12, 12), 100);
    }

    // Lane calculations

    #[test]
    fn test_life_tools_empty() {
        let lane = life_tools_progress(&[]);
        assert_eq!(lane.lane, Lane::LifeTools);
        assert_eq!(lane.percentage, 0);
        assert_eq!(lane.total_items, 0);
    }

    #[test]
    fn test_life_tools_counts_completed() {
        let goals = vec![
            completed_goal("g1"),
            active_goal("g2"),
            active_goal("g3"),
            active_goal("g4"),
        ];
        let lane = life_tools_progress(&goals);
        assert_eq!(lane.percentage, 25);
        assert_eq!(lane.completed_items, 1);
        assert_eq!(lane.total_items, 4);
    }

    #[test]
    fn test_curriculum_distinct_courses() {
        let steps = vec![
            completed_step("s1", "step-1"),
            completed_step("s2", "step-1"),
            completed_step("s3", "step-2"),
        ];
        let lane = curriculum_progress(&steps, 1);
        assert_eq!(lane.completed_items, 2);
        assert_eq!(lane.total_items, 12);
        assert_eq!(lane.percentage, 17);
    }

    #[test]
    fn test_curriculum_ignores_incomplete() {
        let steps = vec![StepProgress::new("s1", "u1", "step-1").with_status(StepStatus::InProgress)];
        assert_eq!(curriculum_progress(&steps, 1).completed_items, 0);
    }

    #[test]
    fn test_curriculum_denominator_stretches() {
        let steps: Vec<StepProgress> = (1..=12)
            .map(|n| completed_step(&format!("s{}", n), &format!("step-{}", n)))
            .collect();

        assert_eq!(curriculum_progress(&steps, 12).percentage, 100);

        let lane = curriculum_progress(&steps, 15);
        assert_eq!(lane.total_items, 15);
        assert_eq!(lane.percentage, 80);
    }

    #[test]
    fn test_community_tier_ladder() {
        let kinds = |n: usize| -> Vec<Achievement> {
            (0..n)
                .map(|i| achievement(&format!("a{}", i), AchievementKind::Community))
                .collect()
        };

        assert_eq!(community_progress(&kinds(0)).percentage, 0);
        assert_eq!(community_progress(&kinds(3)).percentage, 60);
        assert_eq!(community_progress(&kinds(5)).percentage, 100);

        // Past the last tier the percentage stays pinned.
        let lane = community_progress(&kinds(9));
        assert_eq!(lane.percentage, 100);
        assert_eq!(lane.completed_items, 5);
    }

    #[test]
    fn test_community_ignores_other_lanes() {
        let achievements = vec![
            achievement("a1", AchievementKind::SobrietyMilestone),
            achievement("a2", AchievementKind::StepCompletion),
        ];
        assert_eq!(community_progress(&achievements).completed_items, 0);
    }

    // Overall

    #[test]
    fn test_overall_score_rounds_lane_thirds() {
        assert_eq!(overall_score(25, 17, 40), 27);
        assert_eq!(overall_score(0, 0, 0), 0);
        assert_eq!(overall_score(100, 100, 100), 100);
        assert_eq!(overall_score(100, 0, 0), 33);
    }

    // Step links

    #[test]
    fn test_step_links_always_twelve_rows() {
        let links = link_steps_to_goals(&[], &[]);
        assert_eq!(links.len(), 12);
        assert_eq!(links[0].step, 1);
        assert_eq!(links[11].step, 12);
        assert!(links.iter().all(|l| !l.completed && l.goal_id.is_none()));
    }

    #[test]
    fn test_step_link_completion_from_course_id() {
        let steps = vec![completed_step("s1", "step-4")];
        let links = link_steps_to_goals(&steps, &[]);
        assert!(links[3].completed);
        assert!(!links[0].completed);
    }

    #[test]
    fn test_step_link_matches_personal_goal_by_title() {
        let goals = vec![
            Goal::new("g1", "u1", "Finish Step 4 inventory")
                .with_category(GoalCategory::Personal)
                .with_progress(60),
        ];
        let links = link_steps_to_goals(&[], &goals);
        assert_eq!(links[3].goal_id.as_deref(), Some("g1"));
        assert_eq!(links[3].goal_progress, 60);
        assert_eq!(links[0].goal_id, None);
    }

    #[test]
    fn test_step_link_ignores_non_personal_goals() {
        let goals = vec![
            Goal::new("g1", "u1", "Step 4 housing paperwork").with_category(GoalCategory::Housing),
        ];
        let links = link_steps_to_goals(&[], &goals);
        assert_eq!(links[3].goal_id, None);
    }

    #[test]
    fn test_step_link_first_match_wins() {
        let goals = vec![
            Goal::new("g1", "u1", "step 3 amends list").with_category(GoalCategory::Personal),
            Goal::new("g2", "u1", "Another step 3 goal").with_category(GoalCategory::Personal),
        ];
        let links = link_steps_to_goals(&[], &goals);
        assert_eq!(links[2].goal_id.as_deref(), Some("g1"));
    }

    #[test]
    fn test_step_link_substring_collision() {
        // "step 1" is a substring of "step 12", so the step 12 goal also
        // links to step 1.
        let goals =
            vec![Goal::new("g12", "u1", "Step 12 inventory").with_category(GoalCategory::Personal)];
        let links = link_steps_to_goals(&[], &goals);
        assert_eq!(links[0].goal_id.as_deref(), Some("g12"));
        assert_eq!(links[11].goal_id.as_deref(), Some("g12"));
        assert_eq!(links[1].goal_id, None);
    }

    // Recent achievements

    #[test]
    fn test_recent_achievements_newest_first_capped() {
        let achievements: Vec<Achievement> = (0..12)
            .map(|n| {
                achievement(&format!("a{}", n), AchievementKind::Streak).with_earned_at(
                    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
                        + chrono::Duration::hours(n),
                )
            })
            .collect();

        let recent = recent_achievements(&achievements);
        assert_eq!(recent.len(), RECENT_ACHIEVEMENTS_LIMIT);
        assert_eq!(recent[0].id, "a11");
        assert_eq!(recent[9].id, "a2");
        assert_eq!(recent[0].lane, Lane::Curriculum);
    }

    #[test]
    fn test_recent_achievements_missing_time_sorts_oldest() {
        let achievements = vec![
            achievement("undated", AchievementKind::Community),
            achievement("dated", AchievementKind::Community)
                .with_earned_at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
        ];
        let recent = recent_achievements(&achievements);
        assert_eq!(recent[0].id, "dated");
        assert_eq!(recent[1].id, "undated");
    }

    #[test]
    fn test_recent_achievements_ties_keep_input_order() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let achievements = vec![
            achievement("first", AchievementKind::Community).with_earned_at(at),
            achievement("second", AchievementKind::Community).with_earned_at(at),
        ];
        let recent = recent_achievements(&achievements);
        assert_eq!(recent[0].id, "first");
        assert_eq!(recent[1].id, "second");
    }

    // Full aggregation

    #[test]
    fn test_cross_lane_progress_scenario() {
        // 1 of 4 goals, 2 of 12 distinct courses, 2 of 5 community tiers:
        // lanes 25/17/40, overall round(82/3) = 27.
        let goals = vec![
            completed_goal("g1"),
            active_goal("g2"),
            active_goal("g3"),
            active_goal("g4"),
        ];
        let steps = vec![
            completed_step("s1", "step-1"),
            completed_step("s2", "step-2"),
        ];
        let achievements = vec![
            achievement("a1", AchievementKind::Community),
            achievement("a2", AchievementKind::Community),
        ];

        let progress = cross_lane_progress(&goals, &steps, &achievements, 1);

        assert_eq!(progress.life_tools.percentage, 25);
        assert_eq!(progress.curriculum.percentage, 17);
        assert_eq!(progress.community.percentage, 40);
        assert_eq!(progress.overall, 27);
        assert_eq!(progress.step_links.len(), 12);
        assert!(progress.step_links[0].completed);
        assert!(progress.step_links[1].completed);
        assert_eq!(progress.recent_achievements.len(), 2);
    }

    #[test]
    fn test_default_is_neutral() {
        let progress = CrossLaneProgress::default();
        assert_eq!(progress.overall, 0);
        assert_eq!(progress.step_links.len(), 12);
        assert!(progress.recent_achievements.is_empty());
        assert_eq!(progress.curriculum.total_items, 12);
        assert_eq!(progress.community.total_items, 5);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_overall_is_rounded_mean(a in 0u32..=100, b in 0u32..=100, c in 0u32..=100) {
                let expected = ((a + b + c) as f64 / 3.0).round() as u32;
                prop_assert_eq!(overall_score(a, b, c), expected);
                prop_assert!(overall_score(a, b, c) <= 100);
            }

            #[test]
            fn prop_percent_bounded(completed in 0u32..1000, total in 0u32..1000) {
                if completed <= total {
                    prop_assert!(percent(completed, total) <= 100);
                }
            }

            #[test]
            fn prop_link_table_is_always_twelve(count in 0usize..30) {
                let steps: Vec<StepProgress> = (0..count)
                    .map(|n| completed_step(&format!("s{}", n), &format!("step-{}", n % 14)))
                    .collect();
                prop_assert_eq!(link_steps_to_goals(&steps, &[]).len(), 12);
            }
        }
    }
}
