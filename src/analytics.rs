//! Cohort-level orchestration: one stateless analytics pass over a
//! snapshot of students, results and simulations. Each aggregate is
//! fault-isolated so a failing sub-analysis degrades to its empty default
//! instead of taking the whole pass down.

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;
use uuid::Uuid;

use crate::config::AnalyticsConfig;
use crate::domain::{self, Ranking};
use crate::models::{
    Cohort, ExamResult, Priority, Recommendation, RiskLevel, Simulation, Student, TrendDirection,
    BASE_ELO,
};
use crate::patterns::{PatternDetector, PatternReport};
use crate::stats::{self, BasicStats, Outliers, Percentile};
use crate::topics::{TopicAnalysis, TopicAnalyzer};

/// Slope beyond which a score-per-exam trend counts as moving.
const TREND_SLOPE_THRESHOLD: f64 = 0.1;

/// Results required before a student's trend is classified.
const MIN_RESULTS_FOR_TREND: usize = 3;

/// Recommendations kept per student after priority sorting.
const MAX_RECOMMENDATIONS: usize = 5;

/// Decay applied to most-recent-first scores in the weighted average.
const WEIGHTED_AVERAGE_DECAY: f64 = 0.1;

/// Window of the rolling average behind `recent_form`.
const RECENT_FORM_WINDOW: usize = 3;

#[derive(Debug, Clone, Default, Serialize)]
pub struct GlobalStats {
    pub results_count: usize,
    pub unique_submitters: usize,
    pub participation_rate: f64,
    /// Mean score minus the historical cutoff; negative means below it.
    pub cutoff_distance: f64,
    pub scores: BasicStats,
    pub percentiles: Vec<Percentile>,
    pub score_outliers: Outliers,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RiskBucket {
    pub count: usize,
    pub percentage: u8,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RiskDistribution {
    pub total: usize,
    pub critical: RiskBucket,
    pub high: RiskBucket,
    pub medium: RiskBucket,
    pub low: RiskBucket,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GlobalPatterns {
    pub students_analyzed: usize,
    pub fatigue_pct: f64,
    pub rushing_pct: f64,
    pub abandonment_pct: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AggregatedPredictions {
    pub active_students: usize,
    /// probability >= 50
    pub projected_pass: usize,
    /// probability < 50
    pub at_risk: usize,
    /// probability in 45..=55
    pub borderline: usize,
    /// probability > 70
    pub high_confidence: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentTrendRow {
    pub student_id: Uuid,
    pub full_name: String,
    pub cohort: Cohort,
    pub slope: f64,
    pub direction: TrendDirection,
    pub consistency: f64,
    /// OLS fit evaluated at the next exam index.
    pub projected_score: f64,
    pub elo_change: i32,
    pub results_count: usize,
}

/// Full per-student bundle; derived metrics live here, never on `Student`.
#[derive(Debug, Clone, Serialize)]
pub struct StudentAnalysis {
    pub student_id: Uuid,
    pub full_name: String,
    pub cohort: Cohort,
    pub simulations_taken: usize,
    pub average_score: f64,
    pub weighted_average: f64,
    pub consistency: f64,
    pub z_score: f64,
    pub percentile: u8,
    pub probability_pass: u8,
    pub trend_slope: f64,
    pub trend_direction: TrendDirection,
    /// Rolling three-exam average at the latest sitting.
    pub recent_form: f64,
    /// Next-score projection from the recency-weighted blend.
    pub projected_next_score: f64,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub national: Ranking,
    pub patterns: PatternReport,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CohortAnalytics {
    pub global: GlobalStats,
    pub risk: RiskDistribution,
    pub patterns: GlobalPatterns,
    pub predictions: AggregatedPredictions,
    pub trends: Vec<StudentTrendRow>,
    pub topics: TopicAnalysis,
}

pub struct AnalyticsEngine {
    cfg: AnalyticsConfig,
}

impl AnalyticsEngine {
    pub fn new(cfg: AnalyticsConfig) -> Self {
        Self { cfg }
    }

    /// The full pass. Pure given its inputs: the same snapshot always
    /// produces identical output.
    pub fn run(
        &self,
        students: &[Student],
        results: &[ExamResult],
        simulations: &[Simulation],
    ) -> CohortAnalytics {
        CohortAnalytics {
            global: isolated("global statistics", || {
                self.global_statistics(results, students.len())
            }),
            risk: isolated("risk distribution", || self.risk_distribution(students)),
            patterns: isolated("global patterns", || self.global_patterns(results)),
            predictions: isolated("predictions", || self.aggregated_predictions(students)),
            trends: isolated("student trends", || self.student_trends(students, results)),
            topics: isolated("topic insights", || {
                self.topic_analysis(results, students, simulations)
            }),
        }
    }

    pub fn global_statistics(&self, results: &[ExamResult], roster_size: usize) -> GlobalStats {
        let scores: Vec<f64> = results.iter().map(|r| r.score).collect();
        let submitters: HashSet<Uuid> = results.iter().map(|r| r.user_id).collect();
        let score_stats = stats::basic_stats(&scores);

        GlobalStats {
            results_count: results.len(),
            unique_submitters: submitters.len(),
            participation_rate: if roster_size == 0 {
                0.0
            } else {
                submitters.len() as f64 / roster_size as f64
            },
            cutoff_distance: score_stats.mean - self.cfg.domain.historical_cutoff,
            scores: score_stats,
            percentiles: stats::percentiles(&scores, &stats::DEFAULT_PERCENTILES),
            score_outliers: stats::detect_outliers(&scores),
        }
    }

    /// Percentages are truncated, then the remainder up to 100 is assigned
    /// to the largest bucket, so they always sum to exactly 100.
    pub fn risk_distribution(&self, students: &[Student]) -> RiskDistribution {
        let mut counts = [0usize; 4];
        for student in students {
            let idx = match RiskLevel::from_probability(student.probability_pass) {
                RiskLevel::Critical => 0,
                RiskLevel::High => 1,
                RiskLevel::Medium => 2,
                RiskLevel::Low => 3,
            };
            counts[idx] += 1;
        }
        let total: usize = counts.iter().sum();
        let mut percentages = [0u8; 4];
        if total > 0 {
            for (i, count) in counts.iter().enumerate() {
                percentages[i] = (count * 100 / total) as u8;
            }
            let assigned: u8 = percentages.iter().sum();
            // ties resolve toward the critical end
            let mut largest = 0;
            for i in 1..4 {
                if counts[i] > counts[largest] {
                    largest = i;
                }
            }
            percentages[largest] += 100 - assigned;
        }

        let bucket = |i: usize| RiskBucket {
            count: counts[i],
            percentage: percentages[i],
        };
        RiskDistribution {
            total,
            critical: bucket(0),
            high: bucket(1),
            medium: bucket(2),
            low: bucket(3),
        }
    }

    pub fn global_patterns(&self, results: &[ExamResult]) -> GlobalPatterns {
        let detector = PatternDetector::new(&self.cfg.patterns);
        let mut by_student: HashMap<Uuid, Vec<ExamResult>> = HashMap::new();
        for result in results {
            by_student.entry(result.user_id).or_default().push(result.clone());
        }

        let mut analyzed = 0usize;
        let mut fatigue = 0usize;
        let mut rushing = 0usize;
        let mut abandonment = 0usize;
        for history in by_student.values() {
            if history.len() < 2 {
                continue;
            }
            let report = detector.analyze(history);
            analyzed += 1;
            if report.fatigue.detected {
                fatigue += 1;
            }
            if report.rushing.detected {
                rushing += 1;
            }
            if report.abandonment.detected {
                abandonment += 1;
            }
        }

        let pct = |count: usize| {
            if analyzed == 0 {
                0.0
            } else {
                count as f64 / analyzed as f64 * 100.0
            }
        };
        GlobalPatterns {
            students_analyzed: analyzed,
            fatigue_pct: pct(fatigue),
            rushing_pct: pct(rushing),
            abandonment_pct: pct(abandonment),
        }
    }

    pub fn aggregated_predictions(&self, students: &[Student]) -> AggregatedPredictions {
        let mut predictions = AggregatedPredictions::default();
        for student in students.iter().filter(|s| s.active) {
            predictions.active_students += 1;
            let p = student.probability_pass;
            if p >= 50 {
                predictions.projected_pass += 1;
            } else {
                predictions.at_risk += 1;
            }
            if (45..=55).contains(&p) {
                predictions.borderline += 1;
            }
            if p > 70 {
                predictions.high_confidence += 1;
            }
        }
        predictions
    }

    /// Per-student score-vs-index OLS for everyone with enough results,
    /// ranked by absolute slope.
    pub fn student_trends(
        &self,
        students: &[Student],
        results: &[ExamResult],
    ) -> Vec<StudentTrendRow> {
        let mut by_student: HashMap<Uuid, Vec<&ExamResult>> = HashMap::new();
        for result in results {
            by_student.entry(result.user_id).or_default().push(result);
        }

        let mut rows = Vec::new();
        for student in students {
            let Some(own) = by_student.get_mut(&student.id) else {
                continue;
            };
            if own.len() < MIN_RESULTS_FOR_TREND {
                continue;
            }
            own.sort_by_key(|r| r.submitted_at);
            let scores: Vec<f64> = own.iter().map(|r| r.score).collect();
            let x: Vec<f64> = (0..scores.len()).map(|i| i as f64).collect();
            let slope = stats::linear_regression(&x, &scores).slope;

            let mut recent_first = scores.clone();
            recent_first.reverse();
            rows.push(StudentTrendRow {
                student_id: student.id,
                full_name: student.full_name.clone(),
                cohort: student.cohort,
                slope,
                direction: direction_from_slope(slope),
                consistency: stats::consistency(&recent_first, stats::CONSISTENCY_WINDOW),
                projected_score: stats::project_next_value(&scores, stats::Projection::Linear),
                elo_change: student.current_elo - BASE_ELO,
                results_count: scores.len(),
            });
        }
        rows.sort_by(|a, b| {
            b.slope
                .abs()
                .partial_cmp(&a.slope.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.student_id.cmp(&b.student_id))
        });
        rows
    }

    /// Full bundle for one student, with percentile and z-score taken
    /// against the whole population's scores.
    pub fn analyze_student(
        &self,
        student: &Student,
        own_results: &[ExamResult],
        all_scores: &[f64],
    ) -> StudentAnalysis {
        let mut chronological = own_results.to_vec();
        chronological.sort_by_key(|r| r.submitted_at);
        let scores: Vec<f64> = chronological.iter().map(|r| r.score).collect();
        let mut recent_first = scores.clone();
        recent_first.reverse();

        let average_score = stats::basic_stats(&scores).mean;
        let weighted_average = stats::weighted_average(&recent_first, WEIGHTED_AVERAGE_DECAY);
        let consistency = stats::consistency(&recent_first, stats::CONSISTENCY_WINDOW);
        let recent_form = stats::moving_average(&scores, RECENT_FORM_WINDOW)
            .last()
            .copied()
            .unwrap_or(0.0);
        let x: Vec<f64> = (0..scores.len()).map(|i| i as f64).collect();
        let trend_slope = stats::linear_regression(&x, &scores).slope;

        let population = stats::basic_stats(all_scores);
        let probability_pass = domain::pass_probability(
            &self.cfg.domain,
            average_score,
            consistency,
            trend_slope,
            scores.len(),
        );

        let detector = PatternDetector::new(&self.cfg.patterns);
        let patterns = detector.analyze(&chronological);

        let (risk_score, risk_level) =
            self.score_risk(average_score, scores.len(), consistency, trend_slope, probability_pass);
        let recommendations = self.student_recommendations(&patterns, probability_pass, consistency, trend_slope);

        StudentAnalysis {
            student_id: student.id,
            full_name: student.full_name.clone(),
            cohort: student.cohort,
            simulations_taken: scores.len(),
            average_score,
            weighted_average,
            consistency,
            z_score: stats::z_score(average_score, population.mean, population.std_dev),
            percentile: stats::percentile_rank(average_score, all_scores),
            probability_pass,
            trend_slope,
            trend_direction: direction_from_slope(trend_slope),
            recent_form,
            projected_next_score: stats::project_next_value(&scores, stats::Projection::Weighted),
            risk_score,
            risk_level,
            national: domain::national_ranking(
                &self.cfg.domain,
                average_score,
                self.cfg.domain.total_candidates,
            ),
            patterns,
            recommendations,
        }
    }

    pub fn topic_analysis(
        &self,
        results: &[ExamResult],
        students: &[Student],
        simulations: &[Simulation],
    ) -> TopicAnalysis {
        TopicAnalyzer::new(&self.cfg.topics, &self.cfg.domain.topic_weights)
            .analyze(results, students, simulations)
    }

    /// Weighted-factor risk scoring: each triggered factor adds its fixed
    /// penalty, and the sum is tiered.
    fn score_risk(
        &self,
        average_score: f64,
        results_count: usize,
        consistency: f64,
        trend_slope: f64,
        probability_pass: u8,
    ) -> (u32, RiskLevel) {
        let r = &self.cfg.risk;
        let mut score = 0u32;
        if average_score < r.low_score_threshold {
            score += r.low_score_penalty;
        }
        if results_count < r.min_participation {
            score += r.participation_penalty;
        }
        if consistency > r.variance_threshold {
            score += r.variance_penalty;
        }
        if trend_slope < r.negative_slope {
            score += r.negative_trend_penalty;
        }
        if probability_pass < r.low_probability {
            score += r.low_probability_penalty;
        }

        let level = if score >= r.critical_score {
            RiskLevel::Critical
        } else if score >= r.high_score {
            RiskLevel::High
        } else if score >= r.medium_score {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };
        (score, level)
    }

    fn student_recommendations(
        &self,
        patterns: &PatternReport,
        probability_pass: u8,
        consistency: f64,
        trend_slope: f64,
    ) -> Vec<Recommendation> {
        let mut recommendations = patterns.recommendations.clone();
        if probability_pass < 50 {
            recommendations.push(Recommendation {
                priority: Priority::High,
                area: "probability".to_string(),
                message: format!(
                    "Pass probability sits at {probability_pass}%; raise simulation frequency and review every failed exam."
                ),
            });
        }
        if trend_slope < self.cfg.domain.declining_slope {
            recommendations.push(Recommendation {
                priority: Priority::High,
                area: "trend".to_string(),
                message: "Scores are declining across recent exams; revisit the study plan this week.".to_string(),
            });
        }
        if consistency > self.cfg.domain.loose_consistency {
            recommendations.push(Recommendation {
                priority: Priority::Medium,
                area: "consistency".to_string(),
                message: "Exam-to-exam variation is wide; keep conditions constant across attempts.".to_string(),
            });
        }
        recommendations.sort_by_key(|r| r.priority);
        recommendations.truncate(MAX_RECOMMENDATIONS);
        recommendations
    }
}

fn direction_from_slope(slope: f64) -> TrendDirection {
    if slope > TREND_SLOPE_THRESHOLD {
        TrendDirection::Up
    } else if slope < -TREND_SLOPE_THRESHOLD {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    }
}

/// Runs one aggregate computation, swallowing a panic into the default
/// value so the remaining aggregates still complete.
fn isolated<T: Default>(label: &str, compute: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(compute)) {
        Ok(value) => value,
        Err(_) => {
            eprintln!("warning: {label} failed; falling back to empty defaults");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn engine() -> AnalyticsEngine {
        AnalyticsEngine::new(AnalyticsConfig::default())
    }

    fn student(n: u128, probability: u8) -> Student {
        Student {
            id: Uuid::from_u128(n),
            full_name: format!("Student {n}"),
            email: format!("s{n}@academy.example"),
            cohort: Cohort::TwentyHours,
            active: true,
            current_elo: 1000 + n as i32,
            average_score: 0.0,
            probability_pass: probability,
            trend_direction: TrendDirection::Neutral,
        }
    }

    fn result(user: u128, index: i64, score: f64) -> ExamResult {
        ExamResult {
            user_id: Uuid::from_u128(user),
            simulation_id: Uuid::from_u128(1000 + index as u128),
            submitted_at: Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap()
                + Duration::days(7 * index),
            score,
            correct_answers: 70,
            wrong_answers: 20,
            blank_answers: 10,
            time_taken_seconds: 5400,
            is_saturday_live: true,
            stress_level: None,
            confidence_score: None,
            weakest_topics: Vec::new(),
        }
    }

    fn simulation(index: i64) -> Simulation {
        Simulation {
            id: Uuid::from_u128(1000 + index as u128),
            week_number: index as i32,
            status: "completed".to_string(),
            start_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
        }
    }

    #[test]
    fn risk_distribution_buckets_one_per_tier() {
        let students = vec![
            student(1, 20),
            student(2, 45),
            student(3, 60),
            student(4, 85),
        ];
        let dist = engine().risk_distribution(&students);
        assert_eq!(dist.total, 4);
        assert_eq!(dist.critical.count, 1);
        assert_eq!(dist.high.count, 1);
        assert_eq!(dist.medium.count, 1);
        assert_eq!(dist.low.count, 1);
        assert_eq!(dist.critical.percentage, 25);
        assert_eq!(dist.high.percentage, 25);
        assert_eq!(dist.medium.percentage, 25);
        assert_eq!(dist.low.percentage, 25);
    }

    #[test]
    fn risk_percentages_always_sum_to_hundred() {
        let students = vec![student(1, 20), student(2, 25), student(3, 85)];
        let dist = engine().risk_distribution(&students);
        let sum = dist.critical.percentage
            + dist.high.percentage
            + dist.medium.percentage
            + dist.low.percentage;
        assert_eq!(sum, 100);
        // remainder lands on the largest bucket
        assert_eq!(dist.critical.percentage, 67);
        assert_eq!(dist.low.percentage, 33);
    }

    #[test]
    fn empty_roster_keeps_percentages_at_zero() {
        let dist = engine().risk_distribution(&[]);
        assert_eq!(dist.total, 0);
        assert_eq!(dist.critical.percentage, 0);
    }

    #[test]
    fn student_trends_classify_up_down_stable() {
        let students = vec![student(1, 60), student(2, 60), student(3, 60)];
        let mut results = Vec::new();
        for (i, score) in [7.0, 7.5, 8.0].iter().enumerate() {
            results.push(result(1, i as i64, *score));
        }
        for (i, score) in [5.0, 4.0, 3.0].iter().enumerate() {
            results.push(result(2, i as i64, *score));
        }
        for (i, score) in [6.0, 6.0, 6.0].iter().enumerate() {
            results.push(result(3, i as i64, *score));
        }

        let rows = engine().student_trends(&students, &results);
        assert_eq!(rows.len(), 3);
        let direction_of = |n: u128| {
            rows.iter()
                .find(|r| r.student_id == Uuid::from_u128(n))
                .unwrap()
                .direction
        };
        assert_eq!(direction_of(1), TrendDirection::Up);
        assert_eq!(direction_of(2), TrendDirection::Down);
        assert_eq!(direction_of(3), TrendDirection::Stable);
        // ranked by |slope|: the declining student moves fastest
        assert_eq!(rows[0].student_id, Uuid::from_u128(2));
        assert_eq!(rows[0].elo_change, 2);
    }

    #[test]
    fn trends_skip_students_with_short_history() {
        let students = vec![student(1, 60)];
        let results = vec![result(1, 0, 6.0), result(1, 1, 7.0)];
        assert!(engine().student_trends(&students, &results).is_empty());
    }

    #[test]
    fn predictions_count_active_students_only() {
        let mut students = vec![
            student(1, 80),
            student(2, 52),
            student(3, 45),
            student(4, 30),
        ];
        students[3].active = false;
        let predictions = engine().aggregated_predictions(&students);
        assert_eq!(predictions.active_students, 3);
        assert_eq!(predictions.projected_pass, 2);
        assert_eq!(predictions.at_risk, 1);
        assert_eq!(predictions.borderline, 2); // 52 and 45
        assert_eq!(predictions.high_confidence, 1);
    }

    #[test]
    fn global_statistics_track_participation_and_cutoff() {
        let results = vec![
            result(1, 0, 8.0),
            result(1, 1, 8.0),
            result(2, 0, 6.0),
        ];
        let global = engine().global_statistics(&results, 4);
        assert_eq!(global.results_count, 3);
        assert_eq!(global.unique_submitters, 2);
        assert!((global.participation_rate - 0.5).abs() < 1e-9);
        let expected_mean = (8.0 + 8.0 + 6.0) / 3.0;
        assert!((global.cutoff_distance - (expected_mean - 7.72)).abs() < 1e-9);
        assert_eq!(global.percentiles.len(), 5);
    }

    #[test]
    fn analyze_student_produces_consistent_bundle() {
        let target = student(1, 0);
        let own: Vec<ExamResult> = (0..5).map(|i| result(1, i, 6.0 + 0.3 * i as f64)).collect();
        let all_scores: Vec<f64> = vec![4.0, 5.0, 6.0, 6.5, 7.0, 7.5, 8.0];
        let analysis = engine().analyze_student(&target, &own, &all_scores);

        assert_eq!(analysis.simulations_taken, 5);
        assert!((analysis.average_score - 6.6).abs() < 1e-9);
        // recent-first decay weighting pulls the average toward the last scores
        assert!(analysis.weighted_average > analysis.average_score);
        assert_eq!(analysis.trend_direction, TrendDirection::Up);
        assert!(analysis.probability_pass > 50);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
        assert!(analysis.national.position >= 1);
        assert!(analysis.recommendations.len() <= 5);
    }

    #[test]
    fn analyze_student_flags_struggling_profile() {
        let target = student(2, 0);
        let swings = [6.5, 2.0, 5.5, 1.5];
        let own: Vec<ExamResult> = swings
            .iter()
            .enumerate()
            .map(|(i, score)| result(2, i as i64, *score))
            .collect();
        let all_scores: Vec<f64> = vec![4.0, 5.0, 6.0, 6.5, 7.0, 7.5, 8.0];
        let analysis = engine().analyze_student(&target, &own, &all_scores);

        assert_eq!(analysis.trend_direction, TrendDirection::Down);
        assert!(analysis.probability_pass < 50);
        // low average + negative trend + low probability + high variance
        assert!(analysis.risk_score >= 70);
        assert_eq!(analysis.risk_level, RiskLevel::Critical);
        assert_eq!(analysis.recommendations[0].priority, Priority::High);
    }

    #[test]
    fn full_pass_is_idempotent() {
        let students = vec![student(1, 60), student(2, 40), student(3, 80)];
        let mut results = Vec::new();
        for i in 0..4 {
            results.push(result(1, i, 6.0 + 0.2 * i as f64));
            results.push(result(2, i, 5.0 - 0.1 * i as f64));
            results.push(result(3, i, 8.0));
        }
        let simulations: Vec<Simulation> = (0..4).map(simulation).collect();

        let engine = engine();
        let first = engine.run(&students, &results, &simulations);
        let second = engine.run(&students, &results, &simulations);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn isolated_swallows_panics_into_defaults() {
        let value: RiskDistribution = isolated("test aggregate", || panic!("boom"));
        assert_eq!(value.total, 0);
        let fine: usize = isolated("test aggregate", || 7);
        assert_eq!(fine, 7);
    }
}
