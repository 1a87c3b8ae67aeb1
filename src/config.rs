use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// All tunable thresholds of the analytics pass. Every value can be
/// overridden from a JSON file; absent fields keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub domain: DomainConfig,
    pub patterns: PatternConfig,
    pub topics: TopicConfig,
    pub risk: RiskConfig,
}

impl AnalyticsConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }
}

/// Calibration constants of the exam's scoring model.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Historical cutoff score needed to pass the real exam.
    pub historical_cutoff: f64,
    /// Negative-marking penalty applied per wrong answer.
    pub penalty_factor: f64,
    /// Mean of the assumed national score distribution.
    pub exam_mean: f64,
    /// Standard deviation of the assumed national score distribution.
    pub exam_std_dev: f64,
    /// Candidate pool size used for national ranking estimates.
    pub total_candidates: u32,
    /// Consistency (score std dev) below which a student counts as steady.
    pub steady_consistency: f64,
    /// Consistency below which a student still earns partial credit.
    pub loose_consistency: f64,
    /// Score-per-exam slope below which a trend counts as declining.
    pub declining_slope: f64,
    /// Relative weight of each topic group, summing to 1.0.
    pub topic_weights: HashMap<String, f64>,
}

impl Default for DomainConfig {
    fn default() -> Self {
        let mut topic_weights = HashMap::new();
        topic_weights.insert("juridicas".to_string(), 0.45);
        topic_weights.insert("sociales".to_string(), 0.30);
        topic_weights.insert("tecnico-cientificas".to_string(), 0.25);
        Self {
            historical_cutoff: 7.72,
            penalty_factor: 0.33,
            exam_mean: 6.5,
            exam_std_dev: 1.5,
            total_candidates: 25_000,
            steady_consistency: 1.5,
            loose_consistency: 2.5,
            declining_slope: -0.1,
            topic_weights,
        }
    }
}

/// Thresholds of the per-student behavioral pattern detectors.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Time-vs-error-rate correlation above which fatigue is flagged.
    pub fatigue_correlation: f64,
    /// Attempts faster than mean time times this factor count as rushed.
    pub rushing_time_factor: f64,
    /// Score points the normal group must beat the fast group by.
    pub rushing_score_gap: f64,
    /// Mean blank answers above which abandonment is high.
    pub abandonment_high: f64,
    /// Mean blank answers above which abandonment is critical.
    pub abandonment_critical: f64,
    /// Share of a student's exams a topic must appear in to be persistent.
    pub topic_persistent_pct: f64,
    /// Share above which a persistent topic is severe.
    pub topic_high_pct: f64,
    /// Mean signed confidence deviation marking miscalibration.
    pub confidence_deviation: f64,
    /// Stress-vs-score correlation below which stress hurts performance.
    pub stress_negative: f64,
    /// Stress-vs-score correlation above which stress helps performance.
    pub stress_positive: f64,
    /// Attempts under this many minutes are too fast.
    pub fast_minutes: f64,
    /// Attempts over this many minutes are too slow.
    pub slow_minutes: f64,
    /// Coefficient-of-variation bands for the consistency level.
    pub cv_excellent: f64,
    pub cv_good: f64,
    pub cv_moderate: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            fatigue_correlation: 0.3,
            rushing_time_factor: 0.8,
            rushing_score_gap: 0.5,
            abandonment_high: 15.0,
            abandonment_critical: 25.0,
            topic_persistent_pct: 30.0,
            topic_high_pct: 50.0,
            confidence_deviation: 0.5,
            stress_negative: -0.3,
            stress_positive: 0.2,
            fast_minutes: 85.0,
            slow_minutes: 105.0,
            cv_excellent: 15.0,
            cv_good: 25.0,
            cv_moderate: 35.0,
        }
    }
}

/// Thresholds of the cross-student weak-topic analysis.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Share of respondents above which a topic is critical for an exam.
    pub critical_pct: f64,
    /// Topics kept per simulation, ranked by frequency.
    pub top_per_simulation: usize,
    /// Second-half/first-half ratio above which a trend is increasing.
    pub trend_increase_ratio: f64,
    /// Second-half/first-half ratio below which a trend is decreasing.
    pub trend_decrease_ratio: f64,
    /// Exams a topic must appear in before its trend is classified.
    pub min_trend_points: usize,
    /// Both impact groups must be strictly larger than this.
    pub min_group_size: usize,
    /// Average share marking a topic as persistently problematic.
    pub persistent_avg_pct: f64,
    /// Exams a topic must span to count as persistent.
    pub persistent_min_exams: usize,
    /// Percentage-point spread between cohorts that counts as significant.
    pub cohort_gap_points: f64,
    /// Upper bound on generated insight records.
    pub max_insights: usize,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            critical_pct: 30.0,
            top_per_simulation: 5,
            trend_increase_ratio: 1.2,
            trend_decrease_ratio: 0.8,
            min_trend_points: 3,
            min_group_size: 5,
            persistent_avg_pct: 25.0,
            persistent_min_exams: 3,
            cohort_gap_points: 20.0,
            max_insights: 10,
        }
    }
}

/// Weighted-factor scoring used to tier per-student risk.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub low_score_threshold: f64,
    pub low_score_penalty: u32,
    pub min_participation: usize,
    pub participation_penalty: u32,
    pub variance_threshold: f64,
    pub variance_penalty: u32,
    pub negative_slope: f64,
    pub negative_trend_penalty: u32,
    pub low_probability: u8,
    pub low_probability_penalty: u32,
    pub critical_score: u32,
    pub high_score: u32,
    pub medium_score: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            low_score_threshold: 5.0,
            low_score_penalty: 25,
            min_participation: 3,
            participation_penalty: 20,
            variance_threshold: 2.0,
            variance_penalty: 20,
            negative_slope: -0.1,
            negative_trend_penalty: 15,
            low_probability: 40,
            low_probability_penalty: 20,
            critical_score: 70,
            high_score: 50,
            medium_score: 30,
        }
    }
}
