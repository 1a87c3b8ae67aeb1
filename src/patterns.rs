//! Per-student behavioral pattern analysis over a chronological result
//! history. With fewer than two results every detector reports
//! `has_enough_data: false` instead of failing.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::PatternConfig;
use crate::models::{ExamResult, Priority, Recommendation};
use crate::stats;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AbandonmentSeverity {
    #[default]
    Normal,
    High,
    Critical,
}

impl AbandonmentSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbandonmentSeverity::Normal => "normal",
            AbandonmentSeverity::High => "high",
            AbandonmentSeverity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationTendency {
    Overconfident,
    Underconfident,
    #[default]
    Balanced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StressResponse {
    Negative,
    Positive,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyLevel {
    Excellent,
    #[default]
    Good,
    Moderate,
    Poor,
}

impl ConsistencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Excellent => "excellent",
            ConsistencyLevel::Good => "good",
            ConsistencyLevel::Moderate => "moderate",
            ConsistencyLevel::Poor => "poor",
        }
    }
}

/// Accuracy degrades as exam time grows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FatiguePattern {
    pub detected: bool,
    pub correlation: f64,
    /// Mean score drop between the earlier results and the last quarter.
    pub late_dropoff: f64,
    pub severity: Severity,
    pub recommendation: String,
}

/// Fast attempts score worse than normally paced ones.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RushingPattern {
    pub detected: bool,
    pub fast_attempts: usize,
    pub fast_share_pct: f64,
    pub score_gap: f64,
    pub avg_time_reduction_minutes: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AbandonmentPattern {
    pub detected: bool,
    pub mean_blanks: f64,
    /// Blank answers as a share of each exam's question count, averaged.
    pub mean_blank_share_pct: f64,
    pub trend_slope: f64,
    pub severity: AbandonmentSeverity,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersistentTopic {
    pub topic: String,
    pub occurrences: usize,
    pub share_pct: f64,
    pub severe: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TopicWeaknessPattern {
    pub detected: bool,
    pub persistent: Vec<PersistentTopic>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfidencePattern {
    pub detected: bool,
    pub correlation: f64,
    /// Mean of predicted score (confidence / 10) minus actual score.
    pub mean_deviation: f64,
    pub tendency: CalibrationTendency,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StressPattern {
    pub detected: bool,
    pub correlation: f64,
    pub response: StressResponse,
    pub optimal_level: Option<f64>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TimeManagementPattern {
    pub detected: bool,
    pub too_fast: usize,
    pub optimal: usize,
    pub too_slow: usize,
    pub avg_minutes: f64,
    /// Mean score earned per minute of exam time.
    pub efficiency: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsistencyPattern {
    pub detected: bool,
    pub rolling_std_dev: Vec<f64>,
    pub trend_slope: f64,
    pub variation_pct: f64,
    pub level: ConsistencyLevel,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskFactor {
    pub factor: String,
    pub level: String,
    pub impact: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PatternReport {
    pub has_enough_data: bool,
    pub fatigue: FatiguePattern,
    pub rushing: RushingPattern,
    pub abandonment: AbandonmentPattern,
    pub topic_weakness: TopicWeaknessPattern,
    pub confidence: ConfidencePattern,
    pub stress: StressPattern,
    pub time_management: TimeManagementPattern,
    pub consistency: ConsistencyPattern,
    pub summary: String,
    pub recommendations: Vec<Recommendation>,
    pub risk_factors: Vec<RiskFactor>,
}

pub struct PatternDetector<'a> {
    cfg: &'a PatternConfig,
}

impl<'a> PatternDetector<'a> {
    pub fn new(cfg: &'a PatternConfig) -> Self {
        Self { cfg }
    }

    pub fn analyze(&self, history: &[ExamResult]) -> PatternReport {
        if history.len() < 2 {
            return PatternReport::default();
        }
        let mut results = history.to_vec();
        results.sort_by_key(|r| r.submitted_at);

        let mut report = PatternReport {
            has_enough_data: true,
            fatigue: self.fatigue(&results),
            rushing: self.rushing(&results),
            abandonment: self.abandonment(&results),
            topic_weakness: self.topic_weakness(&results),
            confidence: self.confidence(&results),
            stress: self.stress(&results),
            time_management: self.time_management(&results),
            consistency: self.consistency_pattern(&results),
            ..PatternReport::default()
        };
        report.summary = summarize(&report);
        report.recommendations = collect_recommendations(&report);
        report.risk_factors = collect_risk_factors(&report);
        report
    }

    fn fatigue(&self, results: &[ExamResult]) -> FatiguePattern {
        let mut times = Vec::new();
        let mut error_rates = Vec::new();
        for result in results {
            if let Some(rate) = result.error_rate() {
                times.push(result.time_taken_seconds as f64);
                error_rates.push(rate);
            }
        }
        let correlation = stats::correlation(&times, &error_rates);

        let scores: Vec<f64> = results.iter().map(|r| r.score).collect();
        let quarter = (scores.len() / 4).max(1);
        let split = scores.len() - quarter;
        let late_dropoff = if split == 0 {
            0.0
        } else {
            stats::basic_stats(&scores[..split]).mean - stats::basic_stats(&scores[split..]).mean
        };

        let detected = correlation > self.cfg.fatigue_correlation;
        let severity = if correlation > self.cfg.fatigue_correlation * 2.0 && late_dropoff > 0.5 {
            Severity::High
        } else if correlation > self.cfg.fatigue_correlation * 1.5 || late_dropoff > 0.5 {
            Severity::Medium
        } else {
            Severity::Low
        };
        let recommendation = if detected {
            "Accuracy drops as exam time grows; train full-length simulations with planned breaks."
                .to_string()
        } else {
            String::new()
        };
        FatiguePattern {
            detected,
            correlation,
            late_dropoff,
            severity,
            recommendation,
        }
    }

    fn rushing(&self, results: &[ExamResult]) -> RushingPattern {
        let times: Vec<f64> = results.iter().map(|r| r.time_taken_seconds as f64).collect();
        let mean_time = stats::basic_stats(&times).mean;
        let threshold = mean_time * self.cfg.rushing_time_factor;

        let (fast, normal): (Vec<&ExamResult>, Vec<&ExamResult>) = results
            .iter()
            .partition(|r| (r.time_taken_seconds as f64) < threshold);
        let fast_share_pct = fast.len() as f64 / results.len() as f64 * 100.0;
        if fast.is_empty() || normal.is_empty() {
            return RushingPattern {
                fast_attempts: fast.len(),
                fast_share_pct,
                ..RushingPattern::default()
            };
        }

        let fast_scores: Vec<f64> = fast.iter().map(|r| r.score).collect();
        let normal_scores: Vec<f64> = normal.iter().map(|r| r.score).collect();
        let score_gap =
            stats::basic_stats(&normal_scores).mean - stats::basic_stats(&fast_scores).mean;

        let fast_times: Vec<f64> = fast.iter().map(|r| r.time_taken_seconds as f64).collect();
        let normal_times: Vec<f64> = normal.iter().map(|r| r.time_taken_seconds as f64).collect();
        let avg_time_reduction_minutes =
            (stats::basic_stats(&normal_times).mean - stats::basic_stats(&fast_times).mean) / 60.0;

        let detected = score_gap > self.cfg.rushing_score_gap;
        let recommendation = if detected {
            format!(
                "Rushed attempts cost {:.1} points on average; hold the usual pace even when the exam feels easy.",
                score_gap
            )
        } else {
            String::new()
        };
        RushingPattern {
            detected,
            fast_attempts: fast.len(),
            fast_share_pct,
            score_gap,
            avg_time_reduction_minutes,
            recommendation,
        }
    }

    fn abandonment(&self, results: &[ExamResult]) -> AbandonmentPattern {
        let blanks: Vec<f64> = results.iter().map(|r| r.blank_answers as f64).collect();
        let mean_blanks = stats::basic_stats(&blanks).mean;
        let shares: Vec<f64> = results
            .iter()
            .filter(|r| r.total_questions() > 0)
            .map(|r| r.blank_answers as f64 / r.total_questions() as f64 * 100.0)
            .collect();
        let mean_blank_share_pct = stats::basic_stats(&shares).mean;
        let x: Vec<f64> = (0..blanks.len()).map(|i| i as f64).collect();
        let trend_slope = stats::linear_regression(&x, &blanks).slope;

        let severity = if mean_blanks > self.cfg.abandonment_critical {
            AbandonmentSeverity::Critical
        } else if mean_blanks > self.cfg.abandonment_high {
            AbandonmentSeverity::High
        } else {
            AbandonmentSeverity::Normal
        };
        let detected = mean_blanks > self.cfg.abandonment_high;
        let recommendation = if detected {
            format!(
                "Averaging {:.0} blank answers per exam; practice committing to an answer when two options remain.",
                mean_blanks
            )
        } else {
            String::new()
        };
        AbandonmentPattern {
            detected,
            mean_blanks,
            mean_blank_share_pct,
            trend_slope,
            severity,
            recommendation,
        }
    }

    fn topic_weakness(&self, results: &[ExamResult]) -> TopicWeaknessPattern {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for result in results {
            for topic in &result.weakest_topics {
                *counts.entry(topic.as_str()).or_insert(0) += 1;
            }
        }

        let total = results.len() as f64;
        let mut persistent: Vec<PersistentTopic> = counts
            .into_iter()
            .filter_map(|(topic, occurrences)| {
                let share_pct = occurrences as f64 / total * 100.0;
                if share_pct < self.cfg.topic_persistent_pct {
                    return None;
                }
                Some(PersistentTopic {
                    topic: topic.to_string(),
                    occurrences,
                    share_pct,
                    severe: share_pct >= self.cfg.topic_high_pct,
                })
            })
            .collect();
        persistent.sort_by(|a, b| {
            b.occurrences
                .cmp(&a.occurrences)
                .then_with(|| a.topic.cmp(&b.topic))
        });

        let detected = !persistent.is_empty();
        let recommendation = if detected {
            let names: Vec<&str> = persistent.iter().map(|t| t.topic.as_str()).collect();
            format!("Recurring weak topics: {}.", names.join(", "))
        } else {
            String::new()
        };
        TopicWeaknessPattern {
            detected,
            persistent,
            recommendation,
        }
    }

    fn confidence(&self, results: &[ExamResult]) -> ConfidencePattern {
        let mut predicted = Vec::new();
        let mut actual = Vec::new();
        for result in results {
            if let Some(confidence) = result.confidence_score {
                predicted.push(confidence / 10.0);
                actual.push(result.score);
            }
        }
        if predicted.len() < 2 {
            return ConfidencePattern::default();
        }

        let correlation = stats::correlation(&predicted, &actual);
        let mean_deviation = predicted
            .iter()
            .zip(actual.iter())
            .map(|(p, a)| p - a)
            .sum::<f64>()
            / predicted.len() as f64;

        let tendency = if mean_deviation > self.cfg.confidence_deviation {
            CalibrationTendency::Overconfident
        } else if mean_deviation < -self.cfg.confidence_deviation {
            CalibrationTendency::Underconfident
        } else {
            CalibrationTendency::Balanced
        };
        let detected = tendency != CalibrationTendency::Balanced;
        let recommendation = match tendency {
            CalibrationTendency::Overconfident => {
                "Self-assessment runs above actual scores; review wrong answers right after each exam.".to_string()
            }
            CalibrationTendency::Underconfident => {
                "Self-assessment runs below actual scores; scores support trusting the preparation.".to_string()
            }
            CalibrationTendency::Balanced => String::new(),
        };
        ConfidencePattern {
            detected,
            correlation,
            mean_deviation,
            tendency,
            recommendation,
        }
    }

    fn stress(&self, results: &[ExamResult]) -> StressPattern {
        let mut levels = Vec::new();
        let mut scores = Vec::new();
        for result in results {
            if let Some(stress) = result.stress_level {
                levels.push(stress);
                scores.push(result.score);
            }
        }
        if levels.len() < 2 {
            return StressPattern::default();
        }

        let correlation = stats::correlation(&levels, &scores);
        let response = if correlation < self.cfg.stress_negative {
            StressResponse::Negative
        } else if correlation > self.cfg.stress_positive {
            StressResponse::Positive
        } else {
            StressResponse::Neutral
        };

        let mut optimal: Option<(f64, f64)> = None;
        for candidate in (0..=100).step_by(10) {
            let candidate = candidate as f64;
            let nearby: Vec<f64> = levels
                .iter()
                .zip(scores.iter())
                .filter(|(level, _)| (*level - candidate).abs() <= 10.0)
                .map(|(_, score)| *score)
                .collect();
            if nearby.is_empty() {
                continue;
            }
            let mean = stats::basic_stats(&nearby).mean;
            if optimal.map_or(true, |(_, best)| mean > best) {
                optimal = Some((candidate, mean));
            }
        }

        let detected = response == StressResponse::Negative;
        let recommendation = if detected {
            "Scores sink as reported stress rises; add breathing drills before the Saturday live exams."
                .to_string()
        } else {
            String::new()
        };
        StressPattern {
            detected,
            correlation,
            response,
            optimal_level: optimal.map(|(level, _)| level),
            recommendation,
        }
    }

    fn time_management(&self, results: &[ExamResult]) -> TimeManagementPattern {
        let mut too_fast = 0;
        let mut optimal = 0;
        let mut too_slow = 0;
        let mut efficiencies = Vec::new();
        let minutes: Vec<f64> = results.iter().map(|r| r.time_taken_minutes()).collect();

        for result in results {
            let taken = result.time_taken_minutes();
            if taken < self.cfg.fast_minutes {
                too_fast += 1;
            } else if taken > self.cfg.slow_minutes {
                too_slow += 1;
            } else {
                optimal += 1;
            }
            if taken > 0.0 {
                efficiencies.push(result.score / taken);
            }
        }

        let detected = optimal * 2 < results.len();
        let recommendation = if detected {
            if too_fast >= too_slow {
                format!(
                    "{} of {} attempts finished under {:.0} minutes; use the full exam window.",
                    too_fast,
                    results.len(),
                    self.cfg.fast_minutes
                )
            } else {
                format!(
                    "{} of {} attempts ran over {:.0} minutes; rehearse per-block time checkpoints.",
                    too_slow,
                    results.len(),
                    self.cfg.slow_minutes
                )
            }
        } else {
            String::new()
        };
        TimeManagementPattern {
            detected,
            too_fast,
            optimal,
            too_slow,
            avg_minutes: stats::basic_stats(&minutes).mean,
            efficiency: stats::basic_stats(&efficiencies).mean,
            recommendation,
        }
    }

    fn consistency_pattern(&self, results: &[ExamResult]) -> ConsistencyPattern {
        let scores: Vec<f64> = results.iter().map(|r| r.score).collect();
        let rolling_std_dev: Vec<f64> = if scores.len() < 3 {
            Vec::new()
        } else {
            (0..=scores.len() - 3)
                .map(|i| stats::basic_stats(&scores[i..i + 3]).std_dev)
                .collect()
        };
        let x: Vec<f64> = (0..rolling_std_dev.len()).map(|i| i as f64).collect();
        let trend_slope = stats::linear_regression(&x, &rolling_std_dev).slope;

        let variation_pct = stats::coefficient_of_variation(&scores);
        let level = if variation_pct < self.cfg.cv_excellent {
            ConsistencyLevel::Excellent
        } else if variation_pct < self.cfg.cv_good {
            ConsistencyLevel::Good
        } else if variation_pct < self.cfg.cv_moderate {
            ConsistencyLevel::Moderate
        } else {
            ConsistencyLevel::Poor
        };
        let detected = matches!(level, ConsistencyLevel::Moderate | ConsistencyLevel::Poor);
        let recommendation = if detected {
            "Scores swing widely between exams; fix a stable weekly routine before chasing harder material."
                .to_string()
        } else {
            String::new()
        };
        ConsistencyPattern {
            detected,
            rolling_std_dev,
            trend_slope,
            variation_pct,
            level,
            recommendation,
        }
    }
}

fn summarize(report: &PatternReport) -> String {
    let mut detected = Vec::new();
    if report.fatigue.detected {
        detected.push(format!("fatigue ({})", report.fatigue.severity.as_str()));
    }
    if report.rushing.detected {
        detected.push("rushing".to_string());
    }
    if report.abandonment.detected {
        detected.push(format!(
            "abandonment ({})",
            report.abandonment.severity.as_str()
        ));
    }
    if report.topic_weakness.detected {
        detected.push("recurring weak topics".to_string());
    }
    if report.confidence.detected {
        detected.push("confidence miscalibration".to_string());
    }
    if report.stress.detected {
        detected.push("stress sensitivity".to_string());
    }
    if report.time_management.detected {
        detected.push("time management".to_string());
    }
    if report.consistency.detected {
        detected.push(format!(
            "inconsistency ({})",
            report.consistency.level.as_str()
        ));
    }

    if detected.is_empty() {
        "No behavioral patterns detected.".to_string()
    } else {
        format!(
            "{} of 8 patterns detected: {}.",
            detected.len(),
            detected.join(", ")
        )
    }
}

fn collect_recommendations(report: &PatternReport) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let mut push = |priority: Priority, area: &str, message: &str| {
        if !message.is_empty() {
            recommendations.push(Recommendation {
                priority,
                area: area.to_string(),
                message: message.to_string(),
            });
        }
    };

    if report.abandonment.detected {
        let priority = if report.abandonment.severity == AbandonmentSeverity::Critical {
            Priority::High
        } else {
            Priority::Medium
        };
        push(priority, "blank-answers", &report.abandonment.recommendation);
    }
    if report.fatigue.detected {
        let priority = if report.fatigue.severity == Severity::High {
            Priority::High
        } else {
            Priority::Medium
        };
        push(priority, "fatigue", &report.fatigue.recommendation);
    }
    if report.topic_weakness.detected {
        let priority = if report.topic_weakness.persistent.iter().any(|t| t.severe) {
            Priority::High
        } else {
            Priority::Medium
        };
        push(priority, "topics", &report.topic_weakness.recommendation);
    }
    if report.rushing.detected {
        push(Priority::Medium, "pacing", &report.rushing.recommendation);
    }
    if report.stress.detected {
        push(Priority::Medium, "stress", &report.stress.recommendation);
    }
    if report.consistency.detected {
        let priority = if report.consistency.level == ConsistencyLevel::Poor {
            Priority::Medium
        } else {
            Priority::Low
        };
        push(priority, "consistency", &report.consistency.recommendation);
    }
    if report.confidence.detected {
        push(Priority::Low, "calibration", &report.confidence.recommendation);
    }
    if report.time_management.detected {
        push(Priority::Low, "time", &report.time_management.recommendation);
    }

    recommendations.sort_by_key(|r| r.priority);
    recommendations
}

fn collect_risk_factors(report: &PatternReport) -> Vec<RiskFactor> {
    let mut factors = Vec::new();
    if report.fatigue.detected {
        let impact = match report.fatigue.severity {
            Severity::High => 20,
            Severity::Medium => 15,
            Severity::Low => 10,
        };
        factors.push(RiskFactor {
            factor: "fatigue".to_string(),
            level: report.fatigue.severity.as_str().to_string(),
            impact,
        });
    }
    if report.abandonment.detected {
        let impact = if report.abandonment.severity == AbandonmentSeverity::Critical {
            25
        } else {
            15
        };
        factors.push(RiskFactor {
            factor: "abandonment".to_string(),
            level: report.abandonment.severity.as_str().to_string(),
            impact,
        });
    }
    if report.rushing.detected {
        factors.push(RiskFactor {
            factor: "rushing".to_string(),
            level: "medium".to_string(),
            impact: 10,
        });
    }
    if report.stress.detected {
        factors.push(RiskFactor {
            factor: "stress".to_string(),
            level: "medium".to_string(),
            impact: 10,
        });
    }
    if report.consistency.detected {
        let impact = if report.consistency.level == ConsistencyLevel::Poor {
            15
        } else {
            10
        };
        factors.push(RiskFactor {
            factor: "inconsistency".to_string(),
            level: report.consistency.level.as_str().to_string(),
            impact,
        });
    }
    factors
}
