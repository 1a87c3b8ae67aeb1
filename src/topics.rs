//! Cross-student, cross-exam analysis of self-reported weak topics: how
//! often each topic is reported, how that evolves across sittings, and how
//! much each topic correlates with lower overall scores.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::config::TopicConfig;
use crate::models::{Cohort, ExamResult, Simulation, Student};
use crate::stats;

#[derive(Debug, Clone, Serialize)]
pub struct TopicFrequency {
    pub topic: String,
    pub count: usize,
    pub percentage: f64,
    pub critical: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationTopics {
    pub simulation_id: Uuid,
    pub week_number: i32,
    pub respondents: usize,
    pub topics: Vec<TopicFrequency>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendShift {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendShift {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendShift::Increasing => "increasing",
            TrendShift::Decreasing => "decreasing",
            TrendShift::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicTrend {
    pub topic: String,
    /// Number of exams the topic was reported in.
    pub occurrences: usize,
    pub avg_percentage: f64,
    pub first_half_avg: f64,
    pub second_half_avg: f64,
    pub shift: TrendShift,
}

/// How much reporting a topic as weak costs in overall score.
#[derive(Debug, Clone, Serialize)]
pub struct TopicImpact {
    pub topic: String,
    pub students_affected: usize,
    pub avg_score_with: f64,
    pub avg_score_without: f64,
    pub score_impact: f64,
    pub impact_percentage: f64,
    pub correlation: f64,
    /// Whether the correlation passes a 95% t-test over the student pool.
    pub significant: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortShare {
    pub cohort: Cohort,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortGap {
    pub topic: String,
    pub per_cohort: Vec<CohortShare>,
    pub gap: f64,
    pub significant: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSeverity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    pub severity: InsightSeverity,
    pub title: String,
    pub message: String,
    pub action: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TopicAnalysis {
    pub by_simulation: Vec<SimulationTopics>,
    pub global_trends: Vec<TopicTrend>,
    pub correlations: Vec<TopicImpact>,
    pub cohort_gaps: Vec<CohortGap>,
    pub insights: Vec<Insight>,
}

pub struct TopicAnalyzer<'a> {
    cfg: &'a TopicConfig,
    weights: &'a HashMap<String, f64>,
}

impl<'a> TopicAnalyzer<'a> {
    pub fn new(cfg: &'a TopicConfig, weights: &'a HashMap<String, f64>) -> Self {
        Self { cfg, weights }
    }

    pub fn analyze(
        &self,
        results: &[ExamResult],
        students: &[Student],
        simulations: &[Simulation],
    ) -> TopicAnalysis {
        let by_simulation = self.frequencies_by_simulation(results, simulations);
        let global_trends = self.global_trends(&by_simulation);
        let correlations = self.score_impact(results, students);
        let cohort_gaps = self.cohort_gaps(results, students, &correlations);
        let insights = self.insights(&by_simulation, &global_trends, &correlations, &cohort_gaps);

        TopicAnalysis {
            by_simulation: by_simulation
                .into_iter()
                .map(|mut sim| {
                    sim.topics.truncate(self.cfg.top_per_simulation);
                    sim
                })
                .collect(),
            global_trends,
            correlations,
            cohort_gaps,
            insights,
        }
    }

    /// Full (untruncated) per-simulation frequency tables in week order.
    /// Results referencing unknown simulations are left out.
    fn frequencies_by_simulation(
        &self,
        results: &[ExamResult],
        simulations: &[Simulation],
    ) -> Vec<SimulationTopics> {
        let mut by_sim: HashMap<Uuid, Vec<&ExamResult>> = HashMap::new();
        for result in results {
            by_sim.entry(result.simulation_id).or_default().push(result);
        }

        let mut ordered: Vec<&Simulation> = simulations.iter().collect();
        ordered.sort_by_key(|s| (s.week_number, s.id));

        let mut tables = Vec::new();
        for sim in ordered {
            let Some(group) = by_sim.get(&sim.id) else {
                continue;
            };
            let respondents = group.len();
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for result in group {
                for topic in &result.weakest_topics {
                    *counts.entry(topic.as_str()).or_insert(0) += 1;
                }
            }
            let mut topics: Vec<TopicFrequency> = counts
                .into_iter()
                .map(|(topic, count)| {
                    let percentage = count as f64 / respondents as f64 * 100.0;
                    TopicFrequency {
                        topic: topic.to_string(),
                        count,
                        percentage,
                        critical: percentage >= self.cfg.critical_pct,
                    }
                })
                .collect();
            topics.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.topic.cmp(&b.topic)));

            tables.push(SimulationTopics {
                simulation_id: sim.id,
                week_number: sim.week_number,
                respondents,
                topics,
            });
        }
        tables
    }

    fn global_trends(&self, by_simulation: &[SimulationTopics]) -> Vec<TopicTrend> {
        let mut series: HashMap<&str, Vec<f64>> = HashMap::new();
        for sim in by_simulation {
            for freq in &sim.topics {
                series.entry(freq.topic.as_str()).or_default().push(freq.percentage);
            }
        }

        let mut trends: Vec<TopicTrend> = series
            .into_iter()
            .map(|(topic, percentages)| {
                let occurrences = percentages.len();
                let avg_percentage = stats::basic_stats(&percentages).mean;
                let mid = occurrences / 2;
                let first_half_avg = stats::basic_stats(&percentages[..mid]).mean;
                let second_half_avg = stats::basic_stats(&percentages[mid..]).mean;

                let shift = if occurrences < self.cfg.min_trend_points {
                    TrendShift::Stable
                } else if second_half_avg > first_half_avg * self.cfg.trend_increase_ratio {
                    TrendShift::Increasing
                } else if second_half_avg < first_half_avg * self.cfg.trend_decrease_ratio {
                    TrendShift::Decreasing
                } else {
                    TrendShift::Stable
                };

                TopicTrend {
                    topic: topic.to_string(),
                    occurrences,
                    avg_percentage,
                    first_half_avg,
                    second_half_avg,
                    shift,
                }
            })
            .collect();
        trends.sort_by(|a, b| a.topic.cmp(&b.topic));
        trends
    }

    /// Partitions roster students (not individual results) into "ever
    /// reported this topic" vs not. Both groups must be strictly larger
    /// than `min_group_size` before the topic is reported at all.
    fn score_impact(&self, results: &[ExamResult], students: &[Student]) -> Vec<TopicImpact> {
        let mut scores_by_student: HashMap<Uuid, Vec<f64>> = HashMap::new();
        let mut topics_by_student: HashMap<Uuid, HashSet<&str>> = HashMap::new();
        for result in results {
            scores_by_student.entry(result.user_id).or_default().push(result.score);
            let reported = topics_by_student.entry(result.user_id).or_default();
            for topic in &result.weakest_topics {
                reported.insert(topic.as_str());
            }
        }

        let mut universe: Vec<(Uuid, f64)> = students
            .iter()
            .filter_map(|s| {
                let scores = scores_by_student.get(&s.id)?;
                Some((s.id, stats::basic_stats(scores).mean))
            })
            .collect();
        universe.sort_by_key(|(id, _)| *id);

        let mut all_topics: Vec<&str> = results
            .iter()
            .flat_map(|r| r.weakest_topics.iter().map(|t| t.as_str()))
            .collect::<HashSet<&str>>()
            .into_iter()
            .collect();
        all_topics.sort_unstable();

        let mut impacts = Vec::new();
        for topic in all_topics {
            let mut with = Vec::new();
            let mut without = Vec::new();
            let mut indicator = Vec::new();
            let mut averages = Vec::new();
            for (student_id, avg) in &universe {
                let affected = topics_by_student
                    .get(student_id)
                    .is_some_and(|reported| reported.contains(topic));
                if affected {
                    with.push(*avg);
                } else {
                    without.push(*avg);
                }
                indicator.push(if affected { 1.0 } else { 0.0 });
                averages.push(*avg);
            }
            if with.len() <= self.cfg.min_group_size || without.len() <= self.cfg.min_group_size {
                continue;
            }

            let avg_score_with = stats::basic_stats(&with).mean;
            let avg_score_without = stats::basic_stats(&without).mean;
            let score_impact = avg_score_without - avg_score_with;
            let impact_percentage = if avg_score_without == 0.0 {
                0.0
            } else {
                score_impact / avg_score_without * 100.0
            };
            let correlation = stats::correlation(&indicator, &averages);
            impacts.push(TopicImpact {
                topic: topic.to_string(),
                students_affected: with.len(),
                avg_score_with,
                avg_score_without,
                score_impact,
                impact_percentage,
                correlation,
                significant: stats::significant_correlation(correlation, universe.len()),
            });
        }
        impacts.sort_by(|a, b| {
            b.score_impact
                .partial_cmp(&a.score_impact)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.topic.cmp(&b.topic))
        });
        impacts
    }

    fn cohort_gaps(
        &self,
        results: &[ExamResult],
        students: &[Student],
        correlations: &[TopicImpact],
    ) -> Vec<CohortGap> {
        let mut topics_by_student: HashMap<Uuid, HashSet<&str>> = HashMap::new();
        let mut has_results: HashSet<Uuid> = HashSet::new();
        for result in results {
            has_results.insert(result.user_id);
            let reported = topics_by_student.entry(result.user_id).or_default();
            for topic in &result.weakest_topics {
                reported.insert(topic.as_str());
            }
        }

        let mut gaps = Vec::new();
        for impact in correlations {
            let mut per_cohort = Vec::new();
            for cohort in Cohort::ALL {
                let members: Vec<&Student> = students
                    .iter()
                    .filter(|s| s.cohort == cohort && has_results.contains(&s.id))
                    .collect();
                if members.is_empty() {
                    continue;
                }
                let affected = members
                    .iter()
                    .filter(|s| {
                        topics_by_student
                            .get(&s.id)
                            .is_some_and(|reported| reported.contains(impact.topic.as_str()))
                    })
                    .count();
                per_cohort.push(CohortShare {
                    cohort,
                    percentage: affected as f64 / members.len() as f64 * 100.0,
                });
            }
            if per_cohort.len() < 2 {
                continue;
            }
            let max = per_cohort.iter().map(|c| c.percentage).fold(f64::MIN, f64::max);
            let min = per_cohort.iter().map(|c| c.percentage).fold(f64::MAX, f64::min);
            let gap = max - min;
            gaps.push(CohortGap {
                topic: impact.topic.clone(),
                per_cohort,
                gap,
                significant: gap > self.cfg.cohort_gap_points,
            });
        }
        gaps
    }

    fn insights(
        &self,
        by_simulation: &[SimulationTopics],
        trends: &[TopicTrend],
        correlations: &[TopicImpact],
        cohort_gaps: &[CohortGap],
    ) -> Vec<Insight> {
        let mut insights = Vec::new();

        let mut persistent: Vec<&TopicTrend> = trends
            .iter()
            .filter(|t| {
                t.occurrences >= self.cfg.persistent_min_exams
                    && t.avg_percentage >= self.cfg.persistent_avg_pct
            })
            .collect();
        persistent.sort_by(|a, b| {
            b.avg_percentage
                .partial_cmp(&a.avg_percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for trend in persistent {
            insights.push(Insight {
                severity: InsightSeverity::Critical,
                title: format!("Persistent weak topic: {}", trend.topic),
                message: format!(
                    "Reported weak by {:.0}% of respondents on average across {} exams.",
                    trend.avg_percentage, trend.occurrences
                ),
                action: "Schedule a dedicated review block for this topic.".to_string(),
            });
        }

        for trend in trends.iter().filter(|t| t.shift == TrendShift::Increasing) {
            insights.push(Insight {
                severity: InsightSeverity::Warning,
                title: format!("Topic trending worse: {}", trend.topic),
                message: format!(
                    "Weak reports climbed from {:.0}% to {:.0}% between half-terms.",
                    trend.first_half_avg, trend.second_half_avg
                ),
                action: "Revisit how this topic was covered in recent weeks.".to_string(),
            });
        }

        if let Some(last) = by_simulation.last() {
            let critical: Vec<&str> = last
                .topics
                .iter()
                .filter(|t| t.critical)
                .map(|t| t.topic.as_str())
                .collect();
            if !critical.is_empty() {
                insights.push(Insight {
                    severity: InsightSeverity::Warning,
                    title: format!("Critical topics in week {}", last.week_number),
                    message: format!(
                        "{} flagged by at least {:.0}% of respondents in the latest exam.",
                        critical.join(", "),
                        self.cfg.critical_pct
                    ),
                    action: "Open the next session with these topics.".to_string(),
                });
            }
        }

        if let Some(top) = correlations.first() {
            let uniform = if self.weights.is_empty() {
                1.0
            } else {
                1.0 / self.weights.len() as f64
            };
            let weight = self.weights.get(&top.topic).copied().unwrap_or(uniform);
            let severity = if top.score_impact >= 1.0 && weight >= uniform {
                InsightSeverity::Critical
            } else {
                InsightSeverity::Warning
            };
            insights.push(Insight {
                severity,
                title: format!("Highest score impact: {}", top.topic),
                message: format!(
                    "Students reporting it average {:.2} vs {:.2} for the rest ({:.1} points, {:.0}%).",
                    top.avg_score_with,
                    top.avg_score_without,
                    top.score_impact,
                    top.impact_percentage
                ),
                action: "Prioritize this topic in the weakest students' plans.".to_string(),
            });
        }

        for gap in cohort_gaps.iter().filter(|g| g.significant) {
            insights.push(Insight {
                severity: InsightSeverity::Info,
                title: format!("Cohort gap on {}", gap.topic),
                message: format!(
                    "Affected share differs by {:.0} percentage points between cohorts.",
                    gap.gap
                ),
                action: "Compare how the cohorts covered this topic.".to_string(),
            });
        }

        insights.sort_by_key(|i| i.severity);
        insights.truncate(self.cfg.max_insights);
        insights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrendDirection;
    use chrono::{Duration, TimeZone, Utc};

    fn student(n: u128, cohort: Cohort) -> Student {
        Student {
            id: Uuid::from_u128(n),
            full_name: format!("Student {n}"),
            email: format!("s{n}@academy.example"),
            cohort,
            active: true,
            current_elo: 1000,
            average_score: 0.0,
            probability_pass: 0,
            trend_direction: TrendDirection::Neutral,
        }
    }

    fn simulation(n: u128, week: i32) -> Simulation {
        Simulation {
            id: Uuid::from_u128(1000 + n),
            week_number: week,
            status: "completed".to_string(),
            start_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
        }
    }

    fn result(user: u128, sim: u128, score: f64, topics: &[&str]) -> ExamResult {
        ExamResult {
            user_id: Uuid::from_u128(user),
            simulation_id: Uuid::from_u128(1000 + sim),
            submitted_at: Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap()
                + Duration::days(7 * sim as i64),
            score,
            correct_answers: 70,
            wrong_answers: 20,
            blank_answers: 10,
            time_taken_seconds: 5400,
            is_saturday_live: true,
            stress_level: None,
            confidence_score: None,
            weakest_topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn analyzer<'a>(cfg: &'a TopicConfig, weights: &'a HashMap<String, f64>) -> TopicAnalyzer<'a> {
        TopicAnalyzer::new(cfg, weights)
    }

    #[test]
    fn per_simulation_frequencies_flag_critical_topics() {
        let cfg = TopicConfig::default();
        let weights = HashMap::new();
        let students: Vec<Student> = (1..=10).map(|n| student(n, Cohort::TwentyHours)).collect();
        let simulations = vec![simulation(1, 1)];
        let mut results = Vec::new();
        for n in 1..=10u128 {
            let topics: &[&str] = if n <= 4 { &["derecho-penal"] } else if n <= 5 { &["ingles"] } else { &[] };
            results.push(result(n, 1, 6.0, topics));
        }

        let analysis = analyzer(&cfg, &weights).analyze(&results, &students, &simulations);
        assert_eq!(analysis.by_simulation.len(), 1);
        let sim = &analysis.by_simulation[0];
        assert_eq!(sim.respondents, 10);
        let penal = sim.topics.iter().find(|t| t.topic == "derecho-penal").unwrap();
        assert_eq!(penal.count, 4);
        assert!(penal.critical); // 40% >= 30%
        let ingles = sim.topics.iter().find(|t| t.topic == "ingles").unwrap();
        assert!(!ingles.critical); // 10%
    }

    #[test]
    fn top_five_topics_kept_per_simulation() {
        let cfg = TopicConfig::default();
        let weights = HashMap::new();
        let students: Vec<Student> = (1..=8).map(|n| student(n, Cohort::TwentyHours)).collect();
        let simulations = vec![simulation(1, 1)];
        let all_topics = ["a", "b", "c", "d", "e", "f", "g"];
        let results: Vec<ExamResult> = (1..=8u128)
            .map(|n| result(n, 1, 6.0, &all_topics[..(n as usize % 7) + 1]))
            .collect();

        let analysis = analyzer(&cfg, &weights).analyze(&results, &students, &simulations);
        assert_eq!(analysis.by_simulation[0].topics.len(), 5);
    }

    #[test]
    fn trend_classification_tracks_half_term_shift() {
        let cfg = TopicConfig::default();
        let weights = HashMap::new();
        let students: Vec<Student> = (1..=10).map(|n| student(n, Cohort::TwentyHours)).collect();
        let simulations: Vec<Simulation> = (1..=4).map(|n| simulation(n, n as i32)).collect();

        let mut results = Vec::new();
        for sim in 1..=4u128 {
            // "worsening" grows 20% -> 80%; "fading" shrinks 80% -> 20%
            let worsening_reporters = if sim <= 2 { 2 } else { 8 };
            let fading_reporters = if sim <= 2 { 8 } else { 2 };
            for n in 1..=10u128 {
                let mut topics = Vec::new();
                if n <= worsening_reporters {
                    topics.push("worsening");
                }
                if n <= fading_reporters {
                    topics.push("fading");
                }
                results.push(result(n, sim, 6.0, &topics));
            }
        }

        let analysis = analyzer(&cfg, &weights).analyze(&results, &students, &simulations);
        let shift_of = |name: &str| {
            analysis
                .global_trends
                .iter()
                .find(|t| t.topic == name)
                .unwrap()
                .shift
        };
        assert_eq!(shift_of("worsening"), TrendShift::Increasing);
        assert_eq!(shift_of("fading"), TrendShift::Decreasing);
    }

    #[test]
    fn trend_needs_three_occurrences() {
        let cfg = TopicConfig::default();
        let weights = HashMap::new();
        let students: Vec<Student> = (1..=10).map(|n| student(n, Cohort::TwentyHours)).collect();
        let simulations: Vec<Simulation> = (1..=2).map(|n| simulation(n, n as i32)).collect();
        let mut results = Vec::new();
        for sim in 1..=2u128 {
            let reporters = if sim == 1 { 1 } else { 9 };
            for n in 1..=10u128 {
                let topics: &[&str] = if n <= reporters { &["spiking"] } else { &[] };
                results.push(result(n, sim, 6.0, topics));
            }
        }

        let analysis = analyzer(&cfg, &weights).analyze(&results, &students, &simulations);
        let trend = analysis.global_trends.iter().find(|t| t.topic == "spiking").unwrap();
        assert_eq!(trend.occurrences, 2);
        assert_eq!(trend.shift, TrendShift::Stable);
    }

    #[test]
    fn impact_requires_more_than_five_students_per_group() {
        let cfg = TopicConfig::default();
        let weights = HashMap::new();
        let simulations = vec![simulation(1, 1)];
        let students: Vec<Student> = (1..=10).map(|n| student(n, Cohort::TwentyHours)).collect();

        // 4 affected students with a huge score gap: still excluded
        let mut results = Vec::new();
        for n in 1..=10u128 {
            let topics: &[&str] = if n <= 4 { &["algebra"] } else { &[] };
            let score = if n <= 4 { 2.0 } else { 9.0 };
            results.push(result(n, 1, score, topics));
        }
        let analysis = analyzer(&cfg, &weights).analyze(&results, &students, &simulations);
        assert!(analysis.correlations.is_empty());
    }

    #[test]
    fn impact_reported_with_six_students_per_group() {
        let cfg = TopicConfig::default();
        let weights = HashMap::new();
        let simulations = vec![simulation(1, 1)];
        let students: Vec<Student> = (1..=12).map(|n| student(n, Cohort::TwentyHours)).collect();

        let mut results = Vec::new();
        for n in 1..=12u128 {
            let topics: &[&str] = if n <= 6 { &["algebra"] } else { &[] };
            let score = if n <= 6 { 5.0 } else { 7.0 };
            results.push(result(n, 1, score, topics));
        }
        let analysis = analyzer(&cfg, &weights).analyze(&results, &students, &simulations);
        assert_eq!(analysis.correlations.len(), 1);
        let impact = &analysis.correlations[0];
        assert_eq!(impact.students_affected, 6);
        assert!((impact.score_impact - 2.0).abs() < 1e-9);
        assert!(impact.correlation < 0.0);
        assert!(impact.significant);
        assert!((impact.impact_percentage - 2.0 / 7.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn cohort_gap_flagged_above_twenty_points() {
        let cfg = TopicConfig::default();
        let weights = HashMap::new();
        let simulations = vec![simulation(1, 1)];
        let mut students = Vec::new();
        for n in 1..=8u128 {
            students.push(student(n, Cohort::TwentyHours));
        }
        for n in 9..=16u128 {
            students.push(student(n, Cohort::FortyEightHours));
        }

        // 6 of 8 in the 20h cohort report it, 1 of 8 in the 48h cohort
        let mut results = Vec::new();
        for n in 1..=16u128 {
            let affected = (n <= 6) || n == 9;
            let topics: &[&str] = if affected { &["algebra"] } else { &[] };
            let score = if affected { 5.0 } else { 7.0 };
            results.push(result(n, 1, score, topics));
        }

        let analysis = analyzer(&cfg, &weights).analyze(&results, &students, &simulations);
        let gap = analysis.cohort_gaps.iter().find(|g| g.topic == "algebra").unwrap();
        assert!((gap.gap - 62.5).abs() < 1e-9);
        assert!(gap.significant);
        assert!(analysis
            .insights
            .iter()
            .any(|i| i.severity == InsightSeverity::Info && i.title.contains("algebra")));
    }

    #[test]
    fn insights_sort_by_severity_and_cap() {
        let mut cfg = TopicConfig::default();
        cfg.max_insights = 3;
        let weights = HashMap::new();
        let students: Vec<Student> = (1..=10).map(|n| student(n, Cohort::TwentyHours)).collect();
        let simulations: Vec<Simulation> = (1..=3).map(|n| simulation(n, n as i32)).collect();

        // "grammar" is persistent (60% in every exam) and impactful
        let mut results = Vec::new();
        for sim in 1..=3u128 {
            for n in 1..=10u128 {
                let topics: &[&str] = if n <= 6 { &["grammar"] } else { &[] };
                let score = if n <= 6 { 4.5 } else { 7.5 };
                results.push(result(n, sim, score, topics));
            }
        }

        let analysis = analyzer(&cfg, &weights).analyze(&results, &students, &simulations);
        assert!(analysis.insights.len() <= 3);
        assert_eq!(analysis.insights[0].severity, InsightSeverity::Critical);
        for pair in analysis.insights.windows(2) {
            assert!(pair[0].severity <= pair[1].severity);
        }
    }
}
