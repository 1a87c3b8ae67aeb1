use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Baseline ELO every student starts from.
pub const BASE_ELO: i32 = 1000;

/// One student's submission to one simulated exam.
#[derive(Debug, Clone, Serialize)]
pub struct ExamResult {
    pub user_id: Uuid,
    pub simulation_id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub score: f64,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    pub blank_answers: u32,
    pub time_taken_seconds: u32,
    pub is_saturday_live: bool,
    pub stress_level: Option<f64>,
    pub confidence_score: Option<f64>,
    pub weakest_topics: Vec<String>,
}

impl ExamResult {
    pub fn total_questions(&self) -> u32 {
        self.correct_answers + self.wrong_answers + self.blank_answers
    }

    /// Wrong answers over answered questions; None when nothing was answered.
    pub fn error_rate(&self) -> Option<f64> {
        let answered = self.correct_answers + self.wrong_answers;
        if answered == 0 {
            return None;
        }
        Some(self.wrong_answers as f64 / answered as f64)
    }

    pub fn time_taken_minutes(&self) -> f64 {
        self.time_taken_seconds as f64 / 60.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Student {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub cohort: Cohort,
    pub active: bool,
    pub current_elo: i32,
    pub average_score: f64,
    pub probability_pass: u8,
    pub trend_direction: TrendDirection,
}

/// One simulated exam sitting.
#[derive(Debug, Clone, Serialize)]
pub struct Simulation {
    pub id: Uuid,
    pub week_number: i32,
    pub status: String,
    pub start_date: NaiveDate,
}

/// Enrollment track by weekly study-hour commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cohort {
    #[serde(rename = "20h")]
    TwentyHours,
    #[serde(rename = "36h")]
    ThirtySixHours,
    #[serde(rename = "48h")]
    FortyEightHours,
    #[serde(rename = "unassigned")]
    Unassigned,
}

impl Cohort {
    pub const ALL: [Cohort; 4] = [
        Cohort::TwentyHours,
        Cohort::ThirtySixHours,
        Cohort::FortyEightHours,
        Cohort::Unassigned,
    ];

    /// Unknown labels fall back to `Unassigned`.
    pub fn parse(label: &str) -> Cohort {
        match label {
            "20h" => Cohort::TwentyHours,
            "36h" => Cohort::ThirtySixHours,
            "48h" => Cohort::FortyEightHours,
            _ => Cohort::Unassigned,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cohort::TwentyHours => "20h",
            Cohort::ThirtySixHours => "36h",
            Cohort::FortyEightHours => "48h",
            Cohort::Unassigned => "unassigned",
        }
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
    Neutral,
}

impl TrendDirection {
    /// Unknown labels fall back to `Neutral`.
    pub fn parse(label: &str) -> TrendDirection {
        match label {
            "up" => TrendDirection::Up,
            "down" => TrendDirection::Down,
            "stable" => TrendDirection::Stable,
            _ => TrendDirection::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Stable => "stable",
            TrendDirection::Neutral => "neutral",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk tier bucketed from pass probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// Boundary cases: 30 is high, 50 is medium, 70 is low.
    pub fn from_probability(probability: u8) -> RiskLevel {
        match probability {
            0..=29 => RiskLevel::Critical,
            30..=49 => RiskLevel::High,
            50..=69 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "critical",
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering doubles as urgency: `High` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub area: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_boundaries_are_exact() {
        assert_eq!(RiskLevel::from_probability(29), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_probability(30), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(49), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(50), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(69), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(70), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(100), RiskLevel::Low);
    }

    #[test]
    fn cohort_labels_round_trip() {
        for cohort in Cohort::ALL {
            assert_eq!(Cohort::parse(cohort.as_str()), cohort);
        }
        assert_eq!(Cohort::parse("72h"), Cohort::Unassigned);
    }

    #[test]
    fn priority_sorts_high_first() {
        let mut priorities = vec![Priority::Low, Priority::High, Priority::Medium];
        priorities.sort();
        assert_eq!(priorities, vec![Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn error_rate_skips_all_blank_results() {
        let result = ExamResult {
            user_id: Uuid::nil(),
            simulation_id: Uuid::nil(),
            submitted_at: Utc::now(),
            score: 0.0,
            correct_answers: 0,
            wrong_answers: 0,
            blank_answers: 100,
            time_taken_seconds: 600,
            is_saturday_live: false,
            stress_level: None,
            confidence_score: None,
            weakest_topics: Vec::new(),
        };
        assert_eq!(result.error_rate(), None);
        assert_eq!(result.total_questions(), 100);
    }
}
