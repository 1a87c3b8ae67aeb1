//! Exam-calibrated scoring model: negative marking, pass probability and
//! national ranking estimation. All coefficients live in `DomainConfig` so
//! the model can be recalibrated per exam edition.

use serde::Serialize;

use crate::config::DomainConfig;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Ranking {
    /// Estimated position among the candidate pool, best is 1.
    pub position: u32,
    /// Percentile of candidates scoring below, 0-100.
    pub percentile: f64,
}

/// Score on the 0-10 scale after the negative-marking penalty.
/// Never negative; an empty exam scores 0.
pub fn net_score(cfg: &DomainConfig, correct: u32, wrong: u32, blank: u32) -> f64 {
    let total = correct + wrong + blank;
    if total == 0 {
        return 0.0;
    }
    let raw = (correct as f64 - wrong as f64 * cfg.penalty_factor) / total as f64 * 10.0;
    raw.max(0.0)
}

/// Heuristic probability of passing the real exam, 0-100.
///
/// Weighted sum of four factors: score against the historical cutoff (up
/// to 40), consistency (20/10/0), trend (+20/+10/-10) and experience (up
/// to 20 at ten simulations), clamped to [0, 100].
pub fn pass_probability(
    cfg: &DomainConfig,
    avg_score: f64,
    consistency: f64,
    trend_slope: f64,
    simulation_count: usize,
) -> u8 {
    let score_factor = avg_score / cfg.historical_cutoff * 40.0;
    let consistency_factor = if consistency < cfg.steady_consistency {
        20.0
    } else if consistency < cfg.loose_consistency {
        10.0
    } else {
        0.0
    };
    let trend_factor = if trend_slope > 0.0 {
        20.0
    } else if trend_slope < cfg.declining_slope {
        -10.0
    } else {
        10.0
    };
    let experience_factor = (simulation_count as f64 / 10.0 * 20.0).min(20.0);

    let total = score_factor + consistency_factor + trend_factor + experience_factor;
    total.clamp(0.0, 100.0).round() as u8
}

/// Position estimate assuming scores follow Normal(exam_mean, exam_std_dev).
pub fn national_ranking(cfg: &DomainConfig, score: f64, total_candidates: u32) -> Ranking {
    let z = if cfg.exam_std_dev == 0.0 {
        0.0
    } else {
        (score - cfg.exam_mean) / cfg.exam_std_dev
    };
    let fraction_below = normal_cdf(z);
    let position = (total_candidates as f64 * (1.0 - fraction_below))
        .round()
        .max(1.0) as u32;
    Ranking {
        position,
        percentile: fraction_below * 100.0,
    }
}

// Abramowitz-Stegun 26.2.17 rational approximation, |error| < 7.5e-8.
fn normal_cdf(z: f64) -> f64 {
    const P: f64 = 0.231_641_9;
    const B1: f64 = 0.319_381_530;
    const B2: f64 = -0.356_563_782;
    const B3: f64 = 1.781_477_937;
    const B4: f64 = -1.821_255_978;
    const B5: f64 = 1.330_274_429;

    let x = z.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = t * (B1 + t * (B2 + t * (B3 + t * (B4 + t * B5))));
    let pdf = (-x * x / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt();
    let upper_tail = pdf * poly;
    if z < 0.0 {
        upper_tail
    } else {
        1.0 - upper_tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> DomainConfig {
        DomainConfig::default()
    }

    #[test]
    fn net_score_matches_known_values() {
        let cfg = cfg();
        assert_eq!(net_score(&cfg, 10, 0, 0), 10.0);
        assert!((net_score(&cfg, 5, 5, 0) - 3.35).abs() < 1e-9);
        assert_eq!(net_score(&cfg, 0, 10, 0), 0.0);
        assert_eq!(net_score(&cfg, 0, 0, 0), 0.0);
    }

    #[test]
    fn net_score_is_non_increasing_in_wrong_answers() {
        let cfg = cfg();
        let mut previous = f64::INFINITY;
        for wrong in 0..=20 {
            let score = net_score(&cfg, 5, wrong, 3);
            assert!(score <= previous);
            assert!(score >= 0.0);
            previous = score;
        }
    }

    #[test]
    fn pass_probability_is_monotone_in_average_score() {
        let cfg = cfg();
        let mut previous = 0;
        for tenths in 0..=100 {
            let avg = tenths as f64 / 10.0;
            let p = pass_probability(&cfg, avg, 1.0, 0.05, 5);
            assert!(p >= previous);
            assert!(p <= 100);
            previous = p;
        }
    }

    #[test]
    fn pass_probability_rewards_trend_and_experience() {
        let cfg = cfg();
        let rising = pass_probability(&cfg, 6.0, 1.0, 0.2, 10);
        let falling = pass_probability(&cfg, 6.0, 1.0, -0.5, 10);
        assert!(rising > falling);

        let veteran = pass_probability(&cfg, 6.0, 1.0, 0.0, 20);
        let novice = pass_probability(&cfg, 6.0, 1.0, 0.0, 1);
        assert!(veteran > novice);
    }

    #[test]
    fn pass_probability_stays_in_bounds() {
        let cfg = cfg();
        assert_eq!(pass_probability(&cfg, 0.0, 5.0, -1.0, 0), 0);
        assert_eq!(pass_probability(&cfg, 10.0, 0.5, 1.0, 30), 100);
    }

    #[test]
    fn normal_cdf_is_symmetric() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.0) + normal_cdf(-1.0) - 1.0).abs() < 1e-6);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
    }

    #[test]
    fn ranking_places_strong_scores_near_the_top() {
        let cfg = cfg();
        let strong = national_ranking(&cfg, 9.5, 25_000);
        let weak = national_ranking(&cfg, 4.0, 25_000);
        assert!(strong.position < weak.position);
        assert!(strong.percentile > 95.0);
        assert!(strong.position >= 1);
    }
}
