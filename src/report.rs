use std::fmt::Write;

use chrono::NaiveDate;

use crate::analytics::CohortAnalytics;

pub fn build_report(
    scope: Option<&str>,
    since_days: i64,
    cutoff: NaiveDate,
    analytics: &CohortAnalytics,
) -> String {
    let mut output = String::new();
    let scope_label = scope.unwrap_or("all cohorts");

    let _ = writeln!(output, "# Exam Cohort Analytics Report");
    let _ = writeln!(
        output,
        "Generated for {} (results from the last {} days, since {})",
        scope_label, since_days, cutoff
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Global Statistics");
    if analytics.global.results_count == 0 {
        let _ = writeln!(output, "No results recorded for this window.");
    } else {
        let global = &analytics.global;
        let _ = writeln!(
            output,
            "- {} results from {} students (participation {:.0}%)",
            global.results_count,
            global.unique_submitters,
            global.participation_rate * 100.0
        );
        let _ = writeln!(
            output,
            "- Mean score {:.2} (median {:.2}, min {:.2}, max {:.2})",
            global.scores.mean, global.scores.median, global.scores.min, global.scores.max
        );
        let _ = writeln!(
            output,
            "- Distance to historical cutoff: {:+.2}",
            global.cutoff_distance
        );
        for percentile in &global.percentiles {
            let _ = writeln!(output, "- P{}: {:.2}", percentile.p, percentile.value);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Distribution");
    if analytics.risk.total == 0 {
        let _ = writeln!(output, "No students with a pass probability on file.");
    } else {
        let risk = &analytics.risk;
        let _ = writeln!(
            output,
            "- Critical: {} ({}%)",
            risk.critical.count, risk.critical.percentage
        );
        let _ = writeln!(output, "- High: {} ({}%)", risk.high.count, risk.high.percentage);
        let _ = writeln!(
            output,
            "- Medium: {} ({}%)",
            risk.medium.count, risk.medium.percentage
        );
        let _ = writeln!(output, "- Low: {} ({}%)", risk.low.count, risk.low.percentage);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Predictions");
    let predictions = &analytics.predictions;
    if predictions.active_students == 0 {
        let _ = writeln!(output, "No active students in scope.");
    } else {
        let _ = writeln!(
            output,
            "- {} active students: {} projected to pass, {} at risk",
            predictions.active_students, predictions.projected_pass, predictions.at_risk
        );
        let _ = writeln!(
            output,
            "- {} borderline, {} with high confidence",
            predictions.borderline, predictions.high_confidence
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Behavioral Patterns");
    let patterns = &analytics.patterns;
    if patterns.students_analyzed == 0 {
        let _ = writeln!(output, "Not enough result history for pattern analysis.");
    } else {
        let _ = writeln!(
            output,
            "Across {} students with enough history: fatigue {:.0}%, rushing {:.0}%, abandonment {:.0}%.",
            patterns.students_analyzed,
            patterns.fatigue_pct,
            patterns.rushing_pct,
            patterns.abandonment_pct
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Fastest-Moving Students");
    if analytics.trends.is_empty() {
        let _ = writeln!(output, "No students with three or more results.");
    } else {
        for row in analytics.trends.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}) {} with slope {:+.2} over {} exams (ELO {:+})",
                row.full_name,
                row.cohort,
                row.direction,
                row.slope,
                row.results_count,
                row.elo_change
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Topic Insights");
    if analytics.topics.insights.is_empty() {
        let _ = writeln!(output, "No topic insights for this window.");
    } else {
        for insight in &analytics.topics.insights {
            let _ = writeln!(
                output,
                "- [{:?}] {}: {} ({})",
                insight.severity, insight.title, insight.message, insight.action
            );
        }
    }

    output
}
