use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod analytics;
mod config;
mod db;
mod domain;
mod models;
mod patterns;
mod report;
mod stats;
mod topics;

use analytics::{AnalyticsEngine, CohortAnalytics, StudentAnalysis};
use config::AnalyticsConfig;
use models::{ExamResult, Simulation, Student};
use topics::TopicAnalysis;

#[derive(Parser)]
#[command(name = "exam-cohort-analytics")]
#[command(about = "Cohort analytics for simulated-exam preparation tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import exam results from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Run the full analytics pass and print the cohort summary
    #[command(group(
        ArgGroup::new("scope")
            .args(["cohort", "email"])
            .multiple(false)
    ))]
    Analyze {
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value_t = 90)]
        since_days: i64,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Analyze a single student in depth
    Student {
        #[arg(long)]
        email: String,
        #[arg(long, default_value_t = 90)]
        since_days: i64,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Weak-topic analysis across simulations
    Topics {
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long, default_value_t = 90)]
        since_days: i64,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Generate a markdown report
    #[command(group(
        ArgGroup::new("scope")
            .args(["cohort", "email"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value_t = 90)]
        since_days: i64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} results from {}.", csv.display());
        }
        Commands::Analyze {
            cohort,
            email,
            since_days,
            json,
            config,
        } => {
            let engine = AnalyticsEngine::new(load_config(config.as_deref())?);
            let (students, results, simulations) =
                fetch_snapshot(&pool, cohort.as_deref(), email.as_deref(), since_days).await?;
            let analytics = engine.run(&students, &results, &simulations);
            if json {
                println!("{}", serde_json::to_string_pretty(&analytics)?);
            } else {
                print_summary(&analytics);
            }
        }
        Commands::Student {
            email,
            since_days,
            json,
            config,
        } => {
            let engine = AnalyticsEngine::new(load_config(config.as_deref())?);
            // population-wide scores are needed for percentile and z-score
            let (students, results, _) = fetch_snapshot(&pool, None, None, since_days).await?;
            let student = students
                .iter()
                .find(|s| s.email == email)
                .with_context(|| format!("no student with email {email}"))?;
            let own: Vec<ExamResult> = results
                .iter()
                .filter(|r| r.user_id == student.id)
                .cloned()
                .collect();
            let all_scores: Vec<f64> = results.iter().map(|r| r.score).collect();
            let analysis = engine.analyze_student(student, &own, &all_scores);
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print_student(&analysis);
            }
        }
        Commands::Topics {
            cohort,
            since_days,
            json,
            config,
        } => {
            let engine = AnalyticsEngine::new(load_config(config.as_deref())?);
            let (students, results, simulations) =
                fetch_snapshot(&pool, cohort.as_deref(), None, since_days).await?;
            let analysis = engine.topic_analysis(&results, &students, &simulations);
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print_topics(&analysis);
            }
        }
        Commands::Report {
            cohort,
            email,
            since_days,
            out,
            config,
        } => {
            let engine = AnalyticsEngine::new(load_config(config.as_deref())?);
            let (students, results, simulations) =
                fetch_snapshot(&pool, cohort.as_deref(), email.as_deref(), since_days).await?;
            let analytics = engine.run(&students, &results, &simulations);
            let scope = cohort.as_deref().or(email.as_deref());
            let cutoff = db::window_start(since_days).date_naive();
            let report = report::build_report(scope, since_days, cutoff, &analytics);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<AnalyticsConfig> {
    match path {
        Some(path) => AnalyticsConfig::from_file(path),
        None => Ok(AnalyticsConfig::default()),
    }
}

/// One snapshot for the analytics pass. A failing simulations fetch only
/// degrades topic analysis, so it is downgraded to a warning.
async fn fetch_snapshot(
    pool: &PgPool,
    cohort: Option<&str>,
    email: Option<&str>,
    since_days: i64,
) -> anyhow::Result<(Vec<Student>, Vec<ExamResult>, Vec<Simulation>)> {
    let since = db::window_start(since_days);
    let students = db::fetch_students(pool, cohort, email).await?;
    let results = db::fetch_results(pool, since, cohort, email).await?;
    let simulations = match db::fetch_simulations(pool).await {
        Ok(simulations) => simulations,
        Err(error) => {
            eprintln!("warning: failed to fetch simulations ({error}); topic analysis will be empty");
            Vec::new()
        }
    };
    Ok((students, results, simulations))
}

fn print_summary(analytics: &CohortAnalytics) {
    let global = &analytics.global;
    println!("Global statistics:");
    println!(
        "- {} results from {} students (participation {:.0}%)",
        global.results_count,
        global.unique_submitters,
        global.participation_rate * 100.0
    );
    println!(
        "- Mean score {:.2}, distance to cutoff {:+.2}",
        global.scores.mean, global.cutoff_distance
    );

    let risk = &analytics.risk;
    println!("Risk distribution ({} students):", risk.total);
    println!("- critical {} ({}%)", risk.critical.count, risk.critical.percentage);
    println!("- high {} ({}%)", risk.high.count, risk.high.percentage);
    println!("- medium {} ({}%)", risk.medium.count, risk.medium.percentage);
    println!("- low {} ({}%)", risk.low.count, risk.low.percentage);

    let predictions = &analytics.predictions;
    println!(
        "Predictions: {} active, {} projected to pass, {} at risk, {} borderline, {} high confidence",
        predictions.active_students,
        predictions.projected_pass,
        predictions.at_risk,
        predictions.borderline,
        predictions.high_confidence
    );

    let patterns = &analytics.patterns;
    println!(
        "Patterns across {} students: fatigue {:.0}%, rushing {:.0}%, abandonment {:.0}%",
        patterns.students_analyzed,
        patterns.fatigue_pct,
        patterns.rushing_pct,
        patterns.abandonment_pct
    );

    if analytics.trends.is_empty() {
        println!("No students with three or more results.");
    } else {
        println!("Fastest-moving students:");
        for row in analytics.trends.iter().take(10) {
            println!(
                "- {} ({}) {} slope {:+.2} over {} exams",
                row.full_name, row.cohort, row.direction, row.slope, row.results_count
            );
        }
    }
}

fn print_student(analysis: &StudentAnalysis) {
    println!("{} ({})", analysis.full_name, analysis.cohort);
    println!(
        "- {} simulations, average {:.2}, weighted {:.2}, consistency {:.2}",
        analysis.simulations_taken,
        analysis.average_score,
        analysis.weighted_average,
        analysis.consistency
    );
    println!(
        "- Percentile {} (z {:+.2}), pass probability {}%, risk {} (score {})",
        analysis.percentile,
        analysis.z_score,
        analysis.probability_pass,
        analysis.risk_level,
        analysis.risk_score
    );
    println!(
        "- Trend {} (slope {:+.2}), recent form {:.2}, projected next score {:.2}",
        analysis.trend_direction,
        analysis.trend_slope,
        analysis.recent_form,
        analysis.projected_next_score
    );
    println!(
        "- Estimated national position {} (P{:.1})",
        analysis.national.position, analysis.national.percentile
    );
    if analysis.patterns.has_enough_data {
        println!("- {}", analysis.patterns.summary);
    } else {
        println!("- Not enough results for pattern analysis.");
    }
    for recommendation in &analysis.recommendations {
        println!(
            "- [{:?}] {}: {}",
            recommendation.priority, recommendation.area, recommendation.message
        );
    }
}

fn print_topics(analysis: &TopicAnalysis) {
    if analysis.by_simulation.is_empty() {
        println!("No topic reports in this window.");
        return;
    }
    println!("Weak topics by simulation:");
    for sim in &analysis.by_simulation {
        println!("- Week {} ({} respondents):", sim.week_number, sim.respondents);
        for topic in &sim.topics {
            println!(
                "  - {} {}/{} ({:.0}%){}",
                topic.topic,
                topic.count,
                sim.respondents,
                topic.percentage,
                if topic.critical { " [critical]" } else { "" }
            );
        }
    }

    let moving: Vec<_> = analysis
        .global_trends
        .iter()
        .filter(|t| t.shift != topics::TrendShift::Stable)
        .collect();
    if !moving.is_empty() {
        println!("Topic trends:");
        for trend in moving {
            println!(
                "- {} {} ({:.0}% -> {:.0}% between half-terms)",
                trend.topic,
                trend.shift.as_str(),
                trend.first_half_avg,
                trend.second_half_avg
            );
        }
    }

    if !analysis.correlations.is_empty() {
        println!("Highest score impact:");
        for impact in analysis.correlations.iter().take(5) {
            println!(
                "- {} affects {} students: {:.2} vs {:.2} ({:+.2} points, r {:.2})",
                impact.topic,
                impact.students_affected,
                impact.avg_score_with,
                impact.avg_score_without,
                impact.score_impact,
                impact.correlation
            );
        }
    }

    for insight in &analysis.insights {
        println!(
            "- [{:?}] {}: {} ({})",
            insight.severity, insight.title, insight.message, insight.action
        );
    }
}
