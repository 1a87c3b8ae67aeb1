use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{Cohort, ExamResult, Simulation, Student, TrendDirection};

/// Start of the fetch window, `since_days` back from now.
pub fn window_start(since_days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(since_days.max(1))
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query("CREATE SCHEMA IF NOT EXISTS exam_analytics")
        .execute(pool)
        .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS exam_analytics.students (
            id UUID PRIMARY KEY,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            cohort TEXT NOT NULL DEFAULT 'unassigned',
            active BOOLEAN NOT NULL DEFAULT TRUE,
            current_elo INTEGER NOT NULL DEFAULT 1000,
            average_score DOUBLE PRECISION NOT NULL DEFAULT 0,
            probability_pass INTEGER NOT NULL DEFAULT 0,
            trend_direction TEXT NOT NULL DEFAULT 'neutral'
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS exam_analytics.simulations (
            id UUID PRIMARY KEY,
            week_number INTEGER NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'scheduled',
            start_date DATE NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS exam_analytics.exam_results (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES exam_analytics.students (id),
            simulation_id UUID NOT NULL REFERENCES exam_analytics.simulations (id),
            submitted_at TIMESTAMPTZ NOT NULL,
            score DOUBLE PRECISION NOT NULL,
            correct_answers INTEGER NOT NULL,
            wrong_answers INTEGER NOT NULL,
            blank_answers INTEGER NOT NULL,
            time_taken_seconds INTEGER NOT NULL,
            is_saturday_live BOOLEAN NOT NULL DEFAULT FALSE,
            stress_level DOUBLE PRECISION,
            confidence_score DOUBLE PRECISION,
            weakest_topics TEXT[] NOT NULL DEFAULT '{}',
            source_key TEXT UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("7c1f0a94-83d2-4f39-9e55-2b8f6d5f1a01")?,
            "Marta Ruiz",
            "marta.ruiz@academy.example",
            "36h",
            1085,
        ),
        (
            Uuid::parse_str("b1a64c02-55e1-4f77-8f0e-9d3c2a7b4402")?,
            "Iker Soto",
            "iker.soto@academy.example",
            "20h",
            940,
        ),
        (
            Uuid::parse_str("3f9d2e10-7a4b-4c66-b1d2-50e8c9aa1c03")?,
            "Lucia Navarro",
            "lucia.navarro@academy.example",
            "48h",
            1120,
        ),
        (
            Uuid::parse_str("e4b80d77-1f2c-4a90-8a6e-7cc41b3d9204")?,
            "Hugo Leon",
            "hugo.leon@academy.example",
            "20h",
            1000,
        ),
    ];

    for (id, name, email, cohort, elo) in students {
        sqlx::query(
            r#"
            INSERT INTO exam_analytics.students (id, full_name, email, cohort, current_elo)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, cohort = EXCLUDED.cohort,
                current_elo = EXCLUDED.current_elo
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(cohort)
        .bind(elo)
        .execute(pool)
        .await?;
    }

    let simulations = vec![
        (
            Uuid::parse_str("11111111-0000-4000-8000-000000000001")?,
            1,
            NaiveDate::from_ymd_opt(2026, 6, 6).context("invalid date")?,
        ),
        (
            Uuid::parse_str("11111111-0000-4000-8000-000000000002")?,
            2,
            NaiveDate::from_ymd_opt(2026, 6, 13).context("invalid date")?,
        ),
        (
            Uuid::parse_str("11111111-0000-4000-8000-000000000003")?,
            3,
            NaiveDate::from_ymd_opt(2026, 6, 20).context("invalid date")?,
        ),
    ];

    for (id, week, start_date) in &simulations {
        sqlx::query(
            r#"
            INSERT INTO exam_analytics.simulations (id, week_number, status, start_date)
            VALUES ($1, $2, 'completed', $3)
            ON CONFLICT (week_number) DO UPDATE SET start_date = EXCLUDED.start_date
            "#,
        )
        .bind(id)
        .bind(week)
        .bind(start_date)
        .execute(pool)
        .await?;
    }

    let results: Vec<(&str, &str, i32, f64, i32, i32, i32, i32, Option<f64>, Option<f64>, Vec<&str>)> = vec![
        ("seed-001", "marta.ruiz@academy.example", 1, 7.1, 74, 14, 12, 5520, Some(40.0), Some(72.0), vec!["derecho-penal"]),
        ("seed-002", "marta.ruiz@academy.example", 2, 7.4, 77, 13, 10, 5580, Some(35.0), Some(75.0), vec!["derecho-penal", "ingles"]),
        ("seed-003", "marta.ruiz@academy.example", 3, 7.8, 80, 11, 9, 5460, Some(30.0), Some(80.0), vec!["ingles"]),
        ("seed-004", "iker.soto@academy.example", 1, 5.6, 62, 24, 14, 4380, Some(70.0), Some(78.0), vec!["derecho-penal", "psicotecnicos"]),
        ("seed-005", "iker.soto@academy.example", 2, 5.1, 58, 26, 16, 4200, Some(75.0), Some(74.0), vec!["derecho-penal", "psicotecnicos"]),
        ("seed-006", "iker.soto@academy.example", 3, 4.7, 55, 28, 17, 4020, Some(80.0), Some(70.0), vec!["psicotecnicos"]),
        ("seed-007", "lucia.navarro@academy.example", 1, 8.2, 84, 8, 8, 5700, Some(25.0), Some(82.0), vec![]),
        ("seed-008", "lucia.navarro@academy.example", 2, 8.3, 85, 8, 7, 5640, Some(25.0), Some(84.0), vec!["ingles"]),
        ("seed-009", "lucia.navarro@academy.example", 3, 8.5, 86, 7, 7, 5580, Some(20.0), Some(85.0), vec![]),
        ("seed-010", "hugo.leon@academy.example", 2, 6.2, 66, 18, 16, 6480, None, None, vec!["derecho-penal"]),
        ("seed-011", "hugo.leon@academy.example", 3, 6.4, 68, 17, 15, 6540, None, None, vec!["derecho-penal"]),
    ];

    for (source_key, email, week, score, correct, wrong, blank, seconds, stress, confidence, topics) in results {
        let student_id: Uuid =
            sqlx::query("SELECT id FROM exam_analytics.students WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?
                .get("id");
        let (simulation_id, start_date) = simulations
            .iter()
            .find(|(_, w, _)| *w == week)
            .map(|(id, _, date)| (*id, *date))
            .context("seed result references unknown simulation week")?;
        let submitted_at = start_date
            .and_hms_opt(12, 0, 0)
            .context("invalid time")?
            .and_utc();
        let topics: Vec<String> = topics.into_iter().map(|t| t.to_string()).collect();

        sqlx::query(
            r#"
            INSERT INTO exam_analytics.exam_results
            (id, user_id, simulation_id, submitted_at, score, correct_answers, wrong_answers,
             blank_answers, time_taken_seconds, is_saturday_live, stress_level, confidence_score,
             weakest_topics, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, $10, $11, $12, $13)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(simulation_id)
        .bind(submitted_at)
        .bind(score)
        .bind(correct)
        .bind(wrong)
        .bind(blank)
        .bind(seconds)
        .bind(stress)
        .bind(confidence)
        .bind(&topics)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_students(
    pool: &PgPool,
    cohort: Option<&str>,
    email: Option<&str>,
) -> anyhow::Result<Vec<Student>> {
    let mut query = String::from(
        "SELECT id, full_name, email, cohort, active, current_elo, average_score, \
         probability_pass, trend_direction \
         FROM exam_analytics.students",
    );
    if cohort.is_some() {
        query.push_str(" WHERE cohort = $1");
    } else if email.is_some() {
        query.push_str(" WHERE email = $1");
    }
    query.push_str(" ORDER BY full_name");

    let mut rows = sqlx::query(&query);
    if let Some(value) = cohort {
        rows = rows.bind(value);
    } else if let Some(value) = email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut students = Vec::new();
    for row in records {
        students.push(Student {
            id: row.get("id"),
            full_name: row.get("full_name"),
            email: row.get("email"),
            cohort: Cohort::parse(row.get::<&str, _>("cohort")),
            active: row.get("active"),
            current_elo: row.get("current_elo"),
            average_score: row.get("average_score"),
            probability_pass: row.get::<i32, _>("probability_pass").clamp(0, 100) as u8,
            trend_direction: TrendDirection::parse(row.get::<&str, _>("trend_direction")),
        });
    }
    Ok(students)
}

pub async fn fetch_results(
    pool: &PgPool,
    since: DateTime<Utc>,
    cohort: Option<&str>,
    email: Option<&str>,
) -> anyhow::Result<Vec<ExamResult>> {
    let mut query = String::from(
        "SELECT r.user_id, r.simulation_id, r.submitted_at, r.score, r.correct_answers, \
         r.wrong_answers, r.blank_answers, r.time_taken_seconds, r.is_saturday_live, \
         r.stress_level, r.confidence_score, r.weakest_topics \
         FROM exam_analytics.exam_results r \
         JOIN exam_analytics.students s ON s.id = r.user_id \
         WHERE r.submitted_at >= $1",
    );
    if cohort.is_some() {
        query.push_str(" AND s.cohort = $2");
    } else if email.is_some() {
        query.push_str(" AND s.email = $2");
    }
    query.push_str(" ORDER BY r.submitted_at");

    let mut rows = sqlx::query(&query).bind(since);
    if let Some(value) = cohort {
        rows = rows.bind(value);
    } else if let Some(value) = email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut results = Vec::new();
    for row in records {
        results.push(ExamResult {
            user_id: row.get("user_id"),
            simulation_id: row.get("simulation_id"),
            submitted_at: row.get("submitted_at"),
            score: row.get("score"),
            correct_answers: row.get::<i32, _>("correct_answers").max(0) as u32,
            wrong_answers: row.get::<i32, _>("wrong_answers").max(0) as u32,
            blank_answers: row.get::<i32, _>("blank_answers").max(0) as u32,
            time_taken_seconds: row.get::<i32, _>("time_taken_seconds").max(0) as u32,
            is_saturday_live: row.get("is_saturday_live"),
            stress_level: row.get("stress_level"),
            confidence_score: row.get("confidence_score"),
            weakest_topics: row.get("weakest_topics"),
        });
    }
    Ok(results)
}

pub async fn fetch_simulations(pool: &PgPool) -> anyhow::Result<Vec<Simulation>> {
    let records = sqlx::query(
        "SELECT id, week_number, status, start_date \
         FROM exam_analytics.simulations ORDER BY week_number",
    )
    .fetch_all(pool)
    .await?;

    let mut simulations = Vec::new();
    for row in records {
        simulations.push(Simulation {
            id: row.get("id"),
            week_number: row.get("week_number"),
            status: row.get("status"),
            start_date: row.get("start_date"),
        });
    }
    Ok(simulations)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        cohort: String,
        week_number: i32,
        submitted_at: DateTime<Utc>,
        score: f64,
        correct_answers: i32,
        wrong_answers: i32,
        blank_answers: i32,
        time_taken_seconds: i32,
        is_saturday_live: Option<bool>,
        stress_level: Option<f64>,
        confidence_score: Option<f64>,
        weakest_topics: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let student_id: Uuid = sqlx::query(
            r#"
            INSERT INTO exam_analytics.students (id, full_name, email, cohort)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, cohort = EXCLUDED.cohort
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.full_name)
        .bind(&row.email)
        .bind(&row.cohort)
        .fetch_one(pool)
        .await?
        .get("id");

        let simulation_id: Uuid = sqlx::query(
            r#"
            INSERT INTO exam_analytics.simulations (id, week_number, status, start_date)
            VALUES ($1, $2, 'completed', $3)
            ON CONFLICT (week_number) DO UPDATE SET status = EXCLUDED.status
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.week_number)
        .bind(row.submitted_at.date_naive())
        .fetch_one(pool)
        .await?
        .get("id");

        let topics = parse_topic_list(row.weakest_topics.as_deref().unwrap_or(""));
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO exam_analytics.exam_results
            (id, user_id, simulation_id, submitted_at, score, correct_answers, wrong_answers,
             blank_answers, time_taken_seconds, is_saturday_live, stress_level, confidence_score,
             weakest_topics, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(simulation_id)
        .bind(row.submitted_at)
        .bind(row.score)
        .bind(row.correct_answers)
        .bind(row.wrong_answers)
        .bind(row.blank_answers)
        .bind(row.time_taken_seconds)
        .bind(row.is_saturday_live.unwrap_or(false))
        .bind(row.stress_level)
        .bind(row.confidence_score)
        .bind(&topics)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Topics arrive pipe-separated in CSV imports.
fn parse_topic_list(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_lists_split_on_pipes() {
        assert_eq!(
            parse_topic_list("derecho-penal| ingles |"),
            vec!["derecho-penal".to_string(), "ingles".to_string()]
        );
        assert!(parse_topic_list("").is_empty());
    }

    #[test]
    fn window_start_goes_back_at_least_one_day() {
        let now = Utc::now();
        assert!(window_start(0) < now);
        assert!(window_start(30) < window_start(7));
    }
}
