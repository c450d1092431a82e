use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quote_core::{
    Calculator, CalculatorRepository, CalculatorSnapshot, DefaultSettings, EntryId, LineItem,
    NewCalculator, RepositoryError, Summary,
};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, info};

use crate::decimal::{decimal_to_text, get_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut files: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "sql"))
            .collect();

        files.sort();

        for path in files {
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "Applied seed file");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_entries(
        &self,
        calculator_id: i64,
    ) -> Result<Vec<LineItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, post, beskrivelse, antall, kost_materiell, timer, kostpris, timepris,
                    paslag_materiell, enhetspris, sum, kommentar
             FROM calculator_entry
             WHERE calculator_id = ?
             ORDER BY position",
        )
        .bind(calculator_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_line_item).collect()
    }
}

const CALCULATOR_COLUMNS: &str = "id, name, total_sum, fortjeneste, timer_totalt, bidrag,
    total_kostpris_timer, created_at, updated_at";

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

/// Reads a calculator row without its entries.
fn row_to_calculator(row: &SqliteRow) -> Result<Calculator, RepositoryError> {
    Ok(Calculator {
        id: row.try_get("id").map_err(db_error)?,
        name: row.try_get("name").map_err(db_error)?,
        entries: Vec::new(),
        summary: row_to_summary(row)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
        updated_at: row
            .try_get::<DateTime<Utc>, _>("updated_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get updated_at: {}", e)))?,
    })
}

fn row_to_summary(row: &SqliteRow) -> Result<Summary, RepositoryError> {
    Ok(Summary {
        total_sum: get_decimal(row, "total_sum")?,
        fortjeneste: get_decimal(row, "fortjeneste")?,
        timer_totalt: get_decimal(row, "timer_totalt")?,
        bidrag: get_decimal(row, "bidrag")?,
        total_kostpris_timer: get_decimal(row, "total_kostpris_timer")?,
    })
}

fn row_to_line_item(row: &SqliteRow) -> Result<LineItem, RepositoryError> {
    Ok(LineItem {
        id: EntryId::new(row.try_get::<String, _>("id").map_err(db_error)?),
        post: row.try_get("post").map_err(db_error)?,
        beskrivelse: row.try_get("beskrivelse").map_err(db_error)?,
        antall: get_decimal(row, "antall")?,
        kost_materiell: get_decimal(row, "kost_materiell")?,
        timer: get_decimal(row, "timer")?,
        kostpris: get_decimal(row, "kostpris")?,
        timepris: get_decimal(row, "timepris")?,
        paslag_materiell: get_decimal(row, "paslag_materiell")?,
        enhetspris: get_decimal(row, "enhetspris")?,
        sum: get_decimal(row, "sum")?,
        kommentar: row.try_get("kommentar").map_err(db_error)?,
    })
}

async fn insert_entry(
    tx: &mut Transaction<'_, Sqlite>,
    calculator_id: i64,
    position: i64,
    entry: &LineItem,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO calculator_entry (
            calculator_id, position, id, post, beskrivelse, antall, kost_materiell, timer,
            kostpris, timepris, paslag_materiell, enhetspris, sum, kommentar
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(calculator_id)
    .bind(position)
    .bind(entry.id.as_str())
    .bind(&entry.post)
    .bind(&entry.beskrivelse)
    .bind(decimal_to_text(entry.antall))
    .bind(decimal_to_text(entry.kost_materiell))
    .bind(decimal_to_text(entry.timer))
    .bind(decimal_to_text(entry.kostpris))
    .bind(decimal_to_text(entry.timepris))
    .bind(decimal_to_text(entry.paslag_materiell))
    .bind(decimal_to_text(entry.enhetspris))
    .bind(decimal_to_text(entry.sum))
    .bind(&entry.kommentar)
    .execute(&mut **tx)
    .await
    .map_err(db_error)?;

    Ok(())
}

#[async_trait]
impl CalculatorRepository for SqliteRepository {
    async fn get_default_settings(&self) -> Result<DefaultSettings, RepositoryError> {
        let row = sqlx::query(
            "SELECT kostpris, timepris, paslag_materiell FROM default_settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(DefaultSettings {
            kostpris: get_decimal(&row, "kostpris")?,
            timepris: get_decimal(&row, "timepris")?,
            paslag_materiell: get_decimal(&row, "paslag_materiell")?,
        })
    }

    async fn save_default_settings(
        &self,
        settings: &DefaultSettings,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO default_settings (id, kostpris, timepris, paslag_materiell)
             VALUES (1, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                kostpris = excluded.kostpris,
                timepris = excluded.timepris,
                paslag_materiell = excluded.paslag_materiell",
        )
        .bind(decimal_to_text(settings.kostpris))
        .bind(decimal_to_text(settings.timepris))
        .bind(decimal_to_text(settings.paslag_materiell))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn create_calculator(
        &self,
        calculator: NewCalculator,
    ) -> Result<Calculator, RepositoryError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO calculator (name, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(&calculator.name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        let id = result.last_insert_rowid();
        info!(calculator_id = id, name = %calculator.name, "Created calculator");
        self.get_calculator(id).await
    }

    async fn get_calculator(&self, id: i64) -> Result<Calculator, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CALCULATOR_COLUMNS} FROM calculator WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RepositoryError::NotFound)?;

        let mut calculator = row_to_calculator(&row)?;
        calculator.entries = self.load_entries(id).await?;
        Ok(calculator)
    }

    async fn list_calculators(&self) -> Result<Vec<Calculator>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CALCULATOR_COLUMNS} FROM calculator ORDER BY updated_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut calculators = rows
            .iter()
            .map(row_to_calculator)
            .collect::<Result<Vec<_>, _>>()?;
        for calculator in &mut calculators {
            calculator.entries = self.load_entries(calculator.id).await?;
        }
        Ok(calculators)
    }

    async fn rename_calculator(
        &self,
        id: i64,
        name: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE calculator SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_calculator(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM calculator WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        info!(calculator_id = id, "Deleted calculator");
        Ok(())
    }

    async fn save_snapshot(
        &self,
        id: i64,
        snapshot: &CalculatorSnapshot,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let summary = &snapshot.summary;
        let result = sqlx::query(
            "UPDATE calculator SET
                total_sum = ?, fortjeneste = ?, timer_totalt = ?, bidrag = ?,
                total_kostpris_timer = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(decimal_to_text(summary.total_sum))
        .bind(decimal_to_text(summary.fortjeneste))
        .bind(decimal_to_text(summary.timer_totalt))
        .bind(decimal_to_text(summary.bidrag))
        .bind(decimal_to_text(summary.total_kostpris_timer))
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM calculator_entry WHERE calculator_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        for (position, entry) in (0_i64..).zip(&snapshot.entries) {
            insert_entry(&mut tx, id, position, entry).await?;
        }

        tx.commit().await.map_err(db_error)?;

        debug!(
            calculator_id = id,
            entries = snapshot.entries.len(),
            "Saved calculator snapshot"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use quote_core::calculate_row;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let repo = SqliteRepository::new_with_pool(pool).await;
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    async fn setup_seeded_db() -> SqliteRepository {
        let repo = setup_test_db().await;
        repo.run_seeds(&Path::new(env!("CARGO_MANIFEST_DIR")).join("seeds"))
            .await
            .expect("Failed to run seeds");
        repo
    }

    fn entry(
        id: &str,
        post: &str,
        kost_materiell: rust_decimal::Decimal,
        timer: rust_decimal::Decimal,
    ) -> LineItem {
        calculate_row(LineItem {
            post: post.to_string(),
            beskrivelse: format!("Beskrivelse {post}"),
            kost_materiell,
            timer,
            kommentar: "ok".to_string(),
            ..LineItem::new(EntryId::new(id), &DefaultSettings::default())
        })
    }

    fn sample_snapshot() -> CalculatorSnapshot {
        let entries = vec![
            entry("a", "1.1", dec!(1000), dec!(1)),
            entry("b", "1.2", dec!(2500), dec!(4)),
            entry("c", "1.3", dec!(0.333), dec!(0)),
        ];
        let summary = quote_core::calculate_summary(&entries);
        CalculatorSnapshot { entries, summary }
    }

    // =========================================================================
    // default settings
    // =========================================================================

    #[tokio::test]
    async fn default_settings_missing_before_seeding() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_default_settings().await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn seeds_insert_default_settings() {
        let repo = setup_seeded_db().await;

        assert_eq!(repo.get_default_settings().await, Ok(DefaultSettings::default()));
    }

    #[tokio::test]
    async fn seeding_twice_keeps_saved_settings() {
        let repo = setup_seeded_db().await;
        let custom = DefaultSettings {
            kostpris: dec!(650),
            timepris: dec!(1100.50),
            paslag_materiell: dec!(15),
        };
        repo.save_default_settings(&custom).await.unwrap();

        repo.run_seeds(&Path::new(env!("CARGO_MANIFEST_DIR")).join("seeds"))
            .await
            .unwrap();

        assert_eq!(repo.get_default_settings().await, Ok(custom));
    }

    #[tokio::test]
    async fn save_default_settings_inserts_when_absent() {
        let repo = setup_test_db().await;
        let settings = DefaultSettings::default();

        repo.save_default_settings(&settings).await.unwrap();

        assert_eq!(repo.get_default_settings().await, Ok(settings));
    }

    // =========================================================================
    // calculators
    // =========================================================================

    #[tokio::test]
    async fn create_calculator_starts_empty() {
        let repo = setup_test_db().await;

        let calculator = repo
            .create_calculator(NewCalculator {
                name: "Bad 2. etasje".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(calculator.name, "Bad 2. etasje");
        assert!(calculator.entries.is_empty());
        assert_eq!(calculator.summary, Summary::default());
        assert_eq!(repo.get_calculator(calculator.id).await, Ok(calculator));
    }

    #[tokio::test]
    async fn get_missing_calculator_is_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_calculator(42).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn list_calculators_most_recent_first() {
        let repo = setup_test_db().await;
        let first = repo
            .create_calculator(NewCalculator {
                name: "first".to_string(),
            })
            .await
            .unwrap();
        repo.create_calculator(NewCalculator {
            name: "second".to_string(),
        })
        .await
        .unwrap();

        repo.save_snapshot(first.id, &sample_snapshot()).await.unwrap();

        let names: Vec<String> = repo
            .list_calculators()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn rename_calculator() {
        let repo = setup_test_db().await;
        let calculator = repo
            .create_calculator(NewCalculator {
                name: "old".to_string(),
            })
            .await
            .unwrap();

        repo.rename_calculator(calculator.id, "new").await.unwrap();

        assert_eq!(repo.get_calculator(calculator.id).await.unwrap().name, "new");
        assert_eq!(
            repo.rename_calculator(999, "x").await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn delete_calculator_cascades_entries() {
        let repo = setup_test_db().await;
        let calculator = repo
            .create_calculator(NewCalculator {
                name: "gone".to_string(),
            })
            .await
            .unwrap();
        repo.save_snapshot(calculator.id, &sample_snapshot()).await.unwrap();

        repo.delete_calculator(calculator.id).await.unwrap();

        assert_eq!(repo.get_calculator(calculator.id).await, Err(RepositoryError::NotFound));
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM calculator_entry")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        assert_eq!(
            repo.delete_calculator(calculator.id).await,
            Err(RepositoryError::NotFound)
        );
    }

    // =========================================================================
    // save_snapshot
    // =========================================================================

    #[tokio::test]
    async fn snapshot_round_trips_in_order() {
        let repo = setup_test_db().await;
        let calculator = repo
            .create_calculator(NewCalculator {
                name: "tilbud".to_string(),
            })
            .await
            .unwrap();
        let snapshot = sample_snapshot();

        repo.save_snapshot(calculator.id, &snapshot).await.unwrap();

        let loaded = repo.get_calculator(calculator.id).await.unwrap();
        assert_eq!(loaded.snapshot(), snapshot);
        assert!(loaded.updated_at >= calculator.updated_at);
    }

    #[tokio::test]
    async fn snapshot_preserves_exact_decimals() {
        let repo = setup_test_db().await;
        let calculator = repo
            .create_calculator(NewCalculator {
                name: "presis".to_string(),
            })
            .await
            .unwrap();
        let snapshot = sample_snapshot();

        repo.save_snapshot(calculator.id, &snapshot).await.unwrap();

        let loaded = repo.get_calculator(calculator.id).await.unwrap();
        assert_eq!(loaded.entries[2].kost_materiell, dec!(0.333));
        assert_eq!(loaded.entries[2].enhetspris, dec!(0.40));
    }

    #[tokio::test]
    async fn saving_again_replaces_entries() {
        let repo = setup_test_db().await;
        let calculator = repo
            .create_calculator(NewCalculator {
                name: "tilbud".to_string(),
            })
            .await
            .unwrap();
        repo.save_snapshot(calculator.id, &sample_snapshot()).await.unwrap();

        let mut reordered = sample_snapshot();
        reordered.entries.reverse();
        reordered.entries.pop();
        reordered.summary = quote_core::calculate_summary(&reordered.entries);
        repo.save_snapshot(calculator.id, &reordered).await.unwrap();

        let loaded = repo.get_calculator(calculator.id).await.unwrap();
        let ids: Vec<&str> = loaded.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(loaded.summary, reordered.summary);
    }

    #[tokio::test]
    async fn saving_empty_snapshot_clears_entries() {
        let repo = setup_test_db().await;
        let calculator = repo
            .create_calculator(NewCalculator {
                name: "tilbud".to_string(),
            })
            .await
            .unwrap();
        repo.save_snapshot(calculator.id, &sample_snapshot()).await.unwrap();

        repo.save_snapshot(calculator.id, &CalculatorSnapshot::default())
            .await
            .unwrap();

        let loaded = repo.get_calculator(calculator.id).await.unwrap();
        assert!(loaded.entries.is_empty());
        assert_eq!(loaded.summary, Summary::default());
    }

    #[tokio::test]
    async fn save_snapshot_for_missing_calculator_is_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(
            repo.save_snapshot(7, &sample_snapshot()).await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn failed_save_leaves_previous_entries() {
        let repo = setup_test_db().await;
        let calculator = repo
            .create_calculator(NewCalculator {
                name: "tilbud".to_string(),
            })
            .await
            .unwrap();
        let original = sample_snapshot();
        repo.save_snapshot(calculator.id, &original).await.unwrap();

        // Duplicate ids violate UNIQUE (calculator_id, id) halfway through.
        let mut broken = sample_snapshot();
        broken.entries[2].id = EntryId::new("a");
        let result = repo.save_snapshot(calculator.id, &broken).await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
        assert_eq!(repo.get_calculator(calculator.id).await.unwrap().snapshot(), original);
    }
}
