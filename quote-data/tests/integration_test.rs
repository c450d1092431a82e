//! End-to-end tests: import files, edit through a session, persist in SQLite.

use pretty_assertions::assert_eq;
use quote_core::db::{DbConfig, RepositoryFactory};
use quote_core::{
    CalculatorRepository, CalculatorSession, Change, DefaultSettings, EntryField, EntryId,
    FieldUpdate, NewCalculator, SaveState, SequentialIdGenerator,
};
use quote_data::{EntryImportError, EntryImporter, export};
use quote_db_sqlite::SqliteRepositoryFactory;
use rust_decimal_macros::dec;

const SAMPLE_CSV: &str = include_str!("../test-data/sample_quote.csv");
const SAMPLE_JSON: &str = include_str!("../test-data/sample_quote.json");
const INVALID_CSV: &str = include_str!("../test-data/invalid_number.csv");

async fn setup_repo() -> Box<dyn CalculatorRepository> {
    SqliteRepositoryFactory
        .create(&DbConfig::sqlite(":memory:"))
        .await
        .expect("Failed to open in-memory database")
}

fn session() -> CalculatorSession {
    CalculatorSession::with_id_generator(DefaultSettings::default(), SequentialIdGenerator::new("t"))
}

#[test]
fn csv_sample_prices_like_the_reference_quote() {
    let entries =
        EntryImporter::parse_csv(SAMPLE_CSV.as_bytes(), &SequentialIdGenerator::new("r")).unwrap();
    let mut session = session();

    let _ = session.replace_entries(entries);

    let summary = session.summary();
    assert_eq!(summary.total_sum, dec!(8045.00));
    assert_eq!(summary.fortjeneste, dec!(645.00));
    assert_eq!(summary.bidrag, dec!(8.02));
    assert_eq!(summary.timer_totalt, dec!(7));
    assert_eq!(summary.total_kostpris_timer, dec!(4900.00));

    let sums: Vec<_> = session.entries().iter().map(|e| e.sum).collect();
    assert_eq!(sums, vec![dec!(2195.00), dec!(5850.00), dec!(0.00)]);
}

#[test]
fn json_sample_is_recalculated_on_load() {
    let entries = EntryImporter::parse_json(SAMPLE_JSON.as_bytes()).unwrap();
    let mut session = session();

    let _ = session.replace_entries(entries);

    assert_eq!(session.summary().total_sum, dec!(8045.00));
    let first = session
        .entries()
        .get(&EntryId::new("f3a1c1de-0001-4000-8000-000000000001"))
        .unwrap();
    assert_eq!(first.enhetspris, dec!(2195.00));
}

#[test]
fn invalid_csv_reports_the_row() {
    let err = EntryImporter::parse_csv(INVALID_CSV.as_bytes(), &SequentialIdGenerator::new("r"))
        .unwrap_err();

    assert!(matches!(err, EntryImportError::InvalidValue { row: 2, .. }));
    assert!(err.to_string().starts_with("Row 2:"));
}

#[tokio::test]
async fn import_edit_save_and_reload() {
    let repo = setup_repo().await;
    let calculator = repo
        .create_calculator(NewCalculator {
            name: "Bad, Storgata 1".to_string(),
        })
        .await
        .unwrap();

    let mut session = CalculatorSession::with_id_generator(
        repo.get_default_settings().await.unwrap(),
        SequentialIdGenerator::new("t"),
    );
    session.load(calculator.snapshot());
    let _ = session.replace_entries(EntryImporter::parse_json(SAMPLE_JSON.as_bytes()).unwrap());
    assert_eq!(session.state(), SaveState::Dirty);

    session.save(repo.as_ref(), calculator.id).await.unwrap();
    assert_eq!(session.state(), SaveState::Clean);

    // Edit: one more hour on the first row, then duplicate it.
    let first = EntryId::new("f3a1c1de-0001-4000-8000-000000000001");
    let update = FieldUpdate::parse(EntryField::Timer, "2").unwrap();
    assert_eq!(session.update_field(&first, update), Change::Modified);
    let copy = session.duplicate_entry(&first).unwrap();
    session.save(repo.as_ref(), calculator.id).await.unwrap();

    let reloaded = repo.get_calculator(calculator.id).await.unwrap();
    let mut fresh = session_from(&reloaded);
    assert!(!fresh.is_dirty());
    assert_eq!(fresh.snapshot(), session.snapshot());
    assert_eq!(fresh.entries().position(&copy), Some(1));
    // 2 * (1200 + 1990) = 6380 plus the 5850 row.
    assert_eq!(fresh.summary().total_sum, dec!(12230.00));

    let _ = fresh.move_down(&copy);
    assert!(fresh.is_dirty());
}

fn session_from(calculator: &quote_core::Calculator) -> CalculatorSession {
    let mut session = session();
    session.load(calculator.snapshot());
    session
}

#[tokio::test]
async fn exported_json_reimports_identically() {
    let repo = setup_repo().await;
    let calculator = repo
        .create_calculator(NewCalculator {
            name: "Eksport".to_string(),
        })
        .await
        .unwrap();
    let mut session = session();
    let _ = session.replace_entries(
        EntryImporter::parse_csv(SAMPLE_CSV.as_bytes(), &SequentialIdGenerator::new("r")).unwrap(),
    );
    session.save(repo.as_ref(), calculator.id).await.unwrap();

    let stored = repo.get_calculator(calculator.id).await.unwrap().snapshot();
    let json = export::to_json(&stored).unwrap();
    let reimported = EntryImporter::parse_json(json.as_bytes()).unwrap();

    assert_eq!(reimported, stored.entries);
}

#[tokio::test]
async fn saving_a_deleted_calculator_fails_and_stays_dirty() {
    let repo = setup_repo().await;
    let calculator = repo
        .create_calculator(NewCalculator {
            name: "Slettes".to_string(),
        })
        .await
        .unwrap();
    let mut session = session_from(&calculator);
    session.add_entry();
    repo.delete_calculator(calculator.id).await.unwrap();

    let result = session.save(repo.as_ref(), calculator.id).await;

    assert_eq!(result, Err(quote_core::RepositoryError::NotFound));
    assert_eq!(session.state(), SaveState::SaveFailed);
    assert!(session.is_dirty());
}
