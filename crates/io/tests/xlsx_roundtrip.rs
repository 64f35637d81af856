// Generated workbooks read back with calamine.

use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::NaiveDate;
use tempfile::tempdir;

use finmodel_config::Settings;
use finmodel_core::SheetKind;
use finmodel_engine::ModelRequest;
use finmodel_io::{generate_financial_model_on, ExportError, GenerateError};

const REQUEST: &str = r#"{
    "company_name": "Roundtrip Industries",
    "model_structure": {"forecast_years": 5},
    "industry_info": {"industry_name": "Manufacturing", "model_type": "DCF"}
}"#;

fn generate(path: &std::path::Path) -> Result<std::path::PathBuf, GenerateError> {
    let request = ModelRequest::from_json(REQUEST).unwrap();
    let date = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
    generate_financial_model_on(&request, &Settings::default(), path, date)
}

fn open(path: &std::path::Path) -> Xlsx<std::io::BufReader<std::fs::File>> {
    open_workbook(path).unwrap()
}

#[test]
fn creates_parent_directories_and_returns_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobs").join("42").join("model.xlsx");
    let saved = generate(&path).unwrap();
    assert_eq!(saved, path);
    assert!(path.is_file());
}

#[test]
fn sheets_are_in_workbook_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    generate(&path).unwrap();

    let workbook = open(&path);
    let expected: Vec<String> = SheetKind::ORDER.iter().map(|k| k.name().to_string()).collect();
    assert_eq!(workbook.sheet_names(), expected);
}

#[test]
fn assumption_names_are_defined() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    generate(&path).unwrap();

    let workbook = open(&path);
    let names = workbook.defined_names();
    assert_eq!(names.len(), 33);
    assert!(names
        .iter()
        .any(|(name, formula)| name == "Revenue_Growth" && formula.ends_with("Assumptions!$C$8")));
    assert!(names.iter().any(|(name, _)| name == "Tax_Rate"));
    assert!(names.iter().any(|(name, _)| name == "Cost_Of_Equity"));
}

#[test]
fn formulas_are_live_with_cached_results() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    generate(&path).unwrap();

    let mut workbook = open(&path);
    let formulas = workbook.worksheet_formula("Income_Statement").unwrap();
    assert_eq!(
        formulas.get_value((5, 3)).map(String::as_str),
        Some("C6*(1+Assumptions!$C$8)")
    );

    let values = workbook.worksheet_range("Income_Statement").unwrap();
    assert_eq!(values.get_value((5, 2)), Some(&Data::Float(10_000.0)));
    match values.get_value((5, 4)) {
        Some(Data::Float(v)) => assert!((v - 12_100.0).abs() < 1e-6),
        other => panic!("unexpected cached revenue {:?}", other),
    }
}

#[test]
fn balance_check_is_cached_as_zero() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    generate(&path).unwrap();

    let mut workbook = open(&path);
    let values = workbook.worksheet_range("Balance_Sheet").unwrap();
    for col in 2..12u32 {
        match values.get_value((35, col)) {
            Some(Data::Float(v)) => assert_eq!(*v, 0.0, "column {}", col),
            Some(Data::Int(v)) => assert_eq!(*v, 0, "column {}", col),
            other => panic!("unexpected balance check {:?} in column {}", other, col),
        }
    }
}

#[test]
fn summary_carries_caption_and_navigation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.xlsx");
    generate(&path).unwrap();

    let mut workbook = open(&path);
    let summary = workbook.worksheet_range("Summary").unwrap();
    assert_eq!(
        summary.get_value((1, 1)),
        Some(&Data::String("Roundtrip Industries".into()))
    );
    assert_eq!(
        summary.get_value((8, 4)),
        Some(&Data::String("Income Statement".into()))
    );
}

#[test]
fn unwritable_directory_is_an_export_error() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let err = generate(&blocker.join("model.xlsx")).unwrap_err();
    assert!(matches!(err, GenerateError::Export(ExportError::CreateDir { .. })), "{err}");
}

#[test]
fn save_failure_is_propagated() {
    let dir = tempdir().unwrap();
    // A directory where the file should go
    let path = dir.path().join("model.xlsx");
    std::fs::create_dir(&path).unwrap();

    let err = generate(&path).unwrap_err();
    assert!(matches!(err, GenerateError::Export(ExportError::Save { .. })), "{err}");
}
