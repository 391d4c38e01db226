use std::fs;
use std::path::{Path, PathBuf};

use landings_monthly::ingestion::TextEncoding;
use landings_monthly::pipeline::{run_bytes, run_file, run_files, FormatProfile, Orientation, PipelineOptions};
use landings_monthly::processing::roles::Role;
use landings_monthly::{IngestionError, MonthlyRecord, PipelineStage};

fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn utf16le_with_bom(s: &str) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFE];
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

fn keys(records: &[MonthlyRecord]) -> Vec<(i32, u32)> {
    records.iter().map(MonthlyRecord::key).collect()
}

const WIDE: &str = "\
;2023;2024
Måned;Rundvekt (tonn);Rundvekt (tonn)
Januar;1 000,5;2 000
Februar;10;-
";

#[test]
fn only_final_documents_are_summed() {
    let text = "Landingsdato;Dokumenttype (kode);Rundvekt;Førstehandsverdi (NOK)\n\
                05.01.2024;0;100;1 000,00\n\
                20.01.2024;0;200;2 000,00\n\
                25.01.2024;1;300;3 000,00\n";
    let s = run_bytes(
        text.as_bytes(),
        "landings.csv",
        &FormatProfile::domestic_landings(),
        &PipelineOptions::default(),
    )
    .unwrap();

    assert_eq!(
        s.records,
        vec![MonthlyRecord {
            year: 2024,
            month: 1,
            quantity_tonnes: 300.0,
            value_currency: 3000.0,
            row_count: 2,
        }]
    );
}

#[test]
fn two_row_wide_sheet_becomes_four_months() {
    let s = run_bytes(
        WIDE.as_bytes(),
        "wide.csv",
        &FormatProfile::monthly_wide(),
        &PipelineOptions::default(),
    )
    .unwrap();

    assert_eq!(s.stats.orientation, Some(Orientation::Wide));
    assert_eq!(keys(&s.records), vec![(2023, 1), (2023, 2), (2024, 1), (2024, 2)]);
    let q: Vec<f64> = s.records.iter().map(|r| r.quantity_tonnes).collect();
    assert_eq!(q, vec![1000.5, 10.0, 2000.0, 0.0]);
    assert!(s.records.iter().all(|r| r.value_currency == 0.0 && r.row_count == 1));
}

#[test]
fn leaked_legend_rows_never_reach_the_output() {
    let text = format!("{WIDE}Måned;Rundvekt (tonn);Rundvekt (tonn)\nSum;1;2\n");
    let s = run_bytes(
        text.as_bytes(),
        "wide.csv",
        &FormatProfile::monthly_wide(),
        &PipelineOptions::default(),
    )
    .unwrap();

    assert_eq!(s.records.len(), 4);
    assert_eq!(s.stats.dropped_legend, 2);
    assert_eq!(s.stats.dropped_unknown_month, 2);
}

#[test]
fn utf16_semicolon_file_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "utf16.csv",
        &utf16le_with_bom("Landingsdato;Rundvekt\r\n2024-06-01;1,25\r\n2024-06-30;2,75\r\n"),
    );

    let s = run_file(&path, &FormatProfile::foreign_landings(), &PipelineOptions::default()).unwrap();
    assert_eq!(s.encoding, TextEncoding::Utf16);
    assert_eq!(s.delimiter, b';');
    assert_eq!(s.records.len(), 1);
    assert_eq!(s.records[0].quantity_tonnes, 4.0);
    assert_eq!(s.records[0].row_count, 2);
}

#[test]
fn latin1_file_falls_through_to_windows_1252() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "latin1.csv",
        b"Landingsdato,Rundvekt,F\xF8rstehandsverdi\n2024-02-01,1.5,10\n",
    );

    let s = run_file(&path, &FormatProfile::foreign_landings(), &PipelineOptions::default()).unwrap();
    assert_eq!(s.encoding, TextEncoding::Windows1252);
    assert_eq!(s.delimiter, b',');
    assert_eq!(s.records[0].value_currency, 10.0);
}

#[test]
fn missing_role_names_the_role_and_stage() {
    let err = run_bytes(
        b"foo;bar\n1;2\n",
        "odd.csv",
        &FormatProfile::domestic_landings(),
        &PipelineOptions::default(),
    )
    .unwrap_err();

    match err {
        IngestionError::RequiredColumnMissing {
            role, stage, available, ..
        } => {
            assert_eq!(role, Role::Date);
            assert_eq!(stage, PipelineStage::ResolveRoles);
            assert_eq!(available, vec!["foo".to_string(), "bar".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn bad_wide_cell_reports_row_and_year_column() {
    let text = "Måned;2024\nJanuar;12,5\nFebruar;n/a\n";
    let err = run_bytes(
        text.as_bytes(),
        "wide.csv",
        &FormatProfile {
            orientation: None,
            ..FormatProfile::domestic_landings()
        },
        &PipelineOptions::default(),
    )
    .unwrap_err();

    match err {
        IngestionError::NumericParse {
            stage, row, column, raw, ..
        } => {
            assert_eq!(stage, PipelineStage::Reshape);
            assert_eq!(row, 2);
            assert_eq!(column, "2024");
            assert_eq!(raw, "n/a");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn run_files_keeps_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<PathBuf> = (1..=6)
        .map(|m| {
            write(
                dir.path(),
                &format!("m{m}.csv"),
                format!("landingsdato;rundvekt\n2024-{m:02}-15;{m}\n").as_bytes(),
            )
        })
        .chain(std::iter::once(dir.path().join("missing.csv")))
        .collect();

    let results = run_files(&paths, &FormatProfile::foreign_landings(), &PipelineOptions::default());
    assert_eq!(results.len(), 7);
    for (i, r) in results.iter().take(6).enumerate() {
        let summary = r.as_ref().unwrap();
        assert_eq!(summary.source, paths[i]);
        assert_eq!(keys(&summary.records), vec![(2024, i as u32 + 1)]);
    }
    let err = results[6].as_ref().unwrap_err();
    assert!(matches!(err, IngestionError::InputIo { .. }), "{err}");
    assert_eq!(err.path(), Some(paths[6].as_path()));
    assert_eq!(err.stage(), Some(PipelineStage::Load));
}
