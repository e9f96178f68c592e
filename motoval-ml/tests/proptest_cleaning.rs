//! Property-based tests for the listing cleaner using proptest.

use proptest::prelude::*;

use motoval_ml::data::clean::{extract_cc, parse_kms_driven, parse_mileage, parse_power};
use motoval_ml::data::columns;
use motoval_ml::{Cleaner, Frame};

const HEADER: &str = "model_name,model_year,kms_driven,owner,location,mileage,power,price";

fn listing() -> impl Strategy<Value = String> {
    (
        "(Bajaj|Honda|Yamaha|TVS)",
        "[A-Z][a-z]{2,6}",
        prop_oneof!["[1-9][0-9]{1,2}cc", Just(String::new())],
        prop_oneof!["20[01][0-9]", Just(String::new())],
        prop_oneof!["[1-9][0-9]{2,4} km", Just(String::new()), Just("n/a".to_string())],
        prop_oneof!["[1-9][0-9] kmpl", Just(String::new()), Just("unknown".to_string())],
        prop_oneof!["[1-9][0-9] bhp", Just(String::new()), Just("--".to_string())],
        prop_oneof!["[1-9][0-9]{4,5}", Just(String::new())],
    )
        .prop_map(|(brand, model, cc, year, kms, mileage, power, price)| {
            format!("{brand} {model} {cc},{year},{kms},first owner,delhi,{mileage},{power},{price}")
        })
}

fn frame_from(rows: &[String]) -> Frame {
    let csv = format!("{HEADER}\n{}\n", rows.join("\n"));
    Frame::from_reader(csv.as_bytes()).unwrap()
}

fn column_has_value(rows: &[String], field: usize, parse: fn(&str) -> Option<f64>) -> bool {
    rows.iter()
        .filter_map(|r| r.split(',').nth(field))
        .any(|f| parse(f).is_some())
}

// --- Field parser properties ---

proptest! {
    #[test]
    fn cc_is_extracted_with_or_without_space(n in 0u32..100_000, space in any::<bool>()) {
        let sep = if space { " " } else { "" };
        let name = format!("Bajaj Pulsar {n}{sep}CC");
        prop_assert_eq!(extract_cc(&name), Some(n));
    }

    #[test]
    fn names_without_cc_have_no_displacement(name in "[A-Za-z ]{0,30}") {
        prop_assume!(!name.to_lowercase().contains("cc"));
        prop_assert_eq!(extract_cc(&name), None);
    }

    #[test]
    fn kms_with_thousands_separator_parse(thousands in 1u32..1000, rest in 0u32..1000) {
        let raw = format!("{thousands},{rest:03} km");
        prop_assert_eq!(parse_kms_driven(&raw), Some(f64::from(thousands * 1000 + rest)));
    }

    #[test]
    fn mileage_unit_is_stripped(value in 1u32..200) {
        prop_assert_eq!(parse_mileage(&format!("{value} kmpl")), Some(f64::from(value)));
        prop_assert_eq!(parse_mileage(&format!("{value} KMPL")), Some(f64::from(value)));
    }
}

// --- Cleaner invariants ---

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cleaned_rows_always_have_a_price(rows in prop::collection::vec(listing(), 1..30)) {
        let (cleaned, report) = Cleaner::default().clean(frame_from(&rows)).unwrap();
        let price = cleaned.column_index(columns::PRICE).unwrap();
        prop_assert!(cleaned.column_values(price).all(|c| c.to_number().is_some()));
        prop_assert_eq!(
            report.input_rows,
            report.duplicates_removed + report.missing_price_dropped + report.output_rows
        );
    }

    #[test]
    fn imputed_columns_have_no_gaps(rows in prop::collection::vec(listing(), 1..30)) {
        let (cleaned, _) = Cleaner::default().clean(frame_from(&rows)).unwrap();
        let checks: [(&str, usize, fn(&str) -> Option<f64>); 3] = [
            (columns::KMS_DRIVEN, 2, parse_kms_driven),
            (columns::MILEAGE, 5, parse_mileage),
            (columns::POWER, 6, parse_power),
        ];
        for (column, field, parse) in checks {
            if column_has_value(&rows, field, parse) {
                let idx = cleaned.column_index(column).unwrap();
                prop_assert!(
                    cleaned.column_values(idx).all(|c| !c.is_missing()),
                    "{} has gaps", column
                );
            }
        }
    }

    #[test]
    fn duplicated_input_cleans_identically(rows in prop::collection::vec(listing(), 1..20)) {
        let mut doubled = rows.clone();
        doubled.extend(rows.iter().cloned());

        let (once, _) = Cleaner::default().clean(frame_from(&rows)).unwrap();
        let (twice, report) = Cleaner::default().clean(frame_from(&doubled)).unwrap();
        prop_assert!(report.duplicates_removed >= rows.len());
        prop_assert_eq!(once.to_csv_bytes().unwrap(), twice.to_csv_bytes().unwrap());
    }
}
