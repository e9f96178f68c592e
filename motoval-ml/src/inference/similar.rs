//! Nearest listings of the same brand in the cleaned dataset.

use crate::data::frame::{Cell, Frame};
use crate::data::schema::columns;
use crate::error::MlError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarQuery {
    pub brand: String,
    pub model_year: f64,
    pub kms_driven: f64,
    pub cc: f64,
}

/// One row of the cleaned dataset, reduced to the fields shown to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarListing {
    pub model_year: Option<f64>,
    pub brand: String,
    pub model_name: Option<String>,
    pub kms_driven: Option<f64>,
    pub mileage: Option<f64>,
    pub cc: Option<f64>,
    pub price: Option<f64>,
}

/// Up to `k` listings whose brand matches `query.brand` case-insensitively.
///
/// Ordered by absolute year difference, then kms difference, then cc
/// difference. Rows with a missing value sort after rows without one at the
/// same tier; remaining ties keep dataset order.
pub fn find_similar(
    frame: &Frame,
    query: &SimilarQuery,
    k: usize,
) -> Result<Vec<SimilarListing>, MlError> {
    let brand_idx = frame.require_column(columns::BRAND)?;
    let year_idx = frame.column_index(columns::MODEL_YEAR);
    let kms_idx = frame.column_index(columns::KMS_DRIVEN);
    let cc_idx = frame.column_index(columns::CC);
    let wanted = query.brand.to_lowercase();

    let number = |row: &[Cell], idx: Option<usize>| idx.and_then(|i| row[i].to_number());
    let distance = |value: Option<f64>, target: f64| value.map(|v| (v - target).abs());

    let mut matches: Vec<(usize, [Option<f64>; 3])> = frame
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            row[brand_idx]
                .to_text()
                .is_some_and(|b| b.to_lowercase() == wanted)
        })
        .map(|(i, row)| {
            let key = [
                distance(number(row, year_idx), query.model_year),
                distance(number(row, kms_idx), query.kms_driven),
                distance(number(row, cc_idx), query.cc),
            ];
            (i, key)
        })
        .collect();

    matches.sort_by(|a, b| compare_keys(&a.1, &b.1));
    matches.truncate(k);

    let text = |row: &[Cell], name: &str| {
        frame
            .column_index(name)
            .and_then(|i| row[i].to_text())
    };
    let listings = matches
        .into_iter()
        .map(|(i, _)| {
            let row = &frame.rows()[i];
            SimilarListing {
                model_year: number(row, year_idx),
                brand: row[brand_idx].to_text().unwrap_or_default(),
                model_name: text(row, columns::MODEL_NAME),
                kms_driven: number(row, kms_idx),
                mileage: number(row, frame.column_index(columns::MILEAGE)),
                cc: number(row, cc_idx),
                price: number(row, frame.column_index(columns::PRICE)),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(brand = %query.brand, found = listings.len(), "similar listings");
    Ok(listings)
}

fn compare_keys(a: &[Option<f64>; 3], b: &[Option<f64>; 3]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => x.total_cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame() -> Frame {
        let mut frame = Frame::from_reader(
            concat!(
                "model_name,model_year,kms_driven,mileage,price,cc,brand\n",
                "Bajaj Pulsar 150cc,2018,20000,45,60000,150,Bajaj\n",
                "Bajaj Pulsar 220cc,2018,20000,40,80000,220,Bajaj\n",
                "Bajaj Avenger 160cc,2019,5000,42,70000,160,bajaj\n",
                "Bajaj Platina,2018,,70,30000,,Bajaj\n",
                "Honda Shine 125cc,2018,20000,60,45000,125,Honda\n",
                "Bajaj CT100 100cc,2010,90000,80,15000,100,Bajaj\n",
            )
            .as_bytes(),
        )
        .unwrap();
        frame.infer_types();
        frame
    }

    fn query() -> SimilarQuery {
        SimilarQuery {
            brand: "BAJAJ".into(),
            model_year: 2018.0,
            kms_driven: 20000.0,
            cc: 150.0,
        }
    }

    #[test]
    fn test_ranks_by_year_then_kms_then_cc() {
        let found = find_similar(&frame(), &query(), 5).unwrap();
        let names: Vec<_> = found.iter().filter_map(|l| l.model_name.clone()).collect();
        assert_eq!(
            names,
            vec![
                "Bajaj Pulsar 150cc",
                "Bajaj Pulsar 220cc",
                "Bajaj Platina",
                "Bajaj Avenger 160cc",
                "Bajaj CT100 100cc",
            ]
        );
        assert_eq!(found[0].price, Some(60000.0));
        assert_eq!(found[2].kms_driven, None);
    }

    #[test]
    fn test_brand_filter_and_limit() {
        let found = find_similar(&frame(), &query(), 2).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|l| l.brand.eq_ignore_ascii_case("bajaj")));

        let none = SimilarQuery {
            brand: "KTM".into(),
            ..query()
        };
        assert!(find_similar(&frame(), &none, 5).unwrap().is_empty());
    }

    #[test]
    fn test_requires_brand_column() {
        let frame = Frame::from_reader("model_name,price\nx,1\n".as_bytes()).unwrap();
        assert!(find_similar(&frame, &query(), 5).is_err());
    }
}
