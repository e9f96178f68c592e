//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use motoval_core::MotovalConfig;
use motoval_ml::{
    BikeQuery, Cleaner, Frame, ModelBundle, SimilarListing, SimilarQuery, Trainer, find_similar,
};
use std::path::{Path, PathBuf};

/// Handle a CLI subcommand.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    mut config: MotovalConfig,
) -> anyhow::Result<()> {
    let resolve = |path: &Path| MotovalConfig::resolve(workspace, path);

    match command {
        Commands::Clean { input, output } => {
            let input = resolve(input.as_deref().unwrap_or(config.data.raw_path.as_path()));
            let output = resolve(output.as_deref().unwrap_or(config.data.cleaned_path.as_path()));
            handle_clean(&config, &input, &output)
        }
        Commands::Train {
            input,
            model_dir,
            seed,
            trees,
        } => {
            if let Some(seed) = seed {
                config.training.seed = seed;
            }
            if let Some(trees) = trees {
                config.training.n_estimators = trees;
            }
            let input = resolve(input.as_deref().unwrap_or(config.data.cleaned_path.as_path()));
            let model_dir = resolve(model_dir.as_deref().unwrap_or(config.model.model_dir.as_path()));
            handle_train(&config, &input, &model_dir)
        }
        Commands::Predict {
            brand,
            owner,
            location,
            year,
            kms,
            mileage,
            power,
            cc,
            segment,
            similar,
            model_dir,
        } => {
            let query = BikeQuery {
                brand,
                owner,
                location,
                model_year: year,
                kms_driven: kms,
                mileage,
                power,
                cc,
                segment,
            };
            let model_dir = resolve(model_dir.as_deref().unwrap_or(config.model.model_dir.as_path()));
            handle_predict(&config, &query, &model_dir)?;
            if similar {
                let data = resolve(&config.data.cleaned_path);
                handle_similar(&query.similar_query(), &data, config.inference.similar_top_k)?;
            }
            Ok(())
        }
        Commands::Similar {
            brand,
            year,
            kms,
            cc,
            top,
            data,
        } => {
            let query = SimilarQuery {
                brand,
                model_year: f64::from(year),
                kms_driven: kms,
                cc,
            };
            let data = resolve(data.as_deref().unwrap_or(config.data.cleaned_path.as_path()));
            handle_similar(&query, &data, top.unwrap_or(config.inference.similar_top_k))
        }
        Commands::Config { action } => handle_config(action, workspace, &config),
    }
}

fn handle_clean(config: &MotovalConfig, input: &Path, output: &Path) -> anyhow::Result<()> {
    let report = Cleaner::from_config(&config.cleaning).clean_file(input, output)?;

    println!("Cleaned {} -> {}", input.display(), output.display());
    println!(
        "  rows: {} in, {} duplicates, {} without price, {} out",
        report.input_rows, report.duplicates_removed, report.missing_price_dropped, report.output_rows
    );
    println!("  unknown cc: {}", report.unknown_cc);
    for field in &report.fields {
        println!(
            "  {}: {} unparsable, {} imputed, {} still missing",
            field.column, field.parse_failures, field.imputed, field.remaining_missing
        );
    }
    Ok(())
}

fn handle_train(config: &MotovalConfig, input: &Path, model_dir: &Path) -> anyhow::Result<()> {
    let outcome = Trainer::new(config.training.clone()).train_file(input, model_dir)?;

    println!(
        "Trained {} trees on {} rows ({} held out)",
        outcome.bundle.regressor.n_trees(),
        outcome.train_rows,
        outcome.test_rows
    );
    match &outcome.metrics {
        Some(metrics) => {
            println!("MSE: {:.2}", metrics.mse);
            match metrics.r_squared {
                Some(r2) => println!("R²: {r2:.4}"),
                None => println!("R²: undefined (held-out prices are constant)"),
            }
        }
        None => println!("MSE: n/a (too few rows to hold out a test set)"),
    }
    println!("Saved model bundle to {}", model_dir.display());
    Ok(())
}

fn handle_predict(config: &MotovalConfig, query: &BikeQuery, model_dir: &Path) -> anyhow::Result<()> {
    let input = query.to_feature_input(config.cleaning.reference_year);
    tracing::debug!(model_dir = %model_dir.display(), brand = %query.brand, "pricing listing");
    let prediction = ModelBundle::load(model_dir).and_then(|bundle| bundle.predict(&input));

    match prediction {
        Ok(prediction) => {
            println!("Estimated price: ₹{:.0}", prediction.price);
            for unseen in &prediction.unseen_categories {
                println!(
                    "  note: {} '{}' was not in the training data; priced as the baseline {}",
                    unseen.column, unseen.value, unseen.column
                );
            }
            for field in &prediction.ignored_fields {
                println!("  note: the model does not use '{field}'");
            }
            Ok(())
        }
        Err(e) => anyhow::bail!("Prediction failed: {e}"),
    }
}

fn handle_similar(query: &SimilarQuery, data: &Path, top: usize) -> anyhow::Result<()> {
    let frame = Frame::read_csv_typed(data)?;
    let listings = find_similar(&frame, query, top)?;

    if listings.is_empty() {
        println!("No listings found for brand '{}'.", query.brand);
        return Ok(());
    }
    println!("Similar bikes ({}):", listings.len());
    for listing in &listings {
        println!("  {}", format_listing(listing));
    }
    Ok(())
}

fn format_listing(listing: &SimilarListing) -> String {
    let num = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.0}"));
    format!(
        "{} | {} | {} km | {} kmpl | {} cc | ₹{}",
        num(listing.model_year),
        listing.model_name.as_deref().unwrap_or(listing.brand.as_str()),
        num(listing.kms_driven),
        num(listing.mileage),
        num(listing.cc),
        num(listing.price)
    )
}

fn handle_config(action: ConfigAction, workspace: &Path, config: &MotovalConfig) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path: PathBuf = workspace.join(".motoval").join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            let toml_str = toml::to_string_pretty(&MotovalConfig::default())?;
            motoval_core::persistence::write_file(&config_path, toml_str.as_bytes())?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const RAW: &str = "\
model_name,model_year,kms_driven,owner,location,mileage,power,price
Bajaj Pulsar 150cc,2018,20000 km,first owner,delhi,45 kmpl,12 bhp,60000
Honda Shine 125cc,2016,\"42,000 km\",first owner,pune,65 kmpl,10.6 bhp,38000
Yamaha R15 155cc,2020,6500 km,first owner,mumbai,40 kmpl,18.4 bhp,140000
";

    fn workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data").join("bikes.csv"), RAW).unwrap();
        dir
    }

    fn config() -> MotovalConfig {
        let mut config = MotovalConfig::default();
        config.training.n_estimators = 10;
        config
    }

    fn predict(model_dir: Option<PathBuf>) -> Commands {
        Commands::Predict {
            brand: "Bajaj".into(),
            owner: "first owner".into(),
            location: "delhi".into(),
            year: 2018,
            kms: 20000.0,
            mileage: 45.0,
            power: 12.0,
            cc: 150.0,
            segment: None,
            similar: true,
            model_dir,
        }
    }

    #[test]
    fn test_clean_train_predict() {
        let dir = workspace();
        let ws = dir.path();

        handle_command(
            Commands::Clean {
                input: None,
                output: None,
            },
            ws,
            config(),
        )
        .unwrap();
        assert!(ws.join("data").join("cleaned_bikes.csv").exists());

        handle_command(
            Commands::Train {
                input: None,
                model_dir: None,
                seed: Some(7),
                trees: Some(5),
            },
            ws,
            config(),
        )
        .unwrap();
        let bundle = ModelBundle::load(&ws.join("models")).unwrap();
        assert_eq!(bundle.manifest.seed, 7);
        assert_eq!(bundle.regressor.n_trees(), 5);

        handle_command(predict(None), ws, config()).unwrap();
    }

    #[test]
    fn test_predict_without_model_reports_failure() {
        let dir = workspace();
        let err = handle_command(predict(Some(PathBuf::from("missing"))), dir.path(), config())
            .unwrap_err();
        assert!(err.to_string().starts_with("Prediction failed:"), "{err}");
    }

    #[test]
    fn test_config_init_writes_defaults() {
        let dir = TempDir::new().unwrap();
        handle_command(
            Commands::Config {
                action: ConfigAction::Init,
            },
            dir.path(),
            config(),
        )
        .unwrap();

        let content =
            std::fs::read_to_string(dir.path().join(".motoval").join("config.toml")).unwrap();
        let parsed: MotovalConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, MotovalConfig::default());
    }

    #[test]
    fn test_format_listing() {
        let listing = SimilarListing {
            model_year: Some(2018.0),
            brand: "Bajaj".into(),
            model_name: Some("Bajaj Pulsar 150cc".into()),
            kms_driven: Some(20000.0),
            mileage: None,
            cc: Some(150.0),
            price: Some(60000.0),
        };
        assert_eq!(
            format_listing(&listing),
            "2018 | Bajaj Pulsar 150cc | 20000 km | - kmpl | 150 cc | ₹60000"
        );
    }
}
