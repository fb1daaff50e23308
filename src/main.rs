use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use olist_medallion::analysis::DescriptiveAnalysis;
use olist_medallion::config::AppConfig;
use olist_medallion::data::frame::display_value;
use olist_medallion::database::{with_database, Exercise};
use olist_medallion::workflow;
use olist_medallion::Layer;
use polars::prelude::*;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "olist")]
#[command(about = "Olist e-commerce data pipeline: CSV -> bronze -> silver, plus SQL exercises")]
struct Cli {
    /// TOML configuration file; defaults apply when it does not exist.
    #[arg(short, long, global = true, default_value = "olist.toml")]
    config: PathBuf,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the default configuration file and create the data directories.
    Init,
    /// Load every CSV file into the bronze layer.
    Load,
    /// Validate the raw files against their column contracts.
    Validate,
    /// Clean bronze tables into silver and build the silver indexes.
    Process,
    /// Descriptive statistics of a stored table.
    Describe {
        table: String,
        #[arg(short, long, default_value = "bronze")]
        layer: Layer,
        /// Column whose most frequent values are shown.
        #[arg(long)]
        column: Option<String>,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Run SQL, or one of the built-in exercises.
    Query {
        sql: Option<String>,
        #[arg(short, long)]
        exercise: Option<Exercise>,
        #[arg(short, long, default_value = "bronze")]
        layer: Layer,
    },
    /// Show the query plan of SQL or an exercise.
    Explain {
        sql: Option<String>,
        #[arg(short, long)]
        exercise: Option<Exercise>,
        #[arg(short, long, default_value = "bronze")]
        layer: Layer,
    },
    /// Time the same query on bronze and silver. Use `{layer}` in custom SQL.
    Compare {
        template: Option<String>,
        #[arg(short, long, default_value = "delivered-join")]
        exercise: Exercise,
    },
    /// List stored tables.
    Tables {
        #[arg(short, long)]
        layer: Option<Layer>,
    },
}

fn resolve_sql(sql: Option<String>, exercise: Option<Exercise>, layer: Layer) -> anyhow::Result<String> {
    match (sql, exercise) {
        (Some(sql), None) => Ok(sql),
        (None, Some(exercise)) => Ok(exercise.sql(layer)),
        (Some(_), Some(_)) => bail!("pass either SQL or --exercise, not both"),
        (None, None) => bail!("no SQL given (pass SQL text or --exercise)"),
    }
}

fn frame_to_json(df: &DataFrame) -> anyhow::Result<serde_json::Value> {
    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let mut row = serde_json::Map::new();
        for column in df.get_columns() {
            let value = match column.as_materialized_series().get(i)? {
                AnyValue::Null => serde_json::Value::Null,
                AnyValue::Int64(v) => v.into(),
                AnyValue::Float64(v) => v.into(),
                AnyValue::Boolean(v) => v.into(),
                other => display_value(&other).into(),
            };
            row.insert(column.name().to_string(), value);
        }
        rows.push(serde_json::Value::Object(row));
    }
    Ok(serde_json::Value::Array(rows))
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    let json = cli.json;

    match cli.command {
        Command::Init => {
            if cli.config.exists() {
                bail!("{} already exists", cli.config.display());
            }
            config.save_to_file(&cli.config)?;
            config.dataset.ensure_directories()?;
            emit(json, &config, || format!("Configuration written to {}", cli.config.display()))?;
        }
        Command::Load => {
            config.dataset.ensure_directories()?;
            let written = with_database(&config.database, |db| workflow::load_to_bronze(&config, db))?;
            emit(json, &written, || format!("{} bronze tables written to {}", written, config.database.path.display()))?;
        }
        Command::Validate => {
            let tables = workflow::load_tables(&config)?;
            let schemas = workflow::load_schemas(&config.dataset.schemas_dir)?;
            let results = workflow::validate_tables(&tables, &schemas, config.validation.missing_threshold)?;
            emit(json, &results, || {
                let mut out = format!("{:<45} {:>7} {:>10} {:>8} {:>6}", "dataset", "schema", "duplicates", "missing", "issues");
                for r in &results {
                    let schema = match r.schema_valid {
                        Some(true) => "ok",
                        Some(false) => "FAILED",
                        None => "n/a",
                    };
                    out.push_str(&format!(
                        "\n{:<45} {:>7} {:>10} {:>8} {:>6}",
                        r.dataset, schema, r.duplicates, r.missing_columns, r.issues
                    ));
                }
                out
            })?;
        }
        Command::Process => {
            let report = with_database(&config.database, |db| workflow::bronze_to_silver(db, &config.cleaning))?;
            emit(json, &report, || {
                let mut out = String::new();
                for t in &report.tables {
                    out.push_str(&format!("{}: {} -> {} rows\n", t.table, t.rows_before, t.rows_after));
                    for op in &t.operations {
                        out.push_str(&format!("  - {}\n", op));
                    }
                }
                out.push_str(&format!("{} silver indexes in place", report.indexes));
                out
            })?;
        }
        Command::Describe { table, layer, column, top } => {
            let df = with_database(&config.database, |db| db.read_table(&table, layer))?;
            let analysis = DescriptiveAnalysis::new(&df, &table);
            let stats = analysis.basic_stats()?;
            let info = analysis.column_info()?;
            let patterns = analysis.detect_patterns()?;
            let suggestions = analysis.suggest_preprocessing()?;
            let top_values = match &column {
                Some(c) => Some(analysis.get_top_values(c, top)?),
                None => None,
            };

            let value = serde_json::json!({
                "table": table,
                "shape": df.shape(),
                "stats": stats,
                "columns": info,
                "patterns": patterns,
                "suggestions": suggestions,
                "top_values": top_values,
            });
            emit(json, &value, || {
                let mut out = format!("{} ({} rows x {} columns)\n", layer.table_name(&table), df.height(), df.width());
                for s in &stats {
                    out.push_str(&format!(
                        "  {:<35} n={:<8} mean={:<12.3} std={:<12.3} min={:<10.3} max={:.3}\n",
                        s.column,
                        s.count,
                        s.mean.unwrap_or(f64::NAN),
                        s.std.unwrap_or(f64::NAN),
                        s.min.unwrap_or(f64::NAN),
                        s.max.unwrap_or(f64::NAN)
                    ));
                }
                out.push_str(&format!(
                    "identifiers: {:?}\ndatetimes: {:?}\nnumeric: {:?}\ncategorical: {:?}\ntext: {:?}\n",
                    patterns.identifiers, patterns.datetimes, patterns.numeric, patterns.categorical, patterns.text
                ));
                for (bucket, items) in suggestions.buckets() {
                    for item in items {
                        out.push_str(&format!("[{}] {}\n", bucket, item));
                    }
                }
                if let Some(values) = &top_values {
                    for v in values {
                        out.push_str(&format!("  {:<30} {:>8} {:>6.2}%\n", v.value, v.count, v.percentage));
                    }
                }
                out
            })?;
        }
        Command::Query { sql, exercise, layer } => {
            let sql = resolve_sql(sql, exercise, layer)?;
            let df = with_database(&config.database, |db| db.query(&sql))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&frame_to_json(&df)?)?);
            } else {
                println!("{}", df);
            }
        }
        Command::Explain { sql, exercise, layer } => {
            let sql = resolve_sql(sql, exercise, layer)?;
            let plan = with_database(&config.database, |db| db.explain_query_plan(&sql))?;
            emit(json, &plan, || {
                plan.iter()
                    .map(|s| format!("{:>3} {:>3}  {}", s.id, s.parent, s.detail))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        Command::Compare { template, exercise } => {
            let template = template.unwrap_or_else(|| exercise.template().to_string());
            let comparison = with_database(&config.database, |db| db.compare_layers(&template))?;
            emit(json, &comparison, || {
                let mut out = format!(
                    "bronze: {:.3} ms ({} rows)\nsilver: {:.3} ms ({} rows)",
                    comparison.bronze.elapsed_ms,
                    comparison.bronze.rows,
                    comparison.silver.elapsed_ms,
                    comparison.silver.rows
                );
                if let Some(gain) = comparison.gain_pct {
                    out.push_str(&format!("\ngain: {:.1}%", gain));
                }
                if let Some(speedup) = comparison.speedup {
                    out.push_str(&format!("\nspeedup: {:.2}x", speedup));
                }
                out
            })?;
        }
        Command::Tables { layer } => {
            let tables = with_database(&config.database, |db| db.list_tables(layer))?;
            emit(json, &tables, || tables.join("\n"))?;
        }
    }

    Ok(())
}
