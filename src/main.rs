use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::anyhow;
use clap::Parser as ClapParser;
use clap::Subcommand;
use indexmap::IndexMap;
use serde::Serialize;
use sqlscope::completion::complete_at;
use sqlscope::lineage::catalog::Catalog;
use sqlscope::lineage::helper::{Focus, LineageHelper};
use sqlscope::lineage::{Lineage, LineageOptions, extract_lineage};
use sqlscope::parser::parse_sql;

#[derive(clap::Parser)]
#[command(name = "sqlscope")]
#[command(about = "SQL scope resolver, lineage extractor and completion classifier", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract lineage from one or more SQL files.
    ExtractLineage(LineageCommand),
    /// Print the elements connected to a table or column of a SQL file's lineage.
    Connected(ConnectedCommand),
    /// Classify what can be typed at a cursor position of a SQL file.
    Complete(CompleteCommand),
}

#[derive(clap::Args)]
struct LineageCommand {
    /// Path to the catalog file (`.json` or `.toml`) describing the tables.
    #[arg(short, long)]
    catalog: PathBuf,
    /// Path to the SQL file or directory containing SQL files.
    #[arg(value_name = "SQL_[FILE|DIR]")]
    sql: PathBuf,
    /// Merge repeated references to the same table into one node.
    #[arg(long)]
    merge_leaves: bool,
    /// Pretty-print the output lineage.
    #[arg(long)]
    pretty: bool,
}

#[derive(clap::Args)]
struct ConnectedCommand {
    /// Path to the catalog file (`.json` or `.toml`) describing the tables.
    #[arg(short, long)]
    catalog: PathBuf,
    /// Id of the lineage table node to start from, e.g. `result_1`.
    #[arg(short, long)]
    table: String,
    /// Id of a column of `table` to start from instead of the whole table.
    #[arg(long)]
    column: Option<String>,
    /// Path to the SQL file, which must contain a single query.
    #[arg(value_name = "SQL_FILE")]
    sql: PathBuf,
}

#[derive(clap::Args)]
struct CompleteCommand {
    /// Path to the catalog file (`.json` or `.toml`) describing the tables.
    #[arg(short, long)]
    catalog: Option<PathBuf>,
    /// Char offset of the cursor in the SQL file.
    #[arg(long)]
    cursor: usize,
    /// Path to the SQL file.
    #[arg(value_name = "SQL_FILE")]
    sql: PathBuf,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OutLineage {
    Ok(Vec<Lineage>),
    ErrLineage { error: String },
}

fn read_sql(sql_file_path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(sql_file_path)
        .map_err(|_| anyhow!("Failed to read sql file {}", sql_file_path.display()))
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

fn output_lineage(
    catalog: &Catalog,
    options: LineageOptions,
    sql_file_path: &Path,
) -> anyhow::Result<OutLineage> {
    let sql = read_sql(sql_file_path)?;
    let out_lineage = match parse_sql(&sql) {
        Ok(ast) => extract_lineage(&ast, catalog, options)
            .into_iter()
            .collect::<anyhow::Result<Vec<Lineage>>>()
            .map_or_else(
                |err| OutLineage::ErrLineage {
                    error: format!(
                        "Could not extract lineage from SQL in file {} due to error: {}",
                        sql_file_path.display(),
                        err
                    ),
                },
                OutLineage::Ok,
            ),
        Err(err) => OutLineage::ErrLineage {
            error: format!(
                "Could not parse SQL in file {} due to error: {}",
                sql_file_path.display(),
                err
            ),
        },
    };
    Ok(out_lineage)
}

fn run_extract_lineage(command: &LineageCommand) -> anyhow::Result<String> {
    let catalog = Catalog::from_file(&command.catalog)?;
    let options = LineageOptions {
        merge_leaves: command.merge_leaves,
    };

    if command.sql.is_dir() {
        let mut file_lineages: IndexMap<String, OutLineage> = IndexMap::new();
        let mut sql_in_dir: Vec<_> = std::fs::read_dir(&command.sql)?
            .filter_map(|res| res.ok())
            .map(|entry| entry.path())
            .filter(|file| file.extension().is_some_and(|ext| ext == "sql"))
            .collect();
        sql_in_dir.sort();

        for sql_file in sql_in_dir {
            let output_lineage = output_lineage(&catalog, options, &sql_file)?;
            file_lineages.insert(
                std::path::absolute(sql_file)?.display().to_string(),
                output_lineage,
            );
        }
        to_json(&file_lineages, command.pretty)
    } else {
        to_json(&output_lineage(&catalog, options, &command.sql)?, command.pretty)
    }
}

fn run_connected(command: &ConnectedCommand) -> anyhow::Result<String> {
    let catalog = Catalog::from_file(&command.catalog)?;
    let sql = read_sql(&command.sql)?;
    let lineage = sqlscope::lineage::sql_lineage(&sql, &catalog, LineageOptions::default())?;

    let focus = match &command.column {
        Some(column_id) => Focus::Column {
            table_id: command.table.clone(),
            column_id: column_id.clone(),
        },
        None => Focus::Table {
            table_id: command.table.clone(),
        },
    };
    let connected = LineageHelper::new(&lineage.elements).find_connected_elements(&focus)?;
    to_json(&connected, true)
}

fn run_complete(command: &CompleteCommand) -> anyhow::Result<String> {
    let catalog = match &command.catalog {
        Some(path) => Catalog::from_file(path)?,
        None => Catalog::default(),
    };
    let sql = read_sql(&command.sql)?;
    to_json(&complete_at(&sql, command.cursor, &catalog), true)
}

fn main() -> anyhow::Result<()> {
    let now = Instant::now();

    env_logger::init();
    let cli = Cli::parse();

    let out_str = match &cli.command {
        Commands::ExtractLineage(command) => run_extract_lineage(command)?,
        Commands::Connected(command) => run_connected(command)?,
        Commands::Complete(command) => run_complete(command)?,
    };
    println!("{}", out_str);

    let elapsed = now.elapsed();
    log::info!("Elapsed: {:.2?}", elapsed);

    Ok(())
}
