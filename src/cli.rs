use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};

use crate::config::FlatfileConfig;
use crate::constants::output::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_NUM_CHUNKS, DEFAULT_PRODUCT};
use crate::inspect::{inspect_output, rows_for_uprn};
use crate::pipeline::{ChunkStatus, RunSummary, run_flatfile};
use crate::types::Uprn;

#[derive(Debug, Parser)]
#[command(
    name = "ngd_flatfile",
    disable_help_subcommand = true,
    about = "Build the deduplicated NGD address flatfile",
    long_about = "Read per-feature-type NGD parquet tables, deduplicate addresses per uprn, attach hierarchy and classification metadata, and write chunked parquet artifacts.",
    after_help = "Existing artifacts are left in place unless --force is given. Set RUST_LOG=info for progress output."
)]
struct FlatfileCli {
    #[arg(
        long = "input-dir",
        value_name = "DIR",
        help = "Directory holding one <feature_type>.parquet table per source collection"
    )]
    input_dir: PathBuf,
    #[arg(
        long = "output-dir",
        value_name = "DIR",
        help = "Directory receiving the chunk artifacts"
    )]
    output_dir: PathBuf,
    #[arg(
        long = "num-chunks",
        default_value_t = DEFAULT_NUM_CHUNKS,
        value_parser = parse_positive_usize,
        help = "Number of uprn buckets (one artifact each)"
    )]
    num_chunks: usize,
    #[arg(
        long,
        alias = "overwrite",
        help = "Replace existing artifacts (for any chunk count) instead of skipping them"
    )]
    force: bool,
    #[arg(
        long,
        default_value = DEFAULT_PRODUCT,
        help = "Product label used as the artifact name prefix"
    )]
    product: String,
    #[arg(
        long = "compression-level",
        default_value_t = DEFAULT_COMPRESSION_LEVEL,
        help = "ZSTD compression level for artifacts (1-22)"
    )]
    compression_level: i32,
    #[arg(long, help = "Print the run summary as JSON")]
    json: bool,
}

#[derive(Debug, Parser)]
#[command(
    name = "ngd_inspect",
    disable_help_subcommand = true,
    about = "Summarize written flatfile artifacts",
    long_about = "Read every artifact of a product back and report row counts, per-source totals, variant statistics, and sample rows."
)]
struct InspectCli {
    #[arg(
        long = "output-dir",
        value_name = "DIR",
        help = "Directory holding the chunk artifacts"
    )]
    output_dir: PathBuf,
    #[arg(long, default_value = DEFAULT_PRODUCT, help = "Product label of the artifacts")]
    product: String,
    #[arg(
        long,
        default_value_t = 5,
        help = "Number of sample rows to print"
    )]
    sample: usize,
    #[arg(long, help = "Print every row for this uprn instead of a summary")]
    uprn: Option<Uprn>,
}

/// Entry point of the `ngd_flatfile` binary; `args_iter` excludes the program name.
pub fn run_flatfile_cli<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();

    let Some(cli) =
        parse_cli::<FlatfileCli, _>(std::iter::once("ngd_flatfile".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    let config = FlatfileConfig {
        input_dir: cli.input_dir,
        output_dir: cli.output_dir,
        num_chunks: cli.num_chunks,
        overwrite: cli.force,
        product: cli.product,
        compression_level: cli.compression_level,
    };
    let summary = run_flatfile(&config)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Entry point of the `ngd_inspect` binary; `args_iter` excludes the program name.
pub fn run_inspect_cli<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();

    let Some(cli) =
        parse_cli::<InspectCli, _>(std::iter::once("ngd_inspect".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    if let Some(uprn) = cli.uprn {
        let rows = rows_for_uprn(&cli.output_dir, &cli.product, uprn)?;
        if rows.is_empty() {
            println!("uprn {uprn}: no rows");
        }
        for row in rows {
            println!("{}", serde_json::to_string(&row)?);
        }
        return Ok(());
    }

    let inspection = inspect_output(&cli.output_dir, &cli.product, cli.sample)?;
    println!("=== artifacts ===");
    for artifact in &inspection.artifacts {
        println!(
            "{}  rows={}  uprns={}",
            artifact.path.display(),
            artifact.rows,
            artifact.distinct_uprns
        );
    }
    println!();
    println!("total rows          : {}", inspection.total_rows);
    println!("with classification : {}", inspection.with_classification);
    println!("with hierarchy      : {}", inspection.with_hierarchy);
    if let Some(variants) = &inspection.variants {
        println!(
            "variants per uprn   : mean {:.2}  median {}  min {}  max {}  ({} uprns)",
            variants.mean_variants,
            variants.median_variants,
            variants.min_variants,
            variants.max_variants,
            variants.total_uprns
        );
    }
    println!();
    println!("=== rows by source ===");
    for (source, count) in &inspection.rows_by_source {
        println!("{source}: {count}");
    }
    if !inspection.sample.is_empty() {
        println!();
        println!("=== sample ===");
        for row in &inspection.sample {
            println!("{}", serde_json::to_string(row)?);
        }
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn print_summary(summary: &RunSummary) {
    println!("=== flatfile run ===");
    println!("sources         : {}", summary.source_tables.len());
    if !summary.empty_sources.is_empty() {
        println!("empty sources   : {}", summary.empty_sources.join(", "));
    }
    println!(
        "hierarchy       : {} node(s), max level {}",
        summary.hierarchy_nodes, summary.max_hierarchy_level
    );
    println!("anomalies       : {}", summary.anomalies.len());
    for anomaly in summary.anomalies.iter().take(10) {
        println!("  - {anomaly}");
    }
    for chunk in &summary.chunks {
        let status = match chunk.status {
            ChunkStatus::Written => "written",
            ChunkStatus::Skipped => "exists",
        };
        println!(
            "chunk {:>3}: {:<7} rows={:<9} {}",
            chunk.index + 1,
            status,
            chunk.rows,
            chunk.artifact.display()
        );
    }
    if let Some(skew) = &summary.skew {
        println!(
            "balance         : min {} max {} mean {:.1} ratio {:.2}",
            skew.min, skew.max, skew.mean, skew.ratio
        );
    }
    println!("rows written    : {}", summary.rows_written());
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{raw}' as a positive integer"))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> FlatfileCli {
        parse_cli::<FlatfileCli, _>(std::iter::once("ngd_flatfile").chain(args.iter().copied()))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn flatfile_cli_defaults() {
        let cli = parse(&["--input-dir", "in", "--output-dir", "out"]);
        assert_eq!(cli.num_chunks, DEFAULT_NUM_CHUNKS);
        assert_eq!(cli.product, "ngd");
        assert_eq!(cli.compression_level, 9);
        assert!(!cli.force);
    }

    #[test]
    fn overwrite_is_an_alias_for_force() {
        let cli = parse(&[
            "--input-dir",
            "in",
            "--output-dir",
            "out",
            "--overwrite",
            "--num-chunks",
            "3",
        ]);
        assert!(cli.force);
        assert_eq!(cli.num_chunks, 3);
    }

    #[test]
    fn zero_chunks_is_rejected() {
        let result = parse_cli::<FlatfileCli, _>([
            "ngd_flatfile",
            "--input-dir",
            "in",
            "--output-dir",
            "out",
            "--num-chunks",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn help_returns_none() {
        let parsed = parse_cli::<InspectCli, _>(["ngd_inspect", "--help"]).unwrap();
        assert!(parsed.is_none());
    }
}
