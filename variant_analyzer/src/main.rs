use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sequence_retriever::UcscClient;
use variant_analyzer::analysis::BatchJob;
use variant_analyzer::data_handling::{Brca1Dataset, Dataset, LabeledCsvDataset};
use variant_analyzer::prediction_tools::Evo2Worker;
use variant_analyzer::server::{self, App};
use variant_analyzer::{AnalyzerConfig, Variant, VariantAnalyzer};

#[derive(Parser)]
#[command(name = "variant_analyzer")]
#[command(about = "Score single-nucleotide variants with Evo 2 and classify their effect")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// JSON configuration file; defaults to $PROJECT_ROOT/variant_analyzer.json when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one variant.
    Analyze(AnalyzeArgs),
    /// Score a labelled table and derive threshold and class spreads.
    Calibrate(CalibrateArgs),
    /// Serve the HTTP endpoint.
    Serve {
        /// Overrides `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// List UCSC assemblies grouped by organism.
    Genomes {
        #[arg(long)]
        organism: Option<String>,
    },
    /// List the primary chromosomes of an assembly.
    Chromosomes {
        #[arg(long)]
        genome: String,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Compact form, e.g. `chr17:43119628:G` or `hg19:chr17:41276045:A>C`.
    #[arg(long, conflicts_with_all = ["position", "alternative"])]
    variant: Option<String>,
    /// 1-indexed position.
    #[arg(long, required_unless_present = "variant")]
    position: Option<u64>,
    #[arg(long, required_unless_present = "variant")]
    alternative: Option<String>,
    #[arg(long, default_value = "hg38")]
    genome: String,
    #[arg(long, default_value = "chr17")]
    chromosome: String,
}

#[derive(Args)]
struct CalibrateArgs {
    /// Labelled variants: `.xlsx` (BRCA1 supplementary table) or `.csv`.
    #[arg(long)]
    table: PathBuf,
    /// FASTA of the chromosome the table refers to, optionally gzip compressed.
    #[arg(long)]
    reference: PathBuf,
    #[arg(long)]
    limit: Option<usize>,
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,
}

fn analyze(config: &AnalyzerConfig, args: AnalyzeArgs) -> Result<()> {
    let variant = match (args.variant, args.position, args.alternative) {
        (Some(compact), _, _) => compact.parse::<Variant>()?,
        (None, Some(position), Some(alternative)) => {
            Variant::new(position, &alternative, &args.chromosome, &args.genome)?
        }
        _ => anyhow::bail!("either --variant or both --position and --alternative are required"),
    };

    let ucsc = UcscClient::new(&config.ucsc_base_url)?;
    let scorer = Evo2Worker::spawn(&config.scorer).context("starting Evo2 worker")?;
    let analyzer = VariantAnalyzer {
        source: &ucsc,
        scorer: &scorer,
        window_size: config.window_size,
        calibration: config.calibration,
    };

    let report = analyzer.analyze(&variant)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn calibrate(config: &AnalyzerConfig, args: CalibrateArgs) -> Result<()> {
    let limit = args.limit.unwrap_or(config.batch.limit);
    let is_csv = args
        .table
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let dataset: Box<dyn Dataset> = if is_csv {
        Box::new(LabeledCsvDataset {
            path: args.table.clone(),
            limit,
        })
    } else {
        Box::new(Brca1Dataset {
            path: args.table.clone(),
            header_row: config.batch.header_row,
            limit,
        })
    };

    let scorer = Evo2Worker::spawn(&config.scorer).context("starting Evo2 worker")?;
    let job = BatchJob {
        dataset: dataset.as_ref(),
        reference_path: args.reference,
        window_size: usize::try_from(config.window_size)?,
        out_dir: Some(args.out_dir.clone()),
    };
    let report = job
        .run(&scorer)
        .with_context(|| format!("calibrating on {}", args.table.display()))?;

    info!(
        "Calibrated on {} variants, AUROC {:.4}; outputs in {}",
        report.variants.len(),
        report.auroc,
        args.out_dir.display()
    );
    println!("{}", serde_json::to_string_pretty(&report.calibration)?);
    Ok(())
}

fn serve(config: &AnalyzerConfig, bind: Option<String>) -> Result<()> {
    let ucsc = UcscClient::new(&config.ucsc_base_url)?;
    let scorer = Evo2Worker::spawn(&config.scorer).context("starting Evo2 worker")?;
    let address = bind.unwrap_or_else(|| config.server.bind.clone());
    let server = server::bind(&address)?;
    info!(
        "Serving {} with sequences from {}",
        scorer.model_name(),
        ucsc.base_url()
    );

    let app = App {
        ucsc: &ucsc,
        scorer: &scorer,
        window_size: config.window_size,
        calibration: config.calibration,
    };
    app.run(&server);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AnalyzerConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Analyze(args) => analyze(&config, args),
        Commands::Calibrate(args) => calibrate(&config, args),
        Commands::Serve { bind } => serve(&config, bind),
        Commands::Genomes { organism } => {
            let ucsc = UcscClient::new(&config.ucsc_base_url)?;
            let mut genomes = ucsc.list_genomes()?;
            if let Some(organism) = organism {
                genomes.retain(|k, _| *k == organism);
            }
            println!("{}", serde_json::to_string_pretty(&genomes)?);
            Ok(())
        }
        Commands::Chromosomes { genome } => {
            let ucsc = UcscClient::new(&config.ucsc_base_url)?;
            let chromosomes = ucsc.list_chromosomes(&genome)?;
            println!("{}", serde_json::to_string_pretty(&chromosomes)?);
            Ok(())
        }
    }
}
