use clap::Parser;
use log::*;
use mcorr::{
    config::{self, CorrConfig},
    corr::{self, CorrelationEngine, Curve},
    io::{self, OutputFormat},
    utils::error::show_snafu_error,
    vcf::{self, VariantStream},
};
use snafu::prelude::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mcorrvcf", version, about = "Calculate mutational correlation from VCF files.")]
struct Cli {
    /// VCF input file, plain or bgzipped; `-` reads standard input
    vcf: PathBuf,

    /// Output prefix; the extension is set by --format
    out_prefix: PathBuf,

    /// Max length of correlations (bp) [default: 300]
    #[arg(short = 'm', long)]
    max_corr_length: Option<usize>,

    /// Region start, inclusive [default: 1]
    #[arg(long)]
    region_start: Option<u64>,

    /// Region end, inclusive; reading stops at the first record past it
    /// [default: 1000000000000]
    #[arg(long)]
    region_end: Option<u64>,

    /// TOML file with max_lag, region_start and region_end; flags given on
    /// the command line take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to load configuration"))]
    Config {
        #[snafu(backtrace)]
        source: config::Error,
    },
    #[snafu(display("failed to open input"))]
    Input {
        #[snafu(backtrace)]
        source: vcf::Error,
    },
    #[snafu(display("correlation run aborted"))]
    Correlation {
        #[snafu(backtrace)]
        source: corr::Error,
    },
    #[snafu(display("failed to write output"))]
    Output {
        #[snafu(backtrace)]
        source: io::Error,
    },
}

fn run(cli: Cli) -> Result<(), Error> {
    let base = match &cli.config {
        Some(p) => CorrConfig::from_toml_file(p).context(ConfigSnafu {})?,
        None => CorrConfig::default(),
    };
    let cfg = base.with_overrides(cli.max_corr_length, cli.region_start, cli.region_end);
    info!(
        "max lag {}, region {}..={}",
        cfg.max_lag, cfg.region_start, cfg.region_end
    );

    let mut engine = CorrelationEngine::new(&cfg).context(CorrelationSnafu {})?;
    let mut stream = VariantStream::from_path(&cli.vcf).context(InputSnafu {})?;
    engine.run(&mut stream).context(CorrelationSnafu {})?;

    let st = stream.stats();
    info!(
        "read {} lines: {} SNP records, {} non-SNP sites skipped, {} records without GT",
        st.lines, st.emitted, st.non_snp, st.without_genotypes
    );

    let curve = Curve::from_accumulator(engine.finish());
    if let Some(ks) = curve.ks() {
        info!("Ks = {ks}");
    }
    io::write_curve(&curve, &cli.out_prefix, cli.format).context(OutputSnafu {})?;
    Ok(())
}

fn main() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .format_module_path(false)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        show_snafu_error(e);
        std::process::exit(1);
    }
}
