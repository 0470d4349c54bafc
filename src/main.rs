use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueHint};
use log::{info, warn};

use sedflux::catalog::{self, MetadataValue, ModelSpectrum};
use sedflux::{BroadbandSed, FilterBank, FluxingConfig, HighresSed};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    version,
    about = "Broadband fluxes and K-corrections for spectral energy distributions",
    after_help = "Filters are looked up in $SEDFLUX_FILTER_DIR (default ./filterdata). \
                  Results are written to stdout as CSV."
)]
struct Cli {
    /// Directory with filter transmission files
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    filter_dir: Option<PathBuf>,

    /// JSON configuration file (filter_dir, aliases)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convolve every spectrum of a model library through a set of filters
    Convolve(ConvolveArgs),

    /// Print the file, detector and characteristic wavelengths of filters
    Describe(DescribeArgs),

    /// Rest-frame photometry of a catalog from rest-frame model templates
    Kcorrect(KcorrectArgs),
}

#[derive(Args)]
struct ConvolveArgs {
    /// Take the flux nearest each pivot wavelength instead of integrating
    #[arg(long)]
    quick: bool,

    /// Model library (.parquet, .json or .csv)
    #[arg(value_hint = ValueHint::FilePath)]
    models: PathBuf,

    /// Filter names or survey aliases
    #[arg(required = true)]
    filters: Vec<String>,
}

#[derive(Args)]
struct DescribeArgs {
    /// Filter names or survey aliases
    #[arg(required = true)]
    filters: Vec<String>,
}

#[derive(Args)]
struct KcorrectArgs {
    /// Photometry column holding each object's redshift
    #[arg(long)]
    redshift_column: String,

    /// Photometry catalog with an `id` column and one column per band
    #[arg(value_hint = ValueHint::FilePath)]
    photometry: PathBuf,

    /// Rest-frame model templates, matched to objects by `id`
    #[arg(value_hint = ValueHint::FilePath)]
    models: PathBuf,

    /// Bands to correct
    #[arg(required = true)]
    bands: Vec<String>,
}

impl Cli {
    fn fluxing_config(&self) -> Result<FluxingConfig> {
        let mut config = match &self.config {
            Some(path) => FluxingConfig::from_file(path)?,
            None => FluxingConfig::from_env()?,
        };
        if let Some(dir) = &self.filter_dir {
            config.filter_dir = dir.clone();
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let bank = FilterBank::new(cli.fluxing_config()?);

    match &cli.command {
        Command::Convolve(args) => convolve(args, &bank),
        Command::Describe(args) => describe(args, &bank),
        Command::Kcorrect(args) => kcorrect(args, &bank),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Broadband fluxes of every model in a library.
fn convolve(args: &ConvolveArgs, bank: &FilterBank) -> Result<()> {
    let filters = bank.get_many(&args.filters)?;
    let models = catalog::load_models(&args.models)?;
    info!("convolving {} models through {} filters", models.len(), filters.len());

    let rows = models
        .iter()
        .enumerate()
        .map(|(i, model)| -> Result<(String, BroadbandSed)> {
            let sed = model.to_sed()?;
            let broadband = sed
                .to_broadband(&filters, args.quick)
                .with_context(|| format!("model {}", model.label(i)))?;
            Ok((model.label(i), broadband))
        })
        .collect::<Result<Vec<_>>>()?;

    catalog::write_broadband_csv(std::io::stdout().lock(), bank, &args.filters, &rows)
}

/// Characteristic wavelengths of filters.
fn describe(args: &DescribeArgs, bank: &FilterBank) -> Result<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout().lock());
    writer.write_record(["filter", "file", "detector", "effective_um", "pivot_um"])?;
    for name in &args.filters {
        let filter = bank.get(name)?;
        writer.write_record([
            name.clone(),
            filter.path().display().to_string(),
            format!("{:?}", filter.detector()).to_lowercase(),
            filter.effective_wavelength().to_string(),
            filter.pivot_wavelength().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Rest-frame photometry of a catalog using rest-frame model templates.
///
/// Each object uses the model with the same `id`, or the library's only model
/// when it holds one. The template is moved to the object's redshift before
/// the correction.
fn kcorrect(args: &KcorrectArgs, bank: &FilterBank) -> Result<()> {
    let z_column = args.redshift_column.as_str();
    let photometry = catalog::load_photometry(&args.photometry, &args.bands)?;
    let models = catalog::load_models(&args.models)?;

    let mut rows = Vec::with_capacity(photometry.len());
    for (i, row) in photometry.rows.iter().enumerate() {
        let label = match &row.id {
            MetadataValue::Null => i.to_string(),
            id => id.to_string(),
        };
        let Some(z) = row.value(z_column) else {
            warn!("object {label}: no redshift in '{z_column}', skipped");
            continue;
        };
        let Some(model) = template_for(&label, &models) else {
            warn!("object {label}: no model template, skipped");
            continue;
        };

        let observed = row.to_broadband(bank)?;
        let mut template: HighresSed = model.to_sed()?;
        template.redshift(z)?;
        let corrected = observed
            .k_correct(z, &template)
            .with_context(|| format!("k-correcting object {label}"))?;
        rows.push((label, corrected));
    }

    catalog::write_broadband_csv(std::io::stdout().lock(), bank, &args.bands, &rows)
}

fn template_for<'a>(label: &str, models: &'a [ModelSpectrum]) -> Option<&'a ModelSpectrum> {
    if let [only] = models {
        return Some(only);
    }
    models
        .iter()
        .enumerate()
        .find(|(i, m)| m.label(*i) == label)
        .map(|(_, m)| m)
}
