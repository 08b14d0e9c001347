// ========================================================================================
//
//                          pgenwrite: rows in, .pgen/.pvar out
//
// ========================================================================================
//
// A thin driver around the codec library. It reads sorted, tab-separated genotype rows
// (plain text or gzip), hands each one to the writer the configuration selects, and closes
// the file pair. Column layout and mode come either from a TOML file or from flags.

use clap::Parser;
use flate2::read::MultiGzDecoder;
use log::debug;
use pgenwrite::config::{ColumnLayout, DEFAULT_THRESHOLD, WriterConfig};
use pgenwrite::row::TabRow;
use pgenwrite::writer::pvar_path;
use pgenwrite::{PgenError, open_writer};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

// ========================================================================================
//                              Command-line interface
// ========================================================================================

#[derive(Parser, Debug)]
#[clap(
    name = "pgenwrite",
    version,
    about = "Streams sorted genotype rows into a PLINK 2 .pgen/.pvar pair."
)]
struct Args {
    /// Tab-separated input rows: chromosome, position, then the configured columns.
    /// Files ending in .gz are decompressed on the fly.
    input: PathBuf,

    /// The .pgen file to write. The .pvar lands next to it.
    output: PathBuf,

    /// TOML writer configuration. Overrides every column and mode flag below.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Zero-based column holding the reference allele.
    #[clap(long, default_value_t = 2)]
    ref_col: usize,

    /// Zero-based column holding the alternate allele.
    #[clap(long, default_value_t = 3)]
    alt_col: usize,

    /// Zero-based column holding the variant ID.
    #[clap(long, default_value_t = 4)]
    id_col: usize,

    /// Ignore the ID column and give every variant its default ID.
    #[clap(long)]
    no_id: bool,

    /// Zero-based column holding the genotype values.
    #[clap(long, default_value_t = 5)]
    values_col: usize,

    /// Merge rows sharing chromosome, position and reference into multi-allelic variants.
    #[clap(long)]
    group: bool,

    /// Value columns hold imputed probability pairs; write dosages.
    #[clap(long)]
    imputed: bool,

    /// Probability a genotype must exceed to become the hard call.
    #[clap(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f32,

    /// The input has no header line.
    #[clap(long)]
    no_header: bool,
}

impl Args {
    fn writer_config(&self) -> Result<WriterConfig, PgenError> {
        if let Some(path) = &self.config {
            return WriterConfig::load(path);
        }
        let config = WriterConfig {
            columns: ColumnLayout {
                reference: self.ref_col,
                alt: self.alt_col,
                id: (!self.no_id).then_some(self.id_col),
                values: self.values_col,
            },
            group: self.group,
            imputed: self.imputed,
            threshold: self.threshold,
            skip_header: !self.no_header,
            temp_dir: None,
        };
        config.validate()?;
        Ok(config)
    }
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>, PgenError> {
    let file = File::open(path).map_err(|e| PgenError::io(path, e))?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn run(args: &Args) -> Result<(), PgenError> {
    let config = args.writer_config()?;
    debug!("Writer configuration: {config:?}");

    let mut input = open_input(&args.input)?;
    let mut writer = open_writer(&config, &args.output)?;

    let mut line = String::new();
    let mut rows = 0usize;
    let mut skip = config.skip_header;
    loop {
        line.clear();
        let read = input
            .read_line(&mut line)
            .map_err(|e| PgenError::io(&args.input, e))?;
        if read == 0 {
            break;
        }
        if skip {
            skip = false;
            continue;
        }
        if line.trim_end_matches(['\n', '\r']).is_empty() {
            continue;
        }
        let row = TabRow::parse(line.as_str())?;
        writer.write_row(&row)?;
        rows += 1;
    }

    match writer.close()? {
        Some(summary) => {
            eprintln!(
                "> Wrote {} variants x {} samples from {} rows.",
                summary.variants, summary.samples, rows
            );
            eprintln!("> {} ({} bytes)", summary.path.display(), summary.bytes);
            eprintln!("> {}", pvar_path(&summary.path).display());
        }
        None => eprintln!("> No rows in input; nothing was written."),
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let start_time = Instant::now();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    eprintln!("> Finished in {:.2?}.", start_time.elapsed());
}
