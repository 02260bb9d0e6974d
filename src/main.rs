use anyhow::{anyhow, Context, Result};
use cdc_intercept::{correlate, parse_with, Standards};
use clap::Parser;
use memmap2::Mmap;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "CDC/LAES intercept log parser -> per-call JSONL plus cross-call correlation",
    long_about = None
)]
struct Cli {
    /// TOML standards file merged over the built-in table; may be repeated
    #[arg(long = "standards")]
    standards: Vec<PathBuf>,

    /// Write the merged standards table as a bincode snapshot
    #[arg(long = "compile-standards")]
    compile_standards: Option<PathBuf>,

    /// Load a bincode snapshot instead of the built-in table
    #[arg(long = "load-compiled")]
    load_compiled: Option<PathBuf>,

    #[arg(long = "output-dir")]
    output_dir: PathBuf,

    /// Comma separated extension filter, e.g. `log,txt`
    #[arg(long = "ext")]
    ext: Option<String>,

    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

struct FileSummary {
    messages: usize,
    calls: usize,
    correlated: bool,
}

fn load_standards(cli: &Cli) -> Result<Standards> {
    let mut standards = if let Some(bin_path) = &cli.load_compiled {
        info!(path = ?bin_path, "loading compiled standards");
        Standards::load_compiled(bin_path)
            .with_context(|| format!("Failed to load compiled standards {:?}", bin_path))?
    } else {
        Standards::default()
    };

    for path in &cli.standards {
        info!(path = ?path, "merging standards file");
        let extra = Standards::load(path).with_context(|| format!("Failed to load standards file {:?}", path))?;
        standards.merge(extra);
    }

    if let Some(save_path) = &cli.compile_standards {
        standards
            .compile_to(save_path)
            .with_context(|| format!("Failed to write compiled standards {:?}", save_path))?;
        info!(path = ?save_path, "standards compiled; pass --load-compiled next time");
    }

    Ok(standards)
}

fn expand_inputs(inputs: &[PathBuf], allowed_exts: Option<&HashSet<String>>) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for p in inputs {
        if p.is_file() {
            if should_include(p, allowed_exts) {
                files.push(p.clone());
            }
        } else if p.is_dir() {
            for entry in WalkDir::new(p).follow_links(false) {
                let entry = entry?;
                let path = entry.path();
                if path.is_file() && should_include(path, allowed_exts) {
                    files.push(path.to_path_buf());
                }
            }
        } else {
            return Err(anyhow!("Input path is not a file or directory: {:?}", p));
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

#[inline]
fn should_include(path: &Path, allowed_exts: Option<&HashSet<String>>) -> bool {
    let Some(set) = allowed_exts else { return true; };
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else { return false; };
    set.contains(&ext.to_ascii_lowercase())
}

fn process_file(standards: &Standards, in_path: &Path, out_dir: &Path) -> Result<FileSummary> {
    let file = File::open(in_path).with_context(|| format!("Failed to open input file {:?}", in_path))?;
    let file_name = in_path
        .file_name()
        .ok_or_else(|| anyhow!("Input path has no filename: {:?}", in_path))?
        .to_string_lossy()
        .to_string();

    // Zero-length files cannot be mapped on every platform.
    let text = if file.metadata()?.len() == 0 {
        String::new()
    } else {
        let mmap = unsafe { Mmap::map(&file)? };
        String::from_utf8_lossy(&mmap).into_owned()
    };

    let output = parse_with(&text, standards);
    if output.messages.iter().all(|m| m.kind.is_none()) {
        warn!(file = %file_name, "no recognizable records");
    }

    let out_path = out_dir.join(format!("{}.calls.jsonl", file_name));
    let out_file = File::create(&out_path).with_context(|| format!("Failed to create output file {:?}", out_path))?;
    let mut writer = BufWriter::new(out_file);
    for call in output.calls.iter() {
        serde_json::to_writer(&mut writer, call)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    let identified = output.calls.identified().count();
    let correlated = identified > 1;
    if correlated {
        let result = correlate(&output.calls);
        let corr_path = out_dir.join(format!("{}.correlation.json", file_name));
        let corr_file =
            File::create(&corr_path).with_context(|| format!("Failed to create output file {:?}", corr_path))?;
        let mut writer = BufWriter::new(corr_file);
        serde_json::to_writer_pretty(&mut writer, &result)?;
        writer.flush()?;
    }

    Ok(FileSummary {
        messages: output.messages.len(),
        calls: identified,
        correlated,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "cdc_intercept=info".into()))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let overall_start = Instant::now();

    let allowed_exts: Option<HashSet<String>> = cli.ext.as_ref().map(|s| {
        s.split(',')
            .map(|x| x.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|x| !x.is_empty())
            .collect()
    });

    let standards = load_standards(&cli)?;

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", cli.output_dir))?;

    let input_files = expand_inputs(&cli.inputs, allowed_exts.as_ref())
        .with_context(|| "Failed to expand input files/directories")?;

    if input_files.is_empty() {
        warn!("no input files found");
        return Ok(());
    }

    info!(count = input_files.len(), "found input files");

    let out_dir = cli.output_dir.clone();
    let results: Vec<(PathBuf, Result<FileSummary>)> = input_files
        .par_iter()
        .map(|p| (p.clone(), process_file(&standards, p, &out_dir)))
        .collect();

    let mut total_messages = 0usize;
    let mut failed = 0usize;
    for (path, res) in results {
        match res {
            Ok(summary) => {
                total_messages += summary.messages;
                info!(
                    path = ?path,
                    messages = summary.messages,
                    calls = summary.calls,
                    correlated = summary.correlated,
                    "parsed file"
                );
            }
            Err(e) => {
                failed += 1;
                error!(path = ?path, "parsing failed: {:#}", e);
            }
        }
    }

    info!(
        messages = total_messages,
        failed,
        elapsed_s = overall_start.elapsed().as_secs_f64(),
        "done"
    );
    Ok(())
}
