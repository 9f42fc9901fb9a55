use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tracing::info;

use crate::blob::FitBlob;
use crate::extract::{extract_images, ImageStatus};

use super::ExtractArgs;

pub(super) fn run(args: ExtractArgs) -> Result<()> {
    fs::create_dir_all(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let fit_file = if args.raw {
        args.archive.clone()
    } else {
        fs::create_dir_all(&args.staging)
            .with_context(|| format!("failed to create {}", args.staging.display()))?;
        unpack(&args.unpacker, &args.archive, &args.staging)?;
        println!(
            "Extracting {} completed to {}",
            args.archive.display(),
            args.staging.display()
        );
        args.staging.join(&args.fit_path)
    };

    let bytes = fs::read(&fit_file)
        .with_context(|| format!("failed to read {}", fit_file.display()))?;
    let fit = FitBlob::open(&bytes)
        .with_context(|| format!("{} is not a FIT blob", fit_file.display()))?;

    let report = extract_images(&fit, &args.output)
        .with_context(|| format!("failed to walk {}", fit_file.display()))?;

    if report.images_node_missing {
        println!("{}", report.to_string().trim_end().yellow());
        return Ok(());
    }

    for outcome in &report.outcomes {
        println!("{}", outcome.info);
        match &outcome.status {
            ImageStatus::Extracted { path, bytes } => println!(
                "{} {} to {} ({} bytes)",
                "Extracted".green(),
                outcome.info.name,
                path.display(),
                bytes
            ),
            ImageStatus::SkippedNoData => println!(
                "{}",
                format!("No data property found for {}", outcome.info.name).yellow()
            ),
            ImageStatus::Failed(e) => println!(
                "{}",
                format!("Error writing {}: {}", outcome.info.name, e).red()
            ),
        }
    }

    let failed: Vec<&str> = report.failed().map(|o| o.info.name.as_str()).collect();
    if !failed.is_empty() {
        println!("{} {}", "Failed images:".red(), failed.join(", "));
    }
    Ok(())
}

fn unpack(unpacker: &str, archive: &Path, staging: &Path) -> Result<()> {
    info!("unpacking {} with {}", archive.display(), unpacker);

    let mut out_arg = std::ffi::OsString::from("-o");
    out_arg.push(staging);
    let status = Command::new(unpacker)
        .arg("x")
        .arg("-y")
        .arg(out_arg)
        .arg(archive)
        .status()
        .with_context(|| format!("failed to run {}", unpacker))?;

    if !status.success() {
        bail!("{} failed on {}: {}", unpacker, archive.display(), status);
    }
    Ok(())
}
