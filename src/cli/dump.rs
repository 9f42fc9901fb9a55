use std::io::{self, BufWriter, IsTerminal, Write};

use anyhow::{Context, Result};

use crate::blob::FitBlob;
use crate::print::{Palette, TreePrinter};

use super::{AnsiPalette, ColorChoice, DumpArgs};

pub(super) fn run(args: DumpArgs) -> Result<()> {
    let bytes = std::fs::read(&args.fit)
        .with_context(|| format!("failed to read {}", args.fit.display()))?;
    let fit = FitBlob::open(&bytes)
        .with_context(|| format!("{} is not a FIT blob", args.fit.display()))?;

    let color = match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
            true
        }
        ColorChoice::Never => false,
        ColorChoice::Auto => io::stdout().is_terminal(),
    };

    if color {
        print_tree(TreePrinter::with_palette(&fit, AnsiPalette))
    } else {
        print_tree(TreePrinter::new(&fit))
    }
}

fn print_tree<P: Palette>(printer: TreePrinter<'_, '_, P>) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut io_result = Ok(());

    let walk = printer.for_each_line(|line| {
        if io_result.is_ok() {
            io_result = writeln!(out, "{}", line);
        }
    });
    walk.context("failed to decode the tree")?;
    io_result.context("failed to write to stdout")?;
    out.flush().context("failed to write to stdout")?;
    Ok(())
}
