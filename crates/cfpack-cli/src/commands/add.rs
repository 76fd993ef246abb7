//! `cfpack add`: Add modules to the build.

use crate::output::StyledOutput;
use cfpack_pm::commands::add_modules;
use cfpack_pm::{AddOptions, RemoteFetcher, StdinConfirm};
use std::path::Path;

pub fn execute(
    dir: &Path,
    modules: &[String],
    non_interactive: bool,
    checksum: Option<String>,
    index: Option<&str>,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let options = AddOptions {
        non_interactive,
        checksum,
        ..AddOptions::default()
    };
    let fetcher = RemoteFetcher::new()?;

    let report = add_modules(dir, modules, &options, index, &fetcher, &StdinConfirm)?;

    let added = report.added().len();
    let warnings = report.warnings().count();
    if added > 0 {
        out.success("Done!");
        out.plain(&format!(" {} module(s) added", added));
        if warnings > 0 {
            out.plain(", ");
            out.warning(&format!("{} warning(s)", warnings));
        }
        out.plain(".");
        out.newline();
    }
    Ok(())
}
