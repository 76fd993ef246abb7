//! `cfpack search`: Search the module index.

use crate::output::StyledOutput;
use cfpack_pm::commands::{search_modules, SearchResult};
use std::path::Path;

pub fn execute(
    dir: &Path,
    term: Option<&str>,
    index: Option<&str>,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let results = search_modules(dir, term, index)?;

    if results.is_empty() {
        out.plain("No modules found.");
        out.newline();
        return Ok(());
    }

    for result in &results {
        match result {
            SearchResult::Module { name, description } => {
                out.info(name);
                if let Some(description) = description {
                    out.plain(&format!(" - {}", description));
                }
            }
            SearchResult::Alias { name, target } => {
                out.info(name);
                out.plain(&format!(" -> {}", target));
            }
        }
        out.newline();
    }
    Ok(())
}
