//! `cfpack status`: Show the build list.

use crate::output::StyledOutput;
use cfpack_pm::commands::project_status;
use cfpack_pm::AddedBy;
use std::path::Path;

pub fn execute(dir: &Path, out: &mut StyledOutput) -> anyhow::Result<()> {
    let status = project_status(dir)?;

    out.plain("Name:  ");
    out.bold(status.name.as_deref().unwrap_or("(unnamed)"));
    out.newline();

    if status.build.is_empty() {
        out.plain("Build: (empty)");
        out.newline();
        return Ok(());
    }

    out.plain("Build:");
    out.newline();
    for (i, entry) in status.build.iter().enumerate() {
        out.plain(&format!("{:03} ", i + 1));
        out.info(&entry.name);
        match &entry.added_by {
            Some(AddedBy::Module(dependent)) => {
                out.plain(&format!(" (dependency of {})", dependent))
            }
            Some(AddedBy::User) | None => {}
        }
        out.newline();
    }
    Ok(())
}
