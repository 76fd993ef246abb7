//! `cfpack init`: Create a new project.

use crate::output::StyledOutput;
use cfpack_pm::commands::init_project;
use std::path::Path;

pub fn execute(dir: &Path, name: Option<&str>, out: &mut StyledOutput) -> anyhow::Result<()> {
    init_project(dir, name)?;
    out.success("Initialized");
    out.plain(" an empty project. Add modules with `cfpack add`.");
    out.newline();
    Ok(())
}
