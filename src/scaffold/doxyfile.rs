use std::path::{Path, PathBuf};

use super::{ScaffoldError, backup::write_with_backup};

/// File name Doxygen looks for by default.
pub const DOXYFILE_NAME: &str = "Doxyfile";

/// Renders a basic Doxyfile writing HTML into `docdir`.
pub fn render_doxyfile(docdir: &str) -> String {
    format!(
        "\nDOXYFILE_ENCODING      = UTF-8\nOUTPUT_DIRECTORY       = {docdir}\nGENERATE_LATEX         \
         = NO\nUSE_MDFILE_AS_MAINPAGE = README.md\n"
    )
}

/// Writes a basic Doxyfile into `target_dir`, backing up an existing one.
pub fn generate_doxyfile(target_dir: &Path, docdir: &str) -> Result<PathBuf, ScaffoldError> {
    let target = target_dir.join(DOXYFILE_NAME);
    write_with_backup(&target, &render_doxyfile(docdir))?;
    Ok(target)
}
