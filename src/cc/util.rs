#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// A glob utility function to find paths to files with certain extension
///
/// * `extension`: the file extension to find paths for
/// * `recursive`: whether to descend into subdirectories
/// * `root_dir`: the root directory where search starts
pub fn find_files(extension: &str, recursive: bool, root_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pattern = root_dir.to_path_buf();
    if recursive {
        pattern.push("**");
    }
    pattern.push(format!("*.{extension}"));

    let pattern = pattern
        .to_str()
        .context("Could not convert root_dir to string")?
        .to_string();

    let mut files: Vec<PathBuf> = glob(&pattern)
        .context("Could not create glob")?
        .filter_map(Result::ok)
        .collect();
    files.sort();
    Ok(files)
}

/// Every `.cc` file under `root_dir`.
pub fn find_cc_sources(root_dir: &Path) -> Result<Vec<PathBuf>> {
    find_files("cc", true, root_dir)
}

/// Every `.h` file under `root_dir`.
pub fn find_headers(root_dir: &Path) -> Result<Vec<PathBuf>> {
    find_files("h", true, root_dir)
}

/// Every `.cc` then `.h` file under `root_dir`.
pub fn find_sources(root_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = find_cc_sources(root_dir)?;
    files.extend(find_headers(root_dir)?);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_come_before_headers_and_recurse() {
        let root = std::env::temp_dir().join(format!("cclab-util-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(root.join("lib")).expect("create temp root");
        for name in ["main.cc", "lib/list.cc", "lib/list.h", "notes.txt"] {
            std::fs::write(root.join(name), "").expect("write fixture");
        }

        let found = find_sources(&root).expect("find");
        assert_eq!(
            found,
            [root.join("lib/list.cc"), root.join("main.cc"), root.join("lib/list.h")]
        );
        assert_eq!(find_files("cc", false, &root).expect("find"), [root.join("main.cc")]);

        let _ = std::fs::remove_dir_all(root);
    }
}
