//! Interactive spreadsheet picker for `sf` without `-f`.
//!
//! Walks the working directory for workbooks and CSV files, lists them and
//! reads a choice from stdin.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

const SEARCH_DEPTH: usize = 4;

/// Directories never worth descending into (`debug/` holds our own bundles).
const SKIPPED_DIRS: [&str; 4] = [".git", "target", "node_modules", "debug"];

/// Spreadsheet formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Xlsx,
    Csv,
}

impl InputKind {
    /// Classify `path` by extension. Office lock files (`~$book.xlsx`) are not inputs.
    pub fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.starts_with("~$") {
            return None;
        }
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}

/// What the user typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Choice {
    Listed(usize),
    OutOfRange(usize),
    Path(PathBuf),
    Quit,
}

fn parse_choice(line: &str, listed: usize) -> Choice {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        return Choice::Quit;
    }
    match line.parse::<usize>() {
        Ok(n) if (1..=listed).contains(&n) => Choice::Listed(n - 1),
        Ok(n) => Choice::OutOfRange(n),
        Err(_) => Choice::Path(PathBuf::from(line)),
    }
}

/// List spreadsheets under the working directory and let the user pick one
/// by number or type a path.
pub fn prompt_for_input_path() -> Result<PathBuf, AppError> {
    let files = discover_input_files();
    if files.is_empty() {
        return Err(AppError::usage(
            "No .xlsx or .csv files found. Provide one with `sf forecast -f <file.xlsx>`.",
        ));
    }

    let mut stdout = io::stdout();
    let prompt_err = |e: io::Error| AppError::usage(format!("Prompt failed: {e}"));
    writeln!(stdout, "Spreadsheets found ({}):", files.len()).map_err(prompt_err)?;
    for (idx, (path, kind)) in files.iter().enumerate() {
        writeln!(stdout, "{:>3}) [{}] {}", idx + 1, kind.label(), display_relative(path)).map_err(prompt_err)?;
    }

    let mut lines = io::stdin().lock().lines();
    loop {
        write!(stdout, "File number (1-{}), a path, or q: ", files.len()).map_err(prompt_err)?;
        stdout.flush().map_err(prompt_err)?;

        let Some(line) = lines.next() else {
            return Err(AppError::usage(
                "No input received. Provide a spreadsheet with `sf forecast -f <file.xlsx>`.",
            ));
        };
        match parse_choice(&line.map_err(prompt_err)?, files.len()) {
            Choice::Quit => return Err(AppError::usage("Canceled.")),
            Choice::Listed(idx) => return validate_input_path(&files[idx].0),
            Choice::OutOfRange(n) => {
                writeln!(stdout, "No file numbered {n}.").map_err(prompt_err)?;
            }
            Choice::Path(path) => match validate_input_path(&path) {
                Ok(path) => return Ok(path),
                Err(err) => writeln!(stdout, "{err}").map_err(prompt_err)?,
            },
        }
    }
}

/// Check that `path` is an existing `.xlsx` or `.csv` file.
pub fn validate_input_path(path: &Path) -> Result<PathBuf, AppError> {
    let meta = fs::metadata(path)
        .map_err(|_| AppError::usage(format!("Input file not found: {}", path.display())))?;
    if !meta.is_file() {
        return Err(AppError::usage(format!("Not a file: {}", path.display())));
    }
    if InputKind::of(path).is_none() {
        return Err(AppError::usage(format!(
            "Expected an .xlsx or .csv file (got: {}).",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

/// Spreadsheets under the working directory, sorted by path.
fn discover_input_files() -> Vec<(PathBuf, InputKind)> {
    walk(Path::new("."), SEARCH_DEPTH)
}

fn walk(root: &Path, max_depth: usize) -> Vec<(PathBuf, InputKind)> {
    let mut found = Vec::new();
    let mut pending = vec![(root.to_path_buf(), 0usize)];
    while let Some((dir, depth)) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            match entry.file_type() {
                Ok(t) if t.is_dir() => {
                    let skip = path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| SKIPPED_DIRS.contains(&n));
                    if depth < max_depth && !skip {
                        pending.push((path, depth + 1));
                    }
                }
                Ok(t) if t.is_file() => {
                    if let Some(kind) = InputKind::of(&path) {
                        found.push((path, kind));
                    }
                }
                _ => {}
            }
        }
    }
    found.sort_by_key(|(path, _)| display_relative(path));
    found
}

fn display_relative(path: &Path) -> String {
    path.strip_prefix("./").unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_spreadsheets_and_skips_lock_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data");
        fs::create_dir_all(nested.join("debug")).unwrap();
        for name in ["b.xlsx", "a.CSV", "notes.txt", "~$b.xlsx"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::write(nested.join("c.xlsx"), b"x").unwrap();
        fs::write(nested.join("debug").join("d.csv"), b"x").unwrap();

        let found: Vec<(String, InputKind)> = walk(dir.path(), 2)
            .into_iter()
            .map(|(p, k)| (p.file_name().unwrap().to_string_lossy().into_owned(), k))
            .collect();
        assert_eq!(
            found,
            vec![
                ("a.CSV".to_string(), InputKind::Csv),
                ("b.xlsx".to_string(), InputKind::Xlsx),
                ("c.xlsx".to_string(), InputKind::Xlsx),
            ]
        );
    }

    #[test]
    fn validate_rejects_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        let lock = dir.path().join("~$book.xlsx");
        fs::write(&txt, b"x").unwrap();
        fs::write(&lock, b"x").unwrap();
        assert!(validate_input_path(&txt).is_err());
        assert!(validate_input_path(&lock).is_err());
        assert!(validate_input_path(&dir.path().join("missing.xlsx")).is_err());
        assert!(validate_input_path(dir.path()).is_err());
    }

    #[test]
    fn choices_are_one_based() {
        assert_eq!(parse_choice(" 2\n", 3), Choice::Listed(1));
        assert_eq!(parse_choice("4", 3), Choice::OutOfRange(4));
        assert_eq!(parse_choice("Q", 3), Choice::Quit);
        assert_eq!(parse_choice("data/x.xlsx", 3), Choice::Path(PathBuf::from("data/x.xlsx")));
    }
}
