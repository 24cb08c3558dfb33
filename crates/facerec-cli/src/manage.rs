//! `facerec dataset list|delete|delete-all`.

use anyhow::Result;
use facerec_core::dataset::{self, DatasetError};
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Ask a `[y/N]` question. Only `y` or `yes` (any case) accepts.
pub fn confirm(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<bool> {
    write!(output, "{prompt} [y/N]: ")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn confirm_stdin(prompt: &str) -> io::Result<bool> {
    confirm(prompt, &mut io::stdin().lock(), &mut io::stdout())
}

/// One line per person with their image count.
pub fn list(root: &Path, out: &mut impl Write) -> Result<()> {
    let people = dataset::people(root)?;
    if people.is_empty() {
        writeln!(out, "No dataset found.")?;
        return Ok(());
    }
    writeln!(out, "Dataset summary:")?;
    for person in people {
        let count = dataset::count_images(&root.join(&person));
        writeln!(out, "  - {person}: {count} images")?;
    }
    Ok(())
}

pub fn delete(root: &Path, name: &str, yes: bool) -> Result<()> {
    let people = dataset::people(root)?;
    if !people.iter().any(|p| p == name) {
        println!("Person '{name}' not found in {}.", root.display());
        if !people.is_empty() {
            println!("Available: {}", people.join(", "));
        }
        return Ok(());
    }

    if !yes && !confirm_stdin(&format!("Delete all images for '{name}'?"))? {
        println!("Aborted.");
        return Ok(());
    }

    match dataset::remove_person(root, name) {
        Ok(dir) => {
            println!("Deleted: {}", dir.display());
            println!("Note: re-train the model to drop this person from recognition.");
            Ok(())
        }
        Err(DatasetError::PersonNotFound(_)) => {
            println!("Person '{name}' not found.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn delete_all(root: &Path, yes: bool) -> Result<()> {
    if dataset::people(root)?.is_empty() {
        println!("No dataset found.");
        return Ok(());
    }

    if !yes && !confirm_stdin("Delete the ENTIRE dataset?")? {
        println!("Aborted.");
        return Ok(());
    }

    let removed = dataset::remove_all(root)?;
    println!("Deleted {removed} people from {}.", root.display());
    println!("Note: re-train the model before running recognition again.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn answer(text: &str) -> bool {
        let mut out = Vec::new();
        confirm("Sure?", &mut text.as_bytes(), &mut out).unwrap()
    }

    #[test]
    fn test_confirm_answers() {
        assert!(answer("y\n"));
        assert!(answer("YES\n"));
        assert!(answer("  yes  \n"));
        assert!(!answer("\n"));
        assert!(!answer("n\n"));
        assert!(!answer("yep\n"));
        assert!(!answer(""));
    }

    #[test]
    fn test_confirm_prompt_text() {
        let mut out = Vec::new();
        confirm("Delete?", &mut "n\n".as_bytes(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Delete? [y/N]: ");
    }

    #[test]
    fn test_list_missing_dataset() {
        let tmp = TempDir::new().unwrap();
        let mut out = Vec::new();
        list(&tmp.path().join("nope"), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No dataset found.\n");
    }

    #[test]
    fn test_list_counts() {
        let tmp = TempDir::new().unwrap();
        let bob = tmp.path().join("Bob");
        let alice = tmp.path().join("Alice");
        fs::create_dir_all(&bob).unwrap();
        fs::create_dir_all(&alice).unwrap();
        fs::write(bob.join("1.jpg"), b"").unwrap();
        fs::write(alice.join("1.png"), b"").unwrap();
        fs::write(alice.join("2.JPEG"), b"").unwrap();
        fs::write(alice.join("notes.txt"), b"").unwrap();

        let mut out = Vec::new();
        list(tmp.path(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Dataset summary:\n  - Alice: 2 images\n  - Bob: 1 images\n"
        );
    }

    #[test]
    fn test_delete_with_yes() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Alice")).unwrap();
        fs::create_dir_all(tmp.path().join("Bob")).unwrap();

        delete(tmp.path(), "Alice", true).unwrap();
        assert!(!tmp.path().join("Alice").exists());
        assert!(tmp.path().join("Bob").exists());
    }

    #[test]
    fn test_delete_unknown_person_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Bob")).unwrap();
        delete(tmp.path(), "Alice", true).unwrap();
        assert!(tmp.path().join("Bob").exists());
    }

    #[test]
    fn test_delete_all_keeps_root() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Alice")).unwrap();
        fs::write(tmp.path().join("README"), b"").unwrap();

        delete_all(tmp.path(), true).unwrap();
        assert!(tmp.path().exists());
        assert!(!tmp.path().join("Alice").exists());
        assert!(tmp.path().join("README").exists());
    }
}
