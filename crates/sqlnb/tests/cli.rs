/*
 * cli.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Runs the sqlnb binary on notebooks in temporary directories.
 */

use std::path::Path;
use std::process::Command;

use sqlnb_core::Notebook;

const EXERCISE: &str = r##"{
 "cells": [
  {"cell_type": "markdown", "metadata": {}, "source": ["# Joins\n"]},
  {"cell_type": "markdown", "metadata": {"tags": ["correction"]}, "source": "The answer"},
  {"cell_type": "code", "execution_count": null, "metadata": {"tags": ["sql"]}, "outputs": [], "source": "SELECT 1;"}
 ],
 "metadata": {"kernelspec": {"name": "python3", "display_name": "Python 3"}},
 "nbformat": 4,
 "nbformat_minor": 5
}
"##;

fn sqlnb(args: &[&str], cwd: &Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_sqlnb"))
        .args(args)
        .current_dir(cwd)
        .env("RUST_LOG", "sqlnb=warn")
        .output()
        .expect("sqlnb binary runs")
}

fn notebook(json_cells: &str) -> String {
    format!(r#"{{"cells": [{json_cells}], "metadata": {{}}, "nbformat": 4, "nbformat_minor": 5}}"#)
}

#[test]
fn test_student_default_name() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ex1.ipynb"), EXERCISE).unwrap();

    let output = sqlnb(&["student", "ex1.ipynb"], dir.path());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let student = Notebook::read(&dir.path().join("ex1_student.ipynb")).unwrap();
    assert_eq!(student.cells.len(), 2);
    assert!(student.cells.iter().all(|c| !c.has_tag("correction")));
    assert!(student.metadata.contains_key("kernelspec"));
}

#[test]
fn test_student_explicit_name_and_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("out")).unwrap();
    std::fs::write(dir.path().join("ex1.ipynb"), EXERCISE).unwrap();

    let output = sqlnb(&["student", "ex1.ipynb", "out", "-o", "handout"], dir.path());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("out/handout.ipynb").is_file());
}

#[test]
fn test_missing_output_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ex1.ipynb"), EXERCISE).unwrap();

    let output = sqlnb(&["student", "ex1.ipynb", "nowhere"], dir.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Output directory does not exist"));
}

#[test]
fn test_transclude() {
    let dir = tempfile::tempdir().unwrap();
    let lessons = dir.path().join("lessons");
    std::fs::create_dir(&lessons).unwrap();
    std::fs::write(
        lessons.join("main.ipynb"),
        notebook(
            r#"{"cell_type": "markdown", "metadata": {}, "source": "Intro"},
               {"cell_type": "markdown", "metadata": {}, "source": "{{part}}"}"#,
        ),
    )
    .unwrap();
    std::fs::write(
        lessons.join("part.ipynb"),
        notebook(r#"{"cell_type": "markdown", "metadata": {}, "source": "Part one"}"#),
    )
    .unwrap();

    let output = sqlnb(&["transclude", "lessons/main.ipynb"], dir.path());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let resolved = Notebook::read(&dir.path().join("main_transcluded.ipynb")).unwrap();
    let sources: Vec<&str> = resolved.cells.iter().map(|c| c.source.as_str()).collect();
    assert_eq!(sources, vec!["Intro", "Part one"]);
}

#[test]
fn test_transclude_missing_reference_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("main.ipynb"),
        notebook(r#"{"cell_type": "markdown", "metadata": {}, "source": "{{absent}}"}"#),
    )
    .unwrap();

    let output = sqlnb(&["transclude", "main.ipynb"], dir.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("absent.ipynb"));
    assert!(!dir.path().join("main_transcluded.ipynb").exists());
}
