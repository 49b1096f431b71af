use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::Shell;

// cli.rs only depends on clap + clap_complete, both build-dependencies.
#[path = "src/cli.rs"]
mod cli;

const BIN: &str = "atomfan";

fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir = PathBuf::from(std::env::var_os("OUT_DIR").ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "OUT_DIR not set by Cargo")
    })?);
    let mut cmd = cli::Cli::command();

    let man_dir = ensure_dir(&out_dir, "man")?;
    let mut pages = Vec::new();
    collect_pages(cmd.clone(), &mut pages);
    for page in pages {
        let file = man_dir.join(format!("{}.1", page.get_name()));
        let mut buf = Vec::new();
        clap_mangen::Man::new(page).render(&mut buf)?;
        fs::write(file, buf)?;
    }

    let completion_dir = ensure_dir(&out_dir, "completions")?;
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        clap_complete::generate_to(shell, &mut cmd, BIN, &completion_dir)?;
    }
    Ok(())
}

fn ensure_dir(parent: &Path, name: &str) -> io::Result<PathBuf> {
    let dir = parent.join(name);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Flatten the command tree into one page per visible command, each
/// renamed to its full path: `atomfan`, `atomfan-devices`,
/// `atomfan-devices-power`, ...
fn collect_pages(cmd: clap::Command, pages: &mut Vec<clap::Command>) {
    let prefix = cmd.get_name().to_owned();
    for sub in cmd.get_subcommands().filter(|s| !s.is_hide_set()) {
        let full = format!("{prefix}-{}", sub.get_name());
        collect_pages(sub.clone().name(full), pages);
    }
    pages.push(cmd);
}
