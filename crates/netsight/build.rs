use std::fs;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::Shell;

// cli.rs only needs clap + clap_complete, both build-dependencies.
#[path = "src/cli.rs"]
mod cli;

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let Some(out_dir) = std::env::var_os("OUT_DIR").map(PathBuf::from) else {
        panic!("OUT_DIR not set by Cargo");
    };

    let mut cmd = cli::Cli::command();
    cmd.build();

    let man_dir = ensure_dir(&out_dir.join("man"));
    write_manpages(&cmd, "", &man_dir);

    let completions_dir = ensure_dir(&out_dir.join("completions"));
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        if let Err(e) = clap_complete::generate_to(shell, &mut cmd, "netsight", &completions_dir) {
            panic!("failed to generate {shell} completions: {e}");
        }
    }
}

fn ensure_dir(dir: &Path) -> PathBuf {
    if let Err(e) = fs::create_dir_all(dir) {
        panic!("failed to create {}: {e}", dir.display());
    }
    dir.to_path_buf()
}

/// `netsight.1`, `netsight-devices.1`, `netsight-devices-list.1`, ...
fn write_manpages(cmd: &clap::Command, prefix: &str, dir: &Path) {
    let name = if prefix.is_empty() {
        cmd.get_name().to_owned()
    } else {
        format!("{prefix}-{}", cmd.get_name())
    };

    let mut page = Vec::new();
    let man = clap_mangen::Man::new(cmd.clone().name(name.clone()));
    if let Err(e) = man.render(&mut page) {
        panic!("failed to render man page for `{name}`: {e}");
    }
    let path = dir.join(format!("{name}.1"));
    if let Err(e) = fs::write(&path, page) {
        panic!("failed to write {}: {e}", path.display());
    }

    cmd.get_subcommands()
        .filter(|sub| !sub.is_hide_set() && sub.get_name() != "help")
        .for_each(|sub| write_manpages(sub, &name, dir));
}
