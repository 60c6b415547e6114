use anyhow::Context;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct CliArgs {
    directories: Vec<PathBuf>,
    list: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    if let Some(root) = args.list {
        return print_listing(root);
    }

    init_logging()?;
    tunedeck::app::run_with_startup(tunedeck::app::AppStartupOptions {
        directories: (!args.directories.is_empty()).then_some(args.directories),
    })
}

fn init_logging() -> anyhow::Result<()> {
    tunedeck::config::ensure_config_dir()?;
    let path = tunedeck::config::log_path()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn print_listing(root: PathBuf) -> anyhow::Result<()> {
    let listing = tunedeck::library::list_media(&root)
        .with_context(|| format!("cannot list {}", root.display()))?;
    for entry in listing {
        let lyrics = entry
            .lyrics
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        println!("{} {} {}", entry.name, entry.path.display(), lyrics);
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--dir" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--dir requires a directory path");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--dir cannot be empty");
                }
                out.directories.push(PathBuf::from(value));
            }
            "--list" => {
                let root = match args.get(index + 1) {
                    Some(value) if !value.starts_with('-') => {
                        index += 1;
                        PathBuf::from(value)
                    }
                    _ => std::env::current_dir().context("cannot read current directory")?,
                };
                out.list = Some(root);
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("tunedeck");
    println!("  --dir PATH     Music directory to scan (repeatable, replaces stored list)");
    println!("  --list [DIR]   Print audio files under DIR with their lyrics files and exit");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn repeated_dir_flags_accumulate() {
        let parsed = parse_args(args(&["--dir", "/a", "--dir", "/b"])).expect("parse");
        assert_eq!(parsed.directories, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert!(parsed.list.is_none());
    }

    #[test]
    fn list_takes_an_optional_directory() {
        let parsed = parse_args(args(&["--list", "/srv/music"])).expect("parse");
        assert_eq!(parsed.list, Some(PathBuf::from("/srv/music")));

        let parsed = parse_args(args(&["--list"])).expect("parse");
        assert!(parsed.list.is_some());
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(parse_args(args(&["--dir"])).is_err());
        assert!(parse_args(args(&["--dir", "  "])).is_err());
        assert!(parse_args(args(&["--volume"])).is_err());
    }
}
