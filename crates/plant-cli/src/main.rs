//! plant CLI — plant external evidence into a git evidence locker.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use plant_core::config::{GitSettings, PlantConfig};
use plant_core::creds::Credentials;
use plant_core::evidence::Evidence;
use plant_core::locker::{Locker, LockerOptions};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "plant", about = "plant — plant external evidence into a git evidence locker", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Perform requested changes locally and show results of changes.
    DryRun(PlantArgs),

    /// Perform requested changes and push to the remote repository.
    PushRemote(PlantArgs),
}

#[derive(Args)]
struct PlantArgs {
    /// The URL to the evidence locker repository, as an example
    /// https://github.com/my-org/my-repo.
    locker: String,

    /// The path to the credentials file.
    #[arg(long, default_value = "~/.credentials", value_name = "~/path/creds")]
    creds: String,

    /// JSON evidence-path/detail pairs needed to plant evidence.
    /// Evidence path must be the absolute path to the file. The detail
    /// holds category (required), ttl, and description.
    #[arg(long, value_name = "JSON")]
    config: Option<String>,

    /// Path to a file containing the files (with config) to plant.
    #[arg(long, value_name = "~/path/to/config_file.json")]
    config_file: Option<PathBuf>,

    /// JSON git configuration for signing commits.
    #[arg(long, value_name = "JSON")]
    git_config: Option<String>,

    /// Path to a file containing the git configuration for signing
    /// commits.
    #[arg(long, value_name = "~/path/to/git_config_file.json")]
    git_config_file: Option<PathBuf>,

    /// The operating system location of a local git repository. If not
    /// provided, the locker is cloned fresh under the system temp dir.
    #[arg(long, value_name = "~/path/evidence-locker")]
    repo_path: Option<PathBuf>,
}

/// Whether the finalizer is permitted to push.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    DryRun,
    PushRemote,
}

impl Mode {
    fn intro(self) -> &'static str {
        match self {
            Mode::DryRun => "This is a dry run.  Remote locker will not be updated...",
            Mode::PushRemote => "This is an official run.  Remote locker will be updated...",
        }
    }

    fn outro(self) -> &'static str {
        match self {
            Mode::DryRun => "Remote locker was not updated...",
            Mode::PushRemote => "Remote locker was updated...",
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let (mode, args) = match cli.command {
        Commands::DryRun(args) => (Mode::DryRun, args),
        Commands::PushRemote(args) => (Mode::PushRemote, args),
    };

    // Validation failures terminate before any repository interaction.
    let locker_url = match validate(&args) {
        Ok(url) => url,
        Err(message) => {
            eprintln!("{message}");
            process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    if let Err(e) = run(mode, &args, &locker_url) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn validate(args: &PlantArgs) -> Result<Url, String> {
    let bad_url = "ERROR: locker url must be of the form https://hostname/org/repo".to_string();
    let url = Url::parse(&args.locker).map_err(|_| bad_url.clone())?;
    if url.host_str().is_none() || url.path() == "/" || url.path().is_empty() {
        return Err(bad_url);
    }
    if args.config.is_some() == args.config_file.is_some() {
        return Err("ERROR: Provide either a --config or a --config-file.".to_string());
    }
    if args.git_config.is_some() && args.git_config_file.is_some() {
        return Err("ERROR: Provide either a --git-config or a --git-config-file.".to_string());
    }
    Ok(url)
}

fn run(mode: Mode, args: &PlantArgs, locker_url: &Url) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", mode.intro());

    let files = match (&args.config, &args.config_file) {
        (Some(inline), None) => PlantConfig::from_json_str(inline)?,
        (None, Some(path)) => PlantConfig::from_file(path)?,
        _ => unreachable!("config source checked during validation"),
    };

    let git_settings = match (&args.git_config, &args.git_config_file) {
        (Some(inline), _) => Some(GitSettings::from_json_str(inline)?),
        (_, Some(path)) => Some(GitSettings::from_file(path)?),
        _ => None,
    };

    let push_url = match mode {
        Mode::PushRemote => {
            let creds = Credentials::load(&expand_tilde(&args.creds))?;
            Some(creds.url_with_creds(locker_url)?)
        }
        Mode::DryRun => None,
    };

    let name = locker_name(args.repo_path.as_deref());
    if args.repo_path.is_none() {
        prepare_clone_target(&name, locker_url)?;
    }

    let locker = Locker::open(LockerOptions {
        name,
        repo_url: locker_url.clone(),
        push_url,
        git_settings,
        repo_path: args.repo_path.clone(),
    })?;

    println!("Local locker location is {}", locker.local_path().display());

    locker.run(|session| {
        for (path, detail) in files.iter() {
            let evidence = Evidence::from_file(
                Path::new(path),
                &detail.category,
                detail.ttl,
                detail.description.as_deref().unwrap_or(""),
            )?;
            session.add_evidence(&evidence)?;
            println!(
                "\nEvidence {path} added to external/{}, metadata applied...",
                detail.category
            );
        }
        Ok(())
    })?;

    println!("{}", mode.outro());
    Ok(())
}

/// Locker name: basename of the reused clone, or "plant" for fresh ones.
fn locker_name(repo_path: Option<&Path>) -> String {
    repo_path
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "plant".to_string())
}

/// Remove a stale local locker left by an earlier run, then announce
/// the clone.
fn prepare_clone_target(name: &str, locker_url: &Url) -> std::io::Result<()> {
    let target = std::env::temp_dir().join(name);
    if target.is_dir() {
        println!("Local locker found...");
        println!("Removing local locker...");
        fs::remove_dir_all(&target)?;
        println!("Local locker has been removed...");
    }
    println!(
        "Cloning local locker for {locker_url}.  Depending on the size of your locker, this may take a while..."
    );
    Ok(())
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(locker: &str) -> PlantArgs {
        PlantArgs {
            locker: locker.to_string(),
            creds: "~/.credentials".to_string(),
            config: Some("{}".to_string()),
            config_file: None,
            git_config: None,
            git_config_file: None,
            repo_path: None,
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_url() {
        assert!(validate(&args("https://github.com/my-org/my-repo")).is_ok());
    }

    #[test]
    fn test_validate_rejects_url_without_host_or_path() {
        assert!(validate(&args("not-a-url")).is_err());
        assert!(validate(&args("https://github.com")).is_err());
        assert!(validate(&args("file:///tmp/locker")).is_err());
    }

    #[test]
    fn test_validate_requires_exactly_one_config_source() {
        let mut both = args("https://github.com/my-org/my-repo");
        both.config_file = Some(PathBuf::from("config.json"));
        assert!(validate(&both).is_err());

        let mut neither = args("https://github.com/my-org/my-repo");
        neither.config = None;
        assert!(validate(&neither).is_err());
    }

    #[test]
    fn test_validate_rejects_both_git_config_sources() {
        let mut both = args("https://github.com/my-org/my-repo");
        both.git_config = Some("{}".to_string());
        both.git_config_file = Some(PathBuf::from("git.json"));
        assert!(validate(&both).is_err());
    }

    #[test]
    fn test_locker_name_from_repo_path() {
        assert_eq!(
            locker_name(Some(Path::new("/home/me/evidence-locker"))),
            "evidence-locker"
        );
        assert_eq!(locker_name(None), "plant");
    }
}
