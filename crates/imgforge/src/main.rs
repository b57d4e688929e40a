//! `imgforge` CLI entry point: argument parsing, logging setup, and
//! dispatch into the Orchestrator (spec §1 non-goals keep argument parsing
//! itself out of the specified core, but a binary needs one to drive it).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use console::style;
use imgforge_customize::{CustomizeOp, RootPassword};
use imgforge_fetch::{Cache, Phase, Progress};
use imgforge_platform::dirs::default_cache_dir;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use url::Url;

mod capabilities;
mod error;
mod orchestrator;

use error::BuildError;
use orchestrator::{BuildOutcome, BuildRequest, Orchestrator};

const PROGRAM: &str = "imgforge";

#[derive(Parser, Debug)]
#[command(name = "imgforge", version, about = "Builds ready-to-boot VM disk images from a signed repository of templates")]
struct Cli {
    /// Increase log verbosity; repeatable (-v, -vv). Overridden by `RUST_LOG`
    /// when that's set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a disk image for the given os-version.
    Build(BuildArgs),
    /// List templates cached locally.
    List {
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Print a fixed, machine-readable capability description and exit 0.
    Capabilities,
    /// Generate shell completions to stdout.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// The os-version to resolve against configured repositories, e.g.
    /// `fedora-30` or one of its aliases.
    os_version: String,

    /// Where to write the finished image.
    #[arg(short, long)]
    output: PathBuf,

    /// Desired final size in bytes. Suffixes `K`/`M`/`G` are accepted.
    #[arg(long, value_parser = parse_size)]
    size: Option<u64>,

    /// Desired final disk format, e.g. `raw` or `qcow2`.
    #[arg(long)]
    format: Option<String>,

    /// Additional repository source as `name=uri`; may be repeated. Prepended
    /// ahead of configured `repos.d` sources.
    #[arg(long = "source", value_parser = parse_named_source)]
    sources: Vec<(String, Url)>,

    /// GPG fingerprint to trust for the `--source` entries: either one
    /// fingerprint per `--source`, or a single one applied to all of them.
    #[arg(long)]
    fingerprint: Vec<String>,

    /// Cache directory override.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Disable the template cache entirely.
    #[arg(long)]
    no_cache: bool,

    /// Skip signature/checksum verification of fetched indexes and
    /// templates. Off by default; trust verification runs unless this is
    /// passed.
    #[arg(long)]
    no_check_signature: bool,

    /// Print the chosen plan and exit without executing it.
    #[arg(long)]
    dry_run: bool,

    /// `fsync` the output file before exiting.
    #[arg(long)]
    sync: bool,

    /// Treat `--output` as a pre-existing block device rather than a
    /// regular file to create.
    #[arg(long)]
    output_is_block_device: bool,

    /// Do not delete a partially-written `--output` file on failure.
    #[arg(long)]
    no_delete_on_failure: bool,

    /// Transfer tool used for downloads.
    #[arg(long, default_value = "curl")]
    transfer_tool: String,

    #[command(flatten)]
    customize: CustomizeArgs,
}

#[derive(Args, Debug, Default)]
struct CustomizeArgs {
    /// Write `content` to `path` inside the guest, as `path:content`.
    #[arg(long = "write", value_parser = parse_kv)]
    writes: Vec<(String, String)>,

    /// Upload a local file into the guest, as `local:remote`.
    #[arg(long = "upload", value_parser = parse_kv)]
    uploads: Vec<(String, String)>,

    /// Run `sed -i <script>` against `path` inside the guest, as
    /// `path:script`.
    #[arg(long = "edit", value_parser = parse_kv)]
    edits: Vec<(String, String)>,

    /// Delete `path` inside the guest.
    #[arg(long = "delete")]
    deletes: Vec<String>,

    /// Overwrite `path` with zeros before deleting it.
    #[arg(long = "scrub")]
    scrubs: Vec<String>,

    /// Install a local script to run once at the guest's next boot.
    #[arg(long = "firstboot")]
    firstboot_scripts: Vec<PathBuf>,

    /// Upload and run a local script inside the mounted guest immediately.
    #[arg(long = "run")]
    run_scripts: Vec<PathBuf>,

    /// Create a directory (and its parents) inside the guest.
    #[arg(long = "mkdir")]
    mkdirs: Vec<String>,

    /// Install packages inside the guest via its native package manager.
    #[arg(long = "install", value_delimiter = ',')]
    install_packages: Vec<String>,

    /// Set the guest's root password.
    #[arg(long = "root-password")]
    root_password: Option<String>,

    /// Lock the guest's root account instead of setting a password.
    #[arg(long = "lock-root-password", conflicts_with = "root_password")]
    lock_root_password: bool,

    /// Set the guest's root password to a freshly generated random value.
    #[arg(long = "random-root-password", conflicts_with_all = ["root_password", "lock_root_password"])]
    random_root_password: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    install_signal_cleanup();

    let result = match cli.command {
        Command::Build(args) => run_build(args),
        Command::List { cache_dir } => run_list(cache_dir),
        Command::Capabilities => {
            println!("{}", serde_json::to_string_pretty(&capabilities::report()).unwrap());
            Ok(())
        }
        Command::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", style("imgforge:").red().bold());
            ExitCode::from((err.exit_code() as u8).max(1))
        }
    }
}

/// Run every registered cleanup (partial outputs, scoped keyrings, planner
/// temporaries) before exiting on Ctrl-C, instead of leaving them behind for
/// the next `--cache-dir`/`--output` run to trip over.
fn install_signal_cleanup() {
    let _ = ctrlc::set_handler(|| {
        imgforge_fs::run_cleanups();
        std::process::exit(130);
    });
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("{PROGRAM}={default_level}")));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run_build(args: BuildArgs) -> error::Result<()> {
    let root_password = if args.customize.lock_root_password {
        Some(RootPassword::Locked)
    } else if args.customize.random_root_password {
        Some(RootPassword::Random)
    } else {
        args.customize.root_password.clone().map(RootPassword::Plain)
    };

    let mut ops = Vec::new();
    for (path, content) in &args.customize.writes {
        ops.push(CustomizeOp::WriteFile { path: path.clone(), content: content.clone().into_bytes() });
    }
    for (local, remote) in &args.customize.uploads {
        ops.push(CustomizeOp::Upload { local: PathBuf::from(local), remote: remote.clone() });
    }
    for (path, sed_script) in &args.customize.edits {
        ops.push(CustomizeOp::Edit { path: path.clone(), sed_script: sed_script.clone() });
    }
    for path in &args.customize.deletes {
        ops.push(CustomizeOp::Delete { path: path.clone() });
    }
    for path in &args.customize.scrubs {
        ops.push(CustomizeOp::Scrub { path: path.clone() });
    }
    for path in &args.customize.mkdirs {
        ops.push(CustomizeOp::Mkdir { path: path.clone() });
    }
    for script in &args.customize.firstboot_scripts {
        let text = std::fs::read_to_string(script)?;
        ops.push(CustomizeOp::FirstbootScript { script: text });
    }
    for script in &args.customize.run_scripts {
        ops.push(CustomizeOp::RunScript { script: script.clone() });
    }
    if !args.customize.install_packages.is_empty() {
        ops.push(CustomizeOp::InstallPackages { packages: args.customize.install_packages.clone() });
    }
    if let Some(password) = root_password {
        ops.push(CustomizeOp::SetRootPassword { password });
    }

    let request = BuildRequest {
        os_version: args.os_version,
        output: args.output,
        size: args.size,
        format: args.format,
        cli_sources: args.sources,
        fingerprints: args.fingerprint,
        cache_dir: args.cache_dir,
        no_cache: args.no_cache,
        check_signature: !args.no_check_signature,
        dry_run: args.dry_run,
        sync: args.sync,
        output_is_block_device: args.output_is_block_device,
        no_delete_on_failure: args.no_delete_on_failure,
        ops,
        transfer_tool: args.transfer_tool,
    };

    let pb = template_progress_bar();
    let pb_for_cb = pb.clone();
    let progress_cb = move |p: Progress| {
        match p.phase {
            Phase::Connecting => pb_for_cb.set_message("connecting"),
            Phase::Downloading => {
                if let Some(total) = p.total_bytes {
                    pb_for_cb.set_length(total);
                }
                pb_for_cb.set_position(p.bytes_downloaded);
                pb_for_cb.set_message("downloading");
            }
            Phase::Committing => pb_for_cb.set_message("verifying"),
        }
    };

    // No guest-fs backend ships in this workspace (spec §1 non-goals); a
    // build that requests customizations fails with a clear configuration
    // error rather than silently skipping them.
    let outcome = Orchestrator.run(&request, None, Some(&progress_cb));
    pb.finish_and_clear();

    match outcome? {
        BuildOutcome::Plan(plan) => {
            for step in &plan.steps {
                println!("{} (weight {})", step.task, step.weight);
            }
            println!("total weight: {}", plan.total_weight());
        }
        BuildOutcome::Built(path) => {
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// Matches the teacher's `ProgressTracker` styling (spinner, byte counts,
/// ETA) for the one long-running download a build makes.
fn template_progress_bar() -> ProgressBar {
    const STYLE: &str = "{spinner:.cyan} {prefix:>12.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {wide_msg}";
    const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";
    const CHARS: &str = "█▓▒░  ";

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template(STYLE) {
        pb.set_style(style.tick_chars(TICK).progress_chars(CHARS));
    }
    pb.set_prefix("template");
    pb
}

fn run_list(cache_dir: Option<PathBuf>) -> error::Result<()> {
    let dir = match cache_dir.or_else(|| default_cache_dir(PROGRAM)) {
        Some(dir) => dir,
        None => return Err(BuildError::Config("no usable cache directory".to_string())),
    };
    let cache = Cache::new(dir);
    let items = cache.scan()?;
    print!("{}", cache.list(None, &items));
    Ok(())
}

fn parse_named_source(s: &str) -> Result<(String, Url), String> {
    let (name, uri) = s.split_once('=').ok_or_else(|| format!("expected name=uri, got '{s}'"))?;
    let url = Url::parse(uri).map_err(|e| format!("invalid URI '{uri}': {e}"))?;
    Ok((name.to_string(), url))
}

fn parse_kv(s: &str) -> Result<(String, String), String> {
    let (a, b) = s.split_once(':').ok_or_else(|| format!("expected key:value, got '{s}'"))?;
    Ok((a.to_string(), b.to_string()))
}

fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (digits, multiplier) = match s.chars().last() {
        Some('K' | 'k') => (&s[..s.len() - 1], 1024u64),
        Some('M' | 'm') => (&s[..s.len() - 1], 1024 * 1024),
        Some('G' | 'g') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        Some(_) => (s, 1),
        None => return Err("empty size".to_string()),
    };
    let base: u64 = digits.parse().map_err(|_| format!("invalid size '{s}'"))?;
    Ok(base * multiplier)
}
