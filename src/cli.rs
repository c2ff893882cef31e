//! CLI definitions and command routing.

use anyhow::Result;
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};

use crate::config::{default_config_path, FileConfig, Settings};
use crate::dispatch::{dispatch, Operation};
use crate::store::{Store, StoreKind};
use crate::tool::{SystemRunner, ToolRunner};

#[derive(Parser)]
#[command(name = "trustctl")]
#[command(about = "Add, remove or check trust certificates across certificate stores")]
pub struct Cli {
    #[command(flatten)]
    pub mode: ModeArgs,

    /// Use the OpenSSL hashed directory store (<hash>.0 symlinks)
    #[arg(long)]
    pub enable_openssl: bool,
    /// Use the NSS database store (managed with certutil)
    #[arg(long)]
    pub enable_nss: bool,
    /// Use the flat certificate directory store
    #[arg(long)]
    pub enable_flat: bool,

    /// OpenSSL store directory [default: /etc/ssl/certs]
    #[arg(long, value_name = "DIR")]
    pub openssl_dir: Option<PathBuf>,
    /// NSS database directory [default: ~/.pki/nssdb]
    #[arg(long, value_name = "DIR")]
    pub nss_db: Option<PathBuf>,
    /// Flat store directory [default: /usr/local/share/ca-certificates]
    #[arg(long, value_name = "DIR")]
    pub flat_dir: Option<PathBuf>,

    /// openssl executable [default: openssl]
    #[arg(long, value_name = "PATH")]
    pub openssl_bin: Option<PathBuf>,
    /// certutil executable [default: certutil]
    #[arg(long, value_name = "PATH")]
    pub certutil_bin: Option<PathBuf>,

    /// Config file (defaults to $TRUSTCTL_CONFIG or the user config dir)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Certificate files
    #[arg(required = true, value_name = "CERT")]
    pub certs: Vec<PathBuf>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct ModeArgs {
    /// Install the certificates
    #[arg(long)]
    pub add: bool,
    /// Uninstall the certificates
    #[arg(long)]
    pub remove: bool,
    /// Report whether each store holds the certificates
    #[arg(long)]
    pub check: bool,
}

impl ModeArgs {
    pub fn operation(&self) -> Operation {
        if self.add {
            Operation::Add
        } else if self.remove {
            Operation::Remove
        } else {
            Operation::Check
        }
    }
}

impl Cli {
    /// Location and tool overrides given on the command line.
    pub fn overrides(&self) -> FileConfig {
        FileConfig {
            openssl_dir: self.openssl_dir.clone(),
            nss_db: self.nss_db.clone(),
            flat_dir: self.flat_dir.clone(),
            openssl: self.openssl_bin.clone(),
            certutil: self.certutil_bin.clone(),
        }
    }
}

/// Enabled stores in the order their flags appear on the command line.
pub fn selected_stores(cli: &Cli, matches: &ArgMatches) -> Vec<StoreKind> {
    let mut kinds: Vec<(usize, StoreKind)> = [
        (cli.enable_openssl, "enable_openssl", StoreKind::OpenSsl),
        (cli.enable_nss, "enable_nss", StoreKind::Nss),
        (cli.enable_flat, "enable_flat", StoreKind::Flat),
    ]
    .into_iter()
    .filter(|(enabled, _, _)| *enabled)
    .map(|(_, id, kind)| (matches.index_of(id).unwrap_or(usize::MAX), kind))
    .collect();
    kinds.sort_by_key(|(idx, _)| *idx);
    kinds.into_iter().map(|(_, kind)| kind).collect()
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .try_init();
}

/// Parse arguments and run. Returns false if any store or operation failed.
pub fn run() -> Result<bool> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    init_logging(cli.verbose);

    let file_config = match (&cli.config, default_config_path()) {
        (Some(path), _) => FileConfig::load(path)?,
        (None, Some(path)) => FileConfig::load_or_default(&path)?,
        (None, None) => FileConfig::default(),
    };
    let mut settings = Settings::from_file(&file_config);
    settings.apply(&cli.overrides());

    let kinds = selected_stores(&cli, &matches);
    if kinds.is_empty() {
        anyhow::bail!("no store selected; pass --enable-openssl, --enable-nss or --enable-flat");
    }

    let runner: Arc<dyn ToolRunner> = Arc::new(SystemRunner);
    let (stores, opened) = open_stores(&kinds, &settings, runner);

    let op = cli.mode.operation();
    info!(%op, certs = cli.certs.len(), stores = stores.len(), "dispatching");
    let summary = dispatch(op, &cli.certs, &stores, &mut io::stdout().lock())?;
    Ok(opened && summary.ok())
}

/// Open each store; a store that cannot be opened is reported and skipped.
pub fn open_stores(
    kinds: &[StoreKind],
    settings: &Settings,
    runner: Arc<dyn ToolRunner>,
) -> (Vec<Store>, bool) {
    let mut stores = Vec::new();
    let mut all_opened = true;
    for &kind in kinds {
        match Store::open(kind, settings, runner.clone()) {
            Ok(store) => stores.push(store),
            Err(e) => {
                all_opened = false;
                warn!(store = %kind, error = %e, "skipping store");
                println!("{kind}: skipped: {e}");
            }
        }
    }
    (stores, all_opened)
}
