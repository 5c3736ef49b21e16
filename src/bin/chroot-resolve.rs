//! Command-line demonstrator for the chroot-relative path resolver: for
//! each argument, prints the native path, the chroot-normalized path, and
//! -- for arguments that look like glob patterns -- the adjusted native
//! glob.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::debug;

use chroot_resolve::chroot::ChrootContext;

#[derive(Parser)]
#[command(name = "chroot-resolve")]
#[command(author, version, about = "Translate paths between a chroot view and the native filesystem")]
struct Cli {
    /// Logical root of the chroot view (empty means the current directory)
    #[arg(long, default_value = "")]
    root: PathBuf,

    /// Native prefix under which `root` actually lives (procfs reflection,
    /// indirect symlink roots)
    #[arg(long)]
    base: Option<PathBuf>,

    /// Paths or glob patterns to translate
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

/// Whether `path` contains a glob metacharacter anywhere, not just a
/// leading one -- used only to decide whether the CLI prints an extra
/// "glob" line, not part of the translation algorithm itself.
fn looks_like_glob(path: &PathBuf) -> bool {
    path.to_string_lossy()
        .chars()
        .any(|c| matches!(c, '*' | '?' | '['))
}

fn run(cli: Cli) -> chroot_resolve::errors::Result<()> {
    let ctx = ChrootContext::new(&cli.root, cli.base.as_ref())?;

    debug!("root={:?} base={:?}", ctx.root(), ctx.base());

    for path in &cli.paths {
        let native = ctx.to_native_path(path)?;
        let chroot = ctx.to_chroot_path(&native)?;

        println!("{}:", path.display());
        println!("  native: {}", native.display());
        println!("  chroot: {}", chroot.display());

        if looks_like_glob(path) {
            let glob = ctx.to_native_glob(path)?;
            println!("  glob:   {}", glob.display());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("chroot-resolve: {}", e);
            ExitCode::FAILURE
        }
    }
}
