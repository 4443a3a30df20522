use std::{io, path::PathBuf};

use dwarfzip::{scan, Container, StatCollector};
use structopt::StructOpt;
use tracing::trace;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

#[derive(Debug, StructOpt)]
#[structopt(name = "dwarfstat", about = "report size breakdowns of a binary's DWARF debug info")]
struct Opt {
    /// Specify path to the binary to inspect
    #[structopt(parse(from_os_str))]
    binary: PathBuf,
}

fn main() -> Result<(), dwarfzip::Error> {
    let filter =
        EnvFilter::try_from_env("DWARFZIP_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default().with(filter).with(
        HierarchicalLayer::default()
            .with_writer(io::stderr)
            .with_indent_lines(true)
            .with_targets(true)
            .with_indent_amount(2),
    );
    tracing::subscriber::set_global_default(subscriber).expect("failed to set subscriber");

    let opt = Opt::from_args();
    trace!(?opt);

    let container = Container::open(&opt.binary)?;
    let mut stats = StatCollector::new();
    scan(&container, &mut stats)?;

    let stdout = io::stdout();
    stats.write_report(&mut stdout.lock())?;
    Ok(())
}
