use std::{io, path::PathBuf};

use dwarfzip::{write_zipped, Container, Error};
use structopt::StructOpt;
use tracing::trace;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

#[derive(Debug, StructOpt)]
#[structopt(name = "dwarfzip", about = "delta-compact the DWARF debug info of a binary")]
struct Opt {
    /// Expand a previously compacted binary instead of compacting
    #[structopt(short = "d")]
    expand: bool,
    /// Specify path to the input binary
    #[structopt(parse(from_os_str))]
    input: PathBuf,
    /// Specify path to write the transformed binary to
    #[structopt(parse(from_os_str))]
    output: PathBuf,
}

fn main() -> Result<(), Error> {
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

    let container = Container::open(&opt.input)?;

    if opt.expand {
        if !container.is_zipped() {
            return Err(Error::NotZipped(opt.input.display().to_string()));
        }
        // The compacted form is consumed in place by a form-aware reader;
        // inflating it back is not supported.
        return Err(Error::ExpandUnsupported);
    }

    let summary = write_zipped(&container, &opt.output)?;
    println!("{} => {} ({:.2}%)", summary.input_size, summary.output_size, summary.ratio());
    Ok(())
}
