use clap::Parser;
use std::path::Path;

use arch_probe::core::facts::Catalogue;
use arch_probe::emit;
use arch_probe::probe::LinuxProbe;

#[derive(Parser, Debug)]
#[command(author, about = "Probe host hardware and generate the architecture macro header", long_about = None)]
struct Args {
    /// Comma-separated pmem mount directories, created if absent
    #[arg(short = 'd', long = "pmem_dir", value_delimiter = ',')]
    pmem_dir: Option<Vec<String>>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    rest: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    for flag in args.rest.iter().filter(|arg| arg.starts_with('-')) {
        println!("Unknown operator: {}", flag);
    }

    // Provision before any header output so a failure leaves no partial file.
    if let Some(dirs) = args.pmem_dir.as_deref() {
        emit::provision_dirs(dirs)?;
    }

    let catalogue = Catalogue::collect(&LinuxProbe);
    let output = Path::new(emit::DEFAULT_OUTPUT);
    emit::write_header(output, &catalogue, args.pmem_dir.as_deref())?;

    println!("Wrote {}", emit::DEFAULT_OUTPUT);
    Ok(())
}
