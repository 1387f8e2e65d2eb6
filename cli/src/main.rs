use std::path::PathBuf;
use std::process::ExitCode;
use clap::Parser;
use leech::{Config, MetaInfo, Torrent};

#[derive(Parser)]
#[command(about = "Download a single-file torrent and write it to disk")]
struct Args {

    #[arg(help = "Path to write the downloaded file to")]
    output: PathBuf,

    #[arg(help = "Path to torrent file")]
    torrent: PathBuf,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,

}

#[tokio::main]
async fn main() -> ExitCode {

    let args = Args::parse();

    // Set up logging.
    let level = if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let sub = tracing_subscriber::fmt()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(sub).unwrap();

    // Session-level trouble is logged inside the engine; anything that
    // surfaces here is fatal.
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        },
    }
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {

    let metainfo = MetaInfo::new(&args.torrent)?;
    tracing::info!(
        "loaded {}: {} bytes in {} pieces",
        args.torrent.display(),
        metainfo.total_len(),
        metainfo.num_pieces(),
    );

    let torrent = Torrent::new(metainfo, Config::default());
    let data = torrent.download().await?;

    std::fs::write(&args.output, &data)?;
    tracing::info!("wrote {} bytes to {}", data.len(), args.output.display());
    Ok(())
}
