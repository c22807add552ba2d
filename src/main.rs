use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    let cli = calibre_import::cli::Cli::parse();
    calibre_import::logging::init(cli.verbose).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        calibre_import::cli::Command::Import(args) => {
            calibre_import::importer::run(args).await.context("import")?;
        }
        calibre_import::cli::Command::Genres(args) => {
            calibre_import::importer::genres(args)
                .await
                .context("genres")?;
        }
        calibre_import::cli::Command::Columns(args) => {
            calibre_import::importer::columns(args)
                .await
                .context("columns")?;
        }
    }

    Ok(())
}
