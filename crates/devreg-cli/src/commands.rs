use std::io::Write;
use std::sync::Arc;

use colored::Colorize;
use devreg_index::IndexSnapshot;
use devreg_oci::HttpRegistryClient;
use devreg_server::{DevregServer, ServerConfig};
use devreg_sync::{
    Catalog, HealthProbe, HttpProbe, PullResolver, ReferenceBuilder, StartupOutcome,
};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config()?;
    match cli.command {
        Command::Serve(_) => cmd_serve(config).await,
        Command::Push(_) => cmd_push(config).await,
        Command::Pull(args) => cmd_pull(config, args).await,
        Command::Probe(_) => cmd_probe(config).await,
    }
}

async fn cmd_serve(config: ServerConfig) -> anyhow::Result<()> {
    let server = DevregServer::new(config);
    match server.startup()?.run().await {
        StartupOutcome::Ready(published) => {
            println!(
                "{} Published {} stacks, serving on {}",
                "✓".green().bold(),
                published.report().len(),
                server.config().bind_addr.to_string().bold()
            );
            server.serve(published).await?;
            Ok(())
        }
        StartupOutcome::Aborted(failure) => {
            eprintln!("{} {}", "✗".red().bold(), failure);
            Err(failure.into())
        }
    }
}

async fn cmd_push(config: ServerConfig) -> anyhow::Result<()> {
    let server = DevregServer::new(config);
    let published = match server.startup()?.run().await {
        StartupOutcome::Ready(published) => published,
        StartupOutcome::Aborted(failure) => {
            eprintln!("{} {}", "✗".red().bold(), failure);
            return Err(failure.into());
        }
    };
    for stack in &published.report().published {
        println!(
            "  {} {} → {} ({})",
            "pushed:".green(),
            stack.name.bold(),
            stack.reference.to_string().cyan(),
            stack.digest.short_hex().dimmed()
        );
    }
    println!("{} {} stacks published", "✓".green().bold(), published.report().len());
    Ok(())
}

async fn cmd_pull(config: ServerConfig, args: PullArgs) -> anyhow::Result<()> {
    let index = IndexSnapshot::load(&config.index_path).await?.into_shared();
    let client = HttpRegistryClient::new(&config.registry.client_config())?;
    let resolver = PullResolver::new(
        Arc::new(client),
        ReferenceBuilder::new(config.registry.host.clone()),
        config.registry.pull_deadline(),
    );
    let resolved = Catalog::new(index, Arc::new(resolver)).resolve(&args.name).await?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &resolved.data)?;
            eprintln!(
                "{} Wrote {} ({} bytes, {})",
                "✓".green().bold(),
                path.display().to_string().bold(),
                resolved.data.len(),
                resolved.content_type
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&resolved.data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

async fn cmd_probe(config: ServerConfig) -> anyhow::Result<()> {
    let client = HttpRegistryClient::new(&config.registry.client_config())?;
    let probe = HttpProbe::new(client, config.registry.host.clone());
    let status = probe.probe().await?;
    if status == 200 {
        println!("{} Registry at {} is up ({})", "✓".green().bold(), probe.endpoint().bold(), status);
    } else {
        println!("{} Registry at {} answered {}", "…".yellow().bold(), probe.endpoint().bold(), status.to_string().yellow());
    }
    Ok(())
}
