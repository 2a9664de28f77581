mod session;
mod sync;

use session::{SessionConfig, SessionRuntime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliMode {
    Run,
    DryRun,
    Help,
}

fn parse_cli_mode<I>(args: I) -> anyhow::Result<CliMode>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = CliMode::Run;
    for arg in args.into_iter().skip(1) {
        match arg.as_str() {
            "--dry-run" => mode = CliMode::DryRun,
            "--help" | "-h" => mode = CliMode::Help,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(mode)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mode = parse_cli_mode(std::env::args())?;
    if mode == CliMode::Help {
        println!("Usage: ropatch [--dry-run]");
        println!("  --dry-run   Check the gate and print the pending plan without downloading");
        return Ok(());
    }

    let config = SessionConfig::from_env()?;
    let runtime = SessionRuntime::bootstrap(config).await?;
    match mode {
        CliMode::DryRun => runtime.run_dry().await,
        _ => runtime.run().await,
    }
}
