use anyhow::Result;

fn main() -> Result<()> {
    devpurge_cli::run_cli()
}
