use ipenrich::app::App;
use ipenrich::cli::Cli;
use ipenrich::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::from_args();
    logging::init(cli.verbose)?;

    let code = App::run(&cli).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
