use anyhow::Result;

use chatsync::{
    domain,
    infra::{error::AppError, replay::load_fixture},
    ui,
    usecases::bootstrap,
};

use crate::cli::{Cli, Command};

const REPLAY_FINISHED: &str = "REPLAY_FINISHED";

pub fn run(cli: Cli) -> Result<()> {
    let context = bootstrap::bootstrap(cli.config.as_deref())?;

    tracing::debug!(domain = domain::module_name(), "module boundaries loaded");

    match cli.command {
        Command::Replay { fixture } => {
            let fixture = load_fixture(&fixture)?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(AppError::Runtime)?;

            let outcome = runtime.block_on(ui::replay::run_replay(fixture, &context.config))?;
            tracing::info!(
                code = REPLAY_FINISHED,
                steps = outcome.steps_run,
                messages = outcome.view.messages.len(),
                "replay finished"
            );
            println!("{}", ui::report::render(&outcome));
        }
    }

    Ok(())
}
