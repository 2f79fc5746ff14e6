use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use log::{debug, warn};

use crate::FrontendRegistry;
use crate::core::cli::{Args, Commands, PrintArgs};
use crate::core::cmds;
use crate::core::logging::init_logging;
use crate::types::AppResult;
use crate::types::config::{CliOverrides, init_with_overrides};

pub fn run_main(registry: Arc<FrontendRegistry>) -> AppResult<()> {
    let args = Args::parse();

    // Handle global arguments
    if let Some(cwd_arg) = args.cwd.as_ref() {
        let cwd = PathBuf::from(cwd_arg).canonicalize()?;
        let _ = env::set_current_dir(&cwd);
    }
    let cwd = env::current_dir()?;

    // Build CLI overrides for config precedence
    let cli_overrides = CliOverrides {
        config_path: args.config.clone(),
        log_level: args.log_level.clone(),
        log_color: args.log_color.clone(),
        ..Default::default()
    };

    // Initialize configuration (file, then CLI overrides)
    init_with_overrides(&cli_overrides);

    // Initialize logging after config so level/color are applied
    init_logging();
    debug!("Current working directory: {}", cwd.display());
    debug!("Registered front ends: {}", registry.all_languages().join(", "));

    // Setup running flag to handle signals from ctrl-c
    let running = Arc::new(AtomicBool::new(true));
    let running_ctrlc = Arc::clone(&running);

    ctrlc::set_handler(move || {
        warn!("Received Ctrl-C, cleaning up..");
        running_ctrlc.store(false, Ordering::SeqCst);
    })
    .expect("Error creating a Ctrl-C handler");

    // Dispatch to appropriate command; each returns a process exit code
    let exit_code = match args.command {
        Commands::Init => cmds::execute_init()?,
        Commands::Instrument(instrument_args) => {
            cmds::execute_instrument(instrument_args, Arc::clone(&registry), Arc::clone(&running))?
        }
        Commands::Merge(merge_args) => cmds::execute_merge(merge_args)?,
        Commands::Report(report_args) => cmds::execute_report(report_args)?,
        Commands::Print { command } => match command {
            PrintArgs::Config(print_args) => cmds::print::config::execute(print_args.format)?,
            PrintArgs::Units(print_args) => cmds::print::units::execute(print_args)?,
        },
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
