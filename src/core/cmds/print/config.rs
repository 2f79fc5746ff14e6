use log::info;

use crate::types::AppResult;
use crate::types::config::config;

pub fn execute(format: String) -> AppResult<i32> {
    let effective_config = config().to_effective();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&effective_config)?);
    } else {
        // Table format
        info!("Effective Configuration:");
        info!("");
        info!("Global:");
        info!("  concurrency: {}", effective_config.concurrency.unwrap());
        info!("  out_dir: {}", effective_config.out_dir.as_ref().unwrap());

        info!("");
        info!("Branch:");
        if let Some(branch) = &effective_config.branch {
            match &branch.kinds {
                Some(kinds) if kinds.is_empty() => info!("  kinds: []"),
                Some(kinds) => info!("  kinds: [{}]", kinds.join(", ")),
                None => info!("  kinds: all enabled"),
            }
        }

        info!("");
        info!("Audit:");
        if let Some(audit) = &effective_config.audit {
            info!("  enabled: {}", audit.enabled.unwrap_or(true));
        }

        info!("");
        info!("Thresholds:");
        if let Some(thresholds) = &effective_config.thresholds {
            match thresholds.line {
                Some(line) => info!("  line: {line}"),
                None => info!("  line: (not set)"),
            }
            match thresholds.branch {
                Some(branch) => info!("  branch: {branch}"),
                None => info!("  branch: (not set)"),
            }
        }

        info!("");
        info!("Log:");
        if let Some(log) = &effective_config.log {
            info!("  level: {}", log.level.as_ref().unwrap());
            match log.color {
                Some(true) => info!("  color: on"),
                Some(false) => info!("  color: off"),
                None => info!("  color: auto"),
            }
        }
    }

    Ok(0)
}
