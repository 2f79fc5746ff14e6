use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::types::{BranchKind, BranchKinds};

pub const CONFIG_FILENAME: &str = "reach.toml";

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LogConfig {
    pub level: Option<String>,
    pub color: Option<bool>, // None = auto-detect (semantic)
}

impl LogConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }

    pub fn color(&self) -> Option<bool> {
        self.color // None has semantic meaning (auto-detect)
    }

    pub fn to_effective(&self) -> Self {
        Self {
            level: Some(self.level().to_string()),
            color: self.color,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BranchConfig {
    pub kinds: Option<Vec<String>>, // None = all kinds enabled (semantic)
}

impl BranchConfig {
    /// Parse the configured kinds, silently keeping only recognized names
    pub fn kinds(&self) -> BranchKinds {
        match &self.kinds {
            None => BranchKinds::all(),
            Some(names) => BranchKinds::new(
                names
                    .iter()
                    .filter_map(|n| BranchKind::from_str(n).ok())
                    .collect(),
            ),
        }
    }

    pub fn to_effective(&self) -> Self {
        Self {
            kinds: Some(
                self.kinds()
                    .kinds()
                    .iter()
                    .map(|k| k.to_string())
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuditConfig {
    pub enabled: Option<bool>,
}

impl AuditConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn to_effective(&self) -> Self {
        Self {
            enabled: Some(self.enabled()),
        }
    }
}

/// Optional minimum ratios; when set, a report below them fails the run
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ThresholdConfig {
    pub line: Option<f64>,
    pub branch: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    // Top-level fields
    pub concurrency: Option<usize>,
    pub out_dir: Option<String>,

    // Nested sections
    pub branch: Option<BranchConfig>,
    pub audit: Option<AuditConfig>,
    pub thresholds: Option<ThresholdConfig>,
    pub log: Option<LogConfig>,
}

impl Config {
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(4).max(1)
    }

    pub fn out_dir(&self) -> &str {
        self.out_dir.as_deref().unwrap_or("coverage-out")
    }

    pub fn branch(&self) -> BranchConfig {
        self.branch.clone().unwrap_or_default()
    }

    pub fn audit(&self) -> AuditConfig {
        self.audit.clone().unwrap_or_default()
    }

    pub fn thresholds(&self) -> ThresholdConfig {
        self.thresholds.clone().unwrap_or_default()
    }

    pub fn log(&self) -> LogConfig {
        self.log.clone().unwrap_or_default()
    }

    pub fn to_effective(&self) -> Self {
        Self {
            concurrency: Some(self.concurrency()),
            out_dir: Some(self.out_dir().to_string()),
            branch: Some(self.branch().to_effective()),
            audit: Some(self.audit().to_effective()),
            thresholds: Some(self.thresholds()),
            log: Some(self.log().to_effective()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<String>,
    pub concurrency: Option<usize>,
    pub out_dir: Option<String>,
    pub branch_kinds: Option<String>, // csv
    pub log_level: Option<String>,
    pub log_color: Option<String>, // "on" | "off"
}

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn config() -> &'static Config {
    CONFIG.get_or_init(|| {
        let mut cfg = Config::default();
        if let Some(path) = find_nearest_config_file()
            && let Some(file_cfg) = read_config_file(&path)
        {
            apply_file_config(&mut cfg, &file_cfg);
        }
        cfg
    })
}

pub fn init_with_overrides(overrides: &CliOverrides) {
    let mut cfg = Config::default();

    // 1) Config file: explicit --config path, else walk up from cwd
    let file_path = overrides
        .config_path
        .as_ref()
        .map(PathBuf::from)
        .or_else(find_nearest_config_file);
    if let Some(path) = file_path
        && let Some(file_cfg) = read_config_file(&path)
    {
        apply_file_config(&mut cfg, &file_cfg);
    }

    // 2) CLI arguments (highest priority). Only override if user specified.
    apply_cli_overrides(&mut cfg, overrides);

    let _ = CONFIG.set(cfg);
}

fn read_config_file(path: &Path) -> Option<Config> {
    match fs::read_to_string(path) {
        Ok(contents) => toml::from_str::<Config>(&contents).ok(),
        Err(_) => None,
    }
}

fn apply_file_config(cfg: &mut Config, file: &Config) {
    if file.concurrency.is_some() {
        cfg.concurrency = file.concurrency;
    }
    if file.out_dir.is_some() {
        cfg.out_dir = file.out_dir.clone();
    }
    if let Some(file_branch) = &file.branch {
        let mut branch = cfg.branch.clone().unwrap_or_default();
        if file_branch.kinds.is_some() {
            branch.kinds = file_branch.kinds.clone(); // override semantics
        }
        cfg.branch = Some(branch);
    }
    if let Some(file_audit) = &file.audit {
        let mut audit = cfg.audit.clone().unwrap_or_default();
        if file_audit.enabled.is_some() {
            audit.enabled = file_audit.enabled;
        }
        cfg.audit = Some(audit);
    }
    if let Some(file_thresholds) = &file.thresholds {
        let mut thresholds = cfg.thresholds.clone().unwrap_or_default();
        if file_thresholds.line.is_some() {
            thresholds.line = file_thresholds.line;
        }
        if file_thresholds.branch.is_some() {
            thresholds.branch = file_thresholds.branch;
        }
        cfg.thresholds = Some(thresholds);
    }
    if let Some(file_log) = &file.log {
        let mut log = cfg.log.clone().unwrap_or_default();
        if file_log.level.is_some() {
            log.level = file_log.level.clone();
        }
        if file_log.color.is_some() {
            log.color = file_log.color;
        }
        cfg.log = Some(log);
    }
}

fn apply_cli_overrides(cfg: &mut Config, overrides: &CliOverrides) {
    if overrides.concurrency.is_some() {
        cfg.concurrency = overrides.concurrency;
    }
    if overrides.out_dir.is_some() {
        cfg.out_dir = overrides.out_dir.clone();
    }
    if let Some(kinds_csv) = &overrides.branch_kinds {
        let list = parse_csv(kinds_csv);
        if !list.is_empty() {
            let mut branch = cfg.branch.clone().unwrap_or_default();
            branch.kinds = Some(list);
            cfg.branch = Some(branch);
        }
    }

    // Log overrides
    let mut log = cfg.log.clone().unwrap_or_default();
    if let Some(level) = &overrides.log_level
        && !level.trim().is_empty()
    {
        log.level = Some(level.trim().to_string());
    }
    if let Some(color_str) = &overrides.log_color {
        match color_str.to_lowercase().as_str() {
            "on" => log.color = Some(true),
            "off" => log.color = Some(false),
            _ => {}
        }
    }
    if overrides.log_level.is_some() || overrides.log_color.is_some() {
        cfg.log = Some(log);
    }
}

fn parse_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn find_nearest_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    for dir in cwd.ancestors() {
        let candidate = dir.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

pub fn colors_enabled() -> bool {
    match config().log().color() {
        Some(force) => force,
        None => console::colors_enabled(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_kinds_parse_and_ignore_unknown() {
        let branch = BranchConfig {
            kinds: Some(vec![
                "if".to_string(),
                "short-circuit".to_string(),
                "bogus".to_string(),
            ]),
        };
        let kinds = branch.kinds();
        assert!(kinds.enabled(BranchKind::If));
        assert!(kinds.enabled(BranchKind::ShortCircuit));
        assert!(!kinds.enabled(BranchKind::Loop));
    }

    #[test]
    fn file_then_cli_precedence() {
        let mut cfg = Config::default();
        let file: Config = toml::from_str(
            r#"
            concurrency = 8
            [thresholds]
            line = 0.8
            [log]
            level = "debug"
            "#,
        )
        .unwrap();
        apply_file_config(&mut cfg, &file);
        assert_eq!(cfg.concurrency(), 8);
        assert_eq!(cfg.thresholds().line, Some(0.8));

        apply_cli_overrides(
            &mut cfg,
            &CliOverrides {
                concurrency: Some(2),
                log_level: Some("warn".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(cfg.concurrency(), 2);
        assert_eq!(cfg.log().level(), "warn");
        // untouched by CLI
        assert_eq!(cfg.thresholds().line, Some(0.8));
    }
}
