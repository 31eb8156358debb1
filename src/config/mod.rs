pub mod types;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use regex::Regex;

use crate::error::ConfigError;
use types::{PipelineConfig, Step};

/// Default search path for the pipeline config file, platform-native,
/// mirroring how a user-level config directory is resolved elsewhere in
/// this crate's ambient stack.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("job-signal/pipeline.json"))
}

/// Load a `PipelineConfig` from `path`. Returns `Ok(None)` if the file does
/// not exist so callers can fall back to [`PipelineConfig::default`].
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, contains invalid
/// JSON, or fails step/identifier validation.
pub fn try_load_config(path: &Path) -> Result<Option<PipelineConfig>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            });
        }
    };
    let config: PipelineConfig =
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    validate(&config)?;
    Ok(Some(config))
}

/// Load a `PipelineConfig` from `path`, or the built-in default if the file
/// is absent, then apply environment-variable overrides.
///
/// # Errors
///
/// Propagates [`try_load_config`]'s errors, plus any raised by applying
/// environment overrides (e.g. an unparsable `PIPELINE_STEPS` list).
pub fn load_or_default(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let mut config = try_load_config(path)?.unwrap_or_default();
    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Apply the documented `SEMANTIC_*`, `ENABLE_LINE_FILTER`, and
/// `PIPELINE_STEPS` environment variables on top of an already-loaded config.
/// Absent variables leave the corresponding field untouched.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownStep`] if `PIPELINE_STEPS` names a step that
/// does not exist.
pub fn apply_env_overrides(config: &mut PipelineConfig) -> Result<(), ConfigError> {
    if let Ok(v) = std::env::var("SEMANTIC_THRESHOLD")
        && let Ok(v) = v.parse()
    {
        config.semantic_templates.global_threshold = v;
    }
    if let Ok(v) = std::env::var("SEMANTIC_JOB_GLOBAL_THRESHOLD")
        && let Ok(v) = v.parse()
    {
        config.semantic_templates.global_threshold = v;
    }
    if let Ok(v) = std::env::var("SEMANTIC_JOB_FIELD_THRESHOLD")
        && let Ok(v) = v.parse()
    {
        config.semantic_templates.field_threshold = v;
    }
    if let Ok(v) = std::env::var("SEMANTIC_CONTEXT_RADIUS")
        && let Ok(v) = v.parse()
    {
        config.semantic_templates.context_radius = v;
    }
    if let Ok(v) = std::env::var("SEMANTIC_BATCH_SIZE")
        && let Ok(v) = v.parse()
    {
        config.semantic_templates.batch_size = v;
    }
    if let Ok(v) = std::env::var("ENABLE_LINE_FILTER") {
        let enabled = matches!(v.as_str(), "1" | "true" | "yes");
        let has = config.steps.contains(&Step::LineFilter);
        if enabled && !has {
            config.steps.insert(0, Step::LineFilter);
        } else if !enabled && has {
            config.steps.retain(|s| *s != Step::LineFilter);
        }
    }
    if let Ok(v) = std::env::var("PIPELINE_STEPS") {
        let mut steps = Vec::new();
        for name in v.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let step =
                Step::from_name(name).ok_or_else(|| ConfigError::UnknownStep(name.to_string()))?;
            steps.push(step);
        }
        config.steps = steps;
    }
    // SEMANTIC_MODEL and SEMANTIC_DEVICE select the embedding provider's
    // model/device at construction time, outside this module (see
    // `main::build_embedding_provider`); there is no corresponding config
    // field to override here.
    Ok(())
}

/// Validate step ordering and identifier safety.
///
/// # Errors
///
/// Returns [`ConfigError::StepOrder`] if `cleaner` or `line_filter` appear
/// after a stage they must precede, or [`ConfigError::UnsafeIdentifier`] if
/// `index_rules.table_name` is not a safe SQL-style identifier.
pub fn validate(config: &PipelineConfig) -> Result<(), ConfigError> {
    validate_step_order(&config.steps)?;
    if let Some(name) = &config.index_rules.table_name {
        validate_identifier(name)?;
    }
    for pattern in &config.split_markers {
        Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
    }
    Ok(())
}

fn validate_step_order(steps: &[Step]) -> Result<(), ConfigError> {
    let pos = |step: Step| steps.iter().position(|s| *s == step);

    if let Some(cleaner) = pos(Step::Cleaner) {
        for consumer in [Step::LineFilter, Step::Semantic, Step::Splitter] {
            if let Some(i) = pos(consumer)
                && i < cleaner
            {
                return Err(ConfigError::StepOrder(format!(
                    "cleaner must precede {}",
                    consumer.name()
                )));
            }
        }
    }
    if let Some(line_filter) = pos(Step::LineFilter) {
        for consumer in [Step::Semantic, Step::Splitter] {
            if let Some(i) = pos(consumer)
                && i < line_filter
            {
                return Err(ConfigError::StepOrder(format!(
                    "line_filter must precede {}",
                    consumer.name()
                )));
            }
        }
    }
    if let (Some(aggregator), Some(last)) = (pos(Step::Aggregator), steps.len().checked_sub(1))
        && aggregator != last
    {
        return Err(ConfigError::StepOrder(
            "aggregator must run last".to_string(),
        ));
    }
    Ok(())
}

/// Reject identifiers unsafe to interpolate into a SQL-target table name,
/// mirroring the validation the (external) index-rule store performs on its
/// own input.
fn validate_identifier(name: &str) -> Result<(), ConfigError> {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    #[allow(clippy::unwrap_used)] // the literal pattern is known to compile
    let re = PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
    if re.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::UnsafeIdentifier(name.to_string()))
    }
}

/// A published, atomically-swappable configuration snapshot. Cloning the
/// inner `Arc` is cheap; an in-flight pipeline invocation holds its clone for
/// its whole lifetime and is unaffected by a later [`ConfigHandle::reload`].
#[derive(Clone)]
pub struct ConfigHandle {
    current: Arc<Mutex<Arc<PipelineConfig>>>,
}

impl ConfigHandle {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            current: Arc::new(Mutex::new(Arc::new(config))),
        }
    }

    /// Take a snapshot of the currently published configuration.
    #[allow(clippy::missing_panics_doc)] // poisoned mutex indicates an unrecoverable bug
    pub fn snapshot(&self) -> Arc<PipelineConfig> {
        #[allow(clippy::unwrap_used)]
        Arc::clone(&self.current.lock().unwrap())
    }

    /// Publish a new configuration. Requests already holding a snapshot keep
    /// using their own copy.
    ///
    /// # Errors
    ///
    /// Propagates validation errors from the new config.
    #[allow(clippy::missing_panics_doc)]
    pub fn reload(&self, config: PipelineConfig) -> Result<(), ConfigError> {
        validate(&config)?;
        #[allow(clippy::unwrap_used)]
        {
            *self.current.lock().unwrap() = Arc::new(config);
        }
        Ok(())
    }
}
