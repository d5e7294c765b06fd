use std::fmt::{Debug, Display};
use std::path::PathBuf;

use arcstr::ArcStr;
use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::fingers::FingerError;
use crate::module::ModuleError;
use crate::power::PowerGridError;
use crate::routing::bus::BusError;
use crate::rules::RuleError;

pub type Result<T> = std::result::Result<T, MemgenError>;

pub struct MemgenError {
    pub(crate) source: ErrorSource,
    pub(crate) context: Vec<ErrorContext>,
}

impl MemgenError {
    pub fn source(&self) -> &ErrorSource {
        &self.source
    }

    /// The context frames, innermost first.
    pub fn context(&self) -> &[ErrorContext] {
        &self.context
    }
}

impl std::error::Error for MemgenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl Display for MemgenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Error:\n{}", self.source)?;
        if !self.context.is_empty() {
            writeln!(f, "\nError occurred:")?;
            for item in self.context.iter() {
                writeln!(f, "\twhile {}", item)?;
            }
        }
        Ok(())
    }
}

impl Debug for MemgenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.source)?;
        if !self.context.is_empty() {
            writeln!(f, "\nError occurred:")?;
            for (i, item) in self.context.iter().enumerate() {
                writeln!(f, "\t{}: {:?}", i, item)?;
            }
        }
        Ok(())
    }
}

impl<T> From<T> for MemgenError
where
    T: Into<ErrorSource>,
{
    fn from(value: T) -> Self {
        Self {
            source: value.into(),
            context: Vec::new(),
        }
    }
}

impl MemgenError {
    pub fn new(source: impl Into<ErrorSource>) -> Self {
        Self {
            source: source.into(),
            context: Vec::new(),
        }
    }

    pub fn from_context(source: impl Into<ErrorSource>, ctx: impl Into<ErrorContext>) -> Self {
        Self {
            source: source.into(),
            context: vec![ctx.into()],
        }
    }

    pub fn with_context(mut self, ctx: impl Into<ErrorContext>) -> Self {
        self.context.push(ctx.into());
        self
    }

    #[inline]
    pub fn into_inner(self) -> ErrorSource {
        self.source
    }

    /// The name of the innermost module named in the context, if any.
    pub fn module_name(&self) -> Option<&ArcStr> {
        self.context.iter().find_map(|ctx| match ctx {
            ErrorContext::BuildModule { name } | ErrorContext::Stage { module: name, .. } => {
                Some(name)
            }
            _ => None,
        })
    }
}

#[inline]
pub fn with_err_context<T, E, C>(result: std::result::Result<T, E>, ctx: C) -> Result<T>
where
    C: FnOnce() -> ErrorContext,
    E: Into<MemgenError>,
{
    result.map_err(|err| err.into().with_context(ctx()))
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorContext {
    BuildModule { name: ArcStr },
    Stage { module: ArcStr, stage: ArcStr },
    ReadFile(PathBuf),
    Task(ArcStr),
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorContext::*;
        match self {
            BuildModule { name } => write!(f, "building module {name}"),
            Stage { module, stage } => write!(f, "running stage `{stage}` of module {module}"),
            ReadFile(path) => write!(f, "reading file {path:?}"),
            Task(task) => write!(f, "{task}"),
        }
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorSource {
    #[error("internal error: {0}")]
    Internal(String),

    #[error("design rule query failed: {0}")]
    Rule(#[from] RuleError),

    #[error("module error: {0}")]
    Module(#[from] ModuleError),

    #[error("bus routing error: {0}")]
    Bus(#[from] BusError),

    #[error("power grid error: {0}")]
    PowerGrid(#[from] PowerGridError),

    #[error("module cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("finger sizing error: {0}")]
    Fingers(#[from] FingerError),

    #[error("cannot satisfy `{constraint}`: measured {measured}, required {required}")]
    Infeasible {
        constraint: ArcStr,
        measured: i64,
        required: i64,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error parsing TOML: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("error parsing JSON: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("unexpected error: {0}")]
    Anyhow(#[from] anyhow::Error),
}
