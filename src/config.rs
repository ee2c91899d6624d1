use crate::error::AdAclError;
use crate::security::acl::DenyEvaluation;
use crate::security::roles::{CatalogOptions, InheritanceMode, RoleCatalog, RoleDefinition};

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub role_manager: RoleManagerConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleManagerConfig {
    /// How parent role actions propagate: "transitive" or "direct"
    #[serde(default)]
    pub inheritance: InheritanceMode,
    /// Fail catalog loads that reference unknown parent roles
    #[serde(default)]
    pub strict_parent_references: bool,
    /// How Deny entries fold into effective rights: "union" or "precedence"
    #[serde(default)]
    pub deny_evaluation: DenyEvaluation,
    #[serde(default)]
    pub roles: Vec<RoleDefinition>,
}

impl Default for RoleManagerConfig {
    fn default() -> Self {
        Self {
            inheritance: InheritanceMode::Transitive,
            strict_parent_references: false,
            deny_evaluation: DenyEvaluation::Union,
            roles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Process batch objects one at a time, in order
    #[serde(default)]
    pub run_sequential: bool,
    /// Upper bound on concurrently processed objects
    #[serde(default = "default_max_parallelism")]
    pub max_parallelism: usize,
    /// Attach each object's resulting access rules to its result
    #[serde(default)]
    pub return_access_rules: bool,
}

fn default_max_parallelism() -> usize {
    8
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            run_sequential: false,
            max_parallelism: default_max_parallelism(),
            return_access_rules: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Record allowed decisions as well as denials
    #[serde(default)]
    pub log_allowed_decisions: bool,
    #[serde(default = "default_max_buffered_events")]
    pub max_buffered_events: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_buffered_events() -> usize {
    1000
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_allowed_decisions: false, // Too verbose for production
            max_buffered_events: default_max_buffered_events(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.role_manager.validate()?;
        self.dispatch.validate()?;
        self.audit.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

impl RoleManagerConfig {
    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            inheritance: self.inheritance,
            strict_parent_references: self.strict_parent_references,
        }
    }

    /// Checks the roles load into a catalog
    pub fn validate(&self) -> crate::Result<()> {
        RoleCatalog::load(&self.roles, self.catalog_options()).map(|_| ())
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_parallelism == 0 {
            return Err(AdAclError::InvalidConfig(
                "dispatch.max_parallelism must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl AuditConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.enabled && self.max_buffered_events == 0 {
            return Err(AdAclError::InvalidConfig(
                "audit.max_buffered_events must be greater than 0 when audit is enabled"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.level.trim().is_empty() {
            return Err(AdAclError::InvalidConfig(
                "logging.level cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
