use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdAclError>;

#[derive(Error, Debug)]
pub enum AdAclError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Duplicate role: {0}")]
    DuplicateRole(String),

    #[error("Cyclic role inheritance: {0}")]
    CyclicInheritance(String),

    #[error("Role [{role}] extends unknown role [{parent}]")]
    UnknownParentRole { role: String, parent: String },

    #[error("Unknown {kind} tag: {tag}")]
    UnknownTag { kind: &'static str, tag: String },

    #[error("Role [{0}] does not exist")]
    RoleNotFound(String),

    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ambiguous identity: {0}")]
    Ambiguous(String),

    #[error("[{principal}] cannot perform action [{action}] on [{target}]")]
    NotAllowed {
        principal: String,
        action: String,
        target: String,
    },

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),
}

impl AdAclError {
    /// Errors raised while loading or validating configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            AdAclError::InvalidConfig(_)
                | AdAclError::DuplicateRole(_)
                | AdAclError::CyclicInheritance(_)
                | AdAclError::UnknownParentRole { .. }
                | AdAclError::UnknownTag { .. }
                | AdAclError::Toml(_)
        )
    }

    pub fn is_not_allowed(&self) -> bool {
        matches!(self, AdAclError::NotAllowed { .. })
    }
}
