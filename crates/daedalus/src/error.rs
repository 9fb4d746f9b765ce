//! Startup errors.

use daedalus_assemblage::AssemblageError;
use daedalus_assembler::AssemblerError;
use daedalus_config::ConfigError;
use daedalus_gateway::GatewayError;
use daedalus_server::DispatchError;
use thiserror::Error;

/// Why a [`Core`](crate::Core) could not be built.
///
/// All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The configuration is inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The assembler could not run.
    #[error(transparent)]
    Assembler(#[from] AssemblerError),

    /// The dispatcher processing could not be compiled.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The assemblage processing could not be compiled.
    #[error(transparent)]
    Assemblage(#[from] AssemblageError),

    /// A gateway record is invalid.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparent_display() {
        let error = CoreError::from(ConfigError::Setting {
            setting: "slicing.default_limit",
            reason: "exceeds maximum_limit 10".to_string(),
        });
        assert!(error.to_string().contains("slicing.default_limit"));
        assert!(matches!(error, CoreError::Config(_)));
    }
}
