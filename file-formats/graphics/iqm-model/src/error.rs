use std::io;
use thiserror::Error;

/// Error types for IQM model parsing and animation
#[derive(Error, Debug)]
pub enum IqmError {
    /// I/O Error during reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid magic signature in the file header
    #[error("Invalid magic signature: expected '{expected}', got '{actual}'")]
    InvalidMagic { expected: String, actual: String },

    /// Unsupported file version
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    /// Error during parsing (truncated data, out-of-range offsets or indices)
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A vertex array declared a component format or count the loader cannot accept
    #[error("Invalid vertex array: {kind} arrays cannot use format {format} with {size} components")]
    InvalidVertexArray {
        kind: &'static str,
        format: u32,
        size: u32,
    },

    /// The pose channel table does not describe the bone table
    #[error("Channel count mismatch: {bones} bones but {channels} pose channels")]
    ChannelCountMismatch { bones: u32, channels: u32 },

    /// Bone parents must precede their children
    #[error("Invalid hierarchy: bone {bone} has parent {parent}")]
    InvalidHierarchy { bone: usize, parent: i32 },

    /// A bind matrix could not be inverted
    #[error("Singular bind matrix for bone {bone} ('{name}')")]
    SingularBindMatrix { bone: usize, name: String },

    /// Reference error: a bone, clip or scene node could not be resolved
    #[error("Reference error: {0}")]
    ReferenceError(String),

    /// A fixed capacity would be exceeded
    #[error("Resource limit exceeded: {count} {what} (maximum {max})")]
    ResourceLimit {
        what: &'static str,
        count: usize,
        max: usize,
    },

    /// Attaching the armature would make it its own ancestor
    #[error("Attach cycle: armature {child} is an ancestor of armature {parent}")]
    AttachCycle { child: usize, parent: usize },
}

impl IqmError {
    /// Whether this error describes a malformed file rather than an I/O,
    /// reference or capacity problem
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidMagic { .. }
                | Self::UnsupportedVersion(_)
                | Self::ParseError(_)
                | Self::InvalidVertexArray { .. }
                | Self::ChannelCountMismatch { .. }
                | Self::InvalidHierarchy { .. }
                | Self::SingularBindMatrix { .. }
        )
    }
}

/// Result type using IqmError
pub type Result<T> = std::result::Result<T, IqmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = IqmError::ParseError("Test error".to_string());
        assert_eq!(format!("{}", error), "Parse error: Test error");

        let error = IqmError::ChannelCountMismatch {
            bones: 3,
            channels: 2,
        };
        assert_eq!(
            format!("{}", error),
            "Channel count mismatch: 3 bones but 2 pose channels"
        );

        let error = IqmError::ResourceLimit {
            what: "bones",
            count: 300,
            max: 256,
        };
        assert_eq!(
            format!("{}", error),
            "Resource limit exceeded: 300 bones (maximum 256)"
        );
    }

    #[test]
    fn test_format_error_classification() {
        assert!(IqmError::UnsupportedVersion(1).is_format_error());
        assert!(!IqmError::ReferenceError("bone".into()).is_format_error());
        assert!(
            !IqmError::Io(io::Error::new(io::ErrorKind::NotFound, "missing")).is_format_error()
        );
    }
}
