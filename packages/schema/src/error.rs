use thiserror::Error;

/// Registry misconfiguration. Raised while building a schema, never at edit time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Type '{0}' is already registered")]
    DuplicateType(String),

    #[error("Type '{0}' is reserved")]
    ReservedType(String),

    #[error("Default for '{owner}.{attr}' is incompatible with its type: {reason}")]
    IncompatibleDefault {
        owner: String,
        attr: String,
        reason: String,
    },
}

/// A node or mark that does not conform to the registered schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unknown node type '{0}'")]
    UnknownNodeType(String),

    #[error("Unknown mark type '{0}'")]
    UnknownMarkType(String),

    #[error("'{owner}' has no attribute '{name}'")]
    UnknownAttribute { owner: String, name: String },

    #[error("'{owner}' is missing required attribute '{name}'")]
    MissingAttribute { owner: String, name: String },

    #[error("Invalid value for '{owner}.{name}': {reason}")]
    InvalidAttribute {
        owner: String,
        name: String,
        reason: String,
    },

    #[error("Malformed '{node_type}' node: {reason}")]
    InvalidShape { node_type: String, reason: String },

    #[error("'{child}' is not allowed inside '{parent}'")]
    DisallowedChild { parent: String, child: String },

    #[error("Mark '{0}' appears twice on the same run")]
    DuplicateMark(String),

    #[error("Marks '{first}' and '{second}' cannot be combined")]
    ExclusiveMarks { first: String, second: String },

    #[error("Document root must be '{expected}', found '{found}'")]
    InvalidRoot { expected: String, found: String },

    #[error("Diagram id '{0}' is used more than once")]
    DuplicateDiagramId(String),
}
