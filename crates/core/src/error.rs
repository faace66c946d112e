//! Error types for SiftQL.

use core::fmt;

/// Result type alias for SiftQL operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for query parsing, access control and execution.
///
/// Errors are `Clone` so that a single failed computation can be handed to
/// every caller waiting on the same cache entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Malformed query text.
    Syntax {
        message: String,
        fragment: String,
    },
    /// Table is not part of the schema catalog.
    UnknownTable {
        name: String,
    },
    /// Column is not part of the table's schema.
    UnknownColumn {
        table: String,
        column: String,
    },
    /// Table or columns rejected by the whitelist or the caller allowlist.
    AccessDenied {
        table: String,
        columns: Vec<String>,
        reason: String,
    },
    /// A statement referenced a variable no earlier statement produced.
    UnresolvedVariable {
        name: String,
    },
    /// A `ONE` reference was evaluated outside an iteration over that variable.
    LoopContextRequired {
        variable: String,
    },
    /// A variable was accessed in a way its values do not support.
    VariableShape {
        variable: String,
        message: String,
    },
    /// Statement is structurally valid text but cannot be executed.
    InvalidQuery {
        message: String,
    },
    /// Caller-facing request error with a remediation hint.
    BadRequest {
        message: String,
        hint: String,
    },
    /// Storage layer failure.
    Storage {
        message: String,
    },
    /// No function registered under this name.
    UnknownFunction {
        name: String,
    },
    /// Function pipeline failed static validation.
    InvalidPipeline {
        errors: Vec<String>,
    },
    /// A pipeline function rejected its arguments or input.
    Function {
        name: String,
        message: String,
    },
    /// Invalid catalog, whitelist or engine configuration.
    Config {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Syntax { message, fragment } => {
                write!(f, "Syntax error: {} near '{}'", message, fragment)
            }
            Error::UnknownTable { name } => write!(f, "Unknown table: {}", name),
            Error::UnknownColumn { table, column } => {
                write!(f, "Column {} not found in table {}", column, table)
            }
            Error::AccessDenied {
                table,
                columns,
                reason,
            } => {
                if columns.is_empty() {
                    write!(f, "Access denied to table {}: {}", table, reason)
                } else {
                    write!(
                        f,
                        "Access denied to columns [{}] of table {}: {}",
                        columns.join(", "),
                        table,
                        reason
                    )
                }
            }
            Error::UnresolvedVariable { name } => {
                write!(f, "Variable ${} is not defined", name)
            }
            Error::LoopContextRequired { variable } => {
                write!(
                    f,
                    "${} -> ONE requires an iteration over ${}",
                    variable, variable
                )
            }
            Error::VariableShape { variable, message } => {
                write!(f, "Invalid access to ${}: {}", variable, message)
            }
            Error::InvalidQuery { message } => write!(f, "Invalid query: {}", message),
            Error::BadRequest { message, hint } => write!(f, "{} ({})", message, hint),
            Error::Storage { message } => write!(f, "Storage error: {}", message),
            Error::UnknownFunction { name } => write!(f, "Unknown function: {}", name),
            Error::InvalidPipeline { errors } => {
                write!(f, "Invalid pipeline: {}", errors.join("; "))
            }
            Error::Function { name, message } => {
                write!(f, "Function {} failed: {}", name, message)
            }
            Error::Config { message } => write!(f, "Invalid configuration: {}", message),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Creates a syntax error for the offending fragment.
    pub fn syntax(message: impl Into<String>, fragment: impl Into<String>) -> Self {
        Error::Syntax {
            message: message.into(),
            fragment: fragment.into(),
        }
    }

    /// Creates an unknown table error.
    pub fn unknown_table(name: impl Into<String>) -> Self {
        Error::UnknownTable { name: name.into() }
    }

    /// Creates an unknown column error.
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates a table-level access denied error.
    pub fn table_denied(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::AccessDenied {
            table: table.into(),
            columns: Vec::new(),
            reason: reason.into(),
        }
    }

    /// Creates a column-level access denied error.
    pub fn columns_denied(
        table: impl Into<String>,
        columns: Vec<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::AccessDenied {
            table: table.into(),
            columns,
            reason: reason.into(),
        }
    }

    /// Creates an unresolved variable error.
    pub fn unresolved_variable(name: impl Into<String>) -> Self {
        Error::UnresolvedVariable { name: name.into() }
    }

    /// Creates a variable shape error.
    pub fn variable_shape(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Error::VariableShape {
            variable: variable.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Error::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage {
            message: message.into(),
        }
    }

    /// Creates a function error.
    pub fn function(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Function {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// HTTP-style status class for embedding callers.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Syntax { .. }
            | Error::UnresolvedVariable { .. }
            | Error::LoopContextRequired { .. }
            | Error::VariableShape { .. }
            | Error::InvalidQuery { .. }
            | Error::BadRequest { .. }
            | Error::InvalidPipeline { .. }
            | Error::Function { .. } => 400,
            Error::AccessDenied { .. } => 403,
            Error::UnknownTable { .. }
            | Error::UnknownColumn { .. }
            | Error::UnknownFunction { .. } => 404,
            Error::Storage { .. } | Error::Config { .. } => 500,
        }
    }
}
