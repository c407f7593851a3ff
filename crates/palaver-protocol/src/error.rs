/// Errors produced while parsing client lines.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A recognized command was given the wrong number of arguments.
    /// Reported to the offending client only; the session is unaffected.
    #[error("invalid command format {command}")]
    BadArity {
        /// The command token as the client must type it, e.g. `/auth`.
        command: &'static str,
    },
}
