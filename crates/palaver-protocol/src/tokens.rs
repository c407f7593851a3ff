//! Control tokens and canned server text.
//!
//! Control tokens are the machine-readable lines a client reacts to
//! (closing its UI on `/exitok`, switching to chat mode on `/authok`).
//! They are part of the wire contract and must not be reworded.

/// Acknowledges an exit request; the client closes on receipt.
pub const EXIT_OK: &str = "/exitok";

/// Builds the successful-login acknowledgment.
pub fn auth_ok(name: &str) -> String {
    format!("/authok {name}")
}

/// Builds the successful-registration acknowledgment.
pub fn reg_ok(name: &str) -> String {
    format!("/regok {name}")
}

/// Instructional prompt re-sent before every authentication attempt.
pub const AUTH_PROMPT: &str = "Before working, you must authenticate using the command\n\
    /auth \"login\" \"password\" or register using the command\n\
    /reg \"login\" \"password\" \"name\"";

/// Sent once right after a successful login or registration.
pub const HELP_HINT: &str =
    "You can find out the list of commands for working with chat using the command /help";

/// Static command reference returned by `/help`.
pub const HELP_TEXT: &str = "You can use the following commands:\n\
    /auth \"login\" \"password\" - authenticate\n\
    /reg \"login\" \"password\" \"name\" - register\n\
    /changeName \"name\" - change name\n\
    /getName - find out name\n\
    /changeRole \"name\" \"ADMIN/USER\" - change role (if you are an administrator)\n\
    /getRole - find out role/roles\n\
    /getActiveClients - get a list of active clients\n\
    /w \"name\" \"message\" - send message to user with nickname \"name\"\n\
    \"message\" - send message to all users\n\
    /kick \"name\" - remove user from chat (if you are an administrator)\n\
    /exit - exit program\n\
    /help - list of commands";
