//! Parsers for the two command dialects.
//!
//! Tokenization is whitespace splitting; only `/w` keeps a free-text tail
//! (everything after the recipient, re-joined with single spaces).

use crate::ProtocolError;

/// A line received during the handshake, before the session has an identity.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRequest<'a> {
    /// `/auth <login> <password>`
    Login { login: &'a str, password: &'a str },

    /// `/reg <login> <password> <name>`
    Register {
        login: &'a str,
        password: &'a str,
        name: &'a str,
    },

    /// `/exit` — the client gives up before logging in.
    Exit,

    /// Anything else. The handshake loop re-prompts and retries.
    Other,
}

impl<'a> AuthRequest<'a> {
    /// Parses one handshake line.
    ///
    /// Only `/auth` and `/reg` have an arity; every unrecognized line —
    /// plain text, unknown command, bare `/` — is [`AuthRequest::Other`].
    pub fn parse(line: &'a str) -> Result<Self, ProtocolError> {
        if !line.starts_with('/') {
            return Ok(Self::Other);
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.first().copied() {
            Some("/exit") => Ok(Self::Exit),
            Some("/auth") => match tokens[..] {
                [_, login, password] => Ok(Self::Login { login, password }),
                _ => Err(ProtocolError::BadArity { command: "/auth" }),
            },
            Some("/reg") => match tokens[..] {
                [_, login, password, name] => Ok(Self::Register {
                    login,
                    password,
                    name,
                }),
                _ => Err(ProtocolError::BadArity { command: "/reg" }),
            },
            _ => Ok(Self::Other),
        }
    }
}

/// A command line received from an authenticated session.
///
/// Plain chat text never reaches this parser — the dispatcher broadcasts
/// any line that does not start with `/` before parsing.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    /// `/changeName <name>`
    ChangeName { name: &'a str },

    /// `/getName`
    GetName,

    /// `/changeRole <name> <ADMIN|USER>` — the role token is kept raw;
    /// the dispatcher resolves it and reports unknown roles itself.
    ChangeRole { target: &'a str, role: &'a str },

    /// `/getRole`
    GetRole,

    /// `/getActiveClients`
    GetActiveClients,

    /// `/w <name> <text...>`
    Whisper { to: &'a str, text: String },

    /// `/kick <name>`
    Kick { name: &'a str },

    /// `/help`
    Help,

    /// `/exit`
    Exit,

    /// A `/command` this protocol does not define.
    Unknown { token: &'a str },
}

impl<'a> Command<'a> {
    /// Parses one authenticated-phase command line.
    ///
    /// Commands that take no arguments ignore any extra tokens.
    pub fn parse(line: &'a str) -> Result<Self, ProtocolError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(head) = tokens.first().copied() else {
            return Ok(Self::Unknown { token: line });
        };

        match head {
            "/changeName" => match tokens[..] {
                [_, name] => Ok(Self::ChangeName { name }),
                _ => Err(ProtocolError::BadArity {
                    command: "/changeName",
                }),
            },
            "/getName" => Ok(Self::GetName),
            "/changeRole" => match tokens[..] {
                [_, target, role] => Ok(Self::ChangeRole { target, role }),
                _ => Err(ProtocolError::BadArity {
                    command: "/changeRole",
                }),
            },
            "/getRole" => Ok(Self::GetRole),
            "/getActiveClients" => Ok(Self::GetActiveClients),
            "/w" => {
                if tokens.len() < 3 {
                    return Err(ProtocolError::BadArity { command: "/w" });
                }
                Ok(Self::Whisper {
                    to: tokens[1],
                    text: tokens[2..].join(" "),
                })
            }
            "/kick" => match tokens[..] {
                [_, name] => Ok(Self::Kick { name }),
                _ => Err(ProtocolError::BadArity { command: "/kick" }),
            },
            "/help" => Ok(Self::Help),
            "/exit" => Ok(Self::Exit),
            other => Ok(Self::Unknown { token: other }),
        }
    }
}
