//! Upstream wire protocol: frame parsing and login command encoding.
//!
//! The upstream server speaks a line-oriented text protocol. A frame may
//! carry several `\n`-separated lines, optionally preceded by a `>roomid`
//! line. Every other line is `|`-delimited: `|<type>|<field>|...`.
//!
//! The relay only acts on `challstr`, but every frame is split here so the
//! event stream can label it.

use serde::Deserialize;

use crate::error::{FrameError, LoginError};

/// Prefix that marks a room line at the top of a frame.
const ROOM_PREFIX: char = '>';

/// Line type announcing the login challenge.
const CHALLSTR_KIND: &str = "challstr";

/// Sentinel the login endpoint prepends to its JSON body.
const LOGIN_RESPONSE_SENTINEL: char = ']';

/// Prefix the login endpoint uses for an error message in the assertion slot.
const ASSERTION_ERROR_PREFIX: char = ';';

/// Challenge token pair announced by the upstream right after connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Key identifier (first field after `challstr`).
    pub key_id: String,
    /// Opaque challenge string.
    pub challenge: String,
}

impl Challenge {
    /// Returns the `<key_id>|<challenge>` form the login endpoint expects.
    #[must_use]
    pub fn challstr(&self) -> String {
        format!("{}|{}", self.key_id, self.challenge)
    }
}

/// One upstream frame split into its optional room and its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Room id from a leading `>roomid` line, if present.
    pub room: Option<&'a str>,
    /// Remaining non-empty lines.
    pub lines: Vec<&'a str>,
}

impl<'a> Frame<'a> {
    /// Splits a raw text frame.
    #[must_use]
    pub fn parse(raw: &'a str) -> Self {
        let mut lines = raw
            .split('\n')
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .peekable();

        let room = lines
            .next_if(|line| line.starts_with(ROOM_PREFIX))
            .map(|line| line.trim_start_matches(ROOM_PREFIX));

        Self {
            room,
            lines: lines.collect(),
        }
    }

    /// Returns the type of the first protocol line (e.g. `"challstr"`).
    #[must_use]
    pub fn kind(&self) -> Option<&'a str> {
        self.lines.iter().find_map(|line| line_kind(*line))
    }

    /// Finds the login challenge in this frame, if one is announced.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::MalformedChallenge`] when a `challstr` line is
    /// present but lacks its key id or challenge.
    pub fn challenge(&self) -> Result<Option<Challenge>, FrameError> {
        for line in &self.lines {
            if let Some(challenge) = parse_challstr(line)? {
                return Ok(Some(challenge));
            }
        }
        Ok(None)
    }
}

/// Returns the type field of a protocol line, or `None` for chat text.
#[must_use]
pub fn line_kind(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('|')?;
    let kind = rest.split('|').next().unwrap_or_default();
    (!kind.is_empty()).then_some(kind)
}

/// Parses a single `|challstr|<key_id>|<challenge>` line.
///
/// Returns `Ok(None)` when the line is some other message type.
///
/// # Errors
///
/// Returns [`FrameError::MalformedChallenge`] when either field is missing.
pub fn parse_challstr(line: &str) -> Result<Option<Challenge>, FrameError> {
    if line_kind(line) != Some(CHALLSTR_KIND) {
        return Ok(None);
    }
    let rest = line
        .strip_prefix('|')
        .and_then(|l| l.strip_prefix(CHALLSTR_KIND))
        .and_then(|l| l.strip_prefix('|'))
        .unwrap_or_default();

    match rest.split_once('|') {
        Some((key_id, challenge)) if !key_id.is_empty() && !challenge.is_empty() => {
            Ok(Some(Challenge {
                key_id: key_id.to_string(),
                challenge: challenge.to_string(),
            }))
        }
        _ => Err(FrameError::MalformedChallenge(line.to_string())),
    }
}

/// Builds the frame that completes login with a signed assertion.
#[must_use]
pub fn login_command(username: &str, assertion: &str) -> String {
    format!("|/trn {username},0,{assertion}")
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    assertion: Option<String>,
}

/// Extracts the assertion from a login endpoint response body.
///
/// The body may start with a `]` sentinel that is stripped before the JSON
/// is decoded.
///
/// # Errors
///
/// Returns [`LoginError::MalformedResponse`] when the body is not JSON and
/// [`LoginError::Rejected`] when no usable assertion is present.
pub fn parse_login_response(body: &str) -> Result<String, LoginError> {
    let json = body
        .trim_start()
        .strip_prefix(LOGIN_RESPONSE_SENTINEL)
        .unwrap_or(body);

    let response: LoginResponse = serde_json::from_str(json)
        .map_err(|e| LoginError::MalformedResponse(e.to_string()))?;

    match response.assertion {
        Some(assertion) if assertion.starts_with(ASSERTION_ERROR_PREFIX) => Err(
            LoginError::Rejected(assertion.trim_start_matches(ASSERTION_ERROR_PREFIX).to_string()),
        ),
        Some(assertion) if !assertion.is_empty() => Ok(assertion),
        _ => Err(LoginError::Rejected("no assertion returned".to_string())),
    }
}
