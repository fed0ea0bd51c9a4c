// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Scope command parsing.
//!
//! Controllers drive the client from the radar display's command line
//! with dot commands: `.ramp version`, `.ramp url <domain>`,
//! `.ramp disconnect`. Parsing is separate from execution so hosts can
//! route the line first and tests can pin the grammar.

/// One-line usage string for the command family.
pub const USAGE: &str = "Usage: .ramp version | url <domain (no scheme)> | disconnect";

/// A recognized `.ramp` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeCommand {
    /// Report the client version.
    Version,
    /// Point the client at a different server domain.
    SetServer(String),
    /// End the session and clear published tags.
    Disconnect,
    /// Anything else under the `ramp` keyword; show usage.
    Usage,
}

/// Parse a command line.
///
/// Returns `None` when the line is not a `ramp` command at all, so the
/// host keeps routing it elsewhere. The leading dot is optional and the
/// keyword and subcommand are case-insensitive.
#[must_use]
pub fn parse(line: &str) -> Option<ScopeCommand> {
    let mut words = line.split_whitespace();
    let keyword = words.next()?;
    let keyword = keyword.strip_prefix('.').unwrap_or(keyword);
    if !keyword.eq_ignore_ascii_case("ramp") {
        return None;
    }

    let command = match words.next() {
        Some(sub) if sub.eq_ignore_ascii_case("version") => ScopeCommand::Version,
        Some(sub) if sub.eq_ignore_ascii_case("disconnect") => ScopeCommand::Disconnect,
        Some(sub) if sub.eq_ignore_ascii_case("url") => match words.next() {
            Some(domain) => ScopeCommand::SetServer(domain.to_string()),
            None => ScopeCommand::Usage,
        },
        _ => ScopeCommand::Usage,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_command() {
        assert_eq!(parse(".ramp version"), Some(ScopeCommand::Version));
        assert_eq!(parse("ramp VERSION"), Some(ScopeCommand::Version));
        assert_eq!(parse("  .RAMP Version  "), Some(ScopeCommand::Version));
    }

    #[test]
    fn test_url_command() {
        assert_eq!(
            parse(".ramp url ramp.example.org"),
            Some(ScopeCommand::SetServer("ramp.example.org".to_string()))
        );
    }

    #[test]
    fn test_url_without_domain_shows_usage() {
        assert_eq!(parse(".ramp url"), Some(ScopeCommand::Usage));
    }

    #[test]
    fn test_disconnect_command() {
        assert_eq!(parse(".ramp disconnect"), Some(ScopeCommand::Disconnect));
    }

    #[test]
    fn test_unknown_subcommand_shows_usage() {
        assert_eq!(parse(".ramp frobnicate"), Some(ScopeCommand::Usage));
        assert_eq!(parse(".ramp"), Some(ScopeCommand::Usage));
    }

    #[test]
    fn test_foreign_lines_are_not_consumed() {
        assert_eq!(parse(".rampx version"), None);
        assert_eq!(parse(".other command"), None);
        assert_eq!(parse("plain chatter"), None);
        assert_eq!(parse(""), None);
        assert_eq!(parse("   "), None);
    }
}
