//! Tests for history, version and update.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_history() {
    match parse(&["vidfetch", "history"]) {
        CliCommand::History { limit } => assert!(limit.is_none()),
        _ => panic!("expected History"),
    }
    match parse(&["vidfetch", "history", "--limit", "5"]) {
        CliCommand::History { limit } => assert_eq!(limit, Some(5)),
        _ => panic!("expected History with --limit"),
    }
}

#[test]
fn cli_parse_version() {
    match parse(&["vidfetch", "version"]) {
        CliCommand::Version => {}
        _ => panic!("expected Version"),
    }
}

#[test]
fn cli_parse_update() {
    match parse(&["vidfetch", "update"]) {
        CliCommand::Update { nightly, force } => assert!(!nightly && !force),
        _ => panic!("expected Update"),
    }
    match parse(&["vidfetch", "update", "--nightly", "--force"]) {
        CliCommand::Update { nightly, force } => assert!(nightly && force),
        _ => panic!("expected Update --nightly --force"),
    }
}

#[test]
fn cli_rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["vidfetch", "pause", "1"]).is_err());
}
