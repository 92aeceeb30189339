//! CLI parse tests.

use super::{Cli, CliCommand, QueueCommand};
use clap::Parser;

fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

#[test]
fn cli_parse_config() {
    match parse(&["fisk", "config"]) {
        CliCommand::Config => {}
        _ => panic!("expected Config"),
    }
}

#[test]
fn cli_parse_queue_add_defaults_to_medium() {
    match parse(&["fisk", "queue", "add", "invoice", r#"{"invoice_id": 7}"#]) {
        CliCommand::Queue {
            command:
                QueueCommand::Add {
                    request_type,
                    payload,
                    priority,
                },
        } => {
            assert_eq!(request_type, "invoice");
            assert_eq!(payload, r#"{"invoice_id": 7}"#);
            assert_eq!(priority, "medium");
        }
        _ => panic!("expected Queue Add"),
    }
}

#[test]
fn cli_parse_queue_add_with_priority() {
    match parse(&["fisk", "queue", "add", "invoice", "null", "--priority", "high"]) {
        CliCommand::Queue {
            command: QueueCommand::Add { priority, .. },
        } => assert_eq!(priority, "high"),
        _ => panic!("expected Queue Add with --priority"),
    }
}

#[test]
fn cli_parse_queue_list_and_stats() {
    match parse(&["fisk", "queue", "list"]) {
        CliCommand::Queue {
            command: QueueCommand::List,
        } => {}
        _ => panic!("expected Queue List"),
    }
    match parse(&["fisk", "queue", "stats"]) {
        CliCommand::Queue {
            command: QueueCommand::Stats,
        } => {}
        _ => panic!("expected Queue Stats"),
    }
}

#[test]
fn cli_parse_drill_defaults() {
    match parse(&["fisk", "drill"]) {
        CliCommand::Drill { requests, fail_rate } => {
            assert_eq!(requests, 20);
            assert!((fail_rate - 0.5).abs() < f64::EPSILON);
        }
        _ => panic!("expected Drill"),
    }
}

#[test]
fn cli_parse_drill_with_options() {
    match parse(&["fisk", "drill", "--requests", "50", "--fail-rate", "0.9"]) {
        CliCommand::Drill { requests, fail_rate } => {
            assert_eq!(requests, 50);
            assert!((fail_rate - 0.9).abs() < f64::EPSILON);
        }
        _ => panic!("expected Drill with options"),
    }
}

#[test]
fn cli_rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["fisk", "frobnicate"]).is_err());
}
