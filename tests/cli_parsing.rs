use clap::Parser;
use hoogas::cli::{Cli, Commands};
use std::path::PathBuf;

#[test]
fn test_parse_listen_defaults() {
    let cli = Cli::try_parse_from(["hoogas", "listen"]).unwrap();

    match cli.command {
        Commands::Listen(args) => {
            assert_eq!(args.port, None);
            assert_eq!(args.bind, "127.0.0.1");
            assert!(!args.echo);
            assert_eq!(args.limit, None);
        }
        _ => panic!("Wrong top-level command"),
    }
    assert!(!cli.json);
    assert!(cli.config.is_none());
}

#[test]
fn test_parse_listen_with_options() {
    let cli = Cli::try_parse_from([
        "hoogas", "listen", "--port", "7100", "--bind", "0.0.0.0", "--echo", "-n", "3",
    ])
    .unwrap();

    match cli.command {
        Commands::Listen(args) => {
            assert_eq!(args.port, Some(7100));
            assert_eq!(args.bind, "0.0.0.0");
            assert!(args.echo);
            assert_eq!(args.limit, Some(3));
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_send_messages() {
    let cli = Cli::try_parse_from([
        "hoogas", "send", "--host", "10.0.0.2", "--port", "9100", "--id", "4", "start web",
        "stop db",
    ])
    .unwrap();

    match cli.command {
        Commands::Send(args) => {
            assert_eq!(args.host.as_deref(), Some("10.0.0.2"));
            assert_eq!(args.port, Some(9100));
            assert_eq!(args.id, Some(4));
            assert_eq!(args.messages, vec!["start web", "stop db"]);
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_send_without_messages_reads_stdin() {
    let cli = Cli::try_parse_from(["hoogas", "send"]).unwrap();

    match cli.command {
        Commands::Send(args) => assert!(args.messages.is_empty()),
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["hoogas", "config", "--json", "--config", "custom.yaml"]).unwrap();

    assert!(matches!(cli.command, Commands::Config(_)));
    assert!(cli.json);
    assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
}

#[test]
fn test_invalid_port_rejected() {
    assert!(Cli::try_parse_from(["hoogas", "listen", "--port", "70000"]).is_err());
}

#[test]
fn test_unknown_subcommand_rejected() {
    assert!(Cli::try_parse_from(["hoogas", "deploy"]).is_err());
}
