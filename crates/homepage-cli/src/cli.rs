//! Command-line definition

use crate::config::DEFAULT_CONFIG_FILE;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

fn node_ids(help: &'static str) -> Arg {
    Arg::new("ids")
        .required(true)
        .num_args(1..)
        .value_name("ID")
        .help(help)
}

/// `homepage` command tree
#[must_use]
pub fn build_cli() -> Command {
    Command::new("homepage")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Home Page App data store: migrations and landing pages")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help(format!("Configuration file [default: {DEFAULT_CONFIG_FILE}]")),
        )
        .subcommand(Command::new("status").about("Show schema version and pending migrations"))
        .subcommand(Command::new("migrate").about("Apply pending migrations"))
        .subcommand(
            Command::new("backup")
                .about("Data store backup slots")
                .subcommand_required(true)
                .subcommand(Command::new("create").about("Copy every data key into its backup slot"))
                .subcommand(Command::new("rollback").about("Restore every backup slot"))
                .subcommand(Command::new("delete").about("Remove every backup slot")),
        )
        .subcommand(
            Command::new("landing")
                .about("Landing page trees")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("Print every landing page tree"))
                .subcommand(
                    Command::new("show")
                        .about("Print one node with its subtree")
                        .arg(Arg::new("id").required(true).value_name("ID")),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete nodes with their subtrees")
                        .arg(node_ids("Nodes to delete")),
                )
                .subcommand(
                    Command::new("import")
                        .about("Import a JSON array of node records as a new tree")
                        .arg(
                            Arg::new("file")
                                .required(true)
                                .value_parser(value_parser!(PathBuf)),
                        ),
                )
                .subcommand(
                    Command::new("export")
                        .about("Export nodes with their subtrees as flat records")
                        .arg(node_ids("Nodes to export"))
                        .arg(
                            Arg::new("out")
                                .long("out")
                                .short('o')
                                .value_parser(value_parser!(PathBuf))
                                .help("Write to a file instead of stdout"),
                        )
                        .arg(
                            Arg::new("compact")
                                .long("compact")
                                .action(ArgAction::SetTrue)
                                .help("Single-line JSON"),
                        ),
                ),
        )
}
