use clap::{Parser, Subcommand, ValueEnum};
use recipe_core::LegacyColumn;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "recipe_cli")]
#[command(about = "Smoke checks for the recipe core library")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a JSON config, start logging, open the database and build the cache layer.
    Check {
        /// Path to the JSON config file.
        config: PathBuf,
    },
    /// Decode one legacy column value and print each element.
    Parse {
        #[arg(value_enum, ignore_case = true)]
        column: Column,
        /// Raw column text, e.g. `{"a","b"}`.
        raw: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Column {
    Ingredients,
    Hashtags,
    Instructions,
}

impl From<Column> for LegacyColumn {
    fn from(column: Column) -> Self {
        match column {
            Column::Ingredients => LegacyColumn::Ingredients,
            Column::Hashtags => LegacyColumn::Hashtags,
            Column::Instructions => LegacyColumn::Instructions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Column, Command};
    use clap::{CommandFactory, Parser};

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_is_a_smoke_run() {
        let cli = Cli::try_parse_from(["recipe_cli"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn column_names_ignore_case() {
        let cli = Cli::try_parse_from(["recipe_cli", "parse", "Ingredients", "a|b"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Parse {
                column: Column::Ingredients,
                ..
            })
        ));
    }

    #[test]
    fn unknown_column_is_rejected() {
        assert!(Cli::try_parse_from(["recipe_cli", "parse", "steps", "a|b"]).is_err());
    }
}
