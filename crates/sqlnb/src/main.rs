//! sqlnb CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sqlnb_core::emit::EmitMode;

mod commands;

#[derive(Parser)]
#[command(name = "sqlnb")]
#[command(version)]
#[command(about = "Tools for tag-driven SQL teaching notebooks", long_about = None)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the SQL cells of a notebook and keep their results
    EvalSql {
        /// Connection string used by SQLAlchemy to connect to the database
        db: String,

        /// Notebook to evaluate
        notebook: PathBuf,

        /// Directory where the evaluated notebook is written
        #[arg(default_value = ".")]
        output_path: PathBuf,

        /// File name for the evaluated notebook (defaults to <name>_evaluated.ipynb)
        #[arg(short = 'o', long = "out")]
        out: Option<String>,
    },

    /// Convert an evaluated notebook to LaTeX or Markdown
    #[command(alias = "extract")]
    Convert {
        /// Notebook to convert
        notebook: PathBuf,

        /// Directory where the document is written; images are expected under <OUTPUT_PATH>/images
        #[arg(default_value = ".")]
        output_path: PathBuf,

        /// Document template to use instead of the built-in one
        #[arg(short = 't', long)]
        template: Option<PathBuf>,

        /// Output flavour
        #[arg(short = 'm', long, value_enum, default_value_t = Mode::Latex)]
        mode: Mode,
    },

    /// Render query results of an evaluated notebook as PNG images
    ExtractImages {
        /// Notebook to read results from
        notebook: PathBuf,

        /// Directory under which images/ is created
        #[arg(default_value = ".")]
        output_path: PathBuf,
    },

    /// Remove correction cells to produce the student version
    Student {
        /// Notebook to convert
        notebook: PathBuf,

        /// Directory where the student notebook is written
        #[arg(default_value = ".")]
        output_path: PathBuf,

        /// File name for the student notebook (defaults to <name>_student.ipynb)
        #[arg(short = 'o', long = "out")]
        out: Option<String>,
    },

    /// Replace {{name}} cells with the cells of name.ipynb
    Transclude {
        /// Notebook to resolve
        notebook: PathBuf,

        /// Directory where the resolved notebook is written
        #[arg(default_value = ".")]
        output_path: PathBuf,

        /// File name for the resolved notebook (defaults to <name>_transcluded.ipynb)
        #[arg(short = 'o', long = "out")]
        out: Option<String>,

        /// Resolve references inside transcluded notebooks too
        #[arg(long)]
        recursive: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// LaTeX, query results as figures
    Latex,
    /// Markdown, query results as image links
    Markdown,
    /// Markdown, query results as HTML tables
    #[value(name = "md+html")]
    MdHtml,
}

impl From<Mode> for EmitMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Latex => EmitMode::Latex,
            Mode::Markdown => EmitMode::Markdown,
            Mode::MdHtml => EmitMode::MarkdownHtml,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "sqlnb=debug" } else { "sqlnb=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::EvalSql {
            db,
            notebook,
            output_path,
            out,
        } => commands::eval_sql::execute(commands::eval_sql::EvalSqlArgs {
            db,
            notebook,
            output_path,
            out,
        }),
        Commands::Convert {
            notebook,
            output_path,
            template,
            mode,
        } => commands::convert::execute(commands::convert::ConvertArgs {
            notebook,
            output_path,
            template,
            mode: mode.into(),
        }),
        Commands::ExtractImages {
            notebook,
            output_path,
        } => commands::extract_images::execute(&notebook, &output_path),
        Commands::Student {
            notebook,
            output_path,
            out,
        } => commands::student::execute(&notebook, &output_path, out.as_deref()),
        Commands::Transclude {
            notebook,
            output_path,
            out,
            recursive,
        } => commands::transclude::execute(commands::transclude::TranscludeArgs {
            notebook,
            output_path,
            out,
            recursive,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_eval_sql_arguments() {
        let cli = Cli::try_parse_from([
            "sqlnb",
            "eval-sql",
            "oracle://scott:tiger@db/XE",
            "ex1.ipynb",
            "-o",
            "done",
        ])
        .unwrap();
        match cli.command {
            Commands::EvalSql {
                db,
                notebook,
                output_path,
                out,
            } => {
                assert_eq!(db, "oracle://scott:tiger@db/XE");
                assert_eq!(notebook, PathBuf::from("ex1.ipynb"));
                assert_eq!(output_path, PathBuf::from("."));
                assert_eq!(out.as_deref(), Some("done"));
            }
            _ => panic!("expected eval-sql"),
        }
    }

    #[test]
    fn test_extract_alias_and_modes() {
        let cli = Cli::try_parse_from(["sqlnb", "extract", "ex1.ipynb", "out", "-m", "md+html"])
            .unwrap();
        match cli.command {
            Commands::Convert { mode, output_path, .. } => {
                assert_eq!(EmitMode::from(mode), EmitMode::MarkdownHtml);
                assert_eq!(output_path, PathBuf::from("out"));
            }
            _ => panic!("expected convert"),
        }

        let cli = Cli::try_parse_from(["sqlnb", "convert", "ex1.ipynb"]).unwrap();
        assert!(matches!(cli.command, Commands::Convert { mode: Mode::Latex, .. }));

        assert!(Cli::try_parse_from(["sqlnb", "convert", "ex1.ipynb", "-m", "html"]).is_err());
    }

    #[test]
    fn test_transclude_recursive_flag() {
        let cli = Cli::try_parse_from(["sqlnb", "-v", "transclude", "main.ipynb", "--recursive"])
            .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Transclude { recursive: true, .. }));
    }
}
