use clap::{Args, Parser, Subcommand};
use figment::providers::Serialized;
use imgbatch_config::Figment;
use serde::Serialize;
use std::path::PathBuf;

/// Resize and re-encode batches of images from URLs and key-value stores.
#[derive(Debug, Parser)]
#[command(name = "imgbatch", version, about)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Settings file (TOML, YAML or JSON). Defaults to imgbatch.{toml,yaml,json}
    /// in the platform config directory.
    #[arg(long, short = 'c', global = true, env = "IMGBATCH_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More logging (-v, -vv). `RUST_LOG` wins when set and neither flag is given.
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors.
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process a batch (the default).
    Run(RunArgs),
    /// Classify a source descriptor without fetching it.
    Inspect {
        descriptor: String,
    },
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Batch input document (JSON or YAML).
    #[arg(long, short = 'i', value_name = "PATH")]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: InputOverrides,

    /// Process everything but write nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Print results in input order instead of completion order.
    #[arg(long)]
    pub sorted: bool,
}

/// Input fields settable from the command line. Anything given here wins
/// over the input document.
#[derive(Debug, Default, Args, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputOverrides {
    /// Image source; repeat for more. Replaces the document's list.
    #[arg(long = "image", value_name = "SOURCE")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// cover, contain, fill, inside or outside.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<String>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// jpeg, png, webp, avif, gif or original.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Keep pixels as stored instead of applying EXIF orientation.
    #[arg(long)]
    #[serde(rename = "stripMetadata", skip_serializing_if = "std::ops::Not::not", serialize_with = "negate")]
    pub keep_metadata: bool,
    #[arg(long, allow_negative_numbers = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<i64>,
    #[arg(long = "output-store", value_name = "STORE_ID")]
    #[serde(rename = "outputStoreId", skip_serializing_if = "Option::is_none")]
    pub output_store_id: Option<String>,
    /// Do not append results to the dataset.
    #[arg(long)]
    #[serde(rename = "createDataset", skip_serializing_if = "std::ops::Not::not", serialize_with = "negate")]
    pub no_dataset: bool,
}

/// Flags are phrased as opt-outs, input fields as opt-ins.
fn negate<S: serde::Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_bool(!*flag)
}

impl InputOverrides {
    /// Layer these overrides on top of `figment`.
    pub fn merge_into(&self, figment: Figment) -> Figment {
        figment.merge(Serialized::defaults(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use imgbatch_config::Input;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bare_flags_run_a_batch() {
        let cli = Cli::try_parse_from(["imgbatch", "--image", "https://example.com/a.png", "--format", "png"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.overrides.images, vec!["https://example.com/a.png"]);
        assert_eq!(cli.run.overrides.format.as_deref(), Some("png"));
    }

    #[test]
    fn test_inspect_subcommand() {
        let cli = Cli::try_parse_from(["imgbatch", "-v", "inspect", "key-value://store/key"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Some(Command::Inspect { descriptor }) if descriptor == "key-value://store/key"));
    }

    #[test]
    fn test_overrides_win_over_document() {
        let cli = Cli::try_parse_from([
            "imgbatch",
            "run",
            "--image",
            "https://example.com/b.png",
            "--width",
            "64",
            "--keep-metadata",
            "--no-dataset",
            "--concurrency",
            "-2",
        ])
        .unwrap();
        let Some(Command::Run(args)) = cli.command else {
            panic!("expected run");
        };
        let base = Input::figment().merge(Serialized::default("images", ["https://example.com/a.png"]));
        let input = Input::from_figment(&args.overrides.merge_into(base)).unwrap();
        assert_eq!(input.images, vec!["https://example.com/b.png"]);
        assert_eq!(input.width, Some(64));
        assert!(!input.strip_metadata);
        assert!(!input.create_dataset);
        assert_eq!(input.concurrency, -2);
        assert_eq!(input.format, "webp");
    }

    #[test]
    fn test_absent_overrides_leave_document_alone() {
        let cli = Cli::try_parse_from(["imgbatch"]).unwrap();
        let base = Input::figment().merge(Serialized::default("images", ["https://example.com/a.png"]));
        let input = Input::from_figment(&cli.run.overrides.merge_into(base)).unwrap();
        assert_eq!(input.images, vec!["https://example.com/a.png"]);
        assert!(input.strip_metadata);
        assert!(input.create_dataset);
    }
}
