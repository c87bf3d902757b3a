//! imgbatch CLI: resize and re-encode images in bounded-concurrency batches.

mod cli;
mod error;

use crate::cli::{Cli, Command, RunArgs};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use figment::providers::Serialized;
use imgbatch_config::{Input, Settings, SourceEntry};
use imgbatch_dataset::{Database, DatasetHandle, SqliteDataset};
use imgbatch_fetch::HttpFetcher;
use imgbatch_pipeline::{Context, ImageSource, KeyGenerator, Resolver, SourceDescriptor, run};
use imgbatch_storage::backend::ReadOnlyBackend;
use imgbatch_storage::{BackendHandle, LocalStores, ProviderHandle};
#[cfg(feature = "s3")]
use imgbatch_storage::{S3Config, S3Stores};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Some(Command::Inspect { descriptor }) => inspect(&descriptor),
        Some(Command::Run(args)) => run_batch(cli.config.as_deref(), args).await,
        None => run_batch(cli.config.as_deref(), cli.run).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::from(err.exit_code())
        },
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = match (quiet, verbose) {
        (true, _) => EnvFilter::new("error"),
        (false, 0) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        (false, 1) => EnvFilter::new("debug"),
        (false, _) => EnvFilter::new("trace"),
    };
    // Logs go to stderr; stdout carries the report.
    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn inspect(descriptor: &str) -> Result<()> {
    match ImageSource::parse(descriptor) {
        Ok(ImageSource::RemoteUrl(url)) => println!("remote url\t{url}"),
        Ok(ImageSource::StoreRef { store_id, key }) => println!("store ref\tstore={store_id}\tkey={key}"),
        Err(kind) => {
            println!("invalid\t{kind}");
            exn::bail!(ErrorKind::Config);
        },
    }
    Ok(())
}

fn open_stores(settings: &Settings) -> Result<ProviderHandle> {
    let public_base = settings.public_base_url().or_raise(|| ErrorKind::Config)?;
    let Some(s3) = settings.s3().or_raise(|| ErrorKind::Config)? else {
        let mut stores = LocalStores::new(settings.store_root());
        if let Some(base) = public_base {
            stores = stores.with_public_base(base);
        }
        return Ok(Arc::new(stores));
    };
    #[cfg(feature = "s3")]
    {
        let config = S3Config {
            bucket: s3.bucket.clone(),
            prefix: s3.prefix.clone(),
            region: s3.region.clone(),
            endpoint: s3.endpoint.clone(),
            key_id: s3.key_id.clone(),
            key_secret: s3.key_secret.clone(),
        };
        let mut stores = S3Stores::new(config);
        if let Some(base) = public_base {
            stores = stores.with_public_base(base);
        }
        Ok(Arc::new(stores))
    }
    #[cfg(not(feature = "s3"))]
    {
        tracing::error!(bucket = %s3.bucket, "Built without the `s3` feature");
        exn::bail!(ErrorKind::Config)
    }
}

async fn run_batch(config: Option<&Path>, args: RunArgs) -> Result<()> {
    let mut settings_figment = Settings::figment(config).or_raise(|| ErrorKind::Config)?;
    if args.dry_run {
        settings_figment = settings_figment.merge(Serialized::default("dry_run", true));
    }
    let settings = Settings::from_figment(&settings_figment).or_raise(|| ErrorKind::Config)?;

    let input_figment = match &args.input {
        Some(path) => Input::figment_from_file(path).or_raise(|| ErrorKind::Config)?,
        None => Input::figment(),
    };
    let input = Input::from_figment(&args.overrides.merge_into(input_figment)).or_raise(|| ErrorKind::Config)?;
    let batch = input.validate().or_raise(|| ErrorKind::Config)?;
    let keys: KeyGenerator = settings.key_template.parse::<KeyGenerator>().or_raise(|| ErrorKind::Config)?;
    tracing::info!(
        width = ?batch.spec.width,
        height = ?batch.spec.height,
        fit = %batch.spec.fit,
        format = %batch.spec.format,
        quality = batch.spec.quality.get(),
        dry_run = settings.dry_run,
        "Settings"
    );

    let stores = open_stores(&settings)?;
    let output_store = batch.output_store_id.clone().unwrap_or_else(|| settings.storage.default_store.clone());
    let mut output = stores.open(&output_store).await.or_raise(|| ErrorKind::Storage)?;
    if settings.dry_run {
        output = Arc::new(ReadOnlyBackend::new(output)) as BackendHandle;
    }

    let dataset = match batch.create_dataset {
        true => {
            let db = Database::connect(settings.dataset_path()).await.or_raise(|| ErrorKind::Dataset)?;
            let dataset = SqliteDataset::new(db.pool().clone(), settings.dataset.name.clone(), settings.dry_run);
            Some(Arc::new(dataset) as DatasetHandle)
        },
        false => None,
    };

    let fetcher = HttpFetcher::new().or_raise(|| ErrorKind::Http)?;
    let resolver = Resolver::new(stores, Arc::new(fetcher))
        .with_timeout(settings.fetch_timeout())
        .with_retries(settings.http.retries);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, finishing in-flight phases and skipping the rest");
                cancel.cancel();
            }
        }
    });

    let ctx = Context::new(batch.spec, resolver, output.clone(), keys)
        .with_dataset(dataset)
        .with_cancellation(cancel)
        .with_phase_timeout(settings.phase_timeout());
    let sources: Vec<SourceDescriptor> = batch
        .sources
        .into_iter()
        .map(|entry| match entry {
            SourceEntry::Descriptor(raw) => SourceDescriptor::parse(raw),
            SourceEntry::NotAString(raw) => SourceDescriptor::not_a_string(raw),
        })
        .collect();
    let report = run(&sources, batch.concurrency, &ctx).await;

    let report = if args.sorted { report.sorted() } else { report };
    let json = serde_json::to_string_pretty(&report).or_raise(|| ErrorKind::Report)?;
    println!("{json}");
    report.save(&output).await.or_raise(|| ErrorKind::Report)?;
    Ok(())
}
