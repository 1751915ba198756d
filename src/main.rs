use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::process::ExitCode;

mod cli;

use cli::{ArchiveArgs, Command, RootArgs, RunBatchArgs, VerifyOutputsArgs};
use stagekit::archive::archive_directory;
use stagekit::batch::{BatchRunner, CommandSpec};
use stagekit::contracts::{validate_outputs, VerificationReport};

fn main() -> Result<ExitCode> {
    init_tracing();
    let args = RootArgs::parse();

    match args.command {
        Command::RunBatch(args) => cmd_run_batch(args).map(|()| ExitCode::SUCCESS),
        Command::VerifyOutputs(args) => cmd_verify_outputs(args),
        Command::Archive(args) => cmd_archive(args).map(|()| ExitCode::SUCCESS),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_run_batch(args: RunBatchArgs) -> Result<()> {
    let text = fs::read_to_string(&args.commands)
        .with_context(|| format!("read {}", args.commands.display()))?;

    let mut commands = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if args.argv {
            let tokens = shell_words::split(line)
                .with_context(|| format!("split command line `{line}`"))?;
            commands.push(CommandSpec::Argv(tokens));
        } else {
            commands.push(CommandSpec::Raw(format!("{line}\n")));
        }
    }

    let runner = BatchRunner::with_executor(args.executor);
    runner.run_batch(&commands, &args.work_dir, args.jobs)?;
    println!("ran {} jobs in {}", commands.len(), args.work_dir.display());
    Ok(())
}

fn cmd_verify_outputs(args: VerifyOutputsArgs) -> Result<ExitCode> {
    let mut files = Vec::new();
    let entries =
        fs::read_dir(&args.dir).with_context(|| format!("read dir {}", args.dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read dir {}", args.dir.display()))?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("stat {}", entry.path().display()))?;
        if !file_type.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            files.push(name.to_string());
        }
    }

    let samples: Vec<&str> = args.samples.iter().map(String::as_str).collect();
    let result = validate_outputs(files, &args.stage, &samples);

    if args.json {
        let report = VerificationReport::from_result(&args.stage, &result);
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize verification report")?
        );
        return Ok(match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        });
    }

    match result {
        Ok(()) => {
            println!("stage {} outputs complete", args.stage);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn cmd_archive(args: ArchiveArgs) -> Result<()> {
    archive_directory(&args.source, &args.output)?;
    println!(
        "archived {} into {}",
        args.source.display(),
        args.output.display()
    );
    Ok(())
}
