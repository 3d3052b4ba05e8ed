//! Release command

use clap::Args;
use console::style;
use dialoguer::Confirm;
use tracing::info;

use gantry_core::config::load_config_or_default;
use gantry_core::version::{apply_prerelease, Version};
use gantry_git::{CiStatus, LiveGateway, RepoGateway};
use gantry_release::{ReleaseExecutor, ReleaseOptions, RepoAnalyzer};

use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

/// Create a new release
#[derive(Debug, Args)]
pub struct ReleaseCommand {
    /// Dry run - resolve the version and stop before any changes
    #[arg(long)]
    pub dry_run: bool,

    /// Explicit version to release instead of the suggestion
    #[arg(long)]
    pub version: Option<String>,

    /// Pre-release channel (e.g. alpha, beta, rc)
    #[arg(long)]
    pub prerelease: Option<String>,

    /// Skip changelog generation and its commit
    #[arg(long)]
    pub no_changelog: bool,

    /// Skip the CI gate
    #[arg(long)]
    pub skip_ci: bool,

    /// Release the current branch instead of the default branch
    #[arg(long)]
    pub current_branch: bool,

    /// Operate on this checkout instead of an ephemeral worktree
    #[arg(long)]
    pub in_place: bool,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl ReleaseCommand {
    /// Execute the release command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(
            dry_run = self.dry_run,
            version = ?self.version,
            prerelease = ?self.prerelease,
            no_changelog = self.no_changelog,
            skip_ci = self.skip_ci,
            current_branch = self.current_branch,
            in_place = self.in_place,
            "executing release command"
        );
        let cwd = std::env::current_dir()?;
        let (config, config_path) = load_config_or_default(&cwd);

        if config_path.is_none() && !cli.quiet && cli.format == OutputFormat::Text {
            println!(
                "{} No configuration found, using defaults.",
                style("!").yellow().bold()
            );
        }

        let version: Option<Version> = self.version.as_deref().map(str::parse).transpose()?;

        let gateway = LiveGateway::new(&cwd, config.git.remote.clone());

        // Preview against the same analysis the executor will re-run.
        let mut analyzer = RepoAnalyzer::new(&gateway, &config);
        if self.current_branch {
            if let Some(branch) = gateway.current_branch()? {
                analyzer = analyzer.with_target_branch(branch);
            }
        }
        let snapshot = analyzer.analyze()?;

        let mut next = version
            .clone()
            .unwrap_or_else(|| snapshot.suggested_version.clone());
        if let Some(channel) = &self.prerelease {
            next = apply_prerelease(&next, channel, snapshot.last_tag.as_ref());
        }
        let tag = format!("{}{}", config.git.tag_prefix, next);

        if !cli.quiet && cli.format == OutputFormat::Text {
            println!("{}", style("Release Preview").bold());
            println!();
            match &snapshot.last_tag {
                Some(last) => println!("  Current version: {}", style(last).cyan()),
                None => println!("  Current version: {}", style("none").dim()),
            }
            println!("  Next version:    {}", style(&next).green().bold());
            println!("  Tag:             {}", style(&tag).yellow());
            println!(
                "  Target branch:   {}",
                style(&snapshot.context.target_branch).cyan()
            );
            println!("  Commits:         {}", snapshot.commits.len());
            if snapshot.ci_status == CiStatus::Failure && !self.skip_ci {
                println!(
                    "  CI:              {}",
                    style("failing (release will halt)").red()
                );
            }
            println!();

            if self.dry_run {
                println!(
                    "  {}",
                    style("[DRY RUN - no changes will be made]").yellow().bold()
                );
                println!();
            }
        }

        // Confirm release
        if !self.yes && !self.dry_run {
            let confirmed = Confirm::new()
                .with_prompt(format!("Release {} to '{}'?", tag, snapshot.context.target_branch))
                .default(true)
                .interact()?;

            if !confirmed {
                println!("{}", style("Aborted.").yellow());
                std::process::exit(exit_codes::CANCELLED);
            }
        }

        let options = ReleaseOptions {
            dry_run: self.dry_run,
            version,
            prerelease: self.prerelease.clone(),
            skip_changelog: self.no_changelog,
            skip_ci_gate: self.skip_ci,
            release_current_branch: self.current_branch,
            in_place: self.in_place,
        };

        let executor = ReleaseExecutor::new(&gateway, &config, &cwd, options);
        let report = executor.execute()?;

        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    if report.dry_run {
                        println!(
                            "{} Dry run complete. Version {} would be released as {}.",
                            style("✓").green().bold(),
                            style(&report.version).green().bold(),
                            style(&report.tag).yellow()
                        );
                    } else {
                        println!(
                            "{} Released {} to '{}'",
                            style("✓").green().bold(),
                            style(&report.tag).yellow(),
                            report.target_branch
                        );
                    }
                }
            }
        }

        Ok(())
    }
}
