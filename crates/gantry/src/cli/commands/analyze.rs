//! Analyze command

use clap::Args;
use console::style;
use tracing::info;

use gantry_core::config::load_config_or_default;
use gantry_git::{CiStatus, LiveGateway, RepoGateway};
use gantry_release::RepoAnalyzer;

use crate::cli::{Cli, OutputFormat};

/// Analyze the repository and report the release plan
#[derive(Debug, Args)]
pub struct AnalyzeCommand {
    /// Analyze against the current branch instead of the default branch
    #[arg(long)]
    pub current_branch: bool,
}

impl AnalyzeCommand {
    /// Execute the analyze command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(current_branch = self.current_branch, "executing analyze command");
        let cwd = std::env::current_dir()?;
        let (config, config_path) = load_config_or_default(&cwd);

        if config_path.is_none() && !cli.quiet && cli.format == OutputFormat::Text {
            println!(
                "{} No configuration found, using defaults.",
                style("!").yellow().bold()
            );
        }

        let gateway = LiveGateway::new(&cwd, config.git.remote.clone());
        let mut analyzer = RepoAnalyzer::new(&gateway, &config);
        if self.current_branch {
            if let Some(branch) = gateway.current_branch()? {
                analyzer = analyzer.with_target_branch(branch);
            }
        }

        let snapshot = analyzer.analyze()?;

        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            OutputFormat::Text => {
                if cli.quiet {
                    println!("{}", snapshot.suggested_version);
                    return Ok(());
                }

                println!("{}", style("Release Analysis").bold());
                println!();

                println!("{}", style("Repository").underlined());
                println!("  Identity:      {}", style(&snapshot.context.repository).cyan());
                println!("  Branch:        {}", snapshot.context.current_branch);
                println!(
                    "  Target branch: {}",
                    style(&snapshot.context.target_branch).cyan()
                );
                println!();

                println!("{}", style("Versioning").underlined());
                match &snapshot.last_tag {
                    Some(last) => println!("  Last release:  {}", style(last).cyan()),
                    None => println!("  Last release:  {}", style("none").dim()),
                }
                println!(
                    "  Next version:  {} ({} bump)",
                    style(&snapshot.suggested_version).green().bold(),
                    snapshot.bump
                );

                let ci = match snapshot.ci_status {
                    CiStatus::Success => style("passing").green(),
                    CiStatus::Failure => style("failing").red(),
                    CiStatus::Pending => style("pending").yellow(),
                    CiStatus::Unknown => style("unknown").dim(),
                };
                println!("  CI:            {}", ci);
                println!();

                println!(
                    "{} ({})",
                    style("Commits since last release").underlined(),
                    snapshot.commits.len()
                );
                for commit in &snapshot.commits {
                    let marker = if commit.breaking {
                        style("!").red().bold()
                    } else {
                        style(" ").dim()
                    };
                    println!(
                        "  {} {} {} {}",
                        style(&commit.reference).dim(),
                        style(commit.kind).cyan(),
                        marker,
                        commit.description
                    );
                }
                if snapshot.commits.is_empty() {
                    println!("  {}", style("none").dim());
                }

                if !snapshot.warnings.is_empty() {
                    println!();
                    println!("{}", style("Warnings").underlined());
                    for warning in &snapshot.warnings {
                        println!("  {} {}", style("!").yellow().bold(), warning);
                    }
                }
            }
        }

        Ok(())
    }
}
