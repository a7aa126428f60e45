//! Command-line interface for the digester.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;

use crate::digester::Digester;
use crate::error::{DigestError, Result};
use crate::yaml::{generate_yaml, save_yaml, RuleFile};

/// RegelRecht Digester - Build object graphs from XML with pattern rules.
#[derive(Parser)]
#[command(name = "regelrecht-digester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Digest an XML document and print the resulting records as YAML.
    Digest {
        /// XML document to digest
        document: PathBuf,

        /// YAML rule file
        #[arg(short, long)]
        rules: PathBuf,

        /// Match element and attribute names in upper case
        #[arg(long)]
        case_folding: bool,

        /// Write the YAML to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the patterns and rules of a rule file.
    Patterns {
        /// YAML rule file
        #[arg(short, long)]
        rules: PathBuf,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Digest {
            document,
            rules,
            case_folding,
            output,
        } => digest_command(&document, &rules, case_folding, output.as_deref()),
        Commands::Patterns { rules } => patterns_command(&rules),
    }
}

/// Build a digester configured by a rule file.
fn load_digester(rules: &Path) -> Result<Digester> {
    let rule_file = RuleFile::from_path(rules)?;
    let mut digester = Digester::with_config(rule_file.options.clone().unwrap_or_default());
    digester.add_rule_set(&rule_file)?;
    Ok(digester)
}

/// Execute the digest command.
fn digest_command(
    document: &Path,
    rules: &Path,
    case_folding: bool,
    output: Option<&Path>,
) -> Result<()> {
    let mut digester = load_digester(rules)?;
    if case_folding {
        digester.set_case_folding(true);
    }

    eprintln!(
        "{} {} with {} rules",
        style("Digesting").bold(),
        style(document.display()).cyan(),
        style(digester.rules().len()).green()
    );

    let root = digester.parse_file(document)?.ok_or_else(|| {
        DigestError::custom(format!(
            "No object was created from '{}'; check the rule patterns",
            document.display()
        ))
    })?;

    match output {
        Some(path) => {
            save_yaml(&root, path)?;
            eprintln!("{} {}", style("Saved to:").green().bold(), path.display());
        }
        None => print!("{}", generate_yaml(&root)?),
    }

    Ok(())
}

/// Execute the patterns command.
fn patterns_command(rules: &Path) -> Result<()> {
    let digester = load_digester(rules)?;
    let registry = digester.rules();

    for pattern in registry.patterns() {
        println!("{}", style(pattern).cyan().bold());
        for rule in registry.matches(pattern) {
            println!("  {}", rule.describe());
        }
    }

    Ok(())
}
