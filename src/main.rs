//! Vouch CLI - Callback Constraints
//!
//! This is a demonstration CLI for the Vouch library. It validates author
//! names against a small set of callback constraints.

use anyhow::{bail, Context};
use vouch::prelude::*;

/// Names the demo treats as made up.
const BLOCKED_NAMES: &[&str] = &["FakeName", "JohnDoe", "Test"];

#[derive(Debug, Clone)]
struct Author {
    first_name: String,
    last_name: Option<String>,
}

impl Author {
    fn parse(raw: &str) -> Self {
        match raw.split_once(' ') {
            Some((first, last)) => Self {
                first_name: first.to_string(),
                last_name: Some(last.trim().to_string()),
            },
            None => Self {
                first_name: raw.to_string(),
                last_name: None,
            },
        }
    }

    fn validate(&self, ctx: &mut ExecutionContext) {
        if BLOCKED_NAMES.contains(&self.first_name.as_str()) {
            ctx.build_violation("This name sounds totally fake!")
                .at_path("firstName")
                .set_invalid_value(self.first_name.as_str())
                .set_code("FAKE_NAME")
                .add_violation();
        }
    }
}

fn check_capitalized(author: &Author, ctx: &mut ExecutionContext) {
    let names = std::iter::once(("firstName", author.first_name.as_str()))
        .chain(author.last_name.as_deref().map(|last| ("lastName", last)));

    for (property, name) in names {
        if !name.chars().next().map_or(false, char::is_uppercase) {
            ctx.scoped(property, |ctx| {
                ctx.add_violation_with("\"{{ value }}\" should start with a capital letter", [("value", name)])
            });
        }
    }
}

fn check_length(author: &Author, ctx: &mut ExecutionContext) {
    let missing = 2usize.saturating_sub(author.first_name.chars().count());
    if missing > 0 {
        ctx.build_violation("Add {{ count }} more character|Add {{ count }} more characters")
            .set_parameter("count", missing.to_string())
            .set_plural(missing as u64)
            .add_violation();
    }
}

impl HasConstraints for Author {
    fn load_constraints(metadata: &mut ClassMetadata<Self>) {
        metadata
            .add_constraint(ConstraintDeclaration::path("validate"))
            .add_constraint(ConstraintDeclaration::path("NameRules::capitalized").in_groups(["Strict"]))
            .add_property_constraint(
                "firstName",
                ConstraintDeclaration::path("NameRules::length")
                    .with_payload(serde_json::json!({ "severity": "warning" })),
            );
    }

    fn register_callbacks(builder: RegistryBuilder<Self>) -> RegistryBuilder<Self> {
        builder
            .instance("validate", Author::validate)
            .external("NameRules", "capitalized", check_capitalized)
            .external("NameRules", "length", check_length)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("✅ Vouch - Callback Constraints v{}", vouch::VERSION);
    println!();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        return Ok(());
    }

    match args[1].as_str() {
        "check" => check(&args[2..]),
        "help" | "--help" | "-h" => {
            print_usage(&args[0]);
            Ok(())
        }
        other => {
            print_usage(&args[0]);
            bail!("unknown command: {}", other)
        }
    }
}

fn print_usage(program: &str) {
    println!("Usage: {} <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  check <name>...   Validate author names");
    println!("  help              Show this help message");
    println!();
    println!("Check options:");
    println!("  --config <file>     Load validator options from a TOML file");
    println!("  --group <name>      Validate this group (repeatable, default: Default)");
    println!("  --json              Print results as JSON");
}

fn check(args: &[String]) -> anyhow::Result<()> {
    let mut names = Vec::new();
    let mut groups = Vec::new();
    let mut config = None;
    let mut json = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                config = Some(args[i + 1].clone());
                i += 2;
            }
            "--group" if i + 1 < args.len() => {
                groups.push(args[i + 1].clone());
                i += 2;
            }
            "--json" => {
                json = true;
                i += 1;
            }
            flag if flag.starts_with("--") => bail!("unknown or incomplete option: {}", flag),
            name => {
                names.push(name.to_string());
                i += 1;
            }
        }
    }

    if names.is_empty() {
        bail!("please specify at least one name");
    }

    let mut options = match &config {
        Some(path) => ValidatorOptions::from_file(path)
            .with_context(|| format!("failed to load options from {}", path))?,
        None => ValidatorOptions::default(),
    };
    if !groups.is_empty() {
        options = options.with_groups(groups);
    }

    let validator = Validator::<Author>::for_type()
        .context("failed to register callbacks")?
        .with_options(options);
    let authors: Vec<Author> = names.iter().map(|n| Author::parse(n)).collect();
    let results = validator.validate_all(&authors)?;

    if json {
        let documents = results
            .iter()
            .map(|r| serde_json::to_value(r))
            .collect::<Result<Vec<_>, _>>()?;
        println!("{}", serde_json::to_string_pretty(&documents)?);
        return Ok(());
    }

    let mut failures = 0;
    for (name, result) in names.iter().zip(&results) {
        println!("  {}: {}", name, result.summary());
        if result.is_valid() {
            continue;
        }
        failures += 1;
        for message in result.detailed_messages() {
            println!("      • {}", message);
        }
        for error in &result.configuration_errors {
            println!("      ⚠ {}", error);
        }
    }

    println!();
    println!("{} of {} name(s) passed", names.len() - failures, names.len());
    Ok(())
}
