//! CLI: schema → form (render), answers → instance (parse), form → answers (synth)
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indexmap::IndexMap;
use rayon::prelude::*;

use crate::answers::AnswerSet;
use crate::composite::CompositeRegistry;
use crate::config::Settings;
use crate::diagnostics::Diagnostics;
use crate::form::FormItem;
use crate::parse::{AnswerParser, ParseOutcome};
use crate::render::FormRenderer;
use crate::resolve::resolve;
use crate::schema::SchemaRegistry;
use crate::synth::{HiddenPolicy, Synthesizer};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile a clinical data schema into a generic form and parse filled-in answers back
#[derive(Parser, Debug)]
#[command(name = "schemaform", version)]
pub struct CommandLineInterface {
    #[command(flatten)]
    global: GlobalSettings,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// render the schema and print the resolved form
    Render(RenderOut),
    /// parse answer sets into schema instances
    Parse(ParseOut),
    /// generate a synthetic answer set for the form
    Synth(SynthOut),
}

#[derive(Args, Debug, Clone)]
struct GlobalSettings {
    /// declarative schema JSON (the built-in demo schema if omitted)
    #[arg(long, global = true, env = "SCHEMAFORM_SCHEMA")]
    schema: Option<PathBuf>,

    /// tracing filter directive, e.g. `schemaform=debug` (overrides RUST_LOG)
    #[arg(long, global = true, env = "SCHEMAFORM_LOG")]
    log: Option<String>,

    /// single-line JSON output
    #[arg(long, global = true, default_value_t = false)]
    compact: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormFormat {
    /// the internal form tree
    Tree,
    /// a questionnaire document
    Questionnaire,
}

#[derive(clap::Parser, Debug)]
struct RenderOut {
    #[arg(long, value_enum, default_value_t = FormFormat::Tree)]
    format: FormFormat,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct ParseOut {
    /// One or more answer files. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    answers: Vec<String>,

    /// inputs are nested response documents rather than flat answer sets
    #[arg(long, default_value_t = false)]
    response: bool,

    /// output directory, one `<name>.instance.json` per input (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct SynthOut {
    /// what to do with items hidden by a visibility condition
    #[arg(long, value_enum, env = "SCHEMAFORM_HIDDEN_POLICY", default_value_t = HiddenPolicy::Fill)]
    hidden: HiddenPolicy,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn settings(&self) -> Settings {
        let hidden = match &self.cmd {
            Command::Synth(target) => target.hidden,
            _ => HiddenPolicy::default(),
        };
        Settings::new(self.global.schema.clone(), hidden, self.global.log.clone(), !self.global.compact)
    }

    pub fn run(&self, settings: &Settings) -> anyhow::Result<()> {
        let schema = settings.load_schema().context("failed to load schema")?;
        let composites = CompositeRegistry::with_builtins();
        let form = build_form(&schema, &composites)?;

        match &self.cmd {
            Command::Render(target) => {
                let doc = match target.format {
                    FormFormat::Tree => serde_json::to_value(&form)?,
                    FormFormat::Questionnaire => crate::wire::form_to_json(&form),
                };
                write_output(target.out.as_deref(), &settings.to_json(&doc)?)
            }
            Command::Synth(target) => {
                let answers = Synthesizer::new(settings.hidden_policy()).synthesize(&form);
                eprintln!("{} {} answers ({:?})", "synth".green().bold(), answers.len(), settings.hidden_policy());
                write_output(target.out.as_deref(), &settings.to_json(&answers)?)
            }
            Command::Parse(target) => {
                let source_paths = resolve_file_path_patterns(&target.answers)
                    .context("failed to resolve answer file paths")?;
                let targets = target.out.as_deref().map(|dir| output_paths(dir, &source_paths)).transpose()?;
                let parser = AnswerParser::new(&schema, &composites);

                // registries and form are shared read-only across workers
                let results: Vec<(PathBuf, anyhow::Result<ParseOutcome>)> = source_paths
                    .par_iter()
                    .map(|path| (path.clone(), parse_file(&parser, &form, path, target.response)))
                    .collect();

                let mut failed = 0usize;
                for (i, (path, result)) in results.into_iter().enumerate() {
                    let label = path.to_string_lossy().to_string();
                    let outcome = match result {
                        Ok(outcome) => outcome,
                        Err(error) => {
                            eprintln!("{} {label}: {error:#}", "error".red().bold());
                            failed += 1;
                            continue;
                        }
                    };
                    report(&label, &outcome.diagnostics);
                    let src = settings.to_json(&outcome)?;
                    match targets.as_ref().and_then(|t| t.get(i)) {
                        Some(out) => write_output(Some(out.as_path()), &src)?,
                        None => println!("{src}"),
                    }
                }
                if failed > 0 {
                    bail!("{failed} of {} answer files failed to parse", source_paths.len());
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn build_form(schema: &SchemaRegistry, composites: &CompositeRegistry) -> anyhow::Result<FormItem> {
    let mut form = FormRenderer::new(composites).render(schema).context("failed to render form")?;
    let mut diagnostics = Diagnostics::new();
    resolve(&mut form, &mut diagnostics);
    if !diagnostics.is_empty() {
        report("form", &diagnostics);
    }
    Ok(form)
}

fn parse_file(parser: &AnswerParser<'_>, form: &FormItem, path: &Path, response: bool) -> anyhow::Result<ParseOutcome> {
    let source = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let (answers, mut diagnostics) = if response {
        let read = crate::wire::answers_from_response(&source)?;
        (read.answers, read.diagnostics)
    } else {
        (crate::path_de::from_str_with_path::<AnswerSet>(&source)?, Diagnostics::new())
    };
    let mut outcome = parser.parse(form, &answers)?;
    // skips from reading the document come first
    diagnostics.extend(outcome.diagnostics);
    outcome.diagnostics = diagnostics;
    Ok(outcome)
}

/// `<stem>.instance.json` under `dir` for every input. Two inputs landing on
/// the same file is an error, raised before anything is parsed.
fn output_paths(dir: &Path, inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut seen: IndexMap<PathBuf, &Path> = IndexMap::new();
    let mut out = Vec::with_capacity(inputs.len());
    for input in inputs {
        let stem = input.file_stem().map(|s| s.to_string_lossy().to_string());
        let target = dir.join(format!("{}.instance.json", stem.as_deref().unwrap_or("answers")));
        if let Some(previous) = seen.insert(target.clone(), input.as_path()) {
            bail!(
                "{} and {} would both be written to {}",
                previous.display(),
                input.display(),
                target.display()
            );
        }
        out.push(target);
    }
    Ok(out)
}

fn report(label: &str, diagnostics: &Diagnostics) {
    if diagnostics.is_empty() {
        eprintln!("{} {label}", "ok".green().bold());
        return;
    }
    eprintln!("{} {label}: {} diagnostic(s)", "warn".yellow().bold(), diagnostics.len());
    for diagnostic in diagnostics.iter() {
        eprintln!("  {} {diagnostic}", diagnostic.kind().dimmed());
    }
}

fn write_output(out: Option<&Path>, src: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, src).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{src}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
