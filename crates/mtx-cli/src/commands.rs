use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use mtx_sdk::config::CONFIG_FILE;
use mtx_sdk::{
    ArrayOpRequest, ContentNode, FieldPath, Microtext, MicrotextConfig, PageId, SyncReport,
};
use mtx_server::{MicrotextServer, ServerConfig};
use mtx_tools::{tool_descriptors, ChangeOutcome, InstructionReport, ToolCall};
use mtx_types::flatten;
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let out = Output {
        json: matches!(cli.format, OutputFormat::Json),
    };
    if let Command::Init(args) = &cli.command {
        return cmd_init(cli.config.as_deref(), args, &out);
    }

    let config = load_config(cli.config.as_deref())?;
    let mt = Microtext::open(config).context("failed to open content")?;
    match cli.command {
        Command::Init(_) => unreachable!("handled above"),
        Command::Pages(_) => cmd_pages(&mt, &out),
        Command::Read(args) => cmd_read(&mt, args, &out),
        Command::Set(args) => cmd_set(&mt, args, &out),
        Command::Array(args) => cmd_array(&mt, args, &out),
        Command::Draft(args) => cmd_draft(&mt, args, &out),
        Command::Publish(args) => cmd_publish(&mt, args, &out),
        Command::Status(_) => cmd_status(&mt, &out),
        Command::Tools(args) => cmd_tools(&mt, args, &out),
        Command::Serve(args) => cmd_serve(mt, args),
    }
}

struct Output {
    json: bool,
}

impl Output {
    /// Print `value` as JSON, or run `text` to print it for people.
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T)) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text(value);
        }
        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<MicrotextConfig> {
    match path {
        Some(path) => Ok(MicrotextConfig::load(path)?),
        None if Path::new(CONFIG_FILE).exists() => Ok(MicrotextConfig::load(CONFIG_FILE)?),
        None => Ok(MicrotextConfig::default()),
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}

fn page(raw: &str) -> anyhow::Result<PageId> {
    PageId::parse(raw).with_context(|| format!("invalid page id {raw:?}"))
}

fn field(raw: &str) -> anyhow::Result<FieldPath> {
    FieldPath::parse(raw).with_context(|| format!("invalid field path {raw:?}"))
}

fn cmd_init(path: Option<&Path>, args: &InitArgs, out: &Output) -> anyhow::Result<()> {
    let file = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    if file.exists() && !args.force {
        anyhow::bail!("{} already exists (use --force to overwrite)", file.display());
    }
    let config = MicrotextConfig::for_root(&args.root);
    std::fs::write(&file, config.to_toml_string()?)?;
    let base = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(base.join(&config.content_root))?;

    out.emit(&config, |c| {
        println!("{} Wrote {}", "✓".green().bold(), file.display().to_string().bold());
        println!("  Content root: {}", c.content_root.display().to_string().cyan());
    })
}

fn cmd_pages(mt: &Microtext, out: &Output) -> anyhow::Result<()> {
    let pages = runtime()?.block_on(mt.tools().enumerate_pages())?;
    out.emit(&pages, |pages| {
        if pages.is_empty() {
            println!("No pages.");
        }
        for p in pages {
            println!(
                "{:<32} {:>4} fields  {}",
                p.page_id.as_str().bold(),
                p.fields,
                p.revision.short_hex().dimmed()
            );
        }
    })
}

fn cmd_read(mt: &Microtext, args: ReadArgs, out: &Output) -> anyhow::Result<()> {
    let id = page(&args.page)?;
    let tree = if args.drafts {
        let (tree, rejected) = mt.read_with_drafts(&id)?;
        for r in &rejected {
            eprintln!(
                "{} draft {} not applied: {}",
                "!".yellow().bold(),
                r.entry.path.to_string().yellow(),
                r.error
            );
        }
        tree
    } else {
        mt.read(&id)?
    };

    if args.flat {
        let flat = flatten(&tree);
        out.emit(&flat, |flat| {
            for (path, value) in flat {
                println!("{} = {}", path.cyan(), value);
            }
        })
    } else {
        out.emit(&tree, |tree| print_tree(tree, 0))
    }
}

fn print_tree(node: &ContentNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match node {
        ContentNode::Leaf(text) => println!("{indent}{text}"),
        ContentNode::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if item.is_leaf() {
                    print!("{indent}{} ", format!("[{i}]").dimmed());
                    print_tree(item, 0);
                } else {
                    println!("{indent}{}", format!("[{i}]").dimmed());
                    print_tree(item, depth + 1);
                }
            }
        }
        ContentNode::Object(fields) => {
            for (key, value) in fields {
                if value.is_leaf() {
                    print!("{indent}{}: ", key.cyan());
                    print_tree(value, 0);
                } else {
                    println!("{indent}{}:", key.cyan());
                    print_tree(value, depth + 1);
                }
            }
        }
    }
}

fn cmd_set(mt: &Microtext, args: SetArgs, out: &Output) -> anyhow::Result<()> {
    let write = mt.set_field(&page(&args.page)?, &field(&args.path)?, &args.value)?;
    out.emit(&write, |w| {
        if w.changed() {
            println!(
                "{} {} {} → {}",
                "✓".green().bold(),
                w.path.to_string().cyan(),
                w.previous_value.as_deref().unwrap_or("(new)").dimmed(),
                w.new_value
            );
        } else {
            println!("{} {} unchanged", "·".dimmed(), w.path.to_string().cyan());
        }
    })
}

fn cmd_array(mt: &Microtext, args: ArrayArgs, out: &Output) -> anyhow::Result<()> {
    let request = match args.action {
        ArrayAction::Add {
            page: p,
            path,
            template,
        } => {
            let mut request = ArrayOpRequest::add(page(&p)?, field(&path)?);
            if let Some(json) = template {
                let item: ContentNode =
                    serde_json::from_str(&json).context("template is not valid content JSON")?;
                request = request.with_template(item);
            }
            request
        }
        ArrayAction::Remove {
            page: p,
            path,
            index,
        } => ArrayOpRequest::remove(page(&p)?, field(&path)?, index),
    };
    let result = mt.array_op(&request)?;
    out.emit(&result, |r| {
        println!(
            "{} {} {}[{}], now {} items",
            "✓".green().bold(),
            r.op,
            r.array_path.to_string().cyan(),
            r.index,
            r.new_length
        );
    })
}

fn cmd_draft(mt: &Microtext, args: DraftArgs, out: &Output) -> anyhow::Result<()> {
    match args.action {
        DraftAction::Save { page: p, path, value } => {
            let entry = mt.save_draft(&page(&p)?, &field(&path)?, &value)?;
            out.emit(&entry, |e| {
                println!(
                    "{} Draft saved for {} {}",
                    "✓".green(),
                    e.page_id.as_str().bold(),
                    e.path.to_string().cyan()
                );
            })
        }
        DraftAction::List { page: p } => {
            let drafts = match p {
                Some(p) => mt.drafts(&page(&p)?)?,
                None => mt.all_drafts()?,
            };
            out.emit(&drafts, |drafts| {
                if drafts.is_empty() {
                    println!("No pending drafts.");
                }
                for d in drafts {
                    println!(
                        "{} {} = {}  {}",
                        d.page_id.as_str().bold(),
                        d.path.to_string().cyan(),
                        d.value,
                        d.timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed()
                    );
                }
            })
        }
        DraftAction::Clear { page: p } => {
            let removed = mt.discard_drafts(&page(&p)?)?;
            out.emit(&serde_json::json!({ "removed": removed }), |_| {
                println!("Discarded {} draft(s) for {}", removed, p.bold());
            })
        }
        DraftAction::Sync { page: p } => {
            let rt = runtime()?;
            let report = match p {
                Some(p) => rt.block_on(mt.sync(&page(&p)?))?,
                None => rt.block_on(mt.sync_all())?,
            };
            out.emit(&report, print_sync_report)?;
            report.into_result()?;
            Ok(())
        }
    }
}

fn print_sync_report(report: &SyncReport) {
    println!("{} {} draft(s) written", "✓".green().bold(), report.applied.len());
    if report.superseded > 0 {
        println!("  {} kept: edited again during sync", report.superseded);
    }
    for f in &report.failed {
        println!(
            "  {} {} {}: {}",
            "✗".red().bold(),
            f.page_id.as_str().bold(),
            f.path.to_string().cyan(),
            f.error
        );
    }
}

fn cmd_publish(mt: &Microtext, args: PublishArgs, out: &Output) -> anyhow::Result<()> {
    let outcome = mt.publish(args.message.as_deref())?;
    out.emit(&outcome, |o| match &o.commit {
        Some(commit) if o.published => {
            println!("{} Published {} file(s)", "✓".green().bold(), o.files_changed);
            println!("  Commit: {}", commit.short().yellow());
            if let Some(message) = &o.message {
                println!("  Message: {message}");
            }
        }
        _ => println!("Nothing to publish."),
    })
}

fn cmd_status(mt: &Microtext, out: &Output) -> anyhow::Result<()> {
    let status = mt.publish_status()?;
    out.emit(&status, |s| {
        if s.is_clean() {
            println!("All content published.");
            return;
        }
        println!("{} unpublished change(s):", s.unpublished_changes.to_string().bold());
        for f in &s.files {
            println!("  {} {}", f.kind.code().to_string().yellow(), f.path);
        }
    })
}

fn cmd_tools(mt: &Microtext, args: ToolsArgs, out: &Output) -> anyhow::Result<()> {
    match args.action {
        None => out.emit(&tool_descriptors(), |tools| {
            for t in tools {
                println!("{:<24} {}", t.name.bold(), t.description);
            }
        }),
        Some(ToolsAction::Call { name, arguments }) => {
            let arguments = arguments
                .map(|text| serde_json::from_str(&text))
                .transpose()
                .context("arguments are not valid JSON")?;
            let call = ToolCall::from_parts(&name, arguments)?;
            let result = runtime()?.block_on(mt.tools().dispatch(call))?;
            if !out.json {
                if let Ok(report) = serde_json::from_value::<InstructionReport>(result.clone()) {
                    print_instruction_report(&report);
                    return Ok(());
                }
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

fn print_instruction_report(report: &InstructionReport) {
    for c in &report.changes {
        match &c.outcome {
            ChangeOutcome::Applied { .. } => println!(
                "{} {} → {}",
                "✓".green().bold(),
                c.change.path.cyan(),
                c.change.new_value
            ),
            ChangeOutcome::Stale { actual } => println!(
                "{} {} skipped: now {:?}",
                "!".yellow().bold(),
                c.change.path.cyan(),
                actual.as_deref().unwrap_or("(missing)")
            ),
            ChangeOutcome::Failed { error } => {
                println!("{} {} {}", "✗".red().bold(), c.change.path.cyan(), error)
            }
        }
    }
}

fn cmd_serve(mt: Microtext, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.server_config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = &args.bind {
        config.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid bind address {bind:?}"))?;
    }
    println!("Microtext server on {}", config.bind_addr.to_string().bold());
    runtime()?.block_on(MicrotextServer::new(config, mt).serve())?;
    Ok(())
}
