use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mtx",
    about = "Microtext: edit the short text of a content-driven site",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./microtext.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a default microtext.toml and create the content root
    Init(InitArgs),
    /// List pages
    Pages(PagesArgs),
    /// Show a page's content
    Read(ReadArgs),
    /// Set one text field
    Set(SetArgs),
    /// Add or remove array items
    Array(ArrayArgs),
    /// Manage pending drafts
    Draft(DraftArgs),
    /// Commit all content changes as one unit
    Publish(PublishArgs),
    /// Show unpublished content changes
    Status(StatusArgs),
    /// List agent tools or call one
    Tools(ToolsArgs),
    /// Start the HTTP server
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct InitArgs {
    #[arg(long, default_value = "content")]
    pub root: String,
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct PagesArgs {}

#[derive(Args)]
pub struct ReadArgs {
    pub page: String,
    /// Print `path = value` lines instead of the tree
    #[arg(long)]
    pub flat: bool,
    /// Show pending drafts applied on top
    #[arg(long)]
    pub drafts: bool,
}

#[derive(Args)]
pub struct SetArgs {
    pub page: String,
    pub path: String,
    pub value: String,
}

#[derive(Args)]
pub struct ArrayArgs {
    #[command(subcommand)]
    pub action: ArrayAction,
}

#[derive(Subcommand)]
pub enum ArrayAction {
    /// Append an item
    Add {
        page: String,
        path: String,
        /// Item as JSON; defaults to a blank copy of the last item
        #[arg(long)]
        template: Option<String>,
    },
    /// Remove the item at an index
    Remove {
        page: String,
        path: String,
        index: usize,
    },
}

#[derive(Args)]
pub struct DraftArgs {
    #[command(subcommand)]
    pub action: DraftAction,
}

#[derive(Subcommand)]
pub enum DraftAction {
    /// Save a draft without writing the page
    Save {
        page: String,
        path: String,
        value: String,
    },
    /// List drafts, for one page or all
    List { page: Option<String> },
    /// Discard a page's drafts
    Clear { page: String },
    /// Write drafts to their pages, for one page or all
    Sync { page: Option<String> },
}

#[derive(Args)]
pub struct PublishArgs {
    #[arg(short, long)]
    pub message: Option<String>,
}

#[derive(Args)]
pub struct StatusArgs {}

#[derive(Args)]
pub struct ToolsArgs {
    #[command(subcommand)]
    pub action: Option<ToolsAction>,
}

#[derive(Subcommand)]
pub enum ToolsAction {
    /// Call a tool with JSON arguments
    Call {
        name: String,
        arguments: Option<String>,
    },
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<String>,
    /// Server configuration file
    #[arg(long)]
    pub server_config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pages() {
        let cli = Cli::try_parse_from(["mtx", "pages"]).unwrap();
        assert!(matches!(cli.command, Command::Pages(_)));
    }

    #[test]
    fn parse_read_flat() {
        let cli = Cli::try_parse_from(["mtx", "read", "home", "--flat"]).unwrap();
        if let Command::Read(args) = cli.command {
            assert_eq!(args.page, "home");
            assert!(args.flat);
            assert!(!args.drafts);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_set() {
        let cli = Cli::try_parse_from(["mtx", "set", "home", "hero.heading", "Hello"]).unwrap();
        if let Command::Set(args) = cli.command {
            assert_eq!(args.path, "hero.heading");
            assert_eq!(args.value, "Hello");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_array_remove() {
        let cli = Cli::try_parse_from(["mtx", "array", "remove", "home", "features", "2"]).unwrap();
        if let Command::Array(args) = cli.command {
            assert!(matches!(args.action, ArrayAction::Remove { index: 2, .. }));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_array_add_template() {
        let cli = Cli::try_parse_from([
            "mtx", "array", "add", "home", "features", "--template", "{\"name\":\"New\"}",
        ])
        .unwrap();
        if let Command::Array(args) = cli.command {
            assert!(matches!(args.action, ArrayAction::Add { template: Some(_), .. }));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_draft_sync_all() {
        let cli = Cli::try_parse_from(["mtx", "draft", "sync"]).unwrap();
        if let Command::Draft(args) = cli.command {
            assert!(matches!(args.action, DraftAction::Sync { page: None }));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_publish() {
        let cli = Cli::try_parse_from(["mtx", "publish", "-m", "Spring copy"]).unwrap();
        if let Command::Publish(args) = cli.command {
            assert_eq!(args.message, Some("Spring copy".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_tools_call() {
        let cli = Cli::try_parse_from(["mtx", "tools", "call", "read-content", "{\"pageId\":\"home\"}"]).unwrap();
        if let Command::Tools(args) = cli.command {
            assert!(matches!(args.action, Some(ToolsAction::Call { .. })));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_tools_list() {
        let cli = Cli::try_parse_from(["mtx", "tools"]).unwrap();
        if let Command::Tools(args) = cli.command {
            assert!(args.action.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["mtx", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:8080".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from(["mtx", "--verbose", "--format", "json", "-c", "site.toml", "status"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.config, Some(PathBuf::from("site.toml")));
    }
}
