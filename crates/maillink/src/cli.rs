//! Command-line interface.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::io::BufReader;
use tracing::debug;

use maillink_core::{ChannelService, LinkService, Request, serve};
use maillink_dom::{
    Activator, Document, ElementExt, InjectedControl, Injector, Observer, Outcome, ReadyState,
};

use crate::app::build_resolver;
use crate::desktop::{DesktopNotifier, SystemClipboard};
use crate::host;
use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "maillink")]
#[command(version, about = "Account-independent deep links to Gmail messages")]
pub struct Cli {
    /// Settings file [default: <config dir>/maillink/settings.json]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the deep link to a message, or to the newest message of a thread
    Link(LinkArgs),
    /// Answer link requests given as JSON lines on stdin
    Serve,
    /// Decorate a saved page snapshot and list the attached controls
    Inject(InjectArgs),
    /// Show the effective settings, or write a default settings file
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LinkKind {
    /// A Gmail message id
    Message,
    /// A Gmail thread id
    Thread,
}

#[derive(Debug, Args)]
pub struct LinkArgs {
    /// What the id refers to
    #[arg(value_enum)]
    pub kind: LinkKind,
    /// Gmail message or thread id
    pub id: String,
    /// Copy the link to the clipboard and show a notification
    #[arg(long)]
    pub copy: bool,
}

impl LinkArgs {
    fn request(&self) -> Request {
        match self.kind {
            LinkKind::Message => Request::Message {
                gmail_message_id: self.id.clone(),
            },
            LinkKind::Thread => Request::ThreadLast {
                thread_id: self.id.clone(),
            },
        }
    }
}

#[derive(Debug, Args)]
pub struct InjectArgs {
    /// Saved page HTML
    pub snapshot: PathBuf,
    /// Also resolve the link behind every control
    #[arg(long)]
    pub resolve: bool,
    /// Print the decorated page as HTML
    #[arg(long)]
    pub tree: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Write default settings to the settings file
    #[arg(long)]
    pub init: bool,
    /// Overwrite an existing file with --init
    #[arg(long, requires = "init")]
    pub force: bool,
}

/// Runs the parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    let path = cli.config.unwrap_or_else(Settings::default_path);
    match cli.command {
        Command::Link(args) => link(&path, &args).await,
        Command::Serve => serve_stdio(&path).await,
        Command::Inject(args) => inject(&path, &args).await,
        Command::Config(args) => config(&path, &args).await,
    }
}

async fn link(path: &Path, args: &LinkArgs) -> Result<()> {
    let settings = Settings::load(path).await?;
    let resolver = Arc::new(build_resolver(&settings)?);
    let request = args.request();

    let url = if args.copy {
        let activator = Activator::new(Arc::clone(&resolver), SystemClipboard, DesktopNotifier);
        match activator.activate(request).await {
            Outcome::Copied(url) => url,
            Outcome::Failed(error) => bail!(error),
        }
    } else {
        resolver
            .resolve(request)
            .await
            .into_result()
            .map_err(|error| anyhow!(error))?
    };

    debug!(stats = ?resolver.cache().stats(), "link cache");
    println!("{url}");
    Ok(())
}

async fn serve_stdio(path: &Path) -> Result<()> {
    let settings = Settings::load(path).await?;
    let resolver = Arc::new(build_resolver(&settings)?);
    let stdin = BufReader::new(tokio::io::stdin());
    host::run(Arc::clone(&resolver), stdin, tokio::io::stdout()).await?;
    debug!(stats = ?resolver.cache().stats(), "link cache");
    Ok(())
}

async fn inject(path: &Path, args: &InjectArgs) -> Result<()> {
    let settings = Settings::load(path).await?;
    let html = tokio::fs::read_to_string(&args.snapshot)
        .await
        .with_context(|| format!("reading {}", args.snapshot.display()))?;

    let document = Document::parse_html(&html).shared();
    document.borrow().set_ready_state(ReadyState::Complete);

    let mut observer = Observer::new(Injector::new(settings.anchors.clone())?);
    let (_mutations, injected) = observer.attach(&document).await?;

    let service = if args.resolve {
        let (service, rx) = ChannelService::channel(16);
        tokio::spawn(serve(Arc::new(build_resolver(&settings)?), rx));
        Some(service)
    } else {
        None
    };

    for control in &injected {
        let line = describe(control);
        match &service {
            Some(service) => {
                let link = service
                    .resolve(control.request.clone())
                    .await
                    .into_result()
                    .unwrap_or_else(|error| format!("error: {error}"));
                println!("{line}\t{link}");
            }
            None => println!("{line}"),
        }
    }

    if args.tree {
        println!("{}", document.borrow().to_html());
    }
    eprintln!("{} control(s) attached", injected.len());
    Ok(())
}

fn describe(control: &InjectedControl) -> String {
    let reference = match &control.request {
        Request::Message { gmail_message_id } => gmail_message_id,
        Request::ThreadLast { thread_id } => thread_id,
    };
    format!(
        "{}\t{}\t<{}>",
        control.kind.as_str(),
        reference,
        control.host.tag().as_deref().unwrap_or("?")
    )
}

async fn config(path: &Path, args: &ConfigArgs) -> Result<()> {
    if args.init {
        if path.exists() && !args.force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
        Settings::default().save(path).await?;
        eprintln!("Wrote default settings to {}", path.display());
        return Ok(());
    }

    let settings = Settings::load(path).await?;
    eprintln!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
    Ok(())
}
