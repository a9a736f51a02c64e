mod config;
mod print;
mod session;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use claimtree_core::http::HttpDocumentService;
use claimtree_core::memory::InMemoryDocuments;
use claimtree_core::{
    export, search, BulkMsg, BulkReport, ClaimId, DocumentService, Explorer, FileUpload, NodeId,
    PreviewContent,
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::session::Session;

#[derive(Parser, Debug)]
#[command(name = "claimtree", about = "Browse and organize claim documents")]
struct Args {
    /// Portal API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// API bearer token
    #[arg(long, global = true)]
    token: Option<String>,
    /// Session file holding the open claim and current folder
    #[arg(long, global = true)]
    state: Option<PathBuf>,
    /// Work against a built-in sample claim instead of the API
    #[arg(long, global = true)]
    offline: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List claims
    Claims,
    /// Open a claim and go to its root folder
    Open { claim: String },
    /// List the current folder
    Ls,
    /// Print the whole folder hierarchy
    Tree,
    /// Change folder: an id, `..` or `/`
    Cd { target: String },
    /// Create a folder in the current folder
    Mkdir { name: String },
    /// Upload files into the current folder
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    Rename { id: String, name: String },
    /// Delete the given items, or the selection
    Rm { ids: Vec<String> },
    /// Move an item under a folder id, or `/` for the root
    Mv { id: String, to: String },
    /// Change the selection in the current folder
    Select {
        ids: Vec<String>,
        #[arg(long, conflicts_with_all = ["none", "ids"])]
        all: bool,
        #[arg(long, conflicts_with = "ids")]
        none: bool,
    },
    /// Download the given files, or the selected ones, into a directory
    Download { dest: PathBuf, ids: Vec<String> },
    Preview { id: String },
    /// Export the claim's documents
    Export {
        #[arg(long)]
        json: Option<PathBuf>,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Fuzzy search by name
    Find { query: String },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings = Settings::load()?;
    if let Some(url) = args.api_url.clone() {
        settings.api_url = url;
    }
    if let Some(token) = args.token.clone() {
        settings.token = Some(token);
    }
    if let Some(state) = args.state.clone() {
        settings.state_file = state;
    }
    claimtree_core::logging::init(&settings.log_level);
    tracing::debug!(
        api_url = %settings.api_url,
        state = %settings.state_file.display(),
        offline = args.offline,
        "settings loaded"
    );

    let mut session = Session::load(&settings.state_file)?;

    match args.command {
        Command::Claims => {
            if args.offline {
                println!("demo-claim  Demo drawback claim  InProgress");
                return Ok(());
            }
            let http = HttpDocumentService::new(&settings.api_url, settings.token.clone())?;
            for claim in http.list_claims()? {
                println!("{:<24} {:<32} {:?}", claim.id, claim.name, claim.status);
            }
            Ok(())
        }
        Command::Open { claim } => {
            let claim = ClaimId::new(claim);
            let service = connect(&settings, &claim, args.offline)?;
            let explorer = Explorer::open(service, claim.clone())?;
            println!("opened {} ({} documents)", claim, explorer.tree().len());
            session.open(claim);
            session.save(&settings.state_file)
        }
        command => {
            let claim = session
                .claim
                .clone()
                .context("no claim open, run `claimtree open <claim>` first")?;
            let service = connect(&settings, &claim, args.offline)?;
            let mut explorer = Explorer::restore(service, claim, session.view.clone())?;
            run(&mut explorer, command)?;
            session.view = explorer.into_view();
            session.save(&settings.state_file)
        }
    }
}

fn connect(
    settings: &Settings,
    claim: &ClaimId,
    offline: bool,
) -> anyhow::Result<Arc<dyn DocumentService>> {
    if offline {
        return Ok(Arc::new(InMemoryDocuments::demo(claim)));
    }
    Ok(Arc::new(HttpDocumentService::new(
        &settings.api_url,
        settings.token.clone(),
    )?))
}

fn parent_arg(s: &str) -> Option<NodeId> {
    match s {
        "/" | "root" => None,
        id => Some(NodeId::new(id)),
    }
}

fn run<S: DocumentService>(explorer: &mut Explorer<S>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Ls => print::listing(explorer),
        Command::Tree => print::tree(explorer.tree()),
        Command::Cd { target } => {
            let moved = match target.as_str() {
                ".." => explorer.navigate_up(),
                "/" => explorer.navigate_to_folder(None),
                id => explorer.navigate_to_folder(Some(&NodeId::new(id))),
            };
            if !moved {
                bail!("no folder {target} here");
            }
            println!("{}", print::breadcrumbs(explorer));
        }
        Command::Mkdir { name } => {
            let parent = explorer.current_folder();
            let folder = explorer.create_folder(parent.as_ref(), &name)?;
            println!("created {} ({})", folder.name, folder.id);
        }
        Command::Upload { files } => {
            let uploads = files
                .iter()
                .map(|p| {
                    FileUpload::from_path(p).with_context(|| format!("reading {}", p.display()))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            let parent = explorer.current_folder();
            let report = with_progress(explorer, "uploaded", |e| {
                e.upload_files(parent.as_ref(), &uploads)
            })?;
            summarize(&report);
        }
        Command::Rename { id, name } => {
            let node = explorer.rename(&NodeId::new(id), &name)?;
            println!("renamed {} to {}", node.id, node.name);
        }
        Command::Rm { ids } => {
            select_ids(explorer, &ids)?;
            let report = with_progress(explorer, "deleted", |e| e.bulk_delete())?;
            summarize(&report);
        }
        Command::Mv { id, to } => {
            let node = explorer.move_node(&NodeId::new(id), parent_arg(&to).as_ref())?;
            let parent = node.parent_id.map(|p| p.0).unwrap_or_else(|| "/".into());
            println!("moved {} to {}", node.id, parent);
        }
        Command::Select { ids, all, none } => {
            if all {
                explorer.select_all(true);
            } else if none {
                explorer.select_all(false);
            } else {
                for id in ids {
                    if !explorer.toggle(&NodeId::new(&id), true) {
                        eprintln!("{id} is not in the current folder");
                    }
                }
            }
            print::listing(explorer);
        }
        Command::Download { dest, ids } => {
            select_ids(explorer, &ids)?;
            let report = with_progress(explorer, "downloaded", |e| e.bulk_download(&dest))?;
            summarize(&report);
        }
        Command::Preview { id } => match explorer.preview(&NodeId::new(id))? {
            PreviewContent::Text(text) => print!("{text}"),
            PreviewContent::Image { content_type, bytes } => {
                println!("{content_type} image, {}", print::size(bytes.len()))
            }
            PreviewContent::Unavailable => println!("Preview not available for this file type."),
        },
        Command::Export { json, csv } => {
            if json.is_none() && csv.is_none() {
                bail!("pass --json <path> and/or --csv <path>");
            }
            if let Some(path) = json {
                let value = export::to_json(explorer.tree());
                std::fs::write(&path, serde_json::to_string_pretty(&value)?)?;
                println!("wrote {}", path.display());
            }
            if let Some(path) = csv {
                let file = std::fs::File::create(&path)?;
                export::to_csv(explorer.tree(), std::io::BufWriter::new(file))?;
                println!("wrote {}", path.display());
            }
        }
        Command::Find { query } => {
            let tree = explorer.tree();
            for (node, score) in search::find(tree, &query) {
                println!("{score:>4}  {}  [{}]", tree.display_path(&node.id), node.id);
            }
        }
        Command::Claims | Command::Open { .. } => unreachable!("handled before loading a claim"),
    }
    Ok(())
}

/// Replace the selection with `ids` when any are given.
fn select_ids<S: DocumentService>(
    explorer: &mut Explorer<S>,
    ids: &[String],
) -> anyhow::Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    explorer.clear_selection();
    for id in ids {
        if !explorer.toggle(&NodeId::new(id.as_str()), true) {
            bail!("{id} is not in the current folder");
        }
    }
    Ok(())
}

/// Run a bulk operation while a second thread prints its progress.
fn with_progress<S, F>(
    explorer: &mut Explorer<S>,
    verb: &'static str,
    op: F,
) -> anyhow::Result<BulkReport>
where
    S: DocumentService,
    F: FnOnce(&mut Explorer<S>) -> claimtree_core::Result<BulkReport>,
{
    let (tx, rx) = crossbeam_channel::unbounded::<BulkMsg>();
    let printer = std::thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            match msg {
                BulkMsg::Started { total } => eprintln!("{total} item(s)"),
                BulkMsg::ItemDone { id } => eprintln!("  {verb} {id}"),
                BulkMsg::ItemFailed { id, reason } => eprintln!("  failed {id}: {reason}"),
                BulkMsg::Finished { .. } => break,
            }
        }
    });
    explorer.set_progress(Some(tx));
    let result = op(explorer);
    explorer.set_progress(None);
    let _ = printer.join();
    Ok(result?)
}

fn summarize(report: &BulkReport) {
    println!("{} succeeded, {} failed", report.succeeded.len(), report.failed.len());
    if let Some(err) = &report.reload_error {
        eprintln!("warning: listing not refreshed: {err}");
    }
}
