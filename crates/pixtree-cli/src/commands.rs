use std::path::Path;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, NaiveDate, Utc};
use colored::Colorize;
use pixtree_query::{limit, sort_results};
use pixtree_sdk::{
    Dimensions, FileBackend, GenerateOptions, ImageNode, ImportOptions, IssueKind, ParamChange,
    ParentChoice, Pixtree, Rating, SearchFilter, Tree,
};
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let workdir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot read current directory")?,
    };
    let out = Output { format: cli.format };
    match cli.command {
        Command::Init(args) => cmd_init(&workdir, args),
        command => run_in_working_copy(&Pixtree::discover(&workdir)?, &out, command),
    }
}

fn run_in_working_copy(px: &Pixtree, out: &Output, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Init(_) => bail!("already initialized at {}", px.root().display()),
        Command::Status(_) => cmd_status(px),
        Command::Tree(args) => cmd_tree(px, out, args),
        Command::Generate(args) => cmd_generate(px, args),
        Command::Import(args) => cmd_import(px, args),
        Command::Checkout(args) => cmd_checkout(px, args),
        Command::Show(args) => cmd_show(px, out, &args.node),
        Command::Tag(args) => {
            let node = px.add_tags(&args.node, &args.tags)?;
            println!("{} {}: {}", "✓".green(), node.id.yellow(), join_tags(&node));
            Ok(())
        }
        Command::Untag(args) => {
            let node = px.remove_tags(&args.node, &args.tags)?;
            println!("{} {}: {}", "✓".green(), node.id.yellow(), join_tags(&node));
            Ok(())
        }
        Command::Rate(args) => {
            let rating = if args.clear { None } else { args.rating };
            let node = px.set_rating(&args.node, rating)?;
            match node.rating {
                Some(r) => println!("{} Rated {} {}", "✓".green(), node.id.yellow(), stars(r)),
                None => println!("{} Cleared rating of {}", "✓".green(), node.id.yellow()),
            }
            Ok(())
        }
        Command::Favorite(args) => {
            let node = px.set_favorite(&args.node, !args.off)?;
            let verb = if node.favorite { "Marked" } else { "Unmarked" };
            println!("{} {verb} {} as favorite", "✓".green(), node.id.yellow());
            Ok(())
        }
        Command::Describe(args) => {
            let node = px.set_description(&args.node, args.text.as_deref())?;
            println!("{} Updated {}", "✓".green(), node.id.yellow());
            Ok(())
        }
        Command::Reparent(args) => {
            let parent = if args.root { None } else { args.parent.as_deref() };
            let node = px.reparent_node(&args.node, parent)?;
            match &node.parent_id {
                Some(p) => println!("{} {} now derives from {}", "✓".green(), node.id.yellow(), p.yellow()),
                None => println!("{} {} is now a root", "✓".green(), node.id.yellow()),
            }
            Ok(())
        }
        Command::Delete(args) => {
            let outcome = px.delete_node(&args.node, args.reparent)?;
            println!("{} Deleted {}", "✓".green(), outcome.node_id.yellow());
            if !outcome.reparented.is_empty() {
                println!("  Reparented: {}", outcome.reparented.join(", "));
            }
            if !outcome.blob_removed {
                println!("  {}", "Image kept: shared with another node".dimmed());
            }
            Ok(())
        }
        Command::Lineage(args) => cmd_lineage(px, out, &args.node),
        Command::Search(args) => cmd_search(px, out, args),
        Command::Diff(args) => cmd_diff(px, args),
        Command::Validate(args) => cmd_validate(px, args),
        Command::Repair(args) => {
            let tree = px.repair_metadata(&args.tree)?;
            println!(
                "{} Repaired {}: {} node(s), depth {}",
                "✓".green().bold(),
                tree.name.bold(),
                tree.metadata.total_nodes,
                tree.metadata.max_depth
            );
            Ok(())
        }
        Command::Export(args) => {
            let exported = px.export_node(&args.node, &args.dest, args.name.as_deref())?;
            println!("{} Exported to {}", "✓".green(), exported.path.display().to_string().blue());
            Ok(())
        }
        Command::History(args) => {
            let history = px.export_history(&args.node)?;
            out.list(&history, |r| {
                format!(
                    "{}  {}  {}",
                    r.exported_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                    r.format.cyan(),
                    r.destination
                )
            })
        }
        Command::Config(args) => cmd_config(px, args),
    }
}

// ---- output ----

struct Output {
    format: OutputFormat,
}

impl Output {
    fn one<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => println!("{}", text(value)),
        }
        Ok(())
    }

    fn list<T: Serialize>(&self, items: &[T], line: impl Fn(&T) -> String) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
            OutputFormat::Text if items.is_empty() => println!("{}", "(none)".dimmed()),
            OutputFormat::Text => {
                for item in items {
                    println!("{}", line(item));
                }
            }
        }
        Ok(())
    }
}

fn join_tags(node: &ImageNode) -> String {
    node.tags.iter().cloned().collect::<Vec<_>>().join(", ")
}

fn stars(rating: Rating) -> String {
    let n = usize::from(rating.value());
    format!("{}{}", "★".repeat(n).yellow(), "☆".repeat(5 - n).dimmed())
}

fn node_line(node: &ImageNode) -> String {
    let mut line = format!("{}  {}", node.id.yellow(), node.label());
    if let Some(model) = node.model_name() {
        line.push_str(&format!("  {}", model.cyan()));
    }
    if node.favorite {
        line.push_str(&format!("  {}", "♥".red()));
    }
    if let Some(r) = node.rating {
        line.push_str(&format!("  {}", stars(r)));
    }
    line
}

fn tree_line(tree: &Tree) -> String {
    let mut line = format!(
        "{}  {}  {} node(s)  {}",
        tree.id.yellow(),
        tree.name.bold(),
        tree.metadata.total_nodes,
        tree.purpose.to_string().dimmed()
    );
    if tree.favorite {
        line.push_str(&format!("  {}", "♥".red()));
    }
    if tree.archived {
        line.push_str(&format!("  {}", "archived".dimmed()));
    }
    line
}

// ---- commands ----

fn cmd_init(workdir: &Path, args: InitArgs) -> anyhow::Result<()> {
    let name = match args.name {
        Some(name) => name,
        None => workdir
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|f| f.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "pixtree".to_string()),
    };
    let px = Pixtree::init(workdir, &name)?;
    println!(
        "{} Initialized pixtree project {} in {}",
        "✓".green().bold(),
        name.bold(),
        px.root().display()
    );
    println!("  Next: {}", "pixtree tree new <name> --switch".cyan());
    Ok(())
}

fn cmd_status(px: &Pixtree) -> anyhow::Result<()> {
    let status = px.status()?;
    let meta = &status.project.metadata;
    println!("Project {}", status.project.name.bold());
    match &status.current_tree {
        Some(tree) => println!("On tree {} ({})", tree.name.yellow().bold(), tree.id.dimmed()),
        None => println!("No tree selected"),
    }
    match &status.current_node {
        Some(node) => println!("At node {}  {}", node.id.yellow(), node.label()),
        None if status.current_tree.is_some() => println!("No node checked out"),
        None => {}
    }
    println!(
        "\n{} tree(s), {} node(s), {} favorite(s), {} bytes of images",
        meta.total_trees, meta.total_nodes, meta.favorite_count, status.blob_bytes
    );
    if let Some(avg) = meta.average_rating {
        println!("Average rating {avg:.1}/5");
    }
    if !status.recent_trees.is_empty() {
        println!("\nRecent trees:");
        for tree in &status.recent_trees {
            println!("  {}", tree_line(tree));
        }
    }
    Ok(())
}

fn cmd_tree(px: &Pixtree, out: &Output, args: TreeArgs) -> anyhow::Result<()> {
    let action = args.action.unwrap_or(TreeAction::List { all: false });
    match action {
        TreeAction::New {
            name,
            purpose,
            description,
            switch,
        } => {
            let tree = px.create_tree(&name, purpose.into(), description.as_deref())?;
            if switch {
                px.switch_tree(&tree.id)?;
            }
            println!("{} Created tree {} ({})", "✓".green().bold(), tree.name.bold(), tree.id.yellow());
        }
        TreeAction::List { all } => {
            let trees = px.list_trees(all)?;
            let current = px.context()?.current_tree().map(str::to_string);
            out.list(&trees, |t| {
                let marker = if current.as_deref() == Some(t.id.as_str()) { "*" } else { " " };
                format!("{} {}", marker.green().bold(), tree_line(t))
            })?;
        }
        TreeAction::Switch { tree } => {
            let tree = px.switch_tree(&tree)?;
            println!("Switched to tree {}", tree.name.yellow().bold());
        }
        TreeAction::Show { tree } => {
            let ctx = px.context()?;
            let id = match tree.as_deref().or(ctx.current_tree()) {
                Some(id) => id.to_string(),
                None => bail!("no tree selected; pass a tree id or run `pixtree tree switch`"),
            };
            let view = px.tree_view(&id)?;
            let current = ctx.current_node().filter(|_| ctx.current_tree() == Some(id.as_str()));
            println!("{} ({})", view.tree.name.bold(), view.tree.id.dimmed());
            if view.nodes.is_empty() {
                println!("{}", "(empty)".dimmed());
            } else {
                print!("{}", view.render(current));
            }
            if !view.forest.unplaced.is_empty() {
                println!(
                    "{} {} node(s) not reachable from a root; run `pixtree validate`",
                    "!".yellow().bold(),
                    view.forest.unplaced.len()
                );
            }
        }
        TreeAction::Rename { tree, name } => {
            let tree = px.rename_tree(&tree, &name)?;
            println!("{} Renamed to {}", "✓".green(), tree.name.bold());
        }
        TreeAction::Describe { tree, text } => {
            let tree = px.describe_tree(&tree, text.as_deref())?;
            println!("{} Updated {}", "✓".green(), tree.name.bold());
        }
        TreeAction::Tag { tree, add, remove } => {
            let tree = px.tag_tree(&tree, &add, &remove)?;
            let tags: Vec<_> = tree.tags.iter().cloned().collect();
            println!("{} {}: {}", "✓".green(), tree.name.bold(), tags.join(", "));
        }
        TreeAction::Favorite { tree, off } => {
            let tree = px.set_tree_favorite(&tree, !off)?;
            println!("{} {} favorite: {}", "✓".green(), tree.name.bold(), tree.favorite);
        }
        TreeAction::Archive { tree } => {
            let tree = px.archive_tree(&tree)?;
            println!("{} Archived {}", "✓".green(), tree.name.bold());
        }
        TreeAction::Unarchive { tree } => {
            let tree = px.unarchive_tree(&tree)?;
            println!("{} Unarchived {}", "✓".green(), tree.name.bold());
        }
        TreeAction::Delete { tree, cascade } => {
            let outcome = px.delete_tree(&tree, cascade)?;
            println!(
                "{} Deleted tree {} ({} node(s), {} image(s) removed)",
                "✓".green(),
                outcome.tree_id.yellow(),
                outcome.nodes_deleted,
                outcome.blobs_removed.len()
            );
        }
        TreeAction::DefaultImport { tree, clear } => {
            if clear || tree.is_some() {
                let project = px.set_default_import_tree(tree.as_deref())?;
                match project.settings.default_import_tree {
                    Some(id) => println!("{} Imports go to {}", "✓".green(), id.yellow()),
                    None => println!("{} Cleared default import tree", "✓".green()),
                }
            } else {
                match px.project()?.settings.default_import_tree {
                    Some(id) => println!("{}", id),
                    None => println!("{}", "(smart import)".dimmed()),
                }
            }
        }
    }
    Ok(())
}

fn cmd_generate(px: &Pixtree, args: GenerateArgs) -> anyhow::Result<()> {
    let mut backend = FileBackend::new(&args.image);
    if let (Some(width), Some(height)) = (args.width, args.height) {
        backend = backend.with_dimensions(Dimensions { width, height });
    }
    let parent = match (args.root, args.parent) {
        (true, _) => ParentChoice::Root,
        (false, Some(id)) => ParentChoice::Node(id),
        (false, None) => ParentChoice::Current,
    };
    let mut options = GenerateOptions::new(args.prompt).parent(parent);
    options.model = args.model;
    options.tree = args.tree;
    options.tags = args.tag.into_iter().collect();
    options.description = args.description;

    let node = px.generate(options, &backend)?;
    println!("{} Generated {}", "✓".green().bold(), node.id.yellow());
    match &node.parent_id {
        Some(parent) => println!("  Parent: {}", parent.yellow()),
        None => println!("  Parent: {}", "(root)".dimmed()),
    }
    if let Some(model) = node.model_name() {
        println!("  Model: {}", model.cyan());
    }
    Ok(())
}

fn cmd_import(px: &Pixtree, args: ImportArgs) -> anyhow::Result<()> {
    let options = ImportOptions {
        tree: args.tree,
        parent: args.parent,
        tags: args.tag.into_iter().collect(),
        description: args.description,
        analyze: None,
    };
    let node = px.import_image(&args.path, options)?;
    let tree = px.get_tree(&node.tree_id)?;
    println!("{} Imported {}", "✓".green().bold(), node.id.yellow());
    println!("  Tree: {} ({})", tree.name.bold(), tree.id.dimmed());
    Ok(())
}

fn cmd_checkout(px: &Pixtree, args: CheckoutArgs) -> anyhow::Result<()> {
    if args.switch {
        let node = px.get_node(&args.node)?;
        px.switch_tree(&node.tree_id)?;
    }
    let node = px.checkout(&args.node)?;
    println!("At node {}  {}", node.id.yellow().bold(), node.label());
    Ok(())
}

fn cmd_show(px: &Pixtree, out: &Output, id: &str) -> anyhow::Result<()> {
    let node = px.get_node(id)?;
    let path = px.image_path(&node);
    out.one(&node, |node| {
        let mut text = vec![node_line(node)];
        text.push(format!("  Tree:    {}", node.tree_id));
        text.push(format!(
            "  Parent:  {}",
            node.parent_id.as_deref().unwrap_or("(root)")
        ));
        if let Some(prompt) = node.prompt() {
            text.push(format!("  Prompt:  {prompt}"));
        }
        if let Some(import) = &node.import {
            text.push(format!("  Source:  {}", import.original_path));
        }
        if let Some(description) = &node.description {
            text.push(format!("  About:   {description}"));
        }
        if !node.tags.is_empty() {
            text.push(format!("  Tags:    {}", join_tags(node)));
        }
        let mut file = format!("  File:    {} ({} bytes, {})", path.display(), node.file.size, node.file.format);
        if let Some(dims) = node.file.dimensions {
            file.push_str(&format!(", {dims}"));
        }
        text.push(file);
        text.push(format!(
            "  Created: {}",
            node.created_at.format("%Y-%m-%d %H:%M:%S")
        ));
        text.join("\n")
    })
}

fn cmd_lineage(px: &Pixtree, out: &Output, id: &str) -> anyhow::Result<()> {
    let lineage = px.lineage(id)?;
    if out.format == OutputFormat::Json {
        let value = serde_json::json!({
            "node": lineage.node,
            "path_from_root": lineage.path_from_root,
            "children": lineage.children,
            "siblings": lineage.siblings,
            "descendant_count": lineage.descendant_count,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    println!("{} (depth {})", lineage.node.id.yellow().bold(), lineage.depth());
    for (depth, node) in lineage.path_from_root.iter().enumerate() {
        println!("{}{}", "  ".repeat(depth), node_line(node));
    }
    println!("\nSiblings: {}", lineage.siblings.len());
    for node in &lineage.siblings {
        println!("  {}", node_line(node));
    }
    println!("Children: {}", lineage.children.len());
    for node in &lineage.children {
        println!("  {}", node_line(node));
    }
    println!("Descendants: {}", lineage.descendant_count);
    Ok(())
}

fn parse_when(value: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date {value:?}; use YYYY-MM-DD or RFC 3339"))?;
    day.and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .ok_or_else(|| anyhow!("invalid date {value:?}"))
}

fn cmd_search(px: &Pixtree, out: &Output, args: SearchArgs) -> anyhow::Result<()> {
    let mut filter = SearchFilter::new();
    for tag in args.tag {
        filter = filter.tag(tag);
    }
    if let Some(text) = args.text {
        filter = filter.text(text);
    }
    if let Some(r) = args.min_rating {
        filter = filter.min_rating(Rating::new(r)?);
    }
    if let Some(model) = args.model {
        filter = filter.model(model);
    }
    if let Some(tree) = args.tree {
        filter = filter.in_tree(tree);
    }
    if args.favorite {
        filter = filter.favorite(true);
    }
    if let Some(after) = args.after {
        filter = filter.created_after(parse_when(&after)?);
    }
    if let Some(before) = args.before {
        filter = filter.created_before(parse_when(&before)?);
    }
    if args.leaf {
        filter = filter.is_leaf(true);
    }
    if args.branching {
        filter = filter.has_children(true);
    }

    let found = px.search(&filter)?;
    let mut hits: Vec<&ImageNode> = found.iter().collect();
    sort_results(&mut hits, args.sort);
    let total = hits.len();
    let hits = limit(hits, args.limit);
    out.list(&hits, |n| node_line(n))?;
    if out.format == OutputFormat::Text && total > hits.len() {
        println!("{}", format!("... {} more", total - hits.len()).dimmed());
    }
    Ok(())
}

fn cmd_diff(px: &Pixtree, args: DiffArgs) -> anyhow::Result<()> {
    let diff = px.diff_nodes(&args.from, &args.to)?;
    println!("{} → {}", diff.from.yellow(), diff.to.yellow());
    if diff.is_empty() {
        println!("{}", "No differences.".dimmed());
        return Ok(());
    }
    if diff.is_parent_of {
        println!("  {}", "(direct parent)".dimmed());
    }
    if diff.model_changed() {
        println!(
            "  Model: {} → {}",
            diff.from_model.as_deref().unwrap_or("-").red(),
            diff.to_model.as_deref().unwrap_or("-").green()
        );
    }
    if !diff.prompt.is_empty() {
        println!("  Prompt: {}", diff.prompt.render_inline());
    }
    for change in &diff.params.changes {
        match change {
            ParamChange::Added { key, value } => println!("  {} {key} = {value}", "+".green()),
            ParamChange::Removed { key, value } => println!("  {} {key} = {value}", "-".red()),
            ParamChange::Modified { key, old, new } => {
                println!("  {} {key}: {} → {}", "~".yellow(), old.to_string().red(), new.to_string().green())
            }
        }
    }
    if !diff.tags_added.is_empty() {
        println!("  Tags added: {}", diff.tags_added.join(", ").green());
    }
    if !diff.tags_removed.is_empty() {
        println!("  Tags removed: {}", diff.tags_removed.join(", ").red());
    }
    if diff.same_image {
        println!("  {}", "Identical image bytes".dimmed());
    }
    Ok(())
}

fn cmd_validate(px: &Pixtree, args: ValidateArgs) -> anyhow::Result<()> {
    let reports = match args.tree {
        Some(tree) => vec![px.validate_tree(&tree)?],
        None => px.validate_all()?,
    };
    let mut problems = 0;
    for report in &reports {
        if report.is_valid() {
            println!("{} {} ({} node(s))", "✓".green(), report.tree_id, report.node_count);
            continue;
        }
        problems += report.issues.len();
        println!("{} {}", "✗".red().bold(), report.tree_id);
        for issue in &report.issues {
            let hint = match issue.kind {
                IssueKind::MetadataDrift => " (fix with `pixtree repair`)",
                _ => "",
            };
            println!("  {}{}", issue, hint.dimmed());
        }
    }
    if problems > 0 {
        bail!("{problems} integrity issue(s) found");
    }
    Ok(())
}

fn cmd_config(px: &Pixtree, args: ConfigArgs) -> anyhow::Result<()> {
    let project = px.project()?;
    match (args.key.as_deref(), args.value) {
        (None, _) => {
            let config = px.config();
            println!("name = {}", project.name);
            println!(
                "default-model = {}",
                project.settings.default_model.as_deref().unwrap_or(&config.default_model)
            );
            println!("recent_trees_limit = {}", config.recent_trees_limit);
            println!("analyze_on_import = {}", config.analyze_on_import);
            println!("top_tags_limit = {}", config.top_tags_limit);
            println!("smart_import_window_secs = {}", config.smart_import_window_secs);
        }
        (Some("name"), None) => println!("{}", project.name),
        (Some("name"), Some(value)) => {
            let project = px.rename_project(&value)?;
            println!("Set {} = {}", "name".bold(), project.name);
        }
        (Some("default-model"), None) => {
            println!("{}", project.settings.default_model.unwrap_or_default())
        }
        (Some("default-model"), Some(value)) => {
            px.set_default_model(&value)?;
            println!("Set {} = {}", "default-model".bold(), value);
        }
        (Some(key), _) => bail!("unknown key {key:?}; expected `name` or `default-model`"),
    }
    Ok(())
}
