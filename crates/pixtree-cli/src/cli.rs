use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pixtree_query::SortOrder;
use pixtree_types::TreePurpose;

#[derive(Parser)]
#[command(
    name = "pixtree",
    about = "pixtree: version control for AI-generated images",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run as if started in this directory
    #[arg(short = 'C', long = "dir", global = true)]
    pub dir: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a working copy in the current directory
    Init(InitArgs),
    /// Show the current tree, node, and project totals
    Status(StatusArgs),
    /// Manage trees
    Tree(TreeArgs),
    /// Record a generated image as a new node
    Generate(GenerateArgs),
    /// Import an existing image file
    Import(ImportArgs),
    /// Make a node the current node
    Checkout(CheckoutArgs),
    /// Show one node
    Show(NodeArgs),
    /// Add tags to a node
    Tag(TagArgs),
    /// Remove tags from a node
    Untag(TagArgs),
    /// Rate a node from 1 to 5
    Rate(RateArgs),
    /// Mark or unmark a node as favorite
    Favorite(FavoriteArgs),
    /// Set or clear a node's description
    Describe(DescribeArgs),
    /// Move a node under another parent
    Reparent(ReparentArgs),
    /// Delete a node
    Delete(DeleteArgs),
    /// Show a node's ancestors, siblings, and children
    Lineage(NodeArgs),
    /// Search nodes across all trees
    Search(SearchArgs),
    /// Compare two nodes
    Diff(DiffArgs),
    /// Check tree integrity
    Validate(ValidateArgs),
    /// Recompute cached tree metadata
    Repair(RepairArgs),
    /// Copy a node's image out of the working copy
    Export(ExportArgs),
    /// Show where a node has been exported
    History(NodeArgs),
    /// Get or set project settings
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Project name; defaults to the directory name
    pub name: Option<String>,
}

#[derive(Args)]
pub struct StatusArgs {}

// ---- trees ----

#[derive(Args)]
pub struct TreeArgs {
    #[command(subcommand)]
    pub action: Option<TreeAction>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum PurposeArg {
    Exploration,
    Refinement,
    Variation,
    Import,
    Other,
}

impl From<PurposeArg> for TreePurpose {
    fn from(arg: PurposeArg) -> Self {
        match arg {
            PurposeArg::Exploration => TreePurpose::Exploration,
            PurposeArg::Refinement => TreePurpose::Refinement,
            PurposeArg::Variation => TreePurpose::Variation,
            PurposeArg::Import => TreePurpose::Import,
            PurposeArg::Other => TreePurpose::Other,
        }
    }
}

#[derive(Subcommand)]
pub enum TreeAction {
    /// Create a tree
    New {
        name: String,
        #[arg(short, long, default_value = "exploration")]
        purpose: PurposeArg,
        #[arg(short, long)]
        description: Option<String>,
        /// Switch to the new tree
        #[arg(short, long)]
        switch: bool,
    },
    /// List trees, most recently used first
    List {
        #[arg(short, long)]
        all: bool,
    },
    /// Make a tree current
    Switch { tree: String },
    /// Draw a tree's derivation hierarchy
    Show { tree: Option<String> },
    Rename { tree: String, name: String },
    Describe { tree: String, text: Option<String> },
    Tag {
        tree: String,
        #[arg(long)]
        add: Vec<String>,
        #[arg(long)]
        remove: Vec<String>,
    },
    Favorite {
        tree: String,
        #[arg(long)]
        off: bool,
    },
    Archive { tree: String },
    Unarchive { tree: String },
    /// Delete a tree; `--cascade` also deletes its nodes
    Delete {
        tree: String,
        #[arg(long)]
        cascade: bool,
    },
    /// Set or clear the tree that receives imports by default
    DefaultImport {
        tree: Option<String>,
        #[arg(long, conflicts_with = "tree")]
        clear: bool,
    },
}

// ---- nodes ----

#[derive(Args)]
pub struct GenerateArgs {
    pub prompt: String,
    /// Image file produced by the model
    #[arg(short, long)]
    pub image: PathBuf,
    #[arg(short, long)]
    pub model: Option<String>,
    #[arg(long)]
    pub tree: Option<String>,
    #[arg(short, long, conflicts_with = "root")]
    pub parent: Option<String>,
    /// Start a new root instead of deriving from the current node
    #[arg(long)]
    pub root: bool,
    #[arg(short, long)]
    pub tag: Vec<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(long, requires = "height")]
    pub width: Option<u32>,
    #[arg(long, requires = "width")]
    pub height: Option<u32>,
}

#[derive(Args)]
pub struct ImportArgs {
    pub path: PathBuf,
    #[arg(long)]
    pub tree: Option<String>,
    #[arg(short, long)]
    pub parent: Option<String>,
    #[arg(short, long)]
    pub tag: Vec<String>,
    #[arg(short, long)]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct CheckoutArgs {
    pub node: String,
    /// Also switch to the node's tree
    #[arg(short, long)]
    pub switch: bool,
}

#[derive(Args)]
pub struct NodeArgs {
    pub node: String,
}

#[derive(Args)]
pub struct TagArgs {
    pub node: String,
    #[arg(required = true)]
    pub tags: Vec<String>,
}

#[derive(Args)]
pub struct RateArgs {
    pub node: String,
    #[arg(required_unless_present = "clear")]
    pub rating: Option<u8>,
    #[arg(long, conflicts_with = "rating")]
    pub clear: bool,
}

#[derive(Args)]
pub struct FavoriteArgs {
    pub node: String,
    #[arg(long)]
    pub off: bool,
}

#[derive(Args)]
pub struct DescribeArgs {
    pub node: String,
    /// New description; omit to clear
    pub text: Option<String>,
}

#[derive(Args)]
pub struct ReparentArgs {
    pub node: String,
    #[arg(required_unless_present = "root")]
    pub parent: Option<String>,
    #[arg(long, conflicts_with = "parent")]
    pub root: bool,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub node: String,
    /// Move children to the deleted node's parent
    #[arg(long)]
    pub reparent: bool,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Words to find in prompts, descriptions, and filenames
    pub text: Option<String>,
    #[arg(short, long)]
    pub tag: Vec<String>,
    #[arg(long)]
    pub min_rating: Option<u8>,
    #[arg(short, long)]
    pub model: Option<String>,
    #[arg(long)]
    pub tree: Option<String>,
    #[arg(long)]
    pub favorite: bool,
    /// Only nodes created on or after this date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub after: Option<String>,
    #[arg(long)]
    pub before: Option<String>,
    #[arg(long, conflicts_with = "branching")]
    pub leaf: bool,
    #[arg(long)]
    pub branching: bool,
    #[arg(short, long, default_value = "newest")]
    pub sort: SortOrder,
    #[arg(short = 'n', long, default_value = "50")]
    pub limit: usize,
}

#[derive(Args)]
pub struct DiffArgs {
    pub from: String,
    pub to: String,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Validate one tree instead of all
    pub tree: Option<String>,
}

#[derive(Args)]
pub struct RepairArgs {
    pub tree: String,
}

#[derive(Args)]
pub struct ExportArgs {
    pub node: String,
    #[arg(default_value = ".")]
    pub dest: PathBuf,
    /// File name without extension; defaults to the node id
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// `name` or `default-model`; omit to show everything
    pub key: Option<String>,
    pub value: Option<String>,
}
