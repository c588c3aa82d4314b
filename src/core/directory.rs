//! Directory/index builder.
//!
//! Walks the table of contents, mirrors it as directories under the output
//! root, runs the verse pipeline for each book and writes the navigable
//! index at every level:
//!
//! ```text
//! <output>/
//! ├── index.json / index.proto      # root categories
//! ├── toc.json / toc.proto          # raw table of contents
//! ├── run.json                      # run summary
//! ├── unresolved_refs.jsonl         # audit log
//! └── Tanakh/
//!     ├── index.json / index.proto
//!     └── Torah/Genesis/
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use super::blacklist::Blacklist;
use super::pipeline::VersePipeline;
use super::schema::load_schema;
use super::shape::resolve_shape;
use crate::adapters::{fetch_json, Fetcher};
use crate::domain::{ContentNode, DirectoryNode, RunReport};
use crate::error::IngestError;

pub const INDEX_JSON: &str = "index.json";
pub const INDEX_PROTO: &str = "index.proto";
pub const TOC_JSON: &str = "toc.json";
pub const TOC_PROTO: &str = "toc.proto";
pub const RUN_REPORT: &str = "run.json";

const ROOT_FALLBACK: &str = "Uncategorized";
const NESTED_FALLBACK: &str = "Untitled";

/// A table-of-contents entry kept after blacklist filtering and pruning
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedNode {
    /// Display name; the API title for books
    pub name: String,
    pub hebrew_name: Option<String>,
    pub children: Vec<PlannedNode>,
    pub is_book: bool,
}

impl PlannedNode {
    /// Number of books below (or at) this node
    pub fn book_count(&self) -> usize {
        if self.is_book {
            1
        } else {
            self.children.iter().map(PlannedNode::book_count).sum()
        }
    }
}

/// Directory name for a node: `/` is not allowed inside one
pub fn sanitize_name(name: &str) -> String {
    name.trim().replace('/', "-")
}

fn join_index_path(parent: &str, name: &str) -> String {
    let name = sanitize_name(name);
    if parent.is_empty() {
        name
    } else {
        format!("{}/{}", parent, name)
    }
}

fn plan_node(node: &ContentNode, blacklist: &Blacklist, root: bool) -> Option<PlannedNode> {
    let name = node.display_name(if root { ROOT_FALLBACK } else { NESTED_FALLBACK });

    if blacklist.contains(&name) {
        info!(name = %name, "Skipping blacklisted entry");
        return None;
    }

    if node.is_leaf() {
        // Root entries are categories; an empty one has nothing to index
        if root {
            debug!(name = %name, "Skipping empty root category");
            return None;
        }
        return Some(PlannedNode {
            name,
            hebrew_name: node.hebrew_name(),
            children: Vec::new(),
            is_book: true,
        });
    }

    let children: Vec<PlannedNode> = node
        .contents
        .iter()
        .flatten()
        .filter_map(|child| plan_node(child, blacklist, false))
        .collect();

    if children.is_empty() {
        debug!(name = %name, "Pruning category with no remaining entries");
        return None;
    }

    Some(PlannedNode {
        name,
        hebrew_name: node.hebrew_name(),
        children,
        is_book: false,
    })
}

/// Filter and name the table of contents.
///
/// `categories` restricts the roots to the named categories when non-empty.
pub fn plan_toc(toc: &[ContentNode], blacklist: &Blacklist, categories: &[String]) -> Vec<PlannedNode> {
    toc.iter()
        .filter_map(|node| plan_node(node, blacklist, true))
        .filter(|node| {
            categories.is_empty()
                || categories
                    .iter()
                    .any(|category| category.trim().eq_ignore_ascii_case(&node.name))
        })
        .collect()
}

/// Fetch the table of contents
pub async fn fetch_toc(fetcher: &dyn Fetcher) -> Result<Vec<ContentNode>, IngestError> {
    let payload = fetch_json(fetcher, "/index/").await?;
    serde_json::from_value(payload).map_err(|e| IngestError::parse("table of contents", e))
}

/// Write `value` as pretty JSON and bincode side by side
async fn write_pair<T: Serialize + ?Sized>(
    dir: &Path,
    json_name: &str,
    proto_name: &str,
    value: &T,
) -> Result<(), IngestError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(dir.join(json_name), json).await?;

    let binary = bincode::serialize(value)
        .map_err(|e| IngestError::parse(format!("encoding {}", proto_name), e))?;
    fs::write(dir.join(proto_name), binary).await?;
    Ok(())
}

/// Write `index.json` and `index.proto` for one level
pub async fn write_index(dir: &Path, nodes: &[DirectoryNode]) -> Result<(), IngestError> {
    write_pair(dir, INDEX_JSON, INDEX_PROTO, nodes).await?;
    debug!(dir = %dir.display(), entries = nodes.len(), "Wrote index");
    Ok(())
}

/// Read back an `index.json`
pub async fn read_index(dir: &Path) -> Result<Vec<DirectoryNode>, IngestError> {
    let json = fs::read_to_string(dir.join(INDEX_JSON)).await?;
    Ok(serde_json::from_str(&json)?)
}

/// Read back an `index.proto`
pub async fn read_index_proto(dir: &Path) -> Result<Vec<DirectoryNode>, IngestError> {
    let bytes = fs::read(dir.join(INDEX_PROTO)).await?;
    bincode::deserialize(&bytes).map_err(|e| IngestError::parse(INDEX_PROTO, e))
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryOptions {
    /// Run the verse pipeline for every book
    pub create_books: bool,
    /// Root categories to keep (all when empty)
    pub categories: Vec<String>,
}

/// Result of a directory build
#[derive(Debug, Clone)]
pub struct DirectoryOutcome {
    pub roots: Vec<DirectoryNode>,
    pub report: RunReport,
}

/// Builds the output tree for a table of contents
pub struct DirectoryBuilder {
    pipeline: VersePipeline,
    output: PathBuf,
    options: DirectoryOptions,
}

impl DirectoryBuilder {
    pub fn new(pipeline: VersePipeline, output: impl Into<PathBuf>, options: DirectoryOptions) -> Self {
        Self {
            pipeline,
            output: output.into(),
            options,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    fn fetcher(&self) -> &dyn Fetcher {
        self.pipeline.context().fetcher.as_ref()
    }

    /// Fetch the table of contents and build everything
    pub async fn run(&self) -> Result<DirectoryOutcome, IngestError> {
        let toc = fetch_toc(self.fetcher()).await?;
        info!(roots = toc.len(), "Fetched table of contents");
        self.build(&toc).await
    }

    /// Fetch and save the table of contents without building
    pub async fn save_toc(&self) -> Result<Vec<ContentNode>, IngestError> {
        let toc = fetch_toc(self.fetcher()).await?;
        fs::create_dir_all(&self.output).await?;
        write_pair(&self.output, TOC_JSON, TOC_PROTO, &toc).await?;
        Ok(toc)
    }

    /// Build the output tree for `toc`
    #[instrument(skip(self, toc), fields(output = %self.output.display()))]
    pub async fn build(&self, toc: &[ContentNode]) -> Result<DirectoryOutcome, IngestError> {
        let mut report = RunReport::new();
        info!(run_id = %report.id, create_books = self.options.create_books, "Building directory tree");

        fs::create_dir_all(&self.output).await?;
        write_pair(&self.output, TOC_JSON, TOC_PROTO, toc).await?;

        let plan = plan_toc(toc, &self.pipeline.context().blacklist, &self.options.categories);
        info!(
            categories = plan.len(),
            books = plan.iter().map(PlannedNode::book_count).sum::<usize>(),
            "Planned tree"
        );

        let mut roots = Vec::with_capacity(plan.len());
        for node in &plan {
            let dir = self.output.join(sanitize_name(&node.name));
            let index_path = join_index_path("", &node.name);
            if let Some(built) = self.populate(node, dir, index_path, &mut report).await? {
                roots.push(built);
            }
        }

        write_index(&self.output, &roots).await?;

        report.complete();
        let summary = serde_json::to_string_pretty(&report)?;
        fs::write(self.output.join(RUN_REPORT), summary).await?;

        info!(
            books = report.books_processed,
            failed = report.books_failed,
            verses = report.verses_written,
            skipped = report.verses_skipped,
            unresolved = report.unresolved_refs,
            "Directory tree complete"
        );

        Ok(DirectoryOutcome { roots, report })
    }

    async fn populate(
        &self,
        node: &PlannedNode,
        dir: PathBuf,
        index_path: String,
        report: &mut RunReport,
    ) -> Result<Option<DirectoryNode>, IngestError> {
        fs::create_dir_all(&dir).await?;

        if node.is_book {
            return self.populate_book(node, &dir, index_path, report).await.map(Some);
        }

        let mut children = Vec::with_capacity(node.children.len());
        for child in &node.children {
            let child_dir = dir.join(sanitize_name(&child.name));
            let child_path = join_index_path(&index_path, &child.name);
            if let Some(built) = Box::pin(self.populate(child, child_dir, child_path, report)).await? {
                children.push(built);
            }
        }

        if children.is_empty() {
            return Ok(None);
        }

        write_index(&dir, &children).await?;

        Ok(Some(DirectoryNode {
            english_name: node.name.clone(),
            hebrew_name: node.hebrew_name.clone(),
            index_path,
            children,
            is_leaf: false,
        }))
    }

    /// Resolve a book, run its pipeline, and expand complex books
    #[instrument(skip(self, node, dir, report), fields(book = %node.name))]
    async fn populate_book(
        &self,
        node: &PlannedNode,
        dir: &Path,
        index_path: String,
        report: &mut RunReport,
    ) -> Result<DirectoryNode, IngestError> {
        let leaf = DirectoryNode::leaf(node.name.clone(), node.hebrew_name.clone(), index_path.clone());

        let shape = match resolve_shape(self.fetcher(), &node.name).await {
            Ok(shape) => shape,
            Err(e) => {
                warn!(error = %e, "Shape unavailable");
                if self.options.create_books {
                    report.record_failure(node.name.clone());
                }
                return Ok(leaf);
            }
        };

        if self.options.create_books {
            let schema = load_schema(self.fetcher(), &node.name).await;
            let run = self.pipeline.ingest_shape(&shape, &schema).await?;
            for book in &run.reports {
                report.record_book(book);
            }
            for title in run.failed {
                report.record_failure(title);
            }
        }

        if !shape.complex {
            return Ok(leaf);
        }

        let mut children = Vec::with_capacity(shape.items.len());
        for item in &shape.items {
            let child_path = join_index_path(&index_path, &item.title);
            fs::create_dir_all(dir.join(sanitize_name(&item.title))).await?;
            let hebrew = Some(item.he_title.clone()).filter(|he| !he.is_empty());
            children.push(DirectoryNode::leaf(item.title.clone(), hebrew, child_path));
        }

        info!(parts = children.len(), "Expanded complex book");
        write_index(dir, &children).await?;

        Ok(DirectoryNode {
            children,
            is_leaf: false,
            ..leaf
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toc() -> Vec<ContentNode> {
        vec![
            ContentNode::category(
                "Tanakh",
                vec![
                    ContentNode::category(
                        "Torah",
                        vec![
                            ContentNode::book("Genesis").with_he_title("בראשית"),
                            ContentNode::book("Book of Tobit"),
                        ],
                    ),
                    ContentNode::category("Apocrypha", vec![ContentNode::book("Book of Tobit")]),
                ],
            ),
            ContentNode::category("Empty", Vec::new()),
            ContentNode {
                contents: Some(vec![ContentNode::book("Orphan")]),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_plan_skips_blacklisted_and_prunes_empty() {
        let blacklist = Blacklist::from_entries(["Book of Tobit"]);
        let plan = plan_toc(&toc(), &blacklist, &[]);

        let names: Vec<&str> = plan.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Tanakh", "Uncategorized"]);

        let tanakh = &plan[0];
        assert_eq!(tanakh.children.len(), 1);
        assert_eq!(tanakh.children[0].name, "Torah");
        assert_eq!(tanakh.children[0].children.len(), 1);
        assert_eq!(tanakh.book_count(), 1);

        let genesis = &tanakh.children[0].children[0];
        assert!(genesis.is_book);
        assert_eq!(genesis.hebrew_name.as_deref(), Some("בראשית"));
    }

    #[test]
    fn test_blacklisted_category_excludes_subtree() {
        let blacklist = Blacklist::from_entries(["torah"]);
        let plan = plan_toc(&toc(), &blacklist, &[]);
        let tanakh = &plan[0];
        assert_eq!(tanakh.children.len(), 1);
        assert_eq!(tanakh.children[0].name, "Apocrypha");
    }

    #[test]
    fn test_category_filter() {
        let plan = plan_toc(&toc(), &Blacklist::empty(), &["tanakh".to_string()]);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].name, "Tanakh");
    }

    #[test]
    fn test_sanitize_and_index_paths() {
        assert_eq!(sanitize_name(" Tosafot / Rid "), "Tosafot - Rid");
        assert_eq!(join_index_path("", "Tanakh"), "Tanakh");
        assert_eq!(join_index_path("Tanakh/Torah", "A/B"), "Tanakh/Torah/A-B");
    }

    #[tokio::test]
    async fn test_index_files_roundtrip() {
        let temp = tempfile::TempDir::new().unwrap();
        let nodes = vec![DirectoryNode::leaf("Genesis", None, "Tanakh/Torah/Genesis")];

        write_index(temp.path(), &nodes).await.unwrap();

        assert_eq!(read_index(temp.path()).await.unwrap(), nodes);
        assert_eq!(read_index_proto(temp.path()).await.unwrap(), nodes);
    }
}
