//! Verse pipeline: fetch, aggregate and persist every verse of a book.
//!
//! Each verse is one task in a `JoinSet`. Tasks take a semaphore permit
//! before their first request, so at most `concurrency` verses are in
//! flight at once. Tasks return their commentator names instead of writing
//! to shared state; chapter sets are built after the join, which is also
//! the only point where the book index is computed and stored.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn, Instrument, Span};

use super::audit::{AuditEntry, AuditLog};
use super::blacklist::Blacklist;
use super::commentary::{aggregate, flatten_text, parse_links, CommentatorCache, UnresolvedRef};
use super::daf;
use super::schema::{load_schema, translate_sections};
use super::shape::{resolve_shape, BookShape};
use crate::adapters::{encode_title, fetch_json, Fetcher};
use crate::domain::{BookIndex, BookReport, BookSchema, ChapterIndex, ShapeItem, Verse};
use crate::error::IngestError;
use crate::store::Store;

/// Default number of verses processed concurrently
pub const DEFAULT_CONCURRENCY: usize = 32;

/// Completed verses between two progress lines
const PROGRESS_EVERY: u64 = 100;

/// Everything a run shares across books and verse tasks
#[derive(Clone)]
pub struct IngestContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub store: Store,
    pub blacklist: Arc<Blacklist>,
    pub commentators: CommentatorCache,
    pub audit: Option<AuditLog>,
    concurrency: usize,
}

impl IngestContext {
    /// Context with the built-in blacklist, a fresh cache and no audit log
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Store) -> Self {
        Self {
            fetcher,
            store,
            blacklist: Arc::new(Blacklist::with_defaults(Vec::<String>::new())),
            commentators: CommentatorCache::new(),
            audit: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_blacklist(mut self, blacklist: Blacklist) -> Self {
        self.blacklist = Arc::new(blacklist);
        self
    }

    pub fn with_commentator_cache(mut self, cache: CommentatorCache) -> Self {
        self.commentators = cache;
        self
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Set the verse concurrency (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}

/// One verse to fetch and store
struct VerseJob {
    book: String,
    chapter_index: usize,
    /// 1-based chapter number used as the store key
    chapter: u32,
    /// Verse number including the chapter offset
    number: u32,
    /// Text already known (whole-book mode)
    text: Option<String>,
    text_path: String,
    links_path: String,
}

/// What a finished verse task hands back to the reduction
struct VerseOutcome {
    chapter_index: usize,
    commentators: Vec<String>,
    unresolved: Vec<UnresolvedRef>,
}

/// Compute the book index once every verse task has joined
pub fn build_book_index(
    item: &ShapeItem,
    schema: &BookSchema,
    commentators: &BTreeMap<usize, BTreeSet<String>>,
) -> BookIndex {
    let chapters = item
        .chapters
        .iter()
        .enumerate()
        .map(|(index, &count)| ChapterIndex {
            chapter_number: index as u32 + 1,
            offset: if schema.offsetting { item.offset(index) } else { 0 },
            number_of_verses: count,
            commentators: commentators.get(&index).cloned().unwrap_or_default(),
        })
        .collect();

    let he_title = if item.he_title.is_empty() {
        item.he_book.clone()
    } else {
        item.he_title.clone()
    };

    BookIndex {
        book_type: schema.book_type(),
        title: item.title.clone(),
        he_title,
        number_of_chapters: item.chapters.len() as u32,
        chapters,
        section_names: translate_sections(&schema.section_names),
    }
}

/// Text of the first version in a `/v3/texts` payload
fn first_version_text(payload: &Value, context: &str) -> Result<Value, IngestError> {
    let versions = payload
        .get("versions")
        .and_then(Value::as_array)
        .ok_or_else(|| IngestError::parse(context.to_string(), "missing 'versions' array"))?;

    Ok(versions
        .first()
        .and_then(|version| version.get("text"))
        .cloned()
        .unwrap_or(Value::Null))
}

async fn fetch_verse_text(fetcher: &dyn Fetcher, path: &str) -> Result<String, IngestError> {
    let payload = fetch_json(fetcher, path).await?;
    Ok(flatten_text(&first_version_text(&payload, path)?))
}

async fn run_verse(ctx: IngestContext, job: VerseJob) -> Result<VerseOutcome, IngestError> {
    let fetcher = ctx.fetcher.as_ref();

    let text = match job.text {
        Some(text) => text,
        None => fetch_verse_text(fetcher, &job.text_path).await?,
    };

    let aggregated = match fetch_json(fetcher, &job.links_path).await {
        Ok(payload) => match parse_links(&payload) {
            Ok(records) => aggregate(&records, &ctx.blacklist),
            Err(e) => {
                debug!(path = %job.links_path, error = %e, "Ignoring links");
                Default::default()
            }
        },
        Err(e) => {
            debug!(path = %job.links_path, error = %e, "No links");
            Default::default()
        }
    };

    let commentators = aggregated.commentator_names().map(str::to_string).collect();
    let mut entries = aggregated.entries;
    ctx.commentators.fill_paths(fetcher, &mut entries).await;

    let verse = Verse::new(job.number, text, entries);
    ctx.store
        .insert_verse(&job.book, job.chapter, job.number, &verse)?;
    debug!(chapter = job.chapter, verse = job.number, "Stored verse");

    Ok(VerseOutcome {
        chapter_index: job.chapter_index,
        commentators,
        unresolved: aggregated.unresolved,
    })
}

/// Outcome of ingesting every part of one book
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookRun {
    pub reports: Vec<BookReport>,
    /// Titles of parts that failed
    pub failed: Vec<String>,
}

/// Runs the verse pipeline over resolved book shapes
pub struct VersePipeline {
    ctx: IngestContext,
}

impl VersePipeline {
    pub fn new(ctx: IngestContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &IngestContext {
        &self.ctx
    }

    /// Resolve a book's shape and schema, then ingest every part of it
    #[instrument(skip(self))]
    pub async fn ingest_book(&self, title: &str) -> Result<BookRun, IngestError> {
        let shape = resolve_shape(self.ctx.fetcher.as_ref(), title).await?;
        let schema = load_schema(self.ctx.fetcher.as_ref(), title).await;
        self.ingest_shape(&shape, &schema).await
    }

    /// Ingest the parts of an already resolved book.
    ///
    /// A failing part is logged and skipped unless the failure is fatal.
    pub async fn ingest_shape(
        &self,
        shape: &BookShape,
        schema: &BookSchema,
    ) -> Result<BookRun, IngestError> {
        let mut run = BookRun::default();

        for item in &shape.items {
            match self.process_item(item, schema).await {
                Ok(report) => run.reports.push(report),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(book = %item.title, error = %e, "Skipping book part");
                    run.failed.push(item.title.clone());
                }
            }
        }

        Ok(run)
    }

    /// Whole-book text as one entry per verse
    async fn fetch_whole_book(&self, item: &ShapeItem) -> Result<Vec<String>, IngestError> {
        let path = format!("/v3/texts/{}", encode_title(&item.title));
        let payload = fetch_json(self.ctx.fetcher.as_ref(), &path).await?;

        Ok(match first_version_text(&payload, &path)? {
            Value::Array(verses) => verses.iter().map(flatten_text).collect(),
            Value::String(text) => vec![text],
            _ => Vec::new(),
        })
    }

    /// Enumerate the verse jobs of one book
    async fn plan_jobs(&self, item: &ShapeItem, schema: &BookSchema) -> Vec<VerseJob> {
        let title = encode_title(&item.title);
        let mut jobs = Vec::new();

        if item.is_whole_book() {
            let verses = match self.fetch_whole_book(item).await {
                Ok(verses) => verses,
                Err(e) => {
                    warn!(error = %e, "Whole-book text unavailable");
                    Vec::new()
                }
            };

            for (index, text) in verses.into_iter().enumerate() {
                let number = index as u32 + 1;
                jobs.push(VerseJob {
                    book: item.title.clone(),
                    chapter_index: 0,
                    chapter: 1,
                    number,
                    text: Some(text),
                    text_path: String::new(),
                    links_path: format!("/links/{}.{}", title, number),
                });
            }
            return jobs;
        }

        let talmud = schema.is_talmud();
        for (index, &count) in item.chapters.iter().enumerate() {
            let label = daf::chapter_label(index as u32, talmud);
            let offset = if schema.offsetting { item.offset(index) } else { 0 };
            info!(chapter = %label, verses = count, offset, "Processing chapter");

            for verse in 1..=count {
                let number = verse + offset;
                jobs.push(VerseJob {
                    book: item.title.clone(),
                    chapter_index: index,
                    chapter: index as u32 + 1,
                    number,
                    text: None,
                    text_path: format!("/v3/texts/{}%20{}.{}", title, label, number),
                    links_path: format!("/links/{}.{}.{}", title, label, number),
                });
            }
        }

        jobs
    }

    /// Ingest one simple book (or sub-book) and store its index
    #[instrument(skip(self, item, schema), fields(book = %item.title))]
    pub async fn process_item(
        &self,
        item: &ShapeItem,
        schema: &BookSchema,
    ) -> Result<BookReport, IngestError> {
        info!(
            chapters = item.chapters.len(),
            verses = item.total_verses(),
            talmud = schema.is_talmud(),
            offsetting = schema.offsetting,
            "Processing book"
        );

        let jobs = self.plan_jobs(item, schema).await;
        let total = jobs.len() as u64;
        let mut report = BookReport {
            title: item.title.clone(),
            verses_skipped: item.total_verses().saturating_sub(total),
            ..Default::default()
        };

        let semaphore = Arc::new(Semaphore::new(self.ctx.concurrency));
        let mut tasks = JoinSet::new();

        for job in jobs {
            let ctx = self.ctx.clone();
            let semaphore = Arc::clone(&semaphore);
            let (chapter, number) = (job.chapter, job.number);

            tasks.spawn(
                async move {
                    let result = match semaphore.acquire_owned().await {
                        Ok(_permit) => run_verse(ctx, job).await,
                        Err(e) => Err(IngestError::parse("semaphore", e)),
                    };
                    (chapter, number, result)
                }
                .instrument(Span::current()),
            );
        }

        // Join barrier: nothing below runs before every verse task is done
        let mut commentators: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
        let mut unresolved: Vec<(u32, u32, UnresolvedRef)> = Vec::new();
        let mut done = 0u64;

        while let Some(joined) = tasks.join_next().await {
            done += 1;
            if done % PROGRESS_EVERY == 0 {
                info!(done, total, "Progress");
            }

            match joined {
                Ok((chapter, number, Ok(outcome))) => {
                    report.verses_written += 1;
                    commentators
                        .entry(outcome.chapter_index)
                        .or_default()
                        .extend(outcome.commentators);
                    unresolved.extend(outcome.unresolved.into_iter().map(|r| (chapter, number, r)));
                }
                Ok((chapter, number, Err(e))) if e.is_fatal() => {
                    error!(chapter, verse = number, error = %e, "Fatal error, aborting book");
                    tasks.abort_all();
                    return Err(e);
                }
                Ok((chapter, number, Err(e))) => {
                    report.verses_skipped += 1;
                    warn!(chapter, verse = number, error = %e, "Skipping verse");
                }
                Err(e) => {
                    report.verses_skipped += 1;
                    error!(error = %e, "Verse task failed");
                }
            }
        }

        let index = build_book_index(item, schema, &commentators);
        self.ctx.store.insert_book_index(&index)?;

        unresolved.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        report.unresolved_refs = unresolved.len() as u64;
        self.write_audit(&item.title, unresolved).await;

        info!(
            written = report.verses_written,
            skipped = report.verses_skipped,
            unresolved = report.unresolved_refs,
            "Completed book"
        );
        Ok(report)
    }

    async fn write_audit(&self, book: &str, unresolved: Vec<(u32, u32, UnresolvedRef)>) {
        let Some(audit) = &self.ctx.audit else {
            return;
        };

        let timestamp = Utc::now();
        let entries: Vec<AuditEntry> = unresolved
            .into_iter()
            .map(|(chapter, verse, r)| AuditEntry {
                timestamp,
                book: book.to_string(),
                chapter,
                verse,
                index_title: r.index_title,
                raw_ref: r.raw_ref,
                normalized: r.normalized,
            })
            .collect();

        if let Err(e) = audit.append(&entries).await {
            warn!(path = %audit.path().display(), error = %e, "Failed to write audit log");
        }
    }
}
