//! Search orchestration: drives the enumerator and matchers over every
//! process, applies the match-combination policy, and aggregates results.
//!
//! Processes are probed in parallel; each worker builds a private outcome
//! and the outcomes are merged at a single aggregation point in enumeration
//! order, so no worker ever touches another's partial results and output
//! order is deterministic. One inaccessible process never aborts the scan
//! of the others.

use std::time::Instant;

use once_cell::unsync::OnceCell;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::matchers::{match_libraries, match_names, ByteMatcher, ContentMatcher, Hit};
use crate::params::{compile_content_pattern, SearchRequest};
use crate::process::{
    enumerate_processes, loaded_libraries, read_regions, scan_regions, MemoryRegion,
    ProcessMemory, ProcessRecord, ScanInterrupt, ScanWindow,
};
use crate::results::{Category, MatchElement, Results, SearchResult, Statistics};

/// One search with patterns compiled and options normalized for scanning.
struct CompiledSearch {
    name: String,
    names: Vec<String>,
    libraries: Vec<regex::Regex>,
    library_sources: Vec<String>,
    bytes: Vec<Vec<u8>>,
    byte_sources: Vec<String>,
    contents: Vec<regex::bytes::Regex>,
    content_sources: Vec<String>,
    matchall: bool,
    logfailures: bool,
    window: ScanWindow,
}

impl CompiledSearch {
    fn scans_memory(&self) -> bool {
        !self.bytes.is_empty() || !self.contents.is_empty()
    }
}

/// Outcome of one search against one process.
#[derive(Default)]
struct SearchProbe {
    elements: Vec<MatchElement>,
    failures: Vec<String>,
    /// A category failed, whether or not the search logs failures.
    failed: bool,
}

/// Outcome of probing one process with every search.
struct ProcessOutcome {
    probes: Vec<SearchProbe>,
    /// Probing never started because the run deadline had passed.
    skipped: bool,
    /// At least one category failed on this process (logged or not).
    failed: bool,
}

/// Evaluation of one criteria category for one (search, process) pair.
struct CategoryEval {
    category: Category,
    hits: Vec<Hit>,
    total: usize,
}

impl CategoryEval {
    /// Every pattern in the category matched at least once.
    fn complete(&self) -> bool {
        self.hits.len() == self.total
    }
}

/// Runs a validated request against the live process list.
///
/// Always returns a well-formed [`Results`]; `success=false` is reserved
/// for conditions that make the whole run untrustworthy (the enumerator is
/// unusable, or a validated pattern failed to compile).
pub fn run_scan(request: &SearchRequest, cfg: &EngineConfig) -> Results {
    let started = Instant::now();
    let scanned_at = chrono::Utc::now().to_rfc3339();
    let run_deadline = cfg.run_timeout.map(|t| started + t);

    let compiled = match compile_searches(request, cfg) {
        Ok(c) => c,
        Err(e) => return Results::fatal(e),
    };

    let procs = match enumerate_processes("/proc", cfg.max_processes) {
        Ok(p) => p,
        Err(e) => return Results::fatal(format!("cannot enumerate processes: {e}")),
    };
    debug!(
        "probing {} processes with {} searches",
        procs.len(),
        compiled.len()
    );

    let outcomes: Vec<ProcessOutcome> = procs
        .par_iter()
        .map(|proc| probe_process(proc, &compiled, cfg, run_deadline))
        .collect();

    aggregate(&compiled, outcomes, started, scanned_at)
}

/// Folds per-process outcomes into the final document, in enumeration order.
fn aggregate(
    compiled: &[CompiledSearch],
    outcomes: Vec<ProcessOutcome>,
    started: Instant,
    scanned_at: String,
) -> Results {
    let mut results = Results {
        success: true,
        ..Default::default()
    };
    for cs in compiled {
        results
            .searches
            .insert(cs.name.clone(), SearchResult::default());
    }

    let mut totalhits = 0;
    let mut scanned = 0;
    let mut failed = 0;
    for outcome in outcomes {
        if !outcome.skipped {
            scanned += 1;
        }
        if outcome.failed {
            failed += 1;
        }
        for (cs, probe) in compiled.iter().zip(outcome.probes) {
            if let Some(sr) = results.searches.get_mut(&cs.name) {
                if !probe.elements.is_empty() {
                    sr.foundanything = true;
                    totalhits += probe.elements.len();
                }
                sr.matches.extend(probe.elements);
                sr.failures.extend(probe.failures);
            }
        }
    }

    results.foundanything = results.searches.values().any(|s| s.foundanything);
    results.statistics = Statistics {
        processes_scanned: scanned,
        processes_failed: failed,
        totalhits,
        exectime: format!("{:?}", started.elapsed()),
        scanned_at,
    };
    results
}

/// Compiles every search once. The request is pre-validated, so a failure
/// here is an internal fault and surfaces as a fatal error.
fn compile_searches(
    request: &SearchRequest,
    cfg: &EngineConfig,
) -> Result<Vec<CompiledSearch>, String> {
    let mut out = Vec::with_capacity(request.searches.len());
    for (name, search) in &request.searches {
        let libraries = search
            .libraries
            .iter()
            .map(|p| regex::Regex::new(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("search '{name}': library pattern failed to compile: {e}"))?;
        let contents = search
            .contents
            .iter()
            .map(|p| compile_content_pattern(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("search '{name}': content pattern failed to compile: {e}"))?;
        let bytes = search
            .bytes
            .iter()
            .map(|p| hex::decode(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("search '{name}': byte pattern is not valid hex: {e}"))?;

        let offset = u64::try_from(search.options.offset)
            .map_err(|_| format!("search '{name}': negative offset survived validation"))?;
        let mut limit = u64::try_from(search.options.maxlength)
            .map_err(|_| format!("search '{name}': negative maxlength survived validation"))?;
        if limit == 0 {
            limit = cfg.max_scan_bytes;
        }

        out.push(CompiledSearch {
            name: name.clone(),
            names: search.names.clone(),
            libraries,
            library_sources: search.libraries.clone(),
            bytes,
            byte_sources: search.bytes.clone(),
            contents,
            content_sources: search.contents.clone(),
            matchall: search.options.matchall,
            logfailures: search.options.logfailures,
            window: ScanWindow { offset, limit },
        });
    }
    Ok(out)
}

/// Lazily-initialized per-process views shared by all searches probing the
/// same process. The memory handle lives exactly as long as the probe.
struct ProcessView<'a> {
    record: &'a ProcessRecord,
    regions: OnceCell<Result<Vec<MemoryRegion>, String>>,
    libraries: OnceCell<Result<Vec<String>, String>>,
    memory: OnceCell<Result<ProcessMemory, String>>,
}

impl<'a> ProcessView<'a> {
    fn new(record: &'a ProcessRecord) -> Self {
        Self {
            record,
            regions: OnceCell::new(),
            libraries: OnceCell::new(),
            memory: OnceCell::new(),
        }
    }

    fn regions(&self) -> Result<&[MemoryRegion], String> {
        self.regions
            .get_or_init(|| {
                read_regions(&self.record.proc_path)
                    .map_err(|e| format!("cannot read memory maps: {e}"))
            })
            .as_ref()
            .map(|v| v.as_slice())
            .map_err(Clone::clone)
    }

    fn libraries(&self) -> Result<&[String], String> {
        self.libraries
            .get_or_init(|| self.regions().map(loaded_libraries))
            .as_ref()
            .map(|v| v.as_slice())
            .map_err(Clone::clone)
    }

    fn memory(&self) -> Result<&ProcessMemory, String> {
        self.memory
            .get_or_init(|| {
                ProcessMemory::open(&self.record.proc_path)
                    .map_err(|e| format!("cannot open memory: {e}"))
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}

/// Probes one process with every search. All failure paths stay inside the
/// returned outcome; the worker never panics the run.
fn probe_process(
    record: &ProcessRecord,
    compiled: &[CompiledSearch],
    cfg: &EngineConfig,
    run_deadline: Option<Instant>,
) -> ProcessOutcome {
    // Coarse cancellation: the deadline is honored between processes, so at
    // most one in-flight probe of work is wasted when the run is cut off.
    if run_deadline.is_some_and(|d| Instant::now() >= d) {
        let probes = compiled
            .iter()
            .map(|cs| SearchProbe {
                failures: if cs.logfailures {
                    vec![failure_line(record, "skipped, run deadline exceeded")]
                } else {
                    Vec::new()
                },
                ..Default::default()
            })
            .collect();
        return ProcessOutcome {
            probes,
            skipped: true,
            failed: false,
        };
    }

    let mut deadline = Instant::now() + cfg.process_timeout;
    if let Some(run_deadline) = run_deadline {
        deadline = deadline.min(run_deadline);
    }

    let view = ProcessView::new(record);
    let mut failed = false;
    let probes = compiled
        .iter()
        .map(|cs| {
            let probe = probe_search(record, &view, cs, cfg, deadline);
            failed |= probe.failed;
            probe
        })
        .collect();

    ProcessOutcome {
        probes,
        skipped: false,
        failed,
    }
}

/// Runs one search's matchers against one process and applies the
/// combination policy.
fn probe_search(
    record: &ProcessRecord,
    view: &ProcessView<'_>,
    cs: &CompiledSearch,
    cfg: &EngineConfig,
    deadline: Instant,
) -> SearchProbe {
    let mut probe = SearchProbe::default();
    let mut evals: Vec<CategoryEval> = Vec::new();

    if !cs.names.is_empty() {
        evals.push(CategoryEval {
            category: Category::Name,
            hits: match_names(record, &cs.names),
            total: cs.names.len(),
        });
        // A populated category that cannot fully match ends a matchall
        // probe here; the pair can no longer hit, so the expensive
        // categories are not evaluated at all.
        if cs.matchall && !evals.last().map_or(true, CategoryEval::complete) {
            return probe;
        }
    }

    if !cs.libraries.is_empty() {
        let hits = match view.libraries() {
            Ok(libs) => match_libraries(libs, &cs.libraries),
            Err(e) => {
                probe.fail(cs, record, &e);
                Vec::new()
            }
        };
        evals.push(CategoryEval {
            category: Category::Library,
            hits,
            total: cs.libraries.len(),
        });
        if cs.matchall && !evals.last().map_or(true, CategoryEval::complete) {
            return probe;
        }
    }

    if cs.scans_memory() {
        match scan_process_memory(view, cs, cfg, deadline) {
            Ok((byte_hits, content_hits)) => {
                if !cs.bytes.is_empty() {
                    evals.push(CategoryEval {
                        category: Category::Bytes,
                        hits: byte_hits,
                        total: cs.bytes.len(),
                    });
                }
                if !cs.contents.is_empty() {
                    evals.push(CategoryEval {
                        category: Category::Content,
                        hits: content_hits,
                        total: cs.contents.len(),
                    });
                }
            }
            Err(e) => {
                warn!(
                    "memory scan of pid {} ({}) failed: {}",
                    record.pid, record.name, e
                );
                probe.fail(cs, record, &e);
                if !cs.bytes.is_empty() {
                    evals.push(CategoryEval {
                        category: Category::Bytes,
                        hits: Vec::new(),
                        total: cs.bytes.len(),
                    });
                }
                if !cs.contents.is_empty() {
                    evals.push(CategoryEval {
                        category: Category::Content,
                        hits: Vec::new(),
                        total: cs.contents.len(),
                    });
                }
            }
        }
    }

    if combine(cs.matchall, &evals) {
        for eval in &evals {
            for h in &eval.hits {
                probe.elements.push(make_element(cs, record, eval.category, h));
            }
        }
    }

    probe
}

impl SearchProbe {
    /// Records a per-process failure; it reaches the result document only
    /// when the search opted in via `logfailures`.
    fn fail(&mut self, cs: &CompiledSearch, record: &ProcessRecord, detail: &str) {
        self.failed = true;
        if cs.logfailures {
            self.failures.push(failure_line(record, detail));
        }
    }
}

/// Scans the process's memory window once for both memory-based categories.
fn scan_process_memory(
    view: &ProcessView<'_>,
    cs: &CompiledSearch,
    cfg: &EngineConfig,
    deadline: Instant,
) -> Result<(Vec<Hit>, Vec<Hit>), String> {
    let regions = view.regions()?;
    let mem = view.memory()?;

    let mut byte_matcher = ByteMatcher::new(&cs.bytes);
    let mut content_matcher = ContentMatcher::new(&cs.contents);

    let mut overlap = byte_matcher.max_pattern_len().saturating_sub(1);
    if !cs.contents.is_empty() {
        overlap = overlap.max(cfg.content_overlap);
    }

    let scan = scan_regions(
        mem,
        regions,
        cs.window,
        cfg.chunk_bytes,
        overlap,
        Some(deadline),
        |chunk| {
            byte_matcher.feed(chunk);
            content_matcher.feed(chunk);
            !(byte_matcher.complete() && content_matcher.complete())
        },
    );

    match scan {
        Ok(_) => Ok((byte_matcher.hits(), content_matcher.hits())),
        // Partial hits from an abandoned process are dropped with it.
        Err(ScanInterrupt::Timeout) => Err("memory scan exceeded its time budget".to_string()),
    }
}

/// Match-combination policy.
///
/// With `matchall`, every populated category must be complete (each of its
/// patterns matched at least once). Otherwise any single hit suffices. A
/// search with no populated categories never hits.
fn combine(matchall: bool, evals: &[CategoryEval]) -> bool {
    if evals.is_empty() {
        return false;
    }
    if matchall {
        evals.iter().all(CategoryEval::complete)
    } else {
        evals.iter().any(|e| !e.hits.is_empty())
    }
}

fn make_element(
    cs: &CompiledSearch,
    record: &ProcessRecord,
    category: Category,
    hit: &Hit,
) -> MatchElement {
    let pattern = match category {
        Category::Name => &cs.names[hit.pattern],
        Category::Library => &cs.library_sources[hit.pattern],
        Category::Bytes => &cs.byte_sources[hit.pattern],
        Category::Content => &cs.content_sources[hit.pattern],
    };
    MatchElement {
        search: cs.name.clone(),
        category,
        pattern: pattern.clone(),
        pid: record.pid,
        process: record.name.clone(),
        path: record.path.clone(),
        offset: hit.offset,
        matched: hit.matched.clone(),
    }
}

fn failure_line(record: &ProcessRecord, detail: &str) -> String {
    format!("pid {} ({}): {}", record.pid, record.name, detail)
}
