//! Breadcrumb reconstruction
//!
//! Rebuilds root-to-leaf paths from a flat transitive-closure map. The walk is
//! an explicit depth-first search over immutable partial paths; a broader edge
//! pointing back into the path under construction ends that branch.
//!
//! Author: hephaex@gmail.com

use skos_core::{BreadcrumbPath, BreadcrumbPaths, Crumb, TransitiveClosure};
use std::sync::atomic::{AtomicU64, Ordering};

/// Nodes nearest the leaf (leaf included) that stay visible in a compressed path
pub const MAX_VISIBLE_CRUMBS: usize = 5;

// ============================================================================
// Diagnostics
// ============================================================================

/// Counters for malformed hierarchy data seen while building paths
#[derive(Debug, Default)]
pub struct HierarchyDiagnostics {
    cycles: AtomicU64,
    dangling: AtomicU64,
}

impl HierarchyDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dangling(&self) {
        self.dangling.fetch_add(1, Ordering::Relaxed);
    }

    /// Broader edges ignored because they closed a cycle
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Broader edges ignored because their target is not in the closure
    pub fn dangling(&self) -> u64 {
        self.dangling.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Hierarchy Builder
// ============================================================================

pub struct HierarchyBuilder<'a> {
    closure: &'a TransitiveClosure,
    diagnostics: &'a HierarchyDiagnostics,
    max_visible: usize,
}

impl<'a> HierarchyBuilder<'a> {
    pub fn new(closure: &'a TransitiveClosure, diagnostics: &'a HierarchyDiagnostics) -> Self {
        Self {
            closure,
            diagnostics,
            max_visible: MAX_VISIBLE_CRUMBS,
        }
    }

    pub fn with_max_visible(mut self, max_visible: usize) -> Self {
        self.max_visible = max_visible.max(1);
        self
    }

    /// Every ancestor chain of `leaf`, root first, one per distinct broader route.
    ///
    /// Broader concepts missing from the closure (limit reached or dangling
    /// edge) are left out, so every crumb refers to a node of the closure.
    pub fn paths(&self, leaf: &str) -> Vec<BreadcrumbPath> {
        if !self.closure.contains_key(leaf) {
            return Vec::new();
        }
        let mut complete: Vec<Vec<&str>> = Vec::new();
        // partial paths, leaf first
        let mut stack: Vec<Vec<&str>> = vec![vec![leaf]];

        while let Some(path) = stack.pop() {
            let Some(&current) = path.last() else {
                continue;
            };
            let Some(node) = self.closure.get(current) else {
                continue;
            };
            if node.is_top || node.direct.is_empty() {
                complete.push(path);
                continue;
            }

            let mut next: Vec<&str> = Vec::new();
            for broader in &node.direct {
                if broader == current {
                    continue;
                }
                if !self.closure.contains_key(broader) {
                    self.diagnostics.record_dangling();
                    continue;
                }
                if path.contains(&broader.as_str()) {
                    self.diagnostics.record_cycle();
                    tracing::debug!(
                        leaf,
                        from = current,
                        to = broader.as_str(),
                        "Broader cycle truncated"
                    );
                    continue;
                }
                next.push(broader);
            }

            if next.is_empty() {
                complete.push(path);
                continue;
            }
            // reversed so the first broader is expanded first
            for broader in next.into_iter().rev() {
                let mut extended = path.clone();
                extended.push(broader);
                stack.push(extended);
            }
        }

        complete
            .into_iter()
            .map(|path| {
                path.into_iter()
                    .rev()
                    .map(|uri| {
                        let label = self.closure.get(uri).and_then(|n| n.label.clone());
                        Crumb::new(uri, label)
                    })
                    .collect()
            })
            .collect()
    }

    /// Display paths with long prefixes collapsed, plus the raw paths.
    ///
    /// All but the `max_visible` nodes nearest the leaf are hidden behind the
    /// first hidden node, which keeps its URI. `combined[i]` lists the nodes
    /// that placeholder stands for; when several paths share the same hidden
    /// run only the first one carries it.
    pub fn breadcrumbs(&self, leaf: &str) -> BreadcrumbPaths {
        let raw = self.paths(leaf);
        let mut breadcrumbs = Vec::with_capacity(raw.len());
        let mut combined = Vec::with_capacity(raw.len());
        let mut seen_runs: Vec<Vec<String>> = Vec::new();

        for path in &raw {
            let (display, hidden) = compress(path, self.max_visible);
            let run: Vec<String> = hidden.iter().map(|c| c.uri.clone()).collect();
            if run.is_empty() || seen_runs.contains(&run) {
                combined.push(Vec::new());
            } else {
                seen_runs.push(run);
                combined.push(hidden);
            }
            breadcrumbs.push(display);
        }

        BreadcrumbPaths {
            breadcrumbs,
            combined,
            raw,
        }
    }
}

/// Split a path into its display form and the nodes hidden from it
fn compress(path: &[Crumb], max_visible: usize) -> (BreadcrumbPath, BreadcrumbPath) {
    if path.len() <= max_visible {
        return (path.to_vec(), Vec::new());
    }
    let cut = path.len() - max_visible;
    let hidden = path[..cut].to_vec();

    let mut placeholder = path[0].clone();
    placeholder.hide();

    let mut display = Vec::with_capacity(max_visible + 1);
    display.push(placeholder);
    display.extend_from_slice(&path[cut..]);
    (display, hidden)
}
