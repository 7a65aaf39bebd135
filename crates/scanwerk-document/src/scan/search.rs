// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region search — try the whole buffer, then recurse into quadrants until a
// decode succeeds or the depth and size bounds are exhausted.

use scanwerk_bridge::Decoder;
use scanwerk_core::config::{EnhancementConfig, SearchConfig};
use scanwerk_core::error::Result;
use scanwerk_core::types::{EncodedImage, PixelBuffer, SearchNode};
use tracing::{debug, info, instrument};

use crate::scan::enhance::ImageEnhancer;

/// What a finished search found and how much work it took.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchReport {
    /// The first non-empty payload, in search order.
    pub payload: Option<String>,
    /// Number of decode attempts made.
    pub attempts: usize,
    /// The node whose attempt produced `payload`.
    pub winner: Option<SearchNode>,
}

impl SearchReport {
    pub fn found(&self) -> bool {
        self.payload.is_some()
    }
}

/// Depth-bounded recursive quadrant search over one pixel buffer.
///
/// Nodes are visited depth-first: whole region, then top-left, top-right,
/// bottom-left, bottom-right, with each quadrant's own sub-quadrants searched
/// before the next sibling. The first non-empty payload wins.
#[derive(Debug, Clone)]
pub struct RegionSearch {
    enhancer: ImageEnhancer,
    config: SearchConfig,
}

impl RegionSearch {
    pub fn new(enhancement: EnhancementConfig, config: SearchConfig) -> Self {
        Self {
            enhancer: ImageEnhancer::new(enhancement),
            config,
        }
    }

    /// Search `buffer`, handing every candidate to `decoder`.
    ///
    /// Decoder errors and encoding failures abort the search; a decoder
    /// returning no payload only moves the search on.
    pub fn search<D>(&self, buffer: &PixelBuffer, decoder: &mut D) -> Result<SearchReport>
    where
        D: Decoder + ?Sized,
    {
        self.search_with(buffer, |_, image| decoder.decode(image))
    }

    /// Like [`search`](Self::search), with a probe that also sees the node
    /// being attempted.
    #[instrument(skip_all, fields(width = buffer.width(), height = buffer.height()))]
    pub fn search_with<F>(&self, buffer: &PixelBuffer, mut probe: F) -> Result<SearchReport>
    where
        F: FnMut(&SearchNode, &EncodedImage) -> Result<Option<String>>,
    {
        let mut report = SearchReport::default();
        self.visit(buffer, SearchNode::root(buffer.bounds()), &mut probe, &mut report)?;
        info!(
            attempts = report.attempts,
            found = report.found(),
            "Region search finished"
        );
        Ok(report)
    }

    fn visit(
        &self,
        buffer: &PixelBuffer,
        node: SearchNode,
        probe: &mut dyn FnMut(&SearchNode, &EncodedImage) -> Result<Option<String>>,
        report: &mut SearchReport,
    ) -> Result<bool> {
        report.attempts += 1;
        let crop = buffer.crop(&node.region)?;
        let encoded = self.enhancer.enhance_and_encode(crop)?;

        match probe(&node, &encoded)? {
            Some(payload) if !payload.is_empty() => {
                debug!(depth = node.depth, region = %node.region, "Decode hit");
                report.payload = Some(payload);
                report.winner = Some(node);
                return Ok(true);
            }
            _ => debug!(depth = node.depth, region = %node.region, "Decode miss"),
        }

        if !self.should_subdivide(&node) {
            return Ok(false);
        }
        for child in node.children() {
            if self.visit(buffer, child, probe, report)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn should_subdivide(&self, node: &SearchNode) -> bool {
        node.region.width >= self.config.min_region_size
            && node.region.height >= self.config.min_region_size
            && node.depth < self.config.max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanwerk_core::error::ScanwerkError;
    use scanwerk_core::types::Region;

    fn white(w: u32, h: u32) -> PixelBuffer {
        PixelBuffer::filled(w, h, [255, 255, 255, 255]).unwrap()
    }

    fn engine() -> RegionSearch {
        RegionSearch::new(EnhancementConfig::passthrough(), SearchConfig::default())
    }

    fn exhaust(w: u32, h: u32) -> SearchReport {
        engine()
            .search_with(&white(w, h), |_, _| Ok(None))
            .unwrap()
    }

    #[test]
    fn exhausted_search_makes_bounded_attempts() {
        assert_eq!(exhaust(400, 400).attempts, 85);
        assert_eq!(exhaust(800, 800).attempts, 85);
        assert_eq!(exhaust(300, 300).attempts, 21);
        // 199 splits into 99/100 halves; only the 100x100 quadrant recurses.
        assert_eq!(exhaust(199, 199).attempts, 9);
        assert_eq!(exhaust(99, 400).attempts, 1);
        assert_eq!(exhaust(400, 400).payload, None);
    }

    #[test]
    fn whole_image_hit_short_circuits() {
        let report = engine()
            .search_with(&white(400, 400), |_, _| Ok(Some("hello".into())))
            .unwrap();
        assert_eq!(report.attempts, 1);
        assert_eq!(report.payload.as_deref(), Some("hello"));
        assert_eq!(report.winner, Some(SearchNode::root(Region::new(0, 0, 400, 400))));
    }

    #[test]
    fn first_success_wins_in_search_order() {
        let top_right = SearchNode {
            region: Region::new(200, 0, 200, 200),
            depth: 1,
        };
        let mut visited = Vec::new();
        let report = engine()
            .search_with(&white(400, 400), |node, _| {
                visited.push(*node);
                Ok((*node == top_right).then(|| "top-right".to_string()))
            })
            .unwrap();

        assert_eq!(report.payload.as_deref(), Some("top-right"));
        assert_eq!(report.winner, Some(top_right));
        // Root, the whole top-left subtree (1 + 4 + 16), then top-right.
        assert_eq!(report.attempts, 23);
        assert_eq!(visited.len(), 23);
        assert_eq!(visited.last(), Some(&top_right));
        assert!(!visited.iter().any(|n| n.depth == 1 && n.region.y == 200));
    }

    #[test]
    fn whole_quadrant_is_tried_before_its_children() {
        let mut visited = Vec::new();
        engine()
            .search_with(&white(400, 400), |node, _| {
                visited.push(*node);
                Ok(None)
            })
            .unwrap();
        assert_eq!(visited[0].depth, 0);
        assert_eq!(visited[1].region, Region::new(0, 0, 200, 200));
        assert_eq!(visited[2].region, Region::new(0, 0, 100, 100));
        assert_eq!(visited[3].region, Region::new(0, 0, 50, 50));
    }

    #[test]
    fn every_node_stays_inside_the_buffer() {
        for (w, h) in [(400, 400), (333, 517), (1001, 203), (100, 100)] {
            let bounds = Region::new(0, 0, w, h);
            let mut nodes = Vec::new();
            engine()
                .search_with(&white(w, h), |node, _| {
                    nodes.push(*node);
                    Ok(None)
                })
                .unwrap();
            for node in nodes {
                assert!(node.region.fits_within(w, h), "{} escapes {}x{}", node.region, w, h);
                assert!(bounds.contains(&node.region));
                assert!(node.region.width > 0 && node.region.height > 0);
            }
        }
    }

    #[test]
    fn empty_payload_counts_as_a_miss() {
        let report = engine()
            .search_with(&white(150, 150), |node, _| {
                Ok(Some(if node.depth == 1 { "x" } else { "" }.to_string()))
            })
            .unwrap();
        assert_eq!(report.attempts, 2);
        assert_eq!(report.payload.as_deref(), Some("x"));
    }

    #[test]
    fn decoder_errors_abort_the_search() {
        let mut calls = 0;
        let result = engine().search_with(&white(400, 400), |_, _| {
            calls += 1;
            Err(ScanwerkError::Decoder("boom".into()))
        });
        assert!(matches!(result, Err(ScanwerkError::Decoder(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn candidates_are_enhanced_before_decoding() {
        let search = RegionSearch::new(EnhancementConfig::default(), SearchConfig::default());
        let mut input = white(120, 120);
        input
            .fill_region(&Region::new(0, 0, 120, 120), [200, 30, 30, 255])
            .unwrap();
        let mut formats = Vec::new();
        search
            .search_with(&input, |_, image| {
                let decoded = image::load_from_memory(&image.bytes).unwrap().to_rgba8();
                let px = decoded.get_pixel(decoded.width() / 2, decoded.height() / 2).0;
                // Grayscale + threshold leave only black or white.
                assert!(px[0] == px[1] && px[1] == px[2]);
                assert!(px[0] == 0 || px[0] == 255);
                formats.push(image.format);
                Ok(None)
            })
            .unwrap();
        assert_eq!(formats.len(), 5);
    }
}
