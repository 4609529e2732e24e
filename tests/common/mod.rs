//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use camgraph::pipeline::{EntityRegistry, PadDirection, PadRef, Pipeline};

/// Direction of the pad a link end refers to. The capture node's pad is
/// always a sink.
pub fn pad_direction(
    registry: &EntityRegistry,
    pipeline: &Pipeline,
    pad: PadRef,
) -> Option<PadDirection> {
    if pad == pipeline.sink_pad() {
        return pipeline.sink().map(|s| s.pad.direction);
    }
    registry
        .find(pad.node)
        .ok()?
        .pad(pad.pad as u32)
        .map(|p| p.direction)
}

/// Assert every link joins a source pad to a sink pad.
pub fn assert_links_well_formed(registry: &EntityRegistry, pipeline: &Pipeline) {
    for link in pipeline.links() {
        assert_eq!(
            pad_direction(registry, pipeline, link.source),
            Some(PadDirection::Source),
            "link {:?} does not start at a source pad",
            link
        );
        assert_eq!(
            pad_direction(registry, pipeline, link.sink),
            Some(PadDirection::Sink),
            "link {:?} does not end at a sink pad",
            link
        );
    }
}
