//! Pipeline publication and rollback.
//!
//! Publishing runs four reversible steps. Each completed step pushes an undo
//! record; on failure the records are replayed newest-first so the pipeline is
//! left exactly as it was before publication started. Teardown of a published
//! pipeline reuses the same undo path.
//!
//! ```text
//! allocate sink ─► register sink node ─► build links ─► register subdevs
//!      ▲                   ▲                  ▲                │
//!      └─── release ◄──── unregister ◄────── clear ◄─── unregister (on error)
//! ```

use crate::pipeline::error::{GraphError, GraphResult};
use crate::pipeline::graph::{Pipeline, PipelineStatus};
use crate::pipeline::id::NodeId;
use crate::pipeline::link::LinkBuilder;
use crate::pipeline::tracker::BuildContext;
use crate::pipeline::visibility::{DeviceNumber, DeviceVisibility, VisibleNode};

/// A completed publication step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    SinkAllocated,
    SinkVisible(DeviceNumber),
    LinksBuilt,
    SubdevVisible(NodeId, DeviceNumber),
}

pub struct PipelinePublisher;

impl PipelinePublisher {
    /// Publish the pipeline: allocate and register the capture node, build
    /// every link, then register a subdevice node per bound entity.
    ///
    /// On error every completed step is reversed, the pipeline is left
    /// `Failed` and the originating error is returned. A pipeline that is
    /// already `Complete` or `Building` is rejected with `Busy` and left as is.
    pub fn publish(ctx: &mut BuildContext<'_>) -> GraphResult<()> {
        let status = ctx.pipeline.status();
        if matches!(status, PipelineStatus::Complete | PipelineStatus::Building) {
            return Err(GraphError::Busy {
                operation: "publish",
                status,
            });
        }
        ctx.pipeline.set_status(PipelineStatus::Building);

        let mut undo = Vec::new();
        match Self::run(ctx, &mut undo) {
            Ok(()) => {
                ctx.pipeline.compute_chain();
                ctx.pipeline.mark_published();
                ctx.pipeline.set_status(PipelineStatus::Complete);
                tracing::info!(
                    "Pipeline '{}' published: {} links, {} subdevice nodes (generation {})",
                    ctx.pipeline.config().sink_name,
                    ctx.pipeline.link_count(),
                    ctx.pipeline.subdev_nodes().len(),
                    ctx.pipeline.generation()
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    "Pipeline '{}' build failed: {}",
                    ctx.pipeline.config().sink_name,
                    e
                );
                Self::rollback(ctx.pipeline, ctx.visibility, undo);
                ctx.pipeline.set_status(PipelineStatus::Failed);
                Err(e)
            }
        }
    }

    fn run(ctx: &mut BuildContext<'_>, undo: &mut Vec<Step>) -> GraphResult<()> {
        // 1. Capture node
        if ctx
            .pipeline
            .allocate_sink()
            .map_err(GraphError::SinkAllocation)?
        {
            undo.push(Step::SinkAllocated);
        }

        // 2. Make it visible, unless a previous attempt already did
        let visible = ctx.pipeline.sink().and_then(|sink| sink.number);
        if visible.is_none() {
            let node = {
                let config = ctx.pipeline.config();
                VisibleNode::video(config.sink_name.trim(), config.sink)
            };
            let number = ctx.visibility.register_node(&node)?;
            if let Some(sink) = ctx.pipeline.sink_mut() {
                sink.number = Some(number);
            }
            undo.push(Step::SinkVisible(number));
        }

        // 3. Links. Recorded first so partial links are cleared on failure.
        undo.push(Step::LinksBuilt);
        LinkBuilder::build(ctx)?;

        // 4. Subdevice nodes
        let sink_identity = ctx.pipeline.config().sink;
        let subdevs: Vec<VisibleNode> = ctx
            .registry
            .all()
            .filter(|e| e.node != sink_identity)
            .map(|e| VisibleNode::subdev(e.name.clone(), e.node))
            .collect();
        for subdev in subdevs {
            let number = ctx.visibility.register_node(&subdev).map_err(|e| {
                tracing::error!("Failed to register subdevice node for '{}'", subdev.name);
                e
            })?;
            ctx.pipeline.push_subdev_node(subdev.owner, number);
            undo.push(Step::SubdevVisible(subdev.owner, number));
        }

        Ok(())
    }

    /// Reverse `undo` newest-first. Unregistration errors are logged and do
    /// not stop the unwind.
    fn rollback(pipeline: &mut Pipeline, visibility: &mut dyn DeviceVisibility, undo: Vec<Step>) {
        for step in undo.into_iter().rev() {
            tracing::debug!("Rolling back {:?}", step);
            match step {
                Step::SubdevVisible(owner, number) => {
                    if let Err(e) = visibility.unregister_node(number) {
                        tracing::warn!("Failed to unregister subdevice of {}: {}", owner, e);
                    }
                    pipeline.pop_subdev_node();
                }
                Step::LinksBuilt => pipeline.clear_links(),
                Step::SinkVisible(number) => {
                    if let Err(e) = visibility.unregister_node(number) {
                        tracing::warn!("Failed to unregister capture node: {}", e);
                    }
                    if let Some(sink) = pipeline.sink_mut() {
                        sink.number = None;
                    }
                }
                Step::SinkAllocated => {
                    pipeline.release_sink();
                }
            }
        }
    }

    /// Undo a publication. Rejected with `Busy` while a build is in progress.
    /// The pipeline returns to `Empty`; its generation counter is kept.
    pub fn teardown(
        pipeline: &mut Pipeline,
        visibility: &mut dyn DeviceVisibility,
    ) -> GraphResult<()> {
        if pipeline.status() == PipelineStatus::Building {
            return Err(GraphError::Busy {
                operation: "tear down",
                status: pipeline.status(),
            });
        }

        let mut undo = Vec::new();
        if let Some(sink) = pipeline.sink() {
            undo.push(Step::SinkAllocated);
            if let Some(number) = sink.number {
                undo.push(Step::SinkVisible(number));
            }
        }
        undo.push(Step::LinksBuilt);
        undo.extend(
            pipeline
                .subdev_nodes()
                .iter()
                .map(|&(owner, number)| Step::SubdevVisible(owner, number)),
        );

        Self::rollback(pipeline, visibility, undo);
        pipeline.set_status(PipelineStatus::Empty);
        tracing::info!("Pipeline '{}' torn down", pipeline.config().sink_name);
        Ok(())
    }
}
