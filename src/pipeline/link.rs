//! Link construction.
//!
//! Links are created from the producing side: each bound entity walks its own
//! endpoints and creates a link for every one whose local pad is a source.
//! The entity on the other end declares the same connection from its sink pad
//! and skips it, so every connection is created exactly once.
//!
//! The pipeline's own sink identity never appears as a generic link target.
//! Its connection is built last, from the channel endpoint declared on the
//! sink node, into the capture node's single sink pad.

use crate::pipeline::endpoint::{self, EndpointDescriptor};
use crate::pipeline::error::{GraphError, GraphResult};
use crate::pipeline::id::{NodeId, PadRef};
use crate::pipeline::pad::{PadDescriptor, PadDirection};
use crate::pipeline::registry::Entity;
use crate::pipeline::tracker::BuildContext;

pub struct LinkBuilder;

impl LinkBuilder {
    /// Create every link of the pipeline. Returns the number of links created.
    ///
    /// Any error aborts the build; links created so far stay in the pipeline
    /// for the caller to clear.
    pub fn build(ctx: &mut BuildContext<'_>) -> GraphResult<usize> {
        let order: Vec<NodeId> = ctx.registry.all().map(|e| e.node).collect();
        let mut created = 0;

        for node in order {
            created += Self::build_entity(ctx, node)?;
        }
        Self::build_sink_link(ctx)?;
        created += 1;

        tracing::debug!("Created {} links", created);
        Ok(created)
    }

    /// Outbound links of one entity.
    fn build_entity(ctx: &mut BuildContext<'_>, node: NodeId) -> GraphResult<usize> {
        let sink_identity = ctx.pipeline.config().sink;
        let entity = ctx.registry.find(node)?;
        let name = entity.name.clone();

        if node == sink_identity {
            tracing::debug!("Skipping sink owner '{}'", name);
            return Ok(0);
        }
        if !entity.has_topology() {
            tracing::warn!("Entity '{}' exposes no connection surface, skipping", name);
            return Ok(0);
        }
        let pads = entity.pads().to_vec();

        tracing::debug!("Creating links for entity '{}'", name);

        let endpoints = match endpoint::resolve(ctx.topology, node) {
            Ok(endpoints) => endpoints,
            Err(e) => {
                tracing::error!("Failed to resolve endpoints of '{}': {}", name, e);
                ctx.registry.mark_build_failed(node)?;
                return Err(e);
            }
        };

        let mut created = 0;
        for ep in endpoints {
            tracing::debug!(
                "Processing endpoint {}:{} -> {}:{}",
                name,
                ep.local_port,
                ep.remote_node,
                ep.remote_port
            );

            let Some(local_pad) = pads.get(ep.local_port as usize) else {
                tracing::error!("Invalid port number {} on '{}'", ep.local_port, name);
                return Err(GraphError::PortOutOfRange {
                    node,
                    port: ep.local_port,
                    pad_count: pads.len(),
                });
            };

            if local_pad.is_sink() {
                tracing::debug!("Skipping sink port {}:{}", name, ep.local_port);
                continue;
            }

            if ep.remote_node == sink_identity {
                tracing::debug!("Skipping channel port {}:{}", name, ep.local_port);
                continue;
            }

            let remote = Self::bound_remote(ctx, node, &ep)?;
            let remote_pad = Self::checked_pad(remote, ep.remote_port, PadDirection::Sink)?;

            let source = PadRef::new(node, local_pad.index);
            let sink = PadRef::new(remote.node, remote_pad.index);
            tracing::debug!("Creating {}:{} -> {}:{} link", name, source.pad, remote.name, sink.pad);
            ctx.pipeline.add_link(source, sink);
            created += 1;
        }

        Ok(created)
    }

    /// The single link into the capture node.
    fn build_sink_link(ctx: &mut BuildContext<'_>) -> GraphResult<()> {
        let config = ctx.pipeline.config().clone();
        tracing::debug!("Creating link for channel '{}'", config.sink_name);

        if config.channel_port >= config.channels {
            tracing::error!("Wrong channel number for port {}", config.channel_port);
            return Err(GraphError::InvalidChannel {
                port: config.channel_port,
                channels: config.channels,
            });
        }

        let ep = endpoint::resolve(ctx.topology, config.sink)?
            .find(|ep| ep.local_port == config.channel_port)
            .ok_or(GraphError::MissingSinkEndpoint { node: config.sink })?;

        let upstream = Self::bound_remote(ctx, config.sink, &ep)?;
        let source_pad = Self::checked_pad(upstream, ep.remote_port, PadDirection::Source)?;

        let source = PadRef::new(upstream.node, source_pad.index);
        let sink = ctx.pipeline.sink_pad();
        tracing::debug!(
            "Creating {}:{} -> {}:{} link",
            upstream.name,
            source.pad,
            config.sink_name,
            sink.pad
        );
        ctx.pipeline.add_link(source, sink);
        Ok(())
    }

    /// Look up the entity named by `ep.remote_node`; it must be bound.
    fn bound_remote<'r>(
        ctx: &'r BuildContext<'_>,
        local: NodeId,
        ep: &EndpointDescriptor,
    ) -> GraphResult<&'r Entity> {
        let remote = ctx.registry.find(ep.remote_node).map_err(|_| {
            tracing::error!("No entity found for {}", ep.remote_node);
            GraphError::UnresolvedRemote {
                local,
                remote: ep.remote_node,
            }
        })?;
        if !remote.is_bound() {
            tracing::error!("Entity '{}' is not bound", remote.name);
            return Err(GraphError::EntityNotBound {
                node: ep.remote_node,
            });
        }
        Ok(remote)
    }

    /// Pad `port` of `entity`, checked for range and direction.
    fn checked_pad(
        entity: &Entity,
        port: u32,
        expected: PadDirection,
    ) -> GraphResult<PadDescriptor> {
        let pad = entity.pad(port).copied().ok_or_else(|| {
            tracing::error!("Invalid port number {} on '{}'", port, entity.name);
            GraphError::PortOutOfRange {
                node: entity.node,
                port,
                pad_count: entity.pad_count(),
            }
        })?;
        if pad.direction != expected {
            tracing::error!(
                "Pad {}:{} is a {} pad, expected {}",
                entity.name,
                port,
                pad.direction,
                expected
            );
            return Err(GraphError::PadDirectionMismatch {
                node: entity.node,
                pad: port,
                expected,
                found: pad.direction,
            });
        }
        Ok(pad)
    }
}
