//! Binary entry point: wires the CLI flags, config loaders, log sink,
//! transport gateway, and protocol engines into one running node, then
//! hands control to the interactive shell.

mod cli;
mod config;
mod logging;
mod shell;

use std::sync::Arc;

use clap::Parser;
use rc_proto::{adversary, cnt, detector, dolev_u, explorer2, master, rou, Node, ProtocolTag};
use rc_transport::{Gateway, Inbound, TcpSink};
use rc_types::MessageType;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    let abbrev = args.letter.clone();
    let _log_guard = logging::init(&abbrev)?;

    let sink = Arc::new(TcpSink::new());
    let node = Arc::new(Node::new(rc_types::NodeAddress::new(args.listen.to_string()), true, sink.clone()));

    if let Some(master_addr) = args.master {
        let master_node_addr = rc_types::NodeAddress::new(master_addr.to_string());
        sink.register_peer_addr(master_node_addr.clone(), master_addr).await;
        *node.master.write().await = Some(master_node_addr);
    }

    if let Ok(bz_config) = config::load_byzantine_config(&args.byzantine_config) {
        node.set_max_byzantines(bz_config.max_byzantines);
        *node.byzantine.write().await = bz_config.profile;
    } else {
        warn!(path = %args.byzantine_config.display(), "no byzantine config found, defaulting to a silent node");
    }

    if let Ok(mut rows) = config::load_topology_csv(&args.topology) {
        if matches!(args.mode, cli::Mode::Auto) {
            config::substitute_letter(&mut rows, &args.letter, &node.id);
        }
        let mut topology = node.topology.lock().await;
        for row in rows {
            topology.ctop.set_neighbourhood(row.node, row.neighbours);
        }
    }

    let gateway = Gateway::bind(args.listen).await?;
    let local_addr = gateway.local_addr()?;
    info!(%local_addr, id = %node.id, "listening");

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(gateway.serve(tx));
    tokio::spawn(dispatch_inbound(node.clone(), abbrev.clone(), rx));

    let ctx = shell::ShellContext {
        node,
        sink,
        topology_path: args.topology,
        abbrev,
    };
    shell::run(ctx).await
}

/// Consumes decoded inbound frames, applies the Byzantine injector, then
/// hands the message to the engine matching its protocol tag (§4 "Data
/// flow: inbound frame -> gateway -> adversary injector -> protocol-specific
/// receive").
async fn dispatch_inbound(node: Arc<Node>, abbrev: String, mut rx: mpsc::UnboundedReceiver<Inbound>) {
    while let Some(Inbound { tag, mut message }) = rx.recv().await {
        let dropped = {
            let bz = node.byzantine.read().await;
            adversary::apply(&bz, &mut message).await
        };
        if dropped {
            warn!(id = %message.id, "byzantine injector dropped inbound frame");
            continue;
        }

        match tag {
            ProtocolTag::Chat => {
                info!(from = %message.source, content = %message.content, "direct message received");
            }
            ProtocolTag::Nab => dolev_u::receive(&node, message).await,
            ProtocolTag::Detector => {
                detector::receive(&node, message).await;
            }
            ProtocolTag::Explorer2 => explorer2::receive(&node, message).await,
            ProtocolTag::Crc => {
                let result = match message.kind {
                    MessageType::Rou => rou::receive(&node, message).await,
                    MessageType::Cnt => cnt::receive(&node, message).await,
                    other => {
                        warn!(?other, "unexpected message type on the crc protocol");
                        continue;
                    }
                };
                if let Err(err) = result {
                    warn!(%err, "combined-rc engine error");
                }
            }
            ProtocolTag::Master => match master::MasterCommand::parse(&message.content) {
                Ok(cmd) => {
                    let effect = master::dispatch(&node, &cmd).await;
                    if effect == master::MasterEffect::UploadLog {
                        match logging::read_local_log(&abbrev) {
                            Ok(content) => {
                                let reply = rc_types::Message::new(
                                    rc_types::MessageId::generate(&node.id),
                                    MessageType::Master,
                                    node.id.clone(),
                                    node.id.clone(),
                                )
                                .with_content(content);
                                node.sink().send(&message.sender, ProtocolTag::Master, reply);
                            }
                            Err(err) => warn!(%err, "failed to read local log for upload"),
                        }
                    }
                }
                // Doesn't parse as a command keyword: this is a reply frame
                // (a prior `LOG` request's log content coming back), not a
                // fresh command. Save the frame's own payload.
                Err(_) => {
                    if let Err(err) = shell::save_uploaded_log(&abbrev, &message.content) {
                        warn!(%err, "failed to save uploaded log");
                    }
                }
            },
        }
    }
}
