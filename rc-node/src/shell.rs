//! The interactive command shell (§6): a line-oriented loop over stdin,
//! dispatching to `Node`/engine methods. Kept at the depth the
//! specification asks of an out-of-scope collaborator -- a thin dispatcher,
//! not a general-purpose shell framework.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use rc_proto::{adversary, cnt, detector, dolev_u, explorer2, master, rou, Node};
use rc_types::{MessageId, NodeAddress};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::config;
use crate::logging;

const HELP_TEXT: &str = "\
-help [NODE|PROTOCOLS|MSG|NETWORK|HELP]   Print this help panel
-info                                     Show local identity and peers
-connect <addr>                           Open a connection; record in cTop
-connectall                               Connect to every address in cTop
-send <addr> -msg \"...\"                   Direct chat message
-broadcast <addr> -msg \"...\"              Dolev-U broadcast
-detector                                 Emit Detector
-exp2                                     Emit Explorer2
-crc EXP                                  CombinedRC: Explorer2 phase
-crc ROU <target>                         CombinedRC: route declaration
-crc SEND <target> -msg \"...\"             CombinedRC: routed content
-deliver <id>|ALL                         Force Dolev-U delivery
-show DEL|RCV                             Dump delivered/received stores
-topology SHOW|WHOLE|LOAD|ACQUIRE|FORCE <letter>   Manage cTop
-graph                                    Print cTop graph projection
-djp                                      Print DisjointPaths
-master <subcommand>                      Orchestration passthrough
-byzantine [FAKE]                         Toggle Byzantine role
";

/// Shared handles the shell needs beyond the protocol-level `Node`.
pub struct ShellContext {
    pub node: Arc<Node>,
    pub sink: Arc<rc_transport::TcpSink>,
    pub topology_path: std::path::PathBuf,
    pub abbrev: String,
}

/// Runs the REPL forever, reading commands from stdin. Returns only on EOF
/// or an unrecoverable I/O error.
pub async fn run(ctx: ShellContext) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(err) = dispatch(&ctx, line).await {
            warn!(%err, command = line, "command failed");
        }
    }
    Ok(())
}

async fn dispatch(ctx: &ShellContext, line: &str) -> Result<()> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some(&command) = words.first() else {
        return Ok(());
    };

    match command {
        "-help" => {
            println!("{HELP_TEXT}");
        }
        "-info" => {
            let peers = ctx.node.connected_peers().await;
            println!("id: {}", ctx.node.id);
            println!("peers: {}", peers.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", "));
        }
        "-connect" => {
            let Some(addr) = words.get(1) else {
                anyhow::bail!("usage: -connect <addr>");
            };
            connect_one(ctx, addr).await?;
        }
        "-connectall" => {
            let ctop = ctx.node.topology.lock().await.ctop.clone();
            let targets: Vec<NodeAddress> = ctop.nodes().filter(|n| **n != ctx.node.id).cloned().collect();
            for target in targets {
                connect_one(ctx, target.as_str()).await?;
            }
        }
        "-send" => {
            let Some(target) = words.get(1) else {
                anyhow::bail!("usage: -send <addr> -msg \"...\"");
            };
            let target = NodeAddress::new(*target);
            if target == ctx.node.id {
                anyhow::bail!("self-directed -send is rejected");
            }
            let content = extract_msg(&words)?;
            let msg = rc_types::Message::new(
                MessageId::generate(&ctx.node.id),
                rc_types::MessageType::Direct,
                ctx.node.id.clone(),
                ctx.node.id.clone(),
            )
            .with_target(target.clone())
            .with_content(content);
            ctx.node.sink().send(&target, rc_proto::ProtocolTag::Chat, msg);
        }
        "-broadcast" => {
            let Some(target) = words.get(1) else {
                anyhow::bail!("usage: -broadcast <addr> -msg \"...\"");
            };
            let content = extract_msg(&words)?;
            dolev_u::originate(&ctx.node, Some(NodeAddress::new(*target)), content).await;
        }
        "-detector" => {
            detector::originate(&ctx.node, "").await;
        }
        "-exp2" => {
            explorer2::originate(&ctx.node, "").await;
        }
        "-crc" => run_crc(ctx, &words).await?,
        "-deliver" => run_deliver(ctx, &words).await?,
        "-show" => run_show(ctx, &words).await?,
        "-topology" => run_topology(ctx, &words).await?,
        "-graph" => {
            let graph = {
                let topology = ctx.node.topology.lock().await;
                topology.graph_projection(ctx.node.max_byzantines(), ctx.node.auto_recognize)
            };
            for node in graph.nodes() {
                let neighbours: Vec<&str> = graph.neighbours(node).iter().map(NodeAddress::as_str).collect();
                println!("{}: {}", node.as_str(), neighbours.join(", "));
            }
        }
        "-djp" => {
            let dp = ctx.node.disjoint_paths.read().await;
            let ctop_nodes: Vec<NodeAddress> = ctx.node.topology.lock().await.ctop.nodes().cloned().collect();
            for target in ctop_nodes {
                for path in dp.get(&target) {
                    let hops: Vec<&str> = path.iter().map(NodeAddress::as_str).collect();
                    println!("{}: {}", target.as_str(), hops.join(" -> "));
                }
            }
        }
        "-master" => {
            let Some(rest) = line.strip_prefix("-master").map(str::trim) else {
                anyhow::bail!("usage: -master <subcommand>");
            };
            run_master(ctx, rest).await?;
        }
        "-byzantine" => {
            let mut bz = ctx.node.byzantine.write().await;
            *bz = if bz.is_noop() {
                rc_types::Byzantine { type1: true, type2: true, type3: true, ..rc_types::Byzantine::disabled() }
            } else {
                rc_types::Byzantine::disabled()
            };
            drop(bz);
            if words.get(1) == Some(&"FAKE") {
                let forged = adversary::forge(
                    rc_types::MessageType::Explorer2,
                    NodeAddress::new("forged-source"),
                    ctx.node.id.clone(),
                );
                for peer in ctx.node.connected_peers().await {
                    ctx.node.sink().send(&peer, rc_proto::ProtocolTag::Explorer2, forged.clone());
                }
            }
        }
        other => {
            anyhow::bail!("unknown command: {other}");
        }
    }
    Ok(())
}

async fn connect_one(ctx: &ShellContext, addr: &str) -> Result<()> {
    let node_addr = NodeAddress::new(addr);
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        ctx.sink.register_peer_addr(node_addr.clone(), socket_addr).await;
    }
    ctx.node.connect(node_addr.clone()).await;

    let mut topology = ctx.node.topology.lock().await;
    let self_id = topology.node_id.clone();
    let mut neighbours = topology.ctop.neighbourhood(&self_id).to_vec();
    if !neighbours.contains(&node_addr) {
        neighbours.push(node_addr);
    }
    topology.ctop.set_neighbourhood(self_id, neighbours);
    Ok(())
}

/// Pulls the quoted `-msg "..."` argument out of a split command line.
fn extract_msg(words: &[&str]) -> Result<String> {
    let Some(pos) = words.iter().position(|w| *w == "-msg") else {
        anyhow::bail!("missing -msg \"...\" argument");
    };
    Ok(words[pos + 1..].join(" ").trim_matches('"').to_string())
}

async fn run_crc(ctx: &ShellContext, words: &[&str]) -> Result<()> {
    match words.get(1).copied() {
        Some("EXP") => {
            explorer2::originate(&ctx.node, "").await;
        }
        Some("ROU") => {
            let Some(target) = words.get(2) else {
                anyhow::bail!("usage: -crc ROU <target>");
            };
            rou::originate(&ctx.node, &NodeAddress::new(*target)).await;
        }
        Some("SEND") => {
            let Some(target) = words.get(2) else {
                anyhow::bail!("usage: -crc SEND <target> -msg \"...\"");
            };
            let content = extract_msg(words)?;
            cnt::originate(&ctx.node, &NodeAddress::new(*target), content).await;
        }
        _ => anyhow::bail!("usage: -crc EXP|ROU <target>|SEND <target> -msg \"...\""),
    }
    Ok(())
}

async fn run_deliver(ctx: &ShellContext, words: &[&str]) -> Result<()> {
    match words.get(1).copied() {
        Some("ALL") => {
            let delivered = dolev_u::deliver_all(&ctx.node).await;
            println!("delivered {} message(s)", delivered.len());
        }
        Some(id) => {
            let container = ctx.node.message_container.lock().await;
            let Some(full_id) = container.ids().find(|i| i.as_str() == id || i.printable(id.len()) == id).cloned()
            else {
                anyhow::bail!("unknown message id: {id}");
            };
            drop(container);
            let ok = dolev_u::deliver(&ctx.node, &full_id).await;
            println!("deliver {id}: {}", if ok { "ok" } else { "insufficient disjoint paths" });
        }
        None => anyhow::bail!("usage: -deliver <id>|ALL"),
    }
    Ok(())
}

async fn run_show(ctx: &ShellContext, words: &[&str]) -> Result<()> {
    match words.get(1).copied() {
        Some("DEL") => {
            let delivered = ctx.node.delivered_messages.lock().await;
            for id in delivered.ids() {
                for msg in delivered.get(id) {
                    println!("{} <- {} : {}", id.printable(8), msg.source.as_str(), msg.content);
                }
            }
        }
        Some("RCV") => {
            let received = ctx.node.message_container.lock().await;
            for id in received.ids() {
                for msg in received.get(id) {
                    println!("{} <- {} : {}", id.printable(8), msg.source.as_str(), msg.content);
                }
            }
        }
        _ => anyhow::bail!("usage: -show DEL|RCV"),
    }
    Ok(())
}

async fn run_topology(ctx: &ShellContext, words: &[&str]) -> Result<()> {
    match words.get(1).copied() {
        Some("SHOW") => {
            let topology = ctx.node.topology.lock().await;
            let neighbours = topology.ctop.neighbourhood(&ctx.node.id);
            println!("{}: {}", ctx.node.id, neighbours.iter().map(NodeAddress::as_str).collect::<Vec<_>>().join(", "));
        }
        Some("WHOLE") => {
            let topology = ctx.node.topology.lock().await;
            for (node, neighbours) in topology.ctop.entries() {
                println!("{}: {}", node.as_str(), neighbours.iter().map(NodeAddress::as_str).collect::<Vec<_>>().join(", "));
            }
        }
        Some("LOAD") | Some("ACQUIRE") => {
            let rows = config::load_topology_csv(&ctx.topology_path)?;
            let mut topology = ctx.node.topology.lock().await;
            for row in rows {
                topology.ctop.set_neighbourhood(row.node, row.neighbours);
            }
        }
        Some("FORCE") => {
            let Some(letter) = words.get(2) else {
                anyhow::bail!("usage: -topology FORCE <letter>");
            };
            let mut rows = config::load_topology_csv(&ctx.topology_path)?;
            config::substitute_letter(&mut rows, letter, &ctx.node.id);
            let mut topology = ctx.node.topology.lock().await;
            for row in rows {
                topology.ctop.set_neighbourhood(row.node, row.neighbours);
            }
        }
        _ => anyhow::bail!("usage: -topology SHOW|WHOLE|LOAD|ACQUIRE|FORCE <letter>"),
    }
    Ok(())
}

async fn run_master(ctx: &ShellContext, rest: &str) -> Result<()> {
    let cmd = master::MasterCommand::parse(rest)?;
    let effect = master::dispatch(&ctx.node, &cmd).await;
    match effect {
        master::MasterEffect::Done => {}
        master::MasterEffect::LoadTopologyCsv => {
            let rows = config::load_topology_csv(&ctx.topology_path)?;
            let mut topology = ctx.node.topology.lock().await;
            for row in rows {
                topology.ctop.set_neighbourhood(row.node, row.neighbours);
            }
        }
        master::MasterEffect::ConnectAll => {
            let ctop = ctx.node.topology.lock().await.ctop.clone();
            let targets: Vec<NodeAddress> = ctop.nodes().filter(|n| **n != ctx.node.id).cloned().collect();
            for target in targets {
                connect_one(ctx, target.as_str()).await?;
            }
        }
        master::MasterEffect::UploadLog => {
            let Some(master_addr) = ctx.node.master.read().await.clone() else {
                anyhow::bail!("no master configured");
            };
            let content = logging::read_local_log(&ctx.abbrev)?;
            let msg = rc_types::Message::new(
                MessageId::generate(&ctx.node.id),
                rc_types::MessageType::Master,
                ctx.node.id.clone(),
                ctx.node.id.clone(),
            )
            .with_content(content);
            ctx.node.sink().send(&master_addr, rc_proto::ProtocolTag::Master, msg);
        }
        master::MasterEffect::SendTopology => {
            let Some(master_addr) = ctx.node.master.read().await.clone() else {
                anyhow::bail!("no master configured");
            };
            let topology = ctx.node.topology.lock().await;
            let snapshot = serde_json::to_string(&topology.ctop.entries().collect::<Vec<_>>())?;
            let msg = rc_types::Message::new(
                MessageId::generate(&ctx.node.id),
                rc_types::MessageType::Master,
                ctx.node.id.clone(),
                ctx.node.id.clone(),
            )
            .with_content(snapshot);
            ctx.node.sink().send(&master_addr, rc_proto::ProtocolTag::Master, msg);
        }
    }
    Ok(())
}

/// Saves an inbound master-log upload under `logs/r_log_<abbrev>.log`.
pub fn save_uploaded_log(abbrev: &str, content: &str) -> Result<()> {
    logging::save_uploaded_log(abbrev, content)
}
