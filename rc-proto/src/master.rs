//! Master channel (§4.10): orchestration sideband letting an external
//! driver fire commands at the fleet. The master is never counted as a
//! peer for protocol purposes -- every engine's peer iteration already
//! skips it via `Node::is_master`.
//!
//! The commands that are purely local bookkeeping (`RESET`, `GRAPH`, `DJP`,
//! `DISCONNECT`) are dispatched fully here. `ACQUIRE`, `LOAD`, `CONNECTALL`,
//! `LOG`, `SENDTOP` touch the CSV loader, the log-file sink, or the
//! transport -- out-of-scope collaborators per §1 -- so dispatch here
//! reports which collaborator owns the rest of the work and `rc-node`
//! performs it.

use rc_types::NodeAddress;

use crate::error::{RcProtoError, RcProtoResult};
use crate::explorer2;
use crate::node::Node;

/// One master-channel command, parsed from a message's `content` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterCommand {
    Acquire,
    Load,
    ConnectAll,
    Disconnect(NodeAddress),
    Exp,
    Graph,
    Djp,
    Log,
    SendTop,
    Reset,
}

impl MasterCommand {
    /// Parses the whitespace-separated command line carried in a MASTER
    /// message's content, per §6's CLI command table (the master channel
    /// reuses the same vocabulary as `-master <subcommand>`).
    pub fn parse(content: &str) -> RcProtoResult<Self> {
        let mut words = content.split_whitespace();
        let Some(command) = words.next() else {
            return Err(RcProtoError::UnknownMasterCommand(content.to_string()));
        };

        match command {
            "ACQUIRE" => Ok(MasterCommand::Acquire),
            "LOAD" => Ok(MasterCommand::Load),
            "CONNECTALL" => Ok(MasterCommand::ConnectAll),
            "DISCONNECT" => {
                let addr = words
                    .next()
                    .ok_or_else(|| RcProtoError::UnknownMasterCommand(content.to_string()))?;
                Ok(MasterCommand::Disconnect(NodeAddress::new(addr)))
            }
            "EXP" => Ok(MasterCommand::Exp),
            "GRAPH" => Ok(MasterCommand::Graph),
            "DJP" => Ok(MasterCommand::Djp),
            "LOG" => Ok(MasterCommand::Log),
            "SENDTOP" => Ok(MasterCommand::SendTop),
            "RESET" => Ok(MasterCommand::Reset),
            other => Err(RcProtoError::UnknownMasterCommand(other.to_string())),
        }
    }
}

/// What the caller (`rc-node`) still needs to do after a command has run
/// its local part. `Done` means nothing further is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterEffect {
    Done,
    /// Load the CSV topology file and seed cTop from it.
    LoadTopologyCsv,
    /// Connect to every address named in the loaded topology.
    ConnectAll,
    /// Upload the local log file content as `r_log_<abbrev>.log`.
    UploadLog,
    /// Serialize and send the local cTop to the requester.
    SendTopology,
}

/// Executes the local part of `cmd` against `node`, returning whatever
/// remains for a transport-aware caller to do.
pub async fn dispatch(node: &Node, cmd: &MasterCommand) -> MasterEffect {
    match cmd {
        MasterCommand::Reset => {
            node.reset().await;
            MasterEffect::Done
        }
        MasterCommand::Disconnect(addr) => {
            node.disconnect(addr).await;
            MasterEffect::Done
        }
        MasterCommand::Exp => {
            explorer2::originate(node, "").await;
            MasterEffect::Done
        }
        MasterCommand::Graph | MasterCommand::Djp => MasterEffect::Done,
        MasterCommand::Acquire | MasterCommand::Load => MasterEffect::LoadTopologyCsv,
        MasterCommand::ConnectAll => MasterEffect::ConnectAll,
        MasterCommand::Log => MasterEffect::UploadLog,
        MasterCommand::SendTop => MasterEffect::SendTopology,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;
    use std::sync::Arc;

    fn addr(s: &str) -> NodeAddress {
        NodeAddress::new(s)
    }

    #[test]
    fn parse_accepts_every_documented_command() {
        assert_eq!(MasterCommand::parse("ACQUIRE").unwrap(), MasterCommand::Acquire);
        assert_eq!(MasterCommand::parse("RESET").unwrap(), MasterCommand::Reset);
        assert_eq!(
            MasterCommand::parse("DISCONNECT peer-a").unwrap(),
            MasterCommand::Disconnect(addr("peer-a"))
        );
    }

    #[test]
    fn parse_rejects_unknown_command() {
        assert!(MasterCommand::parse("BOGUS").is_err());
    }

    #[test]
    fn parse_rejects_disconnect_without_address() {
        assert!(MasterCommand::parse("DISCONNECT").is_err());
    }

    #[tokio::test]
    async fn reset_clears_node_state_and_reports_done() {
        let node = Node::new(addr("self"), false, Arc::new(RecordingSink::new()));
        node.topology.lock().await.ctop.set_neighbourhood(addr("a"), vec![addr("b")]);

        let effect = dispatch(&node, &MasterCommand::Reset).await;
        assert_eq!(effect, MasterEffect::Done);
        assert!(!node.topology.lock().await.ctop.contains(&addr("a")));
    }

    #[tokio::test]
    async fn load_reports_the_csv_collaborator_effect() {
        let node = Node::new(addr("self"), false, Arc::new(RecordingSink::new()));
        assert_eq!(dispatch(&node, &MasterCommand::Load).await, MasterEffect::LoadTopologyCsv);
    }
}
