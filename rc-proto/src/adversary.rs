//! The Byzantine fault injector: Type1 (delay), Type2 (probabilistic drop),
//! Type3 (alter), composed in that fixed order on every inbound message,
//! plus `FAKE` forged-message injection.
//!
//! Grounded on the reference's `applyByzantine`/inline byzantine blocks
//! repeated at the top of every `handle*` function (`messages_operations.go`,
//! `protocol_detector.go`, `protocol_broadcast.go`); here it is a single
//! shared function every engine calls instead of copy-pasted inline checks.

use rand::Rng;

use rc_types::{Alteration, Byzantine, Message, MessageId, NodeAddress};

/// Applies `bz` to `msg` in place. Returns `true` if the message must be
/// dropped (Type2 fired) -- the caller should stop processing immediately.
pub async fn apply(bz: &Byzantine, msg: &mut Message) -> bool {
    if bz.type1 {
        tokio::time::sleep(bz.delay).await;
    }

    if bz.type2 && rand::thread_rng().gen::<f64>() < bz.drop_rate {
        return true;
    }

    if bz.type3 {
        alter(bz, msg);
    }

    false
}

fn alter(bz: &Byzantine, msg: &mut Message) {
    let mut rng = rand::thread_rng();
    match bz.alterations {
        Some(Alteration::Neighbourhood) if !msg.neighbourhood.is_empty() => {
            let idx = rng.gen_range(0..msg.neighbourhood.len());
            msg.neighbourhood.remove(idx);
        }
        Some(Alteration::Path) if !msg.path.is_empty() => {
            let idx = rng.gen_range(0..msg.path.len());
            msg.path.remove(idx);
        }
        Some(Alteration::Swap) if msg.path.len() >= 2 => {
            let i = rng.gen_range(0..msg.path.len());
            let mut j = rng.gen_range(0..msg.path.len());
            while j == i {
                j = rng.gen_range(0..msg.path.len());
            }
            msg.path.swap(i, j);
        }
        Some(Alteration::MsgId) => {
            msg.id = msg.id.with_last_char_dropped();
        }
        _ => {}
    }
}

/// `FAKE`: forges a message from a spoofed source/sender rather than
/// altering a genuine one, for the `-byzantine FAKE` operator command.
pub fn forge(kind: rc_types::MessageType, spoofed_source: NodeAddress, sender: NodeAddress) -> Message {
    let id = MessageId::generate(&spoofed_source);
    Message::new(id, kind, sender, spoofed_source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn addr(s: &str) -> NodeAddress {
        NodeAddress::new(s)
    }

    fn msg() -> Message {
        Message::new(
            MessageId::new(&addr("a"), 0, 0),
            rc_types::MessageType::Explorer2,
            addr("a"),
            addr("a"),
        )
        .with_path(vec![addr("a"), addr("b"), addr("c")])
        .with_neighbourhood(vec![addr("x"), addr("y")])
    }

    #[tokio::test]
    async fn disabled_profile_never_drops_or_alters() {
        let bz = Byzantine::disabled();
        let mut m = msg();
        let before = m.clone();
        let dropped = apply(&bz, &mut m).await;
        assert!(!dropped);
        assert_eq!(m, before);
    }

    #[tokio::test]
    async fn type2_always_drops_at_droprate_one() {
        let mut bz = Byzantine::disabled();
        bz.type2 = true;
        bz.drop_rate = 1.0;
        let mut m = msg();
        assert!(apply(&bz, &mut m).await);
    }

    #[tokio::test]
    async fn type1_delays_by_configured_duration() {
        let mut bz = Byzantine::disabled();
        bz.type1 = true;
        bz.delay = Duration::from_millis(5);
        let mut m = msg();
        let start = tokio::time::Instant::now();
        apply(&bz, &mut m).await;
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[tokio::test]
    async fn type3_path_alteration_shortens_path_by_one() {
        let mut bz = Byzantine::disabled();
        bz.type3 = true;
        bz.alterations = Some(Alteration::Path);
        let mut m = msg();
        let before_len = m.path.len();
        apply(&bz, &mut m).await;
        assert_eq!(m.path.len(), before_len - 1);
    }

    #[tokio::test]
    async fn type3_msgid_alteration_drops_last_char() {
        let mut bz = Byzantine::disabled();
        bz.type3 = true;
        bz.alterations = Some(Alteration::MsgId);
        let mut m = msg();
        let before = m.id.as_str().to_string();
        apply(&bz, &mut m).await;
        assert_eq!(m.id.as_str(), &before[..before.len() - 1]);
    }

    #[test]
    fn forge_builds_a_message_with_spoofed_source() {
        let m = forge(rc_types::MessageType::Explorer2, addr("victim"), addr("attacker"));
        assert_eq!(m.source, addr("victim"));
        assert_eq!(m.sender, addr("attacker"));
    }
}
