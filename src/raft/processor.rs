use log::{debug, info};

use super::{ElectionTimer, NodeRole, NodeState, Outbound, Quorum, RaftMessage};

/// Result of feeding one event into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: NodeState,
    pub outbound: Vec<Outbound>,
    /// Lines for the observability sink.
    pub notes: Vec<String>,
}

impl Transition {
    fn unchanged(state: NodeState) -> Self {
        Self {
            state,
            outbound: Vec::new(),
            notes: Vec::new(),
        }
    }
}

/// Pure reaction function of a node.
///
/// Never blocks and never touches anything but the state it is handed;
/// cross-node effects are returned as `Outbound` messages.
#[derive(Debug, Clone)]
pub struct MessageProcessor {
    quorum: Quorum,
    timer: ElectionTimer,
}

impl MessageProcessor {
    pub fn new(quorum: Quorum, timer: ElectionTimer) -> Self {
        Self { quorum, timer }
    }

    pub fn quorum(&self) -> Quorum {
        self.quorum
    }

    pub fn timer(&self) -> &ElectionTimer {
        &self.timer
    }

    pub fn process(&self, state: NodeState, message: RaftMessage) -> Transition {
        match message {
            RaftMessage::AdminRestart => self.on_restart(state),
            _ if state.is_dead() => {
                debug!("Node {} is dead, dropping {}", state.id, message.kind());
                Transition::unchanged(state)
            }
            RaftMessage::VoteRequest { candidate } => self.on_vote_request(state, candidate),
            RaftMessage::VoteResponse { term } => self.on_vote_response(state, term),
            RaftMessage::HeartbeatRequest { term, sender_id } => {
                self.on_heartbeat_request(state, term, sender_id)
            }
            RaftMessage::HeartbeatResponse => Transition::unchanged(state),
            RaftMessage::AdminKill => self.on_kill(state),
        }
    }

    /// The election deadline elapsed with nothing in the inbox.
    pub fn election_timeout(&self, mut state: NodeState) -> Transition {
        if state.is_dead() || state.is_leader() {
            return Transition::unchanged(state);
        }

        // Granting a vote moves last_voted_term but not term. Stand in the
        // term after the latest one seen so the self-vote is never a second
        // vote in a term already voted in.
        state.term = state.term.max(state.last_voted_term);
        let term = state.next_term();
        state.role = NodeRole::Candidate;
        state.votes_received = 1;
        state.last_voted_term = term;
        state.election_timeout = Some(self.timer.sample());

        info!("Node {} starting election for term {}", state.id, term);
        let mut notes = vec![format!("node {} starts election for term {}", state.id, term)];

        let request = Outbound::Broadcast {
            source: state.id.clone(),
            message: RaftMessage::VoteRequest {
                candidate: state.clone(),
            },
        };

        // Single node clusters win on the self-vote alone
        if self.quorum.is_reached(state.votes_received) {
            notes.push(self.become_leader(&mut state));
        }

        Transition {
            state,
            outbound: vec![request],
            notes,
        }
    }

    fn on_vote_request(&self, mut state: NodeState, candidate: NodeState) -> Transition {
        if candidate.term <= state.last_voted_term {
            debug!(
                "Node {} refuses {} for term {} (last voted in {})",
                state.id, candidate.id, candidate.term, state.last_voted_term
            );
            return Transition::unchanged(state);
        }

        state.last_voted_term = candidate.term;
        // A leader grants the vote but keeps running without a deadline.
        if !state.is_leader() {
            state.election_timeout = Some(self.timer.sample());
        }

        info!(
            "Node {} votes for {} in term {}",
            state.id, candidate.id, candidate.term
        );
        let note = format!(
            "node {} votes for {} in term {}",
            state.id, candidate.id, candidate.term
        );

        Transition {
            state,
            outbound: vec![Outbound::Unicast {
                target: candidate.id,
                message: RaftMessage::VoteResponse {
                    term: candidate.term,
                },
            }],
            notes: vec![note],
        }
    }

    fn on_vote_response(&self, mut state: NodeState, term: u64) -> Transition {
        // A vote granted for an earlier candidacy does not count toward this one.
        if state.role != NodeRole::Candidate || term != state.term {
            return Transition::unchanged(state);
        }

        state.votes_received += 1;
        let mut notes = Vec::new();
        if self.quorum.is_reached(state.votes_received) {
            notes.push(self.become_leader(&mut state));
        }

        Transition {
            state,
            outbound: Vec::new(),
            notes,
        }
    }

    fn on_heartbeat_request(&self, mut state: NodeState, term: u64, sender_id: String) -> Transition {
        if !matches!(state.role, NodeRole::Follower | NodeRole::Candidate) {
            return Transition::unchanged(state);
        }

        if state.term != term {
            state.heartbeat_count = 0;
        }
        state.term = term;
        state.heartbeat_count += 1;
        state.role = NodeRole::Follower;
        state.election_timeout = Some(self.timer.sample());

        Transition {
            state,
            outbound: vec![Outbound::Unicast {
                target: sender_id,
                message: RaftMessage::HeartbeatResponse,
            }],
            notes: Vec::new(),
        }
    }

    fn on_kill(&self, mut state: NodeState) -> Transition {
        state.role = NodeRole::Dead;
        state.clear_election_timeout();

        info!("Node {} is dead", state.id);
        let note = format!("node {} is dead", state.id);
        Transition {
            state,
            outbound: Vec::new(),
            notes: vec![note],
        }
    }

    fn on_restart(&self, mut state: NodeState) -> Transition {
        if !state.is_dead() {
            return Transition::unchanged(state);
        }

        state.role = NodeRole::Follower;
        state.election_timeout = Some(self.timer.sample());

        info!("Node {} restarts in term {}", state.id, state.term);
        let note = format!("node {} restarts", state.id);
        Transition {
            state,
            outbound: Vec::new(),
            notes: vec![note],
        }
    }

    fn become_leader(&self, state: &mut NodeState) -> String {
        info!(
            "Node {} becoming leader for term {} with {} votes",
            state.id, state.term, state.votes_received
        );
        state.role = NodeRole::Leader;
        state.clear_election_timeout();
        format!("node {} becomes leader in term {}", state.id, state.term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor(cluster_size: usize) -> MessageProcessor {
        MessageProcessor::new(Quorum::new(cluster_size), ElectionTimer::default())
    }

    fn follower(id: &str) -> NodeState {
        let mut state = NodeState::new(id);
        state.election_timeout = Some(5);
        state
    }

    fn candidate(id: &str, term: u64) -> NodeState {
        let mut state = follower(id);
        state.term = term;
        state.role = NodeRole::Candidate;
        state.votes_received = 1;
        state.last_voted_term = term;
        state
    }

    fn assert_rearmed(state: &NodeState) {
        let t = state.election_timeout.expect("deadline should be armed");
        assert!((3..=10).contains(&t), "deadline {t} out of range");
    }

    #[test]
    fn timeout_promotes_follower_to_candidate() {
        let p = processor(5);
        let t = p.election_timeout(follower("n1"));

        assert_eq!(t.state.role, NodeRole::Candidate);
        assert_eq!(t.state.term, 1);
        assert_eq!(t.state.votes_received, 1);
        assert_eq!(t.state.last_voted_term, 1);
        assert_rearmed(&t.state);

        match &t.outbound[..] {
            [Outbound::Broadcast { source, message: RaftMessage::VoteRequest { candidate } }] => {
                assert_eq!(source, "n1");
                assert_eq!(candidate.term, 1);
                assert_eq!(candidate.id, "n1");
            }
            other => panic!("unexpected outbound {other:?}"),
        }
    }

    #[test]
    fn timeout_while_candidate_starts_next_term() {
        let p = processor(5);
        let t = p.election_timeout(candidate("n1", 4));
        assert_eq!(t.state.term, 5);
        assert_eq!(t.state.votes_received, 1);
        assert_eq!(t.state.last_voted_term, 5);
    }

    #[test]
    fn timeout_after_voting_stands_past_the_voted_term() {
        let p = processor(5);
        let mut voter = follower("n2");
        voter.last_voted_term = 4;

        let t = p.election_timeout(voter);
        assert_eq!(t.state.term, 5);
        assert_eq!(t.state.last_voted_term, 5);
        assert_eq!(t.state.role, NodeRole::Candidate);
    }

    #[test]
    fn timeout_in_single_node_cluster_wins_immediately() {
        let p = processor(1);
        let t = p.election_timeout(follower("solo"));
        assert_eq!(t.state.role, NodeRole::Leader);
        assert_eq!(t.state.election_timeout, None);
    }

    #[test]
    fn vote_granted_for_newer_term() {
        let p = processor(5);
        let t = p.process(
            follower("n2"),
            RaftMessage::VoteRequest {
                candidate: candidate("n1", 1),
            },
        );

        assert_eq!(t.state.last_voted_term, 1);
        assert_eq!(t.state.role, NodeRole::Follower);
        assert_rearmed(&t.state);
        assert_eq!(
            t.outbound,
            vec![Outbound::Unicast {
                target: "n1".to_string(),
                message: RaftMessage::VoteResponse { term: 1 },
            }]
        );
        assert_eq!(t.notes, vec!["node n2 votes for n1 in term 1".to_string()]);
    }

    #[test]
    fn vote_refused_for_same_or_older_term() {
        let p = processor(5);
        let mut voter = follower("n2");
        voter.last_voted_term = 3;

        for term in [1, 3] {
            let t = p.process(
                voter.clone(),
                RaftMessage::VoteRequest {
                    candidate: candidate("n1", term),
                },
            );
            assert_eq!(t.state, voter);
            assert!(t.outbound.is_empty());
        }
    }

    #[test]
    fn candidate_grants_vote_for_newer_term() {
        // Permissive rule: candidacy does not block voting for a later term.
        let p = processor(5);
        let t = p.process(
            candidate("n2", 1),
            RaftMessage::VoteRequest {
                candidate: candidate("n1", 2),
            },
        );
        assert_eq!(t.state.role, NodeRole::Candidate);
        assert_eq!(t.state.last_voted_term, 2);
        assert_eq!(t.outbound.len(), 1);
    }

    #[test]
    fn leader_grants_vote_but_stays_without_deadline() {
        let p = processor(5);
        let mut leader = candidate("n3", 2);
        leader.role = NodeRole::Leader;
        leader.election_timeout = None;

        let t = p.process(
            leader,
            RaftMessage::VoteRequest {
                candidate: candidate("n1", 3),
            },
        );
        assert_eq!(t.state.role, NodeRole::Leader);
        assert_eq!(t.state.last_voted_term, 3);
        assert_eq!(t.state.election_timeout, None);
        assert_eq!(t.outbound.len(), 1);
    }

    #[test]
    fn vote_response_counts_until_quorum() {
        let p = processor(5);
        let t = p.process(candidate("n1", 1), RaftMessage::VoteResponse { term: 1 });
        assert_eq!(t.state.votes_received, 2);
        assert_eq!(t.state.role, NodeRole::Candidate);

        let t = p.process(t.state, RaftMessage::VoteResponse { term: 1 });
        assert_eq!(t.state.votes_received, 3);
        assert_eq!(t.state.role, NodeRole::Leader);
        assert_eq!(t.state.election_timeout, None);
        assert_eq!(t.notes, vec!["node n1 becomes leader in term 1".to_string()]);
    }

    #[test]
    fn vote_response_ignored_when_not_candidate() {
        let p = processor(5);
        let state = follower("n1");
        let t = p.process(state.clone(), RaftMessage::VoteResponse { term: 0 });
        assert_eq!(t.state, state);
    }

    #[test]
    fn stale_vote_response_is_not_counted() {
        let p = processor(5);
        let state = candidate("n1", 3);
        let t = p.process(state.clone(), RaftMessage::VoteResponse { term: 2 });
        assert_eq!(t.state, state);
    }

    #[test]
    fn even_cluster_can_elect_two_leaders_in_one_term() {
        // (n+1)/2 of 4 is two votes, so disjoint halves both reach quorum.
        let p = processor(4);
        let a = p.election_timeout(follower("a")).state;
        let b = p.election_timeout(follower("b")).state;
        assert_eq!((a.term, b.term), (1, 1));

        let c = p.process(follower("c"), RaftMessage::VoteRequest { candidate: a.clone() });
        let d = p.process(follower("d"), RaftMessage::VoteRequest { candidate: b.clone() });
        assert_eq!(c.outbound.len(), 1);
        assert_eq!(d.outbound.len(), 1);

        let a = p.process(a, RaftMessage::VoteResponse { term: 1 }).state;
        let b = p.process(b, RaftMessage::VoteResponse { term: 1 }).state;
        assert_eq!((a.role, a.term), (NodeRole::Leader, 1));
        assert_eq!((b.role, b.term), (NodeRole::Leader, 1));
    }

    #[test]
    fn heartbeat_demotes_candidate_and_adopts_term() {
        let p = processor(5);
        let t = p.process(
            candidate("n2", 4),
            RaftMessage::HeartbeatRequest {
                term: 3,
                sender_id: "n1".to_string(),
            },
        );

        assert_eq!(t.state.role, NodeRole::Follower);
        assert_eq!(t.state.term, 3);
        assert_eq!(t.state.heartbeat_count, 1);
        assert_rearmed(&t.state);
        assert_eq!(
            t.outbound,
            vec![Outbound::Unicast {
                target: "n1".to_string(),
                message: RaftMessage::HeartbeatResponse,
            }]
        );
    }

    #[test]
    fn heartbeat_count_resets_on_term_change() {
        let p = processor(5);
        let hb = |term| RaftMessage::HeartbeatRequest {
            term,
            sender_id: "n1".to_string(),
        };

        let t = p.process(follower("n2"), hb(1));
        let t = p.process(t.state, hb(1));
        assert_eq!(t.state.heartbeat_count, 2);

        let t = p.process(t.state, hb(2));
        assert_eq!(t.state.term, 2);
        assert_eq!(t.state.heartbeat_count, 1);
    }

    #[test]
    fn leader_ignores_heartbeats() {
        let p = processor(5);
        let mut leader = candidate("n1", 2);
        leader.role = NodeRole::Leader;
        leader.election_timeout = None;

        let t = p.process(
            leader.clone(),
            RaftMessage::HeartbeatRequest {
                term: 7,
                sender_id: "n2".to_string(),
            },
        );
        assert_eq!(t.state, leader);
        assert!(t.outbound.is_empty());
    }

    #[test]
    fn kill_clears_deadline() {
        let p = processor(5);
        let t = p.process(candidate("n1", 2), RaftMessage::AdminKill);
        assert_eq!(t.state.role, NodeRole::Dead);
        assert_eq!(t.state.election_timeout, None);
        assert_eq!(t.notes, vec!["node n1 is dead".to_string()]);
    }

    #[test]
    fn dead_node_ignores_everything_but_restart() {
        let p = processor(5);
        let dead = p.process(candidate("n1", 2), RaftMessage::AdminKill).state;

        let messages = vec![
            RaftMessage::VoteRequest {
                candidate: candidate("n2", 9),
            },
            RaftMessage::VoteResponse { term: 2 },
            RaftMessage::HeartbeatRequest {
                term: 9,
                sender_id: "n2".to_string(),
            },
            RaftMessage::HeartbeatResponse,
            RaftMessage::AdminKill,
        ];
        for message in messages {
            let t = p.process(dead.clone(), message);
            assert_eq!(t.state, dead);
            assert!(t.outbound.is_empty());
            assert!(t.notes.is_empty());
        }

        assert_eq!(p.election_timeout(dead.clone()).state, dead);
    }

    #[test]
    fn restart_revives_as_follower_keeping_term() {
        let p = processor(5);
        let dead = p.process(candidate("n1", 6), RaftMessage::AdminKill).state;
        let t = p.process(dead, RaftMessage::AdminRestart);

        assert_eq!(t.state.role, NodeRole::Follower);
        assert_eq!(t.state.term, 6);
        assert_rearmed(&t.state);
        assert_eq!(t.notes, vec!["node n1 restarts".to_string()]);
    }

    #[test]
    fn restart_of_live_node_is_noop() {
        let p = processor(5);
        let state = follower("n1");
        assert_eq!(p.process(state.clone(), RaftMessage::AdminRestart).state, state);
    }

    #[test]
    fn heartbeat_response_is_observational() {
        let p = processor(5);
        let state = candidate("n1", 1);
        let t = p.process(state.clone(), RaftMessage::HeartbeatResponse);
        assert_eq!(t.state, state);
        assert!(t.outbound.is_empty());
    }
}
