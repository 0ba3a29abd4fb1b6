//! Static exchange/queue/routing-key names for the incident pipeline bus.
//!
//! Two durable topic exchanges (`incidents`, `plans`) carry five durable
//! queues, each bound by a single routing key. `q.plans.approved` additionally
//! dead-letters into `plans.approved.dlq`; the others follow the same
//! dead-letter pattern for symmetry even though the spec only requires it
//! for the approved-plan path.

/// A queue this process can `basic_consume` from, together with the
/// exchange/routing key it is bound to and its dead-letter routing key.
#[derive(Debug, Clone, Copy)]
pub struct QueueSpec {
    pub exchange: &'static str,
    pub queue: &'static str,
    pub routing_key: &'static str,
    pub dlq_routing_key: &'static str,
}

pub const DEAD_LETTER_EXCHANGE: &str = "dlx";

pub const INCIDENTS_NEW: QueueSpec = QueueSpec {
    exchange: "incidents",
    queue: "q.incidents.new",
    routing_key: "new",
    dlq_routing_key: "incidents.new.dlq",
};

pub const INCIDENTS_RESOLVED: QueueSpec = QueueSpec {
    exchange: "incidents",
    queue: "q.incidents.resolved",
    routing_key: "resolved",
    dlq_routing_key: "incidents.resolved.dlq",
};

pub const PLANS_PROPOSED: QueueSpec = QueueSpec {
    exchange: "plans",
    queue: "q.plans.proposed",
    routing_key: "proposed",
    dlq_routing_key: "plans.proposed.dlq",
};

pub const PLANS_APPROVED: QueueSpec = QueueSpec {
    exchange: "plans",
    queue: "q.plans.approved",
    routing_key: "approved",
    dlq_routing_key: "plans.approved.dlq",
};

/// Out-of-band human approval commands for plans held pending review
/// (spec §4.3's "explicit approval events" channel).
pub const PLANS_APPROVAL_COMMAND: QueueSpec = QueueSpec {
    exchange: "plans",
    queue: "q.plans.approval_command",
    routing_key: "approval_command",
    dlq_routing_key: "plans.approval_command.dlq",
};

pub const TOPIC_EXCHANGES: &[&str] = &["incidents", "plans"];
pub const ALL_QUEUES: &[QueueSpec] = &[
    INCIDENTS_NEW,
    INCIDENTS_RESOLVED,
    PLANS_PROPOSED,
    PLANS_APPROVED,
    PLANS_APPROVAL_COMMAND,
];
